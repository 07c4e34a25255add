use crate::{Context, Result};
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is the secret material a signer signs with.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Whether the credential can still be used to sign.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential loads a credential from somewhere: the environment,
/// a file, a fixed value.
///
/// Returning `Ok(None)` means "not found here", which lets providers be
/// chained. Errors are reserved for sources that exist but are broken.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load the credential.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest signs `http::request::Parts` in place.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request.
    ///
    /// ## Credential
    ///
    /// `None` means no credential could be found; implementations decide
    /// whether to send the request anonymously or fail.
    ///
    /// ## Expires In
    ///
    /// `Some(duration)` asks for a presigned request (signature in the
    /// query string, valid for `duration`). Implementations that cannot
    /// presign must return an error.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}
