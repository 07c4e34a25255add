use crate::{Context, ProvideCredential, Result, SignRequest, SigningCredential};
use log::debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Signer ties a credential provider to a request signer.
///
/// The credential is loaded on first use and cached. It is only loaded
/// again once [`SigningCredential::is_valid`] reports it unusable.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,
            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign the request in place.
    ///
    /// `expires_in` switches to a presigned request, see
    /// [`SignRequest::sign_request`].
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let cached = self.cached();
        let credential = if cached.is_valid() {
            cached
        } else {
            debug!("cached credential missing or invalid, loading a new one");
            let loaded = self.loader.provide_credential(&self.ctx).await?;
            self.store(loaded.clone());
            loaded
        };

        self.builder
            .sign_request(&self.ctx, req, credential.as_ref(), expires_in)
            .await
    }

    fn cached(&self) -> Option<K> {
        match self.credential.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store(&self, credential: Option<K>) {
        match self.credential.lock() {
            Ok(mut guard) => *guard = credential,
            Err(poisoned) => *poisoned.into_inner() = credential,
        }
    }
}
