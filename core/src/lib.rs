//! Core building blocks for hand-rolled request signing.
//!
//! `handsign-core` holds everything a service signer needs that is not
//! specific to one cloud vendor:
//!
//! - [`Context`]: the bundle of environment, file and HTTP implementations
//!   that credential providers run against.
//! - [`ProvideCredential`] / [`SignRequest`] / [`SigningCredential`]: the
//!   seams between "where do credentials come from" and "how is a request
//!   signed".
//! - [`Signer`]: caches a credential and drives a [`SignRequest`].
//! - [`SigningRequest`]: a mutable, decomposed view of
//!   `http::request::Parts` that signers canonicalize.
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use handsign_core::{Context, ProvideCredential, Result, SignRequest, Signer, SigningCredential};
//! use http::request::Parts;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! struct Token(String);
//!
//! impl SigningCredential for Token {
//!     fn is_valid(&self) -> bool {
//!         !self.0.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct StaticToken;
//!
//! #[async_trait]
//! impl ProvideCredential for StaticToken {
//!     type Credential = Token;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
//!         Ok(Some(Token("secret".to_string())))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct BearerSigner;
//!
//! #[async_trait]
//! impl SignRequest for BearerSigner {
//!     type Credential = Token;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut Parts,
//!         cred: Option<&Token>,
//!         _: Option<Duration>,
//!     ) -> Result<()> {
//!         if let Some(cred) = cred {
//!             req.headers
//!                 .insert(http::header::AUTHORIZATION, format!("Bearer {}", cred.0).parse()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let signer = Signer::new(Context::new(), StaticToken, BearerSigner);
//! let (mut parts, _) = http::Request::get("https://example.com/").body(())?.into_parts();
//! signer.sign(&mut parts, None).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};

mod context;
pub use context::{
    Context, Env, FileRead, HttpSend, NoopEnv, NoopFileRead, NoopHttpSend, OsEnv, StaticEnv,
};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod chain;
pub use chain::ProvideCredentialChain;
mod request;
pub use request::{SigningMethod, SigningRequest};
mod signer;
pub use signer::Signer;
