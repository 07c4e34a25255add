// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use chrono::TimeDelta;
use handsign_core::time::{format_iso8601, now, DateTime};
use handsign_core::utils::Redact;
use handsign_core::{Error, Result, SigningCredential};
use std::fmt::{Debug, Formatter};

/// Credential that holds the access key, secret key and optional session token.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Credential {
    /// Create a long-term credential.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            ..Default::default()
        }
    }

    /// Attach a session token, making this a temporary credential.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set when this credential stops being accepted.
    pub fn with_expires_in(mut self, expires_in: DateTime) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Check the credential can sign a request at `at`.
    ///
    /// Missing key material is `CredentialInvalid`; a credential already
    /// past its expiration is `CredentialExpired`.
    pub fn check(&self, at: DateTime) -> Result<()> {
        if self.access_key_id.is_empty() {
            return Err(Error::credential_invalid("access key id is empty"));
        }
        if self.secret_access_key.is_empty() {
            return Err(Error::credential_invalid(format!(
                "secret access key is empty for access key id {}",
                Redact::from(&self.access_key_id)
            )));
        }
        if let Some(expires_in) = self.expires_in {
            if expires_in <= at {
                return Err(Error::credential_expired(format!(
                    "credential expired at {}",
                    format_iso8601(expires_in)
                )));
            }
        }

        Ok(())
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return false;
        }

        // Reload two minutes early so a request is never signed with a
        // credential that expires in flight.
        match self.expires_in {
            Some(expires_in) => expires_in > now() + TimeDelta::minutes(2),
            None => true,
        }
    }
}
