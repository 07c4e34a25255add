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

use crate::{constants::*, Credential};
use async_trait::async_trait;
use handsign_core::{Context, ProvideCredential, Result};
use log::debug;

/// EnvCredentialProvider loads AWS credentials from environment variables.
///
/// - `AWS_ACCESS_KEY_ID`
/// - `AWS_SECRET_ACCESS_KEY`
/// - `AWS_SESSION_TOKEN` (optional)
///
/// Both keys must be set and non-empty, otherwise nothing is provided.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialProvider;

impl EnvCredentialProvider {
    /// Create a new EnvCredentialProvider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let non_empty = |key: &str| ctx.env_var(key).filter(|v| !v.is_empty());

        let (Some(ak), Some(sk)) = (non_empty(AWS_ACCESS_KEY_ID), non_empty(AWS_SECRET_ACCESS_KEY))
        else {
            debug!("{AWS_ACCESS_KEY_ID} or {AWS_SECRET_ACCESS_KEY} not set");
            return Ok(None);
        };

        let mut cred = Credential::new(ak, sk);
        cred.session_token = non_empty(AWS_SESSION_TOKEN);
        Ok(Some(cred))
    }
}
