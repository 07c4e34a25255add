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

use handsign_core::{Error, ErrorKind};
use http::StatusCode;
use quick_xml::de;
use serde::Deserialize;

/// An error answered by an AWS REST endpoint.
///
/// ```xml
/// <Error>
///   <Code>SignatureDoesNotMatch</Code>
///   <Message>The request signature we calculated does not match the signature you provided.</Message>
///   <RequestId>4442587FB7D0A2F9</RequestId>
///   <HostId>...</HostId>
/// </Error>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status}: {code}: {message}")]
pub struct ServiceError {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// AWS error code, empty when the body was not an error document.
    pub code: String,
    /// AWS error message, or the raw body.
    pub message: String,
    /// Request id reported by the service.
    pub request_id: Option<String>,
    /// Extended request id reported by S3.
    pub host_id: Option<String>,
    /// Resource the error refers to.
    pub resource: Option<String>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ErrorDocument {
    code: String,
    message: String,
    request_id: Option<String>,
    host_id: Option<String>,
    resource: Option<String>,
}

impl ServiceError {
    /// Decode a failed response.
    ///
    /// Bodies that are not an AWS error document are kept verbatim as the
    /// message.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);

        match de::from_str::<ErrorDocument>(&text) {
            Ok(doc) if !doc.code.is_empty() => Self {
                status,
                code: doc.code,
                message: doc.message,
                request_id: doc.request_id,
                host_id: doc.host_id,
                resource: doc.resource,
            },
            _ => Self {
                status,
                code: String::new(),
                message: text.into_owned(),
                request_id: None,
                host_id: None,
                resource: None,
            },
        }
    }

    /// Classify the error code.
    pub fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            "SignatureDoesNotMatch"
            | "InvalidRequest"
            | "AuthorizationHeaderMalformed"
            | "MissingSecurityHeader"
            | "RequestTimeTooSkewed" => ErrorKind::RequestInvalid,
            "ExpiredToken" | "TokenRefreshRequired" => ErrorKind::CredentialExpired,
            "InvalidAccessKeyId" | "InvalidToken" | "InvalidClientTokenId" => {
                ErrorKind::CredentialInvalid
            }
            "AccessDenied" => ErrorKind::CredentialDenied,
            _ => ErrorKind::Unexpected,
        }
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        let message = if err.code.is_empty() {
            format!("service responded {}: {}", err.status, err.message)
        } else {
            format!(
                "service responded {}: {}: {}",
                err.status, err.code, err.message
            )
        };
        Error::new(err.kind(), message).with_source(err)
    }
}
