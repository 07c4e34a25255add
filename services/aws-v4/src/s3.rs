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

//! S3 `ListBuckets`, signed by hand.

use crate::constants::{EMPTY_STRING_SHA256, X_AMZ_CONTENT_SHA_256};
use crate::{Credential, ServiceError};
use bytes::Bytes;
use handsign_core::{Context, Error, Result, Signer};
use http::{Method, Request, StatusCode};
use log::debug;
use quick_xml::de;
use serde::Deserialize;

/// The global S3 endpoint.
pub const S3_ENDPOINT: &str = "https://s3.amazonaws.com/";

/// Owner of the listed buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    /// Canonical user id.
    pub id: String,
    /// Display name, empty in regions that no longer return it.
    pub display_name: String,
}

/// One bucket of a `ListBuckets` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation time as returned by S3, ISO 8601.
    pub creation_date: String,
}

/// Decoded `ListAllMyBucketsResult`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketsOutput {
    /// Owner of the buckets.
    pub owner: Option<Owner>,
    /// Buckets in the order S3 returned them.
    pub buckets: Vec<Bucket>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ListAllMyBucketsResult {
    owner: Option<OwnerXml>,
    buckets: BucketsXml,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct OwnerXml {
    #[serde(rename = "ID")]
    id: String,
    display_name: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct BucketsXml {
    bucket: Vec<BucketXml>,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct BucketXml {
    name: String,
    creation_date: String,
}

/// Build the unsigned `GET /` request against `endpoint`.
///
/// The empty-payload hash is already set, so the request can be signed
/// through [`Signer::sign`] as is.
pub fn list_buckets_request(endpoint: &str) -> Result<Request<Bytes>> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(endpoint)
        .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
        .body(Bytes::new())?;
    Ok(req)
}

/// Decode a `ListAllMyBucketsResult` document.
pub fn parse_list_buckets(xml: &[u8]) -> Result<ListBucketsOutput> {
    let text = String::from_utf8_lossy(xml);
    let result: ListAllMyBucketsResult = de::from_str(&text).map_err(|e| {
        Error::unexpected("failed to parse ListAllMyBucketsResult").with_source(e)
    })?;

    Ok(ListBucketsOutput {
        owner: result.owner.map(|o| Owner {
            id: o.id,
            display_name: o.display_name,
        }),
        buckets: result
            .buckets
            .bucket
            .into_iter()
            .map(|b| Bucket {
                name: b.name,
                creation_date: b.creation_date,
            })
            .collect(),
    })
}

/// Sign and send `ListBuckets`.
///
/// A non-200 answer is decoded into a [`ServiceError`] and returned as a
/// core error of the matching kind. The request is sent once.
pub async fn list_buckets(
    ctx: &Context,
    signer: &Signer<Credential>,
    endpoint: &str,
) -> Result<ListBucketsOutput> {
    let (mut parts, body) = list_buckets_request(endpoint)?.into_parts();
    signer.sign(&mut parts, None).await?;
    let req = Request::from_parts(parts, body);

    debug!("sending ListBuckets to {endpoint}");
    let resp = ctx.http_send(req).await?;
    let status = resp.status();
    if status != StatusCode::OK {
        return Err(ServiceError::from_response(status, resp.body()).into());
    }

    let output = parse_list_buckets(resp.body())?;
    debug!("ListBuckets returned {} buckets", output.buckets.len());
    Ok(output)
}
