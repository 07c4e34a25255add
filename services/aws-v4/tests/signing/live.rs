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

//! Requests against real S3, enabled with `HANDSIGN_AWS_V4_TEST=on`.

use super::*;
use bytes::Bytes;
use handsign_aws_v4::constants::X_AMZ_CONTENT_SHA_256;
use handsign_aws_v4::s3;
use handsign_core::hash::hex_sha256;
use http::{Request, StatusCode};
use log::warn;
use std::time::Duration;

fn object_url(test: &LiveTest, key: &str) -> String {
    format!("{}/{key}", test.url.trim_end_matches('/'))
}

async fn send(test: &LiveTest, req: Request<Bytes>, expires_in: Option<Duration>) -> StatusCode {
    let (mut parts, body) = req.into_parts();
    test.signer
        .sign(&mut parts, expires_in)
        .await
        .expect("signing must succeed");

    test.ctx
        .http_send(Request::from_parts(parts, body))
        .await
        .expect("request must be sent")
        .status()
}

#[tokio::test]
async fn test_list_buckets() {
    let Some(test) = init_live_test().await else {
        warn!("HANDSIGN_AWS_V4_TEST is not set, skipped");
        return;
    };

    let output = s3::list_buckets(&test.ctx, &test.signer, s3::S3_ENDPOINT)
        .await
        .expect("ListBuckets must succeed");
    assert!(output.owner.is_some());
}

#[tokio::test]
async fn test_head_missing_object() {
    let Some(test) = init_live_test().await else {
        warn!("HANDSIGN_AWS_V4_TEST is not set, skipped");
        return;
    };

    let req = Request::head(object_url(&test, "not_exist_file"))
        .body(Bytes::new())
        .unwrap();
    assert_eq!(send(&test, req, None).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_then_presigned_get() {
    let Some(test) = init_live_test().await else {
        warn!("HANDSIGN_AWS_V4_TEST is not set, skipped");
        return;
    };

    let content = Bytes::from_static(b"Hello, handsign!");
    let url = object_url(&test, "handsign_live_test");

    let req = Request::put(&url)
        .header(http::header::CONTENT_LENGTH, content.len())
        .header(X_AMZ_CONTENT_SHA_256, hex_sha256(&content))
        .body(content.clone())
        .unwrap();
    assert_eq!(send(&test, req, None).await, StatusCode::OK);

    let (mut parts, _) = Request::get(&url).body(()).unwrap().into_parts();
    test.signer
        .sign(&mut parts, Some(Duration::from_secs(3600)))
        .await
        .expect("presign must succeed");
    assert!(parts.headers.get(http::header::AUTHORIZATION).is_none());

    // The presigned url alone must be enough.
    let resp = reqwest::get(parts.uri.to_string())
        .await
        .expect("request must be sent");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.bytes().await.unwrap(), content);
}

#[tokio::test]
async fn test_wrong_region_is_rejected() {
    let Some(test) = init_live_test().await else {
        warn!("HANDSIGN_AWS_V4_TEST is not set, skipped");
        return;
    };

    let region = if test.region == "us-west-2" {
        "eu-west-1"
    } else {
        "us-west-2"
    };
    let signer = Signer::new(
        test.ctx.clone(),
        DefaultCredentialProvider::new(),
        RequestSigner::new("s3", region),
    );

    let (mut parts, body) = Request::head(object_url(&test, "not_exist_file"))
        .body(Bytes::new())
        .unwrap()
        .into_parts();
    signer.sign(&mut parts, None).await.unwrap();
    let resp = test
        .ctx
        .http_send(Request::from_parts(parts, body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
