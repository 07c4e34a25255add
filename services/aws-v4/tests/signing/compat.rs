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

//! Cross-check against the official `aws-sigv4` implementation.

use super::*;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SignatureLocation,
    SigningSettings,
};
use aws_sigv4::sign::v4;
use handsign_aws_v4::constants::X_AMZ_CONTENT_SHA_256;
use handsign_core::hash::hex_sha256;
use handsign_core::time::now;
use handsign_core::SignRequest;
use http::{header, HeaderValue, Request};
use pretty_assertions::assert_eq;
use std::time::{Duration, SystemTime};
use test_case::test_case;

fn get_request() -> Request<&'static str> {
    Request::get("http://127.0.0.1:9000/hello").body("").unwrap()
}

fn get_request_with_sse() -> Request<&'static str> {
    Request::get("http://127.0.0.1:9000/hello")
        .header("x-amz-server-side-encryption", "a")
        .header("x-amz-server-side-encryption-customer-algorithm", "b")
        .header("x-amz-server-side-encryption-customer-key", "c")
        .header("x-amz-server-side-encryption-customer-key-md5", "d")
        .header("x-amz-server-side-encryption-aws-kms-key-id", "e")
        .body("")
        .unwrap()
}

fn get_request_with_query() -> Request<&'static str> {
    Request::get(
        "http://127.0.0.1:9000/hello?list-type=2&max-keys=3&prefix=CI/&start-after=ExampleGuide.pdf",
    )
    .body("")
    .unwrap()
}

fn get_request_virtual_host() -> Request<&'static str> {
    Request::get("http://hello.s3.test.example.com/")
        .body("")
        .unwrap()
}

fn put_request() -> Request<&'static str> {
    let content = "Hello,World!";
    Request::put("http://127.0.0.1:9000/hello")
        .header(header::CONTENT_LENGTH, content.len())
        .body(content)
        .unwrap()
}

fn put_request_with_body_digest() -> Request<&'static str> {
    let content = "Hello,World!";
    Request::put("http://127.0.0.1:9000/hello")
        .header(header::CONTENT_LENGTH, content.len())
        .header(X_AMZ_CONTENT_SHA_256, hex_sha256(content.as_bytes()))
        .body(content)
        .unwrap()
}

fn put_request_virtual_host() -> Request<&'static str> {
    let content = "Hello,World!";
    Request::put("http://hello.s3.test.example.com/")
        .header(header::CONTENT_LENGTH, content.len())
        .body(content)
        .unwrap()
}

/// Sign `req` with `aws-sigv4`.
fn sign_with_aws_sigv4(
    mut req: Request<&'static str>,
    token: Option<&str>,
    expires_in: Option<Duration>,
    time: SystemTime,
) -> Request<&'static str> {
    let mut ss = SigningSettings::default();
    ss.percent_encoding_mode = PercentEncodingMode::Double;
    ss.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    if let Some(expires_in) = expires_in {
        ss.signature_location = SignatureLocation::QueryParams;
        ss.expires_in = Some(expires_in);
    }

    let id = Credentials::new(
        "access_key_id",
        "secret_access_key",
        token.map(str::to_string),
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region("test")
        .name("s3")
        .time(time)
        .settings(ss)
        .build()
        .expect("signing params must be valid");

    // Header signing always hashes the body; query signing only when the
    // caller asked for it.
    let body = if expires_in.is_none() || req.headers().contains_key(X_AMZ_CONTENT_SHA_256) {
        SignableBody::Bytes(req.body().as_bytes())
    } else {
        SignableBody::UnsignedPayload
    };

    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            req.method().as_str(),
            req.uri().to_string(),
            req.headers()
                .iter()
                .map(|(k, v)| (k.as_str(), std::str::from_utf8(v.as_bytes()).unwrap())),
            body,
        )
        .unwrap(),
        &sp.into(),
    )
    .expect("signing must succeed");
    let (aws_sig, _) = output.into_parts();
    aws_sig.apply_to_request_http1x(&mut req);
    req
}

/// Sign `req` with [`RequestSigner`].
async fn sign_with_handsign(
    req: Request<&'static str>,
    token: Option<&str>,
    expires_in: Option<Duration>,
    time: DateTime,
) -> Request<&'static str> {
    let mut cred = Credential::new("access_key_id", "secret_access_key");
    cred.session_token = token.map(str::to_string);
    let signer = RequestSigner::new("s3", "test").with_time(time);

    let (mut parts, body) = req.into_parts();
    match expires_in {
        None => {
            signer
                .sign_with_payload(&mut parts, body.as_bytes(), &cred)
                .expect("signing must succeed");
        }
        Some(_) => {
            signer
                .sign_request(&Context::new(), &mut parts, Some(&cred), expires_in)
                .await
                .expect("signing must succeed");
        }
    }
    Request::from_parts(parts, body)
}

#[track_caller]
fn compare_request(name: &str, l: &Request<&str>, r: &Request<&str>) {
    fn format_headers(req: &Request<&str>) -> Vec<String> {
        let mut hs = req
            .headers()
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.to_str().expect("must be valid")))
            .collect::<Vec<_>>();

        // aws-sigv4 signs the host without adding the header.
        let host = format!("host:{}", req.uri().authority().unwrap());
        if !hs.contains(&host) {
            hs.push(host)
        }

        hs.sort();
        hs.dedup();
        hs
    }

    assert_eq!(format_headers(l), format_headers(r), "{name} header mismatch");

    fn format_query(req: &Request<&str>) -> Vec<String> {
        let query = req.uri().query().unwrap_or_default();
        let mut query = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| format!("{}={}", &k, &v))
            .collect::<Vec<_>>();
        query.sort();
        query
    }

    assert_eq!(format_query(l), format_query(r), "{name} query mismatch");
}

#[test_case(get_request; "get")]
#[test_case(get_request_with_sse; "get with sse")]
#[test_case(get_request_with_query; "get with query")]
#[test_case(get_request_virtual_host; "get virtual host")]
#[test_case(put_request; "put")]
#[test_case(put_request_with_body_digest; "put with body digest")]
#[test_case(put_request_virtual_host; "put virtual host")]
#[tokio::test]
async fn test_matches_aws_sigv4(req_fn: fn() -> Request<&'static str>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let time = now();
    for token in [None, Some("security_token")] {
        for expires_in in [None, Some(Duration::from_secs(3600))] {
            let name = format!(
                "{} {} token={token:?} expires_in={expires_in:?}",
                req_fn().method(),
                req_fn().uri()
            );

            let expected = sign_with_aws_sigv4(req_fn(), token, expires_in, SystemTime::from(time));
            let actual = sign_with_handsign(req_fn(), token, expires_in, time).await;

            compare_request(&name, &expected, &actual);
        }
    }
}

#[test]
fn test_header_value_is_sensitive() {
    let (mut parts, _) = get_request().into_parts();
    let cred = Credential::new("access_key_id", "secret_access_key").with_session_token("t");
    RequestSigner::new("s3", "test")
        .sign_with_payload(&mut parts, b"", &cred)
        .unwrap();

    let token: &HeaderValue = &parts.headers["x-amz-security-token"];
    assert!(token.is_sensitive());
    assert!(parts.headers[header::AUTHORIZATION].is_sensitive());
}
