use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use handsign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use handsign_core::time::{format_date, format_iso8601, now, DateTime};
use handsign_core::utils::Redact;
use handsign_core::{Context, Error, Result, SignRequest, SigningMethod, SigningRequest};
use http::header::{self, HeaderName};
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Uri};
use log::debug;
use percent_encoding::utf8_percent_encode;
use std::fmt::{self, Debug, Display, Formatter, Write};
use std::sync::Mutex;
use std::time::Duration;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// The signer is bound to one service and region. It keeps the most recent
/// signing key and derives a new one only when the secret or the date
/// changes.
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
    signing_key: Mutex<Option<SigningKeyCache>>,
}

struct SigningKeyCache {
    secret_access_key: String,
    date: String,
    key: Vec<u8>,
}

impl Debug for RequestSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("service", &self.service)
            .field("region", &self.region)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

/// The outcome of signing: the hex signature and every value it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Hex encoded HMAC-SHA256 of the string to sign.
    pub signature: String,
    /// Credential scope, `<date>/<region>/<service>/aws4_request`.
    pub scope: String,
    /// Lowercase header names in signing order.
    pub signed_headers: Vec<String>,
    /// The rendered canonical request.
    pub canonical_request: String,
    /// The rendered string to sign.
    pub string_to_sign: String,
}

impl Signature {
    /// Render the `Authorization` header value for this signature.
    pub fn authorization(&self, access_key_id: &str) -> String {
        format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
            access_key_id,
            self.scope,
            self.signed_headers.join(";"),
            self.signature
        )
    }
}

/// What [`RequestSigner::sign_headers`] returns.
#[derive(Debug, Clone)]
pub struct SigningOutput {
    /// Value for the `Authorization` header.
    pub authorization: String,
    /// Headers the caller must set on the outgoing request, sorted by name.
    ///
    /// Each replaces any caller value of the same name.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// The signature and its intermediates.
    pub signature: Signature,
}

impl RequestSigner {
    /// Create a new signer for `service` in `region`.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            time: None,
            signing_key: Mutex::new(None),
        }
    }

    /// Pin the signing time.
    ///
    /// Requests are signed with the current time unless this is set.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Compute the `Authorization` header and the extra headers for a request
    /// without touching it.
    ///
    /// Query parameters are read from `uri`. The returned headers are the
    /// ones the signer sets: `host` when missing, `x-amz-date`,
    /// `x-amz-content-sha256` and `x-amz-security-token` for temporary
    /// credentials. Caller headers are never echoed back, even when their
    /// values were normalized for signing.
    pub fn sign_headers(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        payload: &[u8],
        cred: &Credential,
    ) -> Result<SigningOutput> {
        let mut parts = http::Request::builder()
            .method(method.clone())
            .uri(uri.clone())
            .body(())?
            .into_parts()
            .0;
        parts.headers = headers.clone();
        parts.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&hex_sha256(payload))?,
        );

        let now = self.now();
        cred.check(now)?;
        let mut req = SigningRequest::build(&mut parts)?;
        let signature = self.calculate(&mut req, cred, SigningMethod::Header, now)?;

        let set_by_signer = |name: &HeaderName| match name.as_str() {
            X_AMZ_DATE | X_AMZ_CONTENT_SHA_256 => true,
            X_AMZ_SECURITY_TOKEN => cred.session_token.is_some(),
            _ => !headers.contains_key(name),
        };
        let mut extra: Vec<(HeaderName, HeaderValue)> = req
            .headers
            .iter()
            .filter(|(k, _)| set_by_signer(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        extra.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        Ok(SigningOutput {
            authorization: signature.authorization(&cred.access_key_id),
            headers: extra,
            signature,
        })
    }

    /// Sign `req` in place with the hash of `payload` as its body hash.
    pub fn sign_with_payload(
        &self,
        req: &mut Parts,
        payload: &[u8],
        cred: &Credential,
    ) -> Result<Signature> {
        req.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&hex_sha256(payload))?,
        );
        self.sign_parts(req, cred, SigningMethod::Header)
    }

    /// Sign `req` in place.
    ///
    /// With [`SigningMethod::Header`] the `Authorization` header is set; an
    /// `x-amz-content-sha256` header already on the request is taken as the
    /// payload hash, otherwise the body is treated as empty. With
    /// [`SigningMethod::Query`] the signature goes into the query string.
    ///
    /// On error `req` is left as it was.
    pub fn sign_parts(
        &self,
        req: &mut Parts,
        cred: &Credential,
        method: SigningMethod,
    ) -> Result<Signature> {
        let now = self.now();
        cred.check(now)?;
        if let SigningMethod::Query(expires_in) = method {
            check_expires_in(expires_in)?;
        }

        let uri = req.uri.clone();
        let headers = req.headers.clone();
        let result = self.sign_parts_inner(req, cred, method, now);
        if result.is_err() {
            req.uri = uri;
            req.headers = headers;
        }
        result
    }

    fn sign_parts_inner(
        &self,
        req: &mut Parts,
        cred: &Credential,
        method: SigningMethod,
        now: DateTime,
    ) -> Result<Signature> {
        let mut signed_req = SigningRequest::build(req)?;
        if method == SigningMethod::Header
            && signed_req.headers.get(X_AMZ_CONTENT_SHA_256).is_none()
        {
            signed_req.headers.insert(
                X_AMZ_CONTENT_SHA_256,
                HeaderValue::from_static(EMPTY_STRING_SHA256),
            );
        }

        let signature = self.calculate(&mut signed_req, cred, method, now)?;

        match method {
            SigningMethod::Header => {
                let mut authorization =
                    HeaderValue::from_str(&signature.authorization(&cred.access_key_id))?;
                authorization.set_sensitive(true);
                signed_req
                    .headers
                    .insert(header::AUTHORIZATION, authorization);
            }
            SigningMethod::Query(_) => {
                signed_req.query_push(X_AMZ_SIGNATURE, signature.signature.clone());
            }
        }

        signed_req.apply(req)?;
        Ok(signature)
    }

    fn now(&self) -> DateTime {
        self.time.unwrap_or_else(now)
    }

    /// Canonicalize `req`, then derive the signature for it.
    fn calculate(
        &self,
        req: &mut SigningRequest,
        cred: &Credential,
        method: SigningMethod,
        now: DateTime,
    ) -> Result<Signature> {
        canonicalize_header(req, cred, method, now)?;
        canonicalize_query(req, cred, method, now, &self.service, &self.region)?;

        let creq = CanonicalRequest::from_signing_request(req)?;
        let canonical_request = creq.to_string();
        debug!("calculated canonical request: {}", creq.redacted());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/{AWS4_REQUEST}",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::with_capacity(128);
            writeln!(f, "{ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{scope}")?;
            write!(f, "{}", hex_sha256(canonical_request.as_bytes()))?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = self.signing_key(&cred.secret_access_key, now);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        Ok(Signature {
            signature,
            scope,
            signed_headers: creq.signed_headers,
            canonical_request,
            string_to_sign,
        })
    }

    /// Signing key for `secret` on the date of `now`, reusing the cached one
    /// when it matches.
    fn signing_key(&self, secret: &str, now: DateTime) -> Vec<u8> {
        let date = format_date(now);
        let mut cache = match self.signing_key.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(cached) = cache.as_ref() {
            if cached.secret_access_key == secret && cached.date == date {
                return cached.key.clone();
            }
        }

        debug!(
            "deriving signing key for {}/{}/{}",
            date, self.region, self.service
        );
        let key = generate_signing_key(secret, &date, &self.region, &self.service);
        *cache = Some(SigningKeyCache {
            secret_access_key: secret.to_string(),
            date,
            key: key.clone(),
        });
        key
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            debug!(
                "no credential for {} {}, sending request unsigned",
                req.method, req.uri
            );
            return Ok(());
        };

        self.sign_parts(req, cred, expires_in.into()).map(|_| ())
    }
}

/// The normalized form of a request that SigV4 signs.
///
/// Rendered with `Display` as the newline-joined canonical request string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Uppercase HTTP method.
    pub method: String,
    /// URI-encoded path.
    pub path: String,
    /// Encoded query pairs, sorted.
    pub query: Vec<(String, String)>,
    /// Lowercase header names with their normalized, joined values, sorted.
    pub headers: Vec<(String, String)>,
    /// Header names in signing order.
    pub signed_headers: Vec<String>,
    /// Hex payload hash or `UNSIGNED-PAYLOAD`.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Build from a request whose headers and query are already canonicalized.
    fn from_signing_request(req: &SigningRequest) -> Result<Self> {
        let path = req.path_percent_decoded()?;
        let path = utf8_percent_encode(&path, &AWS_URI_ENCODE_SET).to_string();

        let signed_headers: Vec<String> = req
            .header_name_to_vec_sorted()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut headers = Vec::with_capacity(signed_headers.len());
        for name in &signed_headers {
            headers.push((name.clone(), req.header_value_joined(name)?));
        }

        let payload_hash = match req.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => v.to_str()?.to_string(),
            None => UNSIGNED_PAYLOAD.to_string(),
        };

        Ok(Self {
            method: req.method.as_str().to_ascii_uppercase(),
            path,
            query: req.query.clone(),
            headers,
            signed_headers,
            payload_hash,
        })
    }

    fn redacted(&self) -> RedactedCanonicalRequest<'_> {
        RedactedCanonicalRequest(self)
    }

    fn write_to(&self, f: &mut impl Write, redact: bool) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            if i > 0 {
                f.write_char('&')?;
            }
            if redact && k == X_AMZ_SECURITY_TOKEN_QUERY {
                write!(f, "{k}={}", Redact::from(v))?;
            } else {
                write!(f, "{k}={v}")?;
            }
        }
        writeln!(f)?;
        for (k, v) in &self.headers {
            if redact && k == X_AMZ_SECURITY_TOKEN {
                writeln!(f, "{k}:{}", Redact::from(v))?;
            } else {
                writeln!(f, "{k}:{v}")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers.join(";"))?;
        write!(f, "{}", self.payload_hash)
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_to(f, false)
    }
}

struct RedactedCanonicalRequest<'a>(&'a CanonicalRequest);

impl Display for RedactedCanonicalRequest<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.write_to(f, true)
    }
}

const PRESIGN_QUERY_PARAMS: [&str; 7] = [
    X_AMZ_ALGORITHM,
    X_AMZ_CREDENTIAL,
    X_AMZ_DATE_QUERY,
    X_AMZ_EXPIRES,
    X_AMZ_SIGNED_HEADERS,
    X_AMZ_SECURITY_TOKEN_QUERY,
    X_AMZ_SIGNATURE,
];

fn check_expires_in(expires_in: Duration) -> Result<()> {
    if expires_in < Duration::from_secs(1) || expires_in > MAX_PRESIGN_EXPIRES {
        return Err(Error::request_invalid(format!(
            "presign expiry must be between 1 second and 7 days, got {}s",
            expires_in.as_secs()
        )));
    }
    Ok(())
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    cred: &Credential,
    method: SigningMethod,
    now: DateTime,
) -> Result<()> {
    // A stale signature must not be signed into the new one.
    ctx.headers.remove(header::AUTHORIZATION);

    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value);
        value.to_str()?;
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers
            .insert(header::HOST, HeaderValue::from_str(ctx.authority.as_str())?);
    }

    if method == SigningMethod::Header {
        // The scope date and the request date must agree, so the signing
        // time always wins over a caller supplied value.
        ctx.headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token)?;
            value.set_sensitive(true);
            ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }
    }

    Ok(())
}

fn canonicalize_query(
    ctx: &mut SigningRequest,
    cred: &Credential,
    method: SigningMethod,
    now: DateTime,
    service: &str,
    region: &str,
) -> Result<()> {
    if let SigningMethod::Query(expire) = method {
        // Parameters of an earlier presign are replaced, not repeated.
        ctx.query.retain(|(k, _)| !PRESIGN_QUERY_PARAMS.contains(&k.as_str()));

        ctx.query_push(X_AMZ_ALGORITHM, ALGORITHM);
        ctx.query_push(
            X_AMZ_CREDENTIAL,
            format!(
                "{}/{}/{}/{}/{AWS4_REQUEST}",
                cred.access_key_id,
                format_date(now),
                region,
                service
            ),
        );
        ctx.query_push(X_AMZ_DATE_QUERY, format_iso8601(now));
        ctx.query_push(X_AMZ_EXPIRES, expire.as_secs().to_string());
        let signed_headers = ctx.header_name_to_vec_sorted().join(";");
        ctx.query_push(X_AMZ_SIGNED_HEADERS, signed_headers);

        if let Some(token) = &cred.session_token {
            ctx.query_push(X_AMZ_SECURITY_TOKEN_QUERY, token.as_str());
        }
    }

    if ctx.query.is_empty() {
        return Ok(());
    }

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
    // Sort by encoded name, then by encoded value.
    ctx.query.sort();

    Ok(())
}

/// Derive the SigV4 signing key.
///
/// `date` is the `YYYYMMDD` form of the signing time.
pub fn generate_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), date.as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), AWS4_REQUEST.as_bytes())
}
