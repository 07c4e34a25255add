use crate::{Error, Result};
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;
use std::borrow::Cow;
use std::mem;
use std::str::FromStr;
use std::time::Duration;

/// A request taken apart for signing.
///
/// [`SigningRequest::build`] moves the uri and headers out of
/// `http::request::Parts`, the signer edits them, and
/// [`SigningRequest::apply`] moves them back. Query pairs are held decoded
/// until a signer replaces them with their canonical encoded form.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as it appeared in the uri.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Take the signable pieces out of `parts`.
    ///
    /// Fails if the uri has no authority: there is no host to sign.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let authority = uri.authority.ok_or_else(|| {
            Error::request_invalid("request without authority is invalid for signing")
        })?;

        let path = match paq.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority,
            path,
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Put the (possibly modified) pieces back into `parts`.
    ///
    /// Query pairs are written as-is, so they must already be encoded.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size() + self.query.len() * 2;
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;

        let mut paq = self.path;
        if !self.query.is_empty() {
            paq.reserve(query_size);
            paq.push('?');
            for (i, (k, v)) in self.query.iter().enumerate() {
                if i > 0 {
                    paq.push('&');
                }
                paq.push_str(k);
                if !v.is_empty() {
                    paq.push('=');
                    paq.push_str(v);
                }
            }
        }

        let mut uri = mem::take(&mut parts.uri).into_parts();
        uri.scheme = Some(self.scheme);
        uri.authority = Some(self.authority);
        uri.path_and_query = Some(PathAndQuery::from_str(&paq)?);
        parts.uri = Uri::from_parts(uri)?;

        Ok(())
    }

    /// The path with percent-escapes decoded.
    ///
    /// Escapes that decode to invalid UTF-8 make the request invalid.
    pub fn path_percent_decoded(&self) -> Result<Cow<'_, str>> {
        percent_encoding::percent_decode_str(&self.path)
            .decode_utf8()
            .map_err(|e| {
                Error::request_invalid(format!("request path {} is not valid utf-8", self.path))
                    .with_source(e)
            })
    }

    /// Total bytes of query keys and values.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Push a new query pair.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Normalize a header value for signing: trim surrounding spaces and
    /// collapse every interior run of spaces to one.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();
        let trimmed = bs.trim_ascii();
        if trimmed.len() == bs.len() && !trimmed.windows(2).any(|w| w == b"  ") {
            return;
        }

        let mut out = Vec::with_capacity(trimmed.len());
        for &b in trimmed {
            if b == b' ' && out.last() == Some(&b' ') {
                continue;
            }
            out.push(b);
        }

        let sensitive = v.is_sensitive();
        // Only spaces were removed from an already valid value.
        if let Ok(mut nv) = HeaderValue::from_bytes(&out) {
            nv.set_sensitive(sensitive);
            *v = nv;
        }
    }

    /// Header names, lowercase and sorted.
    ///
    /// `HeaderMap` already stores names lowercased.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }

    /// All values of one header joined by `,`, in insertion order.
    pub fn header_value_joined(&self, name: &str) -> Result<String> {
        let mut joined = String::new();
        for (i, v) in self.headers.get_all(name).iter().enumerate() {
            if i > 0 {
                joined.push(',');
            }
            joined.push_str(v.to_str()?);
        }
        Ok(joined)
    }
}

/// Where the signature goes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SigningMethod {
    /// In the `Authorization` header.
    Header,
    /// In the query string, valid for the given duration.
    Query(Duration),
}

impl From<Option<Duration>> for SigningMethod {
    fn from(expires_in: Option<Duration>) -> Self {
        match expires_in {
            Some(d) => SigningMethod::Query(d),
            None => SigningMethod::Header,
        }
    }
}
