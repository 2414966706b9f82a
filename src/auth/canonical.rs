// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical request string.
//!
//! The server re-derives this exact byte string to verify a signature:
//!
//! ```text
//! METHOD\nBODY_DIGEST_OR_EMPTY\nCONTENT_TYPE\nDATE\nPATH[?QUERY]
//! ```
//!
//! The body digest (Base58 of SHA-256 over the raw body) is present only for
//! POST, PUT and PATCH with a non-empty body. Field order and the digest
//! rule are a compatibility contract with the server.

use chrono::{DateTime, Utc};
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

/// `Date` header format (RFC 1123, always GMT).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Fields of the string that gets signed. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub method: String,
    pub body_digest: String,
    pub content_type: String,
    pub date: String,
    pub path: String,
}

impl CanonicalRequest {
    pub fn build(method: &Method, body: &[u8], content_type: &str, date: &str, path: &str) -> Self {
        let body_digest = if carries_body(method) && !body.is_empty() {
            body_digest(body)
        } else {
            String::new()
        };

        Self {
            method: method.as_str().to_string(),
            body_digest,
            content_type: content_type.to_string(),
            date: date.to_string(),
            path: path.to_string(),
        }
    }

    /// The newline-joined string that is signed.
    pub fn signing_string(&self) -> String {
        [
            self.method.as_str(),
            self.body_digest.as_str(),
            self.content_type.as_str(),
            self.date.as_str(),
            self.path.as_str(),
        ]
        .join("\n")
    }
}

fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

/// Base58 encoded SHA-256 of `body`.
pub fn body_digest(body: &[u8]) -> String {
    bs58::encode(Sha256::digest(body)).into_string()
}

/// Format a timestamp for the `Date` header.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Resource path plus query exactly as it goes on the wire.
pub fn resource_path(url: &Url) -> String {
    match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DATE: &str = "Tue, 01 Jan 2019 00:00:00 GMT";

    #[test]
    fn get_with_empty_body_is_literal() {
        let canonical = CanonicalRequest::build(&Method::GET, b"", "", DATE, "/v1/foo");
        assert_eq!(
            canonical.signing_string(),
            "GET\n\n\nTue, 01 Jan 2019 00:00:00 GMT\n/v1/foo"
        );
    }

    #[test]
    fn post_body_digest_is_second_field() {
        let canonical =
            CanonicalRequest::build(&Method::POST, b"{}", "application/json", DATE, "/v1/foo");
        let signing = canonical.signing_string();
        let fields: Vec<&str> = signing.split('\n').collect();

        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1], body_digest(b"{}"));
        assert_ne!(fields[1], body_digest(b"{ }"));
        assert_ne!(fields[1], body_digest(b""));
        assert_eq!(fields[2], "application/json");
    }

    #[test]
    fn digest_matches_base58_sha256() {
        // sha256("{}") = 44136fa3...
        let expected = bs58::encode(Sha256::digest(b"{}")).into_string();
        assert_eq!(body_digest(b"{}"), expected);
    }

    #[test]
    fn bodyless_methods_never_digest() {
        for method in [Method::GET, Method::DELETE, Method::HEAD] {
            let canonical = CanonicalRequest::build(&method, b"{}", "", DATE, "/x");
            assert_eq!(canonical.body_digest, "", "{method}");
        }
    }

    #[test]
    fn empty_body_has_no_digest_even_for_post() {
        let canonical = CanonicalRequest::build(&Method::PUT, b"", "", DATE, "/x");
        assert_eq!(canonical.body_digest, "");
    }

    #[test]
    fn http_date_is_rfc1123_gmt() {
        let at = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_http_date(at), DATE);
    }

    #[test]
    fn resource_path_keeps_query() {
        let url = Url::parse("https://api.example.com/v1/foo?a=1&b=two%20words").unwrap();
        assert_eq!(resource_path(&url), "/v1/foo?a=1&b=two%20words");

        let bare = Url::parse("https://api.example.com/v1/foo").unwrap();
        assert_eq!(resource_path(&bare), "/v1/foo");
    }
}
