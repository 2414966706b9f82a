// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge detection.

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};
use reqwest::StatusCode;

/// Whether a response rejects the credential it was sent with.
///
/// Any 403 counts. A 401 counts only when a `WWW-Authenticate` value starts
/// with the scheme name, ignoring case.
pub fn is_challenge(status: StatusCode, headers: &HeaderMap, scheme: &str) -> bool {
    match status {
        StatusCode::FORBIDDEN => true,
        StatusCode::UNAUTHORIZED => headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| starts_with_ignore_case(value.trim_start(), scheme)),
        _ => false,
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn www_authenticate(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn forbidden_is_always_a_challenge() {
        assert!(is_challenge(StatusCode::FORBIDDEN, &HeaderMap::new(), "bread"));
    }

    #[test]
    fn unauthorized_needs_scheme_marker() {
        assert!(is_challenge(
            StatusCode::UNAUTHORIZED,
            &www_authenticate("Bread realm=\"api\""),
            "bread"
        ));
        assert!(is_challenge(
            StatusCode::UNAUTHORIZED,
            &www_authenticate("bread2"),
            "bread"
        ));
        assert!(!is_challenge(
            StatusCode::UNAUTHORIZED,
            &www_authenticate("Basic realm=\"x\""),
            "bread"
        ));
        assert!(!is_challenge(StatusCode::UNAUTHORIZED, &HeaderMap::new(), "bread"));
    }

    #[test]
    fn other_statuses_are_not_challenges() {
        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            assert!(!is_challenge(status, &www_authenticate("bread"), "bread"));
        }
    }

    #[test]
    fn short_header_is_not_a_match() {
        assert!(!is_challenge(
            StatusCode::UNAUTHORIZED,
            &www_authenticate("br"),
            "bread"
        ));
    }
}
