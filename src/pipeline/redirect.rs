// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Manual redirect handling.
//!
//! Signatures bind the path, so a followed redirect is a new request that
//! has to be signed again. Only same-origin hops are followed; anything else
//! is handed back to the caller as is.

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, LOCATION};
use reqwest::{Method, StatusCode};
use url::Url;

use super::ApiRequest;

/// Absolute redirect target of a followable response, if any.
pub fn redirect_target(base: &Url, status: StatusCode, headers: &HeaderMap) -> Option<Url> {
    if !is_followable(status) {
        return None;
    }
    let location = headers.get(LOCATION)?.to_str().ok()?;
    base.join(location).ok()
}

fn is_followable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Same scheme, host and effective port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// The request to send for a redirect hop.
///
/// 301, 302 and 303 turn a non-GET request into a body-less GET; 307 and
/// 308 keep method and body. Signing headers are dropped either way.
pub fn follow(mut request: ApiRequest, status: StatusCode, location: Url) -> ApiRequest {
    let rewrites_method = matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    ) && request.method != Method::GET
        && request.method != Method::HEAD;

    if rewrites_method {
        request.method = Method::GET;
        request.body = None;
        request.headers.remove(CONTENT_TYPE);
        request.headers.remove(CONTENT_LENGTH);
    }
    request.headers.remove(AUTHORIZATION);
    request.headers.remove(DATE);
    request.url = location;
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn location(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn relative_location_resolves_against_request() {
        let base = url("https://api.example.com/v1/old?x=1");
        assert_eq!(
            redirect_target(&base, StatusCode::FOUND, &location("/v1/new")),
            Some(url("https://api.example.com/v1/new"))
        );
    }

    #[test]
    fn non_redirect_status_has_no_target() {
        let base = url("https://api.example.com/v1/old");
        assert_eq!(
            redirect_target(&base, StatusCode::NOT_MODIFIED, &location("/v1/new")),
            None
        );
        assert_eq!(redirect_target(&base, StatusCode::FOUND, &HeaderMap::new()), None);
    }

    #[test]
    fn origin_compares_scheme_host_and_port() {
        let a = url("https://api.example.com/a");
        assert!(same_origin(&a, &url("https://api.example.com:443/b")));
        assert!(!same_origin(&a, &url("http://api.example.com/a")));
        assert!(!same_origin(&a, &url("https://cdn.example.com/a")));
        assert!(!same_origin(&a, &url("https://api.example.com:8443/a")));
    }

    #[test]
    fn see_other_turns_post_into_get() {
        let request = ApiRequest::post_json(url("https://a.example/submit"), &serde_json::json!({}))
            .unwrap()
            .with_header(AUTHORIZATION, HeaderValue::from_static("bread t:s"));

        let next = follow(request, StatusCode::SEE_OTHER, url("https://a.example/result"));
        assert_eq!(next.method, Method::GET);
        assert!(next.body.is_none());
        assert_eq!(next.content_type(), "");
        assert!(next.headers.get(AUTHORIZATION).is_none());
        assert_eq!(next.url.path(), "/result");
    }

    #[test]
    fn temporary_redirect_keeps_method_and_body() {
        let request =
            ApiRequest::post_json(url("https://a.example/submit"), &serde_json::json!({})).unwrap();

        let next = follow(
            request,
            StatusCode::TEMPORARY_REDIRECT,
            url("https://a.example/v2/submit"),
        );
        assert_eq!(next.method, Method::POST);
        assert_eq!(next.body_bytes(), b"{}");
        assert_eq!(next.content_type(), "application/json");
    }
}
