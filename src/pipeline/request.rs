// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outgoing request value.
//!
//! Kept separate from `reqwest::Request` because a request may be signed
//! more than once (challenge retry, redirect), and reqwest bodies are not
//! always cloneable. The body is held as bytes so it can be digested and
//! replayed.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;

/// An HTTP request before signing and dispatch.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// JSON request with the given method and serialized body.
    pub fn json<T: Serialize + ?Sized>(method: Method, url: Url, body: &T) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to encode body: {e}")))?;
        Ok(Self::new(method, url).with_body(bytes, "application/json"))
    }

    pub fn post_json<T: Serialize + ?Sized>(url: Url, body: &T) -> Result<Self, ApiError> {
        Self::json(Method::POST, url, body)
    }

    /// Attach a raw body and its content type.
    pub fn with_body(mut self, body: Vec<u8>, content_type: &'static str) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn accept(self, media_type: &'static str) -> Self {
        self.with_header(ACCEPT, HeaderValue::from_static(media_type))
    }

    /// `Content-Type` as it will be sent, or empty.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }

    pub fn into_reqwest(self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method, self.url);
        *request.headers_mut() = self.headers;
        if let Some(body) = self.body {
            *request.body_mut() = Some(body.into());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_json_sets_body_and_content_type() {
        let url = Url::parse("https://api.example.com/v1/foo").unwrap();
        let request = ApiRequest::post_json(url, &serde_json::json!({ "a": 1 })).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.content_type(), "application/json");
        assert_eq!(request.body_bytes(), br#"{"a":1}"#);
    }

    #[test]
    fn get_has_no_body() {
        let url = Url::parse("https://api.example.com/v1/foo?x=1").unwrap();
        let request = ApiRequest::get(url.clone());
        assert_eq!(request.content_type(), "");
        assert!(request.body_bytes().is_empty());

        let converted = request.into_reqwest();
        assert_eq!(converted.url(), &url);
        assert!(converted.body().is_none());
    }
}
