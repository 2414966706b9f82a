// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request decoration: `Date`, `Authorization` and `X-Wallet-Id`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, DATE};
use tracing::debug;

use super::canonical::{format_http_date, resource_path, CanonicalRequest};
use super::coordinator::AuthCoordinator;
use super::credential::Credential;
use super::identity::Signature;
use crate::error::AuthError;
use crate::pipeline::ApiRequest;

/// Header carrying the wallet identifier on signed requests.
pub const WALLET_ID_HEADER: HeaderName = HeaderName::from_static("x-wallet-id");

/// Default `Authorization` scheme name.
pub const DEFAULT_SCHEME: &str = "bread";

/// The `Authorization` scheme and its optional client token.
///
/// Without a client token the header reads `bread token:sig`; with one it
/// reads `bread2 client:token:sig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthScheme {
    name: String,
    client_token: Option<String>,
}

impl Default for AuthScheme {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

impl AuthScheme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_token: None,
        }
    }

    pub fn with_client_token(mut self, client_token: Option<String>) -> Self {
        self.client_token = client_token.filter(|t| !t.is_empty());
        self
    }

    /// Scheme name, also the challenge marker in `WWW-Authenticate`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authorization_value(&self, credential: &Credential, signature: &Signature) -> String {
        match &self.client_token {
            Some(client_token) => format!(
                "{}2 {}:{}:{}",
                self.name,
                client_token,
                credential.as_str(),
                signature.encoded()
            ),
            None => format!(
                "{} {}:{}",
                self.name,
                credential.as_str(),
                signature.encoded()
            ),
        }
    }
}

/// A request ready to dispatch, with what it was signed with.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub request: ApiRequest,
    /// Credential embedded in `Authorization`; used to invalidate exactly
    /// this value if the server challenges it.
    pub credential: Credential,
    pub signature: Signature,
}

/// Signs outgoing requests on behalf of the device.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    coordinator: Arc<AuthCoordinator>,
    scheme: AuthScheme,
    wallet_id: Option<String>,
}

impl RequestSigner {
    pub fn new(coordinator: Arc<AuthCoordinator>, scheme: AuthScheme) -> Self {
        Self {
            coordinator,
            scheme,
            wallet_id: None,
        }
    }

    pub fn with_wallet_id(mut self, wallet_id: Option<String>) -> Self {
        self.wallet_id = wallet_id.filter(|w| !w.is_empty());
        self
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    pub fn coordinator(&self) -> &Arc<AuthCoordinator> {
        &self.coordinator
    }

    /// Obtain a credential and sign `request` with the current UTC time.
    pub async fn decorate(&self, request: ApiRequest) -> Result<SignedRequest, AuthError> {
        self.decorate_at(request, Utc::now()).await
    }

    /// Like [`decorate`](Self::decorate) with an explicit signing time.
    pub async fn decorate_at(
        &self,
        mut request: ApiRequest,
        now: DateTime<Utc>,
    ) -> Result<SignedRequest, AuthError> {
        let credential = self.coordinator.ensure_token().await?;

        let date = format_http_date(now);
        let canonical = CanonicalRequest::build(
            &request.method,
            request.body_bytes(),
            request.content_type(),
            &date,
            &resource_path(&request.url),
        );
        let raw = self.coordinator.sign(canonical.signing_string().as_bytes())?;
        let signature = Signature::new(raw, date);

        let authorization = self.scheme.authorization_value(&credential, &signature);
        request
            .headers
            .insert(DATE, header_value(signature.timestamp())?);
        request
            .headers
            .insert(AUTHORIZATION, header_value(&authorization)?);
        if let Some(wallet_id) = &self.wallet_id {
            request
                .headers
                .insert(WALLET_ID_HEADER, header_value(wallet_id)?);
        }

        debug!(method = %request.method, path = %canonical.path, "Signed request");
        Ok(SignedRequest {
            request,
            credential,
            signature,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value)
        .map_err(|e| AuthError::Signing(format!("header value is not valid: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use url::Url;

    use super::*;
    use crate::auth::identity::{recover_signer, DeviceIdentity, SigningIdentity};
    use crate::auth::testing::{Harness, ScriptedFetcher};

    const SIGNED_AT: &str = "Tue, 01 Jan 2019 00:00:00 GMT";

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
    }

    fn header<'a>(request: &'a ApiRequest, name: impl reqwest::header::AsHeaderName) -> &'a str {
        request.headers.get(name).unwrap().to_str().unwrap()
    }

    fn split_authorization(value: &str) -> (String, Vec<String>) {
        let (scheme, rest) = value.split_once(' ').unwrap();
        (scheme.to_string(), rest.split(':').map(str::to_string).collect())
    }

    #[tokio::test]
    async fn get_is_signed_over_canonical_string() {
        let h = Harness::new(ScriptedFetcher::new());
        let signer = RequestSigner::new(h.coordinator.clone(), AuthScheme::default());
        let url = Url::parse("https://api.example.com/v1/foo").unwrap();

        let signed = signer
            .decorate_at(ApiRequest::get(url), fixed_time())
            .await
            .unwrap();

        assert_eq!(header(&signed.request, DATE), SIGNED_AT);
        assert_eq!(signed.signature.timestamp(), SIGNED_AT);
        assert_eq!(signed.credential, Credential::new("token-1"));

        let (scheme, parts) = split_authorization(header(&signed.request, AUTHORIZATION));
        assert_eq!(scheme, "bread");
        assert_eq!(parts[0], "token-1");

        let compact = bs58::decode(&parts[1]).into_vec().unwrap();
        let canonical = "GET\n\n\nTue, 01 Jan 2019 00:00:00 GMT\n/v1/foo";
        assert_eq!(
            recover_signer(canonical.as_bytes(), &compact).unwrap(),
            h.identity.public_key_encoded().unwrap()
        );
    }

    #[tokio::test]
    async fn post_signature_covers_body_digest_and_query() {
        let h = Harness::new(ScriptedFetcher::new());
        let signer = RequestSigner::new(h.coordinator.clone(), AuthScheme::default());
        let url = Url::parse("https://api.example.com/v1/me?x=1").unwrap();
        let request = ApiRequest::post_json(url, &serde_json::json!({})).unwrap();

        let signed = signer.decorate_at(request, fixed_time()).await.unwrap();
        let canonical = CanonicalRequest::build(
            &reqwest::Method::POST,
            b"{}",
            "application/json",
            SIGNED_AT,
            "/v1/me?x=1",
        );

        let compact = signed.signature.raw();
        assert_eq!(
            recover_signer(canonical.signing_string().as_bytes(), compact).unwrap(),
            h.identity.public_key_encoded().unwrap()
        );
    }

    #[tokio::test]
    async fn client_token_selects_bread2() {
        let h = Harness::new(ScriptedFetcher::new());
        let scheme = AuthScheme::default().with_client_token(Some("client-9".into()));
        let signer = RequestSigner::new(h.coordinator.clone(), scheme)
            .with_wallet_id(Some("wallet-abc".into()));
        let url = Url::parse("https://api.example.com/v1/foo").unwrap();

        let signed = signer.decorate(ApiRequest::get(url)).await.unwrap();

        let (scheme, parts) = split_authorization(header(&signed.request, AUTHORIZATION));
        assert_eq!(scheme, "bread2");
        assert_eq!(parts[0], "client-9");
        assert_eq!(parts[1], "token-1");
        assert_eq!(parts[2], signed.signature.encoded());
        assert_eq!(header(&signed.request, WALLET_ID_HEADER), "wallet-abc");
    }

    #[test]
    fn empty_client_token_is_ignored() {
        let scheme = AuthScheme::default().with_client_token(Some(String::new()));
        let signature = Signature::new(vec![0, 0, 1], SIGNED_AT);
        assert_eq!(
            scheme.authorization_value(&Credential::new("t"), &signature),
            "bread t:112"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_to_decorate() {
        let h = Harness::with_identity(
            DeviceIdentity::without_key("device-1"),
            ScriptedFetcher::new(),
        );
        let signer = RequestSigner::new(h.coordinator.clone(), AuthScheme::default());
        let url = Url::parse("https://api.example.com/v1/foo").unwrap();

        let err = signer.decorate(ApiRequest::get(url)).await.unwrap_err();
        assert_eq!(err, AuthError::NoKeyAvailable);
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn resigning_replaces_previous_headers() {
        let h = Harness::new(ScriptedFetcher::new());
        let signer = RequestSigner::new(h.coordinator.clone(), AuthScheme::default());
        let url = Url::parse("https://api.example.com/v1/foo").unwrap();

        let first = signer
            .decorate_at(ApiRequest::get(url), fixed_time())
            .await
            .unwrap();
        let later = fixed_time() + chrono::Duration::seconds(5);
        let second = signer.decorate_at(first.request, later).await.unwrap();

        assert_eq!(second.request.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(header(&second.request, DATE), "Tue, 01 Jan 2019 00:00:05 GMT");
    }
}
