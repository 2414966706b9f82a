// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! FIO address resolution through the chain's `get_pub_address` call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::types::is_fio;
use super::{AddressResolverService, AddressResult};

pub const FIO_MAINNET_ENDPOINT: &str = "https://api.fio.services/v1/chain/get_pub_address";
pub const FIO_TESTNET_ENDPOINT: &str = "https://testnet.fioprotocol.io/v1/chain/get_pub_address";

const DESTINATION_TAG_KEY: &str = "dt";

#[derive(Debug, Serialize)]
struct PubAddressRequest<'a> {
    fio_address: &'a str,
    chain_code: &'a str,
    token_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct PubAddressResponse {
    public_address: Option<String>,
}

/// Resolves `name@domain` FIO handles.
#[derive(Debug, Clone)]
pub struct FioService {
    http: Client,
    endpoint: String,
}

impl FioService {
    pub fn new(http: Client, is_mainnet: bool) -> Self {
        let endpoint = if is_mainnet {
            FIO_MAINNET_ENDPOINT
        } else {
            FIO_TESTNET_ENDPOINT
        };
        Self::with_endpoint(http, endpoint)
    }

    pub fn with_endpoint(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Split `address?dt=123&memo=x` into the address and its destination tag.
fn split_public_address(raw: &str) -> (&str, Option<String>) {
    let Some((address, query)) = raw.split_once('?') else {
        return (raw, None);
    };
    let mut tag = None;
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((DESTINATION_TAG_KEY, value)) => tag = Some(value.to_string()),
            Some(_) => {}
            None => warn!(pair, "Malformed FIO address parameter"),
        }
    }
    (address, tag)
}

#[async_trait]
impl AddressResolverService for FioService {
    async fn resolve_address(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult {
        if !is_fio(target) {
            return AddressResult::Invalid;
        }

        let body = PubAddressRequest {
            fio_address: target,
            chain_code: native_currency_code,
            token_code: currency_code,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let parsed: PubAddressResponse = match response {
            Ok(response) => match response.json().await {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!(error = %e, "Invalid FIO response");
                    return AddressResult::ExternalError;
                }
            },
            Err(e) => {
                error!(error = %e, "Failed to retrieve FIO address");
                return AddressResult::ExternalError;
            }
        };

        let Some(raw) = parsed.public_address else {
            warn!(handle = %target, "No FIO address results");
            return AddressResult::NoAddress;
        };
        let (address, destination_tag) = split_public_address(&raw);
        if address.trim().is_empty() {
            warn!(handle = %target, "No FIO address results");
            return AddressResult::NoAddress;
        }
        AddressResult::success(address, destination_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> FioService {
        FioService::with_endpoint(
            Client::new(),
            format!("{}/v1/chain/get_pub_address", server.uri()),
        )
    }

    #[test]
    fn endpoints_follow_network() {
        assert_eq!(FioService::new(Client::new(), true).endpoint(), FIO_MAINNET_ENDPOINT);
        assert_eq!(FioService::new(Client::new(), false).endpoint(), FIO_TESTNET_ENDPOINT);
    }

    #[test]
    fn destination_tag_is_split_off() {
        assert_eq!(
            split_public_address("rAddr?dt=123&memo=hi"),
            ("rAddr", Some("123".to_string()))
        );
        assert_eq!(split_public_address("0xabc"), ("0xabc", None));
        assert_eq!(split_public_address("rAddr?broken"), ("rAddr", None));
    }

    #[tokio::test]
    async fn resolves_public_address_with_tag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chain/get_pub_address"))
            .and(body_json(serde_json::json!({
                "fio_address": "luke@stokes",
                "chain_code": "XRP",
                "token_code": "XRP"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_address": "rLuke?dt=99"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = service(&server).resolve_address("luke@stokes", "XRP", "XRP").await;
        assert_eq!(result, AddressResult::success("rLuke", Some("99".into())));
    }

    #[tokio::test]
    async fn missing_address_is_no_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let result = service(&server).resolve_address("luke@stokes", "ETH", "ETH").await;
        assert_eq!(result, AddressResult::NoAddress);
    }

    #[tokio::test]
    async fn not_found_is_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Public address not found"
            })))
            .mount(&server)
            .await;

        let result = service(&server).resolve_address("luke@stokes", "ETH", "ETH").await;
        assert_eq!(result, AddressResult::ExternalError);
    }
}
