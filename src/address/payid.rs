// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PayID resolution.
//!
//! `user$host` is fetched from `https://host/user`. Servers reject requests
//! that accept `application/json`, so only the PayID media type is sent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::types::is_pay_id;
use super::{AddressResolverService, AddressResult};

const PAY_ID_DELIMITER: char = '$';
const PAY_ID_ACCEPT_TYPE: &str = "application/payid+json";
const PAY_ID_VERSION_HEADER: &str = "PayID-Version";
const PAY_ID_VERSION: &str = "1.0";
const TESTNET_ENVIRONMENT: &str = "TESTNET";
/// PayID names the XRP ledger `XRPL`; the wallet calls the currency `XRP`.
const PAY_ID_CURRENCY_XRP: &str = "XRPL";
const APP_CURRENCY_XRP: &str = "XRP";

#[derive(Debug, Deserialize)]
struct PayIdResponse {
    #[serde(default)]
    addresses: Vec<PayIdAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayIdAddress {
    #[serde(default)]
    payment_network: String,
    #[serde(default)]
    environment: String,
    address_details: Option<PayIdAddressDetails>,
}

#[derive(Debug, Deserialize)]
struct PayIdAddressDetails {
    address: Option<String>,
    tag: Option<String>,
}

/// Resolves PayIDs over HTTPS.
#[derive(Debug, Clone)]
pub struct PayIdService {
    http: Client,
    is_mainnet: bool,
    scheme: &'static str,
}

impl PayIdService {
    pub fn new(http: Client, is_mainnet: bool) -> Self {
        Self {
            http,
            is_mainnet,
            scheme: "https",
        }
    }

    /// Talk plain HTTP to the PayID host (mock servers).
    #[cfg(test)]
    fn insecure(mut self) -> Self {
        self.scheme = "http";
        self
    }

    fn lookup_url(&self, target: &str) -> Option<String> {
        let (user, host) = target.split_once(PAY_ID_DELIMITER)?;
        Some(format!("{}://{}/{}", self.scheme, host.trim(), user.trim()))
    }

    fn is_target_environment(&self, environment: &str) -> bool {
        if environment.eq_ignore_ascii_case(TESTNET_ENVIRONMENT) {
            !self.is_mainnet
        } else {
            self.is_mainnet
        }
    }

    fn pick(&self, response: PayIdResponse, currency_code: &str) -> Option<PayIdAddressDetails> {
        response.addresses.into_iter().find_map(|entry| {
            let matches = self.is_target_environment(&entry.environment)
                && is_target_currency(&entry.payment_network, currency_code);
            if matches {
                entry.address_details
            } else {
                None
            }
        })
    }
}

fn is_target_currency(pay_id_currency: &str, currency_code: &str) -> bool {
    if currency_code.eq_ignore_ascii_case(APP_CURRENCY_XRP) {
        pay_id_currency.eq_ignore_ascii_case(PAY_ID_CURRENCY_XRP)
    } else {
        pay_id_currency.eq_ignore_ascii_case(currency_code)
    }
}

#[async_trait]
impl AddressResolverService for PayIdService {
    async fn resolve_address(
        &self,
        target: &str,
        _currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult {
        if !is_pay_id(target) {
            return AddressResult::Invalid;
        }
        let Some(url) = self.lookup_url(target) else {
            return AddressResult::Invalid;
        };

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, PAY_ID_ACCEPT_TYPE)
            .header(PAY_ID_VERSION_HEADER, PAY_ID_VERSION)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, error = %e, "Failed to retrieve PayID address");
                return AddressResult::ExternalError;
            }
        };

        // The body is JSON whatever Content-Type the server claims.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(url = %url, error = %e, "Failed to read PayID response");
                return AddressResult::ExternalError;
            }
        };
        let parsed: PayIdResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(url = %url, error = %e, "Failed to process PayID response");
                return AddressResult::ExternalError;
            }
        };
        debug!(entries = parsed.addresses.len(), "PayID response received");

        match self.pick(parsed, native_currency_code) {
            Some(PayIdAddressDetails {
                address: Some(address),
                tag,
            }) if !address.trim().is_empty() => AddressResult::success(address, tag),
            _ => {
                warn!(handle = %target, "No PayID address for currency");
                AddressResult::NoAddress
            }
        }
    }
}
