// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ENS and CNS names, looked up through the wallet API.
//!
//! Unlike PayID and FIO this goes through [`ApiClient`], so the lookup is a
//! signed request like any other wallet API call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use super::{AddressResolverService, AddressResult};
use crate::client::{read_json, ApiClient};
use crate::error::ApiError;
use crate::pipeline::ApiRequest;

const ADDRESSES_PATH: &str = "/addresses";

#[derive(Debug, Deserialize)]
struct AddressesResponse {
    #[serde(rename = "_embedded", default)]
    embedded: EmbeddedAddresses,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddedAddresses {
    #[serde(default)]
    addresses: Vec<DomainAddress>,
}

#[derive(Debug, Deserialize)]
struct DomainAddress {
    currency_code: String,
    address: Option<String>,
    status: LookupStatus,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum LookupStatus {
    Success,
    BlockchainIsDown,
    #[serde(other)]
    Other,
}

/// Unstoppable Domains resolution via the wallet API.
#[derive(Debug, Clone)]
pub struct UnstoppableDomainService {
    client: Arc<ApiClient>,
}

impl UnstoppableDomainService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    async fn lookup(
        &self,
        domain: &str,
        currency_codes: &[String],
    ) -> Result<AddressesResponse, ApiError> {
        let mut url = self.client.url(ADDRESSES_PATH)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("base URL cannot have paths".into()))?
            .push(domain);
        {
            let mut query = url.query_pairs_mut();
            for code in currency_codes {
                query.append_pair("currency_code", code);
            }
        }

        let request = ApiRequest::get(url).accept("application/json");
        let response = self.client.send_authenticated(request).await?;
        read_json(response).await
    }
}

#[async_trait]
impl AddressResolverService for UnstoppableDomainService {
    async fn resolve_address(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult {
        let mut codes = vec![currency_code.to_lowercase()];
        let native = native_currency_code.to_lowercase();
        if !codes.contains(&native) {
            codes.push(native);
        }

        let response = match self.lookup(target, &codes).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Address resolve request failed");
                return AddressResult::ExternalError;
            }
        };
        let addresses = response.embedded.addresses;
        debug!(results = addresses.len(), "Domain lookup returned");

        let entry = addresses.into_iter().find(|a| {
            a.currency_code.eq_ignore_ascii_case(currency_code)
                || a.currency_code.eq_ignore_ascii_case(native_currency_code)
        });
        match entry {
            Some(DomainAddress {
                status: LookupStatus::Success,
                address: Some(address),
                ..
            }) if !address.is_empty() => AddressResult::success(address, None),
            Some(DomainAddress {
                status: LookupStatus::Success,
                ..
            }) => AddressResult::NoAddress,
            Some(DomainAddress {
                status: LookupStatus::BlockchainIsDown,
                ..
            }) => AddressResult::ExternalError,
            _ => AddressResult::Invalid,
        }
    }
}
