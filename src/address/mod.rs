// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Address Resolution
//!
//! Maps human-readable payment handles to chain addresses.
//!
//! | Handle | Example | Service |
//! |--------|---------|---------|
//! | CNS | `brad.crypto` | [`UnstoppableDomainService`] (signed wallet API call) |
//! | ENS | `vitalik.eth` | [`UnstoppableDomainService`] |
//! | PayID | `alice$payid.example` | [`PayIdService`] |
//! | FIO | `luke@stokes` | [`FioService`] |
//!
//! Anything else is a native address and is not resolved.

pub mod cache;
pub mod domains;
pub mod fio;
pub mod payid;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::config::ClientConfig;

pub use cache::ResolutionCache;
pub use domains::UnstoppableDomainService;
pub use fio::FioService;
pub use payid::PayIdService;
pub use types::{AddressResult, AddressType};

/// One resolution backend.
#[async_trait]
pub trait AddressResolverService: Send + Sync {
    async fn resolve_address(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult;
}

/// Unsigned client for third-party resolution hosts.
pub fn external_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

/// Routes a target to the service for its handle type.
pub struct AddressResolver {
    pay_id: Arc<dyn AddressResolverService>,
    fio: Arc<dyn AddressResolverService>,
    domains: Arc<dyn AddressResolverService>,
    cache: ResolutionCache,
}

impl std::fmt::Debug for AddressResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AddressResolver {
    /// Resolver using the client's configuration and, for domains, the
    /// client itself.
    pub fn new(client: Arc<ApiClient>) -> Result<Self, reqwest::Error> {
        let config = client.config();
        let http = external_http_client(config)?;
        let cache = ResolutionCache::new(cache::DEFAULT_CAPACITY, config.resolver_cache_ttl);
        let is_mainnet = config.is_mainnet;

        Ok(Self::with_services(
            Arc::new(PayIdService::new(http.clone(), is_mainnet)),
            Arc::new(FioService::new(http, is_mainnet)),
            Arc::new(UnstoppableDomainService::new(client)),
            cache,
        ))
    }

    pub fn with_services(
        pay_id: Arc<dyn AddressResolverService>,
        fio: Arc<dyn AddressResolverService>,
        domains: Arc<dyn AddressResolverService>,
        cache: ResolutionCache,
    ) -> Self {
        Self {
            pay_id,
            fio,
            domains,
            cache,
        }
    }

    pub fn address_type(&self, target: &str) -> Option<AddressType> {
        AddressType::detect(target)
    }

    /// Detect the handle type of `target` and resolve it.
    pub async fn resolve_address(
        &self,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult {
        match AddressType::detect(target) {
            Some(address_type) => {
                self.resolve_as(address_type, target, currency_code, native_currency_code)
                    .await
            }
            None => {
                warn!("Blank resolvable target");
                AddressResult::Invalid
            }
        }
    }

    /// Resolve `target` as an already-known handle type.
    pub async fn resolve_as(
        &self,
        address_type: AddressType,
        target: &str,
        currency_code: &str,
        native_currency_code: &str,
    ) -> AddressResult {
        let service = match address_type {
            AddressType::PayId => &self.pay_id,
            AddressType::Fio => &self.fio,
            AddressType::Cns | AddressType::Ens => &self.domains,
            AddressType::NativePublic => {
                warn!(handle = %target, "Native address is not resolvable");
                return AddressResult::Invalid;
            }
        };

        if let Some(cached) = self.cache.get(target, currency_code, native_currency_code) {
            debug!(?address_type, "Address resolution served from cache");
            return cached;
        }

        let result = service
            .resolve_address(target.trim(), currency_code, native_currency_code)
            .await;
        debug!(?address_type, success = result.is_success(), "Address resolved");
        self.cache
            .put(target, currency_code, native_currency_code, &result);
        result
    }
}
