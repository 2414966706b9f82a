// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Diagnostic tool: send one request through the pipeline.
//!
//! ```text
//! brd-auth-client [--unauthenticated] [PATH]
//! ```
//!
//! Device state is read from `DATA_DIR`; see `config` for the other
//! variables.

use std::process::ExitCode;
use std::sync::Arc;

use brd_auth_client::auth::{DeviceIdentity, FileCredentialStore, SigningIdentity};
use brd_auth_client::pipeline::ApiRequest;
use brd_auth_client::storage::DeviceStorage;
use brd_auth_client::{logging, ApiClient, ApiError, ClientConfig};
use clap::Parser;
use tracing::{error, info};

/// Send one request to the wallet API and print the response.
#[derive(Parser, Debug)]
#[command(name = "brd-auth-client", version, about)]
struct Args {
    /// Send the request without signing it.
    #[arg(long)]
    unauthenticated: bool,

    /// API path, relative to `API_BASE_URL`.
    #[arg(default_value = "/me")]
    path: String,
}

impl Args {
    fn authenticated(&self) -> bool {
        !self.unauthenticated
    }
}

async fn run(args: Args) -> Result<(), ApiError> {
    let config = ClientConfig::from_env();
    let storage = DeviceStorage::open(&config.data_dir)?;
    let identity = DeviceIdentity::load(&storage)?;
    info!(
        device_id = %identity.device_id(),
        has_key = identity.has_key(),
        data_dir = %config.data_dir.display(),
        "Loaded device state"
    );

    let store = FileCredentialStore::open(storage);
    let client = ApiClient::new(config, Arc::new(identity), Arc::new(store.clone()))?;

    let request = ApiRequest::get(client.url(&args.path)?);
    let response = if args.authenticated() {
        client.send_authenticated(request).await?
    } else {
        client.send_unauthenticated(request).await?
    };

    let status = response.status();
    let body = response.text().await?;
    store.flush();
    println!("{status}");
    if !body.is_empty() {
        println!("{body}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.auth().map(|auth| auth.user_message());
            error!(error = %e, "Request failed");
            eprintln!("error: {}", message.unwrap_or("request failed"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_to_signed_me() {
        let args = Args::try_parse_from(["brd-auth-client"]).unwrap();
        assert!(args.authenticated());
        assert_eq!(args.path, "/me");
    }

    #[test]
    fn flag_and_path_are_parsed() {
        let args =
            Args::try_parse_from(["brd-auth-client", "--unauthenticated", "/currencies"]).unwrap();
        assert!(!args.authenticated());
        assert_eq!(args.path, "/currencies");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["brd-auth-client", "--unauthenticatd"]).is_err());
        assert!(Args::try_parse_from(["brd-auth-client", "/a", "/b"]).is_err());
    }
}
