//! A small SOCKS proxy server.
//!
//! `remora` listens on a configured TCP endpoint, speaks the server
//! side of SOCKS4, SOCKS4a, and SOCKS5, opens the requested target
//! connection, and then relays traffic in both directions until
//! either side is done.
//!
//! # Command-line arguments
//!
//! `--config-file <path>` (or `-f <path>`) names the configuration
//! file to load.  It is required.
//!
//! # Configuration
//!
//! The configuration file is TOML.  `port` must be set; everything
//! else has a default (see [`remora_defaults.toml`](./remora_defaults.toml)):
//!
//! * `address`: the address to listen on (default `0.0.0.0`).
//! * `port`: the port to listen on.
//! * `num-threads`: worker threads for the event loop (default 2).
//! * `log-level`: trace, debug, info, warn, or error (default info).
//! * `credentials`: comma-separated `user:pass` pairs.  When set,
//!   clients may also authenticate with SOCKS5 username/password, and
//!   SOCKS4 (which has no authentication) is refused.
//!
//! # Limitations
//!
//! Only the CONNECT command is supported, and only for IP literal
//! targets: BIND and UDP ASSOCIATE get "command not supported", and
//! hostname targets get "address type not supported".

#![warn(missing_docs)]
#![deny(missing_docs)]
#![warn(noop_method_call)]
#![deny(unreachable_pub)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cast_lossless)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]

mod auth;
mod exit;
mod proxy;

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use remora_rtcompat::{Runtime, SpawnBlocking};

use anyhow::{Context, Result};
use argh::FromArgs;
use serde::Deserialize;
use tracing::info;
use tracing::level_filters::LevelFilter;

#[derive(FromArgs, Debug, Clone)]
/// Accept SOCKS connections, open the requested target connections,
/// and proxy traffic.
struct Args {
    /// path of the configuration file to load
    #[argh(option, short = 'f')]
    config_file: String,
}

/// Default options to use for our configuration.
const REMORA_DEFAULTS: &str = include_str!("./remora_defaults.toml");

/// Structure to hold our configuration options, whether from a
/// configuration file or the defaults.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct RemoraConfig {
    /// Address to listen on for incoming SOCKS connections.
    address: String,
    /// Port to listen on for incoming SOCKS connections.
    port: u16,
    /// How many worker threads to run the event loop on.
    #[serde(rename = "num-threads")]
    num_threads: usize,
    /// Minimum severity of the log messages we emit.
    #[serde(rename = "log-level")]
    log_level: String,
    /// Comma-separated `user:pass` pairs accepted for SOCKS5
    /// username/password authentication.
    credentials: Option<String>,
}

impl RemoraConfig {
    /// Return the socket address we should listen on.
    fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .address
            .parse()
            .with_context(|| format!("Invalid listen address {:?}", self.address))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Build a credential store from the configuration, if one was
    /// requested.
    fn credential_store(&self) -> Result<Option<Arc<auth::CredentialStore>>> {
        match &self.credentials {
            Some(spec) => {
                let store = auth::CredentialStore::from_spec(spec)?;
                info!("Requiring authentication; {} pairs loaded", store.len());
                Ok(Some(Arc::new(store)))
            }
            None => Ok(None),
        }
    }
}

/// Run the main loop of the proxy.
async fn run<R: Runtime>(
    runtime: R,
    listen: SocketAddr,
    store: Option<Arc<auth::CredentialStore>>,
) -> Result<()> {
    use futures::FutureExt;
    futures::select!(
        r = exit::wait_for_ctrl_c().fuse() => r,
        r = proxy::run_socks_proxy(runtime.clone(), listen, store).fuse() => r,
    )
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let mut cfg = config::Config::new();
    cfg.merge(config::File::from_str(
        REMORA_DEFAULTS,
        config::FileFormat::Toml,
    ))?;
    let f: config::File<_> = Path::new(&args.config_file).into();
    cfg.merge(f.format(config::FileFormat::Toml).required(true))
        .with_context(|| format!("Couldn't read configuration from {:?}", args.config_file))?;

    let config: RemoraConfig = cfg.try_into().context("Couldn't parse configuration")?;

    let filt: LevelFilter = config
        .log_level
        .parse()
        .with_context(|| format!("Invalid log-level {:?}", config.log_level))?;
    tracing_subscriber::fmt().with_max_level(filt).init();

    let store = config.credential_store()?;
    let listen = config.listen_addr()?;

    let runtime = remora_rtcompat::tokio::create_runtime(config.num_threads)?;

    let rt_copy = runtime.clone();
    rt_copy.block_on(run(runtime, listen, store))?;
    Ok(())
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn load_default_config() {
        // The defaults must parse once a port is supplied.
        let mut cfg = config::Config::new();
        cfg.merge(config::File::from_str(
            REMORA_DEFAULTS,
            config::FileFormat::Toml,
        ))
        .unwrap();
        cfg.merge(config::File::from_str(
            "port = 1080",
            config::FileFormat::Toml,
        ))
        .unwrap();

        let parsed: RemoraConfig = cfg.try_into().unwrap();
        assert_eq!(parsed.address, "0.0.0.0");
        assert_eq!(parsed.port, 1080);
        assert_eq!(parsed.num_threads, 2);
        assert_eq!(parsed.log_level, "info");
        assert!(parsed.credentials.is_none());
        assert_eq!(parsed.listen_addr().unwrap(), "0.0.0.0:1080".parse().unwrap());
    }

    #[test]
    fn full_config() {
        let mut cfg = config::Config::new();
        cfg.merge(config::File::from_str(
            REMORA_DEFAULTS,
            config::FileFormat::Toml,
        ))
        .unwrap();
        cfg.merge(config::File::from_str(
            r#"
            address = "127.0.0.1"
            port = 9999
            num-threads = 4
            log-level = "debug"
            credentials = "alice:opensesame"
            "#,
            config::FileFormat::Toml,
        ))
        .unwrap();

        let parsed: RemoraConfig = cfg.try_into().unwrap();
        assert_eq!(parsed.num_threads, 4);
        let store = parsed.credential_store().unwrap().unwrap();
        assert!(store.validate("alice", "opensesame"));

        // Bad log levels and addresses are reported, not ignored.
        assert!("chatty".parse::<LevelFilter>().is_err());
        let bad = RemoraConfig {
            address: "example.com".to_string(),
            ..parsed
        };
        assert!(bad.listen_addr().is_err());
    }

    #[test]
    fn missing_port_is_an_error() {
        let mut cfg = config::Config::new();
        cfg.merge(config::File::from_str(
            REMORA_DEFAULTS,
            config::FileFormat::Toml,
        ))
        .unwrap();
        let parsed: std::result::Result<RemoraConfig, _> = cfg.try_into();
        assert!(parsed.is_err());
    }
}
