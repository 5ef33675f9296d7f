//! Configuration management using Figment.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (prefix: `REACTOR_NET_`)
//! 2. Current working directory: `./config.toml`
//! 3. XDG config directory: `~/.config/reactor-net/{service_name}/config.toml`
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Top-level configuration for a `reactor-net` process: the HTTP/1.x and
/// HTTP/2 connection engines, the gRPC framing layer, the client's endpoint
/// pool, and the discovery cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http1: Http1Config,
    #[serde(default)]
    pub http2: Http2Config,
    #[serde(default)]
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http1: Http1Config::default(),
            http2: Http2Config::default(),
            grpc: GrpcConfig::default(),
            client: ClientConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// HTTP/1.x connection engine knobs (§4.C3, §6 wire format section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http1Config {
    /// Maximum length of a single request line or header line, in bytes.
    /// Exceeding it yields `414`/`431` per §4.C3.
    #[serde(default = "default_header_line_cap")]
    pub max_header_line_bytes: usize,

    /// Maximum number of header lines accepted per request.
    #[serde(default = "default_max_header_count")]
    pub max_header_count: usize,

    /// Maximum number of pipelined in-flight exchanges retained in the
    /// FIFO before the engine stops reading new requests (back-pressure).
    #[serde(default = "default_pipeline_depth")]
    pub max_pipeline_depth: usize,
}

impl Default for Http1Config {
    fn default() -> Self {
        Self {
            max_header_line_bytes: default_header_line_cap(),
            max_header_count: default_max_header_count(),
            max_pipeline_depth: default_pipeline_depth(),
        }
    }
}

fn default_header_line_cap() -> usize {
    8000
}
fn default_max_header_count() -> usize {
    100
}
fn default_pipeline_depth() -> usize {
    64
}

/// HTTP/2 connection engine knobs (§4.C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http2Config {
    /// HPACK dynamic table size (RFC 7540 default 4096, §6).
    #[serde(default = "default_hpack_table_size")]
    pub header_table_size: u32,

    /// Initial per-stream flow-control window.
    #[serde(default = "default_initial_window_size")]
    pub initial_window_size: u32,

    /// Connection-level flow-control window.
    #[serde(default = "default_connection_window_size")]
    pub connection_window_size: u32,

    /// Maximum number of concurrently open streams per connection.
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: u32,

    /// Low-water mark (fraction of the window, in percent) below which a
    /// WINDOW_UPDATE is emitted.
    #[serde(default = "default_window_update_threshold_pct")]
    pub window_update_threshold_pct: u8,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            header_table_size: default_hpack_table_size(),
            initial_window_size: default_initial_window_size(),
            connection_window_size: default_connection_window_size(),
            max_concurrent_streams: default_max_concurrent_streams(),
            window_update_threshold_pct: default_window_update_threshold_pct(),
        }
    }
}

fn default_hpack_table_size() -> u32 {
    4096
}
fn default_initial_window_size() -> u32 {
    65_535
}
fn default_connection_window_size() -> u32 {
    1 << 20
}
fn default_max_concurrent_streams() -> u32 {
    100
}
fn default_window_update_threshold_pct() -> u8 {
    50
}

/// gRPC framing layer knobs (§4.C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    /// Maximum decoded inbound message size, in bytes. Exceeding it yields
    /// `RESOURCE_EXHAUSTED`.
    #[serde(default = "default_grpc_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Minimum message size, in bytes, before the writer bothers compressing.
    #[serde(default = "default_grpc_compression_threshold")]
    pub compression_threshold_bytes: usize,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_grpc_max_message_bytes(),
            compression_threshold_bytes: default_grpc_compression_threshold(),
        }
    }
}

fn default_grpc_max_message_bytes() -> usize {
    4 * 1024 * 1024
}
fn default_grpc_compression_threshold() -> usize {
    256
}

/// HTTP client / endpoint pool knobs (§4.C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Maximum connections held per (host, port) endpoint.
    #[serde(default = "default_pool_max_connections")]
    pub max_connections_per_endpoint: usize,

    /// How long an idle pooled connection is retained before being closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How long an acquisition waits in the bounded FIFO before timing out
    /// with `POOL_EXHAUSTED`.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_connections_per_endpoint: default_pool_max_connections(),
            idle_timeout_secs: default_idle_timeout_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

fn default_pool_max_connections() -> usize {
    16
}
fn default_idle_timeout_secs() -> u64 {
    90
}
fn default_acquire_timeout_secs() -> u64 {
    10
}

/// Discovery pipeline knobs (§4.C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Default TTL, in seconds, between scheduled cache refreshes.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Bounded deadline, in seconds, for `shutdownGracefully` to drain
    /// in-flight instance calls before escalating to `shutdown`.
    #[serde(default = "default_drain_deadline_secs")]
    pub drain_deadline_secs: u64,

    /// Property key prefix consumed by `AbstractConfigurationDiscoveryService`.
    #[serde(default = "default_config_prefix")]
    pub config_prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            drain_deadline_secs: default_drain_deadline_secs(),
            config_prefix: default_config_prefix(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    30
}
fn default_drain_deadline_secs() -> u64 {
    30
}
fn default_config_prefix() -> String {
    "discovery".to_string()
}

impl Config {
    /// Load configuration from all sources for the given service name.
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("REACTOR_NET_").split("_"));

        Ok(figment.extract()?)
    }

    /// Load configuration from a specific file, bypassing XDG lookup.
    /// Primarily used in tests and non-standard deployments.
    pub fn load_from(path: &str) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("REACTOR_NET_").split("_"));

        Ok(figment.extract()?)
    }

    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(home) = std::env::var_os("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("reactor-net")
                    .join(service_name)
                    .join("config.toml"),
            );
        }

        paths
    }
}
