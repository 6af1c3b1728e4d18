//! Command-line and environment configuration for the demo server binary.
//!
//! This is distinct from [`crate::config::RouterConfig`], which is the
//! library's own plain constructor argument: `AppConfig` is the layered
//! CLI/env/file configuration the *binary* builds a `RouterConfig` from.

#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Runtime configuration for `mrpc-demo-server`.
#[derive(Parser, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "MRPC_")]
pub struct AppConfig {
    /// TCP address to listen on.
    #[ortho_config(default = "127.0.0.1:7700".to_owned())]
    #[arg(long, default_value_t = String::from("127.0.0.1:7700"))]
    pub bind: String,
    /// This node's identity, used as `src` in every emitted frame.
    #[ortho_config(default = "mrpc-demo".to_owned())]
    #[arg(long, default_value_t = String::from("mrpc-demo"))]
    pub identity: String,
    /// Capacity of the bounded outbound queue shared by all channels.
    #[ortho_config(default = 32)]
    #[arg(long, default_value_t = 32)]
    pub max_queue_size: usize,
}
