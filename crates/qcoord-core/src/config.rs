//! Coordinator configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Cell tag stamped into facade object ids by default.
pub const DEFAULT_PEER_CELL_TAG: u16 = 0xBABE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Cell tag written into the object id of every facade scan.
    pub peer_cell_tag: u16,

    /// Issue all `split_further` calls at once instead of one at a time.
    /// Results keep plan order either way.
    pub concurrent_split: bool,

    /// Issue all `delegate` calls at once instead of one at a time.
    pub concurrent_delegate: bool,

    /// Log the rendered plan after every pass (trace level).
    pub explain_passes: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            peer_cell_tag: DEFAULT_PEER_CELL_TAG,
            concurrent_split: false,
            concurrent_delegate: false,
            explain_passes: false,
        }
    }
}

impl CoordinatorConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QCOORD_PEER_CELL_TAG`: facade cell tag, decimal or `0x`-prefixed hex
    /// - `QCOORD_CONCURRENT_SPLIT`: `true`/`false`/`1`/`0`
    /// - `QCOORD_CONCURRENT_DELEGATE`: `true`/`false`/`1`/`0`
    /// - `QCOORD_EXPLAIN_PASSES`: `true`/`false`/`1`/`0`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QCOORD_PEER_CELL_TAG") {
            if let Some(v) = parse_u16(&s) {
                cfg.peer_cell_tag = v;
            }
        }

        if let Ok(s) = std::env::var("QCOORD_CONCURRENT_SPLIT") {
            if let Some(v) = parse_flag(&s) {
                cfg.concurrent_split = v;
            }
        }

        if let Ok(s) = std::env::var("QCOORD_CONCURRENT_DELEGATE") {
            if let Some(v) = parse_flag(&s) {
                cfg.concurrent_delegate = v;
            }
        }

        if let Ok(s) = std::env::var("QCOORD_EXPLAIN_PASSES") {
            if let Some(v) = parse_flag(&s) {
                cfg.explain_passes = v;
            }
        }

        cfg
    }
}

fn parse_u16(s: &str) -> Option<u16> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
