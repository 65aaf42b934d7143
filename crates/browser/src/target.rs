//! Connection targets
//!
//! Precedence between the ways of reaching a browser is decided here and only here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to reach a browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectionTarget {
    /// Already-resolved control-channel address, used as-is
    DirectEndpoint { control_channel_address: String },

    /// Base URL of a browser's management API (`/json/version` lives under it)
    ManagementEndpoint { base_url: String },

    /// Launch a fresh local browser process
    Local {
        headless: bool,
        slow_motion_millis: u64,
    },
}

impl ConnectionTarget {
    /// Pick a target from loosely supplied options.
    ///
    /// DirectEndpoint > ManagementEndpoint > Local. Blank strings count as absent.
    pub fn resolve(
        control_channel_address: Option<&str>,
        management_base_url: Option<&str>,
        headless: bool,
        slow_motion_millis: u64,
    ) -> Self {
        let present = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(address) = present(control_channel_address) {
            return Self::DirectEndpoint {
                control_channel_address: address,
            };
        }
        if let Some(base_url) = present(management_base_url) {
            return Self::ManagementEndpoint { base_url };
        }
        Self::Local {
            headless,
            slow_motion_millis,
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectEndpoint {
                control_channel_address,
            } => write!(f, "direct endpoint {}", control_channel_address),
            Self::ManagementEndpoint { base_url } => write!(f, "management endpoint {}", base_url),
            Self::Local { headless, .. } => write!(f, "local browser (headless: {})", headless),
        }
    }
}
