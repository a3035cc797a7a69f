mod memory;
mod state;

pub use memory::MemoryHost;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_CALL_DEPTH, MAX_SETUP_PAYLOAD_SIZE};

/// Tunables of the execution environment.
///
/// Every field has a default, so a partial YAML/JSON section is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Frames at this depth or deeper are rejected
    pub max_call_depth: usize,
    /// Largest setup payload a proxy constructor accepts
    pub max_setup_payload_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
            max_setup_payload_size: MAX_SETUP_PAYLOAD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: HostConfig = serde_json::from_str(r#"{"max_call_depth": 8}"#).unwrap();
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.max_setup_payload_size, MAX_SETUP_PAYLOAD_SIZE);
    }
}
