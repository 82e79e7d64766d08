//! Node-size configuration.

use super::error::{AListError, Result};
use serde::{Deserialize, Serialize};

/// Default capacity of a leaf, in items (dense) or stored entries (sparse).
pub const DEFAULT_MAX_LEAF_SIZE: u16 = 48;
/// Default capacity of an inner node, in children.
pub const DEFAULT_MAX_INNER_SIZE: u16 = 16;

const MIN_NODE_SIZE: u16 = 4;
const MAX_INNER_SIZE: u16 = 255;

/// Node capacities for a list.
///
/// Small capacities produce taller trees and are mostly useful for exercising the
/// rebalancing paths in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AListConfig {
    /// Maximum items per leaf.
    pub max_leaf_size: u16,
    /// Maximum children per inner node (at most 255).
    pub max_inner_size: u16,
}

impl Default for AListConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_inner_size: DEFAULT_MAX_INNER_SIZE,
        }
    }
}

impl AListConfig {
    /// Creates a validated configuration.
    pub fn new(max_leaf_size: u16, max_inner_size: u16) -> Result<Self> {
        let config = Self {
            max_leaf_size,
            max_inner_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that both capacities are in range.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_size < MIN_NODE_SIZE {
            return Err(AListError::InvalidConfig(format!(
                "max_leaf_size must be at least {MIN_NODE_SIZE}, got {}",
                self.max_leaf_size
            )));
        }
        if !(MIN_NODE_SIZE..=MAX_INNER_SIZE).contains(&self.max_inner_size) {
            return Err(AListError::InvalidConfig(format!(
                "max_inner_size must be in {MIN_NODE_SIZE}..={MAX_INNER_SIZE}, got {}",
                self.max_inner_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(AListConfig::new(4, 4).is_ok());
        assert!(AListConfig::new(3, 16).is_err());
        assert!(AListConfig::new(48, 256).is_err());
        assert!(AListConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: AListConfig = serde_json::from_str(r#"{"max_leaf_size": 8}"#).unwrap();
        assert_eq!(config.max_leaf_size, 8);
        assert_eq!(config.max_inner_size, DEFAULT_MAX_INNER_SIZE);
    }
}
