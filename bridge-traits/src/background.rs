//! Background Execution Constraints
//!
//! Conditions a sync run must satisfy before it is allowed to start, and the
//! power information needed to evaluate them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Task execution constraints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    /// Require any network connection
    pub requires_network: bool,
    /// Require a connection that is not metered
    pub requires_unmetered: bool,
    /// Refuse to run while the battery is reported low
    pub requires_battery_not_low: bool,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            requires_network: true,
            requires_unmetered: false,
            requires_battery_not_low: true,
        }
    }
}

impl TaskConstraints {
    /// Constraints that never block a run.
    pub fn none() -> Self {
        Self {
            requires_network: false,
            requires_unmetered: false,
            requires_battery_not_low: false,
        }
    }
}

/// Power monitor trait
///
/// - **Android**: `BatteryManager` / `ACTION_BATTERY_LOW`
/// - **iOS**: `UIDevice.batteryLevel` with low power mode
/// - **Desktop**: usually absent; hosts without a battery simply do not
///   provide one
#[async_trait]
pub trait PowerMonitor: Send + Sync {
    /// Whether the platform currently reports a low battery
    async fn is_battery_low(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_constraints_default() {
        let constraints = TaskConstraints::default();

        assert!(constraints.requires_network);
        assert!(!constraints.requires_unmetered);
        assert!(constraints.requires_battery_not_low);
    }

    #[test]
    fn test_task_constraints_none() {
        let constraints = TaskConstraints {
            requires_unmetered: true,
            ..TaskConstraints::none()
        };

        assert!(!constraints.requires_network);
        assert!(constraints.requires_unmetered);
    }
}
