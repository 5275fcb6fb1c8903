use std::time::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{CONNECT_DEADLINE, HEART_RATE_SERVICE, SCAN_DURATION};
use crate::device::types::DiscoverySettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Only devices whose advertised name starts with this are considered.
    pub device_name_prefix: Option<String>,
    /// Only devices advertising this GATT service are considered.
    pub service_uuid: Option<Uuid>,
    pub scan_duration_ms: u64,
    pub connect_deadline_ms: u64,
}

impl Config {
    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            name_prefix: self.device_name_prefix.clone().filter(|prefix| !prefix.is_empty()),
            service: self.service_uuid,
            scan_duration: Duration::from_millis(self.scan_duration_ms),
            connect_deadline: Duration::from_millis(self.connect_deadline_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_name_prefix: None,
            service_uuid: Some(HEART_RATE_SERVICE),
            scan_duration_ms: SCAN_DURATION,
            connect_deadline_ms: CONNECT_DEADLINE,
        }
    }
}
