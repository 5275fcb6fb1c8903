use std::time::Duration;
use uuid::Uuid;

/// Result of a single pass through the connection flow.
#[derive(Debug, Clone)]
pub enum ConnectOutcome<C> {
    Connected(C),
    /// Discovery returned no devices.
    NotFound,
    /// A device was found but connecting to it yielded no handle.
    ConnectionFailed,
    /// A device error interrupted the flow; it has already been logged.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub name_prefix: Option<String>,
    pub service: Option<Uuid>,
    pub scan_duration: Duration,
    pub connect_deadline: Duration,
}

impl DiscoverySettings {
    /// Some environments ignore the scan filter, so advertised data is checked again here.
    pub fn matches(&self, local_name: Option<&str>, services: &[Uuid]) -> bool {
        if let Some(service) = &self.service {
            if !services.contains(service) {
                return false;
            }
        }

        match (&self.name_prefix, local_name) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(prefix), Some(name)) => name.starts_with(prefix.as_str()),
        }
    }
}
