use std::fmt::Debug;
use async_trait::async_trait;

use crate::error::DeviceError;

/// An active session with a connected device.
#[async_trait]
pub trait DeviceClient: Clone + Debug + Send + Sync + 'static {
    /// Identifies the physical device; two handles with the same id share one connection.
    fn id(&self) -> String;

    fn name(&self) -> String;

    async fn is_connected(&self) -> Result<bool, DeviceError>;

    async fn disconnect(&self) -> Result<(), DeviceError>;
}

/// Discovers wearable devices and opens sessions with them.
#[async_trait]
pub trait DeviceManager: Send + Sync {
    type Device: Debug + Send + Sync;
    type Client: DeviceClient;

    /// Devices that are currently available, in the order they were found.
    async fn devices(&self) -> Result<Vec<Self::Device>, DeviceError>;

    /// `Ok(None)` means the device could not be connected to without a device error
    /// being raised, e.g. because it went out of range.
    async fn connect(&self, device: &Self::Device) -> Result<Option<Self::Client>, DeviceError>;
}
