use std::future::Future;
use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use log::{debug, info, warn};
use tokio::sync::OnceCell;
use tokio::time::{sleep, timeout};

use crate::device::manager::{DeviceClient, DeviceManager};
use crate::device::types::DiscoverySettings;
use crate::error::DeviceError;

#[derive(Debug, Clone)]
pub struct BtleDevice {
    peripheral: Peripheral,
    address: String,
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BtleClient {
    peripheral: Peripheral,
    id: String,
    name: String,
}

pub struct BtleDeviceManager {
    settings: DiscoverySettings,
    manager: OnceCell<Manager>,
}

impl BtleDeviceManager {
    pub fn new(settings: DiscoverySettings) -> Self {
        BtleDeviceManager {
            settings,
            manager: OnceCell::new(),
        }
    }

    async fn adapters(&self) -> Result<Vec<Adapter>, DeviceError> {
        let manager = self.manager.get_or_try_init(Manager::new).await?;
        Ok(manager.adapters().await?)
    }

    fn scan_filter(&self) -> ScanFilter {
        ScanFilter {
            services: self.settings.service.iter().cloned().collect(),
        }
    }

    async fn matching_devices(&self, adapter: &Adapter) -> Vec<BtleDevice> {
        let peripherals = match adapter.peripherals().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query BLE adapter for peripherals: {}", err);
                return Vec::new();
            },
        };

        let mut devices = Vec::new();
        for peripheral in peripherals {
            match peripheral.properties().await {
                Err(err) => {
                    warn!("Could not query peripheral for properties: {:?}", err);
                },
                Ok(None) => {
                    debug!("Peripheral has no properties");
                },
                Ok(Some(properties)) => {
                    if !self.settings.matches(properties.local_name.as_deref(), &properties.services) {
                        continue;
                    }

                    info!(
                        "Found peripheral {} {:?} {} {:?}",
                        properties.address,
                        properties.address_type,
                        properties.local_name.as_deref().unwrap_or("NONE"),
                        properties.services,
                    );
                    devices.push(BtleDevice {
                        peripheral,
                        address: properties.address.to_string(),
                        name: properties.local_name,
                    });
                },
            }
        }

        devices
    }
}

// Starts every scan in order; if one fails, the scans that did start are stopped again.
async fn start_all<'a, A, Start, StartFut, Stop, StopFut>(
    adapters: &'a [A],
    start: Start,
    stop: Stop,
) -> Result<(), DeviceError>
    where Start: Fn(&'a A) -> StartFut,
          StartFut: Future<Output = Result<(), DeviceError>>,
          Stop: Fn(&'a A) -> StopFut,
          StopFut: Future<Output = Result<(), DeviceError>>,
{
    for (index, adapter) in adapters.iter().enumerate() {
        if let Err(err) = start(adapter).await {
            for started in &adapters[..index] {
                if let Err(stop_err) = stop(started).await {
                    warn!("Failed to stop scanning: {}", stop_err);
                }
            }
            return Err(err);
        }
    }

    Ok(())
}

// A peripheral that connected but could not be set up has no owner, so it is disconnected here.
async fn disconnect_on_error<T, Setup, Disconnect>(setup: Setup, disconnect: Disconnect) -> Result<T, DeviceError>
    where Setup: Future<Output = Result<T, DeviceError>>,
          Disconnect: Future<Output = Result<(), DeviceError>>,
{
    match setup.await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(disconnect_err) = disconnect.await {
                warn!("Failed to disconnect after failed setup: {:?}", disconnect_err);
            }
            Err(err)
        },
    }
}

#[async_trait]
impl DeviceManager for BtleDeviceManager {
    type Device = BtleDevice;
    type Client = BtleClient;

    async fn devices(&self) -> Result<Vec<BtleDevice>, DeviceError> {
        let adapters = self.adapters().await?;
        if adapters.is_empty() {
            warn!("No bluetooth adapters available");
            return Ok(Vec::new());
        }

        let filter = self.scan_filter();
        start_all(
            &adapters,
            |adapter| {
                let filter = filter.clone();
                async move {
                    info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
                    Ok::<(), DeviceError>(adapter.start_scan(filter).await?)
                }
            },
            |adapter| async move { Ok::<(), DeviceError>(adapter.stop_scan().await?) },
        ).await?;

        sleep(self.settings.scan_duration).await;

        let mut devices = Vec::new();
        for adapter in &adapters {
            devices.extend(self.matching_devices(adapter).await);

            if let Err(err) = adapter.stop_scan().await {
                warn!("Failed to stop scanning: {}", err);
            }
        }

        debug!("{} peripherals matched", devices.len());
        Ok(devices)
    }

    async fn connect(&self, device: &BtleDevice) -> Result<Option<BtleClient>, DeviceError> {
        let peripheral = &device.peripheral;

        info!("Connecting to peripheral {}...", device.address);
        match timeout(self.settings.connect_deadline, peripheral.connect()).await {
            Err(_) => {
                warn!("Connecting to peripheral took too long");
                // the platform may still finish connecting in the background
                if let Err(err) = peripheral.disconnect().await {
                    warn!("Failed to disconnect after connect timeout: {:?}", err);
                }
                return Ok(None);
            },
            Ok(result) => result?,
        }

        let setup = async {
            if !peripheral.is_connected().await? {
                warn!("Peripheral did not stay connected");
                return Ok::<bool, DeviceError>(false);
            }

            info!("Connected; Discovering services...");
            peripheral.discover_services().await?;
            Ok::<bool, DeviceError>(true)
        };
        let disconnect = async { Ok::<(), DeviceError>(peripheral.disconnect().await?) };

        if !disconnect_on_error(setup, disconnect).await? {
            return Ok(None);
        }

        info!("Peripheral ready");
        Ok(Some(BtleClient {
            peripheral: peripheral.clone(),
            id: format!("{:?}", peripheral.id()),
            name: device.name.clone().unwrap_or_else(|| device.address.clone()),
        }))
    }
}

#[async_trait]
impl DeviceClient for BtleClient {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn is_connected(&self) -> Result<bool, DeviceError> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        info!("Disconnecting from {}", self.name);
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use super::*;

    struct FakeAdapter {
        fails_to_start: bool,
        scanning: AtomicBool,
    }

    impl FakeAdapter {
        fn new(fails_to_start: bool) -> Self {
            FakeAdapter { fails_to_start, scanning: AtomicBool::new(false) }
        }
    }

    fn device_error(message: &str) -> DeviceError {
        DeviceError::from(btleplug::Error::Other(message.to_string().into()))
    }

    async fn start_fake(adapter: &FakeAdapter) -> Result<(), DeviceError> {
        if adapter.fails_to_start {
            return Err(device_error("adapter is powered off"));
        }
        adapter.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_fake(adapter: &FakeAdapter) -> Result<(), DeviceError> {
        adapter.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[tokio::test]
    async fn all_adapters_scan_when_every_start_succeeds() {
        let adapters = vec![FakeAdapter::new(false), FakeAdapter::new(false)];

        start_all(&adapters, start_fake, stop_fake).await.unwrap();

        assert!(adapters.iter().all(|adapter| adapter.scanning.load(Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn failed_start_stops_the_scans_already_running() {
        let adapters = vec![FakeAdapter::new(false), FakeAdapter::new(true), FakeAdapter::new(false)];

        let err = start_all(&adapters, start_fake, stop_fake).await.unwrap_err();

        assert!(err.to_string().contains("adapter is powered off"));
        assert!(adapters.iter().all(|adapter| !adapter.scanning.load(Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn failed_setup_disconnects_the_peripheral() {
        let disconnected = AtomicBool::new(false);

        let result: Result<bool, DeviceError> = disconnect_on_error(
            async { Err(device_error("service discovery failed")) },
            async { disconnected.store(true, Ordering::SeqCst); Ok(()) },
        ).await;

        assert!(result.is_err());
        assert!(disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn setup_error_wins_over_a_failing_disconnect() {
        let result: Result<bool, DeviceError> = disconnect_on_error(
            async { Err(device_error("service discovery failed")) },
            async { Err(device_error("already gone")) },
        ).await;

        assert!(result.unwrap_err().to_string().contains("service discovery failed"));
    }

    #[tokio::test]
    async fn successful_setup_keeps_the_connection() {
        let disconnected = AtomicBool::new(false);

        let result = disconnect_on_error(
            async { Ok(true) },
            async { disconnected.store(true, Ordering::SeqCst); Ok(()) },
        ).await;

        assert!(result.unwrap());
        assert!(!disconnected.load(Ordering::SeqCst));
    }
}
