use std::time::Duration;
use log::{error, info, warn};
use tokio::time::timeout;

use crate::device::manager::{DeviceClient, DeviceManager};
use crate::device::types::ConnectOutcome;
use crate::gui::dialog::{Dialog, DialogQueue};

/// Runs the connection flow once: pick the first available device and connect to it.
///
/// Device errors are logged and swallowed here; the caller only sees [`ConnectOutcome::Aborted`].
pub async fn connect_to_device<M>(manager: &M) -> ConnectOutcome<M::Client>
    where M: DeviceManager + ?Sized
{
    let devices = match manager.devices().await {
        Ok(devices) => devices,
        Err(err) => {
            error!("{}", err);
            return ConnectOutcome::Aborted;
        },
    };

    let device = match devices.first() {
        Some(device) => device,
        None => {
            info!("No device available");
            return ConnectOutcome::NotFound;
        },
    };

    match manager.connect(device).await {
        Ok(Some(client)) => ConnectOutcome::Connected(client),
        Ok(None) => {
            info!("Could not connect to {:?}", device);
            ConnectOutcome::ConnectionFailed
        },
        Err(err) => {
            error!("{}", err);
            ConnectOutcome::Aborted
        },
    }
}

/// Asks the device whether it is still connected. A check that errors or takes longer than
/// `deadline` counts as disconnected.
pub async fn still_connected<C: DeviceClient>(client: &C, deadline: Duration) -> bool {
    match timeout(deadline, client.is_connected()).await {
        Err(_) => {
            warn!("Checking for connection status took too long");
            false
        },
        Ok(Err(err)) => {
            warn!("Error checking for connection state: {:?}", err);
            false
        },
        Ok(Ok(connected)) => connected,
    }
}

/// State behind the main view: the connection flag, the connection handle and the dialogs
/// waiting to be shown.
#[derive(Debug)]
pub struct MainViewModel<C> {
    client: Option<C>,
    is_connected: bool,
    is_connecting: bool,
    dialogs: DialogQueue,
}

impl<C: DeviceClient> MainViewModel<C> {
    pub fn new() -> Self {
        MainViewModel {
            client: None,
            is_connected: false,
            is_connecting: false,
            dialogs: DialogQueue::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn is_connecting(&self) -> bool {
        self.is_connecting
    }

    pub fn client(&self) -> Option<&C> {
        self.client.as_ref()
    }

    pub fn dialogs(&self) -> &DialogQueue {
        &self.dialogs
    }

    pub fn dialogs_mut(&mut self) -> &mut DialogQueue {
        &mut self.dialogs
    }

    /// Returns false if a connection attempt is already running.
    pub fn begin_connect(&mut self) -> bool {
        if self.is_connecting {
            return false;
        }

        self.is_connecting = true;
        true
    }

    /// Applies the result of [`connect_to_device`]. Returns the handle that a new connection
    /// replaced, which the caller must disconnect. Reconnecting to the device that is already
    /// connected replaces nothing.
    pub fn complete_connect(&mut self, outcome: ConnectOutcome<C>) -> Option<C> {
        self.is_connecting = false;

        match outcome {
            ConnectOutcome::Connected(client) => {
                info!("Connected to {}", client.name());
                self.is_connected = true;
                let new_id = client.id();
                match self.client.replace(client) {
                    Some(previous) if previous.id() == new_id => None,
                    replaced => replaced,
                }
            },
            ConnectOutcome::NotFound => {
                self.dialogs.show(Dialog::device_not_found());
                None
            },
            ConnectOutcome::ConnectionFailed => {
                self.dialogs.show(Dialog::connection_error());
                None
            },
            ConnectOutcome::Aborted => None,
        }
    }

    /// Called when the device no longer reports being connected.
    pub fn connection_lost(&mut self) -> Option<C> {
        let client = self.client.take();
        if let Some(client) = &client {
            warn!("Connection to {} lost", client.name());
        }
        self.is_connected = false;
        client
    }

    /// Releases the connection handle, e.g. because the view is closing.
    pub fn release(&mut self) -> Option<C> {
        self.is_connected = false;
        self.client.take()
    }

    pub fn record_sensors(&mut self) {
        info!("Recording sensors is not available yet");
    }
}

impl<C: DeviceClient> Default for MainViewModel<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::DeviceError;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeClient(&'static str);

    #[async_trait]
    impl DeviceClient for FakeClient {
        fn id(&self) -> String {
            self.0.to_string()
        }

        fn name(&self) -> String {
            self.0.to_string()
        }

        async fn is_connected(&self) -> Result<bool, DeviceError> {
            Ok(true)
        }

        async fn disconnect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn connected_view_model(name: &'static str) -> MainViewModel<FakeClient> {
        let mut view_model = MainViewModel::new();
        assert!(view_model.begin_connect());
        assert_eq!(view_model.complete_connect(ConnectOutcome::Connected(FakeClient(name))), None);
        view_model
    }

    #[test]
    fn starts_disconnected_without_dialogs() {
        let view_model = MainViewModel::<FakeClient>::new();
        assert!(!view_model.is_connected());
        assert!(!view_model.is_connecting());
        assert!(view_model.client().is_none());
        assert!(view_model.dialogs().is_empty());
    }

    #[test]
    fn second_connect_is_refused_while_one_is_running() {
        let mut view_model = MainViewModel::<FakeClient>::new();
        assert!(view_model.begin_connect());
        assert!(!view_model.begin_connect());

        view_model.complete_connect(ConnectOutcome::Aborted);
        assert!(!view_model.is_connecting());
        assert!(view_model.begin_connect());
    }

    #[test]
    fn new_connection_hands_back_the_replaced_client() {
        let mut view_model = connected_view_model("first");

        view_model.begin_connect();
        let replaced = view_model.complete_connect(ConnectOutcome::Connected(FakeClient("second")));

        assert_eq!(replaced, Some(FakeClient("first")));
        assert_eq!(view_model.client(), Some(&FakeClient("second")));
        assert!(view_model.is_connected());
    }

    #[test]
    fn reconnecting_the_same_device_keeps_it_connected() {
        let mut view_model = connected_view_model("band");

        view_model.begin_connect();
        let replaced = view_model.complete_connect(ConnectOutcome::Connected(FakeClient("band")));

        assert_eq!(replaced, None);
        assert!(view_model.is_connected());
        assert_eq!(view_model.client(), Some(&FakeClient("band")));
    }

    #[test]
    fn failed_attempt_keeps_an_existing_connection() {
        let mut view_model = connected_view_model("first");

        view_model.begin_connect();
        assert_eq!(view_model.complete_connect(ConnectOutcome::ConnectionFailed), None);

        assert!(view_model.is_connected());
        assert_eq!(view_model.client(), Some(&FakeClient("first")));
        assert_eq!(view_model.dialogs().current(), Some(&Dialog::connection_error()));
    }

    #[test]
    fn lost_connection_clears_the_flag() {
        let mut view_model = connected_view_model("band");

        assert_eq!(view_model.connection_lost(), Some(FakeClient("band")));
        assert!(!view_model.is_connected());
        assert!(view_model.client().is_none());
        assert!(view_model.dialogs().is_empty());
    }

    #[test]
    fn release_gives_up_the_client() {
        let mut view_model = connected_view_model("band");

        assert_eq!(view_model.release(), Some(FakeClient("band")));
        assert_eq!(view_model.release(), None);
        assert!(!view_model.is_connected());
    }

    #[test]
    fn recording_changes_nothing() {
        let mut view_model = MainViewModel::<FakeClient>::new();
        view_model.record_sensors();

        assert!(!view_model.is_connected());
        assert!(view_model.dialogs().is_empty());
    }

    #[derive(Debug, Clone)]
    enum Check {
        Connected,
        Disconnected,
        Fails,
        Hangs,
    }

    #[derive(Debug, Clone)]
    struct WatchedClient(Check);

    #[async_trait]
    impl DeviceClient for WatchedClient {
        fn id(&self) -> String {
            "watched".to_string()
        }

        fn name(&self) -> String {
            "watched".to_string()
        }

        async fn is_connected(&self) -> Result<bool, DeviceError> {
            match self.0 {
                Check::Connected => Ok(true),
                Check::Disconnected => Ok(false),
                Check::Fails => Err(DeviceError::from(btleplug::Error::NotConnected)),
                Check::Hangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(true)
                },
            }
        }

        async fn disconnect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    const DEADLINE: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn connected_device_passes_the_check() {
        assert!(still_connected(&WatchedClient(Check::Connected), DEADLINE).await);
    }

    #[tokio::test]
    async fn disconnected_device_fails_the_check() {
        assert!(!still_connected(&WatchedClient(Check::Disconnected), DEADLINE).await);
    }

    #[tokio::test]
    async fn erroring_check_counts_as_disconnected() {
        assert!(!still_connected(&WatchedClient(Check::Fails), DEADLINE).await);
    }

    #[tokio::test]
    async fn check_past_the_deadline_counts_as_disconnected() {
        assert!(!still_connected(&WatchedClient(Check::Hangs), DEADLINE).await);
    }
}
