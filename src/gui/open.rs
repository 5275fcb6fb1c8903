use open;
use tokio::task::spawn_blocking;
use crate::error::SettingsOpenError;

#[cfg(target_os = "windows")]
fn launch_bluetooth_settings() -> std::io::Result<()> {
    open::that("ms-settings:bluetooth")
}

#[cfg(target_os = "macos")]
fn launch_bluetooth_settings() -> std::io::Result<()> {
    open::that("x-apple.systempreferences:com.apple.BluetoothSettings")
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn launch_bluetooth_settings() -> std::io::Result<()> {
    open::with("bluetooth", "gnome-control-center")
}

pub async fn open_bluetooth_settings() -> Result<(), SettingsOpenError> {
    match spawn_blocking(launch_bluetooth_settings).await {
        Ok(result) => result?,
        Err(join_err) => return Err(SettingsOpenError::from(std::io::Error::other(join_err))),
    }

    Ok(())
}
