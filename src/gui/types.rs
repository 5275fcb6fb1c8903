use iced::{Event, window};

use crate::config::types::Config;
use crate::device::btle::BtleClient;
use crate::device::types::ConnectOutcome;
use crate::gui::dialog::DialogAction;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)),
    ConfigSaveComplete(Option<String>),
    ConnectPress,
    ConnectComplete(ConnectOutcome<BtleClient>),
    RecordPress,
    DialogActionPress(DialogAction),
    SettingsOpened(bool), // true if success, false if failed
    CheckConnection,
    ConnectionChecked(bool),
    DisconnectComplete(()),
    ReadyToClose(window::Id),
}
