use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    OpenBluetoothSettings,
    Dismiss,
}

impl DialogAction {
    pub fn label(&self) -> &'static str {
        match self {
            DialogAction::OpenBluetoothSettings => "Check settings",
            DialogAction::Dismiss => "OK",
        }
    }
}

/// A modal message with the actions the user can pick from. Every action closes the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub actions: Vec<DialogAction>,
}

impl Dialog {
    pub fn device_not_found() -> Self {
        Dialog {
            title: "Band not found".to_string(),
            message: "A band is not connected to this device. Please check your Bluetooth connection and try again.".to_string(),
            actions: vec![DialogAction::OpenBluetoothSettings, DialogAction::Dismiss],
        }
    }

    pub fn connection_error() -> Self {
        Dialog {
            title: "Band connection error".to_string(),
            message: "The band could not be connected to. Please check your Bluetooth connection and try again.".to_string(),
            actions: vec![DialogAction::OpenBluetoothSettings, DialogAction::Dismiss],
        }
    }

    pub fn notice(title: &str, message: String) -> Self {
        Dialog {
            title: title.to_string(),
            message,
            actions: vec![DialogAction::Dismiss],
        }
    }
}

#[derive(Debug, Default)]
pub struct DialogQueue {
    pending: VecDeque<Dialog>,
}

impl DialogQueue {
    pub fn show(&mut self, dialog: Dialog) {
        self.pending.push_back(dialog);
    }

    pub fn current(&self) -> Option<&Dialog> {
        self.pending.front()
    }

    /// Closes the dialog on screen; returns it so the caller can act on the chosen action.
    pub fn close_current(&mut self) -> Option<Dialog> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
