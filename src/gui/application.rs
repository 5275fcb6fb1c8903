use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use iced::{Alignment, Application, Command, Element, Length, Settings, Size, Subscription, executor, window};
use iced::event::{self, Event};
use iced::time::{every as iced_time_every};
use iced::theme::{self, Theme};
use iced::widget::{Row, button, column, container, horizontal_rule, row, text};
use iced::window::icon;
use log::{error, info, warn};
use tokio_util::sync::{CancellationToken};

use crate::config::io::{ConfigIO};
use crate::config::types::Config;
use crate::device::btle::{BtleClient, BtleDeviceManager};
use crate::device::constants::{CONNECTION_CHECK_INTERVAL, IS_CONNECTED_DEADLINE};
use crate::device::manager::DeviceClient;
use crate::device::types::ConnectOutcome;
use crate::error::AppRunError;
use crate::gui::dialog::{Dialog, DialogAction};
use crate::gui::open::open_bluetooth_settings;
use crate::gui::style::ConnectionStatusStyleSheet;
use crate::gui::types::Message;
use crate::gui::view_model::{MainViewModel, connect_to_device, still_connected};

pub struct ApplicationFlags {
    config_io: ConfigIO,
}

pub struct BandRecorderApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    config_io: ConfigIO,

    // replaced once the config has been loaded
    device_manager: Arc<BtleDeviceManager>,

    view_model: MainViewModel<BtleClient>,
}

impl BandRecorderApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
    }

    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();

        let fut = async move {
            match config_io.read().await {
                Ok(Some(config)) => (config, None),
                Ok(None) => {
                    // this is probably the first start of the app
                    info!("Config file is empty, writing defaults");
                    let config = Config::default();
                    if let Err(err) = config_io.save(config.clone()).await {
                        error!("Failed to save config: {:?}", &err);
                    }
                    (config, None)
                },
                Err(err) => {
                    let mut error_message: Option<String> = None;

                    if err.is_file_not_found_error() {
                        info!("Config file not found, using defaults");
                    } else {
                        error!("Failed to load config: {:?}", &err);
                        error_message = Some(format!("Failed to load config: {}", &err));
                    }
                    (Config::default(), error_message)
                },
            }
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn connect(&self) -> Command<Message> {
        let cancel = self.app_cancel.clone();
        let manager = self.device_manager.clone();

        let fut = async move {
            tokio::select! {
                _ = cancel.cancelled() => ConnectOutcome::Aborted,
                outcome = connect_to_device(manager.as_ref()) => outcome,
            }
        };

        Command::perform(fut, Message::ConnectComplete)
    }

    fn check_connection(&self, client: BtleClient) -> Command<Message> {
        let fut = async move {
            still_connected(&client, Duration::from_millis(IS_CONNECTED_DEADLINE)).await
        };

        Command::perform(fut, Message::ConnectionChecked)
    }

    fn disconnect<F>(&self, client: BtleClient, on_complete: F) -> Command<Message>
        where F: 'static + Send + FnOnce(()) -> Message
    {
        let fut = async move {
            if let Err(err) = client.disconnect().await {
                warn!("Failed to disconnect from {}: {:?}", client.name(), err);
            }
        };

        Command::perform(fut, on_complete)
    }

    fn open_settings(&self) -> Command<Message> {
        let fut = async move {
            match open_bluetooth_settings().await {
                Ok(_) => true,
                Err(err) => {
                    error!("Failed to open bluetooth settings: {:?}", &err);
                    false
                },
            }
        };

        Command::perform(fut, Message::SettingsOpened)
    }
}

impl Application for BandRecorderApplication {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (BandRecorderApplication, Command<Self::Message>) {
        let app = BandRecorderApplication {
            app_cancel: CancellationToken::new(),
            config_io: flags.config_io,
            device_manager: Arc::new(BtleDeviceManager::new(Config::default().discovery_settings())),
            view_model: MainViewModel::new(),
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        String::from(concat!("Band Data Recorder ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((config, error_message)) => {
                info!("Config load complete");
                self.device_manager = Arc::new(BtleDeviceManager::new(config.discovery_settings()));
                if let Some(error_message) = error_message {
                    self.view_model.dialogs_mut().show(Dialog::notice("Configuration error", error_message));
                }
            },
            Message::ConnectPress => {
                if self.view_model.begin_connect() {
                    return self.connect();
                }
            },
            Message::ConnectComplete(outcome) => {
                if let Some(replaced) = self.view_model.complete_connect(outcome) {
                    return self.disconnect(replaced, Message::DisconnectComplete);
                }
            },
            Message::RecordPress => {
                self.view_model.record_sensors();
            },
            Message::DialogActionPress(action) => {
                self.view_model.dialogs_mut().close_current();

                if action == DialogAction::OpenBluetoothSettings {
                    return self.open_settings();
                }
            },
            Message::CheckConnection => {
                if let Some(client) = self.view_model.client() {
                    return self.check_connection(client.clone());
                }
            },
            Message::ConnectionChecked(false) => {
                if let Some(lost) = self.view_model.connection_lost() {
                    return self.disconnect(lost, Message::DisconnectComplete);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();

                return match self.view_model.release() {
                    Some(client) => self.disconnect(client, move |_| Message::ReadyToClose(id)),
                    None => window::close(id),
                };
            },
            Message::ReadyToClose(id) => {
                return window::close(id);
            },

            _ => {}
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            event::listen().map(Message::EventOccurred),
        ];

        if self.view_model.is_connected() {
            subscriptions.push(
                iced_time_every(Duration::from_millis(CONNECTION_CHECK_INTERVAL)).map(|_| Message::CheckConnection)
            );
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<Message> {
        if let Some(dialog) = self.view_model.dialogs().current() {
            let actions = Row::with_children(
                dialog.actions
                    .iter()
                    .map(|action| button(text(action.label())).on_press(Message::DialogActionPress(*action)))
                    .map(Element::from)
            ).spacing(20);

            return container(
                column![
                    text(&dialog.title).size(20),
                    text(&dialog.message),
                    actions,
                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let connected = self.view_model.is_connected();
        let status = match self.view_model.client() {
            Some(client) if connected => format!("Connected to {}", client.name()),
            _ if self.view_model.is_connecting() => "Connecting…".to_string(),
            _ => "Not connected".to_string(),
        };

        let mut connect_button = button(text("Connect to band"))
            .style(theme::Button::Primary);

        if !self.view_model.is_connecting() {
            connect_button = connect_button.on_press(Message::ConnectPress);
        }

        let record_button = button(text("Record sensors"))
            .style(theme::Button::Secondary)
            .on_press(Message::RecordPress);

        container(
            column![
                container(text(status))
                    .padding(10)
                    .style(theme::Container::Custom(Box::new(ConnectionStatusStyleSheet { connected }))),

                horizontal_rule(10),

                row![connect_button, record_button]
                    .align_items(Alignment::Center)
                    .spacing(20),
            ]
                .spacing(30)
                .width(Length::Fill)
                .align_items(Alignment::Center),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

// A filled circle on a transparent background.
fn make_icon() -> Option<icon::Icon> {
    const SIZE: u32 = 32;
    let center = (SIZE as f32 - 1.0) / 2.0;
    let radius = SIZE as f32 / 2.0 - 2.0;

    let mut rgba = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let distance = ((x as f32 - center).powi(2) + (y as f32 - center).powi(2)).sqrt();
            if distance <= radius {
                rgba.extend_from_slice(&[0x1E, 0x88, 0xE5, 0xFF]);
            } else {
                rgba.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
            }
        }
    }

    match icon::from_rgba(rgba, SIZE, SIZE) {
        Ok(icon) => Some(icon),
        Err(err) => {
            warn!("Failed to create window icon: {}", err);
            None
        },
    }
}

pub fn run_application(config_path: Option<PathBuf>) -> Result<(), AppRunError> {
    let mut config_io = ConfigIO::new_sync(config_path)?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let flags = ApplicationFlags { config_io };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("band-data-recorder".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(480.0, 240.0);
    settings.window.resizable = false;
    settings.window.icon = make_icon();

    // this function will call process::exit() unless there was a startup error
    BandRecorderApplication::run(settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_icon_is_valid_rgba() {
        assert!(make_icon().is_some());
    }
}
