use iced::{Background, Border, Color, Shadow, Theme};
use iced::widget::container::{StyleSheet, Appearance};

const CONNECTED_COLOR: Color = Color { r: 0.18, g: 0.62, b: 0.29, a: 1.0 };
const DISCONNECTED_COLOR: Color = Color { r: 0.55, g: 0.55, b: 0.55, a: 1.0 };

/// Badge behind the connection status text.
pub struct ConnectionStatusStyleSheet {
    pub connected: bool,
}

impl StyleSheet for ConnectionStatusStyleSheet {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> Appearance {
        let color = if self.connected { CONNECTED_COLOR } else { DISCONNECTED_COLOR };

        Appearance {
            text_color: Some(Color::WHITE),
            background: Some(Background::Color(color)),
            border: Border {
                color: Color::TRANSPARENT,
                width: 0.0,
                radius: 4.0.into(),
            },
            shadow: Shadow::default(),
        }
    }
}
