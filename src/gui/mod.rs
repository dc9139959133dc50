/// ICED settings dialog
///
/// Architecture:
/// - This window is owned by the `hourglass_settings` process
/// - The overlay process launches it and owns the settings record
/// - Every edit is sent back to the overlay as a `DialogMessage` on stdout
use crate::config::{MAX_DURATION, MAX_SIZE, MIN_DURATION, MIN_SIZE};
use crate::dialog::{self, DialogFlags, DialogMessage};
use iced::{
    executor,
    widget::{Button, Column, Row, Slider, Text, TextInput},
    Alignment, Application, Command, Element, Length, Settings, Theme,
};

#[derive(Debug, Clone)]
pub enum Message {
    SizeChanged(u32),
    DurationChanged(u32),
    /// Raw contents of the duration field
    DurationEdited(String),
    /// Enter pressed in the duration field
    DurationSubmitted,
    Fill,
}

pub struct SettingsDialog {
    size: u32,
    duration: u32,
    edit_duration: String,
}

impl SettingsDialog {
    pub fn with_flags(flags: DialogFlags) -> Self {
        SettingsDialog {
            size: flags.size,
            duration: flags.duration,
            edit_duration: flags.duration.to_string(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn edit_duration(&self) -> &str {
        &self.edit_duration
    }

    /// Apply a UI message, returning what to tell the overlay
    pub fn handle(&mut self, message: Message) -> Option<DialogMessage> {
        match message {
            Message::SizeChanged(size) => {
                let size = size.clamp(MIN_SIZE, MAX_SIZE);
                if size == self.size {
                    return None;
                }
                self.size = size;
            }
            Message::DurationChanged(duration) => {
                let duration = duration.clamp(MIN_DURATION, MAX_DURATION);
                self.edit_duration = duration.to_string();
                if duration == self.duration {
                    return None;
                }
                self.duration = duration;
            }
            Message::DurationEdited(value) => {
                if value.chars().all(|c| c.is_ascii_digit()) {
                    self.edit_duration = value;
                }
                return None;
            }
            Message::DurationSubmitted => {
                let Some(typed) = parse_duration(&self.edit_duration) else {
                    self.edit_duration = self.duration.to_string();
                    return None;
                };
                return self.handle(Message::DurationChanged(typed));
            }
            Message::Fill => return Some(DialogMessage::Refill),
        }

        Some(DialogMessage::Apply {
            size: self.size,
            duration: self.duration,
        })
    }

    fn duration_step(&self, delta: i64) -> Option<Message> {
        let target = (i64::from(self.duration) + delta)
            .clamp(i64::from(MIN_DURATION), i64::from(MAX_DURATION)) as u32;
        (target != self.duration).then_some(Message::DurationChanged(target))
    }
}

fn step_button(label: &str, message: Option<Message>) -> Button<'_, Message> {
    let button = Button::new(Text::new(label)).padding(5);
    match message {
        Some(message) => button.on_press(message),
        None => button,
    }
}

/// Typed seconds, saturating on overflow; `None` when nothing was typed
fn parse_duration(text: &str) -> Option<u32> {
    let digits = text.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

/// "1h 02m 05s" style rendering of a duration in seconds
pub fn format_duration(seconds: u32) -> String {
    let (h, m, s) = (seconds / 3600, (seconds / 60) % 60, seconds % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

impl Application for SettingsDialog {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = DialogFlags;

    fn new(flags: DialogFlags) -> (Self, Command<Message>) {
        (SettingsDialog::with_flags(flags), Command::none())
    }

    fn title(&self) -> String {
        String::from("Settings")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        if let Some(outgoing) = self.handle(message) {
            if let Err(e) = dialog::emit(&outgoing) {
                tracing::warn!("Overlay did not receive {:?}: {}", outgoing, e);
            }
        }
        Command::none()
    }

    fn view(&self) -> Element<'_, Message> {
        let size_section = Column::new()
            .spacing(5)
            .push(Text::new(format!("Size ({} to {} px): {}", MIN_SIZE, MAX_SIZE, self.size)))
            .push(Slider::new(MIN_SIZE..=MAX_SIZE, self.size, Message::SizeChanged));

        let duration_section = Column::new()
            .spacing(5)
            .push(Text::new(format!(
                "Duration (sec): {} ({})",
                self.duration,
                format_duration(self.duration)
            )))
            .push(
                Row::new()
                    .spacing(5)
                    .align_items(Alignment::Center)
                    .push(step_button("-60", self.duration_step(-60)))
                    .push(step_button("-1", self.duration_step(-1)))
                    .push(
                        TextInput::new("60", &self.edit_duration)
                            .on_input(Message::DurationEdited)
                            .on_submit(Message::DurationSubmitted)
                            .width(Length::Fixed(70.0))
                            .padding(5),
                    )
                    .push(step_button("+1", self.duration_step(1)))
                    .push(step_button("+60", self.duration_step(60))),
            );

        Column::new()
            .spacing(15)
            .padding(15)
            .width(Length::Fill)
            .push(size_section)
            .push(duration_section)
            .push(
                Button::new(Text::new("Fill"))
                    .on_press(Message::Fill)
                    .padding(8),
            )
            .into()
    }
}

/// Run the dialog until its window is closed
pub fn run(flags: DialogFlags) -> iced::Result {
    SettingsDialog::run(Settings {
        flags,
        window: iced::window::Settings {
            size: iced::Size::new(340.0, 220.0),
            resizable: false,
            level: iced::window::Level::AlwaysOnTop,
            ..Default::default()
        },
        ..Default::default()
    })
}
