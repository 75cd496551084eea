//! Events the host sends to a chat widget.

use super::context::{Message, Point, Size};
use crate::core::Event;
use serde::{Deserialize, Serialize};

/// Everything the widget reacts to.
///
/// Event names follow the host's SCREAMING_SNAKE convention, e.g.
/// `OPEN_ATTACHMENT`; transitions are keyed on those names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatEvent {
    OpenAttachment,
    CloseAttachment,
    SendAttachment { file_name: String },
    SendMessage { text: String },
    StartRecording,
    StopRecording,
    CancelRecording,
    DiscardAudio,
    LoadingStart,
    LoadingEnd,
    MessageReceived { message: Message },
    Scroll { offset: f64 },
    ResizeInput { size: Size },
    ResizeApp { size: Size },
    DragStart { at: Point },
    DragMove { at: Point },
    DragEnd { at: Point },
    ShowError { message: String },
    DismissError,
}

impl ChatEvent {
    pub fn send_message(text: impl Into<String>) -> Self {
        Self::SendMessage { text: text.into() }
    }

    pub fn resize_app(width: f64, height: f64) -> Self {
        Self::ResizeApp {
            size: Size { width, height },
        }
    }

    pub fn resize_input(width: f64, height: f64) -> Self {
        Self::ResizeInput {
            size: Size { width, height },
        }
    }

    pub fn show_error(message: impl Into<String>) -> Self {
        Self::ShowError {
            message: message.into(),
        }
    }

    /// Message text carrying actual content, if this is a send.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::SendMessage { text } if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

impl Event for ChatEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAttachment => "OPEN_ATTACHMENT",
            Self::CloseAttachment => "CLOSE_ATTACHMENT",
            Self::SendAttachment { .. } => "SEND_ATTACHMENT",
            Self::SendMessage { .. } => "SEND_MESSAGE",
            Self::StartRecording => "START_RECORDING",
            Self::StopRecording => "STOP_RECORDING",
            Self::CancelRecording => "CANCEL_RECORDING",
            Self::DiscardAudio => "DISCARD_AUDIO",
            Self::LoadingStart => "LOADING_START",
            Self::LoadingEnd => "LOADING_END",
            Self::MessageReceived { .. } => "MESSAGE_RECEIVED",
            Self::Scroll { .. } => "SCROLL",
            Self::ResizeInput { .. } => "RESIZE_INPUT",
            Self::ResizeApp { .. } => "RESIZE_APP",
            Self::DragStart { .. } => "DRAG_START",
            Self::DragMove { .. } => "DRAG_MOVE",
            Self::DragEnd { .. } => "DRAG_END",
            Self::ShowError { .. } => "SHOW_ERROR",
            Self::DismissError => "DISMISS_ERROR",
        }
    }
}
