//! The chat widget statechart.
//!
//! One [`ChatSession`] per room. Eight regions run side by side once the
//! room is initialized: attachments, text and audio input, the message list,
//! scroll and resize tracking, drag tracking and the alert banner.

mod chart;
mod config;
mod context;
mod events;
mod host;
mod session;
mod states;

use crate::core::Statechart;

pub use chart::{
    widget_chart, APP_RESIZE_SETTLE, DRAG_MOVE_SETTLE, INPUT_RESIZE_SETTLE, SCROLL_SETTLE,
};
pub use config::{
    AttributeSource, ConfigError, DisplayMode, UnknownMode, WidgetConfig, MODE_ATTRIBUTE,
    MODE_ENV, ROOM_ID_ATTRIBUTE, ROOM_ID_ENV,
};
pub use context::{
    ChatContext, ChatPatch, DragTracker, Message, MessageBody, Point, Size, LOCAL_AUTHOR,
};
pub use events::ChatEvent;
pub use host::{
    ChatHost, HostNotifier, InMemoryRegistry, RecordingNotifier, RegistryError, RoomRegistry,
};
pub use session::ChatSession;
pub use states::WidgetState;

/// Type bundle of the chat widget chart.
pub struct ChatWidget;

impl Statechart for ChatWidget {
    type State = WidgetState;
    type Event = ChatEvent;
    type Context = ChatContext;
    type Output = Vec<Message>;
    type Host = ChatHost;
}
