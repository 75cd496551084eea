//! Extended state of a chat widget.

use super::config::{DisplayMode, WidgetConfig};
use crate::core::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author recorded on messages sent from this widget.
pub const LOCAL_AUTHOR: &str = "me";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Attachment { file_name: String },
}

/// One chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author: String,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn text(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(author, MessageBody::Text(text.into()))
    }

    pub fn attachment(author: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self::new(
            author,
            MessageBody::Attachment {
                file_name: file_name.into(),
            },
        )
    }

    fn new(author: impl Into<String>, body: MessageBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            body,
            sent_at: Utc::now(),
        }
    }
}

/// Progress of one pointer drag.
///
/// Each method returns the updated tracker; the widget stores it through a
/// context patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DragTracker {
    pub origin: Option<Point>,
    pub current: Option<Point>,
    pub moves: u32,
    /// Offset of the last completed drag.
    pub last_offset: Option<Point>,
}

impl DragTracker {
    pub fn begin(self, at: Point) -> Self {
        Self {
            origin: Some(at),
            current: Some(at),
            moves: 0,
            last_offset: self.last_offset,
        }
    }

    pub fn track(self, at: Point) -> Self {
        Self {
            current: Some(at),
            moves: self.moves + 1,
            ..self
        }
    }

    /// Close the drag at `at`, keeping its total offset.
    pub fn finish(self, at: Point) -> Self {
        let last_offset = self.origin.map(|origin| Point {
            x: at.x - origin.x,
            y: at.y - origin.y,
        });
        Self {
            origin: None,
            current: None,
            moves: self.moves,
            last_offset,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChatContext {
    pub room_id: Option<String>,
    pub mode: DisplayMode,
    pub messages: Vec<Message>,
    pub scroll_offset: f64,
    pub input_size: Option<Size>,
    pub app_size: Option<Size>,
    pub drag: DragTracker,
    /// Message shown by the alert region.
    pub alert: Option<String>,
    /// Why the widget failed to start.
    pub error: Option<String>,
}

impl ChatContext {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            room_id: config.room_id.clone(),
            mode: config.mode,
            ..Self::default()
        }
    }

    /// The room id, if present and not blank.
    pub fn room(&self) -> Option<&str> {
        self.room_id.as_deref().filter(|room| !room.trim().is_empty())
    }
}

/// One field assignment on [`ChatContext`].
#[derive(Debug)]
pub enum ChatPatch {
    Messages(Vec<Message>),
    AppendMessage(Message),
    ScrollOffset(f64),
    InputSize(Size),
    AppSize(Size),
    Drag(DragTracker),
    Alert(Option<String>),
    Error(String),
}

impl Context for ChatContext {
    type Patch = ChatPatch;

    fn apply(&mut self, patch: ChatPatch) {
        match patch {
            ChatPatch::Messages(messages) => self.messages = messages,
            ChatPatch::AppendMessage(message) => self.messages.push(message),
            ChatPatch::ScrollOffset(offset) => self.scroll_offset = offset,
            ChatPatch::InputSize(size) => self.input_size = Some(size),
            ChatPatch::AppSize(size) => self.app_size = Some(size),
            ChatPatch::Drag(drag) => self.drag = drag,
            ChatPatch::Alert(alert) => self.alert = alert,
            ChatPatch::Error(error) => self.error = Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    #[test]
    fn drag_tracker_records_the_total_offset() {
        let drag = DragTracker::default()
            .begin(at(10.0, 10.0))
            .track(at(12.0, 15.0))
            .track(at(20.0, 30.0));
        assert!(drag.is_dragging());
        assert_eq!(drag.moves, 2);

        let done = drag.finish(at(25.0, 40.0));

        assert!(!done.is_dragging());
        assert_eq!(done.last_offset, Some(at(15.0, 30.0)));
    }

    #[test]
    fn blank_room_ids_count_as_missing() {
        let mut ctx = ChatContext::default();
        assert_eq!(ctx.room(), None);

        ctx.room_id = Some("  ".into());
        assert_eq!(ctx.room(), None);

        ctx.room_id = Some("r1".into());
        assert_eq!(ctx.room(), Some("r1"));
    }

    #[test]
    fn patches_assign_single_fields() {
        let mut ctx = ChatContext::default();
        ctx.apply_all([
            ChatPatch::AppendMessage(Message::text("a", "hello")),
            ChatPatch::AppSize(Size {
                width: 100.0,
                height: 50.0,
            }),
            ChatPatch::Alert(Some("oops".into())),
        ]);

        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.app_size.map(|s| s.width), Some(100.0));
        assert_eq!(ctx.alert.as_deref(), Some("oops"));
    }
}
