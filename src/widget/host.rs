//! Collaborators the widget calls out to.
//!
//! The interpreter never owns these: one registry instance is created by
//! whatever orchestrates sessions and handed to every widget through
//! [`ChatHost`].

use super::context::Message;
use crate::core::InvokeError;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Room '{0}' does not exist")]
    UnknownRoom(String),
    #[error("Room registry unavailable")]
    Unavailable,
}

impl From<RegistryError> for InvokeError {
    fn from(err: RegistryError) -> Self {
        InvokeError::new(err.to_string())
    }
}

/// Rooms and their message queues, keyed by opaque room id.
pub trait RoomRegistry: Send + Sync {
    /// Create the room if it does not exist yet.
    fn create_room(&self, room_id: &str) -> Result<(), RegistryError>;

    /// Returns false if there was no such room.
    fn remove_room(&self, room_id: &str) -> bool;

    fn messages(&self, room_id: &str) -> Result<Vec<Message>, RegistryError>;

    fn send_message(&self, room_id: &str, message: Message) -> Result<(), RegistryError>;
}

/// Receives user-facing notifications from the widget.
pub trait HostNotifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Collaborators handed to effect actions and the init invocation.
#[derive(Clone)]
pub struct ChatHost {
    pub registry: Arc<dyn RoomRegistry>,
    pub notifier: Arc<dyn HostNotifier>,
}

impl ChatHost {
    pub fn new(registry: Arc<dyn RoomRegistry>, notifier: Arc<dyn HostNotifier>) -> Self {
        Self { registry, notifier }
    }
}

impl fmt::Debug for ChatHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatHost").finish_non_exhaustive()
    }
}

/// Process-local registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    rooms: RwLock<HashMap<String, Vec<Message>>>,
    offline: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`RegistryError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.read().contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    fn check_online(&self) -> Result<(), RegistryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable);
        }
        Ok(())
    }
}

impl RoomRegistry for InMemoryRegistry {
    fn create_room(&self, room_id: &str) -> Result<(), RegistryError> {
        self.check_online()?;
        self.rooms.write().entry(room_id.to_string()).or_default();
        debug!(room = room_id, "Room created");
        Ok(())
    }

    fn remove_room(&self, room_id: &str) -> bool {
        let removed = self.rooms.write().remove(room_id).is_some();
        if removed {
            debug!(room = room_id, "Room removed");
        }
        removed
    }

    fn messages(&self, room_id: &str) -> Result<Vec<Message>, RegistryError> {
        self.check_online()?;
        self.rooms
            .read()
            .get(room_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownRoom(room_id.to_string()))
    }

    fn send_message(&self, room_id: &str, message: Message) -> Result<(), RegistryError> {
        self.check_online()?;
        let mut rooms = self.rooms.write();
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| RegistryError::UnknownRoom(room_id.to_string()))?;
        room.push(message);
        Ok(())
    }
}

/// Notifier that keeps every message it was given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl HostNotifier for RecordingNotifier {
    fn error(&self, message: &str) {
        warn!(message, "Widget error shown");
        self.errors.lock().push(message.to_string());
    }
}
