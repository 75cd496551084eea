//! Chat Widget
//!
//! Runs one chat widget against an in-memory room registry and walks it
//! through a short session.
//!
//! Key concepts:
//! - Parallel regions reacting to the same event stream
//! - Deep history restoring the input mode after loading
//! - Debounced resize settling on tokio time
//! - Room initialization as an invoked effect
//!
//! The room and display mode come from `CHAT_WIDGET_ROOM_ID` and
//! `CHAT_WIDGET_MODE`; the room defaults to `lobby`.
//!
//! Run with: cargo run --example chat_widget

use chartmind::runtime::Snapshot;
use chartmind::widget::{
    widget_chart, ChatEvent, ChatHost, ChatSession, ChatWidget, InMemoryRegistry,
    RecordingNotifier, RoomRegistry, WidgetConfig, WidgetState, APP_RESIZE_SETTLE,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn print_leaves(label: &str, snapshot: &Snapshot<ChatWidget>) {
    let leaves: Vec<_> = snapshot
        .value()
        .map(|value| value.leaves())
        .unwrap_or_default();
    println!("{label:<22} {leaves:?}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    println!("=== Chat Widget Example ===\n");

    let mut config = WidgetConfig::from_env();
    if config.room_id.is_none() {
        config.room_id = Some("lobby".to_string());
    }
    println!("Room: {:?}, mode: {}\n", config.room_id, config.mode);

    let registry = Arc::new(InMemoryRegistry::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let host = ChatHost::new(registry.clone(), notifier.clone());
    let mut session = ChatSession::new(Arc::new(widget_chart()?), &config, host);

    session.start()?;
    while !session.is_active() && !session.is_failed() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    if session.is_failed() {
        println!("Widget failed: {:?}", session.snapshot().context().error);
        return Ok(());
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
    print_leaves("Initialized:", &session.snapshot());

    session.send(ChatEvent::send_message("Hello from the demo"))?;
    print_leaves("Message sent:", &session.snapshot());

    session.send(ChatEvent::StartRecording)?;
    session.send(ChatEvent::LoadingStart)?;
    print_leaves("Loading:", &session.snapshot());
    session.send(ChatEvent::LoadingEnd)?;
    print_leaves("Loading finished:", &session.snapshot());
    session.send(ChatEvent::CancelRecording)?;

    session.send(ChatEvent::resize_app(800.0, 600.0))?;
    session.send(ChatEvent::resize_app(1024.0, 768.0))?;
    print_leaves("Resizing:", &session.snapshot());
    tokio::time::sleep(APP_RESIZE_SETTLE + Duration::from_millis(20)).await;
    let snapshot = session.snapshot();
    print_leaves("Resize settled:", &snapshot);
    println!("App size: {:?}", snapshot.context().app_size);
    assert!(snapshot.matches(WidgetState::AppResizeStop));

    session.send(ChatEvent::show_error("Upload failed"))?;
    println!("Host notified: {:?}", notifier.errors());

    let room = config.room_id.as_deref().unwrap_or_default();
    let stored = registry.messages(room).map(|messages| messages.len())?;
    println!("Stored messages: {stored}");

    session.stop()?;
    println!("\nStopped; room still registered: {}", registry.has_room(room));

    Ok(())
}
