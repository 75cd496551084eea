//! The chat widget chart.
//!
//! ```text
//! Widget
//! ├─ Boot            checks the room id, then initializes
//! ├─ Initializing    creates the room and loads its messages
//! ├─ Failed          final
//! └─ Active          parallel
//!    ├─ Attachment   closed / open, or disabled in text-only mode
//!    ├─ Input        typing, recording, playback; blocked while loading
//!    ├─ MessageList  idle / painting
//!    ├─ Scroll, InputResize, AppResize, Drag   debounced by timers
//!    └─ Alert        hidden / shown
//! ```

use super::config::DisplayMode;
use super::context::{ChatContext, ChatPatch, Message, LOCAL_AUTHOR};
use super::events::ChatEvent;
use super::host::ChatHost;
use super::states::WidgetState::{self, *};
use super::ChatWidget;
use crate::builder::{ChartBuilder, ChartError, StateBuilder, TransitionBuilder};
use crate::chart::{ChartDefinition, HistoryMode, Invocation};
use crate::core::{Action, Guard, InvokeError};
use std::time::Duration;
use stillwater::prelude::*;
use tracing::warn;

type Node = StateBuilder<ChatWidget>;
type On = TransitionBuilder<ChatWidget>;

pub const SCROLL_SETTLE: Duration = Duration::from_millis(300);
pub const INPUT_RESIZE_SETTLE: Duration = Duration::from_millis(150);
pub const APP_RESIZE_SETTLE: Duration = Duration::from_millis(500);
pub const DRAG_MOVE_SETTLE: Duration = Duration::from_millis(10);

/// Build the widget chart. One definition can back any number of sessions.
pub fn widget_chart() -> Result<ChartDefinition<ChatWidget>, ChartError> {
    ChartBuilder::new(
        Node::compound(Widget, Boot)
            .exit(deregister_room())
            .child(
                Node::atomic(Boot)
                    .on(On::after_ms(0)
                        .to(Failed)
                        .when(room_missing())
                        .action(fail_missing_room()))
                    .on(On::after_ms(0).to(Initializing)),
            )
            .child(
                Node::atomic(Initializing)
                    .invoke(init_room())
                    .on(On::invoke_done().to(Active).action(store_messages()))
                    .on(On::invoke_error().to(Failed).action(record_init_error())),
            )
            .child(Node::final_state(Failed))
            .child(Node::parallel(Active).children([
                attachment(),
                input(),
                message_list(),
                scroll(),
                input_resize(),
                app_resize(),
                drag(),
                alert(),
            ])),
    )
    .build()
}

fn attachment() -> Node {
    Node::compound(Attachment, AttachmentInit)
        .child(
            Node::atomic(AttachmentInit)
                .on(On::after_ms(0).to(AttachmentDisabled).when(text_only()))
                .on(On::after_ms(0).to(AttachmentClosed)),
        )
        .child(Node::final_state(AttachmentDisabled))
        .child(Node::atomic(AttachmentClosed).on(On::on("OPEN_ATTACHMENT").to(AttachmentOpen)))
        .child(
            Node::atomic(AttachmentOpen)
                .on(On::on("CLOSE_ATTACHMENT").to(AttachmentClosed))
                .on(On::on("SEND_ATTACHMENT")
                    .to(AttachmentClosed)
                    .action(persist_attachment())),
        )
}

fn input() -> Node {
    Node::compound(Input, InputReady)
        .child(
            Node::compound(InputReady, InputTypeMode)
                .on(On::on("LOADING_START").to(InputBlocked))
                .child(
                    Node::atomic(InputTypeMode)
                        .on(On::on("SEND_MESSAGE")
                            .when(has_text())
                            .action(append_sent())
                            .action(persist_last_message()))
                        .on(On::on("START_RECORDING")
                            .to(InputAudioRecordMode)
                            .when(audio_allowed())),
                )
                .child(
                    Node::atomic(InputAudioRecordMode)
                        .on(On::on("STOP_RECORDING").to(InputAudioPlayerMode))
                        .on(On::on("CANCEL_RECORDING").to(InputTypeMode)),
                )
                .child(
                    // A send while a recording is pending changes nothing.
                    Node::atomic(InputAudioPlayerMode)
                        .on(On::on("SEND_MESSAGE").to(InputAudioPlayerMode))
                        .on(On::on("DISCARD_AUDIO").to(InputTypeMode)),
                )
                .child(Node::history(InputHistory, HistoryMode::Deep)),
        )
        .child(Node::atomic(InputBlocked).on(On::on("LOADING_END").to(InputHistory)))
}

fn message_list() -> Node {
    Node::compound(MessageList, ListIdle)
        .child(
            Node::atomic(ListIdle)
                .on(On::on("MESSAGE_RECEIVED")
                    .to(ListPainting)
                    .action(append_received()))
                .on(On::on("SEND_MESSAGE").to(ListPainting).when(has_text())),
        )
        .child(
            Node::parallel(ListPainting)
                .on(On::on("MESSAGE_RECEIVED").action(append_received()))
                .on(On::done().to(ListIdle))
                .child(
                    Node::compound(PaintBubbles, BubblesRendering)
                        .child(Node::atomic(BubblesRendering).on(On::after_ms(0).to(BubblesRendered)))
                        .child(Node::final_state(BubblesRendered)),
                )
                .child(
                    Node::compound(PaintScroll, ScrollPending)
                        .child(Node::atomic(ScrollPending).on(On::after_ms(0).to(ScrollSettled)))
                        .child(Node::final_state(ScrollSettled)),
                ),
        )
}

/// A region that leaves `idle` on `event`, stays busy while `event` keeps
/// arriving, and settles back once it has been quiet for `settle`.
fn debounced(
    region: WidgetState,
    idle: WidgetState,
    busy: WidgetState,
    event: &'static str,
    settle: Duration,
    assign: fn() -> Action<ChatWidget>,
) -> Node {
    Node::compound(region, idle)
        .child(Node::atomic(idle).on(On::on(event).to(busy).action(assign())))
        .child(
            Node::atomic(busy)
                .on(On::on(event).to(busy).reenter().action(assign()))
                .on(On::after(settle).to(idle)),
        )
}

fn scroll() -> Node {
    debounced(Scroll, ScrollIdle, Scrolling, "SCROLL", SCROLL_SETTLE, assign_scroll)
}

fn input_resize() -> Node {
    debounced(
        InputResize,
        InputResizeStop,
        InputResizing,
        "RESIZE_INPUT",
        INPUT_RESIZE_SETTLE,
        assign_input_size,
    )
}

fn app_resize() -> Node {
    debounced(
        AppResize,
        AppResizeStop,
        AppResizing,
        "RESIZE_APP",
        APP_RESIZE_SETTLE,
        assign_app_size,
    )
}

fn drag() -> Node {
    Node::compound(Drag, DragIdle)
        .child(Node::atomic(DragIdle).on(On::on("DRAG_START").to(DragActive).action(begin_drag())))
        .child(
            Node::compound(DragActive, Dragging)
                .on(On::on("DRAG_END").to(DragIdle).action(finish_drag()))
                .child(Node::atomic(Dragging).on(On::on("DRAG_MOVE").to(DragMoving).action(track_drag())))
                .child(
                    Node::atomic(DragMoving)
                        .on(On::on("DRAG_MOVE").to(DragMoving).reenter().action(track_drag()))
                        .on(On::after(DRAG_MOVE_SETTLE).to(Dragging)),
                ),
        )
}

fn alert() -> Node {
    Node::compound(Alert, AlertHidden)
        .child(
            Node::atomic(AlertHidden).on(On::on("SHOW_ERROR")
                .to(AlertShown)
                .action(show_alert())
                .action(notify_alert())),
        )
        .child(
            Node::atomic(AlertShown)
                .on(On::on("SHOW_ERROR").action(show_alert()).action(notify_alert()))
                .on(On::on("DISMISS_ERROR")
                    .to(AlertHidden)
                    .action(Action::assign("clear alert", |_, _| ChatPatch::Alert(None)))),
        )
}

// Guards

fn room_missing() -> Guard<ChatWidget> {
    Guard::context("room id missing", |ctx: &ChatContext| ctx.room().is_none())
}

fn text_only() -> Guard<ChatWidget> {
    Guard::context("text-only mode", |ctx: &ChatContext| {
        ctx.mode == DisplayMode::TextOnly
    })
}

fn audio_allowed() -> Guard<ChatWidget> {
    Guard::context("audio allowed", |ctx: &ChatContext| {
        ctx.mode != DisplayMode::TextOnly
    })
}

fn has_text() -> Guard<ChatWidget> {
    Guard::event("message has text", |event: &ChatEvent| event.text().is_some())
}

// Invocation

fn init_room() -> Invocation<ChatWidget> {
    Invocation::new("init room", |ctx: &ChatContext| {
        let room = ctx.room().map(str::to_string);
        from_fn(move |host: &ChatHost| {
            let room = room
                .clone()
                .ok_or_else(|| InvokeError::new("Missing room id"))?;
            host.registry.create_room(&room)?;
            Ok(host.registry.messages(&room)?)
        })
        .boxed()
    })
}

fn store_messages() -> Action<ChatWidget> {
    Action::assign("store messages", |_, signal| {
        ChatPatch::Messages(signal.output().cloned().unwrap_or_default())
    })
}

fn record_init_error() -> Action<ChatWidget> {
    Action::assign("record init error", |_, signal| {
        ChatPatch::Error(
            signal
                .error()
                .map_or_else(|| "Initialization failed".to_string(), ToString::to_string),
        )
    })
}

fn fail_missing_room() -> Action<ChatWidget> {
    Action::assign("missing room error", |_, _| {
        ChatPatch::Error("Missing room id".to_string())
    })
}

fn deregister_room() -> Action<ChatWidget> {
    Action::effect("deregister room", |ctx: &ChatContext, _, host: &ChatHost| {
        if let Some(room) = ctx.room() {
            host.registry.remove_room(room);
        }
    })
}

// Messages

fn append_sent() -> Action<ChatWidget> {
    Action::assign_many("append sent message", |_, signal| {
        signal
            .event()
            .and_then(ChatEvent::text)
            .map(|text| ChatPatch::AppendMessage(Message::text(LOCAL_AUTHOR, text)))
            .into_iter()
            .collect()
    })
}

fn append_received() -> Action<ChatWidget> {
    Action::assign_many("append received message", |_, signal| match signal.event() {
        Some(ChatEvent::MessageReceived { message }) => {
            vec![ChatPatch::AppendMessage(message.clone())]
        }
        _ => Vec::new(),
    })
}

/// Runs after `append sent message`, so the last message is the new one.
fn persist_last_message() -> Action<ChatWidget> {
    Action::effect("persist message", |ctx: &ChatContext, _, host: &ChatHost| {
        if let (Some(room), Some(message)) = (ctx.room(), ctx.messages.last()) {
            persist(host, room, message.clone());
        }
    })
}

fn persist_attachment() -> Action<ChatWidget> {
    Action::effect("persist attachment", |ctx: &ChatContext, signal, host: &ChatHost| {
        let (Some(room), Some(ChatEvent::SendAttachment { file_name })) =
            (ctx.room(), signal.event())
        else {
            return;
        };
        persist(host, room, Message::attachment(LOCAL_AUTHOR, file_name.as_str()));
    })
}

fn persist(host: &ChatHost, room: &str, message: Message) {
    if let Err(err) = host.registry.send_message(room, message) {
        warn!(room, error = %err, "Message not persisted");
        host.notifier.error(&format!("Message not sent: {err}"));
    }
}

// Geometry

fn assign_scroll() -> Action<ChatWidget> {
    Action::assign_many("assign scroll offset", |_, signal| match signal.event() {
        Some(ChatEvent::Scroll { offset }) => vec![ChatPatch::ScrollOffset(*offset)],
        _ => Vec::new(),
    })
}

fn assign_input_size() -> Action<ChatWidget> {
    Action::assign_many("assign input size", |_, signal| match signal.event() {
        Some(ChatEvent::ResizeInput { size }) => vec![ChatPatch::InputSize(*size)],
        _ => Vec::new(),
    })
}

fn assign_app_size() -> Action<ChatWidget> {
    Action::assign_many("assign app size", |_, signal| match signal.event() {
        Some(ChatEvent::ResizeApp { size }) => vec![ChatPatch::AppSize(*size)],
        _ => Vec::new(),
    })
}

fn begin_drag() -> Action<ChatWidget> {
    Action::assign_many("begin drag", |ctx: &ChatContext, signal| match signal.event() {
        Some(ChatEvent::DragStart { at }) => vec![ChatPatch::Drag(ctx.drag.begin(*at))],
        _ => Vec::new(),
    })
}

fn track_drag() -> Action<ChatWidget> {
    Action::assign_many("track drag", |ctx: &ChatContext, signal| match signal.event() {
        Some(ChatEvent::DragMove { at }) => vec![ChatPatch::Drag(ctx.drag.track(*at))],
        _ => Vec::new(),
    })
}

fn finish_drag() -> Action<ChatWidget> {
    Action::assign_many("finish drag", |ctx: &ChatContext, signal| match signal.event() {
        Some(ChatEvent::DragEnd { at }) => vec![ChatPatch::Drag(ctx.drag.finish(*at))],
        _ => Vec::new(),
    })
}

// Alerts

fn show_alert() -> Action<ChatWidget> {
    Action::assign_many("show alert", |_, signal| match signal.event() {
        Some(ChatEvent::ShowError { message }) => vec![ChatPatch::Alert(Some(message.clone()))],
        _ => Vec::new(),
    })
}

fn notify_alert() -> Action<ChatWidget> {
    Action::effect("notify host", |_, signal, host: &ChatHost| {
        if let Some(ChatEvent::ShowError { message }) = signal.event() {
            host.notifier.error(message);
        }
    })
}
