//! One running chat widget.

use super::config::WidgetConfig;
use super::context::ChatContext;
use super::events::ChatEvent;
use super::host::ChatHost;
use super::states::WidgetState;
use super::ChatWidget;
use crate::chart::ChartDefinition;
use crate::runtime::{Clock, Interpreter, InterpreterError, Snapshot, Subscription};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// A widget instance bound to one room.
///
/// Owns its interpreter and, unless built on a manual clock, the task that
/// fires its delayed transitions. The registry and notifier are shared with
/// every other session through [`ChatHost`].
pub struct ChatSession {
    interpreter: Interpreter<ChatWidget>,
    driver: Option<JoinHandle<()>>,
    drive_timers: bool,
}

impl ChatSession {
    /// A session whose timers run on the tokio runtime it is started in.
    pub fn new(chart: Arc<ChartDefinition<ChatWidget>>, config: &WidgetConfig, host: ChatHost) -> Self {
        Self {
            interpreter: Interpreter::new(chart, ChatContext::new(config), host),
            driver: None,
            drive_timers: true,
        }
    }

    /// A session on `clock` whose timers only fire from [`tick`](Self::tick).
    pub fn with_clock(
        chart: Arc<ChartDefinition<ChatWidget>>,
        config: &WidgetConfig,
        host: ChatHost,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            interpreter: Interpreter::builder(chart, ChatContext::new(config), host)
                .clock(clock)
                .build(),
            driver: None,
            drive_timers: false,
        }
    }

    pub fn start(&mut self) -> Result<Snapshot<ChatWidget>, InterpreterError> {
        let snapshot = self.interpreter.start()?;
        if self.drive_timers {
            self.driver = Some(self.interpreter.spawn_timer_driver()?);
        }
        info!(
            room = snapshot.context().room().unwrap_or("<missing>"),
            mode = %snapshot.context().mode,
            "Chat session started"
        );
        Ok(snapshot)
    }

    pub fn send(&self, event: ChatEvent) -> Result<(), InterpreterError> {
        self.interpreter.send(event)
    }

    /// Fire due timers. Only needed on a manual clock.
    pub fn tick(&self) -> Result<(), InterpreterError> {
        self.interpreter.tick()
    }

    pub fn snapshot(&self) -> Snapshot<ChatWidget> {
        self.interpreter.snapshot()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription<ChatWidget>
    where
        F: Fn(&Snapshot<ChatWidget>) + Send + Sync + 'static,
    {
        self.interpreter.subscribe(listener)
    }

    pub fn interpreter(&self) -> &Interpreter<ChatWidget> {
        &self.interpreter
    }

    /// The widget could not start and shows its error affordance.
    pub fn is_failed(&self) -> bool {
        self.snapshot().matches(WidgetState::Failed)
    }

    pub fn is_active(&self) -> bool {
        self.snapshot().matches(WidgetState::Active)
    }

    /// Stop the widget, deregistering its room.
    pub fn stop(&mut self) -> Result<(), InterpreterError> {
        let result = self.interpreter.stop();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        result
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}
