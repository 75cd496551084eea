//! The imperative shell around [`Core`]: queueing, serialisation of steps,
//! subscriptions, invocation tasks and the timer driver.

use super::clock::{Clock, TokioClock};
use super::error::{Defect, InterpreterError};
use super::snapshot::{Snapshot, Status};
use super::step::{Core, Launch, StepOutcome};
use crate::chart::ChartDefinition;
use crate::core::{Event, InvocationId, InvokeError, Journal, Signal, State, Statechart};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use stillwater::effect::Effect;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

type Listener<M> = Arc<dyn Fn(&Snapshot<M>) + Send + Sync>;
type Listeners<M> = Mutex<Vec<(u64, Listener<M>)>>;

enum Work<M: Statechart> {
    Signal(Signal<M>),
    /// Fire due timers one at a time, as of this clock reading, skipping
    /// timers armed at or after `horizon`.
    Timers { now: Duration, horizon: u64 },
}

struct Inner<M: Statechart> {
    core: Mutex<Core<M>>,
    queue: Mutex<VecDeque<Work<M>>>,
    status: Mutex<Status>,
    processing: AtomicBool,
    stop_requested: AtomicBool,
    listeners: Arc<Listeners<M>>,
    next_listener: AtomicU64,
    timers_changed: Arc<Notify>,
    clock: Arc<dyn Clock>,
}

/// Runs one chart instance.
///
/// Cloning is cheap and yields another handle to the same instance. Events
/// may be sent from any thread; steps are processed one at a time in arrival
/// order, and an event sent from inside an action is queued behind the
/// current step.
pub struct Interpreter<M: Statechart> {
    inner: Arc<Inner<M>>,
}

impl<M: Statechart> Clone for Interpreter<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Statechart> fmt::Debug for Interpreter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Options for an [`Interpreter`].
pub struct InterpreterBuilder<M: Statechart> {
    chart: Arc<ChartDefinition<M>>,
    context: M::Context,
    host: M::Host,
    clock: Option<Arc<dyn Clock>>,
    runtime: Option<Handle>,
    journal_capacity: usize,
}

impl<M: Statechart> InterpreterBuilder<M> {
    /// Time source for delayed transitions. Defaults to [`TokioClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Runtime that invocations and the timer driver are spawned on.
    /// Defaults to the runtime current at the time of spawning.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Number of settled steps kept in the journal. Zero disables it.
    pub fn journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self
    }

    pub fn build(self) -> Interpreter<M> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);
        let core = Core::new(
            self.chart,
            self.context,
            self.host,
            Arc::clone(&clock),
            self.runtime,
            self.journal_capacity,
        );
        Interpreter {
            inner: Arc::new(Inner {
                core: Mutex::new(core),
                queue: Mutex::new(VecDeque::new()),
                status: Mutex::new(Status::NotStarted),
                processing: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                listeners: Arc::new(Mutex::new(Vec::new())),
                next_listener: AtomicU64::new(0),
                timers_changed: Arc::new(Notify::new()),
                clock,
            }),
        }
    }
}

impl<M: Statechart> Interpreter<M> {
    pub fn builder(
        chart: Arc<ChartDefinition<M>>,
        context: M::Context,
        host: M::Host,
    ) -> InterpreterBuilder<M> {
        InterpreterBuilder {
            chart,
            context,
            host,
            clock: None,
            runtime: None,
            journal_capacity: Journal::<M::State>::DEFAULT_CAPACITY,
        }
    }

    /// Interpreter with default options.
    pub fn new(chart: Arc<ChartDefinition<M>>, context: M::Context, host: M::Host) -> Self {
        Self::builder(chart, context, host).build()
    }

    /// Enter the initial configuration.
    ///
    /// Zero-delay timers armed here fire on the next [`tick`](Self::tick),
    /// never inside this call.
    pub fn start(&self) -> Result<Snapshot<M>, InterpreterError> {
        {
            let mut status = self.inner.status.lock();
            match *status {
                Status::NotStarted => *status = Status::Running,
                Status::Stopped => return Err(InterpreterError::Stopped),
                Status::Faulted => return Err(InterpreterError::Faulted),
                Status::Running | Status::Done => return Err(InterpreterError::AlreadyStarted),
            }
        }
        info!("Interpreter started");
        self.inner.enqueue(Work::Signal(Signal::Start));
        self.inner.drain()?;
        Ok(self.snapshot())
    }

    /// Queue an event and process the queue unless a step is already running.
    ///
    /// Events sent after the machine is done are accepted and discarded.
    pub fn send(&self, event: M::Event) -> Result<(), InterpreterError> {
        if !self.inner.accepting()? {
            trace!(event = event.name(), "Machine is done, event discarded");
            return Ok(());
        }
        self.inner.enqueue(Work::Signal(Signal::Event(event)));
        self.inner.drain()
    }

    /// Fire every delayed transition due at the current clock reading, in
    /// deadline order.
    pub fn tick(&self) -> Result<(), InterpreterError> {
        if !self.inner.accepting()? {
            return Ok(());
        }
        let now = self.inner.clock.now();
        let horizon = self.inner.core.lock().scheduler.next_epoch();
        self.inner.enqueue(Work::Timers { now, horizon });
        self.inner.drain()
    }

    /// Current configuration and context.
    ///
    /// Must not be called from inside an action.
    pub fn snapshot(&self) -> Snapshot<M> {
        let status = self.status();
        self.inner.core.lock().snapshot(status)
    }

    pub fn status(&self) -> Status {
        *self.inner.status.lock()
    }

    /// Copy of the step journal.
    pub fn journal(&self) -> Journal<M::State> {
        self.inner.core.lock().journal().clone()
    }

    /// Deadline of the earliest pending timer, as a clock reading.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.core.lock().scheduler.next_deadline()
    }

    /// Number of invocations currently running.
    pub fn pending_invocations(&self) -> usize {
        self.inner.core.lock().invocations.len()
    }

    /// Call `listener` with the snapshot after every settled step.
    pub fn subscribe<F>(&self, listener: F) -> Subscription<M>
    where
        F: Fn(&Snapshot<M>) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.inner.listeners),
        }
    }

    /// Cancel all timers and invocations, then exit every active node from
    /// the leaves to the root.
    ///
    /// Takes effect immediately for queued events and late invocation
    /// results. If a step is in progress on another thread, that thread
    /// finishes the step and performs the teardown.
    pub fn stop(&self) -> Result<(), InterpreterError> {
        match self.status() {
            Status::NotStarted => return Err(InterpreterError::NotStarted),
            Status::Stopped => return Ok(()),
            Status::Faulted => return Err(InterpreterError::Faulted),
            Status::Running | Status::Done => {}
        }
        self.inner.stop_requested.store(true, Ordering::Release);
        self.inner.queue.lock().clear();
        self.inner.drain()
    }

    /// Spawn a task that ticks the interpreter whenever a timer is due.
    ///
    /// The task ends once the interpreter stops, faults or is dropped.
    pub fn spawn_timer_driver(&self) -> Result<JoinHandle<()>, InterpreterError> {
        let runtime = self
            .inner
            .core
            .lock()
            .runtime()
            .ok_or_else(|| Defect::NoRuntime {
                operation: "Timer driver".to_string(),
            })?;
        let weak = Arc::downgrade(&self.inner);
        Ok(runtime.spawn(drive_timers(weak)))
    }
}

async fn drive_timers<M: Statechart>(weak: Weak<Inner<M>>) {
    loop {
        let (notify, delay) = {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.is_live() {
                return;
            }
            (Arc::clone(&inner.timers_changed), inner.next_delay())
        };

        match delay {
            // Due now: tick on the next turn so other tasks still run.
            Some(delay) if delay.is_zero() => tokio::task::yield_now().await,
            Some(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = notify.notified() => continue,
                }
            }
            None => {
                notify.notified().await;
                continue;
            }
        }

        let Some(inner) = weak.upgrade() else {
            return;
        };
        let interpreter = Interpreter { inner };
        if let Err(err) = interpreter.tick() {
            debug!(error = %err, "Timer driver exiting");
            return;
        }
    }
}

impl<M: Statechart> Inner<M> {
    /// Whether new work should be queued. Errors for lifecycles that reject
    /// calls outright.
    fn accepting(&self) -> Result<bool, InterpreterError> {
        if self.stop_requested.load(Ordering::Acquire) {
            return Err(InterpreterError::Stopped);
        }
        match *self.status.lock() {
            Status::NotStarted => Err(InterpreterError::NotStarted),
            Status::Running => Ok(true),
            Status::Done => Ok(false),
            Status::Stopped => Err(InterpreterError::Stopped),
            Status::Faulted => Err(InterpreterError::Faulted),
        }
    }

    fn is_live(&self) -> bool {
        !self.stop_requested.load(Ordering::Acquire)
            && matches!(*self.status.lock(), Status::Running | Status::Done)
    }

    fn next_delay(&self) -> Option<Duration> {
        let deadline = self.core.lock().scheduler.next_deadline()?;
        Some(deadline.saturating_sub(self.clock.now()))
    }

    fn enqueue(&self, work: Work<M>) {
        self.queue.lock().push_back(work);
    }

    /// Process queued work until the queue is empty, unless another caller
    /// is already doing so.
    fn drain(self: &Arc<Self>) -> Result<(), InterpreterError> {
        loop {
            if self
                .processing
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                return Ok(());
            }

            let result = if self.stop_requested.load(Ordering::Acquire) {
                self.teardown()
            } else {
                self.process_queue()
            };
            self.processing.store(false, Ordering::Release);
            self.timers_changed.notify_one();
            result?;

            let idle = self.queue.lock().is_empty();
            let stop_pending = self.stop_requested.load(Ordering::Acquire)
                && !matches!(*self.status.lock(), Status::Stopped | Status::Faulted);
            if idle && !stop_pending {
                return Ok(());
            }
        }
    }

    fn process_queue(self: &Arc<Self>) -> Result<(), InterpreterError> {
        loop {
            if self.stop_requested.load(Ordering::Acquire) {
                return self.teardown();
            }
            let next = self.queue.lock().pop_front();
            let Some(work) = next else {
                return Ok(());
            };
            if *self.status.lock() != Status::Running {
                continue;
            }

            let (signal, resume) = match work {
                Work::Signal(signal) => (signal, None),
                Work::Timers { now, horizon } => {
                    let due = self.core.lock().scheduler.pop_due(now, horizon);
                    let Some(timer) = due else {
                        continue;
                    };
                    let signal = Signal::Timer {
                        state: timer.state,
                        index: timer.index,
                        delay: timer.delay,
                    };
                    (signal, Some(Work::Timers { now, horizon }))
                }
            };
            self.step(&signal)?;
            // Completion signals raised by this timer go ahead of the next one.
            if let Some(work) = resume {
                self.enqueue(work);
            }
        }
    }

    fn step(self: &Arc<Self>, signal: &Signal<M>) -> Result<(), InterpreterError> {
        let snapshot = {
            let mut core = self.core.lock();
            match core.process(signal) {
                Ok(outcome) => {
                    let settled = outcome.settled;
                    self.apply(&mut core, outcome);
                    settled.then(|| core.snapshot(*self.status.lock()))
                }
                Err(defect) => {
                    core.halt();
                    *self.status.lock() = Status::Faulted;
                    self.queue.lock().clear();
                    error!(event = %signal, error = %defect, "Interpreter faulted");
                    return Err(defect.into());
                }
            }
        };
        if let Some(snapshot) = snapshot {
            self.notify(&snapshot);
        }
        Ok(())
    }

    fn apply(self: &Arc<Self>, core: &mut Core<M>, outcome: StepOutcome<M>) {
        if outcome.completed {
            *self.status.lock() = Status::Done;
            self.queue.lock().clear();
            info!("Machine reached its final state");
            return;
        }
        {
            let mut queue = self.queue.lock();
            queue.extend(outcome.internal.into_iter().map(Work::Signal));
        }
        for launch in outcome.launches {
            self.spawn(core, launch);
        }
    }

    fn spawn(self: &Arc<Self>, core: &mut Core<M>, launch: Launch<M>) {
        let Launch {
            state,
            id,
            name,
            effect,
            runtime,
        } = launch;
        let weak = Arc::downgrade(self);
        let host = core.host().clone();
        debug!(state = state.name(), invocation = name, %id, "Starting invocation");

        let task = runtime.spawn(async move {
            let result = effect.run(&host).await;
            if let Some(inner) = weak.upgrade() {
                inner.resolve(state, id, result);
            }
        });
        core.invocations.attach(state, id, task.abort_handle());
    }

    fn resolve(self: &Arc<Self>, state: M::State, id: InvocationId, result: Result<M::Output, InvokeError>) {
        if !self.is_live() {
            warn!(state = state.name(), %id, "Invocation finished after stop, result dropped");
            return;
        }
        if !self.core.lock().invocations.settle(state, id) {
            trace!(state = state.name(), %id, "Invocation was cancelled, result dropped");
            return;
        }
        let signal = match result {
            Ok(output) => Signal::InvokeDone { state, id, output },
            Err(error) => Signal::InvokeError { state, id, error },
        };
        self.enqueue(Work::Signal(signal));
        if let Err(err) = self.drain() {
            error!(state = state.name(), error = %err, "Processing invocation result failed");
        }
    }

    fn teardown(&self) -> Result<(), InterpreterError> {
        self.queue.lock().clear();
        let result = {
            let mut core = self.core.lock();
            let result = core.teardown();
            let status = if result.is_ok() {
                Status::Stopped
            } else {
                Status::Faulted
            };
            *self.status.lock() = status;
            result.map(|()| core.snapshot(status))
        };

        match result {
            Ok(snapshot) => {
                info!(step = snapshot.step(), "Interpreter stopped");
                self.notify(&snapshot);
                self.listeners.lock().clear();
                Ok(())
            }
            Err(defect) => {
                error!(error = %defect, "Stopping the interpreter failed");
                Err(defect.into())
            }
        }
    }

    fn notify(&self, snapshot: &Snapshot<M>) {
        let listeners: Vec<Listener<M>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl<M: Statechart> Drop for Inner<M> {
    fn drop(&mut self) {
        self.core.get_mut().halt();
        self.timers_changed.notify_one();
    }
}

/// Handle returned by [`Interpreter::subscribe`].
pub struct Subscription<M: Statechart> {
    id: u64,
    listeners: Weak<Listeners<M>>,
}

impl<M: Statechart> Subscription<M> {
    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<M: Statechart> fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
