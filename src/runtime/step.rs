//! The step algorithm.
//!
//! `Core` owns everything one interpreter mutates and processes exactly one
//! signal per call to [`Core::process`]. Nothing in here blocks, spawns or
//! locks: follow-up signals and invocations to start are handed back to the
//! caller in a [`StepOutcome`].

use super::clock::Clock;
use super::error::{panic_message, Defect};
use super::invocation::InvocationManager;
use super::scheduler::Scheduler;
use super::snapshot::{Snapshot, Status};
use crate::chart::{ChartDefinition, HistoryMode, Invocation, NodeKind, StateNode, Transition};
use crate::core::{
    Action, Configuration, HistoryStore, InvocationId, InvokeError, Journal, Signal, State,
    Statechart, StepRecord,
};
use chrono::Utc;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use stillwater::effect::BoxedEffect;
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// An invocation to spawn once the step has settled.
pub(crate) struct Launch<M: Statechart> {
    pub(crate) state: M::State,
    pub(crate) id: InvocationId,
    pub(crate) name: &'static str,
    pub(crate) effect: BoxedEffect<M::Output, InvokeError, M::Host>,
    pub(crate) runtime: Handle,
}

pub(crate) struct StepOutcome<M: Statechart> {
    /// A set of transitions was taken.
    pub(crate) settled: bool,
    /// A final child of the root was entered.
    pub(crate) completed: bool,
    /// Completion signals to append to the queue.
    pub(crate) internal: Vec<Signal<M>>,
    pub(crate) launches: Vec<Launch<M>>,
}

impl<M: Statechart> StepOutcome<M> {
    fn new() -> Self {
        Self {
            settled: false,
            completed: false,
            internal: Vec::new(),
            launches: Vec::new(),
        }
    }
}

fn lookup<M: Statechart>(
    chart: &ChartDefinition<M>,
    state: M::State,
) -> Result<&StateNode<M>, Defect> {
    chart.node(state).ok_or(Defect::UnknownState(state.name()))
}

pub(crate) struct Core<M: Statechart> {
    chart: Arc<ChartDefinition<M>>,
    context: M::Context,
    host: M::Host,
    clock: Arc<dyn Clock>,
    runtime: Option<Handle>,
    configuration: Configuration<M::State>,
    history: HistoryStore<M::State>,
    pub(crate) scheduler: Scheduler<M::State>,
    pub(crate) invocations: InvocationManager<M::State>,
    journal: Journal<M::State>,
    step: u64,
}

impl<M: Statechart> Core<M> {
    pub(crate) fn new(
        chart: Arc<ChartDefinition<M>>,
        context: M::Context,
        host: M::Host,
        clock: Arc<dyn Clock>,
        runtime: Option<Handle>,
        journal_capacity: usize,
    ) -> Self {
        Self {
            chart,
            context,
            host,
            clock,
            runtime,
            configuration: Configuration::new(),
            history: HistoryStore::new(),
            scheduler: Scheduler::new(),
            invocations: InvocationManager::new(),
            journal: Journal::with_capacity(journal_capacity),
            step: 0,
        }
    }

    pub(crate) fn host(&self) -> &M::Host {
        &self.host
    }

    /// The configured runtime, else the one current on this thread.
    pub(crate) fn runtime(&self) -> Option<Handle> {
        self.runtime.clone().or_else(|| Handle::try_current().ok())
    }

    pub(crate) fn journal(&self) -> &Journal<M::State> {
        &self.journal
    }

    pub(crate) fn snapshot(&self, status: Status) -> Snapshot<M> {
        let mut configuration: Vec<_> = self.configuration.iter().collect();
        self.chart.sort_document_order(&mut configuration);
        Snapshot {
            chart: Arc::clone(&self.chart),
            configuration,
            context: self.context.clone(),
            status,
            step: self.step,
        }
    }

    /// Process one signal to completion.
    pub(crate) fn process(&mut self, signal: &Signal<M>) -> Result<StepOutcome<M>, Defect> {
        let chart = Arc::clone(&self.chart);
        let mut outcome = StepOutcome::new();

        match signal {
            Signal::Start => {
                if self.configuration.is_empty() {
                    self.enter_initial(&chart, signal, &mut outcome)?;
                }
                return Ok(outcome);
            }
            Signal::Stop => return Ok(outcome),
            Signal::InvokeDone { state, id, .. } | Signal::InvokeError { state, id, .. } => {
                if !self.invocations.consume(*state, *id) {
                    trace!(state = state.name(), %id, "Discarding stale invocation result");
                    return Ok(outcome);
                }
            }
            _ => {}
        }

        let enabled = self.select(&chart, signal)?;
        if enabled.is_empty() {
            trace!(event = %signal, "No enabled transition, event discarded");
            return Ok(outcome);
        }
        let transitions = self.remove_conflicts(&chart, enabled);
        self.microstep(&chart, &transitions, signal, &mut outcome)?;
        Ok(outcome)
    }

    /// Cancel every timer and invocation without running exit actions.
    pub(crate) fn halt(&mut self) {
        self.scheduler.clear();
        self.invocations.cancel_all();
    }

    /// Cancel all pending work and exit every active node, deepest first.
    pub(crate) fn teardown(&mut self) -> Result<(), Defect> {
        let chart = Arc::clone(&self.chart);
        self.halt();

        let signal = Signal::Stop;
        let mut exiting: Vec<_> = self.configuration.iter().collect();
        chart.sort_exit_order(&mut exiting);
        for state in &exiting {
            let node = lookup(&chart, *state)?;
            self.run_actions(*state, &node.exit, &signal)?;
            self.configuration.remove(*state);
        }
        self.settle(&signal, exiting, Vec::new());
        Ok(())
    }

    fn enter_initial(
        &mut self,
        chart: &ChartDefinition<M>,
        signal: &Signal<M>,
        outcome: &mut StepOutcome<M>,
    ) -> Result<(), Defect> {
        let mut entering = HashSet::new();
        self.add_descendants(chart, chart.root(), &mut entering);
        let entered = self.enter_states(chart, entering, signal, outcome)?;
        self.settle(signal, Vec::new(), entered);
        outcome.settled = true;
        Ok(())
    }

    fn select<'c>(
        &self,
        chart: &'c ChartDefinition<M>,
        signal: &Signal<M>,
    ) -> Result<Vec<&'c Transition<M>>, Defect> {
        match signal {
            Signal::Timer { state, index, .. } => {
                if !self.configuration.contains(*state) {
                    return Ok(Vec::new());
                }
                match lookup(chart, *state)?.delayed.get(*index) {
                    Some(transition) if self.guard_passes(transition, signal)? => {
                        Ok(vec![transition])
                    }
                    _ => Ok(Vec::new()),
                }
            }
            Signal::InvokeDone { state, .. }
            | Signal::InvokeError { state, .. }
            | Signal::Done { state } => {
                if !self.configuration.contains(*state) {
                    return Ok(Vec::new());
                }
                let node = lookup(chart, *state)?;
                Ok(self.first_enabled(node, signal)?.into_iter().collect())
            }
            Signal::Event(_) => {
                let mut leaves: Vec<_> = self
                    .configuration
                    .iter()
                    .filter(|s| chart.kind(*s) == Some(NodeKind::Atomic))
                    .collect();
                chart.sort_document_order(&mut leaves);

                let mut selected: Vec<&Transition<M>> = Vec::new();
                for leaf in leaves {
                    for state in std::iter::once(leaf).chain(chart.ancestors(leaf)) {
                        let node = lookup(chart, state)?;
                        if let Some(transition) = self.first_enabled(node, signal)? {
                            if !selected.iter().any(|t| std::ptr::eq(*t, transition)) {
                                selected.push(transition);
                            }
                            break;
                        }
                    }
                }
                Ok(selected)
            }
            Signal::Start | Signal::Stop => Ok(Vec::new()),
        }
    }

    fn first_enabled<'c>(
        &self,
        node: &'c StateNode<M>,
        signal: &Signal<M>,
    ) -> Result<Option<&'c Transition<M>>, Defect> {
        for transition in &node.transitions {
            if transition.trigger.matches(signal) && self.guard_passes(transition, signal)? {
                return Ok(Some(transition));
            }
        }
        Ok(None)
    }

    fn guard_passes(&self, transition: &Transition<M>, signal: &Signal<M>) -> Result<bool, Defect> {
        let Some(guard) = &transition.guard else {
            return Ok(true);
        };
        catch_unwind(AssertUnwindSafe(|| guard.check(&self.context, signal))).map_err(|payload| {
            Defect::GuardPanicked {
                state: transition.source.name(),
                guard: guard.name(),
                message: panic_message(payload.as_ref()),
            }
        })
    }

    /// Drop transitions whose exit sets overlap an earlier one. A transition
    /// from a deeper source preempts the one it overlaps; otherwise the
    /// earlier transition wins.
    fn remove_conflicts<'c>(
        &self,
        chart: &ChartDefinition<M>,
        enabled: Vec<&'c Transition<M>>,
    ) -> Vec<&'c Transition<M>> {
        let mut filtered: Vec<(&Transition<M>, HashSet<M::State>)> = Vec::new();
        for candidate in enabled {
            let exits: HashSet<_> = self.exit_set(chart, candidate).into_iter().collect();
            let mut preempted = false;
            let mut displaced = Vec::new();
            for (i, (kept, kept_exits)) in filtered.iter().enumerate() {
                if exits.is_disjoint(kept_exits) {
                    continue;
                }
                if chart.is_descendant(candidate.source, kept.source) {
                    displaced.push(i);
                } else {
                    preempted = true;
                    break;
                }
            }
            if !preempted {
                for i in displaced.into_iter().rev() {
                    filtered.remove(i);
                }
                filtered.push((candidate, exits));
            }
        }
        filtered.into_iter().map(|(transition, _)| transition).collect()
    }

    fn microstep(
        &mut self,
        chart: &ChartDefinition<M>,
        transitions: &[&Transition<M>],
        signal: &Signal<M>,
        outcome: &mut StepOutcome<M>,
    ) -> Result<(), Defect> {
        let mut exiting: HashSet<M::State> = HashSet::new();
        for transition in transitions {
            exiting.extend(self.exit_set(chart, transition));
        }
        let mut exiting: Vec<_> = exiting.into_iter().collect();
        chart.sort_exit_order(&mut exiting);

        self.record_history(chart, &exiting);
        for state in &exiting {
            self.exit_state(chart, *state, signal)?;
        }

        for transition in transitions {
            self.run_actions(transition.source, &transition.actions, signal)?;
        }

        let mut entering = HashSet::new();
        for transition in transitions {
            let Some(domain) = self.domain(chart, transition) else {
                continue;
            };
            if let Some(target) = transition.target {
                self.add_descendants(chart, target, &mut entering);
            }
            for target in self.effective_targets(chart, transition) {
                self.add_ancestors(chart, target, domain, &mut entering);
            }
        }
        let entered = self.enter_states(chart, entering, signal, outcome)?;

        self.settle(signal, exiting, entered);
        outcome.settled = true;
        Ok(())
    }

    /// Targets with history nodes replaced by what they restore.
    fn effective_targets(
        &self,
        chart: &ChartDefinition<M>,
        transition: &Transition<M>,
    ) -> Vec<M::State> {
        let mut targets = Vec::new();
        let Some(target) = transition.target else {
            return targets;
        };
        match chart.node(target) {
            Some(node) if node.is_history() => match self.history.get(target) {
                Some(recorded) => targets.extend_from_slice(recorded),
                None => targets.extend(history_defaults(chart, node)),
            },
            _ => targets.push(target),
        }
        targets
    }

    /// The compound node bounding a transition's exits and entries, or
    /// `None` if the transition leaves the configuration unchanged.
    fn domain(&self, chart: &ChartDefinition<M>, transition: &Transition<M>) -> Option<M::State> {
        if transition.is_action_only() {
            return None;
        }
        let targets = self.effective_targets(chart, transition);
        if targets.is_empty() {
            return None;
        }

        let source = transition.source;
        if !transition.reenter
            && chart.kind(source) == Some(NodeKind::Compound)
            && targets.iter().all(|t| chart.is_descendant(*t, source))
        {
            return Some(source);
        }

        let mut states = Vec::with_capacity(targets.len() + 1);
        states.push(source);
        states.extend(targets);
        Some(chart.lcca(&states).unwrap_or_else(|| chart.root()))
    }

    fn exit_set(&self, chart: &ChartDefinition<M>, transition: &Transition<M>) -> Vec<M::State> {
        match self.domain(chart, transition) {
            Some(domain) => self
                .configuration
                .iter()
                .filter(|s| chart.is_descendant(*s, domain))
                .collect(),
            None => Vec::new(),
        }
    }

    fn add_descendants(
        &self,
        chart: &ChartDefinition<M>,
        state: M::State,
        entering: &mut HashSet<M::State>,
    ) {
        let Some(node) = chart.node(state) else {
            return;
        };

        if node.is_history() {
            let restored = match self.history.get(state) {
                Some(recorded) => recorded.to_vec(),
                None => history_defaults(chart, node),
            };
            let Some(parent) = node.parent else {
                return;
            };
            for s in &restored {
                self.add_descendants(chart, *s, entering);
            }
            for s in &restored {
                self.add_ancestors(chart, *s, parent, entering);
            }
            return;
        }

        entering.insert(state);
        match node.kind {
            NodeKind::Compound => {
                if let Some(initial) = node.initial {
                    self.add_descendants(chart, initial, entering);
                    self.add_ancestors(chart, initial, state, entering);
                }
            }
            NodeKind::Parallel => self.enter_missing_regions(chart, state, entering),
            _ => {}
        }
    }

    /// Add the ancestors of `state` strictly below `bound`, completing any
    /// parallel node on the way with its remaining regions.
    fn add_ancestors(
        &self,
        chart: &ChartDefinition<M>,
        state: M::State,
        bound: M::State,
        entering: &mut HashSet<M::State>,
    ) {
        for ancestor in chart.ancestors_below(state, Some(bound)) {
            entering.insert(ancestor);
            if chart.kind(ancestor) == Some(NodeKind::Parallel) {
                self.enter_missing_regions(chart, ancestor, entering);
            }
        }
    }

    fn enter_missing_regions(
        &self,
        chart: &ChartDefinition<M>,
        parallel: M::State,
        entering: &mut HashSet<M::State>,
    ) {
        for region in chart.substates(parallel) {
            if !entering.iter().any(|s| chart.is_within(*s, region)) {
                self.add_descendants(chart, region, entering);
            }
        }
    }

    fn record_history(&mut self, chart: &ChartDefinition<M>, exiting: &[M::State]) {
        for state in exiting {
            let histories: Vec<_> = chart.history_children(*state).collect();
            for history in histories {
                let Some(NodeKind::History(mode)) = chart.kind(history) else {
                    continue;
                };
                let mut remembered: Vec<_> = self
                    .configuration
                    .iter()
                    .filter(|s| match mode {
                        HistoryMode::Shallow => chart.parent(*s) == Some(*state),
                        HistoryMode::Deep => {
                            chart.kind(*s).is_some_and(NodeKind::is_atomic)
                                && chart.is_descendant(*s, *state)
                        }
                    })
                    .collect();
                chart.sort_document_order(&mut remembered);
                self.history.record(history, remembered);
            }
        }
    }

    fn exit_state(
        &mut self,
        chart: &ChartDefinition<M>,
        state: M::State,
        signal: &Signal<M>,
    ) -> Result<(), Defect> {
        let node = lookup(chart, state)?;
        self.scheduler.cancel_all_for(state);
        self.invocations.cancel(state);
        self.run_actions(state, &node.exit, signal)?;
        self.configuration.remove(state);
        Ok(())
    }

    fn enter_states(
        &mut self,
        chart: &ChartDefinition<M>,
        entering: HashSet<M::State>,
        signal: &Signal<M>,
        outcome: &mut StepOutcome<M>,
    ) -> Result<Vec<M::State>, Defect> {
        let mut entering: Vec<_> = entering.into_iter().collect();
        chart.sort_entry_order(&mut entering);
        let now = self.clock.now();

        for state in &entering {
            let node = lookup(chart, *state)?;
            self.configuration.insert(*state);
            self.run_actions(*state, &node.entry, signal)?;

            for (index, transition) in node.delayed.iter().enumerate() {
                if let Some(delay) = transition.delay() {
                    self.scheduler.arm(*state, index, delay, now);
                }
            }
            if let Some(invocation) = &node.invocation {
                let launch = self.launch(*state, invocation)?;
                outcome.launches.push(launch);
            }
            if node.is_final() {
                self.complete(chart, node, outcome);
            }
        }

        if outcome.completed {
            self.halt();
            outcome.launches.clear();
            outcome.internal.clear();
        }
        Ok(entering)
    }

    fn launch(&mut self, state: M::State, invocation: &Invocation<M>) -> Result<Launch<M>, Defect> {
        let runtime = self.runtime().ok_or_else(|| Defect::NoRuntime {
            operation: format!("Invocation '{}' on {}", invocation.name(), state.name()),
        })?;
        let effect = catch_unwind(AssertUnwindSafe(|| invocation.operation(&self.context)))
            .map_err(|payload| Defect::ActionPanicked {
                state: state.name(),
                action: invocation.name(),
                message: panic_message(payload.as_ref()),
            })?;
        let id = self.invocations.register(state);
        Ok(Launch {
            state,
            id,
            name: invocation.name(),
            effect,
            runtime,
        })
    }

    /// Raise completion signals for a final node that was just entered.
    fn complete(&self, chart: &ChartDefinition<M>, node: &StateNode<M>, outcome: &mut StepOutcome<M>) {
        let Some(parent) = node.parent else {
            outcome.completed = true;
            return;
        };
        if parent == chart.root() && chart.kind(parent) == Some(NodeKind::Compound) {
            outcome.completed = true;
            return;
        }

        if chart.kind(parent) == Some(NodeKind::Parallel) {
            if self.is_in_final_state(chart, parent) {
                Self::parallel_done(chart, parent, outcome);
            }
            return;
        }

        outcome.internal.push(Signal::Done { state: parent });
        if let Some(grandparent) = chart.parent(parent) {
            if chart.kind(grandparent) == Some(NodeKind::Parallel)
                && self.is_in_final_state(chart, grandparent)
            {
                Self::parallel_done(chart, grandparent, outcome);
            }
        }
    }

    /// Every region of `parallel` is final. A parallel root finishes the
    /// machine; any other parallel node raises its completion signal.
    fn parallel_done(chart: &ChartDefinition<M>, parallel: M::State, outcome: &mut StepOutcome<M>) {
        if parallel == chart.root() {
            outcome.completed = true;
        } else {
            outcome.internal.push(Signal::Done { state: parallel });
        }
    }

    fn is_in_final_state(&self, chart: &ChartDefinition<M>, state: M::State) -> bool {
        match chart.kind(state) {
            Some(NodeKind::Compound) => chart.substates(state).any(|child| {
                chart.kind(child) == Some(NodeKind::Final) && self.configuration.contains(child)
            }),
            Some(NodeKind::Parallel) => chart
                .substates(state)
                .all(|region| self.is_in_final_state(chart, region)),
            Some(NodeKind::Final) => self.configuration.contains(state),
            _ => false,
        }
    }

    fn run_actions(
        &mut self,
        state: M::State,
        actions: &[Action<M>],
        signal: &Signal<M>,
    ) -> Result<(), Defect> {
        for action in actions {
            let context = &mut self.context;
            let host = &self.host;
            catch_unwind(AssertUnwindSafe(|| action.execute(context, signal, host))).map_err(
                |payload| Defect::ActionPanicked {
                    state: state.name(),
                    action: action.name(),
                    message: panic_message(payload.as_ref()),
                },
            )?;
        }
        Ok(())
    }

    fn settle(&mut self, signal: &Signal<M>, exited: Vec<M::State>, entered: Vec<M::State>) {
        self.step += 1;
        debug!(
            step = self.step,
            event = %signal,
            exited = ?exited,
            entered = ?entered,
            "Step settled"
        );
        self.journal.record(StepRecord {
            step: self.step,
            trigger: signal.to_string(),
            exited,
            entered,
            timestamp: Utc::now(),
        });
    }
}

/// Where a history node leads before its parent was ever exited.
fn history_defaults<M: Statechart>(chart: &ChartDefinition<M>, node: &StateNode<M>) -> Vec<M::State> {
    if let Some(default) = node.history_default {
        return vec![default];
    }
    let Some(parent) = node.parent else {
        return Vec::new();
    };
    match chart.kind(parent) {
        Some(NodeKind::Compound) => chart
            .node(parent)
            .and_then(StateNode::initial)
            .into_iter()
            .collect(),
        Some(NodeKind::Parallel) => chart.substates(parent).collect(),
        _ => Vec::new(),
    }
}
