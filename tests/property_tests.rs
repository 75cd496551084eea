//! Property-based tests for the interpreter.
//!
//! These tests use proptest to drive charts with random event sequences and
//! clock movements and check the invariants that must hold after every
//! settled step.

use chartmind::builder::{ChartBuilder, StateBuilder, TransitionBuilder};
use chartmind::chart::{ChartDefinition, HistoryMode, NodeKind};
use chartmind::core::{Action, Context, Event, Statechart};
use chartmind::runtime::{Interpreter, ManualClock, Snapshot};
use chartmind::state_enum;
use proptest::prelude::*;
use serde::Serialize;
use std::sync::Arc;

state_enum! {
    enum TestState {
        Root,
        P,
        R1,
        X1,
        X2,
        Y1,
        Y2,
        H1,
        H2,
        R2,
        Z1,
        Z2,
        Z3,
        Q,
    }
}

use TestState::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TestEvent {
    A,
    B,
    C,
    D,
    Leave,
    Back,
    Deep,
}

impl Event for TestEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::Leave => "LEAVE",
            Self::Back => "BACK",
            Self::Deep => "DEEP",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
struct Trace {
    entries: Vec<&'static str>,
}

impl Context for Trace {
    type Patch = &'static str;

    fn apply(&mut self, patch: &'static str) {
        self.entries.push(patch);
    }
}

struct TestChart;

impl Statechart for TestChart {
    type State = TestState;
    type Event = TestEvent;
    type Context = Trace;
    type Output = ();
    type Host = ();
}

type S = StateBuilder<TestChart>;
type On = TransitionBuilder<TestChart>;

fn trace(label: &'static str) -> Action<TestChart> {
    Action::assign(label, move |_, _| label)
}

/// Root { P || { R1 { X1, X2 { Y1, Y2 }, H1, H2 }, R2 { Z1, Z2, Z3 } }, Q }
fn chart(z2_delay: u64) -> ChartDefinition<TestChart> {
    ChartBuilder::new(
        S::compound(Root, P)
            .child(
                S::parallel(P)
                    .on(On::on("LEAVE").to(Q))
                    .child(
                        S::compound(R1, X1)
                            .child(S::atomic(X1).on(On::on("A").to(X2)))
                            .child(
                                S::compound(X2, Y1)
                                    .on(On::on("A").to(X1))
                                    .child(S::atomic(Y1).on(On::on("B").to(Y2)))
                                    .child(
                                        S::atomic(Y2)
                                            .on(On::on("B").to(Y1))
                                            .on(On::after_ms(30).to(Y1)),
                                    ),
                            )
                            .child(S::history(H1, HistoryMode::Shallow))
                            .child(S::history(H2, HistoryMode::Deep)),
                    )
                    .child(
                        S::compound(R2, Z1)
                            .child(
                                S::atomic(Z1)
                                    .entry(trace("enter Z1"))
                                    .exit(trace("exit Z1"))
                                    .on(On::on("B").to(Z2))
                                    .on(On::on("C").to(Z1).reenter()),
                            )
                            .child(
                                S::atomic(Z2)
                                    .entry(trace("enter Z2"))
                                    .exit(trace("exit Z2"))
                                    .on(On::after_ms(z2_delay).to(Z1))
                                    .on(On::on("C").to(Z2).action(trace("c")))
                                    .on(On::on("D").to(Z3)),
                            )
                            .child(S::atomic(Z3).on(On::on("D").to(Z1))),
                    ),
            )
            .child(
                S::atomic(Q)
                    .on(On::on("BACK").to(H1))
                    .on(On::on("DEEP").to(H2)),
            ),
    )
    .build()
    .unwrap()
}

fn interpreter(z2_delay: u64) -> (Interpreter<TestChart>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let interpreter = Interpreter::builder(Arc::new(chart(z2_delay)), Trace::default(), ())
        .clock(clock.clone())
        .build();
    interpreter.start().unwrap();
    (interpreter, clock)
}

/// Every active node's parent is active, every active compound has exactly
/// one active child and every active parallel has all of its regions.
fn assert_well_formed<M: Statechart>(snapshot: &Snapshot<M>) -> Result<(), TestCaseError> {
    let chart = snapshot.chart();
    let active = snapshot.configuration();
    prop_assert!(active.contains(&chart.root()));

    for state in active {
        let kind = chart.kind(*state);
        prop_assert!(!matches!(kind, Some(NodeKind::History(_))));
        if let Some(parent) = chart.parent(*state) {
            prop_assert!(active.contains(&parent));
        }
        let active_children = chart.substates(*state).filter(|c| active.contains(c)).count();
        match kind {
            Some(NodeKind::Compound) => prop_assert_eq!(active_children, 1),
            Some(NodeKind::Parallel) => {
                prop_assert_eq!(active_children, chart.substates(*state).count())
            }
            _ => prop_assert_eq!(active_children, 0),
        }
    }
    Ok(())
}

#[derive(Clone, Debug)]
enum Op {
    Send(TestEvent),
    Advance(u64),
}

fn arbitrary_event() -> impl Strategy<Value = TestEvent> {
    prop_oneof![
        Just(TestEvent::A),
        Just(TestEvent::B),
        Just(TestEvent::C),
        Just(TestEvent::D),
        Just(TestEvent::Leave),
        Just(TestEvent::Back),
        Just(TestEvent::Deep),
    ]
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arbitrary_event().prop_map(Op::Send),
        1 => (0..80u64).prop_map(Op::Advance),
    ]
}

fn region_leaves(snapshot: &Snapshot<TestChart>, region: TestState) -> Vec<TestState> {
    snapshot
        .configuration()
        .iter()
        .copied()
        .filter(|s| {
            snapshot.chart().is_descendant(*s, region)
                && snapshot.chart().kind(*s) == Some(NodeKind::Atomic)
        })
        .collect()
}

fn r1_child(snapshot: &Snapshot<TestChart>) -> Option<TestState> {
    snapshot
        .chart()
        .substates(R1)
        .find(|s| snapshot.configuration().contains(s))
}

proptest! {
    #[test]
    fn configuration_stays_well_formed(ops in prop::collection::vec(arbitrary_op(), 0..40)) {
        let (interpreter, clock) = interpreter(50);
        assert_well_formed(&interpreter.snapshot())?;

        for op in ops {
            match op {
                Op::Send(event) => interpreter.send(event).unwrap(),
                Op::Advance(ms) => {
                    clock.advance_ms(ms);
                    interpreter.tick().unwrap();
                }
            }
            assert_well_formed(&interpreter.snapshot())?;
        }
    }

    #[test]
    fn deep_history_restores_the_exact_leaf(
        moves in prop::collection::vec(prop_oneof![Just(TestEvent::A), Just(TestEvent::B)], 0..12)
    ) {
        let (interpreter, _) = interpreter(50);
        for event in moves {
            interpreter.send(event).unwrap();
        }
        let before = region_leaves(&interpreter.snapshot(), R1);

        interpreter.send(TestEvent::Leave).unwrap();
        interpreter.send(TestEvent::Deep).unwrap();

        let after = interpreter.snapshot();
        prop_assert_eq!(region_leaves(&after, R1), before);
        assert_well_formed(&after)?;
    }

    #[test]
    fn shallow_history_restores_the_direct_child_with_its_defaults(
        moves in prop::collection::vec(prop_oneof![Just(TestEvent::A), Just(TestEvent::B)], 0..12)
    ) {
        let (interpreter, _) = interpreter(50);
        for event in moves {
            interpreter.send(event).unwrap();
        }
        let before = r1_child(&interpreter.snapshot());

        interpreter.send(TestEvent::Leave).unwrap();
        interpreter.send(TestEvent::Back).unwrap();

        let after = interpreter.snapshot();
        prop_assert_eq!(r1_child(&after), before);
        if before == Some(X2) {
            prop_assert!(after.matches(Y1));
        }
        prop_assert!(after.matches(Z1));
    }

    #[test]
    fn timers_of_exited_states_never_fire(delay in 1..500u64, exit_at in 0..500u64) {
        prop_assume!(exit_at < delay);
        let (interpreter, clock) = interpreter(delay);
        interpreter.send(TestEvent::B).unwrap();
        prop_assert!(interpreter.snapshot().matches(Z2));

        clock.advance_ms(exit_at);
        interpreter.tick().unwrap();
        interpreter.send(TestEvent::D).unwrap();
        clock.advance_ms(delay * 2);
        interpreter.tick().unwrap();

        prop_assert!(interpreter.snapshot().matches(Z3));
        let fired = interpreter
            .journal()
            .records()
            .any(|record| record.trigger.ends_with("#Z2"));
        prop_assert!(!fired);
    }

    #[test]
    fn timers_fire_once_their_delay_elapses(delay in 0..500u64) {
        let (interpreter, clock) = interpreter(delay);
        interpreter.send(TestEvent::B).unwrap();

        clock.advance_ms(delay);
        interpreter.tick().unwrap();

        prop_assert!(interpreter.snapshot().matches(Z1));
    }

    #[test]
    fn internal_self_transitions_only_run_their_actions(repeats in 1..10usize) {
        let (interpreter, _) = interpreter(10_000);
        interpreter.send(TestEvent::B).unwrap();
        let before = interpreter.snapshot();

        for _ in 0..repeats {
            interpreter.send(TestEvent::C).unwrap();
        }

        let after = interpreter.snapshot();
        prop_assert_eq!(after.configuration(), before.configuration());
        let new_entries = &after.context().entries[before.context().entries.len()..];
        prop_assert_eq!(new_entries.len(), repeats);
        prop_assert!(new_entries.iter().all(|entry| *entry == "c"));
    }

    #[test]
    fn reentering_self_transitions_exit_and_enter(repeats in 1..10usize) {
        let (interpreter, _) = interpreter(50);
        let before = interpreter.snapshot().context().entries.len();

        for _ in 0..repeats {
            interpreter.send(TestEvent::C).unwrap();
        }

        let snapshot = interpreter.snapshot();
        let new_entries = &snapshot.context().entries[before..];
        prop_assert_eq!(new_entries.len(), repeats * 2);
        prop_assert!(new_entries.chunks(2).all(|pair| pair == ["exit Z1", "enter Z1"]));
    }
}
