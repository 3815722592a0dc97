//! Property tests: random enter/exit sequences must always produce a
//! well-formed tree and a summary that matches a brute-force oracle.

use proptest::prelude::*;
use prof::{Clock, ContextId, Engine, ManualClock, ScopeGuard, Site, Timestamp};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Enter(u8),
    Exit,
    Advance(u16),
    Rewind(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..4).prop_map(Op::Enter),
        2 => Just(Op::Exit),
        2 => (0u16..500).prop_map(Op::Advance),
        1 => (0u16..50).prop_map(Op::Rewind),
    ]
}

const NAMES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

/// Replays `ops`, returning each context's parent as observed from the stack.
fn replay(engine: &Engine<&ManualClock>, clock: &ManualClock, ops: &[Op]) -> Vec<Option<ContextId>> {
    let mut parents = Vec::new();
    let mut guards: Vec<ScopeGuard<'_, &ManualClock>> = Vec::new();
    for op in ops {
        match *op {
            Op::Enter(n) => {
                parents.push(guards.last().map(|g| g.id()));
                let name = NAMES[n as usize];
                guards.push(engine.enter(Site::new(name, "src/prop.rs", n as u32), Vec::new()));
            }
            Op::Exit => {
                guards.pop();
            }
            Op::Advance(us) => clock.advance(Duration::from_micros(us as u64)),
            Op::Rewind(us) => {
                let now = clock.now().as_nanos();
                clock.set(Timestamp::from_nanos(now.saturating_sub(us as u64 * 1_000)));
            }
        }
    }
    while guards.pop().is_some() {}
    parents
}

proptest! {
    #[test]
    fn prop_tree_matches_stack_history(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let clock = ManualClock::new();
        let engine = Engine::with_clock(&clock);
        let parents = replay(&engine, &clock, &ops);

        prop_assert_eq!(engine.len(), parents.len());
        prop_assert_eq!(engine.depth(), 0);

        // Children lists agree with the parent observed at enter time.
        let mut expected_children: HashMap<usize, Vec<ContextId>> = HashMap::new();
        for (idx, parent) in parents.iter().enumerate() {
            let ctx = engine.context(ContextId::from_index(idx)).unwrap();
            prop_assert_eq!(ctx.is_root(), parent.is_none());
            prop_assert!(ctx.is_closed());
            if let Some(p) = parent {
                expected_children.entry(p.index()).or_default().push(ContextId::from_index(idx));
            }
        }
        for idx in 0..parents.len() {
            let ctx = engine.context(ContextId::from_index(idx)).unwrap();
            let expected = expected_children.remove(&idx).unwrap_or_default();
            prop_assert_eq!(ctx.children(), expected.as_slice());
        }

        // Every context is reachable from exactly one root.
        let total: usize = engine.snapshot().iter().map(|root| root.total_count()).sum();
        prop_assert_eq!(total, engine.len());
    }

    #[test]
    fn prop_summary_matches_outermost_oracle(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let clock = ManualClock::new();
        let engine = Engine::with_clock(&clock);
        let parents = replay(&engine, &clock, &ops);

        let mut oracle: HashMap<String, Duration> = HashMap::new();
        for idx in 0..parents.len() {
            let ctx = engine.context(ContextId::from_index(idx)).unwrap();
            let mut ancestor = parents[idx];
            let mut recursive = false;
            while let Some(a) = ancestor {
                if engine.context(a).unwrap().name() == ctx.name() {
                    recursive = true;
                    break;
                }
                ancestor = parents[a.index()];
            }
            if !recursive {
                *oracle.entry(format!("src/prop.rs:{}", ctx.name())).or_default() += ctx.duration();
            }
        }

        let summary = engine.summary();
        prop_assert_eq!(summary.len(), oracle.len());
        for entry in &summary {
            prop_assert_eq!(Some(&entry.total), oracle.get(&entry.key));
        }
        for pair in summary.windows(2) {
            prop_assert!(pair[0].total >= pair[1].total);
        }
    }
}
