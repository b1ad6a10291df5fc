//! State-machine clean-up before lowering.

use super::compile::{Machine, Op, Part, StateId, DONE};
use rustc_hash::{FxHashMap, FxHashSet};

/// Aliases states that only forward to another state, drops states no
/// transfer can reach, and lets jumps to the next case fall through.
/// Returns the number of states removed.
pub(super) fn optimize_states(machine: &mut Machine) -> usize {
    let before = machine.layout.len();
    let start = machine.layout.first().copied().unwrap_or(0);

    let aliases = forwarding(machine);
    let resolve = |mut id: StateId| {
        while let Some(&target) = aliases.get(&id) {
            id = target;
        }
        id
    };
    for state in &mut machine.states {
        for op in &mut state.ops {
            op.states_mut(&mut |s| *s = resolve(*s));
        }
    }
    for region in &mut machine.regions {
        for catch in &mut region.catches {
            catch.entry = resolve(catch.entry);
        }
        if let Some(entry) = &mut region.finally {
            *entry = resolve(*entry);
        }
    }
    let start = resolve(start);

    let live = reachable(machine, start);
    machine.layout.retain(|id| live.contains(id));
    if let Some(position) = machine.layout.iter().position(|&id| id == start) {
        let first = machine.layout.remove(position);
        machine.layout.insert(0, first);
    }
    machine.fallthrough = true;

    let removed = before - machine.layout.len();
    tracing::trace!(before, after = machine.layout.len(), "optimized yielder states");
    removed
}

/// States whose only op is an unconditional jump that runs no finally
/// blocks, mapped to their target. Never contains a cycle.
fn forwarding(machine: &Machine) -> FxHashMap<StateId, StateId> {
    let mut aliases: FxHashMap<StateId, StateId> = FxHashMap::default();
    for &id in &machine.layout {
        let [Op::Jump(route)] = machine.states[id].ops.as_slice() else {
            continue;
        };
        if !route.next.is_empty() {
            continue;
        }
        let mut target = route.to;
        while let Some(&next) = aliases.get(&target) {
            target = next;
        }
        if target != id {
            aliases.insert(id, target);
        }
    }
    aliases
}

fn reachable(machine: &Machine, start: StateId) -> FxHashSet<StateId> {
    let mut live = FxHashSet::default();
    let mut pending = vec![start];
    while let Some(id) = pending.pop() {
        if id == DONE || !live.insert(id) {
            continue;
        }
        let state = &machine.states[id];
        for op in &state.ops {
            op.targets(&mut pending);
        }
        for &(index, part) in &state.context {
            let region = &machine.regions[index];
            if part == Part::Body {
                pending.extend(region.catches.iter().map(|c| c.entry));
            }
            if part != Part::Finally {
                pending.extend(region.finally);
            }
        }
    }
    live
}
