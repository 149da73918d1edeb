//! Derived cross-kid chore state.

use crate::model::{ChoreState, CompletionMode};
use crate::store::EntityStore;

/// Aggregate per-kid states into the chore's global state.
///
/// A single assigned kid maps 1:1. For `shared_all`, "acted" means claimed
/// or approved: with no kid acted the result is `overdue` if any kid is
/// overdue, otherwise `pending`.
pub fn compute(mode: CompletionMode, states: &[ChoreState]) -> ChoreState {
    match states {
        [] => return ChoreState::Pending,
        [only] => return *only,
        _ => {}
    }
    let any = |s: ChoreState| states.iter().any(|x| *x == s);
    let all = |s: ChoreState| states.iter().all(|x| *x == s);

    match mode {
        CompletionMode::Independent => {
            let first = states[0];
            if all(first) {
                first
            } else {
                ChoreState::Independent
            }
        }
        CompletionMode::SharedFirst => {
            if any(ChoreState::Approved) {
                ChoreState::Approved
            } else if any(ChoreState::Claimed) {
                ChoreState::Claimed
            } else if any(ChoreState::Overdue) {
                ChoreState::Overdue
            } else {
                ChoreState::Pending
            }
        }
        CompletionMode::SharedAll => {
            if all(ChoreState::Approved) {
                ChoreState::Approved
            } else if any(ChoreState::Approved) {
                ChoreState::ApprovedInPart
            } else if any(ChoreState::Claimed) {
                ChoreState::ClaimedInPart
            } else if any(ChoreState::Overdue) {
                ChoreState::Overdue
            } else {
                ChoreState::Pending
            }
        }
    }
}

/// Recompute and store the global state of one chore.
pub fn refresh(store: &mut EntityStore, chore_id: &str) {
    let Some(chore) = store.chores.get(chore_id) else {
        return;
    };
    let states: Vec<ChoreState> = chore
        .assigned_kids
        .iter()
        .map(|k| {
            store
                .kids
                .get(k)
                .map(|kid| kid.chore_state(chore_id))
                .unwrap_or_default()
        })
        .collect();
    let global = compute(chore.completion_mode, &states);
    if let Some(chore) = store.chores.get_mut(chore_id) {
        chore.global_state = global;
    }
}

pub fn refresh_all(store: &mut EntityStore) {
    let ids: Vec<String> = store.chores.keys().cloned().collect();
    for id in ids {
        refresh(store, &id);
    }
}
