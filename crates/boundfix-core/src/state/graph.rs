// ── Dependency graph ──
//
// Derived computations over `StoreState`. Each derivation declares the
// fields it reads; after a mutation, every derivation whose inputs
// intersect the touched set re-runs inside the same commit, in declaration
// order. Side effects that need I/O are returned as `Effect`s and
// dispatched by the store once the commit is published.

use std::sync::Arc;

use tracing::trace;

use super::{Epoch, Fields, StoreState};
use crate::model::FeatureRef;
use crate::rules::RuleEngine;

/// I/O requested by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Fetch the next work item. The busy slot is already held.
    LoadCoordinate { epoch: Epoch },
    /// Cache the geometry of one suggestion for the given work item epoch.
    EnsureTopology { feature: FeatureRef, epoch: Epoch },
}

struct Derivation {
    name: &'static str,
    reads: Fields,
    run: fn(&mut StoreState, &mut Vec<Effect>) -> Fields,
}

const DERIVATIONS: &[Derivation] = &[
    Derivation {
        name: "rules",
        reads: Fields::CONFIG
            .union(Fields::COORDINATE)
            .union(Fields::SELECTION),
        run: recompute_disabled,
    },
    Derivation {
        name: "load-trigger",
        // LOADING is not an input: a failed or empty load is not retried
        // until STATUS or COORDINATE changes.
        reads: Fields::STATUS.union(Fields::COORDINATE),
        run: trigger_load,
    },
];

/// Run dependent derivations for `touched`, returning every changed field.
pub(crate) fn propagate(
    state: &mut StoreState,
    touched: Fields,
    effects: &mut Vec<Effect>,
) -> Fields {
    let mut changed = touched;
    for derivation in DERIVATIONS {
        if !derivation.reads.intersects(changed) {
            continue;
        }
        let written = (derivation.run)(state, effects);
        trace!(derivation = derivation.name, %written, "derivation ran");
        changed |= written;
    }
    changed
}

/// Re-derive `disabled` on the current suggestions.
fn recompute_disabled(state: &mut StoreState, _effects: &mut Vec<Effect>) -> Fields {
    let config = Arc::clone(&state.status.config);
    let engine = RuleEngine::new(&config.rules);
    let Some(item) = state.coordinate.as_mut() else {
        return Fields::NONE;
    };
    if !engine.is_stale(item, &state.selected) {
        return Fields::NONE;
    }
    engine.apply(Arc::make_mut(item), &state.selected);
    Fields::SUGGESTIONS
}

/// Start a coordinate load when work is pending and none is loaded.
fn trigger_load(state: &mut StoreState, effects: &mut Vec<Effect>) -> Fields {
    if !state.should_load() {
        return Fields::NONE;
    }
    let (epoch, touched) = state.begin_load();
    effects.push(Effect::LoadCoordinate { epoch });
    touched
}
