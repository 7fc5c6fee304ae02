//! Flow-sensitive ownership/borrow state machine (spec §4.4).
//!
//! Every binding starts `Alive`. Using it by value moves it to `Moved`
//! unless its type is copy-kind ([`Type::is_copy`]); taking `&x`/`&mut x`
//! pushes a borrow and releases it at the end of the borrow's lexical
//! scope. Branches and loops join their exit states conservatively: if a
//! binding could be `Moved` down either path, it is `Moved` after the
//! join, since a later use can't know which path was taken.

use corvus_util::{DefId, FxHashMap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipState {
    Alive,
    Moved,
    BorrowedShared(u32),
    BorrowedExclusive,
}

impl OwnershipState {
    /// Conservative join used at the exit of an `if`/`else` or loop body:
    /// anything that isn't alive on both paths can't be used afterward.
    fn join(a: OwnershipState, b: OwnershipState) -> OwnershipState {
        use OwnershipState::*;
        match (a, b) {
            (Alive, Alive) => Alive,
            (Moved, _) | (_, Moved) => Moved,
            (BorrowedExclusive, _) | (_, BorrowedExclusive) => BorrowedExclusive,
            (BorrowedShared(n), BorrowedShared(m)) => BorrowedShared(n.max(m)),
            (BorrowedShared(n), Alive) | (Alive, BorrowedShared(n)) => BorrowedShared(n),
        }
    }
}

pub struct OwnershipTracker {
    states: FxHashMap<DefId, OwnershipState>,
    errors: Vec<(String, Span)>,
}

impl OwnershipTracker {
    pub fn new() -> Self {
        Self {
            states: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[(String, Span)] {
        &self.errors
    }

    pub fn declare(&mut self, def_id: DefId) {
        self.states.insert(def_id, OwnershipState::Alive);
    }

    pub fn forget(&mut self, def_id: DefId) {
        self.states.remove(&def_id);
    }

    fn state(&self, def_id: DefId) -> OwnershipState {
        self.states
            .get(&def_id)
            .copied()
            .unwrap_or(OwnershipState::Alive)
    }

    /// Record use of `def_id` by value. Moves it out unless `is_copy`.
    pub fn use_value(&mut self, def_id: DefId, is_copy: bool, span: Span) {
        match self.state(def_id) {
            OwnershipState::Moved => {
                self.errors.push(("use of moved value".into(), span));
            }
            OwnershipState::BorrowedExclusive | OwnershipState::BorrowedShared(_) => {
                self.errors
                    .push(("cannot move out of borrowed value".into(), span));
            }
            OwnershipState::Alive => {
                if !is_copy {
                    self.states.insert(def_id, OwnershipState::Moved);
                }
            }
        }
    }

    pub fn borrow_shared(&mut self, def_id: DefId, span: Span) {
        match self.state(def_id) {
            OwnershipState::Moved => self.errors.push(("use of moved value".into(), span)),
            OwnershipState::BorrowedExclusive => self
                .errors
                .push(("cannot borrow: already exclusively borrowed".into(), span)),
            OwnershipState::BorrowedShared(n) => {
                self.states.insert(def_id, OwnershipState::BorrowedShared(n + 1));
            }
            OwnershipState::Alive => {
                self.states.insert(def_id, OwnershipState::BorrowedShared(1));
            }
        }
    }

    pub fn borrow_exclusive(&mut self, def_id: DefId, span: Span) {
        match self.state(def_id) {
            OwnershipState::Moved => self.errors.push(("use of moved value".into(), span)),
            OwnershipState::BorrowedShared(_) | OwnershipState::BorrowedExclusive => self
                .errors
                .push(("cannot borrow as mutable: already borrowed".into(), span)),
            OwnershipState::Alive => {
                self.states.insert(def_id, OwnershipState::BorrowedExclusive);
            }
        }
    }

    /// Release one borrow taken at `def_id`, e.g. at the end of the
    /// expression statement that took it.
    pub fn release_borrow(&mut self, def_id: DefId) {
        match self.state(def_id) {
            OwnershipState::BorrowedShared(1) | OwnershipState::BorrowedExclusive => {
                self.states.insert(def_id, OwnershipState::Alive);
            }
            OwnershipState::BorrowedShared(n) if n > 1 => {
                self.states.insert(def_id, OwnershipState::BorrowedShared(n - 1));
            }
            _ => {}
        }
    }

    /// Snapshot states for every tracked binding, for branch joins.
    pub fn snapshot(&self) -> FxHashMap<DefId, OwnershipState> {
        self.states.clone()
    }

    pub fn restore(&mut self, snapshot: FxHashMap<DefId, OwnershipState>) {
        self.states = snapshot;
    }

    /// Join two branch-exit snapshots (`if`/`else`) into the current state.
    /// Per branch, the two exit states must agree (spec §4.4); a mismatch is
    /// ill-formed and raises `InconsistentOwnership` rather than silently
    /// picking a conservative state, though the walk still continues with
    /// the conservative merge so later errors in the same function surface
    /// too.
    pub fn join_branches(
        &mut self,
        then_snapshot: &FxHashMap<DefId, OwnershipState>,
        else_snapshot: &FxHashMap<DefId, OwnershipState>,
        span: Span,
    ) {
        let mut joined = FxHashMap::default();
        for (&def_id, &then_state) in then_snapshot {
            let else_state = else_snapshot
                .get(&def_id)
                .copied()
                .unwrap_or(OwnershipState::Alive);
            if then_state != else_state {
                self.errors.push((
                    "variable has inconsistent ownership state across branches".into(),
                    span,
                ));
            }
            joined.insert(def_id, OwnershipState::join(then_state, else_state));
        }
        for (&def_id, &else_state) in else_snapshot {
            joined.entry(def_id).or_insert(else_state);
        }
        self.states = joined;
    }

    /// A loop body must leave every binding it moved back in a state that's
    /// safe on re-entry: if a non-copy binding moved inside the body but
    /// existed before it, flag a possible use-after-move on the second
    /// iteration.
    pub fn check_loop_reentry(
        &mut self,
        pre_loop: &FxHashMap<DefId, OwnershipState>,
        post_body: &FxHashMap<DefId, OwnershipState>,
        span: Span,
    ) {
        for (&def_id, &pre_state) in pre_loop {
            if pre_state == OwnershipState::Alive {
                if let Some(&OwnershipState::Moved) = post_body.get(&def_id) {
                    self.errors.push((
                        "value may be used after move on a later loop iteration".into(),
                        span,
                    ));
                }
            }
        }
    }
}

impl Default for OwnershipTracker {
    fn default() -> Self {
        Self::new()
    }
}
