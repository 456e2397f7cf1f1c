//! Per-frame callback registry with snapshot-per-tick invocation.
//!
//! Scene objects register closures here to run once per tick, before the
//! frame is rendered. The registry is shared behind an `Rc`, so a running
//! callback may register or unregister callbacks (including itself) through
//! the same handle; such changes are queued and take effect starting with the
//! *next* [`invoke_all`](FrameRegistry::invoke_all), never mid-tick.

use std::cell::RefCell;

/// Identifies a registered callback for later removal.
///
/// Tokens are allocated by [`FrameRegistry::register`] and are never reused,
/// so registering the same closure twice yields two distinct entries and two
/// distinct tokens. Duplicate registration of a single token cannot occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

struct Entry {
    token: FrameToken,
    callback: Box<dyn FnMut()>,
}

#[derive(Default)]
struct State {
    /// Callbacks invoked on the current tick.
    active: Vec<Entry>,
    /// Registrations made since the last tick started.
    pending_add: Vec<Entry>,
    /// Removals requested since the last tick started.
    pending_remove: Vec<FrameToken>,
    next_token: u64,
}

impl State {
    fn flush(&mut self) {
        for token in self.pending_remove.drain(..) {
            self.active.retain(|entry| entry.token != token);
        }
        self.active.append(&mut self.pending_add);
    }
}

/// A mutable set of per-frame callbacks.
///
/// Invocation order is registration order, but callbacks must not depend on
/// it; each is an independent unit of work. The single guarantee is that one
/// call to [`invoke_all`](Self::invoke_all) runs every callback registered
/// before that call exactly once.
pub struct FrameRegistry {
    state: RefCell<State>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
        }
    }

    /// Register a callback to run on every subsequent tick.
    ///
    /// Takes effect on the next tick if called while a tick is in progress.
    pub fn register(&self, callback: impl FnMut() + 'static) -> FrameToken {
        let mut state = self.state.borrow_mut();
        let token = FrameToken(state.next_token);
        state.next_token += 1;
        state.pending_add.push(Entry {
            token,
            callback: Box::new(callback),
        });
        token
    }

    /// Remove a previously registered callback.
    ///
    /// Unknown tokens are ignored, so teardown paths may unregister
    /// unconditionally. A callback that unregisters itself mid-invocation
    /// still finishes the current tick.
    pub fn unregister(&self, token: FrameToken) {
        let mut state = self.state.borrow_mut();
        if let Some(i) = state.pending_add.iter().position(|e| e.token == token) {
            state.pending_add.remove(i);
            return;
        }
        state.pending_remove.push(token);
    }

    /// Number of callbacks that will run on the next tick.
    pub fn len(&self) -> usize {
        let state = self.state.borrow();
        state
            .active
            .iter()
            .filter(|e| !state.pending_remove.contains(&e.token))
            .count()
            + state.pending_add.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every currently registered callback exactly once.
    ///
    /// Pending changes are applied first, then the active set is frozen for
    /// the duration of the call. Registrations and removals performed by the
    /// callbacks themselves land in the pending queues and apply next tick.
    pub fn invoke_all(&self) {
        let mut snapshot = {
            let mut state = self.state.borrow_mut();
            state.flush();
            std::mem::take(&mut state.active)
        };

        // The borrow is released here, so callbacks are free to re-enter
        // register/unregister through a shared handle.
        for entry in &mut snapshot {
            (entry.callback)();
        }

        self.state.borrow_mut().active = snapshot;
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn invokes_each_callback_exactly_once() {
        let registry = FrameRegistry::new();
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        registry.register(cb_a);
        registry.register(cb_b);

        registry.invoke_all();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 1);

        registry.invoke_all();
        assert_eq!(a.get(), 2);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn unregistered_callback_stops_running() {
        let registry = FrameRegistry::new();
        let (count, cb) = counter();
        let token = registry.register(cb);

        registry.invoke_all();
        registry.unregister(token);
        registry.invoke_all();

        assert_eq!(count.get(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unknown_token_is_a_no_op() {
        let registry = FrameRegistry::new();
        let (count, cb) = counter();
        let token = registry.register(cb);
        registry.unregister(token);
        // Second removal of the same token must not disturb anything.
        registry.unregister(token);

        let (other, cb_other) = counter();
        registry.register(cb_other);
        registry.invoke_all();

        assert_eq!(count.get(), 0);
        assert_eq!(other.get(), 1);
    }

    #[test]
    fn self_unregistering_callback_completes_its_invocation() {
        let registry = Rc::new(FrameRegistry::new());
        let count = Rc::new(Cell::new(0));
        let token_slot = Rc::new(Cell::new(None));

        let reg = Rc::clone(&registry);
        let inner_count = Rc::clone(&count);
        let inner_slot = Rc::clone(&token_slot);
        let token = registry.register(move || {
            inner_count.set(inner_count.get() + 1);
            if let Some(token) = inner_slot.get() {
                reg.unregister(token);
            }
        });
        token_slot.set(Some(token));

        registry.invoke_all();
        assert_eq!(count.get(), 1);

        registry.invoke_all();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn callback_unregistered_by_a_peer_still_runs_this_tick() {
        let registry = Rc::new(FrameRegistry::new());
        let victim_slot = Rc::new(Cell::new(None));

        // The unregisterer runs first in snapshot order, so the victim is
        // removed mid-invocation, before its own turn.
        let reg = Rc::clone(&registry);
        let slot = Rc::clone(&victim_slot);
        registry.register(move || {
            if let Some(token) = slot.get() {
                reg.unregister(token);
            }
        });

        let (victim_count, victim_cb) = counter();
        victim_slot.set(Some(registry.register(victim_cb)));

        registry.invoke_all();
        assert_eq!(victim_count.get(), 1, "snapshot member must run this tick");

        registry.invoke_all();
        assert_eq!(victim_count.get(), 1, "removed callback must not run again");
    }

    #[test]
    fn registration_during_invocation_is_deferred_one_tick() {
        let registry = Rc::new(FrameRegistry::new());
        let late = Rc::new(Cell::new(0));

        let reg = Rc::clone(&registry);
        let inner_late = Rc::clone(&late);
        let registered = Rc::new(Cell::new(false));
        let inner_registered = Rc::clone(&registered);
        registry.register(move || {
            if !inner_registered.get() {
                inner_registered.set(true);
                let count = Rc::clone(&inner_late);
                reg.register(move || count.set(count.get() + 1));
            }
        });

        registry.invoke_all();
        assert_eq!(late.get(), 0, "new callback must not run in the same tick");

        registry.invoke_all();
        assert_eq!(late.get(), 1);
    }

    #[test]
    fn len_tracks_pending_changes() {
        let registry = FrameRegistry::new();
        assert!(registry.is_empty());

        let a = registry.register(|| {});
        let _b = registry.register(|| {});
        assert_eq!(registry.len(), 2);

        registry.unregister(a);
        assert_eq!(registry.len(), 1);

        registry.invoke_all();
        assert_eq!(registry.len(), 1);
    }
}
