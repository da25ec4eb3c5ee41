//! Pairing of script interpreters with object runtime contexts.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::object::{Context, Runtime};
use crate::script::{Interp, InterpId, WeakInterp};

/// Which runtime was initialised first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Script,
    Object,
}

/// One interpreter and the context its bridge calls run in.
pub struct Pairing {
    pub interp: WeakInterp,
    pub interp_id: InterpId,
    pub context: Rc<Context>,
    /// The root pairing uses the runtime's root context, which outlives
    /// the interpreter.
    pub root: bool,
}

impl Pairing {
    pub fn new(interp: &Interp, context: Rc<Context>, root: bool) -> Self {
        Pairing {
            interp: interp.downgrade(),
            interp_id: interp.id(),
            context,
            root,
        }
    }
}

#[derive(Default)]
pub struct ContextRegistry {
    pairings: IndexMap<InterpId, Pairing>,
}

impl ContextRegistry {
    pub fn insert(&mut self, pairing: Pairing) {
        self.pairings.insert(pairing.interp_id, pairing);
    }

    pub fn get(&self, id: InterpId) -> Option<&Pairing> {
        self.pairings.get(&id)
    }

    pub fn remove(&mut self, id: InterpId) -> Option<Pairing> {
        self.pairings.shift_remove(&id)
    }

    /// The live interpreter paired with `context`.
    pub fn interp_for(&self, context: &Context) -> Option<Interp> {
        self.pairings
            .values()
            .find(|pairing| pairing.context.id() == context.id())
            .and_then(|pairing| pairing.interp.upgrade())
            .filter(|interp| !interp.is_deleted())
    }

    pub fn len(&self) -> usize {
        self.pairings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairings.is_empty()
    }
}

/// Restores the previously active context on drop.
pub struct ContextGuard {
    runtime: Runtime,
    previous: Option<Rc<Context>>,
    context: Rc<Context>,
}

impl ContextGuard {
    pub fn enter(runtime: &Runtime, context: Rc<Context>) -> ContextGuard {
        let previous = runtime.set_active(context.clone());
        trace!(from = previous.id(), to = context.id(), "switched active context");
        ContextGuard {
            runtime: runtime.clone(),
            previous: Some(previous),
            context,
        }
    }

    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        // A context ended while entered already handed activity to root.
        if let Some(previous) = self.previous.take()
            && !previous.is_ended()
            && !self.context.is_ended()
        {
            self.runtime.set_active(previous);
        }
    }
}
