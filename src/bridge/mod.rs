//! The bridge between the script runtime and the object runtime.
//!
//! A [`Bridge`] owns the pairing between script interpreters and object
//! runtime contexts. Whichever side is initialised first is the parent:
//! [`Bridge::from_interp`] starts from an existing interpreter and creates
//! the object runtime, [`Bridge::from_runtime`] starts from an object
//! runtime and creates the root interpreter. Every further interpreter
//! that loads the bridge package gets its own child context, ended when
//! the interpreter is deleted.
//!
//! ## Ownership
//!
//! ```text
//! Bridge ──Rc──> BridgeState ──Weak──> interpreters
//!    │                │
//!    └──> root Interp └──> Runtime ──Weak──> BridgeState
//! ```
//!
//! The root interpreter keeps the state alive through its associated
//! data, so dropping the `Bridge` handle does not tear anything down.

pub mod commands;
pub mod convert;
pub mod exception;
pub mod lifecycle;
pub mod module;
pub mod namespace;
pub mod proxy;
pub mod session;
pub mod shadow;
pub mod target;
pub mod trampoline;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::object::{Context, Runtime};
use crate::script::{Interp, InterpId};

pub use convert::{to_obj, to_value};
pub use lifecycle::{ContextGuard, ContextRegistry, Pairing, Parent};
pub use proxy::{Binding, Flavour, Proxy};
pub use session::Session;
pub use target::Target;

const ASSOC_KEY: &str = "twine";

/// Shared state behind every [`Bridge`] handle, command and native.
pub struct BridgeState {
    config: BridgeConfig,
    runtime: Runtime,
    parent: Parent,
    registry: RefCell<ContextRegistry>,
}

impl BridgeState {
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn parent(&self) -> Parent {
        self.parent
    }

    /// The interpreter paired with `context`.
    pub fn interp_for(&self, context: &Context) -> Result<Interp> {
        self.registry
            .borrow()
            .interp_for(context)
            .ok_or_else(|| {
                BridgeError::Internal(format!(
                    "no script interpreter is paired with context {}",
                    context.id()
                ))
            })
    }

    pub fn context_for(&self, interp: &Interp) -> Option<Rc<Context>> {
        self.registry
            .borrow()
            .get(interp.id())
            .map(|pairing| pairing.context.clone())
    }

    /// Switch the runtime to the context paired with `interp` until the
    /// returned guard is dropped.
    pub fn enter(&self, interp: &Interp) -> Result<ContextGuard> {
        let context = self.context_for(interp).ok_or_else(|| {
            BridgeError::Internal(format!("interpreter {} is not paired", interp.id()))
        })?;
        Ok(ContextGuard::enter(&self.runtime, context))
    }

    /// Pair a further interpreter with a fresh child context.
    pub fn attach(self: &Rc<Self>, interp: &Interp) -> Result<()> {
        if interp.is_deleted() {
            return Err(BridgeError::Internal(format!(
                "interpreter {} has been deleted",
                interp.id()
            )));
        }
        if self.registry.borrow().get(interp.id()).is_some() {
            return Ok(());
        }
        let context = self.runtime.new_context();
        info!(interp = %interp.id(), context = context.id(), "pairing interpreter with child context");
        self.pair(interp, context, false);
        Ok(())
    }

    fn pair(self: &Rc<Self>, interp: &Interp, context: Rc<Context>, root: bool) {
        self.registry
            .borrow_mut()
            .insert(Pairing::new(interp, context, root));
        interp.set_max_depth(self.config.max_depth);
        commands::install(interp, self);
        interp.mark_package_loaded(&self.config.package);

        let state = Rc::downgrade(self);
        interp.call_when_deleted(move |interp| {
            if let Some(state) = state.upgrade() {
                state.detach(interp.id());
            }
        });
    }

    /// Forget the pairing of a deleted interpreter, ending its context
    /// unless it is the root pairing.
    fn detach(&self, id: InterpId) {
        let Some(pairing) = self.registry.borrow_mut().remove(id) else {
            return;
        };
        if pairing.root {
            debug!(interp = %id, "root interpreter deleted; object runtime stays up");
            return;
        }
        let context = pairing.context;
        let previous = self.runtime.set_active(context.clone());
        self.runtime.end_context(&context);
        if !Rc::ptr_eq(&previous, &context) && !previous.is_ended() {
            self.runtime.set_active(previous);
        }
        info!(interp = %id, context = context.id(), "ended child context of deleted interpreter");
    }

    pub fn pairing_count(&self) -> usize {
        self.registry.borrow().len()
    }
}

/// The bridge installed in the runtime `context` belongs to.
pub fn state_of(context: &Context) -> Option<Rc<BridgeState>> {
    context
        .runtime()?
        .assoc_data::<Weak<BridgeState>>(ASSOC_KEY)?
        .upgrade()
}

/// Find the bridge a context belongs to, together with the interpreter
/// paired with that context.
pub fn resolve(context: &Context) -> Result<(Rc<BridgeState>, Interp)> {
    let state = state_of(context)
        .ok_or_else(|| BridgeError::Internal("the object runtime has no bridge".to_string()))?;
    let interp = state.interp_for(context)?;
    Ok((state, interp))
}

/// Handle to an initialised bridge.
#[derive(Clone)]
pub struct Bridge {
    state: Rc<BridgeState>,
    interp: Interp,
}

impl Bridge {
    /// Object runtime first: create the root interpreter for `runtime`.
    pub fn from_runtime(runtime: Runtime, config: BridgeConfig) -> Result<Bridge> {
        let interp = Interp::new();
        Bridge::init(interp, runtime, config, Parent::Object)
    }

    /// Script runtime first: create an object runtime for `interp`.
    pub fn from_interp(interp: &Interp, config: BridgeConfig) -> Result<Bridge> {
        if let Some(state) = interp.assoc_data::<BridgeState>(ASSOC_KEY) {
            return Ok(Bridge {
                state,
                interp: interp.clone(),
            });
        }
        Bridge::init(interp.clone(), Runtime::new(), config, Parent::Script)
    }

    /// A bridge over a fresh interpreter and runtime with default settings.
    pub fn new() -> Result<Bridge> {
        Bridge::from_runtime(Runtime::new(), BridgeConfig::default())
    }

    fn init(interp: Interp, runtime: Runtime, config: BridgeConfig, parent: Parent) -> Result<Bridge> {
        config
            .validate()
            .map_err(|error| BridgeError::Internal(error.to_string()))?;
        if runtime.assoc_data::<Weak<BridgeState>>(ASSOC_KEY).is_some() {
            return Err(BridgeError::Internal(
                "the object runtime already has a bridge".to_string(),
            ));
        }

        let state = Rc::new(BridgeState {
            config,
            runtime: runtime.clone(),
            parent,
            registry: RefCell::new(ContextRegistry::default()),
        });
        runtime.set_assoc_data(ASSOC_KEY, Rc::new(Rc::downgrade(&state)));
        runtime.register_module(&state.config.module, Rc::new(module::load));
        interp.set_assoc_data(ASSOC_KEY, state.clone());

        let weak = Rc::downgrade(&state);
        interp.provide_package(
            &state.config.package,
            Rc::new(move |child: &Interp| {
                let state = weak
                    .upgrade()
                    .ok_or_else(|| "twine bridge is no longer available".to_string())?;
                state.attach(child).map_err(|error| error.to_string())
            }),
        );

        state.pair(&interp, runtime.root(), true);
        info!(interp = %interp.id(), ?parent, "bridge initialised");
        Ok(Bridge { state, interp })
    }

    pub fn interp(&self) -> &Interp {
        &self.interp
    }

    pub fn runtime(&self) -> &Runtime {
        &self.state.runtime
    }

    pub fn parent(&self) -> Parent {
        self.state.parent
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.state.config
    }

    pub fn state(&self) -> &Rc<BridgeState> {
        &self.state
    }

    pub fn attach(&self, interp: &Interp) -> Result<()> {
        self.state.attach(interp)
    }

    pub fn enter(&self, interp: &Interp) -> Result<ContextGuard> {
        self.state.enter(interp)
    }

    pub fn context_for(&self, interp: &Interp) -> Option<Rc<Context>> {
        self.state.context_for(interp)
    }

    /// Entry points operating on the root interpreter.
    pub fn session(&self) -> Session {
        Session::new(self.state.clone(), self.interp.clone())
    }

    /// Entry points operating on `interp`, which must be paired.
    pub fn session_for(&self, interp: &Interp) -> Result<Session> {
        if self.state.context_for(interp).is_none() {
            return Err(BridgeError::Internal(format!(
                "interpreter {} is not paired",
                interp.id()
            )));
        }
        Ok(Session::new(self.state.clone(), interp.clone()))
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("parent", &self.state.parent)
            .field("interp", &self.interp.id())
            .field("pairings", &self.state.pairing_count())
            .finish()
    }
}

#[cfg(test)]
mod bridge_test;
