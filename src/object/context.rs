use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::builtins;
use super::eval;
use super::exception::{ExcKind, Exception, PendingError};
use super::native::CallArgs;
use super::ops;
use super::value::Value;

/// A module: a named namespace of values.
pub struct Module {
    pub name: String,
    dict: RefCell<IndexMap<String, Value>>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_string(),
            dict: RefCell::new(IndexMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.dict.borrow().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: Value) {
        self.dict.borrow_mut().insert(name.to_string(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.dict.borrow_mut().shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dict.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.dict.borrow().keys().cloned().collect()
    }

    fn clear(&self) {
        let drained: Vec<Value> = self.dict.borrow_mut().drain(..).map(|(_, v)| v).collect();
        drop(drained);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<module '{}'>", self.name)
    }
}

pub type ContextId = u64;

/// Populates a freshly created module.
pub type ModuleLoader = Rc<dyn Fn(&Context, &Rc<Module>) -> Result<(), Exception>>;

/// An execution context: its own globals, module cache and error
/// indicator.
pub struct Context {
    id: ContextId,
    root: bool,
    runtime: Weak<RuntimeState>,
    globals: Rc<Module>,
    modules: RefCell<IndexMap<String, Rc<Module>>>,
    pending: RefCell<Option<PendingError>>,
    ended: Cell<bool>,
}

impl Context {
    fn new(id: ContextId, root: bool, runtime: Weak<RuntimeState>) -> Self {
        Context {
            id,
            root,
            runtime,
            globals: Rc::new(Module::new("__main__")),
            modules: RefCell::new(IndexMap::new()),
            pending: RefCell::new(None),
            ended: Cell::new(false),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }

    pub fn globals(&self) -> Rc<Module> {
        self.globals.clone()
    }

    pub fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade().map(Runtime)
    }

    // ---------------------------------------------------------------------
    // Error indicator
    // ---------------------------------------------------------------------

    /// Set the error indicator, replacing any error already pending.
    pub fn set_error(&self, error: PendingError) {
        *self.pending.borrow_mut() = Some(error);
    }

    pub fn raise(&self, exception: Exception) {
        self.set_error(PendingError::from_exception(exception));
    }

    pub fn error_occurred(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Take the pending error and clear the indicator.
    pub fn fetch_error(&self) -> Option<PendingError> {
        self.pending.borrow_mut().take()
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    pub fn call(&self, callable: &Value, args: CallArgs) -> Result<Value, Exception> {
        ops::call(self, callable, args)
    }

    /// Call and report failure through the error indicator.
    pub fn call_raw(&self, callable: &Value, args: CallArgs) -> Option<Value> {
        match self.call(callable, args) {
            Ok(value) => Some(value),
            Err(exception) => {
                self.raise(exception);
                None
            }
        }
    }

    /// Evaluate one expression against the globals.
    pub fn eval(&self, source: &str) -> Result<Value, Exception> {
        eval::eval_expression(self, source)
    }

    /// Execute statements against the globals.
    pub fn exec(&self, source: &str) -> Result<(), Exception> {
        eval::exec_statements(self, source)
    }

    /// Resolve a name: globals first, then builtins.
    pub fn lookup(&self, name: &str) -> Result<Value, Exception> {
        if let Some(value) = self.globals.get(name) {
            return Ok(value);
        }
        builtins::lookup(name).ok_or_else(|| {
            Exception::new(ExcKind::NameError, format!("name '{name}' is not defined"))
        })
    }

    pub fn import(&self, name: &str) -> Result<Rc<Module>, Exception> {
        if let Some(module) = self.modules.borrow().get(name) {
            return Ok(module.clone());
        }
        let loader = self
            .runtime
            .upgrade()
            .and_then(|runtime| runtime.loaders.borrow().get(name).cloned())
            .ok_or_else(|| {
                Exception::new(
                    ExcKind::ModuleNotFoundError,
                    format!("No module named '{name}'"),
                )
            })?;

        debug!(context = self.id, module = name, "loading module");
        let module = Rc::new(Module::new(name));
        self.modules
            .borrow_mut()
            .insert(name.to_string(), module.clone());
        if let Err(error) = loader(self, &module) {
            self.modules.borrow_mut().shift_remove(name);
            return Err(error);
        }
        Ok(module)
    }

    pub fn loaded_module(&self, name: &str) -> Option<Rc<Module>> {
        self.modules.borrow().get(name).cloned()
    }

    pub fn write_output(&self, text: &str) {
        if let Some(runtime) = self.runtime.upgrade() {
            let mut output = runtime.output.borrow_mut();
            let _ = output.write_all(text.as_bytes());
            let _ = output.flush();
        }
    }

    /// Release everything the context holds.
    fn end(&self) {
        self.ended.set(true);
        self.pending.borrow_mut().take();
        let modules: Vec<Rc<Module>> = self
            .modules
            .borrow_mut()
            .drain(..)
            .map(|(_, module)| module)
            .collect();
        for module in &modules {
            module.clear();
        }
        self.globals.clear();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("ended", &self.ended.get())
            .finish()
    }
}

pub struct RuntimeState {
    root: Rc<Context>,
    active: RefCell<Rc<Context>>,
    contexts: RefCell<Vec<Rc<Context>>>,
    next_id: Cell<ContextId>,
    loaders: RefCell<IndexMap<String, ModuleLoader>>,
    output: RefCell<Box<dyn Write>>,
    assoc: RefCell<HashMap<String, Rc<dyn Any>>>,
}

/// The object runtime: a root context, any number of child contexts and
/// a register naming the active one.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeState>);

impl Runtime {
    pub fn new() -> Runtime {
        let state = Rc::new_cyclic(|weak: &Weak<RuntimeState>| {
            let root = Rc::new(Context::new(0, true, weak.clone()));
            RuntimeState {
                root: root.clone(),
                active: RefCell::new(root),
                contexts: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                loaders: RefCell::new(IndexMap::new()),
                output: RefCell::new(Box::new(std::io::stdout())),
                assoc: RefCell::new(HashMap::new()),
            }
        });
        let runtime = Runtime(state);
        runtime.register_module("math", Rc::new(builtins::load_math));
        info!("object runtime initialised");
        runtime
    }

    pub fn ptr_eq(a: &Runtime, b: &Runtime) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn root(&self) -> Rc<Context> {
        self.0.root.clone()
    }

    pub fn active(&self) -> Rc<Context> {
        self.0.active.borrow().clone()
    }

    /// Make `context` active, returning the previously active context.
    pub fn set_active(&self, context: Rc<Context>) -> Rc<Context> {
        std::mem::replace(&mut *self.0.active.borrow_mut(), context)
    }

    pub fn new_context(&self) -> Rc<Context> {
        let id = self.0.next_id.get();
        self.0.next_id.set(id + 1);
        let context = Rc::new(Context::new(id, false, Rc::downgrade(&self.0)));
        self.0.contexts.borrow_mut().push(context.clone());
        info!(context = id, "created execution context");
        context
    }

    /// End a child context, releasing its globals, modules and pending
    /// error. The root context cannot be ended. Ending the active context
    /// makes the root active.
    pub fn end_context(&self, context: &Rc<Context>) -> bool {
        if context.is_root() || context.is_ended() {
            return false;
        }
        context.end();
        self.0
            .contexts
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, context));
        let was_active = Rc::ptr_eq(&self.active(), context);
        if was_active {
            self.set_active(self.root());
        }
        info!(context = context.id(), "ended execution context");
        true
    }

    /// Number of live child contexts.
    pub fn context_count(&self) -> usize {
        self.0.contexts.borrow().len()
    }

    pub fn register_module(&self, name: &str, loader: ModuleLoader) {
        self.0.loaders.borrow_mut().insert(name.to_string(), loader);
    }

    pub fn set_output(&self, output: Box<dyn Write>) {
        *self.0.output.borrow_mut() = output;
    }

    /// Install `output` and hand back the writer it replaced.
    pub fn replace_output(&self, output: Box<dyn Write>) -> Box<dyn Write> {
        std::mem::replace(&mut *self.0.output.borrow_mut(), output)
    }

    /// Attach embedder data to the runtime under `key`.
    pub fn set_assoc_data<T: Any>(&self, key: &str, value: Rc<T>) {
        self.0.assoc.borrow_mut().insert(key.to_string(), value);
    }

    pub fn assoc_data<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        let value = self.0.assoc.borrow().get(key).cloned()?;
        value.downcast::<T>().ok()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("active", &self.active().id())
            .field("contexts", &self.context_count())
            .finish()
    }
}
