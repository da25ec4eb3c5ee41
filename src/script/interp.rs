//! Interpreter instances.
//!
//! `Interp` is a cheap `Rc` handle and every method takes `&self`, so
//! commands can call back into the interpreter that invoked them. Internal
//! `RefCell` borrows are kept short and are never held across a command
//! invocation or a user callback.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::commands;
use super::expr;
use super::flow::{EvalResult, Flow, ScriptError};
use super::obj::Obj;
use super::parser::{self, Part, SubstFlags};

pub type CommandFn = Rc<dyn Fn(&Interp, &[Obj]) -> EvalResult>;
pub type PackageInit = Rc<dyn Fn(&Interp) -> Result<(), String>>;
pub type DeleteCallback = Box<dyn FnOnce(&Interp)>;

const DEFAULT_MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterpId(u64);

impl std::fmt::Display for InterpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interp#{}", self.0)
    }
}

thread_local! {
    static NEXT_INTERP_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_interp_id() -> InterpId {
    NEXT_INTERP_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        InterpId(id)
    })
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Obj>,
}

#[derive(Debug)]
pub struct Proc {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Rc<str>,
    pub namespace: String,
}

impl Proc {
    fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for (i, param) in self.params.iter().enumerate() {
            usage.push(' ');
            if param.name == "args" && i + 1 == self.params.len() {
                usage.push_str("?arg ...?");
            } else if param.default.is_some() {
                usage.push_str(&format!("?{}?", param.name));
            } else {
                usage.push_str(&param.name);
            }
        }
        format!("wrong # args: should be \"{usage}\"")
    }

    fn bind(&self, args: &[Obj]) -> Result<HashMap<String, Var>, Flow> {
        let mut locals = HashMap::new();
        let mut remaining = args.iter();

        for (i, param) in self.params.iter().enumerate() {
            if param.name == "args" && i + 1 == self.params.len() {
                let rest: Vec<Obj> = remaining.by_ref().cloned().collect();
                locals.insert(param.name.clone(), Var::Scalar(Obj::from_list(rest)));
                continue;
            }
            let value = match (remaining.next(), &param.default) {
                (Some(arg), _) => arg.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => return Err(Flow::error(self.usage())),
            };
            locals.insert(param.name.clone(), Var::Scalar(value));
        }

        if remaining.next().is_some() {
            return Err(Flow::error(self.usage()));
        }
        Ok(locals)
    }
}

#[derive(Clone)]
pub enum Command {
    Native(CommandFn),
    Proc(Rc<Proc>),
}

#[derive(Debug, Clone)]
pub enum Var {
    Scalar(Obj),
    Array(IndexMap<String, Obj>),
    /// Local alias of a fully qualified namespace variable.
    Link(String),
}

#[derive(Default)]
struct Namespace {
    vars: HashMap<String, Var>,
    commands: HashMap<String, Command>,
}

struct Frame {
    locals: HashMap<String, Var>,
    namespace: String,
}

enum VarLoc {
    Local(String),
    Ns(String, String),
}

struct InterpState {
    id: InterpId,
    name: String,
    parent: Option<WeakInterp>,
    namespaces: RefCell<BTreeMap<String, Namespace>>,
    frames: RefCell<Vec<Frame>>,
    ns_stack: RefCell<Vec<String>>,
    children: RefCell<IndexMap<String, Interp>>,
    next_child: Cell<usize>,
    packages: Rc<RefCell<HashMap<String, PackageInit>>>,
    loaded: RefCell<HashSet<String>>,
    assoc: RefCell<HashMap<String, Rc<dyn Any>>>,
    delete_callbacks: RefCell<Vec<DeleteCallback>>,
    deleted: Cell<bool>,
    depth: Cell<usize>,
    max_depth: Cell<usize>,
    output: RefCell<Box<dyn Write>>,
}

#[derive(Clone)]
pub struct Interp(Rc<InterpState>);

#[derive(Clone)]
pub struct WeakInterp(Weak<InterpState>);

impl WeakInterp {
    pub fn upgrade(&self) -> Option<Interp> {
        self.0.upgrade().map(Interp)
    }
}

impl std::fmt::Debug for WeakInterp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(interp) => write!(f, "WeakInterp({})", interp.id()),
            None => f.write_str("WeakInterp(<dropped>)"),
        }
    }
}

impl std::fmt::Debug for Interp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interp({}, {:?})", self.0.id, self.0.name)
    }
}

/// Split `name(index)` into its array name and element.
pub(crate) fn split_var_name(name: &str) -> (&str, Option<&str>) {
    if name.ends_with(')')
        && let Some(open) = name.find('(')
    {
        return (&name[..open], Some(&name[open + 1..name.len() - 1]));
    }
    (name, None)
}

/// Pops a nesting level when dropped.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Dropping the last handle deletes the interpreter, so delete callbacks
/// run exactly once whether or not `delete` was called explicitly.
impl Drop for Interp {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) == 1 && !self.0.deleted.get() {
            self.delete();
        }
    }
}

impl Default for Interp {
    fn default() -> Self {
        Interp::new()
    }
}

impl Interp {
    /// A root interpreter with the core command set.
    pub fn new() -> Interp {
        Interp::build(None, String::new(), Rc::new(RefCell::new(HashMap::new())))
    }

    fn build(
        parent: Option<WeakInterp>,
        name: String,
        packages: Rc<RefCell<HashMap<String, PackageInit>>>,
    ) -> Interp {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("::".to_string(), Namespace::default());

        let interp = Interp(Rc::new(InterpState {
            id: next_interp_id(),
            name,
            parent,
            namespaces: RefCell::new(namespaces),
            frames: RefCell::new(Vec::new()),
            ns_stack: RefCell::new(vec!["::".to_string()]),
            children: RefCell::new(IndexMap::new()),
            next_child: Cell::new(0),
            packages,
            loaded: RefCell::new(HashSet::new()),
            assoc: RefCell::new(HashMap::new()),
            delete_callbacks: RefCell::new(Vec::new()),
            deleted: Cell::new(false),
            depth: Cell::new(0),
            max_depth: Cell::new(DEFAULT_MAX_DEPTH),
            output: RefCell::new(Box::new(std::io::stdout())),
        }));
        commands::register_core(&interp);
        debug!(interp = %interp.id(), "interpreter created");
        interp
    }

    pub fn id(&self) -> InterpId {
        self.0.id
    }

    /// Name of this interpreter inside its parent; empty for a root.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn downgrade(&self) -> WeakInterp {
        WeakInterp(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(a: &Interp, b: &Interp) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn parent(&self) -> Option<Interp> {
        self.0.parent.as_ref().and_then(WeakInterp::upgrade)
    }

    pub fn is_deleted(&self) -> bool {
        self.0.deleted.get()
    }

    pub fn set_max_depth(&self, depth: usize) {
        self.0.max_depth.set(depth.max(1));
    }

    pub fn set_output(&self, output: Box<dyn Write>) {
        *self.0.output.borrow_mut() = output;
    }

    pub(crate) fn write_output(&self, text: &str) -> Result<(), String> {
        let mut output = self.0.output.borrow_mut();
        output
            .write_all(text.as_bytes())
            .map_err(|e| format!("error writing \"stdout\": {e}"))?;
        output
            .flush()
            .map_err(|e| format!("error writing \"stdout\": {e}"))
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Evaluate a script in the current scope.
    pub fn eval(&self, script: &str) -> Result<Obj, ScriptError> {
        let result = self.eval_script(script);
        self.finish(result)
    }

    /// Evaluate a script at global level, outside any proc frame.
    pub fn eval_global(&self, script: &str) -> Result<Obj, ScriptError> {
        let result = self.at_global(|| self.eval_script(script));
        self.finish(result)
    }

    /// Evaluate an arithmetic expression.
    pub fn expr(&self, expression: &str) -> Result<Obj, ScriptError> {
        let result = expr::evaluate(self, expression);
        self.finish(result)
    }

    /// Perform backslash, command and variable substitution on `template`.
    pub fn subst(&self, template: &str) -> Result<Obj, ScriptError> {
        let result = self.subst_with(template, SubstFlags::default());
        self.finish(result)
    }

    /// Invoke a command with already-split words; nothing is re-parsed.
    pub fn call(&self, words: &[Obj]) -> Result<Obj, ScriptError> {
        let result = self.invoke(words).map_err(|flow| match flow {
            Flow::Error(mut error) => {
                let text: Vec<&str> = words.iter().map(Obj::as_str).collect();
                error.add_context(&super::list_format::merge(&text), 1);
                Flow::Error(error)
            }
            other => other,
        });
        self.finish(result)
    }

    fn finish(&self, mut result: EvalResult) -> Result<Obj, ScriptError> {
        loop {
            match result {
                Ok(value) => return Ok(value),
                Err(Flow::Error(error)) => {
                    self.record_error(&error);
                    return Err(error);
                }
                Err(flow) => result = flow.complete(),
            }
        }
    }

    fn record_error(&self, error: &ScriptError) {
        debug!(interp = %self.id(), message = %error.message, "script error");
        let _ = self.set_var("::errorInfo", Obj::new(error.error_info()));
        let _ = self.set_var("::errorCode", error.code.clone());
    }

    fn enter_nested(&self) -> Result<DepthGuard<'_>, Flow> {
        let depth = self.0.depth.get() + 1;
        if depth > self.0.max_depth.get() {
            return Err(Flow::error("too many nested evaluations (infinite loop?)"));
        }
        self.0.depth.set(depth);
        Ok(DepthGuard(&self.0.depth))
    }

    pub(crate) fn eval_script(&self, script: &str) -> EvalResult {
        if self.is_deleted() {
            return Err(Flow::error("attempt to call eval in deleted interpreter"));
        }
        let _guard = self.enter_nested()?;
        let commands = parser::parse_script(script).map_err(Flow::error)?;

        let mut result = Obj::empty();
        for command in &commands {
            result = self
                .eval_command(command)
                .map_err(|flow| match flow {
                    Flow::Error(mut error) => {
                        error.add_context(&command.text, command.line);
                        Flow::Error(error)
                    }
                    other => other,
                })?;
        }
        Ok(result)
    }

    fn eval_command(&self, command: &parser::Command) -> EvalResult {
        let mut words = Vec::with_capacity(command.words.len());
        for word in &command.words {
            let value = self.subst_parts(&word.parts)?;
            if word.expand {
                words.extend(value.list()?);
            } else {
                words.push(value);
            }
        }
        if words.is_empty() {
            return Ok(Obj::empty());
        }
        trace!(command = %words[0], argc = words.len() - 1, "invoke");
        self.invoke(&words)
    }

    pub(crate) fn subst_with(&self, template: &str, flags: SubstFlags) -> EvalResult {
        let parts = parser::parse_template(template, flags).map_err(Flow::error)?;
        let mut out = String::new();
        for part in &parts {
            match self.subst_part(part) {
                Ok(value) => out.push_str(value.as_str()),
                Err(Flow::Break) => break,
                Err(Flow::Continue) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(Obj::new(out))
    }

    /// Substitute a word. A word made of a single variable or command
    /// substitution yields that value itself, not a copy.
    pub(crate) fn subst_parts(&self, parts: &[Part]) -> EvalResult {
        if let [single] = parts {
            return self.subst_part(single);
        }
        let mut out = String::new();
        for part in parts {
            out.push_str(self.subst_part(part)?.as_str());
        }
        Ok(Obj::new(out))
    }

    fn subst_part(&self, part: &Part) -> EvalResult {
        match part {
            Part::Text(text) => Ok(Obj::new(text.as_str())),
            Part::Var { name, index: None } => Ok(self.get_var(name)?),
            Part::Var {
                name,
                index: Some(index),
            } => {
                let index = self.subst_parts(index)?;
                Ok(self.get_var(&format!("{name}({index})"))?)
            }
            Part::Script(script) => self.eval_script(script),
        }
    }

    /// Run the command named by `words[0]`.
    pub fn invoke(&self, words: &[Obj]) -> EvalResult {
        let Some(first) = words.first() else {
            return Ok(Obj::empty());
        };
        let Some(command) = self.find_command(first.as_str()) else {
            return Err(Flow::error(format!(
                "invalid command name \"{}\"",
                first.as_str()
            )));
        };

        match command {
            Command::Native(func) => func(self, words),
            Command::Proc(proc) => self.call_proc(&proc, &words[1..]),
        }
    }

    fn call_proc(&self, proc: &Proc, args: &[Obj]) -> EvalResult {
        let locals = proc.bind(args)?;
        self.0.frames.borrow_mut().push(Frame {
            locals,
            namespace: proc.namespace.clone(),
        });
        let result = self.eval_script(&proc.body);
        let frame = self.0.frames.borrow_mut().pop();
        drop(frame);

        match result {
            Ok(value) => Ok(value),
            Err(Flow::Error(mut error)) => {
                error.info.push_str(&format!(
                    "\n    (procedure \"{}\" line {})",
                    proc.name, error.line
                ));
                Err(Flow::Error(error))
            }
            Err(flow) => flow.complete(),
        }
    }

    /// Run `f` with no proc frames active and the global namespace current.
    pub(crate) fn at_global<R>(&self, f: impl FnOnce() -> R) -> R {
        self.in_namespace("::", f)
    }

    /// Run `f` at namespace level in `namespace`.
    pub(crate) fn in_namespace<R>(&self, namespace: &str, f: impl FnOnce() -> R) -> R {
        let frames = std::mem::take(&mut *self.0.frames.borrow_mut());
        self.0.ns_stack.borrow_mut().push(namespace.to_string());
        let result = f();
        self.0.ns_stack.borrow_mut().pop();
        *self.0.frames.borrow_mut() = frames;
        result
    }

    /// Number of active proc frames.
    pub fn level(&self) -> usize {
        self.0.frames.borrow().len()
    }

    // ---------------------------------------------------------------------
    // Namespaces
    // ---------------------------------------------------------------------

    pub fn current_namespace(&self) -> String {
        if let Some(frame) = self.0.frames.borrow().last() {
            return frame.namespace.clone();
        }
        self.0
            .ns_stack
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| "::".to_string())
    }

    /// Fully qualified form of a namespace name, relative to the current one.
    pub fn qualify_namespace(&self, name: &str) -> String {
        let absolute = if name.starts_with("::") {
            name.to_string()
        } else {
            let current = self.current_namespace();
            if current == "::" {
                format!("::{name}")
            } else {
                format!("{current}::{name}")
            }
        };
        let trimmed = absolute.trim_end_matches(':');
        if trimmed.is_empty() {
            "::".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Create a namespace (and its parents); returns the qualified name.
    pub fn create_namespace(&self, name: &str) -> String {
        let qualified = self.qualify_namespace(name);
        let mut namespaces = self.0.namespaces.borrow_mut();
        let mut path = String::new();
        for segment in qualified.split("::").filter(|s| !s.is_empty()) {
            path.push_str("::");
            path.push_str(segment);
            namespaces.entry(path.clone()).or_default();
        }
        qualified
    }

    pub fn namespace_exists(&self, name: &str) -> bool {
        let qualified = self.qualify_namespace(name);
        self.0.namespaces.borrow().contains_key(&qualified)
    }

    pub fn namespace_children(&self, name: &str) -> Vec<String> {
        let parent = self.qualify_namespace(name);
        let prefix = if parent == "::" {
            "::".to_string()
        } else {
            format!("{parent}::")
        };
        self.0
            .namespaces
            .borrow()
            .keys()
            .filter(|ns| {
                ns.len() > prefix.len()
                    && ns.starts_with(&prefix)
                    && !ns[prefix.len()..].contains("::")
            })
            .cloned()
            .collect()
    }

    pub fn delete_namespace(&self, name: &str) -> Result<(), String> {
        let qualified = self.qualify_namespace(name);
        if qualified == "::" {
            return Err("cannot delete the global namespace".to_string());
        }
        let nested = format!("{qualified}::");
        let removed: Vec<Namespace> = {
            let mut namespaces = self.0.namespaces.borrow_mut();
            if !namespaces.contains_key(&qualified) {
                return Err(format!("unknown namespace \"{name}\" in namespace delete command"));
            }
            let doomed: Vec<String> = namespaces
                .keys()
                .filter(|ns| **ns == qualified || ns.starts_with(&nested))
                .cloned()
                .collect();
            doomed
                .iter()
                .filter_map(|ns| namespaces.remove(ns))
                .collect()
        };
        drop(removed);
        Ok(())
    }

    fn split_qualified(&self, name: &str) -> Option<(String, String)> {
        let (ns, tail) = name.rsplit_once("::")?;
        let ns = if ns.is_empty() {
            "::".to_string()
        } else {
            self.qualify_namespace(ns)
        };
        Some((ns, tail.to_string()))
    }

    // ---------------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------------

    fn locate_var(&self, base: &str) -> VarLoc {
        if let Some((ns, tail)) = self.split_qualified(base) {
            return VarLoc::Ns(ns, tail);
        }

        let link = {
            let frames = self.0.frames.borrow();
            match frames.last() {
                Some(frame) => match frame.locals.get(base) {
                    Some(Var::Link(target)) => Some(target.clone()),
                    _ => return VarLoc::Local(base.to_string()),
                },
                None => None,
            }
        };

        match link {
            Some(target) => self.locate_var(&target),
            None => VarLoc::Ns(self.current_namespace(), base.to_string()),
        }
    }

    fn with_vars<R>(
        &self,
        loc: &VarLoc,
        f: impl FnOnce(Option<&mut HashMap<String, Var>>, &str) -> R,
    ) -> R {
        match loc {
            VarLoc::Local(name) => {
                let mut frames = self.0.frames.borrow_mut();
                f(frames.last_mut().map(|frame| &mut frame.locals), name)
            }
            VarLoc::Ns(ns, name) => {
                let mut namespaces = self.0.namespaces.borrow_mut();
                f(namespaces.get_mut(ns).map(|ns| &mut ns.vars), name)
            }
        }
    }

    pub fn get_var(&self, name: &str) -> Result<Obj, String> {
        let (base, index) = split_var_name(name);
        let loc = self.locate_var(base);
        self.with_vars(&loc, |vars, key| {
            let var = vars.and_then(|vars| vars.get(key));
            match (var, index) {
                (Some(Var::Scalar(obj)), None) => Ok(obj.clone()),
                (Some(Var::Array(_)), None) => {
                    Err(format!("can't read \"{name}\": variable is array"))
                }
                (Some(Var::Array(elements)), Some(index)) => {
                    elements.get(index).cloned().ok_or_else(|| {
                        format!("can't read \"{name}\": no such element in array")
                    })
                }
                (Some(Var::Scalar(_)), Some(_)) => {
                    Err(format!("can't read \"{name}\": variable isn't array"))
                }
                (Some(Var::Link(_)) | None, _) => {
                    Err(format!("can't read \"{name}\": no such variable"))
                }
            }
        })
    }

    pub fn set_var(&self, name: &str, value: Obj) -> Result<Obj, String> {
        let (base, index) = split_var_name(name);
        let loc = self.locate_var(base);
        self.with_vars(&loc, |vars, key| {
            let Some(vars) = vars else {
                return Err(format!(
                    "can't set \"{name}\": parent namespace doesn't exist"
                ));
            };
            match index {
                None => match vars.get_mut(key) {
                    Some(Var::Array(_)) => {
                        Err(format!("can't set \"{name}\": variable is array"))
                    }
                    Some(slot) => {
                        *slot = Var::Scalar(value.clone());
                        Ok(value)
                    }
                    None => {
                        vars.insert(key.to_string(), Var::Scalar(value.clone()));
                        Ok(value)
                    }
                },
                Some(index) => {
                    let slot = vars
                        .entry(key.to_string())
                        .or_insert_with(|| Var::Array(IndexMap::new()));
                    match slot {
                        Var::Array(elements) => {
                            elements.insert(index.to_string(), value.clone());
                            Ok(value)
                        }
                        _ => Err(format!("can't set \"{name}\": variable isn't array")),
                    }
                }
            }
        })
    }

    /// Mutate a variable's value in place. `f` must not call back into
    /// this interpreter.
    pub fn with_var_mut<R>(&self, name: &str, f: impl FnOnce(&mut Obj) -> R) -> Result<R, String> {
        let (base, index) = split_var_name(name);
        let loc = self.locate_var(base);
        self.with_vars(&loc, |vars, key| {
            let slot = vars.and_then(|vars| vars.get_mut(key));
            match (slot, index) {
                (Some(Var::Scalar(obj)), None) => Ok(f(obj)),
                (Some(Var::Array(elements)), Some(index)) => match elements.get_mut(index) {
                    Some(obj) => Ok(f(obj)),
                    None => Err(format!("can't read \"{name}\": no such element in array")),
                },
                (Some(Var::Array(_)), None) => {
                    Err(format!("can't read \"{name}\": variable is array"))
                }
                _ => Err(format!("can't read \"{name}\": no such variable")),
            }
        })
    }

    pub fn unset_var(&self, name: &str) -> Result<(), String> {
        let (base, index) = split_var_name(name);
        let loc = self.locate_var(base);
        let removed = self.with_vars(&loc, |vars, key| {
            let Some(vars) = vars else {
                return Err(format!("can't unset \"{name}\": no such variable"));
            };
            match index {
                None => vars
                    .remove(key)
                    .ok_or_else(|| format!("can't unset \"{name}\": no such variable")),
                Some(index) => match vars.get_mut(key) {
                    Some(Var::Array(elements)) => elements
                        .shift_remove(index)
                        .map(Var::Scalar)
                        .ok_or_else(|| {
                            format!("can't unset \"{name}\": no such element in array")
                        }),
                    Some(_) => Err(format!("can't unset \"{name}\": variable isn't array")),
                    None => Err(format!("can't unset \"{name}\": no such variable")),
                },
            }
        })?;
        drop(removed);
        Ok(())
    }

    pub fn var_exists(&self, name: &str) -> bool {
        let (base, index) = split_var_name(name);
        let loc = self.locate_var(base);
        self.with_vars(&loc, |vars, key| {
            match (vars.and_then(|vars| vars.get(key)), index) {
                (Some(Var::Scalar(_) | Var::Array(_)), None) => true,
                (Some(Var::Array(elements)), Some(index)) => elements.contains_key(index),
                _ => false,
            }
        })
    }

    /// Make `name` in the current proc frame an alias for the namespace
    /// variable `target`. At namespace level this is a no-op.
    pub fn link_var(&self, local: &str, target: &str) -> Result<(), String> {
        let qualified = match self.split_qualified(target) {
            Some((ns, tail)) if ns == "::" => format!("::{tail}"),
            Some((ns, tail)) => format!("{ns}::{tail}"),
            None => {
                let ns = self.current_namespace();
                if ns == "::" {
                    format!("::{target}")
                } else {
                    format!("{ns}::{target}")
                }
            }
        };
        let mut frames = self.0.frames.borrow_mut();
        if let Some(frame) = frames.last_mut() {
            if let Some(Var::Scalar(_) | Var::Array(_)) = frame.locals.get(local) {
                return Err(format!("variable \"{local}\" already exists"));
            }
            frame.locals.insert(local.to_string(), Var::Link(qualified));
        }
        Ok(())
    }

    // Arrays ---------------------------------------------------------------

    fn with_array<R>(
        &self,
        name: &str,
        f: impl FnOnce(Option<&mut IndexMap<String, Obj>>) -> R,
    ) -> R {
        let loc = self.locate_var(name);
        self.with_vars(&loc, |vars, key| match vars.and_then(|vars| vars.get_mut(key)) {
            Some(Var::Array(elements)) => f(Some(elements)),
            _ => f(None),
        })
    }

    pub fn array_exists(&self, name: &str) -> bool {
        self.with_array(name, |array| array.is_some())
    }

    pub fn array_size(&self, name: &str) -> usize {
        self.with_array(name, |array| array.map_or(0, |a| a.len()))
    }

    pub fn array_names(&self, name: &str) -> Vec<String> {
        self.with_array(name, |array| {
            array.map_or_else(Vec::new, |a| a.keys().cloned().collect())
        })
    }

    pub fn array_get(&self, name: &str) -> Vec<(String, Obj)> {
        self.with_array(name, |array| {
            array.map_or_else(Vec::new, |a| {
                a.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            })
        })
    }

    pub fn array_set(&self, name: &str, pairs: Vec<(String, Obj)>) -> Result<(), String> {
        let loc = self.locate_var(name);
        self.with_vars(&loc, |vars, key| {
            let Some(vars) = vars else {
                return Err(format!("can't set \"{name}\": parent namespace doesn't exist"));
            };
            let slot = vars
                .entry(key.to_string())
                .or_insert_with(|| Var::Array(IndexMap::new()));
            let Var::Array(elements) = slot else {
                return Err(format!("can't array set \"{name}\": variable isn't array"));
            };
            elements.extend(pairs);
            Ok(())
        })
    }

    /// Remove elements matching `pattern`, or the whole array.
    pub fn array_unset(&self, name: &str, pattern: Option<&str>) {
        match pattern {
            None => {
                if self.array_exists(name) {
                    let _ = self.unset_var(name);
                }
            }
            Some(pattern) => {
                let removed = self.with_array(name, |array| {
                    let Some(array) = array else {
                        return Vec::new();
                    };
                    let doomed: Vec<String> = array
                        .keys()
                        .filter(|k| commands::glob_match(pattern, k))
                        .cloned()
                        .collect();
                    doomed
                        .iter()
                        .filter_map(|k| array.shift_remove(k))
                        .collect::<Vec<Obj>>()
                });
                drop(removed);
            }
        }
    }

    /// Variable names visible at the current level.
    pub fn visible_var_names(&self) -> Vec<String> {
        if let Some(frame) = self.0.frames.borrow().last() {
            let mut names: Vec<String> = frame.locals.keys().cloned().collect();
            names.sort();
            return names;
        }
        self.namespace_var_names(&self.current_namespace())
    }

    pub fn namespace_var_names(&self, namespace: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .0
            .namespaces
            .borrow()
            .get(namespace)
            .map(|ns| ns.vars.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    fn command_slot(&self, name: &str) -> (String, String) {
        match self.split_qualified(name) {
            Some(split) => split,
            None => (self.current_namespace(), name.to_string()),
        }
    }

    pub fn register_command(
        &self,
        name: &str,
        func: impl Fn(&Interp, &[Obj]) -> EvalResult + 'static,
    ) {
        self.insert_command(name, Command::Native(Rc::new(func)));
    }

    fn insert_command(&self, name: &str, command: Command) {
        let (ns, tail) = self.command_slot(name);
        if ns != "::" {
            self.create_namespace(&ns);
        }
        let previous = self
            .0
            .namespaces
            .borrow_mut()
            .entry(ns)
            .or_default()
            .commands
            .insert(tail, command);
        drop(previous);
    }

    pub fn create_proc(&self, name: &str, params: Vec<Param>, body: &str) {
        let (ns, tail) = self.command_slot(name);
        let proc = Proc {
            name: name.to_string(),
            params,
            body: Rc::from(body),
            namespace: ns.clone(),
        };
        let qualified = if ns == "::" {
            format!("::{tail}")
        } else {
            format!("{ns}::{tail}")
        };
        self.insert_command(&qualified, Command::Proc(Rc::new(proc)));
    }

    pub fn find_command(&self, name: &str) -> Option<Command> {
        let namespaces = self.0.namespaces.borrow();
        if let Some((ns, tail)) = self.split_qualified(name) {
            return namespaces.get(&ns)?.commands.get(&tail).cloned();
        }
        let current = self.current_namespace();
        namespaces
            .get(&current)
            .and_then(|ns| ns.commands.get(name))
            .or_else(|| namespaces.get("::").and_then(|ns| ns.commands.get(name)))
            .cloned()
    }

    pub fn command_exists(&self, name: &str) -> bool {
        self.find_command(name).is_some()
    }

    pub fn proc_info(&self, name: &str) -> Option<Rc<Proc>> {
        match self.find_command(name)? {
            Command::Proc(proc) => Some(proc),
            Command::Native(_) => None,
        }
    }

    pub fn delete_command(&self, name: &str) -> bool {
        let (ns, tail) = self.resolve_command_slot(name);
        let removed = self
            .0
            .namespaces
            .borrow_mut()
            .get_mut(&ns)
            .and_then(|ns| ns.commands.remove(&tail));
        removed.is_some()
    }

    fn resolve_command_slot(&self, name: &str) -> (String, String) {
        if let Some(split) = self.split_qualified(name) {
            return split;
        }
        let current = self.current_namespace();
        let in_current = self
            .0
            .namespaces
            .borrow()
            .get(&current)
            .is_some_and(|ns| ns.commands.contains_key(name));
        if in_current {
            (current, name.to_string())
        } else {
            ("::".to_string(), name.to_string())
        }
    }

    pub fn rename_command(&self, old: &str, new: &str) -> Result<(), String> {
        let (ns, tail) = self.resolve_command_slot(old);
        let command = self
            .0
            .namespaces
            .borrow_mut()
            .get_mut(&ns)
            .and_then(|ns| ns.commands.remove(&tail))
            .ok_or_else(|| format!("can't rename \"{old}\": command doesn't exist"))?;
        if !new.is_empty() {
            self.insert_command(new, command);
        }
        Ok(())
    }

    /// Qualified names of the commands in `namespace`.
    pub fn command_names(&self, namespace: &str, procs_only: bool) -> Vec<String> {
        let namespaces = self.0.namespaces.borrow();
        let Some(ns) = namespaces.get(namespace) else {
            return Vec::new();
        };
        let mut names: Vec<String> = ns
            .commands
            .iter()
            .filter(|(_, command)| !procs_only || matches!(command, Command::Proc(_)))
            .map(|(name, _)| {
                if namespace == "::" {
                    name.clone()
                } else {
                    format!("{namespace}::{name}")
                }
            })
            .collect();
        names.sort();
        names
    }

    // ---------------------------------------------------------------------
    // Child interpreters, packages, lifecycle
    // ---------------------------------------------------------------------

    pub fn create_child(&self, name: Option<&str>) -> Result<Interp, String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => loop {
                let n = self.0.next_child.get();
                self.0.next_child.set(n + 1);
                let candidate = format!("interp{n}");
                if !self.0.children.borrow().contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        if self.0.children.borrow().contains_key(&name) {
            return Err(format!(
                "interpreter named \"{name}\" already exists, cannot create"
            ));
        }

        let child = Interp::build(Some(self.downgrade()), name.clone(), self.0.packages.clone());
        child.set_max_depth(self.0.max_depth.get());
        self.0.children.borrow_mut().insert(name, child.clone());
        Ok(child)
    }

    pub fn child(&self, name: &str) -> Option<Interp> {
        self.0.children.borrow().get(name).cloned()
    }

    pub fn child_names(&self) -> Vec<String> {
        self.0.children.borrow().keys().cloned().collect()
    }

    pub fn delete_child(&self, name: &str) -> Result<(), String> {
        let child = self
            .0
            .children
            .borrow_mut()
            .shift_remove(name)
            .ok_or_else(|| format!("could not find interpreter \"{name}\""))?;
        child.delete();
        Ok(())
    }

    /// Register `callback` to run once when this interpreter is deleted.
    pub fn call_when_deleted(&self, callback: impl FnOnce(&Interp) + 'static) {
        self.0.delete_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Delete the interpreter: children first, then delete callbacks, then
    /// every variable and command. Idempotent.
    pub fn delete(&self) {
        if self.0.deleted.replace(true) {
            return;
        }
        debug!(interp = %self.id(), name = %self.0.name, "deleting interpreter");

        let children: Vec<Interp> = self
            .0
            .children
            .borrow_mut()
            .drain(..)
            .map(|(_, child)| child)
            .collect();
        for child in children {
            child.delete();
        }

        let callbacks = std::mem::take(&mut *self.0.delete_callbacks.borrow_mut());
        for callback in callbacks {
            callback(self);
        }

        let namespaces = std::mem::take(&mut *self.0.namespaces.borrow_mut());
        drop(namespaces);
        let frames = std::mem::take(&mut *self.0.frames.borrow_mut());
        drop(frames);
        let assoc = std::mem::take(&mut *self.0.assoc.borrow_mut());
        drop(assoc);
    }

    pub fn provide_package(&self, name: &str, init: PackageInit) {
        self.0.packages.borrow_mut().insert(name.to_string(), init);
    }

    pub fn mark_package_loaded(&self, name: &str) {
        self.0.loaded.borrow_mut().insert(name.to_string());
    }

    pub fn package_loaded(&self, name: &str) -> bool {
        self.0.loaded.borrow().contains(name)
    }

    pub fn require_package(&self, name: &str) -> Result<(), String> {
        if self.package_loaded(name) {
            return Ok(());
        }
        let init = self
            .0
            .packages
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("can't find package {name}"))?;

        self.mark_package_loaded(name);
        if let Err(message) = init(self) {
            self.0.loaded.borrow_mut().remove(name);
            return Err(message);
        }
        Ok(())
    }

    pub fn set_assoc_data<T: Any>(&self, key: &str, value: Rc<T>) {
        self.0.assoc.borrow_mut().insert(key.to_string(), value);
    }

    pub fn assoc_data<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        let value = self.0.assoc.borrow().get(key).cloned()?;
        value.downcast::<T>().ok()
    }
}
