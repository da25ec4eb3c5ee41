//! `scriptnamespace`: a script namespace imported into object code.
//!
//! Every command of the namespace becomes a `scriptproc` attribute and
//! every child namespace a nested `scriptnamespace`, both captured when
//! the namespace is imported.

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::object::syntax::token::{lookup_name, TokenType};
use crate::object::{ClassInfo, Exception, NativeObject, Value};
use crate::script::Interp;

use super::target::Target;
use super::trampoline::ScriptProc;

thread_local! {
    static SCRIPTNAMESPACE: Rc<ClassInfo> = Rc::new(ClassInfo::new("scriptnamespace", "twine", None));
}

pub struct ScriptNamespace {
    name: String,
    procs: IndexMap<String, Value>,
    children: IndexMap<String, Value>,
}

impl ScriptNamespace {
    /// Import `namespace` and everything below it.
    pub fn import(interp: &Interp, namespace: &str) -> Result<ScriptNamespace> {
        let name = match namespace.trim_end_matches(':') {
            "" => "::".to_string(),
            trimmed if trimmed.starts_with("::") => trimmed.to_string(),
            trimmed => format!("::{trimmed}"),
        };
        let name = name.as_str();
        let mut procs = IndexMap::new();
        for command in interp.command_names(name, false) {
            let attribute = attribute_name(tail(&command));
            if lookup_name(&attribute) != TokenType::Name {
                continue;
            }
            match ScriptProc::lookup(interp, &command, Some(Target::Str)) {
                Ok(proc) => {
                    procs.insert(attribute, proc.into_value());
                }
                Err(error) => warn!(%command, %error, "skipping command during namespace import"),
            }
        }

        let mut children = IndexMap::new();
        for child in interp.namespace_children(name) {
            let nested = ScriptNamespace::import(interp, &child)?;
            children.insert(tail(&child).to_string(), nested.into_value());
        }
        debug!(namespace = name, procs = procs.len(), children = children.len(), "imported namespace");
        Ok(ScriptNamespace {
            name: name.to_string(),
            procs,
            children,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Native(Rc::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute names of the imported commands, in command order.
    pub fn proc_names(&self) -> impl Iterator<Item = &str> {
        self.procs.keys().map(String::as_str)
    }
}

/// The last `::`-separated part of a qualified name.
fn tail(name: &str) -> &str {
    match name.rfind("::") {
        Some(at) => &name[at + 2..],
        None => name,
    }
}

/// Map a command name onto an identifier object code can spell.
pub fn attribute_name(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    for ch in command.chars() {
        match ch {
            '-' | ':' | '.' => out.push('_'),
            '?' => out.push_str("_question_mark"),
            '+' => out.push_str("_plus_sign"),
            '<' => out.push_str("_less_than"),
            '>' => out.push_str("_greater_than"),
            '@' => out.push_str("_at_sign"),
            other => out.push(other),
        }
    }
    out
}

impl NativeObject for ScriptNamespace {
    fn class(&self) -> Rc<ClassInfo> {
        SCRIPTNAMESPACE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repr(&self) -> std::result::Result<String, Exception> {
        Ok(format!("<twine.scriptnamespace '{}'>", self.name))
    }

    fn get_attr(&self, _this: &Rc<dyn NativeObject>, name: &str) -> Option<std::result::Result<Value, Exception>> {
        if name == "__name__" {
            return Some(Ok(Value::from(self.name.as_str())));
        }
        // A child namespace shadows a command of the same name.
        self.children
            .get(name)
            .or_else(|| self.procs.get(name))
            .cloned()
            .map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names_become_identifiers() {
        assert_eq!(attribute_name("a-b"), "a_b");
        assert_eq!(attribute_name("empty?"), "empty_question_mark");
        assert_eq!(attribute_name("<=>"), "_less_than=_greater_than");
        assert_eq!(tail("::a::b::c"), "c");
        assert_eq!(tail("plain"), "plain");
    }

    #[test]
    fn namespaces_nest() {
        let interp = Interp::new();
        interp
            .eval("namespace eval ::geo { proc area {w h} { expr {$w * $h} } }")
            .unwrap();
        interp.eval("namespace eval ::geo::deep { proc one {} { return 1 } }").unwrap();
        let root = ScriptNamespace::import(&interp, "").unwrap();
        assert_eq!(root.name(), "::");
        assert!(root.proc_names().any(|name| name == "set"));
        assert!(root.children.contains_key("geo"));

        let geo = ScriptNamespace::import(&interp, "::geo").unwrap();
        assert_eq!(geo.proc_names().collect::<Vec<_>>(), ["area"]);
        assert!(geo.children.contains_key("deep"));
    }
}
