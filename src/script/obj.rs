//! Script runtime values.
//!
//! ## Memory model
//!
//! An `Obj` is an `Rc` handle to a cell holding two representations:
//!
//! * a **string representation**, generated lazily and cached, and
//! * an **internal representation** (`Rep`) such as a parsed list, dict,
//!   big integer or double, also cached lazily.
//!
//! Reading never changes what a value *means*: asking a text value for its
//! list form parses the text once and keeps the parsed elements next to the
//! text ("shimmering"), which every other holder of the same handle can
//! observe only as a speed-up.
//!
//! Writing is copy-on-write. All mutators take `&mut Obj` and go through
//! `Rc::make_mut`, so a value referenced from anywhere else (another
//! variable, a list element, a proxy) is duplicated first and the caller's
//! handle is repointed at the private copy. `is_shared()` reports whether a
//! write would copy.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use super::{leak_detector, list_format, number};
use crate::encoding;

pub type DictMap = IndexMap<Rc<str>, Obj>;

/// Result of probing a value for a numeric interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Double(f64),
}

#[derive(Debug, Clone)]
enum Rep {
    /// Only the string representation is valid.
    Text,
    Bool(bool),
    Int(BigInt),
    Double(f64),
    Bytes(Vec<u8>),
    List(Vec<Obj>),
    Dict(DictMap),
}

impl Rep {
    fn render(&self) -> String {
        match self {
            Rep::Text => String::new(),
            Rep::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Rep::Int(i) => i.to_string(),
            Rep::Double(d) => number::format_double(*d),
            Rep::Bytes(bytes) => encoding::from_byte_array(bytes),
            Rep::List(items) => {
                let texts: Vec<&str> = items.iter().map(Obj::as_str).collect();
                list_format::merge(&texts)
            }
            Rep::Dict(map) => {
                let mut texts: Vec<&str> = Vec::with_capacity(map.len() * 2);
                for (key, value) in map {
                    texts.push(key);
                    texts.push(value.as_str());
                }
                list_format::merge(&texts)
            }
        }
    }
}

struct ObjData {
    text: OnceCell<Rc<str>>,
    rep: RefCell<Rep>,
}

impl ObjData {
    fn new(text: Option<Rc<str>>, rep: Rep) -> Self {
        leak_detector::record_obj_created();
        let cell = OnceCell::new();
        if let Some(text) = text {
            let _ = cell.set(text);
        }
        ObjData {
            text: cell,
            rep: RefCell::new(rep),
        }
    }
}

impl Clone for ObjData {
    fn clone(&self) -> Self {
        ObjData::new(self.text.get().cloned(), self.rep.borrow().clone())
    }
}

impl Drop for ObjData {
    fn drop(&mut self) {
        leak_detector::record_obj_released();
    }
}

#[derive(Clone)]
pub struct Obj(Rc<ObjData>);

fn not_a_list() -> String {
    "value is not a list".to_string()
}

fn not_a_dict() -> String {
    "value is not a dictionary".to_string()
}

impl Obj {
    pub fn new(text: impl Into<Rc<str>>) -> Obj {
        Obj(Rc::new(ObjData::new(Some(text.into()), Rep::Text)))
    }

    pub fn empty() -> Obj {
        Obj::new("")
    }

    pub fn from_bool(value: bool) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::Bool(value))))
    }

    pub fn from_int(value: impl Into<BigInt>) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::Int(value.into()))))
    }

    pub fn from_f64(value: f64) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::Double(value))))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::Bytes(bytes))))
    }

    pub fn from_list(items: Vec<Obj>) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::List(items))))
    }

    pub fn from_strs<S: AsRef<str>>(items: &[S]) -> Obj {
        Obj::from_list(items.iter().map(|s| Obj::new(s.as_ref())).collect())
    }

    pub fn from_dict(map: DictMap) -> Obj {
        Obj(Rc::new(ObjData::new(None, Rep::Dict(map))))
    }

    pub fn empty_dict() -> Obj {
        Obj::from_dict(DictMap::new())
    }

    /// String representation, generated on first use.
    pub fn as_str(&self) -> &str {
        self.0
            .text
            .get_or_init(|| Rc::from(self.0.rep.borrow().render()))
    }

    pub fn text(&self) -> Rc<str> {
        let _ = self.as_str();
        self.0.text.get().cloned().unwrap_or_else(|| Rc::from(""))
    }

    pub fn ptr_eq(a: &Obj, b: &Obj) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// True when a mutation through this handle would copy first.
    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }

    /// Name of the cached internal representation, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match &*self.0.rep.borrow() {
            Rep::Text => "string",
            Rep::Bool(_) => "boolean",
            Rep::Int(_) => "int",
            Rep::Double(_) => "double",
            Rep::Bytes(_) => "bytearray",
            Rep::List(_) => "list",
            Rep::Dict(_) => "dict",
        }
    }

    fn shimmer(&self, rep: Rep) {
        let _ = self.as_str();
        *self.0.rep.borrow_mut() = rep;
    }

    fn is_text_rep(&self) -> bool {
        matches!(&*self.0.rep.borrow(), Rep::Text)
    }

    fn rep_mut(&mut self) -> &mut Rep {
        let data = Rc::make_mut(&mut self.0);
        data.text = OnceCell::new();
        data.rep.get_mut()
    }

    // ---------------------------------------------------------------------
    // Numbers
    // ---------------------------------------------------------------------

    /// Numeric interpretation of the value, if it has one.
    pub fn number(&self) -> Option<Number> {
        match &*self.0.rep.borrow() {
            Rep::Int(i) => return Some(Number::Int(i.clone())),
            Rep::Bool(b) => return Some(Number::Int(BigInt::from(u8::from(*b)))),
            Rep::Double(d) => return Some(Number::Double(*d)),
            Rep::List(_) | Rep::Dict(_) | Rep::Bytes(_) | Rep::Text => {}
        }

        let text = self.as_str();
        if let Some(int) = number::parse_int(text) {
            if self.is_text_rep() {
                self.shimmer(Rep::Int(int.clone()));
            }
            return Some(Number::Int(int));
        }

        let double = number::parse_double(text)?;
        if self.is_text_rep() {
            self.shimmer(Rep::Double(double));
        }
        Some(Number::Double(double))
    }

    pub fn int(&self) -> Result<BigInt, String> {
        match self.number() {
            Some(Number::Int(i)) => Ok(i),
            _ => Err(format!("expected integer but got \"{}\"", self.as_str())),
        }
    }

    pub fn i64(&self) -> Result<i64, String> {
        self.int()?.to_i64().ok_or_else(|| {
            format!("integer value too large to represent: \"{}\"", self.as_str())
        })
    }

    pub fn double(&self) -> Result<f64, String> {
        match self.number() {
            Some(Number::Double(d)) => Ok(d),
            Some(Number::Int(i)) => Ok(i.to_f64().unwrap_or(f64::NAN)),
            None => Err(format!(
                "expected floating-point number but got \"{}\"",
                self.as_str()
            )),
        }
    }

    pub fn boolean(&self) -> Result<bool, String> {
        match &*self.0.rep.borrow() {
            Rep::Bool(b) => return Ok(*b),
            Rep::Int(i) => return Ok(!i.is_zero()),
            Rep::Double(d) => return Ok(*d != 0.0),
            _ => {}
        }
        number::parse_bool(self.as_str())
            .ok_or_else(|| format!("expected boolean value but got \"{}\"", self.as_str()))
    }

    /// Byte-array view. Text values contribute the low byte of each char.
    pub fn bytes(&self) -> Vec<u8> {
        if let Rep::Bytes(bytes) = &*self.0.rep.borrow() {
            return bytes.clone();
        }
        encoding::to_byte_array(self.as_str())
    }

    // ---------------------------------------------------------------------
    // Lists
    // ---------------------------------------------------------------------

    fn parsed_list(&self) -> Result<Vec<Obj>, String> {
        let scalar = matches!(
            &*self.0.rep.borrow(),
            Rep::Bool(_) | Rep::Int(_) | Rep::Double(_)
        );
        if scalar {
            return Ok(vec![Obj::new(self.text())]);
        }
        Ok(list_format::parse_list(self.as_str())?
            .into_iter()
            .map(Obj::new)
            .collect())
    }

    /// Make sure the internal representation is a list, shimmering away any
    /// other representation.
    fn force_list(&self) -> Result<(), String> {
        let items = match &*self.0.rep.borrow() {
            Rep::List(_) => return Ok(()),
            Rep::Dict(map) => Some(dict_to_list(map)),
            _ => None,
        };
        let items = match items {
            Some(items) => items,
            None => self.parsed_list()?,
        };
        self.shimmer(Rep::List(items));
        Ok(())
    }

    /// Run `f` over the list elements. Dict values are viewed as their
    /// flattened key/value list without losing the dict representation.
    pub fn with_list<R>(&self, f: impl FnOnce(&[Obj]) -> R) -> Result<R, String> {
        let flattened = match &*self.0.rep.borrow() {
            Rep::List(items) => return Ok(f(items)),
            Rep::Dict(map) => Some(dict_to_list(map)),
            _ => None,
        };
        if let Some(items) = flattened {
            return Ok(f(&items));
        }

        self.force_list()?;
        match &*self.0.rep.borrow() {
            Rep::List(items) => Ok(f(items)),
            _ => Err(not_a_list()),
        }
    }

    pub fn list(&self) -> Result<Vec<Obj>, String> {
        self.with_list(<[Obj]>::to_vec)
    }

    pub fn list_len(&self) -> Result<usize, String> {
        self.with_list(<[Obj]>::len)
    }

    pub fn list_index(&self, index: usize) -> Result<Option<Obj>, String> {
        self.with_list(|items| items.get(index).cloned())
    }

    pub fn list_append(&mut self, item: Obj) -> Result<(), String> {
        self.force_list()?;
        match self.rep_mut() {
            Rep::List(items) => {
                items.push(item);
                Ok(())
            }
            _ => Err(not_a_list()),
        }
    }

    pub fn list_extend(&mut self, new_items: Vec<Obj>) -> Result<(), String> {
        self.force_list()?;
        match self.rep_mut() {
            Rep::List(items) => {
                items.extend(new_items);
                Ok(())
            }
            _ => Err(not_a_list()),
        }
    }

    pub fn list_set(&mut self, index: usize, item: Obj) -> Result<(), String> {
        self.force_list()?;
        if index >= self.list_len()? {
            return Err("list index out of range".to_string());
        }
        match self.rep_mut() {
            Rep::List(items) => {
                items[index] = item;
                Ok(())
            }
            _ => Err(not_a_list()),
        }
    }

    /// Replace `count` elements starting at `first` with `replacement`.
    /// `first` past the end appends.
    pub fn list_splice(
        &mut self,
        first: usize,
        count: usize,
        replacement: Vec<Obj>,
    ) -> Result<Vec<Obj>, String> {
        self.force_list()?;
        match self.rep_mut() {
            Rep::List(items) => {
                let start = first.min(items.len());
                let end = start.saturating_add(count).min(items.len());
                Ok(items.splice(start..end, replacement).collect())
            }
            _ => Err(not_a_list()),
        }
    }

    pub fn list_insert(&mut self, index: usize, item: Obj) -> Result<(), String> {
        self.list_splice(index, 0, vec![item]).map(|_| ())
    }

    pub fn list_remove(&mut self, index: usize) -> Result<Obj, String> {
        if index >= self.list_len()? {
            return Err("list index out of range".to_string());
        }
        self.list_splice(index, 1, Vec::new())?
            .pop()
            .ok_or_else(|| "list index out of range".to_string())
    }

    // ---------------------------------------------------------------------
    // Dicts
    // ---------------------------------------------------------------------

    fn force_dict(&self) -> Result<(), String> {
        if matches!(&*self.0.rep.borrow(), Rep::Dict(_)) {
            return Ok(());
        }
        let map = self.with_list(build_dict)??;
        self.shimmer(Rep::Dict(map));
        Ok(())
    }

    pub fn with_dict<R>(&self, f: impl FnOnce(&DictMap) -> R) -> Result<R, String> {
        self.force_dict()?;
        match &*self.0.rep.borrow() {
            Rep::Dict(map) => Ok(f(map)),
            _ => Err(not_a_dict()),
        }
    }

    pub fn dict_size(&self) -> Result<usize, String> {
        self.with_dict(DictMap::len)
    }

    pub fn dict_get(&self, key: &str) -> Result<Option<Obj>, String> {
        self.with_dict(|map| map.get(key).cloned())
    }

    pub fn dict_contains(&self, key: &str) -> Result<bool, String> {
        self.with_dict(|map| map.contains_key(key))
    }

    /// Follow a path of keys through nested dicts.
    pub fn dict_get_path(&self, path: &[Obj]) -> Result<Option<Obj>, String> {
        let mut current = self.clone();
        for key in path {
            match current.dict_get(key.as_str())? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Store `value` under a key path, creating intermediate dicts.
    pub fn dict_put_path(&mut self, path: &[Obj], value: Obj) -> Result<(), String> {
        let Some((first, rest)) = path.split_first() else {
            return Err("empty key path".to_string());
        };
        self.force_dict()?;
        let Rep::Dict(map) = self.rep_mut() else {
            return Err(not_a_dict());
        };

        if rest.is_empty() {
            map.insert(first.text(), value);
            return Ok(());
        }
        map.entry(first.text())
            .or_insert_with(Obj::empty_dict)
            .dict_put_path(rest, value)
    }

    /// Remove the entry at the end of a key path. A missing final key is
    /// not an error; a missing intermediate key is.
    pub fn dict_remove_path(&mut self, path: &[Obj]) -> Result<bool, String> {
        let Some((first, rest)) = path.split_first() else {
            return Err("empty key path".to_string());
        };
        let present = self.dict_contains(first.as_str())?;

        if rest.is_empty() {
            if !present {
                return Ok(false);
            }
            let Rep::Dict(map) = self.rep_mut() else {
                return Err(not_a_dict());
            };
            map.shift_remove(first.as_str());
            return Ok(true);
        }

        if !present {
            return Err(format!(
                "key \"{}\" not known in dictionary",
                first.as_str()
            ));
        }
        let Rep::Dict(map) = self.rep_mut() else {
            return Err(not_a_dict());
        };
        match map.get_mut(first.as_str()) {
            Some(child) => child.dict_remove_path(rest),
            None => Ok(false),
        }
    }

    // ---------------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------------

    pub fn append_text(&mut self, suffix: &str) {
        let combined = format!("{}{}", self.as_str(), suffix);
        *self = Obj::new(combined);
    }
}

fn dict_to_list(map: &DictMap) -> Vec<Obj> {
    map.iter()
        .flat_map(|(key, value)| [Obj::new(key.clone()), value.clone()])
        .collect()
}

fn build_dict(items: &[Obj]) -> Result<DictMap, String> {
    if items.len() % 2 != 0 {
        return Err("missing value to go with key".to_string());
    }
    let mut map = DictMap::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        map.insert(pair[0].text(), pair[1].clone());
    }
    Ok(map)
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({:?})", self.as_str())
    }
}

/// Values compare by their string representation.
impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        Obj::ptr_eq(self, other) || self.as_str() == other.as_str()
    }
}

impl Default for Obj {
    fn default() -> Self {
        Obj::empty()
    }
}

impl From<&str> for Obj {
    fn from(value: &str) -> Self {
        Obj::new(value)
    }
}

impl From<String> for Obj {
    fn from(value: String) -> Self {
        Obj::new(value)
    }
}

impl From<Rc<str>> for Obj {
    fn from(value: Rc<str>) -> Self {
        Obj::new(value)
    }
}

impl From<i64> for Obj {
    fn from(value: i64) -> Self {
        Obj::from_int(value)
    }
}

impl From<BigInt> for Obj {
    fn from(value: BigInt) -> Self {
        Obj::from_int(value)
    }
}

impl From<bool> for Obj {
    fn from(value: bool) -> Self {
        Obj::from_bool(value)
    }
}

impl From<f64> for Obj {
    fn from(value: f64) -> Self {
        Obj::from_f64(value)
    }
}
