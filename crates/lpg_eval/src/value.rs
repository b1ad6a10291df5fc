//! Runtime values.

use crate::classes::ClassId;
use indexmap::IndexMap;
use lpg_ast::TypeRef;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type ObjRef = Rc<RefCell<Object>>;

/// A Java value. Boxed and primitive numbers share a representation.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    Str(Rc<str>),
    Ref(ObjRef),
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub(crate) fn object(object: Object) -> Self {
        Value::Ref(Rc::new(RefCell::new(object)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Char(c) => Some(*c as i32),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(l) => Some(*l),
            other => other.as_int().map(i64::from),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            other => other.as_long().map(|l| l as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "String",
            Value::Ref(obj) => obj.borrow().kind(),
        }
    }

    /// Reference identity for objects, value equality otherwise (`==`).
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Ref(a), Value::Ref(b)) => Rc::ptr_eq(a, b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Double(_), _) | (_, Value::Double(_)) => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => match (self.as_long(), other.as_long()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Snapshot of a list or array's elements.
    pub fn items(&self) -> Option<Vec<Value>> {
        match &*self.as_object()?.borrow() {
            Object::List(items) | Object::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Acquire and release counts of a lock.
    pub fn lock_stats(&self) -> Option<LockState> {
        match &*self.as_object()?.borrow() {
            Object::Lock(state) => Some(*state),
            _ => None,
        }
    }

    pub fn condition_stats(&self) -> Option<ConditionState> {
        match &*self.as_object()?.borrow() {
            Object::Condition(state) => Some(*state),
            _ => None,
        }
    }

    /// The class of a user-defined instance.
    pub fn class_id(&self) -> Option<ClassId> {
        match &*self.as_object()?.borrow() {
            Object::Instance(inst) => Some(inst.class),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}L", l),
            Value::Double(d) => write!(f, "{}", java_double(*d)),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Str(s) => write!(f, "{:?}", s),
            // Objects may be cyclic through outer links.
            Value::Ref(obj) => write!(f, "{}@{:x}", obj.borrow().kind(), Rc::as_ptr(obj) as *const () as usize),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.same(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

/// Java's rendering of a double: `1.0`, not `1`.
pub(crate) fn java_double(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e7 {
        format!("{:.1}", d)
    } else if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        d.to_string()
    }
}

/// The zero value of a declared type.
pub(crate) fn default_value(ty: &TypeRef) -> Value {
    if ty.dims > 0 {
        return Value::Null;
    }
    match ty.name.as_str() {
        "int" | "short" | "byte" => Value::Int(0),
        "long" => Value::Long(0),
        "double" | "float" => Value::Double(0.0),
        "char" => Value::Char('\0'),
        "boolean" => Value::Bool(false),
        _ => Value::Null,
    }
}

/// Hashable identity of a value as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    Double(u64),
    Char(char),
    Str(Rc<str>),
    Ref(usize),
}

impl Key {
    pub fn of(value: &Value) -> Key {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(i64::from(*i)),
            Value::Long(l) => Key::Int(*l),
            Value::Double(d) => Key::Double(d.to_bits()),
            Value::Char(c) => Key::Char(*c),
            Value::Str(s) => Key::Str(Rc::clone(s)),
            Value::Ref(obj) => Key::Ref(Rc::as_ptr(obj) as *const () as usize),
        }
    }
}

/// A user-defined class instance.
#[derive(Debug)]
pub struct Instance {
    pub class: ClassId,
    pub fields: FxHashMap<String, Value>,
    /// The enclosing instance of an inner, local or anonymous class.
    pub outer: Option<Value>,
    /// Locals captured by a local or anonymous class.
    pub captured: Rc<FxHashMap<String, Value>>,
    /// Name and ordinal of an enum constant.
    pub constant: Option<(Rc<str>, i32)>,
    /// State inherited from a built-in exception superclass.
    pub base: Option<Throwable>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    pub acquired: u32,
    pub released: u32,
}

impl LockState {
    pub fn held(&self) -> u32 {
        self.acquired.saturating_sub(self.released)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionState {
    pub awaits: u32,
    pub signals: u32,
}

#[derive(Debug, Clone)]
pub struct Throwable {
    /// Simple class name, e.g. `IllegalStateException`.
    pub class: String,
    pub message: Option<String>,
    pub cause: Value,
}

/// Heap objects, user-defined or built in.
#[derive(Debug)]
pub enum Object {
    Instance(Instance),
    Array(Vec<Value>),
    List(Vec<Value>),
    /// Insertion-ordered, like `LinkedHashMap`.
    Map(IndexMap<Key, (Value, Value)>),
    /// An iterator over a snapshot.
    Iter { items: Vec<Value>, pos: usize },
    Lock(LockState),
    ReadWriteLock { read: Value, write: Value },
    Condition(ConditionState),
    Throwable(Throwable),
    /// A stateless library object such as `System.out`.
    Plain(&'static str),
}

impl Object {
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Instance(_) => "object",
            Object::Array(_) => "array",
            Object::List(_) => "ArrayList",
            Object::Map(_) => "HashMap",
            Object::Iter { .. } => "Iterator",
            Object::Lock(_) => "ReentrantLock",
            Object::ReadWriteLock { .. } => "ReentrantReadWriteLock",
            Object::Condition(_) => "Condition",
            Object::Throwable(_) => "Throwable",
            Object::Plain(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_identity_crosses_widths() {
        assert!(Value::Int(3).same(&Value::Long(3)));
        assert!(Value::Int(3).same(&Value::Double(3.0)));
        assert!(!Value::Int(3).same(&Value::str("3")));
        assert!(Value::Null.same(&Value::Null));
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let a = Value::object(Object::List(Vec::new()));
        let b = Value::object(Object::List(Vec::new()));
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_ne!(Key::of(&a), Key::of(&b));
    }

    #[test]
    fn test_java_double_rendering() {
        assert_eq!(java_double(1.0), "1.0");
        assert_eq!(java_double(2.5), "2.5");
        assert_eq!(java_double(f64::NAN), "NaN");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&TypeRef::new("int")), Value::Int(0));
        assert_eq!(default_value(&TypeRef::new("boolean")), Value::Bool(false));
        assert!(default_value(&TypeRef::new("int").array_of()).is_null());
        assert!(default_value(&TypeRef::new("String")).is_null());
    }
}
