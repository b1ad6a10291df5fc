//! The slice of the Java class library generated code relies on:
//! collections, locks and conditions, exceptions and a few static helpers.

use crate::error::{mismatch, EvalError, Exec, Unwind};
use crate::value::{ConditionState, Key, LockState, Object, ObjRef, Throwable, Value};
use indexmap::IndexMap;

/// Exception classes and their superclass.
const THROWABLES: &[(&str, &str)] = &[
    ("Throwable", "Object"),
    ("Exception", "Throwable"),
    ("Error", "Throwable"),
    ("RuntimeException", "Exception"),
    ("IllegalArgumentException", "RuntimeException"),
    ("NumberFormatException", "IllegalArgumentException"),
    ("IllegalStateException", "RuntimeException"),
    ("IllegalMonitorStateException", "RuntimeException"),
    ("UnsupportedOperationException", "RuntimeException"),
    ("NoSuchElementException", "RuntimeException"),
    ("ConcurrentModificationException", "RuntimeException"),
    ("NullPointerException", "RuntimeException"),
    ("ArithmeticException", "RuntimeException"),
    ("ClassCastException", "RuntimeException"),
    ("IndexOutOfBoundsException", "RuntimeException"),
    ("ArrayIndexOutOfBoundsException", "IndexOutOfBoundsException"),
    ("NegativeArraySizeException", "RuntimeException"),
    ("MissingFormatArgumentException", "IllegalArgumentException"),
    ("IOException", "Exception"),
    ("FileNotFoundException", "IOException"),
    ("InterruptedException", "Exception"),
    ("SQLException", "Exception"),
    ("PrivilegedActionException", "Exception"),
    ("InvocationTargetException", "Exception"),
    ("PropertyVetoException", "Exception"),
    ("StackOverflowError", "Error"),
];

/// Library types other than exceptions, and what they implement.
const TYPES: &[(&str, &[&str])] = &[
    ("Object", &[]),
    ("Void", &[]),
    ("String", &["CharSequence", "Comparable"]),
    ("Integer", &["Number", "Comparable"]),
    ("Long", &["Number", "Comparable"]),
    ("Double", &["Number", "Comparable"]),
    ("Float", &["Number", "Comparable"]),
    ("Short", &["Number", "Comparable"]),
    ("Byte", &["Number", "Comparable"]),
    ("Character", &["Comparable"]),
    ("Boolean", &["Comparable"]),
    ("Number", &[]),
    ("CharSequence", &[]),
    ("Comparable", &[]),
    ("Math", &[]),
    ("System", &[]),
    ("Collections", &[]),
    ("Arrays", &[]),
    ("Objects", &[]),
    ("Thread", &["Runnable"]),
    ("EventQueue", &[]),
    ("AccessController", &[]),
    ("ArrayList", &["List", "Collection", "Iterable"]),
    ("LinkedList", &["List", "Collection", "Iterable"]),
    ("CopyOnWriteArrayList", &["List", "Collection", "Iterable"]),
    ("Vector", &["List", "Collection", "Iterable"]),
    ("List", &["Collection", "Iterable"]),
    ("Set", &["Collection", "Iterable"]),
    ("Collection", &["Iterable"]),
    ("Iterable", &[]),
    ("Iterator", &[]),
    ("HashMap", &["Map"]),
    ("LinkedHashMap", &["Map"]),
    ("TreeMap", &["Map"]),
    ("ConcurrentHashMap", &["Map"]),
    ("Map", &[]),
    ("ReentrantLock", &["Lock"]),
    ("ReentrantReadWriteLock", &["ReadWriteLock"]),
    ("Lock", &[]),
    ("ReadWriteLock", &[]),
    ("Condition", &[]),
    ("Runnable", &[]),
    ("PrivilegedAction", &[]),
    ("PrivilegedExceptionAction", &[]),
];

fn throwable_parent(class: &str) -> Option<&'static str> {
    if let Some((_, parent)) = THROWABLES.iter().find(|(name, _)| *name == class) {
        return Some(parent);
    }
    if class.ends_with("Exception") {
        Some("Exception")
    } else if class.ends_with("Error") {
        Some("Error")
    } else {
        None
    }
}

pub(crate) fn is_throwable(class: &str) -> bool {
    throwable_parent(class).is_some()
}

/// Checked exceptions: not a `RuntimeException` or `Error`.
pub(crate) fn is_checked(class: &str) -> bool {
    !builtin_is_a(class, "RuntimeException") && !builtin_is_a(class, "Error")
}

pub(crate) fn is_builtin_type(name: &str) -> bool {
    TYPES.iter().any(|(n, _)| *n == name) || is_throwable(name)
}

/// Whether library class `class` is a subtype of `target`.
pub(crate) fn builtin_is_a(class: &str, target: &str) -> bool {
    if class == target || target == "Object" {
        return true;
    }
    if let Some((_, supers)) = TYPES.iter().find(|(n, _)| *n == class) {
        return supers.contains(&target);
    }
    let mut current = class;
    while let Some(parent) = throwable_parent(current) {
        if parent == target {
            return true;
        }
        if parent == "Object" {
            break;
        }
        current = parent;
    }
    false
}

pub(crate) fn throwable(class: &str, message: Option<String>, cause: Value) -> Value {
    Value::object(Object::Throwable(Throwable {
        class: class.to_string(),
        message,
        cause,
    }))
}

/// Throws a new library exception.
pub(crate) fn exception(class: &str, message: impl Into<String>) -> Unwind {
    Unwind::Throw(throwable(class, Some(message.into()), Value::Null))
}

/// Throws a new library exception without a message.
pub(crate) fn bare(class: &str) -> Unwind {
    Unwind::Throw(throwable(class, None, Value::Null))
}

pub(crate) fn throwable_string(t: &Throwable) -> String {
    match &t.message {
        Some(message) => format!("{}: {}", t.class, message),
        None => t.class.clone(),
    }
}

/// `String.hashCode()`.
pub(crate) fn java_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// `String.format` for `%s`, `%d`, `%n` and `%%`, with arguments already
/// converted to strings.
pub(crate) fn format_java(template: &str, args: &[String]) -> Exec<String> {
    let mut out = String::with_capacity(template.len());
    let mut next = args.iter();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('n') => out.push('\n'),
            Some(spec @ ('s' | 'S' | 'd')) => {
                let Some(arg) = next.next() else {
                    return Err(exception("MissingFormatArgumentException", format!("Format specifier '%{}'", spec)));
                };
                if spec == 'S' {
                    out.push_str(&arg.to_uppercase());
                } else {
                    out.push_str(arg);
                }
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(out)
}

fn int_arg(args: &[Value], index: usize) -> Exec<i32> {
    match args.get(index) {
        Some(arg) => arg.as_int().ok_or_else(|| mismatch("int", arg)),
        None => Err(mismatch("int", &Value::Null)),
    }
}

fn str_arg(args: &[Value], index: usize) -> Exec<&str> {
    match args.get(index) {
        Some(arg) => arg.as_str().ok_or_else(|| mismatch("String", arg)),
        None => Err(mismatch("String", &Value::Null)),
    }
}

fn unknown(owner: &str, name: &str, arity: usize) -> Unwind {
    Unwind::Error(EvalError::UnknownMethod {
        owner: owner.to_string(),
        name: name.to_string(),
        arity,
    })
}

fn index_in(index: i32, len: usize) -> Exec<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| exception("IndexOutOfBoundsException", format!("Index {} out of bounds for length {}", index, len)))
}

/// A new library object, or `None` when `class` is not a constructible
/// library class. Exceptions are built by the interpreter.
pub(crate) fn construct(class: &str, args: &[Value]) -> Option<Value> {
    let object = match class {
        "ArrayList" | "LinkedList" | "CopyOnWriteArrayList" | "Vector" => {
            Object::List(args.first().and_then(Value::items).unwrap_or_default())
        }
        "HashMap" | "LinkedHashMap" | "TreeMap" | "ConcurrentHashMap" => Object::Map(IndexMap::new()),
        "ReentrantLock" => Object::Lock(LockState::default()),
        "ReentrantReadWriteLock" => Object::ReadWriteLock {
            read: Value::object(Object::Lock(LockState::default())),
            write: Value::object(Object::Lock(LockState::default())),
        },
        "Object" => Object::Plain("Object"),
        "Thread" => Object::Plain("Thread"),
        _ => return None,
    };
    Some(Value::object(object))
}

pub(crate) fn static_field(class: &str, field: &str) -> Option<Value> {
    let value = match (class, field) {
        ("System", "out" | "err") => Value::object(Object::Plain("PrintStream")),
        ("Boolean", "TRUE") => Value::Bool(true),
        ("Boolean", "FALSE") => Value::Bool(false),
        ("Integer", "MAX_VALUE") => Value::Int(i32::MAX),
        ("Integer", "MIN_VALUE") => Value::Int(i32::MIN),
        ("Long", "MAX_VALUE") => Value::Long(i64::MAX),
        ("Long", "MIN_VALUE") => Value::Long(i64::MIN),
        _ => return None,
    };
    Some(value)
}

/// Static library methods that need no callbacks into the program.
pub(crate) fn static_call(class: &str, name: &str, args: &[Value]) -> Option<Exec<Value>> {
    let result = match (class, name, args) {
        ("Math", "max", [a, b]) => Ok(numeric_pick(a, b, true)),
        ("Math", "min", [a, b]) => Ok(numeric_pick(a, b, false)),
        ("Math", "abs", [Value::Int(i)]) => Ok(Value::Int(i.wrapping_abs())),
        ("Math", "abs", [Value::Long(l)]) => Ok(Value::Long(l.wrapping_abs())),
        ("Math", "abs", [Value::Double(d)]) => Ok(Value::Double(d.abs())),
        ("Integer", "valueOf" | "parseInt", [Value::Str(s)]) => s
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| exception("NumberFormatException", format!("For input string: \"{}\"", s))),
        ("Integer" | "Long" | "Double" | "Boolean" | "Character", "valueOf", [value]) => Ok(value.clone()),
        ("Collections", "unmodifiableList" | "unmodifiableCollection" | "unmodifiableSet" | "unmodifiableMap", [value]) => {
            Ok(value.clone())
        }
        ("Collections", "emptyList", []) => Ok(Value::object(Object::List(Vec::new()))),
        ("Collections", "singletonList", [value]) => Ok(Value::object(Object::List(vec![value.clone()]))),
        ("Arrays", "asList", [single]) if single.as_object().is_some_and(|o| matches!(&*o.borrow(), Object::Array(_))) => {
            Ok(Value::object(Object::List(single.items().unwrap_or_default())))
        }
        ("Arrays", "asList", values) => Ok(Value::object(Object::List(values.to_vec()))),
        ("Objects", "equals", [a, b]) => Ok(Value::Bool(Key::of(a) == Key::of(b))),
        ("Objects", "isNull", [a]) => Ok(Value::Bool(a.is_null())),
        ("Objects", "nonNull", [a]) => Ok(Value::Bool(!a.is_null())),
        ("Thread", "currentThread", []) => Ok(Value::object(Object::Plain("Thread"))),
        ("Thread", "sleep", [_]) => Ok(Value::Null),
        ("EventQueue", "isDispatchThread", []) => Ok(Value::Bool(true)),
        _ => return None,
    };
    Some(result)
}

fn numeric_pick(a: &Value, b: &Value, max: bool) -> Value {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(if max { *x.max(y) } else { *x.min(y) }),
        (Value::Double(_), _) | (_, Value::Double(_)) => {
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            Value::Double(if max { x.max(y) } else { x.min(y) })
        }
        _ => {
            let (x, y) = (a.as_long().unwrap_or(0), b.as_long().unwrap_or(0));
            Value::Long(if max { x.max(y) } else { x.min(y) })
        }
    }
}

/// Methods of `java.lang.String`.
pub(crate) fn string_method(text: &str, name: &str, args: &[Value]) -> Exec<Value> {
    let value = match (name, args.len()) {
        ("length", 0) => Value::Int(text.encode_utf16().count() as i32),
        ("isEmpty", 0) => Value::Bool(text.is_empty()),
        ("toString" | "intern", 0) => Value::str(text),
        ("trim", 0) => Value::str(text.trim()),
        ("hashCode", 0) => Value::Int(java_hash(text)),
        ("equals", 1) => Value::Bool(args[0].as_str() == Some(text)),
        ("equalsIgnoreCase", 1) => Value::Bool(args[0].as_str().is_some_and(|o| o.to_lowercase() == text.to_lowercase())),
        ("contains", 1) => Value::Bool(text.contains(str_arg(args, 0)?)),
        ("startsWith", 1) => Value::Bool(text.starts_with(str_arg(args, 0)?)),
        ("endsWith", 1) => Value::Bool(text.ends_with(str_arg(args, 0)?)),
        ("indexOf", 1) => Value::Int(text.find(str_arg(args, 0)?).map_or(-1, |i| text[..i].chars().count() as i32)),
        ("concat", 1) => Value::str(format!("{}{}", text, str_arg(args, 0)?)),
        ("toUpperCase", 0) => Value::str(text.to_uppercase()),
        ("toLowerCase", 0) => Value::str(text.to_lowercase()),
        ("compareTo", 1) => Value::Int(match text.cmp(str_arg(args, 0)?) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        }),
        ("charAt", 1) => {
            let chars: Vec<char> = text.chars().collect();
            let index = index_in(int_arg(args, 0)?, chars.len())?;
            Value::Char(chars[index])
        }
        ("substring", 1 | 2) => {
            let chars: Vec<char> = text.chars().collect();
            let start = int_arg(args, 0)?;
            let end = if args.len() == 2 { int_arg(args, 1)? } else { chars.len() as i32 };
            if start < 0 || end < start || end as usize > chars.len() {
                return Err(exception("IndexOutOfBoundsException", format!("begin {}, end {}", start, end)));
            }
            Value::str(chars[start as usize..end as usize].iter().collect::<String>())
        }
        _ => return Err(unknown("String", name, args.len())),
    };
    Ok(value)
}

/// Methods of boxed primitives.
pub(crate) fn boxed_method(value: &Value, name: &str, args: &[Value]) -> Exec<Value> {
    let result = match (name, args) {
        ("intValue", []) => Value::Int(value.as_long().map_or(0, |l| l as i32)),
        ("longValue", []) => Value::Long(value.as_long().unwrap_or(0)),
        ("doubleValue", []) => Value::Double(value.as_f64().unwrap_or(0.0)),
        ("booleanValue", []) => Value::Bool(value.as_bool().unwrap_or(false)),
        ("equals", [other]) => Value::Bool(value.kind() == other.kind() && value.same(other)),
        ("hashCode", []) => Value::Int(match value {
            Value::Bool(b) => {
                if *b {
                    1231
                } else {
                    1237
                }
            }
            Value::Long(l) => (*l ^ (*l >> 32)) as i32,
            Value::Double(d) => {
                let bits = d.to_bits();
                (bits ^ (bits >> 32)) as i32
            }
            other => other.as_int().unwrap_or(0),
        }),
        ("compareTo", [other]) => {
            let (a, b) = (value.as_f64().unwrap_or(0.0), other.as_f64().unwrap_or(0.0));
            Value::Int(if a < b {
                -1
            } else if a > b {
                1
            } else {
                0
            })
        }
        _ => return Err(unknown(value.kind(), name, args.len())),
    };
    Ok(result)
}

/// Methods of library objects other than exceptions.
pub(crate) fn object_method(obj: &ObjRef, name: &str, args: &[Value]) -> Exec<Value> {
    // Read arguments that may alias the receiver before borrowing it.
    let incoming_items = match name {
        "addAll" => args.first().and_then(Value::items),
        _ => None,
    };
    let incoming_entries = match (name, args.first().and_then(Value::as_object)) {
        ("putAll", Some(other)) if !std::rc::Rc::ptr_eq(other, obj) => match &*other.borrow() {
            Object::Map(entries) => Some(entries.clone()),
            _ => None,
        },
        _ => None,
    };

    let mut object = obj.borrow_mut();
    let kind = object.kind();
    let value = match (&mut *object, name, args) {
        (Object::List(items), "add", [item]) => {
            items.push(item.clone());
            Value::Bool(true)
        }
        (Object::List(items), "add", [index, item]) => {
            let at = index.as_int().ok_or_else(|| mismatch("int", index))?;
            let at = usize::try_from(at)
                .ok()
                .filter(|&i| i <= items.len())
                .ok_or_else(|| exception("IndexOutOfBoundsException", format!("Index: {}", at)))?;
            items.insert(at, item.clone());
            Value::Null
        }
        (Object::List(items), "addAll", [_]) => {
            let incoming = incoming_items.ok_or_else(|| mismatch("Collection", &args[0]))?;
            let changed = !incoming.is_empty();
            items.extend(incoming);
            Value::Bool(changed)
        }
        (Object::List(items), "get", [_]) => {
            let index = index_in(int_arg(args, 0)?, items.len())?;
            items[index].clone()
        }
        (Object::List(items), "set", [_, item]) => {
            let index = index_in(int_arg(args, 0)?, items.len())?;
            std::mem::replace(&mut items[index], item.clone())
        }
        (Object::List(items), "remove", [Value::Int(i)]) => {
            let index = index_in(*i, items.len())?;
            items.remove(index)
        }
        (Object::List(items), "remove", [item]) => {
            let key = Key::of(item);
            match items.iter().position(|v| Key::of(v) == key) {
                Some(index) => {
                    items.remove(index);
                    Value::Bool(true)
                }
                None => Value::Bool(false),
            }
        }
        (Object::List(items), "size", []) => Value::Int(items.len() as i32),
        (Object::List(items), "isEmpty", []) => Value::Bool(items.is_empty()),
        (Object::List(items), "clear", []) => {
            items.clear();
            Value::Null
        }
        (Object::List(items), "contains", [item]) => {
            let key = Key::of(item);
            Value::Bool(items.iter().any(|v| Key::of(v) == key))
        }
        (Object::List(items), "indexOf", [item]) => {
            let key = Key::of(item);
            Value::Int(items.iter().position(|v| Key::of(v) == key).map_or(-1, |i| i as i32))
        }
        (Object::List(items), "iterator", []) => Value::object(Object::Iter {
            items: items.clone(),
            pos: 0,
        }),
        (Object::List(items), "toArray", _) => Value::object(Object::Array(items.clone())),
        (Object::Array(items), "clone", []) => Value::object(Object::Array(items.clone())),

        (Object::Map(entries), "put", [key, value]) => entries
            .insert(Key::of(key), (key.clone(), value.clone()))
            .map_or(Value::Null, |(_, old)| old),
        (Object::Map(entries), "get", [key]) => entries.get(&Key::of(key)).map_or(Value::Null, |(_, v)| v.clone()),
        (Object::Map(entries), "containsKey", [key]) => Value::Bool(entries.contains_key(&Key::of(key))),
        (Object::Map(entries), "containsValue", [value]) => {
            let key = Key::of(value);
            Value::Bool(entries.values().any(|(_, v)| Key::of(v) == key))
        }
        (Object::Map(entries), "remove", [key]) => entries
            .shift_remove(&Key::of(key))
            .map_or(Value::Null, |(_, old)| old),
        (Object::Map(entries), "putAll", [_]) => {
            if let Some(incoming) = incoming_entries {
                entries.extend(incoming);
            }
            Value::Null
        }
        (Object::Map(entries), "size", []) => Value::Int(entries.len() as i32),
        (Object::Map(entries), "isEmpty", []) => Value::Bool(entries.is_empty()),
        (Object::Map(entries), "clear", []) => {
            entries.clear();
            Value::Null
        }
        (Object::Map(entries), "values", []) => {
            Value::object(Object::List(entries.values().map(|(_, v)| v.clone()).collect()))
        }
        (Object::Map(entries), "keySet", []) => {
            Value::object(Object::List(entries.values().map(|(k, _)| k.clone()).collect()))
        }

        (Object::Iter { items, pos }, "hasNext", []) => Value::Bool(*pos < items.len()),
        (Object::Iter { items, pos }, "next", []) => {
            let Some(item) = items.get(*pos).cloned() else {
                return Err(bare("NoSuchElementException"));
            };
            *pos += 1;
            item
        }
        (Object::Iter { .. }, "remove", []) => return Err(exception("UnsupportedOperationException", "remove")),

        (Object::Lock(state), "lock" | "lockInterruptibly", []) => {
            state.acquired += 1;
            Value::Null
        }
        (Object::Lock(state), "tryLock", _) => {
            state.acquired += 1;
            Value::Bool(true)
        }
        (Object::Lock(state), "unlock", []) => {
            if state.held() == 0 {
                return Err(bare("IllegalMonitorStateException"));
            }
            state.released += 1;
            Value::Null
        }
        (Object::Lock(state), "isHeldByCurrentThread" | "isLocked", []) => Value::Bool(state.held() > 0),
        (Object::Lock(_), "newCondition", []) => Value::object(Object::Condition(ConditionState::default())),
        (Object::ReadWriteLock { read, .. }, "readLock", []) => read.clone(),
        (Object::ReadWriteLock { write, .. }, "writeLock", []) => write.clone(),

        (Object::Condition(state), "await", _) => {
            state.awaits += 1;
            return Err(Unwind::Error(EvalError::WouldBlock));
        }
        (Object::Condition(state), "signal" | "signalAll", []) => {
            state.signals += 1;
            Value::Null
        }

        (Object::Throwable(t), "getMessage" | "getLocalizedMessage", []) => {
            t.message.clone().map_or(Value::Null, Value::from)
        }
        (Object::Throwable(t), "getCause" | "getException" | "getTargetException", []) => t.cause.clone(),

        (Object::Plain("Thread"), "interrupt", []) => Value::Null,
        (Object::Plain("Thread"), "isInterrupted", []) => Value::Bool(false),
        _ => return Err(unknown(kind, name, args.len())),
    };
    Ok(value)
}
