//! Naming helpers for synthesized Java members.
//!
//! All handlers derive member names (setters, builder steps, property
//! constants, lookup maps) through these functions so that the same field
//! always yields the same generated names.

use rustc_hash::FxHashSet;
use unicode_xid::UnicodeXID;

/// Java reserved words, including the literals that cannot be identifiers.
const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

/// Upper-case the first character: `name` -> `Name`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character: `Name` -> `name`.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join a prefix and a name in camel case: (`with`, `name`) -> `withName`.
/// An empty prefix returns the name unchanged.
pub fn camel_case(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}", prefix, capitalize(name))
    }
}

/// Strip exactly one trailing `s`: `items` -> `item`, `status` -> `statu`,
/// and a bare `s` becomes empty.
///
/// Purely lexical. Generated builder method names depend on this exact
/// behavior, so it must not grow smarter.
///
/// ```
/// use lpg_core::names::singular;
/// assert_eq!(singular("items"), "item");
/// assert_eq!(singular("data"), "data");
/// ```
pub fn singular(name: &str) -> String {
    name.strip_suffix('s').unwrap_or(name).to_string()
}

/// Convert a camel-case identifier to upper snake case: `firstName` -> `FIRST_NAME`.
pub fn constant_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.extend(ch.to_uppercase());
    }
    out
}

/// The bean property name of a field: boolean fields named `isX` map to `x`.
pub fn property_name(field: &str, is_boolean: bool) -> String {
    if is_boolean {
        if let Some(rest) = field.strip_prefix("is") {
            if rest.chars().next().is_some_and(char::is_uppercase) {
                return decapitalize(rest);
            }
        }
    }
    field.to_string()
}

pub fn setter_name(field: &str, is_boolean: bool) -> String {
    format!("set{}", capitalize(&property_name(field, is_boolean)))
}

pub fn getter_name(field: &str, is_boolean: bool) -> String {
    let prefix = if is_boolean { "is" } else { "get" };
    format!("{}{}", prefix, capitalize(&property_name(field, is_boolean)))
}

pub fn is_java_keyword(name: &str) -> bool {
    JAVA_KEYWORDS.contains(&name)
}

/// Whether `name` is a legal Java identifier (Unicode XID rules plus `$` and `_`).
pub fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '$' || first == '_' || first.is_xid_start()) {
        return false;
    }
    chars.all(|c| c == '$' || c.is_xid_continue()) && !is_java_keyword(name)
}

/// Allocates names that do not collide with a set of names already in use.
///
/// The first request for `base` returns `base` itself when it is free;
/// later requests return `base$1`, `base$2`, and so on.
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    taken: FxHashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taken<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reserve(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    pub fn fresh(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}${}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("name"), "Name");
        assert_eq!(capitalize(""), "");
        assert_eq!(decapitalize("Name"), "name");
    }

    #[test]
    fn test_singular_is_lexical() {
        assert_eq!(singular("items"), "item");
        assert_eq!(singular("address"), "addres");
        assert_eq!(singular("s"), "");
        assert_eq!(singular(""), "");
        assert_eq!(singular("children"), "children");
    }

    #[test]
    fn test_constant_case() {
        assert_eq!(constant_case("firstName"), "FIRST_NAME");
        assert_eq!(constant_case("name"), "NAME");
        assert_eq!(constant_case("url2Target"), "URL2_TARGET");
    }

    #[test]
    fn test_accessor_names() {
        assert_eq!(setter_name("isActive", true), "setActive");
        assert_eq!(setter_name("island", true), "setIsland");
        assert_eq!(getter_name("active", true), "isActive");
        assert_eq!(getter_name("code", false), "getCode");
        assert_eq!(camel_case("with", "name"), "withName");
        assert_eq!(camel_case("", "name"), "name");
    }

    #[test]
    fn test_java_identifier() {
        assert!(is_java_identifier("$lock"));
        assert!(is_java_identifier("_x1"));
        assert!(!is_java_identifier("1x"));
        assert!(!is_java_identifier("class"));
        assert!(!is_java_identifier(""));
        assert!(!is_java_identifier("a-b"));
    }

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::with_taken(["i"]);
        assert_eq!(names.fresh("i"), "i$1");
        assert_eq!(names.fresh("i"), "i$2");
        assert_eq!(names.fresh("j"), "j");
        assert!(names.is_taken("j"));
    }
}
