//! Type resolution for handlers that need semantic information.
//!
//! Handlers ask a [`TypeResolver`] whether a field type is a collection or a
//! map, and which methods a listener interface declares. Resolution is by
//! simple or fully qualified name; type arguments are positional.

use lpg_ast::{ClassDecl, ClassKind, CompilationUnit, TypeRef};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind {
    Class,
    Interface,
    Enum,
}

/// A method as seen from outside its declaring type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: TypeRef,
    pub params: Vec<TypeRef>,
    pub thrown: Vec<TypeRef>,
}

impl MethodSignature {
    pub fn new(name: &str, return_type: TypeRef, params: Vec<TypeRef>) -> Self {
        Self {
            name: name.to_string(),
            return_type,
            params,
            thrown: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedType {
    pub qualified_name: String,
    pub kind: ResolvedKind,
    pub type_params: Vec<String>,
    /// Direct supertypes, fully qualified where known.
    pub supertypes: Vec<String>,
    pub methods: Vec<MethodSignature>,
}

impl ResolvedType {
    pub fn is_interface(&self) -> bool {
        self.kind == ResolvedKind::Interface
    }

    pub fn simple_name(&self) -> &str {
        lpg_ast::simple_name(&self.qualified_name)
    }
}

pub trait TypeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<ResolvedType>;

    /// Whether `name` is `ancestor` or transitively extends/implements it.
    fn is_subtype(&self, name: &str, ancestor: &str) -> bool {
        let mut pending = vec![name.to_string()];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            let Some(resolved) = self.resolve(&current) else {
                if lpg_ast::names_match(&current, ancestor) || lpg_ast::names_match(ancestor, &current) {
                    return true;
                }
                continue;
            };
            if resolved.qualified_name == ancestor || lpg_ast::names_match(&resolved.qualified_name, ancestor) {
                return true;
            }
            if seen.contains(&resolved.qualified_name) {
                continue;
            }
            pending.extend(resolved.supertypes.iter().cloned());
            seen.push(resolved.qualified_name);
        }
        false
    }

    fn is_collection(&self, ty: &TypeRef) -> bool {
        ty.dims == 0 && self.is_subtype(&ty.name, "java.util.Collection")
    }

    fn is_map(&self, ty: &TypeRef) -> bool {
        ty.dims == 0 && self.is_subtype(&ty.name, "java.util.Map")
    }
}

// ============================================================================
// Builtin library types
// ============================================================================

/// The slice of the Java library handlers reason about.
#[derive(Debug, Clone)]
pub struct BuiltinResolver {
    types: FxHashMap<String, ResolvedType>,
}

impl Default for BuiltinResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn t(name: &str) -> TypeRef {
    TypeRef::new(name)
}

impl BuiltinResolver {
    pub fn new() -> Self {
        let mut resolver = Self {
            types: FxHashMap::default(),
        };
        let collection_methods = || {
            vec![
                MethodSignature::new("add", t("boolean"), vec![t("E")]),
                MethodSignature::new("addAll", t("boolean"), vec![t("java.util.Collection").arg(t("E"))]),
                MethodSignature::new("size", t("int"), vec![]),
                MethodSignature::new("isEmpty", t("boolean"), vec![]),
                MethodSignature::new("iterator", t("java.util.Iterator").arg(t("E")), vec![]),
                MethodSignature::new("clear", t("void"), vec![]),
            ]
        };
        let map_methods = || {
            vec![
                MethodSignature::new("put", t("V"), vec![t("K"), t("V")]),
                MethodSignature::new("putAll", t("void"), vec![t("java.util.Map").arg(t("K")).arg(t("V"))]),
                MethodSignature::new("get", t("V"), vec![t("Object")]),
                MethodSignature::new("size", t("int"), vec![]),
                MethodSignature::new("clear", t("void"), vec![]),
            ]
        };
        let e = &["E"][..];
        let kv = &["K", "V"][..];
        resolver.add(ResolvedKind::Interface, "java.lang.Iterable", e, &[], vec![MethodSignature::new(
            "iterator",
            t("java.util.Iterator").arg(t("E")),
            vec![],
        )]);
        resolver.add(ResolvedKind::Interface, "java.util.Iterator", e, &[], vec![
            MethodSignature::new("hasNext", t("boolean"), vec![]),
            MethodSignature::new("next", t("E"), vec![]),
            MethodSignature::new("remove", t("void"), vec![]),
        ]);
        resolver.add(ResolvedKind::Interface, "java.util.Collection", e, &["java.lang.Iterable"], collection_methods());
        for (name, sup) in [
            ("java.util.List", "java.util.Collection"),
            ("java.util.Set", "java.util.Collection"),
            ("java.util.Queue", "java.util.Collection"),
            ("java.util.SortedSet", "java.util.Set"),
            ("java.util.Deque", "java.util.Queue"),
        ] {
            resolver.add(ResolvedKind::Interface, name, e, &[sup], collection_methods());
        }
        for (name, sup) in [
            ("java.util.ArrayList", "java.util.List"),
            ("java.util.LinkedList", "java.util.List"),
            ("java.util.concurrent.CopyOnWriteArrayList", "java.util.List"),
            ("java.util.HashSet", "java.util.Set"),
            ("java.util.LinkedHashSet", "java.util.Set"),
            ("java.util.TreeSet", "java.util.SortedSet"),
            ("java.util.ArrayDeque", "java.util.Deque"),
        ] {
            resolver.add(ResolvedKind::Class, name, e, &[sup], collection_methods());
        }
        resolver.add(ResolvedKind::Interface, "java.util.Map", kv, &[], map_methods());
        resolver.add(ResolvedKind::Interface, "java.util.SortedMap", kv, &["java.util.Map"], map_methods());
        for (name, sup) in [
            ("java.util.HashMap", "java.util.Map"),
            ("java.util.LinkedHashMap", "java.util.HashMap"),
            ("java.util.TreeMap", "java.util.SortedMap"),
            ("java.util.concurrent.ConcurrentHashMap", "java.util.Map"),
        ] {
            resolver.add(ResolvedKind::Class, name, kv, &[sup], map_methods());
        }
        resolver.add(ResolvedKind::Interface, "java.util.EventListener", &[], &[], vec![]);
        resolver.add(ResolvedKind::Interface, "java.beans.PropertyChangeListener", &[], &["java.util.EventListener"], vec![
            MethodSignature::new("propertyChange", t("void"), vec![t("java.beans.PropertyChangeEvent")]),
        ]);
        resolver.add(ResolvedKind::Interface, "java.lang.Runnable", &[], &[], vec![MethodSignature::new(
            "run",
            t("void"),
            vec![],
        )]);
        for (name, sup) in [
            ("java.lang.Throwable", "java.lang.Object"),
            ("java.lang.Exception", "java.lang.Throwable"),
            ("java.lang.Error", "java.lang.Throwable"),
            ("java.lang.RuntimeException", "java.lang.Exception"),
            ("java.lang.InterruptedException", "java.lang.Exception"),
            ("java.io.IOException", "java.lang.Exception"),
            ("java.lang.IllegalArgumentException", "java.lang.RuntimeException"),
            ("java.lang.IllegalStateException", "java.lang.RuntimeException"),
            ("java.lang.UnsupportedOperationException", "java.lang.RuntimeException"),
            ("java.util.NoSuchElementException", "java.lang.RuntimeException"),
            ("java.util.ConcurrentModificationException", "java.lang.RuntimeException"),
        ] {
            resolver.add(ResolvedKind::Class, name, &[], &[sup], vec![]);
        }
        resolver
    }

    fn add(
        &mut self,
        kind: ResolvedKind,
        qualified_name: &str,
        type_params: &[&str],
        supertypes: &[&str],
        methods: Vec<MethodSignature>,
    ) {
        let resolved = ResolvedType {
            qualified_name: qualified_name.to_string(),
            kind,
            type_params: type_params.iter().map(|s| s.to_string()).collect(),
            supertypes: supertypes.iter().map(|s| s.to_string()).collect(),
            methods,
        };
        self.types
            .insert(lpg_ast::simple_name(qualified_name).to_string(), resolved.clone());
        self.types.insert(qualified_name.to_string(), resolved);
    }
}

impl TypeResolver for BuiltinResolver {
    fn resolve(&self, name: &str) -> Option<ResolvedType> {
        self.types.get(name).cloned()
    }
}

// ============================================================================
// Source types
// ============================================================================

/// Resolves the types declared in a set of compilation units, plus stub
/// declarations for external types, on top of [`BuiltinResolver`].
#[derive(Debug, Clone, Default)]
pub struct UnitResolver {
    types: FxHashMap<String, ResolvedType>,
    builtins: BuiltinResolver,
}

impl UnitResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units<'u>(units: impl IntoIterator<Item = &'u CompilationUnit>) -> Self {
        let mut resolver = Self::new();
        for unit in units {
            resolver.add_unit(unit);
        }
        resolver
    }

    pub fn add_unit(&mut self, unit: &CompilationUnit) {
        for ty in &unit.types {
            let prefix = unit.package.clone().unwrap_or_default();
            self.add_class(&prefix, ty);
        }
    }

    /// Register a declaration-only type, such as an external listener interface.
    pub fn add_stub(&mut self, package: &str, class: &ClassDecl) {
        self.add_class(package, class);
    }

    fn add_class(&mut self, prefix: &str, class: &ClassDecl) {
        let qualified = if prefix.is_empty() {
            class.name.clone()
        } else {
            format!("{}.{}", prefix, class.name)
        };
        let kind = match class.kind {
            ClassKind::Class => ResolvedKind::Class,
            ClassKind::Interface => ResolvedKind::Interface,
            ClassKind::Enum => ResolvedKind::Enum,
        };
        let resolved = ResolvedType {
            qualified_name: qualified.clone(),
            kind,
            type_params: class.type_params.iter().map(|tp| tp.name.clone()).collect(),
            supertypes: class
                .superclass
                .iter()
                .chain(class.interfaces.iter())
                .map(|ty| ty.name.clone())
                .collect(),
            methods: class
                .methods
                .iter()
                .map(|m| MethodSignature {
                    name: m.name.clone(),
                    return_type: m.return_type.clone(),
                    params: m.args.iter().map(|a| a.ty.clone()).collect(),
                    thrown: m.thrown.clone(),
                })
                .collect(),
        };
        self.types.entry(class.name.clone()).or_insert_with(|| resolved.clone());
        for member in &class.member_types {
            self.add_class(&qualified, member);
        }
        self.types.insert(qualified, resolved);
    }
}

impl TypeResolver for UnitResolver {
    fn resolve(&self, name: &str) -> Option<ResolvedType> {
        self.types.get(name).cloned().or_else(|| self.builtins.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    #[test]
    fn test_builtin_collections() {
        let r = BuiltinResolver::new();
        assert!(r.is_collection(&ty("java.util.List").arg(ty("String"))));
        assert!(r.is_collection(&ty("ArrayList")));
        assert!(r.is_map(&ty("LinkedHashMap")));
        assert!(!r.is_map(&ty("java.util.List")));
        assert!(!r.is_collection(&ty("String")));
        assert!(!r.is_collection(&ty("java.util.List").dims(1)));
    }

    #[test]
    fn test_exception_hierarchy() {
        let r = BuiltinResolver::new();
        assert!(r.is_subtype("IOException", "java.lang.Exception"));
        assert!(r.is_subtype("java.util.NoSuchElementException", "java.lang.RuntimeException"));
        assert!(!r.is_subtype("java.lang.Error", "java.lang.Exception"));
    }

    #[test]
    fn test_unit_types_and_stubs() {
        let unit = lpg_ast::CompilationUnit {
            package: Some("app".to_string()),
            ..lpg_ast::CompilationUnit::new("A.java")
        }
        .with_type(class_decl("Bag").implements(ty("java.util.Collection").arg(ty("T"))));
        let mut r = UnitResolver::from_units([&unit]);
        r.add_stub(
            "events",
            &interface("ClickListener").with_method(method(TypeRef::void(), "clicked").with_arg(arg(ty("int"), "x"))),
        );
        assert!(r.is_collection(&ty("app.Bag")));
        assert!(r.is_collection(&ty("Bag")));
        let listener = r.resolve("events.ClickListener").unwrap();
        assert!(listener.is_interface());
        assert_eq!(listener.methods[0].params, vec![ty("int")]);
    }
}
