//! The class table: every type the interpreter can instantiate, with its
//! lexical nesting and resolved supertypes.

use crate::builtins;
use crate::value::Value;
use lpg_ast::{simple_name, ClassDecl, ClassKind, CompilationUnit, TypeRef};
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

#[cfg(test)]
impl ClassId {
    pub(crate) fn for_tests(index: usize) -> Self {
        ClassId(index)
    }
}

/// A resolved type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClassRef {
    User(ClassId),
    /// A library type by simple name.
    Builtin(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nesting {
    TopLevel,
    Member,
    Local,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitState {
    Pending,
    Running,
    Done,
}

pub(crate) struct ClassInfo {
    pub decl: Rc<ClassDecl>,
    pub qualified: String,
    pub nesting: Nesting,
    /// The lexically enclosing class.
    pub outer: Option<ClassId>,
    pub superclass: Option<ClassRef>,
    pub interfaces: Vec<String>,
    pub members: FxHashMap<String, ClassId>,
    pub statics: FxHashMap<String, Value>,
    /// Enum constants in declaration order.
    pub constants: Vec<Value>,
    pub init: InitState,
}

impl ClassInfo {
    pub fn name(&self) -> &str {
        if self.decl.name.is_empty() {
            &self.qualified
        } else {
            &self.decl.name
        }
    }

    /// Whether instances carry an enclosing instance.
    pub fn is_inner(&self) -> bool {
        match self.nesting {
            Nesting::TopLevel => false,
            Nesting::Member => self.decl.kind == ClassKind::Class && !self.decl.is_static(),
            Nesting::Local | Nesting::Anonymous => true,
        }
    }

    pub fn is_enum(&self) -> bool {
        self.decl.kind == ClassKind::Enum
    }
}

#[derive(Default)]
pub(crate) struct ClassTable {
    classes: Vec<ClassInfo>,
    by_name: FxHashMap<String, ClassId>,
    /// Local and anonymous declarations, keyed by address.
    nested: FxHashMap<usize, ClassId>,
}

impl ClassTable {
    pub fn load(units: &[CompilationUnit]) -> Self {
        let mut table = ClassTable::default();
        for unit in units {
            for decl in &unit.types {
                let qualified = match &unit.package {
                    Some(package) => format!("{}.{}", package, decl.name),
                    None => decl.name.clone(),
                };
                table.register(decl, qualified, Nesting::TopLevel, None);
            }
        }
        for index in 0..table.classes.len() {
            let id = ClassId(index);
            let info = table.get(id);
            let context = info.outer.or(Some(id));
            let superclass = info.decl.superclass.as_ref().map(|s| table.resolve_super(context, s));
            let interfaces = info.decl.interfaces.iter().map(|i| i.name.clone()).collect();
            let info = table.get_mut(id);
            info.superclass = superclass;
            info.interfaces = interfaces;
        }
        tracing::debug!(classes = table.classes.len(), "class table loaded");
        table
    }

    fn register(&mut self, decl: &ClassDecl, qualified: String, nesting: Nesting, outer: Option<ClassId>) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(ClassInfo {
            decl: Rc::new(decl.clone()),
            qualified: qualified.clone(),
            nesting,
            outer,
            superclass: None,
            interfaces: Vec::new(),
            members: FxHashMap::default(),
            statics: FxHashMap::default(),
            constants: Vec::new(),
            init: InitState::Pending,
        });
        if matches!(nesting, Nesting::TopLevel | Nesting::Member) {
            self.by_name.insert(qualified.clone(), id);
            if nesting == Nesting::TopLevel {
                self.by_name.insert(decl.name.clone(), id);
            }
        }
        for member in &decl.member_types {
            let member_id = self.register(member, format!("{}.{}", qualified, member.name), Nesting::Member, Some(id));
            self.get_mut(id).members.insert(member.name.clone(), member_id);
        }
        id
    }

    /// The class for a local or anonymous declaration, registered on first
    /// use. `base` is the supertype named by an anonymous `new`.
    pub fn nested(&mut self, decl: &ClassDecl, nesting: Nesting, outer: ClassId, base: Option<&TypeRef>) -> ClassId {
        let key = decl as *const ClassDecl as usize;
        if let Some(&id) = self.nested.get(&key) {
            return id;
        }
        let qualified = match nesting {
            Nesting::Anonymous => format!("{}${}", self.get(outer).qualified, self.nested.len() + 1),
            _ => format!("{}${}", self.get(outer).qualified, decl.name),
        };
        let id = self.register(decl, qualified, nesting, Some(outer));
        let mut superclass = decl.superclass.as_ref().map(|s| self.resolve_super(Some(outer), s));
        let mut interfaces: Vec<String> = decl.interfaces.iter().map(|i| i.name.clone()).collect();
        if let Some(base) = base {
            match self.resolve(Some(outer), &base.name) {
                Some(ClassRef::User(base_id)) if self.get(base_id).decl.kind == ClassKind::Interface => {
                    interfaces.push(base.name.clone());
                }
                Some(ClassRef::Builtin(name)) if !builtins::is_throwable(&name) && name != "Object" => {
                    interfaces.push(name);
                }
                None => interfaces.push(base.name.clone()),
                resolved => superclass = resolved,
            }
        }
        let info = self.get_mut(id);
        info.superclass = superclass;
        info.interfaces = interfaces;
        self.nested.insert(key, id);
        id
    }

    fn resolve_super(&self, context: Option<ClassId>, ty: &TypeRef) -> ClassRef {
        self.resolve(context, &ty.name)
            .unwrap_or_else(|| ClassRef::Builtin(simple_name(&ty.name).to_string()))
    }

    pub fn get(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Resolves `name` as seen from inside `context`: the class itself,
    /// member types along the lexical and superclass chains, then global
    /// names and library types.
    pub fn resolve(&self, context: Option<ClassId>, name: &str) -> Option<ClassRef> {
        let mut cursor = context;
        while let Some(id) = cursor {
            if let Some(found) = self.resolve_from(id, name) {
                return Some(ClassRef::User(found));
            }
            cursor = self.get(id).outer;
        }
        if let Some(id) = self.by_name(name) {
            return Some(ClassRef::User(id));
        }
        let simple = simple_name(name);
        builtins::is_builtin_type(simple).then(|| ClassRef::Builtin(simple.to_string()))
    }

    fn resolve_from(&self, id: ClassId, name: &str) -> Option<ClassId> {
        let mut segments = name.split('.');
        let first = segments.next()?;
        let mut current = if self.get(id).decl.name == first {
            id
        } else {
            self.member(id, first)?
        };
        for segment in segments {
            current = self.member(current, segment)?;
        }
        Some(current)
    }

    /// A member type of `id` or of one of its superclasses.
    pub fn member(&self, id: ClassId, name: &str) -> Option<ClassId> {
        self.chain(id)
            .into_iter()
            .find_map(|c| self.get(c).members.get(name).copied())
    }

    /// `id` followed by its user-defined superclasses.
    pub fn chain(&self, id: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if out.contains(&current) {
                break;
            }
            out.push(current);
            cursor = match &self.get(current).superclass {
                Some(ClassRef::User(sup)) => Some(*sup),
                _ => None,
            };
        }
        out
    }

    /// The library class at the top of the superclass chain, if any.
    pub fn builtin_base(&self, id: ClassId) -> Option<&str> {
        let last = *self.chain(id).last()?;
        match &self.get(last).superclass {
            Some(ClassRef::Builtin(name)) => Some(name),
            _ => None,
        }
    }

    pub fn is_subclass(&self, id: ClassId, ancestor: ClassId) -> bool {
        self.chain(id).contains(&ancestor)
    }

    /// Whether instances of `id` are instances of the type named `target`.
    pub fn is_a(&self, id: ClassId, target: &str) -> bool {
        let target = simple_name(target);
        if target == "Object" {
            return true;
        }
        for current in self.chain(id) {
            let info = self.get(current);
            if info.name() == target {
                return true;
            }
            for interface in &info.interfaces {
                if simple_name(interface) == target {
                    return true;
                }
                if let Some(ClassRef::User(i)) = self.resolve(Some(current), interface) {
                    if i != current && self.is_a(i, target) {
                        return true;
                    }
                }
            }
        }
        self.builtin_base(id)
            .is_some_and(|base| builtins::builtin_is_a(base, target))
    }

    /// The class declaring a method `name` with `arity` parameters, searching
    /// superclasses, and its index in that declaration.
    pub fn find_method(&self, id: ClassId, name: &str, arity: usize) -> Option<(ClassId, usize)> {
        self.chain(id).into_iter().find_map(|c| {
            self.get(c)
                .decl
                .methods
                .iter()
                .position(|m| m.name == name && m.args.len() == arity && !m.is_abstract())
                .map(|index| (c, index))
        })
    }

    /// Whether `id` or a superclass declares a static field `name`.
    pub fn static_owner(&self, id: ClassId, name: &str) -> Option<ClassId> {
        self.chain(id).into_iter().find(|&c| {
            let decl = &self.get(c).decl;
            decl.fields.iter().any(|f| (f.is_static() || decl.is_interface()) && f.name == name)
                || decl.enum_constants.iter().any(|e| e.name == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    fn table() -> ClassTable {
        let outer = class_decl("Outer")
            .with_member_type(class_decl("Inner").static_())
            .with_member_type(class_decl("Child").extends(ty("Base")));
        let base = class_decl("Base").implements(ty("java.lang.Runnable"));
        let unit = CompilationUnit::new("Outer.java").with_type(outer).with_type(base);
        ClassTable::load(&[unit])
    }

    #[test]
    fn test_member_types_resolve_lexically() {
        let table = table();
        let outer = table.by_name("Outer").unwrap();
        let Some(ClassRef::User(inner)) = table.resolve(Some(outer), "Inner") else {
            panic!("expected user class");
        };
        assert_eq!(table.get(inner).qualified, "Outer.Inner");
        assert_eq!(table.resolve(None, "Outer.Inner"), Some(ClassRef::User(inner)));
        assert_eq!(table.resolve(None, "Inner"), None);
    }

    #[test]
    fn test_library_types_resolve_by_simple_name() {
        let table = table();
        assert_eq!(
            table.resolve(None, "java.util.ArrayList"),
            Some(ClassRef::Builtin("ArrayList".to_string()))
        );
    }

    #[test]
    fn test_is_a_follows_superclasses_and_interfaces() {
        let table = table();
        let child = table.by_name("Outer.Child").unwrap();
        assert!(table.is_a(child, "Base"));
        assert!(table.is_a(child, "Runnable"));
        assert!(table.is_a(child, "java.lang.Object"));
        assert!(!table.is_a(child, "Exception"));
        assert_eq!(table.chain(child).len(), 2);
    }
}
