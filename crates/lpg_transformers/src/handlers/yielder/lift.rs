//! Locals of a generator body become fields of the yielder.
//!
//! Before lifting, every declaration in the body gets a name unique within
//! the method, so sibling scopes that reuse a name (two loops over `i`)
//! cannot collide once they share one class. References are rewritten with
//! Java's scoping rules; declarations inside nested classes shadow without
//! being renamed.

use indexmap::IndexMap;
use lpg_ast::factory::*;
use lpg_ast::visit_mut::{walk_class_mut, walk_expression_mut, walk_statement_mut, VisitMut};
use lpg_ast::*;
use lpg_core::names::UniqueNames;
use rustc_hash::FxHashMap;

struct Renamer<'n> {
    names: &'n mut UniqueNames,
    scopes: Vec<FxHashMap<String, String>>,
    nested: usize,
}

impl Renamer<'_> {
    fn declare(&mut self, declared: &mut String) {
        let renamed = if self.nested > 0 {
            declared.clone()
        } else {
            self.names.fresh(declared)
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(declared.clone(), renamed.clone());
        }
        *declared = renamed;
    }

    fn shadow<'s>(&mut self, names: impl IntoIterator<Item = &'s String>) {
        self.scopes
            .push(names.into_iter().map(|n| (n.clone(), n.clone())).collect());
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl VisitMut for Renamer<'_> {
    fn visit_class_mut(&mut self, class: &mut ClassDecl) {
        self.nested += 1;
        self.shadow(class.fields.iter().map(|f| &f.name));
        walk_class_mut(self, class);
        self.scopes.pop();
        self.nested -= 1;
    }

    fn visit_method_mut(&mut self, method: &mut MethodDecl) {
        self.shadow(method.args.iter().map(|a| &a.name));
        self.visit_statements_mut(&mut method.statements);
        self.scopes.pop();
    }

    fn visit_constructor_mut(&mut self, ctor: &mut ConstructorDecl) {
        self.shadow(ctor.args.iter().map(|a| &a.name));
        self.visit_statements_mut(&mut ctor.statements);
        self.scopes.pop();
    }

    fn visit_statements_mut(&mut self, stmts: &mut Vec<Statement>) {
        self.scopes.push(FxHashMap::default());
        for stmt in stmts.iter_mut() {
            self.visit_statement_mut(stmt);
        }
        self.scopes.pop();
    }

    fn visit_local_decl_mut(&mut self, local: &mut LocalDecl) {
        if let Some(init) = &mut local.init {
            self.visit_expression_mut(init);
        }
        self.declare(&mut local.name);
    }

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        match stmt {
            Statement::For(n) => {
                self.scopes.push(FxHashMap::default());
                for init in &mut n.init {
                    self.visit_statement_mut(init);
                }
                if let Some(cond) = &mut n.cond {
                    self.visit_expression_mut(cond);
                }
                for update in &mut n.update {
                    self.visit_expression_mut(update);
                }
                self.visit_statement_mut(&mut n.body);
                self.scopes.pop();
            }
            Statement::Foreach(n) => {
                self.visit_expression_mut(&mut n.iterable);
                self.scopes.push(FxHashMap::default());
                self.declare(&mut n.var.name);
                self.visit_statement_mut(&mut n.body);
                self.scopes.pop();
            }
            // One scope for the whole switch block.
            Statement::Switch(n) => {
                self.visit_expression_mut(&mut n.selector);
                self.scopes.push(FxHashMap::default());
                for case in &mut n.cases {
                    for stmt in &mut case.statements {
                        self.visit_statement_mut(stmt);
                    }
                }
                self.scopes.pop();
            }
            Statement::Try(n) => {
                self.visit_block_mut(&mut n.body);
                for catch in &mut n.catches {
                    self.scopes.push(FxHashMap::default());
                    self.declare(&mut catch.param.name);
                    self.visit_block_mut(&mut catch.body);
                    self.scopes.pop();
                }
                if let Some(finally) = &mut n.finally {
                    self.visit_block_mut(finally);
                }
            }
            _ => walk_statement_mut(self, stmt),
        }
    }

    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        if let Expression::Name(full) = expr {
            let (head, rest) = match full.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (full.as_str(), None),
            };
            if let Some(renamed) = self.lookup(head) {
                if renamed != head {
                    *full = match rest {
                        Some(rest) => format!("{}.{}", renamed, rest),
                        None => renamed.clone(),
                    };
                }
            }
            return;
        }
        walk_expression_mut(self, expr);
    }
}

/// Gives every local, loop variable and catch parameter of `statements`
/// a name not used by any other declaration, parameter or `reserved` name.
pub(super) fn disambiguate(statements: &mut Vec<Statement>, params: &[Argument], reserved: &[String]) {
    let mut names = UniqueNames::with_taken(params.iter().map(|a| a.name.clone()).chain(reserved.iter().cloned()));
    let mut renamer = Renamer {
        names: &mut names,
        scopes: Vec::new(),
        nested: 0,
    };
    renamer.visit_statements_mut(statements);
}

/// Yielder fields standing in for locals, in declaration order.
#[derive(Debug, Default)]
pub(super) struct Lifted {
    fields: IndexMap<String, TypeRef>,
}

impl Lifted {
    pub fn lift(&mut self, field: impl Into<String>, ty: TypeRef) {
        self.fields.entry(field.into()).or_insert(ty);
    }

    /// Lifts `local` and returns the assignment replacing its declaration.
    pub fn declare(&mut self, local: LocalDecl) -> Option<Statement> {
        let LocalDecl { ty, name: field, init, .. } = local;
        let value = init.map(|init| match init {
            Expression::ArrayInit(values) => {
                new_array_init(ty.element().unwrap_or_else(|| ty.clone()), values.elements)
            }
            other => other,
        });
        self.lift(field.clone(), ty);
        value.map(|value| Statement::from(assign(name(field), value)))
    }

    pub fn type_of(&self, field: &str) -> Option<&TypeRef> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_fields(self) -> Vec<FieldDecl> {
        self.fields
            .into_iter()
            .map(|(field, ty)| field_decl(ty, field).private())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(stmt: &Statement) -> &str {
        match stmt {
            Statement::LocalDecl(local) => &local.name,
            Statement::For(n) => declared(&n.init[0]),
            Statement::Foreach(n) => &n.var.name,
            _ => panic!("expected a declaration"),
        }
    }

    #[test]
    fn test_sibling_scopes_get_distinct_names() {
        let mut body = vec![
            Statement::from(
                for_(block().stmt(call("use").arg(name("i"))))
                    .init(local(ty("int"), "i").init(int(0)))
                    .cond(lt(name("i"), int(3))),
            ),
            Statement::from(foreach(local(ty("int"), "i"), name("xs"), call("use").arg(name("i")))),
        ];
        disambiguate(&mut body, &[], &[]);
        assert_eq!(declared(&body[0]), "i");
        assert_eq!(declared(&body[1]), "i$1");
        let Statement::Foreach(each) = &body[1] else {
            panic!("expected foreach");
        };
        assert_eq!(*each.body, Statement::from(call("use").arg(name("i$1"))));
    }

    #[test]
    fn test_locals_shadowing_fields_are_renamed() {
        let mut body = vec![
            Statement::from(local(ty("int"), "count").init(name("count"))),
            Statement::from(call("use").arg(name("count.value"))),
        ];
        disambiguate(&mut body, &[], &["count".to_string()]);
        assert_eq!(body[0], Statement::from(local(ty("int"), "count$1").init(name("count"))));
        assert_eq!(body[1], Statement::from(call("use").arg(name("count$1.value"))));
    }

    #[test]
    fn test_nested_class_declarations_shadow() {
        let inner = method(TypeRef::void(), "run")
            .with_arg(arg(ty("int"), "x"))
            .stmt(call("use").arg(name("x")))
            .stmt(call("use").arg(name("y")));
        let mut body = vec![
            Statement::from(local(ty("int"), "x").init(int(1))),
            Statement::from(local(ty("int"), "y").init(int(2))),
            Statement::from(new_(ty("Runnable")).body(class_decl("").with_method(inner))),
        ];
        disambiguate(&mut body, &[], &["x".to_string()]);
        assert_eq!(declared(&body[0]), "x$1");
        let Statement::Expression(Expression::New(new)) = &body[2] else {
            panic!("expected new");
        };
        let run = &new.body.as_ref().unwrap().methods[0];
        assert_eq!(run.statements[0], Statement::from(call("use").arg(name("x"))));
        assert_eq!(run.statements[1], Statement::from(call("use").arg(name("y"))));
    }

    #[test]
    fn test_array_initializer_becomes_array_creation() {
        let mut lifted = Lifted::default();
        let assignment = lifted.declare(local(ty("int").array_of(), "xs").init(array_init([int(1), int(2)])));
        assert_eq!(
            assignment,
            Some(Statement::from(assign(name("xs"), new_array_init(ty("int"), [int(1), int(2)]))))
        );
        assert_eq!(lifted.type_of("xs"), Some(&ty("int").array_of()));
        assert!(lifted.declare(local(ty("String"), "s")).is_none());
        assert_eq!(lifted.into_fields().len(), 2);
    }
}
