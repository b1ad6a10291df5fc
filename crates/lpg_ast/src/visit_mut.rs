//! Mutable visitor for in-place AST rewriting.
//!
//! Same shape as [`crate::visitor::AstVisitor`], over `&mut` nodes. An
//! override may replace the node it is handed wholesale (`*expr = ...`) and
//! decide whether to keep descending with the matching `walk_*_mut`.

use crate::node::*;

pub trait VisitMut {
    fn visit_class_mut(&mut self, class: &mut ClassDecl) {
        walk_class_mut(self, class);
    }

    fn visit_field_mut(&mut self, field: &mut FieldDecl) {
        if let Some(init) = &mut field.init {
            self.visit_expression_mut(init);
        }
    }

    fn visit_method_mut(&mut self, method: &mut MethodDecl) {
        self.visit_statements_mut(&mut method.statements);
    }

    fn visit_constructor_mut(&mut self, ctor: &mut ConstructorDecl) {
        self.visit_statements_mut(&mut ctor.statements);
    }

    fn visit_initializer_mut(&mut self, init: &mut Initializer) {
        self.visit_statements_mut(&mut init.statements);
    }

    /// A statement list; the hook for rewrites that change list length.
    fn visit_statements_mut(&mut self, stmts: &mut Vec<Statement>) {
        for stmt in stmts.iter_mut() {
            self.visit_statement_mut(stmt);
        }
    }

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        walk_statement_mut(self, stmt);
    }

    fn visit_block_mut(&mut self, block: &mut Block) {
        self.visit_statements_mut(&mut block.statements);
    }

    fn visit_local_decl_mut(&mut self, local: &mut LocalDecl) {
        if let Some(init) = &mut local.init {
            self.visit_expression_mut(init);
        }
    }

    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        walk_expression_mut(self, expr);
    }
}

pub fn walk_class_mut<V: VisitMut + ?Sized>(v: &mut V, class: &mut ClassDecl) {
    for constant in &mut class.enum_constants {
        for arg in &mut constant.args {
            v.visit_expression_mut(arg);
        }
    }
    for field in &mut class.fields {
        v.visit_field_mut(field);
    }
    for init in &mut class.initializers {
        v.visit_initializer_mut(init);
    }
    for ctor in &mut class.constructors {
        v.visit_constructor_mut(ctor);
    }
    for method in &mut class.methods {
        v.visit_method_mut(method);
    }
    for member in &mut class.member_types {
        v.visit_class_mut(member);
    }
}

pub fn walk_statement_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Statement) {
    match stmt {
        Statement::Block(n) => v.visit_block_mut(n),
        Statement::Expression(e) => v.visit_expression_mut(e),
        Statement::LocalDecl(n) => v.visit_local_decl_mut(n),
        Statement::If(n) => {
            v.visit_expression_mut(&mut n.cond);
            v.visit_statement_mut(&mut n.then);
            if let Some(otherwise) = &mut n.otherwise {
                v.visit_statement_mut(otherwise);
            }
        }
        Statement::While(n) => {
            v.visit_expression_mut(&mut n.cond);
            v.visit_statement_mut(&mut n.body);
        }
        Statement::DoWhile(n) => {
            v.visit_statement_mut(&mut n.body);
            v.visit_expression_mut(&mut n.cond);
        }
        Statement::For(n) => {
            v.visit_statements_mut(&mut n.init);
            if let Some(cond) = &mut n.cond {
                v.visit_expression_mut(cond);
            }
            for update in &mut n.update {
                v.visit_expression_mut(update);
            }
            v.visit_statement_mut(&mut n.body);
        }
        Statement::Foreach(n) => {
            v.visit_local_decl_mut(&mut n.var);
            v.visit_expression_mut(&mut n.iterable);
            v.visit_statement_mut(&mut n.body);
        }
        Statement::Switch(n) => {
            v.visit_expression_mut(&mut n.selector);
            for case in &mut n.cases {
                if let Some(label) = &mut case.label {
                    v.visit_expression_mut(label);
                }
                v.visit_statements_mut(&mut case.statements);
            }
        }
        Statement::Try(n) => {
            v.visit_block_mut(&mut n.body);
            for catch in &mut n.catches {
                v.visit_block_mut(&mut catch.body);
            }
            if let Some(finally) = &mut n.finally {
                v.visit_block_mut(finally);
            }
        }
        Statement::Synchronized(n) => {
            v.visit_expression_mut(&mut n.lock);
            v.visit_block_mut(&mut n.body);
        }
        Statement::Return(value) => {
            if let Some(value) = value {
                v.visit_expression_mut(value);
            }
        }
        Statement::Throw(e) => v.visit_expression_mut(e),
        Statement::Labeled(n) => v.visit_statement_mut(&mut n.body),
        Statement::LocalClass(class) => v.visit_class_mut(class),
        Statement::ReturnDefault
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Wrapped(_) => {}
    }
}

pub fn walk_expression_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expression) {
    match expr {
        Expression::FieldRef(n) => v.visit_expression_mut(&mut n.receiver),
        Expression::ArrayRef(n) => {
            v.visit_expression_mut(&mut n.array);
            v.visit_expression_mut(&mut n.index);
        }
        Expression::Call(n) => {
            if let Some(receiver) = &mut n.receiver {
                v.visit_expression_mut(receiver);
            }
            for arg in &mut n.args {
                v.visit_expression_mut(arg);
            }
        }
        Expression::New(n) => {
            for arg in &mut n.args {
                v.visit_expression_mut(arg);
            }
            if let Some(body) = &mut n.body {
                v.visit_class_mut(body);
            }
        }
        Expression::NewArray(n) => {
            for dim in &mut n.dims {
                v.visit_expression_mut(dim);
            }
            if let Some(init) = &mut n.init {
                for element in &mut init.elements {
                    v.visit_expression_mut(element);
                }
            }
        }
        Expression::ArrayInit(n) => {
            for element in &mut n.elements {
                v.visit_expression_mut(element);
            }
        }
        Expression::Binary(n) => {
            v.visit_expression_mut(&mut n.left);
            v.visit_expression_mut(&mut n.right);
        }
        Expression::Unary(n) => v.visit_expression_mut(&mut n.operand),
        Expression::Assign(n) => {
            v.visit_expression_mut(&mut n.target);
            v.visit_expression_mut(&mut n.value);
        }
        Expression::InstanceOf(n) => v.visit_expression_mut(&mut n.expr),
        Expression::Cast(n) => v.visit_expression_mut(&mut n.expr),
        Expression::Conditional(n) => {
            v.visit_expression_mut(&mut n.cond);
            v.visit_expression_mut(&mut n.then);
            v.visit_expression_mut(&mut n.otherwise);
        }
        Expression::Name(_)
        | Expression::This(_)
        | Expression::Literal(_)
        | Expression::ClassLiteral(_)
        | Expression::Annotation(_)
        | Expression::Wrapped(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::*;

    /// Rewrites unqualified `this` to `Outer.this`, stopping at nested class bodies.
    struct QualifyThis;

    impl VisitMut for QualifyThis {
        fn visit_class_mut(&mut self, _class: &mut ClassDecl) {}

        fn visit_expression_mut(&mut self, expr: &mut Expression) {
            if let Expression::This(None) = expr {
                *expr = this_of("Outer");
            }
            walk_expression_mut(self, expr);
        }
    }

    #[test]
    fn test_rewrite_in_place() {
        let mut m = method(TypeRef::void(), "f")
            .stmt(call("g").on(this()).arg(this_field("x")))
            .stmt(local(ty("Object"), "o").init(new_(ty("Object")).body(class_decl("").with_field(
                field_decl(ty("Object"), "self").init(this()),
            ))));
        QualifyThis.visit_method_mut(&mut m);
        assert_eq!(
            m.statements[0],
            Statement::from(call("g").on(this_of("Outer")).arg(field_ref(this_of("Outer"), "x")))
        );
        let Statement::LocalDecl(decl) = &m.statements[1] else {
            panic!("expected local");
        };
        let Some(Expression::New(new)) = &decl.init else {
            panic!("expected new");
        };
        assert_eq!(new.body.as_ref().and_then(|b| b.fields[0].init.clone()), Some(this()));
    }
}
