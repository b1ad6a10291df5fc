//! AST visitor trait for read-only traversal.
//!
//! Default implementations walk into children through the `walk_*`
//! functions, so an override can do its own work and then call the matching
//! `walk_*` to keep descending. Wrapped text is opaque and never entered.

use crate::node::*;

/// A visitor over borrowed AST nodes. Implement the methods for the node
/// kinds of interest; everything else is walked by default.
pub trait AstVisitor<'a> {
    fn visit_unit(&mut self, unit: &'a CompilationUnit) {
        for ty in &unit.types {
            self.visit_class(ty);
        }
    }

    fn visit_class(&mut self, class: &'a ClassDecl) {
        walk_class(self, class);
    }

    fn visit_field(&mut self, field: &'a FieldDecl) {
        for ann in &field.annotations {
            self.visit_annotation(ann);
        }
        self.visit_type_ref(&field.ty);
        if let Some(init) = &field.init {
            self.visit_expression(init);
        }
    }

    fn visit_method(&mut self, method: &'a MethodDecl) {
        walk_method(self, method);
    }

    fn visit_constructor(&mut self, ctor: &'a ConstructorDecl) {
        walk_constructor(self, ctor);
    }

    fn visit_initializer(&mut self, init: &'a Initializer) {
        for stmt in &init.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_enum_constant(&mut self, constant: &'a EnumConstant) {
        for arg in &constant.args {
            self.visit_expression(arg);
        }
    }

    fn visit_argument(&mut self, arg: &'a Argument) {
        for ann in &arg.annotations {
            self.visit_annotation(ann);
        }
        self.visit_type_ref(&arg.ty);
    }

    fn visit_annotation(&mut self, ann: &'a Annotation) {
        for value in &ann.values {
            self.visit_expression(&value.value);
        }
    }

    fn visit_type_param(&mut self, param: &'a TypeParam) {
        for bound in &param.bounds {
            self.visit_type_ref(bound);
        }
    }

    fn visit_type_ref(&mut self, _ty: &'a TypeRef) {}

    // -- Statements --

    fn visit_statement(&mut self, stmt: &'a Statement) {
        walk_statement(self, stmt);
    }

    fn visit_block(&mut self, block: &'a Block) {
        for stmt in &block.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_local_decl(&mut self, local: &'a LocalDecl) {
        for ann in &local.annotations {
            self.visit_annotation(ann);
        }
        self.visit_type_ref(&local.ty);
        if let Some(init) = &local.init {
            self.visit_expression(init);
        }
    }

    fn visit_case(&mut self, case: &'a Case) {
        if let Some(label) = &case.label {
            self.visit_expression(label);
        }
        for stmt in &case.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_catch(&mut self, catch: &'a Catch) {
        self.visit_argument(&catch.param);
        self.visit_block(&catch.body);
    }

    // -- Expressions --

    fn visit_expression(&mut self, expr: &'a Expression) {
        walk_expression(self, expr);
    }
}

pub fn walk_class<'a, V: AstVisitor<'a> + ?Sized>(v: &mut V, class: &'a ClassDecl) {
    for ann in &class.annotations {
        v.visit_annotation(ann);
    }
    for tp in &class.type_params {
        v.visit_type_param(tp);
    }
    if let Some(sup) = &class.superclass {
        v.visit_type_ref(sup);
    }
    for iface in &class.interfaces {
        v.visit_type_ref(iface);
    }
    for constant in &class.enum_constants {
        v.visit_enum_constant(constant);
    }
    for field in &class.fields {
        v.visit_field(field);
    }
    for init in &class.initializers {
        v.visit_initializer(init);
    }
    for ctor in &class.constructors {
        v.visit_constructor(ctor);
    }
    for method in &class.methods {
        v.visit_method(method);
    }
    for member in &class.member_types {
        v.visit_class(member);
    }
}

pub fn walk_method<'a, V: AstVisitor<'a> + ?Sized>(v: &mut V, method: &'a MethodDecl) {
    for ann in &method.annotations {
        v.visit_annotation(ann);
    }
    for tp in &method.type_params {
        v.visit_type_param(tp);
    }
    v.visit_type_ref(&method.return_type);
    for arg in &method.args {
        v.visit_argument(arg);
    }
    for thrown in &method.thrown {
        v.visit_type_ref(thrown);
    }
    for stmt in &method.statements {
        v.visit_statement(stmt);
    }
}

pub fn walk_constructor<'a, V: AstVisitor<'a> + ?Sized>(v: &mut V, ctor: &'a ConstructorDecl) {
    for ann in &ctor.annotations {
        v.visit_annotation(ann);
    }
    for tp in &ctor.type_params {
        v.visit_type_param(tp);
    }
    for arg in &ctor.args {
        v.visit_argument(arg);
    }
    for thrown in &ctor.thrown {
        v.visit_type_ref(thrown);
    }
    for stmt in &ctor.statements {
        v.visit_statement(stmt);
    }
}

pub fn walk_statement<'a, V: AstVisitor<'a> + ?Sized>(v: &mut V, stmt: &'a Statement) {
    match stmt {
        Statement::Block(n) => v.visit_block(n),
        Statement::Expression(e) => v.visit_expression(e),
        Statement::LocalDecl(n) => v.visit_local_decl(n),
        Statement::If(n) => {
            v.visit_expression(&n.cond);
            v.visit_statement(&n.then);
            if let Some(otherwise) = &n.otherwise {
                v.visit_statement(otherwise);
            }
        }
        Statement::While(n) => {
            v.visit_expression(&n.cond);
            v.visit_statement(&n.body);
        }
        Statement::DoWhile(n) => {
            v.visit_statement(&n.body);
            v.visit_expression(&n.cond);
        }
        Statement::For(n) => {
            for init in &n.init {
                v.visit_statement(init);
            }
            if let Some(cond) = &n.cond {
                v.visit_expression(cond);
            }
            for update in &n.update {
                v.visit_expression(update);
            }
            v.visit_statement(&n.body);
        }
        Statement::Foreach(n) => {
            v.visit_local_decl(&n.var);
            v.visit_expression(&n.iterable);
            v.visit_statement(&n.body);
        }
        Statement::Switch(n) => {
            v.visit_expression(&n.selector);
            for case in &n.cases {
                v.visit_case(case);
            }
        }
        Statement::Try(n) => {
            v.visit_block(&n.body);
            for catch in &n.catches {
                v.visit_catch(catch);
            }
            if let Some(finally) = &n.finally {
                v.visit_block(finally);
            }
        }
        Statement::Synchronized(n) => {
            v.visit_expression(&n.lock);
            v.visit_block(&n.body);
        }
        Statement::Return(value) => {
            if let Some(value) = value {
                v.visit_expression(value);
            }
        }
        Statement::Throw(e) => v.visit_expression(e),
        Statement::Labeled(n) => v.visit_statement(&n.body),
        Statement::LocalClass(class) => v.visit_class(class),
        Statement::ReturnDefault
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Wrapped(_) => {}
    }
}

pub fn walk_expression<'a, V: AstVisitor<'a> + ?Sized>(v: &mut V, expr: &'a Expression) {
    match expr {
        Expression::FieldRef(n) => v.visit_expression(&n.receiver),
        Expression::ArrayRef(n) => {
            v.visit_expression(&n.array);
            v.visit_expression(&n.index);
        }
        Expression::Call(n) => {
            if let Some(receiver) = &n.receiver {
                v.visit_expression(receiver);
            }
            for ty in &n.type_args {
                v.visit_type_ref(ty);
            }
            for arg in &n.args {
                v.visit_expression(arg);
            }
        }
        Expression::New(n) => {
            v.visit_type_ref(&n.ty);
            for arg in &n.args {
                v.visit_expression(arg);
            }
            if let Some(body) = &n.body {
                v.visit_class(body);
            }
        }
        Expression::NewArray(n) => {
            v.visit_type_ref(&n.ty);
            for dim in &n.dims {
                v.visit_expression(dim);
            }
            if let Some(init) = &n.init {
                for element in &init.elements {
                    v.visit_expression(element);
                }
            }
        }
        Expression::ArrayInit(n) => {
            for element in &n.elements {
                v.visit_expression(element);
            }
        }
        Expression::Binary(n) => {
            v.visit_expression(&n.left);
            v.visit_expression(&n.right);
        }
        Expression::Unary(n) => v.visit_expression(&n.operand),
        Expression::Assign(n) => {
            v.visit_expression(&n.target);
            v.visit_expression(&n.value);
        }
        Expression::InstanceOf(n) => {
            v.visit_expression(&n.expr);
            v.visit_type_ref(&n.ty);
        }
        Expression::Cast(n) => {
            v.visit_type_ref(&n.ty);
            v.visit_expression(&n.expr);
        }
        Expression::Conditional(n) => {
            v.visit_expression(&n.cond);
            v.visit_expression(&n.then);
            v.visit_expression(&n.otherwise);
        }
        Expression::ClassLiteral(ty) => v.visit_type_ref(ty),
        Expression::Annotation(ann) => v.visit_annotation(ann),
        Expression::Name(_) | Expression::This(_) | Expression::Literal(_) | Expression::Wrapped(_) => {}
    }
}
