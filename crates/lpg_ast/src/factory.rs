//! Fluent factory for building AST nodes.
//!
//! Handlers build all synthesized code through these helpers. Every builder
//! converts into the node it describes (`Into<Expression>` and, for statement
//! expressions, `Into<Statement>`), so call chains nest without noise:
//!
//! ```
//! use lpg_ast::factory::*;
//! use lpg_ast::Statement;
//!
//! let stmt: Statement = if_(eq(name("x"), null()))
//!     .then(block().stmt(return_(string("none"))))
//!     .into();
//! assert!(matches!(stmt, Statement::If(_)));
//! ```

use crate::node::*;
use crate::types::*;

// ============================================================================
// Names and References
// ============================================================================

pub fn name(name: impl Into<String>) -> Expression {
    Expression::Name(name.into())
}

pub fn this() -> Expression {
    Expression::This(None)
}

/// `Outer.this`
pub fn this_of(outer: impl Into<String>) -> Expression {
    Expression::This(Some(outer.into()))
}

/// `receiver.name`
pub fn field_ref(receiver: impl Into<Expression>, name: impl Into<String>) -> Expression {
    Expression::FieldRef(FieldRef {
        receiver: Box::new(receiver.into()),
        name: name.into(),
    })
}

/// `this.name`
pub fn this_field(name: impl Into<String>) -> Expression {
    field_ref(this(), name)
}

pub fn array_ref(array: impl Into<Expression>, index: impl Into<Expression>) -> Expression {
    Expression::ArrayRef(ArrayRef {
        array: Box::new(array.into()),
        index: Box::new(index.into()),
    })
}

// ============================================================================
// Calls and Allocation
// ============================================================================

/// Start an unqualified call; chain `.on(receiver)` to qualify it.
pub fn call(name: impl Into<String>) -> Call {
    Call {
        receiver: None,
        name: name.into(),
        type_args: Vec::new(),
        args: Vec::new(),
    }
}

impl Call {
    pub fn on(mut self, receiver: impl Into<Expression>) -> Self {
        self.receiver = Some(Box::new(receiver.into()));
        self
    }

    pub fn arg(mut self, arg: impl Into<Expression>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Expression>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn type_arg(mut self, ty: TypeRef) -> Self {
        self.type_args.push(ty);
        self
    }
}

pub fn new_(ty: TypeRef) -> New {
    New {
        ty,
        args: Vec::new(),
        body: None,
    }
}

impl New {
    pub fn arg(mut self, arg: impl Into<Expression>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Expression>) -> Self {
        self.args.extend(args);
        self
    }

    /// Attach an anonymous class body.
    pub fn body(mut self, body: ClassDecl) -> Self {
        self.body = Some(Box::new(body.make_anonymous()));
        self
    }
}

/// `new ty[dim]`
pub fn new_array(ty: TypeRef, dim: impl Into<Expression>) -> Expression {
    Expression::NewArray(NewArray {
        ty,
        dims: vec![dim.into()],
        extra_dims: 0,
        init: None,
    })
}

/// `new ty[] { elements }`
pub fn new_array_init(ty: TypeRef, elements: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::NewArray(NewArray {
        ty,
        dims: Vec::new(),
        extra_dims: 1,
        init: Some(ArrayInit {
            elements: elements.into_iter().collect(),
        }),
    })
}

pub fn array_init(elements: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::ArrayInit(ArrayInit {
        elements: elements.into_iter().collect(),
    })
}

// ============================================================================
// Literals
// ============================================================================

pub fn null() -> Expression {
    Expression::Literal(Literal::Null)
}

pub fn bool_(value: bool) -> Expression {
    Expression::Literal(Literal::Bool(value))
}

pub fn true_() -> Expression {
    bool_(true)
}

pub fn false_() -> Expression {
    bool_(false)
}

pub fn int(value: i32) -> Expression {
    Expression::Literal(Literal::Int(value))
}

pub fn long(value: i64) -> Expression {
    Expression::Literal(Literal::Long(value))
}

pub fn char_(value: char) -> Expression {
    Expression::Literal(Literal::Char(value))
}

pub fn string(value: impl Into<String>) -> Expression {
    Expression::Literal(Literal::String(value.into()))
}

pub fn class_lit(ty: TypeRef) -> Expression {
    Expression::ClassLiteral(ty)
}

// ============================================================================
// Operators
// ============================================================================

pub fn binary(op: BinaryOp, left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    Expression::Binary(Binary {
        op,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    })
}

pub fn eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Eq, left, right)
}

pub fn ne(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Ne, left, right)
}

pub fn lt(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Lt, left, right)
}

pub fn and(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::And, left, right)
}

pub fn or(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Or, left, right)
}

pub fn add(left: impl Into<Expression>, right: impl Into<Expression>) -> Expression {
    binary(BinaryOp::Add, left, right)
}

pub fn unary(op: UnaryOp, operand: impl Into<Expression>) -> Unary {
    Unary {
        op,
        operand: Box::new(operand.into()),
    }
}

pub fn not(operand: impl Into<Expression>) -> Expression {
    unary(UnaryOp::Not, operand).into()
}

/// `operand++`
pub fn post_inc(operand: impl Into<Expression>) -> Unary {
    unary(UnaryOp::PostInc, operand)
}

pub fn assign(target: impl Into<Expression>, value: impl Into<Expression>) -> Assign {
    Assign {
        op: None,
        target: Box::new(target.into()),
        value: Box::new(value.into()),
    }
}

/// `target op= value`
pub fn compound_assign(
    op: BinaryOp,
    target: impl Into<Expression>,
    value: impl Into<Expression>,
) -> Assign {
    Assign {
        op: Some(op),
        ..assign(target, value)
    }
}

pub fn instance_of(expr: impl Into<Expression>, ty: TypeRef) -> Expression {
    Expression::InstanceOf(InstanceOf {
        expr: Box::new(expr.into()),
        ty,
    })
}

pub fn cast(ty: TypeRef, expr: impl Into<Expression>) -> Expression {
    Expression::Cast(Cast {
        ty,
        expr: Box::new(expr.into()),
    })
}

pub fn cond(
    cond: impl Into<Expression>,
    then: impl Into<Expression>,
    otherwise: impl Into<Expression>,
) -> Expression {
    Expression::Conditional(Conditional {
        cond: Box::new(cond.into()),
        then: Box::new(then.into()),
        otherwise: Box::new(otherwise.into()),
    })
}

/// Verbatim Java expression text.
pub fn wrapped(text: impl Into<String>) -> Expression {
    Expression::Wrapped(Wrapped { text: text.into() })
}

// ============================================================================
// Types
// ============================================================================

pub fn ty(name: impl Into<String>) -> TypeRef {
    TypeRef::new(name)
}

pub fn type_param(name: impl Into<String>) -> TypeParam {
    TypeParam::new(name)
}

pub fn annotation(ty: TypeRef) -> Annotation {
    Annotation::new(ty)
}

// ============================================================================
// Statements
// ============================================================================

pub fn block() -> Block {
    Block::default()
}

pub fn local(ty: TypeRef, name: impl Into<String>) -> LocalDecl {
    LocalDecl::new(ty, name)
}

pub fn if_(cond: impl Into<Expression>) -> If {
    If {
        cond: cond.into(),
        then: Box::new(Statement::Empty),
        otherwise: None,
    }
}

impl If {
    pub fn then(mut self, then: impl Into<Statement>) -> Self {
        self.then = Box::new(then.into());
        self
    }

    pub fn else_(mut self, otherwise: impl Into<Statement>) -> Self {
        self.otherwise = Some(Box::new(otherwise.into()));
        self
    }
}

pub fn while_(cond: impl Into<Expression>, body: impl Into<Statement>) -> While {
    While {
        cond: cond.into(),
        body: Box::new(body.into()),
    }
}

pub fn do_while(body: impl Into<Statement>, cond: impl Into<Expression>) -> DoWhile {
    DoWhile {
        body: Box::new(body.into()),
        cond: cond.into(),
    }
}

pub fn for_(body: impl Into<Statement>) -> For {
    For {
        init: Vec::new(),
        cond: None,
        update: Vec::new(),
        body: Box::new(body.into()),
    }
}

impl For {
    pub fn init(mut self, init: impl Into<Statement>) -> Self {
        self.init.push(init.into());
        self
    }

    pub fn cond(mut self, cond: impl Into<Expression>) -> Self {
        self.cond = Some(cond.into());
        self
    }

    pub fn update(mut self, update: impl Into<Expression>) -> Self {
        self.update.push(update.into());
        self
    }
}

pub fn foreach(var: LocalDecl, iterable: impl Into<Expression>, body: impl Into<Statement>) -> Foreach {
    Foreach {
        var,
        iterable: iterable.into(),
        body: Box::new(body.into()),
    }
}

pub fn switch_(selector: impl Into<Expression>) -> Switch {
    Switch {
        selector: selector.into(),
        cases: Vec::new(),
    }
}

impl Switch {
    pub fn case(mut self, case: Case) -> Self {
        self.cases.push(case);
        self
    }
}

pub fn case(label: impl Into<Expression>) -> Case {
    Case {
        label: Some(label.into()),
        statements: Vec::new(),
    }
}

pub fn default_case() -> Case {
    Case {
        label: None,
        statements: Vec::new(),
    }
}

impl Case {
    pub fn stmt(mut self, stmt: impl Into<Statement>) -> Self {
        self.statements.push(stmt.into());
        self
    }

    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Statement>) -> Self {
        self.statements.extend(stmts);
        self
    }
}

pub fn try_(body: Block) -> Try {
    Try {
        body,
        catches: Vec::new(),
        finally: None,
    }
}

impl Try {
    pub fn catch_(mut self, param: Argument, body: Block) -> Self {
        self.catches.push(Catch { param, body });
        self
    }

    pub fn finally_(mut self, body: Block) -> Self {
        self.finally = Some(body);
        self
    }
}

pub fn synchronized(lock: impl Into<Expression>, body: Block) -> Statement {
    Statement::Synchronized(Synchronized {
        lock: lock.into(),
        body,
    })
}

pub fn return_(value: impl Into<Expression>) -> Statement {
    Statement::Return(Some(value.into()))
}

pub fn return_void() -> Statement {
    Statement::Return(None)
}

/// `return` of the enclosing method's zero value.
pub fn return_default() -> Statement {
    Statement::ReturnDefault
}

pub fn throw_(value: impl Into<Expression>) -> Statement {
    Statement::Throw(value.into())
}

pub fn break_() -> Statement {
    Statement::Break(None)
}

pub fn break_to(label: impl Into<String>) -> Statement {
    Statement::Break(Some(label.into()))
}

pub fn continue_() -> Statement {
    Statement::Continue(None)
}

pub fn continue_to(label: impl Into<String>) -> Statement {
    Statement::Continue(Some(label.into()))
}

pub fn labeled(label: impl Into<String>, body: impl Into<Statement>) -> Statement {
    Statement::Labeled(Labeled {
        label: label.into(),
        body: Box::new(body.into()),
    })
}

/// Verbatim Java statement text.
pub fn wrapped_stmt(text: impl Into<String>) -> Statement {
    Statement::Wrapped(Wrapped { text: text.into() })
}

// ============================================================================
// Declarations
// ============================================================================

pub fn class_decl(name: impl Into<String>) -> ClassDecl {
    ClassDecl::new(name)
}

pub fn interface(name: impl Into<String>) -> ClassDecl {
    ClassDecl::new(name).interface()
}

pub fn method(return_type: TypeRef, name: impl Into<String>) -> MethodDecl {
    MethodDecl::new(return_type, name)
}

pub fn constructor(name: impl Into<String>) -> ConstructorDecl {
    ConstructorDecl::new(name)
}

pub fn field_decl(ty: TypeRef, name: impl Into<String>) -> FieldDecl {
    FieldDecl::new(ty, name)
}

pub fn arg(ty: TypeRef, name: impl Into<String>) -> Argument {
    Argument::new(ty, name)
}

pub fn initializer() -> Initializer {
    Initializer::default()
}

pub fn static_initializer() -> Initializer {
    Initializer {
        is_static: true,
        ..Initializer::default()
    }
}

pub fn enum_constant(name: impl Into<String>) -> EnumConstant {
    EnumConstant {
        data: NodeData::default(),
        name: name.into(),
        args: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_builder_shape() {
        let expr: Expression = call("add").on(this_field("items")).arg(name("x")).into();
        let Expression::Call(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.name, "add");
        assert_eq!(call.args, vec![name("x")]);
        assert_eq!(call.receiver.as_deref(), Some(&this_field("items")));
    }

    #[test]
    fn test_statement_expressions_convert_to_statements() {
        let stmt: Statement = assign(this_field("x"), name("x")).into();
        assert!(matches!(stmt, Statement::Expression(Expression::Assign(_))));
        let stmt: Statement = post_inc(name("i")).into();
        assert!(matches!(stmt, Statement::Expression(Expression::Unary(_))));
    }

    #[test]
    fn test_anonymous_body_is_marked() {
        let expr: Expression = new_(ty("Runnable")).body(class_decl("")).into();
        let Expression::New(new) = expr else {
            panic!("expected new");
        };
        assert!(new.body.is_some_and(|b| b.anonymous));
    }

    #[test]
    fn test_method_builder_accumulates() {
        let m = method(TypeRef::void(), "run")
            .public()
            .with_arg(arg(ty("int"), "n").final_())
            .stmt(return_void());
        assert_eq!(m.modifiers, Modifiers::PUBLIC);
        assert_eq!(m.arity(), 1);
        assert!(m.args[0].is_final());
        assert_eq!(m.statements.len(), 1);
    }
}
