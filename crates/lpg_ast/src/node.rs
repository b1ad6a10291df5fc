//! AST node definitions.
//!
//! Every child is owned by its parent (`Box`/`Vec`), so a node can only ever
//! be attached in one place. Expressions and statements are closed sum types;
//! consumers match on them exhaustively. `Wrapped` variants carry verbatim
//! Java text that generic consumers never inspect.

use crate::types::*;
use lpg_core::text::TextSpan;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Node Data
// ============================================================================

/// Common data shared by declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Source span; synthesized nodes carry the span of their triggering annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
    #[serde(default, skip_serializing_if = "NodeFlags::is_empty")]
    pub flags: NodeFlags,
}

impl NodeData {
    pub fn new(span: Option<TextSpan>) -> Self {
        Self {
            span,
            flags: NodeFlags::empty(),
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.flags.contains(NodeFlags::SYNTHESIZED)
    }

    /// Mark as handler-produced and attribute to `span`.
    pub fn stamp(&mut self, span: Option<TextSpan>) {
        self.flags |= NodeFlags::SYNTHESIZED;
        if self.span.is_none() {
            self.span = span;
        }
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

// ============================================================================
// Type References
// ============================================================================

/// Wildcard bound of a type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wildcard {
    /// `?`
    Unbound,
    /// `? extends T`
    Extends,
    /// `? super T`
    Super,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// A named type reference with positional type arguments and array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<TypeRef>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dims: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<Wildcard>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_args: Vec::new(),
            dims: 0,
            wildcard: None,
        }
    }

    pub fn void() -> Self {
        Self::new("void")
    }

    pub fn object() -> Self {
        Self::new("java.lang.Object")
    }

    pub fn string() -> Self {
        Self::new("String")
    }

    /// `?`
    pub fn unbound_wildcard() -> Self {
        Self {
            wildcard: Some(Wildcard::Unbound),
            ..Self::new("?")
        }
    }

    /// `? extends bound`
    pub fn extends_wildcard(bound: TypeRef) -> Self {
        Self {
            wildcard: Some(Wildcard::Extends),
            ..bound
        }
    }

    /// `? super bound`
    pub fn super_wildcard(bound: TypeRef) -> Self {
        Self {
            wildcard: Some(Wildcard::Super),
            ..bound
        }
    }

    pub fn arg(mut self, arg: TypeRef) -> Self {
        self.type_args.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = TypeRef>) -> Self {
        self.type_args.extend(args);
        self
    }

    pub fn dims(mut self, dims: u32) -> Self {
        self.dims = dims;
        self
    }

    pub fn array_of(mut self) -> Self {
        self.dims += 1;
        self
    }

    /// The element type of an array type.
    pub fn element(&self) -> Option<TypeRef> {
        (self.dims > 0).then(|| TypeRef {
            dims: self.dims - 1,
            ..self.clone()
        })
    }

    /// The last segment of a qualified name: `java.util.List` -> `List`.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Whether this names `simple`, either directly or fully qualified.
    pub fn is_named(&self, simple: &str) -> bool {
        names_match(&self.name, simple)
    }

    pub fn is_void(&self) -> bool {
        self.dims == 0 && self.name == "void"
    }

    pub fn is_primitive(&self) -> bool {
        self.dims == 0 && PRIMITIVES.contains(&self.name.as_str())
    }

    pub fn is_boolean(&self) -> bool {
        self.dims == 0 && self.name == "boolean"
    }

    /// The wrapper type of a primitive, or a clone of `self`.
    pub fn boxed(&self) -> TypeRef {
        if !self.is_primitive() {
            return self.clone();
        }
        let wrapper = match self.name.as_str() {
            "boolean" => "Boolean",
            "byte" => "Byte",
            "char" => "Character",
            "short" => "Short",
            "int" => "Integer",
            "long" => "Long",
            "float" => "Float",
            _ => "Double",
        };
        TypeRef::new(wrapper)
    }

    /// The zero value a field of this type holds before assignment.
    pub fn default_value(&self) -> Expression {
        if !self.is_primitive() {
            return Expression::Literal(Literal::Null);
        }
        match self.name.as_str() {
            "boolean" => Expression::Literal(Literal::Bool(false)),
            "char" => Expression::Literal(Literal::Char('\0')),
            "long" => Expression::Literal(Literal::Long(0)),
            "float" | "double" => Expression::Literal(Literal::Double(0.0)),
            _ => Expression::Literal(Literal::Int(0)),
        }
    }
}

/// The last segment of a dotted name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// `lombok.Builder` and `Builder` both match `Builder`; `Builder.Extension`
/// does not match `Builder`.
pub fn names_match(name: &str, wanted: &str) -> bool {
    name == wanted
        || (name.len() > wanted.len()
            && name.ends_with(wanted)
            && name.as_bytes()[name.len() - wanted.len() - 1] == b'.')
}

/// A generic type parameter: `T extends Comparable<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounds: Vec<TypeRef>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
        }
    }

    pub fn bound(mut self, bound: TypeRef) -> Self {
        self.bounds.push(bound);
        self
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A simple or dotted name: `x`, `java.awt.EventQueue`.
    Name(String),
    /// `this` or `Outer.this`.
    This(Option<String>),
    FieldRef(FieldRef),
    ArrayRef(ArrayRef),
    Call(Call),
    New(New),
    NewArray(NewArray),
    ArrayInit(ArrayInit),
    Binary(Binary),
    Unary(Unary),
    Assign(Assign),
    InstanceOf(InstanceOf),
    Cast(Cast),
    Conditional(Conditional),
    Literal(Literal),
    ClassLiteral(TypeRef),
    Annotation(Annotation),
    Wrapped(Wrapped),
}

impl Expression {
    /// `name` if this is a plain name expression.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expression::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Whether this expression may appear as an expression statement.
    pub fn is_statement_expression(&self) -> bool {
        match self {
            Expression::Call(_) | Expression::New(_) | Expression::Assign(_) => true,
            Expression::Unary(u) => matches!(
                u.op,
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
            ),
            Expression::Wrapped(_) => true,
            _ => false,
        }
    }
}

/// `receiver.name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    pub receiver: Box<Expression>,
    pub name: String,
}

/// `array[index]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRef {
    pub array: Box<Expression>,
    pub index: Box<Expression>,
}

/// `receiver.<T>name(args)`; no receiver means an unqualified call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Box<Expression>>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<TypeRef>,
    #[serde(default)]
    pub args: Vec<Expression>,
}

/// `new T(args)`, optionally with an anonymous class body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct New {
    pub ty: TypeRef,
    #[serde(default)]
    pub args: Vec<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<ClassDecl>>,
}

/// `new T[d0][d1][]...` or `new T[] { ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArray {
    /// Element type.
    pub ty: TypeRef,
    #[serde(default)]
    pub dims: Vec<Expression>,
    /// Unsized trailing dimensions.
    #[serde(default)]
    pub extra_dims: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<ArrayInit>,
}

/// `{ a, b, c }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayInit {
    #[serde(default)]
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
}

/// `target = value` or, with an operator, `target op= value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<BinaryOp>,
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceOf {
    pub expr: Box<Expression>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub ty: TypeRef,
    pub expr: Box<Expression>,
}

/// `cond ? then : otherwise`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub cond: Box<Expression>,
    pub then: Box<Expression>,
    pub otherwise: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Char(char),
    String(String),
}

/// Verbatim Java text carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrapped {
    pub text: String,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block(Block),
    Expression(Expression),
    LocalDecl(LocalDecl),
    If(If),
    While(While),
    DoWhile(DoWhile),
    For(For),
    Foreach(Foreach),
    Switch(Switch),
    Try(Try),
    Synchronized(Synchronized),
    Return(Option<Expression>),
    /// `return` of the enclosing method's zero value; resolved during lowering.
    ReturnDefault,
    Throw(Expression),
    Break(Option<String>),
    Continue(Option<String>),
    Labeled(Labeled),
    LocalClass(Box<ClassDecl>),
    Empty,
    Wrapped(Wrapped),
}

impl Statement {
    /// Whether control can never continue past this statement.
    pub fn is_terminal(&self) -> bool {
        match self {
            Statement::Return(_)
            | Statement::ReturnDefault
            | Statement::Throw(_)
            | Statement::Break(_)
            | Statement::Continue(_) => true,
            Statement::Block(block) => block.statements.last().is_some_and(Statement::is_terminal),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn stmt(mut self, stmt: impl Into<Statement>) -> Self {
        self.statements.push(stmt.into());
        self
    }

    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Statement>) -> Self {
        self.statements.extend(stmts);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub cond: Expression,
    pub then: Box<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct While {
    pub cond: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhile {
    pub body: Box<Statement>,
    pub cond: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct For {
    #[serde(default)]
    pub init: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<Expression>,
    #[serde(default)]
    pub update: Vec<Expression>,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foreach {
    pub var: LocalDecl,
    pub iterable: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub selector: Expression,
    #[serde(default)]
    pub cases: Vec<Case>,
}

/// `case label:` or, without a label, `default:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Expression>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Try {
    pub body: Block,
    #[serde(default)]
    pub catches: Vec<Catch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finally: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catch {
    pub param: Argument,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synchronized {
    pub lock: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeled {
    pub label: String,
    pub body: Box<Statement>,
}

// ============================================================================
// Annotations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub data: NodeData,
    pub ty: TypeRef,
    #[serde(default)]
    pub values: Vec<AnnotationValue>,
}

/// One `name = value` member of an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationValue {
    pub name: String,
    pub value: Expression,
}

impl Annotation {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            data: NodeData::default(),
            ty,
            values: Vec::new(),
        }
    }

    /// Add a member; `value` is the single-member shorthand.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.values.push(AnnotationValue {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    pub fn is(&self, name: &str) -> bool {
        self.ty.is_named(name)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A method or constructor parameter, also used for catch parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    pub name: String,
}

impl Argument {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            ty,
            name: name.into(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Expression>,
}

impl LocalDecl {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            ty,
            name: name.into(),
            init: None,
        }
    }

    pub fn init(mut self, init: impl Into<Expression>) -> Self {
        self.init = Some(init.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Expression>,
}

impl FieldDecl {
    pub fn new(ty: TypeRef, name: impl Into<String>) -> Self {
        Self {
            data: NodeData::default(),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            ty,
            name: name.into(),
            init: None,
        }
    }

    pub fn init(mut self, init: impl Into<Expression>) -> Self {
        self.init = Some(init.into());
        self
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }

    pub fn is_initialized(&self) -> bool {
        self.init.is_some()
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.is(name))
    }
}

/// Generates the modifier and annotation builders shared by variable-like
/// declarations.
macro_rules! variable_shape {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
                self.modifiers |= modifiers;
                self
            }

            pub fn final_(self) -> Self {
                self.with_modifiers(Modifiers::FINAL)
            }

            pub fn with_annotation(mut self, annotation: Annotation) -> Self {
                self.annotations.push(annotation);
                self
            }
        }
    )*};
}

variable_shape!(Argument, LocalDecl, FieldDecl);

impl FieldDecl {
    pub fn private(self) -> Self {
        self.with_access(AccessLevel::Private)
    }

    pub fn public(self) -> Self {
        self.with_access(AccessLevel::Public)
    }

    pub fn static_(self) -> Self {
        self.with_modifiers(Modifiers::STATIC)
    }

    pub fn volatile(self) -> Self {
        self.with_modifiers(Modifiers::VOLATILE)
    }

    pub fn transient(self) -> Self {
        self.with_modifiers(Modifiers::TRANSIENT)
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.modifiers = self.modifiers.with_access(access);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub return_type: TypeRef,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub thrown: Vec<TypeRef>,
    #[serde(default)]
    pub statements: Vec<Statement>,
    /// Interface stub or abstract method: printed with `;` instead of a body.
    #[serde(default)]
    pub no_body: bool,
    /// Implements a supertype method.
    #[serde(default)]
    pub implementing: bool,
}

impl MethodDecl {
    pub fn new(return_type: TypeRef, name: impl Into<String>) -> Self {
        Self {
            data: NodeData::default(),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            type_params: Vec::new(),
            return_type,
            name: name.into(),
            args: Vec::new(),
            thrown: Vec::new(),
            statements: Vec::new(),
            no_body: false,
            implementing: false,
        }
    }

    pub fn without_body(mut self) -> Self {
        self.no_body = true;
        self
    }

    pub fn implementing(mut self) -> Self {
        self.implementing = true;
        self
    }

    pub fn returning(mut self, return_type: TypeRef) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.no_body || self.modifiers.contains(Modifiers::ABSTRACT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub thrown: Vec<TypeRef>,
    #[serde(default)]
    pub statements: Vec<Statement>,
    /// The body starts with an implicit `super()` call.
    #[serde(default = "default_true")]
    pub implicit_super: bool,
}

fn default_true() -> bool {
    true
}

impl ConstructorDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            data: NodeData::default(),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            type_params: Vec::new(),
            name: name.into(),
            args: Vec::new(),
            thrown: Vec::new(),
            statements: Vec::new(),
            implicit_super: true,
        }
    }
}

/// Generates the fluent builders shared by methods and constructors.
macro_rules! method_shape {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
                self.modifiers |= modifiers;
                self
            }

            pub fn with_access(mut self, access: AccessLevel) -> Self {
                self.modifiers = self.modifiers.with_access(access);
                self
            }

            pub fn public(self) -> Self {
                self.with_access(AccessLevel::Public)
            }

            pub fn protected(self) -> Self {
                self.with_access(AccessLevel::Protected)
            }

            pub fn private(self) -> Self {
                self.with_access(AccessLevel::Private)
            }

            pub fn static_(self) -> Self {
                self.with_modifiers(Modifiers::STATIC)
            }

            pub fn final_(self) -> Self {
                self.with_modifiers(Modifiers::FINAL)
            }

            pub fn with_annotation(mut self, annotation: Annotation) -> Self {
                self.annotations.push(annotation);
                self
            }

            pub fn with_type_param(mut self, param: TypeParam) -> Self {
                self.type_params.push(param);
                self
            }

            pub fn with_type_params(mut self, params: impl IntoIterator<Item = TypeParam>) -> Self {
                self.type_params.extend(params);
                self
            }

            pub fn with_arg(mut self, arg: Argument) -> Self {
                self.args.push(arg);
                self
            }

            pub fn with_args(mut self, args: impl IntoIterator<Item = Argument>) -> Self {
                self.args.extend(args);
                self
            }

            pub fn with_thrown(mut self, ty: TypeRef) -> Self {
                self.thrown.push(ty);
                self
            }

            pub fn with_thrown_types(mut self, types: impl IntoIterator<Item = TypeRef>) -> Self {
                self.thrown.extend(types);
                self
            }

            pub fn stmt(mut self, stmt: impl Into<Statement>) -> Self {
                self.statements.push(stmt.into());
                self
            }

            pub fn stmts(mut self, stmts: impl IntoIterator<Item = Statement>) -> Self {
                self.statements.extend(stmts);
                self
            }

            pub fn is_static(&self) -> bool {
                self.modifiers.contains(Modifiers::STATIC)
            }

            pub fn has_annotation(&self, name: &str) -> bool {
                self.annotations.iter().any(|a| a.is(name))
            }

            pub fn arity(&self) -> usize {
                self.args.len()
            }
        }
    )*};
}

method_shape!(MethodDecl, ConstructorDecl);

/// An instance or static initializer block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Initializer {
    pub fn stmt(mut self, stmt: impl Into<Statement>) -> Self {
        self.statements.push(stmt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    #[serde(default)]
    pub data: NodeData,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub kind: ClassKind,
    pub name: String,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub enum_constants: Vec<EnumConstant>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub initializers: Vec<Initializer>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub member_types: Vec<ClassDecl>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub anonymous: bool,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            data: NodeData::default(),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            kind: ClassKind::Class,
            name: name.into(),
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            enum_constants: Vec::new(),
            fields: Vec::new(),
            initializers: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            local: false,
            anonymous: false,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    /// The type of `this`: the class name applied to its own type parameters.
    pub fn self_type(&self) -> TypeRef {
        TypeRef::new(self.name.clone())
            .args(self.type_params.iter().map(|tp| TypeRef::new(tp.name.clone())))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// First method with the given name and, if given, arity.
    pub fn method(&self, name: &str, arity: Option<usize>) -> Option<&MethodDecl> {
        self.methods
            .iter()
            .find(|m| m.name == name && arity.map_or(true, |n| m.args.len() == n))
    }

    pub fn has_method(&self, name: &str, arity: Option<usize>) -> bool {
        self.method(name, arity).is_some()
    }

    pub fn member_type(&self, name: &str) -> Option<&ClassDecl> {
        self.member_types.iter().find(|t| t.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.is(name))
    }

    // -- Builders --

    pub fn interface(mut self) -> Self {
        self.kind = ClassKind::Interface;
        self
    }

    pub fn enumeration(mut self) -> Self {
        self.kind = ClassKind::Enum;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.modifiers = self.modifiers.with_access(access);
        self
    }

    pub fn public(self) -> Self {
        self.with_access(AccessLevel::Public)
    }

    pub fn private(self) -> Self {
        self.with_access(AccessLevel::Private)
    }

    pub fn static_(self) -> Self {
        self.with_modifiers(Modifiers::STATIC)
    }

    pub fn final_(self) -> Self {
        self.with_modifiers(Modifiers::FINAL)
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_type_params(mut self, params: impl IntoIterator<Item = TypeParam>) -> Self {
        self.type_params.extend(params);
        self
    }

    pub fn extends(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_enum_constant(mut self, name: impl Into<String>) -> Self {
        self.enum_constants.push(EnumConstant {
            data: NodeData::default(),
            name: name.into(),
            args: Vec::new(),
        });
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializers.push(initializer);
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorDecl) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodDecl>) -> Self {
        self.methods.extend(methods);
        self
    }

    pub fn with_member_type(mut self, ty: ClassDecl) -> Self {
        self.member_types.push(ty);
        self
    }

    pub fn make_local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn make_anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// A compilation unit: one Java source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub types: Vec<ClassDecl>,
}

impl CompilationUnit {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, ty: ClassDecl) -> Self {
        self.types.push(ty);
        self
    }

    /// Find a top-level or member type by simple or dotted (`Outer.Inner`) name.
    pub fn find_type(&self, name: &str) -> Option<&ClassDecl> {
        let mut segments = name.split('.');
        let first = segments.next()?;
        let mut current = self.types.iter().find(|t| t.name == first)?;
        for segment in segments {
            current = current.member_type(segment)?;
        }
        Some(current)
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! into_expression {
    ($($variant:ident($ty:ty)),* $(,)?) => {$(
        impl From<$ty> for Expression {
            fn from(node: $ty) -> Self {
                Expression::$variant(node)
            }
        }
    )*};
}

into_expression!(
    FieldRef(FieldRef),
    ArrayRef(ArrayRef),
    Call(Call),
    New(New),
    NewArray(NewArray),
    ArrayInit(ArrayInit),
    Binary(Binary),
    Unary(Unary),
    Assign(Assign),
    InstanceOf(InstanceOf),
    Cast(Cast),
    Conditional(Conditional),
    Literal(Literal),
    Annotation(Annotation),
    Wrapped(Wrapped),
);

macro_rules! into_statement {
    ($($variant:ident($ty:ty)),* $(,)?) => {$(
        impl From<$ty> for Statement {
            fn from(node: $ty) -> Self {
                Statement::$variant(node)
            }
        }
    )*};
}

into_statement!(
    Block(Block),
    Expression(Expression),
    LocalDecl(LocalDecl),
    If(If),
    While(While),
    DoWhile(DoWhile),
    For(For),
    Foreach(Foreach),
    Switch(Switch),
    Try(Try),
    Synchronized(Synchronized),
    Labeled(Labeled),
    Wrapped(Wrapped),
);

/// Statement expressions convert straight into expression statements.
macro_rules! expression_statement {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Statement {
            fn from(node: $ty) -> Self {
                Statement::Expression(node.into())
            }
        }
    )*};
}

expression_statement!(Call, New, Assign, Unary);

impl From<ClassDecl> for Statement {
    fn from(class: ClassDecl) -> Self {
        Statement::LocalClass(Box::new(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match() {
        assert!(names_match("Builder", "Builder"));
        assert!(names_match("lombok.Builder", "Builder"));
        assert!(names_match("lombok.Builder.Extension", "Builder.Extension"));
        assert!(!names_match("Builder.Extension", "Builder"));
        assert!(!names_match("MyBuilder", "Builder"));
    }

    #[test]
    fn test_type_ref_boxing_and_defaults() {
        assert_eq!(TypeRef::new("int").boxed(), TypeRef::new("Integer"));
        assert_eq!(TypeRef::new("int").dims(1).boxed(), TypeRef::new("int").dims(1));
        assert_eq!(
            TypeRef::new("boolean").default_value(),
            Expression::Literal(Literal::Bool(false))
        );
        assert_eq!(
            TypeRef::new("String").default_value(),
            Expression::Literal(Literal::Null)
        );
        assert_eq!(TypeRef::new("int").dims(2).element(), Some(TypeRef::new("int").dims(1)));
    }

    #[test]
    fn test_self_type_carries_type_params() {
        let class = ClassDecl::new("Pair").with_type_params([TypeParam::new("A"), TypeParam::new("B")]);
        assert_eq!(
            class.self_type(),
            TypeRef::new("Pair").arg(TypeRef::new("A")).arg(TypeRef::new("B"))
        );
    }

    #[test]
    fn test_find_nested_type() {
        let unit = CompilationUnit::new("A.java")
            .with_type(ClassDecl::new("Outer").with_member_type(ClassDecl::new("Inner")));
        assert!(unit.find_type("Outer.Inner").is_some());
        assert!(unit.find_type("Outer.Missing").is_none());
    }

    #[test]
    fn test_deserialize_minimal_class() {
        let json = r#"{
            "name": "Point",
            "modifiers": "PUBLIC",
            "fields": [{ "ty": { "name": "int" }, "name": "x", "modifiers": "PRIVATE | FINAL" }]
        }"#;
        let class: ClassDecl = serde_json::from_str(json).unwrap();
        assert_eq!(class.name, "Point");
        assert!(class.fields[0].is_final());
        assert!(!class.fields[0].is_initialized());
        assert_eq!(class.kind, ClassKind::Class);
    }
}
