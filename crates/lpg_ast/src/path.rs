//! Parent-aware traversal.
//!
//! The tree owns its children and keeps no back-pointers; the parent chain of
//! a node is the stack of [`NodeRef`]s that led to it during a walk.

use crate::node::*;

/// A borrowed reference to any node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Unit(&'a CompilationUnit),
    Class(&'a ClassDecl),
    Field(&'a FieldDecl),
    Method(&'a MethodDecl),
    Constructor(&'a ConstructorDecl),
    Initializer(&'a Initializer),
    EnumConstant(&'a EnumConstant),
    Argument(&'a Argument),
    LocalDecl(&'a LocalDecl),
    Annotation(&'a Annotation),
    Block(&'a Block),
    Case(&'a Case),
    Catch(&'a Catch),
    Statement(&'a Statement),
    Expression(&'a Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Unit,
    Class,
    Field,
    Method,
    Constructor,
    Initializer,
    EnumConstant,
    Argument,
    LocalDecl,
    Annotation,
    Block,
    Case,
    Catch,
    Statement,
    Expression,
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Unit(_) => NodeKind::Unit,
            NodeRef::Class(_) => NodeKind::Class,
            NodeRef::Field(_) => NodeKind::Field,
            NodeRef::Method(_) => NodeKind::Method,
            NodeRef::Constructor(_) => NodeKind::Constructor,
            NodeRef::Initializer(_) => NodeKind::Initializer,
            NodeRef::EnumConstant(_) => NodeKind::EnumConstant,
            NodeRef::Argument(_) => NodeKind::Argument,
            NodeRef::LocalDecl(_) => NodeKind::LocalDecl,
            NodeRef::Annotation(_) => NodeKind::Annotation,
            NodeRef::Block(_) => NodeKind::Block,
            NodeRef::Case(_) => NodeKind::Case,
            NodeRef::Catch(_) => NodeKind::Catch,
            NodeRef::Statement(_) => NodeKind::Statement,
            NodeRef::Expression(_) => NodeKind::Expression,
        }
    }

    fn addr(&self) -> *const () {
        match self {
            NodeRef::Unit(n) => *n as *const _ as *const (),
            NodeRef::Class(n) => *n as *const _ as *const (),
            NodeRef::Field(n) => *n as *const _ as *const (),
            NodeRef::Method(n) => *n as *const _ as *const (),
            NodeRef::Constructor(n) => *n as *const _ as *const (),
            NodeRef::Initializer(n) => *n as *const _ as *const (),
            NodeRef::EnumConstant(n) => *n as *const _ as *const (),
            NodeRef::Argument(n) => *n as *const _ as *const (),
            NodeRef::LocalDecl(n) => *n as *const _ as *const (),
            NodeRef::Annotation(n) => *n as *const _ as *const (),
            NodeRef::Block(n) => *n as *const _ as *const (),
            NodeRef::Case(n) => *n as *const _ as *const (),
            NodeRef::Catch(n) => *n as *const _ as *const (),
            NodeRef::Statement(n) => *n as *const _ as *const (),
            NodeRef::Expression(n) => *n as *const _ as *const (),
        }
    }

    /// Identity comparison: the same node, not an equal one.
    pub fn ptr_eq(&self, other: &NodeRef<'_>) -> bool {
        self.kind() == other.kind() && self.addr() == other.addr()
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::Unit(unit) => out.extend(unit.types.iter().map(NodeRef::Class)),
            NodeRef::Class(class) => {
                out.extend(class.annotations.iter().map(NodeRef::Annotation));
                out.extend(class.enum_constants.iter().map(NodeRef::EnumConstant));
                out.extend(class.fields.iter().map(NodeRef::Field));
                out.extend(class.initializers.iter().map(NodeRef::Initializer));
                out.extend(class.constructors.iter().map(NodeRef::Constructor));
                out.extend(class.methods.iter().map(NodeRef::Method));
                out.extend(class.member_types.iter().map(NodeRef::Class));
            }
            NodeRef::Field(field) => {
                out.extend(field.annotations.iter().map(NodeRef::Annotation));
                out.extend(field.init.iter().map(NodeRef::Expression));
            }
            NodeRef::Method(method) => {
                out.extend(method.annotations.iter().map(NodeRef::Annotation));
                out.extend(method.args.iter().map(NodeRef::Argument));
                out.extend(method.statements.iter().map(NodeRef::Statement));
            }
            NodeRef::Constructor(ctor) => {
                out.extend(ctor.annotations.iter().map(NodeRef::Annotation));
                out.extend(ctor.args.iter().map(NodeRef::Argument));
                out.extend(ctor.statements.iter().map(NodeRef::Statement));
            }
            NodeRef::Initializer(init) => out.extend(init.statements.iter().map(NodeRef::Statement)),
            NodeRef::EnumConstant(constant) => out.extend(constant.args.iter().map(NodeRef::Expression)),
            NodeRef::Argument(arg) => out.extend(arg.annotations.iter().map(NodeRef::Annotation)),
            NodeRef::LocalDecl(local) => {
                out.extend(local.annotations.iter().map(NodeRef::Annotation));
                out.extend(local.init.iter().map(NodeRef::Expression));
            }
            NodeRef::Annotation(ann) => out.extend(ann.values.iter().map(|v| NodeRef::Expression(&v.value))),
            NodeRef::Block(block) => out.extend(block.statements.iter().map(NodeRef::Statement)),
            NodeRef::Case(case) => {
                out.extend(case.label.iter().map(NodeRef::Expression));
                out.extend(case.statements.iter().map(NodeRef::Statement));
            }
            NodeRef::Catch(catch) => {
                out.push(NodeRef::Argument(&catch.param));
                out.push(NodeRef::Block(&catch.body));
            }
            NodeRef::Statement(stmt) => statement_children(stmt, &mut out),
            NodeRef::Expression(expr) => expression_children(expr, &mut out),
        }
        out
    }
}

fn statement_children<'a>(stmt: &'a Statement, out: &mut Vec<NodeRef<'a>>) {
    match stmt {
        Statement::Block(block) => out.extend(block.statements.iter().map(NodeRef::Statement)),
        Statement::Expression(e) | Statement::Throw(e) => out.push(NodeRef::Expression(e)),
        Statement::LocalDecl(local) => out.push(NodeRef::LocalDecl(local)),
        Statement::If(n) => {
            out.push(NodeRef::Expression(&n.cond));
            out.push(NodeRef::Statement(&n.then));
            out.extend(n.otherwise.as_deref().map(NodeRef::Statement));
        }
        Statement::While(n) => {
            out.push(NodeRef::Expression(&n.cond));
            out.push(NodeRef::Statement(&n.body));
        }
        Statement::DoWhile(n) => {
            out.push(NodeRef::Statement(&n.body));
            out.push(NodeRef::Expression(&n.cond));
        }
        Statement::For(n) => {
            out.extend(n.init.iter().map(NodeRef::Statement));
            out.extend(n.cond.iter().map(NodeRef::Expression));
            out.extend(n.update.iter().map(NodeRef::Expression));
            out.push(NodeRef::Statement(&n.body));
        }
        Statement::Foreach(n) => {
            out.push(NodeRef::LocalDecl(&n.var));
            out.push(NodeRef::Expression(&n.iterable));
            out.push(NodeRef::Statement(&n.body));
        }
        Statement::Switch(n) => {
            out.push(NodeRef::Expression(&n.selector));
            out.extend(n.cases.iter().map(NodeRef::Case));
        }
        Statement::Try(n) => {
            out.push(NodeRef::Block(&n.body));
            out.extend(n.catches.iter().map(NodeRef::Catch));
            out.extend(n.finally.iter().map(NodeRef::Block));
        }
        Statement::Synchronized(n) => {
            out.push(NodeRef::Expression(&n.lock));
            out.push(NodeRef::Block(&n.body));
        }
        Statement::Return(value) => out.extend(value.iter().map(NodeRef::Expression)),
        Statement::Labeled(n) => out.push(NodeRef::Statement(&n.body)),
        Statement::LocalClass(class) => out.push(NodeRef::Class(class)),
        Statement::ReturnDefault
        | Statement::Break(_)
        | Statement::Continue(_)
        | Statement::Empty
        | Statement::Wrapped(_) => {}
    }
}

fn expression_children<'a>(expr: &'a Expression, out: &mut Vec<NodeRef<'a>>) {
    match expr {
        Expression::FieldRef(n) => out.push(NodeRef::Expression(&n.receiver)),
        Expression::ArrayRef(n) => {
            out.push(NodeRef::Expression(&n.array));
            out.push(NodeRef::Expression(&n.index));
        }
        Expression::Call(n) => {
            out.extend(n.receiver.as_deref().map(NodeRef::Expression));
            out.extend(n.args.iter().map(NodeRef::Expression));
        }
        Expression::New(n) => {
            out.extend(n.args.iter().map(NodeRef::Expression));
            out.extend(n.body.as_deref().map(NodeRef::Class));
        }
        Expression::NewArray(n) => {
            out.extend(n.dims.iter().map(NodeRef::Expression));
            if let Some(init) = &n.init {
                out.extend(init.elements.iter().map(NodeRef::Expression));
            }
        }
        Expression::ArrayInit(n) => out.extend(n.elements.iter().map(NodeRef::Expression)),
        Expression::Binary(n) => {
            out.push(NodeRef::Expression(&n.left));
            out.push(NodeRef::Expression(&n.right));
        }
        Expression::Unary(n) => out.push(NodeRef::Expression(&n.operand)),
        Expression::Assign(n) => {
            out.push(NodeRef::Expression(&n.target));
            out.push(NodeRef::Expression(&n.value));
        }
        Expression::InstanceOf(n) => out.push(NodeRef::Expression(&n.expr)),
        Expression::Cast(n) => out.push(NodeRef::Expression(&n.expr)),
        Expression::Conditional(n) => {
            out.push(NodeRef::Expression(&n.cond));
            out.push(NodeRef::Expression(&n.then));
            out.push(NodeRef::Expression(&n.otherwise));
        }
        Expression::Annotation(ann) => out.push(NodeRef::Annotation(ann)),
        Expression::Name(_)
        | Expression::This(_)
        | Expression::Literal(_)
        | Expression::ClassLiteral(_)
        | Expression::Wrapped(_) => {}
    }
}

/// The chain from a root to the node currently being visited.
#[derive(Debug, Default)]
pub struct NodePath<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> NodePath<'a> {
    pub fn current(&self) -> Option<NodeRef<'a>> {
        self.stack.last().copied()
    }

    /// The direct parent of the current node.
    pub fn up(&self) -> Option<NodeRef<'a>> {
        self.stack.len().checked_sub(2).map(|i| self.stack[i])
    }

    /// The nearest strict ancestor of the given kind.
    pub fn up_to(&self, kind: NodeKind) -> Option<NodeRef<'a>> {
        let ancestors = &self.stack[..self.stack.len().saturating_sub(1)];
        ancestors.iter().rev().copied().find(|n| n.kind() == kind)
    }

    pub fn enclosing_class(&self) -> Option<&'a ClassDecl> {
        match self.up_to(NodeKind::Class)? {
            NodeRef::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn enclosing_method(&self) -> Option<&'a MethodDecl> {
        match self.up_to(NodeKind::Method)? {
            NodeRef::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        self.stack.iter().rev().skip(1).copied()
    }
}

/// Visit `root` and every descendant pre-order, handing `f` the path to each.
pub fn walk_with_path<'a>(root: NodeRef<'a>, f: &mut dyn FnMut(&NodePath<'a>)) {
    let mut path = NodePath::default();
    walk_inner(root, &mut path, f);
}

fn walk_inner<'a>(node: NodeRef<'a>, path: &mut NodePath<'a>, f: &mut dyn FnMut(&NodePath<'a>)) {
    path.stack.push(node);
    f(path);
    for child in node.children() {
        walk_inner(child, path, f);
    }
    path.stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::*;

    fn sample_unit() -> CompilationUnit {
        let run = method(TypeRef::void(), "run")
            .stmt(if_(eq(name("a"), null())).then(block().stmt(return_void())))
            .stmt(try_(block().stmt(call("work"))).catch_(arg(ty("Exception"), "e"), block().stmt(throw_(name("e")))));
        CompilationUnit::new("A.java").with_type(
            class_decl("A")
                .with_field(field_decl(ty("int"), "x").init(int(1)))
                .with_method(run)
                .with_member_type(class_decl("B").with_method(method(ty("int"), "get").stmt(return_(name("x"))))),
        )
    }

    #[test]
    fn test_every_child_reports_its_parent() {
        let unit = sample_unit();
        let mut checked = 0;
        walk_with_path(NodeRef::Unit(&unit), &mut |path| {
            let (Some(node), Some(parent)) = (path.current(), path.up()) else {
                return;
            };
            assert!(parent.children().iter().any(|c| c.ptr_eq(&node)));
            checked += 1;
        });
        assert!(checked > 10);
    }

    #[test]
    fn test_up_to_finds_nearest_enclosing_class() {
        let unit = sample_unit();
        let mut seen = Vec::new();
        walk_with_path(NodeRef::Unit(&unit), &mut |path| {
            if let Some(NodeRef::Expression(Expression::Name(n))) = path.current() {
                let class = path.enclosing_class().map(|c| c.name.clone());
                let method = path.enclosing_method().map(|m| m.name.clone());
                seen.push((n.clone(), class, method));
            }
        });
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), Some("A".to_string()), Some("run".to_string())),
                ("e".to_string(), Some("A".to_string()), Some("run".to_string())),
                ("x".to_string(), Some("B".to_string()), Some("get".to_string())),
            ]
        );
    }

    #[test]
    fn test_root_has_no_parent() {
        let unit = sample_unit();
        let mut roots = 0;
        walk_with_path(NodeRef::Unit(&unit), &mut |path| {
            if path.up().is_none() {
                roots += 1;
                assert!(path.up_to(NodeKind::Unit).is_none());
            }
        });
        assert_eq!(roots, 1);
    }
}
