//! Generator detection and the checks run before any rewriting.

use crate::error::{HandlerError, HandlerResult};
use lpg_ast::visitor::{walk_class, walk_expression, walk_statement, AstVisitor};
use lpg_ast::*;
use lpg_diagnostics::messages;

/// The element type and interfaces of a generator method.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Generator {
    pub element: TypeRef,
    /// Returns `Iterable<T>` rather than `Iterator<T>`.
    pub iterable: bool,
}

pub(super) fn as_yield(stmt: &Statement) -> Option<&Call> {
    match stmt {
        Statement::Expression(Expression::Call(call)) if is_yield(call) => Some(call),
        _ => None,
    }
}

fn is_yield(call: &Call) -> bool {
    call.receiver.is_none() && call.name == "yield"
}

#[derive(Default)]
struct YieldFinder {
    found: bool,
}

impl<'a> AstVisitor<'a> for YieldFinder {
    fn visit_class(&mut self, _class: &'a ClassDecl) {}

    fn visit_expression(&mut self, expr: &'a Expression) {
        if self.found {
            return;
        }
        if let Expression::Call(call) = expr {
            if is_yield(call) {
                self.found = true;
                return;
            }
        }
        walk_expression(self, expr);
    }
}

/// Whether `method` calls `yield(...)` outside nested classes.
pub fn uses_yield(method: &MethodDecl) -> bool {
    let mut finder = YieldFinder::default();
    for stmt in &method.statements {
        finder.visit_statement(stmt);
    }
    finder.found
}

pub(super) fn contains_yield(stmt: &Statement) -> bool {
    let mut finder = YieldFinder::default();
    finder.visit_statement(stmt);
    finder.found
}

fn generator(return_type: &TypeRef) -> Option<Generator> {
    if return_type.dims != 0 {
        return None;
    }
    let iterable = return_type.is_named("Iterable");
    if !iterable && !return_type.is_named("Iterator") {
        return None;
    }
    let element = match return_type.type_args.first() {
        None => TypeRef::object(),
        Some(arg) => match arg.wildcard {
            None => arg.clone(),
            Some(Wildcard::Extends) => TypeRef {
                wildcard: None,
                ..arg.clone()
            },
            Some(Wildcard::Unbound | Wildcard::Super) => TypeRef::object(),
        },
    };
    Some(Generator { element, iterable })
}

#[derive(Default)]
struct YieldCheck {
    classes: usize,
    synchronized: usize,
    error: Option<HandlerError>,
}

impl YieldCheck {
    fn fail(&mut self, message: &'static lpg_diagnostics::DiagnosticMessage) {
        if self.error.is_none() {
            self.error = Some(HandlerError::usage(message, &[]));
        }
    }
}

impl<'a> AstVisitor<'a> for YieldCheck {
    fn visit_class(&mut self, class: &'a ClassDecl) {
        self.classes += 1;
        walk_class(self, class);
        self.classes -= 1;
    }

    fn visit_statement(&mut self, stmt: &'a Statement) {
        if let Some(call) = as_yield(stmt) {
            if self.classes > 0 {
                self.fail(&messages::YIELD_NOT_ALLOWED_IN_NESTED_CLASS);
            } else if self.synchronized > 0 {
                self.fail(&messages::YIELD_NOT_ALLOWED_IN_SYNCHRONIZED);
            } else if call.args.len() != 1 {
                self.fail(&messages::YIELD_TAKES_ONE_ARGUMENT);
            }
            for arg in &call.args {
                self.visit_expression(arg);
            }
            return;
        }
        match stmt {
            Statement::Synchronized(n) => {
                self.visit_expression(&n.lock);
                self.synchronized += 1;
                self.visit_block(&n.body);
                self.synchronized -= 1;
            }
            Statement::Return(Some(_)) if self.classes == 0 => {
                self.fail(&messages::YIELD_CANNOT_RETURN_A_VALUE);
            }
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, expr: &'a Expression) {
        if let Expression::Call(call) = expr {
            if is_yield(call) {
                if self.classes > 0 {
                    self.fail(&messages::YIELD_NOT_ALLOWED_IN_NESTED_CLASS);
                } else {
                    self.fail(&messages::YIELD_MUST_BE_A_STATEMENT);
                }
            }
        }
        walk_expression(self, expr);
    }
}

/// Rejects methods the state machine cannot express.
pub(super) fn check(decl: &MethodDecl) -> HandlerResult<Generator> {
    let Some(shape) = generator(&decl.return_type) else {
        return Err(HandlerError::usage(
            &messages::YIELD_METHOD_0_MUST_RETURN_ITERATOR_OR_ITERABLE,
            &[&decl.name],
        ));
    };
    if let Some(param) = decl.args.iter().find(|a| !a.is_final()) {
        return Err(HandlerError::usage(&messages::YIELD_PARAMETER_0_MUST_BE_FINAL, &[&param.name]));
    }
    let mut check = YieldCheck::default();
    for stmt in &decl.statements {
        check.visit_statement(stmt);
    }
    match check.error {
        Some(err) => Err(err),
        None => Ok(shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    fn yield_(value: Expression) -> Statement {
        call("yield").arg(value).into()
    }

    fn code(err: HandlerError) -> u32 {
        err.to_diagnostic("yield").code
    }

    fn generator_method(return_type: TypeRef) -> MethodDecl {
        method(return_type, "numbers").stmt(yield_(int(1)))
    }

    #[test]
    fn test_uses_yield_ignores_nested_classes_and_qualified_calls() {
        let nested = method(ty("Object"), "f").stmt(
            local(ty("Object"), "o").init(
                new_(ty("Object")).body(class_decl("").with_method(method(TypeRef::void(), "g").stmt(yield_(int(1))))),
            ),
        );
        assert!(!uses_yield(&nested));
        let qualified = method(TypeRef::void(), "f").stmt(call("yield").on(name("Thread")));
        assert!(!uses_yield(&qualified));
        assert!(uses_yield(&generator_method(ty("Iterator").arg(ty("Integer")))));
    }

    #[test]
    fn test_element_type_from_return_type() {
        let shape = check(&generator_method(ty("java.lang.Iterable").arg(ty("String")))).unwrap();
        assert_eq!(shape.element, ty("String"));
        assert!(shape.iterable);

        let raw = check(&generator_method(ty("Iterator"))).unwrap();
        assert_eq!(raw.element, TypeRef::object());
        assert!(!raw.iterable);

        let bounded = check(&generator_method(ty("Iterator").arg(TypeRef::extends_wildcard(ty("Number"))))).unwrap();
        assert_eq!(bounded.element, ty("Number"));
    }

    #[test]
    fn test_rejects_wrong_return_type() {
        let err = check(&generator_method(ty("java.util.List").arg(ty("String")))).map_err(code).unwrap_err();
        assert_eq!(err, 2201);
    }

    #[test]
    fn test_rejects_non_final_parameter() {
        let decl = generator_method(ty("Iterator").arg(ty("Integer"))).with_arg(arg(ty("int"), "n"));
        assert_eq!(check(&decl).map_err(code).unwrap_err(), 2202);
    }

    #[test]
    fn test_rejects_return_value_but_not_in_nested_class() {
        let decl = generator_method(ty("Iterator").arg(ty("Integer"))).stmt(return_(null()));
        assert_eq!(check(&decl).map_err(code).unwrap_err(), 2203);

        let nested = generator_method(ty("Iterator").arg(ty("Integer"))).stmt(
            local(ty("Object"), "o").init(
                new_(ty("Object")).body(class_decl("").with_method(method(ty("Object"), "g").stmt(return_(null())))),
            ),
        );
        assert!(check(&nested).is_ok());
    }

    #[test]
    fn test_rejects_yield_in_synchronized_and_as_expression() {
        let decl = method(ty("Iterator").arg(ty("Integer")), "f")
            .stmt(synchronized(this(), block().stmt(yield_(int(1)))));
        assert_eq!(check(&decl).map_err(code).unwrap_err(), 2204);

        let decl = method(ty("Iterator").arg(ty("Integer")), "f")
            .stmt(local(ty("Object"), "x").init(call("yield").arg(int(1))));
        assert_eq!(check(&decl).map_err(code).unwrap_err(), 2205);

        let decl = method(ty("Iterator").arg(ty("Integer")), "f").stmt(call("yield").arg(int(1)).arg(int(2)));
        assert_eq!(check(&decl).map_err(code).unwrap_err(), 2207);
    }
}
