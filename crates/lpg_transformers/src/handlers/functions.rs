//! `@Action`, `@Function` and `@Predicate`: turn a method into a
//! zero-argument accessor returning a function object.
//!
//! ```text
//! @Function static String upper(final String s) { return s.toUpperCase(); }
//! // becomes
//! static lombok.Functions.Function1<String, String> upper() {
//!     return new lombok.Functions.Function1<String, String>() {
//!         public String apply(final String s) { return s.toUpperCase(); }
//!     };
//! }
//! ```

use super::{final_args, method_target, qualify_this, usage, values};
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Action,
    Function,
    Predicate,
}

impl Kind {
    fn from_annotation(simple: &str) -> Self {
        match simple {
            "Action" => Kind::Action,
            "Predicate" => Kind::Predicate,
            _ => Kind::Function,
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            Kind::Action | Kind::Function => "lombok.Functions",
            Kind::Predicate => "lombok.Predicates",
        }
    }

    fn method_name(self) -> &'static str {
        match self {
            Kind::Action | Kind::Function => "apply",
            Kind::Predicate => "evaluate",
        }
    }

    /// Whether a method returning `ty` fits; otherwise the phrase for the error.
    fn check_return(self, ty: &TypeRef) -> Result<(), &'static str> {
        match self {
            Kind::Action if !ty.is_void() => Err("returning void"),
            Kind::Predicate if !ty.is_boolean() => Err("returning boolean"),
            Kind::Function if ty.is_void() => Err("returning a value"),
            _ => Ok(()),
        }
    }

    fn interface(self, template: &str, decl: &MethodDecl) -> TypeRef {
        let simple = match self {
            Kind::Action => "Action",
            Kind::Function => "Function",
            Kind::Predicate => "Predicate",
        };
        let mut ty = TypeRef::new(format!("{}.{}{}", template, simple, decl.args.len()))
            .args(decl.args.iter().map(|a| a.ty.boxed()));
        if self == Kind::Function {
            ty = ty.arg(decl.return_type.boxed());
        }
        ty
    }

    /// The return type of the implementing method.
    fn result(self, decl: &MethodDecl) -> TypeRef {
        match self {
            Kind::Action => TypeRef::void(),
            Kind::Function => decl.return_type.boxed(),
            Kind::Predicate => TypeRef::new("boolean"),
        }
    }
}

fn function_object(kind: Kind, template: &str, owner: &str, decl: &MethodDecl) -> (TypeRef, Vec<Statement>) {
    let interface_type = kind.interface(template, decl);
    let mut statements = decl.statements.clone();
    if !decl.is_static() {
        qualify_this(&mut statements, owner);
    }
    let mut params = final_args(&decl.args);
    for param in &mut params {
        param.ty = param.ty.boxed();
    }
    let implementation = method(kind.result(decl), kind.method_name())
        .public()
        .implementing()
        .with_args(params)
        .stmts(statements);
    let object = new_(interface_type.clone()).body(class_decl("").make_anonymous().with_method(implementation));
    (interface_type, vec![return_(object)])
}

pub struct FunctionsHandler;

impl Handler for FunctionsHandler {
    fn name(&self) -> &'static str {
        "ActionFunctionAndPredicate"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["Action", "Function", "Predicate"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let kind = Kind::from_annotation(ctx.annotation_name());
        let decl = editor.method(index)?;
        if decl.no_body || decl.is_abstract() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS));
        }
        if let Err(expected) = kind.check_return(&decl.return_type) {
            return Err(HandlerError::usage(
                &messages::_0_CAN_ONLY_BE_USED_ON_METHODS_1,
                &[ctx.annotation_name(), expected],
            ));
        }
        let template = values(ctx)?
            .class("value")?
            .map(|t| t.name)
            .unwrap_or_else(|| kind.default_template().to_string());

        let (returns, body) = function_object(kind, &template, editor.name(), decl);
        let mut method_editor = editor.method_editor(index)?;
        method_editor.replace_arguments(Vec::new());
        method_editor.replace_return_type(returns);
        method_editor.replace_body(body);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_type_arguments_are_boxed() {
        let decl = method(ty("int"), "twice")
            .static_()
            .with_arg(arg(ty("int"), "x"))
            .stmt(return_(add(name("x"), name("x"))));
        let (returns, body) = function_object(Kind::Function, "lombok.Functions", "Math", &decl);
        assert_eq!(returns, ty("lombok.Functions.Function1").arg(ty("Integer")).arg(ty("Integer")));
        let Statement::Return(Some(Expression::New(object))) = &body[0] else {
            panic!("expected return of a function object");
        };
        let apply = &object.body.as_ref().unwrap().methods[0];
        assert_eq!(apply.name, "apply");
        assert!(apply.implementing);
        assert_eq!(apply.args[0].ty, ty("Integer"));
        assert!(apply.args[0].is_final());
    }

    #[test]
    fn test_return_type_checks() {
        assert_eq!(Kind::Action.check_return(&ty("int")), Err("returning void"));
        assert_eq!(Kind::Predicate.check_return(&ty("boolean")), Ok(()));
        assert_eq!(Kind::Function.check_return(&TypeRef::void()), Err("returning a value"));
    }
}
