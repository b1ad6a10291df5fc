//! `@FluentSetter`: `public Type f(final F f) { this.f = f; return this; }`.

use super::{access_value, check_settable_field, settable_fields, usage, values};
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

pub struct FluentSetterHandler;

fn fluent_setter(owner: TypeRef, field: &FieldDecl, access: AccessLevel) -> MethodDecl {
    method(owner, field.name.clone())
        .with_access(access)
        .with_arg(arg(field.ty.clone(), field.name.clone()).final_())
        .stmt(assign(this_field(field.name.clone()), name(field.name.clone())))
        .stmt(return_(this()))
}

impl Handler for FluentSetterHandler {
    fn name(&self) -> &'static str {
        "FluentSetter"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["FluentSetter"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if editor.is_interface() {
            return Err(usage(ctx, &messages::_0_IS_NOT_SUPPORTED_ON_INTERFACES_OR_ANNOTATIONS));
        }
        let access = access_value(&values(ctx)?, AccessLevel::Public)?;
        let fields: Vec<FieldDecl> = match target {
            Target::Type => settable_fields(editor.class(), "FluentSetter")
                .into_iter()
                .map(|(_, f)| f.clone())
                .collect(),
            Target::Field(index) => {
                let field = editor.field(index)?.decl().clone();
                check_settable_field(ctx, &field)?;
                vec![field]
            }
            Target::Method(_) => return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS_OR_FIELD)),
        };

        let owner = editor.type_ref();
        for field in &fields {
            if editor.has_method(&field.name, Some(1)) {
                ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[&field.name]);
                continue;
            }
            editor.inject_method(fluent_setter(owner.clone(), field, access));
        }
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_setter_shape() {
        let field = field_decl(ty("int"), "age").private();
        let setter = fluent_setter(ty("Person"), &field, AccessLevel::Public);
        assert_eq!(setter.return_type, ty("Person"));
        assert!(setter.args[0].is_final());
        assert_eq!(setter.statements.len(), 2);
        assert_eq!(setter.statements[1], return_(this()));
    }
}
