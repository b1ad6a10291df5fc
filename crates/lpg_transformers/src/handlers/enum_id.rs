//! `@EnumId`: a static reverse lookup from a field value to its enum
//! constant, plus the field's getter.

use super::usage;
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_core::names::{capitalize, constant_case, getter_name};
use lpg_diagnostics::messages;

/// Members generated for one id field.
struct Lookup {
    map: FieldDecl,
    fill: Initializer,
    finder: MethodDecl,
    getter: MethodDecl,
}

fn lookup(enum_type: &TypeRef, field: &FieldDecl) -> Lookup {
    let key = field.ty.boxed();
    let map_name = format!("${}_LOOKUP", constant_case(&field.name));
    let map = || name(map_name.clone());
    let map_type = |raw: &str| TypeRef::new(raw).arg(key.clone()).arg(enum_type.clone());

    let fill = static_initializer().stmt(foreach(
        local(enum_type.clone(), "$value").final_(),
        call("values").on(name(enum_type.simple_name())),
        call("put").on(map()).arg(field_ref(name("$value"), field.name.clone())).arg(name("$value")),
    ));

    let message = format!(
        "Enumeration '{}' has no value for '{} = %s'",
        enum_type.simple_name(),
        field.name
    );
    let finder = method(enum_type.clone(), format!("findBy{}", capitalize(&field.name)))
        .public()
        .static_()
        .with_arg(arg(field.ty.clone(), field.name.clone()).final_())
        .stmt(
            if_(call("containsKey").on(map()).arg(name(field.name.clone())))
                .then(return_(call("get").on(map()).arg(name(field.name.clone())))),
        )
        .stmt(throw_(
            new_(TypeRef::new("java.lang.IllegalArgumentException")).arg(
                call("format")
                    .on(name("java.lang.String"))
                    .arg(string(message))
                    .arg(name(field.name.clone())),
            ),
        ));

    let getter = method(field.ty.clone(), getter_name(&field.name, field.ty.is_boolean()))
        .public()
        .stmt(return_(this_field(field.name.clone())));

    Lookup {
        map: field_decl(map_type("java.util.Map"), map_name.clone())
            .private()
            .static_()
            .final_()
            .init(new_(map_type("java.util.HashMap"))),
        fill,
        finder,
        getter,
    }
}

pub struct EnumIdHandler;

impl Handler for EnumIdHandler {
    fn name(&self) -> &'static str {
        "EnumId"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["EnumId"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let Target::Field(index) = target else {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_AN_ENUM));
        };
        if !editor.is_enum() {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_AN_ENUM));
        }
        let field = editor.field(index)?.decl().clone();
        if field.is_static() {
            return Err(usage(ctx, &messages::_0_REQUIRES_AN_INSTANCE_FIELD));
        }

        let generated = lookup(&editor.type_ref(), &field);
        if editor.has_field(&generated.map.name) {
            ctx.warn(&messages::FIELD_0_ALREADY_EXISTS, &[&generated.map.name]);
        } else {
            editor.inject_field(generated.map);
            editor.inject_initializer(generated.fill);
        }
        if editor.has_method(&generated.finder.name, Some(1)) {
            ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[&generated.finder.name]);
        } else {
            editor.inject_method(generated.finder);
        }
        if !editor.has_method(&generated.getter.name, Some(0)) {
            editor.inject_method(generated.getter);
        }
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_keyed_by_boxed_type() {
        let field = field_decl(ty("int"), "code").private().final_();
        let generated = lookup(&ty("Status"), &field);
        assert_eq!(generated.map.name, "$CODE_LOOKUP");
        assert_eq!(
            generated.map.ty,
            ty("java.util.Map").arg(ty("Integer")).arg(ty("Status"))
        );
        assert_eq!(generated.finder.name, "findByCode");
        assert_eq!(generated.getter.name, "getCode");
        assert!(generated.fill.is_static);
    }
}
