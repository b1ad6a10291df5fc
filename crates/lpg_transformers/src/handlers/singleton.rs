//! `@Singleton`: a single lazily available instance behind
//! `public static T getInstance()`.
//!
//! `ENUM` style turns the class into an enum with one `INSTANCE` constant;
//! `HOLDER` style keeps the class and adds a nested holder whose static
//! initializer creates the instance.

use super::{usage, values};
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;
use lpg_options::SingletonStyle;

const INSTANCE: &str = "INSTANCE";
const GET_INSTANCE: &str = "getInstance";

fn holder(owner: &TypeRef, holder_name: &str) -> ClassDecl {
    class_decl(holder_name).private().static_().with_field(
        field_decl(owner.clone(), INSTANCE)
            .private()
            .static_()
            .final_()
            .init(new_(owner.clone())),
    )
}

fn get_instance(owner: &TypeRef, instance: Expression) -> MethodDecl {
    method(owner.clone(), GET_INSTANCE)
        .public()
        .static_()
        .stmt(return_(instance))
}

pub struct SingletonHandler;

impl Handler for SingletonHandler {
    fn name(&self) -> &'static str {
        "Singleton"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["Singleton"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if target != Target::Type || editor.is_interface() || editor.is_enum() {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS));
        }
        if editor.is_local_or_anonymous() {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_STATIC_OR_INSTANCE_CLASSES));
        }
        let style = match values(ctx)?.enum_constant("style")? {
            Some(constant) => SingletonStyle::from_constant(&constant)
                .ok_or_else(|| HandlerError::usage(&messages::INVALID_VALUE_FOR_0_1, &["style", &constant]))?,
            None => ctx.options.singleton_style(),
        };
        if style == SingletonStyle::Enum {
            if let Some(superclass) = &editor.class().superclass {
                return Err(HandlerError::usage(
                    &messages::SINGLETON_ENUM_CANNOT_EXTEND_0,
                    &[&superclass.name],
                ));
            }
        }

        let owner = editor.type_ref();
        let holder_name = format!("{}Holder", editor.name());
        let instance = match style {
            SingletonStyle::Enum => {
                editor.convert_to_enum(vec![enum_constant(INSTANCE)]);
                name(INSTANCE)
            }
            SingletonStyle::Holder => {
                if editor.has_type(&holder_name) {
                    ctx.warn(&messages::TYPE_0_ALREADY_EXISTS, &[&holder_name]);
                    return Ok(Outcome::Skipped);
                }
                editor.inject_type(holder(&owner, &holder_name));
                field_ref(name(holder_name.clone()), INSTANCE)
            }
        };

        for index in 0..editor.constructors().len() {
            editor.set_constructor_access(index, AccessLevel::Package);
        }
        if editor.constructors().is_empty() {
            let type_name = editor.name().to_string();
            editor.inject_constructor(constructor(type_name).with_access(AccessLevel::Package));
        }
        if editor.has_method(GET_INSTANCE, Some(0)) {
            ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[GET_INSTANCE]);
        } else {
            editor.inject_method(get_instance(&owner, instance));
        }
        tracing::trace!(?style, "singleton scheduled");
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}
