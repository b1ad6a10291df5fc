//! `@BoundSetter`: JavaBeans bound (and optionally vetoable) properties.
//!
//! Each setter fires a `PropertyChangeEvent` named by a `PROP_<FIELD>`
//! constant. The change support objects are created lazily under a lock
//! field, and are shared by every bound setter of the type.

use super::{access_value, check_settable_field, settable_fields, usage, values};
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_core::names::{constant_case, setter_name};
use lpg_diagnostics::messages;

const PROPERTY_SUPPORT: Support = Support {
    field: "$propertyChangeSupport",
    lock: "$propertyChangeSupportLock",
    getter: "getPropertyChangeSupport",
    ty: "java.beans.PropertyChangeSupport",
    listener: "java.beans.PropertyChangeListener",
    add: "addPropertyChangeListener",
    remove: "removePropertyChangeListener",
    fire: "firePropertyChange",
    thrown: None,
};

const VETOABLE_SUPPORT: Support = Support {
    field: "$vetoableChangeSupport",
    lock: "$vetoableChangeSupportLock",
    getter: "getVetoableChangeSupport",
    ty: "java.beans.VetoableChangeSupport",
    listener: "java.beans.VetoableChangeListener",
    add: "addVetoableChangeListener",
    remove: "removeVetoableChangeListener",
    fire: "fireVetoableChange",
    thrown: Some(VETO_EXCEPTION),
};

const VETO_EXCEPTION: &str = "java.beans.PropertyVetoException";

/// The member names of one kind of change support.
struct Support {
    field: &'static str,
    lock: &'static str,
    getter: &'static str,
    ty: &'static str,
    listener: &'static str,
    add: &'static str,
    remove: &'static str,
    fire: &'static str,
    thrown: Option<&'static str>,
}

impl Support {
    /// Schedule whatever part of the support is not already present.
    fn inject(&self, editor: &mut TypeEditor<'_>) {
        let support = TypeRef::new(self.ty);
        if !editor.has_field(self.field) {
            editor.inject_field(field_decl(support.clone(), self.field).private().transient().volatile());
        }
        if !editor.has_field(self.lock) {
            editor.inject_field(
                field_decl(TypeRef::object().array_of(), self.lock)
                    .private()
                    .final_()
                    .init(new_array(TypeRef::object(), int(0))),
            );
        }
        if !editor.has_method(self.getter, Some(0)) {
            let create = if_(eq(this_field(self.field), null()))
                .then(assign(this_field(self.field), new_(support.clone()).arg(this())));
            editor.inject_method(
                method(support, self.getter)
                    .private()
                    .stmt(if_(eq(this_field(self.field), null())).then(synchronized(
                        this_field(self.lock),
                        block().stmt(create),
                    )))
                    .stmt(return_(this_field(self.field))),
            );
        }
        let listener = TypeRef::new(self.listener);
        for registration in [self.add, self.remove] {
            if editor.has_method(registration, Some(1)) {
                continue;
            }
            editor.inject_method(
                method(TypeRef::void(), registration)
                    .public()
                    .with_arg(arg(listener.clone(), "listener").final_())
                    .stmt(call(registration).on(call(self.getter).on(this())).arg(name("listener"))),
            );
        }
        if !editor.has_method(self.fire, Some(3)) {
            editor.inject_method(
                method(TypeRef::void(), self.fire)
                    .protected()
                    .with_arg(arg(TypeRef::string(), "propertyName").final_())
                    .with_arg(arg(TypeRef::object(), "oldValue").final_())
                    .with_arg(arg(TypeRef::object(), "newValue").final_())
                    .with_thrown_types(self.thrown.map(TypeRef::new))
                    .stmt(
                        call(self.fire)
                            .on(call(self.getter).on(this()))
                            .arg(name("propertyName"))
                            .arg(name("oldValue"))
                            .arg(name("newValue")),
                    ),
            );
        }
    }
}

/// How a vetoable setter reacts to a veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Veto {
    None,
    /// The setter declares `PropertyVetoException`.
    Throw,
    /// The veto is swallowed and the assignment skipped.
    Ignore,
}

fn bound_setter(field: &FieldDecl, constant: &str, access: AccessLevel, veto: Veto) -> MethodDecl {
    let value = name(field.name.clone());
    let mut setter = method(TypeRef::void(), setter_name(&field.name, field.ty.is_boolean()))
        .with_access(access)
        .with_arg(arg(field.ty.clone(), field.name.clone()).final_())
        .stmt(local(field.ty.clone(), "$old").final_().init(this_field(field.name.clone())));
    let fire_veto = call(VETOABLE_SUPPORT.fire)
        .on(this())
        .arg(name(constant))
        .arg(name("$old"))
        .arg(value.clone());
    setter = match veto {
        Veto::None => setter,
        Veto::Throw => setter.with_thrown(TypeRef::new(VETO_EXCEPTION)).stmt(fire_veto),
        Veto::Ignore => setter.stmt(
            try_(block().stmt(fire_veto)).catch_(
                arg(TypeRef::new(VETO_EXCEPTION), "$e").final_(),
                block().stmt(return_void()),
            ),
        ),
    };
    setter
        .stmt(assign(this_field(field.name.clone()), value.clone()))
        .stmt(
            call(PROPERTY_SUPPORT.fire)
                .on(this())
                .arg(name(constant))
                .arg(name("$old"))
                .arg(value),
        )
}

pub struct BoundSetterHandler;

impl Handler for BoundSetterHandler {
    fn name(&self) -> &'static str {
        "BoundSetter"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["BoundSetter"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if editor.is_interface() {
            return Err(usage(ctx, &messages::_0_IS_NOT_SUPPORTED_ON_INTERFACES_OR_ANNOTATIONS));
        }
        let v = values(ctx)?;
        let access = access_value(&v, AccessLevel::Public)?;
        let veto = match (v.bool_or("vetoable", false)?, v.bool_or("throwVetoException", false)?) {
            (_, true) => Veto::Throw,
            (true, false) => Veto::Ignore,
            (false, false) => Veto::None,
        };
        let fields: Vec<FieldDecl> = match target {
            Target::Type => settable_fields(editor.class(), "BoundSetter")
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

        PROPERTY_SUPPORT.inject(&mut editor);
        if veto != Veto::None {
            VETOABLE_SUPPORT.inject(&mut editor);
        }
        for field in &fields {
            let constant = format!("PROP_{}", constant_case(&field.name));
            if !editor.has_field(&constant) {
                editor.inject_field(
                    field_decl(TypeRef::string(), constant.clone())
                        .public()
                        .static_()
                        .final_()
                        .init(string(field.name.clone())),
                );
            }
            let setter = setter_name(&field.name, field.ty.is_boolean());
            if editor.has_method(&setter, Some(1)) {
                ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[&setter]);
                continue;
            }
            editor.inject_method(bound_setter(field, &constant, access, veto));
        }
        tracing::trace!(fields = fields.len(), ?veto, "bound setters scheduled");
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}
