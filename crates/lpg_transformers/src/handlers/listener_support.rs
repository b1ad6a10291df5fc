//! `@ListenerSupport({L.class, ...})`: listener registration and one
//! `fire<Method>` per listener method.

use super::{arg_names, usage, values};
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use crate::resolver::{MethodSignature, TypeResolver};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_core::names::capitalize;
use lpg_diagnostics::messages;
use rustc_hash::FxHashMap;

const EVENT_LISTENER: &str = "java.util.EventListener";

/// Replace type parameters of the listener with the arguments it was
/// referenced with.
fn substitute(ty: &TypeRef, bindings: &FxHashMap<String, TypeRef>) -> TypeRef {
    if ty.type_args.is_empty() && ty.dims == 0 {
        if let Some(bound) = bindings.get(&ty.name) {
            return TypeRef {
                wildcard: ty.wildcard,
                ..bound.clone()
            };
        }
    }
    let mut out = ty.clone();
    out.type_args = ty.type_args.iter().map(|a| substitute(a, bindings)).collect();
    out
}

/// Every method `listener` declares or inherits, minus `EventListener`'s,
/// with type arguments applied.
fn listener_methods(resolver: &dyn TypeResolver, listener: &TypeRef) -> Vec<MethodSignature> {
    let mut methods: Vec<MethodSignature> = Vec::new();
    let mut pending = vec![(listener.name.clone(), listener.type_args.clone())];
    let mut seen: Vec<String> = Vec::new();
    while let Some((current, args)) = pending.pop() {
        let Some(resolved) = resolver.resolve(&current) else {
            continue;
        };
        if resolved.qualified_name == EVENT_LISTENER || seen.contains(&resolved.qualified_name) {
            continue;
        }
        let bindings: FxHashMap<String, TypeRef> = resolved.type_params.iter().cloned().zip(args).collect();
        for signature in &resolved.methods {
            let params: Vec<TypeRef> = signature.params.iter().map(|p| substitute(p, &bindings)).collect();
            if methods.iter().any(|m| m.name == signature.name && m.params == params) {
                continue;
            }
            methods.push(MethodSignature {
                name: signature.name.clone(),
                return_type: substitute(&signature.return_type, &bindings),
                params,
                thrown: signature.thrown.clone(),
            });
        }
        pending.extend(resolved.supertypes.iter().map(|s| (s.clone(), Vec::new())));
        seen.push(resolved.qualified_name);
    }
    methods
}

/// Members generated for one listener type.
struct Support {
    registry: FieldDecl,
    add: MethodDecl,
    remove: MethodDecl,
    fire: Vec<MethodDecl>,
}

fn support(listener: &TypeRef, methods: &[MethodSignature]) -> Support {
    let simple = listener.simple_name().to_string();
    let registry_name = format!("$registered{}", simple);
    let registry = || this_field(registry_name.clone());

    let add = method(TypeRef::void(), format!("add{}", simple))
        .public()
        .with_arg(arg(listener.clone(), "l").final_())
        .stmt(
            if_(not(call("contains").on(registry()).arg(name("l"))))
                .then(call("add").on(registry()).arg(name("l"))),
        );
    let remove = method(TypeRef::void(), format!("remove{}", simple))
        .public()
        .with_arg(arg(listener.clone(), "l").final_())
        .stmt(call("remove").on(registry()).arg(name("l")));

    let fire = methods
        .iter()
        .map(|signature| {
            let args: Vec<Argument> = signature
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| arg(p.clone(), format!("arg{}", i)).final_())
                .collect();
            let forward = arg_names(&args);
            method(TypeRef::void(), format!("fire{}", capitalize(&signature.name)))
                .protected()
                .with_args(args)
                .stmt(foreach(
                    local(listener.clone(), "l").final_(),
                    registry(),
                    call(signature.name.clone()).on(name("l")).args(forward),
                ))
        })
        .collect();

    Support {
        registry: field_decl(TypeRef::new("java.util.List").arg(listener.clone()), registry_name.clone())
            .private()
            .final_()
            .init(new_(TypeRef::new("java.util.concurrent.CopyOnWriteArrayList").arg(listener.clone()))),
        add,
        remove,
        fire,
    }
}

pub struct ListenerSupportHandler;

impl Handler for ListenerSupportHandler {
    fn name(&self) -> &'static str {
        "ListenerSupport"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["ListenerSupport"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if target != Target::Type {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS));
        }
        if editor.is_interface() {
            return Err(usage(ctx, &messages::_0_IS_NOT_SUPPORTED_ON_INTERFACES_OR_ANNOTATIONS));
        }
        let listeners = values(ctx)?.classes("value")?;
        if listeners.is_empty() {
            return Err(HandlerError::usage(&messages::LISTENER_SUPPORT_REQUIRES_A_TYPE, &[]));
        }

        // Resolve everything before scheduling anything.
        let mut resolved = Vec::with_capacity(listeners.len());
        for listener in &listeners {
            let Some(found) = ctx.resolver.resolve(&listener.name) else {
                return Err(HandlerError::usage(&messages::LISTENER_TYPE_0_CANNOT_BE_RESOLVED, &[&listener.name]));
            };
            if !found.is_interface() {
                return Err(HandlerError::usage(&messages::LISTENER_TYPE_0_MUST_BE_AN_INTERFACE, &[&listener.name]));
            }
            resolved.push((listener, listener_methods(ctx.resolver, listener)));
        }

        for (listener, methods) in resolved {
            let generated = support(listener, &methods);
            tracing::trace!(listener = %listener.name, methods = methods.len(), "listener support");
            if editor.has_field(&generated.registry.name) {
                ctx.warn(&messages::FIELD_0_ALREADY_EXISTS, &[&generated.registry.name]);
            } else {
                editor.inject_field(generated.registry);
            }
            for decl in [generated.add, generated.remove].into_iter().chain(generated.fire) {
                if editor.has_method(&decl.name, Some(decl.args.len())) {
                    ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[&decl.name]);
                    continue;
                }
                editor.inject_method(decl);
            }
        }
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::UnitResolver;

    fn resolver() -> UnitResolver {
        let mut r = UnitResolver::new();
        r.add_stub(
            "ui",
            &interface("MouseListener")
                .implements(ty("java.util.EventListener"))
                .with_method(method(TypeRef::void(), "clicked").with_arg(arg(ty("int"), "x")).without_body()),
        );
        r.add_stub(
            "ui",
            &interface("DragListener")
                .implements(ty("ui.MouseListener"))
                .with_method(method(TypeRef::void(), "dragged").with_arg(arg(ty("int"), "dx")).without_body()),
        );
        r
    }

    #[test]
    fn test_inherited_methods_are_included() {
        let r = resolver();
        let methods = listener_methods(&r, &ty("ui.DragListener"));
        let names: Vec<_> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["dragged", "clicked"]);
    }

    #[test]
    fn test_fire_methods_forward_arguments() {
        let r = resolver();
        let listener = ty("ui.MouseListener");
        let generated = support(&listener, &listener_methods(&r, &listener));
        assert_eq!(generated.registry.name, "$registeredMouseListener");
        assert_eq!(generated.add.name, "addMouseListener");
        assert_eq!(generated.fire.len(), 1);
        assert_eq!(generated.fire[0].name, "fireClicked");
        assert_eq!(generated.fire[0].args[0].name, "arg0");
    }

    #[test]
    fn test_type_arguments_are_substituted() {
        let mut bindings = FxHashMap::default();
        bindings.insert("T".to_string(), ty("String"));
        let list = ty("java.util.List").arg(ty("T"));
        assert_eq!(substitute(&list, &bindings), ty("java.util.List").arg(ty("String")));
    }
}
