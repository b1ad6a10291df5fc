//! `@Builder` and `@Builder.Extension`.
//!
//! For a type `Person` with required fields `a`, `b` and optional field `c`
//! the handler synthesizes:
//!
//! ```text
//! public static ADef create() { return new $PersonBuilder(); }
//! public static interface ADef { BDef a(final int a); }
//! public static interface BDef { OptionalDef b(final int b); }
//! public static interface OptionalDef { OptionalDef c(final String c); Person build(); }
//! private static class $PersonBuilder implements ADef, BDef, OptionalDef { ... }
//! private Person(final $PersonBuilder builder) { this.a = builder.a; ... }
//! ```
//!
//! Required setters can only be reached in declaration order, and `build()`
//! only once every required field is supplied.

use super::{access_value, completes_normally, method_target, return_value, usage, values};
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use crate::resolver::TypeResolver;
use lpg_ast::factory::*;
use lpg_ast::visitor::{walk_expression, AstVisitor};
use lpg_ast::*;
use lpg_core::names::{camel_case, capitalize, singular};
use lpg_diagnostics::messages;

const EXTENSION: &str = "Builder.Extension";
const OPTIONAL_DEF: &str = "OptionalDef";
const NON_NULL: &[&str] = &["NonNull", "NotNull", "Nonnull"];

// ============================================================================
// Field classification
// ============================================================================

/// How the optional-field interface exposes a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A fluent setter.
    Plain,
    /// `add` for one element and `addAll` for many.
    Collection,
    /// `put` for one entry and `putAll` for many.
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderField {
    /// Index among the type's fields.
    pub index: usize,
    pub name: String,
    pub ty: TypeRef,
    pub init: Option<Expression>,
    pub shape: FieldShape,
}

/// The order-preserving partition of a type's fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderData {
    pub required: Vec<BuilderField>,
    pub optional: Vec<BuilderField>,
    /// Names of every other field, static and synthetic ones included.
    pub excluded: Vec<String>,
    /// `<Field>Def`, one per required field, in the same order.
    pub required_def_type_names: Vec<String>,
}

impl BuilderData {
    pub fn required_names(&self) -> Vec<&str> {
        self.required.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Partition `class`'s fields into required, optional and excluded.
///
/// A field is required when it is uninitialized and final or non-null
/// annotated. Otherwise it is optional when it is not final, or when it is
/// an initialized collection or map and `convenient_methods` is on.
pub fn classify_fields(
    class: &ClassDecl,
    excluded: &[String],
    convenient_methods: bool,
    resolver: &dyn TypeResolver,
) -> BuilderData {
    let mut data = BuilderData::default();
    for (index, field) in class.fields.iter().enumerate() {
        if field.is_static() || field.name.starts_with('$') || excluded.contains(&field.name) {
            data.excluded.push(field.name.clone());
            continue;
        }
        let shape = if convenient_methods && field.is_initialized() {
            if resolver.is_map(&field.ty) {
                FieldShape::Map
            } else if resolver.is_collection(&field.ty) {
                FieldShape::Collection
            } else {
                FieldShape::Plain
            }
        } else {
            FieldShape::Plain
        };
        let entry = BuilderField {
            index,
            name: field.name.clone(),
            ty: field.ty.clone(),
            init: field.init.clone(),
            shape,
        };
        let non_null = NON_NULL.iter().any(|n| field.has_annotation(n));
        if !field.is_initialized() && (field.is_final() || non_null) {
            data.required_def_type_names
                .push(format!("{}Def", capitalize(&field.name)));
            data.required.push(entry);
        } else if shape != FieldShape::Plain || !field.is_final() {
            data.optional.push(entry);
        } else {
            data.excluded.push(field.name.clone());
        }
    }
    data
}

// ============================================================================
// Extension methods
// ============================================================================

/// An `@Builder.Extension` method that can be moved into the builder.
#[derive(Debug, Clone)]
struct Extension {
    index: usize,
    decl: MethodDecl,
    /// Assigns every required field, so it may replace the required chain.
    required: bool,
}

/// Field names assigned by a method body, outside nested classes.
struct AssignedFields<'c> {
    fields: &'c [FieldDecl],
    assigned: Vec<String>,
}

impl<'a> AstVisitor<'a> for AssignedFields<'_> {
    fn visit_class(&mut self, _class: &'a ClassDecl) {}

    fn visit_expression(&mut self, expr: &'a Expression) {
        if let Expression::Assign(assign) = expr {
            let target = match assign.target.as_ref() {
                Expression::Name(n) => Some(n.as_str()),
                Expression::FieldRef(f) if matches!(f.receiver.as_ref(), Expression::This(None)) => Some(f.name.as_str()),
                _ => None,
            };
            if let Some(target) = target {
                if self.fields.iter().any(|f| f.name == target) && !self.assigned.iter().any(|a| a == target) {
                    self.assigned.push(target.to_string());
                }
            }
        }
        walk_expression(self, expr);
    }
}

fn assigned_fields(method: &MethodDecl, fields: &[FieldDecl]) -> Vec<String> {
    let mut visitor = AssignedFields {
        fields,
        assigned: Vec::new(),
    };
    for stmt in &method.statements {
        visitor.visit_statement(stmt);
    }
    visitor.assigned
}

/// Examine every extension method. Returns the usable ones and the indices
/// of the rest, which stay in the type.
fn examine_extensions(ctx: &mut HandlerContext<'_>, class: &ClassDecl, data: &BuilderData) -> (Vec<Extension>, Vec<usize>) {
    let required = data.required_names();
    let mut usable = Vec::new();
    let mut rejected = Vec::new();
    for (index, method) in class.methods.iter().enumerate() {
        if !method.has_annotation(EXTENSION) {
            continue;
        }
        let private = method.modifiers.access() == AccessLevel::Private;
        if !private || method.is_static() || !method.return_type.is_void() || method.no_body {
            ctx.warn(&messages::BUILDER_EXTENSION_0_MUST_BE_PRIVATE_VOID, &[&method.name]);
            rejected.push(index);
            continue;
        }
        let assigned = assigned_fields(method, &class.fields);
        let touched = required.iter().filter(|r| assigned.iter().any(|a| a == *r)).count();
        if touched > 0 && touched < required.len() {
            let missing: Vec<&str> = required
                .iter()
                .copied()
                .filter(|r| !assigned.iter().any(|a| a == r))
                .collect();
            ctx.warn(
                &messages::BUILDER_EXTENSION_0_ASSIGNS_SOME_REQUIRED_FIELDS_MISSING_1,
                &[&method.name, &missing.join(", ")],
            );
            rejected.push(index);
            continue;
        }
        usable.push(Extension {
            index,
            decl: method.clone(),
            required: touched > 0,
        });
    }
    (usable, rejected)
}

// ============================================================================
// Synthesis
// ============================================================================

/// Everything the synthesis needs to know about one `@Builder` occurrence.
struct Plan {
    type_name: String,
    self_type: TypeRef,
    type_params: Vec<TypeParam>,
    type_args: Vec<TypeRef>,
    builder_type: TypeRef,
    prefix: String,
    access: AccessLevel,
    allow_reset: bool,
    data: BuilderData,
}

impl Plan {
    fn generic(&self, simple: &str) -> TypeRef {
        TypeRef::new(simple).args(self.type_args.iter().cloned())
    }

    fn optional_def(&self) -> TypeRef {
        self.generic(OPTIONAL_DEF)
    }

    fn first_step(&self) -> TypeRef {
        match self.data.required_def_type_names.first() {
            Some(first) => self.generic(first),
            None => self.optional_def(),
        }
    }

    /// What the setter of required field `i` returns.
    fn after_required(&self, i: usize) -> TypeRef {
        match self.data.required_def_type_names.get(i + 1) {
            Some(next) => self.generic(next),
            None => self.optional_def(),
        }
    }

    fn setter(&self, field: &str) -> String {
        camel_case(&self.prefix, field)
    }

    fn interface(&self, simple: &str) -> ClassDecl {
        interface(simple)
            .with_access(self.access)
            .static_()
            .with_type_params(self.type_params.iter().cloned())
    }

    fn default_method_name(field: &str) -> String {
        format!("${}Default", field)
    }
}

/// A method pair: the interface stub and the builder implementation.
struct Step {
    stub: MethodDecl,
    body: MethodDecl,
}

impl Step {
    fn new(decl: MethodDecl, statements: Vec<Statement>) -> Self {
        Step {
            stub: decl.clone().without_body(),
            body: decl.public().implementing().stmts(statements),
        }
    }

    /// A fluent step: `statements; return this;`.
    fn fluent(decl: MethodDecl, statements: Vec<Statement>) -> Self {
        let mut statements = statements;
        statements.push(return_(this()));
        Self::new(decl, statements)
    }
}

/// `? extends T` and `? super T` read as `T`; `?` reads as `Object`.
fn element_type(ty: Option<&TypeRef>) -> TypeRef {
    match ty {
        Some(t) if t.wildcard == Some(Wildcard::Unbound) => TypeRef::object(),
        Some(t) => TypeRef { wildcard: None, ..t.clone() },
        None => TypeRef::object(),
    }
}

fn setter_steps(plan: &Plan, field: &BuilderField, returns: &TypeRef) -> Vec<Step> {
    let target = this_field(field.name.clone());
    let plural = plan.setter(&field.name);
    match field.shape {
        FieldShape::Plain => vec![Step::fluent(
            method(returns.clone(), plural).with_arg(arg(field.ty.clone(), field.name.clone()).final_()),
            vec![Statement::from(assign(target, name(field.name.clone())))],
        )],
        FieldShape::Collection => {
            let element = element_type(field.ty.type_args.first());
            let many = java_util("Collection").arg(TypeRef::extends_wildcard(element.clone()));
            vec![
                Step::fluent(
                    method(returns.clone(), singular(&plural)).with_arg(arg(element, "arg0").final_()),
                    vec![Statement::from(call("add").on(target.clone()).arg(name("arg0")))],
                ),
                Step::fluent(
                    method(returns.clone(), plural).with_arg(arg(many, "arg0").final_()),
                    vec![Statement::from(call("addAll").on(target).arg(name("arg0")))],
                ),
            ]
        }
        FieldShape::Map => {
            let key = element_type(field.ty.type_args.first());
            let value = element_type(field.ty.type_args.get(1));
            let many = java_util("Map")
                .arg(TypeRef::extends_wildcard(key.clone()))
                .arg(TypeRef::extends_wildcard(value.clone()));
            vec![
                Step::fluent(
                    method(returns.clone(), singular(&plural))
                        .with_arg(arg(key, "arg0").final_())
                        .with_arg(arg(value, "arg1").final_()),
                    vec![Statement::from(call("put").on(target.clone()).arg(name("arg0")).arg(name("arg1")))],
                ),
                Step::fluent(
                    method(returns.clone(), plural).with_arg(arg(many, "arg0").final_()),
                    vec![Statement::from(call("putAll").on(target).arg(name("arg0")))],
                ),
            ]
        }
    }
}

fn java_util(simple: &str) -> TypeRef {
    TypeRef::new(format!("java.util.{}", simple))
}

/// An extension method moved into the builder, returning `OptionalDef`.
fn extension_step(plan: &Plan, ext: &Extension) -> Step {
    let mut statements = ext.decl.statements.clone();
    return_value(&mut statements, &this());
    if completes_normally(&statements) {
        statements.push(return_(this()));
    }
    let decl = method(plan.optional_def(), ext.decl.name.clone())
        .with_type_params(ext.decl.type_params.iter().cloned())
        .with_args(ext.decl.args.iter().cloned())
        .with_thrown_types(ext.decl.thrown.iter().cloned());
    Step::new(decl, statements)
}

/// The value a field is reset to: its captured default or its zero value.
fn reset_value(plan: &Plan, field: &BuilderField) -> Expression {
    if field.init.is_some() {
        call(Plan::default_method_name(&field.name))
            .on(name(plan.type_name.clone()))
            .into()
    } else {
        field.ty.default_value()
    }
}

/// The value a builder field starts with.
fn initial_value(plan: &Plan, field: &BuilderField) -> Option<Expression> {
    match &field.init {
        Some(_) if plan.allow_reset => Some(reset_value(plan, field)),
        init => init.clone(),
    }
}

fn forward_step(forward: &str, returns: TypeRef, thrown: Vec<TypeRef>) -> Step {
    let target = call(forward).on(call("build").on(this()));
    let statement: Statement = if returns.is_void() {
        target.into()
    } else {
        return_(target)
    };
    Step::new(method(returns, forward).with_thrown_types(thrown), vec![statement])
}

pub struct BuilderHandler;

impl Handler for BuilderHandler {
    fn name(&self) -> &'static str {
        "Builder"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["Builder"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if target != Target::Type || editor.is_interface() || editor.is_enum() {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS));
        }
        let v = values(ctx)?;
        let access = access_value(&v, AccessLevel::Public)?;
        let prefix = v.string_or("prefix", ctx.options.builder_prefix())?;
        let exclude = v.strings("exclude")?;
        let convenient = v.bool_or("convenientMethods", ctx.options.builder_convenient_methods())?;
        let call_methods = v.strings("callMethods")?;
        let allow_reset = v.bool_or("allowReset", ctx.options.builder_allow_reset())?;
        let entry = ctx.options.builder_entry_method().to_string();

        let builder_name = format!("${}Builder", editor.name());
        if editor.has_type(&builder_name) {
            ctx.warn(&messages::TYPE_0_ALREADY_EXISTS, &[&builder_name]);
            return Ok(Outcome::Skipped);
        }
        for excluded in &exclude {
            if !editor.class().has_field(excluded) {
                ctx.warn(&messages::BUILDER_EXCLUDED_FIELD_0_NOT_FOUND, &[excluded]);
            }
        }

        let data = classify_fields(editor.class(), &exclude, convenient, ctx.resolver);
        let (extensions, rejected) = examine_extensions(ctx, editor.class(), &data);
        let type_args: Vec<TypeRef> = editor.type_params().iter().map(|tp| TypeRef::new(tp.name.clone())).collect();
        let plan = Plan {
            type_name: editor.name().to_string(),
            self_type: editor.type_ref(),
            type_params: editor.type_params().to_vec(),
            builder_type: TypeRef::new(builder_name.clone()).args(type_args.iter().cloned()),
            type_args,
            prefix,
            access,
            allow_reset,
            data,
        };
        tracing::debug!(
            required = plan.data.required.len(),
            optional = plan.data.optional.len(),
            extensions = extensions.len(),
            "builder fields classified"
        );

        // Required step interfaces.
        let mut interfaces = Vec::new();
        let mut implementations = Vec::new();
        for (i, field) in plan.data.required.iter().enumerate() {
            let mut steps = Vec::new();
            if i == 0 {
                steps.extend(extensions.iter().filter(|e| e.required).map(|e| extension_step(&plan, e)));
            }
            steps.extend(setter_steps(&plan, field, &plan.after_required(i)));
            let mut def = plan.interface(&plan.data.required_def_type_names[i]);
            for step in steps {
                def = def.with_method(step.stub);
                implementations.push(step.body);
            }
            interfaces.push(def);
        }

        // The optional interface.
        let optional = plan.optional_def();
        let mut steps = Vec::new();
        for field in &plan.data.optional {
            steps.extend(setter_steps(&plan, field, &optional));
        }
        steps.extend(extensions.iter().filter(|e| !e.required).map(|e| extension_step(&plan, e)));
        steps.push(Step::new(
            method(plan.self_type.clone(), "build"),
            vec![return_(new_(plan.self_type.clone()).arg(this()))],
        ));
        if plan.allow_reset {
            let mut statements: Vec<Statement> = plan
                .data
                .required
                .iter()
                .chain(&plan.data.optional)
                .map(|f| Statement::from(assign(this_field(f.name.clone()), reset_value(&plan, f))))
                .collect();
            statements.push(return_(this()));
            steps.push(Step::new(method(plan.first_step(), "reset"), statements));
        }
        for forward in &call_methods {
            let signature = match editor.class().method(forward, Some(0)) {
                Some(m) => Some((m.return_type.clone(), m.thrown.clone())),
                None if forward == "toString" => Some((TypeRef::string(), Vec::new())),
                None if forward == "hashCode" => Some((TypeRef::new("int"), Vec::new())),
                None => None,
            };
            match signature {
                Some((returns, thrown)) => steps.push(forward_step(forward, returns, thrown)),
                None => ctx.warn(&messages::BUILDER_CANNOT_FORWARD_0, &[forward]),
            }
        }
        let mut optional_def = plan.interface(OPTIONAL_DEF);
        for step in steps {
            optional_def = optional_def.with_method(step.stub);
            implementations.push(step.body);
        }
        interfaces.push(optional_def);

        // The builder class.
        let mut builder = class_decl(builder_name.clone())
            .private()
            .static_()
            .with_type_params(plan.type_params.iter().cloned());
        for def in &plan.data.required_def_type_names {
            builder = builder.implements(plan.generic(def));
        }
        builder = builder.implements(optional.clone());
        for field in plan.data.required.iter().chain(&plan.data.optional) {
            let mut decl = field_decl(field.ty.clone(), field.name.clone()).private();
            decl.init = initial_value(&plan, field);
            builder = builder.with_field(decl);
        }
        builder = builder.with_methods(implementations);

        // The constructor taking the builder.
        let adopted = editor
            .constructors()
            .iter()
            .position(|c| c.args.len() == 1 && c.args[0].ty.simple_name().ends_with("Builder"));
        match adopted {
            Some(index) => {
                let mut ctor = editor.constructors()[index].clone();
                ctor.args[0].ty = plan.builder_type.clone();
                editor.replace_constructor(index, ctor);
            }
            None => {
                let ctor = constructor(plan.type_name.clone())
                    .private()
                    .with_arg(arg(plan.builder_type.clone(), "builder").final_())
                    .stmts(
                        plan.data
                            .required
                            .iter()
                            .chain(&plan.data.optional)
                            .map(|f| Statement::from(assign(this_field(f.name.clone()), field_ref(name("builder"), f.name.clone())))),
                    );
                editor.inject_constructor(ctor);
            }
        }

        // The entry point.
        if editor.has_method(&entry, Some(0)) {
            ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[&entry]);
        } else {
            editor.inject_method(
                method(plan.first_step(), entry.clone())
                    .with_access(plan.access)
                    .static_()
                    .with_type_params(plan.type_params.iter().cloned())
                    .stmt(return_(new_(plan.builder_type.clone()))),
            );
        }

        // Initializers move into the builder.
        for field in &plan.data.optional {
            let Some(init) = &field.init else {
                continue;
            };
            if plan.allow_reset {
                editor.inject_method(
                    method(field.ty.clone(), Plan::default_method_name(&field.name))
                        .private()
                        .static_()
                        .with_type_params(plan.type_params.iter().cloned())
                        .stmt(return_(init.clone())),
                );
            }
            editor.remove_field_initializer(field.index);
        }

        for ext in &extensions {
            editor.remove_method(ext.index);
        }
        for index in rejected {
            editor.remove_method_annotation(index, EXTENSION);
        }
        for def in interfaces {
            editor.inject_type(def);
        }
        editor.inject_type(builder);

        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

/// `@Builder.Extension` outside a `@Builder` type.
///
/// Extensions of a builder type are consumed by [`BuilderHandler`]; any
/// that reach this handler have no builder to extend.
pub struct ExtensionHandler;

impl Handler for ExtensionHandler {
    fn name(&self) -> &'static str {
        "Builder.Extension"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&[EXTENSION])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        method_target(ctx, target)?;
        if editor.class().has_annotation("Builder") {
            // @Builder on this type failed and has already been reported.
            return Ok(Outcome::Skipped);
        }
        Err(HandlerError::usage(&messages::BUILDER_EXTENSION_REQUIRES_BUILDER, &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::BuiltinResolver;

    fn person() -> ClassDecl {
        class_decl("Person")
            .with_field(field_decl(ty("int"), "a").private().final_())
            .with_field(field_decl(ty("int"), "b").private().final_())
            .with_field(field_decl(TypeRef::string(), "c").private().init(string("x")))
            .with_field(field_decl(ty("java.util.List").arg(TypeRef::string()), "tags").private().final_().init(new_(ty("java.util.ArrayList").arg(TypeRef::string()))))
            .with_field(field_decl(ty("int"), "COUNT").static_())
            .with_field(field_decl(ty("String"), "id").private().final_().init(string("p")))
            .with_field(field_decl(ty("String"), "note").private().with_annotation(annotation(ty("NonNull"))))
    }

    #[test]
    fn test_classification_partitions_every_field_once() {
        let class = person();
        let data = classify_fields(&class, &[], true, &BuiltinResolver::new());
        let names = |fields: &[BuilderField]| fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&data.required), vec!["a", "b", "note"]);
        assert_eq!(names(&data.optional), vec!["c", "tags"]);
        assert_eq!(data.excluded, vec!["COUNT", "id"]);
        assert_eq!(data.required.len(), data.required_def_type_names.len());
        assert_eq!(data.required_def_type_names, vec!["ADef", "BDef", "NoteDef"]);
        assert_eq!(data.optional[1].shape, FieldShape::Collection);
        assert_eq!(
            data.required.len() + data.optional.len() + data.excluded.len(),
            class.fields.len()
        );
    }

    #[test]
    fn test_classification_without_convenient_methods() {
        let class = person();
        let data = classify_fields(&class, &["c".to_string()], false, &BuiltinResolver::new());
        let optional: Vec<_> = data.optional.iter().map(|f| f.name.as_str()).collect();
        assert!(optional.is_empty());
        assert!(data.excluded.contains(&"c".to_string()));
        assert!(data.excluded.contains(&"tags".to_string()));
    }

    #[test]
    fn test_assigned_fields_ignores_locals_and_nested_classes() {
        let class = person();
        let ext = method(TypeRef::void(), "ab")
            .stmt(assign(this_field("a"), int(1)))
            .stmt(assign(name("b"), int(2)))
            .stmt(assign(name("local"), int(3)))
            .stmt(local(ty("Runnable"), "r").init(
                new_(ty("Runnable")).body(class_decl("").with_method(method(TypeRef::void(), "run").stmt(assign(name("c"), string("y"))))),
            ));
        assert_eq!(assigned_fields(&ext, &class.fields), vec!["a", "b"]);
    }
}
