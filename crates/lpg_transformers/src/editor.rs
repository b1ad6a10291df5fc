//! Editor facades over a type declaration.
//!
//! A [`TypeEditor`] reads the type as it was when the handler started and
//! schedules edits. Nothing touches the tree until [`TypeEditor::rebuild`]
//! lowers every scheduled fragment and commits all edits at once. An editor
//! dropped without `rebuild()` leaves the tree exactly as it found it.
//!
//! Commit order: the consumed annotation is removed, in-place modifications
//! are applied by index, scheduled method removals run from the highest index
//! down, an enum conversion is applied, and finally injected members are
//! appended in scheduling order.

use crate::error::InternalError;
use crate::lower;
use lpg_ast::*;
use lpg_core::TextSpan;
use rustc_hash::FxHashMap;

/// Proof that a handler committed its edits. Only [`TypeEditor::rebuild`]
/// creates one.
#[must_use]
#[derive(Debug)]
pub struct Rebuilt {
    _private: (),
}

/// Where the triggering annotation sits, so that a successful rebuild can
/// remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationSite {
    Type(usize),
    /// (field index, annotation index)
    Field(usize, usize),
    /// (method index, annotation index)
    Method(usize, usize),
}

#[derive(Debug)]
enum Edit {
    InjectField(FieldDecl),
    InjectMethod(MethodDecl),
    InjectConstructor(ConstructorDecl),
    InjectType(ClassDecl),
    InjectInitializer(Initializer),
    ReplaceBody(usize, Vec<Statement>),
    ReplaceReturnType(usize, TypeRef),
    ReplaceArguments(usize, Vec<Argument>),
    MakeArgsFinal(usize),
    SetMethodModifiers(usize, Modifiers),
    RemoveMethodAnnotation(usize, String),
    RemoveMethod(usize),
    RemoveFieldInitializer(usize),
    ReplaceConstructor(usize, ConstructorDecl),
    SetConstructorAccess(usize, AccessLevel),
    ConvertToEnum(Vec<EnumConstant>),
    RemoveAnnotation(AnnotationSite),
}

pub struct TypeEditor<'a> {
    class: &'a mut ClassDecl,
    span: Option<TextSpan>,
    consumed: Option<AnnotationSite>,
    edits: Vec<Edit>,
}

impl<'a> TypeEditor<'a> {
    pub fn new(class: &'a mut ClassDecl, span: Option<TextSpan>) -> Self {
        Self {
            class,
            span,
            consumed: None,
            edits: Vec::new(),
        }
    }

    /// Remove the annotation at `site` as part of a successful rebuild.
    pub fn consuming(mut self, site: AnnotationSite) -> Self {
        self.consumed = Some(site);
        self
    }

    // ========================================================================
    // Read view
    // ========================================================================

    pub fn class(&self) -> &ClassDecl {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.class.name
    }

    /// The type of `this`, including type arguments.
    pub fn type_ref(&self) -> TypeRef {
        self.class.self_type()
    }

    pub fn type_params(&self) -> &[TypeParam] {
        &self.class.type_params
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.class.annotations
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldView<'_>> {
        self.class
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| FieldView { field, index })
    }

    pub fn field(&self, index: usize) -> Result<FieldView<'_>, InternalError> {
        self.class
            .fields
            .get(index)
            .map(|field| FieldView { field, index })
            .ok_or(InternalError::IndexOutOfRange { what: "field", index })
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.class.methods
    }

    pub fn method(&self, index: usize) -> Result<&MethodDecl, InternalError> {
        self.class
            .methods
            .get(index)
            .ok_or(InternalError::IndexOutOfRange { what: "method", index })
    }

    pub fn constructors(&self) -> &[ConstructorDecl] {
        &self.class.constructors
    }

    pub fn is_interface(&self) -> bool {
        self.class.is_interface()
    }

    pub fn is_enum(&self) -> bool {
        self.class.is_enum()
    }

    pub fn is_local_or_anonymous(&self) -> bool {
        self.class.local || self.class.anonymous
    }

    /// Whether a method exists or is already scheduled for injection.
    pub fn has_method(&self, name: &str, arity: Option<usize>) -> bool {
        let matches = |m: &MethodDecl| m.name == name && arity.map_or(true, |n| m.args.len() == n);
        self.class.methods.iter().any(matches)
            || self.edits.iter().any(|e| matches!(e, Edit::InjectMethod(m) if matches(m)))
    }

    pub fn find_method(&self, name: &str, arity: Option<usize>) -> Option<(usize, &MethodDecl)> {
        self.class
            .methods
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name && arity.map_or(true, |n| m.args.len() == n))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.class.has_field(name)
            || self
                .edits
                .iter()
                .any(|e| matches!(e, Edit::InjectField(f) if f.name == name))
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.class.member_type(name).is_some()
            || self
                .edits
                .iter()
                .any(|e| matches!(e, Edit::InjectType(t) if t.name == name))
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    pub fn inject_field(&mut self, field: FieldDecl) {
        self.edits.push(Edit::InjectField(field));
    }

    pub fn inject_method(&mut self, method: MethodDecl) {
        self.edits.push(Edit::InjectMethod(method));
    }

    pub fn inject_constructor(&mut self, ctor: ConstructorDecl) {
        self.edits.push(Edit::InjectConstructor(ctor));
    }

    pub fn inject_type(&mut self, ty: ClassDecl) {
        self.edits.push(Edit::InjectType(ty));
    }

    pub fn inject_initializer(&mut self, init: Initializer) {
        self.edits.push(Edit::InjectInitializer(init));
    }

    pub fn remove_method(&mut self, index: usize) {
        self.edits.push(Edit::RemoveMethod(index));
    }

    pub fn remove_method_annotation(&mut self, index: usize, annotation: &str) {
        self.edits
            .push(Edit::RemoveMethodAnnotation(index, annotation.to_string()));
    }

    pub fn remove_field_initializer(&mut self, index: usize) {
        self.edits.push(Edit::RemoveFieldInitializer(index));
    }

    pub fn replace_constructor(&mut self, index: usize, ctor: ConstructorDecl) {
        self.edits.push(Edit::ReplaceConstructor(index, ctor));
    }

    pub fn set_constructor_access(&mut self, index: usize, access: AccessLevel) {
        self.edits.push(Edit::SetConstructorAccess(index, access));
    }

    /// Remove another annotation as part of the rebuild.
    pub fn remove_annotation(&mut self, site: AnnotationSite) {
        self.edits.push(Edit::RemoveAnnotation(site));
    }

    /// Turn the class into an enum with the given constants.
    pub fn convert_to_enum(&mut self, constants: Vec<EnumConstant>) {
        self.edits.push(Edit::ConvertToEnum(constants));
    }

    pub fn method_editor(&mut self, index: usize) -> Result<MethodEditor<'_, 'a>, InternalError> {
        self.method(index)?;
        Ok(MethodEditor { editor: self, index })
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Lower all scheduled fragments and commit every edit.
    ///
    /// Lowering and index checks happen before the tree is touched, so an
    /// error leaves the type unchanged.
    pub fn rebuild(mut self) -> Result<Rebuilt, InternalError> {
        self.check_indices()?;
        self.lower_fragments()?;

        let TypeEditor {
            class,
            consumed,
            edits,
            ..
        } = self;

        let mut sites: Vec<AnnotationSite> = consumed.into_iter().collect();
        sites.extend(edits.iter().filter_map(|e| match e {
            Edit::RemoveAnnotation(site) => Some(*site),
            _ => None,
        }));
        sites.sort_unstable_by_key(|site| std::cmp::Reverse(site_key(*site)));
        sites.dedup();
        for site in sites {
            match site {
                AnnotationSite::Type(a) => remove_at(&mut class.annotations, a),
                AnnotationSite::Field(f, a) => remove_at(&mut class.fields[f].annotations, a),
                AnnotationSite::Method(m, a) => remove_at(&mut class.methods[m].annotations, a),
            }
        }

        let mut removals = Vec::new();
        let mut injections = Vec::new();
        let mut enum_constants = None;
        for edit in edits {
            match edit {
                Edit::ReplaceBody(i, stmts) => {
                    class.methods[i].statements = stmts;
                    class.methods[i].no_body = false;
                }
                Edit::ReplaceReturnType(i, ty) => class.methods[i].return_type = ty,
                Edit::ReplaceArguments(i, args) => class.methods[i].args = args,
                Edit::MakeArgsFinal(i) => {
                    for arg in &mut class.methods[i].args {
                        arg.modifiers |= Modifiers::FINAL;
                    }
                }
                Edit::SetMethodModifiers(i, modifiers) => class.methods[i].modifiers = modifiers,
                Edit::RemoveMethodAnnotation(i, name) => {
                    class.methods[i].annotations.retain(|a| !a.is(&name));
                }
                Edit::RemoveFieldInitializer(i) => class.fields[i].init = None,
                Edit::ReplaceConstructor(i, ctor) => class.constructors[i] = ctor,
                Edit::SetConstructorAccess(i, access) => {
                    let ctor = &mut class.constructors[i];
                    ctor.modifiers = ctor.modifiers.with_access(access);
                }
                Edit::RemoveMethod(i) => removals.push(i),
                Edit::ConvertToEnum(constants) => enum_constants = Some(constants),
                Edit::RemoveAnnotation(_) => {}
                inject => injections.push(inject),
            }
        }

        removals.sort_unstable_by(|a, b| b.cmp(a));
        removals.dedup();
        for i in removals {
            class.methods.remove(i);
        }

        if let Some(constants) = enum_constants {
            class.kind = ClassKind::Enum;
            class.modifiers -= Modifiers::FINAL | Modifiers::ABSTRACT;
            class.superclass = None;
            class.enum_constants.extend(constants);
        }

        for inject in injections {
            match inject {
                Edit::InjectField(f) => class.fields.push(f),
                Edit::InjectMethod(m) => class.methods.push(m),
                Edit::InjectConstructor(c) => class.constructors.push(c),
                Edit::InjectType(t) => class.member_types.push(t),
                Edit::InjectInitializer(i) => class.initializers.push(i),
                _ => {}
            }
        }

        Ok(Rebuilt { _private: () })
    }

    fn check_indices(&self) -> Result<(), InternalError> {
        let methods = self.class.methods.len();
        let fields = self.class.fields.len();
        let ctors = self.class.constructors.len();
        let check = |what: &'static str, index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(InternalError::IndexOutOfRange { what, index })
            }
        };
        let check_site = |site: AnnotationSite| match site {
            AnnotationSite::Type(a) => check("annotation", a, self.class.annotations.len()),
            AnnotationSite::Field(f, a) => {
                check("field", f, fields)?;
                check("annotation", a, self.class.fields[f].annotations.len())
            }
            AnnotationSite::Method(m, a) => {
                check("method", m, methods)?;
                check("annotation", a, self.class.methods[m].annotations.len())
            }
        };
        if let Some(site) = self.consumed {
            check_site(site)?;
        }
        for edit in &self.edits {
            match edit {
                Edit::RemoveAnnotation(site) => check_site(*site)?,
                Edit::ReplaceBody(i, _)
                | Edit::ReplaceReturnType(i, _)
                | Edit::ReplaceArguments(i, _)
                | Edit::MakeArgsFinal(i)
                | Edit::SetMethodModifiers(i, _)
                | Edit::RemoveMethodAnnotation(i, _)
                | Edit::RemoveMethod(i) => check("method", *i, methods)?,
                Edit::RemoveFieldInitializer(i) => check("field", *i, fields)?,
                Edit::ReplaceConstructor(i, _) | Edit::SetConstructorAccess(i, _) => {
                    check("constructor", *i, ctors)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_fragments(&mut self) -> Result<(), InternalError> {
        let span = self.span;
        let mut return_types: FxHashMap<usize, TypeRef> = FxHashMap::default();
        for edit in &self.edits {
            if let Edit::ReplaceReturnType(i, ty) = edit {
                return_types.insert(*i, ty.clone());
            }
        }
        for edit in &mut self.edits {
            match edit {
                Edit::InjectField(f) => lower::lower_field(f, span)?,
                Edit::InjectMethod(m) => lower::lower_method(m, span)?,
                Edit::InjectConstructor(c) | Edit::ReplaceConstructor(_, c) => lower::lower_constructor(c, span)?,
                Edit::InjectType(t) => lower::lower_class(t, span)?,
                Edit::InjectInitializer(i) => lower::lower_initializer(i, span)?,
                Edit::ReplaceBody(i, stmts) => {
                    let ret = return_types
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| self.class.methods[*i].return_type.clone());
                    lower::lower_body(stmts, &ret, span)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Orders sites so that removing in descending order keeps indices valid.
fn site_key(site: AnnotationSite) -> (u8, usize, usize) {
    match site {
        AnnotationSite::Type(a) => (0, 0, a),
        AnnotationSite::Field(f, a) => (1, f, a),
        AnnotationSite::Method(m, a) => (2, m, a),
    }
}

fn remove_at<T>(items: &mut Vec<T>, index: usize) {
    if index < items.len() {
        items.remove(index);
    }
}

// ============================================================================
// Method editor
// ============================================================================

/// Edits one method of a [`TypeEditor`]. Reads see the method as it was
/// before any scheduled edit.
pub struct MethodEditor<'e, 'a> {
    editor: &'e mut TypeEditor<'a>,
    index: usize,
}

impl<'e, 'a> MethodEditor<'e, 'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn decl(&self) -> &MethodDecl {
        &self.editor.class.methods[self.index]
    }

    /// The declaring type.
    pub fn owner(&self) -> &ClassDecl {
        self.editor.class
    }

    pub fn name(&self) -> &str {
        &self.decl().name
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.decl().return_type
    }

    pub fn args(&self) -> &[Argument] {
        &self.decl().args
    }

    pub fn statements(&self) -> &[Statement] {
        &self.decl().statements
    }

    pub fn is_static(&self) -> bool {
        self.decl().modifiers.contains(Modifiers::STATIC)
    }

    pub fn is_abstract(&self) -> bool {
        self.decl().is_abstract()
    }

    pub fn is_synchronized(&self) -> bool {
        self.decl().modifiers.contains(Modifiers::SYNCHRONIZED)
    }

    pub fn has_no_body(&self) -> bool {
        self.decl().no_body
    }

    pub fn replace_body(&mut self, statements: Vec<Statement>) {
        self.editor.edits.push(Edit::ReplaceBody(self.index, statements));
    }

    pub fn replace_return_type(&mut self, ty: TypeRef) {
        self.editor.edits.push(Edit::ReplaceReturnType(self.index, ty));
    }

    pub fn replace_arguments(&mut self, args: Vec<Argument>) {
        self.editor.edits.push(Edit::ReplaceArguments(self.index, args));
    }

    pub fn make_args_final(&mut self) {
        self.editor.edits.push(Edit::MakeArgsFinal(self.index));
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.editor.edits.push(Edit::SetMethodModifiers(self.index, modifiers));
    }
}

// ============================================================================
// Field view
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct FieldView<'f> {
    field: &'f FieldDecl,
    index: usize,
}

impl<'f> FieldView<'f> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn decl(&self) -> &'f FieldDecl {
        self.field
    }

    pub fn name(&self) -> &'f str {
        &self.field.name
    }

    pub fn ty(&self) -> &'f TypeRef {
        &self.field.ty
    }

    pub fn is_static(&self) -> bool {
        self.field.is_static()
    }

    pub fn is_final(&self) -> bool {
        self.field.is_final()
    }

    pub fn is_initialized(&self) -> bool {
        self.field.is_initialized()
    }

    pub fn annotations(&self) -> &'f [Annotation] {
        &self.field.annotations
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.field.has_annotation(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    fn sample() -> ClassDecl {
        class_decl("A")
            .with_annotation(annotation(ty("Singleton")))
            .with_field(field_decl(ty("int"), "x").init(int(3)))
            .with_method(method(ty("int"), "a").stmt(return_(int(1))))
            .with_method(method(ty("int"), "b").stmt(return_(int(2))))
            .with_method(method(ty("int"), "c"))
    }

    #[test]
    fn test_dropped_editor_leaves_tree_untouched() {
        let mut class = sample();
        let before = class.clone();
        {
            let mut editor = TypeEditor::new(&mut class, None).consuming(AnnotationSite::Type(0));
            editor.inject_field(field_decl(ty("int"), "y"));
            editor.remove_method(0);
        }
        assert_eq!(class, before);
    }

    #[test]
    fn test_rebuild_commit_order() {
        let mut class = sample();
        let mut editor = TypeEditor::new(&mut class, Some(TextSpan::new(0, 10))).consuming(AnnotationSite::Type(0));
        editor.remove_method(2);
        editor.remove_method(0);
        editor.remove_field_initializer(0);
        editor.inject_method(method(ty("int"), "d").stmt(return_default()));
        editor.method_editor(1).unwrap().replace_body(vec![return_default()]);
        assert!(editor.has_method("d", Some(0)));
        let _ = editor.rebuild().unwrap();

        assert!(class.annotations.is_empty());
        assert_eq!(class.fields[0].init, None);
        let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d"]);
        assert_eq!(class.methods[0].statements, vec![return_(int(0))]);
        assert!(class.methods[1].data.is_synthesized());
        assert_eq!(class.methods[1].statements, vec![return_(int(0))]);
    }

    #[test]
    fn test_bad_index_fails_without_changes() {
        let mut class = sample();
        let before = class.clone();
        let mut editor = TypeEditor::new(&mut class, None);
        editor.inject_field(field_decl(ty("int"), "y"));
        editor.remove_method(9);
        assert!(matches!(editor.rebuild(), Err(InternalError::IndexOutOfRange { what: "method", index: 9 })));
        assert_eq!(class, before);
    }

    #[test]
    fn test_convert_to_enum() {
        let mut class = class_decl("S").final_().with_field(field_decl(ty("int"), "n"));
        let mut editor = TypeEditor::new(&mut class, None);
        editor.convert_to_enum(vec![enum_constant("INSTANCE")]);
        let _ = editor.rebuild().unwrap();
        assert!(class.is_enum());
        assert!(!class.modifiers.contains(Modifiers::FINAL));
        assert_eq!(class.enum_constants[0].name, "INSTANCE");
    }
}
