//! Dispatches annotation occurrences in a compilation unit to their handlers.
//!
//! Within one type, type-level annotations run first, then field
//! annotations, then method annotations, then generator methods, and finally
//! member types (including any a handler just injected). Occurrences are
//! snapshotted up front and re-located before each dispatch, since earlier
//! handlers may have consumed annotations or removed members.

use crate::editor::{AnnotationSite, TypeEditor};
use crate::handler::{Handler, HandlerContext, Outcome, Target};
use crate::handlers::yielder;
use crate::registry::HandlerRegistry;
use crate::resolver::TypeResolver;
use lpg_ast::{Annotation, ClassDecl, CompilationUnit};
use lpg_diagnostics::DiagnosticCollection;
use lpg_options::TransformOptions;

pub struct Transformer<'r> {
    registry: HandlerRegistry,
    options: TransformOptions,
    resolver: &'r dyn TypeResolver,
}

impl<'r> Transformer<'r> {
    pub fn new(options: TransformOptions, resolver: &'r dyn TypeResolver) -> Self {
        Self {
            registry: HandlerRegistry::new(&options),
            options,
            resolver,
        }
    }

    pub fn with_registry(registry: HandlerRegistry, options: TransformOptions, resolver: &'r dyn TypeResolver) -> Self {
        Self {
            registry,
            options,
            resolver,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Run every handler over `unit`, returning the diagnostics it produced.
    pub fn transform_unit(&self, unit: &mut CompilationUnit) -> DiagnosticCollection {
        let _span = tracing::debug_span!("transform_unit", file = %unit.file_name).entered();
        let mut diagnostics = DiagnosticCollection::new();
        for class in &mut unit.types {
            self.transform_class(class, &unit.file_name, &mut diagnostics);
        }
        tracing::debug!(
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            "unit transformed"
        );
        diagnostics
    }

    fn transform_class(&self, class: &mut ClassDecl, file: &str, diagnostics: &mut DiagnosticCollection) {
        if class.local || class.anonymous {
            return;
        }
        let _span = tracing::trace_span!("type", name = %class.name).entered();

        // A failed occurrence keeps its annotation, so re-locating the next
        // equal one must step past every earlier failure with the same key.
        let type_annotations: Vec<Annotation> = class
            .annotations
            .iter()
            .filter(|a| self.registry.for_annotation(a).is_some())
            .cloned()
            .collect();
        let mut failed: Vec<Annotation> = Vec::new();
        for annotation in type_annotations {
            let skip = failed.iter().filter(|a| **a == annotation).count();
            let Some(index) = nth_position(&class.annotations, &annotation, skip) else {
                continue;
            };
            if !self.dispatch(class, Target::Type, AnnotationSite::Type(index), annotation.clone(), file, diagnostics) {
                failed.push(annotation);
            }
        }

        let field_annotations: Vec<(String, Annotation)> = class
            .fields
            .iter()
            .flat_map(|f| {
                f.annotations
                    .iter()
                    .filter(|a| self.registry.for_annotation(a).is_some())
                    .map(|a| (f.name.clone(), a.clone()))
            })
            .collect();
        let mut failed: Vec<(String, Annotation)> = Vec::new();
        for (field_name, annotation) in field_annotations {
            let skip = failed.iter().filter(|(n, a)| *n == field_name && *a == annotation).count();
            let Some(field) = class.fields.iter().position(|f| f.name == field_name) else {
                continue;
            };
            let Some(index) = nth_position(&class.fields[field].annotations, &annotation, skip) else {
                continue;
            };
            let site = AnnotationSite::Field(field, index);
            if !self.dispatch(class, Target::Field(field), site, annotation.clone(), file, diagnostics) {
                failed.push((field_name, annotation));
            }
        }

        let method_annotations: Vec<(String, Annotation)> = class
            .methods
            .iter()
            .flat_map(|m| {
                m.annotations
                    .iter()
                    .filter(|a| self.registry.for_annotation(a).is_some())
                    .map(|a| (m.name.clone(), a.clone()))
            })
            .collect();
        let mut failed: Vec<(String, Annotation)> = Vec::new();
        for (method_name, annotation) in method_annotations {
            let skip = failed.iter().filter(|(n, a)| *n == method_name && *a == annotation).count();
            let wanted = &annotation;
            let Some((method, index)) = class
                .methods
                .iter()
                .enumerate()
                .filter(|(_, m)| m.name == method_name)
                .flat_map(move |(m, decl)| {
                    decl.annotations
                        .iter()
                        .enumerate()
                        .filter(move |(_, a)| *a == wanted)
                        .map(move |(i, _)| (m, i))
                })
                .nth(skip)
            else {
                continue;
            };
            let site = AnnotationSite::Method(method, index);
            if !self.dispatch(class, Target::Method(method), site, annotation.clone(), file, diagnostics) {
                failed.push((method_name, annotation));
            }
        }

        if let Some(handler) = self.registry.yield_handler() {
            let mut index = 0;
            while index < class.methods.len() {
                if yielder::uses_yield(&class.methods[index]) {
                    self.dispatch_yield(handler, class, index, file, diagnostics);
                }
                index += 1;
            }
        }

        for member in &mut class.member_types {
            self.transform_class(member, file, diagnostics);
        }
    }

    /// Returns `false` when the handler failed and left the annotation in place.
    fn dispatch(
        &self,
        class: &mut ClassDecl,
        target: Target,
        site: AnnotationSite,
        annotation: Annotation,
        file: &str,
        diagnostics: &mut DiagnosticCollection,
    ) -> bool {
        let Some(handler) = self.registry.for_annotation(&annotation) else {
            return false;
        };
        let span = annotation.data.span;
        let annotation_name = annotation.ty.simple_name().to_string();
        let mut ctx = HandlerContext::new(&self.options, self.resolver, Some(annotation), file, span);
        let editor = TypeEditor::new(class, span).consuming(site);
        let result = handler.handle(&mut ctx, editor, target);
        for warning in ctx.take_warnings() {
            diagnostics.add(warning);
        }

        match result {
            Ok(Outcome::Applied(_)) => {
                tracing::debug!(handler = handler.name(), ?target, "applied");
                true
            }
            Ok(Outcome::Skipped) => {
                tracing::debug!(handler = handler.name(), ?target, "skipped");
                remove_annotation(class, site);
                true
            }
            Err(err) => {
                tracing::warn!(handler = handler.name(), ?target, error = %err, "handler failed");
                diagnostics.add(err.to_diagnostic(&annotation_name).located(file, span));
                false
            }
        }
    }

    fn dispatch_yield(
        &self,
        handler: &dyn Handler,
        class: &mut ClassDecl,
        method: usize,
        file: &str,
        diagnostics: &mut DiagnosticCollection,
    ) {
        let span = class.methods[method].data.span;
        let mut ctx = HandlerContext::new(&self.options, self.resolver, None, file, span);
        let editor = TypeEditor::new(class, span);
        let result = handler.handle(&mut ctx, editor, Target::Method(method));
        for warning in ctx.take_warnings() {
            diagnostics.add(warning);
        }
        match result {
            Ok(_) => tracing::debug!(handler = handler.name(), method, "generator compiled"),
            Err(err) => {
                tracing::warn!(handler = handler.name(), method, error = %err, "generator rejected");
                diagnostics.add(err.to_diagnostic("yield").located(file, span));
            }
        }
    }
}

/// Index of the `skip`-th annotation equal to `annotation`.
fn nth_position(annotations: &[Annotation], annotation: &Annotation, skip: usize) -> Option<usize> {
    annotations
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == annotation)
        .map(|(i, _)| i)
        .nth(skip)
}

fn remove_annotation(class: &mut ClassDecl, site: AnnotationSite) {
    let annotations = match site {
        AnnotationSite::Type(_) => Some(&mut class.annotations),
        AnnotationSite::Field(f, _) => class.fields.get_mut(f).map(|f| &mut f.annotations),
        AnnotationSite::Method(m, _) => class.methods.get_mut(m).map(|m| &mut m.annotations),
    };
    let index = match site {
        AnnotationSite::Type(a) | AnnotationSite::Field(_, a) | AnnotationSite::Method(_, a) => a,
    };
    if let Some(annotations) = annotations {
        if index < annotations.len() {
            annotations.remove(index);
        }
    }
}
