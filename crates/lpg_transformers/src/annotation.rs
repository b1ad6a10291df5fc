//! Typed access to annotation members.

use crate::error::AnnotationError;
use lpg_ast::{AccessLevel, Annotation, Expression, Literal, TypeRef};

/// A reader over the members of one annotation.
///
/// Absent members read as `None` (or an empty list); present members of the
/// wrong shape are an [`AnnotationError`].
#[derive(Debug, Clone, Copy)]
pub struct AnnotationValues<'a> {
    annotation: &'a Annotation,
}

impl<'a> AnnotationValues<'a> {
    pub fn new(annotation: &'a Annotation) -> Self {
        Self { annotation }
    }

    pub fn annotation(&self) -> &'a Annotation {
        self.annotation
    }

    pub fn has(&self, member: &str) -> bool {
        self.annotation.get(member).is_some()
    }

    pub fn string(&self, member: &str) -> Result<Option<String>, AnnotationError> {
        match self.annotation.get(member) {
            None => Ok(None),
            Some(Expression::Literal(Literal::String(s))) => Ok(Some(s.clone())),
            Some(_) => Err(mismatch(member, "a string")),
        }
    }

    pub fn string_or(&self, member: &str, default: &str) -> Result<String, AnnotationError> {
        Ok(self.string(member)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn bool(&self, member: &str) -> Result<Option<bool>, AnnotationError> {
        match self.annotation.get(member) {
            None => Ok(None),
            Some(Expression::Literal(Literal::Bool(b))) => Ok(Some(*b)),
            Some(_) => Err(mismatch(member, "a boolean")),
        }
    }

    pub fn bool_or(&self, member: &str, default: bool) -> Result<bool, AnnotationError> {
        Ok(self.bool(member)?.unwrap_or(default))
    }

    /// A string array; a single string is accepted as a one-element array.
    pub fn strings(&self, member: &str) -> Result<Vec<String>, AnnotationError> {
        self.elements(member)?
            .into_iter()
            .map(|e| match e {
                Expression::Literal(Literal::String(s)) => Ok(s.clone()),
                _ => Err(mismatch(member, "a string array")),
            })
            .collect()
    }

    /// A class-literal array: `{Foo.class, Bar.class}`.
    pub fn classes(&self, member: &str) -> Result<Vec<TypeRef>, AnnotationError> {
        self.elements(member)?
            .into_iter()
            .map(|e| match e {
                Expression::ClassLiteral(ty) => Ok(ty.clone()),
                _ => Err(mismatch(member, "a class literal array")),
            })
            .collect()
    }

    pub fn class(&self, member: &str) -> Result<Option<TypeRef>, AnnotationError> {
        match self.annotation.get(member) {
            None => Ok(None),
            Some(Expression::ClassLiteral(ty)) => Ok(Some(ty.clone())),
            Some(_) => Err(mismatch(member, "a class literal")),
        }
    }

    /// An enum constant reference, returned as its simple name.
    pub fn enum_constant(&self, member: &str) -> Result<Option<String>, AnnotationError> {
        match self.annotation.get(member) {
            None => Ok(None),
            Some(expr) => constant_name(expr)
                .map(|name| Some(name.to_string()))
                .ok_or_else(|| mismatch(member, "an enum constant")),
        }
    }

    pub fn access_level(&self, member: &str) -> Result<Option<AccessLevel>, AnnotationError> {
        match self.enum_constant(member)? {
            None => Ok(None),
            Some(name) => AccessLevel::from_constant(&name)
                .map(Some)
                .ok_or(AnnotationError::UnknownConstant {
                    member: member.to_string(),
                    value: name,
                }),
        }
    }

    /// Nested annotations, single or in an array.
    pub fn annotations(&self, member: &str) -> Result<Vec<Annotation>, AnnotationError> {
        self.elements(member)?
            .into_iter()
            .map(|e| match e {
                Expression::Annotation(ann) => Ok(ann.clone()),
                _ => Err(mismatch(member, "an annotation array")),
            })
            .collect()
    }

    fn elements(&self, member: &str) -> Result<Vec<&'a Expression>, AnnotationError> {
        Ok(match self.annotation.get(member) {
            None => Vec::new(),
            Some(Expression::ArrayInit(init)) => init.elements.iter().collect(),
            Some(single) => vec![single],
        })
    }
}

fn mismatch(member: &str, expected: &'static str) -> AnnotationError {
    AnnotationError::TypeMismatch {
        member: member.to_string(),
        expected,
    }
}

/// `AccessLevel.PUBLIC`, `PUBLIC` or a dotted name, as a simple constant name.
fn constant_name(expr: &Expression) -> Option<&str> {
    match expr {
        Expression::Name(name) => Some(lpg_ast::simple_name(name)),
        Expression::FieldRef(f) => Some(&f.name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    fn sample() -> Annotation {
        annotation(ty("Builder"))
            .value("prefix", string("with"))
            .value("exclude", array_init([string("a"), string("b")]))
            .value("callMethods", string("toString"))
            .value("value", name("AccessLevel.PROTECTED"))
            .value("allowReset", true_())
            .value("types", array_init([class_lit(ty("IOException"))]))
    }

    #[test]
    fn test_typed_members() {
        let ann = sample();
        let values = AnnotationValues::new(&ann);
        assert_eq!(values.string("prefix").unwrap().as_deref(), Some("with"));
        assert_eq!(values.strings("exclude").unwrap(), vec!["a", "b"]);
        assert_eq!(values.strings("callMethods").unwrap(), vec!["toString"]);
        assert_eq!(values.strings("missing").unwrap(), Vec::<String>::new());
        assert_eq!(values.access_level("value").unwrap(), Some(AccessLevel::Protected));
        assert_eq!(values.bool_or("allowReset", false).unwrap(), true);
        assert_eq!(values.classes("types").unwrap(), vec![ty("IOException")]);
    }

    #[test]
    fn test_mismatch_is_an_error() {
        let ann = sample();
        let values = AnnotationValues::new(&ann);
        assert!(matches!(values.bool("prefix"), Err(AnnotationError::TypeMismatch { .. })));
        let bad = annotation(ty("X")).value("value", name("SOMETIMES"));
        assert!(matches!(
            AnnotationValues::new(&bad).access_level("value"),
            Err(AnnotationError::UnknownConstant { .. })
        ));
    }
}
