//! AST integration tests.
//!
//! Tests loading compilation units from JSON and building equivalent trees
//! through the factory.

use lpg_ast::factory::*;
use lpg_ast::visitor::AstVisitor;
use lpg_ast::*;
use pretty_assertions::assert_eq;

const POINT_JSON: &str = r#"{
    "file_name": "Point.java",
    "package": "geo",
    "types": [{
        "name": "Point",
        "modifiers": "PUBLIC",
        "annotations": [{ "ty": { "name": "lombok.Builder" }, "data": { "span": { "start": 10, "length": 8 } } }],
        "fields": [
            { "ty": { "name": "int" }, "name": "x", "modifiers": "PRIVATE | FINAL" },
            { "ty": { "name": "java.util.List", "type_args": [{ "name": "String" }] }, "name": "tags",
              "modifiers": "PRIVATE | FINAL" }
        ],
        "methods": [{
            "return_type": { "name": "int" },
            "name": "getX",
            "modifiers": "PUBLIC",
            "statements": [{ "Return": { "FieldRef": { "receiver": { "This": null }, "name": "x" } } }]
        }]
    }]
}"#;

/// Helper: deserialize the sample unit.
fn load_point() -> CompilationUnit {
    serde_json::from_str(POINT_JSON).unwrap()
}

// ============================================================================
// Deserialization
// ============================================================================

#[test]
fn test_load_unit_from_json() {
    let unit = load_point();
    assert_eq!(unit.file_name, "Point.java");
    assert_eq!(unit.package.as_deref(), Some("geo"));
    let point = unit.find_type("Point").unwrap();
    assert!(point.has_annotation("Builder"));
    assert_eq!(point.annotations[0].data.span.map(|s| s.start), Some(10));
    assert_eq!(point.fields.len(), 2);
    assert!(point.fields.iter().all(|f| f.is_final() && !f.is_static()));
}

#[test]
fn test_json_matches_factory_built_tree() {
    let unit = load_point();
    let expected = method(ty("int"), "getX").public().stmt(return_(this_field("x")));
    assert_eq!(unit.types[0].methods[0], expected);
    assert_eq!(
        unit.types[0].fields[1].ty,
        ty("java.util.List").arg(ty("String"))
    );
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_serialized_tree_omits_empty_optionals() {
    let field = field_decl(ty("int"), "x").private();
    let json = serde_json::to_value(&field).unwrap();
    assert!(json.get("init").is_none());
    assert_eq!(json["ty"], serde_json::json!({ "name": "int" }));
}

#[test]
fn test_synthesized_flag_survives_serialization() {
    let mut field = field_decl(ty("Object"), "$lock");
    field.data.stamp(Some(lpg_core::TextSpan::new(1, 2)));
    let text = serde_json::to_string(&field).unwrap();
    let back: FieldDecl = serde_json::from_str(&text).unwrap();
    assert!(back.data.is_synthesized());
    assert_eq!(back, field);
}

// ============================================================================
// Traversal
// ============================================================================

struct CountMethods(usize);

impl<'a> AstVisitor<'a> for CountMethods {
    fn visit_method(&mut self, method: &'a MethodDecl) {
        self.0 += 1;
        lpg_ast::visitor::walk_method(self, method);
    }
}

#[test]
fn test_visitor_counts_nested_methods() {
    let unit = CompilationUnit::new("A.java").with_type(
        class_decl("A")
            .with_method(method(TypeRef::void(), "a"))
            .with_member_type(class_decl("B").with_method(method(TypeRef::void(), "b").stmt(
                class_decl("Local").with_method(method(TypeRef::void(), "c")),
            ))),
    );
    let mut counter = CountMethods(0);
    counter.visit_unit(&unit);
    assert_eq!(counter.0, 3);
}
