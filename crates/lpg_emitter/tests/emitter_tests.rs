//! Emitter integration tests: printed Java written to disk.

use lpg_ast::factory::*;
use lpg_ast::{CompilationUnit, TypeRef};
use lpg_emitter::Emitter;
use pretty_assertions::assert_eq;

fn point_unit() -> CompilationUnit {
    CompilationUnit {
        package: Some("geo".to_string()),
        ..CompilationUnit::new("src/Point.java")
    }
    .with_type(
        class_decl("Point")
            .with_field(field_decl(ty("int"), "x").private())
            .with_method(method(TypeRef::void(), "reset").public().stmt(assign(name("x"), int(0)))),
    )
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn test_emit_prints_java() {
    let result = Emitter::new().emit(&point_unit()).unwrap();
    assert!(result.java.starts_with("package geo;\n\nclass Point {\n"));
    assert!(result.java.contains("    private int x;\n"));
    assert!(result.java.contains("    public void reset() {\n        x = 0;\n    }\n"));
}

#[test]
fn test_emit_respects_indent() {
    let mut emitter = Emitter::new();
    emitter.indent = 2;
    let result = emitter.emit(&point_unit()).unwrap();
    assert!(result.java.contains("\n  private int x;\n"));
    assert!(result.java.contains("\n    x = 0;\n"));
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn test_write_output_files_creates_package_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let mut emitter = Emitter::new();
    emitter.out_dir = Some(dir.path().to_path_buf());
    emitter.emit_ast = true;

    let result = emitter.emit(&point_unit()).unwrap();
    emitter.write_output_files(&result).unwrap();

    let java = std::fs::read_to_string(dir.path().join("geo").join("Point.java")).unwrap();
    assert_eq!(java, result.java);
    let ast = std::fs::read_to_string(dir.path().join("geo").join("Point.ast.json")).unwrap();
    let back: CompilationUnit = serde_json::from_str(&ast).unwrap();
    assert_eq!(back, point_unit());
}
