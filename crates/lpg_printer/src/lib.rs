//! lpg_printer: AST to Java text.
//!
//! Renders the neutral AST back into approximate Java source for
//! troubleshooting and for the emitter. Output is best-effort: it is
//! deterministic and readable, but nothing guarantees it compiles.

use lpg_ast::*;
use std::io;

/// Options for the printer.
#[derive(Debug, Clone)]
pub struct PrinterOptions {
    /// Indentation string.
    pub indent_str: String,
    /// Newline string.
    pub new_line: String,
    /// Whether to emit a trailing newline.
    pub trailing_newline: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            indent_str: "    ".to_string(),
            new_line: "\n".to_string(),
            trailing_newline: true,
        }
    }
}

impl PrinterOptions {
    pub fn with_indent(indent: usize) -> Self {
        Self {
            indent_str: " ".repeat(indent),
            ..Self::default()
        }
    }
}

/// Binding strength of expressions, used to decide where parentheses go.
mod prec {
    pub const ASSIGN: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const RELATIONAL: u8 = 9;
    pub const PREFIX: u8 = 13;
    pub const POSTFIX: u8 = 14;
    pub const PRIMARY: u8 = 15;
}

/// The printer converts AST nodes to text.
pub struct Printer {
    output: String,
    indent_level: u32,
    options: PrinterOptions,
    /// Return types of the methods being printed, innermost last.
    return_types: Vec<TypeRef>,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self::with_options(PrinterOptions::default())
    }

    pub fn with_options(options: PrinterOptions) -> Self {
        Self {
            output: String::with_capacity(4096),
            indent_level: 0,
            options,
            return_types: Vec::new(),
        }
    }

    /// Print a compilation unit to a string.
    pub fn print_unit(&mut self, unit: &CompilationUnit) -> String {
        self.reset();
        if let Some(package) = &unit.package {
            self.write("package ");
            self.write(package);
            self.write(";");
            self.write_newline();
            self.write_newline();
        }
        for import in &unit.imports {
            self.write("import ");
            self.write(import);
            self.write(";");
            self.write_newline();
        }
        if !unit.imports.is_empty() {
            self.write_newline();
        }
        for (i, ty) in unit.types.iter().enumerate() {
            if i > 0 {
                self.write_newline();
                self.write_newline();
            }
            self.emit_class(ty);
        }
        self.finish()
    }

    pub fn print_class(&mut self, class: &ClassDecl) -> String {
        self.reset();
        self.emit_class(class);
        self.finish()
    }

    pub fn print_method(&mut self, method: &MethodDecl) -> String {
        self.reset();
        self.emit_method(method);
        self.finish()
    }

    pub fn print_statement(&mut self, stmt: &Statement) -> String {
        self.reset();
        self.emit_statement(stmt);
        self.finish()
    }

    /// Print an expression without a trailing newline.
    pub fn print_expression(&mut self, expr: &Expression) -> String {
        self.reset();
        self.emit_expression(expr, 0);
        std::mem::take(&mut self.output)
    }

    fn reset(&mut self) {
        self.output.clear();
        self.indent_level = 0;
        self.return_types.clear();
    }

    fn finish(&mut self) -> String {
        if self.options.trailing_newline && !self.output.is_empty() {
            self.write_newline();
        }
        std::mem::take(&mut self.output)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn emit_annotations_block(&mut self, annotations: &[Annotation]) {
        for ann in annotations {
            self.emit_annotation(ann);
            self.write_newline();
            self.write_indent();
        }
    }

    fn emit_annotations_inline(&mut self, annotations: &[Annotation]) {
        for ann in annotations {
            self.emit_annotation(ann);
            self.write(" ");
        }
    }

    fn emit_annotation(&mut self, ann: &Annotation) {
        self.write("@");
        self.emit_type(&ann.ty);
        match ann.values.as_slice() {
            [] => {}
            [only] if only.name == "value" => {
                self.write("(");
                self.emit_expression(&only.value, 0);
                self.write(")");
            }
            values => {
                self.write("(");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write(&v.name);
                    self.write(" = ");
                    self.emit_expression(&v.value, 0);
                }
                self.write(")");
            }
        }
    }

    fn emit_modifiers(&mut self, modifiers: Modifiers) {
        for kw in modifiers.keywords() {
            self.write(kw);
            self.write(" ");
        }
    }

    fn emit_type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.write("<");
        for (i, tp) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&tp.name);
            for (j, bound) in tp.bounds.iter().enumerate() {
                self.write(if j == 0 { " extends " } else { " & " });
                self.emit_type(bound);
            }
        }
        self.write(">");
    }

    fn emit_type(&mut self, ty: &TypeRef) {
        self.write_owned(print_type(ty));
    }

    fn emit_class(&mut self, class: &ClassDecl) {
        self.emit_annotations_block(&class.annotations);
        self.emit_modifiers(class.modifiers);
        self.write(match class.kind {
            ClassKind::Class => "class ",
            ClassKind::Interface => "interface ",
            ClassKind::Enum => "enum ",
        });
        self.write(&class.name);
        self.emit_type_params(&class.type_params);
        if let Some(sup) = &class.superclass {
            self.write(" extends ");
            self.emit_type(sup);
        }
        if !class.interfaces.is_empty() {
            self.write(if class.is_interface() { " extends " } else { " implements " });
            self.emit_type_list(&class.interfaces);
        }
        self.write(" ");
        self.emit_class_body(class);
    }

    /// `{ members }`, shared by named and anonymous classes.
    fn emit_class_body(&mut self, class: &ClassDecl) {
        self.write("{");
        self.increase_indent();
        let mut first = true;
        if class.is_enum() {
            self.write_newline();
            self.write_indent();
            for (i, constant) in class.enum_constants.iter().enumerate() {
                if i > 0 {
                    self.write(", ");
                }
                self.write(&constant.name);
                if !constant.args.is_empty() {
                    self.emit_args(&constant.args);
                }
            }
            self.write(";");
            first = false;
        }
        for field in &class.fields {
            self.write_newline();
            self.write_indent();
            self.emit_field(field);
            first = false;
        }
        let separated = |p: &mut Printer, first: &mut bool| {
            if !*first {
                p.write_newline();
            }
            p.write_newline();
            p.write_indent();
            *first = false;
        };
        for init in &class.initializers {
            separated(self, &mut first);
            if init.is_static {
                self.write("static ");
            }
            self.emit_statement_block(&init.statements);
        }
        for ctor in &class.constructors {
            separated(self, &mut first);
            self.emit_constructor(ctor);
        }
        for method in &class.methods {
            separated(self, &mut first);
            self.emit_method(method);
        }
        for member in &class.member_types {
            separated(self, &mut first);
            self.emit_class(member);
        }
        self.decrease_indent();
        if !first {
            self.write_newline();
            self.write_indent();
        }
        self.write("}");
    }

    fn emit_field(&mut self, field: &FieldDecl) {
        self.emit_annotations_block(&field.annotations);
        self.emit_modifiers(field.modifiers);
        self.emit_type(&field.ty);
        self.write(" ");
        self.write(&field.name);
        if let Some(init) = &field.init {
            self.write(" = ");
            self.emit_expression(init, prec::ASSIGN);
        }
        self.write(";");
    }

    fn emit_method(&mut self, method: &MethodDecl) {
        self.emit_annotations_block(&method.annotations);
        if method.implementing && !method.has_annotation("Override") {
            self.write("@java.lang.Override");
            self.write_newline();
            self.write_indent();
        }
        self.emit_modifiers(method.modifiers);
        if !method.type_params.is_empty() {
            self.emit_type_params(&method.type_params);
            self.write(" ");
        }
        self.emit_type(&method.return_type);
        self.write(" ");
        self.write(&method.name);
        self.emit_params(&method.args);
        self.emit_throws(&method.thrown);
        if method.no_body {
            self.write(";");
            return;
        }
        self.write(" ");
        self.return_types.push(method.return_type.clone());
        self.emit_statement_block(&method.statements);
        self.return_types.pop();
    }

    fn emit_constructor(&mut self, ctor: &ConstructorDecl) {
        self.emit_annotations_block(&ctor.annotations);
        self.emit_modifiers(ctor.modifiers);
        if !ctor.type_params.is_empty() {
            self.emit_type_params(&ctor.type_params);
            self.write(" ");
        }
        self.write(&ctor.name);
        self.emit_params(&ctor.args);
        self.emit_throws(&ctor.thrown);
        self.write(" ");
        self.return_types.push(TypeRef::void());
        self.emit_statement_block(&ctor.statements);
        self.return_types.pop();
    }

    fn emit_params(&mut self, args: &[Argument]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_argument(arg);
        }
        self.write(")");
    }

    fn emit_argument(&mut self, arg: &Argument) {
        self.emit_annotations_inline(&arg.annotations);
        self.emit_modifiers(arg.modifiers);
        self.emit_type(&arg.ty);
        self.write(" ");
        self.write(&arg.name);
    }

    fn emit_throws(&mut self, thrown: &[TypeRef]) {
        if !thrown.is_empty() {
            self.write(" throws ");
            self.emit_type_list(thrown);
        }
    }

    fn emit_type_list(&mut self, types: &[TypeRef]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_type(ty);
        }
    }

    // ========================================================================
    // Statement printing
    // ========================================================================

    fn emit_statement_block(&mut self, statements: &[Statement]) {
        self.write("{");
        self.increase_indent();
        for stmt in statements {
            self.write_newline();
            self.write_indent();
            self.emit_statement(stmt);
        }
        self.decrease_indent();
        if !statements.is_empty() {
            self.write_newline();
            self.write_indent();
        }
        self.write("}");
    }

    /// The body of a control statement: blocks stay on the same line.
    fn emit_body(&mut self, body: &Statement) {
        if let Statement::Block(block) = body {
            self.write(" ");
            self.emit_statement_block(&block.statements);
        } else {
            self.increase_indent();
            self.write_newline();
            self.write_indent();
            self.emit_statement(body);
            self.decrease_indent();
        }
    }

    fn emit_local(&mut self, local: &LocalDecl) {
        self.emit_annotations_inline(&local.annotations);
        self.emit_modifiers(local.modifiers);
        self.emit_type(&local.ty);
        self.write(" ");
        self.write(&local.name);
        if let Some(init) = &local.init {
            self.write(" = ");
            self.emit_expression(init, prec::ASSIGN);
        }
    }

    fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(block) => self.emit_statement_block(&block.statements),
            Statement::Expression(expr) => {
                self.emit_expression(expr, 0);
                self.write(";");
            }
            Statement::LocalDecl(local) => {
                self.emit_local(local);
                self.write(";");
            }
            Statement::If(n) => {
                self.write("if (");
                self.emit_expression(&n.cond, 0);
                self.write(")");
                self.emit_body(&n.then);
                if let Some(otherwise) = &n.otherwise {
                    if matches!(*n.then, Statement::Block(_)) {
                        self.write(" ");
                    } else {
                        self.write_newline();
                        self.write_indent();
                    }
                    self.write("else");
                    if matches!(**otherwise, Statement::If(_)) {
                        self.write(" ");
                        self.emit_statement(otherwise);
                    } else {
                        self.emit_body(otherwise);
                    }
                }
            }
            Statement::While(n) => {
                self.write("while (");
                self.emit_expression(&n.cond, 0);
                self.write(")");
                self.emit_body(&n.body);
            }
            Statement::DoWhile(n) => {
                self.write("do");
                self.emit_body(&n.body);
                self.write(" while (");
                self.emit_expression(&n.cond, 0);
                self.write(");");
            }
            Statement::For(n) => {
                self.write("for (");
                for (i, init) in n.init.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    match init {
                        Statement::LocalDecl(local) => self.emit_local(local),
                        Statement::Expression(expr) => self.emit_expression(expr, 0),
                        other => self.emit_statement(other),
                    }
                }
                self.write("; ");
                if let Some(cond) = &n.cond {
                    self.emit_expression(cond, 0);
                }
                self.write("; ");
                for (i, update) in n.update.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expression(update, 0);
                }
                self.write(")");
                self.emit_body(&n.body);
            }
            Statement::Foreach(n) => {
                self.write("for (");
                self.emit_modifiers(n.var.modifiers);
                self.emit_type(&n.var.ty);
                self.write(" ");
                self.write(&n.var.name);
                self.write(" : ");
                self.emit_expression(&n.iterable, 0);
                self.write(")");
                self.emit_body(&n.body);
            }
            Statement::Switch(n) => {
                self.write("switch (");
                self.emit_expression(&n.selector, 0);
                self.write(") {");
                self.increase_indent();
                for case in &n.cases {
                    self.write_newline();
                    self.write_indent();
                    match &case.label {
                        Some(label) => {
                            self.write("case ");
                            self.emit_expression(label, 0);
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.increase_indent();
                    for stmt in &case.statements {
                        self.write_newline();
                        self.write_indent();
                        self.emit_statement(stmt);
                    }
                    self.decrease_indent();
                }
                self.decrease_indent();
                self.write_newline();
                self.write_indent();
                self.write("}");
            }
            Statement::Try(n) => {
                self.write("try ");
                self.emit_statement_block(&n.body.statements);
                for catch in &n.catches {
                    self.write(" catch (");
                    self.emit_argument(&catch.param);
                    self.write(") ");
                    self.emit_statement_block(&catch.body.statements);
                }
                if let Some(finally) = &n.finally {
                    self.write(" finally ");
                    self.emit_statement_block(&finally.statements);
                }
            }
            Statement::Synchronized(n) => {
                self.write("synchronized (");
                self.emit_expression(&n.lock, 0);
                self.write(") ");
                self.emit_statement_block(&n.body.statements);
            }
            Statement::Return(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.emit_expression(value, 0);
                }
                self.write(";");
            }
            Statement::ReturnDefault => match self.return_types.last().cloned() {
                Some(ty) if !ty.is_void() => {
                    self.write("return ");
                    self.emit_expression(&ty.default_value(), 0);
                    self.write(";");
                }
                _ => self.write("return;"),
            },
            Statement::Throw(value) => {
                self.write("throw ");
                self.emit_expression(value, 0);
                self.write(";");
            }
            Statement::Break(label) => self.emit_jump("break", label.as_deref()),
            Statement::Continue(label) => self.emit_jump("continue", label.as_deref()),
            Statement::Labeled(n) => {
                self.write(&n.label);
                self.write(": ");
                self.emit_statement(&n.body);
            }
            Statement::LocalClass(class) => self.emit_class(class),
            Statement::Empty => self.write(";"),
            Statement::Wrapped(w) => self.write(&w.text),
        }
    }

    fn emit_jump(&mut self, keyword: &str, label: Option<&str>) {
        self.write(keyword);
        if let Some(label) = label {
            self.write(" ");
            self.write(label);
        }
        self.write(";");
    }

    // ========================================================================
    // Expression printing
    // ========================================================================

    fn emit_args(&mut self, args: &[Expression]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expression(arg, prec::ASSIGN);
        }
        self.write(")");
    }

    /// Print `expr`, parenthesized if it binds looser than `min_prec`.
    fn emit_expression(&mut self, expr: &Expression, min_prec: u8) {
        let needs_parens = precedence(expr) < min_prec;
        if needs_parens {
            self.write("(");
        }
        match expr {
            Expression::Name(name) => self.write(name),
            Expression::This(qualifier) => {
                if let Some(q) = qualifier {
                    self.write(q);
                    self.write(".");
                }
                self.write("this");
            }
            Expression::FieldRef(n) => {
                self.emit_expression(&n.receiver, prec::PRIMARY);
                self.write(".");
                self.write(&n.name);
            }
            Expression::ArrayRef(n) => {
                self.emit_expression(&n.array, prec::PRIMARY);
                self.write("[");
                self.emit_expression(&n.index, 0);
                self.write("]");
            }
            Expression::Call(n) => {
                if let Some(receiver) = &n.receiver {
                    self.emit_expression(receiver, prec::PRIMARY);
                    self.write(".");
                }
                if !n.type_args.is_empty() {
                    self.write("<");
                    self.emit_type_list(&n.type_args);
                    self.write(">");
                }
                self.write(&n.name);
                self.emit_args(&n.args);
            }
            Expression::New(n) => {
                self.write("new ");
                self.emit_type(&n.ty);
                self.emit_args(&n.args);
                if let Some(body) = &n.body {
                    self.write(" ");
                    self.emit_class_body(body);
                }
            }
            Expression::NewArray(n) => {
                self.write("new ");
                self.emit_type(&n.ty);
                for dim in &n.dims {
                    self.write("[");
                    self.emit_expression(dim, 0);
                    self.write("]");
                }
                for _ in 0..n.extra_dims {
                    self.write("[]");
                }
                if let Some(init) = &n.init {
                    self.write(" ");
                    self.emit_array_init(&init.elements);
                }
            }
            Expression::ArrayInit(n) => self.emit_array_init(&n.elements),
            Expression::Binary(n) => {
                let p = n.op.precedence();
                self.emit_expression(&n.left, p);
                self.write(" ");
                self.write(n.op.as_str());
                self.write(" ");
                self.emit_expression(&n.right, p + 1);
            }
            Expression::Unary(n) => {
                if n.op.is_postfix() {
                    self.emit_expression(&n.operand, prec::POSTFIX);
                    self.write(n.op.as_str());
                } else {
                    self.write(n.op.as_str());
                    // `- -x` must not collapse into `--x`.
                    if let Expression::Unary(inner) = &*n.operand {
                        if !inner.op.is_postfix() && inner.op.as_str().starts_with(n.op.as_str()) {
                            self.write(" ");
                        }
                    }
                    self.emit_expression(&n.operand, prec::PREFIX);
                }
            }
            Expression::Assign(n) => {
                self.emit_expression(&n.target, prec::POSTFIX);
                self.write(" ");
                if let Some(op) = n.op {
                    self.write(op.as_str());
                }
                self.write("= ");
                self.emit_expression(&n.value, prec::ASSIGN);
            }
            Expression::InstanceOf(n) => {
                self.emit_expression(&n.expr, prec::RELATIONAL);
                self.write(" instanceof ");
                self.emit_type(&n.ty);
            }
            Expression::Cast(n) => {
                self.write("(");
                self.emit_type(&n.ty);
                self.write(") ");
                self.emit_expression(&n.expr, prec::PREFIX);
            }
            Expression::Conditional(n) => {
                self.emit_expression(&n.cond, prec::CONDITIONAL + 1);
                self.write(" ? ");
                self.emit_expression(&n.then, prec::ASSIGN);
                self.write(" : ");
                self.emit_expression(&n.otherwise, prec::CONDITIONAL);
            }
            Expression::Literal(lit) => self.write_owned(literal_to_string(lit)),
            Expression::ClassLiteral(ty) => {
                self.emit_type(ty);
                self.write(".class");
            }
            Expression::Annotation(ann) => self.emit_annotation(ann),
            Expression::Wrapped(w) => self.write(&w.text),
        }
        if needs_parens {
            self.write(")");
        }
    }

    fn emit_array_init(&mut self, elements: &[Expression]) {
        self.write("{");
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.emit_expression(element, prec::ASSIGN);
        }
        self.write("}");
    }

    // ========================================================================
    // Output helpers
    // ========================================================================

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn write_owned(&mut self, s: String) {
        self.output.push_str(&s);
    }

    fn write_newline(&mut self) {
        self.output.push_str(&self.options.new_line);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(&self.options.indent_str);
        }
    }

    fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    fn decrease_indent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }
}

/// Print a unit straight into a sink.
pub fn write_to(unit: &CompilationUnit, options: PrinterOptions, out: &mut dyn io::Write) -> io::Result<()> {
    let text = Printer::with_options(options).print_unit(unit);
    out.write_all(text.as_bytes())
}

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Assign(_) => prec::ASSIGN,
        Expression::Conditional(_) => prec::CONDITIONAL,
        Expression::Binary(b) => b.op.precedence(),
        Expression::InstanceOf(_) => prec::RELATIONAL,
        Expression::Cast(_) => prec::PREFIX,
        Expression::Unary(u) if u.op.is_postfix() => prec::POSTFIX,
        Expression::Unary(_) => prec::PREFIX,
        _ => prec::PRIMARY,
    }
}

/// Render a type reference: `java.util.Map<String, ? extends T>[]`.
pub fn print_type(ty: &TypeRef) -> String {
    let mut out = String::new();
    match ty.wildcard {
        Some(Wildcard::Unbound) => return "?".to_string(),
        Some(Wildcard::Extends) => out.push_str("? extends "),
        Some(Wildcard::Super) => out.push_str("? super "),
        None => {}
    }
    out.push_str(&ty.name);
    if !ty.type_args.is_empty() {
        out.push('<');
        for (i, arg) in ty.type_args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&print_type(arg));
        }
        out.push('>');
    }
    for _ in 0..ty.dims {
        out.push_str("[]");
    }
    out
}

pub fn literal_to_string(lit: &Literal) -> String {
    match lit {
        Literal::Null => "null".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::Long(l) => format!("{}L", l),
        Literal::Double(d) => format!("{:?}", d),
        Literal::Char(c) => format!("'{}'", escape_char(*c, '\'')),
        Literal::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                out.push_str(&escape_char(c, '"'));
            }
            out.push('"');
            out
        }
    }
}

fn escape_char(c: char, quote: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\0' => "\\0".to_string(),
        '\\' => "\\\\".to_string(),
        c if c == quote => format!("\\{}", c),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    fn expr(e: impl Into<Expression>) -> String {
        Printer::new().print_expression(&e.into())
    }

    #[test]
    fn test_print_type() {
        let t = ty("java.util.Map").arg(ty("String")).arg(TypeRef::extends_wildcard(ty("T")));
        assert_eq!(print_type(&t), "java.util.Map<String, ? extends T>");
        assert_eq!(print_type(&ty("int").dims(2)), "int[][]");
        assert_eq!(print_type(&TypeRef::unbound_wildcard()), "?");
    }

    #[test]
    fn test_literals() {
        assert_eq!(literal_to_string(&Literal::Long(3)), "3L");
        assert_eq!(literal_to_string(&Literal::Double(0.0)), "0.0");
        assert_eq!(literal_to_string(&Literal::Char('\0')), "'\\0'");
        assert_eq!(literal_to_string(&Literal::String("a\"b\n".into())), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_parenthesization() {
        assert_eq!(expr(binary(BinaryOp::Mul, add(name("a"), name("b")), name("c"))), "(a + b) * c");
        assert_eq!(expr(add(name("a"), binary(BinaryOp::Mul, name("b"), name("c")))), "a + b * c");
        assert_eq!(expr(binary(BinaryOp::Sub, name("a"), binary(BinaryOp::Sub, name("b"), name("c")))), "a - (b - c)");
        assert_eq!(expr(not(instance_of(name("e"), ty("Error")))), "!(e instanceof Error)");
        assert_eq!(expr(call("get").on(cast(ty("List"), name("o")))), "((List) o).get()");
        assert_eq!(expr(not(call("isEmpty").on(name("s")))), "!s.isEmpty()");
    }

    #[test]
    fn test_unary_spacing() {
        assert_eq!(expr(unary(UnaryOp::Neg, unary(UnaryOp::Neg, name("x")))), "- -x");
        assert_eq!(expr(post_inc(name("i"))), "i++");
    }

    #[test]
    fn test_new_array_forms() {
        assert_eq!(expr(new_array(ty("Object"), int(0))), "new Object[0]");
        assert_eq!(expr(new_array_init(ty("String"), [string("a")])), "new String[] {\"a\"}");
    }

    #[test]
    fn test_return_default_uses_enclosing_method() {
        let m = method(ty("boolean"), "f").stmt(return_default());
        assert_eq!(Printer::new().print_method(&m), "boolean f() {\n    return false;\n}\n");
        let v = method(TypeRef::void(), "g").stmt(return_default());
        assert_eq!(Printer::new().print_method(&v), "void g() {\n    return;\n}\n");
    }
}
