//! The interpreter: class initialization, instances, method dispatch and
//! the public entry points. Statements live in `exec`, expressions in `eval`.

use crate::builtins;
use crate::classes::{ClassId, ClassRef, ClassTable, InitState, Nesting};
use crate::error::{mismatch, EvalError, EvalResult, Exec, Unwind};
use crate::frame::{Flow, Frame};
use crate::ops;
use crate::value::{default_value, java_double, Instance, ObjRef, Object, Throwable, Value};
use lpg_ast::{simple_name, CompilationUnit, Expression, MethodDecl, Modifiers, Statement, TypeRef};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Calls deeper than this throw `StackOverflowError`.
const MAX_DEPTH: usize = 200;

/// Converts a value to the declared primitive type it is stored in.
pub(crate) fn coerce(value: Value, ty: &TypeRef) -> Value {
    if !ty.is_primitive() || ty.is_boolean() {
        return value;
    }
    ops::convert(&value, &ty.name).unwrap_or(value)
}

/// Executes programs built from [`CompilationUnit`]s on a single thread.
///
/// Classes initialize lazily on first use. Java exceptions that escape an
/// entry point surface as [`EvalError::Uncaught`].
pub struct Interpreter {
    pub(crate) classes: ClassTable,
    output: String,
    depth: usize,
}

impl Interpreter {
    pub fn new(units: &[CompilationUnit]) -> Self {
        Interpreter {
            classes: ClassTable::load(units),
            output: String::new(),
            depth: 0,
        }
    }

    /// Everything printed through `System.out`.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// `new Class(args)` for a top-level or static member class.
    pub fn instantiate(&mut self, class: &str, args: Vec<Value>) -> EvalResult<Value> {
        let id = self.class_named(class)?;
        let result = self.construct(id, args, None, Rc::default(), None);
        self.settle(result)
    }

    pub fn call_static(&mut self, class: &str, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let id = self.class_named(class)?;
        let result = self.invoke_static(id, method, args);
        self.settle(result)
    }

    pub fn call_method(&mut self, receiver: &Value, method: &str, args: Vec<Value>) -> EvalResult<Value> {
        let result = self.dispatch(receiver, method, args);
        self.settle(result)
    }

    pub fn field(&mut self, target: &Value, name: &str) -> EvalResult<Value> {
        let result = self.get_field(target, name);
        self.settle(result)
    }

    pub fn static_field(&mut self, class: &str, name: &str) -> EvalResult<Value> {
        let id = self.class_named(class)?;
        let result = self.static_member(&ClassRef::User(id), name);
        self.settle(result)
    }

    /// Pulls up to `limit` elements from an iterator, an iterable, a list
    /// or an array.
    pub fn drain(&mut self, source: &Value, limit: usize) -> EvalResult<Vec<Value>> {
        let result = self.drain_inner(source, limit);
        self.settle(result)
    }

    /// `String.valueOf(value)`, calling a user `toString()` when present.
    pub fn stringify(&mut self, value: &Value) -> EvalResult<String> {
        let result = self.stringify_value(value);
        self.settle(result)
    }

    /// The simple class name of a value, boxing primitives.
    pub fn class_name(&self, value: &Value) -> String {
        self.type_name(value)
    }

    /// `value instanceof ty`.
    pub fn is_instance(&self, value: &Value, ty: &TypeRef) -> bool {
        if ty.dims > 0 {
            return value
                .as_object()
                .is_some_and(|obj| matches!(&*obj.borrow(), Object::Array(_)));
        }
        self.is_a_named(value, &ty.name)
    }

    // ========================================================================
    // Entry point plumbing
    // ========================================================================

    fn class_named(&self, class: &str) -> EvalResult<ClassId> {
        match self.classes.resolve(None, class) {
            Some(ClassRef::User(id)) => Ok(id),
            _ => Err(EvalError::UnknownType(class.to_string())),
        }
    }

    fn settle<T>(&self, result: Exec<T>) -> EvalResult<T> {
        result.map_err(|unwind| match unwind {
            Unwind::Error(err) => err,
            Unwind::Throw(thrown) => {
                let (class, message) = self.describe_throwable(&thrown);
                tracing::debug!(%class, "uncaught exception");
                EvalError::Uncaught { class, message }
            }
        })
    }

    fn describe_throwable(&self, thrown: &Value) -> (String, Option<String>) {
        if let Some(obj) = thrown.as_object() {
            match &*obj.borrow() {
                Object::Throwable(t) => return (t.class.clone(), t.message.clone()),
                Object::Instance(inst) => {
                    let message = inst.base.as_ref().and_then(|b| b.message.clone());
                    return (self.classes.get(inst.class).name().to_string(), message);
                }
                _ => {}
            }
        }
        (self.type_name(thrown), None)
    }

    fn drain_inner(&mut self, source: &Value, limit: usize) -> Exec<Vec<Value>> {
        if let Some(mut items) = source.items() {
            items.truncate(limit);
            return Ok(items);
        }
        let is_iterator = match source.as_object() {
            Some(obj) => match &*obj.borrow() {
                Object::Iter { .. } => true,
                Object::Instance(inst) => self.classes.find_method(inst.class, "hasNext", 0).is_some(),
                _ => false,
            },
            None => false,
        };
        let iterator = if is_iterator {
            source.clone()
        } else {
            self.dispatch(source, "iterator", Vec::new())?
        };
        let mut out = Vec::new();
        while out.len() < limit && self.has_next(&iterator)? {
            out.push(self.dispatch(&iterator, "next", Vec::new())?);
        }
        Ok(out)
    }

    pub(crate) fn has_next(&mut self, iterator: &Value) -> Exec<bool> {
        let more = self.dispatch(iterator, "hasNext", Vec::new())?;
        more.as_bool().ok_or_else(|| mismatch("boolean", &more))
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub(crate) fn type_name(&self, value: &Value) -> String {
        match value {
            Value::Ref(obj) => match &*obj.borrow() {
                Object::Instance(inst) => self.classes.get(inst.class).name().to_string(),
                Object::Throwable(t) => t.class.clone(),
                other => other.kind().to_string(),
            },
            other => boxed_class(other).unwrap_or("null").to_string(),
        }
    }

    pub(crate) fn is_a_named(&self, value: &Value, target: &str) -> bool {
        let simple = simple_name(target);
        match value {
            Value::Null => false,
            Value::Ref(obj) => match &*obj.borrow() {
                Object::Instance(inst) => self.classes.is_a(inst.class, target),
                Object::Throwable(t) => builtins::builtin_is_a(&t.class, simple),
                Object::Array(_) => simple == "Object",
                other => builtins::builtin_is_a(other.kind(), simple),
            },
            other => boxed_class(other).is_some_and(|class| builtins::builtin_is_a(class, simple)),
        }
    }

    fn is_checked(&self, thrown: &Value) -> bool {
        if let Some(obj) = thrown.as_object() {
            if let Object::Throwable(t) = &*obj.borrow() {
                return builtins::is_checked(&t.class);
            }
        }
        !self.is_a_named(thrown, "RuntimeException") && !self.is_a_named(thrown, "Error")
    }

    // ========================================================================
    // Classes and instances
    // ========================================================================

    /// Runs static initialization once: superclass first, then enum
    /// constants, static fields and static initializer blocks in order.
    pub(crate) fn ensure_init(&mut self, id: ClassId) -> Exec<()> {
        if self.classes.get(id).init != InitState::Pending {
            return Ok(());
        }
        self.classes.get_mut(id).init = InitState::Running;
        if let Some(ClassRef::User(superclass)) = self.classes.get(id).superclass.clone() {
            self.ensure_init(superclass)?;
        }

        let decl = Rc::clone(&self.classes.get(id).decl);
        let interface = decl.is_interface();
        let statics = decl.fields.iter().filter(|f| f.is_static() || interface);
        for field in statics.clone() {
            let value = default_value(&field.ty);
            self.classes.get_mut(id).statics.insert(field.name.clone(), value);
        }

        let mut frame = Frame::new(id, None);
        for (ordinal, constant) in decl.enum_constants.iter().enumerate() {
            let args = self.eval_args(&mut frame, &constant.args)?;
            let tag = (Rc::from(constant.name.as_str()), ordinal as i32);
            let value = self.construct(id, args, None, Rc::default(), Some(tag))?;
            let info = self.classes.get_mut(id);
            info.statics.insert(constant.name.clone(), value.clone());
            info.constants.push(value);
        }
        for field in statics {
            if let Some(init) = &field.init {
                let value = self.eval(&mut frame, init)?;
                let value = coerce(value, &field.ty);
                self.classes.get_mut(id).statics.insert(field.name.clone(), value);
            }
        }
        for initializer in decl.initializers.iter().filter(|i| i.is_static) {
            self.exec_body(&mut frame, &initializer.statements)?;
        }

        self.classes.get_mut(id).init = InitState::Done;
        tracing::trace!(class = %self.classes.get(id).qualified, "class initialized");
        Ok(())
    }

    pub(crate) fn construct(
        &mut self,
        id: ClassId,
        args: Vec<Value>,
        outer: Option<Value>,
        captured: Rc<FxHashMap<String, Value>>,
        constant: Option<(Rc<str>, i32)>,
    ) -> Exec<Value> {
        let decl = &self.classes.get(id).decl;
        if decl.is_interface() || decl.modifiers.contains(Modifiers::ABSTRACT) {
            return Err(EvalError::NotInstantiable(self.classes.get(id).qualified.clone()).into());
        }
        self.ensure_init(id)?;

        let mut fields = FxHashMap::default();
        for class in self.classes.chain(id) {
            for field in self.classes.get(class).decl.fields.iter().filter(|f| !f.is_static()) {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| default_value(&field.ty));
            }
        }
        let value = Value::object(Object::Instance(Instance {
            class: id,
            fields,
            outer,
            captured,
            constant,
            base: None,
        }));
        self.run_constructor(id, &value, args)?;
        Ok(value)
    }

    /// Runs the constructor of `id` matching `args`: an explicit `this(...)`
    /// or `super(...)` first, then field initializers, then the body.
    fn run_constructor(&mut self, id: ClassId, this: &Value, args: Vec<Value>) -> Exec<()> {
        let decl = Rc::clone(&self.classes.get(id).decl);
        if decl.constructors.is_empty() {
            // Anonymous classes hand their arguments to the superclass.
            if !args.is_empty() && self.classes.get(id).nesting != Nesting::Anonymous {
                return Err(self.no_constructor(id, args.len()));
            }
            self.run_super(id, this, args)?;
            return self.init_fields(id, this);
        }

        let Some(ctor) = decl.constructors.iter().find(|c| c.args.len() == args.len()) else {
            return Err(self.no_constructor(id, args.len()));
        };
        let mut frame = Frame::new(id, Some(this.clone()));
        for (param, value) in ctor.args.iter().zip(args) {
            frame.declare(&param.name, coerce(value, &param.ty));
        }

        let mut body = ctor.statements.as_slice();
        match body.first().and_then(explicit_constructor_call) {
            Some(("this", call_args)) => {
                let args = self.eval_args(&mut frame, call_args)?;
                self.run_constructor(id, this, args)?;
                body = &body[1..];
            }
            Some((_, call_args)) => {
                let args = self.eval_args(&mut frame, call_args)?;
                self.run_super(id, this, args)?;
                self.init_fields(id, this)?;
                body = &body[1..];
            }
            None => {
                self.run_super(id, this, Vec::new())?;
                self.init_fields(id, this)?;
            }
        }

        match self.exec_body(&mut frame, body)? {
            Flow::Normal | Flow::Return(_) => Ok(()),
            Flow::Break(_) => Err(EvalError::StrayJump("break").into()),
            Flow::Continue(_) => Err(EvalError::StrayJump("continue").into()),
        }
    }

    fn no_constructor(&self, id: ClassId, arity: usize) -> Unwind {
        Unwind::Error(EvalError::UnknownConstructor {
            class: self.classes.get(id).qualified.clone(),
            arity,
        })
    }

    fn run_super(&mut self, id: ClassId, this: &Value, args: Vec<Value>) -> Exec<()> {
        match self.classes.get(id).superclass.clone() {
            Some(ClassRef::User(superclass)) => self.run_constructor(superclass, this, args),
            Some(ClassRef::Builtin(name)) if builtins::is_throwable(&name) => {
                let base = self.throwable_state(&name, args)?;
                if let Some(obj) = this.as_object() {
                    if let Object::Instance(inst) = &mut *obj.borrow_mut() {
                        inst.base = Some(base);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn init_fields(&mut self, id: ClassId, this: &Value) -> Exec<()> {
        let decl = Rc::clone(&self.classes.get(id).decl);
        let mut frame = Frame::new(id, Some(this.clone()));
        for field in decl.fields.iter().filter(|f| !f.is_static()) {
            if let Some(init) = &field.init {
                let value = self.eval(&mut frame, init)?;
                let value = coerce(value, &field.ty);
                if let Some(obj) = this.as_object() {
                    if let Object::Instance(inst) = &mut *obj.borrow_mut() {
                        inst.fields.insert(field.name.clone(), value);
                    }
                }
            }
        }
        for initializer in decl.initializers.iter().filter(|i| !i.is_static) {
            self.exec_body(&mut frame, &initializer.statements)?;
        }
        Ok(())
    }

    /// Message and cause from the arguments of an exception constructor.
    pub(crate) fn throwable_state(&mut self, class: &str, args: Vec<Value>) -> Exec<Throwable> {
        let (message, cause) = match args.as_slice() {
            [] | [Value::Null] => (None, Value::Null),
            [Value::Str(message)] => (Some(message.to_string()), Value::Null),
            [cause] => (Some(self.stringify_value(cause)?), cause.clone()),
            [message, cause] => (message.as_str().map(str::to_string), cause.clone()),
            _ => {
                return Err(EvalError::UnknownConstructor {
                    class: class.to_string(),
                    arity: args.len(),
                }
                .into())
            }
        };
        Ok(Throwable {
            class: class.to_string(),
            message,
            cause,
        })
    }

    // ========================================================================
    // Methods
    // ========================================================================

    pub(crate) fn invoke(&mut self, owner: ClassId, index: usize, this: Option<Value>, args: Vec<Value>) -> Exec<Value> {
        let decl = Rc::clone(&self.classes.get(owner).decl);
        let method = &decl.methods[index];
        if method.is_static() {
            self.ensure_init(owner)?;
        }
        if self.depth >= MAX_DEPTH {
            return Err(builtins::bare("StackOverflowError"));
        }
        self.depth += 1;
        let result = self.run_method(owner, method, this, args);
        self.depth -= 1;
        result
    }

    fn run_method(&mut self, owner: ClassId, method: &MethodDecl, this: Option<Value>, args: Vec<Value>) -> Exec<Value> {
        let this = if method.is_static() { None } else { this };
        let mut frame = Frame::new(owner, this).returning(method.return_type.clone());
        for (param, value) in method.args.iter().zip(args) {
            frame.declare(&param.name, coerce(value, &param.ty));
        }
        tracing::trace!(method = %method.name, "invoke");
        match self.exec_body(&mut frame, &method.statements)? {
            Flow::Return(value) => Ok(coerce(value, &method.return_type)),
            Flow::Normal => Ok(Value::Null),
            Flow::Break(_) => Err(EvalError::StrayJump("break").into()),
            Flow::Continue(_) => Err(EvalError::StrayJump("continue").into()),
        }
    }

    pub(crate) fn invoke_static(&mut self, id: ClassId, name: &str, args: Vec<Value>) -> Exec<Value> {
        if let Some(result) = self.enum_static(id, name, &args) {
            return result;
        }
        match self.classes.find_method(id, name, args.len()) {
            Some((owner, index)) => self.invoke(owner, index, None, args),
            None => Err(EvalError::UnknownMethod {
                owner: self.classes.get(id).qualified.clone(),
                name: name.to_string(),
                arity: args.len(),
            }
            .into()),
        }
    }

    /// `values()` and `valueOf(String)` of an enum.
    pub(crate) fn enum_static(&mut self, id: ClassId, name: &str, args: &[Value]) -> Option<Exec<Value>> {
        if !self.classes.get(id).is_enum() {
            return None;
        }
        match (name, args) {
            ("values", []) => Some(
                self.ensure_init(id)
                    .map(|()| Value::object(Object::Array(self.classes.get(id).constants.clone()))),
            ),
            ("valueOf", [Value::Str(wanted)]) => Some(self.ensure_init(id).and_then(|()| {
                let info = self.classes.get(id);
                info.constants
                    .iter()
                    .find(|c| constant_of(c).is_some_and(|(n, _)| *n == **wanted))
                    .cloned()
                    .ok_or_else(|| {
                        builtins::exception(
                            "IllegalArgumentException",
                            format!("No enum constant {}.{}", info.qualified, wanted),
                        )
                    })
            })),
            _ => None,
        }
    }

    /// Virtual dispatch of `receiver.name(args)`.
    pub(crate) fn dispatch(&mut self, receiver: &Value, name: &str, args: Vec<Value>) -> Exec<Value> {
        let obj = match receiver {
            Value::Null => {
                return Err(builtins::exception(
                    "NullPointerException",
                    format!("Cannot invoke \"{}()\" on null", name),
                ))
            }
            Value::Str(text) => return builtins::string_method(text, name, &args),
            Value::Ref(obj) => Rc::clone(obj),
            primitive => {
                return match (name, args.as_slice()) {
                    ("toString", []) => Ok(Value::str(self.stringify_value(primitive)?)),
                    _ => builtins::boxed_method(primitive, name, &args),
                }
            }
        };

        let class = match &*obj.borrow() {
            Object::Instance(inst) => Some(inst.class),
            _ => None,
        };
        if let Some(class) = class {
            if let Some((owner, index)) = self.classes.find_method(class, name, args.len()) {
                return self.invoke(owner, index, Some(receiver.clone()), args);
            }
            return self.object_fallback(receiver, &obj, name, args);
        }

        let printer = matches!(&*obj.borrow(), Object::Plain("PrintStream"));
        if printer && matches!(name, "println" | "print") {
            let text = match args.first() {
                Some(value) => self.stringify_value(value)?,
                None => String::new(),
            };
            self.output.push_str(&text);
            if name == "println" {
                self.output.push('\n');
            }
            return Ok(Value::Null);
        }
        match (name, args.as_slice()) {
            ("toString", []) => Ok(Value::str(self.stringify_value(receiver)?)),
            ("equals", [other]) => Ok(Value::Bool(receiver.same(other))),
            ("hashCode", []) => Ok(Value::Int(identity_hash(&obj))),
            _ => builtins::object_method(&obj, name, &args),
        }
    }

    /// Methods every user object has without declaring them.
    pub(crate) fn object_fallback(&mut self, receiver: &Value, obj: &ObjRef, name: &str, args: Vec<Value>) -> Exec<Value> {
        let (class, constant, base) = match &*obj.borrow() {
            Object::Instance(inst) => (inst.class, inst.constant.clone(), inst.base.clone()),
            other => return Err(EvalError::Unsupported(format!("{}.{}()", other.kind(), name)).into()),
        };
        match (name, args.as_slice(), &constant, &base) {
            ("toString", [], _, _) => Ok(Value::str(self.stringify_value(receiver)?)),
            ("equals", [other], _, _) => Ok(Value::Bool(receiver.same(other))),
            ("hashCode", [], _, _) => Ok(Value::Int(identity_hash(obj))),
            ("name", [], Some((constant_name, _)), _) => Ok(Value::Str(Rc::clone(constant_name))),
            ("ordinal", [], Some((_, ordinal)), _) => Ok(Value::Int(*ordinal)),
            ("compareTo", [other], Some((_, ordinal)), _) => {
                let theirs = constant_of(other).map_or(0, |(_, o)| o);
                Ok(Value::Int(ordinal - theirs))
            }
            ("getMessage" | "getLocalizedMessage", [], _, Some(base)) => {
                Ok(base.message.clone().map_or(Value::Null, Value::from))
            }
            ("getCause", [], _, Some(base)) => Ok(base.cause.clone()),
            _ => Err(EvalError::UnknownMethod {
                owner: self.classes.get(class).qualified.clone(),
                name: name.to_string(),
                arity: args.len(),
            }
            .into()),
        }
    }

    /// Static library calls, including those that call back into the program.
    pub(crate) fn builtin_static(&mut self, class: &str, name: &str, args: Vec<Value>) -> Exec<Value> {
        match (class, name, args.as_slice()) {
            ("String", "valueOf", [value])
            | ("Integer" | "Long" | "Double" | "Boolean" | "Character" | "Objects", "toString", [value]) => {
                Ok(Value::str(self.stringify_value(value)?))
            }
            ("String", "format", [template, rest @ ..]) => {
                let template = template.as_str().ok_or_else(|| mismatch("String", template))?.to_string();
                let mut rendered = Vec::with_capacity(rest.len());
                for value in rest {
                    rendered.push(self.stringify_value(value)?);
                }
                Ok(Value::str(builtins::format_java(&template, &rendered)?))
            }
            ("EventQueue" | "SwingUtilities", "invokeLater" | "invokeAndWait", [task]) => {
                self.dispatch(task, "run", Vec::new())?;
                Ok(Value::Null)
            }
            ("AccessController", "doPrivileged", [action, ..]) => self.privileged(action),
            _ => builtins::static_call(class, name, &args).unwrap_or_else(|| {
                Err(EvalError::UnknownMethod {
                    owner: class.to_string(),
                    name: name.to_string(),
                    arity: args.len(),
                }
                .into())
            }),
        }
    }

    /// Runs a privileged action; checked exceptions arrive wrapped in a
    /// `PrivilegedActionException`.
    fn privileged(&mut self, action: &Value) -> Exec<Value> {
        match self.dispatch(action, "run", Vec::new()) {
            Err(Unwind::Throw(thrown)) if self.is_checked(&thrown) => {
                let message = self.stringify_value(&thrown)?;
                Err(Unwind::Throw(builtins::throwable(
                    "PrivilegedActionException",
                    Some(message),
                    thrown,
                )))
            }
            other => other,
        }
    }

    // ========================================================================
    // Fields
    // ========================================================================

    pub(crate) fn get_field(&mut self, target: &Value, name: &str) -> Exec<Value> {
        let obj = match target {
            Value::Null => {
                return Err(builtins::exception(
                    "NullPointerException",
                    format!("Cannot read field \"{}\" on null", name),
                ))
            }
            Value::Ref(obj) => obj,
            other => {
                return Err(EvalError::UnknownField {
                    owner: other.kind().to_string(),
                    field: name.to_string(),
                }
                .into())
            }
        };
        let class = match &*obj.borrow() {
            Object::Instance(inst) => {
                if let Some(value) = inst.fields.get(name) {
                    return Ok(value.clone());
                }
                inst.class
            }
            Object::Array(items) if name == "length" => return Ok(Value::Int(items.len() as i32)),
            other => {
                return Err(EvalError::UnknownField {
                    owner: other.kind().to_string(),
                    field: name.to_string(),
                }
                .into())
            }
        };
        self.static_member(&ClassRef::User(class), name)
    }

    pub(crate) fn static_member(&mut self, class: &ClassRef, name: &str) -> Exec<Value> {
        match class {
            ClassRef::User(id) => match self.classes.static_owner(*id, name) {
                Some(owner) => {
                    self.ensure_init(owner)?;
                    Ok(self.classes.get(owner).statics.get(name).cloned().unwrap_or_default())
                }
                None => Err(EvalError::UnknownField {
                    owner: self.classes.get(*id).qualified.clone(),
                    field: name.to_string(),
                }
                .into()),
            },
            ClassRef::Builtin(builtin) => builtins::static_field(builtin, name).ok_or_else(|| {
                EvalError::UnknownField {
                    owner: builtin.clone(),
                    field: name.to_string(),
                }
                .into()
            }),
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    pub(crate) fn stringify_value(&mut self, value: &Value) -> Exec<String> {
        let obj = match value {
            Value::Null => return Ok("null".to_string()),
            Value::Bool(b) => return Ok(b.to_string()),
            Value::Int(i) => return Ok(i.to_string()),
            Value::Long(l) => return Ok(l.to_string()),
            Value::Double(d) => return Ok(java_double(*d)),
            Value::Char(c) => return Ok(c.to_string()),
            Value::Str(s) => return Ok(s.to_string()),
            Value::Ref(obj) => Rc::clone(obj),
        };

        let instance = match &*obj.borrow() {
            Object::Instance(inst) => Some((inst.class, inst.constant.clone(), inst.base.clone())),
            _ => None,
        };
        if let Some((class, constant, base)) = instance {
            if let Some((owner, index)) = self.classes.find_method(class, "toString", 0) {
                return match self.invoke(owner, index, Some(value.clone()), Vec::new())? {
                    Value::Str(s) => Ok(s.to_string()),
                    other => self.stringify_value(&other),
                };
            }
            let class_name = self.classes.get(class).name().to_string();
            return Ok(match (constant, base) {
                (Some((name, _)), _) => name.to_string(),
                (None, Some(base)) => match base.message {
                    Some(message) => format!("{}: {}", class_name, message),
                    None => class_name,
                },
                (None, None) => format!("{}@{:x}", class_name, identity_hash(&obj)),
            });
        }

        enum Shape {
            Items(Vec<Value>),
            Entries(Vec<(Value, Value)>),
            Text(String),
        }
        let shape = match &*obj.borrow() {
            Object::List(items) | Object::Array(items) => Shape::Items(items.clone()),
            Object::Map(entries) => Shape::Entries(entries.values().cloned().collect()),
            Object::Throwable(t) => Shape::Text(builtins::throwable_string(t)),
            other => Shape::Text(format!("{}@{:x}", other.kind(), identity_hash(&obj))),
        };
        match shape {
            Shape::Text(text) => Ok(text),
            Shape::Items(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(self.stringify_value(item)?);
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
            Shape::Entries(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in &entries {
                    parts.push(format!("{}={}", self.stringify_value(key)?, self.stringify_value(value)?));
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
        }
    }
}

/// `this(...)` or `super(...)` as a constructor's first statement.
fn explicit_constructor_call(stmt: &Statement) -> Option<(&str, &[Expression])> {
    match stmt {
        Statement::Expression(Expression::Call(call))
            if call.receiver.is_none() && matches!(call.name.as_str(), "this" | "super") =>
        {
            Some((call.name.as_str(), call.args.as_slice()))
        }
        _ => None,
    }
}

/// The wrapper class of a primitive or string value.
fn boxed_class(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("Boolean"),
        Value::Int(_) => Some("Integer"),
        Value::Long(_) => Some("Long"),
        Value::Double(_) => Some("Double"),
        Value::Char(_) => Some("Character"),
        Value::Str(_) => Some("String"),
        Value::Null | Value::Ref(_) => None,
    }
}

pub(crate) fn constant_of(value: &Value) -> Option<(Rc<str>, i32)> {
    match &*value.as_object()?.borrow() {
        Object::Instance(inst) => inst.constant.clone(),
        _ => None,
    }
}

fn identity_hash(obj: &ObjRef) -> i32 {
    (Rc::as_ptr(obj) as *const () as usize >> 4) as i32
}
