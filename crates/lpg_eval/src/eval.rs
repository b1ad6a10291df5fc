//! Expression evaluation.

use crate::builtins;
use crate::classes::{ClassId, ClassRef, Nesting};
use crate::error::{mismatch, EvalError, Exec};
use crate::frame::Frame;
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::{default_value, ObjRef, Object, Value};
use lpg_ast::{ArrayRef, Assign, Binary, BinaryOp, Call, Cast, Expression, Literal, New, NewArray, Unary, UnaryOp};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// What stands left of a `.`: a value or a type.
enum Receiver {
    Value(Value),
    Class(ClassRef),
}

/// An assignable location.
enum Place {
    Local(String),
    Field(ObjRef, String),
    Static(ClassId, String),
    Element(ObjRef, usize),
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Long(l) => Value::Long(*l),
        Literal::Double(d) => Value::Double(*d),
        Literal::Char(c) => Value::Char(*c),
        Literal::String(s) => Value::str(s.as_str()),
    }
}

/// Keeps a stored number at its declared width: widening on plain
/// assignment, and narrowing back for compound assignment.
fn conform(current: &Value, value: Value, compound: bool) -> Value {
    let target = match current {
        Value::Long(_) => "long",
        Value::Double(_) => "double",
        Value::Int(_) => "int",
        Value::Char(_) if compound => "char",
        _ => return value,
    };
    let widening = match (target, &value) {
        ("long", Value::Int(_) | Value::Char(_)) => true,
        ("double", Value::Int(_) | Value::Char(_) | Value::Long(_)) => true,
        ("int", Value::Char(_)) => true,
        _ => false,
    };
    if widening || (compound && value.as_f64().is_some()) {
        ops::convert(&value, target).unwrap_or(value)
    } else {
        value
    }
}

fn make_array(sizes: &[usize], leaf: &Value) -> Value {
    let items = match sizes {
        [] => return leaf.clone(),
        [n] => vec![leaf.clone(); *n],
        [n, rest @ ..] => (0..*n).map(|_| make_array(rest, leaf)).collect(),
    };
    Value::object(Object::Array(items))
}

impl Interpreter {
    pub(crate) fn eval(&mut self, frame: &mut Frame, expr: &Expression) -> Exec<Value> {
        match expr {
            Expression::Name(name) => self.eval_name(frame, name),
            Expression::This(qualifier) => self.this_value(frame, qualifier.as_deref()),
            Expression::FieldRef(node) => match self.receiver(frame, &node.receiver)? {
                Receiver::Class(class) => self.static_member(&class, &node.name),
                Receiver::Value(value) => self.get_field(&value, &node.name),
            },
            Expression::ArrayRef(node) => {
                let (array, index) = self.element(frame, node)?;
                let value = match &*array.borrow() {
                    Object::Array(items) => items.get(index).cloned().unwrap_or_default(),
                    _ => Value::Null,
                };
                Ok(value)
            }
            Expression::Call(node) => self.eval_call(frame, node),
            Expression::New(node) => self.eval_new(frame, node),
            Expression::NewArray(node) => self.eval_new_array(frame, node),
            Expression::ArrayInit(node) => {
                let items = self.eval_args(frame, &node.elements)?;
                Ok(Value::object(Object::Array(items)))
            }
            Expression::Binary(node) => self.eval_binary(frame, node),
            Expression::Unary(node) => self.eval_unary(frame, node),
            Expression::Assign(node) => self.eval_assign(frame, node),
            Expression::InstanceOf(node) => {
                let value = self.eval(frame, &node.expr)?;
                Ok(Value::Bool(self.is_instance(&value, &node.ty)))
            }
            Expression::Cast(node) => self.eval_cast(frame, node),
            Expression::Conditional(node) => {
                if self.condition(frame, &node.cond)? {
                    self.eval(frame, &node.then)
                } else {
                    self.eval(frame, &node.otherwise)
                }
            }
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::ClassLiteral(ty) => Ok(Value::str(ty.name.as_str())),
            Expression::Annotation(annotation) => {
                Err(EvalError::Unsupported(format!("annotation @{} as a value", annotation.ty.name)).into())
            }
            Expression::Wrapped(wrapped) => {
                Err(EvalError::Unsupported(format!("verbatim expression `{}`", wrapped.text)).into())
            }
        }
    }

    pub(crate) fn eval_args(&mut self, frame: &mut Frame, exprs: &[Expression]) -> Exec<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(frame, expr)?);
        }
        Ok(values)
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// A simple name: locals, then fields and captured variables along the
    /// enclosing instances, then static fields of the lexical classes.
    fn lookup(&mut self, frame: &Frame, name: &str) -> Exec<Option<Value>> {
        if let Some(value) = frame.get(name) {
            return Ok(Some(value.clone()));
        }
        let mut cursor = frame.this.clone();
        while let Some(current) = cursor {
            let Some(obj) = current.as_object() else {
                break;
            };
            cursor = match &*obj.borrow() {
                Object::Instance(inst) => {
                    if let Some(value) = inst.fields.get(name).or_else(|| inst.captured.get(name)) {
                        return Ok(Some(value.clone()));
                    }
                    inst.outer.clone()
                }
                _ => None,
            };
        }
        let mut class = Some(frame.class);
        while let Some(id) = class {
            if let Some(owner) = self.classes.static_owner(id, name) {
                self.ensure_init(owner)?;
                return Ok(self.classes.get(owner).statics.get(name).cloned());
            }
            class = self.classes.get(id).outer;
        }
        Ok(None)
    }

    fn eval_name(&mut self, frame: &mut Frame, name: &str) -> Exec<Value> {
        if let Some(value) = self.lookup(frame, name)? {
            return Ok(value);
        }
        let segments: Vec<&str> = name.split('.').collect();
        if segments.len() < 2 {
            return Err(EvalError::UnknownName(name.to_string()).into());
        }
        let (mut value, rest) = match self.lookup(frame, segments[0])? {
            Some(value) => (value, &segments[1..]),
            None => {
                // The longest prefix naming a type, then static and instance fields.
                let found = (1..segments.len())
                    .rev()
                    .find_map(|end| self.resolve_type(frame, &segments[..end].join(".")).map(|class| (class, end)));
                let Some((class, end)) = found else {
                    return Err(EvalError::UnknownName(name.to_string()).into());
                };
                (self.static_member(&class, segments[end])?, &segments[end + 1..])
            }
        };
        for segment in rest {
            value = self.get_field(&value, segment)?;
        }
        Ok(value)
    }

    /// A type name as seen from the executing code: local classes first.
    pub(crate) fn resolve_type(&self, frame: &Frame, name: &str) -> Option<ClassRef> {
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        if let Some(mut id) = frame.local_type(head) {
            for segment in rest.into_iter().flat_map(|r| r.split('.')) {
                id = self.classes.member(id, segment)?;
            }
            return Some(ClassRef::User(id));
        }
        self.classes.resolve(Some(frame.class), name)
    }

    fn receiver(&mut self, frame: &mut Frame, expr: &Expression) -> Exec<Receiver> {
        if let Expression::Name(name) = expr {
            let head = name.split_once('.').map_or(name.as_str(), |(head, _)| head);
            if self.lookup(frame, head)?.is_none() {
                if let Some(class) = self.resolve_type(frame, name) {
                    return Ok(Receiver::Class(class));
                }
            }
        }
        self.eval(frame, expr).map(Receiver::Value)
    }

    /// The enclosing class and instance of a user object.
    fn links(value: &Value) -> Option<(ClassId, Option<Value>)> {
        match &*value.as_object()?.borrow() {
            Object::Instance(inst) => Some((inst.class, inst.outer.clone())),
            _ => None,
        }
    }

    /// The innermost of `this` and its enclosing instances that is a `class`.
    pub(crate) fn enclosing_instance(&self, frame: &Frame, class: ClassId) -> Option<Value> {
        let mut cursor = frame.this.clone();
        while let Some(current) = cursor {
            let (id, outer) = Self::links(&current)?;
            if self.classes.is_subclass(id, class) {
                return Some(current);
            }
            cursor = outer;
        }
        None
    }

    fn this_value(&self, frame: &Frame, qualifier: Option<&str>) -> Exec<Value> {
        let Some(this) = frame.this.clone() else {
            return Err(EvalError::Unsupported("`this` in a static context".to_string()).into());
        };
        let Some(qualifier) = qualifier else {
            return Ok(this);
        };
        let found = match self.resolve_type(frame, qualifier) {
            Some(ClassRef::User(class)) => self.enclosing_instance(frame, class),
            _ => None,
        };
        found.ok_or_else(|| EvalError::UnknownName(format!("{}.this", qualifier)).into())
    }

    // ========================================================================
    // Calls and instantiation
    // ========================================================================

    fn eval_call(&mut self, frame: &mut Frame, node: &Call) -> Exec<Value> {
        let Some(receiver) = &node.receiver else {
            let args = self.eval_args(frame, &node.args)?;
            return self.call_unqualified(frame, &node.name, args);
        };
        if receiver.as_name() == Some("super") {
            let args = self.eval_args(frame, &node.args)?;
            return self.call_super(frame, &node.name, args);
        }
        match self.receiver(frame, receiver)? {
            Receiver::Class(ClassRef::User(id)) => {
                let args = self.eval_args(frame, &node.args)?;
                self.invoke_static(id, &node.name, args)
            }
            Receiver::Class(ClassRef::Builtin(class)) => {
                let args = self.eval_args(frame, &node.args)?;
                self.builtin_static(&class, &node.name, args)
            }
            Receiver::Value(value) => {
                let args = self.eval_args(frame, &node.args)?;
                self.dispatch(&value, &node.name, args)
            }
        }
    }

    /// `name(args)`: the innermost lexical class declaring the method wins;
    /// instance methods run on the matching enclosing instance.
    fn call_unqualified(&mut self, frame: &mut Frame, name: &str, args: Vec<Value>) -> Exec<Value> {
        if matches!(name, "this" | "super") {
            return Err(EvalError::Unsupported(format!("{}(...) outside a constructor's first statement", name)).into());
        }
        let mut class = Some(frame.class);
        while let Some(id) = class {
            if let Some(result) = self.enum_static(id, name, &args) {
                return result;
            }
            if let Some((owner, index)) = self.classes.find_method(id, name, args.len()) {
                if self.classes.get(owner).decl.methods[index].is_static() {
                    return self.invoke(owner, index, None, args);
                }
                let Some(receiver) = self.enclosing_instance(frame, id) else {
                    return Err(EvalError::Unsupported(format!("instance method {}() from a static context", name)).into());
                };
                return self.dispatch(&receiver, name, args);
            }
            class = self.classes.get(id).outer;
        }
        match frame.this.clone() {
            Some(this) => self.dispatch(&this, name, args),
            None => Err(EvalError::UnknownMethod {
                owner: self.classes.get(frame.class).qualified.clone(),
                name: name.to_string(),
                arity: args.len(),
            }
            .into()),
        }
    }

    fn call_super(&mut self, frame: &mut Frame, name: &str, args: Vec<Value>) -> Exec<Value> {
        let Some(this) = frame.this.clone() else {
            return Err(EvalError::Unsupported("`super` in a static context".to_string()).into());
        };
        if let Some(ClassRef::User(superclass)) = self.classes.get(frame.class).superclass.clone() {
            if let Some((owner, index)) = self.classes.find_method(superclass, name, args.len()) {
                return self.invoke(owner, index, Some(this), args);
            }
        }
        let Some(obj) = this.as_object().cloned() else {
            return Err(mismatch("object", &this));
        };
        self.object_fallback(&this, &obj, name, args)
    }

    fn eval_new(&mut self, frame: &mut Frame, node: &New) -> Exec<Value> {
        let args = self.eval_args(frame, &node.args)?;
        if let Some(body) = &node.body {
            let id = self.classes.nested(body, Nesting::Anonymous, frame.class, Some(&node.ty));
            let captured = Rc::new(frame.snapshot());
            return self.construct(id, args, frame.this.clone(), captured, None);
        }
        match self.resolve_type(frame, &node.ty.name) {
            Some(ClassRef::User(id)) => {
                let (outer, captured) = self.creation_context(frame, id);
                self.construct(id, args, outer, captured, None)
            }
            Some(ClassRef::Builtin(class)) => {
                if builtins::is_throwable(&class) {
                    let state = self.throwable_state(&class, args)?;
                    return Ok(Value::object(Object::Throwable(state)));
                }
                builtins::construct(&class, &args).ok_or_else(|| EvalError::NotInstantiable(class).into())
            }
            None => Err(EvalError::UnknownType(node.ty.name.clone()).into()),
        }
    }

    /// The enclosing instance and captured variables for a new `id`.
    fn creation_context(&self, frame: &Frame, id: ClassId) -> (Option<Value>, Rc<FxHashMap<String, Value>>) {
        let info = self.classes.get(id);
        match info.nesting {
            Nesting::TopLevel => (None, Rc::default()),
            Nesting::Member => {
                let outer = match info.outer {
                    Some(outer) if info.is_inner() => self.enclosing_instance(frame, outer),
                    _ => None,
                };
                (outer, Rc::default())
            }
            Nesting::Local | Nesting::Anonymous => {
                if frame.local_type(info.name()) == Some(id) {
                    return (frame.this.clone(), Rc::new(frame.snapshot()));
                }
                // Created from inside its own body: share the creator's context.
                let mut cursor = frame.this.clone();
                while let Some(current) = cursor {
                    let Some(obj) = current.as_object() else {
                        break;
                    };
                    cursor = match &*obj.borrow() {
                        Object::Instance(inst) if inst.class == id => {
                            return (inst.outer.clone(), Rc::clone(&inst.captured));
                        }
                        Object::Instance(inst) => inst.outer.clone(),
                        _ => None,
                    };
                }
                (frame.this.clone(), Rc::default())
            }
        }
    }

    fn eval_new_array(&mut self, frame: &mut Frame, node: &NewArray) -> Exec<Value> {
        if let Some(init) = &node.init {
            let items = self.eval_args(frame, &init.elements)?;
            return Ok(Value::object(Object::Array(items)));
        }
        let mut sizes = Vec::with_capacity(node.dims.len());
        for dim in &node.dims {
            let value = self.eval(frame, dim)?;
            let size = value.as_int().ok_or_else(|| mismatch("int", &value))?;
            let size = usize::try_from(size)
                .map_err(|_| builtins::exception("NegativeArraySizeException", size.to_string()))?;
            sizes.push(size);
        }
        let leaf = if node.extra_dims > 0 {
            Value::Null
        } else {
            default_value(&node.ty)
        };
        Ok(make_array(&sizes, &leaf))
    }

    fn element(&mut self, frame: &mut Frame, node: &ArrayRef) -> Exec<(ObjRef, usize)> {
        let array = self.eval(frame, &node.array)?;
        let index = self.eval(frame, &node.index)?;
        let index = index.as_int().ok_or_else(|| mismatch("int", &index))?;
        let obj = match &array {
            Value::Ref(obj) => Rc::clone(obj),
            Value::Null => return Err(builtins::bare("NullPointerException")),
            other => return Err(mismatch("array", other)),
        };
        let len = match &*obj.borrow() {
            Object::Array(items) => items.len(),
            _ => return Err(mismatch("array", &array)),
        };
        let slot = usize::try_from(index).ok().filter(|&i| i < len).ok_or_else(|| {
            builtins::exception(
                "ArrayIndexOutOfBoundsException",
                format!("Index {} out of bounds for length {}", index, len),
            )
        })?;
        Ok((obj, slot))
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// A binary operator on evaluated operands; `+` concatenates strings.
    fn apply_binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Exec<Value> {
        if op == BinaryOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
            let text = self.stringify_value(left)? + &self.stringify_value(right)?;
            return Ok(Value::str(text));
        }
        ops::binary(op, left, right)
    }

    fn eval_binary(&mut self, frame: &mut Frame, node: &Binary) -> Exec<Value> {
        match node.op {
            BinaryOp::And => {
                Ok(Value::Bool(self.condition(frame, &node.left)? && self.condition(frame, &node.right)?))
            }
            BinaryOp::Or => {
                Ok(Value::Bool(self.condition(frame, &node.left)? || self.condition(frame, &node.right)?))
            }
            op => {
                let left = self.eval(frame, &node.left)?;
                let right = self.eval(frame, &node.right)?;
                self.apply_binary(op, &left, &right)
            }
        }
    }

    fn eval_unary(&mut self, frame: &mut Frame, node: &Unary) -> Exec<Value> {
        match node.op {
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let place = self.place(frame, &node.operand)?;
                let current = self.read_place(frame, &place);
                let updated = ops::step(&current, matches!(node.op, UnaryOp::PreInc | UnaryOp::PostInc))?;
                self.write_place(frame, &place, updated.clone());
                Ok(if matches!(node.op, UnaryOp::PreInc | UnaryOp::PreDec) {
                    updated
                } else {
                    current
                })
            }
            op => {
                let operand = self.eval(frame, &node.operand)?;
                ops::unary(op, &operand)
            }
        }
    }

    fn eval_assign(&mut self, frame: &mut Frame, node: &Assign) -> Exec<Value> {
        let place = self.place(frame, &node.target)?;
        let current = self.read_place(frame, &place);
        let value = match node.op {
            None => self.eval(frame, &node.value)?,
            Some(op) => {
                let rhs = self.eval(frame, &node.value)?;
                self.apply_binary(op, &current, &rhs)?
            }
        };
        let value = conform(&current, value, node.op.is_some());
        self.write_place(frame, &place, value.clone());
        Ok(value)
    }

    fn eval_cast(&mut self, frame: &mut Frame, node: &Cast) -> Exec<Value> {
        let value = self.eval(frame, &node.expr)?;
        if node.ty.is_primitive() {
            return ops::convert(&value, &node.ty.name).ok_or_else(|| mismatch("primitive", &value));
        }
        if value.is_null() {
            return Ok(value);
        }
        let checkable = node.ty.dims > 0 || self.resolve_type(frame, &node.ty.name).is_some();
        if checkable && !self.is_instance(&value, &node.ty) {
            return Err(builtins::exception(
                "ClassCastException",
                format!("{} cannot be cast to {}", self.type_name(&value), node.ty.name),
            ));
        }
        Ok(value)
    }

    // ========================================================================
    // Places
    // ========================================================================

    fn place(&mut self, frame: &mut Frame, target: &Expression) -> Exec<Place> {
        match target {
            Expression::Name(name) => match name.rsplit_once('.') {
                Some((prefix, field)) => {
                    let receiver = self.receiver(frame, &Expression::Name(prefix.to_string()))?;
                    self.member_place(receiver, field)
                }
                None => self.name_place(frame, name),
            },
            Expression::FieldRef(node) => {
                let receiver = self.receiver(frame, &node.receiver)?;
                self.member_place(receiver, &node.name)
            }
            Expression::ArrayRef(node) => {
                let (array, index) = self.element(frame, node)?;
                Ok(Place::Element(array, index))
            }
            _ => Err(EvalError::Unsupported("assignment to a non-variable".to_string()).into()),
        }
    }

    fn name_place(&mut self, frame: &Frame, name: &str) -> Exec<Place> {
        if frame.get(name).is_some() {
            return Ok(Place::Local(name.to_string()));
        }
        let mut cursor = frame.this.clone();
        while let Some(current) = cursor {
            let Some(obj) = current.as_object() else {
                break;
            };
            cursor = match &*obj.borrow() {
                Object::Instance(inst) if inst.fields.contains_key(name) => {
                    return Ok(Place::Field(Rc::clone(obj), name.to_string()));
                }
                Object::Instance(inst) => inst.outer.clone(),
                _ => None,
            };
        }
        let mut class = Some(frame.class);
        while let Some(id) = class {
            if let Some(owner) = self.classes.static_owner(id, name) {
                self.ensure_init(owner)?;
                return Ok(Place::Static(owner, name.to_string()));
            }
            class = self.classes.get(id).outer;
        }
        Err(EvalError::UnknownName(name.to_string()).into())
    }

    fn member_place(&mut self, receiver: Receiver, name: &str) -> Exec<Place> {
        let class = match receiver {
            Receiver::Class(ClassRef::User(id)) => id,
            Receiver::Class(ClassRef::Builtin(class)) => {
                return Err(EvalError::Unsupported(format!("assignment to {}.{}", class, name)).into());
            }
            Receiver::Value(Value::Ref(obj)) => {
                let class = match &*obj.borrow() {
                    Object::Instance(inst) if inst.fields.contains_key(name) => None,
                    Object::Instance(inst) => Some(inst.class),
                    other => {
                        return Err(EvalError::UnknownField {
                            owner: other.kind().to_string(),
                            field: name.to_string(),
                        }
                        .into())
                    }
                };
                match class {
                    Some(class) => class,
                    None => return Ok(Place::Field(obj, name.to_string())),
                }
            }
            Receiver::Value(Value::Null) => {
                return Err(builtins::exception(
                    "NullPointerException",
                    format!("Cannot assign field \"{}\" on null", name),
                ))
            }
            Receiver::Value(other) => return Err(mismatch("object", &other)),
        };
        match self.classes.static_owner(class, name) {
            Some(owner) => {
                self.ensure_init(owner)?;
                Ok(Place::Static(owner, name.to_string()))
            }
            None => Err(EvalError::UnknownField {
                owner: self.classes.get(class).qualified.clone(),
                field: name.to_string(),
            }
            .into()),
        }
    }

    fn read_place(&self, frame: &Frame, place: &Place) -> Value {
        match place {
            Place::Local(name) => frame.get(name).cloned().unwrap_or_default(),
            Place::Field(obj, name) => match &*obj.borrow() {
                Object::Instance(inst) => inst.fields.get(name).cloned().unwrap_or_default(),
                _ => Value::Null,
            },
            Place::Static(id, name) => self.classes.get(*id).statics.get(name).cloned().unwrap_or_default(),
            Place::Element(obj, index) => match &*obj.borrow() {
                Object::Array(items) => items.get(*index).cloned().unwrap_or_default(),
                _ => Value::Null,
            },
        }
    }

    fn write_place(&mut self, frame: &mut Frame, place: &Place, value: Value) {
        match place {
            Place::Local(name) => {
                frame.set(name, value);
            }
            Place::Field(obj, name) => {
                if let Object::Instance(inst) = &mut *obj.borrow_mut() {
                    inst.fields.insert(name.clone(), value);
                }
            }
            Place::Static(id, name) => {
                self.classes.get_mut(*id).statics.insert(name.clone(), value);
            }
            Place::Element(obj, index) => {
                if let Object::Array(items) = &mut *obj.borrow_mut() {
                    if let Some(slot) = items.get_mut(*index) {
                        *slot = value;
                    }
                }
            }
        }
    }
}
