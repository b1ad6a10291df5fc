//! Statement execution.

use crate::builtins;
use crate::classes::Nesting;
use crate::error::{mismatch, EvalError, Exec, Unwind};
use crate::frame::{Flow, Frame};
use crate::interpreter::{coerce, constant_of, Interpreter};
use crate::value::{default_value, Value};
use lpg_ast::{simple_name, Case, Expression, Foreach, Labeled, Statement, Switch, Try};

impl Interpreter {
    /// Runs statements in the current scope until one completes abruptly.
    pub(crate) fn exec_body(&mut self, frame: &mut Frame, statements: &[Statement]) -> Exec<Flow> {
        for stmt in statements {
            match self.exec(frame, stmt)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, frame: &mut Frame, statements: &[Statement]) -> Exec<Flow> {
        frame.push();
        let result = self.exec_body(frame, statements);
        frame.pop();
        result
    }

    pub(crate) fn condition(&mut self, frame: &mut Frame, expr: &Expression) -> Exec<bool> {
        let value = self.eval(frame, expr)?;
        value.as_bool().ok_or_else(|| mismatch("boolean", &value))
    }

    pub(crate) fn exec(&mut self, frame: &mut Frame, stmt: &Statement) -> Exec<Flow> {
        match stmt {
            Statement::Block(block) => self.exec_block(frame, &block.statements),
            Statement::Expression(expr) => {
                self.eval(frame, expr)?;
                Ok(Flow::Normal)
            }
            Statement::LocalDecl(decl) => {
                let value = match &decl.init {
                    Some(init) => coerce(self.eval(frame, init)?, &decl.ty),
                    None => default_value(&decl.ty),
                };
                frame.declare(&decl.name, value);
                Ok(Flow::Normal)
            }
            Statement::If(node) => {
                if self.condition(frame, &node.cond)? {
                    self.exec(frame, &node.then)
                } else if let Some(otherwise) = &node.otherwise {
                    self.exec(frame, otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::Foreach(_) => {
                self.exec_loop(frame, stmt, None)
            }
            Statement::Switch(node) => self.exec_switch(frame, node),
            Statement::Try(node) => self.exec_try(frame, node),
            Statement::Synchronized(node) => {
                let lock = self.eval(frame, &node.lock)?;
                if lock.is_null() {
                    return Err(builtins::bare("NullPointerException"));
                }
                self.exec_block(frame, &node.body.statements)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(frame, expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::ReturnDefault => Ok(Flow::Return(default_value(&frame.returns))),
            Statement::Throw(expr) => {
                let thrown = self.eval(frame, expr)?;
                if thrown.is_null() {
                    return Err(builtins::bare("NullPointerException"));
                }
                Err(Unwind::Throw(thrown))
            }
            Statement::Break(label) => Ok(Flow::Break(label.clone())),
            Statement::Continue(label) => Ok(Flow::Continue(label.clone())),
            Statement::Labeled(node) => self.exec_labeled(frame, node),
            Statement::LocalClass(decl) => {
                let id = self.classes.nested(decl, Nesting::Local, frame.class, None);
                frame.declare_type(&decl.name, id);
                Ok(Flow::Normal)
            }
            Statement::Empty => Ok(Flow::Normal),
            Statement::Wrapped(wrapped) => {
                Err(EvalError::Unsupported(format!("verbatim statement `{}`", wrapped.text)).into())
            }
        }
    }

    // ========================================================================
    // Loops
    // ========================================================================

    fn exec_loop(&mut self, frame: &mut Frame, stmt: &Statement, label: Option<&str>) -> Exec<Flow> {
        frame.push();
        let result = self.run_loop(frame, stmt, label);
        frame.pop();
        result
    }

    fn run_loop(&mut self, frame: &mut Frame, stmt: &Statement, label: Option<&str>) -> Exec<Flow> {
        match stmt {
            Statement::While(node) => {
                while self.condition(frame, &node.cond)? {
                    if let Some(flow) = self.iteration(frame, &node.body, label)? {
                        return Ok(flow);
                    }
                }
            }
            Statement::DoWhile(node) => loop {
                if let Some(flow) = self.iteration(frame, &node.body, label)? {
                    return Ok(flow);
                }
                if !self.condition(frame, &node.cond)? {
                    break;
                }
            },
            Statement::For(node) => {
                for init in &node.init {
                    self.exec(frame, init)?;
                }
                loop {
                    if let Some(cond) = &node.cond {
                        if !self.condition(frame, cond)? {
                            break;
                        }
                    }
                    if let Some(flow) = self.iteration(frame, &node.body, label)? {
                        return Ok(flow);
                    }
                    for update in &node.update {
                        self.eval(frame, update)?;
                    }
                }
            }
            Statement::Foreach(node) => return self.exec_foreach(frame, node, label),
            other => return self.exec(frame, other),
        }
        Ok(Flow::Normal)
    }

    /// One pass through a loop body; `Some` when the loop ends with that flow.
    fn iteration(&mut self, frame: &mut Frame, body: &Statement, label: Option<&str>) -> Exec<Option<Flow>> {
        Ok(match self.exec(frame, body)? {
            Flow::Normal | Flow::Continue(None) => None,
            Flow::Continue(Some(target)) if Some(target.as_str()) == label => None,
            Flow::Break(None) => Some(Flow::Normal),
            Flow::Break(Some(target)) if Some(target.as_str()) == label => Some(Flow::Normal),
            abrupt => Some(abrupt),
        })
    }

    fn exec_foreach(&mut self, frame: &mut Frame, node: &Foreach, label: Option<&str>) -> Exec<Flow> {
        let source = self.eval(frame, &node.iterable)?;
        if source.is_null() {
            return Err(builtins::bare("NullPointerException"));
        }
        if let Some(items) = source.items() {
            for item in items {
                frame.declare(&node.var.name, coerce(item, &node.var.ty));
                if let Some(flow) = self.iteration(frame, &node.body, label)? {
                    return Ok(flow);
                }
            }
            return Ok(Flow::Normal);
        }
        let iterator = self.dispatch(&source, "iterator", Vec::new())?;
        while self.has_next(&iterator)? {
            let item = self.dispatch(&iterator, "next", Vec::new())?;
            frame.declare(&node.var.name, coerce(item, &node.var.ty));
            if let Some(flow) = self.iteration(frame, &node.body, label)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_labeled(&mut self, frame: &mut Frame, node: &Labeled) -> Exec<Flow> {
        let flow = match &*node.body {
            body @ (Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::Foreach(_)) => {
                self.exec_loop(frame, body, Some(&node.label))?
            }
            body => self.exec(frame, body)?,
        };
        Ok(match flow {
            Flow::Break(Some(target)) if target == node.label => Flow::Normal,
            other => other,
        })
    }

    // ========================================================================
    // Switch and try
    // ========================================================================

    fn exec_switch(&mut self, frame: &mut Frame, node: &Switch) -> Exec<Flow> {
        let selector = self.eval(frame, &node.selector)?;
        if selector.is_null() {
            return Err(builtins::bare("NullPointerException"));
        }
        let constant = constant_of(&selector);
        let mut start = None;
        for (index, case) in node.cases.iter().enumerate() {
            let Some(label) = &case.label else {
                continue;
            };
            let matched = match (&constant, label) {
                (Some((name, _)), Expression::Name(label)) => simple_name(label) == &**name,
                _ => {
                    let value = self.eval(frame, label)?;
                    selector.same(&value)
                }
            };
            if matched {
                start = Some(index);
                break;
            }
        }
        let Some(start) = start.or_else(|| node.cases.iter().position(|c| c.label.is_none())) else {
            return Ok(Flow::Normal);
        };
        frame.push();
        let result = self.fall_through(frame, &node.cases[start..]);
        frame.pop();
        result
    }

    fn fall_through(&mut self, frame: &mut Frame, cases: &[Case]) -> Exec<Flow> {
        for case in cases {
            match self.exec_body(frame, &case.statements)? {
                Flow::Normal => {}
                Flow::Break(None) => return Ok(Flow::Normal),
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(&mut self, frame: &mut Frame, node: &Try) -> Exec<Flow> {
        let mut result = self.exec_block(frame, &node.body.statements);
        if let Err(Unwind::Throw(thrown)) = &result {
            let thrown = thrown.clone();
            let handler = node.catches.iter().find(|c| {
                c.param
                    .ty
                    .name
                    .split('|')
                    .any(|alternative| self.is_a_named(&thrown, alternative.trim()))
            });
            if let Some(handler) = handler {
                frame.push();
                frame.declare(&handler.param.name, thrown);
                result = self.exec_body(frame, &handler.body.statements);
                frame.pop();
            }
        }
        if let Some(finally) = &node.finally {
            match self.exec_block(frame, &finally.statements)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        result
    }
}
