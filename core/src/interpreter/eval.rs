//! Core evaluation logic.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::trace;

use crate::compiler::Unit;
use crate::context::Context;
use crate::errors::{RuntimeError, RuntimeErrorKind, StackFrame};
use crate::interpreter::operators::{eval_binary, eval_comparison, eval_unary};
use crate::parser::{
    BinaryOp, BoolOp, ComparisonOp, Expr, ExprKind, Literal, Source, Span, Statement, UnaryOp,
};
use crate::query::{self, TermKind};
use crate::values::{Function, Lambda, Value};

fn eval_literal(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

/// A function activation, kept for stack traces.
struct Frame {
    /// `None` for top-level code.
    function: Option<String>,
    source: Arc<Source>,
    /// Local variables: parameters plus whatever the function closed over.
    locals: HashMap<String, Value>,
    /// Where this frame is currently calling out from.
    call_site: Span,
}

/// Tree-walking interpreter for one unit.
pub struct Interpreter<'c> {
    context: &'c mut Context,
    frames: Vec<Frame>,
    depth: usize,
    max_depth: usize,
}

impl<'c> Interpreter<'c> {
    pub fn new(context: &'c mut Context, max_depth: usize) -> Self {
        Self {
            context,
            frames: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Run every statement of `unit`. The result is the value of the last
    /// statement, or `null` when there is none.
    pub fn run(&mut self, unit: &Unit) -> Result<Value, RuntimeError> {
        self.frames.push(Frame {
            function: None,
            source: Arc::clone(&unit.source),
            locals: HashMap::new(),
            call_site: Span::default(),
        });
        let result = self.run_statements(&unit.program.statements);
        self.frames.pop();
        result
    }

    fn run_statements(&mut self, statements: &[Statement]) -> Result<Value, RuntimeError> {
        let mut last = Value::Null;
        for statement in statements {
            last = match statement {
                Statement::Expr(expr) => self.eval_expr(expr)?,
                Statement::Assign { name, value, .. } => {
                    let value = self.bind_value(name, value)?;
                    self.context.set(name.clone(), value.clone());
                    value
                }
                Statement::Declare { name, value, .. } => {
                    let value = self.bind_value(name, value)?;
                    self.context.set(name.clone(), value);
                    Value::Null
                }
                Statement::Throw { value, span } => {
                    let value = self.eval_expr(value)?;
                    return Err(self.error(RuntimeErrorKind::Thrown(value), span));
                }
            };
        }
        Ok(last)
    }

    /// Evaluate the right side of a binding; anonymous functions take the name.
    fn bind_value(&mut self, name: &str, expr: &Expr) -> Result<Value, RuntimeError> {
        trace!(name, "Binding");
        Ok(match self.eval_expr(expr)? {
            Value::Function(function) => Value::Function(function.named(name)),
            other => other,
        })
    }

    /// Evaluate an expression node.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        // Check depth before recursing
        if self.depth >= self.max_depth {
            return Err(self.error(
                RuntimeErrorKind::StackOverflow {
                    depth: self.depth,
                    max_depth: self.max_depth,
                },
                &expr.span,
            ));
        }

        self.depth += 1;
        let result = self.eval_expr_inner(expr);
        self.depth -= 1;

        result
    }

    /// Inner evaluation logic (no depth tracking).
    ///
    /// Kept to a bare dispatch: every level of script recursion passes
    /// through this frame, so the arms live in their own functions.
    fn eval_expr_inner(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(eval_literal(literal)),
            ExprKind::Ident(name) => self.lookup(name, &expr.span),
            ExprKind::Array(items) => self.eval_array(items),
            ExprKind::Object(entries) => self.eval_object(entries),
            ExprKind::Unary { op, expr: operand } => self.eval_unary(*op, operand, &expr.span),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, &expr.span),
            ExprKind::Comparison { op, left, right } => {
                self.eval_comparison(*op, left, right, &expr.span)
            }
            ExprKind::Boolean { op, left, right } => self.eval_boolean(*op, left, right),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.eval_if(cond, then_branch, else_branch),
            ExprKind::Call { callable, args } => self.eval_call(callable, args, &expr.span),
            ExprKind::Index { value, index } => self.eval_index(value, index, &expr.span),
            ExprKind::Field { value, field } => self.eval_field(value, field, &expr.span),
            ExprKind::Lambda { params, body } => Ok(self.eval_lambda(params, body)),
        }
    }

    #[inline(never)]
    fn eval_array(&mut self, items: &[Expr]) -> Result<Value, RuntimeError> {
        let items = items
            .iter()
            .map(|item| self.eval_expr(item))
            .collect::<Result<_, _>>()?;
        Ok(Value::Array(items))
    }

    #[inline(never)]
    fn eval_object(&mut self, entries: &[(String, Expr)]) -> Result<Value, RuntimeError> {
        let mut fields = indexmap::IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let value = self.eval_expr(value)?;
            fields.insert(key.clone(), value);
        }
        Ok(Value::Object(fields))
    }

    #[inline(never)]
    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, span: &Span) -> Result<Value, RuntimeError> {
        let value = self.eval_expr(operand)?;
        eval_unary(op, &value).map_err(|kind| self.error(kind, span))
    }

    #[inline(never)]
    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: &Span,
    ) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(left)?;
        let right = self.eval_expr(right)?;
        eval_binary(op, &left, &right).map_err(|kind| self.error(kind, span))
    }

    #[inline(never)]
    fn eval_comparison(
        &mut self,
        op: ComparisonOp,
        left: &Expr,
        right: &Expr,
        span: &Span,
    ) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(left)?;
        let right = self.eval_expr(right)?;
        eval_comparison(op, &left, &right).map_err(|kind| self.error(kind, span))
    }

    /// Short-circuits and yields the deciding operand itself.
    #[inline(never)]
    fn eval_boolean(&mut self, op: BoolOp, left: &Expr, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(left)?;
        match (op, left.is_truthy()) {
            (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
            _ => self.eval_expr(right),
        }
    }

    #[inline(never)]
    fn eval_if(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr) -> Result<Value, RuntimeError> {
        let branch = if self.eval_expr(cond)?.is_truthy() {
            then_branch
        } else {
            else_branch
        };
        self.eval_expr(branch)
    }

    #[inline(never)]
    fn eval_call(&mut self, callable: &Expr, args: &[Expr], span: &Span) -> Result<Value, RuntimeError> {
        let function = self.eval_expr(callable)?;
        let args = args
            .iter()
            .map(|arg| self.eval_expr(arg))
            .collect::<Result<Vec<_>, _>>()?;
        match function {
            Value::Function(function) => self.call(&function, args, span),
            _ => {
                let callee = self.text_of(&callable.span);
                Err(self.error(RuntimeErrorKind::NotCallable { callee }, span))
            }
        }
    }

    #[inline(never)]
    fn eval_index(&mut self, value: &Expr, index: &Expr, span: &Span) -> Result<Value, RuntimeError> {
        let value = self.eval_expr(value)?;
        let index = self.eval_expr(index)?;
        self.index(&value, &index, span)
    }

    #[inline(never)]
    fn eval_field(&mut self, value: &Expr, field: &str, span: &Span) -> Result<Value, RuntimeError> {
        let value = self.eval_expr(value)?;
        self.field(value, field, span)
    }

    fn eval_lambda(&self, params: &[String], body: &Arc<Expr>) -> Value {
        let frame = self.frame();
        Value::Function(Function::Lambda(Arc::new(Lambda {
            name: None,
            params: params.to_vec(),
            body: Arc::clone(body),
            captured: frame.locals.clone(),
            source: Arc::clone(&frame.source),
        })))
    }

    fn lookup(&self, name: &str, span: &Span) -> Result<Value, RuntimeError> {
        if let Some(value) = self.frame().locals.get(name) {
            return Ok(value.clone());
        }
        self.context.get(name).cloned().ok_or_else(|| {
            self.error(
                RuntimeErrorKind::Undefined {
                    name: name.to_string(),
                },
                span,
            )
        })
    }

    fn call(&mut self, function: &Function, args: Vec<Value>, span: &Span) -> Result<Value, RuntimeError> {
        match function {
            Function::Lambda(lambda) => self.call_lambda(lambda, args, span),
            Function::QueryRoot => self.build_query(None, TermKind::Expr.name(), args, span),
            Function::Term(method) => {
                self.build_query(method.receiver.as_ref(), &method.name, args, span)
            }
        }
    }

    #[inline(never)]
    fn call_lambda(&mut self, lambda: &Lambda, args: Vec<Value>, span: &Span) -> Result<Value, RuntimeError> {
        let mut locals = lambda.captured.clone();
        let mut args = args.into_iter();
        for param in &lambda.params {
            // Missing arguments are null; extra ones are ignored.
            locals.insert(param.clone(), args.next().unwrap_or(Value::Null));
        }

        self.frame_mut().call_site = span.clone();
        self.frames.push(Frame {
            function: Some(lambda.display_name().to_string()),
            source: Arc::clone(&lambda.source),
            locals,
            call_site: Span::default(),
        });
        let result = self.eval_expr(&lambda.body);
        self.frames.pop();
        result
    }

    fn build_query(
        &self,
        receiver: Option<&query::Query>,
        term: &str,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Value, RuntimeError> {
        let args = args
            .iter()
            .map(Value::to_datum)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.error(err.into(), span))?;
        query::build(receiver, term, args)
            .map(Value::Query)
            .map_err(|err| self.error(err.into(), span))
    }

    fn index(&self, value: &Value, index: &Value, span: &Span) -> Result<Value, RuntimeError> {
        match (value, index) {
            (Value::Array(items), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null)),
            (Value::Str(s), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Null)),
            (Value::Object(fields), Value::Str(key)) => {
                Ok(fields.get(key).cloned().unwrap_or(Value::Null))
            }
            (Value::Null, _) => Err(self.error(
                RuntimeErrorKind::Type {
                    message: format!("Cannot read properties of null (reading {})", index),
                },
                span,
            )),
            (Value::Object(_), _) | (Value::Array(_), _) | (Value::Str(_), _) => Ok(Value::Null),
            _ => Err(self.error(
                RuntimeErrorKind::Type {
                    message: format!("{} cannot be indexed", value.type_name()),
                },
                span,
            )),
        }
    }

    fn field(&self, value: Value, field: &str, span: &Span) -> Result<Value, RuntimeError> {
        let is_term = TermKind::from_name(field).is_some();
        match value {
            Value::Function(Function::QueryRoot) if is_term => {
                Ok(Value::Function(Function::term(None, field)))
            }
            Value::Query(query) if is_term => {
                Ok(Value::Function(Function::term(Some(query), field)))
            }
            Value::Object(mut fields) => Ok(fields.swap_remove(field).unwrap_or(Value::Null)),
            Value::Array(items) if field == "length" => Ok(Value::Int(items.len() as i64)),
            Value::Str(s) if field == "length" => Ok(Value::Int(s.chars().count() as i64)),
            Value::Null => Err(self.error(
                RuntimeErrorKind::Type {
                    message: format!("Cannot read properties of null (reading '{}')", field),
                },
                span,
            )),
            _ => Ok(Value::Null),
        }
    }

    fn frame(&self) -> &Frame {
        // `run` always pushes the top-level frame first.
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Source text of `span` in the current frame.
    fn text_of(&self, span: &Span) -> String {
        let text = &self.frame().source.text;
        text.get(span.0.clone()).unwrap_or("expression").to_string()
    }

    /// Attach the current call stack to `kind`, raised at `span`.
    fn error(&self, kind: RuntimeErrorKind, span: &Span) -> RuntimeError {
        let stack = self
            .frames
            .iter()
            .rev()
            .enumerate()
            .map(|(i, frame)| {
                // Outer frames are positioned at the call they are waiting on.
                let position = if i == 0 { span } else { &frame.call_site };
                let (line, column) = frame.source.line_col(position.0.start);
                StackFrame {
                    function: frame.function.clone(),
                    label: frame.source.label.clone(),
                    line,
                    column,
                }
            })
            .collect();
        RuntimeError::new(kind, stack)
    }
}
