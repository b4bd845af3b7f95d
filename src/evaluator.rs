use crate::ast::{AssignOp, BinaryOp, IfClause, Program, Stmt, UnaryOp};
use crate::builtins;
use crate::environment::Environment;
use crate::error::{QuillError, Span};
use crate::value::{Function, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// The signal channel statement evaluation unwinds through. `break`,
/// `continue` and `return` travel alongside real diagnostics and are
/// absorbed by the nearest loop or call frame; everything else propagates
/// with `?` untouched.
enum Signal {
    Fail(QuillError),
    Break,
    Continue,
    Return(Value),
}

impl From<QuillError> for Signal {
    fn from(error: QuillError) -> Self {
        Signal::Fail(error)
    }
}

impl Signal {
    /// Collapses the channel at a boundary no signal may cross.
    fn into_error(self, span: Span) -> QuillError {
        match self {
            Signal::Fail(error) => error,
            Signal::Break => {
                QuillError::flow_error(span, "'break' outside of a loop.".to_string())
            }
            Signal::Continue => {
                QuillError::flow_error(span, "'continue' outside of a loop.".to_string())
            }
            Signal::Return(_) => {
                QuillError::flow_error(span, "'return' outside of a function.".to_string())
            }
        }
    }
}

type Exec<T> = Result<T, Signal>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    /// Loop nesting within the current call frame. Reset on call entry so
    /// a `break` inside a function body cannot reach a caller's loop.
    loop_depth: usize,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: builtins::global_environment(),
            loop_depth: 0,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        self.globals.clone()
    }

    /// Evaluates a program against the global environment and yields the
    /// value of its last statement.
    pub fn interpret(&mut self, program: &Program) -> Result<Value, QuillError> {
        let env = self.globals.clone();
        let mut last = Value::Null;
        for stmt in &program.statements {
            last = self
                .eval(stmt, &env)
                .map_err(|signal| signal.into_error(stmt.span()))?;
        }
        Ok(last)
    }

    /// Calls the global `main` function, if one is declared, with no
    /// arguments.
    pub fn run_main(&mut self) -> Result<Option<Value>, QuillError> {
        if !self.globals.borrow().exists("main") {
            return Ok(None);
        }
        let span = Span::single(0);
        let main = self.globals.borrow().get("main", span)?;
        let Value::Function(function) = main else {
            return Ok(None);
        };
        let value = self
            .call_function(&function, Vec::new(), span)
            .map_err(|signal| signal.into_error(span))?;
        Ok(Some(value))
    }

    fn eval(&mut self, stmt: &Stmt, env: &Rc<RefCell<Environment>>) -> Exec<Value> {
        match stmt {
            Stmt::VarDecl {
                constant,
                names,
                values,
                span,
            } => self.eval_var_decl(*constant, names, values, *span, env),
            Stmt::FnDecl {
                name,
                params,
                param_defaults,
                return_name,
                return_default,
                body,
                span,
            } => {
                let mut defaults = Vec::with_capacity(param_defaults.len());
                for default in param_defaults {
                    defaults.push(self.eval(default, env)?);
                }
                let return_default = match return_default {
                    Some(default) => self.eval(default, env)?,
                    None => Value::Null,
                };

                let function = Value::Function(Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    param_defaults: defaults,
                    return_name: return_name.clone(),
                    return_default,
                    env: env.clone(),
                    body: Rc::new((**body).clone()),
                }));
                env.borrow_mut().declare(name, function, true, *span)?;
                Ok(Value::Null)
            }
            Stmt::Delete { names, span } => {
                for name in names {
                    env.borrow_mut().delete(name, *span)?;
                }
                Ok(Value::Null)
            }
            Stmt::Exists { name, .. } => Ok(Value::Bool(env.borrow().exists(name))),
            Stmt::IfElse {
                clauses, else_body, ..
            } => self.eval_if_else(clauses, else_body.as_deref(), env),
            Stmt::While {
                condition, body, ..
            } => {
                self.loop_depth += 1;
                let result = self.eval_while(condition.as_deref(), body, env);
                self.loop_depth -= 1;
                result
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                // The header clauses and the body share one fresh scope.
                let header = Rc::new(RefCell::new(Environment::with_parent(env.clone())));
                if let Some(init) = init {
                    self.eval(init, &header)?;
                }
                self.loop_depth += 1;
                let result =
                    self.eval_for(condition.as_deref(), step.as_deref(), body, &header);
                self.loop_depth -= 1;
                result
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    return Err(QuillError::flow_error(
                        *span,
                        "'break' outside of a loop.".to_string(),
                    )
                    .into());
                }
                Err(Signal::Break)
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    return Err(QuillError::flow_error(
                        *span,
                        "'continue' outside of a loop.".to_string(),
                    )
                    .into());
                }
                Err(Signal::Continue)
            }
            Stmt::Return { value, span } => {
                if self.call_depth == 0 {
                    return Err(QuillError::flow_error(
                        *span,
                        "'return' outside of a function.".to_string(),
                    )
                    .into());
                }
                let value = self.eval(value, env)?;
                Err(Signal::Return(value))
            }
            Stmt::Unless {
                condition, body, ..
            } => {
                let condition_value = self.eval(condition, env)?;
                if !condition_value.as_bool(condition.span())? {
                    self.eval(body, env)
                } else {
                    Ok(Value::Null)
                }
            }
            Stmt::Block { statements, .. } => {
                let scope = Rc::new(RefCell::new(Environment::with_parent(env.clone())));
                self.eval_statements(statements, &scope)
            }
            Stmt::Assign {
                op,
                name,
                value,
                span,
            } => self.eval_assign(*op, name, value, *span, env),
            Stmt::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition_value = self.eval(condition, env)?;
                if condition_value.as_bool(condition.span())? {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }
            Stmt::Binary {
                op,
                left,
                right,
                span,
            } => self.eval_binary(*op, left, right, *span, env),
            Stmt::Unary { op, operand, span } => self.eval_unary(*op, operand, *span, env),
            Stmt::Call { callee, args, span } => self.eval_call(callee, args, *span, env),
            Stmt::Variable { name, span } => Ok(env.borrow().get(name, *span)?),
            Stmt::Number { value, .. } => Ok(Value::Number(*value)),
            Stmt::Char { value, .. } => Ok(Value::Char(*value)),
            Stmt::Str { value, .. } => Ok(Value::Str(value.clone())),
            Stmt::Null { .. } => Ok(Value::Null),
        }
    }

    /// Evaluates a statement sequence in the given scope, yielding the
    /// last statement's value. Any signal stops the sequence immediately.
    fn eval_statements(
        &mut self,
        statements: &[Stmt],
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        let mut last = Value::Null;
        for stmt in statements {
            last = self.eval(stmt, env)?;
        }
        Ok(last)
    }

    fn eval_var_decl(
        &mut self,
        constant: bool,
        names: &[String],
        values: &[Stmt],
        span: Span,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        // One value, many targets: broadcast a copy to each.
        if values.len() == 1 && names.len() > 1 {
            let value = self.eval(&values[0], env)?;
            for name in names {
                env.borrow_mut().declare(name, value.clone(), constant, span)?;
            }
            return Ok(Value::Null);
        }

        // Otherwise pair names with values; the last value fills any
        // remaining targets, and with no values at all everything is null.
        let mut last = Value::Null;
        for (i, name) in names.iter().enumerate() {
            if i < values.len() {
                last = self.eval(&values[i], env)?;
            }
            env.borrow_mut().declare(name, last.clone(), constant, span)?;
        }
        Ok(Value::Null)
    }

    fn eval_if_else(
        &mut self,
        clauses: &[IfClause],
        else_body: Option<&Stmt>,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        for clause in clauses {
            let condition = self.eval(&clause.condition, env)?;
            if condition.as_bool(clause.condition.span())? {
                return self.eval(&clause.body, env);
            }
        }
        match else_body {
            Some(body) => self.eval(body, env),
            None => Ok(Value::Null),
        }
    }

    fn eval_while(
        &mut self,
        condition: Option<&Stmt>,
        body: &Stmt,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        let mut result = Value::Null;
        loop {
            if let Some(condition) = condition {
                let value = self.eval(condition, env)?;
                if !value.as_bool(condition.span())? {
                    break;
                }
            }
            match self.eval(body, env) {
                Ok(value) => result = value,
                Err(Signal::Break) => break,
                Err(Signal::Continue) => continue,
                Err(signal) => return Err(signal),
            }
        }
        Ok(result)
    }

    fn eval_for(
        &mut self,
        condition: Option<&Stmt>,
        step: Option<&Stmt>,
        body: &Stmt,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        let mut result = Value::Null;
        loop {
            if let Some(condition) = condition {
                let value = self.eval(condition, env)?;
                if !value.as_bool(condition.span())? {
                    break;
                }
            }
            match self.eval(body, env) {
                Ok(value) => result = value,
                Err(Signal::Break) => break,
                Err(Signal::Continue) => {}
                Err(signal) => return Err(signal),
            }
            // The step runs after normal iterations and after `continue`.
            if let Some(step) = step {
                self.eval(step, env)?;
            }
        }
        Ok(result)
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        name: &str,
        value: &Stmt,
        span: Span,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        let right = self.eval(value, env)?;

        let combined = if op == AssignOp::Assign {
            right
        } else {
            let current = env.borrow().get(name, span)?;
            match op {
                AssignOp::AddAssign => current.add(&right, span)?,
                AssignOp::SubtractAssign => current.subtract(&right, span)?,
                AssignOp::MultiplyAssign => current.multiply(&right, span)?,
                AssignOp::DivideAssign => current.divide(&right, span)?,
                AssignOp::RemainderAssign => current.remainder(&right, span)?,
                AssignOp::ExponentiateAssign => current.exponentiate(&right, span)?,
                AssignOp::Assign => unreachable!(),
            }
        };

        env.borrow_mut().assign(name, combined.clone(), span)?;
        Ok(combined)
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Stmt,
        right: &Stmt,
        span: Span,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        // These three never evaluate the right side eagerly.
        match op {
            BinaryOp::NullCoalesce => {
                let left_value = self.eval(left, env)?;
                if !matches!(left_value, Value::Null) {
                    return Ok(left_value);
                }
                return self.eval(right, env);
            }
            BinaryOp::And => {
                let left_value = self.eval(left, env)?;
                if !left_value.as_bool(left.span())? {
                    return Ok(Value::Bool(false));
                }
                let right_value = self.eval(right, env)?;
                return Ok(Value::Bool(right_value.as_bool(right.span())?));
            }
            BinaryOp::Or => {
                let left_value = self.eval(left, env)?;
                if left_value.as_bool(left.span())? {
                    return Ok(Value::Bool(true));
                }
                let right_value = self.eval(right, env)?;
                return Ok(Value::Bool(right_value.as_bool(right.span())?));
            }
            _ => {}
        }

        let left_value = self.eval(left, env)?;
        let right_value = self.eval(right, env)?;

        let value = match op {
            BinaryOp::Add => left_value.add(&right_value, span)?,
            BinaryOp::Subtract => left_value.subtract(&right_value, span)?,
            BinaryOp::Multiply => left_value.multiply(&right_value, span)?,
            BinaryOp::Divide => left_value.divide(&right_value, span)?,
            BinaryOp::Remainder => left_value.remainder(&right_value, span)?,
            BinaryOp::Exponentiate => left_value.exponentiate(&right_value, span)?,
            BinaryOp::Divisible => {
                let remainder = left_value.remainder(&right_value, span)?;
                Value::Bool(!remainder.as_bool(span)?)
            }
            BinaryOp::Equal => Value::Bool(left_value.equal(&right_value, span)?),
            BinaryOp::NotEqual => Value::Bool(!left_value.equal(&right_value, span)?),
            BinaryOp::StrictEqual => Value::Bool(
                left_value.same_variant(&right_value) && left_value.equal(&right_value, span)?,
            ),
            BinaryOp::StrictNotEqual => Value::Bool(
                !left_value.same_variant(&right_value)
                    || !left_value.equal(&right_value, span)?,
            ),
            BinaryOp::Greater => Value::Bool(left_value.greater(&right_value, ">", span)?),
            BinaryOp::GreaterEqual => {
                Value::Bool(!right_value.greater(&left_value, ">=", span)?)
            }
            BinaryOp::Less => Value::Bool(right_value.greater(&left_value, "<", span)?),
            BinaryOp::LessEqual => Value::Bool(!left_value.greater(&right_value, "<=", span)?),
            BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce => unreachable!(),
        };
        Ok(value)
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: &Stmt,
        span: Span,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        match op {
            UnaryOp::Identity => self.eval(operand, env),
            UnaryOp::Negate => {
                let value = self.eval(operand, env)?;
                Ok(value.negate(span)?)
            }
            UnaryOp::Not => {
                let value = self.eval(operand, env)?;
                Ok(Value::Bool(!value.as_bool(operand.span())?))
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let value = self.eval(operand, env)?;
                let stepped = if op == UnaryOp::Increment {
                    value.increment(span)?
                } else {
                    value.decrement(span)?
                };
                // On a bound name this is a read-modify-write; the new
                // value is the expression's result either way.
                if let Stmt::Variable { name, .. } = operand {
                    env.borrow_mut().assign(name, stepped.clone(), span)?;
                }
                Ok(stepped)
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Stmt,
        args: &[Stmt],
        span: Span,
        env: &Rc<RefCell<Environment>>,
    ) -> Exec<Value> {
        let callee_value = self.eval(callee, env)?;

        // Arguments evaluate left to right in the caller's environment.
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval(arg, env)?);
        }

        match callee_value {
            Value::NativeFn { handler, .. } => Ok(handler(arg_values, env, span)?),
            Value::Function(function) => self.call_function(&function, arg_values, span),
            other => Err(QuillError::type_error(
                span,
                format!(
                    "Attempted to call '{}', but only 'NativeFunction' and 'Function' are callable.",
                    other.type_name()
                ),
            )
            .into()),
        }
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        span: Span,
    ) -> Exec<Value> {
        let required = function.params.len() - function.param_defaults.len();
        if args.len() < required || args.len() > function.params.len() {
            return Err(QuillError::type_error(
                span,
                format!(
                    "Expected {} to {} argument(s) calling '{}', got {}.",
                    required,
                    function.params.len(),
                    function.name,
                    args.len()
                ),
            )
            .into());
        }

        let frame = Rc::new(RefCell::new(Environment::with_parent(function.env.clone())));
        {
            let mut frame = frame.borrow_mut();
            for (i, param) in function.params.iter().enumerate() {
                let value = if i < args.len() {
                    args[i].clone()
                } else {
                    function.param_defaults[i - required].clone()
                };
                frame.declare(param, value, false, span)?;
            }
            if let Some(return_name) = &function.return_name {
                frame.declare(return_name, function.return_default.clone(), false, span)?;
            }
        }

        // A call frame gets a fresh loop context: loop signals never cross
        // it, and only its own `return` is absorbed here.
        let saved_loop_depth = self.loop_depth;
        self.loop_depth = 0;
        self.call_depth += 1;

        let result = match &*function.body {
            Stmt::Block { statements, .. } => self.eval_statements(statements, &frame),
            body => self.eval(body, &frame),
        };

        self.call_depth -= 1;
        self.loop_depth = saved_loop_depth;

        match result {
            Err(Signal::Return(value)) => Ok(value),
            other => other,
        }
    }
}
