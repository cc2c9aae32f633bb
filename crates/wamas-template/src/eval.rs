use crate::expr::{BinaryOp, CompareOp, Expr, UnaryOp};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use std::cmp::Ordering;
use wamas_record::temporal::{local_to_utc, utc_to_local};
use wamas_record::{DEFAULT_TIMEZONE, GenericRecord, Temporal, Value};

/// Read-only inputs of a render
///
/// Expressions see three global names: `record`, `extra_data` and
/// `unit_codes` (a WAMAS to UBL unit-code map).
#[derive(Debug, Clone)]
pub struct RenderContext {
    record: Value,
    extra_data: Value,
    unit_codes: Value,
    now: DateTime<Utc>,
    timezone: Tz,
}

impl RenderContext {
    /// Create a context for one record, using the current time.
    pub fn new(record: GenericRecord) -> Self {
        Self {
            record: Value::Record(record),
            extra_data: Value::Record(GenericRecord::new()),
            unit_codes: Value::Record(GenericRecord::new()),
            now: Utc::now(),
            timezone: DEFAULT_TIMEZONE,
        }
    }

    pub fn with_extra_data(mut self, extra_data: GenericRecord) -> Self {
        self.extra_data = Value::Record(extra_data);
        self
    }

    /// Set the unit-code map from `(wamas, ubl)` pairs.
    pub fn with_unit_codes<'a>(
        mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        self.unit_codes = Value::Record(
            pairs
                .into_iter()
                .map(|(wamas, ubl)| (wamas.to_string(), Value::from(ubl)))
                .collect(),
        );
        self
    }

    /// Pin the clock used by `get_current_date` and `get_current_time`.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    fn global(&self, name: &str) -> Option<&Value> {
        match name {
            "record" => Some(&self.record),
            "extra_data" => Some(&self.extra_data),
            "unit_codes" => Some(&self.unit_codes),
            _ => None,
        }
    }
}

/// Variable scope of a render: a stack of frames over the context globals
///
/// Lookups search frames from the innermost outwards, then the globals.
/// `t-set` binds into the innermost frame, so a binding made inside a loop
/// body is gone once the loop ends.
#[derive(Debug)]
pub struct Scope<'c> {
    context: &'c RenderContext,
    frames: Vec<IndexMap<String, Value>>,
}

impl<'c> Scope<'c> {
    pub fn new(context: &'c RenderContext) -> Self {
        Self {
            context,
            frames: vec![IndexMap::new()],
        }
    }

    pub fn context(&self) -> &'c RenderContext {
        self.context
    }

    pub fn push(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Drop the innermost frame; the root frame is never dropped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.context.global(name))
    }
}

/// Evaluate an expression.
///
/// # Errors
///
/// Returns [`Error::Eval`] for undefined names, missing keys, type errors,
/// division by zero and calls outside the allowed helpers and methods.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, scope))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Expr::Name(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::eval(format!("name '{name}' is not defined"))),
        Expr::Attr(target, name) => attribute(&evaluate(target, scope)?, name),
        Expr::Index(target, index) => {
            subscript(&evaluate(target, scope)?, &evaluate(index, scope)?)
        }
        Expr::Call(func, args) => call(func, args, scope),
        Expr::Unary(UnaryOp::Not, operand) => {
            Ok(Value::Bool(!evaluate(operand, scope)?.is_truthy()))
        }
        Expr::Unary(UnaryOp::Neg, operand) => match evaluate(operand, scope)? {
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| Error::eval("integer overflow")),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            Value::Bool(b) => Ok(Value::Integer(-i64::from(b))),
            other => Err(Error::eval(format!(
                "bad operand type for unary -: {}",
                other.type_name()
            ))),
        },
        Expr::Binary(op, left, right) => {
            arithmetic(*op, evaluate(left, scope)?, evaluate(right, scope)?)
        }
        Expr::Compare(op, left, right) => {
            compare(*op, &evaluate(left, scope)?, &evaluate(right, scope)?).map(Value::Bool)
        }
        Expr::And(left, right) => {
            let left = evaluate(left, scope)?;
            if left.is_truthy() {
                evaluate(right, scope)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = evaluate(left, scope)?;
            if left.is_truthy() {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Conditional {
            then,
            cond,
            otherwise,
        } => {
            if evaluate(cond, scope)?.is_truthy() {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
    }
}

fn attribute(target: &Value, name: &str) -> Result<Value> {
    match target {
        Value::Record(record) => record
            .get(name)
            .cloned()
            .ok_or_else(|| Error::eval(format!("record has no attribute '{name}'"))),
        other => Err(Error::eval(format!(
            "{} has no attribute '{name}'",
            other.type_name()
        ))),
    }
}

fn subscript(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::List(items), Value::Integer(i)) => {
            position(items.len(), *i).map(|pos| items[pos].clone())
        }
        (Value::String(s), Value::Integer(i)) => {
            let chars: Vec<char> = s.chars().collect();
            position(chars.len(), *i).map(|pos| Value::String(chars[pos].to_string()))
        }
        (Value::Record(record), key) => {
            let key = key.to_text();
            record
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::eval(format!("key '{key}' not found")))
        }
        (target, index) => Err(Error::eval(format!(
            "{} cannot be indexed by {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against a sequence length.
fn position(len: usize, index: i64) -> Result<usize> {
    let len = i64::try_from(len).map_err(|_| Error::eval("sequence too long"))?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| Error::eval("index out of range"))
    } else {
        Err(Error::eval(format!("index {index} out of range")))
    }
}

fn call(func: &Expr, args: &[Expr], scope: &Scope<'_>) -> Result<Value> {
    let args = args
        .iter()
        .map(|arg| evaluate(arg, scope))
        .collect::<Result<Vec<_>>>()?;
    match func {
        Expr::Name(name) => call_function(name, &args, scope.context()),
        Expr::Attr(receiver, method) => call_method(&evaluate(receiver, scope)?, method, &args),
        _ => Err(Error::eval("expression is not callable")),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(Error::eval(format!(
            "{name}() takes {min} to {max} arguments, {} given",
            args.len()
        )))
    }
}

fn temporal_arg(name: &str, value: &Value) -> Result<Temporal> {
    Temporal::from_value(value)
        .ok_or_else(|| Error::eval(format!("{name}() cannot parse '{}'", value.to_text())))
}

fn call_function(name: &str, args: &[Value], ctx: &RenderContext) -> Result<Value> {
    let text = |s: String| -> Result<Value> { Ok(Value::String(s)) };
    match name {
        "get_date" => {
            arity(name, args, 1, 1)?;
            text(match temporal_arg(name, &args[0])? {
                Temporal::Date(d) => d.format("%Y-%m-%d").to_string(),
                Temporal::DateTime(dt) => local_to_utc(dt, ctx.timezone)
                    .format("%Y-%m-%d")
                    .to_string(),
            })
        }
        "get_time" => {
            arity(name, args, 1, 1)?;
            text(match temporal_arg(name, &args[0])? {
                Temporal::Date(_) => "00:00:00".to_string(),
                Temporal::DateTime(dt) => local_to_utc(dt, ctx.timezone)
                    .format("%H:%M:%S")
                    .to_string(),
            })
        }
        "get_current_date" => {
            arity(name, args, 0, 0)?;
            text(
                utc_to_local(ctx.now.naive_utc(), ctx.timezone)
                    .format("%Y-%m-%d")
                    .to_string(),
            )
        }
        "get_current_time" => {
            arity(name, args, 0, 0)?;
            text(ctx.now.format("%H:%M:%S").to_string())
        }
        "unit_code" => {
            arity(name, args, 1, 1)?;
            let code = args[0].to_text();
            Ok(ctx
                .unit_codes
                .as_record()
                .and_then(|codes| codes.get(&code))
                .cloned()
                .unwrap_or_else(|| args[0].clone()))
        }
        "len" => {
            arity(name, args, 1, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Record(record) => record.len(),
                other => return Err(Error::eval(format!("{} has no len()", other.type_name()))),
            };
            i64::try_from(len)
                .map(Value::Integer)
                .map_err(|_| Error::eval("length overflow"))
        }
        "str" => {
            arity(name, args, 1, 1)?;
            text(args[0].to_text())
        }
        "int" => {
            arity(name, args, 1, 1)?;
            let arg = &args[0];
            if !is_scalar(arg) {
                return Err(Error::eval(format!(
                    "int() argument cannot be {}",
                    arg.type_name()
                )));
            }
            arg.as_i64().map(Value::Integer).ok_or_else(|| {
                Error::eval(format!("invalid literal for int(): '{}'", arg.to_text()))
            })
        }
        "float" => {
            arity(name, args, 1, 1)?;
            let arg = &args[0];
            if !is_scalar(arg) {
                return Err(Error::eval(format!(
                    "float() argument cannot be {}",
                    arg.type_name()
                )));
            }
            arg.as_f64().map(Value::Decimal).ok_or_else(|| {
                Error::eval(format!(
                    "could not convert string to float: '{}'",
                    arg.to_text()
                ))
            })
        }
        "abs" => {
            arity(name, args, 1, 1)?;
            match &args[0] {
                Value::Integer(i) => i
                    .checked_abs()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::eval("integer overflow")),
                Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
                Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
                other => Err(Error::eval(format!(
                    "bad operand type for abs(): {}",
                    other.type_name()
                ))),
            }
        }
        "round" => {
            arity(name, args, 1, 2)?;
            let value = number(&args[0])?.as_f64();
            let Some(digits) = args.get(1) else {
                return Ok(Value::Integer(value.round_ties_even() as i64));
            };
            let digits = match digits {
                Value::Integer(n) => {
                    i32::try_from(*n).map_err(|_| Error::eval("round() digits out of range"))?
                }
                other => {
                    return Err(Error::eval(format!(
                        "round() digits cannot be {}",
                        other.type_name()
                    )));
                }
            };
            let factor = 10f64.powi(digits);
            Ok(Value::Decimal((value * factor).round_ties_even() / factor))
        }
        "bool" => {
            arity(name, args, 1, 1)?;
            Ok(Value::Bool(args[0].is_truthy()))
        }
        _ => Err(Error::eval(format!("function '{name}' is not allowed"))),
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Integer(_) | Value::Decimal(_) | Value::Bool(_) | Value::String(_)
    )
}

fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
    if method == "get" {
        let record = receiver
            .as_record()
            .ok_or_else(|| Error::eval(format!("{} has no method 'get'", receiver.type_name())))?;
        arity(method, args, 1, 2)?;
        return Ok(record
            .get(&args[0].to_text())
            .cloned()
            .or_else(|| args.get(1).cloned())
            .unwrap_or(Value::Null));
    }

    let Value::String(s) = receiver else {
        return Err(Error::eval(format!(
            "{} has no method '{method}'",
            receiver.type_name()
        )));
    };
    let arg = |i: usize| args.get(i).map(Value::to_text);
    match method {
        "strip" => {
            arity(method, args, 0, 1)?;
            let stripped = match arg(0) {
                Some(chars) => s.trim_matches(|c: char| chars.contains(c)),
                None => s.trim(),
            };
            Ok(Value::from(stripped))
        }
        "upper" => {
            arity(method, args, 0, 0)?;
            Ok(Value::String(s.to_uppercase()))
        }
        "lower" => {
            arity(method, args, 0, 0)?;
            Ok(Value::String(s.to_lowercase()))
        }
        "replace" => {
            arity(method, args, 2, 2)?;
            Ok(Value::String(s.replace(&args[0].to_text(), &args[1].to_text())))
        }
        "startswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.starts_with(&args[0].to_text())))
        }
        "endswith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.ends_with(&args[0].to_text())))
        }
        "split" => {
            arity(method, args, 0, 1)?;
            let parts: Vec<Value> = match arg(0) {
                Some(sep) if sep.is_empty() => return Err(Error::eval("empty separator")),
                Some(sep) => s.split(sep.as_str()).map(Value::from).collect(),
                None => s.split_whitespace().map(Value::from).collect(),
            };
            Ok(Value::List(parts))
        }
        "join" => {
            arity(method, args, 1, 1)?;
            let items = args[0]
                .as_list()
                .ok_or_else(|| Error::eval("join() expects a list"))?;
            let parts: Vec<String> = items.iter().map(Value::to_text).collect();
            Ok(Value::String(parts.join(s)))
        }
        _ => Err(Error::eval(format!("method '{method}' is not allowed"))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

fn number(value: &Value) -> Result<Number> {
    match value {
        Value::Integer(i) => Ok(Number::Int(*i)),
        Value::Decimal(d) => Ok(Number::Float(*d)),
        Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
        other => Err(Error::eval(format!("{} is not a number", other.type_name()))),
    }
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (BinaryOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (BinaryOp::Mul, Value::String(s), Value::Integer(n))
        | (BinaryOp::Mul, Value::Integer(n), Value::String(s)) => {
            Ok(Value::String(s.repeat(usize::try_from(n).unwrap_or(0))))
        }
        (op, left, right) => numeric(op, number(&left)?, number(&right)?),
    }
}

fn numeric(op: BinaryOp, left: Number, right: Number) -> Result<Value> {
    let overflow = || Error::eval("integer overflow");
    if let (Number::Int(a), Number::Int(b)) = (left, right) {
        return match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
            BinaryOp::Div if b == 0 => Err(Error::eval("division by zero")),
            BinaryOp::Div => Ok(Value::Decimal(a as f64 / b as f64)),
            BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => Err(Error::eval("division by zero")),
            BinaryOp::FloorDiv => {
                let quotient = a / b;
                let adjust = a % b != 0 && (a < 0) != (b < 0);
                Ok(Value::Integer(if adjust { quotient - 1 } else { quotient }))
            }
            BinaryOp::Mod => Ok(Value::Integer(((a % b) + b) % b)),
        };
    }

    let (a, b) = (left.as_f64(), right.as_f64());
    if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
        return Err(Error::eval("division by zero"));
    }
    Ok(Value::Decimal(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
    }))
}

fn equals(left: &Value, right: &Value) -> bool {
    match (number(left), number(right)) {
        (Ok(a), Ok(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Result<Ordering> {
    let order = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => match (number(left), number(right)) {
            (Ok(a), Ok(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => None,
        },
    };
    order.ok_or_else(|| {
        Error::eval(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_str())),
            other => Err(Error::eval(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.iter().any(|candidate| equals(candidate, item))),
        Value::Record(record) => Ok(record.contains_key(&item.to_text())),
        other => Err(Error::eval(format!("{} is not a container", other.type_name()))),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(equals(left, right)),
        CompareOp::Ne => Ok(!equals(left, right)),
        CompareOp::Lt => ordering(left, right).map(Ordering::is_lt),
        CompareOp::Le => ordering(left, right).map(Ordering::is_le),
        CompareOp::Gt => ordering(left, right).map(Ordering::is_gt),
        CompareOp::Ge => ordering(left, right).map(Ordering::is_ge),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
    }
}
