use crate::runtime::environment::{EnvRef, Environment};
use std::fmt;

/// The tagged runtime datum. Lists own their elements exclusively; a lambda
/// owns its captured environment alone.
#[derive(Clone, Debug)]
pub enum Value {
    Num(i64),
    Err(String),
    Sym(String),
    Str(String),
    Fun(Fun),
    Sexpr(Vec<Value>),
    Qexpr(Vec<Value>),
}

/// Builtins carry only their registry name so every `Fun` has a uniform
/// layout; the operation itself is resolved at call time.
#[derive(Clone, Debug)]
pub enum Fun {
    Builtin(String),
    Lambda(Box<Lambda>),
}

#[derive(Debug)]
pub struct Lambda {
    pub formals: Vec<Value>,
    pub body: Vec<Value>,
    pub env: EnvRef,
}

impl Lambda {
    /// A lambda starts with a fresh, parentless scope; formals are bound into
    /// it call by call, and the parent is attached at full application.
    pub fn new(formals: Vec<Value>, body: Vec<Value>) -> Self {
        Self {
            formals,
            body,
            env: Environment::new_ref(),
        }
    }
}

impl Clone for Lambda {
    // Copies duplicate the captured bindings but keep the original parent
    // handle, so successive calls never share binding state.
    fn clone(&self) -> Self {
        Self {
            formals: self.formals.clone(),
            body: self.body.clone(),
            env: Environment::copy_ref(&self.env),
        }
    }
}

impl Value {
    pub fn err(message: impl Into<String>) -> Value {
        Value::Err(message.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Err(_) => "error",
            Value::Sym(_) => "symbol",
            Value::Str(_) => "string",
            Value::Fun(_) => "function",
            Value::Sexpr(_) => "s-expression",
            Value::Qexpr(_) => "q-expression",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Num(x), Value::Num(y)) => x == y,
            (Value::Err(x), Value::Err(y)) => x == y,
            (Value::Sym(x), Value::Sym(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Fun(x), Value::Fun(y)) => x == y,
            (Value::Sexpr(x), Value::Sexpr(y)) => x == y,
            (Value::Qexpr(x), Value::Qexpr(y)) => x == y,
            _ => false,
        }
    }
}

impl PartialEq for Fun {
    // The captured environment is deliberately not part of lambda equality.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fun::Builtin(x), Fun::Builtin(y)) => x == y,
            (Fun::Lambda(x), Fun::Lambda(y)) => {
                x.formals == y.formals && x.body == y.body
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Err(message) => write!(f, "Error: {message}"),
            Value::Sym(name) => write!(f, "{name}"),
            Value::Str(text) => write!(f, "\"{}\"", escape(text)),
            Value::Fun(Fun::Builtin(name)) => write!(f, "<builtin '{name}'>"),
            Value::Fun(Fun::Lambda(lambda)) => {
                write!(f, "(\\ ")?;
                write_list(f, '{', &lambda.formals, '}')?;
                write!(f, " ")?;
                write_list(f, '{', &lambda.body, '}')?;
                write!(f, ")")
            }
            Value::Sexpr(cells) => write_list(f, '(', cells, ')'),
            Value::Qexpr(cells) => write_list(f, '{', cells, '}'),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, open: char, cells: &[Value], close: char) -> fmt::Result {
    write!(f, "{open}")?;
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell}")?;
    }
    write!(f, "{close}")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}
