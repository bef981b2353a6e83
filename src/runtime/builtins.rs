use crate::language::errors::SyntaxError;
use crate::language::parser;
use crate::runtime::environment::{EnvRef, Environment};
use crate::runtime::interpreter;
use crate::runtime::reader;
use crate::runtime::value::{Fun, Lambda, Value};
use std::fs;

/// Every builtin owns its argument list and is responsible for the value it
/// returns; errors come back as ordinary `Value::Err` results.
pub type BuiltinFn = fn(&EnvRef, Vec<Value>) -> Value;

const NAMES: &[&str] = &[
    "list", "head", "tail", "init", "cons", "len", "join", "eval", "def", "=", "\\", "+", "-",
    "*", "/", "%", "^", ">", "<", ">=", "<=", "==", "!=", "&&", "||", "!", "if", "load", "print",
    "error",
];

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    let op: BuiltinFn = match name {
        "list" => list,
        "head" => head,
        "tail" => tail,
        "init" => init,
        "cons" => cons,
        "len" => len,
        "join" => join,
        "eval" => eval,
        "def" => def,
        "=" => put,
        "\\" => lambda,
        "+" => add,
        "-" => sub,
        "*" => mul,
        "/" => div,
        "%" => rem,
        "^" => pow,
        ">" => gt,
        "<" => lt,
        ">=" => ge,
        "<=" => le,
        "==" => eq,
        "!=" => ne,
        "&&" => and,
        "||" => or,
        "!" => not,
        "if" => if_,
        "load" => load,
        "print" => print,
        "error" => error,
        _ => return None,
    };
    Some(op)
}

/// Seeds a scope with one `Fun::Builtin` binding per registry entry.
pub fn install(env: &EnvRef) {
    let mut scope = env.borrow_mut();
    for name in NAMES {
        scope.put(name, Value::Fun(Fun::Builtin(name.to_string())));
    }
}

/// Parses and evaluates a whole source text against `env`, printing any
/// top-level error results and carrying on with the next expression.
pub fn eval_source(env: &EnvRef, source: &str) -> Result<(), SyntaxError> {
    let root = parser::parse(source)?;
    if let Value::Sexpr(exprs) = reader::read(&root) {
        for expr in exprs {
            let result = interpreter::eval(env, expr);
            if matches!(result, Value::Err(_)) {
                println!("{result}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// List operations

fn one_list_arg(name: &str, mut args: Vec<Value>) -> Result<Vec<Value>, Value> {
    if args.len() != 1 {
        return Err(Value::err(format!(
            "Function '{name}' passed too many arguments."
        )));
    }
    match args.remove(0) {
        Value::Qexpr(cells) => Ok(cells),
        _ => Err(Value::err(format!(
            "Function '{name}' passed incorrect type."
        ))),
    }
}

fn list(_env: &EnvRef, args: Vec<Value>) -> Value {
    Value::Qexpr(args)
}

fn head(_env: &EnvRef, args: Vec<Value>) -> Value {
    let mut cells = match one_list_arg("head", args) {
        Ok(cells) => cells,
        Err(err) => return err,
    };
    if cells.is_empty() {
        return Value::err("Function 'head' passed {}.");
    }
    cells.truncate(1);
    Value::Qexpr(cells)
}

fn tail(_env: &EnvRef, args: Vec<Value>) -> Value {
    let mut cells = match one_list_arg("tail", args) {
        Ok(cells) => cells,
        Err(err) => return err,
    };
    if cells.is_empty() {
        return Value::err("Function 'tail' passed {}.");
    }
    cells.remove(0);
    Value::Qexpr(cells)
}

fn init(_env: &EnvRef, args: Vec<Value>) -> Value {
    let mut cells = match one_list_arg("init", args) {
        Ok(cells) => cells,
        Err(err) => return err,
    };
    if cells.is_empty() {
        return Value::err("Function 'init' passed {}.");
    }
    cells.pop();
    Value::Qexpr(cells)
}

fn cons(_env: &EnvRef, mut args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::err("Function 'cons' passed incorrect number of arguments.");
    }
    let element = args.remove(0);
    match args.remove(0) {
        Value::Qexpr(mut cells) => {
            cells.insert(0, element);
            Value::Qexpr(cells)
        }
        _ => Value::err("Function 'cons' passed incorrect type."),
    }
}

fn len(_env: &EnvRef, args: Vec<Value>) -> Value {
    match one_list_arg("len", args) {
        Ok(cells) => Value::Num(cells.len() as i64),
        Err(err) => err,
    }
}

fn join(_env: &EnvRef, args: Vec<Value>) -> Value {
    let mut joined = Vec::new();
    for arg in args {
        match arg {
            Value::Qexpr(cells) => joined.extend(cells),
            _ => return Value::err("Function 'join' passed incorrect type."),
        }
    }
    Value::Qexpr(joined)
}

fn eval(env: &EnvRef, args: Vec<Value>) -> Value {
    match one_list_arg("eval", args) {
        Ok(cells) => interpreter::eval_sexpr(env, cells),
        Err(err) => err,
    }
}

// ---------------------------------------------------------------------------
// Definition and lambdas

enum Scope {
    Global,
    Local,
}

fn def(env: &EnvRef, args: Vec<Value>) -> Value {
    define(env, args, Scope::Global, "def")
}

fn put(env: &EnvRef, args: Vec<Value>) -> Value {
    define(env, args, Scope::Local, "=")
}

fn define(env: &EnvRef, mut args: Vec<Value>, scope: Scope, name: &str) -> Value {
    if args.is_empty() {
        return Value::err(format!(
            "Function '{name}' passed incorrect number of arguments."
        ));
    }
    let symbols = match args.remove(0) {
        Value::Qexpr(cells) => cells,
        _ => return Value::err(format!("Function '{name}' passed incorrect type.")),
    };
    for symbol in &symbols {
        if !matches!(symbol, Value::Sym(_)) {
            return Value::err(format!("Function '{name}' cannot define non-symbol."));
        }
    }
    if symbols.len() != args.len() {
        return Value::err(format!(
            "Function '{name}' cannot define incorrect number of values to symbols."
        ));
    }
    for (symbol, value) in symbols.into_iter().zip(args) {
        if let Value::Sym(key) = symbol {
            match scope {
                Scope::Global => Environment::def(env, &key, value),
                Scope::Local => env.borrow_mut().put(&key, value),
            }
        }
    }
    Value::Sexpr(Vec::new())
}

fn lambda(_env: &EnvRef, mut args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::err("Function '\\' passed incorrect number of arguments.");
    }
    let formals = match args.remove(0) {
        Value::Qexpr(cells) => cells,
        _ => return Value::err("Function '\\' passed incorrect type."),
    };
    let body = match args.remove(0) {
        Value::Qexpr(cells) => cells,
        _ => return Value::err("Function '\\' passed incorrect type."),
    };
    for formal in &formals {
        if !matches!(formal, Value::Sym(_)) {
            return Value::err(format!(
                "Cannot define non-symbol. Got {}, expected symbol.",
                formal.type_name()
            ));
        }
    }
    Value::Fun(Fun::Lambda(Box::new(Lambda::new(formals, body))))
}

// ---------------------------------------------------------------------------
// Arithmetic

fn add(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "+")
}

fn sub(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "-")
}

fn mul(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "*")
}

fn div(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "/")
}

fn rem(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "%")
}

fn pow(_env: &EnvRef, args: Vec<Value>) -> Value {
    arithmetic(args, "^")
}

fn arithmetic(args: Vec<Value>, op: &str) -> Value {
    let mut nums = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Value::Num(n) => nums.push(*n),
            _ => return Value::err("Cannot operate on non-number."),
        }
    }

    let mut iter = nums.into_iter();
    let mut acc = match iter.next() {
        Some(first) => first,
        None => return Value::err(format!("Function '{op}' passed no arguments.")),
    };

    let mut rest = iter.peekable();
    if op == "-" && rest.peek().is_none() {
        return Value::Num(-acc);
    }

    for y in rest {
        acc = match op {
            "+" => acc.wrapping_add(y),
            "-" => acc.wrapping_sub(y),
            "*" => acc.wrapping_mul(y),
            "/" => {
                if y == 0 {
                    return Value::err("Divide by zero.");
                }
                acc.wrapping_div(y)
            }
            "%" => {
                if y == 0 {
                    return Value::err("Divide by zero.");
                }
                acc.wrapping_rem(y)
            }
            "^" => {
                if y < 0 {
                    return Value::err("Invalid exponent.");
                }
                acc.wrapping_pow(y as u32)
            }
            _ => return Value::err(format!("Invalid operator '{op}'.")),
        };
    }
    Value::Num(acc)
}

// ---------------------------------------------------------------------------
// Comparison and logic

fn gt(_env: &EnvRef, args: Vec<Value>) -> Value {
    ordering(args, ">")
}

fn lt(_env: &EnvRef, args: Vec<Value>) -> Value {
    ordering(args, "<")
}

fn ge(_env: &EnvRef, args: Vec<Value>) -> Value {
    ordering(args, ">=")
}

fn le(_env: &EnvRef, args: Vec<Value>) -> Value {
    ordering(args, "<=")
}

fn ordering(args: Vec<Value>, op: &str) -> Value {
    if args.len() != 2 {
        return Value::err(format!(
            "Function '{op}' passed incorrect number of arguments."
        ));
    }
    let (x, y) = match (&args[0], &args[1]) {
        (Value::Num(x), Value::Num(y)) => (*x, *y),
        _ => return Value::err(format!("Function '{op}' passed incorrect type.")),
    };
    let result = match op {
        ">" => x > y,
        "<" => x < y,
        ">=" => x >= y,
        "<=" => x <= y,
        _ => return Value::err(format!("Invalid operator '{op}'.")),
    };
    Value::Num(result as i64)
}

// Structural equality over any pair of values.
fn eq(_env: &EnvRef, args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::err("Function '==' passed incorrect number of arguments.");
    }
    Value::Num((args[0] == args[1]) as i64)
}

fn ne(_env: &EnvRef, args: Vec<Value>) -> Value {
    if args.len() != 2 {
        return Value::err("Function '!=' passed incorrect number of arguments.");
    }
    Value::Num((args[0] != args[1]) as i64)
}

fn truth_values(args: &[Value], op: &str) -> Result<Vec<bool>, Value> {
    if args.is_empty() {
        return Err(Value::err(format!(
            "Function '{op}' passed incorrect number of arguments."
        )));
    }
    let mut truths = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Num(n) => truths.push(*n != 0),
            _ => return Err(Value::err(format!("Function '{op}' passed incorrect type."))),
        }
    }
    Ok(truths)
}

fn and(_env: &EnvRef, args: Vec<Value>) -> Value {
    match truth_values(&args, "&&") {
        Ok(truths) => Value::Num(truths.iter().all(|t| *t) as i64),
        Err(err) => err,
    }
}

fn or(_env: &EnvRef, args: Vec<Value>) -> Value {
    match truth_values(&args, "||") {
        Ok(truths) => Value::Num(truths.iter().any(|t| *t) as i64),
        Err(err) => err,
    }
}

fn not(_env: &EnvRef, args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::err("Function '!' passed incorrect number of arguments.");
    }
    match &args[0] {
        Value::Num(n) => Value::Num((*n == 0) as i64),
        _ => Value::err("Function '!' passed incorrect type."),
    }
}

// ---------------------------------------------------------------------------
// Conditional

fn if_(env: &EnvRef, mut args: Vec<Value>) -> Value {
    if args.len() != 3 {
        return Value::err("Function 'if' passed incorrect number of arguments.");
    }
    let truthy = match &args[0] {
        Value::Num(n) => *n != 0,
        _ => return Value::err("Function 'if' passed incorrect type."),
    };
    if !matches!(args[1], Value::Qexpr(_)) || !matches!(args[2], Value::Qexpr(_)) {
        return Value::err("Function 'if' passed incorrect type.");
    }
    let branch = if truthy { args.remove(1) } else { args.remove(2) };
    match branch {
        Value::Qexpr(cells) => interpreter::eval_sexpr(env, cells),
        _ => Value::err("Function 'if' passed incorrect type."),
    }
}

// ---------------------------------------------------------------------------
// I/O

fn load(env: &EnvRef, mut args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::err("Function 'load' passed incorrect number of arguments.");
    }
    let path = match args.remove(0) {
        Value::Str(path) => path,
        _ => return Value::err("Function 'load' passed incorrect type."),
    };
    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(io) => return Value::err(format!("Could not load file {path}: {io}")),
    };
    match eval_source(env, &source) {
        Ok(()) => Value::Sexpr(Vec::new()),
        Err(err) => Value::err(format!("Could not load file {path}: {}", err.message)),
    }
}

fn print(_env: &EnvRef, args: Vec<Value>) -> Value {
    let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    println!("{}", rendered.join(" "));
    Value::Sexpr(Vec::new())
}

fn error(_env: &EnvRef, mut args: Vec<Value>) -> Value {
    if args.len() != 1 {
        return Value::err("Function 'error' passed incorrect number of arguments.");
    }
    match args.remove(0) {
        Value::Str(message) => Value::Err(message),
        _ => Value::err("Function 'error' passed incorrect type."),
    }
}
