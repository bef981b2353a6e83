use crate::runtime::builtins;
use crate::runtime::environment::{EnvRef, Environment};
use crate::runtime::value::{Fun, Lambda, Value};
use std::rc::Rc;

/// Symbols resolve through the environment, S-expressions reduce by
/// application, everything else evaluates to itself.
pub fn eval(env: &EnvRef, value: Value) -> Value {
    match value {
        Value::Sym(name) => Environment::get(env, &name),
        Value::Sexpr(cells) => eval_sexpr(env, cells),
        other => other,
    }
}

pub fn eval_sexpr(env: &EnvRef, cells: Vec<Value>) -> Value {
    // Children evaluate left to right; order matters for side-effecting
    // builtins such as `print`.
    let mut evaluated = Vec::with_capacity(cells.len());
    for cell in cells {
        evaluated.push(eval(env, cell));
    }

    // First error wins and discards the remaining results.
    if let Some(idx) = evaluated.iter().position(|cell| matches!(cell, Value::Err(_))) {
        return evaluated.swap_remove(idx);
    }

    if evaluated.is_empty() {
        return Value::Sexpr(evaluated);
    }
    if evaluated.len() == 1 {
        return evaluated.remove(0);
    }

    let head = evaluated.remove(0);
    match head {
        Value::Fun(fun) => apply(env, fun, evaluated),
        _ => Value::err("First element is not a function."),
    }
}

pub fn apply(env: &EnvRef, fun: Fun, args: Vec<Value>) -> Value {
    match fun {
        Fun::Builtin(name) => match builtins::lookup(&name) {
            Some(op) => op(env, args),
            None => Value::err(format!("Unknown builtin: {name}")),
        },
        Fun::Lambda(lambda) => apply_lambda(env, *lambda, args),
    }
}

fn apply_lambda(env: &EnvRef, mut lambda: Lambda, mut args: Vec<Value>) -> Value {
    let given = args.len();
    let total = lambda.formals.len();

    while !args.is_empty() {
        if lambda.formals.is_empty() {
            return Value::err(format!(
                "too many arguments, got {given}, expected {total}"
            ));
        }
        let name = match lambda.formals.remove(0) {
            Value::Sym(name) => name,
            other => {
                return Value::err(format!(
                    "Function formal is not a symbol. Got {}.",
                    other.type_name()
                ))
            }
        };

        if name == "&" {
            // The next formal captures every remaining argument as a Q-expression.
            if lambda.formals.len() != 1 {
                return Value::err(
                    "Function format invalid. Symbol '&' not followed by single symbol.",
                );
            }
            match lambda.formals.remove(0) {
                Value::Sym(rest) => {
                    let rest_args = std::mem::take(&mut args);
                    lambda.env.borrow_mut().put(&rest, Value::Qexpr(rest_args));
                }
                other => {
                    return Value::err(format!(
                        "Function formal is not a symbol. Got {}.",
                        other.type_name()
                    ))
                }
            }
            break;
        }

        let arg = args.remove(0);
        lambda.env.borrow_mut().put(&name, arg);
    }

    // The caller ran out of arguments exactly at the variadic marker: the
    // rest parameter binds to an empty list.
    if matches!(lambda.formals.first(), Some(Value::Sym(name)) if name == "&") {
        if lambda.formals.len() != 2 {
            return Value::err(
                "Function format invalid. Symbol '&' not followed by single symbol.",
            );
        }
        lambda.formals.remove(0);
        if let Value::Sym(rest) = lambda.formals.remove(0) {
            lambda.env.borrow_mut().put(&rest, Value::Qexpr(Vec::new()));
        }
    }

    if lambda.formals.is_empty() {
        // Free variables in the body resolve against the caller's scope at
        // call time, not the definition site. Deliberate; do not "fix" to
        // lexical capture.
        lambda.env.borrow_mut().set_parent(Rc::clone(env));
        let body = std::mem::take(&mut lambda.body);
        eval_sexpr(&lambda.env, body)
    } else {
        // Partially applied: the remaining formals stay callable.
        Value::Fun(Fun::Lambda(Box::new(lambda)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builtins;
    use pretty_assertions::assert_eq;

    fn global() -> EnvRef {
        let env = Environment::new_ref();
        builtins::install(&env);
        env
    }

    fn sym(name: &str) -> Value {
        Value::Sym(name.into())
    }

    fn lambda_value(formals: &[&str], body: Vec<Value>) -> Value {
        let formals = formals.iter().map(|name| sym(name)).collect();
        Value::Fun(Fun::Lambda(Box::new(Lambda::new(formals, body))))
    }

    #[test]
    fn numbers_self_evaluate_idempotently() {
        let env = global();
        let once = eval(&env, Value::Num(42));
        let twice = eval(&env, once.clone());
        assert_eq!(once, Value::Num(42));
        assert_eq!(once, twice);
    }

    #[test]
    fn qexprs_and_strings_self_evaluate() {
        let env = global();
        let quoted = Value::Qexpr(vec![sym("head"), Value::Num(1)]);
        assert_eq!(eval(&env, quoted.clone()), quoted);
        assert_eq!(eval(&env, Value::Str("hi".into())), Value::Str("hi".into()));
    }

    #[test]
    fn symbols_resolve_through_the_environment() {
        let env = global();
        env.borrow_mut().put("x", Value::Num(5));
        assert_eq!(eval(&env, sym("x")), Value::Num(5));
        assert_eq!(eval(&env, sym("ghost")), Value::err("Unbound symbol: ghost"));
    }

    #[test]
    fn empty_sexpr_evaluates_to_itself() {
        let env = global();
        assert_eq!(eval(&env, Value::Sexpr(Vec::new())), Value::Sexpr(Vec::new()));
    }

    #[test]
    fn singleton_sexpr_unwraps() {
        let env = global();
        assert_eq!(
            eval(&env, Value::Sexpr(vec![Value::Num(7)])),
            Value::Num(7)
        );
    }

    #[test]
    fn head_must_be_a_function() {
        let env = global();
        let expr = Value::Sexpr(vec![Value::Num(1), Value::Num(2)]);
        assert_eq!(eval(&env, expr), Value::err("First element is not a function."));
    }

    #[test]
    fn first_error_wins() {
        let env = global();
        let expr = Value::Sexpr(vec![
            sym("+"),
            sym("missing"),
            Value::Sexpr(vec![sym("also-missing")]),
        ]);
        assert_eq!(eval(&env, expr), Value::err("Unbound symbol: missing"));
    }

    #[test]
    fn full_application_evaluates_the_body() {
        let env = global();
        let add = lambda_value(&["x", "y"], vec![sym("+"), sym("x"), sym("y")]);
        let expr = Value::Sexpr(vec![add, Value::Num(3), Value::Num(4)]);
        assert_eq!(eval(&env, expr), Value::Num(7));
    }

    #[test]
    fn partial_application_returns_a_callable() {
        let env = global();
        let add = lambda_value(&["x", "y"], vec![sym("+"), sym("x"), sym("y")]);

        let partial = eval(&env, Value::Sexpr(vec![add, Value::Num(3)]));
        assert!(matches!(partial, Value::Fun(Fun::Lambda(_))));

        let result = eval(&env, Value::Sexpr(vec![partial, Value::Num(4)]));
        assert_eq!(result, Value::Num(7));
    }

    #[test]
    fn too_many_arguments_reports_counts() {
        let env = global();
        let one = lambda_value(&["x"], vec![sym("x")]);
        let expr = Value::Sexpr(vec![one, Value::Num(1), Value::Num(2)]);
        assert_eq!(
            eval(&env, expr),
            Value::err("too many arguments, got 2, expected 1")
        );
    }

    #[test]
    fn variadic_rest_captures_a_qexpr() {
        let env = global();
        let spread = lambda_value(&["x", "&", "rest"], vec![sym("rest")]);
        let expr = Value::Sexpr(vec![spread, Value::Num(1), Value::Num(2), Value::Num(3)]);
        assert_eq!(
            eval(&env, expr),
            Value::Qexpr(vec![Value::Num(2), Value::Num(3)])
        );
    }

    #[test]
    fn variadic_rest_may_be_empty() {
        let env = global();
        let spread = lambda_value(&["x", "&", "rest"], vec![sym("rest")]);
        let expr = Value::Sexpr(vec![spread, Value::Num(1)]);
        assert_eq!(eval(&env, expr), Value::Qexpr(Vec::new()));
    }

    #[test]
    fn dangling_variadic_marker_is_a_format_error() {
        let env = global();
        let broken = lambda_value(&["x", "&"], vec![sym("x")]);
        let expr = Value::Sexpr(vec![broken, Value::Num(1)]);
        assert_eq!(
            eval(&env, expr),
            Value::err("Function format invalid. Symbol '&' not followed by single symbol.")
        );
    }

    #[test]
    fn free_variables_resolve_in_the_callers_scope() {
        // `probe` has a free `x`; when called from inside `outer`, whose own
        // scope binds x, the call-time parent chain reaches that binding.
        let env = global();
        let probe = lambda_value(&["ignored"], vec![sym("x")]);
        env.borrow_mut().put("probe", probe);

        let outer = lambda_value(&["x"], vec![sym("probe"), Value::Num(0)]);
        let expr = Value::Sexpr(vec![outer, Value::Num(42)]);
        assert_eq!(eval(&env, expr), Value::Num(42));
    }

    #[test]
    fn calls_do_not_share_binding_state() {
        let env = global();
        let identity = lambda_value(&["x"], vec![sym("x")]);
        env.borrow_mut().put("id", identity);

        let first = eval(&env, Value::Sexpr(vec![sym("id"), Value::Num(1)]));
        let second = eval(&env, Value::Sexpr(vec![sym("id"), Value::Num(2)]));
        assert_eq!(first, Value::Num(1));
        assert_eq!(second, Value::Num(2));
    }
}
