use crate::language::ast::Node;
use crate::runtime::value::Value;

/// Turns a parse-tree node into a runtime value. Delimiter and comment nodes
/// are skipped; the root collects its children into an S-expression so a
/// whole input line evaluates as one form.
pub fn read(node: &Node) -> Value {
    if node.has_tag("number") {
        return read_num(node);
    }
    if node.has_tag("symbol") {
        return Value::Sym(node.contents.clone());
    }
    if node.has_tag("string") {
        return Value::Str(unescape(&node.contents));
    }

    let mut cells = Vec::new();
    for child in &node.children {
        if matches!(child.contents.as_str(), "(" | ")" | "{" | "}") {
            continue;
        }
        if child.has_tag("comment") || child.has_tag("regex") {
            continue;
        }
        cells.push(read(child));
    }
    if node.has_tag("qexpr") {
        Value::Qexpr(cells)
    } else {
        Value::Sexpr(cells)
    }
}

fn read_num(node: &Node) -> Value {
    match node.contents.parse::<i64>() {
        Ok(n) => Value::Num(n),
        Err(_) => Value::err("Invalid number."),
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
