use crate::language::{
    ast::{Node, ROOT_TAG},
    errors::SyntaxError,
    span::Span,
};
use nom::{
    branch::alt,
    bytes::complete::{escaped, take_while1},
    character::complete::{char, digit1, multispace0, none_of, not_line_ending, one_of},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser as NomParser,
};

/// Parses a whole source text into a root node whose children are the
/// top-level expressions. The failure span points at the first byte the
/// grammar could not consume.
pub fn parse(source: &str) -> Result<Node, SyntaxError> {
    let result: IResult<&str, Vec<Node>> =
        all_consuming(terminated(many0(expr), multispace0)).parse(source);
    match result {
        Ok((_, children)) => Ok(Node::branch(ROOT_TAG, children)),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => {
            let offset = source.len() - err.input.len();
            let end = (offset + 1).min(source.len());
            Err(SyntaxError::new("Unexpected input", Span::new(offset, end))
                .with_label("parsing stopped here")
                .with_help(
                    "expected a number, symbol, string, comment, \
                     S-expression `(...)` or Q-expression `{...}`",
                ))
        }
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::new(
            "Unexpected end of input",
            Span::new(source.len(), source.len()),
        )),
    }
}

fn expr(input: &str) -> IResult<&str, Node> {
    preceded(
        multispace0,
        alt((number, string, comment, symbol, sexpr, qexpr)),
    )
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Node> {
    map(recognize(pair(opt(char('-')), digit1)), |text: &str| {
        Node::leaf("expr|number", text)
    })
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, Node> {
    map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || "_+-*/\\=<>!&%^|?".contains(c)),
        |text: &str| Node::leaf("expr|symbol", text),
    )
    .parse(input)
}

// Contents keep their escape sequences; the reader unescapes them.
fn string(input: &str) -> IResult<&str, Node> {
    map(
        delimited(
            char('"'),
            escaped(none_of("\\\""), '\\', one_of("nrt0\\\"")),
            char('"'),
        ),
        |text: &str| Node::leaf("expr|string", text),
    )
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, Node> {
    map(preceded(char(';'), not_line_ending), |text: &str| {
        Node::leaf("comment", text)
    })
    .parse(input)
}

fn sexpr(input: &str) -> IResult<&str, Node> {
    map(
        delimited(char('('), many0(expr), preceded(multispace0, char(')'))),
        |children| Node::branch("expr|sexpr", children),
    )
    .parse(input)
}

fn qexpr(input: &str) -> IResult<&str, Node> {
    map(
        delimited(char('{'), many0(expr), preceded(multispace0, char('}'))),
        |children| Node::branch("expr|qexpr", children),
    )
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn children(source: &str) -> Vec<Node> {
        parse(source).expect("parse").children
    }

    #[test]
    fn parses_numbers_and_symbols() {
        let nodes = children("+ 1 -42 foo");
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], Node::leaf("expr|symbol", "+"));
        assert_eq!(nodes[1], Node::leaf("expr|number", "1"));
        assert_eq!(nodes[2], Node::leaf("expr|number", "-42"));
        assert_eq!(nodes[3], Node::leaf("expr|symbol", "foo"));
    }

    #[test]
    fn lone_minus_is_a_symbol() {
        let nodes = children("-");
        assert_eq!(nodes, vec![Node::leaf("expr|symbol", "-")]);
    }

    #[test]
    fn parses_nested_lists() {
        let nodes = children("(+ 1 (head {a b}))");
        assert_eq!(nodes.len(), 1);
        let outer = &nodes[0];
        assert!(outer.has_tag("sexpr"));
        assert_eq!(outer.children.len(), 3);
        let inner = &outer.children[2];
        assert!(inner.has_tag("sexpr"));
        assert!(inner.children[1].has_tag("qexpr"));
        assert_eq!(inner.children[1].children.len(), 2);
    }

    #[test]
    fn string_contents_keep_escapes() {
        let nodes = children(r#""line\none""#);
        assert_eq!(nodes, vec![Node::leaf("expr|string", r"line\none")]);
    }

    #[test]
    fn empty_string_literal() {
        let nodes = children(r#""""#);
        assert_eq!(nodes, vec![Node::leaf("expr|string", "")]);
    }

    #[test]
    fn comments_become_comment_nodes() {
        let nodes = children("1 ; the rest is ignored\n2");
        assert_eq!(nodes.len(), 3);
        assert!(nodes[1].has_tag("comment"));
        assert_eq!(nodes[2], Node::leaf("expr|number", "2"));
    }

    #[test]
    fn whitespace_only_input_is_an_empty_root() {
        let root = parse("  \n\t ").expect("parse");
        assert!(root.is_root());
        assert!(root.children.is_empty());
    }

    #[test]
    fn unbalanced_paren_reports_offset() {
        let err = parse("(+ 1 2").expect_err("should fail");
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn stray_close_brace_reports_offset() {
        let err = parse("1 2 }").expect_err("should fail");
        assert_eq!(err.span.start, 4);
    }
}
