//! Recursive-descent parser for the path-query mini-language (`§4.1`).
//!
//! Grounded on `json-joy-json-path/src/JsonPathParser.rs`'s facade shape
//! (a `parse`/`parse_strict` pair) and `parser.rs`'s scanner-driven style,
//! adapted to this crate's slash-separated grammar instead of upstream
//! JSONPath's dot-separated one.

use super::ast::{CmpOp, FilterExpr, Literal, Op, Operand, Path, RelStep};
use super::tokenizer::Scanner;
use crate::error::{Error, ErrorKind};

/// Parse a path string into a compiled operation list.
///
/// A leading `/` is optional and semantically identical to its absence.
pub fn parse(input: &str) -> Result<Path, Error> {
    let mut s = Scanner::new(input);
    s.ws();
    if s.is("/") && !s.is("//") {
        s.skip(1);
    }

    let mut ops = Vec::new();
    if s.eof() {
        return Ok(ops);
    }

    loop {
        let recursive = consume_separator(&mut s)?;
        if s.eof() {
            return Err(parse_err("path ends with a trailing separator", s.pos()));
        }
        let mut step_ops = parse_step(&mut s)?;
        if recursive {
            if step_ops.is_empty() {
                return Err(parse_err("`//` must be followed by a step", s.pos()));
            }
            let target = step_ops.remove(0);
            ops.push(Op::RecursiveDescent(Box::new(target)));
            ops.extend(step_ops);
        } else {
            ops.extend(step_ops);
        }

        if s.eof() {
            break;
        }
        if !s.is("/") {
            return Err(parse_err("expected `/` between steps", s.pos()));
        }
    }

    Ok(ops)
}

/// Consumes the separator before a step, returning whether it denotes a
/// recursive-descent step (`//`).
fn consume_separator(s: &mut Scanner) -> Result<bool, Error> {
    if s.is("//") {
        s.skip(2);
        Ok(true)
    } else if s.is("/") {
        s.skip(1);
        Ok(false)
    } else {
        // First step in a path with no leading slash.
        Ok(false)
    }
}

fn parse_step(s: &mut Scanner) -> Result<Vec<Op>, Error> {
    if s.is("..") {
        s.skip(2);
        return Ok(vec![Op::Parent]);
    }
    if s.is("*") {
        s.skip(1);
        return Ok(vec![Op::Wildcard]);
    }
    if s.peek_char() == Some('[') {
        let mut ops = vec![parse_bracket_group(s)?];
        while s.peek_char() == Some('[') {
            ops.push(parse_bracket_group(s)?);
        }
        return Ok(ops);
    }

    let key = parse_ident(s)?;
    let mut ops = vec![Op::GetKey(key)];
    while s.peek_char() == Some('[') {
        ops.push(parse_bracket_group(s)?);
    }
    Ok(ops)
}

fn parse_ident(s: &mut Scanner) -> Result<String, Error> {
    let ident = s.take_while(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if ident.is_empty() {
        return Err(parse_err("expected a key", s.pos()));
    }
    Ok(ident)
}

fn parse_bracket_group(s: &mut Scanner) -> Result<Op, Error> {
    s.expect("[").map_err(|m| parse_err(&m, s.pos()))?;
    s.ws();
    match s.peek_char() {
        Some('\'') | Some('"') => {
            let key = parse_quoted_string(s)?;
            s.ws();
            s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
            Ok(Op::GetKey(key))
        }
        Some('*') => {
            s.skip(1);
            s.ws();
            s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
            Ok(Op::Wildcard)
        }
        Some('@') => {
            s.skip(1);
            let name = parse_ident(s)?;
            s.ws();
            s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
            Ok(Op::CallFunc(name))
        }
        Some('?') => {
            s.skip(1);
            s.ws();
            s.expect("(").map_err(|m| parse_err(&m, s.pos()))?;
            let expr = parse_or_expr(s)?;
            s.ws();
            s.expect(")").map_err(|m| parse_err(&m, s.pos()))?;
            s.ws();
            s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
            Ok(Op::Filter(expr))
        }
        _ => {
            let lo = parse_opt_int(s);
            s.ws();
            if s.peek_char() == Some(':') {
                s.skip(1);
                s.ws();
                let hi = parse_opt_int(s);
                s.ws();
                s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
                Ok(Op::Slice(lo, hi))
            } else {
                s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
                match lo {
                    Some(i) => Ok(Op::IndexAt(i)),
                    None => Err(parse_err("empty brackets", s.pos())),
                }
            }
        }
    }
}

fn parse_opt_int(s: &mut Scanner) -> Option<i64> {
    let start = s.pos();
    let neg = if s.peek_char() == Some('-') {
        s.skip(1);
        true
    } else {
        false
    };
    let digits = s.take_while(|c| c.is_ascii_digit());
    if digits.is_empty() {
        s.seek(start);
        return None;
    }
    let value: i64 = digits.parse().unwrap_or(0);
    Some(if neg { -value } else { value })
}

fn parse_quoted_string(s: &mut Scanner) -> Result<String, Error> {
    let quote = s.peek_char().unwrap();
    s.skip(1);
    let mut out = String::new();
    loop {
        match s.peek_char() {
            None => return Err(parse_err("unterminated quoted key", s.pos())),
            Some(c) if c == quote => {
                s.skip(1);
                break;
            }
            Some('\\') => {
                s.skip(1);
                match s.peek_char() {
                    Some(c) => {
                        out.push(c);
                        s.skip(1);
                    }
                    None => return Err(parse_err("unterminated quoted key", s.pos())),
                }
            }
            Some(c) => {
                out.push(c);
                s.skip(1);
            }
        }
    }
    Ok(out)
}

fn parse_or_expr(s: &mut Scanner) -> Result<FilterExpr, Error> {
    let mut left = parse_and_expr(s)?;
    loop {
        s.ws();
        if s.is("||") {
            s.skip(2);
            s.ws();
            let right = parse_and_expr(s)?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_and_expr(s: &mut Scanner) -> Result<FilterExpr, Error> {
    let mut left = parse_not_expr(s)?;
    loop {
        s.ws();
        if s.is("&&") {
            s.skip(2);
            s.ws();
            let right = parse_not_expr(s)?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        } else {
            break;
        }
    }
    Ok(left)
}

fn parse_not_expr(s: &mut Scanner) -> Result<FilterExpr, Error> {
    s.ws();
    if s.peek_char() == Some('!') {
        s.skip(1);
        s.ws();
        return Ok(FilterExpr::Not(Box::new(parse_not_expr(s)?)));
    }
    parse_cmp_expr(s)
}

fn parse_cmp_expr(s: &mut Scanner) -> Result<FilterExpr, Error> {
    s.ws();
    let left = parse_operand(s)?;
    s.ws();
    let op = if s.is("==") {
        Some(CmpOp::Eq)
    } else if s.is("!=") {
        Some(CmpOp::Ne)
    } else if s.is("<=") {
        Some(CmpOp::Le)
    } else if s.is(">=") {
        Some(CmpOp::Ge)
    } else if s.is("<") {
        Some(CmpOp::Lt)
    } else if s.is(">") {
        Some(CmpOp::Gt)
    } else {
        None
    };
    match op {
        None => Ok(FilterExpr::Cmp(left, None)),
        Some(op) => {
            s.skip(match op {
                CmpOp::Eq | CmpOp::Ne | CmpOp::Le | CmpOp::Ge => 2,
                CmpOp::Lt | CmpOp::Gt => 1,
            });
            s.ws();
            let right = parse_operand(s)?;
            Ok(FilterExpr::Cmp(left, Some((op, right))))
        }
    }
}

fn parse_operand(s: &mut Scanner) -> Result<Operand, Error> {
    s.ws();
    if s.peek_char() == Some('@') {
        s.skip(1);
        let mut steps = Vec::new();
        loop {
            if s.peek_char() == Some('.') {
                s.skip(1);
                steps.push(RelStep::Key(parse_ident(s)?));
            } else if s.peek_char() == Some('[') {
                s.skip(1);
                s.ws();
                let idx = parse_opt_int(s).ok_or_else(|| {
                    parse_err("expected an integer index in `@[...]`", s.pos())
                })?;
                s.ws();
                s.expect("]").map_err(|m| parse_err(&m, s.pos()))?;
                steps.push(RelStep::Index(idx));
            } else {
                break;
            }
        }
        return Ok(Operand::Current(steps));
    }

    if s.is("true") {
        s.skip(4);
        return Ok(Operand::Literal(Literal::Bool(true)));
    }
    if s.is("false") {
        s.skip(5);
        return Ok(Operand::Literal(Literal::Bool(false)));
    }
    if s.is("null") {
        s.skip(4);
        return Ok(Operand::Literal(Literal::Null));
    }
    if matches!(s.peek_char(), Some('\'')) {
        let str_ = parse_single_quoted(s)?;
        return Ok(Operand::Literal(Literal::String(str_)));
    }
    if matches!(s.peek_char(), Some(c) if c.is_ascii_digit() || c == '-') {
        let num = parse_number(s)?;
        return Ok(Operand::Literal(Literal::Number(num)));
    }

    Err(parse_err("expected an operand", s.pos()))
}

fn parse_single_quoted(s: &mut Scanner) -> Result<String, Error> {
    parse_quoted_string(s)
}

fn parse_number(s: &mut Scanner) -> Result<f64, Error> {
    let start_pos = s.pos();
    let mut text = String::new();
    if s.peek_char() == Some('-') {
        text.push('-');
        s.skip(1);
    }
    text.push_str(&s.take_while(|c| c.is_ascii_digit()));
    if s.peek_char() == Some('.') {
        text.push('.');
        s.skip(1);
        text.push_str(&s.take_while(|c| c.is_ascii_digit()));
    }
    if matches!(s.peek_char(), Some('e') | Some('E')) {
        text.push(s.peek_char().unwrap());
        s.skip(1);
        if matches!(s.peek_char(), Some('+') | Some('-')) {
            text.push(s.peek_char().unwrap());
            s.skip(1);
        }
        text.push_str(&s.take_while(|c| c.is_ascii_digit()));
    }
    text.parse::<f64>()
        .map_err(|_| parse_err("invalid number literal", start_pos))
}

fn parse_err(message: &str, pos: usize) -> Error {
    Error::new(ErrorKind::ParseError(format!("{message} (col {pos})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_keys() {
        let ops = parse("/store/books").unwrap();
        assert_eq!(
            ops,
            vec![Op::GetKey("store".into()), Op::GetKey("books".into())]
        );
    }

    #[test]
    fn leading_slash_is_optional() {
        assert_eq!(parse("a/b").unwrap(), parse("/a/b").unwrap());
    }

    #[test]
    fn parses_index_and_slice() {
        assert_eq!(parse("/xs[2]").unwrap(), vec![Op::GetKey("xs".into()), Op::IndexAt(2)]);
        assert_eq!(
            parse("/xs[-2:]").unwrap(),
            vec![Op::GetKey("xs".into()), Op::Slice(Some(-2), None)]
        );
        assert_eq!(
            parse("/xs[:-2]").unwrap(),
            vec![Op::GetKey("xs".into()), Op::Slice(None, Some(-2))]
        );
    }

    #[test]
    fn parses_wildcard_and_parent() {
        assert_eq!(parse("/a/*").unwrap(), vec![Op::GetKey("a".into()), Op::Wildcard]);
        assert_eq!(
            parse("/a/..").unwrap(),
            vec![Op::GetKey("a".into()), Op::Parent]
        );
    }

    #[test]
    fn parses_recursive_descent() {
        let ops = parse("//price").unwrap();
        assert_eq!(ops, vec![Op::RecursiveDescent(Box::new(Op::GetKey("price".into())))]);
    }

    #[test]
    fn parses_quoted_key() {
        assert_eq!(
            parse("/['a b']").unwrap(),
            vec![Op::GetKey("a b".into())]
        );
    }

    #[test]
    fn parses_path_function_call() {
        assert_eq!(
            parse("/store/books[@cheap]/title").unwrap(),
            vec![
                Op::GetKey("store".into()),
                Op::GetKey("books".into()),
                Op::CallFunc("cheap".into()),
                Op::GetKey("title".into()),
            ]
        );
    }

    #[test]
    fn parses_filter_predicate() {
        let ops = parse("/p[?(@.price < 20 && @.inStock == true)]").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], Op::GetKey("p".into()));
        match &ops[1] {
            Op::Filter(FilterExpr::And(l, r)) => {
                assert!(matches!(**l, FilterExpr::Cmp(_, Some((CmpOp::Lt, _)))));
                assert!(matches!(**r, FilterExpr::Cmp(_, Some((CmpOp::Eq, _)))));
            }
            other => panic!("unexpected filter ast: {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_separator() {
        assert!(parse("/a/").is_err());
    }

    #[test]
    fn rejects_unterminated_bracket() {
        assert!(parse("/a[0").is_err());
    }
}
