//! Rule text → [`Value`] tree.
//!
//! The grammar is a plain prefix S-expression. A rule must be a single
//! parenthesized call; literals, variables and nested calls appear only
//! as its elements. Parsing never evaluates.

use std::collections::BTreeSet;

use crate::error::ExprError;
use crate::lexer::{lex, Spanned, Token};
use crate::value::Value;

/// Parse a rule into its expression tree.
pub fn parse(src: &str) -> Result<Value, ExprError> {
    let tokens = lex(src)?;
    let first = tokens
        .first()
        .ok_or_else(|| ExprError::parse("empty expression"))?;
    if first.token != Token::LParen {
        return Err(ExprError::parse(format!(
            "expression must be a call, found {} at offset {}",
            describe(&first.token),
            first.offset
        )));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let root = parser.parse_value()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::parse(format!(
            "unexpected {} after expression at offset {}",
            describe(&extra.token),
            extra.offset
        )));
    }
    Ok(root)
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Str(_) => "string literal".to_string(),
        Token::Var(name) => format!("variable `{}`", name),
        Token::Word(w) => format!("'{}'", w),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_value(&mut self) -> Result<Value, ExprError> {
        let spanned = self
            .advance()
            .ok_or_else(|| ExprError::parse("unexpected end of input"))?;
        match spanned.token {
            Token::LParen => self.parse_call(spanned.offset),
            Token::LBracket => self.parse_set(spanned.offset),
            Token::RParen => Err(ExprError::parse(format!(
                "unbalanced ')' at offset {}",
                spanned.offset
            ))),
            Token::RBracket => Err(ExprError::parse(format!(
                "unbalanced ']' at offset {}",
                spanned.offset
            ))),
            Token::Str(s) => Ok(Value::Text(s)),
            Token::Var(name) => Ok(Value::Variable(name)),
            Token::Word(word) => word_value(&word, spanned.offset),
        }
    }

    /// Parses the remainder of a call; the opening paren is already consumed.
    fn parse_call(&mut self, open: usize) -> Result<Value, ExprError> {
        let mut items = Vec::new();
        loop {
            match self.peek().map(|s| &s.token) {
                None => {
                    return Err(ExprError::parse(format!(
                        "unbalanced parentheses: '(' at offset {} is never closed",
                        open
                    )));
                }
                Some(Token::RParen) => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.parse_value()?),
            }
        }
        if items.is_empty() {
            return Err(ExprError::parse(format!("empty call at offset {}", open)));
        }
        Ok(Value::Call(items))
    }

    fn parse_set(&mut self, open: usize) -> Result<Value, ExprError> {
        let mut members = BTreeSet::new();
        loop {
            let spanned = self.advance().ok_or_else(|| {
                ExprError::parse(format!(
                    "unterminated set literal: '[' at offset {} is never closed",
                    open
                ))
            })?;
            match spanned.token {
                Token::RBracket => break,
                Token::Str(s) => {
                    members.insert(s);
                }
                other => {
                    return Err(ExprError::parse(format!(
                        "set literals may only contain strings, found {} at offset {}",
                        describe(&other),
                        spanned.offset
                    )));
                }
            }
        }
        Ok(Value::Set(members))
    }
}

fn looks_numeric(word: &str) -> bool {
    let body = word
        .strip_prefix('-')
        .or_else(|| word.strip_prefix('+'))
        .unwrap_or(word);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn word_value(word: &str, offset: usize) -> Result<Value, ExprError> {
    match word {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "nil" => return Ok(Value::Nil),
        _ => {}
    }
    if looks_numeric(word) {
        return word
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number)
            .ok_or_else(|| {
                ExprError::parse(format!("invalid number '{}' at offset {}", word, offset))
            });
    }
    Ok(Value::Operator(word.to_string()))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> Value {
        Value::Operator(s.to_string())
    }

    #[test]
    fn parses_nested_call() {
        let v = parse(r#"(and (= `e.name` "OPEN") (> `c.age` 18))"#).unwrap();
        assert_eq!(
            v,
            Value::Call(vec![
                op("and"),
                Value::Call(vec![
                    op("="),
                    Value::Variable("e.name".into()),
                    Value::text("OPEN"),
                ]),
                Value::Call(vec![
                    op(">"),
                    Value::Variable("c.age".into()),
                    Value::Number(18.0),
                ]),
            ])
        );
    }

    #[test]
    fn parses_keywords_and_numbers() {
        let v = parse("(= true false nil -3 +2.5 .5 1e3)").unwrap();
        assert_eq!(
            v,
            Value::Call(vec![
                op("="),
                Value::Bool(true),
                Value::Bool(false),
                Value::Nil,
                Value::Number(-3.0),
                Value::Number(2.5),
                Value::Number(0.5),
                Value::Number(1000.0),
            ])
        );
    }

    #[test]
    fn lone_minus_is_an_operator() {
        assert_eq!(parse("(-)").unwrap(), Value::Call(vec![op("-")]));
    }

    #[test]
    fn set_literal_deduplicates() {
        let v = parse(r#"(contains "a" ["b" "a" "b"])"#).unwrap();
        assert_eq!(
            v,
            Value::Call(vec![op("contains"), Value::text("a"), Value::set(["a", "b"])])
        );
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        assert!(parse("(= 1 1").unwrap_err().is_parse_error());
        assert!(parse("(= 1 1))").unwrap_err().is_parse_error());
        assert!(parse(r#"(= ["a" 1)"#).unwrap_err().is_parse_error());
    }

    #[test]
    fn rejects_non_call_expressions() {
        assert!(parse("=").unwrap_err().is_parse_error());
        assert!(parse("true").unwrap_err().is_parse_error());
        assert!(parse(r#""text""#).unwrap_err().is_parse_error());
        assert!(parse("").unwrap_err().is_parse_error());
        assert!(parse("   ").unwrap_err().is_parse_error());
    }

    #[test]
    fn rejects_empty_call_and_bad_numbers() {
        assert!(parse("()").unwrap_err().is_parse_error());
        assert!(parse("(= 12abc 1)").unwrap_err().is_parse_error());
    }

    #[test]
    fn rejects_non_string_set_members() {
        let err = parse("(contains 1 [1 2])").unwrap_err();
        assert!(err.message.contains("only contain strings"));
    }

    #[test]
    fn display_round_trips_source() {
        let src = r#"(if (contains `t.colors` ["red"]) "yes" nil)"#;
        assert_eq!(parse(src).unwrap().to_string(), src);
    }
}
