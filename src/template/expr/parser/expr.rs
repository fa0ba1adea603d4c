//! Expression parsing (tokens + recursive descent parser).

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::literal::{scan_number, scan_string};
use crate::template::filters;
use crate::template::value::Value;

/// A syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
    /// Set when the error is a filter name missing from the registry.
    pub unknown_filter: Option<String>,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            unknown_filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Dot,
    Comma,
    Colon,
    Question,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Pipe,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Str(s) => format!("string '{s}'"),
            Token::Ident(name) => format!("identifier '{name}'"),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Question => "?",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::EqEq => "==",
            Token::EqEqEq => "===",
            Token::NotEq => "!=",
            Token::NotEqEq => "!==",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Pipe => "|",
            Token::Number(_) | Token::Str(_) | Token::Ident(_) => "",
        }
    }
}

/// Parse a full expression string into an AST.
///
/// Grammar, lowest precedence first:
///
/// ```text
/// chain       := ternary ("|" IDENT (":" ternary)*)*
/// ternary     := or ("?" ternary ":" ternary)?
/// or          := and ("||" and)*
/// and         := equality ("&&" equality)*
/// equality    := relational (("==" | "!=" | "===" | "!==") relational)*
/// relational  := additive (("<" | ">" | "<=" | ">=") additive)*
/// additive    := term (("+" | "-") term)*
/// term        := unary (("*" | "/" | "%") unary)*
/// unary       := ("!" | "-" | "+") unary | postfix
/// postfix     := primary ("." IDENT | "[" chain "]" | "(" args ")")*
/// primary     := NUMBER | STRING | IDENT | "(" chain ")" | "[" items "]" | "{" props "}"
/// ```
///
/// Assignment is rejected: expressions are read-only.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty expression"));
    }

    let mut parser = ExprParser {
        tokens,
        pos: 0,
        end: input.len(),
    };

    let expr = parser.parse_chain()?;

    // All tokens must be consumed for a valid expression.
    if let Some((token, offset)) = parser.tokens.get(parser.pos) {
        let message = if *token == Token::Assign {
            "assignment is not supported".to_string()
        } else {
            format!("unexpected {}", token.describe())
        };
        return Err(ParseError::new(*offset, message));
    }

    Ok(expr)
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < input.len() {
        let ch = match input[pos..].chars().next() {
            Some(c) => c,
            None => break,
        };

        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }

        let start = pos;

        if ch == '\'' || ch == '"' {
            let (text, end) = scan_string(input, pos)
                .ok_or_else(|| ParseError::new(start, "unterminated string literal"))?;
            tokens.push((Token::Str(text), start));
            pos = end;
            continue;
        }

        let next_is_digit = bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
        if ch.is_ascii_digit() || (ch == '.' && next_is_digit) {
            let (n, end) = scan_number(input, pos)
                .ok_or_else(|| ParseError::new(start, "malformed number literal"))?;
            tokens.push((Token::Number(n), start));
            pos = end;
            continue;
        }

        if is_ident_start(ch) {
            let mut end = pos;
            for c in input[pos..].chars() {
                if !is_ident_part(c) {
                    break;
                }
                end += c.len_utf8();
            }
            tokens.push((Token::Ident(input[pos..end].to_string()), start));
            pos = end;
            continue;
        }

        let rest = &input[pos..];
        let (token, len) = if rest.starts_with("===") {
            (Token::EqEqEq, 3)
        } else if rest.starts_with("!==") {
            (Token::NotEqEq, 3)
        } else if rest.starts_with("==") {
            (Token::EqEq, 2)
        } else if rest.starts_with("!=") {
            (Token::NotEq, 2)
        } else if rest.starts_with("<=") {
            (Token::Le, 2)
        } else if rest.starts_with(">=") {
            (Token::Ge, 2)
        } else if rest.starts_with("&&") {
            (Token::AndAnd, 2)
        } else if rest.starts_with("||") {
            (Token::OrOr, 2)
        } else {
            let token = match ch {
                '.' => Token::Dot,
                ',' => Token::Comma,
                ':' => Token::Colon,
                '?' => Token::Question,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '%' => Token::Percent,
                '!' => Token::Bang,
                '=' => Token::Assign,
                '<' => Token::Lt,
                '>' => Token::Gt,
                '|' => Token::Pipe,
                other => {
                    return Err(ParseError::new(start, format!("unexpected character '{other}'")));
                },
            };
            (token, 1)
        };
        tokens.push((token, start));
        pos += len;
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

struct ExprParser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, o)| *o).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            return Ok(());
        }
        Err(self.unexpected(&format!("expected '{}'", token.symbol())))
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match self.peek() {
            Some(Token::Assign) => ParseError::new(self.offset(), "assignment is not supported"),
            Some(token) => ParseError::new(
                self.offset(),
                format!("{context}, found {}", token.describe()),
            ),
            None => ParseError::new(self.end, format!("{context}, found end of expression")),
        }
    }

    fn parse_chain(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_ternary()?;

        while self.eat(&Token::Pipe) {
            let name_offset = self.offset();
            let name = match self.next() {
                Some(Token::Ident(name)) => name,
                _ => return Err(ParseError::new(name_offset, "expected filter name after '|'")),
            };
            if filters::lookup(&name).is_none() {
                let mut err = ParseError::new(name_offset, format!("unknown filter '{name}'"));
                err.unknown_filter = Some(name);
                return Err(err);
            }

            let mut args = Vec::new();
            while self.eat(&Token::Colon) {
                args.push(self.parse_ternary()?);
            }

            node = Expr::Filter {
                name,
                input: Box::new(node),
                args,
            };
        }

        Ok(node)
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_or()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_ternary()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_ternary()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Left-associative binary level: `next (op next)*`.
    fn parse_binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut node = next(self)?;

        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let rhs = next(self)?;
                    node = Expr::Binary {
                        op: *op,
                        left: Box::new(node),
                        right: Box::new(rhs),
                    };
                    continue 'outer;
                }
            }
            break;
        }

        Ok(node)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(Token::OrOr, BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(Token::AndAnd, BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (Token::EqEqEq, BinaryOp::StrictEq),
                (Token::NotEqEq, BinaryOp::StrictNe),
                (Token::EqEq, BinaryOp::Eq),
                (Token::NotEq, BinaryOp::Ne),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (Token::Le, BinaryOp::Le),
                (Token::Ge, BinaryOp::Ge),
                (Token::Lt, BinaryOp::Lt),
                (Token::Gt, BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.next();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.next();
                    let offset = self.offset();
                    match self.next() {
                        Some(Token::Ident(property)) => {
                            node = Expr::Member {
                                object: Box::new(node),
                                property,
                            };
                        },
                        _ => return Err(ParseError::new(offset, "expected property name after '.'")),
                    }
                },
                Some(Token::LBracket) => {
                    self.next();
                    let index = self.parse_chain()?;
                    self.expect(Token::RBracket)?;
                    node = Expr::Index {
                        object: Box::new(node),
                        index: Box::new(index),
                    };
                },
                Some(Token::LParen) => {
                    self.next();
                    let args = self.parse_list(Token::RParen)?;
                    node = Expr::Call {
                        callee: Box::new(node),
                        args,
                    };
                },
                _ => break,
            }
        }

        Ok(node)
    }

    /// Comma separated expressions up to `close`, which is consumed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_chain()?);
            if self.eat(&Token::Comma) {
                // Trailing comma before the closing token.
                if self.eat(&close) {
                    break;
                }
                continue;
            }
            self.expect(close)?;
            break;
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "undefined" => Expr::Literal(Value::Undefined),
                "this" => Expr::This,
                _ => Expr::Identifier(name),
            }),
            Some(Token::LParen) => {
                let expr = self.parse_chain()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            },
            Some(Token::LBracket) => Ok(Expr::Array(self.parse_list(Token::RBracket)?)),
            Some(Token::LBrace) => self.parse_object(),
            Some(Token::Assign) => Err(ParseError::new(offset, "assignment is not supported")),
            Some(token) => Err(ParseError::new(
                offset,
                format!("unexpected {}", token.describe()),
            )),
            None => Err(ParseError::new(self.end, "unexpected end of expression")),
        }
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let mut props = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Object(props));
        }
        loop {
            let offset = self.offset();
            let key = match self.next() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => name,
                Some(Token::Number(n)) => crate::template::value::format_number(n),
                _ => return Err(ParseError::new(offset, "expected object key")),
            };
            self.expect(Token::Colon)?;
            let value = self.parse_chain()?;
            props.push((key, value));
            if self.eat(&Token::Comma) {
                if self.eat(&Token::RBrace) {
                    break;
                }
                continue;
            }
            self.expect(Token::RBrace)?;
            break;
        }
        Ok(Expr::Object(props))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_chain_with_arguments() {
        let expr = parse_expression("people | orderBy:'name':'asc' | limit:3").unwrap();
        match expr {
            Expr::Filter { name, input, args } => {
                assert_eq!(name, "limit");
                assert_eq!(args.len(), 1);
                assert!(matches!(*input, Expr::Filter { ref name, ref args, .. } if name == "orderBy" && args.len() == 2));
            },
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn precedence_of_arithmetic_and_comparison() {
        let expr = parse_expression("1 + 2 * 3 === 7").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::StrictEq, .. }));
    }

    #[test]
    fn rejects_assignment() {
        let err = parse_expression("a = 1").unwrap_err();
        assert_eq!(err.message, "assignment is not supported");
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn rejects_unknown_filter() {
        let err = parse_expression("a | shout").unwrap_err();
        assert!(err.message.contains("unknown filter 'shout'"));
    }

    #[test]
    fn reports_unexpected_end() {
        let err = parse_expression("a +").unwrap_err();
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn parses_member_index_and_call() {
        let expr = parse_expression("$util.now.format('YYYY')").unwrap();
        assert!(matches!(expr, Expr::Call { .. }));
        let expr = parse_expression("items[0].name").unwrap();
        assert!(matches!(expr, Expr::Member { .. }));
    }

    #[test]
    fn parses_array_and_object_literals() {
        assert!(matches!(
            parse_expression("['a', 'b',]").unwrap(),
            Expr::Array(items) if items.len() == 2
        ));
        assert!(matches!(
            parse_expression("{a: 1, 'b': 2}").unwrap(),
            Expr::Object(props) if props.len() == 2
        ));
    }
}
