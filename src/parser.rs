//! Recursive-descent parser: token stream to [`Program`].
//!
//! Register allocation for a rule body is a purely positional function of
//! operation order (see module docs on [`crate::engine`]), so the parser
//! validates `MATCH`/`JOIN`/`EMIT` variable references against that
//! allocation as each rule is built — these are static semantic errors,
//! reported at rule-definition time rather than deferred to execution.

use crate::ast::{Arg, BodyOp, Emit, Pos, Program, Statement};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = Self::lex_one(&mut lexer)?;
        Ok(Parser { lexer, current })
    }

    fn lex_one(lexer: &mut Lexer<'a>) -> Result<Token, ParseError> {
        lexer.next_token().map_err(|e| {
            let (line, column) = match &e {
                crate::error::LexError::UnexpectedChar { line, column, .. }
                | crate::error::LexError::BareDollar { line, column } => (*line, *column),
            };
            // LexError's Display already includes "at line L, column C: ", so
            // only the description after the first ": " is kept here.
            let full = e.to_string();
            let message = match full.splitn(2, ": ").nth(1) {
                Some(rest) => rest.to_string(),
                None => full.clone(),
            };
            ParseError::new(message, line, column)
        })
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = Self::lex_one(&mut self.lexer)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.current.kind == kind {
            self.bump()
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current.line, self.current.column)
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        if self.current.kind != TokenKind::Identifier {
            return Err(self.error(format!("expected {what}")));
        }
        let tok = self.bump()?;
        Ok(tok.lexeme.expect("identifier token carries a lexeme"))
    }

    fn expect_variable(&mut self, what: &str) -> Result<u32, ParseError> {
        if self.current.kind != TokenKind::Variable {
            return Err(self.error(format!("expected {what}")));
        }
        let tok = self.bump()?;
        Ok(tok.number.expect("variable token carries a payload") as u32)
    }

    fn parse_arg(&mut self, allow_wildcard: bool) -> Result<Arg, ParseError> {
        match self.current.kind {
            TokenKind::Identifier => {
                let name = self.expect_identifier("an identifier or integer")?;
                Ok(Arg::atom(name))
            }
            TokenKind::Integer => {
                let tok = self.bump()?;
                Ok(Arg::integer(tok.number.expect("integer token carries a payload")))
            }
            TokenKind::Wildcard if allow_wildcard => {
                self.bump()?;
                Ok(Arg::wildcard())
            }
            _ => Err(self.error(if allow_wildcard {
                "expected an identifier, integer, or '?'".to_string()
            } else {
                "expected an identifier or integer".to_string()
            })),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while self.current.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current.kind {
            TokenKind::Rel => self.parse_rel(),
            TokenKind::Fact => self.parse_fact(),
            TokenKind::Rule => self.parse_rule(),
            TokenKind::Solve => self.parse_solve(),
            TokenKind::Query => self.parse_query(),
            _ => Err(self.error("expected REL, FACT, RULE, SOLVE, or QUERY")),
        }
    }

    fn parse_rel(&mut self) -> Result<Statement, ParseError> {
        let pos = self.here();
        self.bump()?; // REL
        let name = self.expect_identifier("a relation name")?;
        Ok(Statement::RelDecl { name, pos })
    }

    fn parse_fact(&mut self) -> Result<Statement, ParseError> {
        let pos = self.here();
        self.bump()?; // FACT
        let relation = self.expect_identifier("a relation name")?;
        let a = self.parse_arg(false)?;
        let b = self.parse_arg(false)?;
        Ok(Statement::Fact {
            relation,
            a,
            b,
            pos,
        })
    }

    fn parse_solve(&mut self) -> Result<Statement, ParseError> {
        let pos = self.here();
        self.bump()?; // SOLVE
        Ok(Statement::Solve { pos })
    }

    fn parse_query(&mut self) -> Result<Statement, ParseError> {
        let pos = self.here();
        self.bump()?; // QUERY
        let relation = self.expect_identifier("a relation name")?;
        let a = self.parse_arg(true)?;
        let b = self.parse_arg(true)?;
        Ok(Statement::Query {
            relation,
            a,
            b,
            pos,
        })
    }

    fn parse_rule(&mut self) -> Result<Statement, ParseError> {
        let pos = self.here();
        self.bump()?; // RULE
        let target = self.expect_identifier("a rule target relation")?;
        self.expect(TokenKind::Colon, "':'")?;

        let mut body = Vec::new();
        let mut next_register: u32 = 0;
        let mut bound: Vec<u32> = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::Scan => {
                    let op_pos = self.here();
                    self.bump()?;
                    let relation = self.expect_identifier("a relation name")?;
                    let match_var = if self.current.kind == TokenKind::Match {
                        self.bump()?;
                        let m = self.expect_variable("a variable")?;
                        if !bound.contains(&m) {
                            return Err(ParseError::new(
                                format!("MATCH references unbound variable ${m}"),
                                op_pos.line,
                                op_pos.column,
                            ));
                        }
                        Some(m)
                    } else {
                        None
                    };

                    if match_var.is_none() {
                        bound.push(next_register);
                        bound.push(next_register + 1);
                        next_register += 2;
                    } else {
                        bound.push(next_register);
                        next_register += 1;
                    }

                    body.push(BodyOp::Scan {
                        relation,
                        match_var,
                        pos: op_pos,
                    });
                }
                TokenKind::Join => {
                    let op_pos = self.here();
                    if body.is_empty() {
                        return Err(ParseError::new(
                            "rule body must start with SCAN, not JOIN",
                            op_pos.line,
                            op_pos.column,
                        ));
                    }
                    self.bump()?;
                    let relation = self.expect_identifier("a relation name")?;
                    let match_var = self.expect_variable("a variable")?;
                    if !bound.contains(&match_var) {
                        return Err(ParseError::new(
                            format!("JOIN references unbound variable ${match_var}"),
                            op_pos.line,
                            op_pos.column,
                        ));
                    }
                    bound.push(next_register);
                    next_register += 1;

                    body.push(BodyOp::Join {
                        relation,
                        match_var,
                        pos: op_pos,
                    });
                }
                TokenKind::Emit => break,
                _ => return Err(self.error("expected SCAN, JOIN, or EMIT")),
            }

            self.expect(TokenKind::Comma, "','")?;
        }

        if body.is_empty() {
            return Err(self.error("rule body must contain at least one SCAN"));
        }

        let emit_pos = self.here();
        self.bump()?; // EMIT
        let emit_relation = self.expect_identifier("an EMIT target relation")?;
        let var_a = self.expect_variable("a variable")?;
        if !bound.contains(&var_a) {
            return Err(ParseError::new(
                format!("EMIT references unbound variable ${var_a}"),
                emit_pos.line,
                emit_pos.column,
            ));
        }
        let var_b = self.expect_variable("a variable")?;
        if !bound.contains(&var_b) {
            return Err(ParseError::new(
                format!("EMIT references unbound variable ${var_b}"),
                emit_pos.line,
                emit_pos.column,
            ));
        }

        Ok(Statement::Rule {
            target,
            body,
            emit: Emit {
                relation: emit_relation,
                var_a,
                var_b,
                pos: emit_pos,
            },
            pos,
        })
    }

    fn here(&self) -> Pos {
        Pos {
            line: self.current.line,
            column: self.current.column,
        }
    }
}

/// Parses a complete ByteLog program, failing fast on the first error.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arg;

    #[test]
    fn empty_source_parses_to_empty_program() {
        let program = parse_program("").unwrap();
        assert!(program.statements.is_empty());
    }

    #[test]
    fn comments_only_parses_to_empty_program() {
        let program = parse_program("; nothing here\n// also nothing\n").unwrap();
        assert!(program.statements.is_empty());
    }

    #[test]
    fn parses_rel_fact_query() {
        let program =
            parse_program("REL parent\nFACT parent alice bob\nQUERY parent alice bob\n").unwrap();
        assert_eq!(program.statements.len(), 3);
        match &program.statements[1] {
            Statement::Fact { relation, a, b, .. } => {
                assert_eq!(relation, "parent");
                assert_eq!(*a, Arg::atom("alice"));
                assert_eq!(*b, Arg::atom("bob"));
            }
            other => panic!("expected Fact, got {other:?}"),
        }
    }

    #[test]
    fn parses_transitive_closure_rule() {
        let src = "RULE anc: SCAN parent, JOIN anc $1, EMIT anc $0 $2\n";
        let program = parse_program(src).unwrap();
        match &program.statements[0] {
            Statement::Rule { target, body, emit, .. } => {
                assert_eq!(target, "anc");
                assert_eq!(body.len(), 2);
                assert_eq!(emit.var_a, 0);
                assert_eq!(emit.var_b, 2);
            }
            other => panic!("expected Rule, got {other:?}"),
        }
    }

    #[test]
    fn rule_with_match_binds_one_register() {
        let src = "RULE r: SCAN parent, SCAN child MATCH $1, EMIT r $0 $2\n";
        let program = parse_program(src).unwrap();
        match &program.statements[0] {
            Statement::Rule { body, .. } => {
                assert!(matches!(body[1], BodyOp::Scan { match_var: Some(1), .. }));
            }
            other => panic!("expected Rule, got {other:?}"),
        }
    }

    #[test]
    fn query_wildcard_sets_sentinel() {
        let program = parse_program("QUERY r alice ?\n").unwrap();
        match &program.statements[0] {
            Statement::Query { b, .. } => assert!(b.is_wildcard()),
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_not_allowed_in_fact() {
        let err = parse_program("FACT r alice ?\n").unwrap_err();
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn rule_body_must_start_with_scan() {
        let err = parse_program("RULE r: JOIN parent $0, EMIT r $0 $1\n").unwrap_err();
        assert!(err.message.contains("SCAN"));
    }

    #[test]
    fn emit_unbound_variable_is_error() {
        let err = parse_program("RULE r: SCAN parent, EMIT r $0 $9\n").unwrap_err();
        assert!(err.message.contains("unbound variable"));
    }

    #[test]
    fn rule_without_emit_is_incomplete() {
        let err = parse_program("RULE r: SCAN parent\n").unwrap_err();
        assert!(err.message.contains("SCAN, JOIN, or EMIT"));
    }

    #[test]
    fn error_message_matches_single_line_form() {
        let err = parse_program("QUERY r alice\n").unwrap_err();
        let rendered = format!(
            "at line {}, column {}: {}",
            err.line, err.column, err.message
        );
        assert!(rendered.starts_with("at line"));
    }
}
