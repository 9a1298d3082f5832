//! AST shapes produced by the parser and consumed by the engine and the
//! WAT generator. Every node carries its source position for diagnostics.

use std::fmt::Write as _;

/// An argument slot that was either a bare integer or a symbolic atom.
///
/// `atom` is `Some` exactly when the surface syntax used an identifier;
/// `num` holds the resolved value for integers immediately, and a
/// placeholder (filled in by the engine after interning) for atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub num: i64,
    pub atom: Option<String>,
}

impl Arg {
    pub fn integer(n: i64) -> Self {
        Arg { num: n, atom: None }
    }

    pub fn atom(name: impl Into<String>) -> Self {
        Arg {
            num: 0,
            atom: Some(name.into()),
        }
    }

    pub fn wildcard() -> Self {
        Arg {
            num: -1,
            atom: None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.atom.is_none() && self.num == -1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyOp {
    /// `SCAN relation` or `SCAN relation MATCH $m`.
    Scan {
        relation: String,
        match_var: Option<u32>,
        pos: Pos,
    },
    /// `JOIN relation $m`.
    Join {
        relation: String,
        match_var: u32,
        pos: Pos,
    },
}

impl BodyOp {
    pub fn relation(&self) -> &str {
        match self {
            BodyOp::Scan { relation, .. } | BodyOp::Join { relation, .. } => relation,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            BodyOp::Scan { pos, .. } | BodyOp::Join { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emit {
    pub relation: String,
    pub var_a: u32,
    pub var_b: u32,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    RelDecl {
        name: String,
        pos: Pos,
    },
    Fact {
        relation: String,
        a: Arg,
        b: Arg,
        pos: Pos,
    },
    Rule {
        target: String,
        body: Vec<BodyOp>,
        emit: Emit,
        pos: Pos,
    },
    Solve {
        pos: Pos,
    },
    Query {
        relation: String,
        a: Arg,
        b: Arg,
        pos: Pos,
    },
}

impl Statement {
    pub fn pos(&self) -> Pos {
        match self {
            Statement::RelDecl { pos, .. }
            | Statement::Fact { pos, .. }
            | Statement::Rule { pos, .. }
            | Statement::Solve { pos }
            | Statement::Query { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }

    pub fn rel_decls(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|s| match s {
            Statement::RelDecl { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn facts(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::Fact { .. }))
    }

    pub fn rules(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::Rule { .. }))
    }

    pub fn queries(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|s| matches!(s, Statement::Query { .. }))
    }

    pub fn has_solve(&self) -> bool {
        self.statements.iter().any(|s| matches!(s, Statement::Solve { .. }))
    }
}

fn write_arg(out: &mut String, arg: &Arg, wildcard_allowed: bool) {
    if wildcard_allowed && arg.is_wildcard() {
        out.push('?');
    } else if let Some(atom) = &arg.atom {
        out.push_str(atom);
    } else {
        let _ = write!(out, "{}", arg.num);
    }
}

/// Renders a program back to ByteLog surface syntax, one statement per
/// line. `parse(pretty_print(p))` reproduces `p` up to source positions,
/// which the printer cannot recover and the parser reassigns on re-parse.
pub fn pretty_print(program: &Program) -> String {
    let mut out = String::new();
    for stmt in &program.statements {
        match stmt {
            Statement::RelDecl { name, .. } => {
                let _ = writeln!(out, "REL {name}");
            }
            Statement::Fact { relation, a, b, .. } => {
                out.push_str("FACT ");
                out.push_str(relation);
                out.push(' ');
                write_arg(&mut out, a, false);
                out.push(' ');
                write_arg(&mut out, b, false);
                out.push('\n');
            }
            Statement::Rule {
                target, body, emit, ..
            } => {
                let _ = write!(out, "RULE {target}:");
                for op in body {
                    match op {
                        BodyOp::Scan {
                            relation,
                            match_var,
                            ..
                        } => match match_var {
                            Some(m) => {
                                let _ = write!(out, " SCAN {relation} MATCH ${m},");
                            }
                            None => {
                                let _ = write!(out, " SCAN {relation},");
                            }
                        },
                        BodyOp::Join {
                            relation,
                            match_var,
                            ..
                        } => {
                            let _ = write!(out, " JOIN {relation} ${match_var},");
                        }
                    }
                }
                let _ = writeln!(
                    out,
                    " EMIT {} ${} ${}",
                    emit.relation, emit.var_a, emit.var_b
                );
            }
            Statement::Solve { .. } => {
                out.push_str("SOLVE\n");
            }
            Statement::Query { relation, a, b, .. } => {
                out.push_str("QUERY ");
                out.push_str(relation);
                out.push(' ');
                write_arg(&mut out, a, true);
                out.push(' ');
                write_arg(&mut out, b, true);
                out.push('\n');
            }
        }
    }
    out
}
