//! The execution engine: owns the atom table and fact DB, loads facts,
//! drives the rules to their semi-naive fixpoint, and resolves queries.
//!
//! Register allocation for a rule body is purely positional (see
//! [`crate::parser`], which already validated that every `MATCH`/`JOIN`/
//! `EMIT` reference points at an earlier register) — so at evaluation
//! time the engine only needs to track how many registers have been
//! bound so far, not which ones.

use std::collections::HashSet;

use crate::ast::{Arg, BodyOp, Emit, Pos, Program, Statement};
use crate::atom_table::AtomTable;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fact_db::FactDb;

/// The materialized answer to a `QUERY`, shaped by which columns were
/// concrete vs. wildcard (see the resolver table in the spec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Both columns concrete: did the triple exist?
    Membership(bool),
    /// One column concrete, the other a wildcard: matching values of the
    /// free column, in fact-DB insertion order.
    Column(Vec<i64>),
    /// Both columns wildcard: the whole relation, in insertion order.
    Pairs(Vec<(i64, i64)>),
}

pub struct Engine {
    atoms: AtomTable,
    db: FactDb,
    config: EngineConfig,
    declared: HashSet<String>,
    last_error: Option<String>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            atoms: AtomTable::new(),
            db: FactDb::new(),
            config,
            declared: HashSet::new(),
            last_error: None,
        }
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn db(&self) -> &FactDb {
        &self.db
    }

    /// The last fatal error surfaced by [`Engine::run`], if any.
    pub fn get_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn resolve_arg(&mut self, arg: &Arg) -> i64 {
        match &arg.atom {
            Some(name) => self.atoms.intern(name) as i64,
            None => arg.num,
        }
    }

    /// Interns every relation name and fact tuple in the program. Relation
    /// names referenced anywhere (decls, facts, rule bodies, emits,
    /// queries) end up interned before this returns.
    pub fn load(&mut self, program: &Program) -> Result<(), EngineError> {
        for name in program.rel_decls() {
            self.atoms.intern(name);
            self.declared.insert(name.to_string());
        }

        for stmt in program.facts() {
            if let Statement::Fact { relation, a, b, .. } = stmt {
                let rel_id = self.atoms.intern(relation);
                let av = self.resolve_arg(a);
                let bv = self.resolve_arg(b);
                self.db.add(rel_id, av, bv);
            }
        }

        Ok(())
    }

    /// Runs every rule to its semi-naive fixpoint. A no-op if the program
    /// has no `SOLVE` statement; idempotent once the fixpoint is reached.
    pub fn solve(&mut self, program: &Program) -> Result<(), EngineError> {
        if !program.has_solve() {
            return Ok(());
        }

        let rules: Vec<&Statement> = program.rules().collect();
        self.warn_undeclared_emit_targets(&rules);

        let mut pass: u32 = 0;
        loop {
            pass += 1;
            if pass > self.config.max_passes {
                return Err(EngineError::NotConverged {
                    max_passes: self.config.max_passes,
                });
            }

            let mut added_any = false;
            for stmt in &rules {
                if let Statement::Rule { body, emit, pos, .. } = stmt {
                    added_any |= self.evaluate_rule(body, emit, *pos)?;
                }
            }

            tracing::debug!(pass, added_any, "fixpoint pass");
            if !added_any {
                break;
            }
        }
        Ok(())
    }

    fn warn_undeclared_emit_targets(&self, rules: &[&Statement]) {
        for stmt in rules {
            if let Statement::Rule { emit, .. } = stmt {
                if !self.declared.contains(&emit.relation) {
                    tracing::warn!(
                        relation = %emit.relation,
                        line = emit.pos.line,
                        column = emit.pos.column,
                        "EMIT targets a relation with no REL declaration"
                    );
                }
            }
        }
    }

    fn evaluate_rule(
        &mut self,
        body: &[BodyOp],
        emit: &Emit,
        rule_pos: Pos,
    ) -> Result<bool, EngineError> {
        let width = rule_register_width(body);
        let needed = width.max(emit.var_a + 1).max(emit.var_b + 1) as usize;
        if needed > self.config.register_count {
            return Err(EngineError::RegisterFileExhausted {
                capacity: self.config.register_count,
                line: rule_pos.line,
                column: rule_pos.column,
            });
        }

        let mut env = vec![0i64; self.config.register_count];
        let mut added = false;
        self.eval_step(body, 0, &mut env, 0, emit, &mut added)?;
        Ok(added)
    }

    fn eval_step(
        &mut self,
        body: &[BodyOp],
        idx: usize,
        env: &mut [i64],
        bound: u32,
        emit: &Emit,
        added: &mut bool,
    ) -> Result<(), EngineError> {
        let Some(op) = body.get(idx) else {
            let a = env[emit.var_a as usize];
            let b = env[emit.var_b as usize];
            let rel_id = self.atoms.intern(&emit.relation);
            if self.db.add(rel_id, a, b) {
                *added = true;
            }
            return Ok(());
        };

        match op {
            BodyOp::Scan {
                relation,
                match_var: None,
                ..
            } => {
                let rel_id = self.atoms.intern(relation);
                let pairs: Vec<(i64, i64)> = self.db.iterate(rel_id).collect();
                for (a, b) in pairs {
                    env[bound as usize] = a;
                    env[(bound + 1) as usize] = b;
                    self.eval_step(body, idx + 1, env, bound + 2, emit, added)?;
                }
            }
            BodyOp::Scan {
                relation,
                match_var: Some(m),
                ..
            } => {
                let rel_id = self.atoms.intern(relation);
                let key = env[*m as usize];
                let values: Vec<i64> = self.db.iterate_by_first(rel_id, key).collect();
                for b in values {
                    env[bound as usize] = b;
                    self.eval_step(body, idx + 1, env, bound + 1, emit, added)?;
                }
            }
            BodyOp::Join {
                relation,
                match_var,
                ..
            } => {
                let rel_id = self.atoms.intern(relation);
                let key = env[*match_var as usize];
                let values: Vec<i64> = self.db.iterate_by_first(rel_id, key).collect();
                for b in values {
                    env[bound as usize] = b;
                    self.eval_step(body, idx + 1, env, bound + 1, emit, added)?;
                }
            }
        }
        Ok(())
    }

    /// Resolves a `QUERY` against the current database, per the four
    /// concrete/wildcard patterns. Unknown relations answer empty/false
    /// rather than erroring.
    pub fn query(&mut self, relation: &str, a: &Arg, b: &Arg) -> QueryResult {
        let rel_id = self.atoms.intern(relation);
        let av = if a.is_wildcard() {
            None
        } else {
            Some(self.resolve_arg(a))
        };
        let bv = if b.is_wildcard() {
            None
        } else {
            Some(self.resolve_arg(b))
        };

        match (av, bv) {
            (Some(a), Some(b)) => QueryResult::Membership(self.db.contains(rel_id, a, b)),
            (Some(a), None) => QueryResult::Column(self.db.iterate_by_first(rel_id, a).collect()),
            (None, Some(b)) => QueryResult::Column(self.db.iterate_by_second(rel_id, b).collect()),
            (None, None) => QueryResult::Pairs(self.db.iterate(rel_id).collect()),
        }
    }

    /// Convenience entry point used by the driver: load, solve if
    /// requested, then answer every `QUERY` statement in source order.
    pub fn run(&mut self, program: &Program) -> Result<Vec<QueryResult>, EngineError> {
        let result = (|| {
            self.load(program)?;
            self.solve(program)?;
            let mut results = Vec::new();
            for stmt in program.queries() {
                if let Statement::Query { relation, a, b, .. } = stmt {
                    results.push(self.query(relation, a, b));
                }
            }
            Ok(results)
        })();

        if let Err(ref e) = result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

fn rule_register_width(body: &[BodyOp]) -> u32 {
    let mut width = 0;
    for op in body {
        width += match op {
            BodyOp::Scan { match_var: None, .. } => 2,
            BodyOp::Scan { match_var: Some(_), .. } | BodyOp::Join { .. } => 1,
        };
    }
    width
}
