//! ByteLog: a small bottom-up Datalog-style deductive system.
//!
//! Pipeline: source text → [`lexer`] → [`parser`] → [`ast`] → [`engine`]
//! (semi-naive fixpoint evaluation and query resolution), or alternatively
//! source text → … → [`ast`] → [`wat_gen`] (WebAssembly text lowering of
//! facts and concrete queries). Both back-ends share the parser and AST;
//! the engine and the WAT generator each own a private atom table.

pub mod ast;
pub mod atom_table;
pub mod config;
pub mod engine;
pub mod error;
pub mod fact_db;
pub mod lexer;
pub mod parser;
pub mod wat_gen;

pub use ast::Program;
pub use atom_table::AtomTable;
pub use config::Config;
pub use engine::{Engine, QueryResult};
pub use fact_db::FactDb;
pub use parser::parse_program;
pub use wat_gen::WatGen;
