//! Relational persistence for autobuildr, grounded on
//! `agtrace-index::Database` and generalized to the concurrent, per-run
//! write pattern the harness kernel needs (see DESIGN.md).

mod db;
mod schema;

pub use db::Database;
pub use schema::SCHEMA_SQL;
