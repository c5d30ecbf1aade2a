//! Runtime implementation for `lalrgen` parser tables.

pub mod definition;
pub mod parser;
