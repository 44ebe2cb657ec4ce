//! `SeaORM` entities.
//!
//! Generated by `migrator create` from `entities.toml`; edits are overwritten.

pub mod prelude;

pub mod session;
pub mod user;
