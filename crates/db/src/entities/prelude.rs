//! Re-exports of every entity type.
//!
//! Generated by `migrator create` from `entities.toml`; edits are overwritten.

pub use super::session::Entity as Session;
pub use super::user::Entity as User;
