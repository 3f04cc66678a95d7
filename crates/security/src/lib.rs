//! Security module for Anvil: sandbox confinement and command deny-lists.
//!
//! Provides:
//! - **Path confinement**: map any model-supplied path into the sandbox base
//! - **Deny-list**: coarse prefix matching for shell commands

pub mod denylist;
pub mod path;

pub use denylist::{CommandCheck, DenyList};
pub use path::{PathError, Sandbox, confine, normalize_relative};
