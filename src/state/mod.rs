//! Client-side state modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `session` is the only mutable shared state in the crate. Every other
//! component reads it through accessors and mutates it through its actions.

pub mod session;
