//! Multi-step user workflows.

pub mod collection;
