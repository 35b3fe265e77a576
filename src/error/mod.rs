//! Error types for validation failures.
//!
//! This module provides types for representing validation issues with rich
//! context including paths, messages, and expected/received values.

mod issue;

pub use issue::{Issue, Issues};
