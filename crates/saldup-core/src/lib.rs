//! Core engine for saldup.
//!
//! This crate duplicates a named group inside a SAL project, remapping
//! every identifier that must stay unique:
//! - Project layout conventions and path rules
//! - Identifier discovery (GUIDs, definition IDs, group order)
//! - Remap planning (fresh GUIDs, sequential definition IDs)
//! - Literal substitution rules and the line rewrite engine
//! - Manifest patching
//! - The orchestrator tying the phases together, plus run reports
//! - Error types and exit codes

pub mod discovery;
pub mod duplicate;
pub mod error;
pub mod manifest;
pub mod plan;
pub mod project;
pub mod rewrite;
pub mod subst;
