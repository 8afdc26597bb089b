//! Terminal front end for pinentry-bar.
//!
//! The prompt logic lives in `pinentry-bar-core`; this crate provides the
//! [`terminal`] implementations of its collaborator traits and the
//! `pinentry-bar` binary that wires them together.

pub mod terminal;

pub use terminal::{open, TerminalCollaborators};
