//! # tutor-cli
//!
//! Command-line front end for [`tutor_rag`]: ingestion, interactive chat,
//! one-shot questions, evaluation and index maintenance.

pub mod cli;
pub mod commands;
pub mod repl;

pub use cli::{Cli, Commands, Settings};
