//! Core modules for agent-document conformance checking.
//!
//! `validate` is the pure check; everything else feeds it (rules, config,
//! assets, document parsing) or consumes its reports (batch, output, trace).

pub mod assets;
pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod output;
pub mod report;
pub mod rules;
pub mod time;
pub mod trace;
pub mod validate;
