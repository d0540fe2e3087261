//! # Research Prompts MCP
//!
//! A Model Context Protocol (MCP) server that hands an AI assistant structured
//! prompts for multi-step research workflows over academic papers: deep paper
//! analysis, topic discovery, literature synthesis and research-question
//! formulation.
//!
//! ## Architecture
//!
//! - [`prompts`]: prompt catalog, session research context and dispatcher
//! - [`mcp`]: MCP protocol server exposing `prompts/list` and `prompts/get`
//! - [`config`]: Configuration management

pub mod config;
pub mod mcp;
pub mod prompts;

// Re-export commonly used types
pub use prompts::{PromptDispatcher, PromptError, RenderedPrompt};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
