//! Research workflow prompts.
//!
//! - [`PromptCatalog`]: the fixed set of prompts and their argument schemas
//! - [`ContextStore`]: per-session [`ResearchContext`] accumulated across calls
//! - [`PromptDispatcher`]: validates a `prompts/get` call, updates the
//!   session's context and renders the matching template
//!
//! ```rust
//! use research_prompts::prompts::PromptDispatcher;
//! use std::collections::HashMap;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = PromptDispatcher::default();
//! let args = HashMap::from([("paper_id".to_string(), "2401.12345".to_string())]);
//! let prompt = dispatcher
//!     .get_prompt("deep-paper-analysis", Some(&args), Some("session-1"))
//!     .await?;
//! assert!(prompt.text().starts_with("Analyze paper 2401.12345."));
//! # Ok(())
//! # }
//! ```

mod catalog;
mod context;
mod dispatcher;
mod render;
pub mod templates;

pub use catalog::{ArgumentSpec, PromptCatalog, PromptDefinition, PromptKind};
pub use context::{
    AnalysisStatus, ContextHandle, ContextStore, ExploredPaper, ResearchContext, SessionKey,
    SessionLimits, DEFAULT_EXPERTISE_LEVEL, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS,
};
pub use dispatcher::{MessageContent, PromptDispatcher, PromptError, PromptMessage, RenderedPrompt, Role};
pub use render::{parse_id_list, PromptRequest, DEFAULT_SYNTHESIS_TYPE};
