//! Template bodies bundled with the binary.
//!
//! These are opaque text assets: renderers place them after a computed
//! header and never look inside them. Clients may depend on their section
//! headers, so edits to the wording are compatibility changes.

use super::catalog::PromptKind;

pub const PAPER_ANALYSIS: &str = include_str!("templates/paper_analysis.md");
pub const RESEARCH_DISCOVERY: &str = include_str!("templates/research_discovery.md");
pub const LITERATURE_SYNTHESIS: &str = include_str!("templates/literature_synthesis.md");
pub const RESEARCH_QUESTION: &str = include_str!("templates/research_question.md");

/// Output outline prepended to the paper analysis body
pub const ANALYSIS_OUTPUT_STRUCTURE: &str = "Present your analysis with the following structure:
1. Executive Summary: 3-5 sentence overview of key contributions
2. Detailed Analysis: Following the specific focus requested
3. Visual Breakdown: Describe key figures/tables and their significance
4. Related Work Map: Position this paper within the research landscape
5. Implementation Notes: Practical considerations for applying these findings";

/// Template body for a prompt kind
pub fn body(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::DeepPaperAnalysis => PAPER_ANALYSIS,
        PromptKind::ResearchDiscovery => RESEARCH_DISCOVERY,
        PromptKind::LiteratureSynthesis => LITERATURE_SYNTHESIS,
        PromptKind::ResearchQuestion => RESEARCH_QUESTION,
    }
}
