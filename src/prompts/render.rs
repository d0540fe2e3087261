//! Typed prompt requests and their renderers.

use std::collections::HashMap;

use super::catalog::PromptKind;
use super::context::{non_empty, ResearchContext};
use super::templates;

/// Synthesis type used when the caller does not pick one
pub const DEFAULT_SYNTHESIS_TYPE: &str = "comprehensive";

/// A validated prompt invocation with its typed arguments.
///
/// Built only after required arguments have been checked, so required
/// fields are non-empty. Optional fields are `None` when absent or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRequest {
    DeepPaperAnalysis {
        paper_id: String,
    },
    ResearchDiscovery {
        topic: String,
        expertise_level: Option<String>,
        time_period: Option<String>,
        domain: Option<String>,
    },
    LiteratureSynthesis {
        paper_ids: Vec<String>,
        synthesis_type: String,
        domain: Option<String>,
    },
    ResearchQuestion {
        paper_ids: Vec<String>,
        topic: String,
        domain: Option<String>,
    },
}

impl PromptRequest {
    /// Extract the typed arguments for a prompt kind
    pub fn from_arguments(kind: PromptKind, args: &HashMap<String, String>) -> Self {
        let text = |key: &str| non_empty(args, key).unwrap_or_default().to_string();
        let optional = |key: &str| non_empty(args, key).map(str::to_string);

        match kind {
            PromptKind::DeepPaperAnalysis => PromptRequest::DeepPaperAnalysis {
                paper_id: text("paper_id"),
            },
            PromptKind::ResearchDiscovery => PromptRequest::ResearchDiscovery {
                topic: text("topic"),
                expertise_level: optional("expertise_level"),
                time_period: optional("time_period"),
                domain: optional("domain"),
            },
            PromptKind::LiteratureSynthesis => PromptRequest::LiteratureSynthesis {
                paper_ids: parse_id_list(&text("paper_ids")),
                synthesis_type: optional("synthesis_type")
                    .unwrap_or_else(|| DEFAULT_SYNTHESIS_TYPE.to_string()),
                domain: optional("domain"),
            },
            PromptKind::ResearchQuestion => PromptRequest::ResearchQuestion {
                paper_ids: parse_id_list(&text("paper_ids")),
                topic: text("topic"),
                domain: optional("domain"),
            },
        }
    }

    pub fn kind(&self) -> PromptKind {
        match self {
            PromptRequest::DeepPaperAnalysis { .. } => PromptKind::DeepPaperAnalysis,
            PromptRequest::ResearchDiscovery { .. } => PromptKind::ResearchDiscovery,
            PromptRequest::LiteratureSynthesis { .. } => PromptKind::LiteratureSynthesis,
            PromptRequest::ResearchQuestion { .. } => PromptKind::ResearchQuestion,
        }
    }

    /// Render the prompt text.
    ///
    /// Only the paper analysis touches the context: it reads the explored
    /// papers and records the analysis.
    pub fn render(&self, context: &mut ResearchContext) -> String {
        let body = templates::body(self.kind());

        match self {
            PromptRequest::DeepPaperAnalysis { paper_id } => {
                let mut header = format!("Analyze paper {}.", paper_id);
                if context.explored_papers.len() > 1 {
                    let previous = context.other_explored(paper_id);
                    if !previous.is_empty() {
                        header.push_str(&format!(
                            "\nI've previously analyzed papers: {}. If relevant, note connections to these works.",
                            previous.join(", ")
                        ));
                    }
                }
                context.record_analysis(paper_id);

                compose(&[header.as_str(), templates::ANALYSIS_OUTPUT_STRUCTURE, body])
            }
            PromptRequest::ResearchDiscovery {
                topic,
                expertise_level,
                time_period,
                domain,
            } => {
                let header = format!("Explore and discover research on the topic: \"{}\"", topic);
                let block = context_block(&[
                    ("User's expertise level", expertise_level.as_deref()),
                    ("Time period", time_period.as_deref()),
                    ("Domain", domain.as_deref()),
                ]);

                compose(&[header.as_str(), block.as_str(), body])
            }
            PromptRequest::LiteratureSynthesis {
                paper_ids,
                synthesis_type,
                domain,
            } => {
                let header = format!(
                    "Synthesize findings across the following papers: {}",
                    paper_ids.join(", ")
                );
                let block = context_block(&[
                    ("Synthesis type", Some(synthesis_type.as_str())),
                    ("Domain", domain.as_deref()),
                ]);

                compose(&[header.as_str(), block.as_str(), body])
            }
            PromptRequest::ResearchQuestion {
                paper_ids,
                topic,
                domain,
            } => {
                let header = format!(
                    "Based on the following papers and research topic, formulate research questions:\n\nPapers to analyze: {}\nResearch topic: {}",
                    paper_ids.join(", "),
                    topic
                );
                let block = context_block(&[("Domain", domain.as_deref())]);

                compose(&[header.as_str(), block.as_str(), body])
            }
        }
    }
}

/// Split a comma-separated id list, trimming pieces and dropping empty ones.
/// Order is preserved and duplicates are kept.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// One `Label: value` line per supplied field
fn context_block(fields: &[(&str, Option<&str>)]) -> String {
    fields
        .iter()
        .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join non-empty sections with a blank line
fn compose(sections: &[&str]) -> String {
    let mut text = sections
        .iter()
        .map(|s| s.trim_end())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    text.push('\n');
    text
}
