//! Static registry of the prompts this server exposes.

use serde::Serialize;
use std::fmt;

/// The closed set of prompt kinds.
///
/// Every variant has both a catalog entry and a renderer, so the dispatcher
/// never meets a name it cannot render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    DeepPaperAnalysis,
    ResearchDiscovery,
    LiteratureSynthesis,
    ResearchQuestion,
}

impl PromptKind {
    /// All kinds, in catalog declaration order
    pub const ALL: [PromptKind; 4] = [
        PromptKind::DeepPaperAnalysis,
        PromptKind::ResearchDiscovery,
        PromptKind::LiteratureSynthesis,
        PromptKind::ResearchQuestion,
    ];

    /// Protocol-facing prompt name
    pub fn name(self) -> &'static str {
        match self {
            PromptKind::DeepPaperAnalysis => "deep-paper-analysis",
            PromptKind::ResearchDiscovery => "research-discovery",
            PromptKind::LiteratureSynthesis => "literature-synthesis",
            PromptKind::ResearchQuestion => "research-question",
        }
    }

    /// Look up a kind by its protocol name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            PromptKind::DeepPaperAnalysis => {
                "Analyze an academic paper in depth, connecting it to papers explored earlier in the session"
            }
            PromptKind::ResearchDiscovery => {
                "Explore a research topic: foundational work, current state, open questions and a reading path"
            }
            PromptKind::LiteratureSynthesis => {
                "Synthesize findings across multiple papers by theme, method, timeline or gaps"
            }
            PromptKind::ResearchQuestion => {
                "Formulate research questions grounded in a set of papers and a research topic"
            }
        }
    }

    fn arguments(self) -> Vec<ArgumentSpec> {
        match self {
            PromptKind::DeepPaperAnalysis => vec![ArgumentSpec::required(
                "paper_id",
                "arXiv paper ID to analyze (e.g. '2401.12345')",
            )],
            PromptKind::ResearchDiscovery => vec![
                ArgumentSpec::required("topic", "Research topic or question to explore"),
                ArgumentSpec::optional(
                    "expertise_level",
                    "User's familiarity with the topic: beginner, intermediate or expert",
                ),
                ArgumentSpec::optional(
                    "time_period",
                    "Time period to focus on (e.g. '2020-2024', 'last 5 years')",
                ),
                ArgumentSpec::optional(
                    "domain",
                    "Research domain or field (e.g. 'computer vision', 'NLP')",
                ),
            ],
            PromptKind::LiteratureSynthesis => vec![
                ArgumentSpec::required(
                    "paper_ids",
                    "Comma-separated list of arXiv paper IDs to synthesize",
                ),
                ArgumentSpec::optional(
                    "synthesis_type",
                    "Synthesis focus: themes, methods, timeline, gaps or comprehensive (default)",
                ),
                ArgumentSpec::optional("domain", "Research domain or field"),
            ],
            PromptKind::ResearchQuestion => vec![
                ArgumentSpec::required(
                    "paper_ids",
                    "Comma-separated list of arXiv paper IDs to build on",
                ),
                ArgumentSpec::required("topic", "Research topic the questions should address"),
                ArgumentSpec::optional("domain", "Research domain or field"),
            ],
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared prompt argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ArgumentSpec {
    fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// A prompt as advertised to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,

    #[serde(skip)]
    pub kind: PromptKind,
}

impl PromptDefinition {
    fn from_kind(kind: PromptKind) -> Self {
        Self {
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            arguments: kind.arguments(),
            kind,
        }
    }

    /// Iterate over the required argument specs
    pub fn required_arguments(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.arguments.iter().filter(|arg| arg.required)
    }
}

/// Read-only registry of prompt definitions, kept in declaration order
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: Vec<PromptDefinition>,
}

impl PromptCatalog {
    /// Build the catalog with every known prompt kind
    pub fn new() -> Self {
        Self {
            prompts: PromptKind::ALL
                .into_iter()
                .map(PromptDefinition::from_kind)
                .collect(),
        }
    }

    /// All prompt definitions
    pub fn list(&self) -> &[PromptDefinition] {
        &self.prompts
    }

    /// Get a prompt definition by name
    pub fn get(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Names of all prompts, in declaration order
    pub fn names(&self) -> Vec<String> {
        self.prompts.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::new()
    }
}
