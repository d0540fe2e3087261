//! Validation, context tracking and rendering for `prompts/get`.

use serde::Serialize;
use std::collections::HashMap;

use super::catalog::{PromptCatalog, PromptDefinition};
use super::context::{non_empty, ContextStore, ResearchContext, SessionKey};
use super::render::PromptRequest;

/// Errors returned by the prompt dispatcher
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt not found: {name}. Available prompts: {}", available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    #[error("No arguments provided for prompt: {0}")]
    MissingArgumentMap(String),

    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),

    #[error("A session id is required for prompt: {0}")]
    SessionRequired(String),
}

/// Role of a rendered message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// Message content, serialized in MCP form (`{"type": "text", "text": ...}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: MessageContent,
}

/// Result of a successful `get_prompt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl RenderedPrompt {
    fn user_text(description: &str, text: String) -> Self {
        Self {
            description: Some(description.to_string()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: MessageContent::Text { text },
            }],
        }
    }

    /// Text of the first message
    pub fn text(&self) -> &str {
        self.messages
            .first()
            .map(|m| match &m.content {
                MessageContent::Text { text } => text.as_str(),
            })
            .unwrap_or_default()
    }
}

/// Entry point for listing and rendering prompts
#[derive(Debug)]
pub struct PromptDispatcher {
    catalog: PromptCatalog,
    store: ContextStore,
    require_session_id: bool,
}

impl PromptDispatcher {
    pub fn new(catalog: PromptCatalog, store: ContextStore) -> Self {
        Self {
            catalog,
            store,
            require_session_id: false,
        }
    }

    /// Reject calls that do not carry a session id instead of sharing the
    /// default context
    pub fn require_session_id(mut self, require: bool) -> Self {
        self.require_session_id = require;
        self
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// All prompt definitions
    pub fn list_prompts(&self) -> &[PromptDefinition] {
        self.catalog.list()
    }

    /// Validate, update the session's context, and render a prompt.
    ///
    /// `arguments: None` is reported as [`PromptError::MissingArgumentMap`].
    /// Over MCP the handler always receives a map (empty when the request
    /// carries no `arguments`), so remote callers see
    /// [`PromptError::MissingRequiredArgument`] instead.
    ///
    /// All validation happens before the context is touched. The context
    /// stays locked from the update through rendering, so concurrent calls on
    /// one session apply one at a time.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<&HashMap<String, String>>,
        session_id: Option<&str>,
    ) -> Result<RenderedPrompt, PromptError> {
        let definition = self.catalog.get(name).ok_or_else(|| {
            tracing::warn!("Unknown prompt requested: {}", name);
            PromptError::NotFound {
                name: name.to_string(),
                available: self.catalog.names(),
            }
        })?;

        let arguments =
            arguments.ok_or_else(|| PromptError::MissingArgumentMap(name.to_string()))?;

        if let Some(missing) = definition
            .required_arguments()
            .find(|spec| non_empty(arguments, &spec.name).is_none())
        {
            tracing::warn!("Prompt {} missing required argument {}", name, missing.name);
            return Err(PromptError::MissingRequiredArgument(missing.name.clone()));
        }

        let key = SessionKey::from_session_id(session_id);
        if self.require_session_id && key == SessionKey::Default {
            return Err(PromptError::SessionRequired(name.to_string()));
        }

        let request = PromptRequest::from_arguments(definition.kind, arguments);
        tracing::debug!("Rendering prompt {} for session {}", name, key);

        let mut context = self.store.update(&key, arguments).await;
        let text = request.render(&mut context);

        Ok(RenderedPrompt::user_text(&definition.description, text))
    }

    /// Copy of a session's research context
    pub async fn context(&self, session_id: Option<&str>) -> Option<ResearchContext> {
        self.store
            .snapshot(&SessionKey::from_session_id(session_id))
            .await
    }
}

impl Default for PromptDispatcher {
    fn default() -> Self {
        Self::new(PromptCatalog::new(), ContextStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_prompt() {
        let dispatcher = PromptDispatcher::default();
        let err = dispatcher
            .get_prompt("bogus", Some(&HashMap::new()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PromptError::NotFound { .. }));
        let message = err.to_string();
        for name in dispatcher.catalog().names() {
            assert!(message.contains(&name), "{} missing from {}", name, message);
        }
    }

    #[tokio::test]
    async fn test_missing_argument_map() {
        let dispatcher = PromptDispatcher::default();
        let err = dispatcher
            .get_prompt("research-discovery", None, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingArgumentMap("research-discovery".to_string())
        );
    }

    #[tokio::test]
    async fn test_validation_happens_before_update() {
        let dispatcher = PromptDispatcher::default();
        let err = dispatcher
            .get_prompt(
                "research-question",
                Some(&args(&[("paper_ids", "A"), ("expertise_level", "expert")])),
                Some("s1"),
            )
            .await
            .unwrap_err();

        assert_eq!(err, PromptError::MissingRequiredArgument("topic".to_string()));
        assert!(dispatcher.context(Some("s1")).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_required_value_rejected() {
        let dispatcher = PromptDispatcher::default();
        let err = dispatcher
            .get_prompt("deep-paper-analysis", Some(&args(&[("paper_id", "")])), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingRequiredArgument("paper_id".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_applies_for_every_prompt() {
        let dispatcher = PromptDispatcher::default();
        dispatcher
            .get_prompt(
                "research-discovery",
                Some(&args(&[("topic", "LLM agents"), ("expertise_level", "beginner")])),
                Some("s1"),
            )
            .await
            .unwrap();

        let context = dispatcher.context(Some("s1")).await.unwrap();
        assert_eq!(context.expertise_level, "beginner");
    }

    #[tokio::test]
    async fn test_rendered_prompt_shape() {
        let dispatcher = PromptDispatcher::default();
        let rendered = dispatcher
            .get_prompt("deep-paper-analysis", Some(&args(&[("paper_id", "2401.00001")])), None)
            .await
            .unwrap();

        assert_eq!(rendered.messages.len(), 1);
        assert_eq!(rendered.messages[0].role, Role::User);
        assert!(rendered.text().starts_with("Analyze paper 2401.00001."));

        let json = serde_json::to_value(&rendered).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"]["type"], "text");
    }

    #[tokio::test]
    async fn test_required_session() {
        let dispatcher = PromptDispatcher::default().require_session_id(true);
        let request = args(&[("topic", "quantum error correction")]);

        let err = dispatcher
            .get_prompt("research-discovery", Some(&request), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::SessionRequired("research-discovery".to_string())
        );

        assert!(dispatcher
            .get_prompt("research-discovery", Some(&request), Some("s1"))
            .await
            .is_ok());
    }
}
