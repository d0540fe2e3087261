//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! This module exposes the prompt catalog over `prompts/list` and
//! `prompts/get`, using stdio or streamable HTTP as the transport.

use crate::prompts::{PromptDefinition, PromptDispatcher, PromptError, RenderedPrompt};
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::{StreamableHttpServer, StreamableHttpServerConfig},
    types::{GetPromptResult, PromptInfo},
    Error, PromptHandler, RequestHandlerExtra, Server, ServerCapabilities,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server for research prompts
///
/// All prompt handlers share one dispatcher, so research context persists
/// across calls within a session.
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
    dispatcher: Arc<PromptDispatcher>,
}

impl McpServer {
    /// Create a new MCP server around the given dispatcher
    pub fn new(dispatcher: Arc<PromptDispatcher>) -> Result<Self, pmcp::Error> {
        Self::with_name("research-prompts", dispatcher)
    }

    /// Create a new MCP server reporting the given server name
    pub fn with_name(name: &str, dispatcher: Arc<PromptDispatcher>) -> Result<Self, pmcp::Error> {
        let server = Self::build_server_impl(name, &dispatcher)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
            dispatcher,
        })
    }

    /// Build the MCP server with prompt handlers (internal implementation)
    fn build_server_impl(
        name: &str,
        dispatcher: &Arc<PromptDispatcher>,
    ) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name(name)
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::prompts_only());

        for definition in dispatcher.list_prompts() {
            let handler = PromptWrapper {
                name: definition.name.clone(),
                info: prompt_info(definition)?,
                dispatcher: dispatcher.clone(),
            };
            builder = builder.prompt(handler.name.clone(), handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!(
            "Starting MCP server in stdio mode with {} prompts",
            self.dispatcher.list_prompts().len()
        );

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server in streamable HTTP mode
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr = parse_addr(addr)?;
        let http_server = StreamableHttpServer::new(socket_addr, self.server.clone());
        http_server.start().await
    }

    /// Run the server in streamable HTTP mode with custom configuration
    pub async fn run_http_with_config(
        &self,
        addr: &str,
        config: StreamableHttpServerConfig,
    ) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::info!(
            "Starting MCP server in HTTP mode on {} (with custom config)",
            addr
        );

        let socket_addr = parse_addr(addr)?;
        let http_server =
            StreamableHttpServer::with_config(socket_addr, self.server.clone(), config);
        http_server.start().await
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, pmcp::Error> {
    addr.parse()
        .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))
}

/// Wrapper adapting one catalog prompt to pmcp's PromptHandler.
///
/// pmcp hands the handler an argument map that is empty when the request has
/// no `arguments`, so the dispatcher's "no argument map" case never occurs
/// here; such calls fail on the first required argument instead.
struct PromptWrapper {
    name: String,
    info: PromptInfo,
    dispatcher: Arc<PromptDispatcher>,
}

#[async_trait]
impl PromptHandler for PromptWrapper {
    async fn handle(
        &self,
        args: HashMap<String, String>,
        extra: RequestHandlerExtra,
    ) -> Result<GetPromptResult, Error> {
        let rendered = self
            .dispatcher
            .get_prompt(&self.name, Some(&args), extra.session_id.as_deref())
            .await
            .map_err(to_protocol_error)?;

        to_prompt_result(&rendered)
    }

    fn metadata(&self) -> Option<PromptInfo> {
        Some(self.info.clone())
    }
}

/// Prompt errors are all caller input problems
fn to_protocol_error(err: PromptError) -> Error {
    Error::invalid_params(err.to_string())
}

// Our prompt types serialize in MCP wire form, so convert through JSON.
fn prompt_info(definition: &PromptDefinition) -> Result<PromptInfo, Error> {
    serde_json::to_value(definition)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::internal(format!("Invalid prompt metadata: {}", e)))
}

fn to_prompt_result(rendered: &RenderedPrompt) -> Result<GetPromptResult, Error> {
    serde_json::to_value(rendered)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::internal(format!("Invalid prompt result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_info_conversion() {
        let dispatcher = PromptDispatcher::default();
        for definition in dispatcher.list_prompts() {
            let info = prompt_info(definition).unwrap();
            assert_eq!(info.name, definition.name);
        }
    }

    #[tokio::test]
    async fn test_prompt_result_conversion() {
        let dispatcher = PromptDispatcher::default();
        let args = HashMap::from([("topic".to_string(), "protein folding".to_string())]);
        let rendered = dispatcher
            .get_prompt("research-discovery", Some(&args), None)
            .await
            .unwrap();

        let result = to_prompt_result(&rendered).unwrap();
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_request_without_arguments_reports_required_argument() {
        // The wrapper always receives a map, empty when the request had none
        let dispatcher = PromptDispatcher::default();
        let err = dispatcher
            .get_prompt("deep-paper-analysis", Some(&HashMap::new()), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingRequiredArgument("paper_id".to_string())
        );

        let protocol = to_protocol_error(err);
        assert!(protocol.to_string().contains("paper_id"));
    }

    #[test]
    fn test_invalid_address() {
        assert!(parse_addr("not an address").is_err());
        assert!(parse_addr("127.0.0.1:3000").is_ok());
    }
}
