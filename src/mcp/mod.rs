//! MCP (Model Context Protocol) implementation.

pub mod server;

pub use server::McpServer;
