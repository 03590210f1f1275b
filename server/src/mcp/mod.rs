//! MCP tool protocol: JSON-RPC 2.0 over stdio

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::serve;
