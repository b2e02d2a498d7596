//! MCP (Model Context Protocol) server front end.
//!
//! A thin JSON-RPC 2.0 shell over the retrieval engine: four knowledge
//! tools served over stdio, protocol version 2025-06-18.


pub mod protocol;
pub mod server;
pub mod tools;
