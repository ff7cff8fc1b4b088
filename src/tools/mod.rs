//! Tools module
//!
//! MCP tool implementations. Each returns a serializable response or a `CoreError`
//! that the server maps onto an MCP error.

pub mod diary;
pub mod foods;
pub mod profiles;
pub mod status;
