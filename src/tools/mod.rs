//! The tool-invocation boundary
//!
//! Every operation takes a JSON object validated against its declared schema and
//! answers with a [`ToolResponse`] envelope; failures are payloads, never
//! transport errors.

pub mod implementations;
pub mod registry;
mod response;
mod server;
pub mod system;
pub mod trait_def;

pub use registry::{ToolInfo, ToolRegistry};
pub use response::ToolResponse;
pub use server::ToolServer;
pub use system::ToolSystem;
pub use trait_def::{parse_input, Tool};
