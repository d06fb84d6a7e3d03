//! JSON-RPC tool server over stdio for the Lotto 6aus49 store.

pub mod connection;
pub mod mcp_handler;
pub mod use_cases;

pub use mcp_handler::{MCPHandler, stdio};
pub use use_cases::{AnalysisUseCase, ContactUseCase, DrawUseCase, SimulationUseCase};
