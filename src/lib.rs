//! HubSpace Bridge
//!
//! An HTTP command proxy in front of the HubSpace / Afero metadevice cloud,
//! plus an offline analyzer that turns a captured metadevice listing into a
//! Markdown data reference.
//!
//! # Modules
//!
//! - `types`: Core data structures (DeviceBrief, StateValue, FunctionStat, Summary)
//! - `analysis`: Device extraction, state normalization and aggregation
//! - `report`: Markdown rendering and atomic report output
//! - `bridge`: Cloud client, snapshot bridge, controllers and sessions
//! - `api`: Axum REST façade over the active session
//! - `config`: Server configuration from the environment
//!
//! # Example
//!
//! ```no_run
//! use hubspace_bridge::analysis::{run, AnalyzeOptions};
//!
//! fn main() -> Result<(), hubspace_bridge::AnalysisError> {
//!     let summary = run(&AnalyzeOptions::default())?;
//!     println!("{} devices", summary.device_count);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod bridge;
pub mod config;
pub mod report;
pub mod types;

// Re-export commonly used items at crate root
pub use analysis::{AnalysisError, AnalyzeOptions, Corpus};
pub use api::{create_router, AppState};
pub use bridge::{BridgeBackend, BridgeError, BridgeSession, CloudBridge, Credentials};
pub use config::ServerConfig;
pub use report::render_markdown;
pub use types::{CapabilityTable, DeviceBrief, FunctionStat, StateValue, Summary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
