//! Data types for the HubSpace bridge
//!
//! This module contains the core data structures shared by the analyzer,
//! the report renderer and the HTTP bridge.

mod capability;
mod device;
mod stats;
mod summary;

pub use capability::{CapabilityHint, CapabilityTable, CapabilityTableError};
pub use device::{DeviceBrief, JsonType, StateValue, DEVICE_TYPE_ID};
pub use stats::{canonical_sample, Diagnostics, FunctionStat, MAX_SAMPLES};
pub use summary::{FunctionTable, Summary};
