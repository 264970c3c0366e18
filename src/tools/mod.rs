//! Tools module - capabilities agents can invoke during their turn

pub mod registry;

pub use registry::{Capability, CapabilityFn, CapabilityRegistry};
