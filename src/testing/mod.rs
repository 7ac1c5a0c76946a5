//! Testing utilities for SmileSim
//!
//! Synthetic frames for exercising the capture path without hardware,
//! plus in-memory doubles for the backend service traits.

pub mod fakes;
pub mod synthetic;

pub use fakes::{
    HangingTransport, InMemoryCatalog, InMemoryIdentity, InMemoryProfiles, InMemorySimulations,
    InMemoryStorage, ScriptedTransport, SyntheticBackend,
};
pub use synthetic::{synthetic_jpeg, synthetic_rgb_frame};
