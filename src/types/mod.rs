//! Core types shared by the scope machinery.
//!
//! - [`id`]: Identifier types (`ScopeId`, `FrameId`)

pub mod id;

pub use id::{FrameId, ScopeId};
