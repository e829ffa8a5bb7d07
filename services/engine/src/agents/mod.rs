//! Agent modules for the Edge Identity Engine
//!
//! - `module_identity`: keeps module identities in sync with the running module set

pub mod module_identity;
