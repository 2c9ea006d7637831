//! Scope sets and token models shared by the cache and credential sources.

pub mod scope;
pub mod token;

pub use scope::*;
pub use token::{cached::*, secret::*};
