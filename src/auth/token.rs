//! Token value types: the redacted secret and the cached `(value, expiry)` pair.

pub mod cached;
pub mod secret;
