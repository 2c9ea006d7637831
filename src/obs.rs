//! Optional observability helpers for the token cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `bearer_relay.refresh` with the `stage`
//!   (call site) field.
//! - Enable `metrics` to increment the `bearer_relay_refresh_total` counter for every
//!   attempt/reuse/success/failure, labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each pass through the refresh coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// Entry to the exclusive section.
	Attempt,
	/// The double-check found a token committed by another caller; no fetch happened.
	Reused,
	/// The issuer returned a token that is now cached.
	Success,
	/// The issuer (or validation) failed; the cache was left untouched.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Reused => "reused",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
