//! The `(value, expires_at)` pair held by the token cache.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Validity of a cached token at a given instant, after applying the safety margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// `now < expires_at - margin`; the token may be handed out.
	Valid,
	/// The margin has been reached; a refresh is due even if the issuer would still accept it.
	Expired,
}

/// Token value plus the expiry instant supplied by the issuer.
///
/// The pair is immutable once built; the cache swaps whole values so readers never observe a
/// value from one refresh next to the expiry of another.
#[derive(Clone)]
pub struct CachedToken {
	value: TokenSecret,
	expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a cached token, rejecting empty values with [`Error::EmptyToken`].
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Result<Self> {
		let value = value.into();

		if value.is_empty() {
			return Err(Error::EmptyToken);
		}

		Ok(Self { value: TokenSecret::new(value), expires_at })
	}

	/// Token value.
	pub fn value(&self) -> &TokenSecret {
		&self.value
	}

	/// Expiry instant exactly as the issuer reported it.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Instant from which the token is treated as expired.
	///
	/// Saturates at the earliest representable instant so the margin is never dropped.
	pub fn refresh_at(&self, margin: Duration) -> OffsetDateTime {
		self.expires_at.checked_sub(margin).unwrap_or(PrimitiveDateTime::MIN.assume_utc())
	}

	/// Computes the status at `now` with the provided safety margin.
	pub fn status_at(&self, now: OffsetDateTime, margin: Duration) -> TokenStatus {
		if now < self.refresh_at(margin) { TokenStatus::Valid } else { TokenStatus::Expired }
	}

	/// Returns `true` if the token may still be served at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(now, margin), TokenStatus::Valid)
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
