//! Credential source contract: the only way the relay obtains tokens from an issuer.
//!
//! A source is a black box. Given a [`ScopeSet`] it either returns a token value together with
//! the absolute instant the issuer says it expires, or fails with an [`IssuerError`]. The
//! [`TokenCache`](crate::cache::TokenCache) decides when to call it; sources never cache.
//! The reqwest-backed OAuth 2.0 client-credentials adapter lives in
//! [`crate::oauth::ClientCredentialsSource`].

// self
use crate::{_prelude::*, auth::ScopeSet, error::IssuerError};

/// Boxed future returned by [`CredentialSource::fetch_token`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<IssuedToken, IssuerError>> + 'a + Send>>;

/// Issuer contract implemented by credential backends.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Requests a fresh token valid for `scopes`.
	fn fetch_token<'a>(&'a self, scopes: &'a ScopeSet) -> SourceFuture<'a>;
}
impl<T> CredentialSource for Arc<T>
where
	T: ?Sized + CredentialSource,
{
	fn fetch_token<'a>(&'a self, scopes: &'a ScopeSet) -> SourceFuture<'a> {
		T::fetch_token(self.as_ref(), scopes)
	}
}

/// Raw issuance as reported by a source, before the cache validates it.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
	/// Token value.
	pub value: String,
	/// Absolute expiry instant supplied by the issuer.
	pub expires_at: OffsetDateTime,
}
impl IssuedToken {
	/// Creates a new issuance.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: value.into(), expires_at }
	}
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
