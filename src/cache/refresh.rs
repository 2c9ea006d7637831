//! Single-flight refresh coordinator.
//!
//! Every caller that misses the fast path queues on one async mutex. Whoever holds it re-checks
//! the cached pair at its own `now`; if another caller committed a fresh token in the meantime it
//! is reused, otherwise the holder calls the credential source. At most one issuer call is
//! therefore outstanding per cache.
//!
//! Failures are not fanned out. A failed fetch is returned to the caller that made it and the
//! cache is left as it was. Callers still queued behind that attempt re-run the double-check
//! when they get the lock and, finding the cache still expired, try the issuer themselves. A
//! burst that arrives at expiry while the issuer is down therefore produces one sequential
//! retry per queued caller. There is no failure caching or backoff.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, TokenSecret},
	cache::CacheInner,
	obs::{self, RefreshOutcome},
};

impl CacheInner {
	/// Runs the double-checked refresh for a caller that observed an invalid token at `now`.
	pub(super) async fn refresh(&self, now: OffsetDateTime) -> Result<TokenSecret> {
		let _exclusive = self.refresh_guard.lock().await;

		self.metrics.record_attempt();
		obs::record_refresh_outcome(RefreshOutcome::Attempt);

		if let Some(value) = self.valid_at(now) {
			self.metrics.record_reuse();
			obs::record_refresh_outcome(RefreshOutcome::Reused);

			return Ok(value);
		}

		let issued = self.source.fetch_token(&self.scopes).await.map_err(|err| {
			#[cfg(feature = "tracing")]
			tracing::warn!(error = %err, "credential source failed; cached token left untouched");

			self.record_failure();

			Error::from(err)
		})?;
		let token = CachedToken::new(issued.value, issued.expires_at).inspect_err(|_| {
			#[cfg(feature = "tracing")]
			tracing::error!("credential source returned an empty token");

			self.record_failure();
		})?;
		let value = token.value().clone();

		#[cfg(feature = "tracing")]
		tracing::debug!(expires_at = %token.expires_at(), "committed refreshed token");

		*self.current.write() = Some(Arc::new(token));

		self.metrics.record_success();
		obs::record_refresh_outcome(RefreshOutcome::Success);

		Ok(value)
	}

	fn record_failure(&self) {
		self.metrics.record_failure();
		obs::record_refresh_outcome(RefreshOutcome::Failure);
	}
}
