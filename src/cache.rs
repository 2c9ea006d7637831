//! Token cache that serves a valid bearer token to many concurrent callers.
//!
//! [`TokenCache::get_valid_token_at`] first checks the cached `(value, expires_at)` pair under a
//! short synchronous read lock that is never held across an `.await` and never shares a lock
//! with the refresh path, so readers are not blocked by a refresh in flight. A token is valid
//! while `now < expires_at - margin`; the margin defaults to five minutes and the issuer's expiry
//! is never adjusted.
//!
//! When the check fails the caller enters the single-flight coordinator (see [`refresh`]). The
//! coordinator runs on a detached tokio task, so a caller that is cancelled while waiting does
//! not cancel the refresh it triggered: the result is still committed for everyone else.
//!
//! The cache is an owned value. Build it once at startup and hand clones (they share state) to
//! request handlers.

pub mod refresh;

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, ScopeSet, TokenSecret},
	clock::{Clock, SystemClock},
	obs::RefreshSpan,
	source::CredentialSource,
};

/// Shared handle to a single cached token and its refresh coordinator.
#[derive(Clone)]
pub struct TokenCache {
	inner: Arc<CacheInner>,
}
impl TokenCache {
	/// Safety margin applied before the issuer's expiry instant.
	pub const DEFAULT_MARGIN: Duration = Duration::minutes(5);

	/// Returns a builder for the provided source and scopes.
	pub fn builder(source: impl 'static + CredentialSource, scopes: ScopeSet) -> TokenCacheBuilder {
		TokenCacheBuilder::new(Arc::new(source), scopes)
	}

	/// Creates an empty cache with the system clock and the default margin.
	pub fn new(source: impl 'static + CredentialSource, scopes: ScopeSet) -> Self {
		Self::builder(source, scopes).build()
	}

	/// Returns a currently valid token, refreshing it from the source if needed.
	///
	/// A refresh needs a tokio runtime; without one the caller gets
	/// [`Error::RuntimeUnavailable`].
	pub async fn get_valid_token(&self) -> Result<TokenSecret> {
		let now = self.inner.clock.now();

		self.get_valid_token_at(now).await
	}

	/// Returns a token valid at `now`, refreshing it from the source if needed.
	///
	/// On a failed refresh the caller receives the issuer error, never a stale token, and the
	/// cached pair is left untouched. A refresh needs a tokio runtime; without one the caller
	/// gets [`Error::RuntimeUnavailable`].
	pub async fn get_valid_token_at(&self, now: OffsetDateTime) -> Result<TokenSecret> {
		if let Some(value) = self.inner.valid_at(now) {
			return Ok(value);
		}

		let runtime = tokio::runtime::Handle::try_current()
			.map_err(|source| Error::RuntimeUnavailable { source })?;
		let inner = self.inner.clone();
		let span = RefreshSpan::new("get_valid_token");
		let refresh = runtime.spawn(span.instrument(async move { inner.refresh(now).await }));

		refresh.await.map_err(|source| Error::RefreshAborted { source })?
	}

	/// Returns the cached token if it is valid at `now`, without contacting the source.
	pub fn peek_valid_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.inner.valid_at(now)
	}

	/// Returns the cached pair regardless of validity; `None` until the first successful fetch.
	pub fn current(&self) -> Option<Arc<CachedToken>> {
		self.inner.current.read().clone()
	}

	/// Scopes requested from the source.
	pub fn scopes(&self) -> &ScopeSet {
		&self.inner.scopes
	}

	/// Safety margin in effect.
	pub fn margin(&self) -> Duration {
		self.inner.margin
	}

	/// Refresh coordinator counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.inner.metrics
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("scopes", &self.inner.scopes)
			.field("margin", &self.inner.margin)
			.field("current", &self.current())
			.finish()
	}
}

/// Builder for [`TokenCache`].
pub struct TokenCacheBuilder {
	source: Arc<dyn CredentialSource>,
	scopes: ScopeSet,
	clock: Arc<dyn Clock>,
	margin: Duration,
}
impl TokenCacheBuilder {
	fn new(source: Arc<dyn CredentialSource>, scopes: ScopeSet) -> Self {
		Self { source, scopes, clock: Arc::new(SystemClock), margin: TokenCache::DEFAULT_MARGIN }
	}

	/// Overrides the clock used by [`TokenCache::get_valid_token`].
	pub fn clock(mut self, clock: impl 'static + Clock) -> Self {
		self.clock = Arc::new(clock);

		self
	}

	/// Overrides the safety margin; negative values are clamped to zero.
	pub fn margin(mut self, margin: Duration) -> Self {
		self.margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Consumes the builder and produces an empty [`TokenCache`].
	pub fn build(self) -> TokenCache {
		TokenCache {
			inner: Arc::new(CacheInner {
				current: RwLock::new(None),
				refresh_guard: AsyncMutex::new(()),
				source: self.source,
				scopes: self.scopes,
				clock: self.clock,
				margin: self.margin,
				metrics: RefreshMetrics::default(),
			}),
		}
	}
}
impl Debug for TokenCacheBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCacheBuilder")
			.field("scopes", &self.scopes)
			.field("margin", &self.margin)
			.finish()
	}
}

struct CacheInner {
	current: RwLock<Option<Arc<CachedToken>>>,
	refresh_guard: AsyncMutex<()>,
	source: Arc<dyn CredentialSource>,
	scopes: ScopeSet,
	clock: Arc<dyn Clock>,
	margin: Duration,
	metrics: RefreshMetrics,
}
impl CacheInner {
	fn valid_at(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.current
			.read()
			.as_ref()
			.filter(|token| token.is_valid_at(now, self.margin))
			.map(|token| token.value().clone())
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		pin::pin,
		task::{Context, Poll, Waker},
		time::Duration as StdDuration,
	};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use super::*;
	use crate::{_preludet::*, clock::ManualClock, error::IssuerError};

	fn cache_with(source: &Arc<ScriptedSource>) -> TokenCache {
		TokenCache::builder(source.clone(), test_scopes()).clock(ManualClock::new(t0())).build()
	}

	async fn wait_for_calls(source: &ScriptedSource, calls: usize) {
		for _ in 0..200 {
			if source.calls() >= calls {
				return;
			}

			tokio::time::sleep(StdDuration::from_millis(5)).await;
		}

		panic!("Source never reached {calls} calls.");
	}

	#[tokio::test]
	async fn scenario_a_fetches_once_per_expiry_cycle() {
		let source = Arc::new(ScriptedSource::new());

		source
			.push_token("tok1", t0() + Duration::seconds(3600))
			.push_token("tok2", t0() + Duration::seconds(7200));

		let cache = cache_with(&source);
		let first = cache.get_valid_token_at(t0()).await.expect("Initial fetch should succeed.");

		assert_eq!(first.expose(), "tok1");
		assert_eq!(source.calls(), 1);

		for offset in [100, 1_000, 3_000, 3_299] {
			let token = cache
				.get_valid_token_at(t0() + Duration::seconds(offset))
				.await
				.expect("Cached token should be served before the margin.");

			assert_eq!(token, first);
		}

		assert_eq!(source.calls(), 1);

		let refreshed = cache
			.get_valid_token_at(t0() + Duration::seconds(3301))
			.await
			.expect("Refresh inside the margin should succeed.");

		assert_eq!(refreshed.expose(), "tok2");
		assert_eq!(source.calls(), 2);
		assert_eq!(cache.metrics().successes(), 2);
	}

	#[tokio::test]
	async fn scenario_b_failure_is_surfaced_and_retried() {
		let source = Arc::new(ScriptedSource::new());

		source
			.push_token("tok1", t0() + Duration::seconds(3600))
			.push_failure("issuer unavailable")
			.push_token("tok2", t0() + Duration::seconds(7200));

		let cache = cache_with(&source);

		cache.get_valid_token_at(t0()).await.expect("Initial fetch should succeed.");

		let at = t0() + Duration::seconds(3301);
		let err = cache
			.get_valid_token_at(at)
			.await
			.expect_err("The failing call must receive the issuer error, not a stale token.");

		assert!(matches!(err, Error::TokenIssuer(IssuerError::Denied { .. })));
		assert!(cache.peek_valid_at(at).is_none(), "Stale tok1 must not be served past the margin.");
		assert_eq!(
			cache.current().map(|token| token.value().expose().to_owned()),
			Some("tok1".into()),
			"A failed refresh must leave the cached pair untouched."
		);

		let retried = cache
			.get_valid_token_at(t0() + Duration::seconds(3302))
			.await
			.expect("The next call should retry the issuer.");

		assert_eq!(retried.expose(), "tok2");
		assert_eq!(source.calls(), 3);
		assert_eq!(cache.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn margin_boundary_decides_fetch() {
		let expires_at = t0() + Duration::hours(1);
		let source = Arc::new(ScriptedSource::new());

		source.push_token("tok1", expires_at).push_token("tok2", expires_at + Duration::hours(1));

		let cache = cache_with(&source);

		cache.get_valid_token_at(t0()).await.expect("Initial fetch should succeed.");

		let just_before = expires_at - TokenCache::DEFAULT_MARGIN - Duration::seconds(1);
		let before = cache.get_valid_token_at(just_before).await.expect("Token should be valid.");

		assert_eq!(before.expose(), "tok1");
		assert_eq!(source.calls(), 1);

		let at_margin = cache
			.get_valid_token_at(expires_at - TokenCache::DEFAULT_MARGIN)
			.await
			.expect("Refresh at the margin should succeed.");

		assert_eq!(at_margin.expose(), "tok2");
		assert_eq!(source.calls(), 2);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_callers_on_valid_cache_never_fetch() {
		let source = Arc::new(ScriptedSource::new());

		source.push_token("tok1", t0() + Duration::hours(1));

		let cache = cache_with(&source);

		cache.get_valid_token_at(t0()).await.expect("Initial fetch should succeed.");

		let handles = (0..32)
			.map(|i| {
				let cache = cache.clone();

				tokio::spawn(async move {
					cache.get_valid_token_at(t0() + Duration::seconds(i)).await
				})
			})
			.collect::<Vec<_>>();

		for handle in handles {
			let token = handle
				.await
				.expect("Reader task should not panic.")
				.expect("Reader should get the cached token.");

			assert_eq!(token.expose(), "tok1");
		}

		assert_eq!(source.calls(), 1);
		assert_eq!(cache.metrics().attempts(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn contended_refresh_fetches_exactly_once() {
		let gate = Arc::new(Semaphore::new(0));
		let source = Arc::new(ScriptedSource::new().gated(gate.clone()));

		source.push_token("fresh", t0() + Duration::hours(1));

		let cache = cache_with(&source);
		let handles = (0..16)
			.map(|_| {
				let cache = cache.clone();

				tokio::spawn(async move { cache.get_valid_token_at(t0()).await })
			})
			.collect::<Vec<_>>();

		wait_for_calls(&source, 1).await;
		tokio::time::sleep(StdDuration::from_millis(20)).await;
		gate.add_permits(1);

		for handle in handles {
			let token = handle
				.await
				.expect("Caller task should not panic.")
				.expect("Every caller should receive the fresh token.");

			assert_eq!(token.expose(), "fresh");
		}

		assert_eq!(source.calls(), 1);
		assert_eq!(cache.metrics().successes(), 1);
		assert_eq!(cache.metrics().attempts(), cache.metrics().reused() + 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn queued_callers_retry_after_a_failed_fetch() {
		const CALLERS: usize = 4;

		let gate = Arc::new(Semaphore::new(0));
		let source = Arc::new(ScriptedSource::new().gated(gate.clone()));

		for _ in 0..CALLERS {
			source.push_failure("issuer unavailable");
		}

		let cache = cache_with(&source);
		let handles = (0..CALLERS)
			.map(|_| {
				let cache = cache.clone();

				tokio::spawn(async move { cache.get_valid_token_at(t0()).await })
			})
			.collect::<Vec<_>>();

		wait_for_calls(&source, 1).await;
		tokio::time::sleep(StdDuration::from_millis(20)).await;

		assert_eq!(source.calls(), 1, "Queued callers must wait for the in-flight fetch.");

		gate.add_permits(CALLERS);

		for handle in handles {
			let err = handle
				.await
				.expect("Caller task should not panic.")
				.expect_err("Each caller should receive its own issuer error.");

			assert!(matches!(err, Error::TokenIssuer(IssuerError::Denied { .. })));
		}

		assert_eq!(source.calls(), CALLERS);
		assert_eq!(cache.metrics().failures(), CALLERS as u64);
		assert_eq!(cache.metrics().reused(), 0);
		assert!(cache.current().is_none());
	}

	#[test]
	fn refresh_outside_a_runtime_is_an_error() {
		let source = Arc::new(ScriptedSource::new());

		source.push_token("tok1", t0() + Duration::hours(1));

		let cache = cache_with(&source);
		let mut call = pin!(cache.get_valid_token_at(t0()));
		let polled = call.as_mut().poll(&mut Context::from_waker(Waker::noop()));

		assert!(matches!(polled, Poll::Ready(Err(Error::RuntimeUnavailable { .. }))));
		assert_eq!(source.calls(), 0);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn cancelled_caller_does_not_cancel_refresh() {
		let gate = Arc::new(Semaphore::new(0));
		let source = Arc::new(ScriptedSource::new().gated(gate.clone()));

		source.push_token("detached", t0() + Duration::hours(1));

		let cache = cache_with(&source);
		let timed_out =
			tokio::time::timeout(StdDuration::from_millis(20), cache.get_valid_token_at(t0()))
				.await;

		assert!(timed_out.is_err(), "The caller should give up while the fetch is gated.");

		wait_for_calls(&source, 1).await;
		gate.add_permits(1);

		for _ in 0..200 {
			if cache.peek_valid_at(t0()).is_some() {
				break;
			}

			tokio::time::sleep(StdDuration::from_millis(5)).await;
		}

		assert_eq!(
			cache.peek_valid_at(t0()).map(|token| token.expose().to_owned()),
			Some("detached".into())
		);

		let token = cache.get_valid_token_at(t0()).await.expect("Committed token should serve.");

		assert_eq!(token.expose(), "detached");
		assert_eq!(source.calls(), 1);
	}

	#[tokio::test]
	async fn empty_token_is_never_cached() {
		let source = Arc::new(ScriptedSource::new());

		source.push_token("", t0() + Duration::hours(1));

		let cache = cache_with(&source);
		let err = cache
			.get_valid_token_at(t0())
			.await
			.expect_err("An empty token must be reported as an error.");

		assert!(matches!(err, Error::EmptyToken));
		assert!(cache.current().is_none());
	}

	#[tokio::test]
	async fn get_valid_token_uses_the_cache_clock() {
		let clock = ManualClock::new(t0());
		let source = Arc::new(ScriptedSource::new());

		source
			.push_token("tok1", t0() + Duration::hours(1))
			.push_token("tok2", t0() + Duration::hours(2));

		let cache = TokenCache::builder(source.clone(), test_scopes()).clock(clock.clone()).build();

		assert_eq!(cache.get_valid_token().await.expect("Fetch should succeed.").expose(), "tok1");

		clock.advance(Duration::minutes(56));

		assert_eq!(cache.get_valid_token().await.expect("Refresh should succeed.").expose(), "tok2");
		assert_eq!(source.calls(), 2);
	}

	#[test]
	fn builder_clamps_negative_margin() {
		let cache = TokenCache::builder(ScriptedSource::new(), test_scopes())
			.margin(Duration::seconds(-30))
			.build();

		assert_eq!(cache.margin(), Duration::ZERO);
		assert!(cache.current().is_none());
	}
}
