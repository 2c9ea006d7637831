//! Bearer-authenticated relay from a front-line HTTP service to a backend, built around a
//! single-flight token cache that shields the credential issuer from concurrent refreshes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
#[cfg(feature = "server")] pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
#[cfg(feature = "reqwest")] pub mod http;
#[cfg(feature = "reqwest")] pub mod oauth;
pub mod obs;
#[cfg(feature = "reqwest")] pub mod requester;
#[cfg(feature = "server")] pub mod service;
pub mod source;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		auth::ScopeSet,
		error::IssuerError,
		source::{CredentialSource, IssuedToken, SourceFuture},
	};

	/// Scripted [`CredentialSource`] that replays queued outcomes and counts every fetch.
	///
	/// When the script runs dry the source answers with an [`IssuerError::Unexpected`] so tests
	/// notice unplanned fetches instead of hanging.
	#[derive(Debug, Default)]
	pub struct ScriptedSource {
		outcomes: Mutex<VecDeque<Result<IssuedToken, IssuerError>>>,
		calls: AtomicUsize,
		gate: Option<Arc<tokio::sync::Semaphore>>,
	}
	impl ScriptedSource {
		/// Creates an empty script.
		pub fn new() -> Self {
			Self::default()
		}

		/// Requires one permit from `gate` before each fetch completes.
		///
		/// Tests use this to hold a refresh in flight while other callers pile up.
		pub fn gated(mut self, gate: Arc<tokio::sync::Semaphore>) -> Self {
			self.gate = Some(gate);

			self
		}

		/// Queues a successful issuance.
		pub fn push_token(&self, value: &str, expires_at: OffsetDateTime) -> &Self {
			self.outcomes.lock().push_back(Ok(IssuedToken::new(value, expires_at)));

			self
		}

		/// Queues a failed issuance.
		pub fn push_failure(&self, reason: &str) -> &Self {
			self.outcomes
				.lock()
				.push_back(Err(IssuerError::Denied { reason: reason.into(), status: Some(401) }));

			self
		}

		/// Number of fetches observed so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl CredentialSource for ScriptedSource {
		fn fetch_token<'a>(&'a self, _scopes: &'a ScopeSet) -> SourceFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				if let Some(gate) = &self.gate {
					gate.acquire().await.expect("Test gate should stay open.").forget();
				}

				self.outcomes.lock().pop_front().unwrap_or_else(|| {
					Err(IssuerError::Unexpected {
						message: "Scripted source ran out of outcomes.".into(),
						status: None,
					})
				})
			})
		}
	}

	/// Fixed instant used as `t0` across scenario tests.
	pub fn t0() -> OffsetDateTime {
		time::macros::datetime!(2025-01-01 00:00 UTC)
	}

	/// Scope set used by tests that do not care about scope contents.
	pub fn test_scopes() -> ScopeSet {
		ScopeSet::new(["api://relay-backend/.default"]).expect("Test scope should be valid.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use color_eyre as _;
#[cfg(test)] use {httpmock as _, tower as _};
