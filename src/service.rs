//! Inbound HTTP surfaces: the front relay and the demo backend.
//!
//! The front handler is the boundary between the typed error taxonomy and external clients.
//! Backend status failures are reported descriptively; every other failure is logged in full
//! and answered with a fixed `502` body so no internal error text leaves the process.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{_prelude::*, clock::Clock, requester::AuthenticatedRequester};

/// Body returned to clients when the relay fails for a reason other than a backend status.
pub const GENERIC_FAILURE_BODY: &str = "Backend request failed.";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Builds the front router: `GET /` forwards to the backend through `requester`.
pub fn front_router(requester: AuthenticatedRequester) -> Router {
	Router::new().route("/", get(relay)).with_state(Arc::new(requester))
}

/// Builds the backend router: `GET /` greets with the current UTC time from `clock`.
pub fn backend_router(clock: Arc<dyn Clock>) -> Router {
	Router::new().route("/", get(greet)).with_state(clock)
}

/// Translates a relay outcome into the response sent to external clients.
pub fn relay_response(result: Result<String>, use_auth: bool) -> Response {
	match result {
		Ok(body) =>
			format!("Front end says that useAuth={use_auth} and backend says: {body}").into_response(),
		Err(Error::Upstream { status, reason }) =>
			format!("Backend returned {status} - {reason}. UseAuth={use_auth}.").into_response(),
		Err(err) => {
			tracing::error!(error = %err, details = ?err, use_auth, "relay to backend failed");

			(StatusCode::BAD_GATEWAY, GENERIC_FAILURE_BODY).into_response()
		},
	}
}

/// Binds `addr` and serves `router` until Ctrl-C.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
	let listener = tokio::net::TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "listening");

	axum::serve(listener, router)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;

			tracing::info!("shutdown signal received");
		})
		.await
}

async fn relay(State(requester): State<Arc<AuthenticatedRequester>>) -> Response {
	relay_response(requester.fetch().await, requester.uses_auth())
}

async fn greet(State(clock): State<Arc<dyn Clock>>) -> String {
	let now = clock.now();
	let stamp = now.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| now.to_string());

	format!("Backend says hi at {stamp} (UTC)")
}
