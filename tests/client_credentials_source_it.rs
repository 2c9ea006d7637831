// crates.io
use httpmock::prelude::*;
use time::{Duration, macros::datetime};
// self
use bearer_relay::{
	auth::ScopeSet,
	cache::TokenCache,
	clock::ManualClock,
	config::{IssuerAuthStyle, IssuerConfig},
	error::{Error, IssuerError},
	oauth::ClientCredentialsSource,
	source::CredentialSource,
	url::Url,
};

const CLIENT_ID: &str = "front-service";
const CLIENT_SECRET: &str = "front-secret";
const SCOPE: &str = "api://relay-backend/.default";

fn issuer(server: &MockServer) -> IssuerConfig {
	IssuerConfig::new(
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully."),
		CLIENT_ID,
	)
	.with_client_secret(CLIENT_SECRET)
	.with_auth_style(IssuerAuthStyle::RequestBody)
}

fn scopes() -> ScopeSet {
	ScopeSet::new([SCOPE]).expect("Scope fixture should be valid.")
}

#[tokio::test]
async fn issued_token_expiry_is_anchored_to_the_clock() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=client_credentials")
				.body_includes("client_id=front-service");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"issued-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let now = datetime!(2025-01-01 12:00 UTC);
	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.")
		.with_clock(ManualClock::new(now));
	let issued = source.fetch_token(&scopes()).await.expect("Token request should succeed.");

	assert_eq!(issued.value, "issued-token");
	assert_eq!(issued.expires_at, now + Duration::hours(1));

	mock.assert_async().await;
}

#[tokio::test]
async fn issuer_denial_is_reported_with_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_client\",\"error_description\":\"bad secret\"}",
			);
		})
		.await;

	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.");
	let err = source.fetch_token(&scopes()).await.expect_err("Denied request should fail.");

	match err {
		IssuerError::Denied { reason, status } => {
			assert!(reason.contains("invalid_client"));
			assert_eq!(status, Some(400));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn malformed_issuer_response_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body("{\"token_type\":1}");
		})
		.await;

	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.");
	let err = source.fetch_token(&scopes()).await.expect_err("Malformed body should fail.");

	assert!(matches!(err, IssuerError::Malformed { .. }), "Unexpected error: {err:?}.");
}

#[tokio::test]
async fn missing_expiry_is_rejected() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"no-expiry\",\"token_type\":\"bearer\"}");
		})
		.await;

	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.");
	let err = source.fetch_token(&scopes()).await.expect_err("Missing expiry should fail.");

	assert!(matches!(err, IssuerError::MissingExpiry));
}

#[tokio::test]
async fn cache_over_issuer_fetches_once_for_repeated_reads() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"shared-token\",\"token_type\":\"bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.");
	let cache = TokenCache::new(source, scopes());
	let readers = (0..8).map(|_| {
		let cache = cache.clone();

		tokio::spawn(async move { cache.get_valid_token().await })
	});

	for reader in readers.collect::<Vec<_>>() {
		let token = reader
			.await
			.expect("Reader task should join.")
			.expect("Reader should receive a token.");

		assert_eq!(token.expose(), "shared-token");
	}

	mock.assert_calls_async(1).await;
	assert_eq!(cache.metrics().successes(), 1);
}

#[tokio::test]
async fn cache_surfaces_issuer_failure_without_caching() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"unauthorized_client\"}");
		})
		.await;

	let source = ClientCredentialsSource::from_config(&issuer(&server))
		.expect("Client credentials source should build.");
	let cache = TokenCache::new(source, scopes());
	let err = cache.get_valid_token().await.expect_err("Issuer failure should propagate.");

	assert!(matches!(err, Error::TokenIssuer(IssuerError::Denied { status: Some(401), .. })));
	assert!(cache.current().is_none());
}
