//! Logs in against a mock backend, lets the access token expire, and shows the gateway renewing
//! it behind a burst of concurrent requests with a single refresh call.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use auth_gateway::{
	config::GatewayConfig,
	gateway::Gateway,
	session::{SessionExpired, SessionExpiredHandler},
	store::{CredentialStore, MemoryStore},
};

struct RedirectToLogin;
impl SessionExpiredHandler for RedirectToLogin {
	fn on_session_expired(&self, event: &SessionExpired) {
		println!("Session expired ({}); redirecting to the login page.", event.reason);
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/users/login/");
			then.status(200).header("content-type", "application/json").body(
				"{\"access\":\"expired-access\",\"refresh\":\"demo-refresh\",\"user\":{\"username\":\"demo\"}}",
			);
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/questions/")
				.header("authorization", "Bearer expired-access");
			then.status(401).body("{\"detail\":\"Given token not valid for any token type\"}");
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"fresh-access\"}")
				.delay(std::time::Duration::from_millis(200));
		})
		.await;
	let questions_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/questions/").header("authorization", "Bearer fresh-access");
			then.status(200).header("content-type", "application/json").body("{\"results\":[]}");
		})
		.await;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let config = GatewayConfig::builder(Url::parse(&server.url("/api/"))?).build()?;
	let gateway = Gateway::new(config, store, Arc::new(RedirectToLogin))?;
	let login = gateway.login("demo", "demo-password").await?;

	println!("Logged in as {}.", login.user["username"]);

	let requests = (0..4).map(|_| {
		let gateway = gateway.clone();

		tokio::spawn(async move { gateway.get("questions/").await })
	});

	for request in requests.collect::<Vec<_>>() {
		let response = request.await??;

		println!("Request completed with HTTP {}.", response.status);
	}

	println!(
		"Renewal attempts: {}, requests queued behind it: {}.",
		gateway.renewal_metrics.attempts(),
		gateway.renewal_metrics.queued()
	);

	login_mock.assert_async().await;
	expired_mock.assert_hits_async(4).await;
	refresh_mock.assert_hits_async(1).await;
	questions_mock.assert_hits_async(4).await;

	Ok(())
}
