//! Authenticated request gateway: attach bearer credentials, renew an expired access token once
//! per wave of concurrent failures, then replay every rejected request with the new credential.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers shared by integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::GatewayConfig,
		gateway::Gateway,
		http::ReqwestTransport,
		session::{SessionExpired, SessionExpiredHandler},
		store::{CredentialStore, MemoryStore},
	};

	/// Gateway type alias used by reqwest-backed integration tests.
	pub type ReqwestTestGateway = Gateway<ReqwestTransport>;

	/// Session handler double that records every expiry event it receives.
	#[derive(Debug, Default)]
	pub struct RecordingSessionHandler(Mutex<Vec<SessionExpired>>);
	impl RecordingSessionHandler {
		/// Returns a snapshot of the recorded events in arrival order.
		pub fn events(&self) -> Vec<SessionExpired> {
			self.0.lock().clone()
		}
	}
	impl SessionExpiredHandler for RecordingSessionHandler {
		fn on_session_expired(&self, event: &SessionExpired) {
			self.0.lock().push(event.clone());
		}
	}

	/// Builds a gateway config pointing at `base_url` with default endpoints.
	pub fn test_gateway_config(base_url: &str) -> GatewayConfig {
		GatewayConfig::builder(Url::parse(base_url).expect("Test base URL should parse."))
			.build()
			.expect("Test gateway config should build successfully.")
	}

	/// Constructs a [`Gateway`] backed by an in-memory store, a recording session handler,
	/// and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_gateway(
		base_url: &str,
	) -> (ReqwestTestGateway, Arc<MemoryStore>, Arc<RecordingSessionHandler>) {
		let config = test_gateway_config(base_url);
		let transport = ReqwestTransport::from_config(&config)
			.expect("Failed to build Reqwest transport for tests.");
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let handler = Arc::new(RecordingSessionHandler::default());
		let gateway = Gateway::with_transport(config, transport, store, handler.clone());

		(gateway, store_backend, handler)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
