//! Credential renewal with a single shared call per wave of auth failures.
//!
//! The first request to hit an auth failure while no renewal is running becomes the wave's
//! leader: it claims the [`RenewalCoordinator`], calls the renewal endpoint with the stored
//! refresh token, and settles the outcome for everyone. Requests that fail while the leader is
//! still working park on a [`PendingRenewal`] instead of issuing their own call. Settling drains
//! the queue and clears the in-progress flag under one lock, and the leader's [`RenewalGuard`]
//! settles on drop, so no exit path can leave the coordinator stuck in the renewing state.

mod metrics;

pub use metrics::RenewalMetrics;

// std
use std::mem;
// crates.io
use ::http::Method;
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	error::RenewalError,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{ExpiryReason, SessionExpired},
};

/// Outcome broadcast to every request in a renewal wave.
pub type RenewalOutcome = Result<TokenSecret, RenewalError>;

const BODY_PREVIEW_CHARS: usize = 256;

/// Owns the in-progress flag and the queue of requests waiting on the current renewal.
#[derive(Debug, Default)]
pub struct RenewalCoordinator(Mutex<RenewalState>);
impl RenewalCoordinator {
	/// Joins the current wave: claims leadership if no renewal is running, queues otherwise.
	pub fn join(&self) -> RenewalTicket<'_> {
		let mut state = self.0.lock();

		if state.in_progress {
			let (tx, rx) = oneshot::channel();

			state.pending.push(tx);

			RenewalTicket::Follower(PendingRenewal(rx))
		} else {
			state.in_progress = true;

			RenewalTicket::Leader(RenewalGuard { coordinator: self, settled: false })
		}
	}

	/// Whether a renewal is in flight.
	pub fn is_renewing(&self) -> bool {
		self.0.lock().in_progress
	}

	/// Number of requests waiting on the in-flight renewal.
	pub fn queued(&self) -> usize {
		self.0.lock().pending.len()
	}

	fn settle(&self, outcome: RenewalOutcome) -> usize {
		let pending = {
			let mut state = self.0.lock();

			state.in_progress = false;

			mem::take(&mut state.pending)
		};
		let released = pending.len();

		for waiter in pending {
			// A waiter whose future was dropped has nobody left to notify.
			let _ = waiter.send(outcome.clone());
		}

		released
	}
}

#[derive(Debug, Default)]
struct RenewalState {
	in_progress: bool,
	pending: Vec<oneshot::Sender<RenewalOutcome>>,
}

/// Role handed out by [`RenewalCoordinator::join`].
#[derive(Debug)]
pub enum RenewalTicket<'a> {
	/// Caller owns the renewal and must settle it.
	Leader(RenewalGuard<'a>),
	/// Caller waits for the leader's outcome.
	Follower(PendingRenewal),
}

/// Scoped ownership of the in-flight renewal.
///
/// Dropping an unsettled guard releases the coordinator and rejects every waiter with
/// [`RenewalError::Abandoned`].
#[derive(Debug)]
pub struct RenewalGuard<'a> {
	coordinator: &'a RenewalCoordinator,
	settled: bool,
}
impl RenewalGuard<'_> {
	/// Resolves every waiter with `token`; returns how many were released.
	pub fn resolve(self, token: TokenSecret) -> usize {
		self.finish(Ok(token))
	}

	/// Rejects every waiter with `error`; returns how many were released.
	pub fn reject(self, error: RenewalError) -> usize {
		self.finish(Err(error))
	}

	fn finish(mut self, outcome: RenewalOutcome) -> usize {
		self.settled = true;

		self.coordinator.settle(outcome)
	}
}
impl Drop for RenewalGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(Err(RenewalError::Abandoned));
		}
	}
}

/// A request parked behind a renewal owned by another request.
#[derive(Debug)]
pub struct PendingRenewal(oneshot::Receiver<RenewalOutcome>);
impl PendingRenewal {
	/// Waits for the leader to settle the wave.
	pub async fn wait(self) -> RenewalOutcome {
		self.0.await.unwrap_or(Err(RenewalError::Abandoned))
	}
}

#[derive(Serialize)]
struct RenewalRequest<'a> {
	refresh: &'a str,
}

#[derive(Deserialize)]
struct RenewalResponse {
	access: TokenSecret,
	#[serde(default)]
	refresh: Option<TokenSecret>,
}

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Renews the credential for a request that just failed authentication, then replays it.
	///
	/// `original` is surfaced unchanged when no refresh token is stored.
	pub(crate) async fn coordinate_renewal(
		&self,
		mut request: ApiRequest,
		original: Error,
	) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Renewal;

		let token = match self.renewal.join() {
			RenewalTicket::Follower(pending) => {
				self.renewal_metrics.record_queued();
				obs::record_flow_outcome(KIND, FlowOutcome::Queued);

				match pending.wait().await {
					Ok(token) => token,
					Err(RenewalError::Abandoned) => return Err(RenewalError::Abandoned.into()),
					Err(err) => {
						self.expire_session(SessionExpired::new(
							ExpiryReason::RenewalFailedWhileQueued,
							Some(err.clone()),
						))
						.await;

						return Err(err.into());
					},
				}
			},
			RenewalTicket::Leader(guard) => {
				let span = FlowSpan::new(KIND, "renew");
				let outcome = span.instrument(self.lead_renewal(guard)).await;

				span.finish(&outcome);

				match outcome {
					Ok(token) => token,
					Err(RenewalError::MissingRefreshToken) => return Err(original),
					Err(err) => return Err(err.into()),
				}
			},
		};

		request.set_bearer(&token)?;

		self.dispatch(request).await
	}

	async fn lead_renewal(&self, guard: RenewalGuard<'_>) -> RenewalOutcome {
		self.renewal_metrics.record_attempt();

		let refresh = match self.store.get(CredentialKey::Refresh).await {
			Ok(Some(refresh)) if !refresh.is_empty() => refresh,
			Ok(_) => {
				let err = RenewalError::MissingRefreshToken;

				obs::record_wave_release(guard.reject(err.clone()));
				self.renewal_metrics.record_failure();
				self.expire_session(SessionExpired::new(ExpiryReason::MissingRefreshToken, None))
					.await;

				return Err(err);
			},
			Err(e) => return Err(self.fail_renewal(guard, RenewalError::Storage(e)).await),
		};

		match self.renew(&refresh).await {
			Ok(access) => {
				obs::record_wave_release(guard.resolve(access.clone()));
				self.renewal_metrics.record_success();

				Ok(access)
			},
			Err(err) => Err(self.fail_renewal(guard, err).await),
		}
	}

	async fn fail_renewal(&self, guard: RenewalGuard<'_>, err: RenewalError) -> RenewalError {
		obs::record_wave_release(guard.reject(err.clone()));
		self.renewal_metrics.record_failure();
		self.expire_session(SessionExpired::new(ExpiryReason::RenewalFailed, Some(err.clone())))
			.await;

		err
	}

	/// Calls the renewal endpoint and persists the renewed credential.
	///
	/// The call bypasses [`Gateway::attach_credential`]; the rejected access token never
	/// accompanies it.
	async fn renew(&self, refresh: &TokenSecret) -> RenewalOutcome {
		let url = self.config.renewal_url.clone();
		let request = ApiRequest::new(Method::POST, url)
			.json(&RenewalRequest { refresh: refresh.expose() })
			.map_err(|e| RenewalError::Request { message: e.to_string() })?;
		let response = self.transport.execute(request).await?;

		if !response.is_success() {
			return Err(RenewalError::Rejected {
				status: response.status.as_u16(),
				message: response.text().chars().take(BODY_PREVIEW_CHARS).collect(),
			});
		}

		let mut de = serde_json::Deserializer::from_slice(&response.body);
		let RenewalResponse { access, refresh: rotated } =
			serde_path_to_error::deserialize(&mut de)
				.map_err(|e| RenewalError::MalformedResponse { message: e.to_string() })?;

		if access.is_empty() {
			return Err(RenewalError::MalformedResponse {
				message: "access token is empty".into(),
			});
		}

		self.store
			.set(CredentialKey::Access, access.clone())
			.await
			.map_err(RenewalError::Storage)?;

		if let Some(rotated) = rotated.filter(|secret| !secret.is_empty()) {
			self.store.set(CredentialKey::Refresh, rotated).await.map_err(RenewalError::Storage)?;
		}

		Ok(access)
	}

	/// Wipes local credentials and hands `event` to the session handler.
	async fn expire_session(&self, event: SessionExpired) {
		// An empty refresh token also takes the missing-token path, so both keys go.
		if let Err(e) = self.store.clear().await {
			#[cfg(feature = "tracing")]
			tracing::warn!(error = %e, "failed to clear credentials after session expiry");
			#[cfg(not(feature = "tracing"))]
			let _ = e;
		}

		self.session_handler.on_session_expired(&event);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn leader(ticket: RenewalTicket<'_>) -> RenewalGuard<'_> {
		match ticket {
			RenewalTicket::Leader(guard) => guard,
			RenewalTicket::Follower(_) => panic!("Expected to lead the renewal."),
		}
	}

	fn follower(ticket: RenewalTicket<'_>) -> PendingRenewal {
		match ticket {
			RenewalTicket::Follower(pending) => pending,
			RenewalTicket::Leader(_) => panic!("Expected to queue behind the renewal."),
		}
	}

	#[tokio::test]
	async fn resolve_hands_the_token_to_every_waiter() {
		let coordinator = RenewalCoordinator::default();
		let guard = leader(coordinator.join());
		let first = follower(coordinator.join());
		let second = follower(coordinator.join());

		assert!(coordinator.is_renewing());
		assert_eq!(coordinator.queued(), 2);
		assert_eq!(guard.resolve(TokenSecret::new("tok2")), 2);
		assert!(!coordinator.is_renewing());
		assert_eq!(coordinator.queued(), 0);

		for pending in [first, second] {
			let token = pending.wait().await.expect("Waiter should receive the renewed token.");

			assert_eq!(token.expose(), "tok2");
		}
	}

	#[tokio::test]
	async fn reject_broadcasts_the_same_error() {
		let coordinator = RenewalCoordinator::default();
		let guard = leader(coordinator.join());
		let pending = follower(coordinator.join());
		let err = RenewalError::Rejected { status: 401, message: "token_not_valid".into() };

		assert_eq!(guard.reject(err.clone()), 1);
		assert_eq!(pending.wait().await, Err(err));
		assert!(!coordinator.is_renewing());
	}

	#[tokio::test]
	async fn dropped_guard_releases_flag_and_abandons_waiters() {
		let coordinator = RenewalCoordinator::default();
		let pending = {
			let _guard = leader(coordinator.join());

			follower(coordinator.join())
		};

		assert!(!coordinator.is_renewing());
		assert_eq!(pending.wait().await, Err(RenewalError::Abandoned));

		// The next failure starts a fresh wave.
		let _guard = leader(coordinator.join());
	}
}
