//! Session-expired handling contract.
//!
//! When credentials can no longer be renewed the gateway wipes the local store and hands a
//! [`SessionExpired`] event to the injected [`SessionExpiredHandler`]. The handler owns the
//! user-facing side effects (a notification, a redirect to the login screen); the gateway fires
//! it and moves on without waiting for any result.

// self
use crate::{_prelude::*, error::RenewalError};

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryReason {
	/// An auth failure arrived while no refresh token was stored.
	MissingRefreshToken,
	/// The renewal call this request triggered failed.
	RenewalFailed,
	/// The request was waiting on a renewal owned by another request, and that renewal failed.
	RenewalFailedWhileQueued,
}
impl ExpiryReason {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExpiryReason::MissingRefreshToken => "missing_refresh_token",
			ExpiryReason::RenewalFailed => "renewal_failed",
			ExpiryReason::RenewalFailedWhileQueued => "renewal_failed_while_queued",
		}
	}
}
impl Display for ExpiryReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Event handed to [`SessionExpiredHandler`] on every terminal credential failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionExpired {
	/// Why the session ended.
	pub reason: ExpiryReason,
	/// Whether the user should be told before being redirected.
	///
	/// Only the request that owned a failed renewal sets this, so one renewal wave produces a
	/// single notification no matter how many requests were queued behind it.
	pub notify_user: bool,
	/// Renewal failure behind the expiry, when a renewal was attempted.
	pub error: Option<RenewalError>,
	/// Instant the gateway observed the expiry.
	pub at: OffsetDateTime,
}
impl SessionExpired {
	/// Creates an event stamped with the current time.
	pub fn new(reason: ExpiryReason, error: Option<RenewalError>) -> Self {
		Self {
			reason,
			notify_user: matches!(reason, ExpiryReason::RenewalFailed),
			error,
			at: OffsetDateTime::now_utc(),
		}
	}
}

/// Navigation/notification capability invoked when a session cannot be renewed.
pub trait SessionExpiredHandler
where
	Self: Send + Sync,
{
	/// Reacts to an expired session. Must not block; the gateway does not wait on it.
	fn on_session_expired(&self, event: &SessionExpired);
}

/// Handler that only records the expiry through the `tracing` feature (a no-op without it).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSessionHandler;
impl SessionExpiredHandler for LogSessionHandler {
	fn on_session_expired(&self, event: &SessionExpired) {
		#[cfg(feature = "tracing")]
		{
			tracing::warn!(
				reason = event.reason.as_str(),
				notify_user = event.notify_user,
				error = event.error.as_ref().map(tracing::field::display),
				"session expired; login required"
			);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = event;
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_owned_renewal_failures_notify() {
		assert!(SessionExpired::new(ExpiryReason::RenewalFailed, None).notify_user);
		assert!(!SessionExpired::new(ExpiryReason::MissingRefreshToken, None).notify_user);
		assert!(
			!SessionExpired::new(
				ExpiryReason::RenewalFailedWhileQueued,
				Some(RenewalError::Abandoned)
			)
			.notify_user
		);
	}

	#[test]
	fn log_handler_accepts_events() {
		LogSessionHandler.on_session_expired(&SessionExpired::new(
			ExpiryReason::RenewalFailed,
			Some(RenewalError::Rejected { status: 401, message: "token_not_valid".into() }),
		));
	}
}
