//! Access/refresh credential pair and the keys it is persisted under.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Key under which a credential is persisted in a credential store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived credential attached to protected requests.
	#[serde(rename = "access_token")]
	Access,
	/// Long-lived credential used only to obtain a new access token.
	#[serde(rename = "refresh_token")]
	Refresh,
}
impl CredentialKey {
	/// Every key the gateway manages.
	pub const ALL: [CredentialKey; 2] = [CredentialKey::Access, CredentialKey::Refresh];

	/// Returns the stable storage label for the key.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKey::Access => "access_token",
			CredentialKey::Refresh => "refresh_token",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Access + refresh tokens issued together by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Access token.
	pub access: TokenSecret,
	/// Refresh token.
	pub refresh: TokenSecret,
}
impl CredentialPair {
	/// Builds a pair from raw token strings.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: TokenSecret::new(refresh) }
	}
}
