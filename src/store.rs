//! Credential storage contract and built-in store implementations.
//!
//! Stores are plain key-value maps over [`CredentialKey`]. They are the source of truth for the
//! gateway: the access token is read fresh before every request and renewal writes straight back
//! into the store, so the only guarantee required of a backend is read-your-writes within one
//! process.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialPair, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the credential stored under `key`, if present.
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the credential stored under `key`.
	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes the credential stored under `key`; removing a missing key is not an error.
	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()>;
}
impl dyn CredentialStore {
	/// Persists both halves of a freshly issued credential pair.
	pub async fn save_pair(&self, pair: CredentialPair) -> Result<(), StoreError> {
		self.set(CredentialKey::Access, pair.access).await?;
		self.set(CredentialKey::Refresh, pair.refresh).await
	}

	/// Removes every credential the gateway manages.
	pub async fn clear(&self) -> Result<(), StoreError> {
		for key in CredentialKey::ALL {
			self.remove(key).await?;
		}

		Ok(())
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_gateway_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let gateway_error: Error = store_error.clone().into();

		assert!(matches!(gateway_error, Error::Storage(_)));
		assert!(gateway_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&gateway_error)
			.expect("Gateway error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[tokio::test]
	async fn save_pair_and_clear_touch_both_keys() {
		let backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = backend.clone();

		store
			.save_pair(CredentialPair::new("access-1", "refresh-1"))
			.await
			.expect("Saving a credential pair should succeed.");

		assert_eq!(backend.len(), 2);

		store.clear().await.expect("Clearing the store should succeed.");

		assert!(backend.is_empty());
	}
}
