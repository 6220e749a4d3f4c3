//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialPair, TokenSecret},
	store::{CredentialStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKey, TokenSecret>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Creates a store pre-seeded with a credential pair.
	pub fn with_credentials(pair: CredentialPair) -> Self {
		let store = Self::default();

		{
			let mut guard = store.0.write();

			guard.insert(CredentialKey::Access, pair.access);
			guard.insert(CredentialKey::Refresh, pair.refresh);
		}

		store
	}

	/// Returns the credential under `key` without going through the async contract.
	pub fn peek(&self, key: CredentialKey) -> Option<TokenSecret> {
		self.0.read().get(&key).cloned()
	}

	/// Number of stored credentials.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether the store holds no credentials.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, value);

			Ok(())
		})
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}
}
