// std
use std::sync::Arc;
// self
use auth_gateway::{
	auth::{CredentialKey, CredentialPair, TokenSecret},
	store::{CredentialStore, MemoryStore},
};

fn as_dyn(store: &Arc<MemoryStore>) -> Arc<dyn CredentialStore> {
	store.clone()
}

#[tokio::test]
async fn set_get_and_remove_round_trip() {
	let store = MemoryStore::default();

	assert_eq!(store.get(CredentialKey::Access).await.expect("Read should succeed."), None);

	store
		.set(CredentialKey::Access, TokenSecret::new("tok1"))
		.await
		.expect("Writing the access token should succeed.");

	let fetched = store
		.get(CredentialKey::Access)
		.await
		.expect("Read should succeed.")
		.expect("Access token should be present after set.");

	assert_eq!(fetched.expose(), "tok1");
	assert_eq!(store.get(CredentialKey::Refresh).await.expect("Read should succeed."), None);

	store.remove(CredentialKey::Access).await.expect("Removing the access token should succeed.");
	store.remove(CredentialKey::Access).await.expect("Removing a missing key should succeed.");

	assert!(store.is_empty());
}

#[tokio::test]
async fn set_replaces_previous_value() {
	let store = MemoryStore::with_credentials(CredentialPair::new("tok1", "ref1"));

	store
		.set(CredentialKey::Access, TokenSecret::new("tok2"))
		.await
		.expect("Replacing the access token should succeed.");

	assert_eq!(store.peek(CredentialKey::Access), Some(TokenSecret::new("tok2")));
	assert_eq!(store.peek(CredentialKey::Refresh), Some(TokenSecret::new("ref1")));
	assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn save_pair_and_clear_cover_both_keys() {
	let backend = Arc::new(MemoryStore::default());
	let store = as_dyn(&backend);

	store
		.save_pair(CredentialPair::new("tok1", "ref1"))
		.await
		.expect("Saving the pair should succeed.");

	assert_eq!(backend.len(), 2);

	store.clear().await.expect("Clearing the store should succeed.");

	assert!(backend.is_empty());
}

#[tokio::test]
async fn clones_share_state() {
	let store = MemoryStore::default();
	let clone = store.clone();

	clone
		.set(CredentialKey::Refresh, TokenSecret::new("ref1"))
		.await
		.expect("Writing through the clone should succeed.");

	assert_eq!(store.peek(CredentialKey::Refresh), Some(TokenSecret::new("ref1")));
}
