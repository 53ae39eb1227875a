//! HTTP adapters for the vendor services behind the core capability traits.
//!
//! - [`GeminiCompletionClient`]: [`TextCompletion`](mentor_core::completion::TextCompletion)
//! - [`FirestoreStore`]: [`DocumentStore`](mentor_core::store::DocumentStore)
//! - [`FirebaseAuthClient`]: [`AuthBackend`](mentor_core::identity::AuthBackend)

pub mod firebase_auth;
pub mod firestore_store;
pub mod firestore_value;
pub mod gemini_completion_client;

pub use firebase_auth::FirebaseAuthClient;
pub use firestore_store::FirestoreStore;
pub use gemini_completion_client::GeminiCompletionClient;
