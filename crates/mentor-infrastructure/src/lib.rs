//! Infrastructure layer: persistence with mirror fallback, auth session and configuration.

pub mod auth_session;
pub mod config_service;
pub mod entity_repository;
pub mod memory_store;
pub mod mirror_store;
pub mod paths;
pub mod persistence_gateway;

pub use crate::auth_session::{AuthSession, InMemoryAuthBackend, StaticIdentity};
pub use crate::config_service::ConfigService;
pub use crate::entity_repository::EntityRepository;
pub use crate::memory_store::{InMemoryDocumentStore, StoreOp};
pub use crate::mirror_store::MirrorStore;
pub use crate::paths::MentorPaths;
pub use crate::persistence_gateway::PersistenceGateway;
