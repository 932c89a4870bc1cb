pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod store;

pub use repository::{AuthRepository, ChatRepository, UserRepository};
pub use store::{DataStore, MockDataStore, Query, StoreError, SupabaseStore};
