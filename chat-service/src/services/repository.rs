//! Table-level helpers over the data store: users, chat rooms and messages,
//! and login lookups.

use super::store::{DataStore, Query, StoreError};
use serde_json::Value;
use std::sync::Arc;

pub const USERS: &str = "users";
pub const MESSAGES: &str = "messages";
pub const ROOMS: &str = "rooms";

/// User records.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DataStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, user: &Value) -> Result<Vec<Value>, StoreError> {
        self.store.insert(USERS, user).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Value, StoreError> {
        self.store.select_single(USERS, &Query::new().eq("id", id)).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<Value>, StoreError> {
        self.store.select(USERS, &Query::new()).await
    }

    pub async fn update_user(&self, id: &str, updates: &Value) -> Result<Vec<Value>, StoreError> {
        self.store
            .update(USERS, &Query::new().eq("id", id), updates)
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(USERS, &Query::new().eq("id", id)).await
    }
}

/// Chat rooms and their messages.
#[derive(Clone)]
pub struct ChatRepository {
    store: Arc<dyn DataStore>,
}

impl ChatRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn create_message(&self, message: &Value) -> Result<Vec<Value>, StoreError> {
        self.store.insert(MESSAGES, message).await
    }

    /// Oldest first.
    pub async fn get_messages_by_room_id(&self, room_id: &str) -> Result<Vec<Value>, StoreError> {
        let query = Query::new().eq("room_id", room_id).order("created_at", true);
        self.store.select(MESSAGES, &query).await
    }

    pub async fn create_room(&self, room: &Value) -> Result<Vec<Value>, StoreError> {
        self.store.insert(ROOMS, room).await
    }

    /// Most recently updated first.
    pub async fn get_user_rooms(&self, user_id: &str) -> Result<Vec<Value>, StoreError> {
        let query = Query::new().eq("user_id", user_id).order("updated_at", false);
        self.store.select(ROOMS, &query).await
    }
}

/// Credential lookups against the users table.
#[derive(Clone)]
pub struct AuthRepository {
    store: Arc<dyn DataStore>,
}

impl AuthRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Value, StoreError> {
        self.store
            .select_single(USERS, &Query::new().eq("email", email))
            .await
    }

    /// The row whose email and password columns both match.
    pub async fn validate_login(&self, email: &str, password: &str) -> Result<Value, StoreError> {
        let query = Query::new().eq("email", email).eq("password", password);
        self.store.select_single(USERS, &query).await
    }
}
