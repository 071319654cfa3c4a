pub mod client;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::middleware::auth::AuthKeys;
use crate::services::{
    upload_service::ProfileUploads, user_service::UserService, user_store::UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub auth: AuthKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStore>, uploads: ProfileUploads, auth: AuthKeys) -> Self {
        Self {
            user_service: UserService::new(store, uploads),
            auth,
        }
    }
}
