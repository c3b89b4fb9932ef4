//! Business logic services

pub mod catalog;
pub mod loans;
pub mod redis;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    config::{LoansConfig, RedisConfig, UsersConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    pub sessions: sessions::SessionsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        users_config: UsersConfig,
        loans_config: LoansConfig,
        redis_config: &RedisConfig,
        session_store: Arc<dyn sessions::SessionStore>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), loans_config),
            users: users::UsersService::new(repository.clone(), users_config),
            sessions: sessions::SessionsService::new(session_store, redis_config.session_ttl_seconds),
            repository,
        }
    }
}

/// Current calendar date used for due-date arithmetic
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
