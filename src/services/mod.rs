//! Business logic services

pub mod catalog;
pub mod dashboard;
pub mod ledger;
pub mod reservations;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub ledger: ledger::LedgerService,
    pub reservations: reservations::ReservationsService,
    pub dashboard: dashboard::DashboardService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            ledger: ledger::LedgerService::new(Arc::new(repository.clone()), config.loans.clone()),
            reservations: reservations::ReservationsService::new(repository.clone(), config.loans.clone()),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            repository,
        }
    }

    #[cfg(test)]
    pub fn with_ledger(self, ledger: ledger::LedgerService) -> Self {
        Self { ledger, ..self }
    }

    /// Check database connectivity
    pub async fn ping_database(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.repository.pool).await?;
        Ok(())
    }
}
