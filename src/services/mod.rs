//! Business logic services

pub mod auth;
pub mod catalog;
pub mod ledger;
pub mod loans;
pub mod simulation;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let ledger = ledger::LedgerService::new(repository.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(
                repository,
                ledger,
                simulation::LoanDates::from_config(&config.loans),
            ),
        }
    }
}
