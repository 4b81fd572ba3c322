use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use tracing::{debug, info, warn};

use crate::domain::{Cents, Customer, Operation, StatementSummary};
use crate::storage::{AccountStore, CustomerHandle};

use super::{AppError, Clock, Config, LedgerService};

/// Application service providing the account operations, keyed by tax id.
/// This is the primary interface for any client (CLI session, API, tests).
///
/// Every operation except `register` starts with [`AccountService::resolve`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<AccountStore>,
    ledger: LedgerService,
}

impl AccountService {
    /// Create a service over an existing store.
    pub fn new(store: Arc<AccountStore>, config: &Config) -> Self {
        Self {
            store,
            ledger: LedgerService::new(config),
        }
    }

    /// Create a service whose operation timestamps come from `clock`.
    pub fn with_clock(store: Arc<AccountStore>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ledger: LedgerService::with_clock(config, clock),
        }
    }

    /// A service over a fresh, empty store.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(AccountStore::new()), config)
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.ledger.utc_offset()
    }

    /// Look up a customer by tax id. Shared by every entry point.
    pub fn resolve(&self, cpf: &str) -> Result<CustomerHandle, AppError> {
        self.store.resolve(cpf).map_err(|err| {
            warn!(cpf = cpf.trim(), "customer not found");
            AppError::from(err)
        })
    }

    // ========================
    // Account operations
    // ========================

    /// Register a new account.
    pub fn register(&self, cpf: &str, name: &str) -> Result<Customer, AppError> {
        let handle = self.store.create(cpf, name).map_err(|err| {
            warn!(cpf = cpf.trim(), error = %err, "account registration rejected");
            AppError::from(err)
        })?;

        info!(cpf = %handle.tax_id(), id = %handle.id(), "account registered");
        Ok(handle.snapshot())
    }

    /// Fetch the full account record, statement included.
    pub fn account(&self, cpf: &str) -> Result<Customer, AppError> {
        Ok(self.resolve(cpf)?.snapshot())
    }

    /// Change the display name of an account.
    pub fn rename(&self, cpf: &str, name: &str) -> Result<Customer, AppError> {
        let handle = self.resolve(cpf)?;
        self.store.rename(&handle, name)?;

        info!(cpf = %handle.tax_id(), "account renamed");
        Ok(handle.snapshot())
    }

    /// Delete an account and return the accounts that remain.
    pub fn delete(&self, cpf: &str) -> Result<Vec<Customer>, AppError> {
        let handle = self.resolve(cpf)?;
        let removed = self.store.remove(&handle)?;

        info!(
            cpf = %removed.tax_id,
            id = %removed.id,
            operations = removed.statement.len(),
            "account deleted"
        );
        Ok(self.store.list())
    }

    /// List all accounts in registration order.
    pub fn accounts(&self) -> Vec<Customer> {
        self.store.list()
    }

    // ========================
    // Statement operations
    // ========================
    //
    // Appends run inside `AccountStore::while_registered`, so an operation
    // that reports success is never written to a deleted account.

    pub fn deposit(
        &self,
        cpf: &str,
        amount: Cents,
        description: Option<String>,
    ) -> Result<Operation, AppError> {
        let handle = self.resolve(cpf)?;
        let operation = self
            .store
            .while_registered(&handle, |handle| self.ledger.deposit(handle, amount, description))??;
        Ok(operation)
    }

    pub fn withdraw(
        &self,
        cpf: &str,
        amount: Cents,
        description: Option<String>,
    ) -> Result<Operation, AppError> {
        let handle = self.resolve(cpf)?;
        let operation = self
            .store
            .while_registered(&handle, |handle| self.ledger.withdraw(handle, amount, description))??;
        Ok(operation)
    }

    pub fn balance(&self, cpf: &str) -> Result<Cents, AppError> {
        let handle = self.resolve(cpf)?;
        let balance = self.ledger.balance(&handle);
        debug!(cpf = %handle.tax_id(), balance, "balance computed");
        Ok(balance)
    }

    pub fn statement(&self, cpf: &str) -> Result<Vec<Operation>, AppError> {
        let handle = self.resolve(cpf)?;
        Ok(self.ledger.statement(&handle))
    }

    /// Operations recorded on a given calendar day.
    pub fn statement_on(&self, cpf: &str, date: NaiveDate) -> Result<Vec<Operation>, AppError> {
        let handle = self.resolve(cpf)?;
        Ok(self.ledger.statement_on(&handle, date))
    }

    pub fn summary(&self, cpf: &str) -> Result<StatementSummary, AppError> {
        let handle = self.resolve(cpf)?;
        Ok(self.ledger.summary(&handle))
    }
}
