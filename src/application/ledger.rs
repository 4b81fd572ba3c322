use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    compute_balance, operations_on, summarize, Cents, Operation, StatementSummary,
};
use crate::storage::CustomerHandle;

use super::{Clock, Config, SystemClock};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Amount must be positive, got {0} cents")]
    InvalidAmount(Cents),

    #[error("Insufficient funds: balance {balance}, required {requested}")]
    InsufficientFunds { balance: Cents, requested: Cents },
}

/// Statement operations for a single resolved customer.
///
/// Every method locks the customer record once, so a balance check and the
/// append that depends on it are never interleaved with another writer.
#[derive(Clone)]
pub struct LedgerService {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl LedgerService {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            offset: config.utc_offset,
        }
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current balance, recomputed from the full statement.
    pub fn balance(&self, customer: &CustomerHandle) -> Cents {
        compute_balance(&customer.lock().statement)
    }

    /// Append a credit.
    pub fn deposit(
        &self,
        customer: &CustomerHandle,
        amount: Cents,
        description: Option<String>,
    ) -> Result<Operation, LedgerError> {
        if amount <= 0 {
            warn!(cpf = %customer.tax_id(), amount, "rejected deposit with non-positive amount");
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut record = customer.lock();
        if compute_balance(&record.statement).checked_add(amount).is_none() {
            warn!(cpf = %customer.tax_id(), amount, "rejected deposit that would overflow balance");
            return Err(LedgerError::InvalidAmount(amount));
        }

        let operation = with_optional_description(Operation::credit(amount, self.clock.now()), description);
        record.statement.push(operation.clone());

        info!(cpf = %customer.tax_id(), amount, "deposit recorded");
        Ok(operation)
    }

    /// Append a debit if the balance covers it.
    pub fn withdraw(
        &self,
        customer: &CustomerHandle,
        amount: Cents,
        description: Option<String>,
    ) -> Result<Operation, LedgerError> {
        if amount <= 0 {
            warn!(cpf = %customer.tax_id(), amount, "rejected withdrawal with non-positive amount");
            return Err(LedgerError::InvalidAmount(amount));
        }

        let mut record = customer.lock();
        let balance = compute_balance(&record.statement);
        if balance < amount {
            warn!(cpf = %customer.tax_id(), balance, amount, "rejected withdrawal: insufficient funds");
            return Err(LedgerError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }

        let operation = with_optional_description(Operation::debit(amount, self.clock.now()), description);
        record.statement.push(operation.clone());

        info!(cpf = %customer.tax_id(), amount, "withdrawal recorded");
        Ok(operation)
    }

    /// Full statement in chronological order.
    pub fn statement(&self, customer: &CustomerHandle) -> Vec<Operation> {
        customer.lock().statement.clone()
    }

    /// Operations whose timestamp falls on `date` in the configured offset.
    pub fn statement_on(&self, customer: &CustomerHandle, date: NaiveDate) -> Vec<Operation> {
        let selected = operations_on(&customer.lock().statement, date, &self.offset);
        debug!(cpf = %customer.tax_id(), %date, matched = selected.len(), "filtered statement by date");
        selected
    }

    pub fn summary(&self, customer: &CustomerHandle) -> StatementSummary {
        summarize(&customer.lock().statement)
    }
}

fn with_optional_description(operation: Operation, description: Option<String>) -> Operation {
    match description {
        Some(desc) if !desc.trim().is_empty() => operation.with_description(desc),
        _ => operation,
    }
}
