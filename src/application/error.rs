use thiserror::Error;

use crate::domain::{format_cents, Cents};
use crate::storage::StoreError;

use super::LedgerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    AccountNotFound(String),

    #[error("Customer already exists: {0}")]
    DuplicateAccount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: balance {}, required {}", money(.balance), money(.required))]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(tax_id) => AppError::AccountNotFound(tax_id),
            StoreError::DuplicateAccount(tax_id) => AppError::DuplicateAccount(tax_id.to_string()),
            other @ (StoreError::InvalidTaxId | StoreError::InvalidName) => {
                AppError::InvalidInput(other.to_string())
            }
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(amount) => AppError::InvalidAmount(format!(
                "{} is not a valid amount, it must be positive and keep the balance in range",
                format_cents(amount)
            )),
            LedgerError::InsufficientFunds { balance, requested } => AppError::InsufficientFunds {
                balance,
                required: requested,
            },
        }
    }
}
