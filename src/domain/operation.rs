use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Money entering the account (deposit)
    Credit,
    /// Money leaving the account (withdrawal)
    Debit,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Credit => "credit",
            OperationKind::Debit => "debit",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single entry in a customer's statement.
/// Operations are immutable once appended; a statement only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Amount in cents (always positive)
    pub amount: Cents,
    pub description: Option<String>,
    /// When the operation was appended to the statement
    pub created_at: DateTime<Utc>,
}

impl Operation {
    pub fn credit(amount: Cents, created_at: DateTime<Utc>) -> Self {
        Self::new(OperationKind::Credit, amount, created_at)
    }

    pub fn debit(amount: Cents, created_at: DateTime<Utc>) -> Self {
        Self::new(OperationKind::Debit, amount, created_at)
    }

    fn new(kind: OperationKind, amount: Cents, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount,
            description: None,
            created_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The effect of this operation on the balance.
    pub fn signed_amount(&self) -> Cents {
        match self.kind {
            OperationKind::Credit => self.amount,
            OperationKind::Debit => -self.amount,
        }
    }
}
