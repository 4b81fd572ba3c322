use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Operation;

pub type CustomerId = Uuid;

/// Tax identifier supplied by the account holder (a CPF in Brazil).
/// It is the lookup key for a customer and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxId(String);

impl TaxId {
    /// Parse a tax id, trimming surrounding whitespace.
    /// Returns None for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(rename = "cpf")]
    pub tax_id: TaxId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Chronological log of operations
    pub statement: Vec<Operation>,
}

impl Customer {
    pub fn new(tax_id: TaxId, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            tax_id,
            name,
            created_at: Utc::now(),
            statement: Vec::new(),
        }
    }
}
