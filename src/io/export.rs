use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::AccountService;
use crate::domain::{compute_balance, Cents, Customer};

/// Point-in-time copy of one account for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub balance: Cents,
    pub account: Customer,
}

/// Exporter for writing account statements to various formats
pub struct Exporter<'a> {
    service: &'a AccountService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a AccountService) -> Self {
        Self { service }
    }

    /// Export a customer's statement to CSV format.
    /// Returns the number of operations written.
    pub fn export_statement_csv<W: Write>(&self, cpf: &str, writer: W) -> Result<usize> {
        let statement = self.service.statement(cpf)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["type", "amount_cents", "description", "created_at"])?;

        for operation in &statement {
            let amount = operation.amount.to_string();
            let created_at = operation.created_at.to_rfc3339();
            csv_writer.write_record([
                operation.kind.as_str(),
                amount.as_str(),
                operation.description.as_deref().unwrap_or_default(),
                created_at.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(statement.len())
    }

    /// Export the full account with its current balance as a JSON snapshot
    pub fn export_account_json<W: Write>(&self, cpf: &str, mut writer: W) -> Result<AccountSnapshot> {
        let handle = self.service.resolve(cpf)?;
        // One snapshot so the balance always matches the exported statement
        let account = handle.snapshot();
        let balance = compute_balance(&account.statement);

        let snapshot = AccountSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balance,
            account,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}
