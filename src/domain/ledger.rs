use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;

use super::{Cents, Operation, OperationKind};

/// Compute the balance of a statement.
/// Balance = sum of credits - sum of debits
pub fn compute_balance(statement: &[Operation]) -> Cents {
    statement
        .iter()
        .fold(0, |balance, operation| balance + operation.signed_amount())
}

/// Select the operations recorded on a calendar day.
/// `created_at` is shifted into `offset` before its date is compared.
pub fn operations_on(statement: &[Operation], date: NaiveDate, offset: &FixedOffset) -> Vec<Operation> {
    statement
        .iter()
        .filter(|operation| operation.created_at.with_timezone(offset).date_naive() == date)
        .cloned()
        .collect()
}

/// Totals over a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub credits: Cents,
    pub debits: Cents,
    pub balance: Cents,
    pub operation_count: usize,
}

/// Credit and debit totals saturate at `Cents::MAX`; the balance is always exact.
pub fn summarize(statement: &[Operation]) -> StatementSummary {
    let (credits, debits) =
        statement
            .iter()
            .fold((0 as Cents, 0 as Cents), |(credits, debits), operation| match operation.kind {
                OperationKind::Credit => (credits.saturating_add(operation.amount), debits),
                OperationKind::Debit => (credits, debits.saturating_add(operation.amount)),
            });

    StatementSummary {
        credits,
        debits,
        balance: compute_balance(statement),
        operation_count: statement.len(),
    }
}
