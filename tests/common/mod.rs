// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use contas::application::{AccountService, Config, ManualClock};
use contas::storage::AccountStore;

/// Helper to create a service over an empty store
pub fn test_service() -> AccountService {
    AccountService::in_memory(&Config::default())
}

/// Helper to create a service whose clock only moves when the test says so
pub fn test_service_at(start: DateTime<Utc>) -> (AccountService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start));
    let service = AccountService::with_clock(
        Arc::new(AccountStore::new()),
        &Config::default(),
        clock.clone(),
    );
    (service, clock)
}

/// Helper to parse a date string into DateTime<Utc> at midnight
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    day(date_str).and_hms_opt(0, 0, 0).unwrap().and_utc()
}

pub fn day(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Test fixture: the accounts used across scenarios
pub struct StandardAccounts;

impl StandardAccounts {
    /// Register Alice (111), Bob (222) and Eve (333)
    pub fn create_basic(service: &AccountService) -> anyhow::Result<()> {
        service.register("111", "Alice")?;
        service.register("222", "Bob")?;
        service.register("333", "Eve")?;
        Ok(())
    }

    /// Register the basic accounts and fund Alice with a salary deposit
    pub fn create_funded(service: &AccountService, amount: i64) -> anyhow::Result<()> {
        Self::create_basic(service)?;
        service.deposit("111", amount, Some("salary".into()))?;
        Ok(())
    }
}
