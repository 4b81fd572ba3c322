mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{test_service, StandardAccounts};
use contas::application::{AppError, Config, LedgerService};
use contas::storage::{AccountStore, StoreError};

#[test]
fn test_register_and_fetch_account() -> Result<()> {
    let service = test_service();

    let created = service.register("111", "Alice")?;
    let fetched = service.account("111")?;

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, "Alice");
    assert_eq!(fetched.tax_id.as_str(), "111");
    assert!(fetched.statement.is_empty());

    Ok(())
}

#[test]
fn test_duplicate_registration_keeps_original() -> Result<()> {
    let service = test_service();

    let first = service.register("333", "Eve")?;
    let result = service.register("333", "Eve2");

    assert_eq!(result.unwrap_err(), AppError::DuplicateAccount("333".into()));

    let account = service.account("333")?;
    assert_eq!(account.name, "Eve");
    assert_eq!(account.id, first.id);
    assert_eq!(service.accounts().len(), 1);

    Ok(())
}

#[test]
fn test_deleted_account_cannot_be_resolved() -> Result<()> {
    let service = test_service();
    service.register("444", "Sam")?;

    let remaining = service.delete("444")?;
    assert!(remaining.is_empty());

    assert!(matches!(
        service.resolve("444"),
        Err(AppError::AccountNotFound(_))
    ));
    assert!(matches!(
        service.delete("444"),
        Err(AppError::AccountNotFound(_))
    ));

    Ok(())
}

#[test]
fn test_delete_removes_only_the_requested_account() -> Result<()> {
    let service = test_service();
    StandardAccounts::create_funded(&service, 5000)?;

    // Eve is last; the remaining order must be untouched
    let remaining = service.delete("222")?;
    let names: Vec<&str> = remaining.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Eve"]);

    assert_eq!(service.balance("111")?, 5000);
    assert!(service.account("333").is_ok());

    Ok(())
}

#[test]
fn test_deleted_tax_id_can_register_again() -> Result<()> {
    let service = test_service();
    let first = service.register("444", "Sam")?;
    service.deposit("444", 1000, None)?;
    service.delete("444")?;

    let second = service.register("444", "Sam")?;
    assert_ne!(first.id, second.id);
    assert_eq!(service.balance("444")?, 0);

    Ok(())
}

#[test]
fn test_rename_keeps_identity_and_statement() -> Result<()> {
    let service = test_service();
    let created = service.register("111", "Alice")?;
    service.deposit("111", 2500, None)?;

    let renamed = service.rename("111", "Alice Souza")?;

    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "Alice Souza");
    assert_eq!(renamed.statement.len(), 1);
    assert_eq!(service.account("111")?.name, "Alice Souza");

    Ok(())
}

#[test]
fn test_invalid_registration_input() {
    let service = test_service();

    assert!(matches!(
        service.register("", "Alice"),
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        service.register("111", "   "),
        Err(AppError::InvalidInput(_))
    ));
    assert!(service.accounts().is_empty());
}

#[test]
fn test_unknown_tax_id_fails_everywhere() {
    let service = test_service();

    assert!(matches!(service.account("999"), Err(AppError::AccountNotFound(_))));
    assert!(matches!(service.balance("999"), Err(AppError::AccountNotFound(_))));
    assert!(matches!(service.statement("999"), Err(AppError::AccountNotFound(_))));
    assert!(matches!(
        service.rename("999", "Nobody"),
        Err(AppError::AccountNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_creates_one_account() -> Result<()> {
    let service = test_service();

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.register("555", &format!("Client {}", i)) })
        })
        .collect();

    let mut created = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(AppError::DuplicateAccount(_)) => duplicates += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 31);
    assert_eq!(service.accounts().len(), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_deposits_racing_a_delete_are_never_lost() -> Result<()> {
    let store = Arc::new(AccountStore::new());
    let ledger = LedgerService::new(&Config::default());
    let handle = store.create("444", "Sam")?;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let ledger = ledger.clone();
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut recorded = 0;
                for _ in 0..100 {
                    match store.while_registered(&handle, |h| ledger.deposit(h, 1, None)) {
                        Ok(result) => {
                            result?;
                            recorded += 1;
                        }
                        Err(StoreError::AccountNotFound(_)) => break,
                        Err(other) => return Err(other.into()),
                    }
                }
                Ok::<_, anyhow::Error>(recorded)
            })
        })
        .collect();

    tokio::task::yield_now().await;
    let removed = store.remove(&handle)?;

    let mut recorded = 0;
    for task in tasks {
        recorded += task.await??;
    }

    // Every deposit that reported success is in the removed record
    assert_eq!(removed.statement.len(), recorded);
    assert_eq!(handle.snapshot().statement.len(), recorded);

    Ok(())
}
