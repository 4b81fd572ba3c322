use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::domain::{Customer, CustomerId, TaxId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Customer not found: {0}")]
    AccountNotFound(String),

    #[error("Customer already exists: {0}")]
    DuplicateAccount(TaxId),

    #[error("Tax id must not be empty")]
    InvalidTaxId,

    #[error("Customer name must not be empty")]
    InvalidName,
}

/// Shared handle to a customer record held by an [`AccountStore`].
///
/// Mutations made through a handle are visible to every other holder. The
/// identity fields are copied out so they can be read without locking.
#[derive(Debug, Clone)]
pub struct CustomerHandle {
    id: CustomerId,
    tax_id: TaxId,
    record: Arc<Mutex<Customer>>,
}

impl CustomerHandle {
    fn new(customer: Customer) -> Self {
        Self {
            id: customer.id,
            tax_id: customer.tax_id.clone(),
            record: Arc::new(Mutex::new(customer)),
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn tax_id(&self) -> &TaxId {
        &self.tax_id
    }

    /// Copy of the record as it is right now.
    pub fn snapshot(&self) -> Customer {
        self.lock().clone()
    }

    /// Lock the record for the duration of one operation.
    pub fn lock(&self) -> MutexGuard<'_, Customer> {
        // Every writer validates before mutating, so a poisoned record is still consistent.
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory collection of customers, keyed by tax id.
///
/// Customers are kept in creation order. Lock order is always the store
/// first, then a single customer record.
#[derive(Debug, Default)]
pub struct AccountStore {
    customers: RwLock<Vec<CustomerHandle>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new customer.
    /// The duplicate check and the insert happen under one write lock.
    pub fn create(&self, tax_id: &str, name: &str) -> Result<CustomerHandle, StoreError> {
        let tax_id = TaxId::parse(tax_id).ok_or(StoreError::InvalidTaxId)?;
        let name = validate_name(name)?;

        let mut customers = self.write();
        if customers.iter().any(|handle| handle.tax_id == tax_id) {
            return Err(StoreError::DuplicateAccount(tax_id));
        }

        let handle = CustomerHandle::new(Customer::new(tax_id, name));
        customers.push(handle.clone());
        Ok(handle)
    }

    /// Find the customer registered under `tax_id`.
    pub fn resolve(&self, tax_id: &str) -> Result<CustomerHandle, StoreError> {
        let not_found = || StoreError::AccountNotFound(tax_id.trim().to_string());
        let tax_id = TaxId::parse(tax_id).ok_or_else(not_found)?;

        self.read()
            .iter()
            .find(|handle| handle.tax_id == tax_id)
            .cloned()
            .ok_or_else(not_found)
    }

    /// Change the display name of a customer in place.
    pub fn rename(&self, handle: &CustomerHandle, name: &str) -> Result<(), StoreError> {
        let name = validate_name(name)?;
        self.while_registered(handle, |handle| handle.lock().name = name)
    }

    /// Run `f` while `handle` is still part of the store.
    ///
    /// The read lock is held for the whole call, so a concurrent `remove`
    /// waits for `f` to finish. A handle that was already removed fails with
    /// `AccountNotFound` and `f` is not run.
    pub fn while_registered<T>(
        &self,
        handle: &CustomerHandle,
        f: impl FnOnce(&CustomerHandle) -> T,
    ) -> Result<T, StoreError> {
        let customers = self.read();
        if !customers.iter().any(|candidate| candidate.id == handle.id) {
            return Err(StoreError::AccountNotFound(handle.tax_id.to_string()));
        }
        Ok(f(handle))
    }

    /// Remove a customer by identity and return its final state.
    pub fn remove(&self, handle: &CustomerHandle) -> Result<Customer, StoreError> {
        let mut customers = self.write();
        let position = customers
            .iter()
            .position(|candidate| candidate.id == handle.id)
            .ok_or_else(|| StoreError::AccountNotFound(handle.tax_id.to_string()))?;

        let removed = customers.remove(position);
        Ok(removed.snapshot())
    }

    /// Snapshot of every customer in creation order.
    pub fn list(&self) -> Vec<Customer> {
        self.read().iter().map(CustomerHandle::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CustomerHandle>> {
        self.customers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CustomerHandle>> {
        self.customers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = AccountStore::new();
        let created = store.create("111", "Alice").unwrap();

        let resolved = store.resolve("111").unwrap();
        assert_eq!(resolved.id(), created.id());
        assert_eq!(resolved.snapshot().name, "Alice");
        assert!(resolved.snapshot().statement.is_empty());
    }

    #[test]
    fn test_duplicate_create_keeps_first_account() {
        let store = AccountStore::new();
        let first = store.create("333", "Eve").unwrap();

        let result = store.create("333", "Eve2");
        assert!(matches!(result, Err(StoreError::DuplicateAccount(_))));

        let resolved = store.resolve("333").unwrap();
        assert_eq!(resolved.id(), first.id());
        assert_eq!(resolved.snapshot().name, "Eve");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_tax_id_is_matched_after_trimming() {
        let store = AccountStore::new();
        store.create(" 111 ", "Alice").unwrap();

        assert!(store.resolve("111").is_ok());
        assert!(matches!(
            store.create("111", "Other"),
            Err(StoreError::DuplicateAccount(_))
        ));
    }

    #[test]
    fn test_create_rejects_blank_input() {
        let store = AccountStore::new();

        assert_eq!(store.create("  ", "Alice").unwrap_err(), StoreError::InvalidTaxId);
        assert_eq!(store.create("111", " ").unwrap_err(), StoreError::InvalidName);
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let store = AccountStore::new();

        assert_eq!(
            store.resolve("999").unwrap_err(),
            StoreError::AccountNotFound("999".into())
        );
        assert!(matches!(
            store.resolve(""),
            Err(StoreError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_rename_is_visible_through_other_handles() {
        let store = AccountStore::new();
        let handle = store.create("111", "Alice").unwrap();

        store.rename(&handle, "Alice Smith").unwrap();

        assert_eq!(store.resolve("111").unwrap().snapshot().name, "Alice Smith");
        assert_eq!(store.rename(&handle, "").unwrap_err(), StoreError::InvalidName);
        assert_eq!(store.resolve("111").unwrap().snapshot().name, "Alice Smith");
    }

    #[test]
    fn test_remove_deletes_by_identity() {
        let store = AccountStore::new();
        store.create("111", "Alice").unwrap();
        let bob = store.create("222", "Bob").unwrap();
        store.create("333", "Eve").unwrap();

        let removed = store.remove(&bob).unwrap();
        assert_eq!(removed.name, "Bob");

        let remaining: Vec<String> = store.list().into_iter().map(|c| c.name).collect();
        assert_eq!(remaining, vec!["Alice", "Eve"]);
        assert!(matches!(
            store.resolve("222"),
            Err(StoreError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_remove_twice_fails() {
        let store = AccountStore::new();
        let handle = store.create("444", "Sam").unwrap();

        store.remove(&handle).unwrap();
        assert!(matches!(
            store.remove(&handle),
            Err(StoreError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_removed_handle_is_no_longer_registered() {
        let store = AccountStore::new();
        let handle = store.create("444", "Sam").unwrap();
        assert_eq!(store.while_registered(&handle, |h| h.id()).unwrap(), handle.id());

        store.remove(&handle).unwrap();

        let mut ran = false;
        assert!(matches!(
            store.while_registered(&handle, |_| ran = true),
            Err(StoreError::AccountNotFound(_))
        ));
        assert!(!ran);
        assert!(matches!(
            store.rename(&handle, "Samuel"),
            Err(StoreError::AccountNotFound(_))
        ));
        assert_eq!(handle.snapshot().name, "Sam");
    }

    #[test]
    fn test_recreate_after_remove_gets_new_id() {
        let store = AccountStore::new();
        let first = store.create("444", "Sam").unwrap();
        store.remove(&first).unwrap();

        let second = store.create("444", "Sam").unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_list_preserves_creation_order() {
        let store = AccountStore::new();
        for (tax_id, name) in [("3", "C"), ("1", "A"), ("2", "B")] {
            store.create(tax_id, name).unwrap();
        }

        let names: Vec<String> = store.list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_concurrent_creates_register_once() {
        let store = Arc::new(AccountStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.create("555", &format!("Racer {}", i)).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.len(), 1);
    }
}
