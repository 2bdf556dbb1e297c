//! Purpose: In-process implementation of the contact procedures.
//! Exports: `ContactApi`, `LocalClient`, `ApiResult`.
//! Role: Validates inputs against the record model, then runs the store operation.
//! Invariants: Invalid input never reaches the store.
//! Invariants: Not-found is a result (`None` / `success: false`), never an error.
//! Invariants: Storage faults are logged once here and propagated unchanged.
use std::path::Path;
use std::sync::Arc;

use crate::core::contact::{
    Contact, ContactId, CreateContactInput, DeleteOutcome, Health, UpdateContactInput,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::store::ContactStore;
use crate::core::timestamp;
use crate::core::validate::{validate_create, validate_update};

pub type ApiResult<T> = Result<T, Error>;

/// The typed contact procedures, callable locally or over HTTP.
pub trait ContactApi {
    fn healthcheck(&self) -> ApiResult<Health>;
    fn create_contact(&self, input: CreateContactInput) -> ApiResult<Contact>;
    fn get_contacts(&self) -> ApiResult<Vec<Contact>>;
    fn get_contact(&self, input: ContactId) -> ApiResult<Option<Contact>>;
    fn update_contact(&self, input: UpdateContactInput) -> ApiResult<Option<Contact>>;
    fn delete_contact(&self, input: ContactId) -> ApiResult<DeleteOutcome>;
}

#[derive(Clone)]
pub struct LocalClient {
    store: Arc<ContactStore>,
}

impl LocalClient {
    pub fn new(store: ContactStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        ContactStore::open(path).map(Self::new)
    }

    pub fn in_memory() -> ApiResult<Self> {
        ContactStore::open_in_memory().map(Self::new)
    }
}

impl ContactApi for LocalClient {
    fn healthcheck(&self) -> ApiResult<Health> {
        Ok(Health {
            status: "ok".to_string(),
            timestamp: timestamp::now(),
        })
    }

    fn create_contact(&self, input: CreateContactInput) -> ApiResult<Contact> {
        let new = validate_create(input)?;
        logged("createContact", self.store.create(&new))
    }

    fn get_contacts(&self) -> ApiResult<Vec<Contact>> {
        logged("getContacts", self.store.list())
    }

    fn get_contact(&self, input: ContactId) -> ApiResult<Option<Contact>> {
        logged("getContact", self.store.get(input.id))
    }

    fn update_contact(&self, input: UpdateContactInput) -> ApiResult<Option<Contact>> {
        let changes = validate_update(input)?;
        logged("updateContact", self.store.update(&changes))
    }

    fn delete_contact(&self, input: ContactId) -> ApiResult<DeleteOutcome> {
        let success = logged("deleteContact", self.store.delete(input.id))?;
        Ok(DeleteOutcome { success })
    }
}

fn logged<T>(procedure: &str, result: ApiResult<T>) -> ApiResult<T> {
    if let Err(err) = &result {
        if err.kind() == ErrorKind::Storage {
            let cause = std::error::Error::source(err)
                .map(ToString::to_string)
                .unwrap_or_default();
            tracing::error!(procedure, error = %err, cause = %cause, "storage fault");
        }
    }
    result
}
