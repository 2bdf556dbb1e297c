//! Purpose: Client-side contact list state driven through a `ContactApi`.
//! Exports: `ContactBook`.
//! Role: Holds the loaded contacts, selection, search term and form visibility,
//! and applies server results to them.
//! Invariants: State changes only after a successful server response.
//! Invariants: At most one request is in flight; overlapping calls fail with `Busy`
//! before reaching the server, and the loading flag is cleared on every path.
//! Invariants: Searching never calls the server.
use std::cell::{Cell, Ref, RefCell};

use crate::api::{ApiResult, ContactApi};
use crate::core::contact::{Contact, ContactId, CreateContactInput, UpdateContactInput};
use crate::core::error::{Error, ErrorKind};

#[derive(Debug, Default)]
struct BookState {
    contacts: Vec<Contact>,
    selected: Option<i64>,
    form_open: bool,
    search: String,
}

pub struct ContactBook<A> {
    api: A,
    state: RefCell<BookState>,
    loading: Cell<bool>,
}

struct Loading<'a>(&'a Cell<bool>);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<A: ContactApi> ContactBook<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: RefCell::new(BookState::default()),
            loading: Cell::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn contacts(&self) -> Ref<'_, [Contact]> {
        Ref::map(self.state.borrow(), |state| state.contacts.as_slice())
    }

    pub fn search(&self) -> String {
        self.state.borrow().search.clone()
    }

    pub fn set_search(&self, term: impl Into<String>) {
        self.state.borrow_mut().search = term.into();
    }

    /// Contacts matching the search term on name, email or company.
    pub fn visible(&self) -> Vec<Contact> {
        let state = self.state.borrow();
        let needle = state.search.trim().to_lowercase();
        state
            .contacts
            .iter()
            .filter(|contact| needle.is_empty() || matches_search(contact, &needle))
            .cloned()
            .collect()
    }

    pub fn selected(&self) -> Option<Contact> {
        let state = self.state.borrow();
        let id = state.selected?;
        state.contacts.iter().find(|c| c.id == id).cloned()
    }

    /// Selects a loaded contact; returns false when `id` is not in the list.
    pub fn select(&self, id: i64) -> bool {
        let mut state = self.state.borrow_mut();
        if state.contacts.iter().any(|c| c.id == id) {
            state.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&self) {
        self.state.borrow_mut().selected = None;
    }

    pub fn is_form_open(&self) -> bool {
        self.state.borrow().form_open
    }

    pub fn open_form(&self) {
        self.state.borrow_mut().form_open = true;
    }

    pub fn close_form(&self) {
        self.state.borrow_mut().form_open = false;
    }

    pub fn load(&self) -> ApiResult<usize> {
        let contacts = self.request("getContacts", |api| api.get_contacts())?;
        let count = contacts.len();
        self.state.borrow_mut().contacts = contacts;
        Ok(count)
    }

    pub fn create(&self, input: CreateContactInput) -> ApiResult<Contact> {
        let contact = self.request("createContact", |api| api.create_contact(input))?;
        let mut state = self.state.borrow_mut();
        insert_sorted(&mut state.contacts, contact.clone());
        state.form_open = false;
        Ok(contact)
    }

    pub fn update(&self, input: UpdateContactInput) -> ApiResult<Option<Contact>> {
        let id = input.id;
        let updated = self.request("updateContact", |api| api.update_contact(input))?;
        let Some(contact) = updated else {
            tracing::warn!(id, "update target no longer exists");
            return Ok(None);
        };
        let mut state = self.state.borrow_mut();
        if let Some(index) = state.contacts.iter().position(|c| c.id == contact.id) {
            state.contacts.remove(index);
            insert_sorted(&mut state.contacts, contact.clone());
        }
        state.selected = Some(contact.id);
        Ok(Some(contact))
    }

    pub fn delete(&self, id: i64) -> ApiResult<bool> {
        let outcome = self.request("deleteContact", |api| api.delete_contact(ContactId { id }))?;
        if outcome.success {
            let mut state = self.state.borrow_mut();
            state.contacts.retain(|c| c.id != id);
            if state.selected == Some(id) {
                state.selected = None;
            }
        }
        Ok(outcome.success)
    }

    fn request<T>(&self, procedure: &str, call: impl FnOnce(&A) -> ApiResult<T>) -> ApiResult<T> {
        let result = self.begin(procedure).and_then(|_loading| call(&self.api));
        if let Err(err) = &result {
            tracing::warn!(procedure, error = %err, "contact request failed");
        }
        result
    }

    fn begin(&self, procedure: &str) -> ApiResult<Loading<'_>> {
        if self.loading.replace(true) {
            return Err(Error::new(ErrorKind::Busy)
                .with_message(format!("{procedure} rejected: a request is already in flight"))
                .with_hint("Wait for the pending request to finish."));
        }
        Ok(Loading(&self.loading))
    }
}

/// Keeps the list in the server's `(name, id)` order.
fn insert_sorted(contacts: &mut Vec<Contact>, contact: Contact) {
    let at = contacts
        .partition_point(|c| (c.name.as_str(), c.id) <= (contact.name.as_str(), contact.id));
    contacts.insert(at, contact);
}

fn matches_search(contact: &Contact, needle: &str) -> bool {
    [
        Some(contact.name.as_str()),
        contact.email.as_deref(),
        contact.company.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.to_lowercase().contains(needle))
}
