//! Purpose: Editable draft of a contact and its client-side checks.
//! Exports: `ContactForm`, `REQUIRED_NAME`, `INVALID_EMAIL`.
//! Role: Turns raw text input into create/update payloads for `ContactBook`.
//! Invariants: Blank optional fields become null; values are trimmed before sending.
//! Invariants: `validate` mirrors the server rules so bad drafts are caught early.
use crate::core::contact::{Contact, ContactField, CreateContactInput, UpdateContactInput};
use crate::core::error::{Error, FieldIssue};
use crate::core::patch::Field;
use crate::core::validate::is_valid_email;

pub const REQUIRED_NAME: &str = "Name is required";
pub const INVALID_EMAIL: &str = "Please enter a valid email address";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub company: String,
    pub notes: String,
}

impl ContactForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fills the draft from a stored contact for editing.
    pub fn from_contact(contact: &Contact) -> Self {
        let text = |field| contact.get(field).unwrap_or_default().to_string();
        Self {
            name: contact.name.clone(),
            phone_number: text(ContactField::PhoneNumber),
            email: text(ContactField::Email),
            address: text(ContactField::Address),
            company: text(ContactField::Company),
            notes: text(ContactField::Notes),
        }
    }

    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::PhoneNumber => &self.phone_number,
            ContactField::Email => &self.email,
            ContactField::Address => &self.address,
            ContactField::Company => &self.company,
            ContactField::Notes => &self.notes,
        }
    }

    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::PhoneNumber => &mut self.phone_number,
            ContactField::Email => &mut self.email,
            ContactField::Address => &mut self.address,
            ContactField::Company => &mut self.company,
            ContactField::Notes => &mut self.notes,
        };
        *slot = value.into();
    }

    /// Per-field problems; empty when the draft can be submitted.
    pub fn validate(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push(FieldIssue::new(ContactField::Name.as_str(), REQUIRED_NAME));
        }
        let email = self.email.trim();
        if !email.is_empty() && !is_valid_email(email) {
            issues.push(FieldIssue::new(ContactField::Email.as_str(), INVALID_EMAIL));
        }
        issues
    }

    fn check(&self) -> Result<(), Error> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(issues))
        }
    }

    pub fn to_create_input(&self) -> Result<CreateContactInput, Error> {
        self.check()?;
        let mut input = CreateContactInput::new(self.name.trim());
        for field in ContactField::OPTIONAL {
            if let Some(value) = self.cleaned(field) {
                input = input.with(field, value);
            }
        }
        Ok(input)
    }

    /// Update payload carrying every field, blanks as explicit nulls.
    pub fn to_update_input(&self, id: i64) -> Result<UpdateContactInput, Error> {
        self.check()?;
        let mut input = UpdateContactInput::new(id);
        for field in ContactField::ALL {
            input.set(field, Field::from_option(self.cleaned(field)));
        }
        Ok(input)
    }

    /// Update payload carrying only the fields that differ from `contact`.
    /// Both sides are compared trimmed, so stored padding alone is not a change.
    pub fn changes_from(&self, contact: &Contact) -> Result<UpdateContactInput, Error> {
        self.check()?;
        let mut input = UpdateContactInput::new(contact.id);
        for field in ContactField::ALL {
            let draft = self.cleaned(field);
            let stored = contact.get(field).map(str::trim).filter(|v| !v.is_empty());
            if draft.as_deref() != stored {
                input.set(field, Field::from_option(draft));
            }
        }
        Ok(input)
    }

    fn cleaned(&self, field: ContactField) -> Option<String> {
        let value = self.get(field).trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}
