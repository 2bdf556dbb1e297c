//! Purpose: Contact record and the input/output shapes of the contact procedures.
//! Exports: `Contact`, `ContactField`, `CreateContactInput`, `UpdateContactInput`,
//! `ContactId`, `DeleteOutcome`, `Health`.
//! Role: Serializable model shared by the store, the RPC layer and clients.
//! Invariants: Field names match the `contacts` table columns and the JSON wire names.
//! Invariants: Update inputs carry `Field` values so omitted and null stay distinct.
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::patch::Field;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "crate::core::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::core::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Contact {
    pub fn get(&self, field: ContactField) -> Option<&str> {
        match field {
            ContactField::Name => Some(self.name.as_str()),
            ContactField::PhoneNumber => self.phone_number.as_deref(),
            ContactField::Email => self.email.as_deref(),
            ContactField::Address => self.address.as_deref(),
            ContactField::Company => self.company.as_deref(),
            ContactField::Notes => self.notes.as_deref(),
        }
    }
}

/// Writable contact columns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ContactField {
    Name,
    PhoneNumber,
    Email,
    Address,
    Company,
    Notes,
}

impl ContactField {
    pub const ALL: [ContactField; 6] = [
        ContactField::Name,
        ContactField::PhoneNumber,
        ContactField::Email,
        ContactField::Address,
        ContactField::Company,
        ContactField::Notes,
    ];

    pub const OPTIONAL: [ContactField; 5] = [
        ContactField::PhoneNumber,
        ContactField::Email,
        ContactField::Address,
        ContactField::Company,
        ContactField::Notes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::PhoneNumber => "phone_number",
            ContactField::Email => "email",
            ContactField::Address => "address",
            ContactField::Company => "company",
            ContactField::Notes => "notes",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        ContactField::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreateContactInput {
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateContactInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with(mut self, field: ContactField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            ContactField::Name => self.name = value,
            ContactField::PhoneNumber => self.phone_number = Some(value),
            ContactField::Email => self.email = Some(value),
            ContactField::Address => self.address = Some(value),
            ContactField::Company => self.company = Some(value),
            ContactField::Notes => self.notes = Some(value),
        }
        self
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpdateContactInput {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub name: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub phone_number: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub email: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub address: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub company: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub notes: Field<String>,
}

impl UpdateContactInput {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn field(&self, field: ContactField) -> &Field<String> {
        match field {
            ContactField::Name => &self.name,
            ContactField::PhoneNumber => &self.phone_number,
            ContactField::Email => &self.email,
            ContactField::Address => &self.address,
            ContactField::Company => &self.company,
            ContactField::Notes => &self.notes,
        }
    }

    pub fn set(&mut self, field: ContactField, value: Field<String>) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::PhoneNumber => &mut self.phone_number,
            ContactField::Email => &mut self.email,
            ContactField::Address => &mut self.address,
            ContactField::Company => &mut self.company,
            ContactField::Notes => &mut self.notes,
        };
        *slot = value;
    }

    pub fn with_value(mut self, field: ContactField, value: impl Into<String>) -> Self {
        self.set(field, Field::Value(value.into()));
        self
    }

    pub fn with_null(mut self, field: ContactField) -> Self {
        self.set(field, Field::Null);
        self
    }

    /// True when no field besides `id` is mentioned.
    pub fn is_empty(&self) -> bool {
        ContactField::ALL
            .into_iter()
            .all(|field| self.field(field).is_unchanged())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContactId {
    pub id: i64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(with = "crate::core::timestamp")]
    pub timestamp: OffsetDateTime,
}
