//! Purpose: Define the stable public Rust API boundary for contactdb.
//! Exports: Contact model, procedure names, local and remote clients, `invoke`.
//! Role: Public, additive-only surface used by the server, the CLI and the app layer.
//! Invariants: Local and remote clients implement the same `ContactApi` trait.
//! Invariants: Storage internals stay behind `LocalClient`.

mod client;
mod invoke;
mod procedure;
mod remote;
mod schema;

pub use crate::core::contact::{
    Contact, ContactField, ContactId, CreateContactInput, DeleteOutcome, Health,
    UpdateContactInput,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind, FieldIssue};
pub use crate::core::patch::Field;
pub use client::{ApiResult, ContactApi, LocalClient};
pub use invoke::invoke;
pub use procedure::{Procedure, ProcedureKind};
pub use remote::RemoteClient;
