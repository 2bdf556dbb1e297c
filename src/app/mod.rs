//! Purpose: Client application state for browsing and editing contacts.
//! Exports: `ContactBook`, `ContactForm`.
//! Role: UI-agnostic model that front ends (CLI today) drive through `ContactApi`.
//! Invariants: Holds no storage of its own; the server is the source of truth.

mod book;
mod form;

pub use book::ContactBook;
pub use form::{ContactForm, INVALID_EMAIL, REQUIRED_NAME};
