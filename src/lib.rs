//! Purpose: Shared library crate used by the `contactdb` CLI, server and tests.
//! Exports: `core` (record model, validation, storage, errors), `api` (typed procedures
//! and clients), `app` (client-side contact book state and form).
//! Role: Library backing the binary; the `api` module is the supported surface.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod app;
pub mod core;
