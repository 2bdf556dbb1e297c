// Core modules implementing the record model, validation, storage, and error modeling.
pub mod contact;
pub mod error;
pub mod patch;
pub mod store;
pub mod timestamp;
pub mod validate;
