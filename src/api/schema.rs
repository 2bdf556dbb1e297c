//! Purpose: Check the JSON shape of procedure inputs before they are decoded.
//! Exports: `check_input`.
//! Role: Turns malformed payloads into field-level `Validation` errors instead of
//! opaque decode failures.
//! Invariants: Unknown keys are ignored; known keys are type-checked.
//! Invariants: Runs before record-model validation and never touches storage.
use serde_json::{Map, Value};

use super::procedure::Procedure;
use crate::core::error::{Error, ErrorKind, FieldIssue};

#[derive(Clone, Copy, Debug)]
enum FieldType {
    Integer,
    Text,
    NullableText,
}

#[derive(Clone, Copy, Debug)]
struct FieldSpec {
    name: &'static str,
    ty: FieldType,
    required: bool,
}

const fn field(name: &'static str, ty: FieldType, required: bool) -> FieldSpec {
    FieldSpec { name, ty, required }
}

const CREATE: &[FieldSpec] = &[
    field("name", FieldType::Text, true),
    field("phone_number", FieldType::NullableText, false),
    field("email", FieldType::NullableText, false),
    field("address", FieldType::NullableText, false),
    field("company", FieldType::NullableText, false),
    field("notes", FieldType::NullableText, false),
];

// `name: null` passes here so the record model can report it as a cleared name.
const UPDATE: &[FieldSpec] = &[
    field("id", FieldType::Integer, true),
    field("name", FieldType::NullableText, false),
    field("phone_number", FieldType::NullableText, false),
    field("email", FieldType::NullableText, false),
    field("address", FieldType::NullableText, false),
    field("company", FieldType::NullableText, false),
    field("notes", FieldType::NullableText, false),
];

const BY_ID: &[FieldSpec] = &[field("id", FieldType::Integer, true)];

pub fn check_input(procedure: Procedure, input: &Value) -> Result<(), Error> {
    let specs = match procedure {
        Procedure::Healthcheck | Procedure::GetContacts => return Ok(()),
        Procedure::CreateContact => CREATE,
        Procedure::UpdateContact => UPDATE,
        Procedure::GetContact | Procedure::DeleteContact => BY_ID,
    };
    let Value::Object(map) = input else {
        return Err(Error::validation(vec![FieldIssue::new(
            "input",
            format!("Expected object, received {}", type_name(input)),
        )])
        .with_hint(format!("{} takes a JSON object", procedure.name())));
    };

    let issues = check_fields(map, specs);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(issues))
    }
}

fn check_fields(map: &Map<String, Value>, specs: &[FieldSpec]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for spec in specs {
        match map.get(spec.name) {
            None if spec.required => issues.push(FieldIssue::new(spec.name, "Required")),
            None => {}
            Some(value) => {
                if let Some(message) = type_mismatch(spec.ty, value) {
                    issues.push(FieldIssue::new(spec.name, message));
                }
            }
        }
    }
    issues
}

fn type_mismatch(ty: FieldType, value: &Value) -> Option<String> {
    let ok = match ty {
        FieldType::Integer => value.as_i64().is_some(),
        FieldType::Text => value.is_string(),
        FieldType::NullableText => value.is_string() || value.is_null(),
    };
    if ok {
        return None;
    }
    let expected = match ty {
        FieldType::Integer => "integer",
        FieldType::Text | FieldType::NullableText => "string",
    };
    Some(format!("Expected {expected}, received {}", type_name(value)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode failures that slip past the shape check still surface as `Validation`.
pub(crate) fn decode_error(procedure: Procedure, err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Validation)
        .with_message(format!("invalid {} input: {err}", procedure.name()))
        .with_source(err)
}
