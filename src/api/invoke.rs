//! Purpose: Run a named procedure against JSON input and produce JSON output.
//! Exports: `invoke`.
//! Role: Transport-free core of the RPC server; the HTTP layer only frames it.
//! Invariants: Shape check, then decode, then record-model validation, then storage.
//! Invariants: Output JSON uses the same serde model the clients decode.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::{ApiResult, ContactApi};
use super::procedure::Procedure;
use super::schema::{check_input, decode_error};
use crate::core::error::{Error, ErrorKind};

pub fn invoke<A>(api: &A, procedure: Procedure, input: Value) -> ApiResult<Value>
where
    A: ContactApi + ?Sized,
{
    check_input(procedure, &input)?;
    match procedure {
        Procedure::Healthcheck => encode(api.healthcheck()?),
        Procedure::GetContacts => encode(api.get_contacts()?),
        Procedure::CreateContact => encode(api.create_contact(decode(procedure, input)?)?),
        Procedure::GetContact => encode(api.get_contact(decode(procedure, input)?)?),
        Procedure::UpdateContact => encode(api.update_contact(decode(procedure, input)?)?),
        Procedure::DeleteContact => encode(api.delete_contact(decode(procedure, input)?)?),
    }
}

fn decode<T: DeserializeOwned>(procedure: Procedure, input: Value) -> ApiResult<T> {
    serde_json::from_value(input).map_err(|err| decode_error(procedure, err))
}

fn encode<T: Serialize>(output: T) -> ApiResult<Value> {
    serde_json::to_value(output).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode procedure output")
            .with_source(err)
    })
}
