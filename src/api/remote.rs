//! Purpose: HTTP client for the contact RPC endpoint.
//! Exports: `RemoteClient`.
//! Role: Implements `ContactApi` by calling `/rpc/{procedure}` on a running server.
//! Invariants: Queries use GET with a JSON `input` query parameter; mutations POST JSON.
//! Invariants: Success bodies are `{"result": ...}`; failures are `{"error": {...}}`
//! and map back to the same `ErrorKind`.
//! Invariants: Timestamps are decoded into native `OffsetDateTime` values.
#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::client::{ApiResult, ContactApi};
use super::procedure::{Procedure, ProcedureKind};
use crate::core::contact::{
    Contact, ContactId, CreateContactInput, DeleteOutcome, Health, UpdateContactInput,
};
use crate::core::error::{Error, ErrorKind, FieldIssue};

#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<RemoteClientInner>,
}

struct RemoteClientInner {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ResultEnvelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RemoteError,
}

#[derive(Deserialize)]
struct RemoteError {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    id: Option<i64>,
    #[serde(default)]
    issues: Vec<RemoteIssue>,
}

#[derive(Deserialize)]
struct RemoteIssue {
    field: String,
    message: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RemoteClientInner { base_url, agent }),
        })
    }

    /// Calls `procedure` with an optional input and decodes the `result` payload.
    pub fn call<I, O>(&self, procedure: Procedure, input: Option<&I>) -> ApiResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let mut url = build_url(&self.inner.base_url, &["rpc", procedure.name()])?;
        let payload = input.map(encode_input).transpose()?;

        let response = match procedure.kind() {
            ProcedureKind::Query => {
                if let Some(payload) = &payload {
                    url.query_pairs_mut().append_pair("input", payload);
                }
                self.inner
                    .agent
                    .get(url.as_str())
                    .set("Accept", "application/json")
                    .call()
            }
            ProcedureKind::Mutation => self
                .inner
                .agent
                .post(url.as_str())
                .set("Accept", "application/json")
                .set("Content-Type", "application/json")
                .send_string(payload.as_deref().unwrap_or("{}")),
        };

        match response {
            Ok(resp) => read_result(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message(format!("request to {} failed", procedure.name()))
                .with_hint("Is the server running? Start it with `contactdb serve`.")
                .with_source(err)),
        }
    }
}

impl ContactApi for RemoteClient {
    fn healthcheck(&self) -> ApiResult<Health> {
        self.call::<(), _>(Procedure::Healthcheck, None)
    }

    fn create_contact(&self, input: CreateContactInput) -> ApiResult<Contact> {
        self.call(Procedure::CreateContact, Some(&input))
    }

    fn get_contacts(&self) -> ApiResult<Vec<Contact>> {
        self.call::<(), _>(Procedure::GetContacts, None)
    }

    fn get_contact(&self, input: ContactId) -> ApiResult<Option<Contact>> {
        self.call(Procedure::GetContact, Some(&input))
    }

    fn update_contact(&self, input: UpdateContactInput) -> ApiResult<Option<Contact>> {
        self.call(Procedure::UpdateContact, Some(&input))
    }

    fn delete_contact(&self, input: ContactId) -> ApiResult<DeleteOutcome> {
        self.call(Procedure::DeleteContact, Some(&input))
    }
}

fn encode_input<I: Serialize>(input: &I) -> ApiResult<String> {
    serde_json::to_string(input).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode request json")
            .with_source(err)
    })
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid server url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("server url must use http or https scheme")
        );
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("server url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("server url cannot be a base")
        })?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_result<O: DeserializeOwned>(response: ureq::Response) -> ApiResult<O> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    let envelope: ResultEnvelope<O> = serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })?;
    Ok(envelope.result)
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_remote(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("server error status {status}"))
}

fn error_from_remote(remote: RemoteError) -> Error {
    let kind = ErrorKind::parse(&remote.kind).unwrap_or(ErrorKind::Internal);
    let mut err = Error::new(kind).with_field_issues(
        remote
            .issues
            .into_iter()
            .map(|issue| FieldIssue::new(issue.field, issue.message)),
    );
    if let Some(message) = remote.message {
        err = err.with_message(message);
    }
    if let Some(hint) = remote.hint {
        err = err.with_hint(hint);
    }
    if let Some(id) = remote.id {
        err = err.with_id(id);
    }
    err
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 405 | 413 | 415 => ErrorKind::Usage,
        404 => ErrorKind::NotFound,
        422 => ErrorKind::Validation,
        423 => ErrorKind::Busy,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
