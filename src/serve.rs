//! Purpose: Provide the HTTP/JSON RPC server for contacts.
//! Exports: `ServeConfig`, `serve`, `validate_config`.
//! Role: Axum server framing `api::invoke` as `/rpc/{procedure}` endpoints.
//! Invariants: Success bodies are `{"result": ...}`; failures are `{"error": {...}}`
//! with stable kinds.
//! Invariants: Queries accept GET or POST; mutations accept POST only.
//! Invariants: Storage and internal faults never leak their causes to clients.
//! Invariants: Handlers are stateless; store calls run on the blocking pool.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Path as AxumPath, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use url::Url;

use contactdb::api::{Error, ErrorKind, LocalClient, Procedure, ProcedureKind, invoke};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    client: LocalClient,
}

#[derive(Debug, Deserialize)]
struct RpcQuery {
    input: Option<String>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let client = LocalClient::open(&config.db_path)?;
    let state = Arc::new(AppState { client });

    let mut app = Router::new()
        .route("/healthz", get(healthz))
        .route("/rpc/:procedure", get(rpc_get).post(rpc_post))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if let Some(cors) = cors_layer(&config.cors_allowed_origins)? {
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_hint("Is another process already listening on that port?")
                .with_source(err)
        })?;
    tracing::info!(
        bind = %config.bind,
        db = %config.db_path.display(),
        "contact server listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutting down");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

pub fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if config.bind.port() == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("server port must be greater than zero")
            .with_hint("Use --port 2022 or set SERVER_PORT."));
    }
    for origin in &config.cors_allowed_origins {
        normalize_origin(origin)?;
    }
    Ok(())
}

fn normalize_origin(raw: &str) -> Result<String, Error> {
    let invalid = || {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid --cors-origin: {raw}"))
            .with_hint("Use a bare origin like http://localhost:3000 (scheme, host, optional port).")
    };
    let url = Url::parse(raw).map_err(|err| invalid().with_source(err))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }
    Ok(url.origin().ascii_serialization())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    let mut values = Vec::with_capacity(origins.len());
    for origin in origins {
        let origin = normalize_origin(origin)?;
        let value = HeaderValue::from_str(&origin).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --cors-origin: {origin}"))
                .with_source(err)
        })?;
        values.push(value);
    }
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn rpc_get(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
    query: Result<Query<RpcQuery>, QueryRejection>,
) -> Response {
    let procedure = match resolve_procedure(&name) {
        Ok(procedure) => procedure,
        Err(err) => return error_response(err),
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(query_error(rejection)),
    };
    if procedure.kind() == ProcedureKind::Mutation {
        let err = Error::new(ErrorKind::Usage)
            .with_message(format!("{name} is a mutation"))
            .with_hint("Send mutations with POST and a JSON body.");
        return error_response_with_status(err, StatusCode::METHOD_NOT_ALLOWED);
    }
    let input = match query.input.as_deref().map(parse_input).transpose() {
        Ok(input) => input.unwrap_or(Value::Null),
        Err(err) => return error_response(err),
    };
    dispatch(state, procedure, input).await
}

async fn rpc_post(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
    body: Bytes,
) -> Response {
    let procedure = match resolve_procedure(&name) {
        Ok(procedure) => procedure,
        Err(err) => return error_response(err),
    };
    let input = match parse_body(&body) {
        Ok(input) => input,
        Err(err) => return error_response(err),
    };
    dispatch(state, procedure, input).await
}

async fn dispatch(state: Arc<AppState>, procedure: Procedure, input: Value) -> Response {
    let client = state.client.clone();
    let result = tokio::task::spawn_blocking(move || invoke(&client, procedure, input)).await;
    match result {
        Ok(Ok(output)) => json_response(json!({ "result": output })),
        Ok(Err(err)) => error_response(err),
        Err(join_err) => {
            tracing::error!(procedure = procedure.name(), error = %join_err, "procedure task failed");
            error_response(
                Error::new(ErrorKind::Internal)
                    .with_message("procedure task failed")
                    .with_source(join_err),
            )
        }
    }
}

fn resolve_procedure(name: &str) -> Result<Procedure, Error> {
    Procedure::parse(name).ok_or_else(|| {
        Error::new(ErrorKind::NotFound)
            .with_message(format!("unknown procedure: {name}"))
            .with_hint("Procedures: healthcheck, createContact, getContacts, getContact, updateContact, deleteContact.")
    })
}

fn parse_body(body: &[u8]) -> Result<Value, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("request body is not valid json")
            .with_source(err)
    })
}

fn query_error(rejection: QueryRejection) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid query string: {}", rejection.body_text()))
        .with_hint("Pass a single URL-encoded JSON value as ?input=...")
}

fn parse_input(raw: &str) -> Result<Value, Error> {
    serde_json::from_str(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("input query parameter is not valid json")
            .with_hint("URL-encode a JSON object, e.g. ?input=%7B%22id%22%3A1%7D")
            .with_source(err)
    })
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<IssueBody>,
}

#[derive(Debug, Serialize)]
struct IssueBody {
    field: String,
    message: String,
}

fn json_response(payload: Value) -> Response {
    let mut response = Json(payload).into_response();
    response.headers_mut().insert(
        "contactdb-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Usage | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Busy => StatusCode::LOCKED,
        ErrorKind::Storage | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(err.kind());
    error_response_with_status(err, status)
}

fn error_response_with_status(err: Error, status: StatusCode) -> Response {
    let body = if status.is_server_error() {
        ErrorBody {
            kind: err.kind().as_str().to_string(),
            message: "internal server error".to_string(),
            hint: None,
            id: None,
            issues: Vec::new(),
        }
    } else {
        ErrorBody {
            kind: err.kind().as_str().to_string(),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            id: err.id(),
            issues: err
                .issues()
                .iter()
                .map(|issue| IssueBody {
                    field: issue.field.clone(),
                    message: issue.message.clone(),
                })
                .collect(),
        }
    };
    let mut response = (status, Json(ErrorEnvelope { error: body })).into_response();
    response.headers_mut().insert(
        "contactdb-version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}
