//! Purpose: End-to-end tests for the contact RPC server and remote client.
//! Exports: None (integration test module).
//! Role: Validate procedures, wire envelopes and error propagation across TCP.
//! Invariants: Uses a loopback server with a temp database file.
//! Invariants: Bounded waits avoid test flakiness.
//! Invariants: Server processes are cleaned up on drop.

use contactdb::api::{
    ContactApi, ContactField, ContactId, CreateContactInput, ErrorKind, RemoteClient,
    UpdateContactInput,
};
use serde_json::{Value, json};
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start(db_path: &Path) -> TestResult<Self> {
        Self::start_with_cors(db_path, &[])
    }

    fn start_with_cors(db_path: &Path, cors_origins: &[&str]) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let base_url = format!("http://{bind}");

            let mut command = Command::new(env!("CARGO_BIN_EXE_contactdb"));
            command
                .env_remove("CONTACTDB_URL")
                .env("RUST_LOG", "warn")
                .arg("--db")
                .arg(db_path)
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .stdout(Stdio::null())
                .stderr(Stdio::piped());
            for origin in cors_origins {
                command.arg("--cors-origin").arg(origin);
            }
            let mut child = command.spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<RemoteClient> {
        Ok(RemoteClient::new(self.base_url.clone())?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn error_body(resp: ureq::Response) -> TestResult<Value> {
    Ok(serde_json::from_str(&resp.into_string()?)?)
}

#[test]
fn john_doe_lifecycle_over_http() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(&temp.path().join("contacts.sqlite3"))?;
    let client = server.client()?;

    assert_eq!(client.healthcheck()?.status, "ok");

    let created = client.create_contact(
        CreateContactInput::new("John Doe")
            .with(ContactField::Email, "john@x.com")
            .with(ContactField::PhoneNumber, "555-0100"),
    )?;
    assert!(created.id > 0);
    assert_eq!(created.email.as_deref(), Some("john@x.com"));
    assert_eq!(created.created_at, created.updated_at);

    let updated = client
        .update_contact(UpdateContactInput::new(created.id).with_null(ContactField::Email))?
        .ok_or("updated contact missing")?;
    assert_eq!(updated.email, None);
    assert_eq!(updated.phone_number.as_deref(), Some("555-0100"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let id = ContactId { id: created.id };
    assert!(client.delete_contact(id)?.success);
    assert!(!client.delete_contact(id)?.success);
    assert_eq!(client.get_contact(id)?, None);
    Ok(())
}

#[test]
fn list_is_ordered_by_name_and_survives_restart() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let db = temp.path().join("contacts.sqlite3");
    {
        let server = TestServer::start(&db)?;
        let client = server.client()?;
        for name in ["Zed", "Ada", "Mia"] {
            client.create_contact(CreateContactInput::new(name))?;
        }
    }

    let server = TestServer::start(&db)?;
    let client = server.client()?;
    let names: Vec<String> = client
        .get_contacts()?
        .into_iter()
        .map(|contact| contact.name)
        .collect();
    assert_eq!(names, vec!["Ada", "Mia", "Zed"]);
    Ok(())
}

#[test]
fn validation_errors_keep_kind_and_fields() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(&temp.path().join("contacts.sqlite3"))?;
    let client = server.client()?;

    let err = client
        .create_contact(CreateContactInput::new("").with(ContactField::Email, "nope"))
        .expect_err("invalid create");
    assert_eq!(err.kind(), ErrorKind::Validation);
    let fields: Vec<&str> = err.issues().iter().map(|i| i.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "email"]);

    let created = client.create_contact(CreateContactInput::new("Ada"))?;
    let err = client
        .update_contact(UpdateContactInput::new(created.id).with_null(ContactField::Name))
        .expect_err("null name");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.id(), Some(created.id));

    assert_eq!(client.get_contacts()?.len(), 1);
    Ok(())
}

#[test]
fn unknown_ids_are_results() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(&temp.path().join("contacts.sqlite3"))?;
    let client = server.client()?;

    let missing = ContactId { id: 424_242 };
    assert_eq!(client.get_contact(missing)?, None);
    assert_eq!(
        client.update_contact(UpdateContactInput::new(missing.id).with_value(ContactField::Name, "X"))?,
        None
    );
    assert!(!client.delete_contact(missing)?.success);
    Ok(())
}

#[test]
fn wire_envelopes_and_methods() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start(&temp.path().join("contacts.sqlite3"))?;

    let health: Value = serde_json::from_str(&ureq::get(&server.url("/healthz")).call()?.into_string()?)?;
    assert_eq!(health, json!({"ok": true}));

    let created: Value = serde_json::from_str(
        &ureq::post(&server.url("/rpc/createContact"))
            .set("Content-Type", "application/json")
            .send_string(r#"{"name":"Grace","email":"","company":"Navy"}"#)?
            .into_string()?,
    )?;
    assert_eq!(created["result"]["email"], Value::Null);
    assert_eq!(created["result"]["company"], "Navy");
    let id = created["result"]["id"].as_i64().ok_or("id")?;

    let input = format!(r#"{{"id":{id}}}"#);
    let fetched: Value = serde_json::from_str(
        &ureq::get(&server.url("/rpc/getContact"))
            .query("input", &input)
            .call()?
            .into_string()?,
    )?;
    assert_eq!(fetched["result"], created["result"]);

    let listed: Value = serde_json::from_str(
        &ureq::post(&server.url("/rpc/getContacts"))
            .send_string("")?
            .into_string()?,
    )?;
    assert_eq!(listed["result"].as_array().map(Vec::len), Some(1));

    match ureq::get(&server.url("/rpc/deleteContact"))
        .query("input", &input)
        .call()
    {
        Ok(_) => return Err("GET on a mutation should fail".into()),
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 405);
            assert_eq!(error_body(resp)?["error"]["kind"], "Usage");
        }
        Err(err) => return Err(err.into()),
    }

    match ureq::get(&server.url("/rpc/getContact"))
        .query("input", &input)
        .query("input", "x")
        .call()
    {
        Ok(_) => return Err("duplicate input parameter should fail".into()),
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 400);
            assert_eq!(resp.content_type(), "application/json");
            let body = error_body(resp)?;
            assert_eq!(body["error"]["kind"], "Usage");
            assert!(body["error"]["message"].is_string());
        }
        Err(err) => return Err(err.into()),
    }

    match ureq::post(&server.url("/rpc/dropContacts")).send_string("{}") {
        Ok(_) => return Err("unknown procedure should fail".into()),
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 404);
            assert_eq!(error_body(resp)?["error"]["kind"], "NotFound");
        }
        Err(err) => return Err(err.into()),
    }

    match ureq::post(&server.url("/rpc/getContact")).send_string(r#"{"id":"one"}"#) {
        Ok(_) => return Err("bad id type should fail".into()),
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 400);
            let body = error_body(resp)?;
            assert_eq!(body["error"]["kind"], "Validation");
            assert_eq!(body["error"]["issues"][0]["field"], "id");
        }
        Err(err) => return Err(err.into()),
    }

    match ureq::post(&server.url("/rpc/createContact")).send_string("{not json") {
        Ok(_) => return Err("malformed json should fail".into()),
        Err(ureq::Error::Status(code, resp)) => {
            assert_eq!(code, 400);
            assert_eq!(error_body(resp)?["error"]["kind"], "Usage");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[test]
fn cors_allows_listed_origin_only() -> TestResult<()> {
    let temp = tempfile::tempdir()?;
    let server = TestServer::start_with_cors(
        &temp.path().join("contacts.sqlite3"),
        &["http://localhost:3000"],
    )?;

    let allowed = ureq::get(&server.url("/rpc/getContacts"))
        .set("Origin", "http://localhost:3000")
        .call()?;
    assert_eq!(
        allowed.header("access-control-allow-origin"),
        Some("http://localhost:3000")
    );

    let other = ureq::get(&server.url("/rpc/getContacts"))
        .set("Origin", "http://evil.example")
        .call()?;
    assert_eq!(other.header("access-control-allow-origin"), None);
    Ok(())
}

#[test]
fn client_reports_unreachable_server_as_io() -> TestResult<()> {
    let port = pick_port()?;
    let client = RemoteClient::new(format!("http://127.0.0.1:{port}"))?;
    let err = client.get_contacts().expect_err("nothing listening");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.hint().is_some());
    Ok(())
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let url = format!("http://{addr}/healthz");
    let start = Instant::now();
    loop {
        if let Ok(resp) = ureq::get(&url).call() {
            if resp.status() == 200 {
                return Ok(());
            }
        }
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            let detail = stderr.trim();
            return Err(format!(
                "server exited before ready (status: {status}, stderr: {})",
                if detail.is_empty() { "<empty>" } else { detail }
            )
            .into());
        }
        if start.elapsed() > Duration::from_secs(8) {
            return Err("server did not start in time".into());
        }
        sleep(Duration::from_millis(20));
    }
}
