// CLI integration tests for local contact flows.
use std::path::Path;
use std::process::{Command, Output};

use contactdb::api::{
    ContactApi, ContactField, CreateContactInput, ErrorKind, LocalClient, to_exit_code,
};
use serde_json::Value;

fn cmd(db: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_contactdb");
    let mut command = Command::new(exe);
    command
        .env_remove("CONTACTDB_URL")
        .arg("--db")
        .arg(db);
    command
}

fn run(db: &Path, args: &[&str]) -> Output {
    cmd(db).args(args).output().expect("run contactdb")
}

fn parse_json(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn add_list_update_delete_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("nested").join("contacts.sqlite3");

    let add = run(
        &db,
        &["add", "--name", "John Doe", "--email", "john@x.com", "--phone", "555-1"],
    );
    assert!(add.status.success(), "{}", String::from_utf8_lossy(&add.stderr));
    let created = parse_json(&add.stdout);
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["email"], "john@x.com");
    assert_eq!(created["address"], Value::Null);

    let add = run(&db, &["add", "--name", "Ada Lovelace", "--company", "Analytical"]);
    assert!(add.status.success());

    let list = run(&db, &["list"]);
    assert!(list.status.success());
    let names: Vec<String> = parse_json(&list.stdout)
        .as_array()
        .expect("array")
        .iter()
        .map(|contact| contact["name"].as_str().expect("name").to_string())
        .collect();
    assert_eq!(names, vec!["Ada Lovelace", "John Doe"]);

    let search = run(&db, &["list", "--search", "ANALYT"]);
    let found = parse_json(&search.stdout);
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    assert_eq!(found[0]["name"], "Ada Lovelace");

    let id_arg = id.to_string();
    let update = run(&db, &["update", &id_arg, "--clear", "email", "--notes", "met at conf"]);
    assert!(update.status.success(), "{}", String::from_utf8_lossy(&update.stderr));
    let updated = parse_json(&update.stdout);
    assert_eq!(updated["email"], Value::Null);
    assert_eq!(updated["notes"], "met at conf");
    assert_eq!(updated["phone_number"], "555-1");
    assert_eq!(updated["created_at"], created["created_at"]);
    assert_ne!(updated["updated_at"], created["updated_at"]);

    let get = run(&db, &["get", &id_arg]);
    assert!(get.status.success());
    assert_eq!(parse_json(&get.stdout), updated);

    let delete = run(&db, &["delete", &id_arg]);
    assert!(delete.status.success());
    assert_eq!(parse_json(&delete.stdout)["success"], true);
}

#[test]
fn update_touches_only_named_fields() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("contacts.sqlite3");
    let created = {
        let client = LocalClient::open(&db).expect("open");
        client
            .create_contact(
                CreateContactInput::new(" Ada ").with(ContactField::Notes, "first line\n"),
            )
            .expect("create")
    };

    let id_arg = created.id.to_string();
    let update = run(&db, &["update", &id_arg, "--company", "Acme"]);
    assert!(update.status.success(), "{}", String::from_utf8_lossy(&update.stderr));
    let updated = parse_json(&update.stdout);
    assert_eq!(updated["name"], " Ada ");
    assert_eq!(updated["notes"], "first line\n");
    assert_eq!(updated["company"], "Acme");
}

#[test]
fn missing_contacts_exit_with_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("contacts.sqlite3");
    let not_found = to_exit_code(ErrorKind::NotFound);

    let get = run(&db, &["get", "99"]);
    assert_eq!(get.status.code(), Some(not_found));
    assert_eq!(parse_json(&get.stdout), Value::Null);

    let update = run(&db, &["update", "99", "--name", "Ghost"]);
    assert_eq!(update.status.code(), Some(not_found));
    assert_eq!(parse_json(&update.stdout), Value::Null);

    let delete = run(&db, &["delete", "99"]);
    assert_eq!(delete.status.code(), Some(not_found));
    assert_eq!(parse_json(&delete.stdout)["success"], false);
}

#[test]
fn invalid_input_exits_with_validation_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("contacts.sqlite3");

    let add = run(&db, &["add", "--name", "  ", "--email", "not-an-email"]);
    assert_eq!(add.status.code(), Some(to_exit_code(ErrorKind::Validation)));
    let err = parse_json(&add.stderr);
    assert_eq!(err["error"]["kind"], "Validation");
    let fields: Vec<&str> = err["error"]["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["name", "email"]);

    let list = run(&db, &["list"]);
    assert_eq!(parse_json(&list.stdout), Value::Array(Vec::new()));
}

#[test]
fn usage_errors_exit_with_usage_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db = temp.path().join("contacts.sqlite3");

    let output = run(&db, &["get", "not-a-number"]);
    assert_eq!(output.status.code(), Some(to_exit_code(ErrorKind::Usage)));
    let err = parse_json(&output.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["hint"].is_string());

    let output = run(&db, &["update", "1", "--clear", "name"]);
    assert_eq!(output.status.code(), Some(to_exit_code(ErrorKind::Usage)));
}

#[test]
fn version_reports_package_version() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = run(&temp.path().join("unused.sqlite3"), &["version"]);
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    assert_eq!(value["name"], "contactdb");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}
