//! Purpose: SQLite-backed persistence for contact records.
//! Exports: `ContactStore`.
//! Role: The five storage operations (create, get, list, update, delete) on one table.
//! Invariants: The handle is constructed explicitly and injected; there is no global connection.
//! Invariants: Each operation touches at most one row; update reads and writes in one transaction.
//! Invariants: `AUTOINCREMENT` ids are never reused, even after deletes.
//! Invariants: `updated_at` moves strictly forward whenever a field is written.
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use time::OffsetDateTime;

use super::contact::Contact;
use super::error::{Error, ErrorKind};
use super::timestamp;
use super::validate::{ContactChanges, NewContact};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone_number TEXT,
    email TEXT,
    address TEXT,
    company TEXT,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#;

const COLUMNS: &str =
    "id, name, phone_number, email, address, company, notes, created_at, updated_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ContactStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ContactStore {
    /// Opens (creating if needed) the database file and its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message(format!(
                        "failed to create database directory {}",
                        parent.display()
                    ))
                    .with_source(err)
            })?;
        }
        let conn = Connection::open(path).map_err(|err| {
            Error::new(ErrorKind::Storage)
                .with_message(format!("failed to open database {}", path.display()))
                .with_hint("Check the --db path and its permissions.")
                .with_source(err)
        })?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .map_err(|err| storage_error("failed to open in-memory database", err))?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, Error> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|err| storage_error("failed to configure database", err))?;
        conn.execute_batch(SCHEMA)
            .map_err(|err| storage_error("failed to create contacts table", err))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn create(&self, new: &NewContact) -> Result<Contact, Error> {
        let stamp = encode_timestamp(timestamp::now())?;
        let sql = format!(
            "INSERT INTO contacts (name, phone_number, email, address, company, notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING {COLUMNS}"
        );
        self.conn()
            .query_row(
                &sql,
                params![
                    new.name,
                    new.phone_number,
                    new.email,
                    new.address,
                    new.company,
                    new.notes,
                    stamp,
                ],
                row_to_contact,
            )
            .map_err(|err| storage_error("failed to insert contact", err))
    }

    pub fn get(&self, id: i64) -> Result<Option<Contact>, Error> {
        select_one(&self.conn(), id).map_err(|err| storage_error("failed to read contact", err))
    }

    /// All contacts, ascending by name (binary collation), ties broken by id.
    pub fn list(&self) -> Result<Vec<Contact>, Error> {
        let conn = self.conn();
        let sql = format!("SELECT {COLUMNS} FROM contacts ORDER BY name ASC, id ASC");
        let read = || -> rusqlite::Result<Vec<Contact>> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_contact)?;
            rows.collect()
        };
        read().map_err(|err| storage_error("failed to list contacts", err))
    }

    /// Writes only the fields present in `changes`. An empty patch returns the
    /// current row as-is without touching `updated_at`.
    pub fn update(&self, changes: &ContactChanges) -> Result<Option<Contact>, Error> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|err| storage_error("failed to begin update", err))?;

        let Some(current) =
            select_one(&tx, changes.id).map_err(|err| storage_error("failed to read contact", err))?
        else {
            return Ok(None);
        };
        if changes.is_empty() {
            return Ok(Some(current));
        }

        let updated_at = next_updated_at(current.updated_at, timestamp::now());
        let mut assignments = Vec::with_capacity(changes.fields.len() + 1);
        let mut values = Vec::with_capacity(changes.fields.len() + 2);
        for (field, value) in &changes.fields {
            values.push(match value {
                Some(text) => Value::Text(text.clone()),
                None => Value::Null,
            });
            assignments.push(format!("{} = ?{}", field.as_str(), values.len()));
        }
        values.push(Value::Text(encode_timestamp(updated_at)?));
        assignments.push(format!("updated_at = ?{}", values.len()));
        values.push(Value::Integer(changes.id));

        let sql = format!(
            "UPDATE contacts SET {} WHERE id = ?{} RETURNING {COLUMNS}",
            assignments.join(", "),
            values.len()
        );
        let contact = tx
            .query_row(&sql, params_from_iter(values), row_to_contact)
            .map_err(|err| storage_error("failed to update contact", err).with_id(changes.id))?;
        tx.commit()
            .map_err(|err| storage_error("failed to commit update", err).with_id(changes.id))?;
        Ok(Some(contact))
    }

    /// True iff a row existed and was removed.
    pub fn delete(&self, id: i64) -> Result<bool, Error> {
        let removed = self
            .conn()
            .execute("DELETE FROM contacts WHERE id = ?1", [id])
            .map_err(|err| storage_error("failed to delete contact", err).with_id(id))?;
        Ok(removed > 0)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn select_one(conn: &Connection, id: i64) -> rusqlite::Result<Option<Contact>> {
    let sql = format!("SELECT {COLUMNS} FROM contacts WHERE id = ?1");
    conn.query_row(&sql, [id], row_to_contact).optional()
}

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        email: row.get(3)?,
        address: row.get(4)?,
        company: row.get(5)?,
        notes: row.get(6)?,
        created_at: column_timestamp(row, 7)?,
        updated_at: column_timestamp(row, 8)?,
    })
}

fn column_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let text: String = row.get(idx)?;
    timestamp::parse(&text)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn encode_timestamp(ts: OffsetDateTime) -> Result<String, Error> {
    timestamp::format(ts).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode timestamp")
            .with_source(err)
    })
}

fn next_updated_at(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    if now > previous {
        now
    } else {
        previous + time::Duration::microseconds(1)
    }
}

fn storage_error(message: &str, err: rusqlite::Error) -> Error {
    Error::new(ErrorKind::Storage)
        .with_message(message)
        .with_source(err)
}
