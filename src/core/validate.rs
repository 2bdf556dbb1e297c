//! Purpose: Validate and normalize contact inputs before they reach storage.
//! Exports: `NewContact`, `ContactChanges`, `validate_create`, `validate_update`, `is_valid_email`.
//! Role: Record-model rules, independent of transport and storage.
//! Invariants: Every failing field is reported in one `Validation` error.
//! Invariants: Empty-string optional fields normalize to null.
//! Invariants: A name is never empty or whitespace-only; a non-null email is well formed.
use super::contact::{ContactField, CreateContactInput, UpdateContactInput};
use super::error::{Error, FieldIssue};
use super::patch::Field;

pub const NAME_REQUIRED: &str = "Name is required";
pub const NAME_NOT_NULL: &str = "Name cannot be null";
pub const INVALID_EMAIL: &str = "Invalid email";

/// A create input that passed validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewContact {
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

/// An update input that passed validation: only the mentioned columns, in column order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContactChanges {
    pub id: i64,
    pub fields: Vec<(ContactField, Option<String>)>,
}

impl ContactChanges {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn validate_create(input: CreateContactInput) -> Result<NewContact, Error> {
    let mut issues = Vec::new();
    if let Some(issue) = check_name(&input.name) {
        issues.push(issue);
    }
    let email = normalize(input.email);
    if let Some(issue) = check_email(email.as_deref()) {
        issues.push(issue);
    }
    if !issues.is_empty() {
        return Err(Error::validation(issues));
    }

    Ok(NewContact {
        name: input.name,
        phone_number: normalize(input.phone_number),
        email,
        address: normalize(input.address),
        company: normalize(input.company),
        notes: normalize(input.notes),
    })
}

pub fn validate_update(input: UpdateContactInput) -> Result<ContactChanges, Error> {
    let mut issues = Vec::new();
    let mut fields = Vec::new();

    match &input.name {
        Field::Unchanged => {}
        Field::Null => issues.push(FieldIssue::new("name", NAME_NOT_NULL)),
        Field::Value(name) => match check_name(name) {
            Some(issue) => issues.push(issue),
            None => fields.push((ContactField::Name, Some(name.clone()))),
        },
    }

    for field in ContactField::OPTIONAL {
        let Some(value) = input.field(field).clone().into_option() else {
            continue;
        };
        let value = normalize(value);
        if field == ContactField::Email {
            if let Some(issue) = check_email(value.as_deref()) {
                issues.push(issue);
                continue;
            }
        }
        fields.push((field, value));
    }

    if !issues.is_empty() {
        return Err(Error::validation(issues).with_id(input.id));
    }
    Ok(ContactChanges {
        id: input.id,
        fields,
    })
}

fn check_name(name: &str) -> Option<FieldIssue> {
    if name.trim().is_empty() {
        Some(FieldIssue::new("name", NAME_REQUIRED))
    } else {
        None
    }
}

fn check_email(email: Option<&str>) -> Option<FieldIssue> {
    match email {
        Some(email) if !is_valid_email(email) => Some(FieldIssue::new("email", INVALID_EMAIL)),
        _ => None,
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// ASCII `local@domain.tld`: the local part uses letters, digits and `_'+-.`,
/// never starts with a dot or ends with `'`/`.`; each domain label starts with
/// a letter or digit; the top-level label is two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    if email.contains("..") {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = match local.as_bytes() {
        [] | [b'.', ..] => false,
        [.., last] => {
            local.bytes().all(|b| b.is_ascii_alphanumeric() || b"_'+-.".contains(&b))
                && (last.is_ascii_alphanumeric() || b"_+-".contains(last))
        }
    };
    if !local_ok {
        return false;
    }

    let Some((hosts, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let hosts_ok = hosts.split('.').all(|label| match label.as_bytes() {
        [first, rest @ ..] => {
            first.is_ascii_alphanumeric()
                && rest.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        [] => false,
    });
    hosts_ok && tld.len() >= 2 && tld.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn create_rejects_blank_name_and_bad_email_together() {
        let input = CreateContactInput::new("   ").with(ContactField::Email, "not-an-email");
        let err = validate_create(input).expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);
        let fields: Vec<&str> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email"]);
        assert_eq!(err.issues()[0].message, NAME_REQUIRED);
    }

    #[test]
    fn create_normalizes_empty_strings_to_null() {
        let input = CreateContactInput::new("John Doe")
            .with(ContactField::Email, "")
            .with(ContactField::Company, "")
            .with(ContactField::PhoneNumber, "555-1");
        let new = validate_create(input).expect("valid");
        assert_eq!(new.name, "John Doe");
        assert_eq!(new.email, None);
        assert_eq!(new.company, None);
        assert_eq!(new.phone_number.as_deref(), Some("555-1"));
    }

    #[test]
    fn create_keeps_name_as_given() {
        let new = validate_create(CreateContactInput::new(" Ada ")).expect("valid");
        assert_eq!(new.name, " Ada ");
    }

    #[test]
    fn update_collects_only_mentioned_fields() {
        let input = UpdateContactInput::new(4)
            .with_null(ContactField::Email)
            .with_value(ContactField::Notes, "call back");
        let changes = validate_update(input).expect("valid");
        assert_eq!(changes.id, 4);
        assert_eq!(
            changes.fields,
            vec![
                (ContactField::Email, None),
                (ContactField::Notes, Some("call back".to_string())),
            ]
        );
    }

    #[test]
    fn update_with_only_id_is_empty() {
        let changes = validate_update(UpdateContactInput::new(9)).expect("valid");
        assert!(changes.is_empty());
    }

    #[test]
    fn update_rejects_null_name_and_blank_name() {
        let err = validate_update(UpdateContactInput::new(1).with_null(ContactField::Name))
            .expect_err("null name");
        assert_eq!(err.issues()[0].message, NAME_NOT_NULL);
        assert_eq!(err.id(), Some(1));

        let err = validate_update(UpdateContactInput::new(1).with_value(ContactField::Name, ""))
            .expect_err("blank name");
        assert_eq!(err.issues()[0].message, NAME_REQUIRED);
    }

    #[test]
    fn update_empty_email_clears_the_field() {
        let changes =
            validate_update(UpdateContactInput::new(2).with_value(ContactField::Email, ""))
                .expect("valid");
        assert_eq!(changes.fields, vec![(ContactField::Email, None)]);
    }

    #[test]
    fn update_rejects_malformed_email() {
        let err = validate_update(
            UpdateContactInput::new(3)
                .with_value(ContactField::Email, "jöhn@x.com")
                .with_value(ContactField::Company, "Acme"),
        )
        .expect_err("invalid email");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.id(), Some(3));
        let fields: Vec<&str> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["email"]);
    }

    #[test]
    fn email_syntax() {
        for ok in [
            "john@x.com",
            "a.b+tag@mail.example.org",
            "x@sub-domain.io",
            "o'brien@x.ie",
            "JOHN_DOE@EXAMPLE.COM",
        ] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in [
            "plain",
            "@x.com",
            "a@",
            "a@b",
            "a@@b.com",
            "a b@c.com",
            "a@b.c",
            "a@-b.com",
            ".a@b.com",
            "a..b@c.com",
            "a@b..com",
            "a.@b.com",
            "jöhn@x.com",
            "john@exämple.com",
            "john@x.cöm",
            "john@x.c0m",
            "a<b@c.com",
        ] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }
}
