//! Purpose: Hold top-level CLI command dispatch for `contactdb`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Contact commands run through `ContactBook`/`ContactForm` on any `ContactApi`.
//! Invariants: Not-found outcomes print their result and exit with the NotFound code.

use super::*;

use contactdb::api::{Contact, ContactApi, ContactId, LocalClient, RemoteClient, UpdateContactInput};
use contactdb::app::{ContactBook, ContactForm};
use serde::Serialize;

pub(super) fn dispatch_command(
    command: Command,
    target: Target,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "contactdb", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Serve(args) => {
            let Target::Local(db_path) = target else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("serve uses a local database")
                    .with_hint("Drop --remote (or unset CONTACTDB_URL) and pass --db instead."));
            };
            let config = serve::ServeConfig {
                bind: parse_bind(&args)?,
                db_path,
                cors_allowed_origins: args.cors_origin,
            };
            serve::validate_config(&config)?;
            emit_serve_startup_guidance(&config);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        command => match target {
            Target::Local(path) => {
                run_contact_command(LocalClient::open(path)?, command, color_mode)
            }
            Target::Remote(url) => {
                run_contact_command(RemoteClient::new(url)?, command, color_mode)
            }
        },
    }
}

fn run_contact_command<A: ContactApi>(
    api: A,
    command: Command,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    let book = ContactBook::new(api);
    match command {
        Command::Health => {
            let health = book.api().healthcheck()?;
            emit_json(to_json(&health)?, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::List { search, format } => {
            book.load()?;
            if let Some(term) = search {
                book.set_search(term);
            }
            let visible = book.visible();
            match format {
                ListFormat::Json => emit_json(to_json(&visible)?, color_mode),
                ListFormat::Table => println!("{}", render::contact_table(&visible)),
            }
            Ok(RunOutcome::ok())
        }
        Command::Get { id } => {
            let contact = book.api().get_contact(ContactId { id })?;
            emit_found(contact, color_mode)
        }
        Command::Add(args) => {
            let mut form = ContactForm::new();
            form.name = args.name;
            apply_fields(&mut form, &args.fields);
            let contact = book.create(form.to_create_input()?)?;
            emit_json(to_json(&contact)?, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Update(args) => {
            let Some(current) = book.api().get_contact(ContactId { id: args.id })? else {
                return emit_found(None::<()>, color_mode);
            };
            let input = update_input(&current, &args)?;
            let updated = book.update(input)?;
            emit_found(updated, color_mode)
        }
        Command::Delete { id } => {
            let success = book.delete(id)?;
            emit_json(json!({ "success": success }), color_mode);
            Ok(outcome_for(success))
        }
        Command::Serve(_) | Command::Version | Command::Completion { .. } => {
            Err(Error::new(ErrorKind::Internal).with_message("command is not a contact command"))
        }
    }
}

/// Edits the stored contact's draft with the flags and returns only the changed fields.
fn update_input(current: &Contact, args: &UpdateArgs) -> Result<UpdateContactInput, Error> {
    let mut form = ContactForm::from_contact(current);
    if let Some(name) = &args.name {
        form.name = name.clone();
    }
    apply_fields(&mut form, &args.fields);
    for field in &args.clear {
        form.set(ContactField::from(*field), "");
    }
    form.changes_from(current)
}

fn apply_fields(form: &mut ContactForm, fields: &FieldArgs) {
    for (field, value) in fields.values() {
        if let Some(value) = value {
            form.set(field, value);
        }
    }
}

fn emit_found<T: Serialize>(value: Option<T>, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    let found = value.is_some();
    emit_json(to_json(&value)?, color_mode);
    Ok(outcome_for(found))
}

fn outcome_for(found: bool) -> RunOutcome {
    if found {
        RunOutcome::ok()
    } else {
        RunOutcome::with_code(to_exit_code(ErrorKind::NotFound))
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output json")
            .with_source(err)
    })
}
