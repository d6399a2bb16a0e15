//! `formwright` command-line host.
//!
//! ```bash
//! formwright list
//! formwright import signup.json
//! formwright preview <id> --set email=a@b.co --set dob=2000-08-10 --today 2025-08-10
//! formwright delete <id>
//! ```

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use formwright_core::{FieldDefinition, FieldKind, FieldValue, FormSchema, FormSession};
use formwright_store::{FormLibrary, JsonFileSchemaStore, StoreConfig};

#[derive(Parser)]
#[command(name = "formwright")]
#[command(about = "Author, store and preview validated forms", long_about = None)]
struct Cli {
    /// JSON document holding the saved forms
    #[arg(long, env = "FORMWRIGHT_DATA", default_value = formwright_store::config::DEFAULT_DATA_FILE)]
    data: PathBuf,

    /// Write the data file without indentation
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved forms
    List,
    /// Print a saved form as JSON
    Show { id: String },
    /// Add a form schema from a JSON file
    Import { file: PathBuf },
    /// Delete a saved form
    Delete { id: String },
    /// Fill a saved form and print the resulting values and errors
    Preview {
        id: String,
        /// Field edit as FIELD=VALUE, FIELD being an id or a label; repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Reference date for duration fields (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Validate every field after applying the edits
        #[arg(long)]
        validate_all: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig {
        data_path: cli.data,
        pretty: !cli.compact,
    };
    let mut library = FormLibrary::open_default(JsonFileSchemaStore::new(&config))?;

    match cli.command {
        Command::List => {
            for form in library.forms() {
                let created = form
                    .created_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}\t{} fields", form.id, created, form.name, form.fields.len());
            }
        }
        Command::Show { id } => {
            let form = library
                .find(&id)
                .with_context(|| format!("no saved form with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(form)?);
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let form: FormSchema = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a form schema", file.display()))?;
            let saved = library.import(form)?;
            println!("{}", saved.id);
        }
        Command::Delete { id } => {
            let removed = library.delete_form(&id)?;
            println!("deleted {} ({})", removed.id, removed.name);
        }
        Command::Preview {
            id,
            set,
            today,
            validate_all,
        } => {
            let form = library
                .find(&id)
                .cloned()
                .with_context(|| format!("no saved form with id {id}"))?;
            let check = form.check();
            let mut session = match today {
                Some(date) => FormSession::init_on(form, date),
                None => library.preview(&id)?,
            };
            for edit in &set {
                let (field_id, value) = parse_edit(session.schema(), edit)?;
                session.on_change(&field_id, value);
                session.on_blur(&field_id);
            }
            let snapshot = if validate_all {
                session.validate_all()
            } else {
                session.snapshot()
            };
            let out = json!({
                "form": session.schema().id,
                "valid": snapshot.is_valid(),
                "values": snapshot.values,
                "errors": snapshot.errors,
                "schemaProblems": check.errors(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

/// Splits `FIELD=VALUE`, resolves FIELD by id then by label, and converts the
/// raw text the way an input control of that field would.
fn parse_edit(schema: &FormSchema, edit: &str) -> anyhow::Result<(String, FieldValue)> {
    let (key, raw) = edit
        .split_once('=')
        .with_context(|| format!("expected FIELD=VALUE, got {edit:?}"))?;
    let field = schema
        .field(key)
        .or_else(|| schema.fields.iter().find(|f| f.label == key))
        .with_context(|| format!("form has no field {key:?}"))?;
    Ok((field.id.clone(), input_value(field, raw)))
}

/// Text as an input control would hand it over: a single checkbox reads
/// `true`/`false`, a checkbox group reads a comma-separated selection, and
/// every other kind keeps the raw text.
fn input_value(field: &FieldDefinition, raw: &str) -> FieldValue {
    match field.kind {
        FieldKind::Checkbox if field.is_checkbox_group() => FieldValue::choices(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        ),
        FieldKind::Checkbox => {
            FieldValue::Bool(matches!(raw.trim(), "true" | "1" | "yes" | "on"))
        }
        _ => FieldValue::text(raw),
    }
}
