use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use propbook_lib::commands::FixCommand;
use propbook_lib::config::AppPaths;
use propbook_lib::model::FieldKey;
use propbook_lib::repair::{FieldCorrections, RepairOutcome, RepairSession, TerminalPrompt};
use propbook_lib::{JsonAddressBookStorage, LoadReport};

/// Exit code when the user abandons a repair session.
const REPAIR_CANCELLED_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "propbook", about = "Contact and property book", version)]
struct Cli {
    /// Address book file to use instead of the one in preferences.
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the address book and summarise valid and quarantined records.
    Status {
        /// Emit the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List valid persons and properties.
    List,
    /// Find persons whose name contains any of the keywords.
    Find {
        #[arg(required = true)]
        keywords: Vec<String>,
    },
    /// Fix quarantined records one at a time, prompting for each invalid field.
    Repair,
    /// Fix one quarantined record by its position in the file (1-based).
    Fix(FixArgs),
}

#[derive(Debug, Args)]
struct FixArgs {
    #[arg(allow_negative_numbers = true)]
    index: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    listing: Option<String>,
    /// Comma-separated tags.
    #[arg(long)]
    tags: Option<String>,
    /// Comma-separated property names.
    #[arg(long)]
    owned: Option<String>,
    /// Comma-separated property names.
    #[arg(long)]
    interested: Option<String>,
}

impl FixArgs {
    fn corrections(&self) -> FieldCorrections {
        [
            (FieldKey::Name, &self.name),
            (FieldKey::Phone, &self.phone),
            (FieldKey::Email, &self.email),
            (FieldKey::Address, &self.address),
            (FieldKey::Listing, &self.listing),
            (FieldKey::Tags, &self.tags),
            (FieldKey::OwnedProperties, &self.owned),
            (FieldKey::InterestedProperties, &self.interested),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|value| (key, value)))
        .collect()
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let paths = AppPaths::resolve().context("determine data directory")?;
    // Dropped at the end of `run`, which flushes the file log.
    let _log_guard = match propbook_lib::logging::init(&paths.logs_dir()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            propbook_lib::init_logging();
            tracing::warn!(target: "propbook", event = "file_logging_unavailable", error = %err);
            None
        }
    };

    let book_path = match cli.file {
        Some(path) => path,
        None => paths.address_book_path(&paths.load_prefs()),
    };
    let storage = JsonAddressBookStorage::new(book_path);
    tracing::debug!(target: "propbook", event = "cli_start", path = %storage.path().display());

    match cli.command {
        Commands::Status { json } => handle_status(&storage, json),
        Commands::List => {
            print_book(&storage.load_or_default());
            Ok(0)
        }
        Commands::Find { keywords } => {
            let report = storage.load_or_default();
            let found = report.address_book().find_persons(&keywords);
            for person in &found {
                println!("{}  {}  {}", person.name, person.phone, person.email);
            }
            println!("{} persons listed", found.len());
            Ok(0)
        }
        Commands::Repair => handle_repair(&storage),
        Commands::Fix(args) => {
            let command = FixCommand::new(args.index, args.corrections());
            let report = command.execute(&storage)?;
            println!("Record #{} fixed.", args.index);
            print_summary(&report);
            Ok(0)
        }
    }
}

fn handle_status(storage: &JsonAddressBookStorage, as_json: bool) -> Result<i32> {
    let report = storage
        .load_report()
        .with_context(|| format!("load {}", storage.path().display()))?;

    if as_json {
        let payload = json!({
            "generatedAt": chrono::Utc::now().to_rfc3339(),
            "path": storage.path().display().to_string(),
            "summary": report.summary(),
            "invalidEntries": report.invalid_entries(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_summary(&report);
        for entry in report.invalid_entries() {
            let fields: Vec<&str> = entry.invalid_fields.iter().map(|k| k.as_str()).collect();
            println!(
                "  #{:<4} {}{}",
                entry.display_index(),
                entry.reason,
                if fields.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", fields.join(", "))
                }
            );
        }
    }
    Ok(0)
}

fn handle_repair(storage: &JsonAddressBookStorage) -> Result<i32> {
    let stdin = io::stdin();
    let prompt = TerminalPrompt::new(stdin.lock(), io::stdout());
    match RepairSession::new(storage, prompt).run()? {
        RepairOutcome::Done { report, repaired } => {
            println!("Repaired {repaired} records.");
            print_summary(&report);
            Ok(0)
        }
        RepairOutcome::Cancelled { repaired } => {
            eprintln!("Repair cancelled after {repaired} records.");
            Ok(REPAIR_CANCELLED_EXIT_CODE)
        }
    }
}

fn print_summary(report: &LoadReport) {
    let summary = report.summary();
    println!(
        "Persons: {} valid, {} quarantined ({} duplicates)",
        summary.valid_persons, summary.invalid_persons, summary.duplicate_persons
    );
    println!("Properties: {}", summary.properties);
}

fn print_book(report: &LoadReport) {
    let book = report.address_book();
    for (position, person) in book.persons().iter().enumerate() {
        let listing = person
            .listing
            .as_ref()
            .map(|l| format!(" ({l})"))
            .unwrap_or_default();
        println!(
            "{}. {}{}  {}  {}  {}",
            position + 1,
            person.name,
            listing,
            person.phone,
            person.email,
            person.address
        );
    }
    for property in book.properties() {
        println!(
            "- {}  {}  ${}",
            property.property_name, property.address, property.price
        );
    }
    print_summary(report);
}
