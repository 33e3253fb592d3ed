//! Output formatting utilities.

use colored::Colorize;
use serde::Serialize;
use sp_protocol_saml::{Profile, ValidationOutcome};
use tabled::{settings::Style, Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Prints a success message.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct OutcomeReport<'a> {
    outcome: &'static str,
    profile: Option<&'a Profile>,
}

/// Short name of an outcome.
#[must_use]
pub const fn outcome_name(outcome: &ValidationOutcome) -> &'static str {
    match outcome {
        ValidationOutcome::SignedIn(_) => "signed_in",
        ValidationOutcome::NoPassive => "no_passive",
        ValidationOutcome::LoggedOut(_) => "logged_out",
    }
}

/// Prints a validation outcome and its profile.
pub fn outcome(outcome: &ValidationOutcome, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Json => {
            let report = OutcomeReport {
                outcome: outcome_name(outcome),
                profile: outcome.profile(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            success(&format!("outcome: {}", outcome_name(outcome)));
            if let Some(profile) = outcome.profile() {
                let table = Table::new(profile_rows(profile)).with(Style::rounded()).to_string();
                println!("{table}");
            }
        }
    }
    Ok(())
}

fn profile_rows(profile: &Profile) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    for field in [
        "ID",
        "issuer",
        "inResponseTo",
        "sessionIndex",
        "nameID",
        "nameIDFormat",
        "mail",
        "email",
    ] {
        if let Some(value) = profile.get(field) {
            rows.push(FieldRow {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    for (name, value) in &profile.attributes {
        rows.push(FieldRow {
            field: name.clone(),
            value: value.values().join(", "),
        });
    }
    rows
}
