//! The `migrate` subcommand.

use miette::Result;
use tbio_profiles::migrations::{MigrationStatus, OutcomeKind};
use tbio_profiles::{MigrationOutcome, RunRequest};

use crate::site::Site;

/// Run the migrate command.
pub async fn run_migrate_command(
    site: &Site,
    migration_name: Option<&str>,
    list: bool,
    dry_run: bool,
    safe: bool,
) -> Result<()> {
    if list {
        let statuses = site
            .migrations
            .status()
            .await
            .map_err(|e| miette::miette!("{}", e))?;
        println!("Available migrations:\n");
        for status in &statuses {
            print!("{}", describe_status(status));
        }
        return Ok(());
    }

    let request = RunRequest {
        only: migration_name.map(str::to_string),
        safe_only: safe,
        dry_run,
    };

    let outcomes = site
        .migrations
        .migrate(&request)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    if outcomes.is_empty() {
        println!("No migrations to run.");
        return Ok(());
    }

    for outcome in &outcomes {
        print!("{}", describe_outcome(outcome));
    }

    Ok(())
}

fn describe_status(status: &MigrationStatus) -> String {
    let state = match &status.applied {
        Some(entry) => format!(
            "[APPLIED {}]",
            entry.ran_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => "[PENDING]".to_string(),
    };
    let mut out = format!("  {} {}\n", state, status.name);
    out.push_str(&format!("      {}\n", status.description));
    if !status.depends_on.is_empty() {
        out.push_str(&format!("      after: {}\n", status.depends_on.join(", ")));
    }
    if !status.options.safe {
        out.push_str("      (not run with --safe)\n");
    }
    out.push('\n');
    out
}

fn describe_outcome(outcome: &MigrationOutcome) -> String {
    let mut out = format!("\n=== {} ===\n", outcome.name);
    match &outcome.kind {
        OutcomeKind::AlreadyApplied => out.push_str("Already applied, skipped\n"),
        OutcomeKind::NothingToDo => out.push_str("Nothing to migrate, marked as applied\n"),
        OutcomeKind::Previewed(preview) => {
            out.push_str(&format!(
                "Dry-run: {} record(s) would be updated\n",
                preview.records_to_update
            ));
            if !preview.changes.is_empty() {
                out.push_str("\nChanges:\n");
                for change in &preview.changes {
                    out.push_str(&format!("  - {}\n", change));
                }
            }
        }
        OutcomeKind::Applied(result) => {
            out.push_str(&format!(
                "Applied: {} record(s) updated\n",
                result.records_updated
            ));
            for warning in &result.warnings {
                out.push_str(&format!("  Warning: {}\n", warning));
            }
        }
    }
    out
}
