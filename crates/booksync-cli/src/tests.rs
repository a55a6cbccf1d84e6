use booksync_core::{Action, ErrorResponse, SyncError};
use clap::{CommandFactory, Parser};
use pretty_assertions::assert_eq;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::sync::write_json;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("booksync").chain(args.iter().copied())).unwrap()
}

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn subcommands_map_to_actions() {
    assert_eq!(parse(&["test"]).command.action(), Action::Test);
    assert_eq!(parse(&["pull"]).command.action(), Action::Pull);
    assert_eq!(parse(&["push"]).command.action(), Action::Push);
    assert_eq!(parse(&["sync"]).command.action(), Action::FullSync);
}

#[test]
fn wire_names_are_accepted_as_aliases() {
    assert_eq!(parse(&["sheets-to-supabase"]).command, Commands::Pull);
    assert_eq!(parse(&["supabase-to-sheets"]).command, Commands::Push);
    assert_eq!(parse(&["full-sync"]).command, Commands::Sync);
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["booksync", "drop"]).is_err());
    assert!(Cli::try_parse_from(["booksync"]).is_err());
}

#[test]
fn request_carries_canonical_action_and_locator() {
    let cli = parse(&["push", "--spreadsheet-id", "sheet-1"]);
    let request = cli.request();
    assert_eq!(request.action.as_deref(), Some("supabase-to-sheets"));
    assert_eq!(request.spreadsheet_id.as_deref(), Some("sheet-1"));
    assert_eq!(request.spreadsheet_url, None);

    let cli = parse(&[
        "--spreadsheet-url",
        "https://docs.google.com/spreadsheets/d/1AbC/edit",
        "pull",
    ]);
    assert_eq!(
        cli.request().spreadsheet_url.as_deref(),
        Some("https://docs.google.com/spreadsheets/d/1AbC/edit")
    );
}

#[test]
fn write_json_prints_pretty_body_with_newline() {
    let mut out = Vec::new();
    write_json(&mut out, &ErrorResponse::new(SyncError::MissingLocator)).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.contains("\n  \"success\": false"));
    assert!(text.contains("\"error\": \"Valid Spreadsheet ID or URL is required\""));
}

#[test]
fn errors_display_underlying_message() {
    let err = CliError::from(SyncError::backend("Push to Sheets failed: quota"));
    assert_eq!(err.to_string(), "Push to Sheets failed: quota");

    let err = CliError::Connectivity("Supabase: down".to_string());
    assert_eq!(err.to_string(), "Connectivity check failed: Supabase: down");
}
