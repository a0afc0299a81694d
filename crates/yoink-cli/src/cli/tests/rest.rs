//! Tests for status, history, and checksum subcommands.

use super::parse;
use crate::cli::CliCommand;
use std::path::Path;

#[test]
fn cli_parse_status() {
    match parse(&["yoink", "status"]) {
        CliCommand::Status { output_dir } => assert!(output_dir.is_none()),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_output_dir() {
    match parse(&["yoink", "status", "--output-dir", "/srv/docs"]) {
        CliCommand::Status { output_dir } => {
            assert_eq!(output_dir.as_deref(), Some(Path::new("/srv/docs")));
        }
        _ => panic!("expected Status with --output-dir"),
    }
}

#[test]
fn cli_parse_history() {
    match parse(&["yoink", "history", "slva446"]) {
        CliCommand::History { id, output_dir } => {
            assert_eq!(id, "slva446");
            assert!(output_dir.is_none());
        }
        _ => panic!("expected History"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["yoink", "checksum", "/tmp/doc.pdf"]) {
        CliCommand::Checksum { path } => assert_eq!(path, "/tmp/doc.pdf"),
        _ => panic!("expected Checksum"),
    }
}
