// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Confluo config is all-defaults, so the interesting failure is a misspelt
//! key under `deny_unknown_fields`. Those get the offending line highlighted
//! and a Jaro-Winkler "did you mean" hint.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity below which no correction is offered.
const MIN_SIMILARITY: f64 = 0.75;

/// A configuration problem reported at startup.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", table_label(.table))]
    #[diagnostic(
        code(confluo::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted table path, empty for the document root.
        table: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value parsed but failed a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(confluo::config::validation))]
    Validation { message: String },

    /// Wrong value types and anything else figment reports.
    #[error("configuration error: {0}")]
    #[diagnostic(code(confluo::config::other))]
    Other(String),
}

fn table_label(table: &str) -> String {
    if table.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{table}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error figment collected. `sources` pairs a display name with
/// TOML text and is only used to point at unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let table = error.path.join(".");
            match &error.kind {
                Kind::UnknownField(key, expected) => {
                    let located = sources.iter().find_map(|(name, content)| {
                        key_span(content, &table, key)
                            .map(|span| (span, NamedSource::new(name, content.clone())))
                    });
                    let (span, src) = located.unzip();
                    ConfigError::UnknownKey {
                        suggestion: suggest_key(key, expected),
                        valid_keys: expected.join(", "),
                        key: key.clone(),
                        table,
                        span,
                        src,
                    }
                }
                Kind::InvalidType(..) if !table.is_empty() => {
                    ConfigError::Other(format!("{table}: {}", error.kind))
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Span of `key = ...` inside the `[table]` section of `content`.
///
/// Tracks the current header line by line, so `[breaker.gmail]` never
/// matches keys that live under `[breaker.gmailx]` or `[breaker]`.
fn key_span(content: &str, table: &str, key: &str) -> Option<SourceSpan> {
    let mut current = "";
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        let indent = line.len() - body.len();
        if let Some(header) = body.strip_prefix('[') {
            current = header.split(']').next().unwrap_or_default().trim();
        } else if current == table
            && body
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            return Some((offset + indent, key.len()).into());
        }
        offset += line.len();
    }
    None
}

/// Closest entry of `candidates` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score > MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Print each error to stderr as a graphical miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
