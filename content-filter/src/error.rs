//! Error taxonomy for the filter engine.
//!
//! Configuration malformation is fatal (spec-level: the process does not
//! start with a bad configuration, and a failed reload keeps the previous
//! one). Referentially incomplete configuration (unknown filter id, unknown
//! plug-in type, unparseable optional numeric field) is *not* an error at
//! this level: the loader logs and continues, so those cases never reach a
//! `Result::Err` here.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors. Loading aborts; on a reload the caller keeps
/// whatever `ContentFilter` was already published.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("rule {rule_id}: filter group {group} out of range (0..{max})")]
    GroupOutOfRange {
        rule_id: u32,
        group: usize,
        max: usize,
    },

    #[error("rule {rule_id}: missing required 'action'")]
    MissingAction { rule_id: u32 },

    #[error("unknown action text '{0}'")]
    UnknownAction(String),

    #[error("filter {filter_id}: invalid pattern: {message}")]
    InvalidPattern { filter_id: u32, message: String },
}

/// Errors a plug-in library load can hit. Never fatal to the overall
/// configuration load (spec: unknown type => warn and skip), but the
/// registry surfaces them so the loader can log.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("load library {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol nfwf_register_filters missing in {path}: {source}")]
    MissingSymbol {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("type '{0}' is already registered")]
    DuplicateType(String),
}

/// Internal failure of a single filter callback. Never crosses the
/// `FilterObject` trait boundary as an `Err` — callers map it to
/// `Action::NoMatch` and log it, per the "filters are expected to have
/// self-logged" contract.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{kind} filter: {message}")]
    Internal { kind: &'static str, message: String },

    #[error("{kind} filter: i/o error: {source}")]
    Io {
        kind: &'static str,
        #[source]
        source: std::io::Error,
    },
}
