//! Parsers for RISU output.
//!
//! Listing output is semi-structured text handled by [`listing`], with
//! [`literal`] as the safe fallback for Python-style records. Run output is a
//! JSON result file handled by [`results`].

pub mod listing;
pub mod literal;
pub mod results;

pub use self::listing::{PluginListing, PluginRecord, parse_listing};
pub use self::literal::{LiteralError, parse_literal};
pub use self::results::{
    DiagnosticOutcome, OutcomeClass, ResultDocument, ResultFileError, RunSummary,
    parse_result_file, summarize,
};
