//! Extraction of plugin records from `risu --list-plugins` output.
//!
//! RISU interleaves plugin records with banner and progress text. Only lines
//! that start with `{` and mention `plugin` are considered; each is decoded
//! as strict JSON first and as a restricted literal second. Lines that fail
//! both, or that decode to something other than a mapping, are skipped
//! without counting. Every mapping becomes a record.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::literal::parse_literal;

const LISTING_TARGET: &str = "risu_runner::parser::listing";

/// Category assigned to records that do not declare one.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One discovered diagnostic plugin.
///
/// The well-known keys are typed when they hold strings; any other keys RISU
/// emitted, and well-known keys holding other values, are preserved verbatim
/// in [`PluginRecord::extra`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    /// Backend that provides the plugin, such as `core`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    /// Plugin identifier, usually its path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// Plugin category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining keys as emitted by RISU.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for PluginRecord {
    fn from(mut extra: Map<String, Value>) -> Self {
        let backend = take_string(&mut extra, "backend");
        let plugin = take_string(&mut extra, "plugin");
        let category = take_string(&mut extra, "category");
        let description = take_string(&mut extra, "description");
        Self {
            backend,
            plugin,
            category,
            description,
            extra,
        }
    }
}

/// Removes `key` from `map` when it holds a string.
fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(text) => Some(text),
        other => {
            map.insert(key.to_owned(), other);
            None
        }
    }
}

impl PluginRecord {
    /// Category used for grouping, defaulting to [`UNKNOWN_CATEGORY`].
    #[must_use]
    pub fn category_or_unknown(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
    }
}

/// Plugins discovered in one listing, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginListing {
    plugins: Vec<PluginRecord>,
}

impl PluginListing {
    /// Discovered plugins in the order RISU printed them.
    #[must_use]
    pub fn plugins(&self) -> &[PluginRecord] {
        &self.plugins
    }

    /// Number of plugins discovered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns whether no plugin was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin counts keyed by category.
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for plugin in &self.plugins {
            *counts
                .entry(plugin.category_or_unknown().to_owned())
                .or_insert(0) += 1;
        }
        counts
    }

    /// Consumes the listing, returning the plugins.
    #[must_use]
    pub fn into_plugins(self) -> Vec<PluginRecord> {
        self.plugins
    }
}

/// Parses plugin records from listing output.
///
/// # Example
///
/// ```
/// use risu_runner::parser::parse_listing;
///
/// let stdout = "RISU 3.1.4\n{'plugin': '/a.sh', 'category': 'system'}\n";
/// let listing = parse_listing(stdout);
/// assert_eq!(listing.len(), 1);
/// assert_eq!(listing.by_category().get("system"), Some(&1));
/// ```
#[must_use]
pub fn parse_listing(stdout: &str) -> PluginListing {
    let plugins = stdout
        .lines()
        .map(str::trim)
        .filter(|line| is_candidate(line))
        .filter_map(parse_record)
        .collect();
    PluginListing { plugins }
}

fn is_candidate(line: &str) -> bool {
    line.starts_with('{') && line.contains("plugin")
}

fn parse_record(line: &str) -> Option<PluginRecord> {
    let value = serde_json::from_str::<Value>(line)
        .or_else(|_| parse_literal(line))
        .map_err(|error| {
            debug!(
                target: LISTING_TARGET,
                %error,
                line,
                "skipping unparseable plugin line"
            );
        })
        .ok()?;

    match value {
        Value::Object(map) => Some(PluginRecord::from(map)),
        _ => {
            debug!(target: LISTING_TARGET, line, "skipping non-mapping plugin line");
            None
        }
    }
}
