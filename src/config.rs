//! Site configuration module.
//!
//! Handles loading and validating the optional `sitedeploy.json` file found
//! at the publish root. The config declares which content types are worth
//! gzipping and a list of per-object directives that override headers or the
//! gzip decision for keys matching a pattern.
//!
//! ## Config File Format
//!
//! ```json
//! {
//!   "gzip_mimetypes": ["text/html", "text/css", "application/javascript"],
//!   "object_specific": [
//!     { "path": "^images/.*", "gzip": false,
//!       "headers": { "Cache-Control": "max-age=86400" } },
//!     { "path": ".*", "headers": { "Cache-Control": "max-age=60" } }
//!   ]
//! }
//! ```
//!
//! A missing file is not an error — it yields the empty config (nothing is
//! gzipped, no overrides). A file that is present but broken is always a hard
//! failure: this tool runs in CI, and publishing a site with half of a typo'd
//! config applied would be far harder to notice than a failed build.
//!
//! ## Directive Matching
//!
//! `object_specific` entries are regular expressions tried in declared order
//! against each object's destination key; the first match wins outright.
//! Matching is anchored at the start of the key and does not need to consume
//! it: `images/` matches both `images/a.jpg` and `images/deep/b.jpg`.
//! Patterns that want to match the whole key must end with `$` themselves.
//!
//! Unknown keys are rejected at every level to catch typos early.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Name of the per-site configuration file, excluded from every upload.
pub const CONFIG_FILE_NAME: &str = "sitedeploy.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {0}: {1}")]
    Io(String, std::io::Error),
    #[error("sitedeploy.json is not valid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("sitedeploy.json is invalid: {0}")]
    Schema(String),
}

/// Per-site publishing configuration, immutable after load.
///
/// Shared read-only by every upload worker; there is deliberately no way to
/// mutate it after [`load_config`] returns.
#[derive(Debug, Clone, Default)]
pub struct SiteConfig {
    /// Content types gzipped by default (unless a directive says otherwise).
    pub gzip_mimetypes: BTreeSet<String>,
    /// Ordered override directives; first match wins.
    pub object_specific: Vec<Directive>,
}

/// One `object_specific` entry: a path pattern plus its overrides.
#[derive(Debug, Clone)]
pub struct Directive {
    /// The pattern exactly as written in the config file.
    pub path: String,
    /// Explicit gzip decision, overriding the mimetype list in either direction.
    pub gzip: Option<bool>,
    /// Header overrides, applied after all computed headers.
    pub headers: BTreeMap<String, String>,
    // Compiled form of `path`, anchored at the start of the key.
    pattern: Regex,
}

impl Directive {
    /// Whether this directive applies to `destination_key`.
    ///
    /// Anchored at position 0; does not need to consume the whole key.
    pub fn matches(&self, destination_key: &str) -> bool {
        self.pattern.is_match(destination_key)
    }
}

impl SiteConfig {
    /// Return the first directive whose pattern matches `destination_key`.
    ///
    /// Directives are tried in declared order and never merged; the linear
    /// scan is fine at site-config sizes.
    pub fn directive_for(&self, destination_key: &str) -> Option<&Directive> {
        self.object_specific
            .iter()
            .find(|d| d.matches(destination_key))
    }
}

// Serde-facing shape. Closed at every level: an unknown key anywhere in the
// file is a schema error, not a no-op.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    gzip_mimetypes: Vec<String>,
    #[serde(default)]
    object_specific: Vec<RawDirective>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDirective {
    path: String,
    gzip: Option<bool>,
    headers: Option<BTreeMap<String, String>>,
}

/// Load `sitedeploy.json` from `root`.
///
/// A missing file yields the empty config. A present file must parse as JSON
/// ([`ConfigError::Parse`]) and satisfy the schema ([`ConfigError::Schema`]);
/// either failure aborts the run before any upload starts.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join(CONFIG_FILE_NAME);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "no sitedeploy.json, using empty config");
            return Ok(SiteConfig::default());
        }
        Err(e) => return Err(ConfigError::Io(path.display().to_string(), e)),
    };
    parse_config(&contents)
}

/// Parse and validate config file contents.
///
/// Split from [`load_config`] so schema tests don't need a filesystem.
pub fn parse_config(contents: &str) -> Result<SiteConfig, ConfigError> {
    // Two phases so a malformed file and a mis-shapen file fail differently:
    // the former carries the JSON diagnostic, the latter names the offending
    // field.
    let value: serde_json::Value =
        serde_json::from_str(contents).map_err(ConfigError::Parse)?;
    let raw: RawConfig =
        serde_json::from_value(value).map_err(|e| ConfigError::Schema(e.to_string()))?;
    validate(raw)
}

fn validate(raw: RawConfig) -> Result<SiteConfig, ConfigError> {
    let mut gzip_mimetypes = BTreeSet::new();
    for mimetype in raw.gzip_mimetypes {
        if !gzip_mimetypes.insert(mimetype.clone()) {
            return Err(ConfigError::Schema(format!(
                "gzip_mimetypes contains '{mimetype}' more than once"
            )));
        }
    }

    let mut object_specific = Vec::with_capacity(raw.object_specific.len());
    for directive in raw.object_specific {
        if directive.path.is_empty() {
            return Err(ConfigError::Schema(
                "object_specific directive has an empty path".into(),
            ));
        }
        // Wrapping in a non-capturing group anchors the pattern at the start
        // of the key without changing what the pattern itself can match.
        let pattern = Regex::new(&format!("^(?:{})", directive.path)).map_err(|e| {
            ConfigError::Schema(format!(
                "object_specific path '{}' is not a valid pattern: {e}",
                directive.path
            ))
        })?;
        object_specific.push(Directive {
            path: directive.path,
            gzip: directive.gzip,
            headers: directive.headers.unwrap_or_default(),
            pattern,
        });
    }

    Ok(SiteConfig {
        gzip_mimetypes,
        object_specific,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn assert_valid(json: &str) -> SiteConfig {
        parse_config(json).unwrap()
    }

    fn assert_schema_error(json: &str) {
        assert!(matches!(parse_config(json), Err(ConfigError::Schema(_))));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn missing_file_yields_empty_config() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert!(config.gzip_mimetypes.is_empty());
        assert!(config.object_specific.is_empty());
    }

    #[test]
    fn file_loaded_from_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"{"gzip_mimetypes": ["text/html"]}"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert!(config.gzip_mimetypes.contains("text/html"));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let result = parse_config("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_json_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "{{{{").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Parse(_))));
    }

    // =========================================================================
    // Schema: top level
    // =========================================================================

    #[test]
    fn empty_object_is_valid() {
        let config = assert_valid("{}");
        assert!(config.gzip_mimetypes.is_empty());
        assert!(config.object_specific.is_empty());
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        assert_schema_error(r#"{"something_else": "here"}"#);
    }

    // =========================================================================
    // Schema: gzip_mimetypes
    // =========================================================================

    #[test]
    fn gzip_mimetypes_can_be_empty() {
        assert_valid(r#"{"gzip_mimetypes": []}"#);
    }

    #[test]
    fn gzip_mimetypes_must_be_a_list() {
        assert_schema_error(r#"{"gzip_mimetypes": "text/html"}"#);
        assert_schema_error(r#"{"gzip_mimetypes": {"type": "text/html"}}"#);
        assert_schema_error(r#"{"gzip_mimetypes": 123}"#);
        assert_schema_error(r#"{"gzip_mimetypes": true}"#);
    }

    #[test]
    fn gzip_mimetypes_must_be_strings() {
        assert_schema_error(r#"{"gzip_mimetypes": [381, 123]}"#);
        assert_schema_error(r#"{"gzip_mimetypes": [true, false]}"#);
        assert_schema_error(r#"{"gzip_mimetypes": [{"a": "b"}]}"#);
        assert_schema_error(r#"{"gzip_mimetypes": [[1], [2]]}"#);
    }

    #[test]
    fn gzip_mimetypes_must_be_unique() {
        assert_schema_error(r#"{"gzip_mimetypes": ["text/html", "text/html"]}"#);
    }

    #[test]
    fn gzip_mimetypes_valid_use_cases() {
        let config =
            assert_valid(r#"{"gzip_mimetypes": ["text/html", "application/json"]}"#);
        assert_eq!(config.gzip_mimetypes.len(), 2);
    }

    // =========================================================================
    // Schema: object_specific directives
    // =========================================================================

    #[test]
    fn object_specific_must_be_a_list() {
        assert_schema_error(r#"{"object_specific": "dancing"}"#);
        assert_schema_error(r#"{"object_specific": {"path": ".*"}}"#);
        assert_schema_error(r#"{"object_specific": 123}"#);
    }

    #[test]
    fn directive_path_is_required() {
        assert_schema_error(r#"{"object_specific": [{}]}"#);
        assert_schema_error(r#"{"object_specific": [{"gzip": true}]}"#);
    }

    #[test]
    fn directive_path_must_not_be_empty() {
        assert_schema_error(r#"{"object_specific": [{"path": ""}]}"#);
    }

    #[test]
    fn directive_path_must_be_a_string() {
        assert_schema_error(r#"{"object_specific": [{"path": ["a", "b"]}]}"#);
        assert_schema_error(r#"{"object_specific": [{"path": 123}]}"#);
        assert_schema_error(r#"{"object_specific": [{"path": true}]}"#);
    }

    #[test]
    fn directive_path_must_compile() {
        assert_schema_error(r#"{"object_specific": [{"path": "images/[0-"}]}"#);
    }

    #[test]
    fn directive_gzip_must_be_boolean() {
        assert_schema_error(r#"{"object_specific": [{"path": ".*", "gzip": "no"}]}"#);
        assert_schema_error(r#"{"object_specific": [{"path": ".*", "gzip": 0}]}"#);
        assert_schema_error(r#"{"object_specific": [{"path": ".*", "gzip": [true]}]}"#);
    }

    #[test]
    fn directive_headers_must_be_string_to_string() {
        assert_schema_error(
            r#"{"object_specific": [{"path": ".*", "headers": {"Cache-Control": 10}}]}"#,
        );
        assert_schema_error(
            r#"{"object_specific": [{"path": ".*", "headers": {"Cache-Control": true}}]}"#,
        );
        assert_schema_error(
            r#"{"object_specific": [{"path": ".*", "headers": {"a": {"b": "c"}}}]}"#,
        );
        assert_schema_error(r#"{"object_specific": [{"path": ".*", "headers": [1]}]}"#);
    }

    #[test]
    fn directive_unknown_key_rejected() {
        assert_schema_error(
            r#"{"object_specific": [{"path": "robots.txt", "steak": "medium rare"}]}"#,
        );
    }

    #[test]
    fn directive_valid_use_cases() {
        let config = assert_valid(
            r#"{"object_specific": [
                {"path": "robots.txt", "gzip": false},
                {"path": "^recipe/.*", "headers": {"Cache-Control": "max-age=10",
                                                   "x-amz-storage-class": "RRS"}},
                {"path": "image/[0-9].jpg$"}
            ]}"#,
        );
        assert_eq!(config.object_specific.len(), 3);
        assert_eq!(config.object_specific[0].gzip, Some(false));
        assert_eq!(
            config.object_specific[1].headers["Cache-Control"],
            "max-age=10"
        );
        assert!(config.object_specific[2].headers.is_empty());
    }

    // =========================================================================
    // Directive resolution
    // =========================================================================

    fn config_with_patterns(patterns: &[&str]) -> SiteConfig {
        let directives: Vec<String> = patterns
            .iter()
            .map(|p| format!(r#"{{"path": "{}"}}"#, p.replace('\\', "\\\\")))
            .collect();
        assert_valid(&format!(
            r#"{{"object_specific": [{}]}}"#,
            directives.join(",")
        ))
    }

    #[test]
    fn no_directives_resolves_to_none() {
        let config = SiteConfig::default();
        assert!(config.directive_for("css/style.css").is_none());
    }

    #[test]
    fn catchall_wildcard_matches_everything() {
        let config = config_with_patterns(&[".*"]);
        assert!(config.directive_for("test.txt").is_some());
        assert!(config.directive_for("images/10.jpg").is_some());
        assert!(config.directive_for("style/unicode/£€¡.css").is_some());
    }

    #[test]
    fn plain_string_matches_as_prefix_only() {
        let config = config_with_patterns(&["images/photo.jpg"]);
        assert!(config.directive_for("images/photo.jpg").is_some());
        // Anchored at the start: a leading slash breaks the match.
        assert!(config.directive_for("/images/photo.jpg").is_none());
        assert!(config.directive_for("css/style.css").is_none());
    }

    #[test]
    fn match_need_not_consume_whole_key() {
        let config = config_with_patterns(&["images/"]);
        assert!(config.directive_for("images/deep/photo.jpg").is_some());
    }

    #[test]
    fn dollar_anchor_forces_full_match() {
        let config = config_with_patterns(&["images/[0-9]\\.jpg$"]);
        assert!(config.directive_for("images/1.jpg").is_some());
        assert!(config.directive_for("images/1.jpg.bak").is_none());
    }

    #[test]
    fn first_match_wins_in_declared_order() {
        let config = config_with_patterns(&["images/10.jpg", "images/.*", ".*"]);
        assert_eq!(config.directive_for("test.txt").unwrap().path, ".*");
        assert_eq!(
            config.directive_for("images/test.jpg").unwrap().path,
            "images/.*"
        );
        assert_eq!(
            config.directive_for("images/10.jpg").unwrap().path,
            "images/10.jpg"
        );
    }

    #[test]
    fn non_matching_keys_resolve_to_none() {
        let config = config_with_patterns(&["^images/[0-3]+\\.jpg$", "images/99.jpg"]);
        assert!(config.directive_for("images/876.jpg").is_none());
        assert!(config.directive_for("text/test.txt").is_none());
    }
}
