//! Object metadata resolution.
//!
//! Derives the transport headers and the gzip decision for one object from
//! its destination key and the loaded [`SiteConfig`]. Resolution is a pure
//! function — no I/O — so the precedence chain is easy to test exhaustively.
//!
//! ## Precedence chain
//!
//! 1. Content type and any pre-existing encoding are guessed from the
//!    filename (`page.html.gz` → `text/html`, already `gzip`-encoded).
//! 2. Every `text/*` type gets `; charset=UTF-8` appended. Static sites are
//!    UTF-8; serving `text/html` without a charset makes browsers guess.
//! 3. Base headers: `x-amz-acl: public-read`, `Content-Type`,
//!    `Cache-Control: no-cache`.
//! 4. A file that already carries an encoding keeps it and is never
//!    re-compressed, whatever the config says.
//! 5. Otherwise gzip defaults to "is the type in `gzip_mimetypes`?", and the
//!    matching directive's explicit `gzip` wins over that default in either
//!    direction.
//! 6. The matching directive's `headers` are merged last and overwrite
//!    anything computed above, `x-amz-acl` and `Cache-Control` included.
//!
//! The returned header map and gzip flag come from the same pass, so the
//! orchestrator can never upload a gzipped body without the matching
//! `Content-Encoding` header or vice versa.

use crate::config::SiteConfig;
use std::collections::BTreeMap;

pub const HEADER_ACL: &str = "x-amz-acl";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_ENCODING: &str = "Content-Encoding";
pub const HEADER_CACHE_CONTROL: &str = "Cache-Control";

// Filename suffixes that mean "this file is already encoded", mapped to the
// Content-Encoding value they imply.
const ENCODING_SUFFIXES: &[(&str, &str)] = &[
    (".gz", "gzip"),
    (".bz2", "bzip2"),
    (".xz", "xz"),
    (".br", "br"),
    (".Z", "compress"),
];

/// Final headers plus the compression decision for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub headers: BTreeMap<String, String>,
    pub should_gzip: bool,
}

/// Guess `(content_type, content_encoding)` from a filename.
///
/// A recognized compression suffix is stripped and reported as the encoding;
/// the remainder is fed to the extension table. Either side can be `None`.
pub fn guess_object_type(filename: &str) -> (Option<String>, Option<String>) {
    let (stem, encoding) = match ENCODING_SUFFIXES
        .iter()
        .find(|(suffix, _)| filename.ends_with(suffix))
    {
        Some((suffix, encoding)) => (
            &filename[..filename.len() - suffix.len()],
            Some(encoding.to_string()),
        ),
        None => (filename, None),
    };
    let content_type = mime_guess::from_path(stem)
        .first_raw()
        .map(|mime| mime.to_string());
    (content_type, encoding)
}

/// Append `; charset=UTF-8` to `text/*` content types; leave others alone.
pub fn append_charset(content_type: &str) -> String {
    if content_type.starts_with("text/") {
        format!("{content_type}; charset=UTF-8")
    } else {
        content_type.to_string()
    }
}

/// Resolve the full header set and gzip decision for `destination_key`.
///
/// The key's last path segment is the filename the content type is guessed
/// from; an unguessable type uploads as `application/octet-stream` rather
/// than with no declared type at all.
pub fn resolve_object_metadata(destination_key: &str, config: &SiteConfig) -> ObjectMetadata {
    let filename = destination_key
        .rsplit('/')
        .next()
        .unwrap_or(destination_key);
    let (content_type, content_encoding) = guess_object_type(filename);
    let content_type =
        content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let mut headers = BTreeMap::new();
    headers.insert(HEADER_ACL.to_string(), "public-read".to_string());
    headers.insert(
        HEADER_CONTENT_TYPE.to_string(),
        append_charset(&content_type),
    );
    headers.insert(HEADER_CACHE_CONTROL.to_string(), "no-cache".to_string());

    let directive = config.directive_for(destination_key);

    let mut should_gzip = false;
    if let Some(encoding) = content_encoding {
        // Already-encoded content passes through untouched.
        headers.insert(HEADER_CONTENT_ENCODING.to_string(), encoding);
    } else {
        // The eligibility list is keyed on the bare type, without charset.
        should_gzip = config.gzip_mimetypes.contains(&content_type);
        if let Some(gzip) = directive.and_then(|d| d.gzip) {
            should_gzip = gzip;
        }
        if should_gzip {
            headers.insert(HEADER_CONTENT_ENCODING.to_string(), "gzip".to_string());
        }
    }

    if let Some(directive) = directive {
        for (name, value) in &directive.headers {
            headers.insert(name.clone(), value.clone());
        }
    }

    ObjectMetadata {
        headers,
        should_gzip,
    }
}
