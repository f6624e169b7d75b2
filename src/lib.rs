//! # sitedeploy
//!
//! Publishes a directory of built static-site assets to an S3-compatible
//! bucket, with the right `Content-Type` (and charset), `Cache-Control`, and
//! `Content-Encoding` on every object, gzip-compressing what's worth
//! compressing on the way up. Built to run as the last step of a CI
//! pipeline: uploads are concurrent, individually retried, and the process
//! exit code is the build's verdict.
//!
//! # Architecture: One Pass, Per-Object Pipelines
//!
//! A run loads the site config once, enumerates the publish root once, and
//! then fans out one small pipeline per file:
//!
//! ```text
//! enumerate root ─┬─ resolve headers ─ (gzip) ─ upload with retry ─ outcome
//!                 ├─ resolve headers ─ (gzip) ─ upload with retry ─ outcome
//!                 └─ ...                      bounded concurrency
//! ```
//!
//! Pipelines are independent: a file that exhausts its retries is recorded
//! as failed and the rest keep going. The final report is the union of all
//! outcomes; the run succeeds only if every object made it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Enumerates the publish root into destination keys |
//! | [`config`] | `sitedeploy.json` loading, closed-schema validation, directive matching |
//! | [`metadata`] | Per-object header derivation: content type, charset, gzip decision, overrides |
//! | [`compress`] | Gzip sibling files for upload |
//! | [`retry`] | Bounded retry with capped exponential backoff |
//! | [`store`] | The `ObjectStore` seam and its S3 implementation |
//! | [`upload`] | Orchestration: bounded fan-out, outcome aggregation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Hard-Fail Configuration
//!
//! A missing `sitedeploy.json` means "no special rules" and is fine. A
//! present-but-broken one — bad JSON, a typo'd key, a directive without a
//! `path` — fails the run before a single byte is uploaded. The schema is
//! closed at every level on purpose: in CI, a silently ignored typo would
//! ship a site with the wrong cache headers and nobody would notice for
//! weeks.
//!
//! ## First-Match Directives, Anchored at the Start
//!
//! `object_specific` directives are tried in the order written and the first
//! match wins — no merging, no "most specific" scoring. A pattern matches if
//! it matches from the start of the key; it does not have to consume the
//! whole key. Configs that want exact matches write `$`.
//!
//! ## Failure Is Per-Object
//!
//! Network hiccups are expected, so each object gets a few attempts with
//! backoff. What one object does never affects another: no early abort, no
//! shared retry budget. The run drains the full file set and only then turns
//! the aggregate into an exit code, so one flaky image costs a retry, not a
//! deploy of half a site.

pub mod compress;
pub mod config;
pub mod metadata;
pub mod output;
pub mod retry;
pub mod scan;
pub mod store;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
