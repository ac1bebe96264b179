//! Identifier helpers shared by the translator and the Grafana builders.
//!
//! Grafana UIDs are limited to 40 characters of `[A-Za-z0-9_-]`, and
//! Prometheus metric/label names to `[a-zA-Z_:][a-zA-Z0-9_:]*`.

use lazy_static::lazy_static;
use regex::Regex;

/// Grafana's upper bound for dashboard and alert-rule UIDs.
pub const MAX_UID_LEN: usize = 40;

lazy_static! {
    static ref UID_UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9_-]").unwrap();
    static ref NAME_UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Derive a stable UID from a source identifier.
///
/// `prefix` + id when the id is already UID-safe and fits, otherwise
/// `prefix` + a blake3 digest of the raw id. Ids are never rewritten, so
/// `a.b` and `a_b` cannot end up with the same UID.
pub fn derive_uid(prefix: &str, source_id: &str) -> String {
    let candidate = format!("{prefix}{source_id}");
    if !source_id.is_empty() && !UID_UNSAFE.is_match(source_id) && candidate.len() <= MAX_UID_LEN {
        return candidate;
    }

    let digest = blake3::hash(source_id.as_bytes()).to_hex();
    let room = MAX_UID_LEN.saturating_sub(prefix.len());
    format!("{prefix}{}", &digest.as_str()[..room.min(digest.len())])
}

/// Make a string usable as a Prometheus metric or label name.
pub fn sanitize_name(raw: &str) -> String {
    let mut name = NAME_UNSAFE.replace_all(raw, "_").into_owned();
    if name.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
