//! History manifest parsing
//!
//! A history folder declares one tracked file and its snapshots:
//!
//! ```json
//! { "resource": "file:///Users/me/proj/src/main.rs",
//!   "entries": [ { "id": "AbC1.rs", "timestamp": 1710512520000 } ] }
//! ```
//!
//! Group-level problems reject the whole manifest. Entry-level problems
//! only drop that entry and are kept in [`ManifestGroup::rejected`].

use crate::errors::{Result, SalvageError};
use crate::timestamp::EpochMillis;
use serde_json::Value;

pub const RESOURCE_FIELD: &str = "resource";
pub const ENTRIES_FIELD: &str = "entries";

/// One usable `(snapshot id, timestamp)` pair from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Position in the declared `entries` array
    pub index: usize,
    pub snapshot_id: String,
    pub captured_at: EpochMillis,
}

/// One history folder's declared history for one logical file
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestGroup {
    pub folder: String,
    pub resource_path: String,
    pub logical_name: String,
    /// Usable entries in declared order (not necessarily chronological)
    pub entries: Vec<ManifestEntry>,
    /// Entries dropped during parsing
    pub rejected: Vec<SalvageError>,
}

impl ManifestGroup {
    /// Parse manifest bytes read from `folder`
    ///
    /// # Errors
    ///
    /// - `ManifestParse` if the bytes are not JSON
    /// - `ManifestNotObject` if the root is not an object
    /// - `ManifestMissingField` if `resource` or `entries` is absent, of the
    ///   wrong type, or empty
    pub fn parse(folder: &str, bytes: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| SalvageError::ManifestParse {
                folder: folder.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_value(folder, &value)
    }

    pub fn from_value(folder: &str, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| SalvageError::ManifestNotObject {
                folder: folder.to_string(),
            })?;

        let missing = |field: &str| SalvageError::ManifestMissingField {
            folder: folder.to_string(),
            field: field.to_string(),
        };

        let resource_path = obj
            .get(RESOURCE_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(RESOURCE_FIELD))?;

        let logical_name =
            logical_name_from_resource(resource_path).ok_or_else(|| missing(RESOURCE_FIELD))?;

        let raw_entries = obj
            .get(ENTRIES_FIELD)
            .and_then(Value::as_array)
            .filter(|entries| !entries.is_empty())
            .ok_or_else(|| missing(ENTRIES_FIELD))?;

        let mut entries = Vec::with_capacity(raw_entries.len());
        let mut rejected = Vec::new();
        for (index, raw) in raw_entries.iter().enumerate() {
            match parse_entry(raw) {
                Ok((snapshot_id, captured_at)) => entries.push(ManifestEntry {
                    index,
                    snapshot_id,
                    captured_at,
                }),
                Err(reason) => rejected.push(SalvageError::InvalidEntry {
                    folder: folder.to_string(),
                    index,
                    reason: reason.to_string(),
                }),
            }
        }

        Ok(Self {
            folder: folder.to_string(),
            resource_path: resource_path.to_string(),
            logical_name,
            entries,
            rejected,
        })
    }

    /// Case-insensitive substring match of the resource path
    pub fn matches_project(&self, filter: &str) -> bool {
        self.resource_path
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }
}

fn parse_entry(raw: &Value) -> std::result::Result<(String, EpochMillis), &'static str> {
    let obj = raw.as_object().ok_or("entry is not an object")?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing snapshot id")?;

    if !is_plain_file_name(id) {
        return Err("snapshot id is not a plain file name");
    }

    let captured_at = obj
        .get("timestamp")
        .and_then(manifest_millis)
        .ok_or("missing or invalid timestamp")?;

    Ok((id.to_string(), captured_at))
}

/// Manifest timestamps are always epoch milliseconds; no unit guessing here.
fn manifest_millis(value: &Value) -> Option<EpochMillis> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (millis > 0).then_some(EpochMillis::new(millis))
}

fn is_plain_file_name(id: &str) -> bool {
    id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}

/// Derive the logical file name from a manifest resource path
///
/// Takes the final path component of a plain path or a URI such as
/// `file:///c%3A/proj/main.rs`, decoding percent escapes.
pub fn logical_name_from_resource(resource: &str) -> Option<String> {
    let without_scheme = match resource.find("://") {
        Some(idx) => &resource[idx + 3..],
        None => resource,
    };
    let trimmed = without_scheme.trim_end_matches(['/', '\\']);
    let last = trimmed.rsplit(['/', '\\']).next()?;
    let decoded = percent_decode(last);
    let decoded = decoded.trim();
    if decoded.is_empty() || decoded == "." || decoded == ".." {
        None
    } else {
        Some(decoded.to_string())
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
