//! On-disk representation of a record list.
//!
//! A file is `header ++ payload ++ footer`, where the payload is the record
//! list pretty-printed as JSON with four-space indentation and every line
//! terminated by a backslash-newline continuation marker instead of a bare
//! newline. Header and footer are stripped by length only, so callers can
//! embed the payload in a larger host document (an HTML comment, a script
//! block) without the store parsing the host format.

use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::warn;

use crate::schema::Record;

pub const LINE_CONTINUATION: &str = "\\\n";
const INDENT: &[u8] = b"    ";

/// Decode file bytes into records. Never fails: undecodable content is
/// logged and treated as an empty list.
#[must_use]
pub fn decode_records(path: &Path, bytes: &[u8], header: &[u8], footer: &[u8]) -> Vec<Record> {
    let payload = strip_envelope(bytes, header, footer);

    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(error) => {
            warn!(path = %path.display(), %error, "record file is not valid UTF-8, starting empty");
            return Vec::new();
        }
    };
    let json = text.replace(LINE_CONTINUATION, "");

    match serde_json::from_str::<Vec<Value>>(&json) {
        Ok(values) => match into_records(values) {
            Some(records) => records,
            None => {
                warn!(path = %path.display(), "record file holds non-object entries, starting empty");
                Vec::new()
            }
        },
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse record file, starting empty");
            Vec::new()
        }
    }
}

/// Encode records as `header ++ continued pretty JSON ++ footer`.
pub fn encode_records(
    records: &[Record],
    header: &[u8],
    footer: &[u8],
) -> Result<Vec<u8>, serde_json::Error> {
    let pretty = to_pretty_json(records)?;

    let mut out = Vec::with_capacity(header.len() + pretty.len() * 2 + footer.len());
    out.extend_from_slice(header);
    for line in pretty.lines() {
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(LINE_CONTINUATION.as_bytes());
    }
    out.extend_from_slice(footer);
    Ok(out)
}

fn strip_envelope<'a>(bytes: &'a [u8], header: &[u8], footer: &[u8]) -> &'a [u8] {
    let start = header.len().min(bytes.len());
    let rest = &bytes[start..];
    let end = rest.len().saturating_sub(footer.len());
    &rest[..end]
}

fn into_records(values: Vec<Value>) -> Option<Vec<Record>> {
    values
        .into_iter()
        .map(|value| match value {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

fn to_pretty_json(records: &[Record]) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
