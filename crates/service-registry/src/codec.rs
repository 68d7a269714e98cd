//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Identity and metadata codec
//!
//! Pure functions shared by every backend: the opaque record identifier
//! (base64 of `name@address`) and the query-string metadata format stored
//! at each leaf, e.g. `state=inactive&group=web&weight=10`.

use crate::error::{RegistryError, RegistryResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Flat, string-keyed metadata stored at a leaf
pub type Metadata = BTreeMap<String, String>;

/// Separator between name and address inside an identifier
pub const ID_SEPARATOR: char = '@';

/// Metadata key holding the operational state
pub const STATE_KEY: &str = "state";

/// Metadata key holding the classification label
pub const GROUP_KEY: &str = "group";

/// Encode a `(name, address)` pair into an opaque identifier
pub fn encode_id(name: &str, address: &str) -> String {
    STANDARD.encode(format!("{}{}{}", name, ID_SEPARATOR, address))
}

/// Decode an identifier back into `(name, address)`.
///
/// The name ends at the first separator; everything after it is the address.
pub fn decode_id(id: &str) -> RegistryResult<(String, String)> {
    let bytes = STANDARD
        .decode(id)
        .map_err(|e| RegistryError::InvalidIdentifier(format!("{}: {}", id, e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| RegistryError::InvalidIdentifier(format!("{}: not valid UTF-8", id)))?;

    match text.split_once(ID_SEPARATOR) {
        Some((name, address)) => Ok((name.to_string(), address.to_string())),
        None => Err(RegistryError::InvalidIdentifier(format!(
            "{}: missing '{}' separator",
            id, ID_SEPARATOR
        ))),
    }
}

/// Serialize metadata as a query string with keys in sorted order
pub fn encode_metadata(metadata: &Metadata) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in metadata {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Parse a stored query string into metadata.
///
/// Rejects malformed percent escapes, `;` separators and escapes that do not
/// decode to UTF-8. A repeated key keeps its first value.
pub fn decode_metadata(raw: &str) -> RegistryResult<Metadata> {
    let mut metadata = Metadata::new();

    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        if pair.contains(';') {
            return Err(RegistryError::MalformedMetadata(format!(
                "invalid semicolon separator in {:?}",
                pair
            )));
        }

        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = unescape(key)?;
        let value = unescape(value)?;
        metadata.entry(key).or_insert(value);
    }

    Ok(metadata)
}

fn unescape(component: &str) -> RegistryResult<String> {
    check_escapes(component)?;

    // a literal '+' is always written as %2B, so this cannot clash with an escape
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| {
            RegistryError::MalformedMetadata(format!("{:?} does not decode to UTF-8", component))
        })
}

/// Every `%` must start a two-digit hex escape
fn check_escapes(component: &str) -> RegistryResult<()> {
    for (i, _) in component.match_indices('%') {
        let escape = component.get(i + 1..i + 3).unwrap_or("");
        if escape.len() != 2 || !escape.bytes().all(|b| b.is_ascii_hexdigit()) {
            let end = (i + 3).min(component.len());
            return Err(RegistryError::MalformedMetadata(format!(
                "invalid escape {:?}",
                component.get(i..end).unwrap_or("%")
            )));
        }
    }
    Ok(())
}
