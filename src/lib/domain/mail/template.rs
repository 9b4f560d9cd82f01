//! HTML body templates

use std::{fs, path::Path};

use tracing::debug;

use crate::domain::mail::TemplateError;

/// Reads a template whose bytes are UTF-8 but which tooling on the host labels
/// as ISO-8859-1.
///
/// The bytes are decoded as ISO-8859-1, encoded back, and the result is then
/// decoded strictly as UTF-8. This is a recovery step for mis-tagged files and
/// nothing more: no other encodings are supported.
pub fn read_mistagged_utf8(path: &Path) -> Result<String, TemplateError> {
    let raw = fs::read(path).map_err(|source| TemplateError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let bytes = encode_latin1(&decode_latin1(&raw));

    String::from_utf8(bytes).map_err(|source| TemplateError::InvalidUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces every occurrence of each placeholder key with its value.
///
/// Keys are applied in iteration order; placeholders with no entry are left as
/// they are.
pub fn fill_placeholders<I, K, V>(text: &str, placeholders: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    placeholders
        .into_iter()
        .fold(text.to_string(), |filled, (key, value)| {
            let key = key.as_ref();
            if key.is_empty() {
                return filled;
            }

            debug!(placeholder = key, "filling placeholder");
            filled.replace(key, value.as_ref())
        })
}

fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().copied().map(char::from).collect()
}

/// Only fed the output of [`decode_latin1`], whose chars all sit below U+0100.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| u32::from(c) as u8).collect()
}
