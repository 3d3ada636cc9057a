//! Canonicalization of URL components for checksum generation and validation.
//!
//! Both the signer and the verifier run the components through [`canonicalize`]; any difference
//! in the bytes produced here breaks every legitimate link, so this module has no configuration
//! beyond the checksum parameter name and the additional data.
//!
//! **Stability of this module is not guaranteed except for items exposed at the crate root**.
//! The functions and types are subject to change in minor/patch versions. This is exposed for
//! testing purposes only.

use {
    crate::{constants::*, LinkIntegrityError, UrlComponents},
    log::trace,
    qualifier_attr::qualifiers,
    std::{collections::BTreeMap, str::from_utf8},
};

/// Produce the canonical byte sequence for `components`.
///
/// The layout is: scheme, host, port, and path, each followed by a field marker; then, for each
/// distinct query parameter name in lexicographic order (excluding `checksum_param`), a name
/// marker, the name, a name-end marker, and the values sorted lexicographically and separated by a
/// value marker; finally, if present, an additional-data marker and the additional data. Duplicate
/// values are kept.
///
/// Every field is passed through [`append_escaped`], so the only control bytes in the output are
/// the markers themselves. Distinct components therefore never produce the same bytes, while two
/// components that differ only in the order of their query parameters, or in the order of values
/// sharing a name, produce identical bytes.
pub fn canonicalize(components: &UrlComponents, checksum_param: &str, additional_data: Option<&str>) -> Vec<u8> {
    let mut result = Vec::with_capacity(256);

    for field in [components.scheme(), components.authority(), components.port(), components.path()] {
        append_escaped(&mut result, field);
        result.extend(MARKER_FIELD_END);
    }

    for (name, values) in group_query_params(components.query_params(), checksum_param) {
        result.extend(MARKER_NAME_START);
        append_escaped(&mut result, name);
        result.extend(MARKER_NAME_END);

        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                result.extend(MARKER_VALUE_SEPARATOR);
            }
            append_escaped(&mut result, value);
        }
    }

    if let Some(additional_data) = additional_data {
        result.extend(MARKER_ADDITIONAL_DATA);
        append_escaped(&mut result, additional_data);
    }

    trace!("Canonical form: {:?}", String::from_utf8_lossy(&result));
    result
}

/// Append `field` to `result`, percent-encoding `%` and every ASCII control byte so the field
/// can't contain a canonical marker.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn append_escaped(result: &mut Vec<u8>, field: &str) {
    for &c in field.as_bytes() {
        if c == b'%' || c.is_ascii_control() {
            result.push(b'%');
            result.extend(u8_to_upper_hex(c));
        } else {
            result.push(c);
        }
    }
}

/// Group query parameters by name, dropping the checksum parameter. Names iterate in sorted order
/// and each value list is sorted.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn group_query_params<'a>(params: &'a [(String, String)], checksum_param: &str) -> BTreeMap<&'a str, Vec<&'a str>> {
    let mut result = BTreeMap::<&str, Vec<&str>>::new();

    for (name, value) in params {
        // Don't include the checksum itself.
        if name != checksum_param {
            result.entry(name.as_str()).or_default().push(value.as_str());
        }
    }

    for values in result.values_mut() {
        values.sort_unstable();
    }

    result
}

/// Returns true if the byte is an RFC 3986 unreserved character.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[inline(always)]
fn is_rfc3986_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'.' || c == b'_' || c == b'~'
}

/// Normalizes a URI path so that equivalent encodings compare equal. Each `/`-delimited segment
/// is normalized with [`normalize_uri_path_component`]; the slashes themselves are kept as-is. An
/// empty path becomes `/`.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn normalize_uri_path(uri_path: &str) -> Result<String, LinkIntegrityError> {
    if uri_path.is_empty() || uri_path == "/" {
        return Ok("/".to_string());
    }

    let components = uri_path.split('/').map(normalize_uri_path_component).collect::<Result<Vec<String>, _>>()?;
    Ok(components.join("/"))
}

/// Normalize a single path segment:
/// * Alpha, digit, and the symbols `-`, `.`, `_`, and `~` (unreserved characters) are left alone.
/// * Characters outside this range are percent-encoded.
/// * Percent-encoded values are upper-cased (`%2a` becomes `%2A`).
/// * Percent-encoded values in the unreserved space are converted to normal characters.
///
/// If a percent encoding is incomplete or not hex, an error is returned.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn normalize_uri_path_component(segment: &str) -> Result<String, LinkIntegrityError> {
    let bytes = segment.as_bytes();
    let mut i = 0;
    let mut result = Vec::<u8>::with_capacity(bytes.len());

    while i < bytes.len() {
        let c = bytes[i];

        if is_rfc3986_unreserved(c) {
            result.push(c);
            i += 1;
        } else if c == b'%' {
            let c = decode_escape(bytes, i)?;
            if is_rfc3986_unreserved(c) {
                result.push(c);
            } else {
                // Rewrite the hex-escape so it's always upper-cased.
                result.push(b'%');
                result.extend(u8_to_upper_hex(c));
            }
            i += 3;
        } else {
            result.push(b'%');
            result.extend(u8_to_upper_hex(c));
            i += 1;
        }
    }

    // Only ASCII bytes were pushed.
    Ok(String::from_utf8_lossy(&result).into_owned())
}

/// Decode the `%XX` escape starting at `bytes[i]`.
fn decode_escape(bytes: &[u8], i: usize) -> Result<u8, LinkIntegrityError> {
    if i + 2 >= bytes.len() {
        // % encoding would go beyond end of string.
        return Err(LinkIntegrityError::InvalidArgument(MSG_INCOMPLETE_TRAILING_ESCAPE.to_string()));
    }

    let hex_digits = &bytes[i + 1..i + 3];
    match hex::decode(hex_digits) {
        Ok(value) => Ok(value[0]),
        Err(_) => {
            let message = match from_utf8(hex_digits) {
                Ok(digits) => format!("{}{}", MSG_ILLEGAL_HEX_CHAR, digits),
                Err(_) => format!("{}{:?}", MSG_ILLEGAL_HEX_CHAR, hex_digits),
            };
            Err(LinkIntegrityError::InvalidArgument(message))
        }
    }
}

/// Verify every `%` in a query string starts a valid escape.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn validate_percent_escapes(s: &str) -> Result<(), LinkIntegrityError> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            decode_escape(bytes, i)?;
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(())
}

/// Decode a `application/x-www-form-urlencoded` query string into `(name, value)` pairs in their
/// original order. A parameter without `=` gets an empty value; empty components are skipped.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn query_string_to_pairs(query_string: &str) -> Result<Vec<(String, String)>, LinkIntegrityError> {
    if query_string.is_empty() {
        return Ok(Vec::new());
    }

    validate_percent_escapes(query_string)?;
    Ok(form_urlencoded::parse(query_string.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())).collect())
}

/// Encode `(name, value)` pairs as a query string, preserving order.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn pairs_to_query_string(pairs: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish()
}

/// Convert a byte to uppercase hex representation.
#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
#[inline(always)]
const fn u8_to_upper_hex(b: u8) -> [u8; 2] {
    const HEX_DIGITS_UPPER: &[u8; 16] = b"0123456789ABCDEF";
    [HEX_DIGITS_UPPER[((b >> 4) & 0xf) as usize], HEX_DIGITS_UPPER[(b & 0xf) as usize]]
}
