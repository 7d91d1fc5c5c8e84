use rst_common::standard::serde_json::{Map, Value};

use crate::engine::{CredentialValue, CredentialValues};

const BYTE_WIDTH: usize = 3;

fn is_numeric(text: &str) -> bool {
    text.parse::<f64>().is_ok_and(f64::is_finite)
}

fn encode_text(text: &str) -> String {
    text.bytes().map(|byte| format!("{:03}", byte)).collect()
}

/// encode turns an attribute value into the decimal string the credential engine signs
///
/// Numbers and numeric strings pass through, booleans become `1` / `0`, any other text is
/// encoded byte by byte as three decimal digits. Objects, arrays and null are encoded through
/// their JSON text
pub fn encode(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) if is_numeric(text) => text.to_owned(),
        Value::String(text) => encode_text(text),
        other => encode_text(&other.to_string()),
    }
}

/// decode_text reverses the byte encoding of non numeric text
pub fn decode_text(encoded: &str) -> Option<String> {
    if encoded.len() % BYTE_WIDTH != 0 || !encoded.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let bytes = encoded
        .as_bytes()
        .chunks(BYTE_WIDTH)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|digits| digits.parse::<u8>().ok())
        })
        .collect::<Option<Vec<u8>>>()?;

    String::from_utf8(bytes).ok()
}

/// raw is the human readable form stored next to the encoded value
pub fn raw(value: &Value) -> String {
    match value {
        Value::String(text) => text.to_owned(),
        other => other.to_string(),
    }
}

pub fn to_credential_values(values: &Map<String, Value>) -> CredentialValues {
    values
        .iter()
        .map(|(name, value)| {
            (
                name.to_owned(),
                CredentialValue {
                    raw: raw(value),
                    encoded: encode(value),
                },
            )
        })
        .collect()
}
