use amr_core::models::ClassificationInput;

use crate::error::AdapterError;
use crate::{fhir, hl7v2, native};

/// Supported payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Fhir,
    Hl7V2,
    Native,
}

/// Pure format detection over the raw payload and the declared content type.
///
/// The content type wins when it is specific; `text/plain` and
/// `application/json` fall through to content sniffing: an `MSH` prefix is
/// HL7 v2, JSON mentioning `resourceType` is FHIR, other JSON is native.
pub fn detect_format(
    payload: &[u8],
    content_type: Option<&str>,
) -> Result<InputFormat, AdapterError> {
    if let Some(content_type) = content_type {
        let base = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match base.as_str() {
            "application/fhir+json" => return Ok(InputFormat::Fhir),
            "application/hl7-v2" | "x-application/hl7-v2+er7" => return Ok(InputFormat::Hl7V2),
            _ => {}
        }
    }

    let trimmed = first_non_whitespace(payload);
    match trimmed {
        [b'M', b'S', b'H', ..] => Ok(InputFormat::Hl7V2),
        [b'{', ..] | [b'[', ..] => {
            if contains_bytes(trimmed, b"\"resourceType\"") {
                Ok(InputFormat::Fhir)
            } else {
                Ok(InputFormat::Native)
            }
        }
        _ => Err(AdapterError::UnsupportedFormat),
    }
}

/// Detect the format and run the matching adapter.
pub fn parse_payload(
    payload: &[u8],
    content_type: Option<&str>,
) -> Result<Vec<ClassificationInput>, AdapterError> {
    match detect_format(payload, content_type)? {
        InputFormat::Fhir => fhir::parse(payload),
        InputFormat::Hl7V2 => {
            let text = std::str::from_utf8(payload).map_err(|_| AdapterError::Encoding)?;
            hl7v2::parse(text)
        }
        InputFormat::Native => native::parse(payload),
    }
}

fn first_non_whitespace(payload: &[u8]) -> &[u8] {
    let start = payload
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(payload.len());
    &payload[start..]
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
