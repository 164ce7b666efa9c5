//! JSON Pointer and Reference Codec
//!
//! RFC 6901 pointers (`/a/b~1c`) and the one reference shape the compiler
//! understands: `#/components/schemas/<id>`.

use crate::error::{Result, SchemaError};
use crate::schema::DefinitionId;

const DEFINITIONS_PATH: [&str; 2] = ["components", "schemas"];

/// Decode a JSON pointer into its (unescaped) segments
pub fn decode(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }

    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(SchemaError::Format(format!(
            "JSON pointer must start with '/': {pointer}"
        )));
    };

    rest.split('/').map(|segment| unescape(segment, pointer)).collect()
}

/// Encode segments into a JSON pointer
pub fn encode<S: AsRef<str>>(segments: &[S]) -> String {
    let mut pointer = String::new();
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&segment.as_ref().replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

fn unescape(segment: &str, pointer: &str) -> Result<String> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();

    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(SchemaError::Format(format!(
                    "Invalid escape sequence in JSON pointer: {pointer}"
                )))
            }
        }
    }

    Ok(out)
}

/// Extract the definition id from a `#/components/schemas/<id>` reference.
///
/// References into nested paths (`#/components/schemas/A/properties/b`) are rejected.
pub fn reference_to_definition_id(reference: &str) -> Result<DefinitionId> {
    let Some(pointer) = reference.strip_prefix('#') else {
        return Err(SchemaError::Format(format!("Reference format not supported: {reference}")));
    };

    let segments = decode(pointer)?;
    match segments.as_slice() {
        [components, schemas, id]
            if components == DEFINITIONS_PATH[0] && schemas == DEFINITIONS_PATH[1] && !id.is_empty() =>
        {
            Ok(id.clone())
        }
        [components, schemas, id, ..]
            if components == DEFINITIONS_PATH[0] && schemas == DEFINITIONS_PATH[1] && !id.is_empty() =>
        {
            Err(SchemaError::Format(format!("Refs to nested paths not supported: {reference}")))
        }
        _ => Err(SchemaError::Format(format!("Reference format not supported: {reference}"))),
    }
}

/// Inverse of [`reference_to_definition_id`]
pub fn definition_id_to_reference(id: &str) -> String {
    format!("#{}", encode(&[DEFINITIONS_PATH[0], DEFINITIONS_PATH[1], id]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode("/a~1b/c~0d").unwrap(), vec!["a/b", "c~d"]);
        assert_eq!(decode("").unwrap(), Vec::<String>::new());
        assert_eq!(decode("/").unwrap(), vec![""]);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode("a/b"), Err(SchemaError::Format(_))));
        assert!(matches!(decode("/a~2"), Err(SchemaError::Format(_))));
        assert!(matches!(decode("/a~"), Err(SchemaError::Format(_))));
    }

    #[test]
    fn test_encode_escapes_tilde_before_slash() {
        // "~1" must not be produced from a literal "~" followed by "1"
        assert_eq!(encode(&["~1"]), "/~01");
        assert_eq!(decode(&encode(&["~1"])).unwrap(), vec!["~1"]);
    }

    #[test]
    fn test_pointer_round_trip() {
        let segments = vec!["components", "schemas", "a/b~c", "x"];
        assert_eq!(decode(&encode(&segments)).unwrap(), segments);

        let pointer = "/paths/~1users~1{id}/get";
        assert_eq!(encode(&decode(pointer).unwrap()), pointer);
    }

    #[test]
    fn test_reference_to_definition_id() {
        assert_eq!(reference_to_definition_id("#/components/schemas/Pet").unwrap(), "Pet");
        assert_eq!(reference_to_definition_id("#/components/schemas/a~1b").unwrap(), "a/b");
    }

    #[test]
    fn test_reference_rejects_other_shapes() {
        for reference in [
            "#/components/schemas/Pet/properties/name",
            "#/components/responses/Pet",
            "#/components/schemas/",
            "other.json#/components/schemas/Pet",
            "#/definitions/Pet",
        ] {
            assert!(
                matches!(reference_to_definition_id(reference), Err(SchemaError::Format(_))),
                "{reference} should be rejected"
            );
        }
    }

    #[test]
    fn test_definition_reference_round_trip() {
        for id in ["Pet", "a/b", "tilde~name", "with space"] {
            let reference = definition_id_to_reference(id);
            assert_eq!(reference_to_definition_id(&reference).unwrap(), id);
        }
        assert_eq!(definition_id_to_reference("a/b"), "#/components/schemas/a~1b");
    }
}
