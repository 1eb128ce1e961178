//! Datum description translation
//!
//! Turns the JSON shape grammar used by dApp callers into canonical
//! [`PlutusData`] values. The grammar is a closed set of shapes keyed by
//! one discriminator: `fields`+`constructor` (a constructor with ordered
//! fields), `list`, `map`, `int` or `bytes`. Descriptions carrying
//! conflicting discriminators are rejected rather than resolved by key
//! order.

use dashu_int::IBig;
use serde_json::{Map, Value as Json};
use std::str::FromStr;
use stoa_common::{DatumError, PlutusData};

/// The recognized shape discriminators, in documentation order
const SHAPE_KEYS: [&str; 6] = ["fields", "constructor", "list", "map", "int", "bytes"];

/// Encode a JSON text into a PlutusData value
pub fn encode_datum_str(description: &str) -> Result<PlutusData, DatumError> {
    if description.trim().is_empty() {
        return Err(DatumError::EmptyDescription);
    }
    let parsed: Json = serde_json::from_str(description)
        .map_err(|e| DatumError::InvalidValue {
            shape: "datum".to_string(),
            reason: e.to_string(),
        })?;
    encode_datum(&parsed)
}

/// Encode a JSON description into a PlutusData value
pub fn encode_datum(description: &Json) -> Result<PlutusData, DatumError> {
    let object = match description {
        Json::Object(object) if !object.is_empty() => object,
        _ => return Err(DatumError::EmptyDescription),
    };

    let present: Vec<&str> =
        SHAPE_KEYS.iter().copied().filter(|key| object.contains_key(*key)).collect();

    match present.as_slice() {
        [] => Err(DatumError::UnknownShape {
            keys: object.keys().cloned().collect::<Vec<_>>().join(", "),
        }),
        ["fields"] => Err(DatumError::MissingKey {
            shape: "fields".to_string(),
            missing: "constructor".to_string(),
        }),
        ["constructor"] => Err(DatumError::MissingKey {
            shape: "constructor".to_string(),
            missing: "fields".to_string(),
        }),
        ["fields", "constructor"] => encode_constr(object),
        ["list"] => encode_list(&object["list"]),
        ["map"] => encode_map(&object["map"]),
        ["int"] => encode_int(&object["int"]),
        ["bytes"] => encode_bytes(&object["bytes"]),
        keys => Err(DatumError::AmbiguousShape {
            keys: keys.join(", "),
        }),
    }
}

fn encode_constr(object: &Map<String, Json>) -> Result<PlutusData, DatumError> {
    let tag = match &object["constructor"] {
        Json::Number(n) => n.as_u64().ok_or_else(|| DatumError::InvalidValue {
            shape: "constructor".to_string(),
            reason: format!("expected a non-negative integer, got {n}"),
        })?,
        Json::String(s) => s.parse::<u64>().map_err(|_| DatumError::InvalidValue {
            shape: "constructor".to_string(),
            reason: format!("expected a non-negative integer, got '{s}'"),
        })?,
        other => {
            return Err(DatumError::InvalidValue {
                shape: "constructor".to_string(),
                reason: format!("expected a non-negative integer, got {other}"),
            })
        }
    };

    let fields = object["fields"].as_array().ok_or_else(|| DatumError::InvalidValue {
        shape: "fields".to_string(),
        reason: "expected an array".to_string(),
    })?;

    // Empty constructors carry no field list; non-empty ones recurse
    // over each field in order
    let fields = fields.iter().map(encode_datum).collect::<Result<Vec<_>, _>>()?;
    Ok(PlutusData::Constr { tag, fields })
}

fn encode_list(value: &Json) -> Result<PlutusData, DatumError> {
    let items = value.as_array().ok_or_else(|| DatumError::InvalidValue {
        shape: "list".to_string(),
        reason: "expected an array".to_string(),
    })?;

    let items = items.iter().map(encode_datum).collect::<Result<Vec<_>, _>>()?;
    Ok(PlutusData::List(items))
}

fn encode_map(value: &Json) -> Result<PlutusData, DatumError> {
    match value {
        // A sequence of k/v objects becomes a List of singleton Maps,
        // each entry individually wrapped
        Json::Array(entries) => {
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                items.push(encode_map_entry(entry)?);
            }
            Ok(PlutusData::List(items))
        }

        // A single k/v object becomes one single-entry Map
        Json::Object(_) => encode_map_entry(value),

        _ => Err(DatumError::InvalidMapEntry),
    }
}

fn encode_map_entry(entry: &Json) -> Result<PlutusData, DatumError> {
    let (Some(key), Some(value)) = (entry.get("k"), entry.get("v")) else {
        return Err(DatumError::InvalidMapEntry);
    };
    Ok(PlutusData::Map(vec![(encode_datum(key)?, encode_datum(value)?)]))
}

fn encode_int(value: &Json) -> Result<PlutusData, DatumError> {
    let parsed = match value {
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                IBig::from(v)
            } else if let Some(v) = n.as_u64() {
                IBig::from(v)
            } else {
                return Err(DatumError::InvalidInteger(n.to_string()));
            }
        }
        Json::String(s) => {
            IBig::from_str(s.trim()).map_err(|_| DatumError::InvalidInteger(s.clone()))?
        }
        other => return Err(DatumError::InvalidInteger(other.to_string())),
    };
    Ok(PlutusData::Integer(parsed))
}

fn encode_bytes(value: &Json) -> Result<PlutusData, DatumError> {
    let text = value.as_str().ok_or_else(|| DatumError::InvalidBytes(value.to_string()))?;
    let bytes = hex::decode(text).map_err(|e| DatumError::InvalidBytes(e.to_string()))?;
    Ok(PlutusData::Bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_literal() {
        assert_eq!(encode_datum(&json!({"int": 1})).unwrap(), PlutusData::int(1));
        assert_eq!(encode_datum(&json!({"int": "-7"})).unwrap(), PlutusData::int(-7));
    }

    #[test]
    fn int_beyond_machine_width_parses_from_string() {
        let data = encode_datum(&json!({"int": "123456789012345678901234567890"})).unwrap();
        let expected =
            PlutusData::Integer(IBig::from_str("123456789012345678901234567890").unwrap());
        assert_eq!(data, expected);
    }

    #[test]
    fn bytes_literal() {
        assert_eq!(
            encode_datum(&json!({"bytes": "544e4654"})).unwrap(),
            PlutusData::bytes(vec![0x54, 0x4e, 0x46, 0x54])
        );
        assert!(matches!(
            encode_datum(&json!({"bytes": "not hex"})),
            Err(DatumError::InvalidBytes(_))
        ));
    }

    #[test]
    fn empty_constructor() {
        assert_eq!(
            encode_datum(&json!({"fields": [], "constructor": 0})).unwrap(),
            PlutusData::Constr {
                tag: 0,
                fields: vec![]
            }
        );
    }

    #[test]
    fn constructor_with_fields() {
        assert_eq!(
            encode_datum(&json!({"fields": [{"int": 1}], "constructor": 0})).unwrap(),
            PlutusData::Constr {
                tag: 0,
                fields: vec![PlutusData::int(1)]
            }
        );
    }

    #[test]
    fn constructor_key_order_is_irrelevant() {
        let a = encode_datum(&json!({"fields": [{"int": 1}], "constructor": 2})).unwrap();
        let b = encode_datum(&json!({"constructor": 2, "fields": [{"int": 1}]})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fields_without_constructor_rejected() {
        assert_eq!(
            encode_datum(&json!({"fields": []})),
            Err(DatumError::MissingKey {
                shape: "fields".to_string(),
                missing: "constructor".to_string()
            })
        );
        assert_eq!(
            encode_datum(&json!({"constructor": 0})),
            Err(DatumError::MissingKey {
                shape: "constructor".to_string(),
                missing: "fields".to_string()
            })
        );
    }

    // Each list element must be encoded, not the first repeatedly
    #[test]
    fn list_recurses_over_each_element() {
        let data =
            encode_datum(&json!({"list": [{"int": 1}, {"int": 2}, {"bytes": "00"}]})).unwrap();
        assert_eq!(
            data,
            PlutusData::List(vec![
                PlutusData::int(1),
                PlutusData::int(2),
                PlutusData::bytes(vec![0x00]),
            ])
        );
    }

    #[test]
    fn map_sequence_becomes_list_of_singleton_maps() {
        let data = encode_datum(&json!({"map": [
            {"k": {"int": 1}, "v": {"int": 2}},
            {"k": {"int": 3}, "v": {"int": 4}},
        ]}))
        .unwrap();
        assert_eq!(
            data,
            PlutusData::List(vec![
                PlutusData::Map(vec![(PlutusData::int(1), PlutusData::int(2))]),
                PlutusData::Map(vec![(PlutusData::int(3), PlutusData::int(4))]),
            ])
        );
    }

    #[test]
    fn single_map_object_becomes_one_entry_map() {
        let data = encode_datum(&json!({"map": {"k": {"int": 1}, "v": {"int": 2}}})).unwrap();
        assert_eq!(
            data,
            PlutusData::Map(vec![(PlutusData::int(1), PlutusData::int(2))])
        );
    }

    #[test]
    fn map_entry_without_k_or_v_rejected() {
        assert_eq!(
            encode_datum(&json!({"map": [{"k": {"int": 1}}]})),
            Err(DatumError::InvalidMapEntry)
        );
        assert_eq!(encode_datum(&json!({"map": 3})), Err(DatumError::InvalidMapEntry));
    }

    #[test]
    fn empty_description_rejected() {
        assert_eq!(encode_datum(&json!({})), Err(DatumError::EmptyDescription));
        assert_eq!(encode_datum(&json!(null)), Err(DatumError::EmptyDescription));
        assert_eq!(encode_datum_str(""), Err(DatumError::EmptyDescription));
        assert_eq!(encode_datum_str("   "), Err(DatumError::EmptyDescription));
    }

    #[test]
    fn unknown_shape_rejected() {
        assert!(matches!(
            encode_datum(&json!({"float": 1.5})),
            Err(DatumError::UnknownShape { .. })
        ));
    }

    #[test]
    fn conflicting_shapes_rejected() {
        assert_eq!(
            encode_datum(&json!({"int": 1, "bytes": "00"})),
            Err(DatumError::AmbiguousShape {
                keys: "int, bytes".to_string()
            })
        );
    }

    #[test]
    fn extra_noise_keys_are_ignored() {
        let data = encode_datum(&json!({"int": 1, "comment": "ignored"})).unwrap();
        assert_eq!(data, PlutusData::int(1));
    }

    #[test]
    fn failure_inside_a_field_aborts_the_whole_encode() {
        let result = encode_datum(&json!({
            "fields": [{"int": 1}, {"bogus": true}],
            "constructor": 0
        }));
        assert!(matches!(result, Err(DatumError::UnknownShape { .. })));
    }

    #[test]
    fn string_descriptions_are_parsed() {
        let data = encode_datum_str(r#"{"fields": [{"int": 1}], "constructor": 0}"#).unwrap();
        assert_eq!(
            data,
            PlutusData::Constr {
                tag: 0,
                fields: vec![PlutusData::int(1)]
            }
        );
    }

    #[test]
    fn deterministic_bytes_for_nested_description() {
        let description = json!({"map": [
            {"k": {"bytes": "01"}, "v": {"list": [{"int": 1}, {"int": 2}]}},
            {"k": {"bytes": "02"}, "v": {"constructor": 1, "fields": [{"int": "9"}]}},
        ]});
        let first = encode_datum(&description).unwrap().to_bytes();
        let second = encode_datum(&description).unwrap().to_bytes();
        assert_eq!(first, second);
    }
}
