//! Script-data (script integrity) hash
//!
//! The hash binds redeemers, witness datums and the cost-model language
//! views into the transaction body. The datum argument is `None` when
//! the spent output already carries its datum inline: a witness datum
//! that is not logically required must not enter the hash, even though
//! one was supplied to build the script witness.

use stoa_common::{CostModels, PlutusData, Redeemer, ScriptIntegrityHash, ScriptLanguage, crypto::hash_256};

/// Compute the script-data hash over redeemers, the optional witness
/// datum set and the cost-model language views:
/// `blake2b256(redeemers ‖ [datums] ‖ language_views)`
pub fn hash_script_data(
    redeemers: &[Redeemer],
    cost_models: &CostModels,
    datums: Option<&[PlutusData]>,
) -> ScriptIntegrityHash {
    let mut preimage = Vec::new();

    let mut e = minicbor::Encoder::new(&mut preimage);
    e.array(redeemers.len() as u64).expect("infallible write to Vec");
    for redeemer in redeemers {
        e.encode(redeemer).expect("infallible write to Vec");
    }

    if let Some(datums) = datums {
        if !datums.is_empty() {
            e.array(datums.len() as u64).expect("infallible write to Vec");
            for datum in datums {
                e.encode(datum).expect("infallible write to Vec");
            }
        }
    }

    preimage.extend_from_slice(&language_views(cost_models));
    hash_256(&preimage)
}

// Language views map: {language_id: [parameters]}. Plutus V1 keeps its
// historical form where both key and value are double-bagged CBOR-in-bytes
// and the parameter list is indefinite; later languages use the plain form.
fn language_views(cost_models: &CostModels) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    let present = cost_models.iter().count();
    e.map(present as u64).expect("infallible write to Vec");

    for (language, model) in cost_models.iter() {
        match language {
            ScriptLanguage::PlutusV1 => {
                let mut key = minicbor::Encoder::new(Vec::new());
                key.u8(language.language_id()).expect("infallible write to Vec");
                e.bytes(&key.into_writer()).expect("infallible write to Vec");

                let mut value = minicbor::Encoder::new(Vec::new());
                value.begin_array().expect("infallible write to Vec");
                for parameter in &model.0 {
                    value.i64(*parameter).expect("infallible write to Vec");
                }
                value.end().expect("infallible write to Vec");
                e.bytes(&value.into_writer()).expect("infallible write to Vec");
            }
            _ => {
                e.u8(language.language_id()).expect("infallible write to Vec");
                e.array(model.0.len() as u64).expect("infallible write to Vec");
                for parameter in &model.0 {
                    e.i64(*parameter).expect("infallible write to Vec");
                }
            }
        }
    }

    e.into_writer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoa_common::{BuilderConfig, ExUnits, RedeemerTag};

    fn test_redeemers() -> Vec<Redeemer> {
        vec![Redeemer {
            tag: RedeemerTag::Spend,
            index: 0,
            data: PlutusData::Constr {
                tag: 0,
                fields: vec![],
            },
            ex_units: ExUnits {
                mem: 942996,
                steps: 346100241,
            },
        }]
    }

    #[test]
    fn hash_is_deterministic() {
        let redeemers = test_redeemers();
        let cost_models = BuilderConfig::default().cost_models;
        let a = hash_script_data(&redeemers, &cost_models, None);
        let b = hash_script_data(&redeemers, &cost_models, None);
        assert_eq!(a, b);
    }

    #[test]
    fn datum_presence_changes_the_hash() {
        let redeemers = test_redeemers();
        let cost_models = BuilderConfig::default().cost_models;
        let datum = [PlutusData::int(1)];

        let absent = hash_script_data(&redeemers, &cost_models, None);
        let present = hash_script_data(&redeemers, &cost_models, Some(&datum));
        assert_ne!(absent, present);

        // an empty datum list is the same as an absent one
        let empty = hash_script_data(&redeemers, &cost_models, Some(&[]));
        assert_eq!(absent, empty);
    }

    #[test]
    fn redeemers_and_cost_model_feed_the_hash() {
        let cost_models = BuilderConfig::default().cost_models;
        let base = hash_script_data(&test_redeemers(), &cost_models, None);

        let mut changed = test_redeemers();
        changed[0].ex_units.mem += 1;
        assert_ne!(base, hash_script_data(&changed, &cost_models, None));

        let empty_models = CostModels::new();
        assert_ne!(base, hash_script_data(&test_redeemers(), &empty_models, None));
    }
}
