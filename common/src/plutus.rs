//! Plutus data, redeemer and script definitions for Stoa

use crate::crypto::keyhash_224_tagged;
use crate::hash::ScriptHash;
use dashu_int::{IBig, UBig};
use minicbor::data::{Int, Tag, Type};
use minicbor::{Decode, Encode};

/// Constructor alternatives 0..=6 map onto CBOR tags 121..=127,
/// alternatives 7..=127 onto tags 1280..=1400; anything larger uses the
/// general tag 102 form carrying the alternative explicitly
const CONSTR_TAG_BASE: u64 = 121;
const CONSTR_TAG_EXTENDED_BASE: u64 = 1280;
const CONSTR_TAG_GENERAL: u64 = 102;

/// Byte strings longer than this are chunked into an indefinite-length
/// string of 64-byte parts (the bounded-bytes rule)
const BOUNDED_BYTES_CHUNK: usize = 64;

/// A Plutus data value.
///
/// The canonical on-the-wire form for datums and redeemers. Immutable
/// once built; encoding the same tree always yields identical bytes, so
/// a datum attached to an output and the same datum carried in a witness
/// set hash identically.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlutusData {
    /// Tagged product with ordered fields; `fields` may be empty
    Constr { tag: u64, fields: Vec<PlutusData> },

    /// Ordered key/value pairs; insertion order preserved, keys not
    /// deduplicated at this layer
    Map(Vec<(PlutusData, PlutusData)>),

    /// Ordered sequence
    List(Vec<PlutusData>),

    /// Arbitrary-precision signed integer
    Integer(#[serde(with = "ibig_serde")] IBig),

    /// Raw byte string
    Bytes(Vec<u8>),
}

// IBig serde via decimal strings, the same surface form datum
// descriptions use
mod ibig_serde {
    use dashu_int::IBig;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(value: &IBig, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<IBig, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        IBig::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl PlutusData {
    /// Integer from any primitive int
    pub fn int(value: impl Into<IBig>) -> Self {
        Self::Integer(value.into())
    }

    /// Byte string from raw bytes
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Canonical CBOR bytes of this value
    pub fn to_bytes(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("infallible write to Vec")
    }

    /// Parse from canonical CBOR bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }
}

fn encode_integer<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    value: &IBig,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    // Direct int when it fits a CBOR major type 0/1 argument
    if let Ok(small) = i128::try_from(value.clone()) {
        if let Ok(int) = Int::try_from(small) {
            e.int(int)?;
            return Ok(());
        }
    }

    // Bignum: tag 2 over n for n >= 0, tag 3 over (-1 - n) otherwise
    let negative = *value < IBig::from(0);
    let content = if negative {
        -(value.clone()) - IBig::from(1)
    } else {
        value.clone()
    };
    let magnitude = UBig::try_from(content).expect("bignum content is non-negative");
    e.tag(Tag::new(if negative { 3 } else { 2 }))?;
    e.bytes(&magnitude.to_be_bytes())?;
    Ok(())
}

fn encode_bounded_bytes<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    data: &[u8],
) -> Result<(), minicbor::encode::Error<W::Error>> {
    if data.len() <= BOUNDED_BYTES_CHUNK {
        e.bytes(data)?;
        return Ok(());
    }
    e.begin_bytes()?;
    for chunk in data.chunks(BOUNDED_BYTES_CHUNK) {
        e.bytes(chunk)?;
    }
    e.end()?;
    Ok(())
}

impl<C> minicbor::Encode<C> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            PlutusData::Constr { tag, fields } => {
                if *tag <= 6 {
                    e.tag(Tag::new(CONSTR_TAG_BASE + tag))?;
                } else if *tag <= 127 {
                    e.tag(Tag::new(CONSTR_TAG_EXTENDED_BASE + (tag - 7)))?;
                } else {
                    e.tag(Tag::new(CONSTR_TAG_GENERAL))?;
                    e.array(2)?;
                    e.u64(*tag)?;
                }
                e.array(fields.len() as u64)?;
                for field in fields {
                    field.encode(e, ctx)?;
                }
            }
            PlutusData::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (key, value) in entries {
                    key.encode(e, ctx)?;
                    value.encode(e, ctx)?;
                }
            }
            PlutusData::List(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e, ctx)?;
                }
            }
            PlutusData::Integer(value) => encode_integer(e, value)?,
            PlutusData::Bytes(data) => encode_bounded_bytes(e, data)?,
        }
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for PlutusData {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Tag => {
                let tag = d.tag()?.as_u64();
                match tag {
                    2 | 3 => {
                        let magnitude = IBig::from(UBig::from_be_bytes(d.bytes()?));
                        let value = if tag == 3 {
                            -magnitude - IBig::from(1)
                        } else {
                            magnitude
                        };
                        Ok(PlutusData::Integer(value))
                    }
                    CONSTR_TAG_GENERAL => {
                        let size = d.array()?;
                        if size.is_some_and(|s| s != 2) {
                            return Err(minicbor::decode::Error::message(
                                "general constructor must be [alternative, fields]",
                            ));
                        }
                        let alternative = d.u64()?;
                        let fields = decode_data_seq(d, ctx)?;
                        if size.is_none() {
                            expect_break(d)?;
                        }
                        Ok(PlutusData::Constr {
                            tag: alternative,
                            fields,
                        })
                    }
                    t if (CONSTR_TAG_BASE..CONSTR_TAG_BASE + 7).contains(&t) => {
                        Ok(PlutusData::Constr {
                            tag: t - CONSTR_TAG_BASE,
                            fields: decode_data_seq(d, ctx)?,
                        })
                    }
                    t if (CONSTR_TAG_EXTENDED_BASE..CONSTR_TAG_EXTENDED_BASE + 121)
                        .contains(&t) =>
                    {
                        Ok(PlutusData::Constr {
                            tag: t - CONSTR_TAG_EXTENDED_BASE + 7,
                            fields: decode_data_seq(d, ctx)?,
                        })
                    }
                    other => Err(minicbor::decode::Error::message(format!(
                        "unknown tag {other} for plutus data"
                    ))),
                }
            }
            Type::Map | Type::MapIndef => {
                let size = d.map()?;
                let mut entries = Vec::new();
                let mut remaining = size;
                loop {
                    match remaining {
                        Some(0) => break,
                        None if d.datatype()? == Type::Break => {
                            d.skip()?;
                            break;
                        }
                        _ => {}
                    }
                    let key = PlutusData::decode(d, ctx)?;
                    let value = PlutusData::decode(d, ctx)?;
                    entries.push((key, value));
                    remaining = remaining.map(|n| n - 1);
                }
                Ok(PlutusData::Map(entries))
            }
            Type::Array | Type::ArrayIndef => Ok(PlutusData::List(decode_data_seq(d, ctx)?)),
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 | Type::Int => {
                let value = d.int()?;
                Ok(PlutusData::Integer(IBig::from(i128::from(value))))
            }
            Type::Bytes | Type::BytesIndef => {
                let mut data = Vec::new();
                for chunk in d.bytes_iter()? {
                    data.extend_from_slice(chunk?);
                }
                Ok(PlutusData::Bytes(data))
            }
            other => Err(minicbor::decode::Error::message(format!(
                "unexpected type {other} for plutus data"
            ))),
        }
    }
}

fn decode_data_seq<'b, C>(
    d: &mut minicbor::Decoder<'b>,
    ctx: &mut C,
) -> Result<Vec<PlutusData>, minicbor::decode::Error> {
    let size = d.array()?;
    let mut items = Vec::new();
    let mut remaining = size;
    loop {
        match remaining {
            Some(0) => break,
            None if d.datatype()? == Type::Break => {
                d.skip()?;
                break;
            }
            _ => {}
        }
        items.push(PlutusData::decode(d, ctx)?);
        remaining = remaining.map(|n| n - 1);
    }
    Ok(items)
}

fn expect_break(d: &mut minicbor::Decoder<'_>) -> Result<(), minicbor::decode::Error> {
    if d.datatype()? != Type::Break {
        return Err(minicbor::decode::Error::message("expected break"));
    }
    d.skip()?;
    Ok(())
}

/// Script execution budget
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[cbor(array)]
pub struct ExUnits {
    #[n(0)]
    pub mem: u64,
    #[n(1)]
    pub steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
}

impl RedeemerTag {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Spend => 0,
            Self::Mint => 1,
            Self::Cert => 2,
            Self::Reward => 3,
        }
    }
}

/// A redeemer: the spend-time argument to a script, with its budget.
///
/// One logical redeemer value feeds both the witness set and the
/// script-data hash; `index` points at the (sorted) input being spent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

// Flat array form: [tag, index, data, ex_units]
impl<C> minicbor::Encode<C> for Redeemer {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        e.u8(self.tag.to_u8())?;
        e.u32(self.index)?;
        self.data.encode(e, ctx)?;
        self.ex_units.encode(e, ctx)?;
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Redeemer {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let size = d.array()?;
        if size.is_some_and(|s| s != 4) {
            return Err(minicbor::decode::Error::message("redeemer must have 4 fields"));
        }
        let tag = match d.u8()? {
            0 => RedeemerTag::Spend,
            1 => RedeemerTag::Mint,
            2 => RedeemerTag::Cert,
            3 => RedeemerTag::Reward,
            other => {
                return Err(minicbor::decode::Error::message(format!(
                    "unknown redeemer tag {other}"
                )))
            }
        };
        let index = d.u32()?;
        let data = PlutusData::decode(d, ctx)?;
        let ex_units = ExUnits::decode(d, ctx)?;
        if size.is_none() {
            expect_break(d)?;
        }
        Ok(Redeemer {
            tag,
            index,
            data,
            ex_units,
        })
    }
}

/// Plutus script language version
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ScriptLanguage {
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl ScriptLanguage {
    /// Version tag prefixed to the bytecode when hashing a script
    pub fn tag(&self) -> u8 {
        match self {
            Self::PlutusV1 => 1,
            Self::PlutusV2 => 2,
            Self::PlutusV3 => 3,
        }
    }

    /// Language id as used in cost-model language views
    pub fn language_id(&self) -> u8 {
        self.tag() - 1
    }
}

/// A Plutus script: language version plus raw bytecode
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlutusScript {
    pub language: ScriptLanguage,
    pub bytes: Vec<u8>,
}

impl PlutusScript {
    pub fn new(language: ScriptLanguage, bytes: Vec<u8>) -> Self {
        Self { language, bytes }
    }

    /// Script hash: Blake2b-224 over the language tag and the bytecode
    pub fn compute_hash(&self) -> ScriptHash {
        keyhash_224_tagged(self.language.tag(), &self.bytes)
    }
}

/// Cost model for one script language: an ordered table of integer
/// parameters, supplied verbatim to the script-data hash
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CostModel(pub Vec<i64>);

/// Cost models keyed by language, ordered by language id
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CostModels(Vec<(ScriptLanguage, CostModel)>);

impl CostModels {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, language: ScriptLanguage, model: CostModel) {
        self.0.retain(|(lang, _)| *lang != language);
        self.0.push((language, model));
        self.0.sort_by_key(|(lang, _)| *lang);
    }

    pub fn get(&self, language: ScriptLanguage) -> Option<&CostModel> {
        self.0.iter().find(|(lang, _)| *lang == language).map(|(_, model)| model)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ScriptLanguage, CostModel)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn small_int_encodes_directly() {
        let bytes = PlutusData::int(1).to_bytes();
        assert_eq!(bytes, vec![0x01]);

        let bytes = PlutusData::int(-42).to_bytes();
        assert_eq!(bytes, vec![0x38, 41]);
    }

    #[test]
    fn big_int_uses_bignum_tags() {
        let value = IBig::from_str("340282366920938463463374607431768211455").unwrap();
        let data = PlutusData::Integer(value.clone());
        let bytes = data.to_bytes();
        // tag 2 (0xc2) then a 16-byte string
        assert_eq!(bytes[0], 0xc2);
        assert_eq!(PlutusData::from_bytes(&bytes).unwrap(), data);

        let negative = PlutusData::Integer(-value);
        let bytes = negative.to_bytes();
        assert_eq!(bytes[0], 0xc3);
        assert_eq!(PlutusData::from_bytes(&bytes).unwrap(), negative);
    }

    #[test]
    fn empty_constr_has_no_field_allocation() {
        let data = PlutusData::Constr {
            tag: 0,
            fields: vec![],
        };
        // tag 121 (0xd8 0x79) + empty array
        assert_eq!(data.to_bytes(), vec![0xd8, 0x79, 0x80]);
    }

    #[test]
    fn constr_tag_bands() {
        let encode = |tag| {
            PlutusData::Constr {
                tag,
                fields: vec![],
            }
            .to_bytes()
        };
        // alternative 6 -> tag 127
        assert_eq!(encode(6)[..2], [0xd8, 0x7f]);
        // alternative 7 -> tag 1280 (0xd9 0x0500)
        assert_eq!(encode(7)[..3], [0xd9, 0x05, 0x00]);
        // alternative 127 -> tag 1400
        assert_eq!(encode(127)[..3], [0xd9, 0x05, 0x78]);
        // alternative 128 -> general form, tag 102
        let general = encode(128);
        assert_eq!(general[..2], [0xd8, 0x66]);
        assert_eq!(
            PlutusData::from_bytes(&general).unwrap(),
            PlutusData::Constr {
                tag: 128,
                fields: vec![]
            }
        );
    }

    #[test]
    fn long_bytes_are_chunked() {
        let data = PlutusData::Bytes(vec![0xabu8; 100]);
        let bytes = data.to_bytes();
        // indefinite byte string framing
        assert_eq!(bytes[0], 0x5f);
        assert_eq!(*bytes.last().unwrap(), 0xff);
        assert_eq!(PlutusData::from_bytes(&bytes).unwrap(), data);

        // 64 bytes exactly stays definite
        let data = PlutusData::Bytes(vec![0xabu8; 64]);
        assert_eq!(data.to_bytes()[0], 0x58);
    }

    #[test]
    fn nested_tree_round_trips() {
        let tree = PlutusData::Constr {
            tag: 1,
            fields: vec![
                PlutusData::Map(vec![(
                    PlutusData::bytes(b"key".to_vec()),
                    PlutusData::List(vec![PlutusData::int(1), PlutusData::int(2)]),
                )]),
                PlutusData::Integer(IBig::from_str("-98765432109876543210").unwrap()),
            ],
        };
        let bytes = tree.to_bytes();
        assert_eq!(PlutusData::from_bytes(&bytes).unwrap(), tree);
        // byte-determinism
        assert_eq!(tree.to_bytes(), bytes);
    }

    #[test]
    fn redeemer_encodes_as_flat_array() {
        let redeemer = Redeemer {
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
        };
        let bytes = minicbor::to_vec(&redeemer).unwrap();
        assert_eq!(bytes[0], 0x84);
        let back: Redeemer = minicbor::decode(&bytes).unwrap();
        assert_eq!(back, redeemer);
    }

    #[test]
    fn script_hash_depends_on_language() {
        let bytes = vec![0x59, 0x0a, 0xb4];
        let v1 = PlutusScript::new(ScriptLanguage::PlutusV1, bytes.clone());
        let v2 = PlutusScript::new(ScriptLanguage::PlutusV2, bytes);
        assert_ne!(v1.compute_hash(), v2.compute_hash());
    }

    #[test]
    fn cost_models_sorted_by_language() {
        let mut models = CostModels::new();
        models.insert(ScriptLanguage::PlutusV2, CostModel(vec![1, 2]));
        models.insert(ScriptLanguage::PlutusV1, CostModel(vec![3]));
        let languages: Vec<_> = models.iter().map(|(lang, _)| *lang).collect();
        assert_eq!(languages, vec![ScriptLanguage::PlutusV1, ScriptLanguage::PlutusV2]);
    }
}
