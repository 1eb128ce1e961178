use std::ops::{Add, AddAssign};

use crate::hash::Hash;

/// Amount in Lovelace
pub type Lovelace = u64;

pub type PolicyId = Hash<28>;
pub type NativeAssets = Vec<(PolicyId, Vec<NativeAsset>)>;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub struct AssetName {
    #[n(0)]
    len: u8,
    #[n(1)]
    bytes: [u8; 32],
}

impl AssetName {
    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() > 32 {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            len: data.len() as u8,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
pub struct NativeAsset {
    #[n(0)]
    pub name: AssetName,
    #[n(1)]
    pub amount: u64,
}

/// Value (lovelace + multiasset)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct Value {
    pub lovelace: Lovelace,
    pub assets: NativeAssets,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.lovelace == other.lovelace && self.asset_amounts() == other.asset_amounts()
    }
}

impl Eq for Value {}

impl Value {
    pub fn new(lovelace: Lovelace, assets: NativeAssets) -> Self {
        Self { lovelace, assets }
    }

    pub fn coin(lovelace: Lovelace) -> Self {
        Self::new(lovelace, Vec::new())
    }

    pub fn coin_only(&self) -> bool {
        self.assets.iter().all(|(_, assets)| assets.iter().all(|a| a.amount == 0))
    }

    pub fn sum_lovelace<'a>(iter: impl Iterator<Item = &'a Value>) -> Lovelace {
        iter.map(|v| v.lovelace).sum()
    }

    /// Flattened (policy, name, amount) triples, sorted, zero amounts dropped.
    /// Canonical form used for comparison, subtraction and CBOR encoding.
    fn asset_amounts(&self) -> Vec<(PolicyId, AssetName, u64)> {
        let mut flat: Vec<(PolicyId, AssetName, u64)> = Vec::new();
        for (policy_id, assets) in &self.assets {
            for asset in assets {
                if asset.amount == 0 {
                    continue;
                }
                match flat.iter_mut().find(|(p, n, _)| p == policy_id && *n == asset.name) {
                    Some((_, _, amount)) => *amount += asset.amount,
                    None => flat.push((*policy_id, asset.name, asset.amount)),
                }
            }
        }
        flat.sort_by(|a, b| {
            (a.0.as_ref(), a.1.as_slice()).cmp(&(b.0.as_ref(), b.1.as_slice()))
        });
        flat
    }

    /// Sorted policy groups, used by the canonical CBOR encoding
    pub fn sorted_assets(&self) -> NativeAssets {
        let mut grouped: NativeAssets = Vec::new();
        for (policy_id, name, amount) in self.asset_amounts() {
            match grouped.last_mut() {
                Some((last_policy, assets)) if *last_policy == policy_id => {
                    assets.push(NativeAsset { name, amount });
                }
                _ => grouped.push((policy_id, vec![NativeAsset { name, amount }])),
            }
        }
        grouped
    }

    /// Subtract `other`, failing if any lovelace or asset amount would go
    /// negative. Used by change computation.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let lovelace = self.lovelace.checked_sub(other.lovelace)?;

        let mut remaining = self.asset_amounts();
        for (policy_id, name, amount) in other.asset_amounts() {
            let entry = remaining.iter_mut().find(|(p, n, _)| *p == policy_id && *n == name)?;
            entry.2 = entry.2.checked_sub(amount)?;
        }

        let mut result = Value::coin(lovelace);
        for (policy_id, name, amount) in remaining {
            if amount > 0 {
                result += &Value::new(0, vec![(policy_id, vec![NativeAsset { name, amount }])]);
            }
        }
        Some(result)
    }
}

impl AddAssign<&Value> for Value {
    fn add_assign(&mut self, other: &Value) {
        self.lovelace += other.lovelace;

        for (policy_id, other_assets) in &other.assets {
            if let Some((_, existing_assets)) =
                self.assets.iter_mut().find(|(pid, _)| pid == policy_id)
            {
                for other_asset in other_assets {
                    if let Some(existing) =
                        existing_assets.iter_mut().find(|a| a.name == other_asset.name)
                    {
                        existing.amount += other_asset.amount;
                    } else {
                        existing_assets.push(other_asset.clone());
                    }
                }
            } else {
                self.assets.push((*policy_id, other_assets.clone()));
            }
        }
    }
}

impl Add for Value {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        let mut result = self.clone();
        result += &other;
        result
    }
}

// Canonical CBOR: a plain uint when there are no assets, otherwise
// [coin, {policy: {name: amount}}] with policies and names sorted
impl<C> minicbor::Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let assets = self.sorted_assets();
        if assets.is_empty() {
            e.u64(self.lovelace)?;
            return Ok(());
        }

        e.array(2)?;
        e.u64(self.lovelace)?;
        e.map(assets.len() as u64)?;
        for (policy_id, group) in &assets {
            e.bytes(policy_id.as_ref())?;
            e.map(group.len() as u64)?;
            for asset in group {
                e.bytes(asset.name.as_slice())?;
                e.u64(asset.amount)?;
            }
        }
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Value {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            minicbor::data::Type::U8
            | minicbor::data::Type::U16
            | minicbor::data::Type::U32
            | minicbor::data::Type::U64 => Ok(Value::coin(d.u64()?)),
            minicbor::data::Type::Array | minicbor::data::Type::ArrayIndef => {
                let size = d.array()?;
                if let Some(size) = size {
                    if size != 2 {
                        return Err(minicbor::decode::Error::message(
                            "expected [coin, multiasset] value",
                        ));
                    }
                }
                let lovelace = d.u64()?;
                let mut assets: NativeAssets = Vec::new();

                let policies = d.map()?;
                let mut remaining = policies;
                loop {
                    match remaining {
                        Some(0) => break,
                        None if d.datatype()? == minicbor::data::Type::Break => {
                            d.skip()?;
                            break;
                        }
                        _ => {}
                    }
                    let policy_id = PolicyId::try_from(d.bytes()?)
                        .map_err(|_| minicbor::decode::Error::message("invalid policy id"))?;
                    let names = d.map()?;
                    let mut names_remaining = names;
                    let mut group = Vec::new();
                    loop {
                        match names_remaining {
                            Some(0) => break,
                            None if d.datatype()? == minicbor::data::Type::Break => {
                                d.skip()?;
                                break;
                            }
                            _ => {}
                        }
                        let name = AssetName::new(d.bytes()?).ok_or_else(|| {
                            minicbor::decode::Error::message("asset name over 32 bytes")
                        })?;
                        let amount = d.u64()?;
                        group.push(NativeAsset { name, amount });
                        names_remaining = names_remaining.map(|n| n - 1);
                    }
                    assets.push((policy_id, group));
                    remaining = remaining.map(|n| n - 1);
                }

                if size.is_none() {
                    if d.datatype()? != minicbor::data::Type::Break {
                        return Err(minicbor::decode::Error::message("expected break in value"));
                    }
                    d.skip()?;
                }
                Ok(Value::new(lovelace, assets))
            }
            other => Err(minicbor::decode::Error::message(format!(
                "unexpected type {other} for value"
            ))),
        }
    }
}
