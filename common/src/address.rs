//! Cardano address definitions for Stoa

use crate::hash::{KeyHash, ScriptHash};
use anyhow::{anyhow, bail, Result};
use serde_with::{hex::Hex, serde_as};
use std::fmt::{Display, Formatter};

/// a Byron-era address, carried as an opaque payload
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ByronAddress {
    /// Raw payload
    #[serde_as(as = "Hex")]
    pub payload: Vec<u8>,
}

/// Address network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AddressNetwork {
    /// Mainnet
    Main,

    /// Testnet
    Test,
}

impl Default for AddressNetwork {
    fn default() -> Self {
        Self::Main
    }
}

/// A Shelley-era address - payment part
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressPaymentPart {
    /// Payment to a key
    PaymentKeyHash(KeyHash),

    /// Payment to a script
    ScriptHash(ScriptHash),
}

impl Default for ShelleyAddressPaymentPart {
    fn default() -> Self {
        Self::PaymentKeyHash(KeyHash::default())
    }
}

/// Delegation pointer
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShelleyAddressPointer {
    /// Slot number
    pub slot: u64,

    /// Transaction index within the slot
    pub tx_index: u64,

    /// Certificate index within the transaction
    pub cert_index: u64,
}

/// A Shelley-era address - delegation part
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressDelegationPart {
    /// No delegation (enterprise addresses)
    None,

    /// Delegation to stake key
    StakeKeyHash(KeyHash),

    /// Delegation to script key
    ScriptHash(ScriptHash),

    /// Delegation to pointer
    Pointer(ShelleyAddressPointer),
}

impl Default for ShelleyAddressDelegationPart {
    fn default() -> Self {
        Self::None
    }
}

/// A Shelley-era address
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ShelleyAddress {
    /// Network id
    pub network: AddressNetwork,

    /// Payment part
    pub payment: ShelleyAddressPaymentPart,

    /// Delegation part
    pub delegation: ShelleyAddressDelegationPart,
}

// CIP-19 7-bit variable-length integers, used by pointer delegation parts
fn varint_push(data: &mut Vec<u8>, num: u64) {
    let mut len = 7;
    while (len != 70) && ((num >> len) != 0) {
        len += 7;
    }

    while len > 7 {
        len -= 7;
        data.push((num >> len) as u8 | 0x80);
    }
    data.push((num & 0x7f) as u8);
}

fn varint_read(data: &[u8], position: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;

    while *position < data.len() {
        let byte = data[*position];
        *position += 1;

        value = (value << 7) | (byte & 0x7F) as u64;

        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(anyhow!("Variable integer ran out of data"))
}

impl ShelleyAddress {
    /// Read from string format ("addr1..." / "addr_test1...")
    pub fn from_string(text: &str) -> Result<Self> {
        let (hrp, data) = bech32::decode(text)?;
        if data.is_empty() {
            bail!("Empty address data");
        }

        let network = match hrp.as_str().contains("test") {
            true => AddressNetwork::Test,
            false => AddressNetwork::Main,
        };

        Self::from_payload(network, &data)
    }

    /// Convert to addr1xxx form
    pub fn to_string(&self) -> Result<String> {
        let hrp = match self.network {
            AddressNetwork::Main => bech32::Hrp::parse("addr")?,
            AddressNetwork::Test => bech32::Hrp::parse("addr_test")?,
        };

        Ok(bech32::encode::<bech32::Bech32>(hrp, &self.to_binary())?)
    }

    /// Convert to binary format (header byte + hashes)
    pub fn to_binary(&self) -> Vec<u8> {
        let network_bits = match self.network {
            AddressNetwork::Main => 1u8,
            AddressNetwork::Test => 0u8,
        };

        let (payment_hash, payment_bits): (&[u8], u8) = match &self.payment {
            ShelleyAddressPaymentPart::PaymentKeyHash(hash) => (hash.as_ref(), 0),
            ShelleyAddressPaymentPart::ScriptHash(hash) => (hash.as_ref(), 1),
        };

        let (delegation_hash, delegation_bits): (Vec<u8>, u8) = match &self.delegation {
            ShelleyAddressDelegationPart::None => (Vec::new(), 3),
            ShelleyAddressDelegationPart::StakeKeyHash(hash) => (hash.to_vec(), 0),
            ShelleyAddressDelegationPart::ScriptHash(hash) => (hash.to_vec(), 1),
            ShelleyAddressDelegationPart::Pointer(pointer) => {
                let mut encoded = Vec::new();
                varint_push(&mut encoded, pointer.slot);
                varint_push(&mut encoded, pointer.tx_index);
                varint_push(&mut encoded, pointer.cert_index);
                (encoded, 2)
            }
        };

        let mut data = vec![network_bits | (payment_bits << 4) | (delegation_bits << 5)];
        data.extend_from_slice(payment_hash);
        data.extend(delegation_hash);
        data
    }

    fn from_payload(network: AddressNetwork, data: &[u8]) -> Result<Self> {
        if data.len() < 29 {
            bail!("Shelley address too short: {} bytes", data.len());
        }
        let header = data[0];

        let payment = match (header >> 4) & 0x01 {
            0 => ShelleyAddressPaymentPart::PaymentKeyHash(
                KeyHash::try_from(&data[1..29]).map_err(|_| anyhow!("Bad payment key hash"))?,
            ),
            _ => ShelleyAddressPaymentPart::ScriptHash(
                ScriptHash::try_from(&data[1..29]).map_err(|_| anyhow!("Bad payment script hash"))?,
            ),
        };

        let delegation = match (header >> 5) & 0x03 {
            0 => ShelleyAddressDelegationPart::StakeKeyHash(
                KeyHash::try_from(data.get(29..57).ok_or_else(|| anyhow!("Truncated stake part"))?)
                    .map_err(|_| anyhow!("Bad stake key hash"))?,
            ),
            1 => ShelleyAddressDelegationPart::ScriptHash(
                ScriptHash::try_from(data.get(29..57).ok_or_else(|| anyhow!("Truncated stake part"))?)
                    .map_err(|_| anyhow!("Bad delegation script hash"))?,
            ),
            2 => {
                let mut position = 0;
                let pointer_data = &data[29..];
                let slot = varint_read(pointer_data, &mut position)?;
                let tx_index = varint_read(pointer_data, &mut position)?;
                let cert_index = varint_read(pointer_data, &mut position)?;

                ShelleyAddressDelegationPart::Pointer(ShelleyAddressPointer {
                    slot,
                    tx_index,
                    cert_index,
                })
            }
            _ => ShelleyAddressDelegationPart::None,
        };

        Ok(ShelleyAddress {
            network,
            payment,
            delegation,
        })
    }
}

/// A Cardano address
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Address {
    Byron(ByronAddress),
    Shelley(ShelleyAddress),
}

impl Address {
    /// Read from string format ("addr1..." / "addr_test1...")
    pub fn from_string(text: &str) -> Result<Self> {
        if text.starts_with("addr1") || text.starts_with("addr_test1") {
            Ok(Self::Shelley(ShelleyAddress::from_string(text)?))
        } else {
            bail!("Unrecognised address format: {text}")
        }
    }

    /// Convert to string form
    pub fn to_string(&self) -> Result<String> {
        match self {
            Self::Byron(_) => bail!("Byron addresses have no bech32 form"),
            Self::Shelley(shelley) => shelley.to_string(),
        }
    }

    /// Read from raw header-byte format, as returned by wallet APIs
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        let header = data.first().ok_or_else(|| anyhow!("Empty address data"))?;

        let network = match header & 0x0F {
            0 => AddressNetwork::Test,
            _ => AddressNetwork::Main,
        };

        match (header >> 4) & 0x0F {
            0..=7 => Ok(Self::Shelley(ShelleyAddress::from_payload(network, data)?)),
            0b1000 => Ok(Self::Byron(ByronAddress {
                payload: data.to_vec(),
            })),
            other => bail!("Unknown address header type {other:x}"),
        }
    }

    /// Convert to raw header-byte format
    pub fn to_binary(&self) -> Vec<u8> {
        match self {
            Self::Byron(byron) => byron.payload.clone(),
            Self::Shelley(shelley) => shelley.to_binary(),
        }
    }

    /// True when the payment part is a script hash, i.e. outputs to this
    /// address are script-locked
    pub fn is_script(&self) -> bool {
        matches!(
            self,
            Self::Shelley(ShelleyAddress {
                payment: ShelleyAddressPaymentPart::ScriptHash(_),
                ..
            })
        )
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_string() {
            Ok(text) => write!(f, "{text}"),
            Err(_) => write!(f, "{}", hex::encode(self.to_binary())),
        }
    }
}

impl<C> minicbor::Encode<C> for Address {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_binary())?;
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Address {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        Self::from_binary(bytes)
            .map_err(|e| minicbor::decode::Error::message(format!("invalid address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Script address used by the redeem flow tests
    const SCRIPT_ADDRESS: &str = "addr_test1wrh5pj6nlmdrmtv6uv69edjh5x3gx7px7zchxag47s23gtgu02rzy";

    fn test_payment_key_hash() -> KeyHash {
        KeyHash::try_from(vec![0x11u8; 28]).unwrap()
    }

    fn test_stake_key_hash() -> KeyHash {
        KeyHash::try_from(vec![0x22u8; 28]).unwrap()
    }

    #[test]
    fn script_address_from_bech32() {
        let address = Address::from_string(SCRIPT_ADDRESS).unwrap();
        assert!(address.is_script());
        match &address {
            Address::Shelley(shelley) => {
                assert_eq!(shelley.network, AddressNetwork::Test);
                assert_eq!(shelley.delegation, ShelleyAddressDelegationPart::None);
            }
            _ => panic!("expected Shelley address"),
        }
        assert_eq!(address.to_string().unwrap(), SCRIPT_ADDRESS);
    }

    #[test]
    fn base_address_binary_round_trip() {
        let address = Address::Shelley(ShelleyAddress {
            network: AddressNetwork::Test,
            payment: ShelleyAddressPaymentPart::PaymentKeyHash(test_payment_key_hash()),
            delegation: ShelleyAddressDelegationPart::StakeKeyHash(test_stake_key_hash()),
        });
        let binary = address.to_binary();
        assert_eq!(binary.len(), 57);
        assert_eq!(binary[0], 0x00);
        assert_eq!(Address::from_binary(&binary).unwrap(), address);
        assert!(!address.is_script());
    }

    #[test]
    fn enterprise_address_binary_round_trip() {
        let address = Address::Shelley(ShelleyAddress {
            network: AddressNetwork::Main,
            payment: ShelleyAddressPaymentPart::PaymentKeyHash(test_payment_key_hash()),
            delegation: ShelleyAddressDelegationPart::None,
        });
        let binary = address.to_binary();
        assert_eq!(binary.len(), 29);
        assert_eq!(binary[0], 0x61);
        assert_eq!(Address::from_binary(&binary).unwrap(), address);
    }

    #[test]
    fn pointer_address_binary_round_trip() {
        let address = Address::Shelley(ShelleyAddress {
            network: AddressNetwork::Test,
            payment: ShelleyAddressPaymentPart::PaymentKeyHash(test_payment_key_hash()),
            delegation: ShelleyAddressDelegationPart::Pointer(ShelleyAddressPointer {
                slot: 2498243,
                tx_index: 27,
                cert_index: 3,
            }),
        });
        assert_eq!(Address::from_binary(&address.to_binary()).unwrap(), address);
    }

    #[test]
    fn bech32_round_trip_for_base_address() {
        let address = Address::Shelley(ShelleyAddress {
            network: AddressNetwork::Test,
            payment: ShelleyAddressPaymentPart::PaymentKeyHash(test_payment_key_hash()),
            delegation: ShelleyAddressDelegationPart::StakeKeyHash(test_stake_key_hash()),
        });
        let text = address.to_string().unwrap();
        assert!(text.starts_with("addr_test1"));
        assert_eq!(Address::from_string(&text).unwrap(), address);
    }

    #[test]
    fn unknown_header_rejected() {
        assert!(Address::from_binary(&[0xF0; 29]).is_err());
        assert!(Address::from_binary(&[]).is_err());
    }
}
