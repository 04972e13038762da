//! Records derived from contract events.
//!
//! Field names of the serialized form follow the subgraph schema, big integers
//! are rendered as decimal strings and addresses/hashes as lowercase hex.

use std::{fmt, str::FromStr};

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{num::decimal_string, types};

/// Record identifier, `<transactionHash>-<logIndex>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(tx_hash: TxHash, log_index: u64) -> Self {
        Self(format!("{tx_hash:#x}-{log_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kind of record, one per contract event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    ApyUpdated,
    OwnershipTransferred,
    PositionClosed,
    PositionLiquidated,
    PositionOpened,
    TokenAdded,
    TokenRemoved,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        Self::ApyUpdated,
        Self::OwnershipTransferred,
        Self::PositionClosed,
        Self::PositionLiquidated,
        Self::PositionOpened,
        Self::TokenAdded,
        Self::TokenRemoved,
    ];

    /// Entity name as declared in the subgraph schema.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ApyUpdated => "APYUpdated",
            Self::OwnershipTransferred => "OwnershipTransferred",
            Self::PositionClosed => "PositionClosed",
            Self::PositionLiquidated => "PositionLiquidated",
            Self::PositionOpened => "PositionOpened",
            Self::TokenAdded => "TokenAdded",
            Self::TokenRemoved => "TokenRemoved",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown entity: {s}"))
    }
}

/// Block and transaction metadata shared by all records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub id: EntityId,
    #[serde(with = "decimal_string")]
    pub block_number: u64,
    #[serde(with = "decimal_string")]
    pub block_timestamp: u64,
    pub transaction_hash: TxHash,
    #[serde(skip)]
    pub log_index: u64,
}

impl RecordMeta {
    pub fn new<T>(instant: types::StateInstant, ctx: &types::EventContext<T>) -> Self {
        Self {
            id: EntityId::new(ctx.tx_hash(), ctx.log_index()),
            block_number: instant.block_number(),
            block_timestamp: instant.block_timestamp(),
            transaction_hash: ctx.tx_hash(),
            log_index: ctx.log_index(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApyUpdated {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(rename = "newAPY", with = "decimal_string")]
    pub new_apy: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransferred {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub previous_owner: Address,
    pub new_owner: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionOpened {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub trader: Address,
    pub token: Address,
    pub is_long: bool,
    #[serde(with = "decimal_string")]
    pub size: U256,
    #[serde(with = "decimal_string")]
    pub collateral: U256,
    #[serde(with = "decimal_string")]
    pub leverage: U256,
    #[serde(rename = "entryAPY", with = "decimal_string")]
    pub entry_apy: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionClosed {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub trader: Address,
    pub token: Address,
    pub is_long: bool,
    #[serde(with = "decimal_string")]
    pub profit: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionLiquidated {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub trader: Address,
    pub token: Address,
    pub is_long: bool,
    #[serde(with = "decimal_string")]
    pub collateral: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAdded {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub token: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRemoved {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub token: Address,
}

/// Any record kept by the [`super::Store`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    ApyUpdated(ApyUpdated),
    OwnershipTransferred(OwnershipTransferred),
    PositionClosed(PositionClosed),
    PositionLiquidated(PositionLiquidated),
    PositionOpened(PositionOpened),
    TokenAdded(TokenAdded),
    TokenRemoved(TokenRemoved),
}

macro_rules! entity_variants {
    ($($variant:ident),+ $(,)?) => {
        impl Entity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Self::$variant(_) => EntityKind::$variant,)+
                }
            }

            pub fn meta(&self) -> &RecordMeta {
                match self {
                    $(Self::$variant(r) => &r.meta,)+
                }
            }
        }

        $(
            impl From<$variant> for Entity {
                fn from(value: $variant) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<Entity> for $variant {
                type Error = Entity;

                fn try_from(value: Entity) -> Result<Self, Self::Error> {
                    match value {
                        Entity::$variant(r) => Ok(r),
                        other => Err(other),
                    }
                }
            }
        )+
    };
}

entity_variants!(
    ApyUpdated,
    OwnershipTransferred,
    PositionClosed,
    PositionLiquidated,
    PositionOpened,
    TokenAdded,
    TokenRemoved,
);

impl Entity {
    pub fn id(&self) -> &EntityId {
        &self.meta().id
    }

    /// String rendering of a single field by its schema name,
    /// `None` if the record has no such field.
    pub fn field(&self, name: &str) -> Option<String> {
        let serde_json::Value::Object(fields) = serde_json::to_value(self).ok()? else {
            return None;
        };
        match fields.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;

    fn meta() -> RecordMeta {
        RecordMeta {
            id: EntityId::new(
                b256!("0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c8f0b4e0c8c5bfc4b0f5f4c1e"),
                3,
            ),
            block_number: 120,
            block_timestamp: 1_700_000_000,
            transaction_hash: b256!(
                "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c8f0b4e0c8c5bfc4b0f5f4c1e"
            ),
            log_index: 3,
        }
    }

    #[test]
    fn test_entity_id_format() {
        assert_eq!(
            meta().id.as_str(),
            "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c8f0b4e0c8c5bfc4b0f5f4c1e-3"
        );
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!("APYUpdated".parse::<EntityKind>(), Ok(EntityKind::ApyUpdated));
        assert_eq!(
            "positionopened".parse::<EntityKind>(),
            Ok(EntityKind::PositionOpened)
        );
        assert!("Swap".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_field_rendering() {
        let trader = address!("0x1111111111111111111111111111111111111111");
        let entity = Entity::from(PositionOpened {
            meta: meta(),
            trader,
            token: address!("0x2222222222222222222222222222222222222222"),
            is_long: false,
            size: U256::from(5_000),
            collateral: U256::from(1_000),
            leverage: U256::from(5),
            entry_apy: U256::from(315),
        });

        assert_eq!(entity.kind(), EntityKind::PositionOpened);
        assert_eq!(entity.field("trader"), Some(format!("{trader:#x}")));
        assert_eq!(entity.field("isLong").as_deref(), Some("false"));
        assert_eq!(entity.field("size").as_deref(), Some("5000"));
        assert_eq!(entity.field("entryAPY").as_deref(), Some("315"));
        assert_eq!(entity.field("blockNumber").as_deref(), Some("120"));
        assert_eq!(entity.field("logIndex"), None);
        assert_eq!(entity.field("profit"), None);
    }

    #[test]
    fn test_record_deserializes_from_subgraph_shape() {
        let json = r#"{
            "id": "0xa16081f360e3847006db660bae1c6d1b2e17ec2a-1",
            "newAPY": "234",
            "blockNumber": "1",
            "blockTimestamp": "1",
            "transactionHash": "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c8f0b4e0c8c5bfc4b0f5f4c1e"
        }"#;
        let record: ApyUpdated = serde_json::from_str(json).unwrap();
        assert_eq!(record.new_apy, U256::from(234));
        assert_eq!(record.meta.block_number, 1);
        assert_eq!(
            record.meta.id.as_str(),
            "0xa16081f360e3847006db660bae1c6d1b2e17ec2a-1"
        );
    }
}
