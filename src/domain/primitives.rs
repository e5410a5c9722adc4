//! Domain primitives: PolicyId, Wallet, Direction, OptionType, UnderlyingAsset.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque policy identifier, assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        PolicyId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PolicyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(PolicyId)
    }
}

/// Payout destination (wallet address, opaque to the core).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wallet(pub String);

impl Wallet {
    pub fn new(addr: String) -> Self {
        Wallet(addr)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the wallet holds no usable destination.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the barrier the price must cross to trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Triggers when price rises strictly above the barrier (protects a short).
    Above,
    /// Triggers when price falls strictly below the barrier (protects a long).
    Below,
}

impl Direction {
    /// Infer the direction from where the barrier sits relative to spot.
    ///
    /// Returns `None` when the barrier equals spot.
    pub fn infer(spot: f64, barrier: f64) -> Option<Self> {
        if barrier > spot {
            Some(Direction::Above)
        } else if barrier < spot {
            Some(Direction::Below)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
        }
    }
}

/// Option type requested by a client; maps onto a trigger direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn direction(&self) -> Direction {
        match self {
            OptionType::Call => Direction::Above,
            OptionType::Put => Direction::Below,
        }
    }
}

impl From<OptionType> for Direction {
    fn from(option_type: OptionType) -> Self {
        option_type.direction()
    }
}

/// Asset whose price a policy is written against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnderlyingAsset {
    #[default]
    Btc,
    Eth,
    Sol,
}

impl UnderlyingAsset {
    /// Pyth price feed id for the asset's USD pair.
    pub fn pyth_feed_id(&self) -> &'static str {
        match self {
            UnderlyingAsset::Btc => {
                "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43"
            }
            UnderlyingAsset::Eth => {
                "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace"
            }
            UnderlyingAsset::Sol => {
                "ef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d"
            }
        }
    }
}

impl std::fmt::Display for UnderlyingAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnderlyingAsset::Btc => write!(f, "BTC"),
            UnderlyingAsset::Eth => write!(f, "ETH"),
            UnderlyingAsset::Sol => write!(f, "SOL"),
        }
    }
}

impl FromStr for UnderlyingAsset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(UnderlyingAsset::Btc),
            "ETH" => Ok(UnderlyingAsset::Eth),
            "SOL" => Ok(UnderlyingAsset::Sol),
            other => Err(format!("unsupported asset {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_direction() {
        assert_eq!(OptionType::Call.direction(), Direction::Above);
        assert_eq!(OptionType::Put.direction(), Direction::Below);
    }

    #[test]
    fn test_direction_infer() {
        assert_eq!(Direction::infer(150.0, 135.0), Some(Direction::Below));
        assert_eq!(Direction::infer(150.0, 160.0), Some(Direction::Above));
        assert_eq!(Direction::infer(150.0, 150.0), None);
    }

    #[test]
    fn test_direction_serialization() {
        let json = serde_json::to_string(&Direction::Below).unwrap();
        assert_eq!(json, "\"below\"");
        let parsed: OptionType = serde_json::from_str("\"call\"").unwrap();
        assert_eq!(parsed, OptionType::Call);
    }

    #[test]
    fn test_asset_parse_and_display() {
        assert_eq!("eth".parse::<UnderlyingAsset>().unwrap(), UnderlyingAsset::Eth);
        assert_eq!(UnderlyingAsset::Sol.to_string(), "SOL");
        assert!("DOGE".parse::<UnderlyingAsset>().is_err());
        let json = serde_json::to_string(&UnderlyingAsset::Btc).unwrap();
        assert_eq!(json, "\"BTC\"");
    }

    #[test]
    fn test_policy_id_roundtrip_display() {
        let id = PolicyId::generate();
        let parsed: PolicyId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_blank_wallet() {
        assert!(Wallet::new("  ".to_string()).is_blank());
        assert!(!Wallet::new("0xabc".to_string()).is_blank());
    }
}
