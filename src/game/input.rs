//! Player Intents
//!
//! Commands a client may issue for its avatar. Decoded from the `input`
//! field of an `INPUT` message and validated before they reach the
//! simulation.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::entity::EntityId;
use crate::game::items::{ItemKind, UpgradeType};

// =============================================================================
// INTENT TYPES
// =============================================================================

/// One player command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Walk toward a point
    Move {
        /// Target X
        x: f32,
        /// Target Y
        y: f32,
    },
    /// Cast the hook toward a point
    Hook {
        /// Aim X
        x: f32,
        /// Aim Y
        y: f32,
    },
    /// Toggle the rot aura
    Rot,
    /// Buy a hook upgrade
    Upgrade {
        /// Upgrade line
        #[serde(rename = "upgradeType")]
        upgrade_type: UpgradeType,
    },
    /// Buy an item at a shop
    BuyItem {
        /// Item to buy
        #[serde(rename = "itemId")]
        item_id: ItemKind,
    },
    /// Activate the item in an inventory slot
    UseItem {
        /// Inventory slot
        slot: usize,
        /// Aim X
        #[serde(default)]
        x: f32,
        /// Aim Y
        #[serde(default)]
        y: f32,
    },
    /// Pick up a rune
    Pickup {
        /// Rune entity id
        #[serde(rename = "runeId")]
        rune_id: EntityId,
    },
}

/// Rejected intent.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    /// Coordinates must be finite.
    #[error("non-finite coordinates in {0} intent")]
    NonFinite(&'static str),
}

impl Intent {
    /// Wire name of the intent kind.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Move { .. } => "MOVE",
            Intent::Hook { .. } => "HOOK",
            Intent::Rot => "ROT",
            Intent::Upgrade { .. } => "UPGRADE",
            Intent::BuyItem { .. } => "BUY_ITEM",
            Intent::UseItem { .. } => "USE_ITEM",
            Intent::Pickup { .. } => "PICKUP",
        }
    }

    /// Aim or destination point, if the intent has one.
    pub fn point(&self) -> Option<Vec2> {
        match *self {
            Intent::Move { x, y } | Intent::Hook { x, y } | Intent::UseItem { x, y, .. } => {
                Some(Vec2::new(x, y))
            }
            _ => None,
        }
    }

    /// Reject malformed payloads.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.point().is_some_and(|p| !p.is_finite()) {
            return Err(InputError::NonFinite(self.name()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_intents() {
        let mv: Intent = serde_json::from_str(r#"{"type":"MOVE","x":10.5,"y":20}"#).unwrap();
        assert_eq!(mv, Intent::Move { x: 10.5, y: 20.0 });

        let rot: Intent = serde_json::from_str(r#"{"type":"ROT"}"#).unwrap();
        assert_eq!(rot, Intent::Rot);

        let up: Intent = serde_json::from_str(r#"{"type":"UPGRADE","upgradeType":"range"}"#).unwrap();
        assert_eq!(up, Intent::Upgrade { upgrade_type: UpgradeType::Range });

        let buy: Intent = serde_json::from_str(r#"{"type":"BUY_ITEM","itemId":"blink"}"#).unwrap();
        assert_eq!(buy, Intent::BuyItem { item_id: ItemKind::Blink });

        let buy: Intent = serde_json::from_str(r#"{"type":"BUY_ITEM","itemId":"proximityMine"}"#).unwrap();
        assert_eq!(buy, Intent::BuyItem { item_id: ItemKind::ProximityMine });

        let pick: Intent = serde_json::from_str(r#"{"type":"PICKUP","runeId":7}"#).unwrap();
        assert_eq!(pick, Intent::Pickup { rune_id: 7 });
    }

    #[test]
    fn test_use_item_point_optional() {
        let used: Intent = serde_json::from_str(r#"{"type":"USE_ITEM","slot":2}"#).unwrap();
        assert_eq!(used, Intent::UseItem { slot: 2, x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_unknown_intent_rejected() {
        assert!(serde_json::from_str::<Intent>(r#"{"type":"DANCE"}"#).is_err());
    }

    #[test]
    fn test_unknown_ids_rejected_at_decode() {
        assert!(serde_json::from_str::<Intent>(r#"{"type":"BUY_ITEM","itemId":"banana"}"#).is_err());
        assert!(serde_json::from_str::<Intent>(r#"{"type":"UPGRADE","upgradeType":"teleport"}"#).is_err());
        assert!(serde_json::from_str::<Intent>(r#"{"type":"BUY_ITEM"}"#).is_err());
    }

    #[test]
    fn test_validate_non_finite() {
        let bad = Intent::Hook { x: f32::NAN, y: 0.0 };
        assert_eq!(bad.validate(), Err(InputError::NonFinite("HOOK")));
        assert!(Intent::Rot.validate().is_ok());
    }
}
