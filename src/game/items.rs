//! Items and Hook Upgrades
//!
//! Closed item catalogue. Every item carries a typed [`ItemEffect`] that is
//! dispatched by exhaustive matching, so an effect without behaviour is a
//! compile error rather than a silent no-op.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::avatar::{Avatar, AvatarState, AVATAR_RADIUS};
use crate::game::entity::{DamageSource, EntityId, EntityKind};
use crate::game::lifecycle::EntityManager;
use crate::game::map::ArenaMap;
use crate::game::mine::Mine;
use crate::game::toss::ForcedToss;

/// Inventory capacity per avatar.
pub const MAX_INVENTORY_SLOTS: usize = 6;

/// Maximum level of the damage/range/speed/radius upgrades.
pub const MAX_STAT_UPGRADE: u8 = 4;

/// Maximum number of bounce charges.
pub const MAX_BOUNCE_UPGRADE: u8 = 3;

/// Spacing of the samples taken along blink and toss lines.
const LINE_SAMPLE_STEP: f32 = 8.0;

// =============================================================================
// CATALOGUE
// =============================================================================

/// Purchasable item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    /// Short-range teleport
    Blink,
    /// Place a proximity mine
    ProximityMine,
    /// Throw the nearest unit
    Toss,
    /// Instant heal
    Salve,
    /// Hook hits set targets on fire
    FlamingHook,
    /// Hook hits punish movement
    RuptureBlade,
    /// Longer hook
    Lantern,
    /// Permanent extra health
    Vitality,
}

/// Typed behaviour of an item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ItemEffect {
    /// Teleport up to `range` toward the target point.
    Blink { range: f32 },
    /// Place a mine at most `range` away.
    PlaceMine { range: f32 },
    /// Throw the nearest other avatar within `grab_radius` up to `range`.
    Toss { grab_radius: f32, range: f32 },
    /// Restore health immediately.
    Heal { amount: f32 },
    /// Hook hits apply a burn.
    Burn { duration: f32, dps: f32 },
    /// Hook hits apply rupture: a dot plus damage per unit moved.
    Rupture { duration: f32, dps: f32, per_unit: f32 },
    /// Multiply hook range.
    HookRange { factor: f32 },
    /// Raise maximum health once, on purchase.
    MaxHealth { bonus: f32 },
}

impl ItemEffect {
    /// Active effects are triggered with USE_ITEM; passives apply on their own.
    pub fn is_active(self) -> bool {
        match self {
            ItemEffect::Blink { .. }
            | ItemEffect::PlaceMine { .. }
            | ItemEffect::Toss { .. }
            | ItemEffect::Heal { .. } => true,
            ItemEffect::Burn { .. }
            | ItemEffect::Rupture { .. }
            | ItemEffect::HookRange { .. }
            | ItemEffect::MaxHealth { .. } => false,
        }
    }

    /// Effects carried by a hook to whatever it hits.
    pub fn is_on_hit(self) -> bool {
        matches!(self, ItemEffect::Burn { .. } | ItemEffect::Rupture { .. })
    }
}

/// Price, cooldown and effect of one item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemSpec {
    /// Gold cost
    pub cost: u32,
    /// Seconds between uses (0 for passives)
    pub cooldown: f32,
    /// What it does
    pub effect: ItemEffect,
}

impl ItemKind {
    /// Catalogue entry.
    pub fn spec(self) -> ItemSpec {
        let (cost, cooldown, effect) = match self {
            ItemKind::Blink => (250, 10.0, ItemEffect::Blink { range: 400.0 }),
            ItemKind::ProximityMine => (150, 8.0, ItemEffect::PlaceMine { range: 200.0 }),
            ItemKind::Toss => (300, 12.0, ItemEffect::Toss { grab_radius: 150.0, range: 600.0 }),
            ItemKind::Salve => (100, 20.0, ItemEffect::Heal { amount: 60.0 }),
            ItemKind::FlamingHook => (350, 0.0, ItemEffect::Burn { duration: 4.0, dps: 8.0 }),
            ItemKind::RuptureBlade => (400, 0.0, ItemEffect::Rupture { duration: 5.0, dps: 4.0, per_unit: 0.25 }),
            ItemKind::Lantern => (200, 0.0, ItemEffect::HookRange { factor: 1.25 }),
            ItemKind::Vitality => (250, 0.0, ItemEffect::MaxHealth { bonus: 50.0 }),
        };
        ItemSpec { cost, cooldown, effect }
    }
}

/// One owned item and its own cooldown.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySlot {
    /// Which item
    pub item: ItemKind,
    /// Seconds until usable again
    pub cooldown: f32,
}

// =============================================================================
// HOOK UPGRADES
// =============================================================================

/// Permanent hook upgrade line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeType {
    /// +10 damage per level
    Damage,
    /// +75 range per level
    Range,
    /// +100 speed per level
    Speed,
    /// +3 radius per level
    Radius,
    /// One more wall bounce
    Bounce,
    /// Hitting a wall pulls the caster instead
    Grapple,
}

/// Upgrade levels bought by one avatar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookUpgrades {
    /// Damage level
    pub damage: u8,
    /// Range level
    pub range: u8,
    /// Speed level
    pub speed: u8,
    /// Radius level
    pub radius: u8,
    /// Bounce charges per cast
    pub bounce: u8,
    /// Grapple unlocked
    pub grapple: bool,
}

impl HookUpgrades {
    /// Price of the next level, or `None` if maxed.
    pub fn cost(&self, upgrade: UpgradeType) -> Option<u32> {
        let stat = |level: u8| (level < MAX_STAT_UPGRADE).then(|| 100 * (level as u32 + 1));
        match upgrade {
            UpgradeType::Damage => stat(self.damage),
            UpgradeType::Range => stat(self.range),
            UpgradeType::Speed => stat(self.speed),
            UpgradeType::Radius => stat(self.radius),
            UpgradeType::Bounce => (self.bounce < MAX_BOUNCE_UPGRADE).then_some(250),
            UpgradeType::Grapple => (!self.grapple).then_some(400),
        }
    }

    fn apply(&mut self, upgrade: UpgradeType) {
        match upgrade {
            UpgradeType::Damage => self.damage += 1,
            UpgradeType::Range => self.range += 1,
            UpgradeType::Speed => self.speed += 1,
            UpgradeType::Radius => self.radius += 1,
            UpgradeType::Bounce => self.bounce += 1,
            UpgradeType::Grapple => self.grapple = true,
        }
    }
}

// =============================================================================
// SHOP AND ACTIVATION
// =============================================================================

/// Why a purchase or activation did nothing. Never sent to clients.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ItemError {
    /// Dead or locked avatars cannot shop or use items.
    #[error("avatar cannot act right now")]
    Incapacitated,

    /// Not standing near a shop.
    #[error("not near a shop")]
    NotNearShop,

    /// Not enough gold.
    #[error("costs {cost} gold, have {gold}")]
    NotEnoughGold { cost: u32, gold: u32 },

    /// All slots taken.
    #[error("inventory full")]
    InventoryFull,

    /// Upgrade line is maxed.
    #[error("upgrade already at max level")]
    MaxLevel,

    /// No item in that slot.
    #[error("no item in slot {0}")]
    EmptySlot(usize),

    /// Item is passive.
    #[error("item is passive")]
    Passive,

    /// Item still cooling down.
    #[error("item on cooldown")]
    OnCooldown,

    /// Nothing valid to target.
    #[error("no valid target")]
    NoTarget,
}

/// Buy an item into the next free slot.
pub fn buy_item(avatar: &mut Avatar, position: Vec2, map: &ArenaMap, item: ItemKind) -> Result<(), ItemError> {
    if avatar.is_dead() {
        return Err(ItemError::Incapacitated);
    }
    if !map.is_near_shop(position) {
        return Err(ItemError::NotNearShop);
    }
    if avatar.items.len() >= MAX_INVENTORY_SLOTS {
        return Err(ItemError::InventoryFull);
    }
    let spec = item.spec();
    if avatar.gold < spec.cost {
        return Err(ItemError::NotEnoughGold { cost: spec.cost, gold: avatar.gold });
    }

    avatar.gold -= spec.cost;
    avatar.items.push(InventorySlot { item, cooldown: 0.0 });
    if let ItemEffect::MaxHealth { bonus } = spec.effect {
        avatar.add_max_health(bonus);
    }
    Ok(())
}

/// Buy the next level of a hook upgrade.
pub fn buy_upgrade(avatar: &mut Avatar, upgrade: UpgradeType) -> Result<(), ItemError> {
    if avatar.is_dead() {
        return Err(ItemError::Incapacitated);
    }
    let cost = avatar.upgrades.cost(upgrade).ok_or(ItemError::MaxLevel)?;
    if avatar.gold < cost {
        return Err(ItemError::NotEnoughGold { cost, gold: avatar.gold });
    }
    avatar.gold -= cost;
    avatar.upgrades.apply(upgrade);
    Ok(())
}

/// Activate the item in `slot` toward `target`.
pub fn use_item(
    manager: &mut EntityManager,
    map: &ArenaMap,
    user: EntityId,
    slot: usize,
    target: Vec2,
) -> Result<(), ItemError> {
    let (position, team, spec) = {
        let entity = manager.get_mut(user).ok_or(ItemError::Incapacitated)?;
        let position = entity.position;
        let avatar = entity.as_avatar().ok_or(ItemError::Incapacitated)?;
        if avatar.is_dead() || avatar.state == AvatarState::Hooked {
            return Err(ItemError::Incapacitated);
        }
        let owned = avatar.items.get(slot).ok_or(ItemError::EmptySlot(slot))?;
        if owned.cooldown > 0.0 {
            return Err(ItemError::OnCooldown);
        }
        (position, avatar.team, owned.item.spec())
    };

    match spec.effect {
        ItemEffect::Blink { range } => {
            let dest = furthest_walkable(map, position, target, range);
            if dest == position {
                return Err(ItemError::NoTarget);
            }
            if let Some(entity) = manager.get_mut(user) {
                entity.position = dest;
                if let Some(avatar) = entity.as_avatar_mut() {
                    avatar.stop(dest);
                }
            }
        }
        ItemEffect::PlaceMine { range } => {
            let offset = target - position;
            let at = if offset.length() > range {
                position + offset.normalize().scale(range)
            } else {
                target
            };
            if !map.is_walkable(at) {
                return Err(ItemError::NoTarget);
            }
            manager.enqueue_add(at, EntityKind::Mine(Mine::new(team, user)));
        }
        ItemEffect::Toss { grab_radius, range } => {
            let victim = manager
                .iter()
                .filter(|e| e.id != user)
                .filter(|e| {
                    e.as_avatar()
                        .is_some_and(|a| !a.is_dead() && a.state != AvatarState::Hooked)
                })
                .map(|e| (e.id, e.position, e.position.distance(position)))
                .filter(|(_, _, dist)| *dist <= grab_radius)
                .min_by(|a, b| a.2.total_cmp(&b.2));
            let (victim_id, victim_pos, _) = victim.ok_or(ItemError::NoTarget)?;

            let dest = furthest_walkable(map, victim_pos, target, range);
            if let Some(avatar) = manager.get_mut(victim_id).and_then(|e| e.as_avatar_mut()) {
                avatar.lock();
            }
            let source = DamageSource::Player { attacker: user, team };
            manager.enqueue_add(
                victim_pos,
                EntityKind::Toss(ForcedToss::new(victim_id, source, victim_pos, dest)),
            );
        }
        ItemEffect::Heal { amount } => {
            if let Some(avatar) = manager.get_mut(user).and_then(|e| e.as_avatar_mut()) {
                avatar.heal(amount);
            }
        }
        ItemEffect::Burn { .. }
        | ItemEffect::Rupture { .. }
        | ItemEffect::HookRange { .. }
        | ItemEffect::MaxHealth { .. } => return Err(ItemError::Passive),
    }

    if let Some(owned) = manager
        .get_mut(user)
        .and_then(|e| e.as_avatar_mut())
        .and_then(|a| a.items.get_mut(slot))
    {
        owned.cooldown = spec.cooldown;
    }
    Ok(())
}

/// Furthest point from `from` toward `to` (capped at `range`) where an
/// avatar fits. Returns `from` when nothing along the line fits.
pub fn furthest_walkable(map: &ArenaMap, from: Vec2, to: Vec2, range: f32) -> Vec2 {
    let offset = to - from;
    let reach = offset.length().min(range);
    let dir = offset.normalize();
    if reach <= f32::EPSILON {
        return from;
    }

    let steps = (reach / LINE_SAMPLE_STEP).ceil() as usize;
    let mut best = from;
    for step in 1..=steps {
        let dist = (step as f32 * LINE_SAMPLE_STEP).min(reach);
        let candidate = from + dir.scale(dist);
        if map.is_box_walkable(candidate, AVATAR_RADIUS) {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Team;
    use crate::game::map::TILE_SIZE;

    fn shop_pos() -> Vec2 {
        Vec2::new(3.0 * TILE_SIZE, 3.0 * TILE_SIZE)
    }

    #[test]
    fn test_wire_ids() {
        assert_eq!(serde_json::to_string(&ItemKind::ProximityMine).unwrap(), r#""proximityMine""#);
        assert_eq!(serde_json::to_string(&ItemKind::RuptureBlade).unwrap(), r#""ruptureBlade""#);
        assert_eq!(serde_json::from_str::<ItemKind>(r#""flamingHook""#).unwrap(), ItemKind::FlamingHook);
        assert_eq!(serde_json::from_str::<UpgradeType>(r#""grapple""#).unwrap(), UpgradeType::Grapple);
        assert!(serde_json::from_str::<ItemKind>(r#""excalibur""#).is_err());
        assert!(serde_json::from_str::<UpgradeType>(r#""Damage""#).is_err());
    }

    #[test]
    fn test_buy_requires_shop_and_gold() {
        let map = ArenaMap::standard();
        let mut avatar = Avatar::new(uuid::Uuid::nil(), Team::Red, 0);

        let far = map.spawn_point(Team::Red, 0);
        assert_eq!(buy_item(&mut avatar, far, &map, ItemKind::Salve), Err(ItemError::NotNearShop));

        avatar.gold = 50;
        assert_eq!(
            buy_item(&mut avatar, shop_pos(), &map, ItemKind::Salve),
            Err(ItemError::NotEnoughGold { cost: 100, gold: 50 })
        );

        avatar.gold = 1000;
        assert!(buy_item(&mut avatar, shop_pos(), &map, ItemKind::Salve).is_ok());
        assert_eq!(avatar.gold, 900);
        assert_eq!(avatar.items.len(), 1);
    }

    #[test]
    fn test_inventory_is_bounded() {
        let map = ArenaMap::standard();
        let mut avatar = Avatar::new(uuid::Uuid::nil(), Team::Red, 0);
        avatar.gold = 100_000;
        for _ in 0..MAX_INVENTORY_SLOTS {
            buy_item(&mut avatar, shop_pos(), &map, ItemKind::Salve).unwrap();
        }
        assert_eq!(
            buy_item(&mut avatar, shop_pos(), &map, ItemKind::Salve),
            Err(ItemError::InventoryFull)
        );
    }

    #[test]
    fn test_vitality_raises_max_health() {
        let map = ArenaMap::standard();
        let mut avatar = Avatar::new(uuid::Uuid::nil(), Team::Red, 0);
        avatar.gold = 1000;
        buy_item(&mut avatar, shop_pos(), &map, ItemKind::Vitality).unwrap();
        assert_eq!(avatar.max_health, 150.0);
        assert_eq!(avatar.health, 150.0);
    }

    #[test]
    fn test_upgrade_costs_and_caps() {
        let mut avatar = Avatar::new(uuid::Uuid::nil(), Team::Blue, 0);
        avatar.gold = 10_000;

        for level in 1..=MAX_STAT_UPGRADE {
            let before = avatar.gold;
            buy_upgrade(&mut avatar, UpgradeType::Damage).unwrap();
            assert_eq!(before - avatar.gold, 100 * level as u32);
        }
        assert_eq!(buy_upgrade(&mut avatar, UpgradeType::Damage), Err(ItemError::MaxLevel));

        buy_upgrade(&mut avatar, UpgradeType::Grapple).unwrap();
        assert_eq!(buy_upgrade(&mut avatar, UpgradeType::Grapple), Err(ItemError::MaxLevel));
    }

    #[test]
    fn test_furthest_walkable_stops_at_wall() {
        let map = ArenaMap::standard();
        let from = Vec2::new(200.0, 300.0);
        // Straight into the west wall
        let dest = furthest_walkable(&map, from, Vec2::new(-400.0, 300.0), 400.0);
        assert!(map.is_box_walkable(dest, AVATAR_RADIUS));
        assert!(dest.x < from.x);
        assert!(dest.x >= TILE_SIZE + AVATAR_RADIUS);
    }

    #[test]
    fn test_use_salve_heals_and_starts_cooldown() {
        let map = ArenaMap::standard();
        let mut manager = EntityManager::new();
        let mut avatar = Avatar::new(uuid::Uuid::nil(), Team::Red, 0);
        avatar.items.push(InventorySlot { item: ItemKind::Salve, cooldown: 0.0 });
        avatar.health = 20.0;
        let id = manager.enqueue_add(Vec2::new(400.0, 300.0), EntityKind::Avatar(avatar));

        use_item(&mut manager, &map, id, 0, Vec2::ZERO).unwrap();
        let avatar = manager.get_mut(id).and_then(|e| e.as_avatar()).unwrap();
        assert_eq!(avatar.health, 80.0);
        assert_eq!(avatar.items[0].cooldown, 20.0);

        assert_eq!(use_item(&mut manager, &map, id, 0, Vec2::ZERO), Err(ItemError::OnCooldown));
        assert_eq!(use_item(&mut manager, &map, id, 3, Vec2::ZERO), Err(ItemError::EmptySlot(3)));
    }
}
