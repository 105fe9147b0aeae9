use std::fmt;

use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BlockId;

#[repr(transparent)]
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
pub struct ItemId(pub u16);

impl ItemId {
    pub const STONE: Self = Self(1);
    pub const LOG: Self = Self(2);
    pub const LEAVES: Self = Self(3);
    pub const APPLE: Self = Self(4);
    pub const BERRY: Self = Self(5);

    pub const ALL: [Self; 5] = [Self::STONE, Self::LOG, Self::LEAVES, Self::APPLE, Self::BERRY];

    pub fn name(self) -> &'static str {
        match self {
            Self::STONE => "stone",
            Self::LOG => "log",
            Self::LEAVES => "leaves",
            Self::APPLE => "apple",
            Self::BERRY => "berry",
            _ => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.name() == name)
    }

    /// Energy restored by eating this item, if it is food.
    pub fn food_energy(self) -> Option<i32> {
        match self {
            Self::APPLE => Some(10),
            Self::BERRY => Some(8),
            _ => None,
        }
    }

    pub fn is_food(self) -> bool {
        self.food_energy().is_some()
    }

    /// Block kind produced when this item is placed in the world.
    pub fn place_block(self) -> Option<BlockId> {
        match self {
            Self::STONE => Some(BlockId::STONE),
            Self::LOG => Some(BlockId::LOG),
            Self::LEAVES => Some(BlockId::LEAVES),
            _ => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("not enough {item}: need {needed}, have {have}")]
    NotEnough { item: ItemId, needed: u32, have: u32 },
    #[error("could not transfer {quantity} {item}")]
    TransferFailed { item: ItemId, quantity: u32 },
}

/// Anything that can hold items: a creature's inventory or its tool belt.
pub trait ItemContainer {
    fn add(&mut self, item: ItemId, quantity: u32);

    fn remove(&mut self, item: ItemId, quantity: u32) -> Result<(), InventoryError>;

    fn has_item(&self, item: ItemId, quantity: u32) -> bool;

    fn has_space(&self, quantity: u32) -> bool;

    /// Moves items into `target`, returning whether anything moved.
    fn try_transfer(
        &mut self,
        item: ItemId,
        quantity: u32,
        target: &mut dyn ItemContainer,
    ) -> bool {
        if !self.has_item(item, quantity) || !target.has_space(quantity) {
            return false;
        }
        if self.remove(item, quantity).is_err() {
            return false;
        }
        target.add(item, quantity);
        true
    }

    fn transfer(
        &mut self,
        item: ItemId,
        quantity: u32,
        target: &mut dyn ItemContainer,
    ) -> Result<(), InventoryError> {
        if self.try_transfer(item, quantity, target) {
            Ok(())
        } else {
            Err(InventoryError::TransferFailed { item, quantity })
        }
    }
}

/// Unbounded stacking inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    items: FxHashMap<ItemId, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item stacks ordered by item id.
    pub fn snapshot(&self) -> Vec<(ItemId, u32)> {
        let mut stacks: Vec<_> = self.items.iter().map(|(&item, &qty)| (item, qty)).collect();
        stacks.sort_unstable_by_key(|(item, _)| *item);
        stacks
    }
}

impl ItemContainer for Inventory {
    fn add(&mut self, item: ItemId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.items.entry(item).or_insert(0) += quantity;
    }

    fn remove(&mut self, item: ItemId, quantity: u32) -> Result<(), InventoryError> {
        let have = self.count(item);
        if have < quantity {
            return Err(InventoryError::NotEnough {
                item,
                needed: quantity,
                have,
            });
        }
        if have == quantity {
            self.items.remove(&item);
        } else {
            self.items.insert(item, have - quantity);
        }
        Ok(())
    }

    fn has_item(&self, item: ItemId, quantity: u32) -> bool {
        self.count(item) >= quantity
    }

    fn has_space(&self, _quantity: u32) -> bool {
        true
    }
}

/// Tool belt: one entry per tool, moved one at a time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tools {
    belt: Vec<ItemId>,
}

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.belt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.belt.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ItemId> {
        self.belt.clone()
    }
}

impl ItemContainer for Tools {
    fn add(&mut self, item: ItemId, quantity: u32) {
        for _ in 0..quantity {
            self.belt.push(item);
        }
    }

    fn remove(&mut self, item: ItemId, quantity: u32) -> Result<(), InventoryError> {
        let have = self.belt.iter().filter(|&&tool| tool == item).count() as u32;
        if have < quantity {
            return Err(InventoryError::NotEnough {
                item,
                needed: quantity,
                have,
            });
        }
        for _ in 0..quantity {
            if let Some(index) = self.belt.iter().position(|&tool| tool == item) {
                self.belt.remove(index);
            }
        }
        Ok(())
    }

    fn has_item(&self, item: ItemId, quantity: u32) -> bool {
        self.belt.iter().filter(|&&tool| tool == item).count() as u32 >= quantity
    }

    fn has_space(&self, _quantity: u32) -> bool {
        true
    }

    fn try_transfer(
        &mut self,
        item: ItemId,
        quantity: u32,
        target: &mut dyn ItemContainer,
    ) -> bool {
        if quantity != 1 || !self.has_item(item, 1) || !target.has_space(1) {
            return false;
        }
        if self.remove(item, 1).is_err() {
            return false;
        }
        target.add(item, 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Inventory, InventoryError, ItemContainer, ItemId, Tools};
    use crate::block::BlockId;

    #[test]
    fn items_know_food_and_placement() {
        assert_eq!(ItemId::APPLE.food_energy(), Some(10));
        assert_eq!(ItemId::BERRY.food_energy(), Some(8));
        assert!(!ItemId::STONE.is_food());
        assert_eq!(ItemId::LOG.place_block(), Some(BlockId::LOG));
        assert_eq!(ItemId::LEAVES.place_block(), Some(BlockId::LEAVES));
        assert_eq!(ItemId::APPLE.place_block(), None);
        assert_eq!(ItemId::from_name("berry"), Some(ItemId::BERRY));
    }

    #[test]
    fn inventory_stacks_and_drops_empty_entries() {
        let mut inventory = Inventory::new();
        inventory.add(ItemId::APPLE, 2);
        inventory.add(ItemId::APPLE, 1);
        assert_eq!(inventory.count(ItemId::APPLE), 3);
        assert!(inventory.has_item(ItemId::APPLE, 3));
        assert!(!inventory.has_item(ItemId::APPLE, 4));

        inventory.remove(ItemId::APPLE, 3).expect("remove all apples");
        assert!(inventory.is_empty());
        assert!(inventory.snapshot().is_empty());
    }

    #[test]
    fn inventory_remove_reports_shortfall() {
        let mut inventory = Inventory::new();
        inventory.add(ItemId::LOG, 1);
        let err = inventory.remove(ItemId::LOG, 2).expect_err("only one log");
        assert_eq!(
            err,
            InventoryError::NotEnough {
                item: ItemId::LOG,
                needed: 2,
                have: 1
            }
        );
        assert_eq!(inventory.count(ItemId::LOG), 1);
    }

    #[test]
    fn transfer_moves_items_between_containers() {
        let mut from = Inventory::new();
        let mut to = Inventory::new();
        from.add(ItemId::BERRY, 4);

        assert!(from.try_transfer(ItemId::BERRY, 3, &mut to));
        assert_eq!(from.count(ItemId::BERRY), 1);
        assert_eq!(to.count(ItemId::BERRY), 3);

        assert!(!from.try_transfer(ItemId::BERRY, 2, &mut to));
        let err = from
            .transfer(ItemId::BERRY, 2, &mut to)
            .expect_err("not enough berries left");
        assert!(matches!(err, InventoryError::TransferFailed { .. }));
    }

    #[test]
    fn tools_move_one_at_a_time() {
        let mut tools = Tools::new();
        let mut inventory = Inventory::new();
        tools.add(ItemId::STONE, 1);
        tools.add(ItemId::LOG, 1);

        assert!(!tools.try_transfer(ItemId::STONE, 2, &mut inventory));
        assert!(tools.try_transfer(ItemId::STONE, 1, &mut inventory));
        assert_eq!(tools.snapshot(), vec![ItemId::LOG]);
        assert_eq!(inventory.count(ItemId::STONE), 1);
        assert!(!tools.has_item(ItemId::STONE, 1));
    }
}
