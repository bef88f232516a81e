use std::collections::HashMap;

use derive_more::{Display, Error};
use uuid::Uuid;

use crate::models::TicketCategory;

/// Global cap on tickets per user per event, across all categories.
pub const MAX_TICKETS_PER_BOOKING: u32 = 3;

/// Result of one `adjust` call. Rejections are no-ops carrying the
/// user-visible warning, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustOutcome {
    /// New quantity for the category after the change.
    Applied(u32),
    /// The global per-booking cap would be exceeded; nothing changed.
    CapReached,
    /// The category has no remaining capacity to give; nothing changed.
    SoldOut,
    UnknownCategory,
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[display(fmt = "unknown ticket category")]
    UnknownCategory,
    #[display(fmt = "a booking is limited to {} tickets", MAX_TICKETS_PER_BOOKING)]
    CapExceeded,
    #[display(fmt = "not enough tickets remaining in category '{}'", _0)]
    NotEnoughRemaining(#[error(not(source))] String),
    #[display(fmt = "select at least one ticket")]
    Empty,
}

/// In-memory quantity map over a snapshot of the event's categories.
/// Adjustments never touch shared storage.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TicketSelection {
    categories: Vec<TicketCategory>,
    quantities: HashMap<Uuid, u32>,
}

impl TicketSelection {
    pub fn new(categories: Vec<TicketCategory>) -> Self {
        let quantities = categories.iter().map(|c| (c.id, 0)).collect();
        Self {
            categories,
            quantities,
        }
    }

    /// Builds a selection from a client-submitted quantity map, applying
    /// the same rules `adjust` enforces interactively.
    pub fn from_quantities(
        categories: Vec<TicketCategory>,
        requested: &HashMap<Uuid, u32>,
    ) -> Result<Self, SelectionError> {
        let mut selection = Self::new(categories);
        for (category_id, quantity) in requested {
            if *quantity == 0 {
                continue;
            }
            match selection.adjust(*category_id, *quantity as i64) {
                AdjustOutcome::Applied(applied) if applied == *quantity => {}
                AdjustOutcome::Applied(_) | AdjustOutcome::SoldOut => {
                    let name = selection
                        .category(*category_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    return Err(SelectionError::NotEnoughRemaining(name));
                }
                AdjustOutcome::CapReached => return Err(SelectionError::CapExceeded),
                AdjustOutcome::UnknownCategory => return Err(SelectionError::UnknownCategory),
            }
        }
        if selection.total_tickets() == 0 {
            return Err(SelectionError::Empty);
        }
        Ok(selection)
    }

    pub fn category(&self, category_id: Uuid) -> Option<&TicketCategory> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn remaining(&self, category_id: Uuid) -> Option<u32> {
        self.category(category_id).map(TicketCategory::remaining)
    }

    pub fn quantity(&self, category_id: Uuid) -> u32 {
        self.quantities.get(&category_id).copied().unwrap_or(0)
    }

    /// Proposes `current + delta`, floored at zero. Increases are capped at
    /// the category's remaining count; a change that would push the overall
    /// total past the global cap is refused outright.
    pub fn adjust(&mut self, category_id: Uuid, delta: i64) -> AdjustOutcome {
        let remaining = match self.remaining(category_id) {
            Some(r) => r,
            None => return AdjustOutcome::UnknownCategory,
        };
        let current = self.quantity(category_id);
        let mut proposed =
            (current as i64).saturating_add(delta).clamp(0, u32::MAX as i64) as u32;
        if proposed > current {
            if proposed > remaining {
                proposed = remaining;
            }
            if proposed <= current {
                return AdjustOutcome::SoldOut;
            }
        }
        // widened so a near-u32::MAX limit cannot wrap the cap check
        let new_total = self.total_tickets() as u64 - current as u64 + proposed as u64;
        if new_total > MAX_TICKETS_PER_BOOKING as u64 {
            return AdjustOutcome::CapReached;
        }
        self.quantities.insert(category_id, proposed);
        AdjustOutcome::Applied(proposed)
    }

    pub fn total_tickets(&self) -> u32 {
        self.quantities.values().sum()
    }

    pub fn total_price(&self) -> f64 {
        self.categories
            .iter()
            .map(|c| self.quantity(c.id) as f64 * c.price)
            .sum()
    }

    /// Non-zero lines, for turning the selection into tickets.
    pub fn lines(&self) -> impl Iterator<Item = (&TicketCategory, u32)> {
        self.categories
            .iter()
            .filter_map(|c| match self.quantity(c.id) {
                0 => None,
                q => Some((c, q)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, price: f64, limit: u32, sold: u32) -> TicketCategory {
        TicketCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            limit,
            sold,
        }
    }

    #[test]
    fn near_sold_out_scenario() {
        // one category, limit 10, sold 8, price 50
        let cat = category("Normal", 50.0, 10, 8);
        let id = cat.id;
        let mut sel = TicketSelection::new(vec![cat]);

        assert_eq!(sel.remaining(id), Some(2));
        assert_eq!(sel.adjust(id, 1), AdjustOutcome::Applied(1));
        assert_eq!(sel.adjust(id, 1), AdjustOutcome::Applied(2));
        assert_eq!(sel.total_price(), 100.0);
        // further increment is refused as a no-op
        assert_eq!(sel.adjust(id, 1), AdjustOutcome::SoldOut);
        assert_eq!(sel.quantity(id), 2);
    }

    #[test]
    fn global_cap_holds_for_any_sequence() {
        let a = category("VIP", 120.0, 100, 0);
        let b = category("Normal", 50.0, 100, 0);
        let (ida, idb) = (a.id, b.id);
        let mut sel = TicketSelection::new(vec![a, b]);

        let deltas = [(ida, 2), (idb, 2), (idb, 1), (ida, -1), (idb, 2), (ida, 5)];
        for (id, delta) in deltas {
            sel.adjust(id, delta);
            assert!(sel.total_tickets() <= MAX_TICKETS_PER_BOOKING);
        }
    }

    #[test]
    fn huge_limit_cannot_overflow_the_cap_check() {
        let a = category("VIP", 120.0, 10, 0);
        let b = category("Normal", 50.0, u32::MAX, 0);
        let (ida, idb) = (a.id, b.id);
        let mut sel = TicketSelection::new(vec![a, b]);

        assert_eq!(sel.adjust(ida, 1), AdjustOutcome::Applied(1));
        assert_eq!(sel.adjust(idb, u32::MAX as i64), AdjustOutcome::CapReached);
        assert_eq!(sel.adjust(idb, i64::MAX), AdjustOutcome::CapReached);
        assert_eq!(sel.total_tickets(), 1);
    }

    #[test]
    fn increase_is_clamped_to_remaining() {
        let cat = category("VIP", 120.0, 3, 1);
        let id = cat.id;
        let mut sel = TicketSelection::new(vec![cat]);
        // asks for 5, remaining is 2
        assert_eq!(sel.adjust(id, 5), AdjustOutcome::Applied(2));
    }

    #[test]
    fn decrement_floors_at_zero() {
        let cat = category("Normal", 50.0, 10, 0);
        let id = cat.id;
        let mut sel = TicketSelection::new(vec![cat]);
        assert_eq!(sel.adjust(id, -3), AdjustOutcome::Applied(0));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut sel = TicketSelection::new(vec![category("Normal", 50.0, 10, 0)]);
        assert_eq!(sel.adjust(Uuid::new_v4(), 1), AdjustOutcome::UnknownCategory);
    }

    #[test]
    fn from_quantities_validates_cap_and_remaining() {
        let a = category("VIP", 120.0, 100, 0);
        let b = category("Normal", 50.0, 10, 9);
        let (ida, idb) = (a.id, b.id);

        let over_cap = HashMap::from([(ida, 4u32)]);
        assert_eq!(
            TicketSelection::from_quantities(vec![a.clone(), b.clone()], &over_cap),
            Err(SelectionError::CapExceeded)
        );

        let over_remaining = HashMap::from([(idb, 2u32)]);
        assert!(matches!(
            TicketSelection::from_quantities(vec![a.clone(), b.clone()], &over_remaining),
            Err(SelectionError::NotEnoughRemaining(_))
        ));

        let empty = HashMap::from([(ida, 0u32)]);
        assert_eq!(
            TicketSelection::from_quantities(vec![a.clone(), b.clone()], &empty),
            Err(SelectionError::Empty)
        );

        let ok = HashMap::from([(ida, 2u32), (idb, 1u32)]);
        let sel = TicketSelection::from_quantities(vec![a, b], &ok).unwrap();
        assert_eq!(sel.total_tickets(), 3);
        assert_eq!(sel.total_price(), 290.0);
    }
}
