//! Reordering of staged items.
//!
//! Every interactive reorder reduces to [`RearrangementController::move_item`]:
//! take one item out of the sequence and put it back so that it ends up at
//! the requested index. Pointer geometry is turned into a gap index with
//! [`insertion_slot`] and applied with
//! [`move_to_slot`](RearrangementController::move_to_slot).

use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, StageError};
use crate::staging::{ItemRef, PageRef, StagingStore};

/// Applies move operations to a [`StagingStore`].
pub struct RearrangementController<'a> {
    store: &'a mut StagingStore,
}

impl<'a> RearrangementController<'a> {
    /// Borrow a store for rearrangement.
    pub fn new(store: &'a mut StagingStore) -> Self {
        Self { store }
    }

    /// Move `item` so that it ends up at index `target`.
    ///
    /// All other items keep their relative order. `target` refers to the
    /// resulting sequence, so it must be less than the sequence length.
    pub fn move_item(&mut self, item: ItemRef, target: usize) -> Result<()> {
        let from = self
            .store
            .position_of(item)
            .ok_or_else(|| StageError::unknown_item(item))?;

        let len = self.store.len();
        if target >= len {
            return Err(StageError::PositionOutOfRange {
                position: target,
                len,
            });
        }

        debug!(%item, from, to = target, "moving item");
        self.store.relocate(from, target);
        Ok(())
    }

    /// Move `item` into the gap before the item currently at `slot`.
    ///
    /// Slot `len` is the gap after the last item. Dropping an item into
    /// either gap next to itself leaves the sequence unchanged.
    pub fn move_to_slot(&mut self, item: ItemRef, slot: usize) -> Result<()> {
        let from = self
            .store
            .position_of(item)
            .ok_or_else(|| StageError::unknown_item(item))?;

        let len = self.store.len();
        if slot > len {
            return Err(StageError::PositionOutOfRange {
                position: slot,
                len,
            });
        }

        let target = if slot > from { slot - 1 } else { slot };
        self.move_item(item, target)
    }

    /// Bring `order` to the front of the sequence, in that order, and
    /// exclude every other page.
    ///
    /// The whole order is checked before anything moves, so a rejected
    /// order leaves the store untouched. Unexpanded documents are not
    /// pages; they keep their relative order after the arranged pages.
    pub fn arrange(&mut self, order: &[PageRef]) -> Result<()> {
        let mut seen = HashSet::with_capacity(order.len());
        for page in order {
            if self.store.position_of((*page).into()).is_none() {
                return Err(StageError::unknown_item(*page));
            }
            if !seen.insert(*page) {
                return Err(StageError::invalid_order(format!(
                    "{page} is listed more than once"
                )));
            }
        }

        for (target, page) in order.iter().enumerate() {
            self.move_item((*page).into(), target)?;
        }

        let pages: Vec<PageRef> = self
            .store
            .items()
            .filter_map(|item| match item {
                ItemRef::Page(page) => Some(page),
                ItemRef::Document(_) => None,
            })
            .collect();
        for page in pages {
            self.store.set_inclusion(page, seen.contains(&page))?;
        }

        debug!(arranged = order.len(), "applied page arrangement");
        Ok(())
    }
}

/// Gap index for a drop at `pointer`, given the item midpoints along the
/// drag axis in display order.
///
/// The item is inserted before the first item whose midpoint the pointer
/// has not crossed. A pointer exactly on a midpoint has not crossed it.
pub fn insertion_slot(midpoints: &[f32], pointer: f32) -> usize {
    midpoints
        .iter()
        .take_while(|&&midpoint| midpoint < pointer)
        .count()
}
