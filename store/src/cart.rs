//! Cart state and reconciliation.
//!
//! Reconciliation is pure: every function here takes the current cart and a
//! mutation and produces the updated cart, with no I/O. Persistence happens
//! at the session layer, which rewrites the whole cart per mutation
//! (last-writer-wins).
//!
//! Invariants:
//! - titles are unique within a cart, matched exactly (case-sensitive);
//! - a quantity of zero never persists — the entry is removed instead;
//! - at most [`CART_CAPACITY`] distinct titles;
//! - `price` is always `price_for(unit_price, quantity)`.

use serde::{Deserialize, Serialize};

use crate::catalog::price_for;
use crate::error::CartError;

/// Maximum number of distinct titles one cart may hold.
pub const CART_CAPACITY: usize = 20;

/// One cart line: a title, how many units, and the derived line price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub title: String,
    pub quantity: u32,
    /// Line total in whole currency units; derived, never set directly.
    pub price: i64,
}

/// An ordered list of cart lines, unique by title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct titles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Exact-match lookup by title.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.title == title)
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of all line prices.
    #[must_use]
    pub fn total_price(&self) -> i64 {
        self.items.iter().map(|item| item.price).sum()
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.items.iter().position(|item| item.title == title)
    }

    /// Add `quantity` units of `title` at `unit_price`.
    ///
    /// An existing line absorbs the quantity and has its price recomputed;
    /// a new line is appended. A full cart rejects new titles without
    /// touching the existing lines.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] for a zero quantity,
    /// [`CartError::CartFull`] when a new title would exceed
    /// [`CART_CAPACITY`].
    pub fn add(&mut self, title: &str, quantity: u32, unit_price: i64) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(
                "quantity must be at least 1".to_string(),
            ));
        }
        if let Some(pos) = self.position(title) {
            let item = &mut self.items[pos];
            item.quantity += quantity;
            item.price = price_for(unit_price, item.quantity);
            return Ok(());
        }
        if self.items.len() >= CART_CAPACITY {
            return Err(CartError::CartFull(self.items.len()));
        }
        self.items.push(CartItem {
            title: title.to_string(),
            quantity,
            price: price_for(unit_price, quantity),
        });
        Ok(())
    }

    /// Increase a line's quantity by one and recompute its price.
    ///
    /// Returns the new line price.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`] when the title has no line.
    pub fn increase(&mut self, title: &str, unit_price: i64) -> Result<i64, CartError> {
        let pos = self
            .position(title)
            .ok_or_else(|| CartError::NotInCart(title.to_string()))?;
        let item = &mut self.items[pos];
        item.quantity += 1;
        item.price = price_for(unit_price, item.quantity);
        Ok(item.price)
    }

    /// Decrease a line's quantity by one, removing the line at zero.
    ///
    /// Returns the new line price (zero when the line was removed).
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`] when the title has no line.
    pub fn decrease(&mut self, title: &str, unit_price: i64) -> Result<i64, CartError> {
        let pos = self
            .position(title)
            .ok_or_else(|| CartError::NotInCart(title.to_string()))?;
        let item = &mut self.items[pos];
        item.quantity -= 1;
        if item.quantity == 0 {
            self.items.remove(pos);
            return Ok(0);
        }
        item.price = price_for(unit_price, item.quantity);
        Ok(item.price)
    }

    /// Remove a line unconditionally, whatever its quantity.
    ///
    /// # Errors
    ///
    /// [`CartError::NotInCart`] when the title has no line.
    pub fn remove(&mut self, title: &str) -> Result<(), CartError> {
        let pos = self
            .position(title)
            .ok_or_else(|| CartError::NotInCart(title.to_string()))?;
        self.items.remove(pos);
        Ok(())
    }

    /// Drop lines that no longer map to a catalog title, plus
    /// case-insensitive duplicate titles (first occurrence wins).
    ///
    /// Returns the number of lines removed. This is the only place titles
    /// are compared case-insensitively; every mutation path is exact-match.
    pub fn prune<F>(&mut self, exists: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.items.len();
        let mut seen: Vec<String> = Vec::new();
        self.items.retain(|item| {
            let lowered = item.title.to_lowercase();
            if seen.contains(&lowered) || !exists(&item.title) {
                return false;
            }
            seen.push(lowered);
            true
        });
        before - self.items.len()
    }
}
