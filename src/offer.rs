//! Offer book.
//!
//! Append-only list of seller-side offers in creation order. Offer records are
//! never mutated or removed. The energy already committed to settled requests
//! lives in a side table so the records themselves stay immutable.

use crate::account::Identity;
use crate::types::{Energy, OfferId, Timestamp, UnitPrice};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A seller's advertisement to sell energy at a fixed unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub seller: Identity,
    pub energy_amount: Energy,
    pub price_per_unit: UnitPrice,
    pub created_at: Timestamp,
}

/// Parallel-array projection of the book: one column per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferColumns {
    pub energy_amounts: Vec<Energy>,
    pub prices_per_unit: Vec<UnitPrice>,
    pub sellers: Vec<Identity>,
}

#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    offers: Vec<Offer>,
    committed: HashMap<OfferId, Energy>,
}

impl OfferBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next appended offer will receive.
    pub fn next_id(&self) -> OfferId {
        OfferId(self.offers.len() as u64)
    }

    pub fn append(
        &mut self,
        seller: Identity,
        energy_amount: Energy,
        price_per_unit: UnitPrice,
        created_at: Timestamp,
    ) -> OfferId {
        let id = self.next_id();
        self.offers.push(Offer {
            id,
            seller,
            energy_amount,
            price_per_unit,
            created_at,
        });
        id
    }

    pub fn get(&self, id: OfferId) -> Option<&Offer> {
        usize::try_from(id.0).ok().and_then(|idx| self.offers.get(idx))
    }

    pub fn all(&self) -> &[Offer] {
        &self.offers
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn by_seller(&self, seller: Identity) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(move |o| o.seller == seller)
    }

    pub fn committed(&self, id: OfferId) -> Energy {
        self.committed.get(&id).copied().unwrap_or_default()
    }

    /// Energy still available for settlement. None for an unknown offer.
    pub fn remaining(&self, id: OfferId) -> Option<Energy> {
        let offer = self.get(id)?;
        // committed never exceeds the offered amount, commit() enforces it
        Some(
            offer
                .energy_amount
                .checked_sub(self.committed(id))
                .unwrap_or_default(),
        )
    }

    /// Record energy settled against an offer. Fails without change if it does not fit.
    pub fn commit(&mut self, id: OfferId, amount: Energy) -> Result<Energy, Energy> {
        let remaining = self.remaining(id).unwrap_or_default();
        if amount > remaining {
            return Err(remaining);
        }
        let total = self.committed(id).checked_add(amount).ok_or(remaining)?;
        self.committed.insert(id, total);
        Ok(total)
    }

    pub fn columns(&self) -> OfferColumns {
        let mut columns = OfferColumns::default();
        for offer in &self.offers {
            columns.energy_amounts.push(offer.energy_amount);
            columns.prices_per_unit.push(offer.price_per_unit);
            columns.sellers.push(offer.seller);
        }
        columns
    }
}
