//! Read-only projections for the presentation layer and auditors.

use super::core::Engine;
use super::results::InvariantViolation;
use crate::account::{Account, Identity};
use crate::offer::{Offer, OfferColumns};
use crate::request::Request;
use crate::settlement::SettlementBackend;
use crate::types::{Energy, OfferId, RequestId, Timestamp, Value};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Consistent copy of the books at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub taken_at: Timestamp,
    pub offers: Vec<Offer>,
    pub requests: Vec<Request>,
    pub contract_balance: Value,
}

impl<B: SettlementBackend> Engine<B> {
    /// All offers in creation order.
    pub fn list_offers(&self) -> &[Offer] {
        self.offers.all()
    }

    /// All requests in creation order, open and closed.
    pub fn list_requests(&self) -> &[Request] {
        self.requests.all()
    }

    /// Value currently held in custody.
    pub fn contract_balance(&self) -> Value {
        self.custody.balance()
    }

    pub fn offer_columns(&self) -> OfferColumns {
        self.offers.columns()
    }

    pub fn get_offer(&self, offer_id: OfferId) -> Option<&Offer> {
        self.offers.get(offer_id)
    }

    pub fn get_request(&self, request_id: RequestId) -> Option<&Request> {
        self.requests.get(request_id)
    }

    pub fn offers_by_seller(&self, seller: Identity) -> Vec<&Offer> {
        self.offers.by_seller(seller).collect()
    }

    pub fn requests_by_buyer(&self, buyer: Identity) -> Vec<&Request> {
        self.requests.by_buyer(buyer).collect()
    }

    pub fn open_requests(&self) -> Vec<&Request> {
        self.requests.open().collect()
    }

    pub fn offer_remaining_energy(&self, offer_id: OfferId) -> Option<Energy> {
        self.offers.remaining(offer_id)
    }

    /// None until the identity has escrowed or received value.
    pub fn account(&self, identity: Identity) -> Option<&Account> {
        self.accounts.get(&identity)
    }

    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            taken_at: self.current_time,
            offers: self.offers.all().to_vec(),
            requests: self.requests.all().to_vec(),
            contract_balance: self.custody.balance(),
        }
    }

    /// Audit custody conservation, escrow exactness, vault agreement, per-account totals
    /// and the custody ledger's lifetime flows.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let custody = self.custody.balance();

        let open_escrow = self
            .requests
            .open_escrow_total()
            .unwrap_or_else(|| Value::new(U256::MAX));
        if open_escrow != custody {
            return Err(InvariantViolation::CustodyMismatch {
                custody,
                open_escrow,
            });
        }

        for request in self.requests.all() {
            let expected = request
                .energy_amount
                .checked_cost(request.max_price_per_unit);
            if expected != Some(request.escrowed_value) {
                return Err(InvariantViolation::EscrowInexact {
                    request_id: request.id,
                    escrowed: request.escrowed_value,
                });
            }
        }

        let vault = self.backend.vault_balance();
        if vault != custody {
            return Err(InvariantViolation::VaultMismatch { vault, custody });
        }

        let accounts: Value = self.accounts.values().map(|a| a.escrowed).sum();
        if accounts != custody {
            return Err(InvariantViolation::AccountMismatch { accounts, custody });
        }

        let deposited = self.custody.total_deposited();
        let released = self.custody.total_released();
        if deposited.checked_sub(released) != Some(custody) {
            return Err(InvariantViolation::LedgerMismatch {
                deposited,
                released,
                custody,
            });
        }

        // one deposit per request, one release per closed request
        let requests = self.requests.len();
        let closed = requests - self.requests.open().count();
        let deposits = self.custody.deposit_count();
        let releases = self.custody.release_count();
        if deposits != requests as u64 || releases != closed as u64 {
            return Err(InvariantViolation::CountMismatch {
                deposits,
                releases,
                requests,
                closed,
            });
        }

        Ok(())
    }
}
