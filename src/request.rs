//! Request book.
//!
//! Append-only list of buyer-side purchase requests. Each request carries the
//! value escrowed for it. The only mutation after creation is the single
//! status transition out of `Created`.

use crate::account::Identity;
use crate::types::{Energy, OfferId, RequestId, Timestamp, UnitPrice, Value};
use serde::{Deserialize, Serialize};

/// Request lifecycle. `Settled` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Created,
    /// Escrow released to the seller of a matched offer.
    Settled,
    /// Escrow returned to the buyer without a trade.
    Refunded,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Created)
    }
}

/// A buyer's escrow-backed commitment to purchase energy up to a max unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub buyer: Identity,
    pub energy_amount: Energy,
    pub max_price_per_unit: UnitPrice,
    pub escrowed_value: Value,
    pub status: RequestStatus,
    pub created_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub settled_against: Option<OfferId>,
}

impl Request {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Created
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Request {0} not found")]
    NotFound(RequestId),

    #[error("Request {id} is already {status:?}")]
    AlreadyClosed { id: RequestId, status: RequestStatus },
}

#[derive(Debug, Clone, Default)]
pub struct RequestBook {
    requests: Vec<Request>,
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> RequestId {
        RequestId(self.requests.len() as u64)
    }

    pub fn append(
        &mut self,
        buyer: Identity,
        energy_amount: Energy,
        max_price_per_unit: UnitPrice,
        escrowed_value: Value,
        created_at: Timestamp,
    ) -> RequestId {
        let id = self.next_id();
        self.requests.push(Request {
            id,
            buyer,
            energy_amount,
            max_price_per_unit,
            escrowed_value,
            status: RequestStatus::Created,
            created_at,
            closed_at: None,
            settled_against: None,
        });
        id
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        usize::try_from(id.0).ok().and_then(|idx| self.requests.get(idx))
    }

    /// Returns the request only while it is still open.
    pub fn get_open(&self, id: RequestId) -> Result<&Request, RequestError> {
        let request = self.get(id).ok_or(RequestError::NotFound(id))?;
        if request.status.is_terminal() {
            return Err(RequestError::AlreadyClosed {
                id,
                status: request.status,
            });
        }
        Ok(request)
    }

    /// The one allowed transition: `Created` to a terminal status.
    pub fn close(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        settled_against: Option<OfferId>,
        closed_at: Timestamp,
    ) -> Result<&Request, RequestError> {
        debug_assert!(status.is_terminal());
        self.get_open(id)?;

        let idx = usize::try_from(id.0).map_err(|_| RequestError::NotFound(id))?;
        let request = &mut self.requests[idx];
        request.status = status;
        request.settled_against = settled_against;
        request.closed_at = Some(closed_at);
        Ok(request)
    }

    pub fn all(&self) -> &[Request] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn open(&self) -> impl Iterator<Item = &Request> {
        self.requests.iter().filter(|r| r.is_open())
    }

    pub fn by_buyer(&self, buyer: Identity) -> impl Iterator<Item = &Request> {
        self.requests.iter().filter(move |r| r.buyer == buyer)
    }

    /// Sum of escrow over open requests. None if it would not fit in 256 bits.
    pub fn open_escrow_total(&self) -> Option<Value> {
        self.open()
            .try_fold(Value::zero(), |acc, r| acc.checked_add(r.escrowed_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_two() -> RequestBook {
        let mut book = RequestBook::new();
        book.append(
            Identity::from_low_u64(1),
            Energy::from(4),
            UnitPrice::from(3),
            Value::from(12),
            Timestamp::from_millis(0),
        );
        book.append(
            Identity::from_low_u64(2),
            Energy::from(6),
            UnitPrice::from(5),
            Value::from(30),
            Timestamp::from_millis(0),
        );
        book
    }

    #[test]
    fn new_requests_are_open() {
        let book = book_with_two();
        assert_eq!(book.len(), 2);
        assert!(book.all().iter().all(|r| r.status == RequestStatus::Created));
        assert_eq!(book.open_escrow_total(), Some(Value::from(42)));
    }

    #[test]
    fn close_is_one_shot() {
        let mut book = book_with_two();
        let closed = book
            .close(RequestId(0), RequestStatus::Refunded, None, Timestamp::from_millis(5))
            .unwrap();
        assert_eq!(closed.status, RequestStatus::Refunded);
        assert_eq!(closed.closed_at, Some(Timestamp::from_millis(5)));

        let again = book.close(RequestId(0), RequestStatus::Settled, Some(OfferId(0)), Timestamp::from_millis(6));
        assert_eq!(
            again,
            Err(RequestError::AlreadyClosed {
                id: RequestId(0),
                status: RequestStatus::Refunded
            })
        );
        // terminal record untouched
        assert_eq!(book.get(RequestId(0)).unwrap().status, RequestStatus::Refunded);
        assert_eq!(book.open_escrow_total(), Some(Value::from(30)));
    }

    #[test]
    fn close_unknown() {
        let mut book = RequestBook::new();
        let result = book.close(RequestId(9), RequestStatus::Refunded, None, Timestamp::from_millis(0));
        assert_eq!(result, Err(RequestError::NotFound(RequestId(9))));
    }

    #[test]
    fn by_buyer_filters() {
        let book = book_with_two();
        let ids: Vec<_> = book.by_buyer(Identity::from_low_u64(2)).map(|r| r.id).collect();
        assert_eq!(ids, vec![RequestId(1)]);
    }

    #[test]
    fn status_terminality() {
        assert!(!RequestStatus::Created.is_terminal());
        assert!(RequestStatus::Settled.is_terminal());
        assert!(RequestStatus::Refunded.is_terminal());
    }
}
