// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Booking persistence.
//!
//! [`BookingStore`] is the seam to durable storage. A booking, its tickets
//! and its payment record are committed in one call and become visible
//! together.

use crate::base::{BookingId, EventId, UserId};
use crate::booking::{Booking, Payment};
use crate::error::StorageError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

/// Durable storage for committed bookings.
pub trait BookingStore: Send + Sync {
    /// Allocates the ID for the next booking.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] if the backend cannot be reached.
    fn next_booking_id(&self) -> Result<BookingId, StorageError>;

    /// Persists a booking with its tickets and payment as one unit.
    ///
    /// # Errors
    ///
    /// [`StorageError::DuplicateBooking`] if the ID is already used, or
    /// [`StorageError::Unavailable`] on backend failure. Nothing is stored
    /// on error.
    fn commit(&self, booking: Booking, payment: Payment) -> Result<(), StorageError>;

    /// A user's bookings, oldest first.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] on backend failure.
    fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>, StorageError>;

    /// An event's bookings, oldest first.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] on backend failure.
    fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>, StorageError>;

    /// The payment recorded with a booking.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] on backend failure.
    fn payment(&self, booking_id: BookingId) -> Result<Option<Payment>, StorageError>;

    /// Every stored booking, oldest first.
    ///
    /// # Errors
    ///
    /// [`StorageError::Unavailable`] on backend failure.
    fn all_bookings(&self) -> Result<Vec<Booking>, StorageError>;
}

#[derive(Debug, Clone)]
struct BookingRecord {
    booking: Booking,
    payment: Payment,
}

/// Booking store kept in process memory.
#[derive(Debug)]
pub struct InMemoryBookingStore {
    /// Committed bookings by ID. One entry holds booking and payment.
    records: DashMap<BookingId, BookingRecord>,
    by_user: DashMap<UserId, Vec<BookingId>>,
    by_event: DashMap<EventId, Vec<BookingId>>,
    next_id: AtomicU64,
}

impl InMemoryBookingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_user: DashMap::new(),
            by_event: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn collect(&self, ids: Option<Vec<BookingId>>) -> Vec<Booking> {
        let mut ids = ids.unwrap_or_default();
        ids.sort();
        ids.iter()
            .filter_map(|id| self.records.get(id).map(|record| record.booking.clone()))
            .collect()
    }
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore for InMemoryBookingStore {
    fn next_booking_id(&self) -> Result<BookingId, StorageError> {
        Ok(BookingId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn commit(&self, booking: Booking, payment: Payment) -> Result<(), StorageError> {
        let booking_id = booking.id();
        let user_id = booking.user_id();
        let event_id = booking.event_id();

        // Entry API makes check-and-insert a single step
        match self.records.entry(booking_id) {
            Entry::Occupied(_) => return Err(StorageError::DuplicateBooking(booking_id)),
            Entry::Vacant(entry) => {
                entry.insert(BookingRecord { booking, payment });
            }
        }

        // Indexes are written after the record so readers never see a
        // dangling ID.
        self.by_user.entry(user_id).or_default().push(booking_id);
        self.by_event.entry(event_id).or_default().push(booking_id);
        Ok(())
    }

    fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>, StorageError> {
        let ids = self.by_user.get(&user_id).map(|ids| ids.clone());
        Ok(self.collect(ids))
    }

    fn bookings_for_event(&self, event_id: EventId) -> Result<Vec<Booking>, StorageError> {
        let ids = self.by_event.get(&event_id).map(|ids| ids.clone());
        Ok(self.collect(ids))
    }

    fn payment(&self, booking_id: BookingId) -> Result<Option<Payment>, StorageError> {
        Ok(self
            .records
            .get(&booking_id)
            .map(|record| record.payment.clone()))
    }

    fn all_bookings(&self) -> Result<Vec<Booking>, StorageError> {
        let mut bookings: Vec<Booking> = self
            .records
            .iter()
            .map(|record| record.booking.clone())
            .collect();
        bookings.sort_by_key(Booking::id);
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SectionId;
    use crate::booking::{PaymentStatus, Ticket};
    use crate::catalog::Section;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn booking(id: u64, user: u64, event: u64) -> (Booking, Payment) {
        let section = Section {
            id: SectionId(1),
            event_id: EventId(event),
            name: "General".to_string(),
            rows: 10,
            cols: 10,
            price: dec!(100.00),
        };
        let booking = Booking::new(
            BookingId(id),
            UserId(user),
            EventId(event),
            vec![Ticket::booked(&section, 0, id as u32)],
            PaymentStatus::Completed,
            Utc::now(),
        );
        let payment = Payment::for_booking(&booking, "CARD", Utc::now());
        (booking, payment)
    }

    #[test]
    fn commit_indexes_by_user_and_event() {
        let store = InMemoryBookingStore::new();
        let (b1, p1) = booking(1, 1, 10);
        let (b2, p2) = booking(2, 2, 10);
        let (b3, p3) = booking(3, 1, 20);
        store.commit(b1, p1).unwrap();
        store.commit(b2, p2).unwrap();
        store.commit(b3, p3).unwrap();

        let user_ids: Vec<BookingId> = store
            .bookings_for_user(UserId(1))
            .unwrap()
            .iter()
            .map(Booking::id)
            .collect();
        assert_eq!(user_ids, vec![BookingId(1), BookingId(3)]);

        let event_ids: Vec<BookingId> = store
            .bookings_for_event(EventId(10))
            .unwrap()
            .iter()
            .map(Booking::id)
            .collect();
        assert_eq!(event_ids, vec![BookingId(1), BookingId(2)]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn duplicate_booking_id_is_rejected() {
        let store = InMemoryBookingStore::new();
        let (b1, p1) = booking(1, 1, 10);
        store.commit(b1.clone(), p1.clone()).unwrap();

        assert_eq!(
            store.commit(b1, p1),
            Err(StorageError::DuplicateBooking(BookingId(1)))
        );
        assert_eq!(store.bookings_for_user(UserId(1)).unwrap().len(), 1);
    }

    #[test]
    fn payment_is_stored_with_booking() {
        let store = InMemoryBookingStore::new();
        let (b1, p1) = booking(1, 1, 10);
        store.commit(b1, p1).unwrap();

        let payment = store.payment(BookingId(1)).unwrap().unwrap();
        assert_eq!(payment.amount, dec!(100.00));
        assert_eq!(store.payment(BookingId(2)).unwrap(), None);
    }

    #[test]
    fn allocated_ids_are_unique_and_increasing() {
        let store = InMemoryBookingStore::new();
        let a = store.next_booking_id().unwrap();
        let b = store.next_booking_id().unwrap();
        assert!(b > a);
    }

    #[test]
    fn unknown_user_has_no_bookings() {
        let store = InMemoryBookingStore::new();
        assert!(store.bookings_for_user(UserId(5)).unwrap().is_empty());
        assert!(store.is_empty());
    }
}
