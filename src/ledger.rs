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

//! Seat ledger: the authority over which seats of an event are claimed.
//!
//! Each event owns one [`EventSeats`] table behind its own mutex, so
//! reservations for different events never contend. Within an event the
//! whole batch is checked and claimed under a single lock acquisition:
//! no caller can observe a seat as free between another caller's check and
//! claim.
//!
//! ```text
//!  free ──try_reserve──► Held(reservation) ──confirm──► Confirmed
//!                               │
//!                               └──release──► free
//! ```
//!
//! # Example
//!
//! ```
//! use seat_booking_rs::{EventId, SeatCoordinate, SeatLedger, SectionId, ReservationError};
//!
//! let ledger = SeatLedger::new();
//! let seat = SeatCoordinate::new(SectionId(1), 3, 5);
//!
//! let handle = ledger.try_reserve(EventId(1), &[seat]).unwrap();
//! assert_eq!(
//!     ledger.try_reserve(EventId(1), &[seat]).unwrap_err(),
//!     ReservationError::Conflict(seat)
//! );
//! ledger.confirm(&handle).unwrap();
//! assert!(ledger.is_claimed(EventId(1), &seat));
//! ```

use crate::base::{EventId, ReservationId, SeatCoordinate};
use crate::error::ReservationError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Held(ReservationId),
    Confirmed,
}

#[derive(Debug, Default)]
struct EventSeats {
    claims: HashMap<SeatCoordinate, Claim>,
    /// Seats of each pending reservation, for release and confirm.
    pending: HashMap<ReservationId, Vec<SeatCoordinate>>,
}

impl EventSeats {
    fn assert_invariants(&self) {
        debug_assert!(
            self.pending.iter().all(|(id, seats)| seats
                .iter()
                .all(|seat| self.claims.get(seat) == Some(&Claim::Held(*id)))),
            "Invariant violated: pending reservation does not hold its seats"
        );
    }

    /// Claims every seat or none of them.
    fn claim_all(
        &mut self,
        id: ReservationId,
        seats: &[SeatCoordinate],
    ) -> Result<(), ReservationError> {
        let mut batch = HashSet::with_capacity(seats.len());
        for seat in seats {
            if self.claims.contains_key(seat) || !batch.insert(*seat) {
                return Err(ReservationError::Conflict(*seat));
            }
        }

        for seat in seats {
            self.claims.insert(*seat, Claim::Held(id));
        }
        self.pending.insert(id, seats.to_vec());
        self.assert_invariants();
        Ok(())
    }

    /// Frees the reservation's seats. Unknown IDs are ignored.
    fn release(&mut self, id: ReservationId) -> usize {
        let Some(seats) = self.pending.remove(&id) else {
            return 0;
        };
        for seat in &seats {
            if self.claims.get(seat) == Some(&Claim::Held(id)) {
                self.claims.remove(seat);
            }
        }
        self.assert_invariants();
        seats.len()
    }

    fn confirm(&mut self, id: ReservationId) -> Result<Vec<SeatCoordinate>, ReservationError> {
        let seats = self
            .pending
            .remove(&id)
            .ok_or(ReservationError::UnknownReservation(id))?;
        for seat in &seats {
            self.claims.insert(*seat, Claim::Confirmed);
        }
        self.assert_invariants();
        Ok(seats)
    }

    /// Marks seats as confirmed without a reservation (recovery).
    /// Returns how many seats were newly claimed.
    fn restore(&mut self, seats: &[SeatCoordinate]) -> usize {
        let mut restored = 0;
        for seat in seats {
            if self.claims.insert(*seat, Claim::Confirmed).is_none() {
                restored += 1;
            }
        }
        restored
    }
}

/// Token for a pending, not yet confirmed claim on a batch of seats.
///
/// Not cloneable: the holder of the handle is the only party that can
/// confirm or release the claim.
#[derive(Debug, PartialEq, Eq)]
pub struct ReservationHandle {
    event_id: EventId,
    id: ReservationId,
    seats: Vec<SeatCoordinate>,
}

impl ReservationHandle {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn seats(&self) -> &[SeatCoordinate] {
        &self.seats
    }
}

/// A pending reservation that is released when dropped unless it was
/// settled through [`ReservationGuard::confirm_with`].
///
/// Early returns and panics between reserve and commit both drop the
/// guard, so a hold never outlives the request that took it.
#[must_use = "dropping the guard releases the seats"]
#[derive(Debug)]
pub struct ReservationGuard<'a> {
    ledger: &'a SeatLedger,
    handle: ReservationHandle,
    armed: bool,
}

impl ReservationGuard<'_> {
    pub fn handle(&self) -> &ReservationHandle {
        &self.handle
    }

    /// Runs [`SeatLedger::confirm_with`] and disarms the guard once the
    /// reservation is settled either way. If `commit` panics the guard is
    /// still armed and releases the seats while unwinding.
    ///
    /// # Errors
    ///
    /// See [`SeatLedger::confirm_with`].
    pub fn confirm_with<T, E, F>(mut self, commit: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ReservationError>,
    {
        let result = self.ledger.confirm_with(&self.handle, commit);
        self.armed = false;
        result
    }
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.ledger.release(&self.handle);
        }
    }
}

/// Concurrency-safe record of claimed seats, partitioned by event.
#[derive(Debug)]
pub struct SeatLedger {
    events: DashMap<EventId, Arc<Mutex<EventSeats>>>,
    next_reservation: AtomicU64,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            next_reservation: AtomicU64::new(1),
        }
    }

    /// Returns the event's seat table, creating it on first use.
    ///
    /// The `Arc` is cloned out so the map shard is unlocked before the
    /// event mutex is taken.
    fn seats_of(&self, event_id: EventId) -> Arc<Mutex<EventSeats>> {
        Arc::clone(self.events.entry(event_id).or_default().value())
    }

    fn existing(&self, event_id: EventId) -> Option<Arc<Mutex<EventSeats>>> {
        self.events.get(&event_id).map(|seats| Arc::clone(seats.value()))
    }

    /// Atomically claims all `seats` for `event_id`.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Conflict`] with the first seat that is already
    /// claimed, or that appears twice in `seats`. Nothing is claimed.
    pub fn try_reserve(
        &self,
        event_id: EventId,
        seats: &[SeatCoordinate],
    ) -> Result<ReservationHandle, ReservationError> {
        let id = ReservationId(self.next_reservation.fetch_add(1, Ordering::Relaxed));
        let table = self.seats_of(event_id);

        table.lock().claim_all(id, seats)?;

        tracing::debug!(event = %event_id, reservation = %id, seats = seats.len(), "seats reserved");
        Ok(ReservationHandle {
            event_id,
            id,
            seats: seats.to_vec(),
        })
    }

    /// Like [`SeatLedger::try_reserve`], but the hold is released
    /// automatically unless it is confirmed through the returned guard.
    ///
    /// # Errors
    ///
    /// [`ReservationError::Conflict`] as for `try_reserve`.
    pub fn hold(
        &self,
        event_id: EventId,
        seats: &[SeatCoordinate],
    ) -> Result<ReservationGuard<'_>, ReservationError> {
        let handle = self.try_reserve(event_id, seats)?;
        Ok(ReservationGuard {
            ledger: self,
            handle,
            armed: true,
        })
    }

    /// Returns the reservation's seats to the free pool.
    ///
    /// Idempotent: releasing a confirmed, released or unknown reservation
    /// does nothing.
    pub fn release(&self, handle: &ReservationHandle) {
        let Some(table) = self.existing(handle.event_id) else {
            return;
        };
        let released = table.lock().release(handle.id);
        if released > 0 {
            tracing::debug!(event = %handle.event_id, reservation = %handle.id, released, "reservation released");
        }
    }

    /// Makes the reservation permanent. Its seats stay claimed for good.
    ///
    /// # Errors
    ///
    /// [`ReservationError::UnknownReservation`] if the reservation was
    /// already released or confirmed.
    pub fn confirm(&self, handle: &ReservationHandle) -> Result<(), ReservationError> {
        let table = self
            .existing(handle.event_id)
            .ok_or(ReservationError::UnknownReservation(handle.id))?;
        table.lock().confirm(handle.id)?;
        Ok(())
    }

    /// Runs `commit` inside the event's critical section and confirms the
    /// reservation only if it succeeds. On failure the seats are released
    /// before the lock is dropped, so no other caller observes a half
    /// committed state.
    ///
    /// # Errors
    ///
    /// The error returned by `commit`, or [`ReservationError::UnknownReservation`]
    /// (converted into `E`) if the reservation is no longer pending, in
    /// which case `commit` is not run.
    pub fn confirm_with<T, E, F>(&self, handle: &ReservationHandle, commit: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<ReservationError>,
    {
        let table = self
            .existing(handle.event_id)
            .ok_or(ReservationError::UnknownReservation(handle.id))?;
        let mut seats = table.lock();
        if !seats.pending.contains_key(&handle.id) {
            return Err(ReservationError::UnknownReservation(handle.id).into());
        }

        match commit() {
            Ok(value) => {
                seats.confirm(handle.id)?;
                Ok(value)
            }
            Err(err) => {
                seats.release(handle.id);
                Err(err)
            }
        }
    }

    /// Marks already persisted seats as confirmed. Used to rebuild the
    /// ledger from stored bookings at startup.
    pub fn restore(&self, event_id: EventId, seats: &[SeatCoordinate]) -> usize {
        self.seats_of(event_id).lock().restore(seats)
    }

    /// Runs `read` while holding the event's lock, so it cannot observe a
    /// commit that [`SeatLedger::confirm_with`] has stored but not yet
    /// confirmed.
    pub fn read_committed<T>(&self, event_id: EventId, read: impl FnOnce() -> T) -> T {
        let table = self.seats_of(event_id);
        let _seats = table.lock();
        read()
    }

    /// Returns `true` if the seat is held or confirmed.
    pub fn is_claimed(&self, event_id: EventId, seat: &SeatCoordinate) -> bool {
        self.existing(event_id)
            .is_some_and(|table| table.lock().claims.contains_key(seat))
    }

    /// Confirmed seats of an event, sorted.
    pub fn confirmed_seats(&self, event_id: EventId) -> Vec<SeatCoordinate> {
        let Some(table) = self.existing(event_id) else {
            return Vec::new();
        };
        let mut seats: Vec<SeatCoordinate> = table
            .lock()
            .claims
            .iter()
            .filter(|(_, claim)| **claim == Claim::Confirmed)
            .map(|(seat, _)| *seat)
            .collect();
        seats.sort();
        seats
    }

    /// Number of reservations held but not yet confirmed or released.
    pub fn pending_reservations(&self, event_id: EventId) -> usize {
        self.existing(event_id)
            .map_or(0, |table| table.lock().pending.len())
    }
}

impl Default for SeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SectionId;

    fn seat(row: u32, col: u32) -> SeatCoordinate {
        SeatCoordinate::new(SectionId(1), row, col)
    }

    // === EventSeats Internal Tests ===

    #[test]
    fn claim_all_rejects_whole_batch_on_conflict() {
        let mut table = EventSeats::default();
        table.claim_all(ReservationId(1), &[seat(0, 1)]).unwrap();

        let result = table.claim_all(ReservationId(2), &[seat(0, 0), seat(0, 1), seat(0, 2)]);

        assert_eq!(result, Err(ReservationError::Conflict(seat(0, 1))));
        assert!(!table.claims.contains_key(&seat(0, 0)));
        assert!(!table.claims.contains_key(&seat(0, 2)));
        assert!(!table.pending.contains_key(&ReservationId(2)));
    }

    #[test]
    fn claim_all_rejects_duplicates_within_batch() {
        let mut table = EventSeats::default();
        let result = table.claim_all(ReservationId(1), &[seat(2, 2), seat(2, 2)]);
        assert_eq!(result, Err(ReservationError::Conflict(seat(2, 2))));
        assert!(table.claims.is_empty());
    }

    #[test]
    fn release_only_frees_own_seats() {
        let mut table = EventSeats::default();
        table.claim_all(ReservationId(1), &[seat(0, 0)]).unwrap();
        table.claim_all(ReservationId(2), &[seat(0, 1)]).unwrap();

        assert_eq!(table.release(ReservationId(1)), 1);
        assert!(!table.claims.contains_key(&seat(0, 0)));
        assert_eq!(table.claims.get(&seat(0, 1)), Some(&Claim::Held(ReservationId(2))));
    }

    #[test]
    fn release_is_idempotent() {
        let mut table = EventSeats::default();
        table.claim_all(ReservationId(1), &[seat(0, 0)]).unwrap();
        assert_eq!(table.release(ReservationId(1)), 1);
        assert_eq!(table.release(ReservationId(1)), 0);
        assert_eq!(table.release(ReservationId(99)), 0);
    }

    #[test]
    fn confirm_survives_release() {
        let mut table = EventSeats::default();
        table.claim_all(ReservationId(1), &[seat(4, 4)]).unwrap();
        table.confirm(ReservationId(1)).unwrap();

        assert_eq!(table.release(ReservationId(1)), 0);
        assert_eq!(table.claims.get(&seat(4, 4)), Some(&Claim::Confirmed));
    }

    #[test]
    fn confirm_twice_fails() {
        let mut table = EventSeats::default();
        table.claim_all(ReservationId(1), &[seat(0, 0)]).unwrap();
        table.confirm(ReservationId(1)).unwrap();
        assert_eq!(
            table.confirm(ReservationId(1)),
            Err(ReservationError::UnknownReservation(ReservationId(1)))
        );
    }

    #[test]
    fn restore_counts_new_claims_only() {
        let mut table = EventSeats::default();
        assert_eq!(table.restore(&[seat(0, 0), seat(0, 1)]), 2);
        assert_eq!(table.restore(&[seat(0, 1), seat(0, 2)]), 1);
    }

    // === SeatLedger Tests ===

    #[test]
    fn confirm_with_releases_on_commit_failure() {
        let ledger = SeatLedger::new();
        let handle = ledger.try_reserve(EventId(1), &[seat(1, 1)]).unwrap();

        let result: Result<(), ReservationError> =
            ledger.confirm_with(&handle, || Err(ReservationError::Conflict(seat(9, 9))));

        assert!(result.is_err());
        assert!(!ledger.is_claimed(EventId(1), &seat(1, 1)));
        assert_eq!(ledger.pending_reservations(EventId(1)), 0);
    }

    #[test]
    fn confirm_with_skips_commit_for_released_reservation() {
        let ledger = SeatLedger::new();
        let handle = ledger.try_reserve(EventId(1), &[seat(1, 1)]).unwrap();
        ledger.release(&handle);

        let mut ran = false;
        let result: Result<(), ReservationError> = ledger.confirm_with(&handle, || {
            ran = true;
            Ok(())
        });

        assert_eq!(result, Err(ReservationError::UnknownReservation(handle.id())));
        assert!(!ran);
    }

    #[test]
    fn dropped_guard_releases_hold() {
        let ledger = SeatLedger::new();
        {
            let guard = ledger.hold(EventId(1), &[seat(2, 2), seat(2, 3)]).unwrap();
            assert_eq!(guard.handle().seats().len(), 2);
            assert!(ledger.is_claimed(EventId(1), &seat(2, 2)));
        }
        assert!(!ledger.is_claimed(EventId(1), &seat(2, 2)));
        assert_eq!(ledger.pending_reservations(EventId(1)), 0);
    }

    #[test]
    fn confirmed_guard_keeps_seats_after_drop() {
        let ledger = SeatLedger::new();
        let guard = ledger.hold(EventId(1), &[seat(2, 2)]).unwrap();

        let result: Result<(), ReservationError> = guard.confirm_with(|| Ok(()));

        assert!(result.is_ok());
        assert_eq!(ledger.confirmed_seats(EventId(1)), vec![seat(2, 2)]);
    }

    #[test]
    fn guard_releases_hold_when_commit_panics() {
        let ledger = SeatLedger::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let guard = ledger.hold(EventId(1), &[seat(0, 7)]).unwrap();
            let _: Result<(), ReservationError> = guard.confirm_with(|| panic!("store crashed"));
        }));

        assert!(outcome.is_err());
        assert!(!ledger.is_claimed(EventId(1), &seat(0, 7)));
        assert!(ledger.try_reserve(EventId(1), &[seat(0, 7)]).is_ok());
    }

    #[test]
    fn read_committed_runs_under_event_lock() {
        let ledger = SeatLedger::new();
        let handle = ledger.try_reserve(EventId(1), &[seat(1, 1)]).unwrap();

        let locked = ledger.read_committed(EventId(1), || {
            ledger.existing(EventId(1)).is_some_and(|table| table.try_lock().is_none())
        });

        assert!(locked);
        ledger.release(&handle);
    }

    #[test]
    fn events_are_independent() {
        let ledger = SeatLedger::new();
        ledger.try_reserve(EventId(1), &[seat(0, 0)]).unwrap();
        assert!(ledger.try_reserve(EventId(2), &[seat(0, 0)]).is_ok());
    }
}
