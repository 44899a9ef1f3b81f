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

//! Seat ledger public API integration tests.

use seat_booking_rs::{EventId, ReservationError, SeatCoordinate, SeatLedger, SectionId};
use std::sync::{Arc, Barrier};
use std::thread;

fn seat(section: u64, row: u32, col: u32) -> SeatCoordinate {
    SeatCoordinate::new(SectionId(section), row, col)
}

#[test]
fn reserve_then_confirm_claims_permanently() {
    let ledger = SeatLedger::new();
    let handle = ledger
        .try_reserve(EventId(1), &[seat(1, 0, 0), seat(1, 0, 1)])
        .unwrap();
    assert_eq!(handle.event_id(), EventId(1));
    assert_eq!(handle.seats().len(), 2);
    assert_eq!(ledger.pending_reservations(EventId(1)), 1);

    ledger.confirm(&handle).unwrap();
    ledger.release(&handle);

    assert!(ledger.is_claimed(EventId(1), &seat(1, 0, 0)));
    assert!(ledger.is_claimed(EventId(1), &seat(1, 0, 1)));
    assert_eq!(ledger.pending_reservations(EventId(1)), 0);
    assert_eq!(ledger.confirmed_seats(EventId(1)).len(), 2);
}

#[test]
fn conflict_reports_first_claimed_seat_and_claims_nothing() {
    let ledger = SeatLedger::new();
    ledger.try_reserve(EventId(1), &[seat(1, 2, 2)]).unwrap();

    let result = ledger.try_reserve(EventId(1), &[seat(1, 2, 1), seat(1, 2, 2), seat(1, 2, 3)]);

    assert_eq!(result.unwrap_err(), ReservationError::Conflict(seat(1, 2, 2)));
    assert!(!ledger.is_claimed(EventId(1), &seat(1, 2, 1)));
    assert!(!ledger.is_claimed(EventId(1), &seat(1, 2, 3)));
}

#[test]
fn held_seats_conflict_before_confirmation() {
    let ledger = SeatLedger::new();
    let _held = ledger.try_reserve(EventId(1), &[seat(1, 0, 0)]).unwrap();
    assert_eq!(
        ledger.try_reserve(EventId(1), &[seat(1, 0, 0)]).unwrap_err(),
        ReservationError::Conflict(seat(1, 0, 0))
    );
}

#[test]
fn release_returns_seats_and_is_idempotent() {
    let ledger = SeatLedger::new();
    let handle = ledger.try_reserve(EventId(1), &[seat(1, 5, 5)]).unwrap();

    ledger.release(&handle);
    ledger.release(&handle);

    assert!(!ledger.is_claimed(EventId(1), &seat(1, 5, 5)));
    assert!(ledger.try_reserve(EventId(1), &[seat(1, 5, 5)]).is_ok());
}

#[test]
fn release_after_someone_else_reclaimed_keeps_their_claim() {
    let ledger = SeatLedger::new();
    let first = ledger.try_reserve(EventId(1), &[seat(1, 1, 1)]).unwrap();
    ledger.release(&first);
    let second = ledger.try_reserve(EventId(1), &[seat(1, 1, 1)]).unwrap();

    ledger.release(&first);

    assert!(ledger.is_claimed(EventId(1), &seat(1, 1, 1)));
    ledger.confirm(&second).unwrap();
}

#[test]
fn confirm_after_release_fails() {
    let ledger = SeatLedger::new();
    let handle = ledger.try_reserve(EventId(1), &[seat(1, 0, 0)]).unwrap();
    ledger.release(&handle);

    assert_eq!(
        ledger.confirm(&handle),
        Err(ReservationError::UnknownReservation(handle.id()))
    );
}

#[test]
fn unknown_event_queries_are_empty() {
    let ledger = SeatLedger::new();
    assert!(!ledger.is_claimed(EventId(9), &seat(1, 0, 0)));
    assert!(ledger.confirmed_seats(EventId(9)).is_empty());
    assert_eq!(ledger.pending_reservations(EventId(9)), 0);
}

#[test]
fn restore_marks_seats_confirmed() {
    let ledger = SeatLedger::new();
    assert_eq!(ledger.restore(EventId(1), &[seat(1, 3, 5)]), 1);
    assert_eq!(
        ledger.try_reserve(EventId(1), &[seat(1, 3, 5)]).unwrap_err(),
        ReservationError::Conflict(seat(1, 3, 5))
    );
}

// === Concurrency ===

#[test]
fn overlapping_batches_have_exactly_one_winner() {
    const THREADS: usize = 16;

    for _ in 0..50 {
        let ledger = Arc::new(SeatLedger::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    // Every batch shares seat (1, 3, 5) plus one private seat
                    let batch = [seat(1, 0, i as u32), seat(1, 3, 5)];
                    barrier.wait();
                    ledger.try_reserve(EventId(1), &batch).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);

        // Losers' private seats were never claimed
        let claimed_private = (0..THREADS)
            .filter(|i| ledger.is_claimed(EventId(1), &seat(1, 0, *i as u32)))
            .count();
        assert_eq!(claimed_private, 1);
    }
}

#[test]
fn disjoint_batches_all_succeed() {
    const THREADS: u32 = 32;
    let ledger = Arc::new(SeatLedger::new());
    let barrier = Arc::new(Barrier::new(THREADS as usize));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let handle = ledger
                    .try_reserve(EventId(1), &[seat(2, i, 0), seat(2, i, 1)])
                    .unwrap();
                ledger.confirm(&handle).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ledger.confirmed_seats(EventId(1)).len(), (THREADS * 2) as usize);
}
