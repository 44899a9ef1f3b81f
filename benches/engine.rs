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

//! Benchmarks for the booking engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded booking of one and several seats
//! - Booking throughput filling a whole section
//! - Parallel bookings across events and within one event
//! - Raw seat ledger reservation

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal_macros::dec;
use seat_booking_rs::catalog::{Event, SeatingLayout, SectionTemplate, User};
use seat_booking_rs::{
    BookingEngine, BookingRequest, Catalog, EventId, SeatCoordinate, SeatLedger, SectionId,
    TicketRequest, UserId,
};
use std::sync::Arc;

const ROWS: u32 = 100;
const COLS: u32 = 100;

// =============================================================================
// Helper Functions
// =============================================================================

/// `events` events, each with a single ROWS×COLS section; event `n` owns
/// section `n`.
fn make_engine(events: u64) -> BookingEngine {
    let catalog = Catalog::new();
    catalog.insert_user(User {
        id: UserId(1),
        name: "bench".to_string(),
        email: "bench@example.com".to_string(),
    });
    let layout = SeatingLayout::new("Arena", vec![SectionTemplate::new("Floor", ROWS, COLS, dec!(1))]);
    for id in 1..=events {
        catalog.insert_event(Event::new(EventId(id), "Bench Night", "Arena", dec!(50.00)));
        catalog.apply_layout(EventId(id), &layout).unwrap();
    }
    BookingEngine::in_memory(Arc::new(catalog))
}

fn make_request(event: u64, seats: impl IntoIterator<Item = (u32, u32)>) -> BookingRequest {
    BookingRequest {
        event_id: EventId(event),
        payment_method: "CARD".to_string(),
        tickets: seats
            .into_iter()
            .map(|(row, col)| TicketRequest {
                section_id: SectionId(event),
                row,
                col,
            })
            .collect(),
    }
}

fn seat(index: u32) -> (u32, u32) {
    (index / COLS, index % COLS)
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_booking(c: &mut Criterion) {
    c.bench_function("single_seat_booking", |b| {
        b.iter(|| {
            let engine = make_engine(1);
            let request = make_request(1, [(0, 0)]);
            engine.create_booking(UserId(1), black_box(&request)).unwrap();
        })
    });

    c.bench_function("four_seat_booking", |b| {
        b.iter(|| {
            let engine = make_engine(1);
            let request = make_request(1, (0..4).map(seat));
            engine.create_booking(UserId(1), black_box(&request)).unwrap();
        })
    });
}

fn bench_booking_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("booking_throughput");

    for count in [100u32, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(u64::from(*count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let engine = make_engine(1);
                for i in 0..count {
                    engine
                        .create_booking(UserId(1), &make_request(1, [seat(i)]))
                        .unwrap();
                }
                black_box(&engine);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_bookings(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_bookings");
    const PER_EVENT: u32 = 500;

    for events in [1u64, 4, 16].iter() {
        group.throughput(Throughput::Elements(*events * u64::from(PER_EVENT)));
        group.bench_with_input(BenchmarkId::new("events", events), events, |b, &events| {
            b.iter(|| {
                let engine = make_engine(events);
                (0..events * u64::from(PER_EVENT))
                    .into_par_iter()
                    .for_each(|i| {
                        let event = i % events + 1;
                        let index = (i / events) as u32;
                        let _ = engine.create_booking(UserId(1), &make_request(event, [seat(index)]));
                    });
                black_box(&engine);
            })
        });
    }
    group.finish();
}

fn bench_contended_seat(c: &mut Criterion) {
    c.bench_function("contended_seat_race", |b| {
        b.iter(|| {
            let engine = make_engine(1);
            let request = make_request(1, [(5, 5), (5, 6)]);
            let winners = (0..64)
                .into_par_iter()
                .filter(|_| engine.create_booking(UserId(1), &request).is_ok())
                .count();
            assert_eq!(winners, 1);
        })
    });
}

// =============================================================================
// Seat Ledger Benchmarks
// =============================================================================

fn bench_ledger_reserve(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");
    let seats: Vec<SeatCoordinate> = (0..8)
        .map(|i| SeatCoordinate::new(SectionId(1), 0, i))
        .collect();

    group.bench_function("reserve_release", |b| {
        let ledger = SeatLedger::new();
        b.iter(|| {
            let handle = ledger.try_reserve(EventId(1), black_box(&seats)).unwrap();
            ledger.release(&handle);
        })
    });

    group.bench_function("reserve_confirm", |b| {
        b.iter(|| {
            let ledger = SeatLedger::new();
            let handle = ledger.try_reserve(EventId(1), black_box(&seats)).unwrap();
            ledger.confirm(&handle).unwrap();
        })
    });

    group.bench_function("conflicting_reserve", |b| {
        let ledger = SeatLedger::new();
        let held = ledger.try_reserve(EventId(1), &seats[..1]).unwrap();
        b.iter(|| {
            assert!(ledger.try_reserve(EventId(1), black_box(&seats)).is_err());
        });
        ledger.release(&held);
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_booking,
    bench_booking_throughput,
    bench_parallel_bookings,
    bench_contended_seat,
    bench_ledger_reserve,
);
criterion_main!(benches);
