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

//! Booking engine.
//!
//! The [`BookingEngine`] turns a seat request into a committed booking and
//! answers the read queries built on committed bookings.
//!
//! # Booking Flow
//!
//! 1. Resolve the user, the event and every requested section; reject seats
//!    outside their section grid before touching the ledger.
//! 2. Atomically reserve the whole batch in the [`SeatLedger`].
//! 3. Price the seats from their sections. Client input never sets the total.
//! 4. Charge the payment gateway. A decline is recorded, not rejected.
//! 5. Commit booking, tickets and payment inside the event's critical
//!    section. A storage failure, or a panic anywhere after step 2,
//!    releases the seats.
//! 6. Queue a confirmation for paid bookings.
//!
//! # Thread Safety
//!
//! The engine is `Send + Sync` and is meant to be shared behind an `Arc`.
//! Requests for different events never block each other; requests for the
//! same event serialize on reserve, commit and seat listing, never on payment.

use crate::base::{BookingId, EventId, SeatCoordinate, UserId, seat_label};
use crate::booking::{
    Booking, BookingRequest, BookingResult, BookingSummary, Payment, PaymentStatus, Ticket,
};
use crate::catalog::{Catalog, Event, Section};
use crate::error::{BookingError, InvalidSeatReason, ReservationError};
use crate::ledger::SeatLedger;
use crate::notify::{LogNotifier, Notifier, booking_confirmation};
use crate::payment::{MockPaymentGateway, PaymentGateway};
use crate::store::{BookingStore, InMemoryBookingStore};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

/// Seat reservation and booking engine.
///
/// # Invariants
///
/// - For any event, no two BOOKED tickets share a `(section, row, col)`.
/// - A booking's tickets are all committed or none are.
/// - A booking's total equals the sum of its ticket prices, and its payment
///   record carries the same amount.
pub struct BookingEngine {
    catalog: Arc<Catalog>,
    ledger: SeatLedger,
    store: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

/// A requested seat resolved against the catalog.
struct ResolvedSeat {
    coordinate: SeatCoordinate,
    section: Section,
}

impl BookingEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        BookingEngine {
            catalog,
            ledger: SeatLedger::new(),
            store,
            payments,
            notifier,
        }
    }

    /// Engine with an in-memory store, an approving mock gateway and
    /// log-only notifications.
    pub fn in_memory(catalog: Arc<Catalog>) -> Self {
        Self::new(
            catalog,
            Arc::new(InMemoryBookingStore::new()),
            Arc::new(MockPaymentGateway::approving()),
            Arc::new(LogNotifier),
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    /// Books every requested seat for `user_id`, or none of them.
    ///
    /// `user_id` is the authenticated principal making the request.
    ///
    /// A declined payment still commits the booking with
    /// [`PaymentStatus::Failed`]; the seats stay claimed.
    ///
    /// # Errors
    ///
    /// - [`BookingError::UserNotFound`], [`BookingError::EventNotFound`],
    ///   [`BookingError::SectionNotFound`] - Unresolved reference.
    /// - [`BookingError::NoSeatsRequested`] - Empty ticket list.
    /// - [`BookingError::InvalidSeat`] - Seat outside its grid, in another
    ///   event's section, or requested twice.
    /// - [`BookingError::SeatUnavailable`] - A seat is already claimed.
    /// - [`BookingError::PersistenceFailure`] - Storage failed; the seats
    ///   were released and the request can be retried.
    pub fn create_booking(
        &self,
        user_id: UserId,
        request: &BookingRequest,
    ) -> Result<BookingResult, BookingError> {
        let user = self.catalog.user(user_id)?;
        let event = self.catalog.event(request.event_id)?;
        let seats = self.resolve_seats(&event, request)?;
        let coordinates: Vec<SeatCoordinate> = seats.iter().map(|seat| seat.coordinate).collect();

        // Released on any early return or panic before the commit settles
        let reservation = self
            .ledger
            .hold(event.id, &coordinates)
            .map_err(|err| match err {
                ReservationError::Conflict(seat) => {
                    tracing::warn!(event = %event.id, user = %user_id, %seat, "seat unavailable");
                    Self::unavailable(&seats, seat)
                }
                other => other.into(),
            })?;

        let tickets: Vec<Ticket> = seats
            .iter()
            .map(|seat| Ticket::booked(&seat.section, seat.coordinate.row, seat.coordinate.col))
            .collect();
        let total: Decimal = tickets.iter().map(Ticket::price).sum();

        let paid = self.payments.process_payment(&request.payment_method, total);
        let payment_status = if paid {
            PaymentStatus::Completed
        } else {
            tracing::warn!(event = %event.id, user = %user_id, %total, "payment declined");
            PaymentStatus::Failed
        };

        let booking_id = self.store.next_booking_id().map_err(|err| {
            tracing::error!(event = %event.id, error = %err, "booking id allocation failed");
            BookingError::from(err)
        })?;
        let now = Utc::now();
        let booking = Booking::new(booking_id, user.id, event.id, tickets, payment_status, now);
        let payment = Payment::for_booking(&booking, &request.payment_method, now);
        let result = BookingResult::from_booking(&booking, &event);
        let confirmation = paid.then(|| booking_confirmation(&user, &event, &booking));

        reservation.confirm_with(|| {
            self.store.commit(booking, payment).map_err(|err| {
                tracing::error!(event = %event.id, booking = %booking_id, error = %err, "booking commit failed, seats released");
                BookingError::from(err)
            })
        })?;

        tracing::info!(
            booking = %booking_id,
            event = %event.id,
            user = %user_id,
            seats = result.tickets.len(),
            total = %result.total_amount,
            status = payment_status.as_str(),
            "booking committed"
        );

        if let Some((subject, body)) = confirmation {
            self.notifier.notify(&user.email, &subject, &body);
        }
        Ok(result)
    }

    /// A user's bookings, oldest first. Totals are recomputed from the
    /// tickets of each booking.
    ///
    /// # Errors
    ///
    /// - [`BookingError::UserNotFound`] - Unknown user.
    /// - [`BookingError::EventNotFound`] - A booked event left the catalog.
    /// - [`BookingError::PersistenceFailure`] - Storage failed.
    pub fn list_user_bookings(&self, user_id: UserId) -> Result<Vec<BookingSummary>, BookingError> {
        self.catalog.user(user_id)?;
        self.store
            .bookings_for_user(user_id)?
            .iter()
            .map(|booking| {
                let event = self.catalog.event(booking.event_id())?;
                Ok(BookingResult::from_booking(booking, &event))
            })
            .collect()
    }

    /// Labels of every BOOKED seat of the event, regardless of who booked
    /// it, in booking order. The store is read under the event's ledger
    /// lock, so the list always matches the ledger's confirmed seats.
    ///
    /// # Errors
    ///
    /// - [`BookingError::EventNotFound`] - Unknown event.
    /// - [`BookingError::PersistenceFailure`] - Storage failed.
    pub fn list_booked_seats(&self, event_id: EventId) -> Result<Vec<String>, BookingError> {
        self.catalog.event(event_id)?;
        let bookings = self
            .ledger
            .read_committed(event_id, || self.store.bookings_for_event(event_id))?;
        Ok(bookings
            .iter()
            .flat_map(|booking| booking.tickets().iter())
            .filter(|ticket| ticket.is_booked())
            .map(|ticket| ticket.seat_label().to_string())
            .collect())
    }

    /// The payment record of one of `user_id`'s bookings.
    ///
    /// # Errors
    ///
    /// - [`BookingError::PersistenceFailure`] - Storage failed.
    pub fn payment_for(
        &self,
        user_id: UserId,
        booking_id: BookingId,
    ) -> Result<Option<Payment>, BookingError> {
        let owned = self
            .store
            .bookings_for_user(user_id)?
            .iter()
            .any(|booking| booking.id() == booking_id);
        if !owned {
            return Ok(None);
        }
        Ok(self.store.payment(booking_id)?)
    }

    /// Rebuilds the seat ledger from BOOKED tickets in the store. Call once
    /// at startup, before serving requests. Returns the number of seats
    /// restored.
    ///
    /// # Errors
    ///
    /// [`BookingError::PersistenceFailure`] if the store cannot be read.
    pub fn recover(&self) -> Result<usize, BookingError> {
        let bookings = self.store.all_bookings()?;
        let mut restored = 0;
        for booking in &bookings {
            let seats = booking.booked_coordinates();
            let fresh = self.ledger.restore(booking.event_id(), &seats);
            if fresh < seats.len() {
                tracing::warn!(
                    booking = %booking.id(),
                    event = %booking.event_id(),
                    duplicates = seats.len() - fresh,
                    "stored booking repeats already claimed seats"
                );
            }
            restored += fresh;
        }
        tracing::info!(bookings = bookings.len(), seats = restored, "seat ledger recovered");
        Ok(restored)
    }

    /// Resolves and validates every requested seat, in request order.
    fn resolve_seats(
        &self,
        event: &Event,
        request: &BookingRequest,
    ) -> Result<Vec<ResolvedSeat>, BookingError> {
        if request.tickets.is_empty() {
            return Err(BookingError::NoSeatsRequested);
        }

        let mut seen = HashSet::with_capacity(request.tickets.len());
        let mut seats = Vec::with_capacity(request.tickets.len());
        for ticket in &request.tickets {
            let coordinate = ticket.coordinate();
            let section = self.catalog.section(ticket.section_id)?;

            let reason = if section.event_id != event.id {
                Some(InvalidSeatReason::WrongEvent)
            } else if !section.contains(ticket.row, ticket.col) {
                Some(InvalidSeatReason::OutOfBounds)
            } else if !seen.insert(coordinate) {
                Some(InvalidSeatReason::Duplicate)
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(BookingError::InvalidSeat {
                    seat: coordinate,
                    reason,
                });
            }

            seats.push(ResolvedSeat {
                coordinate,
                section,
            });
        }
        Ok(seats)
    }

    /// Maps a ledger conflict to the seat label the client sees.
    fn unavailable(seats: &[ResolvedSeat], conflict: SeatCoordinate) -> BookingError {
        let seat = seats
            .iter()
            .find(|seat| seat.coordinate == conflict)
            .map_or_else(
                || conflict.to_string(),
                |seat| seat_label(&seat.section.name, conflict.row, conflict.col),
            );
        BookingError::SeatUnavailable { seat }
    }
}
