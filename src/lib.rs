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

//! # Seat Booking
//!
//! This library reserves seats for venue events and commits bookings: a
//! multi-seat request either claims every seat or none, is priced from the
//! venue's sections, is charged through a payment gateway, and is stored
//! together with its tickets and payment record.
//!
//! ## Core Components
//!
//! - [`BookingEngine`]: Validates requests, prices seats, drives payment and commits bookings
//! - [`SeatLedger`]: Per-event record of claimed seats with atomic batch reservation
//! - [`Catalog`]: Events, their priced sections and registered users
//! - [`BookingStore`]: Persistence seam for bookings, tickets and payments
//! - [`BookingError`]: Error types for rejected or failed booking requests
//!
//! ## Example
//!
//! ```
//! use seat_booking_rs::catalog::{Event, SeatingLayout, SectionTemplate, User};
//! use seat_booking_rs::{
//!     BookingEngine, BookingRequest, Catalog, EventId, PaymentStatus, TicketRequest, UserId,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new();
//! catalog.insert_user(User { id: UserId(1), name: "Asha".into(), email: "asha@example.com".into() });
//! catalog.insert_event(Event::new(EventId(1), "Inception", "IMAX Cinema", dec!(450.00)));
//! let sections = catalog
//!     .apply_layout(
//!         EventId(1),
//!         &SeatingLayout::new(
//!             "Standard Theatre",
//!             vec![
//!                 SectionTemplate::new("Premium", 5, 20, dec!(1.5)),
//!                 SectionTemplate::new("Standard", 15, 20, dec!(1.0)),
//!             ],
//!         ),
//!     )
//!     .unwrap();
//!
//! let engine = BookingEngine::in_memory(Arc::new(catalog));
//! let request = BookingRequest {
//!     event_id: EventId(1),
//!     payment_method: "CARD".to_string(),
//!     tickets: vec![
//!         TicketRequest { section_id: sections[0], row: 0, col: 0 },
//!         TicketRequest { section_id: sections[1], row: 0, col: 0 },
//!     ],
//! };
//!
//! let result = engine.create_booking(UserId(1), &request).unwrap();
//! assert_eq!(result.total_amount, dec!(1125.00));
//! assert_eq!(result.tickets, vec!["Premium-0-0", "Standard-0-0"]);
//! assert_eq!(result.payment_status, PaymentStatus::Completed);
//! ```
//!
//! ## Thread Safety
//!
//! The engine locks per event, allowing bookings for different events to be
//! processed in parallel while requests for the same event can never both
//! claim one seat.

mod base;
pub mod booking;
pub mod catalog;
mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod payment;
pub mod store;

pub use base::{BookingId, EventId, ReservationId, SeatCoordinate, SectionId, UserId, seat_label};
pub use booking::{
    Booking, BookingRequest, BookingResult, BookingSummary, Payment, PaymentStatus, Ticket,
    TicketRequest, TicketStatus,
};
pub use catalog::Catalog;
pub use engine::BookingEngine;
pub use error::{BookingError, InvalidSeatReason, ReservationError, StorageError};
pub use ledger::{ReservationGuard, ReservationHandle, SeatLedger};
pub use notify::{LogNotifier, NotificationDispatcher, Notifier};
pub use payment::{MockPaymentGateway, PaymentGateway};
pub use store::{BookingStore, InMemoryBookingStore};
