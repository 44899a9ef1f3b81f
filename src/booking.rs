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

//! Bookings, their tickets and payment records, plus the request and
//! response shapes of the booking API.

use crate::base::{BookingId, EventId, SeatCoordinate, SectionId, UserId, seat_label};
use crate::catalog::{Event, Section};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// A claim on one seat. Only exists inside the [`Booking`] that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    section_id: SectionId,
    row: u32,
    col: u32,
    seat_label: String,
    price: Decimal,
    status: TicketStatus,
}

impl Ticket {
    /// Books one seat of `section` at the section's price.
    pub fn booked(section: &Section, row: u32, col: u32) -> Self {
        Self {
            section_id: section.id,
            row,
            col,
            seat_label: seat_label(&section.name, row, col),
            price: section.price,
            status: TicketStatus::Booked,
        }
    }

    pub fn coordinate(&self) -> SeatCoordinate {
        SeatCoordinate::new(self.section_id, self.row, self.col)
    }

    pub fn seat_label(&self) -> &str {
        &self.seat_label
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn is_booked(&self) -> bool {
        self.status == TicketStatus::Booked
    }
}

/// An atomic group of tickets for one user and event plus the payment
/// outcome. Immutable once built; the total always equals the sum of the
/// ticket prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: BookingId,
    user_id: UserId,
    event_id: EventId,
    created_at: DateTime<Utc>,
    tickets: Vec<Ticket>,
    total_amount: Decimal,
    payment_status: PaymentStatus,
}

impl Booking {
    pub fn new(
        id: BookingId,
        user_id: UserId,
        event_id: EventId,
        tickets: Vec<Ticket>,
        payment_status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total_amount = tickets.iter().map(Ticket::price).sum();
        Self {
            id,
            user_id,
            event_id,
            created_at,
            tickets,
            total_amount,
            payment_status,
        }
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Coordinates of the tickets still in BOOKED state.
    pub fn booked_coordinates(&self) -> Vec<SeatCoordinate> {
        self.tickets
            .iter()
            .filter(|ticket| ticket.is_booked())
            .map(Ticket::coordinate)
            .collect()
    }
}

/// Payment record, one per booking, committed together with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub booking_id: BookingId,
    pub method: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// Mirrors the booking's total and payment status.
    pub fn for_booking(booking: &Booking, method: &str, paid_at: DateTime<Utc>) -> Self {
        Self {
            booking_id: booking.id(),
            method: method.to_string(),
            amount: booking.total_amount(),
            status: booking.payment_status(),
            paid_at,
        }
    }
}

/// One requested seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    pub section_id: SectionId,
    pub row: u32,
    pub col: u32,
}

impl TicketRequest {
    pub fn coordinate(&self) -> SeatCoordinate {
        SeatCoordinate::new(self.section_id, self.row, self.col)
    }
}

/// Booking creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub event_id: EventId,
    pub payment_method: String,
    pub tickets: Vec<TicketRequest>,
}

/// Booking creation response, also used for booking history entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub booking_id: BookingId,
    pub event_id: EventId,
    pub event_title: String,
    pub booking_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub tickets: Vec<String>,
}

/// Entry of a user's booking history.
pub type BookingSummary = BookingResult;

impl BookingResult {
    /// Builds the response, recomputing the total from the tickets listed.
    pub fn from_booking(booking: &Booking, event: &Event) -> Self {
        let tickets: Vec<String> = booking
            .tickets()
            .iter()
            .map(|ticket| ticket.seat_label().to_string())
            .collect();
        let total_amount: Decimal = booking.tickets().iter().map(Ticket::price).sum();
        debug_assert_eq!(
            total_amount,
            booking.total_amount(),
            "Invariant violated: booking total does not reconcile with tickets"
        );

        Self {
            booking_id: booking.id(),
            event_id: booking.event_id(),
            event_title: event.title.clone(),
            booking_date: booking.created_at(),
            payment_status: booking.payment_status(),
            total_amount,
            tickets,
        }
    }
}
