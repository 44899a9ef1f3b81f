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

//! Error types for seat reservation and booking.

use crate::base::{BookingId, EventId, ReservationId, SeatCoordinate, SectionId, UserId};
use std::fmt;
use thiserror::Error;

/// Why a requested seat coordinate was rejected before reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidSeatReason {
    /// Row or column lies outside the section's grid.
    OutOfBounds,
    /// The section exists but belongs to a different event.
    WrongEvent,
    /// The same coordinate appears more than once in one request.
    Duplicate,
}

impl fmt::Display for InvalidSeatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::OutOfBounds => "outside the section grid",
            Self::WrongEvent => "section does not belong to this event",
            Self::Duplicate => "requested more than once",
        };
        f.write_str(text)
    }
}

/// Booking errors surfaced to callers of the engine.
///
/// Client errors carry enough detail for a UI to react (re-render the seat
/// map, fix the input). Server errors display a generic retryable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Event ID is not in the catalog
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// Section ID is not in the catalog
    #[error("section {0} not found")]
    SectionNotFound(SectionId),

    /// Principal does not resolve to a known user
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Seat coordinate rejected before any reservation attempt
    #[error("invalid seat {seat}: {reason}")]
    InvalidSeat {
        seat: SeatCoordinate,
        reason: InvalidSeatReason,
    },

    /// Request carried no seats
    #[error("no seats requested")]
    NoSeatsRequested,

    /// Seat is already booked or was claimed by a concurrent request
    #[error("seat {seat} is not available")]
    SeatUnavailable { seat: String },

    /// Storage could not commit the booking; the seats were released
    #[error("booking could not be saved, please retry")]
    PersistenceFailure(#[from] StorageError),

    /// The reservation vanished between reserve and commit
    #[error("booking could not be completed, please retry")]
    ReservationLost(ReservationId),
}

impl BookingError {
    /// Stable reason code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::SectionNotFound(_) => "SECTION_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::InvalidSeat { .. } => "INVALID_SEAT",
            Self::NoSeatsRequested => "NO_SEATS_REQUESTED",
            Self::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            Self::PersistenceFailure(_) | Self::ReservationLost(_) => "RETRY_LATER",
        }
    }

    /// Returns `true` when the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::PersistenceFailure(_) | Self::ReservationLost(_)
        )
    }
}

impl From<ReservationError> for BookingError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Conflict(seat) => BookingError::SeatUnavailable {
                seat: seat.to_string(),
            },
            ReservationError::UnknownReservation(id) => BookingError::ReservationLost(id),
        }
    }
}

/// Seat ledger errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationError {
    /// The coordinate is already claimed (or repeated within the batch)
    #[error("seat already claimed: {0}")]
    Conflict(SeatCoordinate),

    /// The reservation was released or never existed
    #[error("reservation {0} is not pending")]
    UnknownReservation(ReservationId),
}

/// Booking store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend could not complete the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Booking ID was already committed
    #[error("duplicate booking ID {0}")]
    DuplicateBooking(BookingId),
}
