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

//! Core identifier types for events, sections, users, bookings and seats.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a scheduled event.
    EventId
);

id_type!(
    /// Unique identifier for a priced section of an event's venue.
    ///
    /// Section IDs are global: a section belongs to exactly one event.
    SectionId
);

id_type!(
    /// Unique identifier for an authenticated user.
    UserId
);

id_type!(
    /// Unique identifier for a committed booking.
    BookingId
);

id_type!(
    /// Identifier of a pending seat reservation held by the ledger.
    ReservationId
);

/// One physical seat within an event: `(section, row, col)`.
///
/// Rows and columns are zero-based. Whether a coordinate lies inside its
/// section's grid is decided by the catalog, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatCoordinate {
    pub section_id: SectionId,
    pub row: u32,
    pub col: u32,
}

impl SeatCoordinate {
    pub const fn new(section_id: SectionId, row: u32, col: u32) -> Self {
        Self {
            section_id,
            row,
            col,
        }
    }
}

impl fmt::Display for SeatCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "section {} row {} col {}",
            self.section_id, self.row, self.col
        )
    }
}

/// Formats the human-facing seat label, e.g. `Standard-3-5`.
pub fn seat_label(section_name: &str, row: u32, col: u32) -> String {
    format!("{section_name}-{row}-{col}")
}
