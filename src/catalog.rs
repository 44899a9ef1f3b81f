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

//! Event catalog: events, their priced sections, and users.
//!
//! The catalog is managed outside the booking path and only read by it.
//! Sections are created by applying a [`SeatingLayout`] to an event, which
//! fixes each section's absolute price as `base price × multiplier`.
//!
//! # Example
//!
//! ```
//! use seat_booking_rs::catalog::{Catalog, Event, SeatingLayout, SectionTemplate};
//! use seat_booking_rs::EventId;
//! use rust_decimal::Decimal;
//!
//! let catalog = Catalog::new();
//! catalog.insert_event(Event::new(EventId(1), "Inception", "IMAX Cinema", Decimal::new(45000, 2)));
//! let layout = SeatingLayout::new(
//!     "Standard Theatre",
//!     vec![SectionTemplate::new("Premium", 5, 20, Decimal::new(15, 1))],
//! );
//! let sections = catalog.apply_layout(EventId(1), &layout).unwrap();
//! assert_eq!(catalog.section_price(sections[0]).unwrap(), Decimal::new(67500, 2));
//! ```

use crate::base::{EventId, SectionId, UserId};
use crate::error::BookingError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prices are stored with cent precision.
const PRICE_PRECISION: u32 = 2;

/// A scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub base_price: Decimal,
}

impl Event {
    /// Creates an event scheduled at the current time.
    pub fn new(id: EventId, title: &str, venue: &str, base_price: Decimal) -> Self {
        Self {
            id,
            title: title.to_string(),
            venue: venue.to_string(),
            starts_at: Utc::now(),
            base_price,
        }
    }
}

/// A priced area of one event's venue with its own row/column grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub event_id: EventId,
    pub name: String,
    pub rows: u32,
    pub cols: u32,
    pub price: Decimal,
}

impl Section {
    /// `0 <= row < rows` and `0 <= col < cols`.
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row < self.rows && col < self.cols
    }

    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }
}

/// A registered user who can place bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// One section of a seating layout, priced relative to the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTemplate {
    pub name: String,
    pub rows: u32,
    pub cols: u32,
    pub price_multiplier: Decimal,
}

impl SectionTemplate {
    pub fn new(name: &str, rows: u32, cols: u32, price_multiplier: Decimal) -> Self {
        Self {
            name: name.to_string(),
            rows,
            cols,
            price_multiplier,
        }
    }
}

/// Reusable venue geometry: an ordered list of section templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatingLayout {
    pub name: String,
    pub sections: Vec<SectionTemplate>,
}

impl SeatingLayout {
    pub fn new(name: &str, sections: Vec<SectionTemplate>) -> Self {
        Self {
            name: name.to_string(),
            sections,
        }
    }
}

/// In-memory catalog shared between request handlers.
#[derive(Debug)]
pub struct Catalog {
    events: DashMap<EventId, Event>,
    sections: DashMap<SectionId, Section>,
    users: DashMap<UserId, User>,
    next_section_id: AtomicU64,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            events: DashMap::new(),
            sections: DashMap::new(),
            users: DashMap::new(),
            next_section_id: AtomicU64::new(1),
        }
    }

    /// Inserts or replaces an event.
    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Adds one section with an absolute price to an existing event.
    ///
    /// # Errors
    ///
    /// [`BookingError::EventNotFound`] if the event is not in the catalog.
    pub fn add_section(
        &self,
        event_id: EventId,
        name: &str,
        rows: u32,
        cols: u32,
        price: Decimal,
    ) -> Result<SectionId, BookingError> {
        if !self.events.contains_key(&event_id) {
            return Err(BookingError::EventNotFound(event_id));
        }
        let id = SectionId(self.next_section_id.fetch_add(1, Ordering::Relaxed));
        self.sections.insert(
            id,
            Section {
                id,
                event_id,
                name: name.to_string(),
                rows,
                cols,
                price: price.round_dp(PRICE_PRECISION),
            },
        );
        Ok(id)
    }

    /// Creates the event's sections from a layout, pricing each one from
    /// the event's base price. Returns the new section IDs in layout order.
    ///
    /// # Errors
    ///
    /// [`BookingError::EventNotFound`] if the event is not in the catalog.
    pub fn apply_layout(
        &self,
        event_id: EventId,
        layout: &SeatingLayout,
    ) -> Result<Vec<SectionId>, BookingError> {
        let base_price = self.event(event_id)?.base_price;
        layout
            .sections
            .iter()
            .map(|template| {
                self.add_section(
                    event_id,
                    &template.name,
                    template.rows,
                    template.cols,
                    base_price * template.price_multiplier,
                )
            })
            .collect()
    }

    /// # Errors
    ///
    /// [`BookingError::EventNotFound`] if the event is unknown.
    pub fn event(&self, event_id: EventId) -> Result<Event, BookingError> {
        self.events
            .get(&event_id)
            .map(|event| event.clone())
            .ok_or(BookingError::EventNotFound(event_id))
    }

    /// # Errors
    ///
    /// [`BookingError::SectionNotFound`] if the section is unknown.
    pub fn section(&self, section_id: SectionId) -> Result<Section, BookingError> {
        self.sections
            .get(&section_id)
            .map(|section| section.clone())
            .ok_or(BookingError::SectionNotFound(section_id))
    }

    /// # Errors
    ///
    /// [`BookingError::UserNotFound`] if the user is unknown.
    pub fn user(&self, user_id: UserId) -> Result<User, BookingError> {
        self.users
            .get(&user_id)
            .map(|user| user.clone())
            .ok_or(BookingError::UserNotFound(user_id))
    }

    /// Absolute price of one seat in the section.
    ///
    /// # Errors
    ///
    /// [`BookingError::SectionNotFound`] if the section is unknown.
    pub fn section_price(&self, section_id: SectionId) -> Result<Decimal, BookingError> {
        Ok(self.section(section_id)?.price)
    }

    /// # Errors
    ///
    /// [`BookingError::SectionNotFound`] if the section is unknown.
    pub fn is_valid_coordinate(
        &self,
        section_id: SectionId,
        row: u32,
        col: u32,
    ) -> Result<bool, BookingError> {
        Ok(self.section(section_id)?.contains(row, col))
    }

    /// Sections of one event, ordered by ID.
    pub fn sections_for(&self, event_id: EventId) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .sections
            .iter()
            .filter(|entry| entry.event_id == event_id)
            .map(|entry| entry.value().clone())
            .collect();
        sections.sort_by_key(|section| section.id);
        sections
    }

    /// Loads a catalog from a JSON seed document.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the document is malformed or an event names
    /// a layout that is not defined.
    pub fn from_seed<R: Read>(reader: R) -> Result<Self, SeedError> {
        let seed: CatalogSeed = serde_json::from_reader(reader)?;
        let catalog = Catalog::new();

        for user in seed.users {
            catalog.insert_user(user);
        }
        for event in seed.events {
            let layout = seed
                .layouts
                .iter()
                .find(|layout| layout.name == event.layout)
                .ok_or_else(|| SeedError::UnknownLayout(event.layout.clone()))?;
            let event_id = event.event.id;
            catalog.insert_event(event.event);
            catalog.apply_layout(event_id, layout)?;
        }

        tracing::info!(
            events = catalog.events.len(),
            sections = catalog.sections.len(),
            seats = catalog.sections.iter().map(|section| section.capacity()).sum::<u64>(),
            users = catalog.users.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised while loading a catalog seed.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event references unknown layout '{0}'")]
    UnknownLayout(String),

    #[error(transparent)]
    Catalog(#[from] BookingError),
}

#[derive(Debug, Deserialize)]
struct CatalogSeed {
    #[serde(default)]
    layouts: Vec<SeatingLayout>,
    #[serde(default)]
    events: Vec<EventSeed>,
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct EventSeed {
    #[serde(flatten)]
    event: Event,
    layout: String,
}
