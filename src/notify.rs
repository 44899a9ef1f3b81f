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

//! Booking notifications.
//!
//! Delivery is best effort. [`Notifier::notify`] returns nothing: a
//! notifier logs its own failures and never reaches back into the booking
//! that triggered it.

use crate::booking::Booking;
use crate::catalog::{Event, User};
use crossbeam::channel::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, subject: &str, body: &str);
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) {
        tracing::info!(recipient, subject, body_len = body.len(), "notification sent");
    }
}

#[derive(Debug)]
struct Message {
    recipient: String,
    subject: String,
    body: String,
}

/// Hands notifications to a background worker so callers never wait on
/// delivery.
///
/// Dropping the dispatcher closes the queue and waits for queued messages
/// to drain.
pub struct NotificationDispatcher {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Starts the worker thread delivering through `inner`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn spawn(inner: Arc<dyn Notifier>) -> std::io::Result<Self> {
        let (sender, receiver) = channel::unbounded::<Message>();
        let worker = thread::Builder::new()
            .name("notification-dispatcher".to_string())
            .spawn(move || {
                for message in receiver {
                    inner.notify(&message.recipient, &message.subject, &message.body);
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, recipient: &str, subject: &str, body: &str) {
        let Some(sender) = &self.sender else {
            return;
        };
        let message = Message {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        if sender.send(message).is_err() {
            tracing::warn!(recipient, "notification worker stopped, message dropped");
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("notification worker panicked");
            }
        }
    }
}

/// Subject and body of the message sent after a paid booking.
pub fn booking_confirmation(user: &User, event: &Event, booking: &Booking) -> (String, String) {
    let seats: Vec<&str> = booking
        .tickets()
        .iter()
        .map(|ticket| ticket.seat_label())
        .collect();

    let subject = format!("Booking Confirmation - {}", event.title);
    let body = format!(
        "Hi {name},\n\n\
         Your booking for {title} has been confirmed!\n\n\
         Booking ID: {id}\n\
         Date: {date}\n\
         Venue: {venue}\n\
         Seats: {seats}\n\
         Total Amount: ${total}\n\n\
         Enjoy the event!",
        name = user.name,
        title = event.title,
        id = booking.id(),
        date = event.starts_at.format("%Y-%m-%d %H:%M"),
        venue = event.venue,
        seats = seats.join(", "),
        total = booking.total_amount(),
    );
    (subject, body)
}
