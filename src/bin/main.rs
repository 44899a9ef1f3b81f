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

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use seat_booking_rs::{
    BookingEngine, BookingRequest, Catalog, EventId, InMemoryBookingStore, LogNotifier,
    MockPaymentGateway, NotificationDispatcher, SectionId, TicketRequest, UserId,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seat-booking-rs")]
#[command(about = "Books seats from a CSV of seat requests and prints the resulting bookings", long_about = None)]
struct Args {
    /// Path to CSV file with seat requests
    ///
    /// Expected format: request,user,event,section,row,col,method
    /// Rows sharing a request ID form one multi-seat booking.
    /// Example: cargo run -- --catalog catalog.json requests.csv > bookings.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Path to the JSON catalog of layouts, events and users
    #[arg(long, env = "BOOKING_CATALOG")]
    catalog: PathBuf,

    /// Payment methods the mock gateway declines
    #[arg(long = "decline-method", env = "BOOKING_DECLINE_METHODS", value_delimiter = ',')]
    declined_methods: Vec<String>,
}

fn main() {
    // Logs go to stderr so stdout stays CSV
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let catalog = match File::open(&args.catalog)
        .map_err(|e| e.to_string())
        .and_then(|f| Catalog::from_seed(BufReader::new(f)).map_err(|e| e.to_string()))
    {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", args.catalog.display(), e);
            process::exit(1);
        }
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let dispatcher = match NotificationDispatcher::spawn(Arc::new(LogNotifier)) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("Error starting notification worker: {}", e);
            process::exit(1);
        }
    };

    let engine = BookingEngine::new(
        Arc::new(catalog),
        Arc::new(InMemoryBookingStore::new()),
        Arc::new(MockPaymentGateway::declining(&args.declined_methods)),
        Arc::new(dispatcher),
    );

    let rows = match process_requests(&engine, BufReader::new(file)) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Error processing requests: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_bookings(&rows, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    request: String,
    user: u64,
    event: u64,
    section: u64,
    row: u32,
    col: u32,
    method: String,
}

/// Seat rows grouped into one booking request.
#[derive(Debug)]
struct PendingRequest {
    id: String,
    user_id: UserId,
    request: BookingRequest,
}

/// One line of the output report.
#[derive(Debug, Serialize, PartialEq)]
struct BookingRow {
    request: String,
    booking: u64,
    user: u64,
    event: u64,
    payment_status: &'static str,
    total: rust_decimal::Decimal,
    seats: String,
}

/// Groups CSV rows by request ID, keeping first-seen order.
///
/// Rows that disagree with the first row of their request on user, event
/// or payment method are skipped.
fn group_requests<R: Read>(reader: R) -> Vec<PendingRequest> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut requests: Vec<PendingRequest> = Vec::new();
    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed row");
                continue;
            }
        };

        let ticket = TicketRequest {
            section_id: SectionId(record.section),
            row: record.row,
            col: record.col,
        };
        match requests.iter_mut().find(|pending| pending.id == record.request) {
            Some(pending) => {
                if pending.user_id != UserId(record.user)
                    || pending.request.event_id != EventId(record.event)
                    || pending.request.payment_method != record.method
                {
                    tracing::warn!(request = %record.request, "skipping row inconsistent with its request");
                    continue;
                }
                pending.request.tickets.push(ticket);
            }
            None => requests.push(PendingRequest {
                id: record.request,
                user_id: UserId(record.user),
                request: BookingRequest {
                    event_id: EventId(record.event),
                    payment_method: record.method,
                    tickets: vec![ticket],
                },
            }),
        }
    }
    requests
}

fn process_requests<R: Read>(
    engine: &BookingEngine,
    reader: R,
) -> Result<Vec<BookingRow>, seat_booking_rs::BookingError> {
    let mut rows = Vec::new();
    for pending in group_requests(reader) {
        match engine.create_booking(pending.user_id, &pending.request) {
            Ok(result) => rows.push(BookingRow {
                request: pending.id,
                booking: result.booking_id.0,
                user: pending.user_id.0,
                event: result.event_id.0,
                payment_status: result.payment_status.as_str(),
                total: result.total_amount,
                seats: result.tickets.join(" "),
            }),
            // Rejected requests are reported and skipped
            Err(e) if e.is_client_error() => {
                tracing::warn!(request = %pending.id, code = e.code(), error = %e, "request rejected");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(rows)
}

fn write_bookings<W: Write>(rows: &[BookingRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
