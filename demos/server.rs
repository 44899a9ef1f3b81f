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

//! REST API server for seat booking.
//!
//! Run with: cargo run --example server -- --catalog demos/catalog.json
//!
//! The authenticated principal is passed explicitly in the `x-user-id`
//! header; a real deployment puts an authentication layer in front.

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use seat_booking_rs::{
    BookingEngine, BookingError, BookingRequest, BookingResult, BookingSummary, Catalog, EventId,
    InMemoryBookingStore, LogNotifier, MockPaymentGateway, NotificationDispatcher, UserId,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// === Configuration ===

#[derive(Parser, Debug)]
#[command(name = "seat-booking-server")]
struct Args {
    /// Path to the JSON catalog of layouts, events and users
    #[arg(long, env = "BOOKING_CATALOG")]
    catalog: PathBuf,

    /// Address to listen on
    #[arg(long, env = "BOOKING_BIND_ADDR", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Payment methods the mock gateway declines
    #[arg(long = "decline-method", env = "BOOKING_DECLINE_METHODS", value_delimiter = ',')]
    declined_methods: Vec<String>,
}

// === DTOs ===

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
}

// === Principal Extraction ===

/// Authenticated user taken from the `x-user-id` header.
pub struct Principal(UserId);

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .map(|id| Principal(UserId(id)))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "missing or invalid x-user-id header".to_string(),
                        code: "UNAUTHENTICATED".to_string(),
                    }),
                )
            })
    }
}

// === Error Handling ===

pub struct AppError(BookingError);

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BookingError::EventNotFound(_)
            | BookingError::SectionNotFound(_)
            | BookingError::UserNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::InvalidSeat { .. } | BookingError::NoSeatsRequested => {
                StatusCode::BAD_REQUEST
            }
            BookingError::SeatUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::PersistenceFailure(_) | BookingError::ReservationLost(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: self.0.code().to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn create_booking(
    State(state): State<AppState>,
    Principal(user_id): Principal,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResult>), AppError> {
    let result = state.engine.create_booking(user_id, &request)?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn my_bookings(
    State(state): State<AppState>,
    Principal(user_id): Principal,
) -> Result<Json<Vec<BookingSummary>>, AppError> {
    Ok(Json(state.engine.list_user_bookings(user_id)?))
}

async fn booked_seats(
    State(state): State<AppState>,
    Path(event_id): Path<u64>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.engine.list_booked_seats(EventId(event_id))?))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my-bookings", get(my_bookings))
        .route("/api/bookings/event/{event_id}/seats", get(booked_seats))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let catalog = Catalog::from_seed(BufReader::new(File::open(&args.catalog)?))?;
    let dispatcher = NotificationDispatcher::spawn(Arc::new(LogNotifier))?;

    let engine = BookingEngine::new(
        Arc::new(catalog),
        Arc::new(InMemoryBookingStore::new()),
        Arc::new(MockPaymentGateway::declining(&args.declined_methods)),
        Arc::new(dispatcher),
    );
    engine.recover()?;

    let app = create_router(AppState {
        engine: Arc::new(engine),
    });

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(addr = %args.bind, "seat booking API listening");
    println!("Endpoints:");
    println!("  POST /api/bookings                        - Book seats (x-user-id header)");
    println!("  GET  /api/bookings/my-bookings            - List the caller's bookings");
    println!("  GET  /api/bookings/event/:eventId/seats   - List booked seats of an event");

    axum::serve(listener, app).await?;
    Ok(())
}
