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

//! Payment gateway seam.
//!
//! A gateway answers yes or no for one charge. A decline, a timeout or an
//! unreachable processor all come back as `false`: a failed charge is a
//! business outcome recorded on the booking, never an error.

use rust_decimal::Decimal;
use std::collections::HashSet;

pub trait PaymentGateway: Send + Sync {
    /// Attempts to settle `amount` with `method`. Must return within the
    /// gateway's own timeout; the booking path does not retry.
    fn process_payment(&self, method: &str, amount: Decimal) -> bool;
}

/// Gateway for development and tests.
///
/// Approves every positive amount unless the method is on the decline
/// list. Method names are compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    declined_methods: HashSet<String>,
}

impl MockPaymentGateway {
    /// Approves everything.
    pub fn approving() -> Self {
        Self::default()
    }

    /// Declines the given methods.
    pub fn declining<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            declined_methods: methods
                .into_iter()
                .map(|method| method.as_ref().trim().to_ascii_uppercase())
                .filter(|method| !method.is_empty())
                .collect(),
        }
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn process_payment(&self, method: &str, amount: Decimal) -> bool {
        let approved = amount > Decimal::ZERO
            && !self
                .declined_methods
                .contains(&method.trim().to_ascii_uppercase());
        tracing::debug!(method, %amount, approved, "mock payment processed");
        approved
    }
}
