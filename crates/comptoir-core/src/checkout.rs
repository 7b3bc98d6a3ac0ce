//! # Checkout State
//!
//! The three-step checkout (address → carrier → summary) as an explicit
//! state machine, stored as one tagged value under the `checkout` session key.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Empty ──with_address──► AddressChosen ──with_carrier──► CarrierChosen │
//! │     │                          ▲    │                         │   ▲     │
//! │     │ with_carrier             │    └──with_address (stay)    │   │     │
//! │     ▼                          │                              │   │     │
//! │   Err(Incomplete(Address))     │            mark_ready        │   │     │
//! │                                │                              ▼   │     │
//! │                                │                    ReadyForPayment     │
//! │                                │     with_address / with_carrier  │     │
//! │                                └── (any state) reset() ──► Empty  │     │
//! │                                                                         │
//! │   is_complete()  ⇔  both an address and a carrier are chosen            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Holding the state as one enum means a carrier can never be recorded
//! without an address, and a half-written session can't claim to be ready.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Checkout Step
// =============================================================================

/// A place in the storefront flow the customer can be sent back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// The cart page (cart empty or stock problem).
    Cart,
    /// Address selection.
    Address,
    /// Address creation form (customer has no address yet).
    NewAddress,
    /// Carrier selection.
    Carrier,
    /// Order summary / payment choice.
    Summary,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStep::Cart => "cart",
            CheckoutStep::Address => "address",
            CheckoutStep::NewAddress => "new address",
            CheckoutStep::Carrier => "carrier",
            CheckoutStep::Summary => "summary",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Checkout State
// =============================================================================

/// Where a visitor is in the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Empty,
    AddressChosen {
        address_id: String,
    },
    CarrierChosen {
        address_id: String,
        carrier_id: String,
    },
    /// Summary has been shown with fresh stock and prices.
    ReadyForPayment {
        address_id: String,
        carrier_id: String,
    },
}

impl CheckoutState {
    /// Records the shipping address.
    ///
    /// A carrier picked earlier is kept. A state that was ready for payment
    /// drops back to `CarrierChosen` so the summary is shown again.
    pub fn with_address(self, address_id: impl Into<String>) -> Self {
        let address_id = address_id.into();
        match self {
            CheckoutState::Empty | CheckoutState::AddressChosen { .. } => {
                CheckoutState::AddressChosen { address_id }
            }
            CheckoutState::CarrierChosen { carrier_id, .. }
            | CheckoutState::ReadyForPayment { carrier_id, .. } => CheckoutState::CarrierChosen {
                address_id,
                carrier_id,
            },
        }
    }

    /// Records the carrier. Requires an address.
    pub fn with_carrier(self, carrier_id: impl Into<String>) -> CoreResult<Self> {
        let carrier_id = carrier_id.into();
        match self {
            CheckoutState::Empty => Err(CoreError::CheckoutIncomplete(CheckoutStep::Address)),
            CheckoutState::AddressChosen { address_id }
            | CheckoutState::CarrierChosen { address_id, .. }
            | CheckoutState::ReadyForPayment { address_id, .. } => {
                Ok(CheckoutState::CarrierChosen {
                    address_id,
                    carrier_id,
                })
            }
        }
    }

    /// Marks the summary as shown. Requires both selections.
    pub fn mark_ready(self) -> CoreResult<Self> {
        match self {
            CheckoutState::Empty => Err(CoreError::CheckoutIncomplete(CheckoutStep::Address)),
            CheckoutState::AddressChosen { .. } => {
                Err(CoreError::CheckoutIncomplete(CheckoutStep::Carrier))
            }
            CheckoutState::CarrierChosen {
                address_id,
                carrier_id,
            }
            | CheckoutState::ReadyForPayment {
                address_id,
                carrier_id,
            } => Ok(CheckoutState::ReadyForPayment {
                address_id,
                carrier_id,
            }),
        }
    }

    /// Back to the start.
    pub fn reset(&mut self) {
        *self = CheckoutState::Empty;
    }

    pub fn address_id(&self) -> Option<&str> {
        match self {
            CheckoutState::Empty => None,
            CheckoutState::AddressChosen { address_id }
            | CheckoutState::CarrierChosen { address_id, .. }
            | CheckoutState::ReadyForPayment { address_id, .. } => Some(address_id),
        }
    }

    pub fn carrier_id(&self) -> Option<&str> {
        match self {
            CheckoutState::Empty | CheckoutState::AddressChosen { .. } => None,
            CheckoutState::CarrierChosen { carrier_id, .. }
            | CheckoutState::ReadyForPayment { carrier_id, .. } => Some(carrier_id),
        }
    }

    /// True iff both an address and a carrier are chosen.
    pub fn is_complete(&self) -> bool {
        self.address_id().is_some() && self.carrier_id().is_some()
    }

    /// Both ids, or the step the customer has to complete first.
    pub fn selection(&self) -> CoreResult<(&str, &str)> {
        match (self.address_id(), self.carrier_id()) {
            (Some(address_id), Some(carrier_id)) => Ok((address_id, carrier_id)),
            (None, _) => Err(CoreError::CheckoutIncomplete(CheckoutStep::Address)),
            (Some(_), None) => Err(CoreError::CheckoutIncomplete(CheckoutStep::Carrier)),
        }
    }

    /// The step a customer resuming checkout should land on.
    pub fn next_step(&self) -> CheckoutStep {
        match self {
            CheckoutState::Empty => CheckoutStep::Address,
            CheckoutState::AddressChosen { .. } => CheckoutStep::Carrier,
            CheckoutState::CarrierChosen { .. } | CheckoutState::ReadyForPayment { .. } => {
                CheckoutStep::Summary
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
