//! XRPL payment helpers
//!
//! Builds the `tx_json` body handed to
//! [`SessionCoordinator::sign_transaction`](crate::SessionCoordinator::sign_transaction)
//! for a plain payment, and cleans up amount input typed by a user.
//! Fee, sequence and ledger bounds are left to the wallet's autofill.
//!
//! ```rust
//! use ledgerlink_client_core::xrpl::{XrplPayment, normalize_amount};
//!
//! let destination = "rGA3kwmB5hBnvs6VW1fnGKysJfBCUazDrD";
//! let payment = XrplPayment::new("rSender", destination, normalize_amount(" 100000 "))
//!     .with_destination_tag(42);
//! assert!(payment.is_sendable());
//!
//! let tx_json = payment.to_tx_json();
//! assert_eq!(tx_json["TransactionType"], "Payment");
//! assert_eq!(tx_json["DestinationTag"], 42);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A native-currency payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrplPayment {
    /// Sending account (classic address)
    pub account: String,
    /// Receiving account (classic address)
    pub destination: String,
    /// Amount in drops, as a decimal string
    pub amount: String,
    /// Optional destination tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<u32>,
}

impl XrplPayment {
    pub fn new(
        account: impl Into<String>,
        destination: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            destination: destination.into(),
            amount: amount.into(),
            destination_tag: None,
        }
    }

    pub fn with_destination_tag(mut self, tag: u32) -> Self {
        self.destination_tag = Some(tag);
        self
    }

    /// Whether every field needed to request a signature is filled in
    ///
    /// A zero amount is not sendable.
    pub fn is_sendable(&self) -> bool {
        !self.account.is_empty()
            && !self.destination.is_empty()
            && !self.amount.is_empty()
            && self.amount != "0"
    }

    /// The `tx_json` object for `xrpl_signTransaction`
    pub fn to_tx_json(&self) -> Map<String, Value> {
        let mut tx = Map::new();
        tx.insert("TransactionType".to_string(), Value::from("Payment"));
        tx.insert("Account".to_string(), Value::from(self.account.as_str()));
        tx.insert("Destination".to_string(), Value::from(self.destination.as_str()));
        tx.insert("Amount".to_string(), Value::from(self.amount.as_str()));
        if let Some(tag) = self.destination_tag {
            tx.insert("DestinationTag".to_string(), Value::from(tag));
        }
        tx
    }
}

/// Clean up a user-typed amount
///
/// Surrounding whitespace is trimmed. Input that is not a number, or is
/// negative, becomes `""`; any spelling of zero becomes `"0"`. Everything
/// else is returned trimmed but otherwise as typed.
pub fn normalize_amount(input: &str) -> String {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            if value == 0.0 {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        _ => String::new(),
    }
}
