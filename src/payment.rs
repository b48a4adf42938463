//! Fake payment step of the booking flow
//!
//! Checks that the card form was filled in plausibly and approves the charge.
//! Nothing is sent anywhere.

use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use thiserror::Error;

use crate::model::CardDetails;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("The {0} field is required.")]
    MissingField(&'static str),

    #[error("The card number must have between 12 and 19 digits.")]
    InvalidCardNumber,

    #[error("The expiry date must use the MM/YY format.")]
    InvalidExpiry,

    #[error("The CVC must have 3 or 4 digits.")]
    InvalidCvc,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: u64,
    /// Last four digits of the card
    pub card_last4: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakePaymentGateway;

impl FakePaymentGateway {
    pub fn charge(&self, card: &CardDetails, amount: u64) -> Result<PaymentReceipt, PaymentError> {
        if card.holder.trim().is_empty() {
            return Err(PaymentError::MissingField("card holder"));
        }
        if card.number.trim().is_empty() {
            return Err(PaymentError::MissingField("card number"));
        }
        if card.expiry.trim().is_empty() {
            return Err(PaymentError::MissingField("expiry date"));
        }
        if card.cvc.trim().is_empty() {
            return Err(PaymentError::MissingField("CVC"));
        }

        let digits: String = card.number.chars().filter(|c| !c.is_whitespace()).collect();
        if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCardNumber);
        }

        if !valid_expiry(card.expiry.trim()) {
            return Err(PaymentError::InvalidExpiry);
        }

        let cvc = card.cvc.trim();
        if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCvc);
        }

        let reference: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();

        Ok(PaymentReceipt {
            reference: format!("PAY-{}", reference.to_uppercase()),
            amount,
            card_last4: digits[digits.len() - 4..].to_string(),
        })
    }
}

fn valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    let month_ok = month.len() == 2
        && month.chars().all(|c| c.is_ascii_digit())
        && matches!(month.parse::<u8>(), Ok(1..=12));
    let year_ok = year.len() == 2 && year.chars().all(|c| c.is_ascii_digit());
    month_ok && year_ok
}
