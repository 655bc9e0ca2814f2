//! Module des transactions pour ClimateDAO
//!
//! Chaque point d'entrée public est un variant de [`Call`]. Une
//! [`Transaction`] enveloppe un appel avec l'émetteur, son nonce et sa
//! signature Ed25519.

pub mod types;
pub mod validation;

pub use types::{Call, Transaction, TransactionBuilder};
pub use validation::{TransactionValidator, Validatable, ValidationConfig};
