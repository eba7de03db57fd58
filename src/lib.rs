//! Silkey single sign-on for relying parties.
//!
//! A website signs an SSO request ([`SsoRequestBuilder`]), redirects the user to the broker,
//! and later receives a token whose payload carries the user's and the broker's signatures.
//! [`Verifier`] checks that token against the original request and the known addresses.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::SdkConfig;
pub use error::{Result, Signatory, SsoError};
pub use models::{Claims, SsoParams};
pub use services::{
    BrokerCheck, ClaimsSigner, SsoRequestBuilder, TokenIssuer, Verdict, Verifier, VerifyRequest,
};
