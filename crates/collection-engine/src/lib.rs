//! Collection decision engine for multi-tenant debt recovery.
//!
//! The crate chooses a collection strategy per debt from a recovery score and
//! the tenant's rule table, drives payment gateways through a single provider
//! contract, and folds gateway webhooks back into negotiated agreements.

pub mod agreements;
pub mod collection;
pub mod config;
pub mod error;
pub mod payments;
pub mod telemetry;
