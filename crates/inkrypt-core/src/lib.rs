//! Core of the Inkrypt account dashboard.
//!
//! The crate is split along the three collaborators of the account page:
//!
//! * [`store`] — typed access to the locally persisted collections (posts,
//!   drafts and ongoing inscriptions) on top of a pluggable key-value store.
//! * [`account`] — the account view model, deriving the signed-in user's view
//!   from the shared store and handling draft edit/delete actions.
//! * [`orders`] — thin clients for the external inscription ordering service.
//!   Two incompatible integrations live side by side: [`inscribe`] (flat
//!   request fields, enveloped responses) and [`order_api`] (inline file
//!   payload, bare responses).
//!
//! [`records`] holds the persisted record shapes and [`session`] the explicit
//! session context that replaces any process-wide "current wallet" state.

pub mod account;
pub mod inscribe;
pub mod order_api;
pub mod orders;
pub mod records;
pub mod session;
pub mod store;

mod error;

pub use error::{AccountError, OrderError, StoreError};
