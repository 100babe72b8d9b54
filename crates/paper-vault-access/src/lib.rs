//! # Paper Vault Access
//!
//! Time-window access control for sealed documents.
//!
//! ## Overview
//!
//! A document may be decrypted only while its distribution window is open.
//! The decision is a pure function of the stored window and the current time,
//! recomputed on every request:
//!
//! | State | Condition | Result |
//! |---|---|---|
//! | Undistributed | no window set | `NotDistributed` |
//! | Pending | `now < start` | `TooEarly` |
//! | Open | `start <= now <= end` | admitted |
//! | Closed | `now > end` | `WindowExpired` |
//!
//! Every evaluation, granted or denied, is written to the [`AuditLog`]
//! before the gate returns.
//!
//! [`AuditLog`]: paper_vault_store::AuditLog

pub mod error;
pub mod gate;
pub mod state;

pub use error::{AccessError, Result};
pub use gate::{AccessWindowGate, Admission};
pub use state::WindowState;
