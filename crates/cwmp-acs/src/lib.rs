//! ACS-side session logic for walking a CWMP device's data model.
//!
//! The [`server`] module owns the HTTP endpoint, [`session`] holds the
//! per-session state, and [`walk`] is the state machine that turns inbound
//! CWMP messages into the next discovery request.

pub mod error;
pub mod server;
pub mod session;
pub mod walk;

pub use error::{Result, WalkError};
pub use session::{SessionPhase, SessionState};
pub use walk::Step;
