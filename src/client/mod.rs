//! Client half of the session subsystem.
//!
//! [`session::Session`] is the observable source of truth for who is logged
//! in, [`guard`] gates navigation on it, and [`http::ApiClient`] keeps it
//! honest by logging in, refreshing, and tearing down on unrecoverable
//! authorization failures.

mod guard;
mod http;
mod session;

pub use guard::{RouteDecision, RouteSpec, can_activate};
pub use http::{ApiClient, ClientError};
pub use session::{Session, SessionUser, Subscription};
