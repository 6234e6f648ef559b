//! Session flow: identity, the interaction state machine, and its errors

mod context;
mod error;
mod machine;

pub use context::SessionContext;
pub use error::SessionError;
pub use machine::{Phase, SessionMachine, Snapshot};
