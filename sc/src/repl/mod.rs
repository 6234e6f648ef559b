//! Interactive shell for driving a scheduling session

mod session;

pub use session::ReplSession;
