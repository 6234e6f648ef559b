//! Session identity shared by every service request

use std::sync::{Arc, RwLock};
use tracing::debug;

use super::error::SessionError;
use crate::api::SchedulerApi;

/// Holds the token correlating all requests to one server-side
/// conversation
///
/// Created once per application run. [`SessionContext::acquire`] performs
/// the start-session exchange at most once; later calls return the cached
/// id. The service may rotate the id in a generation response, in which
/// case [`SessionContext::rotate`] installs it - the newest value wins.
pub struct SessionContext {
    api: Arc<dyn SchedulerApi>,
    id: RwLock<Option<String>>,
}

impl SessionContext {
    pub fn new(api: Arc<dyn SchedulerApi>) -> Self {
        Self {
            api,
            id: RwLock::new(None),
        }
    }

    /// The cached session id, if one has been established
    pub fn current(&self) -> Option<String> {
        self.id.read().unwrap().clone()
    }

    /// Establish the session, or return the cached id
    ///
    /// On failure nothing is cached and dependent operations must not
    /// proceed; there is no automatic retry - the user re-triggers.
    pub async fn acquire(&self) -> Result<String, SessionError> {
        if let Some(id) = self.current() {
            debug!(%id, "acquire: returning cached session id");
            return Ok(id);
        }

        let id = self.api.start_session().await.map_err(SessionError::Session)?;
        debug!(%id, "acquire: session established");
        *self.id.write().unwrap() = Some(id.clone());
        Ok(id)
    }

    /// Install a server-rotated id (newest wins); empty ids are ignored
    pub fn rotate(&self, id: String) {
        if id.is_empty() {
            return;
        }
        let mut held = self.id.write().unwrap();
        if held.as_deref() != Some(&id) {
            debug!(old = ?held, new = %id, "rotate: session id replaced");
            *held = Some(id);
        }
    }
}
