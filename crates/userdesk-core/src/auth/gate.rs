//! Access decisions for protected views.

use tokio::sync::watch;

use super::{SessionError, SessionState};

/// Outcome of asking whether a protected view may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The session is still loading; show a pending indicator.
    Pending,
    Granted,
    /// Not signed in; send the caller to login.
    Denied,
}

impl Access {
    pub fn evaluate(state: &SessionState) -> Self {
        if state.is_loading() {
            Access::Pending
        } else if state.credential().is_some() {
            Access::Granted
        } else {
            Access::Denied
        }
    }
}

/// Gate bound to a session's watch channel.
#[derive(Debug, Clone)]
pub struct AccessGate {
    rx: watch::Receiver<SessionState>,
}

impl AccessGate {
    pub fn new(rx: watch::Receiver<SessionState>) -> Self {
        Self { rx }
    }

    /// Decision for the current state, which may be [`Access::Pending`].
    pub fn check(&self) -> Access {
        Access::evaluate(&self.rx.borrow())
    }

    /// Wait until the session stops loading, then decide.
    pub async fn resolved(&mut self) -> Access {
        let ready = self
            .rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| Access::evaluate(&state));
        // The session was dropped; judge the last state it published.
        ready.unwrap_or_else(|_| self.check())
    }

    /// Wait for a decision and turn a denial into an error.
    pub async fn require(&mut self) -> Result<(), SessionError> {
        match self.resolved().await {
            Access::Granted => Ok(()),
            Access::Denied | Access::Pending => Err(SessionError::NotSignedIn),
        }
    }
}
