use crate::models::{Credential, Profile};

/// Coarse lifecycle phase of a session, derived from [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No credential.
    Unauthenticated,
    /// A credential is held but its profile has not been resolved yet.
    Hydrating,
    /// Credential and profile are both known.
    Authenticated,
    /// A login, registration or profile update is in flight.
    Busy,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Unauthenticated => "signed out",
            SessionPhase::Hydrating => "restoring session",
            SessionPhase::Authenticated => "signed in",
            SessionPhase::Busy => "working",
        }
    }
}

/// Snapshot of who is logged in.
///
/// Only the session core mutates this; everyone else sees clones through
/// `SessionCore::snapshot` or a watch receiver. `profile` is never present
/// without `credential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub(crate) credential: Option<Credential>,
    pub(crate) profile: Option<Profile>,
    pub(crate) hydrating: bool,
    pub(crate) submissions: u32,
    pub(crate) generation: u64,
}

impl SessionState {
    /// Start-up state: whatever credential the store held, no profile, and
    /// loading until hydration has run.
    pub(crate) fn seeded(credential: Option<Credential>) -> Self {
        Self {
            credential,
            profile: None,
            hydrating: true,
            submissions: 0,
            generation: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.generation += 1;
        self.credential = None;
        self.profile = None;
        self.hydrating = false;
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// True while hydration or any submission has not resolved.
    pub fn is_loading(&self) -> bool {
        self.hydrating || self.submissions > 0
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some() && self.profile.is_some()
    }

    /// Incremented on every credential change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> SessionPhase {
        if self.submissions > 0 {
            return SessionPhase::Busy;
        }
        match (&self.credential, &self.profile) {
            (None, _) => SessionPhase::Unauthenticated,
            (Some(_), Some(_)) if !self.hydrating => SessionPhase::Authenticated,
            (Some(_), _) => SessionPhase::Hydrating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_phase() {
        let anonymous = SessionState::seeded(None);
        assert_eq!(anonymous.phase(), SessionPhase::Unauthenticated);
        assert!(anonymous.is_loading());

        let stored = SessionState::seeded(Some(Credential::new("tok1")));
        assert_eq!(stored.phase(), SessionPhase::Hydrating);
        assert!(stored.is_loading());
        assert!(!stored.is_authenticated());
    }

    #[test]
    fn test_busy_takes_precedence() {
        let mut state = SessionState::seeded(None);
        state.hydrating = false;
        state.submissions = 1;
        assert_eq!(state.phase(), SessionPhase::Busy);
        assert!(state.is_loading());
    }

    #[test]
    fn test_clear_bumps_generation() {
        let mut state = SessionState::seeded(Some(Credential::new("tok1")));
        state.clear();
        assert_eq!(state.generation(), 1);
        assert_eq!(state.credential(), None);
        assert!(!state.is_loading());
    }
}
