//! The session core: owns the credential/profile lifecycle.
//!
//! All state lives in a `watch` channel. Every mutation runs inside
//! `send_modify`/`send_if_modified`, so a generation check, the state change
//! and the token store write happen as one step with respect to any other
//! operation. No lock is held across an `.await`.
//!
//! ```text
//!             new()
//!               │
//!     ┌─────────┴──────────┐
//!     ▼                    ▼
//! [Unauthenticated]    [Hydrating] ──hydrate() fails──→ [Unauthenticated]
//!     │                    │
//!     │ login()/register() │ hydrate() ok
//!     ▼                    ▼
//!  [Busy] ──────────→ [Authenticated] ──logout()──→ [Unauthenticated]
//! ```
//!
//! Operations that suspend capture the generation first and only commit if
//! it is unchanged when they resume. A logout or a newer login in between
//! makes their result stale and it is dropped.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::UserApi;
use crate::models::{AuthOutcome, Credential, Profile, ProfilePatch, ProfileUpdate};

use super::{AccessGate, SessionError, SessionState, TokenStore};

/// What `hydrate()` did with the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// No credential was stored.
    Anonymous,
    /// The credential resolved to a profile.
    Restored,
    /// The server rejected the credential; the session was cleared.
    Invalidated,
    /// The credential changed while the profile was being fetched.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing differed from the current profile; no request was sent.
    NoChanges,
    Updated,
}

impl UpdateOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            UpdateOutcome::NoChanges => "No changes to update",
            UpdateOutcome::Updated => "Profile updated successfully",
        }
    }
}

/// Marks a submission in flight for as long as it lives. Dropping it
/// releases the loading flag on every exit path.
struct Submission<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl<'a> Submission<'a> {
    fn start(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_modify(|s| s.submissions += 1);
        Self { state }
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.state
            .send_modify(|s| s.submissions = s.submissions.saturating_sub(1));
    }
}

/// Clears `hydrating` when hydration ends without doing so itself, which
/// includes the hydrate future being dropped mid-fetch. A newer generation
/// owns the flag and is left alone.
struct Hydration<'a> {
    state: &'a watch::Sender<SessionState>,
    generation: u64,
}

impl Drop for Hydration<'_> {
    fn drop(&mut self) {
        let generation = self.generation;
        self.state.send_if_modified(|s| {
            if s.generation != generation || !s.hydrating {
                return false;
            }
            s.hydrating = false;
            true
        });
    }
}

pub struct SessionCore<A, S> {
    api: A,
    store: S,
    state: watch::Sender<SessionState>,
}

impl<A: UserApi, S: TokenStore> SessionCore<A, S> {
    /// Create a session seeded from whatever the token store holds.
    ///
    /// The session starts out loading; call [`hydrate`](Self::hydrate) once
    /// to resolve the stored credential.
    pub fn new(api: A, store: S) -> Self {
        let credential = match store.read() {
            Ok(token) => token.filter(|t| !t.is_empty()).map(Credential::new),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };
        debug!(has_credential = credential.is_some(), "Session seeded from token store");

        let (state, _) = watch::channel(SessionState::seeded(credential));
        Self { api, store, state }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive a fresh snapshot after every mutation. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.subscribe())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin(&self) -> (u64, Option<Credential>) {
        let state = self.state.borrow();
        (state.generation, state.credential.clone())
    }

    /// Apply `apply` only if no credential change happened since `generation`
    /// was captured. Returns whether it was applied.
    fn commit(&self, generation: u64, apply: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            apply(state);
            true
        })
    }

    fn persist(&self, credential: Option<&Credential>) {
        let result = match credential {
            Some(credential) => self.store.write(credential.as_str()),
            None => self.store.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session token");
        }
    }

    fn establish(&self, generation: u64, outcome: AuthOutcome) -> Result<Profile, SessionError> {
        let profile = outcome.profile.clone();
        let committed = self.commit(generation, |state| {
            self.persist(Some(&outcome.credential));
            state.generation += 1;
            state.credential = Some(outcome.credential);
            state.profile = Some(outcome.profile);
            state.hydrating = false;
        });

        if committed {
            info!(user_id = profile.id, "Session established");
            Ok(profile)
        } else {
            debug!(user_id = profile.id, "Discarding sign-in result from a superseded session");
            Err(SessionError::Superseded)
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, SessionError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::Invalid("email and password are required".to_string()));
        }

        let _busy = Submission::start(&self.state);
        let generation = self.state.borrow().generation;

        let outcome = self.api.login(email.trim(), password).await?;
        self.establish(generation, outcome)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, SessionError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::Invalid(
                "name, email, and password are required".to_string(),
            ));
        }

        let _busy = Submission::start(&self.state);
        let generation = self.state.borrow().generation;

        let outcome = self
            .api
            .register(name.trim(), email.trim(), password)
            .await?;
        self.establish(generation, outcome)
    }

    /// Re-read the profile for the current credential.
    ///
    /// Returns `Ok(None)` without a request when signed out. Errors are
    /// returned as-is; this never clears the session.
    pub async fn refresh_profile(&self) -> Result<Option<Profile>, SessionError> {
        let (generation, credential) = self.begin();
        let Some(credential) = credential else {
            return Ok(None);
        };

        let profile = self.api.fetch_profile(&credential).await?;
        let fetched = profile.clone();
        if self.commit(generation, |state| state.profile = Some(fetched)) {
            Ok(Some(profile))
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Resolve the stored credential into a profile. A rejected credential
    /// demotes the session to signed out instead of producing an error.
    pub async fn hydrate(&self) -> HydrateOutcome {
        let (generation, credential) = self.begin();
        let _hydration = Hydration {
            state: &self.state,
            generation,
        };
        if credential.is_none() {
            self.commit(generation, |state| {
                state.profile = None;
                state.hydrating = false;
            });
            debug!("No stored credential");
            return HydrateOutcome::Anonymous;
        }

        self.commit(generation, |state| state.hydrating = true);

        match self.refresh_profile().await {
            Ok(Some(profile)) => {
                if self.commit(generation, |state| state.hydrating = false) {
                    info!(user_id = profile.id, "Session restored");
                    HydrateOutcome::Restored
                } else {
                    HydrateOutcome::Superseded
                }
            }
            Ok(None) => {
                self.commit(generation, |state| state.hydrating = false);
                HydrateOutcome::Anonymous
            }
            Err(SessionError::Superseded) => {
                debug!("Hydration superseded by a newer session");
                HydrateOutcome::Superseded
            }
            Err(e) => {
                let cleared = self.commit(generation, |state| {
                    self.persist(None);
                    state.clear();
                });
                if cleared {
                    info!(error = %e, "Stored credential rejected, session cleared");
                    HydrateOutcome::Invalidated
                } else {
                    HydrateOutcome::Superseded
                }
            }
        }
    }

    /// Send the fields of `update` that differ from the current profile,
    /// then re-read the profile from the server.
    ///
    /// The profile echoed by the update call is not used; the session
    /// always reflects a fresh `GET /profile`.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UpdateOutcome, SessionError> {
        let (generation, credential, current) = {
            let state = self.state.borrow();
            (state.generation, state.credential.clone(), state.profile.clone())
        };

        let Some(current) = current else {
            return if update.is_empty() {
                Ok(UpdateOutcome::NoChanges)
            } else {
                Err(SessionError::NotSignedIn)
            };
        };

        let patch = ProfilePatch::diff(&current, update);
        if patch.is_empty() {
            debug!("Profile update has no changes");
            return Ok(UpdateOutcome::NoChanges);
        }
        let credential = credential.ok_or(SessionError::NotSignedIn)?;

        let _busy = Submission::start(&self.state);
        self.api.update_user(&credential, current.id, &patch).await?;
        if self.state.borrow().generation != generation {
            debug!(user_id = current.id, "Session changed during profile update");
            return Err(SessionError::Superseded);
        }
        if self.refresh_profile().await?.is_none() {
            return Err(SessionError::Superseded);
        }

        info!(user_id = current.id, "Profile updated");
        Ok(UpdateOutcome::Updated)
    }

    /// Forget the session locally. No request is sent and this cannot fail.
    pub fn logout(&self) {
        self.state.send_modify(|state| {
            self.persist(None);
            state.clear();
        });
        info!("Signed out");
    }

    /// All users visible to the signed-in account.
    pub async fn list_users(&self) -> Result<Vec<Profile>, SessionError> {
        let (_, credential) = self.begin();
        let credential = credential.ok_or(SessionError::NotSignedIn)?;
        Ok(self.api.list_users(&credential).await?)
    }

    /// A single user record.
    pub async fn fetch_user(&self, id: i64) -> Result<Profile, SessionError> {
        let (_, credential) = self.begin();
        let credential = credential.ok_or(SessionError::NotSignedIn)?;
        Ok(self.api.fetch_user(&credential, id).await?)
    }

    /// Delete a user. Deleting the signed-in account also ends the session.
    pub async fn delete_user(&self, id: i64) -> Result<(), SessionError> {
        let (generation, credential) = self.begin();
        let credential = credential.ok_or(SessionError::NotSignedIn)?;
        let own_account = self.state.borrow().profile.as_ref().map(|p| p.id) == Some(id);

        self.api.delete_user(&credential, id).await?;
        info!(user_id = id, "User deleted");

        if own_account {
            self.commit(generation, |state| {
                self.persist(None);
                state.clear();
            });
        }
        Ok(())
    }
}
