// The signed-in session: bearer token and user, shared by every transport
// that needs to authenticate.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::models::{AuthPayload, Role, User};
use crate::store::{SessionStore, StoreError};

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
}

/// Reference-counted handle to the current session.
///
/// Cloning is cheap and every clone observes the same state. A session is
/// initialized by [`Session::sign_in`] after a successful login or
/// registration and torn down by [`Session::sign_out`]. When backed by a
/// [`SessionStore`], both transitions are persisted.
#[derive(Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    store: Option<Arc<SessionStore>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("authenticated", &state.token.is_some())
            .field("user", &state.user.as_ref().map(|u| &u.id))
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl Session {
    /// An empty, memory-only session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session backed by `store`, restored from whatever it holds.
    pub fn with_store(store: SessionStore) -> Result<Self, StoreError> {
        let restored = store.load()?;
        let session = Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            store: Some(Arc::new(store)),
        };
        if let Some(payload) = restored {
            info!(user_id = %payload.user.id, "restored saved session");
            let mut state = session.write();
            state.token = Some(payload.token);
            state.user = Some(payload.user);
        }
        Ok(session)
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().expect("session lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().expect("session lock poisoned")
    }

    /// Record a successful login or registration.
    pub fn sign_in(&self, payload: AuthPayload) -> Result<(), StoreError> {
        if let Some(store) = &self.store {
            store.save(&payload.token, &payload.user)?;
        }
        info!(user_id = %payload.user.id, role = %payload.user.role, "signed in");
        let mut state = self.write();
        state.token = Some(payload.token);
        state.user = Some(payload.user);
        Ok(())
    }

    /// Forget the token and user. The in-memory state is cleared even when
    /// the store fails; the store error is still returned.
    pub fn sign_out(&self) -> Result<(), StoreError> {
        {
            let mut state = self.write();
            state.token = None;
            state.user = None;
        }
        info!("signed out");
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                warn!("failed to clear saved session: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Replace the stored user (e.g. after refreshing it with `me`), keeping
    /// the token. Does nothing and returns `false` when signed out. The check,
    /// the save and the update happen under one write lock, so a concurrent
    /// `sign_out` cannot leave a user behind without a token.
    pub fn update_user(&self, user: User) -> Result<bool, StoreError> {
        let mut state = self.write();
        let Some(token) = state.token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        if let Some(store) = &self.store {
            store.save(token, &user)?;
        }
        state.user = Some(user);
        Ok(true)
    }

    /// The current token. An empty token counts as absent.
    pub fn token(&self) -> Option<String> {
        self.read().token.clone().filter(|t| !t.is_empty())
    }

    /// `Bearer <token>` for the current token, if any.
    pub fn bearer(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {t}"))
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.read().user.as_ref().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        state.token.as_deref().is_some_and(|t| !t.is_empty()) && state.user.is_some()
    }

    /// True when `other` is a clone of this handle.
    pub fn same_as(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u-7".into(),
            email: "grace@example.com".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            role,
            phone: None,
            avatar: None,
            bio: None,
            skills: None,
            experience: None,
            location: None,
        }
    }

    fn payload(token: &str) -> AuthPayload {
        AuthPayload {
            token: token.into(),
            user: user(Role::Employer),
        }
    }

    #[test]
    fn new_session_is_anonymous() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(session.bearer().is_none());
        assert!(session.user().is_none());
    }

    #[test]
    fn sign_in_sets_token_and_user() {
        let session = Session::new();
        session.sign_in(payload("abc123")).unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.bearer().as_deref(), Some("Bearer abc123"));
        assert_eq!(session.role(), Some(Role::Employer));
    }

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let clone = session.clone();
        session.sign_in(payload("shared")).unwrap();

        assert_eq!(clone.token().as_deref(), Some("shared"));
        assert!(clone.same_as(&session));
        assert!(!clone.same_as(&Session::new()));

        clone.sign_out().unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn empty_token_counts_as_absent() {
        let session = Session::new();
        session.sign_in(payload("")).unwrap();
        assert!(session.token().is_none());
        assert!(session.bearer().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn store_backed_session_persists_and_restores() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.db");

        {
            let session = Session::with_store(SessionStore::open(&path).unwrap()).unwrap();
            assert!(!session.is_authenticated());
            session.sign_in(payload("persist-me")).unwrap();
        }

        let restored = Session::with_store(SessionStore::open(&path).unwrap()).unwrap();
        assert_eq!(restored.token().as_deref(), Some("persist-me"));
        assert_eq!(restored.user().unwrap().email, "grace@example.com");

        restored.sign_out().unwrap();
        let after_logout = Session::with_store(SessionStore::open(&path).unwrap()).unwrap();
        assert!(!after_logout.is_authenticated());
    }

    #[test]
    fn update_user_keeps_token() {
        let session = Session::with_store(SessionStore::in_memory().unwrap()).unwrap();
        session.sign_in(payload("keep")).unwrap();

        let mut refreshed = user(Role::Employer);
        refreshed.location = Some("Lisbon".into());
        assert!(session.update_user(refreshed).unwrap());

        assert_eq!(session.token().as_deref(), Some("keep"));
        assert_eq!(session.user().unwrap().location.as_deref(), Some("Lisbon"));
    }

    #[test]
    fn update_user_after_sign_out_is_ignored() {
        let session = Session::with_store(SessionStore::in_memory().unwrap()).unwrap();
        session.sign_in(payload("gone")).unwrap();
        session.sign_out().unwrap();

        assert!(!session.update_user(user(Role::Candidate)).unwrap());
        assert!(session.user().is_none());
        assert!(!session.is_authenticated());
    }
}
