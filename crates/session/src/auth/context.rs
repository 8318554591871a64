//! Session context and its state machine
//!
//! The context is the only owner of the token store. UI code holds a clone of the
//! context, reads the session through [`SessionContext::state`] or a subscription, and
//! calls [`SessionContext::login`] / [`SessionContext::logout`]. Every mutation bumps or
//! checks a session epoch, so work started for one session never lands on the next.

use super::errors::{ProfileFetchError, RefreshError};
use super::events::{Listeners, Subscription};
use super::refresh::{RefreshCoordinator, RefreshTarget};
use crate::config::SessionConfig;
use crate::runtime;
use crate::storage::TokenStore;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokenward_core::{DecodeError, Identity, TokenPair, codec};
use tokenward_http::Issuer;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not hydrated yet
    #[default]
    Uninitialized,
    /// Hydrating from storage
    Authenticating,
    /// No session
    Anonymous,
    /// Holding a decodable access token
    Authenticated,
}

/// Snapshot of the session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<Identity>,
    pub status: SessionStatus,
}

impl SessionState {
    fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            ..Self::default()
        }
    }

    /// `None` while the session is still loading
    pub const fn authenticated(&self) -> Option<bool> {
        match self.status {
            SessionStatus::Uninitialized | SessionStatus::Authenticating => None,
            SessionStatus::Anonymous => Some(false),
            SessionStatus::Authenticated => Some(true),
        }
    }

    /// Whether the access token is expired or within `threshold_secs` of expiry
    ///
    /// Stale sessions still report as authenticated; staleness only triggers renewal.
    pub fn is_stale(&self, now: i64, threshold_secs: i64) -> bool {
        self.access_token.as_deref().is_some_and(|token| {
            codec::time_until_expiry(token, now).map_or(true, |left| left <= threshold_secs)
        })
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user)
            .field("status", &self.status)
            .finish()
    }
}

/// Handle to a client session
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Box<dyn TokenStore>,
    issuer: Rc<dyn Issuer>,
    coordinator: Rc<RefreshCoordinator>,
    state: RefCell<SessionState>,
    epoch: Cell<u64>,
    listeners: Rc<Listeners>,
}

impl SessionContext {
    /// Create an empty, not yet hydrated session
    pub fn create(
        config: SessionConfig,
        store: impl TokenStore + 'static,
        issuer: impl Issuer + 'static,
    ) -> Self {
        let issuer: Rc<dyn Issuer> = Rc::new(issuer);
        let coordinator = Rc::new(RefreshCoordinator::new(
            Rc::clone(&issuer),
            config.issuer_timeout(),
            config.rotation,
        ));

        Self {
            inner: Rc::new(SessionInner {
                config,
                store: Box::new(store),
                issuer,
                coordinator,
                state: RefCell::new(SessionState::default()),
                epoch: Cell::new(0),
                listeners: Rc::default(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Current snapshot of the session
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// `None` while loading, then whether a session is active
    pub fn authenticated(&self) -> Option<bool> {
        self.inner.state.borrow().authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    pub fn user(&self) -> Option<Identity> {
        self.inner.state.borrow().user.clone()
    }

    /// The held access token, without checking its expiry
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    /// Whether a token refresh is outstanding
    pub fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing()
    }

    /// Register a listener called after every session transition
    pub fn subscribe(&self, listener: impl Fn(&SessionState) + 'static) -> Subscription {
        self.inner.listeners.add(Rc::new(listener))
    }

    /// Restore the session from storage; runs once per context
    ///
    /// When the stored access token carries no identity, the profile is fetched in the
    /// background in the browser; natively the fetch finishes before this returns.
    pub async fn hydrate(&self) {
        let inner = &self.inner;
        if inner.state.borrow().status != SessionStatus::Uninitialized {
            debug!("Session already hydrated");
            return;
        }
        inner.update(|state| state.status = SessionStatus::Authenticating);

        let stored = inner.store.load().unwrap_or_else(|err| {
            warn!(error = %err, "Failed to read stored tokens");
            None
        });
        let Some(pair) = stored else {
            debug!("No stored session");
            inner.update(|state| *state = SessionState::anonymous());
            return;
        };

        match codec::decode(&pair.access) {
            Ok(claims) if claims.exp > codec::now_seconds() => {
                let user = claims.identity();
                let needs_profile = user.is_none();
                let access = pair.access.clone();
                inner.update(|state| {
                    *state = SessionState {
                        access_token: Some(pair.access),
                        refresh_token: Some(pair.refresh),
                        user,
                        status: SessionStatus::Authenticated,
                    };
                });
                info!("Restored session from storage");
                if needs_profile {
                    self.schedule_profile_fetch(access).await;
                }
            }
            decoded => {
                match decoded {
                    Ok(_) => debug!("Stored access token expired; refreshing"),
                    Err(err) => debug!(error = %err, "Stored access token unreadable; refreshing"),
                }
                let refresh = pair.refresh.clone();
                inner.update(|state| state.refresh_token = Some(pair.refresh));
                match self.refresh_with(&refresh).await {
                    Ok(_) => {
                        info!("Restored session with a refreshed access token");
                        self.ensure_identity().await;
                    }
                    Err(err) => debug!(error = %err, "Stored session could not be restored"),
                }
            }
        }
    }

    /// Start a session from a pair the issuer just handed out
    ///
    /// # Errors
    ///
    /// The only failure is an access token whose claims cannot be read. The session and
    /// storage are left untouched then; every readable pair is accepted.
    pub fn login(&self, pair: TokenPair, user: Identity) -> Result<(), DecodeError> {
        codec::decode(&pair.access)?;

        let inner = &self.inner;
        inner.begin_epoch();
        if let Err(err) = inner.store.save(&pair) {
            warn!(error = %err, "Failed to persist tokens; session will not survive a reload");
        }
        inner.update(|state| {
            *state = SessionState {
                access_token: Some(pair.access),
                refresh_token: Some(pair.refresh),
                user: Some(user),
                status: SessionStatus::Authenticated,
            };
        });
        info!("Logged in");
        Ok(())
    }

    /// End the session; never fails
    pub fn logout(&self) {
        self.inner.reset();
        info!("Logged out");
    }

    /// An access token with more than the renewal threshold left, refreshing if needed
    ///
    /// Returns `None` when there is no session or the refresh failed; a failed refresh
    /// also ends the session.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        let (access, refresh) = {
            let state = self.inner.state.borrow();
            (state.access_token.clone(), state.refresh_token.clone())
        };
        let refresh = refresh?;

        if let Some(access) = access {
            match codec::time_until_expiry(&access, codec::now_seconds()) {
                Ok(left) if left > self.inner.config.refresh_threshold_secs => return Some(access),
                Ok(left) => debug!(seconds_left = left, "Access token near expiry; renewing"),
                Err(err) => warn!(error = %err, "Held access token unreadable; renewing"),
            }
        }

        match self.refresh_with(&refresh).await {
            Ok(pair) => Some(pair.access),
            Err(err) => {
                debug!(error = %err, "No valid access token available");
                None
            }
        }
    }

    /// Refresh the current session, joining a refresh already in flight
    pub async fn refresh(&self) -> Result<TokenPair, RefreshError> {
        let refresh = self
            .inner
            .state
            .borrow()
            .refresh_token
            .clone()
            .ok_or(RefreshError::NoSession)?;
        self.refresh_with(&refresh).await
    }

    /// Detach from in-flight work and drop listeners; stored tokens are kept
    ///
    /// The context can be hydrated again afterwards.
    pub fn dispose(&self) {
        let inner = &self.inner;
        inner.begin_epoch();
        inner.listeners.clear();
        *inner.state.borrow_mut() = SessionState::default();
        debug!("Session context disposed");
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let target: Rc<dyn RefreshTarget> = self.inner.clone();
        self.inner.coordinator.refresh(target, refresh_token).await
    }

    async fn ensure_identity(&self) {
        let access = {
            let state = self.inner.state.borrow();
            if state.user.is_some() {
                return;
            }
            state.access_token.clone()
        };
        if let Some(access) = access {
            self.schedule_profile_fetch(access).await;
        }
    }

    async fn schedule_profile_fetch(&self, access_token: String) {
        let inner = Rc::clone(&self.inner);
        let epoch = inner.epoch.get();
        debug!("Access token carries no identity; fetching profile");

        runtime::spawn_or_await(async move {
            match inner.fetch_profile(&access_token).await {
                Ok(identity) => inner.apply_profile(epoch, identity),
                Err(err) => {
                    warn!(error = %err, "Profile fetch failed; continuing without user identity");
                }
            }
        })
        .await;
    }
}

impl SessionInner {
    /// Mutate the state, then notify listeners with no borrow held
    fn update(&self, mutate: impl FnOnce(&mut SessionState)) {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            mutate(&mut state);
            state.clone()
        };
        self.listeners.notify(&snapshot);
    }

    /// Start a new epoch, orphaning work started for the previous one
    fn begin_epoch(&self) {
        self.epoch.set(self.epoch.get() + 1);
        self.coordinator.detach();
    }

    fn reset(&self) {
        self.begin_epoch();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear stored tokens");
        }
        self.update(|state| *state = SessionState::anonymous());
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ProfileFetchError> {
        let timeout = self.config.issuer_timeout();
        let identity = runtime::with_timeout(timeout, self.issuer.fetch_profile(access_token))
            .await
            .ok_or(ProfileFetchError::Timeout(timeout))??;
        Ok(identity)
    }

    fn apply_profile(&self, epoch: u64, identity: Identity) {
        if epoch != self.epoch.get() {
            debug!("Discarding profile for a replaced session");
            return;
        }
        let applicable = {
            let state = self.state.borrow();
            state.access_token.is_some() && state.user.is_none()
        };
        if applicable {
            self.update(|state| state.user = Some(identity));
            debug!("User identity loaded from profile");
        }
    }
}

impl RefreshTarget for SessionInner {
    fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    fn apply_refresh(&self, epoch: u64, pair: &TokenPair) -> bool {
        if epoch != self.epoch.get() {
            return false;
        }
        if let Err(err) = self.store.save(pair) {
            warn!(error = %err, "Failed to persist refreshed tokens");
        }
        let identity = codec::decode(&pair.access)
            .ok()
            .and_then(|claims| claims.identity());
        self.update(|state| {
            state.access_token = Some(pair.access.clone());
            state.refresh_token = Some(pair.refresh.clone());
            if identity.is_some() {
                state.user = identity;
            }
            state.status = SessionStatus::Authenticated;
        });
        true
    }

    fn teardown(&self, epoch: u64, error: &RefreshError) {
        if epoch != self.epoch.get() {
            debug!(error = %error, "Ignoring refresh failure for a replaced session");
            return;
        }
        warn!(error = %error, "Ending session after failed refresh");
        self.reset();
    }
}
