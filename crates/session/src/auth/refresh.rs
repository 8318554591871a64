//! Single-flight token refresh
//!
//! At most one refresh call to the issuer is outstanding. The pending call is kept as a
//! shared future; every caller that asks for a refresh while it runs awaits that same
//! future and receives the same outcome. The outcome is applied to the session inside
//! the shared future, before the handle is cleared and before any waiter resumes.

use super::errors::RefreshError;
use crate::config::RefreshRotation;
use crate::runtime;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokenward_core::{TokenPair, codec};
use tokenward_http::Issuer;

/// Result handed to every waiter of a refresh
pub type RefreshOutcome = Result<TokenPair, RefreshError>;

type SharedRefresh = Shared<LocalBoxFuture<'static, RefreshOutcome>>;

/// Receiver of refresh outcomes
pub(crate) trait RefreshTarget {
    /// Current session epoch
    fn epoch(&self) -> u64;

    /// Store a refreshed pair; returns false if `epoch` is no longer current
    fn apply_refresh(&self, epoch: u64, pair: &TokenPair) -> bool;

    /// End the session after a failed refresh, unless `epoch` is no longer current
    fn teardown(&self, epoch: u64, error: &RefreshError);
}

struct InFlight {
    id: u64,
    outcome: SharedRefresh,
}

/// Collapses concurrent refresh demand into one issuer call
pub struct RefreshCoordinator {
    issuer: Rc<dyn Issuer>,
    timeout: Duration,
    rotation: RefreshRotation,
    in_flight: RefCell<Option<InFlight>>,
    last_id: Cell<u64>,
}

impl RefreshCoordinator {
    pub fn new(issuer: Rc<dyn Issuer>, timeout: Duration, rotation: RefreshRotation) -> Self {
        Self {
            issuer,
            timeout,
            rotation,
            in_flight: RefCell::new(None),
            last_id: Cell::new(0),
        }
    }

    /// Whether a refresh is currently outstanding
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.borrow().is_some()
    }

    /// Refresh with `refresh_token`, or join the refresh already in flight
    pub(crate) async fn refresh(
        self: &Rc<Self>,
        target: Rc<dyn RefreshTarget>,
        refresh_token: &str,
    ) -> RefreshOutcome {
        self.join_or_start(target, refresh_token).await
    }

    /// Forget the in-flight refresh so the next caller starts a new one
    ///
    /// Existing waiters still receive its outcome.
    pub(crate) fn detach(&self) {
        if let Some(in_flight) = self.in_flight.borrow_mut().take() {
            debug!(refresh_id = in_flight.id, "Detached in-flight token refresh");
        }
    }

    fn join_or_start(
        self: &Rc<Self>,
        target: Rc<dyn RefreshTarget>,
        refresh_token: &str,
    ) -> SharedRefresh {
        let existing = self
            .in_flight
            .borrow()
            .as_ref()
            .map(|in_flight| (in_flight.id, in_flight.outcome.clone()));
        if let Some((id, outcome)) = existing {
            debug!(refresh_id = id, "Joining in-flight token refresh");
            return outcome;
        }

        let id = self.last_id.get() + 1;
        self.last_id.set(id);
        let epoch = target.epoch();
        debug!(refresh_id = id, epoch, "Starting token refresh");

        let coordinator = Rc::clone(self);
        let refresh_token = refresh_token.to_owned();
        let outcome = async move {
            coordinator
                .run(id, epoch, target.as_ref(), &refresh_token)
                .await
        }
        .boxed_local()
        .shared();

        *self.in_flight.borrow_mut() = Some(InFlight {
            id,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn run(
        &self,
        id: u64,
        epoch: u64,
        target: &dyn RefreshTarget,
        refresh_token: &str,
    ) -> RefreshOutcome {
        let outcome = match self.exchange(refresh_token).await {
            Ok(pair) if target.apply_refresh(epoch, &pair) => {
                info!(refresh_id = id, "Access token refreshed");
                Ok(pair)
            }
            Ok(_) => {
                debug!(refresh_id = id, "Discarding refresh result for a replaced session");
                Err(RefreshError::Superseded)
            }
            Err(err) => {
                warn!(refresh_id = id, error = %err, "Token refresh failed");
                target.teardown(epoch, &err);
                Err(err)
            }
        };
        self.finish(id);
        outcome
    }

    fn finish(&self, id: u64) {
        let mut in_flight = self.in_flight.borrow_mut();
        if in_flight.as_ref().is_some_and(|current| current.id == id) {
            *in_flight = None;
        }
    }

    async fn exchange(&self, refresh_token: &str) -> RefreshOutcome {
        // Opaque refresh tokens are fine; only a readable, expired one is known dead
        if let Ok(claims) = codec::decode(refresh_token) {
            if claims.exp <= codec::now_seconds() {
                return Err(RefreshError::RefreshTokenExpired);
            }
        }

        let response = runtime::with_timeout(self.timeout, self.issuer.refresh(refresh_token))
            .await
            .ok_or(RefreshError::Timeout(self.timeout))??;

        if let Err(err) = codec::decode(&response.access) {
            return Err(RefreshError::MalformedResponse(format!(
                "unreadable access token: {err}"
            )));
        }

        let refresh = match (response.refresh, self.rotation) {
            (Some(rotated), _) => rotated,
            (None, RefreshRotation::Optional) => refresh_token.to_owned(),
            (None, RefreshRotation::Required) => {
                return Err(RefreshError::MalformedResponse(
                    "issuer did not rotate the refresh token".to_string(),
                ));
            }
        };

        Ok(TokenPair {
            access: response.access,
            refresh,
        })
    }
}
