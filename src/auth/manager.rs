use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::exchange;
use super::store::CredentialStore;
use super::types::{BearerToken, Session, SessionInfo};
use crate::error::{Result, SyncError};

type SharedRenewal = Shared<BoxFuture<'static, Result<BearerToken>>>;

/// A renewal that has not finished yet
struct InFlight {
    generation: u64,
    renewal: SharedRenewal,
}

/// Anything that can hand out a fresh bearer credential
///
/// The fetch engine depends on this rather than on [`TokenManager`] so it
/// can be driven by a scripted renewer in tests.
#[async_trait]
pub trait CredentialRenewer: Send + Sync {
    async fn renew(&self) -> Result<BearerToken>;
}

/// Token lifecycle manager
/// Owns the session/bearer pair and collapses concurrent renewals into one call
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn CredentialStore>,

    /// HTTP client for authentication endpoints
    client: Client,

    /// Base URL of the authentication service
    auth_base_url: String,

    /// Pending renewal, cleared by its own task when it finishes
    in_flight: tokio::sync::Mutex<Option<InFlight>>,

    /// Tags each renewal so a finished task only clears its own entry
    generation: AtomicU64,

    /// Serializes read-check-write sequences against the store
    write_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>, client: Client, auth_base_url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                auth_base_url: auth_base_url.into(),
                in_flight: tokio::sync::Mutex::new(None),
                generation: AtomicU64::new(0),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Current stored session, if any
    pub fn session(&self) -> Option<Session> {
        self.inner.load_session()
    }

    /// Bearer credential to attach right now; may already be expired
    pub fn current_credential(&self) -> Option<BearerToken> {
        self.session().and_then(|s| s.bearer_token)
    }

    /// True iff a session identifier is stored
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn account_identity(&self) -> Option<String> {
        self.session().and_then(|s| s.account_identity)
    }

    /// Subject identifier learned by [`TokenManager::introspect`]
    pub fn user_id(&self) -> Option<String> {
        self.session().and_then(|s| s.user_id)
    }

    /// Sign in and obtain the first bearer credential
    ///
    /// If issuance fails the new session identifier stays stored, so
    /// `renew()` can be retried without signing in again.
    pub async fn sign_in(&self, identity: &str, secret: &str) -> Result<()> {
        if identity.trim().is_empty() || secret.trim().is_empty() {
            return Err(SyncError::InvalidCredentials(
                "email and password are required".to_string(),
            ));
        }

        tracing::info!(identity = identity, "Signing in...");
        let session_id =
            exchange::sign_in(&self.inner.client, &self.inner.auth_base_url, identity, secret)
                .await?;

        // Hold the slot while storing so no caller joins a renewal
        // started under the previous session
        let renewal = {
            let mut slot = self.inner.in_flight.lock().await;
            {
                let _guard = self.inner.lock_writes();
                self.inner
                    .store
                    .set(&Session::new(session_id, Some(identity.to_string())))?;
            }
            tracing::info!("Session established, requesting bearer credential");
            self.inner.spawn_renewal(&mut slot)
        };

        if let Err(e) = renewal.await {
            tracing::error!("Bearer issuance after sign-in failed (session retained): {}", e);
            return Err(e);
        }

        Ok(())
    }

    /// Exchange the session identifier for a fresh bearer credential
    ///
    /// Callers arriving while a renewal is pending share its outcome; only
    /// one network call is made per contention window. The call runs on its
    /// own task, so dropping a caller's future never aborts it.
    pub async fn renew(&self) -> Result<BearerToken> {
        let renewal = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) if pending.renewal.peek().is_none() => {
                    tracing::debug!("Joining in-flight renewal");
                    pending.renewal.clone()
                }
                _ => self.inner.spawn_renewal(&mut slot),
            }
        };

        renewal.await
    }

    /// Query session metadata and remember the subject identifier
    pub async fn introspect(&self) -> Result<SessionInfo> {
        let session = self.session().ok_or(SyncError::NotAuthenticated)?;
        let info =
            exchange::introspect(&self.inner.client, &self.inner.auth_base_url, &session.session_id)
                .await?;

        let _guard = self.inner.lock_writes();
        if let Some(mut current) = self.inner.load_session() {
            if current.session_id == session.session_id
                && current.user_id.as_deref() != Some(info.session.user_id.as_str())
            {
                current.user_id = Some(info.session.user_id.clone());
                self.inner.store.set(&current)?;
            }
        }

        Ok(info)
    }

    /// Clear the stored session; never fails
    pub fn sign_out(&self) {
        let _guard = self.inner.lock_writes();
        match self.inner.store.clear() {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::error!("Failed to clear stored session: {}", e),
        }
    }
}

#[async_trait]
impl CredentialRenewer for TokenManager {
    async fn renew(&self) -> Result<BearerToken> {
        TokenManager::renew(self).await
    }
}

impl Inner {
    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load_session(&self) -> Option<Session> {
        match self.store.get() {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to read stored session: {}", e);
                None
            }
        }
    }

    /// Start a renewal task and publish it in `slot`
    fn spawn_renewal(self: &Arc<Self>, slot: &mut Option<InFlight>) -> SharedRenewal {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome = inner.renew_now().await;

            let mut slot = inner.in_flight.lock().await;
            if slot.as_ref().is_some_and(|f| f.generation == generation) {
                *slot = None;
            }
            outcome
        });

        let renewal = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(SyncError::Network(format!("renewal task failed: {}", e))))
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            generation,
            renewal: renewal.clone(),
        });
        renewal
    }

    /// One renewal network call plus persistence
    async fn renew_now(&self) -> Result<BearerToken> {
        let session = self.load_session().ok_or(SyncError::NotAuthenticated)?;

        tracing::debug!("Refreshing bearer credential...");
        let token =
            exchange::issue_bearer(&self.client, &self.auth_base_url, &session.session_id).await?;

        let _guard = self.lock_writes();
        match self.load_session() {
            // Signed out or signed in elsewhere while the call was running
            Some(current) if current.session_id == session.session_id => {
                self.store.set(&current.with_bearer(token.clone()))?;
                tracing::info!("Bearer credential refreshed");
                Ok(token)
            }
            _ => {
                tracing::warn!("Session changed during renewal, discarding credential");
                Err(SyncError::NotAuthenticated)
            }
        }
    }
}
