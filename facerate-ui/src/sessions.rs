//! Per-visitor sessions on top of `tower-sessions`
//!
//! The visitor's [`SessionContext`] lives in the session record under
//! [`SESSION_CONTEXT_KEY`]; only authenticated contexts are ever written.
//! Records are held in memory and expire after the configured idle time.
//!
//! Ids deleted by logout (or replaced by an id cycle on login) are revoked:
//! a request for the same cookie that was already in flight cannot save the
//! record back afterwards.

use async_trait::async_trait;
use facerate_common::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tower_sessions::cookie::time;
use tower_sessions::session::{self, Id, Record};
use tower_sessions::{session_store, Expiry, MemoryStore, Session, SessionManagerLayer, SessionStore};
use tracing::{debug, warn};

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "facerate_session";

/// Key of the [`SessionContext`] inside the session record
pub const SESSION_CONTEXT_KEY: &str = "facerate.context";

/// In-memory session store that refuses to resurrect deleted ids
#[derive(Debug, Clone)]
pub struct VisitorStore {
    records: MemoryStore,
    revoked: Arc<Mutex<HashMap<Id, Instant>>>,
    /// How long a deleted id stays revoked; past the idle timeout any saved
    /// copy would have expired anyway
    revoke_for: Duration,
}

impl VisitorStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            records: MemoryStore::default(),
            revoked: Arc::new(Mutex::new(HashMap::new())),
            revoke_for: idle_timeout,
        }
    }

    async fn is_revoked(&self, id: &Id) -> bool {
        self.revoked.lock().await.contains_key(id)
    }

    async fn revoke(&self, id: Id) {
        let now = Instant::now();
        let mut revoked = self.revoked.lock().await;
        revoked.retain(|_, at| now.duration_since(*at) < self.revoke_for);
        revoked.insert(id, now);
    }
}

#[async_trait]
impl SessionStore for VisitorStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.records.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        if self.is_revoked(&record.id).await {
            debug!("Dropping save for revoked session {}", record.id);
            return Ok(());
        }
        self.records.save(record).await
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        self.records.load(id).await
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.revoke(*id).await;
        self.records.delete(id).await
    }
}

/// Session middleware: HttpOnly cookie, plain HTTP allowed (the service is
/// reached by address on the local network), expiry on inactivity
pub fn session_layer(idle_timeout: Duration) -> SessionManagerLayer<VisitorStore> {
    let idle = time::Duration::seconds(idle_timeout.as_secs().try_into().unwrap_or(i64::MAX));

    SessionManagerLayer::new(VisitorStore::new(idle_timeout))
        .with_name(SESSION_COOKIE)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(idle))
}

/// The visitor's context; anonymous when there is none (or it can't be read)
pub async fn visitor_context(session: &Session) -> SessionContext {
    match session.get::<SessionContext>(SESSION_CONTEXT_KEY).await {
        Ok(context) => context.unwrap_or_default(),
        Err(e) => {
            warn!("Unreadable session {:?}, continuing anonymously: {}", session.id(), e);
            SessionContext::anonymous()
        }
    }
}

/// Write the context an action produced back to the session.
///
/// A change of user gets a fresh session id; a visitor who is anonymous
/// again has the whole session flushed (record deleted, cookie expired).
pub async fn remember(
    session: &Session,
    before: &SessionContext,
    after: &SessionContext,
) -> Result<(), session::Error> {
    if after.is_authenticated() {
        if before.user != after.user {
            session.cycle_id().await?;
        }
        if before != after {
            session.insert(SESSION_CONTEXT_KEY, after).await?;
        }
    } else if before.is_authenticated() {
        session.flush().await?;
    }
    Ok(())
}
