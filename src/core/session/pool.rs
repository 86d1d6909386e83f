use crate::core::link::Link;
use crate::core::session::session::Session;
use crate::domain::config::ControllerConfig;
use crate::infrastructure::serial::SerialLink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Manufacturer default controller address; multiple controllers left at
/// this address collide during field diagnostics.
pub const DEFAULT_REMOTE_ADDRESS: &str = "192.168.100.1";

type LinkFactory = dyn Fn() -> Arc<dyn Link> + Send + Sync;

/// Registry of sessions keyed by caller-supplied identifier.
///
/// Owned by the process's composition root and passed by reference; one pool
/// per process is usage, not a hidden global. At most one session exists per
/// identifier, and an identifier resolves to the same session instance for
/// its whole pool lifetime.
pub struct SessionPool {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    link_factory: Box<LinkFactory>,
}

impl SessionPool {
    /// Create a pool that builds each session's link with the given factory
    pub fn new<F>(link_factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Link> + Send + Sync + 'static,
    {
        Self {
            sessions: RwLock::new(HashMap::new()),
            link_factory: Box::new(link_factory),
        }
    }

    /// Pool backed by serial links
    pub fn serial() -> Self {
        Self::new(|| Arc::new(SerialLink::new()) as Arc<dyn Link>)
    }

    /// Return the session for `id`, creating it when absent.
    ///
    /// Creation parameters are authoritative only the first time; on an
    /// existing entry the supplied remote address is ignored. Never fails
    /// with a duplicate-key error.
    pub async fn get_or_create(&self, id: &str, remote_address: &str) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(id) {
            return Arc::clone(existing);
        }

        let session = Arc::new(Session::new(remote_address, (self.link_factory)()));
        sessions.insert(id.to_string(), Arc::clone(&session));
        info!("Created session '{}' for controller at {}", id, remote_address);
        session
    }

    /// Create or fetch a session from a controller config entry, applying
    /// its link settings and framing mode on first creation
    pub async fn get_or_create_from(&self, config: &ControllerConfig) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&config.id) {
            return Arc::clone(existing);
        }

        let session = Arc::new(Session::new(
            config.remote_address.clone(),
            (self.link_factory)(),
        ));
        session.configure_link(config.link.clone()).await;
        session.set_transmission_mode(config.transmission);
        sessions.insert(config.id.clone(), Arc::clone(&session));
        info!(
            "Created session '{}' for controller at {}",
            config.id, config.remote_address
        );
        session
    }

    /// Lookup without creation
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(Arc::clone)
    }

    /// Disconnect, dispose and drop the session under `id`; silent no-op
    /// when absent
    pub async fn remove(&self, id: &str) {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(id)
        };

        if let Some(session) = removed {
            session.disconnect().await;
            session.dispose().await;
            info!("Removed session '{}'", id);
        } else {
            debug!("Remove of unknown session '{}' ignored", id);
        }
    }

    /// Disconnect and dispose every session, then empty the pool
    pub async fn clear(&self) {
        let drained: Vec<(String, Arc<Session>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        for (id, session) in &drained {
            session.disconnect().await;
            session.dispose().await;
            debug!("Disposed session '{}'", id);
        }

        if !drained.is_empty() {
            info!("Cleared {} sessions from pool", drained.len());
        }
    }

    /// True when any pooled session is currently connected
    pub async fn has_any_connected(&self) -> bool {
        let sessions = self.sessions.read().await;
        sessions.values().any(|session| session.is_connected())
    }

    /// True when two or more sessions are connected at once and at least one
    /// of the connected sessions sits on the manufacturer default address
    pub async fn has_conflicting_default_address(&self) -> bool {
        let sessions = self.sessions.read().await;

        let mut connected = 0;
        let mut default_connected = false;
        for session in sessions.values() {
            if session.is_connected() {
                connected += 1;
                if session.remote_address() == DEFAULT_REMOTE_ADDRESS {
                    default_connected = true;
                }
                if connected > 1 && default_connected {
                    return true;
                }
            }
        }
        false
    }

    /// Number of pooled sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
