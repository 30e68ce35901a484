//! Connection lifecycle shared by the document store and the cache.
//!
//! Each store owns one [`ConnectionCell`]. The cell keeps a single private state value in a
//! `tokio::sync::watch` channel; `is_alive()`, the readiness future and handle access all read
//! that one value, and only the cell's own transition methods write it.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──probe ok──▶ Connected ◀──heartbeat ok──┐
//!                             ▲ │                       │                       │
//!                     retry   │ └──error/timeout──▶ Failed ◀──transport error───┘
//!                             └──────────────────────┘
//! ```
//!
//! A store whose setup failed has no handle to probe, so a retry task calls the connector
//! again with backoff. A store that lost a working connection keeps its handle and the
//! heartbeat probes it until the server answers again.
//!
//! Operations never wait for a connection. Before setup completes they fail with
//! `StoreError::NotReady`; once the store has failed they fail with `StoreError::Connection`.
//! Callers that need to wait await [`ConnectionCell::ready`] explicitly.

use crate::config::StoreTimeouts;
use crate::constants::RECONNECT_BACKOFF_CEILING;
use crate::error::{BackendError, StoreError, StoreResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Liveness probe every backend answers.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Round-trips to the server; succeeds only if the server answered.
    async fn ping(&self) -> Result<(), BackendError>;
}

/// Observable connection state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

enum Link<B: ?Sized> {
    Disconnected,
    Connecting,
    Connected(Arc<B>),
    /// `handle` is kept when a working connection later failed, so the heartbeat can probe it
    /// and restore `Connected`.
    Failed {
        handle: Option<Arc<B>>,
        reason: String,
    },
}

impl<B: ?Sized> Link<B> {
    fn state(&self) -> ConnectionState {
        match self {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connecting => ConnectionState::Connecting,
            Link::Connected(_) => ConnectionState::Connected,
            Link::Failed { .. } => ConnectionState::Failed,
        }
    }
}

pub(crate) struct ConnectionCell<B: ?Sized> {
    store: &'static str,
    link: watch::Sender<Link<B>>,
    timeouts: StoreTimeouts,
}

impl<B> ConnectionCell<B>
where
    B: Probe + ?Sized + 'static,
{
    pub(crate) fn new(store: &'static str, timeouts: StoreTimeouts) -> Arc<Self> {
        let (link, _) = watch::channel(Link::Disconnected);
        Arc::new(Self {
            store,
            link,
            timeouts,
        })
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.link.borrow().state()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Starts connection setup in a background task and returns immediately.
    ///
    /// Setup is a call to `connector` followed by a liveness probe, both bounded by the
    /// connect timeout. If setup fails, the connector is retried in the background with a
    /// doubling delay (from the heartbeat interval up to [`RECONNECT_BACKOFF_CEILING`]) until
    /// one attempt succeeds. A connect requested while the store is already connecting or
    /// connected does not start a second attempt; the returned task then reports the outcome
    /// of the current one.
    pub(crate) fn connect<C, Fut>(self: &Arc<Self>, connector: C) -> JoinHandle<StoreResult<()>>
    where
        C: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<B>, BackendError>> + Send + 'static,
    {
        let begun = self.begin_attempt();

        let cell = Arc::clone(self);
        tokio::spawn(async move {
            if !begun {
                tracing::debug!(
                    "{} connect requested while {:?}; keeping current attempt",
                    cell.store,
                    cell.state()
                );
                return cell.ready().await;
            }
            let outcome = cell.establish(connector()).await;
            if outcome.is_err() {
                Self::spawn_retry(Arc::downgrade(&cell), Arc::new(connector));
            }
            outcome
        })
    }

    /// Moves `Disconnected` or a handle-less `Failed` to `Connecting`.
    fn begin_attempt(&self) -> bool {
        self.link.send_if_modified(|link| match link {
            Link::Disconnected | Link::Failed { handle: None, .. } => {
                *link = Link::Connecting;
                true
            }
            _ => false,
        })
    }

    async fn establish<Fut>(self: &Arc<Self>, connector: Fut) -> StoreResult<()>
    where
        Fut: Future<Output = Result<Arc<B>, BackendError>> + Send + 'static,
    {
        let attempt = async move {
            let handle = connector.await?;
            handle.ping().await?;
            Ok::<_, BackendError>(handle)
        };

        match tokio::time::timeout(self.timeouts.connect, attempt).await {
            Ok(Ok(handle)) => {
                self.link.send_replace(Link::Connected(handle));
                tracing::info!("Connected successfully to {}", self.store);
                Self::spawn_heartbeat(Arc::downgrade(self));
                Ok(())
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                tracing::error!("Failed to connect to {}: {}", self.store, reason);
                self.fail_setup(reason.clone());
                Err(StoreError::Connection {
                    store: self.store,
                    reason,
                })
            }
            Err(_) => {
                tracing::error!(
                    "Failed to connect to {}: no answer after {:?}",
                    self.store,
                    self.timeouts.connect
                );
                self.fail_setup(format!("no answer after {:?}", self.timeouts.connect));
                Err(StoreError::Timeout {
                    operation: "connect",
                    after: self.timeouts.connect,
                })
            }
        }
    }

    /// Retries setup until it succeeds, someone else starts an attempt, or the store is dropped.
    fn spawn_retry<C, Fut>(cell: Weak<Self>, connector: Arc<C>)
    where
        C: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<B>, BackendError>> + Send + 'static,
    {
        tokio::spawn(async move {
            let (mut delay, ceiling) = match cell.upgrade() {
                Some(cell) => (
                    cell.timeouts.heartbeat,
                    RECONNECT_BACKOFF_CEILING.max(cell.timeouts.heartbeat),
                ),
                None => return,
            };

            loop {
                tokio::time::sleep(delay).await;

                let Some(cell) = cell.upgrade() else {
                    return;
                };
                if !cell.begin_attempt() {
                    return;
                }
                tracing::info!("Retrying connection to {}", cell.store);
                if cell.establish(connector()).await.is_ok() {
                    return;
                }
                delay = (delay * 2).min(ceiling);
            }
        });
    }

    fn fail_setup(&self, reason: String) {
        self.link.send_replace(Link::Failed {
            handle: None,
            reason,
        });
    }

    fn spawn_heartbeat(cell: Weak<Self>) {
        tokio::spawn(async move {
            loop {
                let interval = match cell.upgrade() {
                    Some(cell) => cell.timeouts.heartbeat,
                    None => return,
                };
                tokio::time::sleep(interval).await;

                let Some(cell) = cell.upgrade() else {
                    return;
                };
                cell.heartbeat().await;
            }
        });
    }

    async fn heartbeat(&self) {
        let Some(handle) = self.probe_handle() else {
            return;
        };

        match tokio::time::timeout(self.timeouts.operation, handle.ping()).await {
            Ok(Ok(())) => self.mark_recovered(),
            Ok(Err(e)) => self.mark_failed(e.to_string()),
            Err(_) => self.mark_failed(format!(
                "heartbeat unanswered after {:?}",
                self.timeouts.operation
            )),
        }
    }

    fn probe_handle(&self) -> Option<Arc<B>> {
        match &*self.link.borrow() {
            Link::Connected(handle) => Some(Arc::clone(handle)),
            Link::Failed {
                handle: Some(handle),
                ..
            } => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Flips `Connected` to `Failed`. Called from every path that observes a transport error.
    pub(crate) fn mark_failed(&self, reason: String) {
        let logged = reason.clone();
        let flipped = self.link.send_if_modified(move |link| match link {
            Link::Connected(handle) => {
                let handle = Arc::clone(handle);
                *link = Link::Failed {
                    handle: Some(handle),
                    reason,
                };
                true
            }
            _ => false,
        });

        if flipped {
            tracing::error!("{} connection error: {}", self.store, logged);
        }
    }

    fn mark_recovered(&self) {
        let recovered = self.link.send_if_modified(|link| match link {
            Link::Failed {
                handle: Some(handle),
                ..
            } => {
                let handle = Arc::clone(handle);
                *link = Link::Connected(handle);
                true
            }
            _ => false,
        });

        if recovered {
            tracing::info!("Reconnected to {}", self.store);
        }
    }

    /// Resolves once setup has finished, successfully or not.
    pub(crate) async fn ready(&self) -> StoreResult<()> {
        let mut rx = self.link.subscribe();
        rx.wait_for(|link| matches!(link, Link::Connected(_) | Link::Failed { .. }))
            .await
            .map(|link| self.resolve(&link).map(|_| ()))
            .unwrap_or(Err(StoreError::NotReady(self.store)))
    }

    /// Returns the live handle or the reason there is none.
    pub(crate) fn handle(&self) -> StoreResult<Arc<B>> {
        self.resolve(&self.link.borrow())
    }

    fn resolve(&self, link: &Link<B>) -> StoreResult<Arc<B>> {
        match link {
            Link::Connected(handle) => Ok(Arc::clone(handle)),
            Link::Failed { reason, .. } => Err(StoreError::Connection {
                store: self.store,
                reason: reason.clone(),
            }),
            Link::Disconnected | Link::Connecting => Err(StoreError::NotReady(self.store)),
        }
    }

    /// Runs one backend call against the live handle, bounded by the operation timeout.
    ///
    /// The outer result carries not-ready and timeout; the inner one is the backend's own
    /// answer. A transport error in the inner result has already flipped the state to
    /// `Failed` by the time this returns.
    pub(crate) async fn run<T, C, Fut>(
        &self,
        operation: &'static str,
        call: C,
    ) -> StoreResult<Result<T, BackendError>>
    where
        C: FnOnce(Arc<B>) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let handle = self.handle()?;

        match tokio::time::timeout(self.timeouts.operation, call(handle)).await {
            Ok(Err(e)) if e.is_transport() => {
                self.mark_failed(e.to_string());
                Ok(Err(e))
            }
            Ok(outcome) => Ok(outcome),
            Err(_) => {
                tracing::warn!(
                    "{} {} timed out after {:?}",
                    self.store,
                    operation,
                    self.timeouts.operation
                );
                Err(StoreError::Timeout {
                    operation,
                    after: self.timeouts.operation,
                })
            }
        }
    }
}
