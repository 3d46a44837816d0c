use std::sync::{Arc, Mutex, OnceLock, RwLock};

use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::adapter::{Adapter, IdentityAdapter};
use crate::core::config::MiddlewareConfig;
use crate::core::middleware::{EpicMiddleware, Inner};
use crate::core::slot::Slot;
use crate::epics::EpicRef;
use crate::events::Bus;
use crate::subscribers::Subscribe;

/// Builder for an [`EpicMiddleware`] with optional features.
pub struct EpicMiddlewareBuilder<A: Action, S, D = ()> {
    cfg: MiddlewareConfig,
    deps: Arc<D>,
    adapter: Arc<dyn Adapter<A>>,
    root: Option<EpicRef<A, S, D>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<A, S, D> EpicMiddlewareBuilder<A, S, D>
where
    A: Action,
    S: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    /// Creates a builder injecting `deps` into every epic.
    pub fn new(deps: D) -> Self {
        Self::with_shared_deps(Arc::new(deps))
    }

    /// Creates a builder from dependencies that are already shared.
    pub fn with_shared_deps(deps: Arc<D>) -> Self {
        Self {
            cfg: MiddlewareConfig::default(),
            deps,
            adapter: Arc::new(IdentityAdapter),
            root: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the middleware configuration.
    pub fn with_config(mut self, cfg: MiddlewareConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the stream adapter applied to every epic activation.
    pub fn with_adapter(mut self, adapter: impl Adapter<A>) -> Self {
        self.adapter = Arc::new(adapter);
        self
    }

    /// Starts `epic` as soon as the middleware is attached to a store.
    ///
    /// A construction failure then fails the attachment.
    pub fn with_root_epic(mut self, epic: EpicRef<A, S, D>) -> Self {
        self.root = Some(epic);
        self
    }

    /// Sets lifecycle event subscribers.
    ///
    /// Subscribers receive events through dedicated workers with bounded queues,
    /// started when the middleware is attached.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> EpicMiddleware<A, S, D> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        EpicMiddleware::from_inner(Inner {
            cfg: self.cfg,
            deps: self.deps,
            adapter: self.adapter,
            bus,
            subscribers: Mutex::new(self.subscribers),
            root: Mutex::new(self.root),
            attachment: OnceLock::new(),
            slot: Arc::new(RwLock::new(Slot::new())),
            shutdown: CancellationToken::new(),
        })
    }
}
