//! Scoped service registry.
//!
//! Services are described by [`Provide`] recipes, merged into [`Layers`] and
//! acquired together into a [`ServiceScope`]. The scope owns a read-only
//! [`ServiceRegistry`] that callers query by key type, and releases every
//! service (in reverse acquisition order) when dropped.
//!
//! ```ignore
//! let scope = Layers::new()
//!     .provide(calendar::from_env())
//!     .provide(messaging::from_env())
//!     .build(&EnvConfig)?;
//!
//! let calendar = scope.get::<Calendar>();
//! ```
//!
//! Acquisition is all-or-nothing: if one provider fails, the services
//! acquired before it are released and no registry is handed out.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use agendarelay_core::ConfigSource;
use tracing::{debug, warn};

use crate::adapter::{Adapter, AdapterKind};
use crate::error::ServiceError;

/// A service that can be torn down when its scope ends.
pub trait Scoped: Send + Sync + 'static {
    /// Releases held resources. Defaults to a no-op.
    fn release(&self) {}
}

impl<K: AdapterKind> Scoped for Adapter<K> {
    fn release(&self) {
        Adapter::release(self);
    }
}

/// Key under which one service is registered.
///
/// Implemented by marker types; the key type itself never holds data.
pub trait ServiceKey: 'static {
    /// Human-readable name used in logs and panics.
    const NAME: &'static str;

    /// The registered service.
    type Service: Scoped;
}

type AcquireFn<S> = Box<dyn FnOnce(&dyn ConfigSource) -> Result<S, ServiceError> + Send>;

/// A recipe producing the service for key `K`.
pub struct Provide<K: ServiceKey> {
    label: &'static str,
    acquire: AcquireFn<K::Service>,
}

impl<K: ServiceKey> Provide<K> {
    /// Creates a provider from an acquisition function.
    ///
    /// `label` describes the flavor (e.g. `"environment"`) for logs.
    pub fn new<F>(label: &'static str, acquire: F) -> Self
    where
        F: FnOnce(&dyn ConfigSource) -> Result<K::Service, ServiceError> + Send + 'static,
    {
        Self {
            label,
            acquire: Box::new(acquire),
        }
    }

    /// A provider handing out an already built service.
    pub fn value(service: K::Service) -> Self {
        Self::new("value", move |_| Ok(service))
    }

    /// Returns the flavor label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Runs the recipe.
    pub fn acquire(self, source: &dyn ConfigSource) -> Result<K::Service, ServiceError> {
        (self.acquire)(source)
    }
}

impl<K: ServiceKey> fmt::Debug for Provide<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provide")
            .field("key", &K::NAME)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

struct Entry {
    name: &'static str,
    service: Arc<dyn Any + Send + Sync>,
    release: Box<dyn Fn() + Send + Sync>,
}

type PendingEntry = Box<dyn FnOnce(&dyn ConfigSource) -> Result<Entry, ServiceError> + Send>;

/// A merged set of providers, acquired together by [`Layers::build`].
#[derive(Default)]
pub struct Layers {
    pending: Vec<(TypeId, &'static str, PendingEntry)>,
}

impl Layers {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider.
    pub fn provide<K: ServiceKey>(mut self, provider: Provide<K>) -> Self {
        let label = provider.label();
        let pending: PendingEntry = Box::new(move |source| {
            let service = Arc::new(provider.acquire(source)?);
            let handle = Arc::clone(&service);
            Ok(Entry {
                name: K::NAME,
                service,
                release: Box::new(move || handle.release()),
            })
        });
        debug!(key = K::NAME, provider = label, "provider registered");
        self.pending.push((TypeId::of::<K>(), K::NAME, pending));
        self
    }

    /// Appends every provider of `other`.
    pub fn merge(mut self, other: Layers) -> Self {
        self.pending.extend(other.pending);
        self
    }

    /// Returns the number of providers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no provider was added.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Acquires every provider in insertion order.
    ///
    /// # Errors
    ///
    /// Returns the first acquisition failure. Services acquired before the
    /// failing provider are released before returning.
    pub fn build(self, source: &dyn ConfigSource) -> Result<ServiceScope, ServiceError> {
        let mut scope = ServiceScope::default();
        for (key, name, acquire) in self.pending {
            match acquire(source) {
                Ok(entry) => {
                    debug!(key = name, "service acquired");
                    scope.insert(key, entry);
                }
                Err(err) => {
                    warn!(key = name, error = %err, "service acquisition failed");
                    // Dropping the partial scope releases what was acquired.
                    return Err(err);
                }
            }
        }
        Ok(scope)
    }
}

impl fmt::Debug for Layers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pending.iter().map(|(_, name, _)| name))
            .finish()
    }
}

/// Read-only lookup of acquired services by key.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl ServiceRegistry {
    /// Returns the service registered for `K`.
    ///
    /// # Panics
    ///
    /// Panics if no provider for `K` was part of the scope. Lookups only
    /// happen after a successful [`Layers::build`], so a missing key is a
    /// wiring bug rather than a runtime condition.
    pub fn get<K: ServiceKey>(&self) -> Arc<K::Service> {
        match self.try_get::<K>() {
            Some(service) => service,
            None => panic!("service `{}` was not provided to this scope", K::NAME),
        }
    }

    /// Returns the service registered for `K`, if any.
    pub fn try_get<K: ServiceKey>(&self) -> Option<Arc<K::Service>> {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| Arc::clone(&entry.service).downcast::<K::Service>().ok())
    }

    /// Returns `true` if `K` is registered.
    pub fn contains<K: ServiceKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    /// Returns the number of registered services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        f.debug_struct("ServiceRegistry")
            .field("services", &names)
            .finish()
    }
}

/// Owns a registry for the duration of a scope.
///
/// Dropping the scope releases every service in reverse acquisition order.
#[derive(Debug, Default)]
pub struct ServiceScope {
    registry: ServiceRegistry,
    order: Vec<TypeId>,
}

impl ServiceScope {
    fn insert(&mut self, key: TypeId, entry: Entry) {
        if let Some(previous) = self.registry.entries.insert(key, entry) {
            debug!(key = previous.name, "replacing service, releasing previous instance");
            (previous.release)();
            self.order.retain(|k| *k != key);
        }
        self.order.push(key);
    }

    /// Returns the registry.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Ends the scope, releasing every service.
    pub fn close(self) {
        drop(self);
    }
}

impl Deref for ServiceScope {
    type Target = ServiceRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        while let Some(key) = self.order.pop() {
            if let Some(entry) = self.registry.entries.remove(&key) {
                debug!(key = entry.name, "releasing service");
                (entry.release)();
            }
        }
    }
}
