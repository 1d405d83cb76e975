// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared reconciliation state.
//!
//! Maps service identity keys to the last descriptor that was successfully
//! written to the provider. The map lives behind one reader/writer lock and
//! is only reachable through the methods below:
//!
//! - the reconciler diffs under [`StateStore::read`] and writes one entry at a
//!   time with [`StateStore::commit`] and [`StateStore::retain_keys`]
//! - the pruner takes [`StateStore::prune_guard`], which holds the write lock
//!   for the whole prune but only exposes lookups
//!
//! State starts empty and is never persisted. Until the reconciler has
//! applied one complete inventory the store is not synced, and an empty map
//! says nothing about which services are live.

use crate::service::ServiceDescriptor;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type ServiceMap = HashMap<String, ServiceDescriptor>;

/// Handle to the shared state; cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    inner: Arc<RwLock<ServiceMap>>,
    synced: Arc<AtomicBool>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the read lock for diffing.
    pub async fn read(&self) -> StateView<'_> {
        StateView {
            guard: self.inner.read().await,
        }
    }

    /// Record a descriptor as applied, replacing any previous entry.
    pub async fn commit(&self, descriptor: ServiceDescriptor) {
        let key = descriptor.identity_key();
        let mut services = self.inner.write().await;
        debug!(service = %key, "Committing service to state");
        services.insert(key, descriptor);
    }

    /// Drop every entry whose key is not in `live`.
    ///
    /// # Returns
    ///
    /// The removed keys.
    pub async fn retain_keys(&self, live: &HashSet<String>) -> Vec<String> {
        let mut services = self.inner.write().await;
        let removed: Vec<String> = services
            .keys()
            .filter(|key| !live.contains(*key))
            .cloned()
            .collect();
        for key in &removed {
            services.remove(key);
        }
        removed
    }

    /// Mark the state as holding one complete inventory.
    pub fn mark_synced(&self) {
        if !self.synced.swap(true, Ordering::AcqRel) {
            debug!("State synced with the cluster inventory");
        }
    }

    /// Returns true once an inventory has been fully reconciled.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Take the write lock for the duration of a prune.
    ///
    /// Updates block until the guard is dropped, so orphan decisions see one
    /// fixed snapshot.
    pub async fn prune_guard(&self) -> PruneGuard<'_> {
        let guard = self.inner.write().await;
        PruneGuard {
            guard,
            synced: self.is_synced(),
        }
    }

    /// Number of tracked services.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Copy of the current map.
    pub async fn snapshot(&self) -> HashMap<String, ServiceDescriptor> {
        self.inner.read().await.clone()
    }
}

/// Read-locked view used while diffing.
pub struct StateView<'a> {
    guard: RwLockReadGuard<'a, ServiceMap>,
}

impl StateView<'_> {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ServiceDescriptor> {
        self.guard.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guard.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

/// Exclusive lock held by the pruner; lookups only.
pub struct PruneGuard<'a> {
    guard: RwLockWriteGuard<'a, ServiceMap>,
    synced: bool,
}

impl PruneGuard<'_> {
    /// Whether the guarded map reflects a reconciled inventory.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Returns true if the service is live.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.guard.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guard.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
