// crates/substrate-adapters/src/factory.rs
// ============================================================================
// Module: Adapter Factory
// Description: Materializes a typed ObjectStore adapter from a resolved ResourceRoute.
// Purpose: The single place a `ResourceRoute` becomes a live, policy-checked adapter.
// Dependencies: substrate-core, aws-config, aws-sdk-s3
// ============================================================================

//! ## Overview
//! `AdapterFactory` covers the one concrete durable cloud backend this crate
//! ships: the S3-compatible object store. Other resource kinds
//! (`event_stream`, `blackboard_store`, `tabular_store`, `memory_store`,
//! `analytics_store`, `routing_registry`) are durable via the SQLite
//! WAL-mode engine in `substrate-store-sqlite`, which applies the same
//! [`ensure_backend_allowed`] guard and [`AdapterCache`] pattern defined
//! here against its own backend set. Every resolver, regardless of crate,
//! follows this shape: guard first, then cache, then construct.

use std::sync::Arc;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use substrate_core::AdapterError;
use substrate_core::Mode;
use substrate_core::ObjectStore;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;

use crate::backend_class::ensure_backend_allowed;
use crate::cache::AdapterCache;
use crate::lab::filesystem::FilesystemObjectStore;
use crate::lab::in_memory::InMemoryObjectStore;
use crate::s3::S3ObjectStore;

/// A cached, shared handle to a materialized `ObjectStore` adapter.
pub type ObjectStoreHandle = Arc<dyn ObjectStore>;

/// Materializes `ObjectStore` adapters from resolved routes, enforcing the
/// backend-class guard and caching per `(route.id, route.updated_at)`.
pub struct AdapterFactory {
    lab_root: std::path::PathBuf,
    cache: AdapterCache<ObjectStoreHandle>,
}

impl AdapterFactory {
    /// Creates a factory whose `lab`-mode filesystem backend is rooted at `lab_root`.
    #[must_use]
    pub fn new(lab_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            lab_root: lab_root.into(),
            cache: AdapterCache::new(),
        }
    }

    /// Resolves `route` into a live `ObjectStore` adapter.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Invalid`] (wrapping the backend-class guard
    /// failure) when `route.backend_type` is forbidden for `route`'s mode
    /// context, and [`AdapterError::Unavailable`] when construction fails.
    pub fn resolve_object_store(&self, route: &ResourceRoute, mode: Mode) -> Result<ObjectStoreHandle, AdapterError> {
        ensure_backend_allowed(mode, ResourceKind::ObjectStore, &route.backend_type)
            .map_err(|err| AdapterError::Invalid(err.to_string()))?;
        let cached = self
            .cache
            .get_or_build(&route.id, route.updated_at, || self.build_object_store(route))?;
        Ok(Arc::clone(&*cached))
    }

    fn build_object_store(&self, route: &ResourceRoute) -> Result<ObjectStoreHandle, AdapterError> {
        let prefix = format!("{}/{}", route.tenant_id, route.env.as_str());
        match route.backend_type.as_str() {
            "s3" => {
                let bucket = route
                    .config
                    .get("bucket")
                    .ok_or_else(|| AdapterError::Invalid("s3 route missing `bucket` config key".to_owned()))?;
                let client = build_s3_client(route.config.get("region").map(String::as_str))?;
                let store = S3ObjectStore::new(client, bucket.clone(), prefix)?;
                Ok(Arc::new(store) as ObjectStoreHandle)
            }
            "filesystem" => {
                let store = FilesystemObjectStore::new(self.lab_root.join(prefix))?;
                Ok(Arc::new(store) as ObjectStoreHandle)
            }
            "in_memory" => Ok(Arc::new(InMemoryObjectStore::new()) as ObjectStoreHandle),
            other => Err(AdapterError::Invalid(format!("unsupported object store backend_type: {other}"))),
        }
    }
}

fn build_s3_client(region: Option<&str>) -> Result<Client, AdapterError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| AdapterError::Unavailable(format!("failed to start s3 config runtime: {err}")))?;
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_owned()));
    }
    let config = runtime.block_on(loader.load());
    Ok(Client::new(&config))
}
