//! In-memory resource store

use crate::store::traits::{ResourceStore, StoreError, StoreResult};
use crate::store::{generate_scrape_id, ResourceHandle, ResourceMetadata, StoredResource};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local store backed by a locked map
pub struct MemoryStore {
    resources: RwLock<HashMap<String, StoredResource>>,
    ttl: chrono::Duration,
}

impl MemoryStore {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl ResourceStore for MemoryStore {
    fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    fn put_at(
        &self,
        content: Vec<u8>,
        metadata: ResourceMetadata,
        now: DateTime<Utc>,
    ) -> StoreResult<ResourceHandle> {
        let mut resources = self.resources.write().map_err(|_| StoreError::Poisoned)?;

        let mut scrape_id = generate_scrape_id();
        while resources.contains_key(&scrape_id) {
            scrape_id = generate_scrape_id();
        }

        let handle = ResourceHandle {
            scrape_id: scrape_id.clone(),
            scraped_at: now,
            expires_at: now + self.ttl,
        };

        resources.insert(
            scrape_id.clone(),
            StoredResource {
                scrape_id,
                content,
                metadata,
                scraped_at: handle.scraped_at,
                expires_at: handle.expires_at,
            },
        );

        Ok(handle)
    }

    fn get_at(&self, scrape_id: &str, now: DateTime<Utc>) -> StoreResult<StoredResource> {
        let resources = self.resources.read().map_err(|_| StoreError::Poisoned)?;
        match resources.get(scrape_id) {
            Some(resource) if resource.is_expired_at(now) => {
                Err(StoreError::Expired(scrape_id.to_string()))
            }
            Some(resource) => Ok(resource.clone()),
            None => Err(StoreError::NotFound(scrape_id.to_string())),
        }
    }

    fn expire(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut resources = self.resources.write().map_err(|_| StoreError::Poisoned)?;
        let before = resources.len();
        resources.retain(|_, resource| !resource.is_expired_at(now));
        Ok(before - resources.len())
    }

    fn len(&self) -> StoreResult<usize> {
        let resources = self.resources.read().map_err(|_| StoreError::Poisoned)?;
        Ok(resources.len())
    }
}
