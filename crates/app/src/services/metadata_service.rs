//! Metadata service: restores and persists thing metadata through the store.

use thinghub_domain::error::{InvariantError, ThingError};
use thinghub_domain::id::ThingId;
use thinghub_domain::metadata::Metadata;
use thinghub_domain::thing::Thing;

use crate::ports::MetadataStore;

/// Application service moving metadata between a thing and its store.
pub struct MetadataService<S> {
    store: S,
}

impl<S: MetadataStore> MetadataService<S> {
    /// Create a new service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Merge the persisted document of a bound thing into its metadata.
    ///
    /// Entries older than what the thing already holds are ignored.
    /// Returns the keys that changed.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Invariant`] if the thing has no identity yet,
    /// or a storage error propagated from the store.
    pub async fn restore(&self, thing: &mut Thing) -> Result<Vec<String>, ThingError> {
        let id = thing
            .identity()
            .map(|identity| identity.id)
            .ok_or_else(|| InvariantError(format!("thing {} is not bound", thing.code())))?;

        match self.store.load(id).await? {
            Some(document) => {
                let changed = thing.restore_meta(document);
                tracing::debug!(%id, count = changed.len(), "metadata restored");
                Ok(changed)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Save every applied entry of `metadata` as the document of `id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn persist(&self, id: ThingId, metadata: &Metadata) -> Result<(), ThingError> {
        self.store.save(id, metadata.entries().clone()).await
    }
}
