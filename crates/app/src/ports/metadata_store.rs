//! Metadata store port: persistence of per-thing metadata.

use std::collections::BTreeMap;
use std::future::Future;

use thinghub_domain::error::ThingError;
use thinghub_domain::id::ThingId;
use thinghub_domain::metadata::MetaEntry;

/// Every metadata entry of one thing, keyed by metadata key.
pub type MetaDocument = BTreeMap<String, MetaEntry>;

/// Loads and saves metadata documents, one per thing.
pub trait MetadataStore {
    /// Load the document stored for `id`; `None` when nothing was saved yet.
    fn load(
        &self,
        id: ThingId,
    ) -> impl Future<Output = Result<Option<MetaDocument>, ThingError>> + Send;

    /// Replace the document stored for `id`.
    fn save(
        &self,
        id: ThingId,
        document: MetaDocument,
    ) -> impl Future<Output = Result<(), ThingError>> + Send;
}

impl<T: MetadataStore + Send + Sync> MetadataStore for std::sync::Arc<T> {
    fn load(
        &self,
        id: ThingId,
    ) -> impl Future<Output = Result<Option<MetaDocument>, ThingError>> + Send {
        (**self).load(id)
    }

    fn save(
        &self,
        id: ThingId,
        document: MetaDocument,
    ) -> impl Future<Output = Result<(), ThingError>> + Send {
        (**self).save(id, document)
    }
}
