//! Entity lifecycle listeners
//!
//! Listeners are attached to an entity type and called by the session around
//! persist and remove.

use std::fmt::Debug;

/// Callbacks fired around entity lifecycle transitions
///
/// Every method has an empty default so a listener only overrides what it
/// observes.
pub trait EntityListener<E: ?Sized> {
    /// Before the INSERT is issued
    fn pre_persist(&self, _entity: &E) {}

    /// After the INSERT succeeded and generated ids are assigned
    fn post_persist(&self, _entity: &E) {}

    /// Before the DELETE is issued
    fn pre_remove(&self, _entity: &E) {}
}

/// Logs every pre-persist with the entity's debug representation
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl<E: Debug + ?Sized> EntityListener<E> for LoggingListener {
    fn pre_persist(&self, entity: &E) {
        tracing::info!(listener = "LoggingListener", "prePersist obj={:?}", entity);
    }
}
