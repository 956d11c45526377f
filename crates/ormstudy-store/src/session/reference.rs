//! Lazily loaded entity references

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::mapping::Entity;
use crate::session::SessionTx;
use std::cell::OnceCell;

/// A reference that knows only its id until first accessed
///
/// Creating one never touches the database; the row is read on the first
/// call to `get` and kept for later calls.
pub struct EntityRef<'t, 's, E: Entity> {
    tx: &'t SessionTx<'s>,
    id: E::Id,
    loaded: OnceCell<E>,
}

impl<'t, 's, E: Entity> EntityRef<'t, 's, E> {
    pub(crate) fn new(tx: &'t SessionTx<'s>, id: E::Id) -> Self {
        Self {
            tx,
            id,
            loaded: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &E::Id {
        &self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Load the entity on first use
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has this id.
    pub fn get(&self) -> Result<&E> {
        if let Some(entity) = self.loaded.get() {
            return Ok(entity);
        }
        let entity = self.tx.get::<E>(self.id.clone())?;
        tracing::debug!(
            entity = E::ENTITY_NAME,
            entity_id = %self.id,
            "reference initialized"
        );
        Ok(self.loaded.get_or_init(|| entity))
    }

    /// # Errors
    ///
    /// `NotFound` when the reference was never loaded and no row has this id.
    pub fn into_entity(self) -> Result<E> {
        match self.loaded.into_inner() {
            Some(entity) => Ok(entity),
            None => self.tx.get::<E>(self.id),
        }
    }
}
