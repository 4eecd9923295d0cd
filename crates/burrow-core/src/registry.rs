//! Process-wide marshaller registry
//!
//! The engine stores raw bytes; storages marshal through the trio of
//! functions registered for their record type. Registration happens at
//! storage construction and is enforced to be single per record type:
//! installing the same trio again is a no-op, installing a different trio
//! for an already-registered type is an error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::error::{Result, StoreError};
use crate::marshal::MarshalFns;

fn traits() -> &'static RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
    static TRAITS: OnceLock<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> = OnceLock::new();
    TRAITS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Install the marshaller trio for record type `E`.
///
/// Idempotent for an identical trio; a conflicting trio for a type that is
/// already registered is rejected.
pub fn register<E: 'static>(fns: MarshalFns<E>) -> Result<()> {
    let mut map = traits()
        .write()
        .map_err(|_| StoreError::Registry("marshaller registry poisoned".into()))?;

    match map.get(&TypeId::of::<E>()) {
        Some(existing) => {
            let existing = existing
                .downcast_ref::<MarshalFns<E>>()
                .ok_or_else(|| StoreError::Registry("marshaller registry type mismatch".into()))?;
            if existing.same_fns(&fns) {
                Ok(())
            } else {
                Err(StoreError::Registry(format!(
                    "conflicting marshaller for record type '{}'",
                    std::any::type_name::<E>()
                )))
            }
        }
        None => {
            map.insert(TypeId::of::<E>(), Box::new(fns));
            Ok(())
        }
    }
}

/// Look up the marshaller trio registered for record type `E`.
pub fn lookup<E: 'static>() -> Result<MarshalFns<E>> {
    let map = traits()
        .read()
        .map_err(|_| StoreError::Registry("marshaller registry poisoned".into()))?;

    map.get(&TypeId::of::<E>())
        .and_then(|fns| fns.downcast_ref::<MarshalFns<E>>())
        .copied()
        .ok_or_else(|| {
            StoreError::Registry(format!(
                "no marshaller registered for record type '{}'",
                std::any::type_name::<E>()
            ))
        })
}
