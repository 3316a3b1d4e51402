//! Element type inference for collections declared with a dynamic element
//! type.
//!
//! Each element resolved its own concrete type during decoding. The
//! collection's element type is the unification of the declared type with
//! every element type, taken in order; the first element that cannot be
//! unified with the running result is reported.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ErrorKind, PathError};
use crate::model::{Path, PathStep, Type, Value, unify};

/// Which collection is being reconciled; only affects error messages and the
/// path step naming the offending element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collection {
    List,
    Set,
}

impl Collection {
    fn name(self) -> &'static str {
        match self {
            Collection::List => "list",
            Collection::Set => "set",
        }
    }

    fn step(self, index: usize, elem: &Value) -> PathStep {
        match self {
            Collection::List => PathStep::Index(index),
            Collection::Set => PathStep::Key(elem.clone()),
        }
    }
}

fn unreconcilable(
    path: &Path,
    step: PathStep,
    collection: &str,
    running: &Type,
    found: &Type,
) -> PathError {
    let mut err = path.error(
        ErrorKind::UnreconcilableElements,
        format!("inconsistent {collection} element types ({running} vs. {found})"),
    );
    err.path.push(step);
    debug!(path = %err.path_string(), "unreconcilable collection elements");
    err
}

/// Unifies `declared` with the type of every element, in order.
///
/// Fails at the first element whose type disagrees with the running result.
pub(crate) fn unify_elements(
    path: &Path,
    collection: Collection,
    declared: &Type,
    elems: &[Value],
) -> Result<Type, PathError> {
    let mut running = declared.clone();
    for (i, elem) in elems.iter().enumerate() {
        running = match unify(&running, elem.ty()) {
            Some(ty) => ty,
            None => {
                return Err(unreconcilable(
                    path,
                    collection.step(i, elem),
                    collection.name(),
                    &running,
                    elem.ty(),
                ));
            }
        };
    }
    Ok(running)
}

/// Unifies `declared` with the type of every map entry, in key order.
pub(crate) fn unify_entries(
    path: &Path,
    declared: &Type,
    entries: &BTreeMap<String, Value>,
) -> Result<Type, PathError> {
    let mut running = declared.clone();
    for (key, value) in entries {
        running = match unify(&running, value.ty()) {
            Some(ty) => ty,
            None => {
                return Err(unreconcilable(
                    path,
                    PathStep::Key(Value::string(key.as_str())),
                    "map",
                    &running,
                    value.ty(),
                ));
            }
        };
    }
    Ok(running)
}

/// Resolves the element type of a list or set and retags its elements.
///
/// `elems` must be non-empty; an empty collection keeps its declared type.
pub(crate) fn reconcile_elements(
    path: &Path,
    collection: Collection,
    declared: &Type,
    elems: Vec<Value>,
) -> Result<(Type, Vec<Value>), PathError> {
    let running = unify_elements(path, collection, declared, &elems)?;
    let elems = elems.into_iter().map(|v| v.conform(&running)).collect();
    Ok((running, elems))
}

/// Resolves the element type of a map and retags its entries.
pub(crate) fn reconcile_entries(
    path: &Path,
    declared: &Type,
    entries: BTreeMap<String, Value>,
) -> Result<(Type, BTreeMap<String, Value>), PathError> {
    let running = unify_entries(path, declared, &entries)?;
    let entries = entries
        .into_iter()
        .map(|(k, v)| (k, v.conform(&running)))
        .collect();
    Ok((running, entries))
}
