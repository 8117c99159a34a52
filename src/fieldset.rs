//! Field-set resolution over a resource's static mapping table.

use std::collections::HashSet;

use crate::{FieldDescriptor, Resource};

/// Returns the attribute names a resource exposes, in declaration order.
pub fn declared_fields<R: Resource>() -> Vec<&'static str> {
    logical_names(R::FIELDS)
}

/// Attribute names of `fields`, in declaration order.
pub fn logical_names(fields: &[FieldDescriptor]) -> Vec<&'static str> {
    fields.iter().map(|field| field.logical_name).collect()
}

/// Finds the descriptor declared under `wire_key`.
///
/// Loading uses this to sort undeclared keys into `unknown_fields`.
pub fn find_by_wire_key<'a>(
    fields: &'a [FieldDescriptor],
    wire_key: &str,
) -> Option<&'a FieldDescriptor> {
    fields.iter().find(|field| field.wire_key == wire_key)
}

/// Returns the first wire key declared more than once, if any.
///
/// Every mapping table must pass this check; the models run it in tests.
pub fn duplicate_wire_key(fields: &[FieldDescriptor]) -> Option<&'static str> {
    let mut seen = HashSet::with_capacity(fields.len());
    fields
        .iter()
        .map(|field| field.wire_key)
        .find(|key| !seen.insert(*key))
}
