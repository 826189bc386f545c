//! Shape store adapter — maps shape edits onto the shared map and
//! reconciles the render surface with it.
//!
//! DESIGN
//! ======
//! Two independent keyed collections: `objectId → stored record` in the
//! shared map and `objectId → render object` on the surface. Nothing holds
//! a reference from one to the other; [`materialize`] reconciles them and
//! runs whenever the shared map's content changes, local or remote.
//!
//! Every write is a whole-record replace. Any participant may write any
//! key, so the outcome is last-writer-wins per shape.
//!
//! ERROR HANDLING
//! ==============
//! Absent shapes, absent keys and already-empty maps are no-ops. A stored
//! record that fails to decode is skipped with a warning; it never stops
//! the rest of the reconcile.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::frame::ErrorCode;
use crate::store::SharedMap;
use crate::surface::RenderSurface;

/// Globally unique shape identifier (UUID string), immutable after creation.
pub type ObjectId = String;

/// Field carrying the id inside each stored record.
pub const OBJECT_ID_FIELD: &str = "objectId";

// =============================================================================
// TYPES
// =============================================================================

/// Shape types the canvas can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
    Text,
}

/// A render object as stored in the shared map. The record is opaque to the
/// sync engine; it only has to survive serialize → store → deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "objectId")]
    pub object_id: ObjectId,
    pub kind: ShapeKind,
    /// Left edge of the bounding box.
    pub x: f64,
    /// Top edge of the bounding box.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Open-ended style properties (fill, stroke, text, line endpoints).
    #[serde(default)]
    pub props: Value,
}

impl Shape {
    /// Create a shape with a fresh id.
    #[must_use]
    pub fn new(kind: ShapeKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            object_id: Uuid::new_v4().to_string(),
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            props: serde_json::json!({}),
        }
    }

    #[must_use]
    pub fn with_props(mut self, props: Value) -> Self {
        self.props = props;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("shape {id} could not be encoded: {source}")]
    Encode {
        id: ObjectId,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {key} could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ErrorCode for ShapeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode { .. } => "E_SHAPE_ENCODE",
            Self::Decode { .. } => "E_SHAPE_DECODE",
        }
    }
}

/// What one [`materialize`] pass changed on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
}

impl MaterializeStats {
    /// True if the pass touched the surface at all.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.added + self.updated + self.removed > 0
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Serialize a shape into its stored record.
///
/// # Errors
///
/// Returns `Encode` if the shape cannot be represented as JSON.
pub fn encode(shape: &Shape) -> Result<Value, ShapeError> {
    let mut record =
        serde_json::to_value(shape).map_err(|source| ShapeError::Encode { id: shape.object_id.clone(), source })?;
    if let Some(fields) = record.as_object_mut() {
        fields.insert(OBJECT_ID_FIELD.into(), Value::String(shape.object_id.clone()));
    }
    Ok(record)
}

/// Deserialize a stored record. The store key is the identity: a record
/// whose embedded id disagrees with its key is coerced to the key.
///
/// # Errors
///
/// Returns `Decode` if the record is not a valid shape.
pub fn decode(key: &str, record: &Value) -> Result<Shape, ShapeError> {
    let mut shape: Shape =
        serde_json::from_value(record.clone()).map_err(|source| ShapeError::Decode { key: key.to_owned(), source })?;
    if shape.object_id != key {
        debug!(key, embedded = %shape.object_id, "record id disagrees with key; using key");
        shape.object_id = key.to_owned();
    }
    Ok(shape)
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Store the full serialized form of `shape` under its id.
///
/// Returns `false` when there was nothing to store.
pub fn upsert(map: &mut impl SharedMap, shape: Option<&Shape>) -> bool {
    let Some(shape) = shape else {
        return false;
    };
    match encode(shape) {
        Ok(record) => {
            map.set(&shape.object_id, record);
            true
        }
        Err(e) => {
            warn!(code = e.error_code(), error = %e, "shape not stored");
            false
        }
    }
}

/// Remove one shape. Absent ids are ignored.
pub fn delete_one(map: &mut impl SharedMap, object_id: &str) {
    map.delete(object_id);
}

/// Remove every shape. Returns whether the map is now empty.
pub fn delete_all(map: &mut impl SharedMap) -> bool {
    if map.is_empty() {
        return true;
    }
    for key in map.keys() {
        map.delete(&key);
    }
    map.is_empty()
}

// =============================================================================
// RECONCILE
// =============================================================================

/// Make the surface's live objects match `records` exactly.
///
/// Each record becomes (or updates) one render object; surface objects with
/// no record are removed. Objects already equal to their record are left
/// alone, so a second pass over unchanged input touches nothing.
pub fn materialize<'a>(
    records: impl IntoIterator<Item = (&'a str, &'a Value)>,
    surface: &mut impl RenderSurface,
) -> MaterializeStats {
    let mut stats = MaterializeStats::default();
    let mut live = HashSet::new();

    for (key, record) in records {
        live.insert(key.to_owned());
        let shape = match decode(key, record) {
            Ok(shape) => shape,
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "skipping undecodable record");
                stats.skipped += 1;
                continue;
            }
        };
        match surface.object(key) {
            Some(current) if *current == shape => {}
            Some(_) => {
                surface.add_or_update(shape);
                stats.updated += 1;
            }
            None => {
                surface.add_or_update(shape);
                stats.added += 1;
            }
        }
    }

    for id in surface.object_ids() {
        if !live.contains(&id) {
            surface.remove(&id);
            stats.removed += 1;
        }
    }

    stats
}

#[cfg(test)]
#[path = "shapes_test.rs"]
mod tests;
