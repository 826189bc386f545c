//! Render surface primitive: the live object set the renderer paints.
//!
//! The real surface (bitmap painting, hit-testing) belongs to the host.
//! This module fixes the boundary the sync engine talks to and provides
//! [`MemorySurface`], a headless implementation used by the demo binary
//! and the tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shapes::{ObjectId, Shape};

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Object-level operations a render surface accepts.
pub trait RenderSurface {
    /// Current render object for `id`, if any.
    fn object(&self, id: &str) -> Option<&Shape>;

    /// Ids of every live render object.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Add a new object or replace the one with the same id.
    fn add_or_update(&mut self, shape: Shape);

    /// Remove an object. Unknown ids are ignored.
    fn remove(&mut self, id: &str);

    /// Remove every object.
    fn clear(&mut self);

    /// Change the drawable area.
    fn resize(&mut self, width: f64, height: f64);
}

/// Headless surface keeping objects in a map.
#[derive(Debug, Default)]
pub struct MemorySurface {
    objects: HashMap<ObjectId, Shape>,
    width: f64,
    height: f64,
    /// Number of object-level mutations applied, used to observe redraws.
    redraws: u64,
}

impl MemorySurface {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { objects: HashMap::new(), width, height, redraws: 0 }
    }

    /// Objects sorted by id, for deterministic inspection.
    #[must_use]
    pub fn objects(&self) -> Vec<&Shape> {
        let mut objs: Vec<&Shape> = self.objects.values().collect();
        objs.sort_by(|a, b| a.object_id.cmp(&b.object_id));
        objs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl RenderSurface for MemorySurface {
    fn object(&self, id: &str) -> Option<&Shape> {
        self.objects.get(id)
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().cloned().collect()
    }

    fn add_or_update(&mut self, shape: Shape) {
        self.objects.insert(shape.object_id.clone(), shape);
        self.redraws += 1;
    }

    fn remove(&mut self, id: &str) {
        if self.objects.remove(id).is_some() {
            self.redraws += 1;
        }
    }

    fn clear(&mut self) {
        if !self.objects.is_empty() {
            self.objects.clear();
            self.redraws += 1;
        }
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }
}
