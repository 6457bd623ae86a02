//! River valley carving.
//!
//! Hexes carrying enough drainage get carved below the tectonic height,
//! proportionally to their accumulated flow. A light neighbor relaxation
//! widens the valleys so single-hex trenches do not appear.

use std::cell::RefCell;
use std::rc::Rc;

use super::{RiverSampler, TerrainSampler};
use crate::cache::LruCache;
use crate::config::WorldConfig;
use crate::hex::Axial;

const CARVING_THRESHOLD: u32 = 180;
const CARVING_RANGE: f64 = 1440.0;
const MAX_CARVE_DEPTH: f64 = 0.08;
const TRUNK_MULTIPLIER: f64 = 1.15;
const CENTER_WEIGHT: f64 = 0.76;
const NEIGHBOR_WEIGHT: f64 = 0.24;

pub struct ErosionModel {
    config: Rc<WorldConfig>,
    terrain: Rc<dyn TerrainSampler>,
    rivers: Rc<dyn RiverSampler>,
    height_cache: RefCell<LruCache<Axial, f64>>,
    valley_cache: RefCell<LruCache<Axial, f64>>,
}

impl ErosionModel {
    pub fn new(
        config: Rc<WorldConfig>,
        terrain: Rc<dyn TerrainSampler>,
        rivers: Rc<dyn RiverSampler>,
    ) -> Self {
        let capacity = config.cache_capacity();
        Self {
            config,
            terrain,
            rivers,
            height_cache: RefCell::new(LruCache::new(capacity)),
            valley_cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Carve depth at a hex in [0, MAX_CARVE_DEPTH]. Zero below the
    /// drainage threshold.
    pub fn valley_strength(&self, q: i32, r: i32) -> f64 {
        let Some(at) = self.config.canonicalize(q, r) else {
            return 0.0;
        };
        if let Some(&depth) = self.valley_cache.borrow_mut().get(&at) {
            return depth;
        }

        let strength = self.rivers.river_strength_at(at.q, at.r);
        let depth = if strength <= CARVING_THRESHOLD {
            0.0
        } else {
            let normalized =
                (f64::from(strength - CARVING_THRESHOLD) / CARVING_RANGE).min(1.0);
            let mut depth = normalized * MAX_CARVE_DEPTH;
            // Trunk rivers keep flowing downstream and cut deeper.
            if self.rivers.flow_target_at(at.q, at.r).is_some() {
                depth = (depth * TRUNK_MULTIPLIER).min(MAX_CARVE_DEPTH);
            }
            depth
        };

        self.valley_cache.borrow_mut().insert(at, depth);
        depth
    }

    /// Displayed elevation after carving and valley relaxation.
    pub fn eroded_height(&self, q: i32, r: i32) -> f64 {
        let Some(at) = self.config.canonicalize(q, r) else {
            return 0.0;
        };
        if let Some(&height) = self.height_cache.borrow_mut().get(&at) {
            return height;
        }

        let mut neighbor_sum = 0.0;
        let mut neighbor_count = 0u32;
        for neighbor in at.neighbors() {
            if self.config.canonicalize(neighbor.q, neighbor.r).is_some() {
                neighbor_sum += self.carved_height(neighbor.q, neighbor.r);
                neighbor_count += 1;
            }
        }

        let center = self.carved_height(at.q, at.r);
        let height = if neighbor_count == 0 {
            center.clamp(0.0, 1.0)
        } else {
            let neighbor_mean = neighbor_sum / f64::from(neighbor_count);
            (CENTER_WEIGHT * center + NEIGHBOR_WEIGHT * neighbor_mean).clamp(0.0, 1.0)
        };

        self.height_cache.borrow_mut().insert(at, height);
        height
    }

    fn carved_height(&self, q: i32, r: i32) -> f64 {
        (self.terrain.height_at(q, r) - self.valley_strength(q, r)).clamp(0.0, 1.0)
    }
}

impl TerrainSampler for ErosionModel {
    fn height_at(&self, q: i32, r: i32) -> f64 {
        self.eroded_height(q, r)
    }

    fn is_ocean_at(&self, q: i32, r: i32) -> bool {
        self.terrain.is_ocean_at(q, r)
    }
}
