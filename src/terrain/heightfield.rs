//! Elevation synthesis and terrain classification.
//!
//! Height is layered: fractal value noise blended with a coarse continent
//! mask and a polar cooling penalty, biased by plate type and nearby plate
//! boundaries, then relaxed against the neighbor ring. The pre-erosion
//! height published here is what hydrology and erosion consume; the facade
//! reports the eroded height.

use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::noise::{channel_key, fractal01, value_noise};
use super::tectonics::{BoundaryKind, PlateType, TectonicsModel};
use super::TerrainSampler;
use crate::cache::LruCache;
use crate::config::WorldConfig;
use crate::hex::{Axial, AXIAL_DIRECTIONS};

const ELEVATION: u64 = channel_key("elevation");
const CONTINENTS: u64 = channel_key("continents");

pub const OCEAN_THRESHOLD: f64 = 0.36;
pub const PLAINS_THRESHOLD: f64 = 0.55;
pub const HILLS_THRESHOLD: f64 = 0.72;
pub const MOUNTAINS_THRESHOLD: f64 = 0.88;

const FRACTAL_WEIGHT: f64 = 0.70;
const CONTINENT_WEIGHT: f64 = 0.30;
const CONTINENT_FREQ: u32 = 2;
const POLAR_PENALTY: f64 = 0.08;

const PLATE_BIAS: f64 = 0.09;

const BOUNDARY_RADIUS: i32 = 3;
const CONVERGENT_LIFT: f64 = 0.20;
const TRENCH_DROP: f64 = 0.18;
const RIDGE_LIFT: f64 = 0.05;
const RIFT_DROP: f64 = 0.16;
const TRANSFORM_LIFT: f64 = 0.03;

const SMOOTH_CENTER_WEIGHT: f64 = 0.60;
const SMOOTH_NEIGHBOR_WEIGHT: f64 = 0.40;

/// Terrain classes for world-map coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainType {
    Ocean,
    Coast,
    Plains,
    Hills,
    Mountains,
    Snow,
}

/// Generated tile data for a single hex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTile {
    pub height: f64,
    pub terrain: TerrainType,
}

impl WorldTile {
    /// Deterministic default for out-of-world queries.
    pub const OUT_OF_WORLD: WorldTile = WorldTile {
        height: 0.0,
        terrain: TerrainType::Ocean,
    };
}

pub struct HeightField {
    pub seed: u64,
    config: Rc<WorldConfig>,
    tectonics: Rc<TectonicsModel>,
    raw_cache: RefCell<LruCache<Axial, f64>>,
    height_cache: RefCell<LruCache<Axial, f64>>,
}

impl HeightField {
    pub fn new(seed: u64, config: Rc<WorldConfig>, tectonics: Rc<TectonicsModel>) -> Self {
        let capacity = config.cache_capacity();
        Self {
            seed,
            config,
            tectonics,
            raw_cache: RefCell::new(LruCache::new(capacity)),
            height_cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Un-smoothed elevation: noise + plate bias + boundary bias, in [0, 1].
    pub fn raw_height_at(&self, q: i32, r: i32) -> f64 {
        let Some(canonical) = self.config.canonicalize(q, r) else {
            return 0.0;
        };
        if let Some(&height) = self.raw_cache.borrow_mut().get(&canonical) {
            return height;
        }

        let plate = self
            .tectonics
            .plate_at(canonical.q, canonical.r)
            .expect("in-world hex must belong to a plate");
        let plate_bias = match plate.plate_type {
            PlateType::Continental => PLATE_BIAS,
            PlateType::Oceanic => -PLATE_BIAS,
        };

        let height = (self.base_height(canonical) + plate_bias + self.boundary_bias(canonical))
            .clamp(0.0, 1.0);
        self.raw_cache.borrow_mut().insert(canonical, height);
        height
    }

    /// Published (pre-erosion) elevation: raw height relaxed against the
    /// neighbor ring, weights renormalized at unwrapped world edges.
    pub fn height_at(&self, q: i32, r: i32) -> f64 {
        let Some(canonical) = self.config.canonicalize(q, r) else {
            return 0.0;
        };
        if let Some(&height) = self.height_cache.borrow_mut().get(&canonical) {
            return height;
        }

        let mut sum = SMOOTH_CENTER_WEIGHT * self.raw_height_at(canonical.q, canonical.r);
        let mut weight = SMOOTH_CENTER_WEIGHT;
        let neighbor_weight = SMOOTH_NEIGHBOR_WEIGHT / 6.0;
        for neighbor in canonical.neighbors() {
            if self.config.canonicalize(neighbor.q, neighbor.r).is_some() {
                sum += neighbor_weight * self.raw_height_at(neighbor.q, neighbor.r);
                weight += neighbor_weight;
            }
        }

        let height = (sum / weight).clamp(0.0, 1.0);
        self.height_cache.borrow_mut().insert(canonical, height);
        height
    }

    /// Terrain class for a displayed height. Ocean and coast come from the
    /// pre-erosion field so hydrology's ocean predicate and the map agree;
    /// the land bands follow the displayed height.
    pub fn classify(&self, q: i32, r: i32, display_height: f64) -> TerrainType {
        if self.is_ocean_at(q, r) {
            return TerrainType::Ocean;
        }
        // Out-of-world neighbors count as ocean.
        let coastal = AXIAL_DIRECTIONS
            .iter()
            .any(|&(dq, dr)| self.is_ocean_at(q + dq, r + dr));
        if coastal {
            TerrainType::Coast
        } else if display_height < PLAINS_THRESHOLD {
            TerrainType::Plains
        } else if display_height < HILLS_THRESHOLD {
            TerrainType::Hills
        } else if display_height < MOUNTAINS_THRESHOLD {
            TerrainType::Mountains
        } else {
            TerrainType::Snow
        }
    }

    /// Fractal noise blended with the continent mask, minus polar cooling.
    fn base_height(&self, at: Axial) -> f64 {
        let x = f64::from(at.q - self.config.q_min()) / f64::from(self.config.width);
        let y = f64::from(at.r - self.config.r_min()) / f64::from(self.config.height);
        let wrap_y = self.config.wrap_y;

        let fractal = fractal01(self.seed, ELEVATION, x, y, wrap_y);
        let continents = value_noise(self.seed, CONTINENTS, x, y, CONTINENT_FREQ, wrap_y);
        let blended = FRACTAL_WEIGHT * fractal + CONTINENT_WEIGHT * continents;

        // Height penalty toward the poles, favoring polar oceans.
        blended - POLAR_PENALTY * ((y - 0.5) * PI).sin().abs()
    }

    /// Distance-weighted mean of per-hex boundary bias over a radius-3 disc.
    fn boundary_bias(&self, at: Axial) -> f64 {
        let mut total = 0.0;
        let mut total_weight = 0.0;

        for dq in -BOUNDARY_RADIUS..=BOUNDARY_RADIUS {
            let lo = (-BOUNDARY_RADIUS).max(-dq - BOUNDARY_RADIUS);
            let hi = BOUNDARY_RADIUS.min(-dq + BOUNDARY_RADIUS);
            for dr in lo..=hi {
                let Some(sample) = self.config.canonicalize(at.q + dq, at.r + dr) else {
                    continue;
                };
                let distance = Axial::new(0, 0).distance(Axial::new(dq, dr));
                let weight =
                    f64::from(BOUNDARY_RADIUS + 1 - distance) / f64::from(BOUNDARY_RADIUS + 1);
                total += weight * self.sample_bias(sample);
                total_weight += weight;
            }
        }

        if total_weight > 0.0 {
            total / total_weight
        } else {
            0.0
        }
    }

    /// Height contribution of the boundary felt at one sampled hex.
    fn sample_bias(&self, at: Axial) -> f64 {
        let boundary = self.tectonics.boundary_at(at.q, at.r);
        if boundary.kind == BoundaryKind::None {
            return 0.0;
        }

        let plate = self
            .tectonics
            .plate_at(at.q, at.r)
            .expect("in-world hex must belong to a plate");
        let strength = boundary.strength;

        match boundary.kind {
            BoundaryKind::Convergent => {
                let mut bias = CONVERGENT_LIFT * strength;
                // Subduction trench: oceanic crust diving under a continental
                // neighbor across the boundary.
                if plate.plate_type == PlateType::Oceanic
                    && self.touches_continental_plate(at, plate.plate_id)
                {
                    bias -= TRENCH_DROP * strength;
                }
                bias
            }
            BoundaryKind::Divergent => match plate.plate_type {
                PlateType::Oceanic => RIDGE_LIFT * strength,
                PlateType::Continental => -RIFT_DROP * strength,
            },
            BoundaryKind::Transform => TRANSFORM_LIFT * strength,
            BoundaryKind::None => 0.0,
        }
    }

    fn touches_continental_plate(&self, at: Axial, plate_id: u32) -> bool {
        at.neighbors().any(|neighbor| {
            self.tectonics
                .plate_at(neighbor.q, neighbor.r)
                .is_some_and(|other| {
                    other.plate_id != plate_id && other.plate_type == PlateType::Continental
                })
        })
    }
}

impl TerrainSampler for HeightField {
    fn height_at(&self, q: i32, r: i32) -> f64 {
        HeightField::height_at(self, q, r)
    }

    fn is_ocean_at(&self, q: i32, r: i32) -> bool {
        self.height_at(q, r) < OCEAN_THRESHOLD
    }
}
