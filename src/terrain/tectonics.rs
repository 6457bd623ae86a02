//! Deterministic tectonic plate partition and boundary classification.
//!
//! Plates are a Voronoi-like partition around hashed seed hexes. Every plate
//! attribute is derived by hashing (seed, role, plate_id), so there is no
//! shared mutable RNG state and lookups are order-independent. Nearest-seed
//! search evaluates every seed at its true position and at ±width
//! x-translates, which keeps the partition seamless across the wrap.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::noise::{channel_key, hash_u64, unit_f64};
use crate::cache::LruCache;
use crate::config::WorldConfig;
use crate::hex::{Axial, AXIAL_DIRECTIONS};

const SEED_Q: u64 = channel_key("seed_q");
const SEED_R: u64 = channel_key("seed_r");
const PLATE_TYPE: u64 = channel_key("plate_type");
const MOTION: u64 = channel_key("motion");

/// One plate per ~4096 hexes, clamped to a playable range.
const PLATE_AREA_DIVISOR: usize = 4096;
const MIN_PLATES: usize = 12;
const MAX_PLATES: usize = 96;

const OCEANIC_PROBABILITY: f64 = 0.45;
const NORMAL_THRESHOLD: f64 = 0.25;
const STRENGTH_SCALE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlateType {
    Oceanic,
    Continental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    None,
    Convergent,
    Divergent,
    Transform,
}

/// Plate membership for a hex. Plate attributes are stable per world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateData {
    pub plate_id: u32,
    pub plate_type: PlateType,
    /// Motion vector: one of the 6 axial unit directions.
    pub motion: (i32, i32),
}

/// Strongest plate-boundary interaction felt at a hex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryData {
    pub kind: BoundaryKind,
    pub strength: f64,
}

impl BoundaryData {
    pub const NONE: BoundaryData = BoundaryData {
        kind: BoundaryKind::None,
        strength: 0.0,
    };
}

struct PlateSeed {
    plate_id: u32,
    q: i32,
    r: i32,
}

pub struct TectonicsModel {
    pub seed: u64,
    config: Rc<WorldConfig>,
    seeds: Vec<PlateSeed>,
    plate_cache: RefCell<LruCache<Axial, PlateData>>,
    boundary_cache: RefCell<LruCache<Axial, BoundaryData>>,
}

impl TectonicsModel {
    pub fn new(seed: u64, config: Rc<WorldConfig>) -> Self {
        let plate_count = (config.area() / PLATE_AREA_DIVISOR).clamp(MIN_PLATES, MAX_PLATES);
        let seeds = (0..plate_count as u32)
            .map(|plate_id| {
                let id = i64::from(plate_id);
                PlateSeed {
                    plate_id,
                    q: config.q_min()
                        + (hash_u64(seed, SEED_Q, id, 0) % u64::from(config.width)) as i32,
                    r: config.r_min()
                        + (hash_u64(seed, SEED_R, id, 0) % u64::from(config.height)) as i32,
                }
            })
            .collect();
        debug!(
            "tectonics: {} plates over {}x{} world",
            plate_count, config.width, config.height
        );

        let capacity = config.cache_capacity();
        Self {
            seed,
            config,
            seeds,
            plate_cache: RefCell::new(LruCache::new(capacity)),
            boundary_cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn plate_count(&self) -> usize {
        self.seeds.len()
    }

    /// Plate membership for a hex, or `None` out of world.
    pub fn plate_at(&self, q: i32, r: i32) -> Option<PlateData> {
        let canonical = self.config.canonicalize(q, r)?;
        if let Some(&plate) = self.plate_cache.borrow_mut().get(&canonical) {
            return Some(plate);
        }

        let plate_id = self.nearest_seed(canonical);
        let plate = PlateData {
            plate_id,
            plate_type: self.plate_type(plate_id),
            motion: AXIAL_DIRECTIONS
                [(hash_u64(self.seed, MOTION, i64::from(plate_id), 0) % 6) as usize],
        };
        self.plate_cache.borrow_mut().insert(canonical, plate);
        Some(plate)
    }

    /// Strongest boundary interaction against the 6 neighbors. `NONE` when
    /// the whole neighborhood shares one plate (or out of world).
    pub fn boundary_at(&self, q: i32, r: i32) -> BoundaryData {
        let Some(canonical) = self.config.canonicalize(q, r) else {
            return BoundaryData::NONE;
        };
        if let Some(&boundary) = self.boundary_cache.borrow_mut().get(&canonical) {
            return boundary;
        }

        let current = self
            .plate_at(canonical.q, canonical.r)
            .expect("in-world hex must belong to a plate");
        let mut best = BoundaryData::NONE;

        for (dq, dr) in AXIAL_DIRECTIONS {
            let Some(neighbor) = self.config.canonicalize(canonical.q + dq, canonical.r + dr)
            else {
                continue;
            };
            let other = self
                .plate_at(neighbor.q, neighbor.r)
                .expect("in-world neighbor must belong to a plate");
            if other.plate_id == current.plate_id {
                continue;
            }

            let (kind, strength) = classify_boundary(current, other, (dq, dr));
            if strength > best.strength {
                best = BoundaryData { kind, strength };
            }
        }

        self.boundary_cache.borrow_mut().insert(canonical, best);
        best
    }

    /// Nearest plate seed under hex distance, checked at ±width x-translates.
    /// Ties break on lowest plate id, then lowest seed q.
    fn nearest_seed(&self, at: Axial) -> u32 {
        let width = self.config.width as i32;
        let mut best: Option<(i32, u32, i32)> = None;

        for seed in &self.seeds {
            for wrap in [-width, 0, width] {
                let distance = at.distance(Axial::new(seed.q + wrap, seed.r));
                let candidate = (distance, seed.plate_id, seed.q);
                if best.is_none_or(|b| candidate < b) {
                    best = Some(candidate);
                }
            }
        }

        best.expect("world must have at least one plate seed").1
    }

    fn plate_type(&self, plate_id: u32) -> PlateType {
        let sample = unit_f64(hash_u64(self.seed, PLATE_TYPE, i64::from(plate_id), 0));
        if sample >= OCEANIC_PROBABILITY {
            PlateType::Continental
        } else {
            PlateType::Oceanic
        }
    }
}

/// Decomposes relative plate motion into components normal and tangential to
/// the neighbor direction and classifies the interaction.
fn classify_boundary(
    current: PlateData,
    other: PlateData,
    direction: (i32, i32),
) -> (BoundaryKind, f64) {
    let rel = (
        current.motion.0 - other.motion.0,
        current.motion.1 - other.motion.1,
    );
    let (dq, dr) = direction;
    let dir_len_sq = f64::from(dq * dq + dr * dr);
    let normal = f64::from(rel.0 * dq + rel.1 * dr) / dir_len_sq;

    let tangent = (dr, -dq);
    let tangent_len_sq = f64::from(tangent.0 * tangent.0 + tangent.1 * tangent.1);
    let tangential = f64::from(rel.0 * tangent.0 + rel.1 * tangent.1) / tangent_len_sq;

    if normal >= NORMAL_THRESHOLD {
        (BoundaryKind::Convergent, (normal.abs() / STRENGTH_SCALE).min(1.0))
    } else if normal <= -NORMAL_THRESHOLD {
        (BoundaryKind::Divergent, (normal.abs() / STRENGTH_SCALE).min(1.0))
    } else {
        (
            BoundaryKind::Transform,
            (tangential.abs() / STRENGTH_SCALE).clamp(0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldProfile;

    fn model(seed: u64) -> TectonicsModel {
        let config = Rc::new(WorldConfig::with_size(WorldProfile::Dev, 64, 32));
        TectonicsModel::new(seed, config)
    }

    #[test]
    fn plate_count_is_clamped() {
        assert_eq!(model(1).plate_count(), MIN_PLATES);
        let big = TectonicsModel::new(
            1,
            Rc::new(WorldConfig::new(WorldProfile::Target)),
        );
        assert_eq!(big.plate_count(), MAX_PLATES);
    }

    #[test]
    fn plate_and_boundary_lookups_are_deterministic() {
        let first = model(1337);
        let second = model(1337);
        for (q, r) in [(-25, 8), (0, 0), (13, 15), (87, -16)] {
            assert_eq!(first.plate_at(q, r), second.plate_at(q, r));
            assert_eq!(first.boundary_at(q, r), second.boundary_at(q, r));
        }
    }

    #[test]
    fn wrap_x_preserves_plate_identity() {
        let tectonics = model(2025);
        let width = 64;
        for (q, r) in [(22, -11), (0, 0), (-30, 9)] {
            assert_eq!(tectonics.plate_at(q, r), tectonics.plate_at(q + width, r));
            assert_eq!(
                tectonics.boundary_at(q, r),
                tectonics.boundary_at(q + width, r)
            );
        }
    }

    #[test]
    fn sample_window_sees_multiple_plates() {
        let tectonics = model(1);
        let mut plate_ids = std::collections::HashSet::new();
        for q in (-30..=30).step_by(2) {
            for r in (-15..=15).step_by(2) {
                plate_ids.insert(tectonics.plate_at(q, r).unwrap().plate_id);
            }
        }
        assert!(plate_ids.len() >= 3, "only {} plates seen", plate_ids.len());
    }

    #[test]
    fn boundary_strength_stays_in_unit_range() {
        let tectonics = model(42);
        for q in (-30..=30).step_by(5) {
            for r in (-15..=15).step_by(5) {
                let boundary = tectonics.boundary_at(q, r);
                assert!((0.0..=1.0).contains(&boundary.strength));
                if boundary.kind == BoundaryKind::None {
                    assert_eq!(boundary.strength, 0.0);
                }
            }
        }
    }

    #[test]
    fn motion_is_an_axial_unit_direction() {
        let tectonics = model(7);
        let plate = tectonics.plate_at(3, 3).unwrap();
        assert!(AXIAL_DIRECTIONS.contains(&plate.motion));
    }

    #[test]
    fn out_of_world_lookups_degrade_gracefully() {
        let tectonics = model(7);
        assert_eq!(tectonics.plate_at(0, 1000), None);
        assert_eq!(tectonics.boundary_at(0, 1000), BoundaryData::NONE);
    }
}
