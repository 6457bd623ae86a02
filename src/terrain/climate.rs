//! Heat, moisture and biome assignment.
//!
//! Climate is a pure function of latitude, elevation, terrain class and a
//! few keyed noise channels, so it can be queried for any hex without a
//! world-wide pass. Macro noise cells give regional weather character,
//! local noise breaks up the band edges.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::heightfield::{TerrainType, MOUNTAINS_THRESHOLD};
use super::noise::{channel_key, noise01};
use crate::cache::LruCache;
use crate::config::WorldConfig;
use crate::hex::Axial;

const HEAT_MACRO: u64 = channel_key("heat_macro");
const HEAT_LOCAL: u64 = channel_key("heat_local");
const MOISTURE_MACRO: u64 = channel_key("moisture_macro");
const MOISTURE_LOCAL: u64 = channel_key("moisture_local");
const RAINSHADOW: u64 = channel_key("rainshadow");

const HEAT_MACRO_CELL: i32 = 4;
const MOISTURE_MACRO_CELL: i32 = 5;

const HEAT_LATITUDE_WEIGHT: f64 = 0.66;
const HEAT_MACRO_WEIGHT: f64 = 0.22;
const HEAT_LOCAL_WEIGHT: f64 = 0.12;
const HEAT_ALTITUDE_PENALTY: f64 = 0.48;

const MOISTURE_BAND_WEIGHT: f64 = 0.42;
const MOISTURE_MACRO_WEIGHT: f64 = 0.35;
const MOISTURE_LOCAL_WEIGHT: f64 = 0.23;
const MOISTURE_BAND_CENTER: f64 = 0.45;
const COASTAL_MOISTURE_BONUS: f64 = 0.16;
const HILLS_OROGRAPHIC_BONUS: f64 = 0.08;
const MOUNTAIN_OROGRAPHIC_BONUS: f64 = 0.16;
const WINDWARD_BONUS: f64 = 0.09;
const LEEWARD_PENALTY: f64 = 0.10;
const HIGH_ALTITUDE_DRYING: f64 = 0.04;

/// Biomes assigned by the heat/moisture cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomeType {
    Ocean,
    Coastal,
    Alpine,
    Tundra,
    Taiga,
    Desert,
    Savanna,
    TemperateForest,
    Grassland,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateTile {
    pub heat: f64,
    pub moisture: f64,
    pub biome: BiomeType,
}

impl ClimateTile {
    pub const OUT_OF_WORLD: ClimateTile = ClimateTile {
        heat: 0.0,
        moisture: 0.0,
        biome: BiomeType::Ocean,
    };
}

/// Cache key: climate depends on position, terrain class, and the exact
/// displayed height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ClimateKey {
    at: Axial,
    terrain: TerrainType,
    height_bits: u64,
}

pub struct ClimateModel {
    pub seed: u64,
    config: Rc<WorldConfig>,
    cache: RefCell<LruCache<ClimateKey, ClimateTile>>,
}

impl ClimateModel {
    pub fn new(seed: u64, config: Rc<WorldConfig>) -> Self {
        let capacity = config.cache_capacity();
        Self {
            seed,
            config,
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Climate for a hex given its already-classified terrain and displayed
    /// height. Out-of-world coordinates get the fixed default tile.
    pub fn get_tile(&self, q: i32, r: i32, terrain: TerrainType, height: f64) -> ClimateTile {
        let Some(at) = self.config.canonicalize(q, r) else {
            return ClimateTile::OUT_OF_WORLD;
        };
        let key = ClimateKey {
            at,
            terrain,
            height_bits: height.to_bits(),
        };
        if let Some(&tile) = self.cache.borrow_mut().get(&key) {
            return tile;
        }

        let latitude = self.latitude(at.r);
        let heat = self.heat(at, latitude, height);
        let moisture = self.moisture(at, latitude, terrain, height);
        let tile = ClimateTile {
            heat,
            moisture,
            biome: biome_for(terrain, height, heat, moisture),
        };
        self.cache.borrow_mut().insert(key, tile);
        tile
    }

    /// Normalized distance from the central row, 0 at the equator and 1 at
    /// either polar edge.
    fn latitude(&self, r: i32) -> f64 {
        let span = (self.config.height.max(2) - 1) as f64;
        let y = f64::from(r - self.config.r_min()) / span;
        ((y - 0.5).abs() * 2.0).min(1.0)
    }

    fn heat(&self, at: Axial, latitude: f64, height: f64) -> f64 {
        let macro_cell = noise01(
            self.seed,
            HEAT_MACRO,
            i64::from(at.q.div_euclid(HEAT_MACRO_CELL)),
            i64::from(at.r.div_euclid(HEAT_MACRO_CELL)),
        );
        let local = noise01(self.seed, HEAT_LOCAL, i64::from(at.q), i64::from(at.r));
        let heat = HEAT_LATITUDE_WEIGHT * (1.0 - latitude)
            + HEAT_MACRO_WEIGHT * macro_cell
            + HEAT_LOCAL_WEIGHT * local
            - HEAT_ALTITUDE_PENALTY * height.clamp(0.0, 1.0);
        heat.clamp(0.0, 1.0)
    }

    fn moisture(&self, at: Axial, latitude: f64, terrain: TerrainType, height: f64) -> f64 {
        let band =
            (1.0 - (MOISTURE_BAND_CENTER - latitude).abs() / MOISTURE_BAND_CENTER).clamp(0.0, 1.0);
        let macro_cell = noise01(
            self.seed,
            MOISTURE_MACRO,
            i64::from(at.q.div_euclid(MOISTURE_MACRO_CELL)),
            i64::from(at.r.div_euclid(MOISTURE_MACRO_CELL)),
        );
        let local = noise01(self.seed, MOISTURE_LOCAL, i64::from(at.q), i64::from(at.r));

        let mut moisture = MOISTURE_BAND_WEIGHT * band
            + MOISTURE_MACRO_WEIGHT * macro_cell
            + MOISTURE_LOCAL_WEIGHT * local;

        match terrain {
            TerrainType::Coast => moisture += COASTAL_MOISTURE_BONUS,
            TerrainType::Hills => moisture += HILLS_OROGRAPHIC_BONUS,
            TerrainType::Mountains | TerrainType::Snow => {
                moisture += MOUNTAIN_OROGRAPHIC_BONUS
            }
            _ => {}
        }

        // Prevailing wind blows west to east: a ridge to the west feeds
        // rain, a ridge to the east casts a shadow.
        moisture += WINDWARD_BONUS * self.barrier(at.q - 1, at.r);
        moisture -= LEEWARD_PENALTY * self.barrier(at.q + 1, at.r);

        if height > MOUNTAINS_THRESHOLD {
            moisture -= HIGH_ALTITUDE_DRYING;
        }

        moisture.clamp(0.0, 1.0)
    }

    /// Rainshadow ridge factor at a neighboring hex, in [0, 1]. Zero for
    /// out-of-world coordinates.
    fn barrier(&self, q: i32, r: i32) -> f64 {
        match self.config.canonicalize(q, r) {
            Some(at) => {
                let n = noise01(self.seed, RAINSHADOW, i64::from(at.q), i64::from(at.r));
                ((n - 0.5) * 2.0).max(0.0)
            }
            None => 0.0,
        }
    }
}

fn biome_for(terrain: TerrainType, height: f64, heat: f64, moisture: f64) -> BiomeType {
    match terrain {
        TerrainType::Ocean => return BiomeType::Ocean,
        TerrainType::Coast => return BiomeType::Coastal,
        TerrainType::Mountains | TerrainType::Snow => {
            if height > 0.9 || heat < 0.25 {
                return BiomeType::Alpine;
            }
        }
        _ => {}
    }
    if heat < 0.22 {
        BiomeType::Tundra
    } else if heat < 0.38 {
        if moisture >= 0.45 {
            BiomeType::Taiga
        } else {
            BiomeType::Tundra
        }
    } else if heat > 0.74 && moisture < 0.28 {
        BiomeType::Desert
    } else if heat > 0.62 && moisture < 0.5 {
        BiomeType::Savanna
    } else if moisture > 0.62 {
        BiomeType::TemperateForest
    } else {
        BiomeType::Grassland
    }
}
