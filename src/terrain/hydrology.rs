//! Water flow, accumulation and lakes.
//!
//! Every land hex drains to its strictly lowest neighbor. Local minima try
//! to overflow toward a lower basin within a bounded search radius; the
//! ones that cannot become lakes. Flow targets form a forest once cycles
//! are severed, and drainage accumulation is propagated leaf-to-root.
//!
//! On worlds small enough to fit the cache the whole network is resolved
//! in one pass. Larger worlds fall back to per-hex resolution where only
//! the local flow direction is available and accumulation degenerates to
//! its base value.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use log::{debug, warn};

use super::{RiverSampler, TerrainSampler};
use crate::cache::LruCache;
use crate::config::WorldConfig;
use crate::hex::Axial;

pub const DEFAULT_OVERFLOW_RADIUS: i32 = 10;

pub struct HydrologyModel {
    pub seed: u64,
    config: Rc<WorldConfig>,
    terrain: Rc<dyn TerrainSampler>,
    overflow_radius: i32,
    flow_cache: RefCell<LruCache<Axial, Option<Axial>>>,
    accumulation_cache: RefCell<LruCache<Axial, u32>>,
    lake_cache: RefCell<LruCache<Axial, bool>>,
    built: Cell<bool>,
    fallback_warned: Cell<bool>,
}

/// Candidate basin for overflow routing, ranked by (depth, hops, q, r).
/// Ocean outlets rank below every land outlet.
struct OverflowCandidate {
    height: f64,
    hops: u32,
    at: Axial,
    first_step: Axial,
}

impl OverflowCandidate {
    fn ranks_before(&self, other: &OverflowCandidate) -> bool {
        if self.height != other.height {
            return self.height < other.height;
        }
        (self.hops, self.at.q, self.at.r) < (other.hops, other.at.q, other.at.r)
    }
}

impl HydrologyModel {
    pub fn new(seed: u64, config: Rc<WorldConfig>, terrain: Rc<dyn TerrainSampler>) -> Self {
        let capacity = config.cache_capacity();
        Self {
            seed,
            config,
            terrain,
            overflow_radius: DEFAULT_OVERFLOW_RADIUS,
            flow_cache: RefCell::new(LruCache::new(capacity)),
            accumulation_cache: RefCell::new(LruCache::new(capacity)),
            lake_cache: RefCell::new(LruCache::new(capacity)),
            built: Cell::new(false),
            fallback_warned: Cell::new(false),
        }
    }

    /// Shrinks the overflow search radius, mainly for tests and tooling.
    pub fn with_overflow_radius(mut self, radius: i32) -> Self {
        assert!(radius >= 1, "overflow radius must be at least 1");
        self.overflow_radius = radius;
        self
    }

    /// True when the whole drainage network fits in the cache and can be
    /// resolved globally. Otherwise queries run in the degraded local mode.
    pub fn supports_global_build(&self) -> bool {
        self.config.area() <= self.config.cache_capacity()
    }

    /// Downhill flow target of a hex. `None` for ocean hexes, lakes and
    /// out-of-world coordinates.
    pub fn flow_to(&self, q: i32, r: i32) -> Option<Axial> {
        let at = self.config.canonicalize(q, r)?;
        if self.supports_global_build() {
            self.ensure_built();
            return self.flow_cache.borrow_mut().get(&at).copied().flatten();
        }
        if let Some(&flow) = self.flow_cache.borrow_mut().get(&at) {
            return flow;
        }
        self.warn_fallback_once();
        let flow = if self.terrain.is_ocean_at(at.q, at.r) {
            None
        } else {
            self.resolve_flow(
                at,
                &|hex: Axial| self.terrain.height_at(hex.q, hex.r),
                &|hex: Axial| self.terrain.is_ocean_at(hex.q, hex.r),
            )
        };
        self.flow_cache.borrow_mut().insert(at, flow);
        flow
    }

    /// Drainage area: number of hexes whose flow eventually passes through
    /// this hex, itself included for land.
    pub fn accumulation(&self, q: i32, r: i32) -> u32 {
        let Some(at) = self.config.canonicalize(q, r) else {
            return 0;
        };
        if self.supports_global_build() {
            self.ensure_built();
            return self
                .accumulation_cache
                .borrow_mut()
                .get(&at)
                .copied()
                .unwrap_or(0);
        }
        self.warn_fallback_once();
        if self.terrain.is_ocean_at(at.q, at.r) {
            0
        } else {
            1
        }
    }

    /// True for land hexes with no flow target and no reachable basin.
    pub fn is_lake(&self, q: i32, r: i32) -> bool {
        let Some(at) = self.config.canonicalize(q, r) else {
            return false;
        };
        if self.supports_global_build() {
            self.ensure_built();
            return self.lake_cache.borrow_mut().get(&at).copied().unwrap_or(false);
        }
        !self.terrain.is_ocean_at(at.q, at.r) && self.flow_to(at.q, at.r).is_none()
    }

    fn ensure_built(&self) {
        if !self.built.get() {
            self.build_all();
            self.built.set(true);
        }
    }

    fn warn_fallback_once(&self) {
        if !self.fallback_warned.get() {
            self.fallback_warned.set(true);
            warn!(
                "world area {} exceeds cache capacity {}; hydrology degrades to local flow only",
                self.config.area(),
                self.config.cache_capacity()
            );
        }
    }

    /// Resolves the full drainage network and publishes it to the caches.
    fn build_all(&self) {
        let width = self.config.width as i32;
        let q_min = self.config.q_min();
        let r_min = self.config.r_min();
        let area = self.config.area();

        let index = |at: Axial| ((at.r - r_min) * width + (at.q - q_min)) as usize;
        let coord = |i: usize| {
            Axial::new(q_min + (i as i32 % width), r_min + (i as i32 / width))
        };

        let mut heights = vec![0.0f64; area];
        let mut ocean = vec![false; area];
        for i in 0..area {
            let at = coord(i);
            heights[i] = self.terrain.height_at(at.q, at.r);
            ocean[i] = self.terrain.is_ocean_at(at.q, at.r);
        }

        let height_of = |at: Axial| heights[index(at)];
        let ocean_at = |at: Axial| ocean[index(at)];

        let mut flow: Vec<Option<usize>> = vec![None; area];
        for (i, slot) in flow.iter_mut().enumerate() {
            if ocean[i] {
                continue;
            }
            *slot = self
                .resolve_flow(coord(i), &height_of, &ocean_at)
                .map(index);
        }

        let severed = break_cycles(&mut flow);

        // Accumulation: every node starts with its own contribution and
        // pushes the total downstream once all upstream inputs arrived.
        let mut accumulation: Vec<u32> = ocean
            .iter()
            .map(|&is_ocean| if is_ocean { 0 } else { 1 })
            .collect();
        let mut indegree = vec![0u32; area];
        for target in flow.iter().flatten() {
            indegree[*target] += 1;
        }
        let mut ready: Vec<usize> = (0..area).filter(|&i| indegree[i] == 0).collect();
        while let Some(node) = ready.pop() {
            if let Some(target) = flow[node] {
                accumulation[target] += accumulation[node];
                indegree[target] -= 1;
                if indegree[target] == 0 {
                    ready.push(target);
                }
            }
        }

        let mut flow_cache = self.flow_cache.borrow_mut();
        let mut accumulation_cache = self.accumulation_cache.borrow_mut();
        let mut lake_cache = self.lake_cache.borrow_mut();
        for i in 0..area {
            let at = coord(i);
            flow_cache.insert(at, flow[i].map(coord));
            accumulation_cache.insert(at, accumulation[i]);
            lake_cache.insert(at, !ocean[i] && flow[i].is_none());
        }

        debug!(
            "hydrology network built for {} hexes ({} cycle edges severed)",
            area, severed
        );
    }

    /// Flow target for one land hex: the strictly lowest neighbor, or the
    /// first step toward the best overflow basin, or `None` for a lake.
    fn resolve_flow(
        &self,
        at: Axial,
        height_of: &impl Fn(Axial) -> f64,
        ocean_at: &impl Fn(Axial) -> bool,
    ) -> Option<Axial> {
        let own_height = height_of(at);
        let mut lowest: Option<(f64, Axial)> = None;
        for neighbor in at.neighbors() {
            let Some(canonical) = self.config.canonicalize(neighbor.q, neighbor.r) else {
                continue;
            };
            let height = height_of(canonical);
            // First-seen neighbor wins ties.
            if lowest.is_none_or(|(best, _)| height < best) {
                lowest = Some((height, canonical));
            }
        }
        match lowest {
            Some((height, target)) if height < own_height => Some(target),
            _ => self.overflow_target(at, own_height, height_of, ocean_at),
        }
    }

    /// Breadth-first search for a basin lower than the stuck hex. Returns
    /// the first step of the path toward the best-ranked outlet.
    fn overflow_target(
        &self,
        start: Axial,
        start_height: f64,
        height_of: &impl Fn(Axial) -> f64,
        ocean_at: &impl Fn(Axial) -> bool,
    ) -> Option<Axial> {
        let mut best: Option<OverflowCandidate> = None;
        let mut visited = HashSet::from([start]);
        let mut queue: VecDeque<(Axial, u32, Axial)> = VecDeque::new();

        for neighbor in start.neighbors() {
            if let Some(canonical) = self.config.canonicalize(neighbor.q, neighbor.r) {
                if visited.insert(canonical) {
                    queue.push_back((canonical, 1, canonical));
                }
            }
        }

        while let Some((at, hops, first_step)) = queue.pop_front() {
            let height = if ocean_at(at) {
                f64::NEG_INFINITY
            } else {
                height_of(at)
            };
            if height < start_height {
                let candidate = OverflowCandidate {
                    height,
                    hops,
                    at,
                    first_step,
                };
                if best.as_ref().is_none_or(|b| candidate.ranks_before(b)) {
                    best = Some(candidate);
                }
            }
            if hops as i32 >= self.overflow_radius {
                continue;
            }
            for neighbor in at.neighbors() {
                if let Some(canonical) = self.config.canonicalize(neighbor.q, neighbor.r) {
                    if visited.insert(canonical) {
                        queue.push_back((canonical, hops + 1, first_step));
                    }
                }
            }
        }

        best.map(|candidate| candidate.first_step)
    }
}

impl RiverSampler for HydrologyModel {
    fn river_strength_at(&self, q: i32, r: i32) -> u32 {
        match self.config.canonicalize(q, r) {
            Some(at) if !self.terrain.is_ocean_at(at.q, at.r) => self.accumulation(at.q, at.r),
            _ => 0,
        }
    }

    fn flow_target_at(&self, q: i32, r: i32) -> Option<Axial> {
        self.flow_to(q, r)
    }
}

/// Severs one edge per drainage cycle so the flow graph becomes a forest.
/// Returns the number of edges removed.
fn break_cycles(flow: &mut [Option<usize>]) -> usize {
    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; flow.len()];
    let mut path = Vec::new();
    let mut severed = 0;

    for start in 0..flow.len() {
        if color[start] != WHITE {
            continue;
        }
        path.clear();
        let mut node = start;
        loop {
            color[node] = GREY;
            path.push(node);
            match flow[node] {
                Some(next) if color[next] == WHITE => node = next,
                Some(next) if color[next] == GREY => {
                    // Edge closes a loop through the current walk.
                    flow[node] = None;
                    severed += 1;
                    break;
                }
                _ => break,
            }
        }
        for &done in &path {
            color[done] = BLACK;
        }
    }

    severed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WorldConfig, WorldProfile};

    /// Terrain stub with a closed-form height function.
    struct SlopeTerrain {
        config: Rc<WorldConfig>,
        height_fn: fn(Axial) -> f64,
    }

    impl TerrainSampler for SlopeTerrain {
        fn height_at(&self, q: i32, r: i32) -> f64 {
            match self.config.canonicalize(q, r) {
                Some(at) => (self.height_fn)(at),
                None => 0.0,
            }
        }

        fn is_ocean_at(&self, q: i32, r: i32) -> bool {
            self.height_at(q, r) < 0.36
        }
    }

    fn model(
        profile: WorldProfile,
        width: u32,
        height: u32,
        height_fn: fn(Axial) -> f64,
    ) -> HydrologyModel {
        let config = Rc::new(WorldConfig::with_size(profile, width, height));
        let terrain = Rc::new(SlopeTerrain {
            config: config.clone(),
            height_fn,
        });
        HydrologyModel::new(1340, config, terrain)
    }

    fn eastward_slope(at: Axial) -> f64 {
        // Lower to the west, ocean past the western fringe.
        0.30 + 0.02 * f64::from(at.q + 16)
    }

    /// Just past the large-world cache cap, forcing the local fallback.
    fn oversized(height_fn: fn(Axial) -> f64) -> HydrologyModel {
        model(WorldProfile::Target, 640, 320, height_fn)
    }

    #[test]
    fn flow_follows_the_slope() {
        let hydrology = model(WorldProfile::Dev, 32, 16, eastward_slope);
        assert_eq!(hydrology.flow_to(1, 0), Some(Axial::new(0, 0)));
        assert_eq!(hydrology.flow_to(5, 3), Some(Axial::new(4, 3)));
    }

    #[test]
    fn accumulation_grows_downstream() {
        let hydrology = model(WorldProfile::Dev, 32, 16, eastward_slope);
        assert!(hydrology.accumulation(0, 0) > hydrology.accumulation(1, 0));
        assert!(hydrology.accumulation(1, 0) > hydrology.accumulation(8, 0));
    }

    #[test]
    fn ocean_has_no_rivers() {
        let hydrology = model(WorldProfile::Dev, 32, 16, eastward_slope);
        // Western columns sit below the ocean threshold.
        assert_eq!(hydrology.river_strength_at(-16, 0), 0);
        assert_eq!(hydrology.flow_to(-16, 0), None);
        assert!(!hydrology.is_lake(-16, 0));
    }

    #[test]
    fn wrapped_queries_agree() {
        let hydrology = model(WorldProfile::Dev, 32, 16, eastward_slope);
        assert_eq!(hydrology.flow_to(4, 2), hydrology.flow_to(4 + 32, 2));
        assert_eq!(
            hydrology.river_strength_at(4, 2),
            hydrology.river_strength_at(4 - 32, 2)
        );
        assert_eq!(hydrology.is_lake(4, 2), hydrology.is_lake(4 + 32, 2));
    }

    fn bowl(at: Axial) -> f64 {
        // Flat plateau with a distant low cell, all land.
        if at == Axial::new(3, 0) {
            0.40
        } else {
            0.70
        }
    }

    #[test]
    fn plateau_overflows_toward_distant_basin() {
        // An oversized world keeps the model in local mode, which exercises
        // resolve_flow directly without the global pass.
        let hydrology = oversized(bowl);
        assert!(!hydrology.supports_global_build());
        assert_eq!(hydrology.flow_to(0, 0), Some(Axial::new(1, 0)));
    }

    fn sealed_plateau(at: Axial) -> f64 {
        let _ = at;
        0.90
    }

    #[test]
    fn sealed_plateau_becomes_lake() {
        let hydrology = oversized(sealed_plateau).with_overflow_radius(3);
        assert_eq!(hydrology.flow_to(0, 0), None);
        assert!(hydrology.is_lake(0, 0));
    }

    #[test]
    fn local_fallback_reports_base_accumulation() {
        let hydrology = oversized(eastward_slope);
        assert_eq!(hydrology.accumulation(5, 3), 1);
        assert_eq!(hydrology.accumulation(-300, 0), 0);
    }

    #[test]
    fn break_cycles_severs_one_edge_per_loop() {
        let mut flow = vec![Some(1), Some(2), Some(0), Some(0), None];
        let severed = break_cycles(&mut flow);
        assert_eq!(severed, 1);
        assert_eq!(flow.iter().filter(|slot| slot.is_none()).count(), 2);
        // The chain into the loop stays intact.
        assert_eq!(flow[3], Some(0));
    }
}
