//! Game import interface: what the host engine provides to the game module.
//!
//! The host owns the BSP, the visibility data and the collision models.
//! Everything here is a synchronous query made during the current tick,
//! except `change_level`, which asks the host to end the map.

use parking_lot::Mutex;

use crate::g_local::Edict;
use transit_common::q_shared::{boxes_intersect, vector_add, Pvs, Trace, Vec3};

/// Host engine services used by triggers and the transition planner.
///
/// `Send + Sync` because PVS candidate filtering may run on the rayon pool.
pub trait GameImport: Send + Sync {
    /// Visibility cluster containing `origin`, negative if the point is in solid.
    fn cluster_for_origin(&self, origin: &Vec3) -> i32;

    /// Clusters potentially visible from `cluster`.
    fn pvs_for_cluster(&self, cluster: i32) -> Pvs;

    /// Does any cluster touched by the box appear in `pvs`?
    fn check_box_in_pvs(&self, mins: &Vec3, maxs: &Vec3, pvs: &Pvs) -> bool;

    /// Sweep a zero-length box against a brush entity's collision model.
    fn clip_box_to_brush(&self, brush: &Edict, start: &Vec3, mins: &Vec3, maxs: &Vec3) -> Trace;

    /// Zero-length collide-vs-collide trace between a brush and a physics entity.
    fn trace_collide(&self, brush: &Edict, ent: &Edict) -> Trace;

    /// End the current map and load `map`, placing travellers relative to `spot`.
    fn change_level(&self, map: &str, spot: &str);
}

/// Deterministic host for tools and tests.
///
/// Clusters are slabs of `cluster_size` units along X starting at x = 0; each
/// cluster sees `pvs_radius` clusters to either side. Points inside a
/// registered solid box have cluster -1. Accurate tests reduce to world-bounds
/// overlap, except for brushes whose modelindex is in `hollow_models`, which
/// never report contact.
pub struct StubGameImport {
    pub cluster_size: f32,
    pub num_clusters: usize,
    pub pvs_radius: i32,
    pub solid_boxes: Vec<(Vec3, Vec3)>,
    pub hollow_models: Vec<i32>,
    change_levels: Mutex<Vec<(String, String)>>,
}

impl Default for StubGameImport {
    fn default() -> Self {
        Self {
            cluster_size: 1024.0,
            num_clusters: 64,
            pvs_radius: 1,
            solid_boxes: Vec::new(),
            hollow_models: Vec::new(),
            change_levels: Mutex::new(Vec::new()),
        }
    }
}

impl StubGameImport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `change_level` call so far, oldest first.
    pub fn change_level_calls(&self) -> Vec<(String, String)> {
        self.change_levels.lock().clone()
    }

    fn cluster_for_x(&self, x: f32) -> i32 {
        let c = (x / self.cluster_size).floor() as i64;
        c.clamp(0, self.num_clusters as i64 - 1) as i32
    }

    fn is_hollow(&self, brush: &Edict) -> bool {
        self.hollow_models.contains(&brush.modelindex)
    }
}

impl GameImport for StubGameImport {
    fn cluster_for_origin(&self, origin: &Vec3) -> i32 {
        if self
            .solid_boxes
            .iter()
            .any(|(mins, maxs)| boxes_intersect(origin, origin, mins, maxs))
        {
            return -1;
        }
        self.cluster_for_x(origin[0])
    }

    fn pvs_for_cluster(&self, cluster: i32) -> Pvs {
        let mut pvs = Pvs::new(cluster, self.num_clusters);
        if cluster < 0 {
            return pvs;
        }
        for c in (cluster - self.pvs_radius)..=(cluster + self.pvs_radius) {
            pvs.set(c);
        }
        pvs
    }

    fn check_box_in_pvs(&self, mins: &Vec3, maxs: &Vec3, pvs: &Pvs) -> bool {
        let first = self.cluster_for_x(mins[0]);
        let last = self.cluster_for_x(maxs[0]);
        (first..=last).any(|c| pvs.is_visible(c))
    }

    fn clip_box_to_brush(&self, brush: &Edict, start: &Vec3, mins: &Vec3, maxs: &Vec3) -> Trace {
        let boxmin = vector_add(start, mins);
        let boxmax = vector_add(start, maxs);
        let startsolid =
            !self.is_hollow(brush) && boxes_intersect(&boxmin, &boxmax, &brush.absmin, &brush.absmax);
        Trace {
            startsolid,
            allsolid: startsolid,
            fraction: if startsolid { 0.0 } else { 1.0 },
            endpos: *start,
        }
    }

    fn trace_collide(&self, brush: &Edict, ent: &Edict) -> Trace {
        let startsolid =
            !self.is_hollow(brush) && boxes_intersect(&ent.absmin, &ent.absmax, &brush.absmin, &brush.absmax);
        Trace {
            startsolid,
            allsolid: startsolid,
            fraction: if startsolid { 0.0 } else { 1.0 },
            endpos: ent.origin,
        }
    }

    fn change_level(&self, map: &str, spot: &str) {
        self.change_levels
            .lock()
            .push((map.to_string(), spot.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_clusters_are_x_slabs() {
        let gi = StubGameImport::new();
        assert_eq!(gi.cluster_for_origin(&[10.0, 0.0, 0.0]), 0);
        assert_eq!(gi.cluster_for_origin(&[2100.0, 5000.0, 0.0]), 2);
        assert_eq!(gi.cluster_for_origin(&[-50.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn test_stub_solid_boxes_have_no_cluster() {
        let mut gi = StubGameImport::new();
        gi.solid_boxes.push(([0.0; 3], [100.0; 3]));
        assert_eq!(gi.cluster_for_origin(&[50.0, 50.0, 50.0]), -1);
        assert!(gi.pvs_for_cluster(-1).bits.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_stub_pvs_radius() {
        let gi = StubGameImport::new();
        let pvs = gi.pvs_for_cluster(5);
        assert!(pvs.is_visible(4) && pvs.is_visible(5) && pvs.is_visible(6));
        assert!(!pvs.is_visible(7));
        // box spanning clusters 7..8 is not visible, 6..7 is
        assert!(!gi.check_box_in_pvs(&[7200.0, 0.0, 0.0], &[8200.0, 0.0, 0.0], &pvs));
        assert!(gi.check_box_in_pvs(&[6500.0, 0.0, 0.0], &[7200.0, 0.0, 0.0], &pvs));
    }

    #[test]
    fn test_stub_records_change_level() {
        let gi = StubGameImport::new();
        gi.change_level("map2", "lm1");
        assert_eq!(gi.change_level_calls(), vec![("map2".to_string(), "lm1".to_string())]);
    }

    #[test]
    fn test_stub_hollow_brush_never_touches() {
        let mut gi = StubGameImport::new();
        let brush = Edict {
            modelindex: 7,
            absmin: [0.0; 3],
            absmax: [100.0; 3],
            ..Default::default()
        };
        let ent = Edict {
            absmin: [10.0; 3],
            absmax: [20.0; 3],
            ..Default::default()
        };
        assert!(gi.trace_collide(&brush, &ent).startsolid);
        gi.hollow_models.push(7);
        assert!(!gi.trace_collide(&brush, &ent).startsolid);
    }
}
