// g_utils.rs — game utility functions

/*
Copyright (C) 1997-2001 Id Software, Inc.

This program is free software; you can redistribute it and/or
modify it under the terms of the GNU General Public License
as published by the Free Software Foundation; either version 2
of the License, or (at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.

See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program; if not, write to the Free Software
Foundation, Inc., 59 Temple Place - Suite 330, Boston, MA  02111-1307, USA.
*/

use rayon::prelude::*;

use crate::dispatch::call_touch;
use crate::entity_index::EntityIndex;
use crate::g_local::{Edict, GameContext, Solid};
use crate::game_import::GameImport;
use transit_common::q_shared::{boxes_intersect, Pvs, Vec3};

/// Below this many slots, filtering the PVS sequentially is cheaper.
const PARALLEL_PVS_THRESHOLD: usize = 256;

/// PVS of the cluster containing `origin`.
pub fn pvs_for_origin(gi: &dyn GameImport, origin: &Vec3) -> Pvs {
    let cluster = gi.cluster_for_origin(origin);
    gi.pvs_for_cluster(cluster)
}

pub fn box_in_pvs(gi: &dyn GameImport, ent: &Edict, pvs: &Pvs) -> bool {
    gi.check_box_in_pvs(&ent.absmin, &ent.absmax, pvs)
}

/// Every in-use entity whose world bounds touch `pvs`, in slot order.
pub fn entities_in_pvs(index: &dyn EntityIndex, gi: &dyn GameImport, pvs: &Pvs) -> Vec<usize> {
    let num_edicts = index.num_edicts();
    let visible = |i: &usize| index.edict(*i).is_some_and(|e| box_in_pvs(gi, e, pvs));

    if num_edicts > PARALLEL_PVS_THRESHOLD {
        // indexed parallel filter keeps slot order
        (0..num_edicts).into_par_iter().filter(visible).collect()
    } else {
        (0..num_edicts).filter(visible).collect()
    }
}

/// Exact containment test of `ent` against a brush trigger.
///
/// Bounds must overlap first. Box entities are then clipped against the
/// brush, brush and physics entities are traced collide-vs-collide, and
/// anything else counts as inside once the bounds touch.
pub fn test_entity_trigger_intersection_accurate(gi: &dyn GameImport, trigger: &Edict, ent: &Edict) -> bool {
    if !boxes_intersect(&trigger.absmin, &trigger.absmax, &ent.absmin, &ent.absmax) {
        return false;
    }

    match ent.solid {
        Solid::Bbox => gi.clip_box_to_brush(trigger, &ent.origin, &ent.mins, &ent.maxs).startsolid,
        Solid::Bsp | Solid::VPhysics => gi.trace_collide(trigger, ent).startsolid,
        Solid::Not | Solid::Trigger => true,
    }
}

/// Call the touch function of every trigger the entity's bounds overlap.
pub fn g_touch_triggers(ctx: &mut GameContext, gi: &dyn GameImport, ent_idx: usize) {
    let Some(ent) = ctx.edict(ent_idx) else {
        return;
    };

    // Dead things don't activate triggers
    if ent.is_player() && !ent.is_alive() {
        return;
    }

    let (absmin, absmax) = (ent.absmin, ent.absmax);
    let touched: Vec<usize> = ctx
        .entities()
        .into_iter()
        .filter(|&i| i != ent_idx)
        .filter(|&i| {
            let hit = &ctx.edicts[i];
            hit.solid == Solid::Trigger
                && hit.touch_fn.is_some()
                && boxes_intersect(&absmin, &absmax, &hit.absmin, &hit.absmax)
        })
        .collect();

    for hit_idx in touched {
        call_touch(ctx, gi, hit_idx, ent_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_local::GameContext;
    use crate::game_import::StubGameImport;

    fn make_ctx(num_edicts: usize) -> GameContext {
        let mut ctx = GameContext::new("map1");
        for _ in 1..num_edicts {
            ctx.spawn_edict();
        }
        ctx
    }

    fn place(ent: &mut Edict, x: f32) {
        ent.origin = [x, 0.0, 0.0];
        ent.mins = [-16.0; 3];
        ent.maxs = [16.0; 3];
        ent.link();
    }

    #[test]
    fn test_entities_in_pvs_filters_by_cluster() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx(4);
        place(&mut ctx.edicts[1], 100.0);
        place(&mut ctx.edicts[2], 1500.0);
        place(&mut ctx.edicts[3], 9000.0);
        let pvs = pvs_for_origin(&gi, &[50.0, 0.0, 0.0]);
        assert_eq!(entities_in_pvs(&ctx, &gi, &pvs), vec![0, 1, 2]);
    }

    #[test]
    fn test_entities_in_pvs_parallel_keeps_order() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx(PARALLEL_PVS_THRESHOLD + 100);
        for i in 1..ctx.num_edicts() {
            let x = if i % 2 == 0 { 100.0 } else { 20000.0 };
            place(&mut ctx.edicts[i], x);
        }
        let pvs = pvs_for_origin(&gi, &[0.0; 3]);
        let found = entities_in_pvs(&ctx, &gi, &pvs);
        let expected: Vec<usize> = (0..ctx.num_edicts()).filter(|i| i % 2 == 0).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_accurate_intersection_requires_bounds_overlap() {
        let gi = StubGameImport::new();
        let mut trigger = Edict::default();
        place(&mut trigger, 0.0);
        let mut ent = Edict {
            solid: Solid::Not,
            ..Default::default()
        };
        place(&mut ent, 500.0);
        assert!(!test_entity_trigger_intersection_accurate(&gi, &trigger, &ent));
        place(&mut ent, 20.0);
        assert!(test_entity_trigger_intersection_accurate(&gi, &trigger, &ent));
    }

    #[test]
    fn test_accurate_intersection_asks_host_for_solid_entities() {
        let mut gi = StubGameImport::new();
        gi.hollow_models.push(3);
        let mut trigger = Edict {
            modelindex: 3,
            ..Default::default()
        };
        place(&mut trigger, 0.0);

        for solid in [Solid::Bbox, Solid::Bsp, Solid::VPhysics] {
            let mut ent = Edict {
                solid,
                ..Default::default()
            };
            place(&mut ent, 10.0);
            assert!(!test_entity_trigger_intersection_accurate(&gi, &trigger, &ent));
        }

        let mut ent = Edict {
            solid: Solid::Trigger,
            ..Default::default()
        };
        place(&mut ent, 10.0);
        assert!(test_entity_trigger_intersection_accurate(&gi, &trigger, &ent));
    }

    #[test]
    fn test_dead_players_touch_nothing() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx(1);
        ctx.cvars.get("maxclients", "1", 0);
        let lm = crate::g_spawn::spawn_entity(&mut ctx, &[("classname", "info_landmark"), ("targetname", "lm1")]);
        assert!(lm.is_ok());
        let trigger = crate::g_spawn::spawn_entity(
            &mut ctx,
            &[
                ("classname", "trigger_changelevel"),
                ("map", "map2"),
                ("landmark", "lm1"),
                ("mins", "-64 -64 -64"),
                ("maxs", "64 64 64"),
            ],
        );
        assert!(trigger.is_ok());
        let player = crate::g_spawn::spawn_player(&mut ctx, 0, [10.0, 0.0, 0.0]).unwrap_or(0);

        ctx.edicts[player].health = 0;
        g_touch_triggers(&mut ctx, &gi, player);
        assert!(gi.change_level_calls().is_empty());

        ctx.edicts[player].health = 100;
        g_touch_triggers(&mut ctx, &gi, player);
        assert_eq!(gi.change_level_calls(), vec![("map2".to_string(), "lm1".to_string())]);
    }
}
