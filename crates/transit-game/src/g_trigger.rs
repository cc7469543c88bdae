// g_trigger.rs — trigger_changelevel, trigger_transition and info_landmark

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

use crate::dispatch::{accept_input, fire_outputs};
use crate::entity_index::EntityIndex;
use crate::g_local::*;
use crate::g_save::save_init;
use crate::g_transition::{
    build_change_list, find_landmark, in_transition_volume, screen_transition_volume, TransitionVolume,
};
use crate::g_utils::{box_in_pvs, pvs_for_origin};
use crate::game_import::GameImport;

/// What a call to `change_level_now` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLevelResult {
    /// Deathmatch, or the trigger already fired.
    Ignored,
    /// Validation failed; the trigger can fire again.
    Aborted,
    /// The host was asked to change level.
    Committed,
    /// g_debug_transitions is set: the change list was built but the level stays.
    DryRun,
}

// ============================================================
// Spawning
// ============================================================

/// Common brush trigger setup: non-solid to movement, invisible to clients.
pub fn init_trigger(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::Trigger;
    ent.movetype = MoveType::None;
    ent.svflags |= SVF_NOCLIENT;
    ent.caps = ObjectCaps::empty();
    ent.link();
}

/// QUAKED trigger_changelevel (0.5 0.5 0.5) ? x NO_TOUCH CHAPTER
/// Ends the level and moves to "map", carrying everything near "landmark".
/// NO_TOUCH: only the ChangeLevel input fires it.
/// CHAPTER: solid and inert when a new game starts on this map.
pub fn sp_trigger_changelevel(ctx: &mut GameContext, ent_idx: usize) {
    {
        let ent = &ctx.edicts[ent_idx];
        if ent.map.is_empty() {
            log::info!("a trigger_changelevel doesn't have a map");
        }
        if ent.landmark.is_empty() {
            log::info!("trigger_changelevel to {} doesn't have a landmark", ent.map);
        }
    }

    init_trigger(ctx, ent_idx);

    let ent = &mut ctx.edicts[ent_idx];
    if !ent.has_spawnflags(SF_CHANGELEVEL_NOTOUCH) {
        ent.touch_fn = Some(TouchFn::ChangeLevel);
    }
    ent.changelevel_state = ChangeLevelState::Idle;
}

/// QUAKED trigger_transition (0.5 0.5 0.5) ?
/// Names the region whose contents travel through the landmark of the same name.
pub fn sp_trigger_transition(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::Not;
    ent.movetype = MoveType::None;
    ent.svflags |= SVF_NOCLIENT;
    ent.caps = ObjectCaps::empty();
    ent.link();
}

/// QUAKED info_landmark (1 0 0) (-8 -8 -8) (8 8 8)
/// Shared reference point between two maps.
pub fn sp_info_landmark(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::Not;
    ent.movetype = MoveType::None;
    ent.svflags |= SVF_NOCLIENT;
    ent.caps = FCAP_ACROSS_TRANSITION;
    ent.link();
}

/// Runs once every entity of the map exists.
pub fn changelevel_activate(ctx: &mut GameContext, gi: &dyn GameImport, ent_idx: usize) {
    if ctx.level.load_type == LoadType::NewGame
        && ctx.edicts[ent_idx].has_spawnflags(SF_CHANGELEVEL_CHAPTER)
    {
        // chapter starts never leave the map they start in
        let ent = &mut ctx.edicts[ent_idx];
        ent.solid = Solid::Bsp;
        ent.touch_fn = None;
        return;
    }

    let (map, landmark_name) = {
        let ent = &ctx.edicts[ent_idx];
        (ent.map.clone(), ent.landmark.clone())
    };

    if let Some(landmark) = find_landmark(&*ctx, &landmark_name) {
        let origin = ctx.edicts[landmark].origin;
        if gi.cluster_for_origin(&origin) < 0 {
            log::warn!(
                "trigger_changelevel to map {} has a landmark embedded in solid at {}! This will break level transitions!",
                map,
                vtos(&origin)
            );
        }

        if ctx.cvars.variable_int("g_debug_transitions") != 0
            && ctx.find_by_classname(CLASSNAME_TRANSITION).is_empty()
        {
            log::warn!("Map has no trigger_transition volumes for landmark {}", landmark_name);
        }
    }

    ctx.edicts[ent_idx].changelevel_state = ChangeLevelState::Idle;
}

// ============================================================
// Firing
// ============================================================

pub fn touch_change_level(ctx: &mut GameContext, gi: &dyn GameImport, self_idx: usize, other_idx: usize) {
    let Some(other) = ctx.edicts.get_mut(other_idx) else {
        return;
    };
    if !other.inuse || !other.is_player() {
        return;
    }

    if other.game_ending {
        // the game is over, hold the player in place
        other.velocity[0] *= 0.5;
        other.velocity[1] *= 0.5;
        other.flags |= FL_FROZEN;
        return;
    }

    if !other.in_vehicle && other.movetype == MoveType::Noclip {
        log::debug!(
            "In level transition: {} {}",
            ctx.transition.next_map,
            ctx.transition.next_spot
        );
        return;
    }

    change_level_now(ctx, gi, self_idx, Some(other_idx));
}

pub fn input_change_level(
    ctx: &mut GameContext,
    gi: &dyn GameImport,
    self_idx: usize,
    activator: Option<usize>,
) -> ChangeLevelResult {
    // a dead player or a running bonus challenge can't be carried over
    if ctx.maxclients() == 1 {
        if let Some(player) = ctx.local_player() {
            let p = &ctx.edicts[player];
            if !p.is_alive() || p.bonus_challenge > 0 {
                return ChangeLevelResult::Ignored;
            }
        }
    }

    change_level_now(ctx, gi, self_idx, activator)
}

fn abort_change_level(ctx: &mut GameContext, self_idx: usize) -> ChangeLevelResult {
    ctx.edicts[self_idx].changelevel_state = ChangeLevelState::Idle;
    ChangeLevelResult::Aborted
}

/// Validate and perform the level change.
///
/// A trigger fires at most once per level: once committed, and while it is
/// still validating during the same frame, further requests are ignored.
pub fn change_level_now(
    ctx: &mut GameContext,
    gi: &dyn GameImport,
    self_idx: usize,
    activator: Option<usize>,
) -> ChangeLevelResult {
    if ctx.deathmatch() {
        return ChangeLevelResult::Ignored;
    }

    let Some(ent) = ctx.edicts.get(self_idx).filter(|e| e.inuse) else {
        return ChangeLevelResult::Ignored;
    };
    match ent.changelevel_state {
        ChangeLevelState::Committed => return ChangeLevelResult::Ignored,
        ChangeLevelState::Touched { framenum } if framenum == ctx.level.framenum => {
            return ChangeLevelResult::Ignored;
        }
        _ => {}
    }
    let map = ent.map.clone();
    let landmark_name = ent.landmark.clone();

    ctx.edicts[self_idx].changelevel_state = ChangeLevelState::Touched {
        framenum: ctx.level.framenum,
    };

    if map.is_empty() {
        log::warn!("trigger_changelevel has no map, aborting");
        return abort_change_level(ctx, self_idx);
    }

    let player = activator
        .filter(|&a| ctx.edict(a).is_some_and(Edict::is_player))
        .or_else(|| ctx.local_player());
    let Some(player) = player else {
        log::warn!("No player to carry across the transition to {}, aborting", map);
        return abort_change_level(ctx, self_idx);
    };

    // the player always travels, but only from where the transition allows
    let volume = screen_transition_volume(&*ctx, gi, player, &landmark_name);
    if volume == TransitionVolume::ScreenedOut {
        log::debug!("Player isn't in the transition volume {}, aborting", landmark_name);
        return abort_change_level(ctx, self_idx);
    }

    let Some(landmark) = find_landmark(&*ctx, &landmark_name) else {
        return abort_change_level(ctx, self_idx);
    };

    // no volumes at all: the player must at least be able to see the landmark
    if volume == TransitionVolume::NotFound {
        let pvs = pvs_for_origin(gi, &ctx.edicts[landmark].origin);
        if !box_in_pvs(gi, &ctx.edicts[player], &pvs) {
            log::warn!("Player isn't in the landmark's ({}) PVS, aborting", landmark_name);
            return abort_change_level(ctx, self_idx);
        }
    }

    warn_about_active_lead(ctx);

    ctx.transition.debugging_transition = 0;
    ctx.transition.next_map = q_strncpy(&map, MAX_MAP_NAME);
    ctx.transition.next_spot = q_strncpy(&landmark_name, MAX_MAP_NAME);

    ctx.edicts[self_idx].activator = activator;
    fire_outputs(ctx, gi, self_idx, activator);

    notify_entities_out_of_transition(ctx, gi, self_idx);

    let next_map = ctx.transition.next_map.clone();
    let next_spot = ctx.transition.next_spot.clone();

    let debug = ctx.cvars.variable_int("g_debug_transitions");
    if debug != 0 {
        log::info!("CHANGE LEVEL: {} {}", next_map, next_spot);
    }

    if debug == 0 {
        gi.change_level(&next_map, &next_spot);
        ctx.edicts[self_idx].changelevel_state = ChangeLevelState::Committed;
        return ChangeLevelResult::Committed;
    }

    // debugging: show what would go, but stay on this map
    let mut save = save_init(&*ctx);
    build_change_list(ctx, gi, Some(&mut save), MAX_LEVEL_CONNECTIONS);
    ctx.transition.last_dry_run = Some(save);

    let ent = &mut ctx.edicts[self_idx];
    ent.touch_fn = None;
    ent.changelevel_state = ChangeLevelState::Committed;
    ChangeLevelResult::DryRun
}

/// Does `ent_idx` travel through `landmark_name`: inside its volumes, or with
/// no volumes, inside the landmark's PVS.
pub fn is_entity_in_transition(
    ctx: &GameContext,
    gi: &dyn GameImport,
    landmark_name: &str,
    ent_idx: usize,
) -> bool {
    if in_transition_volume(ctx, gi, ent_idx, landmark_name) == TransitionVolume::ScreenedOut {
        return false;
    }
    let Some(landmark) = find_landmark(ctx, landmark_name) else {
        return false;
    };
    let pvs = pvs_for_origin(gi, &ctx.edicts[landmark].origin);
    ctx.edict(ent_idx).is_some_and(|e| box_in_pvs(gi, e, &pvs))
}

/// Tell entities that asked to be notified whether they are coming along.
pub fn notify_entities_out_of_transition(ctx: &mut GameContext, gi: &dyn GameImport, self_idx: usize) {
    let landmark_name = ctx.edicts[self_idx].landmark.clone();

    let notified: Vec<usize> = ctx
        .entities()
        .into_iter()
        .filter(|&i| ctx.edicts[i].caps.contains(FCAP_NOTIFY_ON_TRANSITION))
        .collect();

    for ent_idx in notified {
        let caps = ctx.edicts[ent_idx].caps;
        let inside = caps.intersects(FCAP_ACROSS_TRANSITION | FCAP_FORCE_TRANSITION)
            && is_entity_in_transition(ctx, gi, &landmark_name, ent_idx);
        let input = if inside { "InsideTransition" } else { "OutsideTransition" };
        accept_input(ctx, gi, ent_idx, input, "", Some(self_idx), Some(self_idx));
    }
}

/// NPCs leading the player get cut off by the level change.
pub fn warn_about_active_lead(ctx: &GameContext) {
    for i in ctx.entities() {
        let ent = &ctx.edicts[i];
        if ent.leading {
            log::warn!(
                "Entity {} ({}) is still actively leading, its lead will be lost",
                ent.classname,
                ent.debug_name()
            );
        }
    }
}
