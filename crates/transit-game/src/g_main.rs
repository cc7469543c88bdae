// g_main.rs — game module entry points called by the host

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

use crate::entity_index::EntityIndex;
use crate::g_local::*;
use crate::g_spawn::{resolve_move_parents, spawn_entity};
use crate::g_transition::TransitionContext;
use crate::g_trigger::changelevel_activate;
use crate::game_import::GameImport;
use transit_common::common::ConsoleLogger;

/// Register the game's cvars. Called once when the game module loads.
pub fn init_game(ctx: &mut GameContext) {
    log::info!("==== InitGame ====");

    ctx.cvars.register(
        "g_debug_transitions",
        "0",
        0,
        "Show what would cross a level transition instead of changing level. 1 lists the entities, 2 also explains every rejection.",
    );
    ctx.cvars.register(
        "g_transition_dependencies",
        "0",
        0,
        "Also carry entities that a transitioning entity depends on.",
    );
    ctx.cvars.register("developer", "0", 0, "Developer message level.");
    ctx.cvars.register("deathmatch", "0", CVAR_LATCH, "Level transitions are disabled in deathmatch.");
    ctx.cvars.register("maxclients", "1", CVAR_SERVERINFO | CVAR_LATCH, "Players on this server.");
}

/// Start a level from pre-parsed entity key/value lists.
///
/// Entities that fail to spawn are reported and left out; the level still loads.
pub fn spawn_entities<K: AsRef<str>, V: AsRef<str>>(
    ctx: &mut GameContext,
    gi: &dyn GameImport,
    mapname: &str,
    load_type: LoadType,
    entities: &[Vec<(K, V)>],
) {
    ctx.cvars.get_latched_vars();

    // cvars and the map/landmark we arrived through outlive the level
    let cvars = std::mem::take(&mut ctx.cvars);
    let transition = TransitionContext {
        last_dry_run: None,
        ..std::mem::take(&mut ctx.transition)
    };
    *ctx = GameContext::new(mapname);
    ctx.cvars = cvars;
    ctx.transition = transition;
    ctx.level.load_type = load_type;

    let mut inhibited = 0;
    for pairs in entities {
        if let Err(e) = spawn_entity(ctx, pairs) {
            log::debug!("{}", e);
            inhibited += 1;
        }
    }
    if inhibited > 0 {
        log::debug!("{} entities inhibited", inhibited);
    }

    ctx.build_entity_indices();
    resolve_move_parents(ctx);
    activate_entities(ctx, gi);
}

/// Second spawn pass, once every entity of the map exists.
pub fn activate_entities(ctx: &mut GameContext, gi: &dyn GameImport) {
    for ent_idx in ctx.find_by_classname(CLASSNAME_CHANGELEVEL) {
        changelevel_activate(ctx, gi, ent_idx);
    }
}

/// Advance one server frame.
pub fn g_run_frame(ctx: &mut GameContext) {
    ctx.level.framenum += 1;
    ctx.level.time = ctx.level.framenum as f32 * FRAMETIME;
}

/// Keep the console logger's developer level in step with the cvar.
pub fn update_developer(ctx: &GameContext, logger: &ConsoleLogger) {
    let Some(var) = ctx.cvars.find_var("developer") else {
        return;
    };
    let level = var.value as i32;
    if logger.developer() != level {
        logger.set_developer(level);
    }
}
