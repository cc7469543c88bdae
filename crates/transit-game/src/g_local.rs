// g_local.rs — local definitions for the game module

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

use std::collections::HashMap;

pub use transit_common::q_shared::*;
pub use crate::game::{LoadType, Solid, SVF_NOCLIENT};
use crate::g_transition::TransitionContext;
use transit_common::cvar::CvarContext;

pub const FRAMETIME: f32 = 0.1;

/// We can only ever move this many entities across one transition.
pub const MAX_ENTITY: usize = 512;

// Classnames the transition code looks for
pub const CLASSNAME_WORLDSPAWN: &str = "worldspawn";
pub const CLASSNAME_CHANGELEVEL: &str = "trigger_changelevel";
pub const CLASSNAME_TRANSITION: &str = "trigger_transition";
pub const CLASSNAME_LANDMARK: &str = "info_landmark";
pub const CLASSNAME_PLAYER: &str = "player";

// trigger_changelevel spawnflags
pub const SF_CHANGELEVEL_NOTOUCH: i32 = 0x0002;
pub const SF_CHANGELEVEL_CHAPTER: i32 = 0x0004;

// g_debug_transitions levels
pub const DEBUG_TRANSITIONS_VERBOSE: i32 = 2;

// edict->flags
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntityFlags: i32 {
        const FROZEN = 0x00000002;
    }
}
pub const FL_FROZEN: EntityFlags = EntityFlags::FROZEN;

// edict->caps: what an entity declares it can do
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ObjectCaps: u32 {
        const MUST_SPAWN           = 0x00000001;
        const ACROSS_TRANSITION    = 0x00000002;
        const FORCE_TRANSITION     = 0x00000004;
        const NOTIFY_ON_TRANSITION = 0x00000008;
        const DONT_SAVE            = 0x80000000;
    }
}
pub const FCAP_ACROSS_TRANSITION: ObjectCaps = ObjectCaps::ACROSS_TRANSITION;
pub const FCAP_FORCE_TRANSITION: ObjectCaps = ObjectCaps::FORCE_TRANSITION;
pub const FCAP_NOTIFY_ON_TRANSITION: ObjectCaps = ObjectCaps::NOTIFY_ON_TRANSITION;
pub const FCAP_DONT_SAVE: ObjectCaps = ObjectCaps::DONT_SAVE;

// edict->debug_overlays: render-only markers drawn by the host
bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DebugOverlays: u32 {
        const NAME  = 0x00000002;
        const BBOX  = 0x00000004;
        const PIVOT = 0x00000008;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum MoveType {
    #[default]
    None = 0,
    Walk,
    Noclip,
    Push,
    VPhysics,
}

/// Touch callbacks, resolved by `dispatch::call_touch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchFn {
    ChangeLevel,
}

/// Single-shot state of a trigger_changelevel within a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeLevelState {
    #[default]
    Idle,
    /// Fired during `framenum`, validation in progress.
    Touched { framenum: i32 },
    Committed,
}

/// What a transition-aware entity was told when a level change committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionNotice {
    Inside,
    Outside,
}

/// One output connection, "target,input,parameter,delay,times".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConnection {
    pub target: String,
    pub input: String,
    pub parameter: String,
    pub delay: f32,
    /// -1 fires forever.
    pub times: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Edict {
    pub inuse: bool,
    pub classname: String,
    pub targetname: String,
    pub globalname: String,
    pub model: String,
    pub modelindex: i32,
    pub spawnflags: i32,
    pub svflags: i32,

    pub origin: Vec3,
    pub angles: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub absmin: Vec3,
    pub absmax: Vec3,
    pub solid: Solid,
    pub movetype: MoveType,
    pub velocity: Vec3,

    pub flags: EntityFlags,
    pub caps: ObjectCaps,
    pub move_parent: Option<usize>,
    pub dormant: bool,
    pub debug_overlays: DebugOverlays,

    // players
    pub client: Option<usize>,
    pub health: i32,
    pub in_vehicle: bool,
    pub bonus_challenge: i32,
    pub game_ending: bool,

    // NPCs still running a lead behaviour
    pub leading: bool,

    pub touch_fn: Option<TouchFn>,

    // trigger_changelevel
    pub map: String,
    pub landmark: String,
    pub changelevel_state: ChangeLevelState,
    pub activator: Option<usize>,
    pub on_change_level: Vec<OutputConnection>,

    pub transition_notice: Option<TransitionNotice>,
    /// Inputs this entity received, in order. Hosts drain it each frame.
    pub received_inputs: Vec<String>,
}

impl Edict {
    /// Recompute world bounds from origin and local bounds.
    pub fn link(&mut self) {
        self.absmin = vector_add(&self.origin, &self.mins);
        self.absmax = vector_add(&self.origin, &self.maxs);
    }

    pub fn is_player(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn has_spawnflags(&self, flags: i32) -> bool {
        self.spawnflags & flags != 0
    }

    /// Name used in diagnostics: targetname, else classname.
    pub fn debug_name(&self) -> &str {
        if self.targetname.is_empty() {
            &self.classname
        } else {
            &self.targetname
        }
    }

    pub fn name_matches(&self, name: &str) -> bool {
        !name.is_empty() && q_streq_nocase(&self.targetname, name)
    }
}

/// Level state (cleared on each map change).
#[derive(Debug, Clone, Default)]
pub struct LevelLocals {
    pub framenum: i32,
    pub time: f32,
    pub mapname: String,
    pub load_type: LoadType,
}

/// Everything the game module owns for one level.
#[derive(Debug, Default)]
pub struct GameContext {
    pub edicts: Vec<Edict>,
    pub level: LevelLocals,
    pub cvars: CvarContext,
    pub transition: TransitionContext,
    /// (child, parentname) pairs waiting for the whole map to spawn.
    pub pending_parents: Vec<(usize, String)>,

    entity_by_targetname: HashMap<String, Vec<usize>>,
    entity_by_classname: HashMap<String, Vec<usize>>,
}

impl GameContext {
    /// A context with the world entity in slot 0.
    pub fn new(mapname: &str) -> Self {
        let mut ctx = Self::default();
        ctx.level.mapname = mapname.to_string();
        ctx.edicts.push(Edict {
            inuse: true,
            classname: CLASSNAME_WORLDSPAWN.to_string(),
            solid: Solid::Bsp,
            ..Default::default()
        });
        ctx.register_entity_in_index(0);
        ctx
    }

    pub fn num_edicts(&self) -> usize {
        self.edicts.len()
    }

    /// Claim a free slot (never the world) or append a new one.
    pub fn spawn_edict(&mut self) -> Option<usize> {
        let reuse = self
            .edicts
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, e)| !e.inuse)
            .map(|(i, _)| i);

        let idx = match reuse {
            Some(i) => i,
            None => {
                if self.edicts.len() >= MAX_EDICTS {
                    log::warn!("ED_Alloc: no free edicts");
                    return None;
                }
                self.edicts.push(Edict::default());
                self.edicts.len() - 1
            }
        };

        self.edicts[idx] = Edict {
            inuse: true,
            ..Default::default()
        };
        Some(idx)
    }

    /// Release an edict. The world is never freed.
    pub fn free_edict(&mut self, idx: usize) {
        if idx == 0 {
            return;
        }
        if let Some(ent) = self.edicts.get_mut(idx) {
            *ent = Edict::default();
        }
    }

    /// Build entity lookup indices for search by targetname/classname.
    /// Call after entities are spawned or when entity names change.
    pub fn build_entity_indices(&mut self) {
        self.entity_by_targetname.clear();
        self.entity_by_classname.clear();
        for i in 0..self.edicts.len() {
            self.register_entity_in_index(i);
        }
    }

    /// Register a single entity in the indices (call when spawning a new entity).
    pub fn register_entity_in_index(&mut self, ent_idx: usize) {
        let Some(ent) = self.edicts.get(ent_idx) else {
            return;
        };
        if !ent.inuse {
            return;
        }

        if !ent.targetname.is_empty() {
            let list = self
                .entity_by_targetname
                .entry(ent.targetname.to_lowercase())
                .or_default();
            if !list.contains(&ent_idx) {
                list.push(ent_idx);
                list.sort_unstable();
            }
        }

        if !ent.classname.is_empty() {
            let list = self
                .entity_by_classname
                .entry(ent.classname.to_lowercase())
                .or_default();
            if !list.contains(&ent_idx) {
                list.push(ent_idx);
                list.sort_unstable();
            }
        }
    }

    /// Candidate slots for a targetname. May hold freed or renamed slots,
    /// callers recheck the edict.
    pub fn find_entities_by_targetname(&self, targetname: &str) -> &[usize] {
        self.entity_by_targetname
            .get(&targetname.to_lowercase())
            .map_or(&[][..], Vec::as_slice)
    }

    /// Candidate slots for a classname, same caveat as by targetname.
    pub fn find_entities_by_classname(&self, classname: &str) -> &[usize] {
        self.entity_by_classname
            .get(&classname.to_lowercase())
            .map_or(&[][..], Vec::as_slice)
    }

    /// First in-use player edict. In single player this is the local player.
    pub fn local_player(&self) -> Option<usize> {
        self.edicts.iter().position(|e| e.inuse && e.is_player())
    }

    pub fn deathmatch(&self) -> bool {
        self.cvars.variable_value("deathmatch") != 0.0
    }

    pub fn maxclients(&self) -> i32 {
        self.cvars.variable_int("maxclients").max(1)
    }
}
