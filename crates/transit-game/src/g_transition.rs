// g_transition.rs — which entities cross a level transition, and through which landmark

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

use std::collections::HashSet;

use crate::entity_index::EntityIndex;
use crate::g_local::*;
use crate::g_save::{
    EntitySaveUtils, EntityTableFlags, LevelList, SaveRestoreData, FENTTABLE_GLOBAL, FENTTABLE_MOVEABLE,
};
use crate::g_utils::{entities_in_pvs, pvs_for_origin, test_entity_trigger_intersection_accurate};
use crate::game_import::GameImport;
use transit_common::cvar::CvarContext;

// ============================================================
// Context
// ============================================================

/// Transition tunables, read from cvars when a transition is planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionConfig {
    /// g_debug_transitions: 0 off, 1 list entities, 2 verbose.
    pub debug_transitions: i32,
    /// g_transition_dependencies: also carry save dependencies of carried entities.
    pub follow_dependencies: bool,
    pub max_transitions: usize,
    pub max_entities: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            debug_transitions: 0,
            follow_dependencies: false,
            max_transitions: MAX_LEVEL_CONNECTIONS,
            max_entities: MAX_ENTITY,
        }
    }
}

impl TransitionConfig {
    pub fn from_cvars(cvars: &CvarContext) -> Self {
        Self {
            debug_transitions: cvars.variable_int("g_debug_transitions"),
            follow_dependencies: cvars.variable_int("g_transition_dependencies") != 0,
            ..Self::default()
        }
    }
}

/// State carried through one level change.
#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    /// Map being travelled to, set when a changelevel commits.
    pub next_map: String,
    /// Landmark being travelled through.
    pub next_spot: String,
    /// Debug level for the transition currently being built, 0 when it is
    /// not the one being travelled through.
    pub debugging_transition: i32,
    pub config: TransitionConfig,
    /// Save table built by the last debug-mode (dry run) level change.
    pub last_dry_run: Option<SaveRestoreData>,
}

// ============================================================
// Landmarks and the level list
// ============================================================

/// First info_landmark named `landmark_name`.
pub fn find_landmark(index: &dyn EntityIndex, landmark_name: &str) -> Option<usize> {
    let found = index.find_by_name(landmark_name).into_iter().find(|&i| {
        index
            .edict(i)
            .is_some_and(|e| e.classname.eq_ignore_ascii_case(CLASSNAME_LANDMARK))
    });
    if found.is_none() {
        log::warn!("Can't find landmark {}", landmark_name);
    }
    found
}

/// Add a transition unless it loops back to this map or repeats a
/// (map, landmark) pair already listed. Returns true if added.
pub fn add_transition_to_list(
    index: &dyn EntityIndex,
    list: &mut Vec<LevelList>,
    map_name: &str,
    landmark_name: &str,
    landmark: usize,
) -> bool {
    if map_name.is_empty() || landmark_name.is_empty() {
        return false;
    }
    let Some(landmark_ent) = index.edict(landmark) else {
        return false;
    };

    // Ignore changelevels to the level we're already in
    if q_streq_nocase(map_name, index.mapname()) {
        return false;
    }

    let map_name = q_strncpy(map_name, MAX_MAP_NAME);
    if list
        .iter()
        .any(|l| l.landmark == landmark && q_streq_nocase(&l.map_name, &map_name))
    {
        return false;
    }

    list.push(LevelList {
        map_name,
        landmark_name: q_strncpy(landmark_name, MAX_MAP_NAME),
        landmark,
        landmark_origin: landmark_ent.origin,
    });
    true
}

/// Every distinct transition out of the current map, in trigger order.
pub fn build_change_level_list(index: &dyn EntityIndex, max_list: usize) -> Vec<LevelList> {
    let max_list = max_list.min(MAX_LEVEL_CONNECTIONS);
    let mut list = Vec::new();
    if max_list == 0 {
        return list;
    }

    let triggers = index.find_by_classname(CLASSNAME_CHANGELEVEL);
    for (n, &trigger_idx) in triggers.iter().enumerate() {
        let Some(trigger) = index.edict(trigger_idx) else {
            continue;
        };
        let Some(landmark) = find_landmark(index, &trigger.landmark) else {
            continue;
        };
        if add_transition_to_list(index, &mut list, &trigger.map, &trigger.landmark, landmark)
            && list.len() >= max_list
        {
            if n + 1 < triggers.len() {
                log::warn!(
                    "Too many level transitions from {}, the remaining {} trigger_changelevel(s) may be ignored",
                    index.mapname(),
                    triggers.len() - n - 1
                );
            }
            break;
        }
    }

    list
}

// ============================================================
// Transition volumes
// ============================================================

/// Outcome of screening an entity against the volumes of one landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionVolume {
    /// Volumes exist for the name and none contains the entity.
    ScreenedOut,
    /// No volume has the name; PVS of the landmark decides.
    NotFound,
    Passed,
}

pub fn in_transition_volume(
    index: &dyn EntityIndex,
    gi: &dyn GameImport,
    ent_idx: usize,
    volume_name: &str,
) -> TransitionVolume {
    let Some(ent) = index.edict(ent_idx) else {
        return TransitionVolume::ScreenedOut;
    };
    if ent.caps.contains(FCAP_FORCE_TRANSITION) {
        return TransitionVolume::Passed;
    }
    screen_transition_volume(index, gi, ent_idx, volume_name)
}

/// Screen by position alone, even for entities that always travel.
pub fn screen_transition_volume(
    index: &dyn EntityIndex,
    gi: &dyn GameImport,
    ent_idx: usize,
    volume_name: &str,
) -> TransitionVolume {
    if index.edict(ent_idx).is_none() {
        return TransitionVolume::ScreenedOut;
    }

    // attachments go wherever their root parent goes
    let root_idx = index.root_move_parent(ent_idx);
    let Some(root) = index.edict(root_idx) else {
        return TransitionVolume::ScreenedOut;
    };

    let mut result = TransitionVolume::NotFound;
    for volume_idx in index.find_by_name(volume_name) {
        let Some(volume) = index.edict(volume_idx) else {
            continue;
        };
        if !volume.classname.eq_ignore_ascii_case(CLASSNAME_TRANSITION) {
            continue;
        }
        if test_entity_trigger_intersection_accurate(gi, volume, root) {
            return TransitionVolume::Passed;
        }
        result = TransitionVolume::ScreenedOut;
    }
    result
}

// ============================================================
// Per-transition entity lists
// ============================================================

/// MOVEABLE and GLOBAL bits for an entity, empty if it should not travel.
pub fn compute_entity_save_flags(ent: &Edict, debugging: i32) -> EntityTableFlags {
    let verbose = debugging == DEBUG_TRANSITIONS_VERBOSE;
    if verbose {
        log::info!("Trying {} ({})", ent.classname, ent.debug_name());
    }

    if ent.caps.contains(FCAP_DONT_SAVE) {
        if verbose {
            log::info!("IGNORED due to being marked \"Don't save\".");
        }
        return EntityTableFlags::empty();
    }

    let mut flags = EntityTableFlags::empty();
    if ent.caps.contains(FCAP_ACROSS_TRANSITION) {
        flags |= FENTTABLE_MOVEABLE;
    }
    if !ent.globalname.is_empty() && !ent.dormant {
        flags |= FENTTABLE_GLOBAL;
    }

    if verbose && flags.is_empty() {
        log::info!("IGNORED, no across_transition flag & no globalname");
    }
    flags
}

/// Entities bound for one transition, in the order they were found.
#[derive(Debug, Clone, Default)]
pub struct EntityTransitionList {
    pub entities: Vec<(usize, EntityTableFlags)>,
    /// More entities qualified than the list could hold.
    pub overflowed: bool,
    /// Render markers to set on entities while debugging this transition.
    pub debug_marks: Vec<(usize, DebugOverlays)>,
}

impl EntityTransitionList {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, ent_idx: usize) -> bool {
        self.entities.iter().any(|(e, _)| *e == ent_idx)
    }

    fn add(&mut self, index: &dyn EntityIndex, ent_idx: usize, flags: EntityTableFlags, debugging: i32) {
        self.entities.push((ent_idx, flags));

        if debugging != 0 {
            if debugging == DEBUG_TRANSITIONS_VERBOSE {
                log::info!("ADDED.");
            } else if let Some(ent) = index.edict(ent_idx) {
                log::info!("ADDED {} ({}) to transition.", ent.classname, ent.debug_name());
            }
            self.debug_marks
                .push((ent_idx, DebugOverlays::BBOX | DebugOverlays::NAME));
        }
    }
}

/// Entities in the landmark's PVS that would travel through `landmark_name`.
pub fn build_entity_transition_list(
    index: &dyn EntityIndex,
    gi: &dyn GameImport,
    tc: &mut TransitionContext,
    landmark: usize,
    landmark_name: &str,
    max_list: usize,
) -> EntityTransitionList {
    let mut list = EntityTransitionList::default();
    let Some(landmark_ent) = index.edict(landmark) else {
        return list;
    };

    // Only show debug for the transition to the level we're going to
    if tc.config.debug_transitions != 0 && landmark_ent.name_matches(&tc.next_spot) {
        tc.debugging_transition = tc.config.debug_transitions;
        list.debug_marks.push((
            landmark,
            DebugOverlays::PIVOT | DebugOverlays::BBOX | DebugOverlays::NAME,
        ));
    } else {
        tc.debugging_transition = 0;
    }
    let debugging = tc.debugging_transition;

    let pvs = pvs_for_origin(gi, &landmark_ent.origin);
    for ent_idx in entities_in_pvs(index, gi, &pvs) {
        let Some(ent) = index.edict(ent_idx) else {
            continue;
        };
        let flags = compute_entity_save_flags(ent, debugging);
        if flags.is_empty() {
            continue;
        }

        if in_transition_volume(index, gi, ent_idx, landmark_name) == TransitionVolume::ScreenedOut {
            if debugging == DEBUG_TRANSITIONS_VERBOSE {
                log::info!("IGNORED, outside transition volume.");
            }
            continue;
        }

        if list.len() >= max_list {
            log::warn!("Too many entities across a transition!");
            list.overflowed = true;
            break;
        }

        list.add(index, ent_idx, flags, debugging);
    }

    list
}

/// Pull save dependencies of listed entities into the same list.
pub fn add_dependent_entities(
    index: &dyn EntityIndex,
    save_utils: &EntitySaveUtils,
    tc: &TransitionContext,
    list: &mut EntityTransitionList,
    max_list: usize,
) {
    let mut saved: HashSet<usize> = list.entities.iter().map(|(e, _)| *e).collect();

    // the list grows while we walk it
    let mut i = 0;
    while i < list.len() {
        let (ent_idx, _) = list.entities[i];
        i += 1;

        for &dependent in save_utils.dependencies(ent_idx) {
            let Some(dep) = index.edict(dependent) else {
                continue;
            };
            if !saved.insert(dependent) {
                continue;
            }

            let flags = compute_entity_save_flags(dep, tc.debugging_transition);
            if flags.is_empty() {
                log::warn!(
                    "Save dependency {} ({}) is linked to an entity that doesn't want to be saved!",
                    dep.classname,
                    dep.debug_name()
                );
                continue;
            }

            if list.len() >= max_list {
                log::warn!("Too many entities across a transition!");
                list.overflowed = true;
                return;
            }

            if tc.config.debug_transitions != 0 {
                log::info!("ADDED DEPENDENCY: {} ({})", dep.classname, dep.debug_name());
            }
            list.add(index, dependent, flags, tc.debugging_transition);
        }
    }
}

// ============================================================
// Change list
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    pub levels: Vec<LevelList>,
    pub debug_marks: Vec<(usize, DebugOverlays)>,
    /// Some transition dropped entities for lack of room.
    pub overflowed: bool,
}

impl ChangeList {
    pub fn count(&self) -> usize {
        self.levels.len()
    }
}

/// Find every transition out of this map and tag the save table with the
/// entities that travel through each one.
///
/// Each entity's table flags get its MOVEABLE/GLOBAL bits plus bit `i` for
/// every transition `i` it belongs to. Entities the table does not hold yet
/// get a slot.
pub fn change_list(
    index: &dyn EntityIndex,
    gi: &dyn GameImport,
    tc: &mut TransitionContext,
    save: Option<&mut SaveRestoreData>,
    max_list: usize,
) -> ChangeList {
    let max_list = max_list.min(tc.config.max_transitions);
    let mut result = ChangeList {
        levels: build_change_level_list(index, max_list),
        ..ChangeList::default()
    };

    let Some(save) = save else {
        return result;
    };
    save.level_list = result.levels.clone();
    if save.num_entities() == 0 {
        return result;
    }

    let max_entities = tc.config.max_entities;
    for (i, level) in result.levels.iter().enumerate() {
        let Some(level_bit) = EntityTableFlags::level(i) else {
            break;
        };

        let mut list =
            build_entity_transition_list(index, gi, tc, level.landmark, &level.landmark_name, max_entities);
        if tc.config.follow_dependencies {
            add_dependent_entities(index, &save.save_utils, tc, &mut list, max_entities);
        }

        for &(ent_idx, flags) in &list.entities {
            let slot = match save.entity_index(ent_idx) {
                Some(slot) => slot,
                None => {
                    let classname = index.edict(ent_idx).map_or("", |e| e.classname.as_str());
                    log::debug!("{} ({}) bound for {} had no save slot", classname, ent_idx, level.map_name);
                    save.add_entity(ent_idx, classname)
                }
            };
            save.entity_flags_set(slot, flags | level_bit);
        }

        result.overflowed |= list.overflowed;
        result.debug_marks.append(&mut list.debug_marks);
    }

    result
}

/// Set the render markers produced while debugging a transition.
pub fn apply_debug_marks(ctx: &mut GameContext, marks: &[(usize, DebugOverlays)]) {
    for &(ent_idx, overlays) in marks {
        if let Some(ent) = ctx.edicts.get_mut(ent_idx) {
            ent.debug_overlays |= overlays;
        }
    }
}

/// Host entry point: build the change list for the current world into `save`.
/// Returns the number of level connections.
pub fn build_change_list(
    ctx: &mut GameContext,
    gi: &dyn GameImport,
    save: Option<&mut SaveRestoreData>,
    max_list: usize,
) -> usize {
    let mut tc = std::mem::take(&mut ctx.transition);
    tc.config = TransitionConfig::from_cvars(&ctx.cvars);
    let result = change_list(&*ctx, gi, &mut tc, save, max_list);
    ctx.transition = tc;

    apply_debug_marks(ctx, &result.debug_marks);
    result.count()
}
