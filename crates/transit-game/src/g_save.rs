// g_save.rs — save-restore entity table used across level transitions

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

use crate::entity_index::EntityIndex;
use transit_common::q_shared::{Vec3, MAX_LEVEL_CONNECTIONS};

// ============================================================
// Entity table flags
// ============================================================

bitflags::bitflags! {
    /// Saved-entity flag word. The low 16 bits say which transitions
    /// (by level list index) the entity travels through.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EntityTableFlags: u32 {
        const PLAYER    = 0x80000000;
        const REMOVED   = 0x40000000;
        const MOVEABLE  = 0x20000000;
        const GLOBAL    = 0x10000000;
        const LEVELMASK = 0x0000FFFF;
    }
}
pub const FENTTABLE_PLAYER: EntityTableFlags = EntityTableFlags::PLAYER;
pub const FENTTABLE_MOVEABLE: EntityTableFlags = EntityTableFlags::MOVEABLE;
pub const FENTTABLE_GLOBAL: EntityTableFlags = EntityTableFlags::GLOBAL;
pub const FENTTABLE_LEVELMASK: EntityTableFlags = EntityTableFlags::LEVELMASK;

impl EntityTableFlags {
    /// The membership bit for transition `level`. None past the 16-bit mask.
    pub fn level(level: usize) -> Option<Self> {
        if level >= MAX_LEVEL_CONNECTIONS {
            return None;
        }
        Some(Self::from_bits_retain(1 << level))
    }

    pub fn in_level(self, level: usize) -> bool {
        Self::level(level).is_some_and(|bit| self.contains(bit))
    }

    /// Transition indices this entity belongs to, ascending.
    pub fn levels(self) -> Vec<usize> {
        (0..MAX_LEVEL_CONNECTIONS).filter(|&i| self.in_level(i)).collect()
    }
}

// ============================================================
// Level list
// ============================================================

/// One accepted transition out of the current map.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelList {
    pub map_name: String,
    pub landmark_name: String,
    /// Edict index of the info_landmark.
    pub landmark: usize,
    pub landmark_origin: Vec3,
}

// ============================================================
// Entity table
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EntityTableEntry {
    pub edict: usize,
    pub classname: String,
    pub flags: EntityTableFlags,
}

/// Save dependency graph: entities that must travel with another entity.
#[derive(Debug, Clone, Default)]
pub struct EntitySaveUtils {
    dependencies: HashMap<usize, Vec<usize>>,
}

impl EntitySaveUtils {
    pub fn add_dependency(&mut self, ent: usize, depends_on: usize) {
        let deps = self.dependencies.entry(ent).or_default();
        if !deps.contains(&depends_on) {
            deps.push(depends_on);
        }
    }

    pub fn dependency_count(&self, ent: usize) -> usize {
        self.dependencies.get(&ent).map_or(0, Vec::len)
    }

    pub fn dependencies(&self, ent: usize) -> &[usize] {
        self.dependencies.get(&ent).map_or(&[][..], Vec::as_slice)
    }
}

/// The host's save context for one save or transition.
#[derive(Debug, Clone, Default)]
pub struct SaveRestoreData {
    table: Vec<EntityTableEntry>,
    table_index: HashMap<usize, usize>,
    pub level_list: Vec<LevelList>,
    pub save_utils: EntitySaveUtils,
}

impl SaveRestoreData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edict to the entity table. Adding twice keeps the first slot.
    pub fn add_entity(&mut self, edict: usize, classname: &str) -> usize {
        if let Some(&slot) = self.table_index.get(&edict) {
            return slot;
        }
        let slot = self.table.len();
        self.table.push(EntityTableEntry {
            edict,
            classname: classname.to_string(),
            flags: EntityTableFlags::empty(),
        });
        self.table_index.insert(edict, slot);
        slot
    }

    pub fn num_entities(&self) -> usize {
        self.table.len()
    }

    /// Table slot of an edict, if it is being saved.
    pub fn entity_index(&self, edict: usize) -> Option<usize> {
        self.table_index.get(&edict).copied()
    }

    pub fn entity_info(&self, slot: usize) -> Option<&EntityTableEntry> {
        self.table.get(slot)
    }

    /// OR `flags` into a slot. Unknown slots are ignored.
    pub fn entity_flags_set(&mut self, slot: usize, flags: EntityTableFlags) {
        if let Some(entry) = self.table.get_mut(slot) {
            entry.flags |= flags;
        }
    }

    /// Flags recorded for an edict, empty if it is not in the table.
    pub fn flags_for_edict(&self, edict: usize) -> EntityTableFlags {
        self.entity_index(edict)
            .and_then(|slot| self.entity_info(slot))
            .map_or(EntityTableFlags::empty(), |e| e.flags)
    }

    pub fn entries(&self) -> &[EntityTableEntry] {
        &self.table
    }

    pub fn connection_count(&self) -> usize {
        self.level_list.len()
    }
}

/// Start a save: every in-use edict except the world gets a table slot,
/// players are marked as such.
pub fn save_init(index: &dyn EntityIndex) -> SaveRestoreData {
    let mut data = SaveRestoreData::new();
    for i in index.entities() {
        if i == 0 {
            continue;
        }
        let Some(ent) = index.edict(i) else {
            continue;
        };
        let slot = data.add_entity(i, &ent.classname);
        if ent.is_player() {
            data.entity_flags_set(slot, FENTTABLE_PLAYER);
        }
    }
    data
}
