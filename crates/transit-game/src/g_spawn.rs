// g_spawn.rs — entity key/value parsing and the classname spawn table

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
use std::sync::OnceLock;

use crate::g_local::*;
use crate::g_trigger::{sp_info_landmark, sp_trigger_changelevel, sp_trigger_transition};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SpawnError {
    #[error("{0} is not a field")]
    UnknownKey(String),
    #[error("{key}: \"{value}\" is not a number")]
    BadNumber { key: String, value: String },
    #[error("{key}: \"{value}\" is not a vector")]
    BadVector { key: String, value: String },
    #[error("{key} \"{value}\" is {len} characters, truncating to {max}")]
    NameTooLong {
        key: String,
        value: String,
        len: usize,
        max: usize,
    },
    #[error("bad output connection \"{0}\"")]
    BadConnection(String),
    #[error("{0} doesn't have a spawn function")]
    NoSpawnFunction(String),
    #[error("ED_Alloc: no free edicts")]
    NoFreeEdicts,
}

// ============================================================
// Spawn table
// ============================================================

pub type SpawnFn = fn(ctx: &mut GameContext, ent_idx: usize);

pub struct SpawnEntry {
    pub name: &'static str,
    pub spawn: SpawnFn,
}

/// QUAKED info_target (1 0 0) (-8 -8 -8) (8 8 8)
/// Named point that travels with the level.
fn sp_info_target(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::Not;
    ent.svflags |= SVF_NOCLIENT;
    ent.caps = FCAP_ACROSS_TRANSITION;
    ent.link();
}

/// QUAKED prop_physics (0 0 1) ?
fn sp_prop_physics(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::VPhysics;
    ent.movetype = MoveType::VPhysics;
    ent.caps = FCAP_ACROSS_TRANSITION;
    ent.link();
}

/// QUAKED func_wall (0 .5 .8) ?
/// Static brush, belongs to the map it is in.
fn sp_func_wall(ctx: &mut GameContext, ent_idx: usize) {
    let ent = &mut ctx.edicts[ent_idx];
    ent.solid = Solid::Bsp;
    ent.movetype = MoveType::Push;
    ent.caps = ObjectCaps::empty();
    ent.link();
}

static SPAWNS: &[SpawnEntry] = &[
    SpawnEntry { name: "info_landmark", spawn: sp_info_landmark },
    SpawnEntry { name: "info_target", spawn: sp_info_target },
    SpawnEntry { name: "trigger_changelevel", spawn: sp_trigger_changelevel },
    SpawnEntry { name: "trigger_transition", spawn: sp_trigger_transition },
    SpawnEntry { name: "prop_physics", spawn: sp_prop_physics },
    SpawnEntry { name: "func_wall", spawn: sp_func_wall },
];

static SPAWNS_INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();

fn get_spawns_index() -> &'static HashMap<&'static str, usize> {
    SPAWNS_INDEX.get_or_init(|| SPAWNS.iter().enumerate().map(|(i, s)| (s.name, i)).collect())
}

// ============================================================
// Key/value parsing
// ============================================================

fn parse_int(key: &str, value: &str) -> Result<i32, SpawnError> {
    value.trim().parse().map_err(|_| SpawnError::BadNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_vector(key: &str, value: &str) -> Result<Vec3, SpawnError> {
    parse_vec3(value).ok_or_else(|| SpawnError::BadVector {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Map and landmark names share the save format's fixed-size slots. Longer
/// names are stored truncated and reported.
fn set_map_name(field: &mut String, key: &str, value: &str) -> Result<(), SpawnError> {
    *field = q_strncpy(value, MAX_MAP_NAME);
    if value.len() >= MAX_MAP_NAME {
        return Err(SpawnError::NameTooLong {
            key: key.to_string(),
            value: value.to_string(),
            len: value.len(),
            max: MAX_MAP_NAME - 1,
        });
    }
    Ok(())
}

/// "target,input,parameter,delay,times". Fields may also be separated by
/// ESC (0x1b); missing trailing fields default to no parameter, no delay,
/// fire forever.
pub fn parse_output_connection(value: &str) -> Result<OutputConnection, SpawnError> {
    let sep = if value.contains('\u{1b}') { '\u{1b}' } else { ',' };
    let parts: Vec<&str> = value.split(sep).map(str::trim).collect();
    let bad = || SpawnError::BadConnection(value.to_string());

    let target = parts.first().copied().filter(|s| !s.is_empty()).ok_or_else(bad)?;
    let input = parts.get(1).copied().filter(|s| !s.is_empty()).ok_or_else(bad)?;
    let parameter = parts.get(2).copied().unwrap_or("");
    let delay = match parts.get(3) {
        Some(s) if !s.is_empty() => s.parse::<f32>().map_err(|_| bad())?,
        _ => 0.0,
    };
    let times = match parts.get(4) {
        Some(s) if !s.is_empty() => s.parse::<i32>().map_err(|_| bad())?,
        _ => -1,
    };

    Ok(OutputConnection {
        target: target.to_string(),
        input: input.to_string(),
        parameter: parameter.to_string(),
        delay,
        times,
    })
}

/// Apply one key/value pair to an edict. Keys are case-insensitive.
pub fn ed_parse_field(ent: &mut Edict, key: &str, value: &str) -> Result<(), SpawnError> {
    match key.to_ascii_lowercase().as_str() {
        "classname" => ent.classname = value.to_string(),
        "targetname" => ent.targetname = value.to_string(),
        "globalname" => ent.globalname = value.to_string(),
        "model" => ent.model = value.to_string(),
        "spawnflags" => ent.spawnflags = parse_int(key, value)?,
        "health" => ent.health = parse_int(key, value)?,
        "origin" => ent.origin = parse_vector(key, value)?,
        "angles" => ent.angles = parse_vector(key, value)?,
        "mins" => ent.mins = parse_vector(key, value)?,
        "maxs" => ent.maxs = parse_vector(key, value)?,
        "parentname" => {}
        "map" => set_map_name(&mut ent.map, key, value)?,
        "landmark" => set_map_name(&mut ent.landmark, key, value)?,
        "onchangelevel" => ent.on_change_level.push(parse_output_connection(value)?),
        _ => return Err(SpawnError::UnknownKey(key.to_string())),
    }
    Ok(())
}

/// Run the spawn function for the edict's classname.
pub fn ed_call_spawn(ctx: &mut GameContext, ent_idx: usize) -> Result<(), SpawnError> {
    let classname = ctx.edicts[ent_idx].classname.to_ascii_lowercase();
    if classname.is_empty() {
        return Err(SpawnError::NoSpawnFunction("NULL classname".to_string()));
    }

    match get_spawns_index().get(classname.as_str()) {
        Some(&idx) => {
            (SPAWNS[idx].spawn)(ctx, ent_idx);
            Ok(())
        }
        None => Err(SpawnError::NoSpawnFunction(classname)),
    }
}

/// Allocate and spawn one entity from its key/value pairs.
///
/// Bad fields are reported and skipped. An entity without a spawn function
/// is freed again.
pub fn spawn_entity<K: AsRef<str>, V: AsRef<str>>(
    ctx: &mut GameContext,
    pairs: &[(K, V)],
) -> Result<usize, SpawnError> {
    let ent_idx = ctx.spawn_edict().ok_or(SpawnError::NoFreeEdicts)?;

    // parentname is resolved once the whole map exists
    let mut parentname = None;
    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        if key.eq_ignore_ascii_case("parentname") {
            parentname = Some(value.to_string());
        }
        if let Err(e) = ed_parse_field(&mut ctx.edicts[ent_idx], key, value) {
            log::warn!("{}", e);
        }
    }

    if let Err(e) = ed_call_spawn(ctx, ent_idx) {
        ctx.free_edict(ent_idx);
        return Err(e);
    }

    ctx.edicts[ent_idx].link();
    ctx.register_entity_in_index(ent_idx);
    if let Some(parent) = parentname {
        ctx.pending_parents.push((ent_idx, parent));
    }
    Ok(ent_idx)
}

/// Put a player in the world for `client`.
pub fn spawn_player(ctx: &mut GameContext, client: usize, origin: Vec3) -> Option<usize> {
    let idx = ctx.spawn_edict()?;
    let ent = &mut ctx.edicts[idx];
    ent.classname = CLASSNAME_PLAYER.to_string();
    ent.client = Some(client);
    ent.health = 100;
    ent.solid = Solid::Bbox;
    ent.movetype = MoveType::Walk;
    // players always come along
    ent.caps = FCAP_ACROSS_TRANSITION | FCAP_FORCE_TRANSITION;
    ent.origin = origin;
    ent.mins = [-16.0, -16.0, -24.0];
    ent.maxs = [16.0, 16.0, 32.0];
    ent.link();
    ctx.register_entity_in_index(idx);
    Some(idx)
}

/// Link entities to the parents named by their parentname key.
pub fn resolve_move_parents(ctx: &mut GameContext) {
    use crate::entity_index::EntityIndex;

    for (child, parentname) in std::mem::take(&mut ctx.pending_parents) {
        match ctx.find_by_name(&parentname).first() {
            Some(&parent) if parent != child => ctx.edicts[child].move_parent = Some(parent),
            _ => log::warn!(
                "{} ({}) has unknown parent {}",
                ctx.edicts[child].classname,
                ctx.edicts[child].debug_name(),
                parentname
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_index::EntityIndex;

    fn make_ctx() -> GameContext {
        GameContext::new("mapA")
    }

    #[test]
    fn test_parse_fields() {
        let mut ent = Edict::default();
        assert!(ed_parse_field(&mut ent, "Origin", "10 20 30").is_ok());
        assert!(ed_parse_field(&mut ent, "spawnflags", "6").is_ok());
        assert!(ed_parse_field(&mut ent, "globalname", "g_gate").is_ok());
        assert_eq!(ent.origin, [10.0, 20.0, 30.0]);
        assert_eq!(ent.spawnflags, 6);
        assert_eq!(ent.globalname, "g_gate");

        assert!(matches!(
            ed_parse_field(&mut ent, "spawnflags", "lots"),
            Err(SpawnError::BadNumber { .. })
        ));
        assert!(matches!(
            ed_parse_field(&mut ent, "origin", "1 2"),
            Err(SpawnError::BadVector { .. })
        ));
        assert_eq!(
            ed_parse_field(&mut ent, "colour", "red"),
            Err(SpawnError::UnknownKey("colour".to_string()))
        );
    }

    #[test]
    fn test_long_map_name_is_truncated() {
        let mut ent = Edict::default();
        let long = "a".repeat(40);
        let err = ed_parse_field(&mut ent, "map", &long);
        assert!(matches!(err, Err(SpawnError::NameTooLong { len: 40, max: 31, .. })));
        assert_eq!(ent.map.len(), 31);

        let exact = "b".repeat(31);
        assert!(ed_parse_field(&mut ent, "landmark", &exact).is_ok());
        assert_eq!(ent.landmark, exact);
    }

    #[test]
    fn test_parse_output_connection() {
        let c = parse_output_connection("relay,Trigger,,0.5,1").unwrap();
        assert_eq!(c.target, "relay");
        assert_eq!(c.input, "Trigger");
        assert_eq!(c.parameter, "");
        assert_eq!(c.delay, 0.5);
        assert_eq!(c.times, 1);

        let c = parse_output_connection("relay\u{1b}Trigger").unwrap();
        assert_eq!((c.delay, c.times), (0.0, -1));

        assert!(parse_output_connection("relay").is_err());
        assert!(parse_output_connection("relay,Trigger,,soon").is_err());
    }

    #[test]
    fn test_spawn_changelevel_from_pairs() {
        let mut ctx = make_ctx();
        let idx = spawn_entity(
            &mut ctx,
            &[
                ("classname", "trigger_changelevel"),
                ("map", "mapB"),
                ("landmark", "lm1"),
                ("mins", "-16 -16 -16"),
                ("maxs", "16 16 16"),
                ("OnChangeLevel", "fade,Fade,,0,-1"),
            ],
        )
        .unwrap();

        let ent = &ctx.edicts[idx];
        assert_eq!(ent.solid, Solid::Trigger);
        assert_eq!(ent.touch_fn, Some(TouchFn::ChangeLevel));
        assert_eq!(ent.on_change_level.len(), 1);
        assert_eq!(ctx.find_by_classname(CLASSNAME_CHANGELEVEL), vec![idx]);
    }

    #[test]
    fn test_unknown_classname_is_freed() {
        let mut ctx = make_ctx();
        let err = spawn_entity(&mut ctx, &[("classname", "monster_grunt")]);
        assert_eq!(err, Err(SpawnError::NoSpawnFunction("monster_grunt".to_string())));
        assert!(ctx.edicts.iter().skip(1).all(|e| !e.inuse));
    }

    #[test]
    fn test_spawn_caps_by_class() {
        let mut ctx = make_ctx();
        let lm = spawn_entity(&mut ctx, &[("classname", "info_landmark"), ("targetname", "lm1")]).unwrap();
        let vol = spawn_entity(&mut ctx, &[("classname", "trigger_transition"), ("targetname", "lm1")]).unwrap();
        let prop = spawn_entity(&mut ctx, &[("classname", "prop_physics")]).unwrap();
        let wall = spawn_entity(&mut ctx, &[("classname", "func_wall")]).unwrap();
        assert!(ctx.edicts[lm].caps.contains(FCAP_ACROSS_TRANSITION));
        assert!(ctx.edicts[vol].caps.is_empty());
        assert!(ctx.edicts[prop].caps.contains(FCAP_ACROSS_TRANSITION));
        assert!(ctx.edicts[wall].caps.is_empty());
    }

    #[test]
    fn test_parentname_links_after_spawn() {
        let mut ctx = make_ctx();
        let child = spawn_entity(&mut ctx, &[("classname", "prop_physics"), ("parentname", "cart")]).unwrap();
        let cart = spawn_entity(&mut ctx, &[("classname", "prop_physics"), ("targetname", "cart")]).unwrap();
        let orphan = spawn_entity(&mut ctx, &[("classname", "prop_physics"), ("parentname", "nobody")]).unwrap();
        resolve_move_parents(&mut ctx);
        assert_eq!(ctx.edicts[child].move_parent, Some(cart));
        assert_eq!(ctx.edicts[orphan].move_parent, None);
        assert_eq!(ctx.root_move_parent(child), cart);
    }

    #[test]
    fn test_spawn_player() {
        let mut ctx = make_ctx();
        let p = spawn_player(&mut ctx, 0, [1.0, 2.0, 3.0]);
        assert_eq!(p, ctx.local_player());
        let p = p.unwrap_or(0);
        assert!(ctx.edicts[p].caps.contains(FCAP_FORCE_TRANSITION));
        assert_eq!(ctx.edicts[p].absmin, [-15.0, -14.0, -21.0]);
    }
}
