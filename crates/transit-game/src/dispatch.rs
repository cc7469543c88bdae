// dispatch.rs — touch callbacks, named inputs and output connections
//
// Touch callbacks are stored on the edict as a `TouchFn` tag and resolved
// here, so an edict never holds a reference into the context that owns it.

use crate::entity_index::EntityIndex;
use crate::g_local::{GameContext, TouchFn, TransitionNotice, CLASSNAME_CHANGELEVEL};
use crate::g_trigger::{input_change_level, touch_change_level};
use crate::game_import::GameImport;

/// Run the touch callback of `self_idx`, if it has one.
pub fn call_touch(ctx: &mut GameContext, gi: &dyn GameImport, self_idx: usize, other_idx: usize) {
    let Some(touch) = ctx.edict(self_idx).and_then(|e| e.touch_fn) else {
        return;
    };
    match touch {
        TouchFn::ChangeLevel => touch_change_level(ctx, gi, self_idx, other_idx),
    }
}

/// Deliver a named input. Returns false if the target is gone or has no
/// handler; the input is still recorded on a live target either way.
pub fn accept_input(
    ctx: &mut GameContext,
    gi: &dyn GameImport,
    target: usize,
    input: &str,
    parameter: &str,
    activator: Option<usize>,
    caller: Option<usize>,
) -> bool {
    let Some(ent) = ctx.edicts.get_mut(target).filter(|e| e.inuse) else {
        return false;
    };
    ent.received_inputs.push(input.to_string());

    if input.eq_ignore_ascii_case("InsideTransition") {
        ent.transition_notice = Some(TransitionNotice::Inside);
        return true;
    }
    if input.eq_ignore_ascii_case("OutsideTransition") {
        ent.transition_notice = Some(TransitionNotice::Outside);
        return true;
    }
    if input.eq_ignore_ascii_case("ChangeLevel") && ent.classname.eq_ignore_ascii_case(CLASSNAME_CHANGELEVEL) {
        input_change_level(ctx, gi, target, activator);
        return true;
    }
    if input.eq_ignore_ascii_case("Kill") {
        ctx.free_edict(target);
        return true;
    }

    log::debug!(
        "{} ({}) has no input {} ({}) from {:?}",
        ent.classname,
        ent.debug_name(),
        input,
        parameter,
        caller
    );
    false
}

/// Fire the OnChangeLevel connections of `self_idx`.
///
/// The level ends before any delayed event could run, so connections with a
/// delay are dropped. Connections that run out of `times` are removed.
pub fn fire_outputs(ctx: &mut GameContext, gi: &dyn GameImport, self_idx: usize, activator: Option<usize>) {
    let connections = match ctx.edicts.get_mut(self_idx) {
        Some(ent) => std::mem::take(&mut ent.on_change_level),
        None => return,
    };

    let mut kept = Vec::with_capacity(connections.len());
    for mut conn in connections {
        if conn.delay > 0.0 {
            log::debug!(
                "OnChangeLevel: dropping {} -> {} delayed {}s, the level is ending",
                conn.target,
                conn.input,
                conn.delay
            );
        } else {
            for target in resolve_target(ctx, &conn.target, self_idx, activator) {
                accept_input(ctx, gi, target, &conn.input, &conn.parameter, activator, Some(self_idx));
            }
        }

        if conn.times > 0 {
            conn.times -= 1;
        }
        if conn.times != 0 {
            kept.push(conn);
        }
    }

    if let Some(ent) = ctx.edicts.get_mut(self_idx).filter(|e| e.inuse) {
        // connections added while firing come after the surviving ones
        kept.append(&mut ent.on_change_level);
        ent.on_change_level = kept;
    }
}

fn resolve_target(ctx: &GameContext, target: &str, self_idx: usize, activator: Option<usize>) -> Vec<usize> {
    match target.to_ascii_lowercase().as_str() {
        "!self" | "!caller" => vec![self_idx],
        "!activator" => activator.into_iter().collect(),
        "!player" => ctx.local_player().into_iter().collect(),
        _ => ctx.find_by_name(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g_local::{OutputConnection, CLASSNAME_PLAYER};
    use crate::game_import::StubGameImport;

    fn make_ctx() -> GameContext {
        GameContext::new("mapA")
    }

    fn add_named(ctx: &mut GameContext, classname: &str, name: &str) -> usize {
        let idx = ctx.spawn_edict().unwrap_or(0);
        ctx.edicts[idx].classname = classname.to_string();
        ctx.edicts[idx].targetname = name.to_string();
        ctx.register_entity_in_index(idx);
        idx
    }

    fn connection(target: &str, input: &str, delay: f32, times: i32) -> OutputConnection {
        OutputConnection {
            target: target.to_string(),
            input: input.to_string(),
            delay,
            times,
            ..Default::default()
        }
    }

    #[test]
    fn test_accept_input_records_and_handles() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx();
        let relay = add_named(&mut ctx, "logic_relay", "r");
        assert!(accept_input(&mut ctx, &gi, relay, "InsideTransition", "", None, None));
        assert!(!accept_input(&mut ctx, &gi, relay, "Trigger", "", None, None));
        assert_eq!(ctx.edicts[relay].received_inputs, vec!["InsideTransition", "Trigger"]);
        assert_eq!(ctx.edicts[relay].transition_notice, Some(TransitionNotice::Inside));

        assert!(accept_input(&mut ctx, &gi, relay, "Kill", "", None, None));
        assert!(!ctx.edicts[relay].inuse);
        assert!(!accept_input(&mut ctx, &gi, relay, "Trigger", "", None, None));
    }

    #[test]
    fn test_fire_outputs_resolves_targets() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx();
        let source = add_named(&mut ctx, "trigger_changelevel", "cl");
        let a = add_named(&mut ctx, "logic_relay", "relays");
        let b = add_named(&mut ctx, "logic_relay", "RELAYS");
        let player = add_named(&mut ctx, CLASSNAME_PLAYER, "");
        ctx.edicts[player].client = Some(0);

        ctx.edicts[source].on_change_level = vec![
            connection("relays", "Trigger", 0.0, -1),
            connection("!activator", "Speak", 0.0, -1),
        ];
        fire_outputs(&mut ctx, &gi, source, Some(player));

        assert_eq!(ctx.edicts[a].received_inputs, vec!["Trigger"]);
        assert_eq!(ctx.edicts[b].received_inputs, vec!["Trigger"]);
        assert_eq!(ctx.edicts[player].received_inputs, vec!["Speak"]);
        assert_eq!(ctx.edicts[source].on_change_level.len(), 2);
    }

    #[test]
    fn test_fire_outputs_drops_delayed_and_spent() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx();
        let source = add_named(&mut ctx, "trigger_changelevel", "cl");
        let relay = add_named(&mut ctx, "logic_relay", "r");
        ctx.edicts[source].on_change_level = vec![
            connection("r", "Later", 2.0, -1),
            connection("r", "Once", 0.0, 1),
            connection("r", "Twice", 0.0, 2),
        ];

        fire_outputs(&mut ctx, &gi, source, None);
        assert_eq!(ctx.edicts[relay].received_inputs, vec!["Once", "Twice"]);
        let left: Vec<(&str, i32)> = ctx.edicts[source]
            .on_change_level
            .iter()
            .map(|c| (c.input.as_str(), c.times))
            .collect();
        assert_eq!(left, vec![("Later", -1), ("Twice", 1)]);
    }

    #[test]
    fn test_call_touch_without_callback_is_noop() {
        let gi = StubGameImport::new();
        let mut ctx = make_ctx();
        let a = add_named(&mut ctx, "func_wall", "");
        let b = add_named(&mut ctx, CLASSNAME_PLAYER, "");
        call_touch(&mut ctx, &gi, a, b);
        call_touch(&mut ctx, &gi, 99, b);
        assert!(gi.change_level_calls().is_empty());
    }
}
