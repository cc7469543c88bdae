#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::field_reassign_with_default)]
// Game module: level transitions, changelevel triggers, landmarks and the
// list of entities that travel with the player.

pub mod dispatch;
pub mod entity_index;
pub mod game_import;
pub mod game;
pub mod g_local;
pub mod g_utils;
pub mod g_save;
pub mod g_transition;
pub mod g_trigger;
pub mod g_spawn;
pub mod g_main;

pub use entity_index::EntityIndex;
pub use g_local::GameContext;
pub use g_save::{save_init, EntityTableFlags, LevelList, SaveRestoreData};
pub use g_transition::{build_change_list, change_list, TransitionConfig, TransitionContext, TransitionVolume};
pub use game_import::{GameImport, StubGameImport};
