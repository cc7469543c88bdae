// game.rs — types visible to the host engine

// edict->solid values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Solid {
    #[default]
    Not = 0,
    Trigger,
    Bbox,
    Bsp,
    VPhysics,
}

// edict->svflags
pub const SVF_NOCLIENT: i32 = 0x00000001;

/// How the current map was entered. Chapter triggers only matter on a new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadType {
    #[default]
    NewGame,
    LoadGame,
    Transition,
    Background,
}
