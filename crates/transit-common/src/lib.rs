// Shared types for the transition game module and its host

pub mod q_shared;
pub mod cvar;
pub mod common;
