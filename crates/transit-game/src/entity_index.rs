// entity_index.rs — read-only entity directory queries

use crate::g_local::{Edict, GameContext};

/// Read-only view of the entity directory.
///
/// The transition planner only ever reads the world through this trait, so a
/// host (or a test) can hand it any entity store.
pub trait EntityIndex: Sync {
    fn mapname(&self) -> &str;

    /// Number of slots, in use or not.
    fn num_edicts(&self) -> usize;

    /// The edict in `idx`, if that slot is in use.
    fn edict(&self, idx: usize) -> Option<&Edict>;

    /// In-use entities whose targetname matches (case-insensitive), in slot order.
    fn find_by_name(&self, name: &str) -> Vec<usize>;

    /// In-use entities of a classname (case-insensitive), in slot order.
    fn find_by_classname(&self, classname: &str) -> Vec<usize>;

    /// In-use slots, in order.
    fn entities(&self) -> Vec<usize> {
        (0..self.num_edicts())
            .filter(|&i| self.edict(i).is_some())
            .collect()
    }

    /// Follow `move_parent` to the top. Broken links stop at the last valid
    /// entity; a cycle stops after visiting every slot once.
    fn root_move_parent(&self, idx: usize) -> usize {
        let mut current = idx;
        for _ in 0..self.num_edicts() {
            let parent = match self.edict(current).and_then(|e| e.move_parent) {
                Some(p) => p,
                None => return current,
            };
            if parent == current || self.edict(parent).is_none() {
                return current;
            }
            current = parent;
        }
        current
    }
}

impl EntityIndex for GameContext {
    fn mapname(&self) -> &str {
        &self.level.mapname
    }

    fn num_edicts(&self) -> usize {
        self.edicts.len()
    }

    fn edict(&self, idx: usize) -> Option<&Edict> {
        self.edicts.get(idx).filter(|e| e.inuse)
    }

    fn find_by_name(&self, name: &str) -> Vec<usize> {
        if name.is_empty() {
            return Vec::new();
        }
        self.find_entities_by_targetname(name)
            .iter()
            .copied()
            .filter(|&i| self.edict(i).is_some_and(|e| e.name_matches(name)))
            .collect()
    }

    fn find_by_classname(&self, classname: &str) -> Vec<usize> {
        self.find_entities_by_classname(classname)
            .iter()
            .copied()
            .filter(|&i| {
                self.edict(i)
                    .is_some_and(|e| e.classname.eq_ignore_ascii_case(classname))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ctx(num_edicts: usize) -> GameContext {
        let mut ctx = GameContext::new("map1");
        for _ in 1..num_edicts {
            ctx.spawn_edict();
        }
        ctx
    }

    #[test]
    fn test_find_by_name_skips_freed_and_renamed() {
        let mut ctx = make_ctx(4);
        for i in 1..4 {
            ctx.edicts[i].targetname = "lm".to_string();
        }
        ctx.build_entity_indices();
        ctx.free_edict(2);
        ctx.edicts[3].targetname = "renamed".to_string();
        assert_eq!(ctx.find_by_name("LM"), vec![1]);
        assert!(ctx.find_by_name("").is_empty());
    }

    #[test]
    fn test_entities_lists_in_use_slots() {
        let mut ctx = make_ctx(4);
        ctx.free_edict(2);
        assert_eq!(ctx.entities(), vec![0, 1, 3]);
    }

    #[test]
    fn test_root_move_parent_follows_chain() {
        let mut ctx = make_ctx(4);
        ctx.edicts[3].move_parent = Some(2);
        ctx.edicts[2].move_parent = Some(1);
        assert_eq!(ctx.root_move_parent(3), 1);
        assert_eq!(ctx.root_move_parent(1), 1);
    }

    #[test]
    fn test_root_move_parent_survives_cycle_and_dangling_parent() {
        let mut ctx = make_ctx(4);
        ctx.edicts[1].move_parent = Some(2);
        ctx.edicts[2].move_parent = Some(1);
        let root = ctx.root_move_parent(1);
        assert!(root == 1 || root == 2);

        ctx.edicts[3].move_parent = Some(99);
        assert_eq!(ctx.root_move_parent(3), 3);
    }
}
