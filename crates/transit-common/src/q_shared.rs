// q_shared.rs — foundational types and functions shared by the game and host

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

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

// ============================================================
// Limits
// ============================================================

pub const MAX_EDICTS: usize = 2048;

/// Map and landmark names are stored in 32-byte buffers, terminator included.
pub const MAX_MAP_NAME: usize = 32;

/// One bit per transition in the low word of a saved entity's flags.
pub const MAX_LEVEL_CONNECTIONS: usize = 16;

// ============================================================
// CVar flags
// ============================================================

pub const CVAR_SERVERINFO: i32 = 4;
pub const CVAR_NOSET: i32 = 8;
pub const CVAR_LATCH: i32 = 16;

// ============================================================
// Trace
// ============================================================

#[derive(Debug, Clone)]
pub struct Trace {
    pub allsolid: bool,
    pub startsolid: bool,
    pub fraction: f32,
    pub endpos: Vec3,
}

// ============================================================
// Potentially visible set
// ============================================================

/// Cluster visibility bitset for one source cluster, as returned by the host.
/// Bit `n` set means cluster `n` may be seen from `cluster`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pvs {
    pub cluster: i32,
    pub bits: Vec<u8>,
}

impl Pvs {
    pub fn new(cluster: i32, num_clusters: usize) -> Self {
        Self {
            cluster,
            bits: vec![0; num_clusters.div_ceil(8)],
        }
    }

    /// Marks `cluster` visible. Out-of-range clusters are ignored.
    pub fn set(&mut self, cluster: i32) {
        if cluster < 0 {
            return;
        }
        let c = cluster as usize;
        if let Some(byte) = self.bits.get_mut(c >> 3) {
            *byte |= 1 << (c & 7);
        }
    }

    pub fn is_visible(&self, cluster: i32) -> bool {
        if cluster < 0 {
            return false;
        }
        let c = cluster as usize;
        match self.bits.get(c >> 3) {
            Some(byte) => byte & (1 << (c & 7)) != 0,
            None => false,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.bits.len() * 8
    }
}

// ============================================================
// Vector math
// ============================================================

pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// True when the two closed boxes share at least one point.
pub fn boxes_intersect(mins1: &Vec3, maxs1: &Vec3, mins2: &Vec3, maxs2: &Vec3) -> bool {
    (0..3).all(|i| mins1[i] <= maxs2[i] && maxs1[i] >= mins2[i])
}

/// Parses a "x y z" vector. Missing or unparsable components are rejected.
pub fn parse_vec3(s: &str) -> Option<Vec3> {
    let mut out = [0.0f32; 3];
    let mut parts = s.split_whitespace();
    for slot in out.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Formats a vector the way the console prints positions.
pub fn vtos(v: &Vec3) -> String {
    format!("({} {} {})", v[0] as i32, v[1] as i32, v[2] as i32)
}

// ============================================================
// String helpers
// ============================================================

/// Case-insensitive string equality check.
pub fn q_streq_nocase(s1: &str, s2: &str) -> bool {
    s1.eq_ignore_ascii_case(s2)
}

/// Copies `src` into a buffer of `size` bytes, terminator included.
/// Truncation never splits a UTF-8 sequence.
pub fn q_strncpy(src: &str, size: usize) -> String {
    if size == 0 {
        return String::new();
    }
    let max = size - 1;
    if src.len() <= max {
        return src.to_string();
    }
    let mut end = max;
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    src[..end].to_string()
}
