// cvar.rs — console variables

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

use crate::q_shared::{CVAR_LATCH, CVAR_NOSET};

use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CvarError {
    #[error("unknown console variable \"{0}\"")]
    Unknown(String),

    #[error("{0} is write protected")]
    WriteProtected(String),
}

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub latched_string: Option<String>,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
    pub description: String,
}

/// The console variable registry.
#[derive(Debug, Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    cvar_index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Float value of a cvar, 0 if it does not exist.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    /// Integer value of a cvar, truncated toward zero.
    pub fn variable_int(&self, name: &str) -> i32 {
        self.variable_value(name) as i32
    }

    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }

    /// Get or create a cvar. An existing cvar keeps its value and gains `flags`.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        self.register(name, value, flags, "")
    }

    /// Like `get`, attaching help text shown by the console.
    pub fn register(&mut self, name: &str, value: &str, flags: i32, description: &str) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            let var = &mut self.cvar_vars[idx];
            var.flags |= flags;
            if var.description.is_empty() && !description.is_empty() {
                var.description = description.to_string();
            }
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            latched_string: None,
            flags,
            modified: true,
            value: parse_value(value),
            description: description.to_string(),
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    fn set2(&mut self, name: &str, value: &str, force: bool) -> Result<usize, CvarError> {
        let idx = *self
            .cvar_index
            .get(name)
            .ok_or_else(|| CvarError::Unknown(name.to_string()))?;
        let var = &mut self.cvar_vars[idx];

        if !force {
            if var.flags & CVAR_NOSET != 0 {
                return Err(CvarError::WriteProtected(name.to_string()));
            }
            if var.flags & CVAR_LATCH != 0 {
                if value != var.string {
                    log::info!("{} will be changed for next map.", name);
                    var.latched_string = Some(value.to_string());
                } else {
                    var.latched_string = None;
                }
                return Ok(idx);
            }
        } else {
            var.latched_string = None;
        }

        if value == var.string {
            return Ok(idx);
        }

        var.modified = true;
        var.string = value.to_string();
        var.value = parse_value(value);
        Ok(idx)
    }

    /// Set a cvar (respects NOSET and LATCH).
    pub fn set(&mut self, name: &str, value: &str) -> Result<usize, CvarError> {
        self.set2(name, value, false)
    }

    /// Set a cvar ignoring NOSET and LATCH.
    pub fn force_set(&mut self, name: &str, value: &str) -> Result<usize, CvarError> {
        self.set2(name, value, true)
    }

    /// Apply latched values. Called when a new map starts.
    pub fn get_latched_vars(&mut self) {
        for var in &mut self.cvar_vars {
            if let Some(latched) = var.latched_string.take() {
                var.value = parse_value(&latched);
                var.string = latched;
                var.modified = true;
            }
        }
    }
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}
