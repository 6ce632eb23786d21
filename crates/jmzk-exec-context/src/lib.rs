//! Execution context (C10): maps an action name to its currently active
//! version and dispatches to the handler registered for that version.
//!
//! Handlers are registered in ascending version order starting at 1; the
//! newest registration does not become active on its own — `set_version`
//! must move the action's current version forward explicitly, mirroring
//! how a chain activates a new action revision only after the governing
//! proposal for it passes.

use std::collections::HashMap;

use jmzk_chain_core::{action_name_id, Action, JmzkError, Result};

pub type Handler = Box<dyn Fn(&Action) -> Result<()> + Send + Sync>;

struct VersionEntry {
    type_name: String,
    handler: Handler,
}

struct ActionEntry {
    display_name: String,
    versions: Vec<VersionEntry>,
    curr_ver: u32,
}

#[derive(Default)]
pub struct ExecutionContext {
    entries: HashMap<u64, ActionEntry>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers version `version` of `name`'s handler. `version` must be
    /// exactly one past the number of versions already registered for
    /// this action (i.e. 1, then 2, then 3, ...).
    pub fn register_action(&mut self, name: &str, version: u32, type_name: &str, handler: Handler) -> Result<()> {
        let id = action_name_id(name);
        let entry = self.entries.entry(id).or_insert_with(|| ActionEntry {
            display_name: name.to_string(),
            versions: Vec::new(),
            curr_ver: 1,
        });
        if version as usize != entry.versions.len() + 1 {
            return Err(JmzkError::InvalidArgument(format!(
                "action {name} version {version} registered out of order, expected {}",
                entry.versions.len() + 1
            )));
        }
        entry.versions.push(VersionEntry { type_name: type_name.to_string(), handler });
        Ok(())
    }

    fn entry(&self, id: u64) -> Result<&ActionEntry> {
        self.entries.get(&id).ok_or(JmzkError::InvalidArgument(format!("unknown action id: {id}")))
    }

    pub fn index_of(&self, name: &str) -> Result<u64> {
        let id = action_name_id(name);
        self.entry(id)?;
        Ok(id)
    }

    /// Moves `name`'s current version to `new_ver`, returning the
    /// previous version. `new_ver` must be strictly greater than the
    /// current version and no greater than the highest registered one —
    /// versions never move backward and never skip ahead of what's
    /// actually registered.
    pub fn set_version(&mut self, name: &str, new_ver: u32) -> Result<u32> {
        let id = action_name_id(name);
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| JmzkError::InvalidArgument(format!("unknown action: {name}")))?;
        let max = entry.versions.len() as u32;
        if !(new_ver > entry.curr_ver && new_ver <= max) {
            return Err(JmzkError::InvalidArgument(format!(
                "new version for {name} should be in range ({}, {max}]",
                entry.curr_ver
            )));
        }
        let old = entry.curr_ver;
        entry.curr_ver = new_ver;
        Ok(old)
    }

    pub fn current_version(&self, name: &str) -> Result<u32> {
        let id = action_name_id(name);
        Ok(self.entry(id)?.curr_ver)
    }

    pub fn current_type_name(&self, name: &str) -> Result<&str> {
        let id = action_name_id(name);
        let entry = self.entry(id)?;
        Ok(&entry.versions[(entry.curr_ver - 1) as usize].type_name)
    }

    /// Dispatches `action` to the handler for its current version.
    pub fn invoke(&self, action: &Action) -> Result<()> {
        let entry = self.entry(action.name)?;
        let handler = &entry.versions[(entry.curr_ver - 1) as usize].handler;
        handler(action)
    }

    pub fn display_name(&self, id: u64) -> Option<&str> {
        self.entries.get(&id).map(|e| e.display_name.as_str())
    }
}
