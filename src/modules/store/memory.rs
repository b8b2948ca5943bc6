// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::{modules::store::model::Task, utc_now};

/// Process-local task list used while the durable medium is unavailable.
/// Contents are lost on restart.
#[derive(Debug, Default)]
pub struct VolatileTasks {
    tasks: Vec<Task>,
}

impl VolatileTasks {
    /// Ids are millisecond timestamps, bumped past the largest id in use so
    /// two inserts within the same millisecond stay distinct.
    fn next_id(&self) -> u64 {
        let now = utc_now!().max(0) as u64;
        let last = self.tasks.iter().filter_map(|t| t.id).max().unwrap_or(0);
        now.max(last + 1)
    }

    pub fn insert(&mut self, mut task: Task) -> Task {
        let id = match task.id {
            Some(id) => id,
            None => self.next_id(),
        };
        task.id = Some(id);
        match self.tasks.iter_mut().find(|t| t.id == Some(id)) {
            Some(existing) => *existing = task.clone(),
            None => self.tasks.push(task.clone()),
        }
        task
    }

    pub fn get_all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn get_by_id(&self, id: u64) -> Option<Task> {
        self.tasks.iter().find(|t| t.id == Some(id)).cloned()
    }

    pub fn delete_by_id(&mut self, id: u64) {
        self.tasks.retain(|t| t.id != Some(id));
    }

    pub fn incomplete_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn get_incomplete(&self) -> Vec<Task> {
        self.tasks.iter().filter(|t| !t.completed).cloned().collect()
    }

    pub fn get_by_action(&self, action_name: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.action_name == action_name)
            .cloned()
            .collect()
    }

    pub fn purge_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        before - self.tasks.len()
    }
}
