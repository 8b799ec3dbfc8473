use tracing::{debug, warn};

use super::list::{STARRED_LIST_ID, TaskList};
use super::task::{Task, new_id};

/// Owns every list, in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRegistry {
    lists: Vec<TaskList>,
}

impl ListRegistry {
    pub fn new() -> Self {
        ListRegistry::default()
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Append a new empty list. Duplicate names are allowed.
    pub fn create_list(&mut self, name: impl Into<String>) -> &mut TaskList {
        let list = TaskList::new(name);
        debug!(list = %list.id, name = %list.name, "created list");
        self.insert(list)
    }

    /// Append an existing list, re-keying it if its id is blank, reserved,
    /// or already taken.
    pub fn insert(&mut self, mut list: TaskList) -> &mut TaskList {
        if list.id.trim().is_empty() || list.id == STARRED_LIST_ID || self.contains(&list.id) {
            let fresh = new_id("list");
            warn!(old = %list.id, new = %fresh, "list id unusable, assigned a fresh one");
            list.id = fresh;
        }
        let idx = self.lists.len();
        self.lists.push(list);
        &mut self.lists[idx]
    }

    pub fn contains(&self, list_id: &str) -> bool {
        self.lists.iter().any(|l| l.id == list_id)
    }

    pub fn find_by_id(&self, list_id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    pub fn find_by_id_mut(&mut self, list_id: &str) -> Option<&mut TaskList> {
        self.lists.iter_mut().find(|l| l.id == list_id)
    }

    /// First list with this name, in creation order
    pub fn find_by_name(&self, name: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.name == name)
    }

    /// The list currently holding `task_id`, found by scanning
    pub fn find_task_owner(&self, task_id: &str) -> Option<&TaskList> {
        self.lists.iter().find(|l| l.contains_task(task_id))
    }

    /// Whether any list holds a task with this id
    pub fn contains_task(&self, task_id: &str) -> bool {
        self.find_task_owner(task_id).is_some()
    }

    pub fn find_task(&self, list_id: &str, task_id: &str) -> Option<&Task> {
        self.find_by_id(list_id)?.find_task(task_id)
    }

    /// Remove a task from its list. Misses are logged and return `None`.
    pub fn delete_task(&mut self, list_id: &str, task_id: &str) -> Option<Task> {
        let Some(list) = self.find_by_id_mut(list_id) else {
            warn!(list = list_id, task = task_id, "delete: list not found");
            return None;
        };
        let removed = list.remove_task(task_id);
        if removed.is_none() {
            warn!(list = list_id, task = task_id, "delete: task not found");
        }
        removed
    }

    /// Remove a whole list, returning it
    pub fn remove_list(&mut self, list_id: &str) -> Option<TaskList> {
        let idx = self.lists.iter().position(|l| l.id == list_id)?;
        Some(self.lists.remove(idx))
    }
}
