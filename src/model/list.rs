use serde::{Deserialize, Serialize};

use super::task::{Task, new_id};

/// Id of the synthetic starred aggregate; never assigned to a real list
pub const STARRED_LIST_ID: &str = "starred-tasks";

/// Per-list tie-break used inside a deadline group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Insertion order
    #[default]
    None,
    /// Case-insensitive title
    Title,
    /// Starred tasks first
    Starred,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::None => "none",
            SortOrder::Title => "title",
            SortOrder::Starred => "starred",
        }
    }

    pub fn parse(s: &str) -> Option<SortOrder> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(SortOrder::None),
            "title" => Some(SortOrder::Title),
            "starred" => Some(SortOrder::Starred),
            _ => None,
        }
    }
}

/// A named, ordered collection of tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    tasks: Vec<Task>,
    completed_count: usize,
    /// Whether completed tasks are rendered (UI only, never persisted)
    pub show_completed: bool,
}

impl TaskList {
    /// Create an empty list with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        TaskList::with_tasks(new_id("list"), name, Vec::new())
    }

    /// Create a list from existing parts (used when loading)
    pub fn with_tasks(id: impl Into<String>, name: impl Into<String>, tasks: Vec<Task>) -> Self {
        let mut list = TaskList {
            id: id.into(),
            name: name.into(),
            tasks,
            completed_count: 0,
            show_completed: false,
        };
        list.refresh();
        list
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Recompute derived counts after any change to the task set
    pub fn refresh(&mut self) {
        self.completed_count = self.tasks.iter().filter(|t| t.completed).count();
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
        self.refresh();
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.find_task(task_id).is_some()
    }

    /// Run `f` against a task and refresh counts afterwards.
    /// Returns `None` if the task is not in this list.
    pub fn update_task<R>(&mut self, task_id: &str, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let task = self.tasks.iter_mut().find(|t| t.id == task_id)?;
        let result = f(task);
        self.refresh();
        Some(result)
    }

    /// Remove a task, returning it
    pub fn remove_task(&mut self, task_id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        let task = self.tasks.remove(idx);
        self.refresh();
        Some(task)
    }

    pub fn toggle_show_completed(&mut self) -> bool {
        self.show_completed = !self.show_completed;
        self.show_completed
    }
}
