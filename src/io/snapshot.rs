use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::model::list::{SortOrder, TaskList};
use crate::model::registry::ListRegistry;
use crate::model::task::{Repeat, Task, new_id};
use crate::model::visibility::VisibilityTracker;
use crate::util::dates;

/// Title given to saved tasks whose title is missing or blank
pub const UNTITLED_TASK: &str = "Untitled";

/// Name given to saved lists whose name is missing
pub const UNTITLED_LIST: &str = "Untitled list";

// ---------------------------------------------------------------------------
// Saved form
// ---------------------------------------------------------------------------

/// Persisted state (written as JSON)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub lists: Vec<ListRecord>,
    pub list_visibility: IndexMap<String, bool>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub sort_order: IndexMap<String, SortOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListRecord {
    pub id: String,
    pub name: String,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    /// `MM/DD/YYYY`
    pub due_date: Option<String>,
    /// `YYYY-MM-DD`, same day as `due_date`
    pub date: Option<String>,
    pub time: String,
    pub all_day: bool,
    pub repeat: Repeat,
    pub starred: bool,
    pub completed: bool,
    pub deadline: String,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        TaskRecord {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date(),
            date: task.iso_date(),
            time: task.persisted_time(),
            all_day: task.all_day(),
            repeat: task.repeat,
            starred: task.starred,
            completed: task.completed,
            deadline: task.deadline().to_string(),
        }
    }
}

impl Snapshot {
    /// Capture the current lists, visibility map and sort preferences
    pub fn capture(
        registry: &ListRegistry,
        visibility: &VisibilityTracker,
        sort_orders: &IndexMap<String, SortOrder>,
    ) -> Self {
        Snapshot {
            lists: registry
                .lists()
                .iter()
                .map(|l| ListRecord {
                    id: l.id.clone(),
                    name: l.name.clone(),
                    tasks: l.tasks().iter().map(TaskRecord::from).collect(),
                })
                .collect(),
            list_visibility: visibility.map().clone(),
            sort_order: sort_orders.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Top-level shape; everything below it is decoded field by field
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    lists: Vec<Value>,
    #[serde(default)]
    list_visibility: Value,
    #[serde(default)]
    sort_order: Value,
}

/// State rebuilt from a saved blob
#[derive(Debug, Clone)]
pub struct Restored {
    pub registry: ListRegistry,
    pub visibility: VisibilityTracker,
    pub sort_orders: IndexMap<String, SortOrder>,
    /// Records that could not be used at all, as JSON text
    pub dropped: Vec<String>,
}

/// Rebuild state from a saved blob.
///
/// Returns `None` when the blob is unreadable or holds no lists, which
/// callers treat as "no saved data". Bad fields inside otherwise readable
/// records fall back to defaults; the deadline is always rederived.
pub fn restore(blob: &str) -> Option<Restored> {
    let raw: RawSnapshot = match serde_json::from_str(blob) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "saved data is unreadable, ignoring it");
            return None;
        }
    };
    if raw.lists.is_empty() {
        return None;
    }

    let mut registry = ListRegistry::new();
    let mut dropped = Vec::new();
    let mut seen_tasks = HashSet::new();

    for value in &raw.lists {
        let Some(obj) = value.as_object() else {
            warn!("dropping saved list that is not an object");
            dropped.push(value.to_string());
            continue;
        };
        let id = str_field(obj, "id").unwrap_or_default();
        let name = str_field(obj, "name").unwrap_or_else(|| UNTITLED_LIST.to_string());
        let mut tasks = Vec::new();
        for task_value in obj.get("tasks").and_then(Value::as_array).into_iter().flatten() {
            match restore_task(task_value, &mut seen_tasks) {
                Some(task) => tasks.push(task),
                None => {
                    warn!(list = %id, "dropping saved task that is not an object");
                    dropped.push(task_value.to_string());
                }
            }
        }
        registry.insert(TaskList::with_tasks(id, name, tasks));
    }

    if registry.is_empty() {
        return None;
    }

    // Flags are keyed by saved id; a list re-keyed on insert above starts
    // without one and is seeded like a new list.
    let visibility = VisibilityTracker::from_map(
        object_field(&raw.list_visibility, "listVisibility")
            .iter()
            .filter_map(|(k, v)| match v.as_bool() {
                Some(b) => Some((k.clone(), b)),
                None => {
                    warn!(list = %k, "ignoring non-boolean visibility flag");
                    None
                }
            })
            .collect(),
    );

    let sort_orders = object_field(&raw.sort_order, "sortOrder")
        .iter()
        .filter_map(|(k, v)| match v.as_str().and_then(SortOrder::parse) {
            Some(order) => Some((k.clone(), order)),
            None => {
                warn!(list = %k, value = %v, "ignoring unknown sort order");
                None
            }
        })
        .collect();

    Some(Restored {
        registry,
        visibility,
        sort_orders,
        dropped,
    })
}

fn restore_task(value: &Value, seen: &mut HashSet<String>) -> Option<Task> {
    let obj = value.as_object()?;

    let mut id = str_field(obj, "id").filter(|s| !s.trim().is_empty()).unwrap_or_default();
    if id.is_empty() || !seen.insert(id.clone()) {
        let fresh = new_id("task");
        if !id.is_empty() {
            warn!(old = %id, new = %fresh, "duplicate task id, assigned a fresh one");
        }
        seen.insert(fresh.clone());
        id = fresh;
    }

    let title = str_field(obj, "title")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED_TASK.to_string());

    let mut task = Task::with_id(id, title);
    task.description = str_field(obj, "description").unwrap_or_default();
    task.starred = bool_field(obj, "starred");
    task.completed = bool_field(obj, "completed");
    task.repeat = match str_field(obj, "repeat") {
        Some(s) => Repeat::parse(&s).unwrap_or_else(|| {
            warn!(task = %task.id, repeat = %s, "unknown repeat, using none");
            Repeat::None
        }),
        None => Repeat::None,
    };

    let date = str_field(obj, "dueDate")
        .and_then(|s| dates::parse_date(&s))
        .or_else(|| str_field(obj, "date").and_then(|s| dates::parse_date(&s)));
    let time = str_field(obj, "time").and_then(|s| dates::parse_time(&s));
    task.set_schedule(date, time, bool_field(obj, "allDay"));
    Some(task)
}

/// A top-level map, or an empty one when the saved value is not an object
fn object_field<'a>(value: &'a Value, name: &str) -> Cow<'a, Map<String, Value>> {
    match value {
        Value::Object(map) => Cow::Borrowed(map),
        Value::Null => Cow::Owned(Map::new()),
        other => {
            warn!(field = name, value = %other, "ignoring malformed saved field");
            Cow::Owned(Map::new())
        }
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}
