use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::snapshot::{self, Snapshot, TaskRecord};
use crate::io::store::Store;
use crate::model::config::Config;
use crate::model::list::{STARRED_LIST_ID, SortOrder};
use crate::model::registry::ListRegistry;
use crate::model::task::{DraftError, Repeat, Task, TaskDraft, TaskEdit};
use crate::model::visibility::{ViewMode, VisibilityTracker};
use crate::ops::view::{Rendered, Surface, ViewRenderer};
use crate::util::dates;

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Notification sent to subscribers after a mutation has been rendered and saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    TaskAdded { list_id: String, task_id: String },
    TaskEdited { list_id: String, task_id: String },
    TaskStarred { list_id: String, task_id: String, starred: bool },
    TaskCompleted { list_id: String, task_id: String, completed: bool },
    TaskDeleted { list_id: String, task_id: String },
    ListCreated { list_id: String },
    ListRenamed { list_id: String },
    ListDeleted { list_id: String },
    VisibilityChanged { list_id: String, visible: bool },
    ShowCompletedChanged { list_id: String, show: bool },
    SortOrderChanged { list_id: String, order: SortOrder },
    ViewChanged { view: ViewMode },
}

/// Receives events together with the surface they produced
pub trait EventSink {
    fn on_event(&mut self, event: &AppEvent, rendered: &Rendered);
}

impl<F: FnMut(&AppEvent, &Rendered)> EventSink for F {
    fn on_event(&mut self, event: &AppEvent, rendered: &Rendered) {
        self(event, rendered)
    }
}

/// Result of an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The change was applied and rendered; `persisted` is false if the save failed
    Applied { persisted: bool },
    /// The target task or list does not exist; nothing changed
    Missed,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    pub fn persisted(self) -> bool {
        matches!(self, Outcome::Applied { persisted: true })
    }
}

/// Prefilled values for the create-task dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskForm {
    /// Today, ISO
    pub date: String,
    /// Name of the remembered target list
    pub list_name: Option<String>,
    /// Every list name, for the dropdown
    pub list_names: Vec<String>,
    pub repeat_options: Vec<(Repeat, String)>,
}

/// Prefilled values for the edit-task dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub list_id: String,
    pub title: String,
    pub description: String,
    /// ISO; today when the task has no date
    pub date: String,
    /// 24h `HH:MM`, empty when unset or all-day
    pub time: String,
    pub all_day: bool,
}

impl From<EditForm> for TaskEdit {
    fn from(form: EditForm) -> Self {
        TaskEdit {
            title: form.title,
            description: form.description,
            date: form.date,
            time: form.time,
            all_day: form.all_day,
        }
    }
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

/// The application state and the single entry point for mutations.
///
/// Every intent runs mutation, visibility sync, render and save, in that
/// order, before returning.
pub struct App<S: Store> {
    registry: ListRegistry,
    visibility: VisibilityTracker,
    sort_orders: IndexMap<String, SortOrder>,
    renderer: ViewRenderer,
    store: S,
    rendered: Rendered,
    /// List chosen when the create-task dialog was opened
    pending_list: Option<String>,
    default_list_name: String,
    sinks: Vec<Box<dyn EventSink>>,
}

impl<S: Store> App<S> {
    /// Rehydrate from the store. Unusable saved data is treated as absent,
    /// which creates the default list.
    pub fn load(store: S, config: &Config) -> Self {
        let mut app = App {
            registry: ListRegistry::new(),
            visibility: VisibilityTracker::new(),
            sort_orders: IndexMap::new(),
            renderer: ViewRenderer::new(config.starred_empty_message.clone()),
            store,
            rendered: Rendered {
                view: ViewMode::All,
                surface: Surface::All { panels: Vec::new() },
                sidebar: Vec::new(),
            },
            pending_list: None,
            default_list_name: config.default_list_name.clone(),
            sinks: Vec::new(),
        };

        let blob = match app.store.load() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "could not read saved data, starting fresh");
                None
            }
        };
        let restored = blob.as_deref().and_then(|b| {
            let restored = snapshot::restore(b);
            if restored.is_none() {
                app.log_recovery(RecoveryEntry::new(
                    RecoveryCategory::Decode,
                    "saved data unusable, replaced by default list",
                    b,
                ));
            }
            restored
        });

        match restored {
            Some(r) => {
                for record in &r.dropped {
                    app.log_recovery(RecoveryEntry::new(
                        RecoveryCategory::Decode,
                        "dropped unreadable record",
                        record.as_str(),
                    ));
                }
                info!(lists = r.registry.len(), "loaded saved lists");
                app.registry = r.registry;
                app.visibility = r.visibility;
                app.sort_orders = r.sort_orders;
                app.sync_visibility();
                app.render();
            }
            None => {
                let name = app.default_list_name.clone();
                let id = app.registry.create_list(name).id.clone();
                app.visibility.set_initial_visibility(&id, ViewMode::All);
                info!(list = %id, "no saved data, created default list");
                app.render();
                app.persist();
            }
        }
        app
    }

    // -- accessors ----------------------------------------------------------

    pub fn registry(&self) -> &ListRegistry {
        &self.registry
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn view(&self) -> ViewMode {
        self.renderer.mode()
    }

    /// The surface produced by the last render
    pub fn rendered(&self) -> &Rendered {
        &self.rendered
    }

    pub fn renderer(&self) -> &ViewRenderer {
        &self.renderer
    }

    pub fn sort_order(&self, list_id: &str) -> SortOrder {
        self.sort_orders.get(list_id).copied().unwrap_or_default()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Find which real list owns a task.
    ///
    /// `list_id` may name the real list, the starred aggregate, or be stale;
    /// the aggregate's back-reference is tried next, then a full scan.
    pub fn resolve_owner(&self, task_id: &str, list_id: Option<&str>) -> Option<String> {
        if let Some(id) = list_id
            && id != STARRED_LIST_ID
            && self.registry.find_task(id, task_id).is_some()
        {
            return Some(id.to_string());
        }
        if let Some(owner) = self.renderer.aggregate().and_then(|a| a.owner_of(task_id))
            && self.registry.find_task(owner, task_id).is_some()
        {
            return Some(owner.to_string());
        }
        let found = self.registry.find_task_owner(task_id).map(|l| l.id.clone());
        if found.is_some() {
            debug!(task = task_id, hint = ?list_id, "owner found by scanning lists");
        }
        found
    }

    // -- task dialog --------------------------------------------------------

    /// Open the create-task dialog, remembering which list it targets.
    /// Without an explicit list, the first list on screen is used.
    pub fn begin_new_task(&mut self, list_id: Option<&str>) -> NewTaskForm {
        let target = match list_id {
            Some(id) if self.registry.contains(id) => Some(id.to_string()),
            Some(id) => {
                warn!(list = id, "create-task target not found, falling back to list name");
                None
            }
            None => self
                .rendered
                .panels()
                .first()
                .map(|p| p.list_id.clone())
                .filter(|id| self.registry.contains(id)),
        };
        self.pending_list = target;

        let today = dates::today();
        NewTaskForm {
            date: dates::format_iso(today),
            list_name: self
                .pending_list
                .as_deref()
                .and_then(|id| self.registry.find_by_id(id))
                .map(|l| l.name.clone()),
            list_names: self.registry.lists().iter().map(|l| l.name.clone()).collect(),
            repeat_options: [
                Repeat::None,
                Repeat::Daily,
                Repeat::Weekly,
                Repeat::Monthly,
                Repeat::Annually,
            ]
            .into_iter()
            .map(|r| (r, r.label(today)))
            .collect(),
        }
    }

    /// Close the create-task dialog without submitting
    pub fn cancel_new_task(&mut self) {
        self.pending_list = None;
    }

    /// Create a task from a dialog draft. The target list is the remembered
    /// one, else the first list named `draft.list`, else a new list with
    /// that name. Returns the new task's id.
    pub fn submit_new_task(&mut self, draft: &TaskDraft) -> Result<String, DraftError> {
        let task = Task::from_draft(draft)?;
        let task_id = task.id.clone();
        let mut events = Vec::new();

        let remembered = self
            .pending_list
            .take()
            .filter(|id| self.registry.contains(id));
        let by_name = || self.registry.find_by_name(&draft.list).map(|l| l.id.clone());
        let list_id = match remembered.or_else(by_name) {
            Some(id) => id,
            None => {
                let name = if draft.list.trim().is_empty() {
                    self.default_list_name.clone()
                } else {
                    draft.list.clone()
                };
                let id = self.registry.create_list(name).id.clone();
                self.visibility.set_initial_visibility(&id, self.view());
                events.push(AppEvent::ListCreated {
                    list_id: id.clone(),
                });
                id
            }
        };

        if let Some(list) = self.registry.find_by_id_mut(&list_id) {
            list.add_task(task);
        }
        events.push(AppEvent::TaskAdded {
            list_id,
            task_id: task_id.clone(),
        });
        self.cycle(events);
        Ok(task_id)
    }

    /// Values to prefill the edit dialog with
    pub fn edit_form(&self, task_id: &str, list_id: Option<&str>) -> Option<EditForm> {
        let owner = self.resolve_owner(task_id, list_id)?;
        let task = self.registry.find_task(&owner, task_id)?;
        Some(EditForm {
            title: task.title.clone(),
            description: task.description.clone(),
            date: task
                .iso_date()
                .unwrap_or_else(|| dates::format_iso(dates::today())),
            time: task.time().map(dates::format_time_24h).unwrap_or_default(),
            all_day: task.all_day(),
            list_id: owner,
        })
    }

    // -- task intents -------------------------------------------------------

    /// Replace a task's editable fields
    pub fn submit_task_edit(
        &mut self,
        task_id: &str,
        list_id: Option<&str>,
        edit: &TaskEdit,
    ) -> Result<Outcome, DraftError> {
        let Some(owner) = self.locate(task_id, list_id, "edit") else {
            return Ok(Outcome::Missed);
        };
        match self.with_task(&owner, task_id, |t| t.apply_edit(edit)) {
            Some(result) => result?,
            None => return Ok(Outcome::Missed),
        }
        Ok(self.cycle(vec![AppEvent::TaskEdited {
            list_id: owner,
            task_id: task_id.to_string(),
        }]))
    }

    /// Clear a task's date, time and all-day flag
    pub fn remove_task_date(&mut self, task_id: &str, list_id: Option<&str>) -> Outcome {
        let Some(owner) = self.locate(task_id, list_id, "remove date") else {
            return Outcome::Missed;
        };
        if self.with_task(&owner, task_id, Task::clear_schedule).is_none() {
            return Outcome::Missed;
        }
        self.cycle(vec![AppEvent::TaskEdited {
            list_id: owner,
            task_id: task_id.to_string(),
        }])
    }

    pub fn toggle_star(&mut self, task_id: &str, list_id: Option<&str>) -> Outcome {
        let Some(owner) = self.locate(task_id, list_id, "star") else {
            return Outcome::Missed;
        };
        let Some(starred) = self.with_task(&owner, task_id, Task::toggle_star) else {
            return Outcome::Missed;
        };
        self.cycle(vec![AppEvent::TaskStarred {
            list_id: owner,
            task_id: task_id.to_string(),
            starred,
        }])
    }

    pub fn toggle_complete(&mut self, task_id: &str, list_id: Option<&str>) -> Outcome {
        let Some(owner) = self.locate(task_id, list_id, "complete") else {
            return Outcome::Missed;
        };
        let Some(completed) = self.with_task(&owner, task_id, Task::toggle_complete) else {
            return Outcome::Missed;
        };
        self.cycle(vec![AppEvent::TaskCompleted {
            list_id: owner,
            task_id: task_id.to_string(),
            completed,
        }])
    }

    pub fn delete_task(&mut self, task_id: &str, list_id: Option<&str>) -> Outcome {
        let Some(owner) = self.locate(task_id, list_id, "delete") else {
            return Outcome::Missed;
        };
        let Some(task) = self.registry.delete_task(&owner, task_id) else {
            return Outcome::Missed;
        };
        if let Ok(body) = serde_json::to_string_pretty(&TaskRecord::from(&task)) {
            self.log_recovery(
                RecoveryEntry::new(RecoveryCategory::Delete, format!("task {} deleted", task.id), body)
                    .field("List", owner.as_str()),
            );
        }
        self.cycle(vec![AppEvent::TaskDeleted {
            list_id: owner,
            task_id: task_id.to_string(),
        }])
    }

    // -- list intents -------------------------------------------------------

    /// Create a list. It starts visible only if created from the all view.
    pub fn create_new_list(&mut self, name: &str) -> String {
        let id = self.registry.create_list(name).id.clone();
        self.visibility.set_initial_visibility(&id, self.view());
        self.cycle(vec![AppEvent::ListCreated { list_id: id.clone() }]);
        id
    }

    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Outcome {
        let Some(list) = self.registry.find_by_id_mut(list_id) else {
            warn!(list = list_id, "rename: list not found");
            return Outcome::Missed;
        };
        list.name = name.to_string();
        self.cycle(vec![AppEvent::ListRenamed {
            list_id: list_id.to_string(),
        }])
    }

    /// Delete a list with all its tasks, its visibility flag and sort preference
    pub fn delete_list(&mut self, list_id: &str) -> Outcome {
        if self.registry.remove_list(list_id).is_none() {
            warn!(list = list_id, "delete: list not found");
            return Outcome::Missed;
        }
        self.visibility.remove(list_id);
        self.sort_orders.shift_remove(list_id);
        if self.pending_list.as_deref() == Some(list_id) {
            self.pending_list = None;
        }
        self.cycle(vec![AppEvent::ListDeleted {
            list_id: list_id.to_string(),
        }])
    }

    /// Sidebar checkbox toggled
    pub fn set_list_visibility(&mut self, list_id: &str, visible: bool) -> Outcome {
        if !self.registry.contains(list_id) {
            warn!(list = list_id, "visibility: list not found");
            return Outcome::Missed;
        }
        self.visibility.set_visible(list_id, visible);
        self.cycle(vec![AppEvent::VisibilityChanged {
            list_id: list_id.to_string(),
            visible,
        }])
    }

    /// Flip a panel's "show completed" toggle; the aggregate id targets the
    /// starred panel.
    pub fn toggle_show_completed(&mut self, list_id: &str) -> Outcome {
        let show = if list_id == STARRED_LIST_ID {
            self.renderer.toggle_starred_show_completed()
        } else {
            match self.registry.find_by_id_mut(list_id) {
                Some(list) => list.toggle_show_completed(),
                None => {
                    warn!(list = list_id, "show completed: list not found");
                    return Outcome::Missed;
                }
            }
        };
        self.cycle(vec![AppEvent::ShowCompletedChanged {
            list_id: list_id.to_string(),
            show,
        }])
    }

    pub fn set_sort_order(&mut self, list_id: &str, order: SortOrder) -> Outcome {
        if !self.registry.contains(list_id) {
            warn!(list = list_id, "sort: list not found");
            return Outcome::Missed;
        }
        self.sort_orders.insert(list_id.to_string(), order);
        self.cycle(vec![AppEvent::SortOrderChanged {
            list_id: list_id.to_string(),
            order,
        }])
    }

    // -- navigation ---------------------------------------------------------

    pub fn switch_view(&mut self, view: ViewMode) -> Outcome {
        self.renderer.set_mode(view);
        self.cycle(vec![AppEvent::ViewChanged { view }])
    }

    pub fn show_all(&mut self) -> Outcome {
        self.switch_view(ViewMode::All)
    }

    pub fn show_starred(&mut self) -> Outcome {
        self.switch_view(ViewMode::Starred)
    }

    // -- read-only presentation ---------------------------------------------

    /// Switch views for this session only. Nothing is saved or announced.
    pub fn preview_view(&mut self, view: ViewMode) {
        self.renderer.set_mode(view);
        self.sync_visibility();
        self.render();
    }

    /// Render completed tasks in every panel without saving the choice
    pub fn preview_completed(&mut self) {
        let ids: Vec<String> = self.registry.lists().iter().map(|l| l.id.clone()).collect();
        for id in ids {
            if let Some(list) = self.registry.find_by_id_mut(&id) {
                list.show_completed = true;
            }
        }
        if !self.renderer.starred_show_completed() {
            self.renderer.toggle_starred_show_completed();
        }
        self.render();
    }

    // -- internals ----------------------------------------------------------

    fn locate(&self, task_id: &str, list_id: Option<&str>, action: &str) -> Option<String> {
        let owner = self.resolve_owner(task_id, list_id);
        if owner.is_none() {
            warn!(task = task_id, list = ?list_id, action, "task not found, ignoring");
        }
        owner
    }

    fn with_task<R>(&mut self, list_id: &str, task_id: &str, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        self.registry.find_by_id_mut(list_id)?.update_task(task_id, f)
    }

    /// Seed flags for lists that have none yet
    fn sync_visibility(&mut self) {
        let view = self.view();
        for list in self.registry.lists() {
            self.visibility.ensure(&list.id, view.is_all());
        }
    }

    fn render(&mut self) {
        self.rendered = self
            .renderer
            .render(&self.registry, &mut self.visibility, &self.sort_orders);
    }

    /// Save a snapshot; failures are logged and leave memory authoritative
    fn persist(&mut self) -> bool {
        let json = match Snapshot::capture(&self.registry, &self.visibility, &self.sort_orders).to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "could not serialize snapshot");
                return false;
            }
        };
        match self.store.save(&json) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "could not save, changes kept in memory only");
                self.log_recovery(
                    RecoveryEntry::new(RecoveryCategory::Write, "snapshot not saved", json)
                        .field("Error", e.to_string()),
                );
                false
            }
        }
    }

    fn cycle(&mut self, events: Vec<AppEvent>) -> Outcome {
        self.sync_visibility();
        self.render();
        let persisted = self.persist();
        for event in &events {
            debug!(?event, persisted, "applied");
            for sink in &mut self.sinks {
                sink.on_event(event, &self.rendered);
            }
        }
        Outcome::Applied { persisted }
    }

    fn log_recovery(&self, entry: RecoveryEntry) {
        if let Some(dir) = self.store.recovery_dir() {
            recovery::log_recovery(dir, entry);
        }
    }
}
