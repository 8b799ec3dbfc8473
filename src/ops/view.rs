use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::list::{STARRED_LIST_ID, SortOrder, TaskList};
use crate::model::registry::ListRegistry;
use crate::model::task::{Repeat, Task};
use crate::model::visibility::{ViewMode, VisibilityTracker};

/// Display name of the starred aggregate panel
pub const STARRED_LIST_NAME: &str = "Starred Tasks";

// ---------------------------------------------------------------------------
// Rendered surface
// ---------------------------------------------------------------------------

/// One task line in a panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub id: String,
    /// The real list that owns this task (never the aggregate id)
    pub list_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub deadline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub repeat: Repeat,
    pub starred: bool,
    pub completed: bool,
}

/// Tasks sharing a deadline string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskGroup {
    pub deadline: String,
    pub tasks: Vec<TaskRow>,
}

/// A rendered list (real or the starred aggregate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListPanel {
    pub list_id: String,
    pub name: String,
    pub groups: Vec<TaskGroup>,
    /// Completed tasks, only filled when `show_completed` is on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed_groups: Vec<TaskGroup>,
    pub completed_count: usize,
    pub show_completed: bool,
}

/// What the starred view shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StarredPanel {
    Tasks(ListPanel),
    Empty { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Surface {
    All { panels: Vec<ListPanel> },
    Starred { panel: StarredPanel },
}

/// One sidebar checkbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarEntry {
    pub list_id: String,
    pub name: String,
    pub visible: bool,
}

/// Output of a full render pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub view: ViewMode,
    pub surface: Surface,
    pub sidebar: Vec<SidebarEntry>,
}

impl Rendered {
    /// Panels on screen, in order
    pub fn panels(&self) -> Vec<&ListPanel> {
        match &self.surface {
            Surface::All { panels } => panels.iter().collect(),
            Surface::Starred {
                panel: StarredPanel::Tasks(panel),
            } => vec![panel],
            Surface::Starred { .. } => Vec::new(),
        }
    }

    /// Every task row on screen, open tasks first per panel
    pub fn rows(&self) -> Vec<&TaskRow> {
        self.panels()
            .into_iter()
            .flat_map(|p| p.groups.iter().chain(p.completed_groups.iter()))
            .flat_map(|g| g.tasks.iter())
            .collect()
    }

    pub fn empty_message(&self) -> Option<&str> {
        match &self.surface {
            Surface::Starred {
                panel: StarredPanel::Empty { message },
            } => Some(message),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Starred aggregate
// ---------------------------------------------------------------------------

/// A starred task copied out of its list, remembering where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedTask {
    pub task: Task,
    pub owner_id: String,
}

/// Synthetic list of every starred task across all lists.
///
/// Rebuilt from the registry on each render; edits must go to the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarredAggregate {
    tasks: Vec<ProjectedTask>,
}

impl StarredAggregate {
    pub fn build(registry: &ListRegistry) -> Self {
        let tasks = registry
            .lists()
            .iter()
            .flat_map(|list| {
                list.tasks()
                    .iter()
                    .filter(|t| t.starred)
                    .map(move |t| ProjectedTask {
                        task: t.clone(),
                        owner_id: list.id.clone(),
                    })
            })
            .collect();
        StarredAggregate { tasks }
    }

    pub fn id(&self) -> &'static str {
        STARRED_LIST_ID
    }

    pub fn tasks(&self) -> &[ProjectedTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Back-reference for a projected task
    pub fn owner_of(&self, task_id: &str) -> Option<&str> {
        self.tasks
            .iter()
            .find(|p| p.task.id == task_id)
            .map(|p| p.owner_id.as_str())
    }

    /// Whether any starred task is still open
    pub fn has_open_tasks(&self) -> bool {
        self.tasks.iter().any(|p| !p.task.completed)
    }

    fn to_panel(&self, show_completed: bool) -> ListPanel {
        let entries = self
            .tasks
            .iter()
            .map(|p| (&p.task, p.owner_id.as_str()))
            .collect();
        build_panel(
            STARRED_LIST_ID,
            STARRED_LIST_NAME,
            entries,
            show_completed,
            SortOrder::None,
        )
    }
}

// ---------------------------------------------------------------------------
// Grouping and ordering
// ---------------------------------------------------------------------------

/// Order tasks by due date/time (undated last), then by the list's sort
/// preference. The sort is stable, so remaining ties keep insertion order.
pub fn order_tasks<'a>(tasks: &mut [(&'a Task, &'a str)], sort: SortOrder) {
    tasks.sort_by(|(a, _), (b, _)| compare_tasks(a, b, sort));
}

fn compare_tasks(a: &Task, b: &Task, sort: SortOrder) -> Ordering {
    let by_due = match (a.due_key(), b.due_key()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due.then_with(|| match sort {
        SortOrder::None => Ordering::Equal,
        SortOrder::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortOrder::Starred => b.starred.cmp(&a.starred),
    })
}

/// Group already-ordered tasks by deadline, keeping first-seen group order
pub fn group_by_deadline<'a>(tasks: impl IntoIterator<Item = (&'a Task, &'a str)>) -> Vec<TaskGroup> {
    let mut groups: IndexMap<String, Vec<TaskRow>> = IndexMap::new();
    for (task, owner) in tasks {
        groups
            .entry(task.deadline().to_string())
            .or_default()
            .push(task_row(task, owner));
    }
    groups
        .into_iter()
        .map(|(deadline, tasks)| TaskGroup { deadline, tasks })
        .collect()
}

fn task_row(task: &Task, owner: &str) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        list_id: owner.to_string(),
        title: task.title.clone(),
        description: task.description.clone(),
        deadline: task.deadline().to_string(),
        time: task.display_time(),
        repeat: task.repeat,
        starred: task.starred,
        completed: task.completed,
    }
}

fn build_panel<'a>(
    list_id: &str,
    name: &str,
    mut entries: Vec<(&'a Task, &'a str)>,
    show_completed: bool,
    sort: SortOrder,
) -> ListPanel {
    order_tasks(&mut entries, sort);
    let (done, open): (Vec<_>, Vec<_>) = entries.into_iter().partition(|(t, _)| t.completed);
    let completed_count = done.len();
    ListPanel {
        list_id: list_id.to_string(),
        name: name.to_string(),
        groups: group_by_deadline(open),
        completed_groups: if show_completed {
            group_by_deadline(done)
        } else {
            Vec::new()
        },
        completed_count,
        show_completed,
    }
}

/// Render a real list straight from the live entity
pub fn list_panel(list: &TaskList, sort: SortOrder) -> ListPanel {
    let entries = list.tasks().iter().map(|t| (t, list.id.as_str())).collect();
    build_panel(&list.id, &list.name, entries, list.show_completed, sort)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Holds the current view mode and the most recent starred aggregate
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    mode: ViewMode,
    aggregate: Option<StarredAggregate>,
    starred_show_completed: bool,
    empty_message: String,
}

impl ViewRenderer {
    pub fn new(empty_message: impl Into<String>) -> Self {
        ViewRenderer {
            mode: ViewMode::All,
            aggregate: None,
            starred_show_completed: false,
            empty_message: empty_message.into(),
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Switch views. Only user navigation calls this.
    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
        if mode.is_all() {
            self.aggregate = None;
        }
    }

    /// The aggregate from the last starred render, if the starred view is up
    pub fn aggregate(&self) -> Option<&StarredAggregate> {
        self.aggregate.as_ref()
    }

    pub fn starred_show_completed(&self) -> bool {
        self.starred_show_completed
    }

    pub fn toggle_starred_show_completed(&mut self) -> bool {
        self.starred_show_completed = !self.starred_show_completed;
        self.starred_show_completed
    }

    /// Render the current view. Under the all view, lists seen for the first
    /// time get a visible entry in the tracker.
    pub fn render(
        &mut self,
        registry: &ListRegistry,
        visibility: &mut VisibilityTracker,
        sort_orders: &IndexMap<String, SortOrder>,
    ) -> Rendered {
        let surface = match self.mode {
            ViewMode::All => self.render_all(registry, visibility, sort_orders),
            ViewMode::Starred => self.render_starred(registry),
        };
        let sidebar = registry
            .lists()
            .iter()
            .map(|l| SidebarEntry {
                list_id: l.id.clone(),
                name: l.name.clone(),
                visible: visibility.is_visible(&l.id, self.mode),
            })
            .collect();
        Rendered {
            view: self.mode,
            surface,
            sidebar,
        }
    }

    fn render_all(
        &mut self,
        registry: &ListRegistry,
        visibility: &mut VisibilityTracker,
        sort_orders: &IndexMap<String, SortOrder>,
    ) -> Surface {
        self.aggregate = None;
        let panels = registry
            .lists()
            .iter()
            .filter(|l| visibility.ensure(&l.id, true))
            .map(|l| list_panel(l, sort_orders.get(&l.id).copied().unwrap_or_default()))
            .collect();
        Surface::All { panels }
    }

    fn render_starred(&mut self, registry: &ListRegistry) -> Surface {
        let aggregate = StarredAggregate::build(registry);
        let panel = if aggregate.has_open_tasks() {
            StarredPanel::Tasks(aggregate.to_panel(self.starred_show_completed))
        } else {
            StarredPanel::Empty {
                message: self.empty_message.clone(),
            }
        };
        self.aggregate = Some(aggregate);
        Surface::Starred { panel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dated(title: &str, date: &str) -> Task {
        let mut t = Task::new(title);
        t.set_schedule_from_input(date, "", false);
        t
    }

    fn registry_with(tasks: Vec<Task>) -> (ListRegistry, String) {
        let mut reg = ListRegistry::new();
        let list = reg.create_list("Work");
        for t in tasks {
            list.add_task(t);
        }
        let id = list.id.clone();
        (reg, id)
    }

    fn titles(group: &TaskGroup) -> Vec<&str> {
        group.tasks.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn orders_by_date_with_undated_last() {
        let undated_a = Task::new("undated a");
        let feb = dated("feb", "2025-02-01");
        let undated_b = Task::new("undated b");
        let jan = dated("jan", "2025-01-01");
        let (reg, _) = registry_with(vec![undated_a, feb, undated_b, jan]);

        let panel = list_panel(&reg.lists()[0], SortOrder::None);
        let all: Vec<&str> = panel.groups.iter().flat_map(titles).collect();
        assert_eq!(all, vec!["jan", "feb", "undated a", "undated b"]);
        assert_eq!(panel.groups.last().unwrap().deadline, "No date");
    }

    #[test]
    fn same_deadline_across_years_sorts_by_year() {
        // 2025-03-10 and 2031-03-10 are both Mondays
        let later = dated("later", "2031-03-10");
        let sooner = dated("sooner", "2025-03-10");
        let (reg, _) = registry_with(vec![later, sooner]);
        let panel = list_panel(&reg.lists()[0], SortOrder::None);
        assert_eq!(panel.groups.len(), 1);
        assert_eq!(titles(&panel.groups[0]), vec!["sooner", "later"]);
    }

    #[test]
    fn timed_tasks_sort_within_day() {
        let mut late = Task::new("late");
        late.set_schedule_from_input("2025-03-10", "17:00", false);
        let mut early = Task::new("early");
        early.set_schedule_from_input("2025-03-10", "08:00", false);
        let (reg, _) = registry_with(vec![late, early]);
        let panel = list_panel(&reg.lists()[0], SortOrder::None);
        assert_eq!(titles(&panel.groups[0]), vec!["early", "late"]);
        assert_eq!(panel.groups[0].tasks[0].time.as_deref(), Some("8:00am"));
    }

    #[test]
    fn sort_preference_breaks_ties() {
        let mut starred = Task::new("b starred");
        starred.starred = true;
        let plain = Task::new("A plain");
        let (reg, _) = registry_with(vec![starred, plain]);
        let list = &reg.lists()[0];

        let by_title = list_panel(list, SortOrder::Title);
        assert_eq!(titles(&by_title.groups[0]), vec!["A plain", "b starred"]);

        let by_star = list_panel(list, SortOrder::Starred);
        assert_eq!(titles(&by_star.groups[0]), vec!["b starred", "A plain"]);

        let insertion = list_panel(list, SortOrder::None);
        assert_eq!(titles(&insertion.groups[0]), vec!["b starred", "A plain"]);
    }

    #[test]
    fn completed_tasks_hidden_unless_shown() {
        let mut done = Task::new("done");
        done.completed = true;
        let (mut reg, id) = registry_with(vec![done, Task::new("open")]);

        let panel = list_panel(&reg.lists()[0], SortOrder::None);
        assert_eq!(panel.completed_count, 1);
        assert!(panel.completed_groups.is_empty());
        assert_eq!(titles(&panel.groups[0]), vec!["open"]);

        reg.find_by_id_mut(&id).unwrap().toggle_show_completed();
        let panel = list_panel(&reg.lists()[0], SortOrder::None);
        assert_eq!(titles(&panel.completed_groups[0]), vec!["done"]);
    }

    #[test]
    fn all_view_respects_visibility_and_seeds_missing() {
        let mut reg = ListRegistry::new();
        let shown = reg.create_list("Shown").id.clone();
        let hidden = reg.create_list("Hidden").id.clone();
        let mut vis = VisibilityTracker::new();
        vis.set_visible(&hidden, false);

        let mut renderer = ViewRenderer::new("empty");
        let rendered = renderer.render(&reg, &mut vis, &IndexMap::new());

        let names: Vec<&str> = rendered.panels().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Shown"]);
        assert_eq!(vis.map().get(&shown), Some(&true));
        assert_eq!(
            rendered.sidebar,
            vec![
                SidebarEntry {
                    list_id: shown,
                    name: "Shown".into(),
                    visible: true
                },
                SidebarEntry {
                    list_id: hidden,
                    name: "Hidden".into(),
                    visible: false
                },
            ]
        );
    }

    #[test]
    fn starred_aggregate_copies_with_back_reference() {
        let mut reg = ListRegistry::new();
        let mut a = Task::new("a");
        a.starred = true;
        let a_id = a.id.clone();
        let work = reg.create_list("Work");
        work.add_task(a);
        work.add_task(Task::new("plain"));
        let work_id = work.id.clone();
        let mut b = Task::new("b");
        b.starred = true;
        let home = reg.create_list("Home");
        home.add_task(b);
        let home_id = home.id.clone();

        let agg = StarredAggregate::build(&reg);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.id(), STARRED_LIST_ID);
        assert_eq!(agg.owner_of(&a_id), Some(work_id.as_str()));
        assert_eq!(agg.tasks()[1].owner_id, home_id);
        assert!(agg.owner_of("missing").is_none());
    }

    #[test]
    fn starred_view_renders_aggregate_panel() {
        let mut t = Task::new("star me");
        t.starred = true;
        let (reg, id) = registry_with(vec![t, Task::new("not starred")]);
        let mut vis = VisibilityTracker::new();
        let mut renderer = ViewRenderer::new("nothing");
        renderer.set_mode(ViewMode::Starred);

        let rendered = renderer.render(&reg, &mut vis, &IndexMap::new());
        let panels = rendered.panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].list_id, STARRED_LIST_ID);
        assert_eq!(panels[0].name, STARRED_LIST_NAME);
        let rows = rendered.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].list_id, id);
        assert!(renderer.aggregate().is_some());
        // the starred view never seeds visibility
        assert!(vis.map().is_empty());
    }

    #[test]
    fn starred_view_empty_state() {
        let mut t = Task::new("done star");
        t.starred = true;
        t.completed = true;
        let (reg, _) = registry_with(vec![t]);
        let mut vis = VisibilityTracker::new();
        let mut renderer = ViewRenderer::new("No starred tasks left!");
        renderer.set_mode(ViewMode::Starred);

        let rendered = renderer.render(&reg, &mut vis, &IndexMap::new());
        assert_eq!(rendered.empty_message(), Some("No starred tasks left!"));
        assert!(rendered.panels().is_empty());
        assert_eq!(renderer.aggregate().unwrap().len(), 1);
    }

    #[test]
    fn switching_to_all_drops_aggregate() {
        let (reg, _) = registry_with(vec![]);
        let mut vis = VisibilityTracker::new();
        let mut renderer = ViewRenderer::new("x");
        renderer.set_mode(ViewMode::Starred);
        renderer.render(&reg, &mut vis, &IndexMap::new());
        renderer.set_mode(ViewMode::All);
        assert!(renderer.aggregate().is_none());
    }
}
