use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::util::dates;

/// How often a task recurs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Annually,
}

impl Repeat {
    /// The persisted form (`none`, `daily`, ...)
    pub fn as_str(self) -> &'static str {
        match self {
            Repeat::None => "none",
            Repeat::Daily => "daily",
            Repeat::Weekly => "weekly",
            Repeat::Monthly => "monthly",
            Repeat::Annually => "annually",
        }
    }

    /// Parse the persisted form
    pub fn parse(s: &str) -> Option<Repeat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(Repeat::None),
            "daily" => Some(Repeat::Daily),
            "weekly" => Some(Repeat::Weekly),
            "monthly" => Some(Repeat::Monthly),
            "annually" => Some(Repeat::Annually),
            _ => None,
        }
    }

    /// Human label relative to `reference`, e.g. `Weekly on Monday`.
    pub fn label(self, reference: NaiveDate) -> String {
        match self {
            Repeat::None => "Does not repeat".to_string(),
            Repeat::Daily => "Daily".to_string(),
            Repeat::Weekly => format!("Weekly on {}", reference.format("%A")),
            Repeat::Monthly => format!("Monthly on {}", reference.format("%-d")),
            Repeat::Annually => format!("Annually on {}", reference.format("%B %-d")),
        }
    }
}

/// Error returned when a task draft or edit cannot be applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("task title cannot be empty")]
    EmptyTitle,
}

/// Generate a fresh opaque id such as `task-3f2a…`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Fields submitted by the create-task dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    /// ISO or `MM/DD/YYYY`; blank means no date
    pub date: String,
    /// `HH:MM` or `h:mm am/pm`; ignored when `all_day`
    pub time: String,
    pub all_day: bool,
    pub repeat: Repeat,
    pub description: String,
    /// Name picked in the list dropdown
    pub list: String,
}

/// Fields submitted by the edit-task dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub all_day: bool,
}

/// A single to-do item.
///
/// The scheduling fields are private so the cached `deadline` can only change
/// together with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Opaque id, fixed at creation
    pub id: String,
    pub title: String,
    pub description: String,
    pub repeat: Repeat,
    pub starred: bool,
    pub completed: bool,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    all_day: bool,
    deadline: String,
}

impl Task {
    /// Create an unscheduled task with a fresh id
    pub fn new(title: impl Into<String>) -> Self {
        Task::with_id(new_id("task"), title)
    }

    /// Create an unscheduled task with a known id (used when loading)
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            repeat: Repeat::None,
            starred: false,
            completed: false,
            date: None,
            time: None,
            all_day: false,
            deadline: dates::NO_DATE.to_string(),
        }
    }

    /// Build a new task from a dialog draft.
    pub fn from_draft(draft: &TaskDraft) -> Result<Self, DraftError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        let mut task = Task::new(title);
        task.description = draft.description.trim().to_string();
        task.repeat = draft.repeat;
        task.set_schedule_from_input(&draft.date, &draft.time, draft.all_day);
        Ok(task)
    }

    /// Apply an edit-dialog submission.
    pub fn apply_edit(&mut self, edit: &TaskEdit) -> Result<(), DraftError> {
        let title = edit.title.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        self.title = title.to_string();
        self.description = edit.description.trim().to_string();
        self.set_schedule_from_input(&edit.date, &edit.time, edit.all_day);
        Ok(())
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn all_day(&self) -> bool {
        self.all_day
    }

    /// Display string derived from the schedule, e.g. `Mon, Mar 10`
    pub fn deadline(&self) -> &str {
        &self.deadline
    }

    /// `MM/DD/YYYY`, if dated
    pub fn due_date(&self) -> Option<String> {
        self.date.map(dates::format_due_date)
    }

    /// `YYYY-MM-DD`, if dated
    pub fn iso_date(&self) -> Option<String> {
        self.date.map(dates::format_iso)
    }

    /// 12-hour time shown next to the deadline; never shown for all-day tasks
    pub fn display_time(&self) -> Option<String> {
        if self.all_day {
            return None;
        }
        self.time.map(dates::format_time_12h)
    }

    /// The `time` value as persisted: `HH:MM`, `N/A` for all-day, or empty
    pub fn persisted_time(&self) -> String {
        match self.time {
            Some(t) if !self.all_day => dates::format_time_24h(t),
            _ if self.all_day => dates::ALL_DAY_TIME.to_string(),
            _ => String::new(),
        }
    }

    /// Sort key: dated tasks by (date, time); `None` when undated
    pub fn due_key(&self) -> Option<(NaiveDate, Option<NaiveTime>)> {
        self.date.map(|d| (d, if self.all_day { None } else { self.time }))
    }

    /// Set all scheduling fields at once and rederive the deadline.
    /// Without a date, time and all-day are cleared too.
    pub fn set_schedule(&mut self, date: Option<NaiveDate>, time: Option<NaiveTime>, all_day: bool) {
        match date {
            Some(d) => {
                self.date = Some(d);
                self.all_day = all_day;
                self.time = if all_day { None } else { time };
            }
            None => {
                self.date = None;
                self.time = None;
                self.all_day = false;
            }
        }
        self.deadline = dates::format_deadline(self.date);
    }

    /// Like [`Task::set_schedule`] but from raw form strings; unparseable
    /// input is logged and treated as absent.
    pub fn set_schedule_from_input(&mut self, date: &str, time: &str, all_day: bool) {
        let parsed_date = dates::parse_date(date);
        if parsed_date.is_none() && !date.trim().is_empty() {
            warn!(task = %self.id, input = date, "unparseable date, treating as no date");
        }
        let parsed_time = if all_day { None } else { dates::parse_time(time) };
        if !all_day && parsed_time.is_none() && !time.trim().is_empty() && time.trim() != dates::ALL_DAY_TIME {
            warn!(task = %self.id, input = time, "unparseable time, ignoring");
        }
        self.set_schedule(parsed_date, parsed_time, all_day);
    }

    /// Remove the date (and with it time and all-day)
    pub fn clear_schedule(&mut self) {
        self.set_schedule(None, None, false);
    }

    /// Flip the star flag, returning the new value
    pub fn toggle_star(&mut self) -> bool {
        self.starred = !self.starred;
        self.starred
    }

    /// Flip the completed flag, returning the new value
    pub fn toggle_complete(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }
}
