use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dk", about = concat!("docket v", env!("CARGO_PKG_VERSION"), " - lists of things to do"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data file
    #[arg(long, global = true, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Use a different config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work in the starred view
    #[arg(long, global = true)]
    pub starred: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show visible lists (or starred tasks with --starred)
    Show(ShowArgs),
    /// List all lists with their visibility
    Lists,
    /// Add a task
    Add(AddArgs),
    /// Edit a task's title, description, date or time
    Edit(EditArgs),
    /// Toggle a task's star
    Star(TaskRef),
    /// Toggle a task's completion
    Done(TaskRef),
    /// Delete a task
    Rm(TaskRef),
    /// Remove a task's date and time
    Undate(TaskRef),
    /// List management
    List(ListCmd),
    /// Show or prune the recovery log
    Recovery(RecoveryArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct ShowArgs {
    /// Include completed tasks
    #[arg(long)]
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// List name or id (created if no list has that name)
    #[arg(long, short)]
    pub list: Option<String>,
    /// Due date (YYYY-MM-DD or MM/DD/YYYY)
    #[arg(long, short)]
    pub date: Option<String>,
    /// Time of day (HH:MM or h:mm am/pm)
    #[arg(long, short)]
    pub time: Option<String>,
    /// Mark as all-day
    #[arg(long)]
    pub all_day: bool,
    /// Repeat rule (none, daily, weekly, monthly, annually)
    #[arg(long, default_value = "none")]
    pub repeat: String,
    /// Longer description
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id
    pub id: String,
    /// List the task was shown in
    #[arg(long, short)]
    pub list: Option<String>,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description
    #[arg(long)]
    pub description: Option<String>,
    /// New due date; an empty value clears the date
    #[arg(long, short)]
    pub date: Option<String>,
    /// New time of day; an empty value clears the time
    #[arg(long, short)]
    pub time: Option<String>,
    /// Set or clear all-day
    #[arg(long)]
    pub all_day: Option<bool>,
}

#[derive(Args)]
pub struct TaskRef {
    /// Task id
    pub id: String,
    /// List the task was shown in
    #[arg(long, short)]
    pub list: Option<String>,
}

// ---------------------------------------------------------------------------
// List management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListCmd {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Create a new list
    New(ListNewArgs),
    /// Rename a list
    Rename(ListRenameArgs),
    /// Delete a list and all its tasks
    Delete(ListKeyArg),
    /// Show a list in the all view
    Show(ListKeyArg),
    /// Hide a list from the all view
    Hide(ListKeyArg),
    /// Set the tie-break order inside a date group
    Sort(ListSortArgs),
}

#[derive(Args)]
pub struct ListNewArgs {
    /// List name
    pub name: String,
}

#[derive(Args)]
pub struct ListRenameArgs {
    /// List name or id
    pub list: String,
    /// New name
    pub name: String,
}

#[derive(Args)]
pub struct ListKeyArg {
    /// List name or id
    pub list: String,
}

#[derive(Args)]
pub struct ListSortArgs {
    /// List name or id
    pub list: String,
    /// none, title or starred
    pub order: String,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryArgs {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Print the absolute path to the recovery log
    #[arg(long)]
    pub path: bool,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries from the recovery log
    Prune(RecoveryPruneArgs),
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this RFC 3339 timestamp (default: 30 days ago)
    #[arg(long, conflicts_with = "all")]
    pub before: Option<String>,
    /// Remove every entry
    #[arg(long)]
    pub all: bool,
}
