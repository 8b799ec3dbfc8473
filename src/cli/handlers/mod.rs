use std::path::Path;

use chrono::{DateTime, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::recovery;
use crate::io::store::FileStore;
use crate::model::config::Config;
use crate::model::list::{STARRED_LIST_ID, SortOrder};
use crate::model::task::{Repeat, TaskDraft, TaskEdit};
use crate::model::visibility::ViewMode;
use crate::ops::coordinator::{App, Outcome};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let starred = cli.starred;
    let config = load_config(cli.config.as_deref())?;
    let data_file = config_io::resolve_data_file(cli.data.as_deref(), &config)?;

    let open = || {
        let mut app = App::load(FileStore::new(&data_file), &config);
        if starred {
            app.preview_view(ViewMode::Starred);
        }
        app
    };

    let command = cli.command.unwrap_or(Commands::Show(ShowArgs::default()));
    match command {
        // Read commands
        Commands::Show(args) => cmd_show(&mut open(), args, &config, json),
        Commands::Lists => cmd_lists(&open(), json),
        Commands::Recovery(args) => cmd_recovery(args, &data_file, json),

        // Task commands
        Commands::Add(args) => cmd_add(&mut open(), args, &config, json),
        Commands::Edit(args) => cmd_edit(&mut open(), args, starred),
        Commands::Star(args) => {
            let mut app = open();
            let hint = list_hint(&app, args.list.as_deref(), starred);
            check(app.toggle_star(&args.id, hint.as_deref()), &args.id)
        }
        Commands::Done(args) => {
            let mut app = open();
            let hint = list_hint(&app, args.list.as_deref(), starred);
            check(app.toggle_complete(&args.id, hint.as_deref()), &args.id)
        }
        Commands::Rm(args) => {
            let mut app = open();
            let hint = list_hint(&app, args.list.as_deref(), starred);
            check(app.delete_task(&args.id, hint.as_deref()), &args.id)
        }
        Commands::Undate(args) => {
            let mut app = open();
            let hint = list_hint(&app, args.list.as_deref(), starred);
            check(app.remove_task_date(&args.id, hint.as_deref()), &args.id)
        }

        // List management
        Commands::List(cmd) => cmd_list(&mut open(), cmd.action, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => config_io::load_config(p),
        None => match config_io::default_config_path() {
            Ok(p) => config_io::load_config(&p),
            Err(_) => Ok(Config::default()),
        },
    }
}

/// Map an intent outcome to the command's exit status
fn check(outcome: Outcome, target: &str) -> CmdResult {
    match outcome {
        Outcome::Applied { persisted: true } => Ok(()),
        Outcome::Applied { persisted: false } => {
            Err(format!("{}: change applied but could not be saved", target).into())
        }
        Outcome::Missed => Err(format!("not found: {}", target).into()),
    }
}

/// Find a list by id, then by name
fn resolve_list(app: &App<FileStore>, key: &str) -> Result<String, Box<dyn std::error::Error>> {
    app.registry()
        .find_by_id(key)
        .or_else(|| app.registry().find_by_name(key))
        .map(|l| l.id.clone())
        .ok_or_else(|| format!("list not found: {}", key).into())
}

/// The list a task was shown in. Unknown keys pass through so the
/// coordinator can fall back to its own lookup.
fn list_hint(app: &App<FileStore>, list: Option<&str>, starred: bool) -> Option<String> {
    match list {
        Some(key) => Some(resolve_list(app, key).unwrap_or_else(|_| key.to_string())),
        None if starred => Some(STARRED_LIST_ID.to_string()),
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(app: &mut App<FileStore>, args: ShowArgs, config: &Config, json: bool) -> CmdResult {
    if args.completed {
        app.preview_completed();
    }
    if json {
        println!("{}", serde_json::to_string_pretty(app.rendered())?);
    } else {
        for line in format_surface(app.rendered(), config.display.title_width) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_lists(app: &App<FileStore>, json: bool) -> CmdResult {
    let sidebar = &app.rendered().sidebar;
    if json {
        println!("{}", serde_json::to_string_pretty(sidebar)?);
    } else {
        for line in format_sidebar(sidebar) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_recovery(args: RecoveryArgs, data_file: &Path, json: bool) -> CmdResult {
    let dir = data_file.parent().unwrap_or(Path::new("."));
    if let Some(RecoveryAction::Prune(prune)) = args.action {
        let before = match prune.before.as_deref() {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(ts)
                    .map_err(|e| format!("invalid --before timestamp {:?}: {}", ts, e))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        let removed = recovery::prune_recovery(dir, before, prune.all)?;
        if json {
            println!("{}", serde_json::json!({ "removed": removed }));
        } else {
            println!("removed {} entries", removed);
        }
        return Ok(());
    }
    if args.path {
        println!("{}", recovery::recovery_log_path(dir).display());
        return Ok(());
    }
    match recovery::read_recovery_log(dir) {
        Some(log) => print!("{}", log),
        None => println!("recovery log is empty"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

fn cmd_add(app: &mut App<FileStore>, args: AddArgs, config: &Config, json: bool) -> CmdResult {
    let repeat =
        Repeat::parse(&args.repeat).ok_or_else(|| format!("unknown repeat rule: {}", args.repeat))?;

    // An id picks the list directly; a name goes through the draft and may
    // create the list.
    let by_id = args
        .list
        .as_deref()
        .and_then(|key| app.registry().find_by_id(key))
        .map(|l| l.id.clone());
    if by_id.is_some() || args.list.is_none() {
        app.begin_new_task(by_id.as_deref());
    }

    let draft = TaskDraft {
        title: args.title,
        date: args.date.unwrap_or_default(),
        time: args.time.unwrap_or_default(),
        all_day: args.all_day,
        repeat,
        description: args.description.unwrap_or_default(),
        list: args.list.unwrap_or_else(|| config.default_list_name.clone()),
    };
    let id = app.submit_new_task(&draft)?;
    if json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_edit(app: &mut App<FileStore>, args: EditArgs, starred: bool) -> CmdResult {
    let hint = list_hint(app, args.list.as_deref(), starred);
    let form = app
        .edit_form(&args.id, hint.as_deref())
        .ok_or_else(|| format!("not found: {}", args.id))?;
    // The form prefills today for undated tasks; keep them undated unless asked.
    let current_date = app
        .registry()
        .find_task(&form.list_id, &args.id)
        .and_then(|t| t.iso_date());

    let edit = TaskEdit {
        title: args.title.unwrap_or(form.title),
        description: args.description.unwrap_or(form.description),
        date: args.date.or(current_date).unwrap_or_default(),
        time: args.time.unwrap_or(form.time),
        all_day: args.all_day.unwrap_or(form.all_day),
    };
    let outcome = app.submit_task_edit(&args.id, Some(&form.list_id), &edit)?;
    check(outcome, &args.id)
}

// ---------------------------------------------------------------------------
// List management
// ---------------------------------------------------------------------------

fn cmd_list(app: &mut App<FileStore>, action: ListAction, json: bool) -> CmdResult {
    match action {
        ListAction::New(args) => {
            let id = app.create_new_list(&args.name);
            if json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("{}", id);
            }
            Ok(())
        }
        ListAction::Rename(args) => {
            let id = resolve_list(app, &args.list)?;
            check(app.rename_list(&id, &args.name), &args.list)
        }
        ListAction::Delete(args) => {
            let id = resolve_list(app, &args.list)?;
            check(app.delete_list(&id), &args.list)
        }
        ListAction::Show(args) => {
            let id = resolve_list(app, &args.list)?;
            check(app.set_list_visibility(&id, true), &args.list)
        }
        ListAction::Hide(args) => {
            let id = resolve_list(app, &args.list)?;
            check(app.set_list_visibility(&id, false), &args.list)
        }
        ListAction::Sort(args) => {
            let order = SortOrder::parse(&args.order)
                .ok_or_else(|| format!("unknown sort order: {}", args.order))?;
            let id = resolve_list(app, &args.list)?;
            check(app.set_sort_order(&id, order), &args.list)
        }
    }
}
