//! End-to-end scenarios through the `App` coordinator against an in-memory store.

use docket::io::snapshot;
use docket::io::store::MemoryStore;
use docket::model::config::Config;
use docket::model::list::STARRED_LIST_ID;
use docket::model::task::{Repeat, TaskDraft, TaskEdit};
use docket::model::visibility::ViewMode;
use docket::ops::coordinator::{App, AppEvent, Outcome};
use docket::ops::view::Rendered;
use pretty_assertions::assert_eq;

fn fresh() -> App<MemoryStore> {
    App::load(MemoryStore::new(), &Config::default())
}

fn add(app: &mut App<MemoryStore>, title: &str, date: &str, list: &str) -> String {
    app.submit_new_task(&TaskDraft {
        title: title.to_string(),
        date: date.to_string(),
        list: list.to_string(),
        ..Default::default()
    })
    .unwrap()
}

fn row_titles(rendered: &Rendered) -> Vec<String> {
    rendered.rows().iter().map(|r| r.title.clone()).collect()
}

fn reload(app: &App<MemoryStore>) -> App<MemoryStore> {
    let blob = app.store().blob().unwrap().to_string();
    App::load(MemoryStore::with_blob(blob), &Config::default())
}

// ---------------------------------------------------------------------------
// Starred aggregate
// ---------------------------------------------------------------------------

#[test]
fn each_starred_task_appears_once_in_starred_view() {
    let mut app = fresh();
    let a = add(&mut app, "A", "", "Home");
    let b = add(&mut app, "B", "", "Work");
    add(&mut app, "C", "", "Work");
    app.toggle_star(&a, None);
    app.toggle_star(&b, None);

    app.show_starred();
    let mut titles = row_titles(app.rendered());
    titles.sort();
    assert_eq!(titles, vec!["A", "B"]);
    assert!(app.rendered().rows().iter().all(|r| r.list_id != STARRED_LIST_ID));
}

#[test]
fn unstar_through_real_list_or_aggregate_removes_it() {
    let mut app = fresh();
    let a = add(&mut app, "A", "", "Home");
    let b = add(&mut app, "B", "", "Home");
    app.toggle_star(&a, None);
    app.toggle_star(&b, None);
    app.show_starred();

    let home = app.registry().find_by_name("Home").unwrap().id.clone();
    app.toggle_star(&a, Some(&home));
    assert_eq!(row_titles(app.rendered()), vec!["B"]);

    app.toggle_star(&b, Some(STARRED_LIST_ID));
    assert!(app.rendered().rows().is_empty());
    assert_eq!(app.rendered().empty_message(), Some("No starred tasks left!"));
}

#[test]
fn completing_last_starred_task_shows_empty_state() {
    let mut app = fresh();
    let id = add(&mut app, "Ship", "", "Home");
    app.toggle_star(&id, None);
    app.show_starred();

    app.toggle_complete(&id, Some(STARRED_LIST_ID));
    let home = app.registry().find_by_name("Home").unwrap();
    assert!(home.find_task(&id).unwrap().completed);
    assert_eq!(app.rendered().empty_message(), Some("No starred tasks left!"));
}

#[test]
fn edits_from_starred_view_survive_reload() {
    let mut app = fresh();
    let id = add(&mut app, "Draft", "2025-03-10", "Home");
    app.toggle_star(&id, None);
    app.show_starred();

    let edit = TaskEdit {
        title: "Final".into(),
        date: "2025-03-11".into(),
        ..Default::default()
    };
    app.submit_task_edit(&id, Some(STARRED_LIST_ID), &edit).unwrap();

    let reloaded = reload(&app);
    let task = reloaded
        .registry()
        .find_task_owner(&id)
        .and_then(|l| l.find_task(&id))
        .unwrap();
    assert_eq!(task.title, "Final");
    assert_eq!(task.deadline(), "Tue, Mar 11");
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_reproduces_registry_and_visibility() {
    let mut app = fresh();
    add(&mut app, "One", "2025-01-01", "Home");
    add(&mut app, "Two", "", "Work");
    let work = app.registry().find_by_name("Work").unwrap().id.clone();
    app.set_list_visibility(&work, false);

    let reloaded = reload(&app);
    let names = |a: &App<MemoryStore>| -> Vec<(String, String, Vec<String>)> {
        a.registry()
            .lists()
            .iter()
            .map(|l| {
                (
                    l.id.clone(),
                    l.name.clone(),
                    l.tasks().iter().map(|t| t.id.clone()).collect(),
                )
            })
            .collect()
    };
    assert_eq!(names(&reloaded), names(&app));
    assert_eq!(reloaded.visibility().map(), app.visibility().map());
}

#[test]
fn every_intent_saves_before_returning() {
    let mut app = fresh();
    let before = app.store().save_count();
    let id = add(&mut app, "X", "", "My Tasks");
    app.toggle_star(&id, None);
    app.toggle_complete(&id, None);
    app.delete_task(&id, None);
    assert_eq!(app.store().save_count(), before + 4);

    let saved = snapshot::restore(app.store().blob().unwrap()).unwrap();
    assert!(!saved.registry.contains_task(&id));
}

#[test]
fn write_failure_keeps_memory_authoritative() {
    let mut app = fresh();
    app.store_mut().set_fail_writes(true);
    let id = add(&mut app, "Unsaved", "", "My Tasks");
    let outcome = app.toggle_star(&id, None);
    assert_eq!(outcome, Outcome::Applied { persisted: false });
    assert!(app.registry().find_task_owner(&id).unwrap().find_task(&id).unwrap().starred);

    app.store_mut().set_fail_writes(false);
    assert!(app.toggle_star(&id, None).persisted());
}

#[test]
fn lists_survive_null_visibility_or_array_sort_order() {
    for extra in [r#""listVisibility": null"#, r#""sortOrder": []"#] {
        let blob = format!(
            r#"{{"lists":[{{"id":"list-work","name":"Work","tasks":[{{"id":"t1","title":"Keep me"}}]}}],{extra}}}"#
        );
        let app = App::load(MemoryStore::with_blob(blob), &Config::default());

        assert_eq!(app.registry().len(), 1, "{extra}");
        let work = app.registry().find_by_name("Work").unwrap();
        assert_eq!(work.id, "list-work");
        assert_eq!(work.find_task("t1").unwrap().title, "Keep me");
        assert_eq!(row_titles(app.rendered()), vec!["Keep me"]);
        assert_eq!(app.store().save_count(), 0);
    }
}

// ---------------------------------------------------------------------------
// Counts and visibility
// ---------------------------------------------------------------------------

#[test]
fn toggle_complete_twice_restores_state() {
    let mut app = fresh();
    let id = add(&mut app, "Twice", "", "My Tasks");
    let list = app.registry().find_task_owner(&id).unwrap().id.clone();
    let count = app.registry().find_by_id(&list).unwrap().completed_count();

    app.toggle_complete(&id, Some(&list));
    app.toggle_complete(&id, Some(&list));
    let owner = app.registry().find_by_id(&list).unwrap();
    assert!(!owner.find_task(&id).unwrap().completed);
    assert_eq!(owner.completed_count(), count);
}

#[test]
fn list_created_in_starred_view_is_hidden_until_enabled() {
    let mut app = fresh();
    app.show_starred();
    let id = app.create_new_list("Someday");
    app.show_all();
    assert!(!app.visibility().is_visible(&id, ViewMode::All));
    assert!(app.rendered().sidebar.iter().any(|e| e.list_id == id && !e.visible));

    app.set_list_visibility(&id, true);
    assert!(app.rendered().panels().iter().any(|p| p.list_id == id));
}

// ---------------------------------------------------------------------------
// Dialog scenarios
// ---------------------------------------------------------------------------

#[test]
fn new_all_day_task_in_new_list() {
    let mut app = fresh();
    let work = app.create_new_list("Work");
    app.begin_new_task(Some(&work));
    let id = app
        .submit_new_task(&TaskDraft {
            title: "Ship report".into(),
            date: "2025-03-10".into(),
            all_day: true,
            repeat: Repeat::None,
            list: "Work".into(),
            ..Default::default()
        })
        .unwrap();

    let task = app.registry().find_task(&work, &id).unwrap();
    assert_eq!(task.due_date().as_deref(), Some("03/10/2025"));
    assert_eq!(task.deadline(), "Mon, Mar 10");
    assert!(!task.starred);
    assert!(!task.completed);
    assert_eq!(task.persisted_time(), "N/A");
}

#[test]
fn clearing_date_in_edit_gives_no_date() {
    let mut app = fresh();
    let id = add(&mut app, "Dated", "2025-03-10", "My Tasks");
    let form = app.edit_form(&id, None).unwrap();
    let mut edit = TaskEdit::from(form);
    edit.date.clear();
    app.submit_task_edit(&id, None, &edit).unwrap();

    let task = app.registry().find_task_owner(&id).unwrap().find_task(&id).unwrap();
    assert_eq!(task.due_date(), None);
    assert_eq!(task.iso_date(), None);
    assert_eq!(task.deadline(), "No date");
}

#[test]
fn invalid_date_falls_back_to_no_date() {
    let mut app = fresh();
    let id = add(&mut app, "Someday", "13/45/20xx", "My Tasks");
    let task = app.registry().find_task_owner(&id).unwrap().find_task(&id).unwrap();
    assert_eq!(task.deadline(), "No date");
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn earlier_dates_first_and_undated_last_in_insertion_order() {
    let mut app = fresh();
    add(&mut app, "undated-1", "", "My Tasks");
    add(&mut app, "feb", "2025-02-01", "My Tasks");
    add(&mut app, "undated-2", "", "My Tasks");
    add(&mut app, "jan", "2025-01-01", "My Tasks");

    assert_eq!(
        row_titles(app.rendered()),
        vec!["jan", "feb", "undated-1", "undated-2"]
    );
    let panel = app.rendered().panels()[0].clone();
    let deadlines: Vec<&str> = panel.groups.iter().map(|g| g.deadline.as_str()).collect();
    assert_eq!(deadlines, vec!["Wed, Jan 1", "Sat, Feb 1", "No date"]);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn subscribers_receive_typed_events() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut app = fresh();
    let id = add(&mut app, "Watch", "", "My Tasks");
    let log: Rc<RefCell<Vec<AppEvent>>> = Rc::default();
    let sink = Rc::clone(&log);
    app.subscribe(move |event: &AppEvent, _: &Rendered| sink.borrow_mut().push(event.clone()));

    app.toggle_star(&id, None);
    app.show_starred();
    app.toggle_complete(&id, Some(STARRED_LIST_ID));

    let log = log.borrow();
    assert!(matches!(log[0], AppEvent::TaskStarred { starred: true, .. }));
    assert_eq!(log[1], AppEvent::ViewChanged { view: ViewMode::Starred });
    assert!(matches!(&log[2], AppEvent::TaskCompleted { list_id, completed: true, .. } if list_id != STARRED_LIST_ID));
}
