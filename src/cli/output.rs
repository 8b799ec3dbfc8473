use crate::ops::view::{ListPanel, Rendered, SidebarEntry, StarredPanel, Surface, TaskGroup, TaskRow};
use crate::util::unicode::pad_to_width;

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Format a single task as a one-line summary
pub fn format_task_line(row: &TaskRow, title_width: usize) -> String {
    let check = if row.completed { 'x' } else { ' ' };
    let star = if row.starred { '*' } else { ' ' };
    let title = pad_to_width(&row.title, title_width);
    let time = row.time.as_deref().unwrap_or("");
    format!("[{}]{} {} {:>7}  {}", check, star, title, time, row.id)
        .trim_end()
        .to_string()
}

fn format_groups(groups: &[TaskGroup], title_width: usize, lines: &mut Vec<String>) {
    for group in groups {
        lines.push(format!("  {}", group.deadline));
        for row in &group.tasks {
            lines.push(format!("    {}", format_task_line(row, title_width)));
        }
    }
}

/// Format one panel: header, open groups, then the completed section
pub fn format_panel(panel: &ListPanel, title_width: usize) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", panel.name, panel.list_id)];
    if panel.groups.is_empty() {
        lines.push("  (nothing to do)".to_string());
    }
    format_groups(&panel.groups, title_width, &mut lines);
    if panel.completed_count > 0 {
        lines.push(format!("  Completed ({})", panel.completed_count));
        format_groups(&panel.completed_groups, title_width, &mut lines);
    }
    lines
}

/// Format the whole rendered surface
pub fn format_surface(rendered: &Rendered, title_width: usize) -> Vec<String> {
    match &rendered.surface {
        Surface::All { panels } => {
            if panels.is_empty() {
                return vec!["No lists shown. Use `dk list show <list>`.".to_string()];
            }
            let mut lines = Vec::new();
            for (i, panel) in panels.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                lines.extend(format_panel(panel, title_width));
            }
            lines
        }
        Surface::Starred {
            panel: StarredPanel::Tasks(panel),
        } => format_panel(panel, title_width),
        Surface::Starred {
            panel: StarredPanel::Empty { message },
        } => vec![message.clone()],
    }
}

/// Format the sidebar: one checkbox line per list
pub fn format_sidebar(entries: &[SidebarEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let check = if e.visible { 'x' } else { ' ' };
            format!("[{}] {}  {}", check, e.name, e.list_id)
        })
        .collect()
}
