//! Message rendering — pure `{placeholder}` substitution from task
//! fields. Unknown placeholders render as empty string rather than
//! failing; no side effects, no global state.

use pagewatch_core::types::WatchTask;

/// Render the message for one channel: its template if configured, else
/// a default line.
pub fn format_message(task: &WatchTask, template: Option<&str>) -> String {
    match template {
        Some(template) => render(task, template),
        None => {
            if task.name.is_empty() {
                format!("Update detected at {}", task.url)
            } else {
                format!("{}: update detected at {}", task.name, task.url)
            }
        }
    }
}

/// Substitute `{placeholder}`s. A `{` without a closing `}` is emitted
/// literally.
pub fn render(task: &WatchTask, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start + 1..];
        match rest.find('}') {
            Some(end) => {
                out.push_str(&placeholder(task, &rest[..end]));
                rest = &rest[end + 1..];
            }
            None => {
                out.push('{');
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn placeholder(task: &WatchTask, key: &str) -> String {
    let last = task.last_execution.as_ref();
    match key {
        "url" => task.url.clone(),
        "name" => task.name.clone(),
        "hash" => last
            .and_then(|l| l.hash_target.clone())
            .unwrap_or_default(),
        "target" => last
            .and_then(|l| l.extracted_target.clone())
            .unwrap_or_default(),
        "content" => last
            .and_then(|l| l.extracted_content.clone())
            .unwrap_or_default(),
        "error" => last
            .and_then(|l| l.error_message.clone())
            .unwrap_or_default(),
        "checked_at" => last
            .map(|l| l.created_at.to_rfc3339())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
