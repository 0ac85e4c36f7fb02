//! Event description codec: area/status/responsible encoded as labeled text
//! lines so a human can read them in the calendar UI and the merge path can
//! parse them back out.

use std::sync::OnceLock;

use regex::Regex;

use callsheet_core::{Task, TaskStatus};

fn area_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Area:\s*(.+)$").expect("static regex"))
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Status:\s*(.+)$").expect("static regex"))
}

fn responsible_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Responsible:\s*(.+)$").expect("static regex"))
}

/// Newline-joined optional lines: notes, `Area: …`, `Status: …`,
/// `Responsible: …`.
pub fn encode_description(task: &Task) -> String {
    let mut lines = Vec::new();
    if !task.notes.trim().is_empty() {
        lines.push(task.notes.trim().to_string());
    }
    if !task.area.trim().is_empty() {
        lines.push(format!("Area: {}", task.area.trim()));
    }
    lines.push(format!("Status: {}", task.status.as_display()));
    if !task.responsible.is_empty() {
        lines.push(format!("Responsible: {}", task.responsible.join(", ")));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDescription {
    pub notes: String,
    pub area: Option<String>,
    pub status: Option<TaskStatus>,
    pub responsible: Vec<String>,
}

/// Parse the labeled lines back out of an event description. Everything that
/// is not a labeled line is treated as free notes text.
pub fn parse_description(text: &str) -> ParsedDescription {
    let area = area_re()
        .captures(text)
        .map(|c| c[1].trim().to_string());
    let status = status_re()
        .captures(text)
        .map(|c| TaskStatus::from_display(&c[1]));
    let responsible = responsible_re()
        .captures(text)
        .map(|c| {
            c[1].split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let notes = text
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !(line.starts_with("Area:")
                || line.starts_with("Status:")
                || line.starts_with("Responsible:"))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    ParsedDescription {
        notes,
        area,
        status,
        responsible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_parse_recovers_the_fields() {
        let mut task = Task::new("T1", "Kickoff")
            .with_status(TaskStatus::InProgress)
            .with_area("Production")
            .with_responsible(vec!["ana@crew.example".into(), "ben@crew.example".into()]);
        task.notes = "Bring release forms".into();

        let text = encode_description(&task);
        assert_eq!(
            text,
            "Bring release forms\nArea: Production\nStatus: In Progress\nResponsible: ana@crew.example, ben@crew.example"
        );

        let parsed = parse_description(&text);
        assert_eq!(parsed.notes, "Bring release forms");
        assert_eq!(parsed.area.as_deref(), Some("Production"));
        assert_eq!(parsed.status, Some(TaskStatus::InProgress));
        assert_eq!(
            parsed.responsible,
            vec!["ana@crew.example", "ben@crew.example"]
        );
    }

    #[test]
    fn empty_fields_produce_no_lines() {
        let task = Task::new("T1", "Kickoff");
        let text = encode_description(&task);
        assert_eq!(text, "Status: Pending");
    }

    #[test]
    fn freeform_description_parses_as_notes_only() {
        let parsed = parse_description("Lunch with the gaffer\nat the studio");
        assert_eq!(parsed.notes, "Lunch with the gaffer\nat the studio");
        assert_eq!(parsed.area, None);
        assert_eq!(parsed.status, None);
        assert!(parsed.responsible.is_empty());
    }

    #[test]
    fn multiline_notes_survive_around_labels() {
        let parsed = parse_description("First note\nArea: Camera\nSecond note\nStatus: Blocked");
        assert_eq!(parsed.notes, "First note\nSecond note");
        assert_eq!(parsed.area.as_deref(), Some("Camera"));
        assert_eq!(parsed.status, Some(TaskStatus::Blocked));
    }
}
