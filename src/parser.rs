use crate::models::{NewTask, Priority};
use chrono::NaiveDate;
use regex::Regex;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Option<Priority>,
    pub due: Option<NaiveDate>,
}

impl ParsedTask {
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            priority: self.priority.unwrap_or_default(),
            due_date: self
                .due
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .map(|dt| dt.and_utc()),
        }
    }
}

fn parse_priority(token: &str) -> Option<Priority> {
    match token.to_lowercase().as_str() {
        "1" | "h" | "high" => Some(Priority::High),
        "2" | "m" | "med" | "medium" => Some(Priority::Medium),
        "3" | "l" | "low" => Some(Priority::Low),
        _ => None,
    }
}

/// Parses the dashboard quick-add line, e.g. `Call Acme !high @2024-06-01`.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let priority_re = Regex::new(r"!(\w+)\s*").unwrap();
    let due_re = Regex::new(r"@(\d{4}-\d{2}-\d{2})\s*").unwrap();

    let mut priority = None;
    let mut due = None;

    // Priority
    for caps in priority_re.captures_iter(input) {
        if let Some(priority_match) = caps.get(1) {
            if let Some(p) = parse_priority(priority_match.as_str()) {
                if priority.is_none() {
                    priority = Some(p);
                }
            }
        }
    }

    // Due date
    for caps in due_re.captures_iter(input) {
        if let Some(date_match) = caps.get(1) {
            if let Ok(d) = NaiveDate::parse_from_str(date_match.as_str(), "%Y-%m-%d") {
                if due.is_none() {
                    due = Some(d);
                }
            }
        }
    }

    let title = priority_re.replace_all(input, "").to_string();
    let title = due_re.replace_all(&title, "").to_string();

    let title = Regex::new(r"\s+")
        .unwrap()
        .replace_all(&title, " ")
        .trim()
        .to_string();

    ParsedTask {
        title,
        priority,
        due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_priority_in_middle() {
        let input = "Call !high Acme about renewal";
        let expected = ParsedTask {
            title: "Call Acme about renewal".to_string(),
            priority: Some(Priority::High),
            due: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_numeric_priority_and_extra_spaces() {
        let input = "Send proposal !3    to Globex";
        let expected = ParsedTask {
            title: "Send proposal to Globex".to_string(),
            priority: Some(Priority::Low),
            due: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_due_date() {
        let input = "Prepare   contract @2024-06-01 !m";
        let expected = ParsedTask {
            title: "Prepare contract".to_string(),
            priority: Some(Priority::Medium),
            due: NaiveDate::from_ymd_opt(2024, 6, 1),
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_multiple_priorities() {
        let input = "  !low  !high Book    demo !m ";
        let expected = ParsedTask {
            title: "Book demo".to_string(),
            priority: Some(Priority::Low),
            due: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_with_invalid_priority_and_date() {
        let input = "Check invoices !urgent @2024-13-40";
        let expected = ParsedTask {
            title: "Check invoices".to_string(),
            priority: None,
            due: None,
        };
        let result = parse_task_input(input);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_new_task_defaults_to_medium() {
        let task = parse_task_input("Follow up @2024-06-01").into_new_task();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(
            task.due_date.map(|d| d.to_rfc3339()),
            Some("2024-06-01T09:00:00+00:00".to_string())
        );
    }
}
