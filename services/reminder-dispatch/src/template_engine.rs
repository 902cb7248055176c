//! Reminder Template Engine
//!
//! Handlebars rendering for the daily expiry reminder e-mail.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use std::fmt;

const REMINDER_BODY_TEMPLATE: &str = "Hello {{user_name}},\n\n\
The following vehicle documents need your attention:\n\n\
{{lines}}\n\n\
Please renew them at the earliest.\n\n\
Vehicle Tracker";

/// One document line of the reminder.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReminderLine {
    pub registration_number: String,
    pub document_label: String,
    /// Already formatted, e.g. `31 Dec 2025`.
    pub expiry: String,
    pub status: String,
}

impl fmt::Display for ReminderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- {} | {} | Expiry: {} | {}",
            self.registration_number, self.document_label, self.expiry, self.status
        )
    }
}

#[derive(Serialize)]
struct ReminderContext<'a> {
    user_name: &'a str,
    lines: String,
}

/// Template rendering result
#[derive(Debug, Clone)]
pub struct RenderedReminder {
    pub subject: String,
    pub body: String,
}

/// Template engine
pub struct ReminderTemplates {
    handlebars: Handlebars<'static>,
    subject: String,
}

impl ReminderTemplates {
    pub fn new(subject: impl Into<String>) -> Self {
        let mut handlebars = Handlebars::new();
        // plain-text mail, no HTML escaping
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            handlebars,
            subject: subject.into(),
        }
    }

    pub fn render(&self, user_name: &str, lines: &[ReminderLine]) -> Result<RenderedReminder> {
        let body = self
            .handlebars
            .render_template(
                REMINDER_BODY_TEMPLATE,
                &ReminderContext {
                    user_name,
                    lines: lines.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"),
                },
            )
            .context("Failed to render reminder body")?;

        Ok(RenderedReminder {
            subject: self.subject.clone(),
            body,
        })
    }
}

impl Default for ReminderTemplates {
    fn default() -> Self {
        Self::new("Vehicle Document Expiry Reminder")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_reminder() {
        let lines = vec![
            ReminderLine {
                registration_number: "KA01AB1234".to_string(),
                document_label: "Insurance".to_string(),
                expiry: "10 Jan 2026".to_string(),
                status: "Expires in 10 days".to_string(),
            },
            ReminderLine {
                registration_number: "KA01AB1234".to_string(),
                document_label: "PUC Certificate".to_string(),
                expiry: "30 Dec 2025".to_string(),
                status: "EXPIRED (1 days ago)".to_string(),
            },
        ];

        let rendered = ReminderTemplates::default().render("O'Neil & Co", &lines).unwrap();
        assert_eq!(rendered.subject, "Vehicle Document Expiry Reminder");
        assert_eq!(
            rendered.body,
            "Hello O'Neil & Co,\n\n\
             The following vehicle documents need your attention:\n\n\
             - KA01AB1234 | Insurance | Expiry: 10 Jan 2026 | Expires in 10 days\n\
             - KA01AB1234 | PUC Certificate | Expiry: 30 Dec 2025 | EXPIRED (1 days ago)\n\
             \n\
             Please renew them at the earliest.\n\n\
             Vehicle Tracker"
        );
    }
}
