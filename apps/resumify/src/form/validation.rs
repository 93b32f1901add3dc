use serde::Serialize;
use thiserror::Error;

use crate::models::resume::{ResumeForm, MAX_SKILL_LEVEL, MIN_SKILL_LEVEL};

const MAX_SHORT_TEXT: usize = 255;
const MAX_LONG_TEXT: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

/// Every schema violation found in one pass over a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.0))]
pub struct ValidationErrors(pub Vec<FieldViolation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|v| v.path == path)
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.path, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn fail(&mut self, path: String, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            path,
            message: message.into(),
        });
    }

    fn max_len(&mut self, path: impl Fn() -> String, value: &str, max: usize) {
        if value.chars().count() > max {
            self.fail(path(), format!("must be at most {max} characters"));
        }
    }

    fn required(&mut self, path: impl Fn() -> String, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.fail(path(), message);
        }
    }
}

/// Validates a form against the schema used for manual entry.
/// Applied before autosave and before any chat-driven patch is committed.
pub fn validate(form: &ResumeForm) -> Result<(), ValidationErrors> {
    let mut check = Checker::default();

    let personal = [
        ("wantedJobTitle", &form.wanted_job_title),
        ("firstName", &form.first_name),
        ("lastName", &form.last_name),
        ("email", &form.email),
        ("phone", &form.phone),
        ("country", &form.country),
        ("city", &form.city),
        ("professionalSummary", &form.professional_summary),
    ];
    for (name, value) in personal {
        check.max_len(|| name.to_string(), value, MAX_SHORT_TEXT);
    }
    if !form.email.is_empty() && !looks_like_email(&form.email) {
        check.fail("email".to_string(), "must be a valid email address");
    }

    for (i, entry) in form.employment_history.iter().enumerate() {
        let at = |field: &str| format!("employmentHistory.{i}.{field}");
        check.max_len(|| at("id"), &entry.id, MAX_SHORT_TEXT);
        check.required(|| at("jobTitle"), &entry.job_title, "Please fill in your job title");
        check.max_len(|| at("jobTitle"), &entry.job_title, MAX_SHORT_TEXT);
        check.max_len(|| at("employer"), &entry.employer, MAX_SHORT_TEXT);
        check.max_len(|| at("startDate"), &entry.start_date, MAX_SHORT_TEXT);
        check.max_len(|| at("endDate"), &entry.end_date, MAX_SHORT_TEXT);
        check.max_len(|| at("description"), &entry.description, MAX_LONG_TEXT);
    }

    for (i, entry) in form.education_history.iter().enumerate() {
        let at = |field: &str| format!("educationHistory.{i}.{field}");
        check.max_len(|| at("id"), &entry.id, MAX_SHORT_TEXT);
        check.required(|| at("school"), &entry.school, "Please fill in your school");
        check.max_len(|| at("school"), &entry.school, MAX_SHORT_TEXT);
        check.max_len(|| at("degree"), &entry.degree, MAX_SHORT_TEXT);
        check.max_len(|| at("startDate"), &entry.start_date, MAX_SHORT_TEXT);
        check.max_len(|| at("endDate"), &entry.end_date, MAX_SHORT_TEXT);
        check.max_len(|| at("description"), &entry.description, MAX_LONG_TEXT);
    }

    for (i, entry) in form.skills.iter().enumerate() {
        let at = |field: &str| format!("skills.{i}.{field}");
        check.max_len(|| at("id"), &entry.id, MAX_SHORT_TEXT);
        check.required(|| at("skill"), &entry.skill, "Skill is required");
        check.max_len(|| at("skill"), &entry.skill, MAX_SHORT_TEXT);
        if !(MIN_SKILL_LEVEL..=MAX_SKILL_LEVEL).contains(&entry.level) {
            check.fail(
                at("level"),
                format!("must be between {MIN_SKILL_LEVEL} and {MAX_SKILL_LEVEL}"),
            );
        }
    }

    if check.violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(check.violations))
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
