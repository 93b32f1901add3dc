use serde::{Deserialize, Serialize};

/// Layout template the backend renders the resume with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Basic,
    Premium,
    Luxury,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Basic, Template::Premium, Template::Luxury];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Basic => "basic",
            Template::Premium => "premium",
            Template::Luxury => "luxury",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentEntry {
    pub id: String,
    pub job_title: String,
    pub employer: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub id: String,
    pub school: String,
    pub degree: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

pub const MIN_SKILL_LEVEL: u8 = 1;
pub const MAX_SKILL_LEVEL: u8 = 5;

const SKILL_LEVEL_TITLES: [&str; 5] = ["Beginner", "Amateur", "Intermediate", "Advanced", "Expert"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillEntry {
    pub id: String,
    pub skill: String,
    pub level: u8,
}

impl Default for SkillEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            skill: String::new(),
            level: MIN_SKILL_LEVEL,
        }
    }
}

impl SkillEntry {
    /// Human label for the level; out-of-range levels read as "Beginner".
    pub fn level_title(&self) -> &'static str {
        match self.level {
            MIN_SKILL_LEVEL..=MAX_SKILL_LEVEL => SKILL_LEVEL_TITLES[usize::from(self.level - 1)],
            _ => SKILL_LEVEL_TITLES[0],
        }
    }
}

/// The editable resume record. This is exactly what gets sent to
/// `PUT /api/resume/{id}`; backend-owned fields live on [`ResumeDocument`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeForm {
    pub template: Template,
    pub wanted_job_title: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub city: String,
    pub professional_summary: String,
    pub employment_history: Vec<EmploymentEntry>,
    pub education_history: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
}

impl ResumeForm {
    /// Top-level field names as they appear on the wire.
    pub const FIELD_NAMES: [&'static str; 12] = [
        "template",
        "wantedJobTitle",
        "firstName",
        "lastName",
        "email",
        "phone",
        "country",
        "city",
        "professionalSummary",
        "employmentHistory",
        "educationHistory",
        "skills",
    ];

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A resume as stored by the backend: the form plus server-owned metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeDocument {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(flatten)]
    pub form: ResumeForm,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Rendered page previews (base64 JPEG) returned alongside saved snapshots.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}
