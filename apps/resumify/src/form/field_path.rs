use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::models::resume::ResumeForm;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldPathError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("'{0}' is not a list")]
    NotACollection(String),

    #[error("invalid index '{index}' in '{path}'")]
    BadIndex { path: String, index: String },

    #[error("unknown entry field '{field}' in '{path}'")]
    UnknownEntryField { path: String, field: String },

    #[error("path '{0}' is too deep")]
    TooDeep(String),
}

/// The three ordered lists on a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Employment,
    Education,
    Skills,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Employment,
        Collection::Education,
        Collection::Skills,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::Employment => "employmentHistory",
            Collection::Education => "educationHistory",
            Collection::Skills => "skills",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Keys every entry of this collection carries.
    pub fn entry_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Employment => &[
                "id",
                "jobTitle",
                "employer",
                "startDate",
                "endDate",
                "description",
            ],
            Collection::Education => &[
                "id",
                "school",
                "degree",
                "startDate",
                "endDate",
                "description",
            ],
            Collection::Skills => &["id", "skill", "level"],
        }
    }
}

impl FromStr for Collection {
    type Err = FieldPathError;

    /// Accepts the wire key or a short alias (`employment`, `education`, `skill`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employment" | "employmentHistory" => Ok(Collection::Employment),
            "education" | "educationHistory" => Ok(Collection::Education),
            "skill" | "skills" => Ok(Collection::Skills),
            other => Err(FieldPathError::NotACollection(other.to_string())),
        }
    }
}

/// Dotted path into a [`ResumeForm`], e.g. `firstName`, `skills.1` or
/// `employmentHistory.0.jobTitle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Field(String),
    Entry {
        collection: Collection,
        index: usize,
    },
    EntryField {
        collection: Collection,
        index: usize,
        field: String,
    },
}

impl FieldPath {
    /// JSON pointer into the serialized form.
    pub fn pointer(&self) -> String {
        match self {
            FieldPath::Field(name) => format!("/{name}"),
            FieldPath::Entry { collection, index } => format!("/{}/{index}", collection.key()),
            FieldPath::EntryField {
                collection,
                index,
                field,
            } => format!("/{}/{index}/{field}", collection.key()),
        }
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        if !ResumeForm::FIELD_NAMES.contains(&head) {
            return Err(FieldPathError::UnknownField(head.to_string()));
        }

        let Some(index) = segments.next() else {
            return Ok(FieldPath::Field(head.to_string()));
        };
        let collection = Collection::from_key(head)
            .ok_or_else(|| FieldPathError::NotACollection(head.to_string()))?;
        let index = index.parse::<usize>().map_err(|_| FieldPathError::BadIndex {
            path: path.to_string(),
            index: index.to_string(),
        })?;

        let Some(field) = segments.next() else {
            return Ok(FieldPath::Entry { collection, index });
        };
        if !collection.entry_fields().contains(&field) {
            return Err(FieldPathError::UnknownEntryField {
                path: path.to_string(),
                field: field.to_string(),
            });
        }
        if segments.next().is_some() {
            return Err(FieldPathError::TooDeep(path.to_string()));
        }

        Ok(FieldPath::EntryField {
            collection,
            index,
            field: field.to_string(),
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field(name) => write!(f, "{name}"),
            FieldPath::Entry { collection, index } => write!(f, "{}.{index}", collection.key()),
            FieldPath::EntryField {
                collection,
                index,
                field,
            } => write!(f, "{}.{index}.{field}", collection.key()),
        }
    }
}
