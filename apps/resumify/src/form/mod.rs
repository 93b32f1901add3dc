// Form state for one resume: the editable record, per-entry expand/collapse
// state, and a revision counter the autosave uses to detect concurrent edits.

pub mod field_path;
pub mod validation;

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

pub use field_path::{Collection, FieldPath, FieldPathError};

use crate::models::resume::{EducationEntry, EmploymentEntry, ResumeForm, SkillEntry};
use validation::{validate, FieldViolation, ValidationErrors};

#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Path(#[from] FieldPathError),

    #[error("no entry at '{0}'")]
    IndexOutOfRange(String),

    #[error("wrong type for '{path}': {source}")]
    Type {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rejected by schema: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Clone, Default)]
pub struct FormStore {
    form: ResumeForm,
    expanded: HashSet<String>,
    revision: u64,
}

impl FormStore {
    pub fn new(form: ResumeForm) -> Self {
        let mut store = Self::default();
        store.reset(form);
        store
    }

    pub fn form(&self) -> &ResumeForm {
        &self.form
    }

    pub fn snapshot(&self) -> ResumeForm {
        self.form.clone()
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the whole form. Nothing from the previous resume survives,
    /// including expansion state.
    pub fn reset(&mut self, form: ResumeForm) {
        self.form = form;
        normalize_ids(&mut self.form);
        self.expanded.clear();
        self.revision += 1;
    }

    pub fn get(&self, path: &str) -> Result<Value, FormError> {
        let path: FieldPath = path.parse()?;
        let value = to_value(&self.form)?;
        value
            .pointer(&path.pointer())
            .cloned()
            .ok_or_else(|| FormError::IndexOutOfRange(path.to_string()))
    }

    /// Writes one field. Type-checked against the record, not schema-validated;
    /// the schema runs before the form leaves the client.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), FormError> {
        let path: FieldPath = path.parse()?;
        let mut draft = to_value(&self.form)?;
        write_at(&mut draft, &path, value)?;
        let form = from_value(draft, &path.to_string())?;
        self.commit(form);
        Ok(())
    }

    /// Applies a set of field writes atomically. The patch is rejected if it
    /// introduces a schema violation or leaves one under a path it wrote;
    /// violations elsewhere in the form (a blank entry still being filled in)
    /// do not block it. On any failure the store is left untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<Vec<String>, FormError> {
        let mut draft = to_value(&self.form)?;
        let mut applied = Vec::with_capacity(patch.len());
        for (key, value) in patch {
            let path: FieldPath = key.parse()?;
            write_at(&mut draft, &path, value.clone())?;
            applied.push(path.to_string());
        }
        let mut form = from_value(draft, &applied.join(", "))?;
        normalize_ids(&mut form);

        if let Err(after) = validate(&form) {
            let before = match validate(&self.form) {
                Ok(()) => Vec::new(),
                Err(errors) => errors.0,
            };
            let blocking: Vec<FieldViolation> = after
                .0
                .into_iter()
                .filter(|v| !before.contains(v) || applied.iter().any(|p| is_under(&v.path, p)))
                .collect();
            if !blocking.is_empty() {
                return Err(ValidationErrors(blocking).into());
            }
        }
        self.commit(form);
        Ok(applied)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate(&self.form)
    }

    /// Appends a blank entry with a fresh id and expands it. Returns the id.
    pub fn append(&mut self, collection: Collection) -> String {
        let id = Uuid::new_v4().to_string();
        match collection {
            Collection::Employment => self.form.employment_history.push(EmploymentEntry {
                id: id.clone(),
                ..Default::default()
            }),
            Collection::Education => self.form.education_history.push(EducationEntry {
                id: id.clone(),
                ..Default::default()
            }),
            Collection::Skills => self.form.skills.push(SkillEntry {
                id: id.clone(),
                ..Default::default()
            }),
        }
        self.expanded.insert(id.clone());
        self.revision += 1;
        id
    }

    /// Removes the entry at `index` along with its expansion state and returns
    /// the removed id.
    pub fn remove(&mut self, collection: Collection, index: usize) -> Result<String, FormError> {
        let out_of_range = || FormError::IndexOutOfRange(format!("{}.{index}", collection.key()));
        let id = match collection {
            Collection::Employment => {
                if index >= self.form.employment_history.len() {
                    return Err(out_of_range());
                }
                self.form.employment_history.remove(index).id
            }
            Collection::Education => {
                if index >= self.form.education_history.len() {
                    return Err(out_of_range());
                }
                self.form.education_history.remove(index).id
            }
            Collection::Skills => {
                if index >= self.form.skills.len() {
                    return Err(out_of_range());
                }
                self.form.skills.remove(index).id
            }
        };
        self.expanded.remove(&id);
        self.revision += 1;
        Ok(id)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Flips expansion for an existing entry; returns the new state.
    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        if !self.entry_ids().any(|existing| existing == id) {
            return false;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
            return true;
        }
        false
    }

    pub fn expanded_ids(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    /// Takes the server's response to a save. The server copy only replaces
    /// the local one when nothing changed locally since `sent_revision`.
    pub fn apply_saved(&mut self, saved: ResumeForm, sent_revision: u64) -> bool {
        if self.revision != sent_revision {
            return false;
        }
        if saved != self.form {
            self.commit(saved);
        }
        true
    }

    fn commit(&mut self, mut form: ResumeForm) {
        normalize_ids(&mut form);
        self.form = form;
        self.prune_expanded();
        self.revision += 1;
    }

    fn entry_ids(&self) -> impl Iterator<Item = &str> {
        self.form
            .employment_history
            .iter()
            .map(|e| e.id.as_str())
            .chain(self.form.education_history.iter().map(|e| e.id.as_str()))
            .chain(self.form.skills.iter().map(|e| e.id.as_str()))
    }

    fn prune_expanded(&mut self) {
        let live: HashSet<String> = self.entry_ids().map(str::to_string).collect();
        self.expanded.retain(|id| live.contains(id));
    }
}

fn to_value(form: &ResumeForm) -> Result<Value, FormError> {
    serde_json::to_value(form).map_err(|source| FormError::Type {
        path: String::new(),
        source,
    })
}

fn from_value(value: Value, path: &str) -> Result<ResumeForm, FormError> {
    serde_json::from_value(value).map_err(|source| FormError::Type {
        path: path.to_string(),
        source,
    })
}

/// `skills.0.skill` is under `skills`, `skills.0` and itself.
fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

fn write_at(draft: &mut Value, path: &FieldPath, value: Value) -> Result<(), FormError> {
    let slot = draft
        .pointer_mut(&path.pointer())
        .ok_or_else(|| FormError::IndexOutOfRange(path.to_string()))?;
    *slot = value;
    Ok(())
}

/// Gives every entry a non-empty id that is unique within its collection.
fn normalize_ids(form: &mut ResumeForm) {
    fn fix<'a>(ids: impl Iterator<Item = &'a mut String>) {
        let mut seen = HashSet::new();
        for id in ids {
            if id.is_empty() || !seen.insert(id.clone()) {
                *id = Uuid::new_v4().to_string();
                seen.insert(id.clone());
            }
        }
    }
    fix(form.employment_history.iter_mut().map(|e| &mut e.id));
    fix(form.education_history.iter_mut().map(|e| &mut e.id));
    fix(form.skills.iter_mut().map(|e| &mut e.id));
}
