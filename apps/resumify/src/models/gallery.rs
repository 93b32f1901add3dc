use serde::{Deserialize, Serialize};

/// `{ id }` as returned by create, duplicate and use-example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResume {
    pub id: String,
}

/// Rendered pages as base64 JPEG strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewImages {
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeScore {
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub resume_id: &'a str,
}

/// A starter resume from the template gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "wantedJobTitle", default)]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub transcription: String,
}
