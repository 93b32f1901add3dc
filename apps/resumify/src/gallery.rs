// Dashboard and template gallery: thin bindings over the resume endpoints.
// User-initiated failures go back to the caller; background lookups (scores,
// listing thumbnails) degrade to `None` with a warning.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::ClientError;
use crate::models::gallery::{CreatedResume, ExampleSummary};
use crate::models::resume::ResumeDocument;
use crate::state::ClientState;

/// One tile on the dashboard.
#[derive(Debug, Clone)]
pub struct ResumeCard {
    pub resume: ResumeDocument,
    /// First rendered page, decoded.
    pub thumbnail: Option<Vec<u8>>,
    pub score: Option<f64>,
}

pub struct Dashboard {
    state: ClientState,
}

impl Dashboard {
    pub fn new(state: ClientState) -> Self {
        Self { state }
    }

    pub async fn list_resumes(&self) -> Result<Vec<ResumeDocument>, ClientError> {
        self.state.api.list_resumes().await
    }

    /// Lists resumes with a thumbnail and score each, fetched concurrently.
    /// Order matches `list_resumes`.
    pub async fn list_with_previews(&self) -> Result<Vec<ResumeCard>, ClientError> {
        let resumes = self.state.api.list_resumes().await?;

        let mut tasks = JoinSet::new();
        for (index, resume) in resumes.iter().enumerate() {
            let api = self.state.api.clone();
            let id = resume.id.clone();
            tasks.spawn(async move {
                let thumbnail = match api.preview_resume(&id).await {
                    Ok(preview) => preview
                        .images
                        .first()
                        .and_then(|page| decode_page(page).ok()),
                    Err(e) => {
                        warn!("No preview for resume {id}: {e}");
                        None
                    }
                };
                let score = match api.score_resume(&id).await {
                    Ok(s) => Some(s.score),
                    Err(e) => {
                        warn!("No score for resume {id}: {e}");
                        None
                    }
                };
                (index, thumbnail, score)
            });
        }

        let mut cards: Vec<ResumeCard> = resumes
            .into_iter()
            .map(|resume| ResumeCard {
                resume,
                thumbnail: None,
                score: None,
            })
            .collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, thumbnail, score)) => {
                    cards[index].thumbnail = thumbnail;
                    cards[index].score = score;
                }
                Err(e) => warn!("Dashboard lookup task failed: {e}"),
            }
        }
        Ok(cards)
    }

    pub async fn create_resume(&self) -> Result<CreatedResume, ClientError> {
        let created = self.state.api.create_resume().await?;
        info!("Created resume {}", created.id);
        Ok(created)
    }

    pub async fn duplicate_resume(&self, id: &str) -> Result<CreatedResume, ClientError> {
        let created = self.state.api.duplicate_resume(id).await?;
        info!("Duplicated resume {id} as {}", created.id);
        Ok(created)
    }

    pub async fn delete_resume(&self, id: &str) -> Result<(), ClientError> {
        self.state.api.delete_resume(id).await?;
        self.state.persist_locks.release(id);
        if let Some(store) = &self.state.transcripts {
            if let Err(e) = store.clear(id) {
                warn!("Failed to remove chat transcript for {id}: {e}");
            }
        }
        info!("Deleted resume {id}");
        Ok(())
    }

    /// Downloads the rendered PDF and writes it to `dest`. Returns the size.
    pub async fn download_pdf(&self, id: &str, dest: &Path) -> Result<usize, ClientError> {
        let pdf = self.state.api.download_resume(id).await?;
        tokio::fs::write(dest, &pdf).await?;
        info!("Wrote {} bytes to {}", pdf.len(), dest.display());
        Ok(pdf.len())
    }

    /// Rendered pages of a resume as image bytes.
    pub async fn preview(&self, id: &str) -> Result<Vec<Vec<u8>>, ClientError> {
        let preview = self.state.api.preview_resume(id).await?;
        preview.images.iter().map(|page| decode_page(page)).collect()
    }

    /// `None` when the score service is unavailable.
    pub async fn score(&self, id: &str) -> Option<f64> {
        match self.state.api.score_resume(id).await {
            Ok(s) => Some(s.score),
            Err(e) => {
                warn!("Scoring resume {id} failed: {e}");
                None
            }
        }
    }

    pub async fn list_examples(&self) -> Result<Vec<ExampleSummary>, ClientError> {
        self.state.api.list_examples().await
    }

    pub async fn preview_example(&self, id: &str) -> Result<Vec<Vec<u8>>, ClientError> {
        let preview = self.state.api.preview_example(id).await?;
        preview.images.iter().map(|page| decode_page(page)).collect()
    }

    /// Copies a gallery example into a new resume of the user's own.
    pub async fn use_example(&self, id: &str) -> Result<CreatedResume, ClientError> {
        let created = self.state.api.use_example(id).await?;
        info!("Created resume {} from example {id}", created.id);
        Ok(created)
    }
}

/// Decodes one base64 page, with or without a `data:` URL prefix.
pub fn decode_page(page: &str) -> Result<Vec<u8>, ClientError> {
    let payload = match page.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => page,
    };
    Ok(STANDARD.decode(payload.trim())?)
}
