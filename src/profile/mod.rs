//! The job seeker's CV and cover letter

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("could not read text from PDF '{filename}': {reason}")]
    Pdf { filename: String, reason: String },
}

/// Profile texts used to rank jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub cv: Option<String>,
    pub cover_letter: Option<String>,
}

impl Profile {
    /// The CV, if one has been uploaded and is not blank.
    pub fn cv(&self) -> Option<&str> {
        self.cv.as_deref().filter(|cv| !cv.trim().is_empty())
    }

    pub fn cover_letter(&self) -> Option<&str> {
        self.cover_letter.as_deref().filter(|c| !c.is_empty())
    }
}

/// Response to an upload: which file was stored and how much text it held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub filename: String,
    pub chars: usize,
}

/// Shared, replace-wholesale profile state.
///
/// Readers take a [`snapshot`](Self::snapshot) and work on that copy, so an
/// upload during an analysis only affects analyses started afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    inner: Arc<RwLock<Profile>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Profile {
        self.inner.read().await.clone()
    }

    pub async fn set_cv(&self, text: String) {
        self.inner.write().await.cv = Some(text);
    }

    pub async fn set_cover_letter(&self, text: String) {
        self.inner.write().await.cover_letter = Some(text);
    }

    pub async fn clear_cv(&self) {
        self.inner.write().await.cv = None;
    }

    pub async fn clear_cover_letter(&self) {
        self.inner.write().await.cover_letter = None;
    }

    /// Extract the text of an uploaded file and store it as the CV.
    pub async fn upload_cv(
        &self,
        content: &[u8],
        filename: &str,
    ) -> Result<UploadSummary, ProfileError> {
        let text = extract_text(content, filename)?;
        let summary = UploadSummary {
            filename: filename.to_string(),
            chars: text.chars().count(),
        };
        self.set_cv(text).await;
        info!("Stored CV from {} ({} chars)", summary.filename, summary.chars);
        Ok(summary)
    }

    /// Extract the text of an uploaded file and store it as the cover letter.
    pub async fn upload_cover_letter(
        &self,
        content: &[u8],
        filename: &str,
    ) -> Result<UploadSummary, ProfileError> {
        let text = extract_text(content, filename)?;
        let summary = UploadSummary {
            filename: filename.to_string(),
            chars: text.chars().count(),
        };
        self.set_cover_letter(text).await;
        info!(
            "Stored cover letter from {} ({} chars)",
            summary.filename, summary.chars
        );
        Ok(summary)
    }
}

/// Text of an uploaded document. PDFs are identified by extension; anything
/// else is decoded as UTF-8 with invalid sequences replaced.
pub fn extract_text(content: &[u8], filename: &str) -> Result<String, ProfileError> {
    if filename.to_lowercase().ends_with(".pdf") {
        return pdf_extract::extract_text_from_mem(content).map_err(|e| ProfileError::Pdf {
            filename: filename.to_string(),
            reason: e.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(content).into_owned())
}
