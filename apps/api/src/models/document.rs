use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type DocumentId = Uuid;

/// A raw upload as handed to the ingestor: bytes plus declared metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension without the dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// Per-document extraction state. Extracted text lives inside `Ready`, so a
/// document carries text exactly when it is ready.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Queued,
    Extracting,
    Ready {
        #[serde(skip_serializing)]
        text: String,
    },
    Failed {
        reason: String,
    },
}

impl DocumentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Extracting => "extracting",
            DocumentStatus::Ready { .. } => "ready",
            DocumentStatus::Failed { .. } => "failed",
        }
    }

    /// Ready and Failed are terminal.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Ready { .. } | DocumentStatus::Failed { .. }
        )
    }

    fn can_transition_to(&self, next: &DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Queued, DocumentStatus::Extracting)
                | (DocumentStatus::Extracting, DocumentStatus::Ready { .. })
                | (DocumentStatus::Extracting, DocumentStatus::Failed { .. })
        )
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("illegal document transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub file_name: String,
    pub byte_size: usize,
    pub mime_type: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Registers a fresh upload in the `Queued` state.
    pub fn queued(file: &UploadedFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file.file_name.clone(),
            byte_size: file.bytes.len(),
            mime_type: file.mime_type.clone(),
            status: DocumentStatus::Queued,
            uploaded_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: DocumentStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(&next) {
            return Err(InvalidTransition {
                from: self.status.label(),
                to: next.label(),
            });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("document {id} is {status}, not ready")]
pub struct NotReady {
    pub id: DocumentId,
    pub status: &'static str,
}

/// A document proven to have reached `Ready`. The evaluator only accepts this
/// type, so scoring a queued or failed document cannot be expressed.
#[derive(Debug, Clone)]
pub struct ReadyDocument {
    id: DocumentId,
    file_name: String,
    text: String,
}

impl ReadyDocument {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// File name with its final extension removed; stands in for the candidate
    /// name when the scorer could not supply one.
    pub fn placeholder_name(&self) -> String {
        strip_extension(&self.file_name).to_string()
    }
}

impl TryFrom<&Document> for ReadyDocument {
    type Error = NotReady;

    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        match &document.status {
            DocumentStatus::Ready { text } => Ok(ReadyDocument {
                id: document.id,
                file_name: document.file_name.clone(),
                text: text.clone(),
            }),
            other => Err(NotReady {
                id: document.id,
                status: other.label(),
            }),
        }
    }
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => stem,
        _ => file_name,
    }
}
