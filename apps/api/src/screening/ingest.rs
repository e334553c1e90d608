//! Document ingestion: registers uploads and drives each one through
//! Queued → Extracting → Ready | Failed.
//!
//! Registration is synchronous; extraction runs in the background on the blocking
//! pool and mutates the registry in place. Extraction failures are terminal for
//! that document only and are never retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::extraction::TextExtractor;
use crate::models::document::{Document, DocumentId, DocumentStatus, UploadedFile};

pub struct DocumentIngestor {
    /// Submission order is preserved; it is the tie-break order for ranking.
    documents: Mutex<Vec<Document>>,
    changed: Notify,
    extractor: Arc<dyn TextExtractor>,
}

impl DocumentIngestor {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
            changed: Notify::new(),
            extractor,
        }
    }

    /// Registers the upload as `Queued` and starts extraction immediately.
    /// Must be called from within a tokio runtime.
    pub fn ingest(self: &Arc<Self>, file: UploadedFile) -> Document {
        let document = Document::queued(&file);
        self.lock().push(document.clone());
        info!(
            document_id = %document.id,
            file_name = %document.file_name,
            bytes = document.byte_size,
            "Document registered"
        );

        let ingestor = Arc::clone(self);
        let id = document.id;
        tokio::spawn(async move { ingestor.run_extraction(id, file).await });

        document
    }

    async fn run_extraction(&self, id: DocumentId, file: UploadedFile) {
        if !self.transition(id, DocumentStatus::Extracting) {
            debug!(document_id = %id, "Document removed before extraction started");
            return;
        }

        let extractor = Arc::clone(&self.extractor);
        let result = tokio::task::spawn_blocking(move || extractor.extract(&file)).await;

        let next = match result {
            Ok(Ok(text)) => {
                info!(document_id = %id, chars = text.len(), "Document text extracted");
                DocumentStatus::Ready { text }
            }
            Ok(Err(e)) => {
                warn!(document_id = %id, "Document extraction failed: {e}");
                DocumentStatus::Failed {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                warn!(document_id = %id, "Document extraction aborted: {e}");
                DocumentStatus::Failed {
                    reason: format!("Corrupt document: extraction aborted ({e})"),
                }
            }
        };

        if !self.transition(id, next) {
            debug!(document_id = %id, "Extraction result dropped for removed document");
        }
    }

    /// Applies a status change. Returns false when the document is gone or the
    /// transition is illegal.
    fn transition(&self, id: DocumentId, next: DocumentStatus) -> bool {
        let applied = {
            let mut documents = self.lock();
            match documents.iter_mut().find(|d| d.id == id) {
                Some(document) => match document.transition(next) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(document_id = %id, "{e}");
                        false
                    }
                },
                None => false,
            }
        };
        if applied {
            self.changed.notify_waiters();
        }
        applied
    }

    pub fn list(&self) -> Vec<Document> {
        self.lock().clone()
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.lock().iter().find(|d| d.id == id).cloned()
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.lock().iter().map(|d| d.id).collect()
    }

    /// Removes a document at any status. An in-flight extraction for it is
    /// discarded when it completes.
    pub fn remove(&self, id: DocumentId) -> Option<Document> {
        let removed = {
            let mut documents = self.lock();
            let index = documents.iter().position(|d| d.id == id)?;
            documents.remove(index)
        };
        info!(document_id = %id, "Document removed");
        self.changed.notify_waiters();
        Some(removed)
    }

    pub fn clear(&self) -> usize {
        let cleared = {
            let mut documents = self.lock();
            let count = documents.len();
            documents.clear();
            count
        };
        self.changed.notify_waiters();
        cleared
    }

    /// Waits until every still-registered document in `ids` is Ready or Failed,
    /// then returns a snapshot of them in submission order. Documents removed
    /// while waiting drop out of the snapshot.
    pub async fn wait_until_settled(&self, ids: &[DocumentId]) -> Vec<Document> {
        loop {
            // Register interest before inspecting so no change is missed.
            let notified = self.changed.notified();
            if let Some(snapshot) = self.settled_snapshot(ids) {
                return snapshot;
            }
            notified.await;
        }
    }

    fn settled_snapshot(&self, ids: &[DocumentId]) -> Option<Vec<Document>> {
        let documents = self.lock();
        let tracked: Vec<Document> = documents
            .iter()
            .filter(|d| ids.contains(&d.id))
            .cloned()
            .collect();
        tracked
            .iter()
            .all(|d| d.status.is_settled())
            .then_some(tracked)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Document>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::testing::{text_upload, StubExtractor};

    fn text_of(document: &Document) -> Option<&str> {
        match &document.status {
            DocumentStatus::Ready { text } => Some(text),
            _ => None,
        }
    }

    fn ingestor(extractor: StubExtractor) -> Arc<DocumentIngestor> {
        Arc::new(DocumentIngestor::new(Arc::new(extractor)))
    }

    #[tokio::test]
    async fn test_ingest_returns_queued_document() {
        let ingestor = ingestor(StubExtractor::default());
        let document = ingestor.ingest(text_upload("jane.txt", "Jane Doe"));
        assert_eq!(document.status, DocumentStatus::Queued);
        assert_eq!(document.file_name, "jane.txt");
        assert_eq!(document.byte_size, 8);
    }

    #[tokio::test]
    async fn test_successful_extraction_reaches_ready() {
        let ingestor = ingestor(StubExtractor::default());
        let document = ingestor.ingest(text_upload("jane.txt", "Jane Doe, Rust"));

        let settled = ingestor.wait_until_settled(&[document.id]).await;
        assert_eq!(settled.len(), 1);
        assert_eq!(text_of(&settled[0]), Some("Jane Doe, Rust"));
    }

    #[tokio::test]
    async fn test_empty_text_is_still_ready() {
        let ingestor = ingestor(StubExtractor::default());
        let document = ingestor.ingest(text_upload("blank.txt", ""));

        let settled = ingestor.wait_until_settled(&[document.id]).await;
        assert_eq!(text_of(&settled[0]), Some(""));
    }

    #[tokio::test]
    async fn test_failed_extraction_is_terminal_for_that_document_only() {
        let ingestor = ingestor(StubExtractor::failing_on(&["broken.pdf"]));
        let good = ingestor.ingest(text_upload("good.txt", "Good"));
        let bad = ingestor.ingest(text_upload("broken.pdf", "???"));

        let settled = ingestor.wait_until_settled(&[good.id, bad.id]).await;
        assert_eq!(text_of(&settled[0]), Some("Good"));
        assert!(matches!(settled[1].status, DocumentStatus::Failed { .. }));
        assert!(text_of(&settled[1]).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_preserves_submission_order() {
        let ingestor = ingestor(StubExtractor::default());
        let names = ["a.txt", "b.txt", "c.txt"];
        let ids: Vec<_> = names
            .iter()
            .map(|n| ingestor.ingest(text_upload(n, n)).id)
            .collect();

        let settled = ingestor.wait_until_settled(&ids).await;
        let settled_names: Vec<_> = settled.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(settled_names, names);
    }

    #[tokio::test]
    async fn test_remove_at_any_status() {
        let ingestor = ingestor(StubExtractor::default());
        let document = ingestor.ingest(text_upload("jane.txt", "Jane"));

        let removed = ingestor.remove(document.id).unwrap();
        assert_eq!(removed.id, document.id);
        assert!(ingestor.get(document.id).is_none());
        assert!(ingestor.remove(document.id).is_none());

        // The extraction task finds nothing to update and nothing reappears.
        let settled = ingestor.wait_until_settled(&[document.id]).await;
        assert!(settled.is_empty());
        tokio::task::yield_now().await;
        assert!(ingestor.list().is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_registry() {
        let ingestor = ingestor(StubExtractor::default());
        ingestor.ingest(text_upload("a.txt", "A"));
        ingestor.ingest(text_upload("b.txt", "B"));
        assert_eq!(ingestor.clear(), 2);
        assert!(ingestor.ids().is_empty());
    }
}
