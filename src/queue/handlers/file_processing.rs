use crate::error::AppError;
use crate::queue::{FileProcessingMessage, HandlerError, QueueHandler, QueueName};
use crate::services::print_files::PrintFileService;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs the metadata extraction pipeline for freshly uploaded print files.
///
/// The whole pipeline is a pure overwrite of the file record, so a
/// redelivered message just does the work again.
pub struct FileProcessingHandler {
    files: Arc<PrintFileService>,
}

impl FileProcessingHandler {
    pub fn new(files: Arc<PrintFileService>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl QueueHandler for FileProcessingHandler {
    fn queue(&self) -> QueueName {
        QueueName::FileProcessing
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: FileProcessingMessage = serde_json::from_slice(payload)
            .map_err(|e| HandlerError::Permanent(format!("undecodable file job: {e}")))?;

        match self.files.process_uploaded_file(msg.file_id).await {
            Ok(()) => Ok(()),
            // A record that no longer exists will never exist on retry.
            Err(AppError::NotFound(reason)) => Err(HandlerError::Permanent(reason)),
            Err(e) if e.is_retryable() => Err(HandlerError::Transient(e.to_string())),
            Err(e) => Err(HandlerError::Permanent(e.to_string())),
        }
    }
}
