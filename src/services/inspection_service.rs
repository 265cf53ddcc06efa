//! src/services/inspection_service.rs
//!
//! InspectionService validates a submission and records it as a fixed
//! sequence of remote writes: one drive upload per present side (front,
//! back, side), then a single list item create.
//!
//! The sequence is a saga without compensation. The first failing step ends
//! the run; uploads that already succeeded stay in the drive and are only
//! reported in the log.

use crate::{
    models::inspection::{
        ImageUpload, ImageUrls, InspectionRecord, InspectionResponse, InspectionSubmission, Side,
        UploadResult,
    },
    services::graph_service::{GraphError, GraphService},
};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum InspectionError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Upstream(#[from] GraphError),
}

pub type InspectionResult<T> = Result<T, InspectionError>;

/// One remote write in a submission.
#[derive(Debug)]
pub enum Step<'a> {
    Upload { side: Side, image: &'a ImageUpload },
    CreateRecord,
}

impl Step<'_> {
    fn describe(&self) -> String {
        match self {
            Step::Upload { side, .. } => format!("upload {}", side),
            Step::CreateRecord => "create record".to_string(),
        }
    }
}

/// Completed steps of one run, kept for the failure report.
#[derive(Debug, Default)]
pub struct SagaLog {
    pub uploads: Vec<UploadResult>,
}

impl SagaLog {
    fn image_urls(&self) -> ImageUrls {
        let mut urls = ImageUrls::default();
        for upload in &self.uploads {
            urls.set(upload.side, upload.url.clone());
        }
        urls
    }
}

#[derive(Clone, Debug)]
pub struct InspectionService {
    graph: GraphService,
}

impl InspectionService {
    pub fn new(graph: GraphService) -> Self {
        Self { graph }
    }

    /// Both product name and inspector must be non-blank.
    pub fn validate(submission: &InspectionSubmission) -> InspectionResult<()> {
        if submission.product_name.trim().is_empty() || submission.inspector.trim().is_empty() {
            return Err(InspectionError::Validation(
                "productName and inspector are required".into(),
            ));
        }
        Ok(())
    }

    /// Ordered steps for a submission: present sides in fixed order, then the record.
    pub fn plan(submission: &InspectionSubmission) -> Vec<Step<'_>> {
        Side::ALL
            .into_iter()
            .filter_map(|side| {
                submission
                    .images
                    .get(&side)
                    .map(|image| Step::Upload { side, image })
            })
            .chain(std::iter::once(Step::CreateRecord))
            .collect()
    }

    /// Validate, upload the images one after another, then create the list item.
    pub async fn handle_inspection(
        &self,
        submission: &InspectionSubmission,
    ) -> InspectionResult<InspectionResponse> {
        Self::validate(submission)?;

        let mut log = SagaLog::default();
        let mut item_id = None;

        for step in Self::plan(submission) {
            let label = step.describe();
            match self.run_step(&step, submission, &mut log).await {
                Ok(id) => {
                    info!(step = %label, "Step completed");
                    if id.is_some() {
                        item_id = id;
                    }
                }
                Err(err) => {
                    let orphaned: Vec<&str> =
                        log.uploads.iter().map(|u| u.url.as_str()).collect();
                    error!(
                        step = %label,
                        error = %err,
                        ?orphaned,
                        "Inspection aborted; completed uploads are kept"
                    );
                    return Err(err.into());
                }
            }
        }

        Ok(InspectionResponse {
            ok: true,
            item_id: item_id.unwrap_or_default(),
            images: log.image_urls(),
        })
    }

    /// Run one step. Returns the list item id for the record step.
    async fn run_step(
        &self,
        step: &Step<'_>,
        submission: &InspectionSubmission,
        log: &mut SagaLog,
    ) -> Result<Option<String>, GraphError> {
        match step {
            Step::Upload { side, image } => {
                let file_name = image.storage_name(*side, Utc::now().timestamp_millis());
                let item = self
                    .graph
                    .upload_file(image.data.clone(), &file_name, &image.content_type)
                    .await?;
                log.uploads.push(UploadResult {
                    side: *side,
                    url: item.web_url,
                });
                Ok(None)
            }
            Step::CreateRecord => {
                let record = InspectionRecord::from_submission(submission, &log.image_urls());
                let item = self.graph.create_list_item(&record).await?;
                Ok(Some(item.id))
            }
        }
    }
}
