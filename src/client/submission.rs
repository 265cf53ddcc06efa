//! Sends an `InspectionForm` to the inspection server.

use crate::{
    client::form::{FormError, InspectionForm},
    models::inspection::InspectionResponse,
};
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Invalid(#[from] FormError),
    #[error("server rejected the inspection: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct SubmissionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SubmissionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Save the form. A 2xx status resets the form; on any error it is left as entered.
    ///
    /// The parsed response is `None` when a successful reply is not the JSON summary.
    /// Holding `&mut` for the whole call keeps one submission in flight per form.
    pub async fn submit(
        &self,
        form: &mut InspectionForm,
    ) -> Result<Option<InspectionResponse>, ClientError> {
        form.validate()?;

        let url = format!("{}/api/inspection", self.base_url.trim_end_matches('/'));
        let res = self.http.post(&url).multipart(build_form(form)?).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(status = status.as_u16(), %body, "Inspection save failed");
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        form.reset();

        let body = res.text().await.unwrap_or_default();
        match serde_json::from_str::<InspectionResponse>(&body) {
            Ok(saved) => {
                info!(item_id = %saved.item_id, "Inspection saved");
                Ok(Some(saved))
            }
            Err(err) => {
                warn!(status = status.as_u16(), error = %err, "Inspection saved; response body was not the JSON summary");
                Ok(None)
            }
        }
    }
}

/// Trimmed text fields plus one part per selected side.
fn build_form(form: &InspectionForm) -> Result<Form, reqwest::Error> {
    let mut multipart = Form::new()
        .text("productName", form.product_name.trim().to_string())
        .text("inspector", form.inspector.trim().to_string())
        .text("note", form.note.trim().to_string())
        .text("datamatrix", form.datamatrix.trim().to_string());

    for (side, image) in form.images() {
        let part = Part::bytes(image.data.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        multipart = multipart.part(side.as_str(), part);
    }
    Ok(multipart)
}
