//! HTTP handler for inspection submissions.
//! Reads the multipart form into an `InspectionSubmission` and hands it to
//! `InspectionService`.

use crate::{
    errors::AppError,
    models::inspection::{
        DEFAULT_CONTENT_TYPE, ImageUpload, InspectionResponse, InspectionSubmission, Side,
    },
    services::inspection_service::InspectionService,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

/// `POST /api/inspection`: upload the selected photos and create the list item.
pub async fn create_inspection(
    State(service): State<InspectionService>,
    multipart: Multipart,
) -> Result<Json<InspectionResponse>, AppError> {
    let submission = read_submission(multipart).await?;

    let span = info_span!(
        "inspection",
        submission_id = %Uuid::new_v4(),
        product = %submission.product_name,
        images = submission.images.len()
    );
    let response = service
        .handle_inspection(&submission)
        .instrument(span)
        .await?;

    Ok(Json(response))
}

async fn read_submission(mut multipart: Multipart) -> Result<InspectionSubmission, AppError> {
    let mut submission = InspectionSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Ok(side) = name.parse::<Side>() {
            let original_name = field
                .file_name()
                .map(str::to_string)
                .filter(|n| !n.is_empty());
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into());
            let data = field.bytes().await.map_err(multipart_error)?;

            // An unselected file input is sent as an empty, unnamed part.
            if original_name.is_none() && data.is_empty() {
                continue;
            }
            if submission.images.contains_key(&side) {
                return Err(AppError::bad_request(format!(
                    "only one `{}` image is allowed",
                    side
                )));
            }
            submission.images.insert(
                side,
                ImageUpload {
                    original_name,
                    content_type,
                    data,
                },
            );
            continue;
        }

        let slot = match name.as_str() {
            "productName" => &mut submission.product_name,
            "inspector" => &mut submission.inspector,
            "note" => &mut submission.note,
            "datamatrix" => &mut submission.datamatrix,
            other => {
                debug!(field = other, "Ignoring unknown multipart field");
                continue;
            }
        };
        *slot = field.text().await.map_err(multipart_error)?;
    }

    Ok(submission)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}
