//! Represents one inspection submission and what the remote list stores for it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Extension used when the uploaded file name does not carry one.
const DEFAULT_EXTENSION: &str = "jpg";

/// Content type used when a file part does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// One photographed aspect of an inspected item.
///
/// The declaration order is the upload order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
    Side,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Front, Side::Back, Side::Side];

    /// Multipart part name and file name prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
            Side::Side => "side",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Side::Front),
            "back" => Ok(Side::Back),
            "side" => Ok(Side::Side),
            other => Err(format!("unknown side `{}`", other)),
        }
    }
}

/// An image received for one side.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// File name as sent by the browser, if any.
    pub original_name: Option<String>,

    /// Declared MIME type of the part.
    pub content_type: String,

    /// Raw file bytes.
    pub data: Bytes,
}

impl ImageUpload {
    /// Lowercased extension of the original file name, `jpg` when there is none.
    pub fn extension(&self) -> String {
        self.original_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.trim())
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    /// Name the image is stored under: `{side}_{millis}.{ext}`.
    pub fn storage_name(&self, side: Side, timestamp_millis: i64) -> String {
        format!("{}_{}.{}", side, timestamp_millis, self.extension())
    }
}

/// Transient request payload for one inspection.
#[derive(Clone, Debug, Default)]
pub struct InspectionSubmission {
    pub product_name: String,
    pub inspector: String,
    pub note: String,
    pub datamatrix: String,

    /// At most one image per side; unselected sides are absent.
    pub images: BTreeMap<Side, ImageUpload>,
}

/// Public URLs produced by the uploads of one submission.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_url: Option<String>,
}

impl ImageUrls {
    pub fn get(&self, side: Side) -> Option<&str> {
        match side {
            Side::Front => self.front_url.as_deref(),
            Side::Back => self.back_url.as_deref(),
            Side::Side => self.side_url.as_deref(),
        }
    }

    pub fn set(&mut self, side: Side, url: String) {
        let slot = match side {
            Side::Front => &mut self.front_url,
            Side::Back => &mut self.back_url,
            Side::Side => &mut self.side_url,
        };
        *slot = Some(url);
    }
}

/// Outcome of one successful side upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadResult {
    pub side: Side,
    pub url: String,
}

/// The row written to the inspection list, one per successful submission.
///
/// Field names match the SharePoint list columns.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectionRecord {
    pub product_name: String,
    pub inspector: String,
    pub note: String,
    pub datamatrix: String,
    pub front_image_url: String,
    pub back_image_url: String,
    pub side_image_url: String,
}

impl InspectionRecord {
    /// Merge the text fields of a submission with the URLs its uploads produced.
    pub fn from_submission(submission: &InspectionSubmission, images: &ImageUrls) -> Self {
        let url = |side| images.get(side).unwrap_or_default().to_string();
        Self {
            product_name: submission.product_name.clone(),
            inspector: submission.inspector.clone(),
            note: submission.note.clone(),
            datamatrix: submission.datamatrix.clone(),
            front_image_url: url(Side::Front),
            back_image_url: url(Side::Back),
            side_image_url: url(Side::Side),
        }
    }
}

/// Success body of `POST /api/inspection`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResponse {
    pub ok: bool,
    pub item_id: String,
    pub images: ImageUrls,
}
