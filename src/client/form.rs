//! Form state for one inspection on the submitting side.

use crate::{models::inspection::Side, services::datamatrix::extract_product_name};
use bytes::Bytes;
use std::{collections::BTreeMap, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("product name is required")]
    MissingProductName,
    #[error("inspector is required")]
    MissingInspector,
}

/// A photo selected for one side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageFile {
    /// Read a photo from disk, guessing the content type from its extension.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type_for(&file_name).to_string();
        Ok(Self {
            file_name,
            content_type,
            data: Bytes::from(data),
        })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Everything entered for one inspection before it is saved.
///
/// A successful save replaces the whole value with `InspectionForm::default()`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InspectionForm {
    pub datamatrix: String,
    pub product_name: String,
    pub inspector: String,
    pub note: String,
    images: BTreeMap<Side, ImageFile>,
}

impl InspectionForm {
    /// Select or clear the photo for a side. A new selection replaces the old one.
    pub fn set_image(&mut self, side: Side, image: Option<ImageFile>) {
        match image {
            Some(image) => {
                self.images.insert(side, image);
            }
            None => {
                self.images.remove(&side);
            }
        }
    }

    pub fn image(&self, side: Side) -> Option<&ImageFile> {
        self.images.get(&side)
    }

    /// Selected photos in upload order.
    pub fn images(&self) -> impl Iterator<Item = (Side, &ImageFile)> {
        self.images.iter().map(|(side, image)| (*side, image))
    }

    /// Store a decoded scan and derive the product name from it.
    ///
    /// A payload without recognizable fields leaves the product name alone.
    pub fn apply_scan(&mut self, raw: &str) {
        self.datamatrix = raw.trim().to_string();
        let derived = extract_product_name(Some(&self.datamatrix));
        if !derived.is_empty() {
            self.product_name = derived;
        }
    }

    /// Fill an empty product name from a hand-typed DataMatrix value.
    pub fn datamatrix_blurred(&mut self) {
        if !self.product_name.trim().is_empty() || self.datamatrix.trim().is_empty() {
            return;
        }
        self.product_name = extract_product_name(Some(self.datamatrix.trim()));
    }

    /// Same rules as the server: product name first, then inspector.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.product_name.trim().is_empty() {
            return Err(FormError::MissingProductName);
        }
        if self.inspector.trim().is_empty() {
            return Err(FormError::MissingInspector);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = "P1234567890ABE12C020100007000000A2";

    fn photo(name: &str) -> ImageFile {
        ImageFile {
            file_name: name.into(),
            content_type: content_type_for(name).into(),
            data: Bytes::from_static(b"abc"),
        }
    }

    #[test]
    fn scan_overwrites_product_name() {
        let mut form = InspectionForm {
            product_name: "typed".into(),
            ..Default::default()
        };
        form.apply_scan(PAYLOAD);
        assert_eq!(form.datamatrix, PAYLOAD);
        assert_eq!(form.product_name, "123456789012007");
    }

    #[test]
    fn unrecognized_scan_keeps_product_name() {
        let mut form = InspectionForm {
            product_name: "typed".into(),
            ..Default::default()
        };
        form.apply_scan("hello");
        assert_eq!(form.datamatrix, "hello");
        assert_eq!(form.product_name, "typed");
    }

    #[test]
    fn blur_fills_only_empty_product_name() {
        let mut form = InspectionForm {
            datamatrix: PAYLOAD.into(),
            ..Default::default()
        };
        form.datamatrix_blurred();
        assert_eq!(form.product_name, "123456789012007");

        form.product_name = "kept".into();
        form.datamatrix_blurred();
        assert_eq!(form.product_name, "kept");
    }

    #[test]
    fn validation_reports_first_missing_field() {
        let mut form = InspectionForm::default();
        assert_eq!(form.validate(), Err(FormError::MissingProductName));
        form.product_name = "WIDGET-1".into();
        form.inspector = "  ".into();
        assert_eq!(form.validate(), Err(FormError::MissingInspector));
        form.inspector = "J. Lee".into();
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn one_image_per_side() {
        let mut form = InspectionForm::default();
        form.set_image(Side::Back, Some(photo("a.jpg")));
        form.set_image(Side::Front, Some(photo("b.png")));
        form.set_image(Side::Back, Some(photo("c.jpg")));

        let sides: Vec<Side> = form.images().map(|(side, _)| side).collect();
        assert_eq!(sides, vec![Side::Front, Side::Back]);
        assert_eq!(form.image(Side::Back).unwrap().file_name, "c.jpg");

        form.set_image(Side::Back, None);
        assert!(form.image(Side::Back).is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut form = InspectionForm {
            product_name: "x".into(),
            inspector: "y".into(),
            ..Default::default()
        };
        form.set_image(Side::Side, Some(photo("s.jpg")));
        form.reset();
        assert_eq!(form, InspectionForm::default());
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("IMG_1.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("scan.png"), "image/png");
        assert_eq!(content_type_for("raw"), "application/octet-stream");
    }

    #[tokio::test]
    async fn image_file_reads_from_disk() {
        let path = std::env::temp_dir().join(format!("inspection-{}.jpg", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"\xff\xd8\xff").await.unwrap();

        let image = ImageFile::from_path(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.data.as_ref(), b"\xff\xd8\xff");
        assert!(image.file_name.ends_with(".jpg"));
    }
}
