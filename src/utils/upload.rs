use actix_multipart::Field;
use chrono::Utc;
use futures_util::StreamExt;
use std::path::Path;

use crate::errors::AppError;

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Extension allow-list and the declared content type each must name. Both
/// checks have to pass; either alone failing rejects the upload.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

/// A fully buffered profile-photo upload. The size ceiling is enforced first,
/// while the multipart stream drains in `read`; the extension/content-type
/// check runs second, on the buffered file, in `validate`. Nothing touches
/// disk until both checks pass, so a rejection never leaves a partial file.
pub struct UploadedPhoto {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedPhoto {
    pub async fn read(field: &mut Field) -> Result<Self, AppError> {
        let original_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::BadRequest("profilePhoto part carries no file name".to_string())
            })?;
        // A part with no declared content type fails the type check later.
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::BadRequest(format!("malformed multipart payload: {}", e)))?;
            if data.len() + chunk.len() > MAX_PHOTO_BYTES {
                return Err(AppError::PayloadTooLarge(
                    "Profile photo exceeds the 5 MiB limit".to_string(),
                ));
            }
            data.extend_from_slice(&chunk);
        }

        Ok(Self {
            original_name,
            content_type,
            data,
        })
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let extension = Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let expected = ALLOWED_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| *mime)
            .ok_or_else(|| {
                AppError::UnsupportedMediaType(
                    "Only .jpg, .jpeg, and .png formats are allowed".to_string(),
                )
            })?;

        if self.content_type != expected {
            return Err(AppError::UnsupportedMediaType(format!(
                "Content type {} does not match the .{} extension",
                self.content_type, extension
            )));
        }
        Ok(())
    }

    /// `{sanitized-base}-{disambiguator}{.ext}`: base lower-cased with spaces
    /// replaced by hyphens, disambiguator a millisecond timestamp. Two uploads
    /// of the same name in the same millisecond colliding is an accepted risk.
    pub fn storage_name(&self) -> String {
        let base = Path::new(&self.original_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("photo")
            .to_lowercase()
            .replace(' ', "-");
        let extension = Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        format!("{}-{}.{}", base, Utc::now().timestamp_millis(), extension)
    }

    /// Validates, then writes the photo under the uploads root in a single
    /// write. Returns the relative path to store on the record.
    pub async fn save(&self, uploads_root: &Path) -> Result<String, AppError> {
        self.validate()?;

        let name = self.storage_name();
        let path = uploads_root.join(&name);
        tokio::fs::create_dir_all(uploads_root)
            .await
            .map_err(|e| AppError::InternalServerError(format!("failed to create uploads dir: {}", e)))?;
        if let Err(e) = tokio::fs::write(&path, &self.data).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::InternalServerError(format!("failed to store photo: {}", e)));
        }

        Ok(format!("uploads/{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(name: &str, content_type: &str) -> UploadedPhoto {
        UploadedPhoto {
            original_name: name.to_string(),
            content_type: content_type.to_string(),
            data: vec![0u8; 16],
        }
    }

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        assert!(photo("avatar.png", "image/png").validate().is_ok());
        assert!(photo("Avatar.JPG", "image/jpeg").validate().is_ok());
        assert!(photo("avatar.JPEG", "image/jpeg").validate().is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        let err = photo("Photo.BMP", "image/bmp").validate().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn rejects_content_type_extension_mismatch() {
        let err = photo("avatar.png", "image/jpeg").validate().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        let err = photo("avatar.png", "application/octet-stream")
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn rejects_missing_content_type() {
        // An undeclared content type buffers as an empty string.
        let err = photo("avatar.png", "").validate().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn rejects_missing_extension() {
        let err = photo("avatar", "image/png").validate().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn storage_name_sanitizes_and_disambiguates() {
        let name = photo("My Photo.PNG", "image/png").storage_name();
        assert!(name.starts_with("my-photo-"), "got {}", name);
        assert!(name.ends_with(".png"), "got {}", name);
        let middle = &name["my-photo-".len()..name.len() - ".png".len()];
        assert!(middle.parse::<i64>().is_ok(), "got {}", middle);
    }
}
