//! Draft composition and validation
//!
//! A draft is validated before any network call is made: an invalid
//! draft never reaches a platform. Rules mirror what the platforms
//! themselves enforce (Pixelfed rejects image-less posts, Lemmy posts
//! need a title and a community).

use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::models::Platform;

/// Image extensions the platforms accept
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Limits applied by the composer
#[derive(Debug, Clone, Copy)]
pub struct ComposeLimits {
    /// Maximum message length in characters
    pub max_message_len: usize,
    /// Maximum number of images per post
    pub max_images: usize,
    /// Maximum size of one image in bytes
    pub max_image_bytes: u64,
}

impl Default for ComposeLimits {
    fn default() -> Self {
        Self {
            max_message_len: 2000,
            max_images: 10,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ComposeLimits {
    /// Build limits from the user configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_message_len: config.max_message_len,
            max_images: config.max_images,
            max_image_bytes: config.max_image_mb * 1024 * 1024,
        }
    }
}

/// A post being composed, before it is published anywhere
#[derive(Debug, Clone, Default)]
pub struct Draft {
    /// Post body
    pub message: String,
    /// Title (required for Lemmy)
    pub title: Option<String>,
    /// Target community (required for Lemmy)
    pub community: Option<String>,
    /// Images to attach
    pub images: Vec<PathBuf>,
}

impl Draft {
    /// Create a draft with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Validate the draft against the limits and the target platforms
    ///
    /// Returns every violated rule, not just the first one.
    pub fn validate(&self, limits: &ComposeLimits, targets: &[Platform]) -> Vec<AppError> {
        let mut errors = Vec::new();

        if self.message.trim().is_empty() && self.images.is_empty() {
            errors.push(AppError::validation(
                "Empty post",
                "Please add a message or images before posting.",
            ));
        }

        if self.message.chars().count() > limits.max_message_len {
            errors.push(AppError::validation(
                "Message too long",
                format!(
                    "Your message is too long. Please keep it under {} characters.",
                    limits.max_message_len
                ),
            ));
        }

        if self.images.len() > limits.max_images {
            errors.push(AppError::validation(
                "Too many images",
                format!(
                    "You can upload a maximum of {} images per post.",
                    limits.max_images
                ),
            ));
        }

        for (index, image) in self.images.iter().enumerate() {
            errors.extend(validate_image(image, index, limits));
        }

        if targets.contains(&Platform::Pixelfed) && self.images.is_empty() {
            errors.push(AppError::validation(
                "Pixelfed post without images",
                "Pixelfed posts need at least one image.",
            ));
        }

        if targets.contains(&Platform::Lemmy) {
            if self.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
                errors.push(AppError::validation(
                    "Lemmy post without title",
                    "Lemmy posts need a title. Pass one with --title.",
                ));
            }
            if self.community.as_deref().is_none_or(|c| c.trim().is_empty()) {
                errors.push(AppError::validation(
                    "Lemmy post without community",
                    "Lemmy posts need a community. Pass one with --community.",
                ));
            }
        }

        errors
    }
}

/// Check one attached image for type and size
fn validate_image(path: &Path, index: usize, limits: &ComposeLimits) -> Vec<AppError> {
    let mut errors = Vec::new();
    let n = index + 1;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    if !extension.as_deref().is_some_and(|e| IMAGE_EXTENSIONS.contains(&e)) {
        errors.push(AppError::validation(
            format!("Invalid file type for image {n}"),
            format!("File {n} is not a valid image format."),
        ));
    }

    match std::fs::metadata(path) {
        Ok(meta) => {
            if meta.len() > limits.max_image_bytes {
                errors.push(AppError::validation(
                    format!("Image {n} too large"),
                    format!(
                        "Image {n} is too large. Please keep images under {}MB.",
                        limits.max_image_bytes / (1024 * 1024)
                    ),
                ));
            }
        }
        Err(_) => {
            errors.push(AppError::validation(
                format!("Image {n} not found"),
                format!("Image {n} could not be read: {}", path.display()),
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_image(dir: &tempfile::TempDir, name: &str, bytes: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; bytes]).unwrap();
        path
    }

    #[test]
    fn test_empty_draft_rejected() {
        let draft = Draft::new("   ");
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Mastodon]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].user_message.contains("add a message"));
    }

    #[test]
    fn test_long_message_rejected() {
        let draft = Draft::new("x".repeat(2001));
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Mastodon]);
        assert!(errors.iter().any(|e| e.message.contains("too long")));
    }

    #[test]
    fn test_valid_draft_passes() {
        let dir = tempdir().unwrap();
        let image = write_image(&dir, "photo.jpg", 128);

        let mut draft = Draft::new("hello");
        draft.images.push(image);
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Mastodon]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_oversized_image_rejected() {
        let dir = tempdir().unwrap();
        let image = write_image(&dir, "big.png", 64);

        let limits = ComposeLimits {
            max_image_bytes: 32,
            ..ComposeLimits::default()
        };
        let mut draft = Draft::new("hello");
        draft.images.push(image);
        let errors = draft.validate(&limits, &[Platform::Mastodon]);
        assert!(errors.iter().any(|e| e.message.contains("too large")));
    }

    #[test]
    fn test_bad_extension_rejected() {
        let dir = tempdir().unwrap();
        let file = write_image(&dir, "clip.mp4", 16);

        let mut draft = Draft::new("hello");
        draft.images.push(file);
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Mastodon]);
        assert!(errors.iter().any(|e| e.message.contains("Invalid file type")));
    }

    #[test]
    fn test_pixelfed_needs_image() {
        let draft = Draft::new("words only");
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Pixelfed]);
        assert!(errors.iter().any(|e| e.user_message.contains("at least one image")));
    }

    #[test]
    fn test_lemmy_needs_title_and_community() {
        let draft = Draft::new("body");
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Lemmy]);
        assert_eq!(errors.len(), 2);

        let mut draft = Draft::new("body");
        draft.title = Some("a title".to_string());
        draft.community = Some("rust".to_string());
        let errors = draft.validate(&ComposeLimits::default(), &[Platform::Lemmy]);
        assert!(errors.is_empty());
    }
}
