//! Images the app can display or upload.
//!
//! A photo is either local (just captured, or picked from the library) or
//! already stored on the server (attached to a post, or a profile picture).
//! Each variant carries its tag, so no field sniffing is needed to tell them
//! apart.

use serde::{Deserialize, Serialize};

use super::{PostImage, ProfileImage};

/// Discriminant of [`ImageSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Taken with the in-app camera
    CameraCapture,
    /// Chosen from the photo library
    PickerAsset,
    /// Attached to a stored post
    PostImage,
    /// A stored profile picture
    ProfileImage,
}

/// Any image the app handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Photo just taken with the camera
    CameraCapture {
        /// Local file URI
        uri: String,
        /// Pixel width
        width: u32,
        /// Pixel height
        height: u32,
    },
    /// Photo chosen from the library
    PickerAsset {
        /// Local file URI
        uri: String,
        /// Pixel width
        width: u32,
        /// Pixel height
        height: u32,
        /// Original file name
        #[serde(default)]
        file_name: Option<String>,
        /// MIME type reported by the picker
        #[serde(default)]
        mime_type: Option<String>,
    },
    /// Image attached to a stored post
    PostImage(PostImage),
    /// Stored profile picture
    ProfileImage(ProfileImage),
}

impl ImageSource {
    /// Which variant this is
    pub const fn kind(&self) -> ImageKind {
        match self {
            Self::CameraCapture { .. } => ImageKind::CameraCapture,
            Self::PickerAsset { .. } => ImageKind::PickerAsset,
            Self::PostImage(_) => ImageKind::PostImage,
            Self::ProfileImage(_) => ImageKind::ProfileImage,
        }
    }

    /// Where to load the pixels from
    pub fn uri(&self) -> &str {
        match self {
            Self::CameraCapture { uri, .. } | Self::PickerAsset { uri, .. } => uri,
            Self::PostImage(image) => &image.image,
            Self::ProfileImage(image) => &image.image,
        }
    }

    /// Whether the image still has to be uploaded
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::CameraCapture { .. } | Self::PickerAsset { .. })
    }

    /// Server ID of a stored image
    pub const fn server_id(&self) -> Option<u64> {
        match self {
            Self::PostImage(image) => Some(image.id),
            Self::ProfileImage(image) => Some(image.id),
            _ => None,
        }
    }
}

impl From<PostImage> for ImageSource {
    fn from(image: PostImage) -> Self {
        Self::PostImage(image)
    }
}

impl From<ProfileImage> for ImageSource {
    fn from(image: ProfileImage) -> Self {
        Self::ProfileImage(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_stored_images() {
        let captured = ImageSource::CameraCapture {
            uri: "file:///tmp/cap.jpg".to_string(),
            width: 1080,
            height: 1350,
        };
        assert_eq!(captured.kind(), ImageKind::CameraCapture);
        assert!(captured.is_local());
        assert_eq!(captured.server_id(), None);

        let stored = ImageSource::from(PostImage {
            id: 12,
            image: "https://cdn.test/p/12.jpg".to_string(),
            tagged_pets: vec!["rex".to_string()],
        });
        assert_eq!(stored.kind(), ImageKind::PostImage);
        assert!(!stored.is_local());
        assert_eq!(stored.uri(), "https://cdn.test/p/12.jpg");
        assert_eq!(stored.server_id(), Some(12));
    }

    #[test]
    fn test_kind_tag_is_explicit() {
        let json = r#"{"kind":"picker_asset","uri":"file:///a.png","width":10,"height":20}"#;
        let asset: ImageSource = serde_json::from_str(json).unwrap();
        assert_eq!(asset.kind(), ImageKind::PickerAsset);

        let value = serde_json::to_value(ImageSource::from(ProfileImage {
            id: 3,
            image: "https://cdn.test/u/3.jpg".to_string(),
        }))
        .unwrap();
        assert_eq!(value["kind"], "profile_image");
        assert_eq!(value["id"], 3);
    }
}
