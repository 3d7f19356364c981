use serde::{Deserialize, Serialize};

/// Opaque reference to a stored blob.
///
/// Only the backend that issued a ref can interpret it: the filesystem
/// backend encodes a sharded relative path, the remote backend a resource
/// class plus object id. Every other component treats it as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    /// Wrap a backend-issued reference string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the inner reference as a str slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlobRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BlobRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Upload metadata handed to [`put`](crate::store::BlobStore::put).
///
/// Backends may use the hint to pick a storage location or resource class;
/// response naming stays with the caller, which imposes the original
/// filename and MIME type on downloads regardless of backend URL paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobHint {
    /// Filename as the uploader named it.
    pub original_name: String,
    /// MIME content type (e.g. `"video/mp4"`).
    pub mime_type: String,
}

impl BlobHint {
    /// Create a hint from a filename and MIME type.
    #[must_use]
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Coarse storage class a remote object service files a blob under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Image,
    Video,
    Raw,
}

impl ResourceClass {
    /// Derive the resource class from a MIME type.
    #[must_use]
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            Self::Image
        } else if mime_type.starts_with("video/") || mime_type.starts_with("audio/") {
            Self::Video
        } else {
            Self::Raw
        }
    }

    /// The path segment remote backends use for this class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_class_from_mime() {
        assert_eq!(ResourceClass::from_mime("image/png"), ResourceClass::Image);
        assert_eq!(ResourceClass::from_mime("video/mp4"), ResourceClass::Video);
        assert_eq!(ResourceClass::from_mime("audio/ogg"), ResourceClass::Video);
        assert_eq!(
            ResourceClass::from_mime("application/pdf"),
            ResourceClass::Raw
        );
        assert_eq!(ResourceClass::from_mime(""), ResourceClass::Raw);
    }

    #[test]
    fn blob_ref_serde_is_transparent() {
        let r = BlobRef::new("fs:ab/cd/blob-1");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"fs:ab/cd/blob-1\"");
    }
}
