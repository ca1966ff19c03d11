use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("image base URL cannot be empty")]
    EmptyBase,

    #[error("invalid image base URL: {0}")]
    InvalidBase(String),
}

/// Public location question images are served from.
///
/// A question's `image_path` is resolved relative to this base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBase(Url);

impl ImageBase {
    /// # Errors
    ///
    /// Returns `MediaError` if the string is empty or not an absolute URL.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MediaError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(MediaError::EmptyBase);
        }
        // Without a trailing slash `Url::join` would replace the last segment.
        let with_slash = if s.ends_with('/') {
            s.to_owned()
        } else {
            format!("{s}/")
        };
        let url = Url::parse(&with_slash).map_err(|e| MediaError::InvalidBase(e.to_string()))?;
        Ok(Self(url))
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Displayable URL for an image path. Missing or blank paths have none.
    #[must_use]
    pub fn resolve(&self, image_path: Option<&str>) -> Option<Url> {
        let path = image_path?.trim().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        self.0.join(path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_bucket() {
        let base =
            ImageBase::parse("https://cdn.example.com/storage/v1/object/public/question-images")
                .unwrap();
        let url = base.resolve(Some("signs/stop.png")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/storage/v1/object/public/question-images/signs/stop.png"
        );
    }

    #[test]
    fn missing_path_has_no_url() {
        let base = ImageBase::parse("https://cdn.example.com/img/").unwrap();
        assert_eq!(base.resolve(None), None);
        assert_eq!(base.resolve(Some("  ")), None);
    }

    #[test]
    fn rejects_bad_base() {
        assert_eq!(ImageBase::parse(""), Err(MediaError::EmptyBase));
        assert!(matches!(
            ImageBase::parse("not a url"),
            Err(MediaError::InvalidBase(_))
        ));
    }
}
