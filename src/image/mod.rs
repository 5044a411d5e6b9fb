//! Cover image references, derived from the artist name by convention.
//!
//! Nothing here talks to the object store: a missing image is a broken link,
//! not an error.

pub const DEFAULT_IMAGE_BUCKET: &str = "images-placeholder-bucket";

/// Public URL of an S3 bucket, used as the image base when only the bucket
/// name is configured.
pub fn bucket_base_url(bucket: &str) -> String {
    format!("https://{}.s3.amazonaws.com", bucket)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageLocator {
    base_url: String,
}

impl ImageLocator {
    pub fn new<S: AsRef<str>>(base_url: S) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn for_bucket(bucket: &str) -> Self {
        Self::new(bucket_base_url(bucket))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<artist without spaces>.jpg`
    pub fn image_url(&self, artist: &str) -> String {
        let file_stem: String = artist.chars().filter(|c| *c != ' ').collect();
        format!("{}/{}.jpg", self.base_url, file_stem)
    }
}

impl Default for ImageLocator {
    fn default() -> Self {
        Self::for_bucket(DEFAULT_IMAGE_BUCKET)
    }
}
