//! Records exchanged with the storage collaborators

use bytes::Bytes;

/// A stored picture as the pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub id: i32,
    /// MIME type of the original upload, e.g. `image/jpeg`
    pub mime_type: String,
    pub seo_filename: Option<String>,
    /// Set until the uploaded binary has been persisted as canonical
    pub is_new: bool,
    /// Inline payload; when absent the repository is asked for it
    pub binary: Option<Bytes>,
}

impl Picture {
    pub fn new(id: i32, mime_type: impl Into<String>) -> Self {
        Self {
            id,
            mime_type: mime_type.into(),
            seo_filename: None,
            is_new: false,
            binary: None,
        }
    }

    pub fn with_seo_filename(mut self, seo: impl Into<String>) -> Self {
        self.seo_filename = Some(seo.into());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<Bytes>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn new_upload(mut self) -> Self {
        self.is_new = true;
        self
    }
}

/// The store a request is served for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreLocation {
    /// 0 is the default store
    pub store_id: i32,
    /// Overrides the thumbnail cache's URL base when set
    pub url_base: Option<String>,
}

impl StoreLocation {
    pub fn new(store_id: i32) -> Self {
        Self {
            store_id,
            url_base: None,
        }
    }

    pub fn with_url_base(mut self, url_base: impl Into<String>) -> Self {
        self.url_base = Some(url_base.into());
        self
    }

    pub fn is_default(&self) -> bool {
        self.store_id == 0
    }
}
