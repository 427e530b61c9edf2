mod files;
mod http;
mod multipart;
mod render;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use self::files::{FileError, FileSource, TokioFileSource};
pub use self::http::{
    check_response_size, ContentType, HttpError, HttpHeaders, HttpMethod, HttpRequest,
    HttpResponse, HttpResult, HttpTransport, ValidatedUrl, MAX_RESPONSE_BODY_SIZE,
};
pub use self::multipart::MultipartForm;
pub use self::render::ViewChannel;

#[cfg(feature = "native-http")]
pub use self::http::ReqwestTransport;

use std::sync::Arc;

/// Effects the store performs on the core's behalf.
pub struct Capabilities {
    pub http: Arc<dyn HttpTransport>,
    pub files: Arc<dyn FileSource>,
}

impl Capabilities {
    pub fn new(http: Arc<dyn HttpTransport>, files: Arc<dyn FileSource>) -> Self {
        Self { http, files }
    }

    /// reqwest for HTTP, the local filesystem for pending files.
    #[cfg(feature = "native-http")]
    pub fn native() -> Self {
        Self::new(
            Arc::new(ReqwestTransport::new()),
            Arc::new(TokioFileSource::new()),
        )
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
