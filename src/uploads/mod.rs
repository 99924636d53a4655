pub mod services;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

pub use services::{load_upload, remove_upload, store_upload, UploadArea, UploadItem};

/// Serve a stored file as a download.
pub fn attachment(file_name: &str, body: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}
