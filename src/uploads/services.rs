use anyhow::Context;
use axum::extract::multipart::Field;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Storage prefix and public URL prefix for each kind of stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadArea {
    Resumes,
    Verification,
}

impl UploadArea {
    fn key_prefix(self) -> &'static str {
        match self {
            UploadArea::Resumes => "resumes",
            UploadArea::Verification => "verification",
        }
    }

    fn url_prefix(self) -> &'static str {
        match self {
            UploadArea::Resumes => "/uploads/",
            UploadArea::Verification => "/api/employers/documents/",
        }
    }

    pub fn key(self, file_name: &str) -> String {
        format!("{}/{}", self.key_prefix(), file_name)
    }

    pub fn url(self, file_name: &str) -> String {
        format!("{}{}", self.url_prefix(), file_name)
    }
}

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub original_name: Option<String>,
}

impl UploadItem {
    /// Drain a multipart file field; `None` for an empty part.
    pub async fn from_field(field: Field<'_>) -> Result<Option<Self>, ApiError> {
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let original_name = field.file_name().map(|s| s.to_string());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid upload: {e}")))?;
        if body.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            body,
            content_type,
            original_name,
        }))
    }
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`, no dot runs.
pub(crate) fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
            c
        } else {
            '_'
        };
        if c == '.' && out.ends_with('.') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_start_matches('.');
    trimmed.chars().take(100).collect()
}

/// `<prefix>_<sanitized original>`, or `<prefix>.<ext>` when nothing usable was sent.
pub(crate) fn stored_file_name(prefix: &str, item: &UploadItem) -> String {
    let original = item
        .original_name
        .as_deref()
        .map(sanitize_file_name)
        .unwrap_or_default();
    if original.is_empty() {
        let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
        format!("{prefix}.{ext}")
    } else {
        format!("{prefix}_{original}")
    }
}

/// Persist an upload and return its stored file name.
pub async fn store_upload(
    st: &AppState,
    area: UploadArea,
    prefix: &str,
    item: UploadItem,
) -> anyhow::Result<String> {
    let file_name = stored_file_name(prefix, &item);
    let key = area.key(&file_name);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(key = %key, "upload stored");
    Ok(file_name)
}

pub async fn load_upload(
    st: &AppState,
    area: UploadArea,
    file_name: &str,
) -> anyhow::Result<Option<Bytes>> {
    let key = area.key(file_name);
    st.storage
        .get_object(&key)
        .await
        .with_context(|| format!("get_object {}", key))
}

/// Best-effort removal of a stored file referenced by its public URL.
pub async fn remove_upload(st: &AppState, area: UploadArea, url: &str) {
    let Some(file_name) = url.strip_prefix(area.url_prefix()) else {
        warn!(url = %url, "upload url outside its area");
        return;
    };
    let key = area.key(file_name);
    if let Err(e) = st.storage.delete_object(&key).await {
        warn!(key = %key, error = %e, "failed to remove upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::is_safe_file_name;

    fn item(name: Option<&str>, ct: &str) -> UploadItem {
        UploadItem {
            body: Bytes::from_static(b"data"),
            content_type: ct.into(),
            original_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my cv (1).pdf"), "my_cv__1_.pdf");
        assert_eq!(sanitize_file_name("...hidden..pdf"), "hidden.pdf");
    }

    #[test]
    fn stored_names_are_safe() {
        let a = stored_file_name("abc", &item(Some("my resume.pdf"), "application/pdf"));
        assert_eq!(a, "abc_my_resume.pdf");
        assert!(is_safe_file_name(&a));

        let b = stored_file_name("abc", &item(None, "image/png"));
        assert_eq!(b, "abc.png");
        let c = stored_file_name("abc", &item(Some("///"), "text/plain"));
        assert_eq!(c, "abc.bin");
    }

    #[test]
    fn areas_map_to_keys_and_urls() {
        assert_eq!(UploadArea::Resumes.key("f.pdf"), "resumes/f.pdf");
        assert_eq!(UploadArea::Resumes.url("f.pdf"), "/uploads/f.pdf");
        assert_eq!(
            UploadArea::Verification.url("f.pdf"),
            "/api/employers/documents/f.pdf"
        );
    }

    #[tokio::test]
    async fn store_then_load() {
        let state = AppState::fake();
        let name = store_upload(&state, UploadArea::Resumes, "r1", item(Some("cv.pdf"), "application/pdf"))
            .await
            .unwrap();
        let got = load_upload(&state, UploadArea::Resumes, &name).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"data"[..]));
        assert!(load_upload(&state, UploadArea::Verification, &name)
            .await
            .unwrap()
            .is_none());

        remove_upload(&state, UploadArea::Resumes, &UploadArea::Resumes.url(&name)).await;
        assert!(load_upload(&state, UploadArea::Resumes, &name)
            .await
            .unwrap()
            .is_none());
    }
}
