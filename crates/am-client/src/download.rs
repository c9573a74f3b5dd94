//! File downloads (exports).

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::error::ApiError;
use crate::transport::HttpResponse;

/// File name used when the server does not provide one.
pub const DEFAULT_FILENAME: &str = "download";

/// A downloaded file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Download {
    /// File name from `Content-Disposition`, or [`DEFAULT_FILENAME`].
    pub filename: String,
    /// Content type reported by the server.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Download {
    /// Builds a download from a successful response.
    #[must_use]
    pub fn from_response(response: HttpResponse) -> Self {
        let filename = response
            .header("content-disposition")
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_FILENAME.to_owned());
        let content_type = response.header("content-type").map(str::to_owned);
        Self { filename, content_type, bytes: response.body }
    }

    /// Writes the file into `dir` and returns its path.
    ///
    /// Only the final component of the server-provided name is used.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Io`] if the directory cannot be created or the file
    /// cannot be written.
    pub async fn save_to(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, ApiError> {
        let name = Utf8Path::new(&self.filename)
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME);
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path, bytes = self.bytes.len(), "saved download");
        Ok(path)
    }
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// Handles `filename*=UTF-8''...`, quoted and bare `filename=` forms.
///
/// # Examples
///
/// ```
/// use am_client::download::filename_from_disposition;
///
/// assert_eq!(
///     filename_from_disposition("attachment; filename=assets_export_20240301_101500.xlsx").as_deref(),
///     Some("assets_export_20240301_101500.xlsx"),
/// );
/// assert_eq!(filename_from_disposition("inline"), None);
/// ```
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else { continue };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key == "filename*" {
            let encoded = value.rsplit_once("''").map_or(value, |(_, rest)| rest);
            if let Some(decoded) = percent_decode(encoded) {
                return Some(decoded);
            }
        } else if key == "filename" {
            let unquoted = value.trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_owned());
            }
        }
    }
    plain
}

fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            body: b"PK\x03\x04".to_vec(),
        }
    }

    #[test]
    fn test_filename_forms() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="report.xlsx""#).as_deref(),
            Some("report.xlsx")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''%D0%BE%D1%82%D1%87%D1%91%D1%82.xlsx")
                .as_deref(),
            Some("отчёт.xlsx")
        );
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_default_filename() {
        let download = Download::from_response(response(&[]));
        assert_eq!(download.filename, DEFAULT_FILENAME);
        assert!(download.content_type.is_none());
    }

    #[test]
    fn test_content_type_captured() {
        let download = Download::from_response(response(&[
            ("Content-Disposition", "attachment; filename=ops.xlsx"),
            ("Content-Type", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        ]));
        assert_eq!(download.filename, "ops.xlsx");
        assert!(download.content_type.is_some_and(|ct| ct.contains("spreadsheetml")));
    }

    #[tokio::test]
    async fn test_save_to_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let download = Download {
            filename: "../../evil.xlsx".to_owned(),
            content_type: None,
            bytes: vec![1, 2, 3],
        };
        let path = download.save_to(root).await.unwrap();
        assert_eq!(path, root.join("evil.xlsx"));
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
