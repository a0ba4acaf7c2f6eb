//! Inline image payloads.
//!
//! Artifacts carry their image as a `data:<mime>;base64,<bytes>` URI so the
//! same value works whether it lives in memory, in the durable store or in a
//! remote bucket. Only base64 data URIs are decodable here; anything else
//! (e.g. a remote URL a cloud backend swapped in) is reported as
//! [`PayloadError::NotDataUri`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload is not a data URI")]
    NotDataUri,
    #[error("data URI is not base64-encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Encoding used when a payload is (re-)serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Png,
    Jpeg,
}

impl PayloadFormat {
    pub fn mime(self) -> &'static str {
        match self {
            PayloadFormat::Png => "image/png",
            PayloadFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            PayloadFormat::Png => ImageFormat::Png,
            PayloadFormat::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// Pick the output format for an image re-derived from `payload`.
    ///
    /// PNG stays PNG; every other source format becomes JPEG. Media types
    /// compare case-insensitively.
    pub fn for_rederive(payload: &str) -> Self {
        let mime = payload
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .unwrap_or_default();
        if mime.trim().eq_ignore_ascii_case("image/png") {
            PayloadFormat::Png
        } else {
            PayloadFormat::Jpeg
        }
    }
}

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Media type without parameters, e.g. `image/png`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Parse a base64 `data:` URI.
pub fn parse_data_uri(payload: &str) -> Result<DataUri, PayloadError> {
    let rest = payload
        .strip_prefix("data:")
        .ok_or(PayloadError::NotDataUri)?;
    let (header, data) = rest.split_once(',').ok_or(PayloadError::NotDataUri)?;
    let media = header
        .strip_suffix(";base64")
        .ok_or(PayloadError::NotBase64)?;
    let mime = media.split(';').next().unwrap_or_default().to_string();
    let bytes = STANDARD.decode(data.trim())?;
    Ok(DataUri { mime, bytes })
}

/// Serialize bytes as a base64 `data:` URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Media type for an image file, judged by extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// File extension matching a media type, used when exporting payloads.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_bytes() {
        let uri = to_data_uri("image/png", &[1, 2, 3, 250]);
        assert!(uri.starts_with("data:image/png;base64,"));
        let parsed = parse_data_uri(&uri).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.bytes, vec![1, 2, 3, 250]);
    }

    #[test]
    fn parse_strips_media_parameters() {
        let parsed = parse_data_uri("data:image/jpeg;name=x.jpg;base64,AAE=").unwrap();
        assert_eq!(parsed.mime, "image/jpeg");
        assert_eq!(parsed.bytes, vec![0, 1]);
    }

    #[test]
    fn parse_rejects_remote_url() {
        let err = parse_data_uri("https://cdn.example.com/a.png").unwrap_err();
        assert!(matches!(err, PayloadError::NotDataUri));
    }

    #[test]
    fn parse_rejects_percent_encoded() {
        let err = parse_data_uri("data:image/svg+xml,%3Csvg%3E").unwrap_err();
        assert!(matches!(err, PayloadError::NotBase64));
    }

    #[test]
    fn parse_rejects_bad_base64() {
        let err = parse_data_uri("data:image/png;base64,!!!").unwrap_err();
        assert!(matches!(err, PayloadError::Base64(_)));
    }

    #[test]
    fn png_stays_png_everything_else_jpeg() {
        assert_eq!(
            PayloadFormat::for_rederive("data:image/png;base64,AA=="),
            PayloadFormat::Png
        );
        assert_eq!(
            PayloadFormat::for_rederive("data:image/webp;base64,AA=="),
            PayloadFormat::Jpeg
        );
        assert_eq!(
            PayloadFormat::for_rederive("data:image/jpeg;base64,AA=="),
            PayloadFormat::Jpeg
        );
    }

    #[test]
    fn rederive_format_ignores_mime_case() {
        let upper = "data:IMAGE/PNG;base64,AA==";
        assert_eq!(parse_data_uri(upper).unwrap().mime, "IMAGE/PNG");
        assert_eq!(PayloadFormat::for_rederive(upper), PayloadFormat::Png);
        assert_eq!(
            PayloadFormat::for_rederive("data:Image/Png;name=a.png;base64,AA=="),
            PayloadFormat::Png
        );
        assert_eq!(
            PayloadFormat::for_rederive("data:image/pngx;base64,AA=="),
            PayloadFormat::Jpeg
        );
        assert_eq!(
            PayloadFormat::for_rederive("https://cdn.example.com/a.png"),
            PayloadFormat::Jpeg
        );
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_for_path(Path::new("a/b.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("x.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("x.tiff")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn extension_by_mime() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/gif"), "jpg");
        assert_eq!(extension_for_mime("IMAGE/PNG"), "png");
    }
}
