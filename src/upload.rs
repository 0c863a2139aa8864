//! Signed parameters for direct browser uploads to the image host.

use crate::config::CloudinaryConfig;
use crate::dto::UploadSignature;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

pub const SIGNATURE_ALGORITHM: &str = "sha256";
const UPLOAD_API: &str = "https://api.cloudinary.com/v1_1/";

lazy_static! {
    static ref FOLDER_RE: Regex = Regex::new(r"^[A-Za-z0-9_/-]+$").expect("folder pattern compiles");
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload credential {0} is not configured")]
    MissingCredential(&'static str),
    #[error("invalid upload url: {0}")]
    Url(#[from] url::ParseError),
}

pub fn validate_folder(folder: &str) -> Result<(), String> {
    if FOLDER_RE.is_match(folder) {
        Ok(())
    } else {
        Err("Folder may only contain letters, digits, '_', '-' and '/'".to_string())
    }
}

/// `hex(sha256(sorted "k=v" pairs joined by '&' + secret))`.
pub fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, UploadError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(UploadError::MissingCredential(name))
}

pub fn signed_upload(
    config: &CloudinaryConfig,
    folder: &str,
    timestamp: i64,
) -> Result<UploadSignature, UploadError> {
    let cloud_name = required(&config.cloud_name, "CLOUDINARY_CLOUD_NAME")?;
    let api_key = required(&config.api_key, "CLOUDINARY_API_KEY")?;
    let api_secret = required(&config.api_secret, "CLOUDINARY_API_SECRET")?;

    let signature = sign(
        &[("folder", folder.to_string()), ("timestamp", timestamp.to_string())],
        api_secret,
    );
    let upload_url = Url::parse(UPLOAD_API)?.join(&format!("{}/image/upload", cloud_name))?;

    Ok(UploadSignature {
        signature,
        timestamp,
        cloud_name: cloud_name.to_string(),
        api_key: api_key.to_string(),
        folder: folder.to_string(),
        signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
        upload_url: upload_url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("123456".to_string()),
            api_secret: Some("secret".to_string()),
            default_folder: "streamme".to_string(),
        }
    }

    #[test]
    fn signature_sorts_parameters() {
        let expected = "0278e26e13c8cdba7e7effa556a52f2db3dfaa954778e418a080f1e5e1ee0723";
        let in_order = sign(
            &[("folder", "streamme".into()), ("timestamp", "1315060510".into())],
            "abcd",
        );
        let reversed = sign(
            &[("timestamp", "1315060510".into()), ("folder", "streamme".into())],
            "abcd",
        );
        assert_eq!(in_order, expected);
        assert_eq!(reversed, expected);
    }

    #[test]
    fn builds_upload_parameters() {
        let upload = signed_upload(&config(), "posters", 1_700_000_000).unwrap();
        assert_eq!(
            upload.signature,
            "2103620727ad77f026b8a6b989eca2cf079ecce32b935304b43678f209805281"
        );
        assert_eq!(upload.cloud_name, "demo");
        assert_eq!(upload.api_key, "123456");
        assert_eq!(upload.signature_algorithm, "sha256");
        assert_eq!(
            upload.upload_url,
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn missing_secret_is_reported() {
        let mut cfg = config();
        cfg.api_secret = None;
        assert!(matches!(
            signed_upload(&cfg, "posters", 1),
            Err(UploadError::MissingCredential("CLOUDINARY_API_SECRET"))
        ));
    }

    #[test]
    fn folder_charset() {
        assert!(validate_folder("streamme/posters_2024-x").is_ok());
        assert!(validate_folder("../etc").is_err());
        assert!(validate_folder("a b").is_err());
        assert!(validate_folder("").is_err());
    }
}
