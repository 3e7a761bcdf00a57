//! Export service - persist issuance results to disk
//!
//! Writes the gateway response as pretty JSON and, when present, decodes the
//! base64 QR image into a PNG next to it. Files are named by transaction ID.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::QrResponse;

/// Paths written for one issuance
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub result_path: PathBuf,
    pub image_path: Option<PathBuf>,
    pub image_size_bytes: Option<u64>,
}

/// Writes issuance results into an output directory
pub struct IssuanceExporter {
    output_dir: PathBuf,
}

/// Make a transaction ID safe to use in a file name
///
/// IDs that are already safe are used as-is. Rewritten IDs get a short hash
/// of the original appended, so `TXN/1` and `TXN_1` never share a file.
pub fn sanitize_file_stem(transaction_id: &str) -> String {
    let stem: String = transaction_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem == transaction_id {
        return stem;
    }

    let digest = Sha256::digest(transaction_id.as_bytes());
    format!("{}-{}", stem, &hex::encode(digest)[..8])
}

impl IssuanceExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `qr_result_<txn>.json` and, if the response has an image,
    /// `qr_image_<txn>.png`
    pub fn export(&self, transaction_id: &str, response: &QrResponse) -> Result<ExportSummary> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {:?}", self.output_dir)
        })?;

        let stem = sanitize_file_stem(transaction_id);
        let result_path = self.output_dir.join(format!("qr_result_{}.json", stem));
        let content = serde_json::to_string_pretty(response)?;
        fs::write(&result_path, content)
            .with_context(|| format!("Failed to write result file: {:?}", result_path))?;
        tracing::info!(path = %result_path.display(), "QR result saved");

        let (image_path, image_size_bytes) = match response.qr_image() {
            Some(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .context("QR image is not valid base64")?;
                let image_path = self.output_dir.join(format!("qr_image_{}.png", stem));
                fs::write(&image_path, &bytes)
                    .with_context(|| format!("Failed to write image file: {:?}", image_path))?;
                tracing::info!(path = %image_path.display(), size_bytes = bytes.len(), "QR image saved");
                (Some(image_path), Some(bytes.len() as u64))
            }
            None => (None, None),
        };

        Ok(ExportSummary {
            result_path,
            image_path,
            image_size_bytes,
        })
    }
}
