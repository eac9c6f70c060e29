//! Transaction file selected for upload

use crate::ForensicsError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Columns the analysis engine requires
pub const REQUIRED_COLUMNS: [&str; 4] = ["sender_id", "receiver_id", "amount", "timestamp"];

/// Transaction CSV held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    contents: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Read a file from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ForensicsError> {
        let path = path.as_ref();
        let contents = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, contents))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// SHA-256 of the contents, hex encoded
    pub fn fingerprint(&self) -> String {
        Sha256::digest(&self.contents)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Reject files the engine would refuse before sending them
    pub fn precheck(&self) -> Result<(), ForensicsError> {
        if !self.name.to_ascii_lowercase().ends_with(".csv") {
            return Err(ForensicsError::UserInput(
                "Only CSV files are allowed.".to_string(),
            ));
        }
        if self.contents.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ForensicsError::UserInput(format!(
                "File '{}' is empty",
                self.name
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(self.contents.as_slice());
        let headers = reader
            .headers()
            .map_err(|e| ForensicsError::UserInput(format!("Unreadable CSV header: {}", e)))?;

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h.eq_ignore_ascii_case(column)))
            .collect();
        if !missing.is_empty() {
            return Err(ForensicsError::UserInput(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}
