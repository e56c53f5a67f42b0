//! Versioned artifact blobs.
//!
//! Each fitted component is written to its own file as a bincode-encoded
//! envelope:
//!
//! ```text
//! magic | format_version | kind | created_at | payload
//! ```
//!
//! The header is decoded first, so a blob of the wrong kind or an
//! unsupported version is reported structurally before the payload is touched.
//! Payloads are plain named statistics/parameters and are validated after
//! decoding.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::Predictor;
use crate::preprocess::FittedPreprocessor;
use crate::select::FittedFeatureSelector;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"OBPA";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Preprocessor,
    FeatureSelector,
    Predictor,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Preprocessor,
        ArtifactKind::FeatureSelector,
        ArtifactKind::Predictor,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Preprocessor => "preprocessor.bin",
            ArtifactKind::FeatureSelector => "feature_selector.bin",
            ArtifactKind::Predictor => "predictor.bin",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Preprocessor => "preprocessor",
            ArtifactKind::FeatureSelector => "feature selector",
            ArtifactKind::Predictor => "predictor",
        };
        f.write_str(s)
    }
}

/// A fitted component that can be persisted.
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;

    /// Reject payloads whose parts do not line up.
    fn validate(&self) -> Result<(), PipelineError>;
}

impl Artifact for FittedPreprocessor {
    const KIND: ArtifactKind = ArtifactKind::Preprocessor;

    fn validate(&self) -> Result<(), PipelineError> {
        FittedPreprocessor::validate(self)
    }
}

impl Artifact for FittedFeatureSelector {
    const KIND: ArtifactKind = ArtifactKind::FeatureSelector;

    fn validate(&self) -> Result<(), PipelineError> {
        FittedFeatureSelector::validate(self)
    }
}

impl Artifact for Predictor {
    const KIND: ArtifactKind = ArtifactKind::Predictor;

    fn validate(&self) -> Result<(), PipelineError> {
        Predictor::validate(self)
    }
}

/// Envelope metadata, decodable without knowing the payload type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub header: ArtifactHeader,
    pub payload: T,
}

pub fn encode<T: Artifact>(artifact: &T) -> Result<Vec<u8>, PipelineError> {
    let envelope = ArtifactEnvelope {
        header: ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            kind: T::KIND,
            created_at: Utc::now(),
        },
        payload: artifact,
    };
    bincode::serialize(&envelope)
        .map_err(|e| PipelineError::Artifact(format!("failed to encode {}: {e}", T::KIND)))
}

/// Decode and check only the envelope header.
pub fn decode_header(bytes: &[u8]) -> Result<ArtifactHeader, PipelineError> {
    let header: ArtifactHeader = bincode::deserialize(bytes)
        .map_err(|e| PipelineError::Artifact(format!("unreadable artifact header: {e}")))?;
    if header.magic != ARTIFACT_MAGIC {
        return Err(PipelineError::Artifact("not an artifact blob (bad magic)".to_string()));
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PipelineError::Artifact(format!(
            "unsupported artifact format version {} (expected {ARTIFACT_FORMAT_VERSION})",
            header.format_version
        )));
    }
    Ok(header)
}

pub fn decode<T: Artifact>(bytes: &[u8]) -> Result<ArtifactEnvelope<T>, PipelineError> {
    let header = decode_header(bytes)?;
    if header.kind != T::KIND {
        return Err(PipelineError::Artifact(format!(
            "expected a {} artifact, found a {}",
            T::KIND,
            header.kind
        )));
    }
    let envelope: ArtifactEnvelope<T> = bincode::deserialize(bytes)
        .map_err(|e| PipelineError::Artifact(format!("corrupt {} payload: {e}", T::KIND)))?;
    envelope.payload.validate()?;
    Ok(envelope)
}

/// Write `artifact` into `dir` under its kind's file name.
pub fn save<T: Artifact>(dir: &Path, artifact: &T) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir).map_err(|e| {
        PipelineError::Artifact(format!("failed to create artifact dir '{}': {e}", dir.display()))
    })?;
    let path = dir.join(T::KIND.file_name());
    let bytes = encode(artifact)?;
    fs::write(&path, &bytes)
        .map_err(|e| PipelineError::Artifact(format!("failed to write '{}': {e}", path.display())))?;
    info!(kind = %T::KIND, path = %path.display(), bytes = bytes.len(), "artifact saved");
    Ok(path)
}

/// Read the artifact of type `T` from `dir`.
///
/// A missing file means the pipeline was never trained into this directory
/// and is reported as `PipelineNotReady`.
pub fn load<T: Artifact>(dir: &Path) -> Result<T, PipelineError> {
    let path = dir.join(T::KIND.file_name());
    if !path.is_file() {
        return Err(PipelineError::PipelineNotReady(format!(
            "{} artifact not found at '{}'",
            T::KIND,
            path.display()
        )));
    }
    let bytes = fs::read(&path)
        .map_err(|e| PipelineError::Artifact(format!("failed to read '{}': {e}", path.display())))?;
    let envelope = decode::<T>(&bytes)?;
    debug!(
        kind = %T::KIND,
        created_at = %envelope.header.created_at,
        "artifact loaded"
    );
    Ok(envelope.payload)
}

/// Render any artifact file as pretty JSON (header + payload).
pub fn describe(path: &Path) -> Result<String, PipelineError> {
    let bytes = fs::read(path)
        .map_err(|e| PipelineError::Artifact(format!("failed to read '{}': {e}", path.display())))?;
    let header = decode_header(&bytes)?;
    let json = match header.kind {
        ArtifactKind::Preprocessor => to_json(&decode::<FittedPreprocessor>(&bytes)?),
        ArtifactKind::FeatureSelector => to_json(&decode::<FittedFeatureSelector>(&bytes)?),
        ArtifactKind::Predictor => to_json(&decode::<Predictor>(&bytes)?),
    };
    json.map_err(|e| PipelineError::Artifact(format!("failed to render artifact: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeatureVector;

    fn preprocessor() -> FittedPreprocessor {
        let rows = vec![
            FeatureVector::raw([("a", 1.0), ("b", 10.0)]).unwrap(),
            FeatureVector::raw([("a", 3.0), ("b", 30.0)]).unwrap(),
        ];
        FittedPreprocessor::fit(&rows).unwrap()
    }

    #[test]
    fn save_and_load_preserve_payload() {
        let dir = tempfile::tempdir().unwrap();
        let pre = preprocessor();
        let path = save(dir.path(), &pre).unwrap();
        assert!(path.ends_with("preprocessor.bin"));

        let loaded: FittedPreprocessor = load(dir.path()).unwrap();
        assert_eq!(loaded, pre);
    }

    #[test]
    fn missing_file_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let err = load::<Predictor>(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::PipelineNotReady(ref m) if m.contains("predictor.bin")));
    }

    #[test]
    fn wrong_kind_is_rejected_before_payload() {
        let bytes = encode(&preprocessor()).unwrap();
        let err = decode::<FittedFeatureSelector>(&bytes).unwrap_err();
        assert!(matches!(err, PipelineError::Artifact(ref m) if m.contains("expected a feature selector")));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let envelope = ArtifactEnvelope {
            header: ArtifactHeader {
                magic: ARTIFACT_MAGIC,
                format_version: ARTIFACT_FORMAT_VERSION + 1,
                kind: ArtifactKind::Preprocessor,
                created_at: Utc::now(),
            },
            payload: preprocessor(),
        };
        let bytes = bincode::serialize(&envelope).unwrap();
        let err = decode::<FittedPreprocessor>(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported artifact format version"));
    }

    #[test]
    fn garbage_is_not_an_artifact() {
        assert!(matches!(
            decode_header(b"definitely not bincode"),
            Err(PipelineError::Artifact(_))
        ));
    }

    #[test]
    fn describe_renders_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(dir.path(), &preprocessor()).unwrap();
        let json = describe(&path).unwrap();
        assert!(json.contains("\"kind\": \"preprocessor\""));
        assert!(json.contains("impute_mean"));
    }
}
