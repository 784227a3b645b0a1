//! Persisted forms of component data.
//!
//! Every [`ComponentData`](crate::data::ComponentData) type converts itself to
//! a [`PersistedData`] record: a kind tag, a format version and an opaque
//! `bitcode` payload. Older versions are upgraded through the
//! [`MigrationRegistry`] before decoding. Whole namespaces travel inside a
//! [`DataSnapshot`] behind a magic/version header.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::migration::MigrationRegistry;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a component-data snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x5D1D_0001;

/// Current snapshot envelope version. Increment when breaking the envelope.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("record kind mismatch: expected `{expected}`, got `{actual}`")]
    KindMismatch { expected: String, actual: String },
    #[error("`{kind}` record from future version {version} (this build supports up to {supported})")]
    FutureRecord {
        kind: String,
        version: u32,
        supported: u32,
    },
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("snapshot holds {snapshot} frames, round has {round}")]
    FrameMismatch { snapshot: usize, round: usize },
    #[error("unknown component index {0}")]
    UnknownComponent(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// PersistedData
// ---------------------------------------------------------------------------

/// Versioned, opaque persisted form of one component-data record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedData {
    pub kind: String,
    pub version: u32,
    pub payload: Vec<u8>,
}

impl PersistedData {
    /// Encode `value` as the current version of `kind`.
    pub fn encode<T: Serialize>(kind: &str, version: u32, value: &T) -> Result<Self, SerializeError> {
        let payload = bitcode::serialize(value).map_err(|e| SerializeError::Encode(e.to_string()))?;
        Ok(Self {
            kind: kind.to_string(),
            version,
            payload,
        })
    }

    /// Decode as version `current` of `kind`, migrating older payloads first.
    pub fn decode<T: DeserializeOwned>(
        &self,
        kind: &str,
        current: u32,
        migrations: &MigrationRegistry,
    ) -> Result<T, DeserializeError> {
        if self.kind != kind {
            return Err(DeserializeError::KindMismatch {
                expected: kind.to_string(),
                actual: self.kind.clone(),
            });
        }
        if self.version > current {
            return Err(DeserializeError::FutureRecord {
                kind: self.kind.clone(),
                version: self.version,
                supported: current,
            });
        }
        let payload = if self.version < current {
            migrations
                .migrate(kind, &self.payload, self.version, current)
                .map_err(|e| DeserializeError::Migration(e.to_string()))?
        } else {
            self.payload.clone()
        };
        bitcode::deserialize(&payload).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Snapshot envelope
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the records are routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Round step at which the snapshot was taken.
    pub step: u32,
}

impl SnapshotHeader {
    pub fn new(step: u32) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            step,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        Ok(())
    }
}

/// Persisted records of one data namespace, keyed by component index.
pub type PersistedScope = Vec<(u32, PersistedData)>;

/// All component data of a round: the round namespace plus one namespace
/// per active call-stack frame, outermost first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSnapshot {
    pub header: SnapshotHeader,
    pub round: PersistedScope,
    pub frames: Vec<PersistedScope>,
}

impl DataSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: DataSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
