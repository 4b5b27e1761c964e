//! Versioned envelope for persisted workflows.
//!
//! Stored workflow documents carry a version header so the format can evolve.
//! Readers inspect the version first through [`RawEnvelope`] and refuse
//! anything newer than [`CURRENT_VERSION`].

use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};

/// The current envelope version.
pub const CURRENT_VERSION: u32 = 1;

/// A versioned envelope that wraps serialized data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The version of the envelope format.
    pub version: u32,
    /// The wrapped payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current version.
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self {
            version: CURRENT_VERSION,
            payload,
        }
    }

    /// Unwraps the envelope, returning the payload.
    #[must_use]
    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes the envelope to pretty-printed JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec_pretty(self).map_err(|e| PersistenceError::InvalidFormat {
            details: e.to_string(),
        })
    }
}

impl<T: for<'de> Deserialize<'de>> Envelope<T> {
    /// Deserializes an envelope from JSON bytes, checking its version.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid envelope, the version is
    /// newer than this build understands, or the payload does not decode.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        RawEnvelope::from_json_bytes(bytes)?.deserialize_payload()
    }
}

/// An envelope whose payload has not been decoded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvelope {
    pub version: u32,
    pub payload: serde_json::Value,
}

impl RawEnvelope {
    /// Deserializes from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not an envelope.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::InvalidFormat {
            details: e.to_string(),
        })
    }

    /// Decodes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is unsupported or the payload does
    /// not decode into `T`.
    pub fn deserialize_payload<T: for<'de> Deserialize<'de>>(
        self,
    ) -> Result<Envelope<T>, PersistenceError> {
        if self.version == 0 || self.version > CURRENT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                version: self.version,
            });
        }
        let payload: T =
            serde_json::from_value(self.payload).map_err(|e| PersistenceError::InvalidFormat {
                details: e.to_string(),
            })?;
        Ok(Envelope {
            version: self.version,
            payload,
        })
    }
}
