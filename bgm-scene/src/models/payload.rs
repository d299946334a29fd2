//! Generated audio bytes
//!
//! Audio crosses the collaborator boundary as base64 text. Inside the
//! service it is held decoded so a corrupt payload is caught once, at the
//! boundary, instead of when the mix is assembled.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Encoded audio file (WAV/MP3 bytes as produced by the backend)
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload(Vec<u8>);

impl AudioPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode a base64 payload; surrounding whitespace is ignored
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AudioPayload({} bytes)", self.0.len())
    }
}

impl Serialize for AudioPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for AudioPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        AudioPayload::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decoding() {
        let payload = AudioPayload::from_base64("UklGRg==").unwrap();
        assert_eq!(payload.as_bytes(), b"RIFF");
        assert_eq!(payload.to_base64(), "UklGRg==");
    }

    #[test]
    fn test_whitespace_tolerated() {
        let payload = AudioPayload::from_base64("  UklGRg==\n").unwrap();
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(AudioPayload::from_base64("not base64 at all!").is_err());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let payload = AudioPayload::from_bytes(vec![0; 1024]);
        assert_eq!(format!("{:?}", payload), "AudioPayload(1024 bytes)");
    }

    #[test]
    fn test_serde_as_base64_string() {
        let payload = AudioPayload::from_bytes(b"RIFF".to_vec());
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "\"UklGRg==\"");
        let back: AudioPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
