//! Snapshot wire format.
//!
//! The full combat snapshot travels as UTF-8 JSON: a top-level array whose
//! first element is a header (round, acting index, phase) and whose
//! remaining elements are participant records. There is no schema
//! versioning; a follower's only structural check before replacing its
//! local copy is that the top level is an array.
//!
//! The action log is host-local audit data and is not carried on the wire.

use crate::participant::Participant;
use crate::tracker::{CombatSnapshot, Phase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from snapshot encoding/decoding. Decoding errors cause the
/// follower to discard the payload and keep its prior snapshot.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("payload is not a JSON array")]
    NotAnArray,

    #[error("payload array is missing its header element")]
    MissingHeader,

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Round/index metadata carried ahead of the participant records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub round: u32,
    pub acting: usize,
    pub phase: Phase,
}

/// Serialize a snapshot for broadcast.
pub fn encode(snapshot: &CombatSnapshot) -> Result<Vec<u8>, WireError> {
    let header = SnapshotHeader {
        round: snapshot.round,
        acting: snapshot.acting,
        phase: snapshot.phase,
    };

    let mut elements = Vec::with_capacity(snapshot.participants.len() + 1);
    elements.push(serde_json::to_value(header)?);
    for participant in &snapshot.participants {
        elements.push(serde_json::to_value(participant)?);
    }
    Ok(serde_json::to_vec(&Value::Array(elements))?)
}

/// Deserialize a broadcast payload back into a snapshot.
pub fn decode(bytes: &[u8]) -> Result<CombatSnapshot, WireError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Array(elements) = value else {
        return Err(WireError::NotAnArray);
    };

    let mut elements = elements.into_iter();
    let header: SnapshotHeader =
        serde_json::from_value(elements.next().ok_or(WireError::MissingHeader)?)?;
    let participants = elements
        .map(serde_json::from_value::<Participant>)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CombatSnapshot {
        round: header.round,
        participants,
        log: Vec::new(),
        acting: header.acting,
        phase: header.phase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;
    use crate::tracker::CombatOutcome;

    fn snapshot() -> CombatSnapshot {
        CombatSnapshot {
            round: 3,
            participants: vec![
                Participant::character("Mira", 12, 14, 2),
                Participant::creature("Goblin", 7, 15, 2, 0.25, 50),
            ],
            log: Vec::new(),
            acting: 1,
            phase: Phase::Active,
        }
    }

    #[test]
    fn roundtrip_preserves_state() {
        let original = snapshot();
        let decoded = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn resolved_phase_survives_the_wire() {
        let mut original = snapshot();
        original.phase = Phase::Resolved(CombatOutcome::Victory);
        let decoded = decode(&encode(&original).unwrap()).unwrap();
        assert_eq!(decoded.phase, Phase::Resolved(CombatOutcome::Victory));
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = decode(br#""not an array""#).unwrap_err();
        assert!(matches!(err, WireError::NotAnArray));

        let err = decode(br#"{"round": 1}"#).unwrap_err();
        assert!(matches!(err, WireError::NotAnArray));
    }

    #[test]
    fn empty_array_is_missing_its_header() {
        let err = decode(b"[]").unwrap_err();
        assert!(matches!(err, WireError::MissingHeader));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(decode(b"\xff\xfe not json").is_err());
        assert!(decode(b"").is_err());
    }
}
