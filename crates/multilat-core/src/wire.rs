//! Control-plane and data-plane wire schema.
//!
//! Every request/response travels as a JSON payload inside a single
//! ZeroMQ frame. Status enums serialize as their bare numeric codes;
//! the numbers are part of the cross-implementation contract and must
//! never change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of a data-plane distance request, sent verbatim.
pub const DISTANCE_REQUEST: &[u8] = b"GetDistance";

#[derive(Debug, Error)]
#[error("unknown status code {0}")]
pub struct UnknownStatus(pub i32);

/// Status of a Target `GetPosition` reply (`PS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum PositionStatus {
    Unknown,
    Ok,
    Error,
}

impl From<PositionStatus> for i32 {
    fn from(status: PositionStatus) -> i32 {
        match status {
            PositionStatus::Unknown => 0,
            PositionStatus::Ok => 1,
            PositionStatus::Error => 2,
        }
    }
}

impl TryFrom<i32> for PositionStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, UnknownStatus> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Ok),
            2 => Ok(Self::Error),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// Status of a Network `AddNode` reply (`NS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RegisterStatus {
    Unknown,
    Ok,
    Error,
}

impl From<RegisterStatus> for i32 {
    fn from(status: RegisterStatus) -> i32 {
        match status {
            RegisterStatus::Unknown => 0,
            RegisterStatus::Ok => 1,
            RegisterStatus::Error => 2,
        }
    }
}

impl TryFrom<i32> for RegisterStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, UnknownStatus> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Ok),
            2 => Ok(Self::Error),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// Status of a Network `StartNetwork` reply (`SS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum StartStatus {
    Unknown,
    Ok,
    Error,
}

impl From<StartStatus> for i32 {
    fn from(status: StartStatus) -> i32 {
        match status {
            StartStatus::Unknown => 0,
            StartStatus::Ok => 1,
            StartStatus::Error => 2,
        }
    }
}

impl TryFrom<i32> for StartStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, UnknownStatus> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Ok),
            2 => Ok(Self::Error),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// Status of a Network `GetTargetGlobalPosition` reply (`TS_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TrackingStatus {
    Unknown,
    Ok,
    Error,
}

impl From<TrackingStatus> for i32 {
    fn from(status: TrackingStatus) -> i32 {
        match status {
            TrackingStatus::Unknown => 0,
            TrackingStatus::Ok => 1,
            TrackingStatus::Error => 2,
        }
    }
}

impl TryFrom<i32> for TrackingStatus {
    type Error = UnknownStatus;

    fn try_from(code: i32) -> Result<Self, UnknownStatus> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Ok),
            2 => Ok(Self::Error),
            other => Err(UnknownStatus(other)),
        }
    }
}

/// serde helper for wire floats.
///
/// serde_json has no representation for non-finite numbers, and error
/// replies carry a literal `+inf` sentinel in their coordinates. Finite
/// values serialize as plain numbers; non-finite values as the strings
/// `"inf"`, `"-inf"`, `"nan"`.
pub mod wire_float {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f32(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f32, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrLiteral {
            Number(f32),
            Literal(String),
        }

        match NumberOrLiteral::deserialize(deserializer)? {
            NumberOrLiteral::Number(value) => Ok(value),
            NumberOrLiteral::Literal(literal) => match literal.as_str() {
                "inf" => Ok(f32::INFINITY),
                "-inf" => Ok(f32::NEG_INFINITY),
                "nan" => Ok(f32::NAN),
                other => Err(de::Error::custom(format!(
                    "invalid float literal: {other}"
                ))),
            },
        }
    }
}

/// Requests understood by the Target service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TargetRequest {
    GetPosition { node_id: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionResponse {
    pub status: PositionStatus,
    #[serde(with = "wire_float")]
    pub x: f32,
    #[serde(with = "wire_float")]
    pub y: f32,
    #[serde(with = "wire_float")]
    pub z: f32,
}

impl PositionResponse {
    pub fn ok(coords: [f32; 3]) -> Self {
        Self {
            status: PositionStatus::Ok,
            x: coords[0],
            y: coords[1],
            z: coords[2],
        }
    }
}

/// Requests understood by the Network coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkRequest {
    AddNode {
        node_id: i32,
        x: f32,
        y: f32,
        z: f32,
        bind_address: String,
    },
    StartNetwork {
        client_id: i32,
    },
    GetTargetGlobalPosition {
        client_id: i32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeResponse {
    pub status: RegisterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartNetworkResponse {
    pub status: StartStatus,
    pub n_nodes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPositionResponse {
    pub status: TrackingStatus,
    #[serde(with = "wire_float")]
    pub x: f32,
    #[serde(with = "wire_float")]
    pub y: f32,
    #[serde(with = "wire_float")]
    pub z: f32,
}

impl GlobalPositionResponse {
    pub fn ok(coords: [f32; 3]) -> Self {
        Self {
            status: TrackingStatus::Ok,
            x: coords[0],
            y: coords[1],
            z: coords[2],
        }
    }

    /// The contractual error reply: `TS_ERROR` with every coordinate at
    /// positive infinity.
    pub fn error() -> Self {
        Self {
            status: TrackingStatus::Error,
            x: f32::INFINITY,
            y: f32::INFINITY,
            z: f32::INFINITY,
        }
    }
}

/// Distances travel on the data plane as decimal text.
pub fn encode_distance(distance: f64) -> Vec<u8> {
    distance.to_string().into_bytes()
}

pub fn decode_distance(payload: &[u8]) -> Option<f64> {
    std::str::from_utf8(payload).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_contractual() {
        assert_eq!(i32::from(PositionStatus::Unknown), 0);
        assert_eq!(i32::from(PositionStatus::Ok), 1);
        assert_eq!(i32::from(PositionStatus::Error), 2);
        assert_eq!(i32::from(RegisterStatus::Error), 2);
        assert_eq!(i32::from(StartStatus::Ok), 1);
        assert_eq!(i32::from(TrackingStatus::Error), 2);
    }

    #[test]
    fn test_status_serializes_as_bare_integer() {
        let json = serde_json::to_string(&RegisterStatus::Ok).unwrap();
        assert_eq!(json, "1");

        let back: RegisterStatus = serde_json::from_str("2").unwrap();
        assert_eq!(back, RegisterStatus::Error);
    }

    #[test]
    fn test_out_of_range_status_is_rejected() {
        let result: Result<TrackingStatus, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_request_round_trip() {
        let request = NetworkRequest::AddNode {
            node_id: 3,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            bind_address: "tcp://127.0.0.1:25003".into(),
        };

        let bytes = serde_json::to_vec(&request).unwrap();
        let back: NetworkRequest = serde_json::from_slice(&bytes).unwrap();

        match back {
            NetworkRequest::AddNode {
                node_id,
                bind_address,
                ..
            } => {
                assert_eq!(node_id, 3);
                assert_eq!(bind_address, "tcp://127.0.0.1:25003");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_error_sentinel_survives_json() {
        let response = GlobalPositionResponse::error();
        let bytes = serde_json::to_vec(&response).unwrap();
        let back: GlobalPositionResponse = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.status, TrackingStatus::Error);
        assert!(back.x.is_infinite() && back.x > 0.0);
        assert!(back.y.is_infinite() && back.y > 0.0);
        assert!(back.z.is_infinite() && back.z > 0.0);
    }

    #[test]
    fn test_finite_coordinates_stay_numbers() {
        let response = GlobalPositionResponse::ok([3.0, 4.0, 5.0]);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("3.0") || json.contains("\"x\":3"));

        let back: GlobalPositionResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, TrackingStatus::Ok);
        assert!((back.y - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_framing() {
        let payload = encode_distance(12.25);
        assert_eq!(decode_distance(&payload), Some(12.25));
        assert_eq!(decode_distance(b"not a number"), None);
        assert_eq!(decode_distance(&[0xff, 0xfe]), None);
    }
}
