use serde::{Deserialize, Serialize};

use super::{DomObject, StrokeObject, Transform, stroke::Point};

/// Client identity data attached to presence-flavored messages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ClientData {
	pub id: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub profile: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct LayerRef {
	#[serde(default)]
	pub index: i64,
}

/// One protocol message. The `operation` discriminates which of the optional
/// payload fields are meaningful; unknown operations are tolerated and
/// dropped by the router.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMsg {
	pub operation: String,

	#[serde(default)]
	pub id: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stroke: Option<StrokeObject>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub points: Option<Vec<Point>>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transform: Option<Transform>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dom_object: Option<DomObject>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_data: Option<ClientData>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub layer: Option<LayerRef>,
}

impl NetworkMsg {
	#[must_use]
	pub fn new(op: Op, id: impl Into<String>) -> Self {
		Self {
			operation: op.as_str().to_owned(),
			id: id.into(),
			..Default::default()
		}
	}

	#[inline]
	#[must_use]
	pub fn op(&self) -> Op { Op::parse(&self.operation) }
}

/// A server-to-client message: a protocol payload stamped with the room
/// clock. Clock 0 marks presentation-only messages which carry no order
/// assignment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerMsg {
	pub clock: i64,
	pub payload: NetworkMsg,
}

impl ServerMsg {
	#[inline]
	#[must_use]
	pub fn new(clock: i64, payload: NetworkMsg) -> Self { Self { clock, payload } }
}

/// Known protocol operations. The wire keeps the string form; this enum is
/// the router's dispatch key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
	StrokeStart,
	StrokeUpdate,
	StrokeEnd,
	StrokeAdd,
	DomAdd,
	DomLock,
	DomUnlock,
	DomTransform,
	DomPayload,
	DomRemove,
	CursorUpdate,
	ChangeLayer,
	ChangeLayerAccept,
	ChangeLayerDenied,
	ClientLeave,
	Unknown,
}

impl Op {
	#[must_use]
	pub fn parse(op: &str) -> Self {
		match op {
			| "stroke-start" => Self::StrokeStart,
			| "stroke-update" => Self::StrokeUpdate,
			| "stroke-end" => Self::StrokeEnd,
			| "stroke-add" => Self::StrokeAdd,
			| "dom-add" => Self::DomAdd,
			| "dom-lock" => Self::DomLock,
			| "dom-unlock" => Self::DomUnlock,
			| "dom-transform" => Self::DomTransform,
			| "dom-payload" => Self::DomPayload,
			| "dom-remove" => Self::DomRemove,
			| "cursor-update" => Self::CursorUpdate,
			| "change-layer" => Self::ChangeLayer,
			| "change-layer-accept" => Self::ChangeLayerAccept,
			| "change-layer-denied" => Self::ChangeLayerDenied,
			| "client-leave" => Self::ClientLeave,
			| _ => Self::Unknown,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			| Self::StrokeStart => "stroke-start",
			| Self::StrokeUpdate => "stroke-update",
			| Self::StrokeEnd => "stroke-end",
			| Self::StrokeAdd => "stroke-add",
			| Self::DomAdd => "dom-add",
			| Self::DomLock => "dom-lock",
			| Self::DomUnlock => "dom-unlock",
			| Self::DomTransform => "dom-transform",
			| Self::DomPayload => "dom-payload",
			| Self::DomRemove => "dom-remove",
			| Self::CursorUpdate => "cursor-update",
			| Self::ChangeLayer => "change-layer",
			| Self::ChangeLayerAccept => "change-layer-accept",
			| Self::ChangeLayerDenied => "change-layer-denied",
			| Self::ClientLeave => "client-leave",
			| Self::Unknown => "unknown",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{NetworkMsg, Op, ServerMsg};

	#[test]
	fn frame_is_an_array() {
		let frame = r#"[
			{"operation": "stroke-update", "id": "s1", "points": [{"x": 1.0, "y": 2.0}]},
			{"operation": "cursor-update", "id": "u1"}
		]"#;

		let msgs: Vec<NetworkMsg> = serde_json::from_str(frame).unwrap();
		assert_eq!(msgs.len(), 2);
		assert_eq!(msgs[0].op(), Op::StrokeUpdate);
		assert_eq!(msgs[1].op(), Op::CursorUpdate);
	}

	#[test]
	fn unknown_operations_parse() {
		let msg: NetworkMsg =
			serde_json::from_str(r#"{"operation": "telepathy", "id": "x"}"#).unwrap();
		assert_eq!(msg.op(), Op::Unknown);
	}

	#[test]
	fn absent_payload_fields_are_omitted() {
		let msg = ServerMsg::new(3, NetworkMsg::new(Op::StrokeEnd, "s1"));
		let json = serde_json::to_string(&msg).unwrap();
		assert!(!json.contains("stroke"));
		assert!(!json.contains("domObject"));
		assert!(json.contains("\"clock\":3"));
	}
}
