use serde::{Deserialize, Serialize};

/// Placement of a DOM object on the board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Transform {
	pub x: f64,
	pub y: f64,
	pub rot: f64,
	pub w: f64,
	pub h: f64,
}

/// A positioned, transformable media/container element (img, video, audio,
/// ...). `payload` carries the element's content reference, typically a blob
/// store key.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomObject {
	pub id: String,

	#[serde(default)]
	pub kind: String,

	#[serde(default)]
	pub transform: Transform,

	#[serde(default)]
	pub payload: String,

	#[serde(default)]
	pub layer_index: i64,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
}
