use serde::{Deserialize, Serialize};

/// One pen sample. Pressure rides along for pressure-sensitive inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
	#[serde(default)]
	pub pressure: f64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeOp {
	#[default]
	Draw,
	Erase,
}

/// A stroke as drawn by a client. Accumulates points in the stroke buffer
/// between `stroke-start` and `stroke-end`, then persists whole as one
/// `stroke-add` event payload.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeObject {
	pub id: String,

	#[serde(default = "default_kind")]
	pub kind: String,

	#[serde(default)]
	pub color: String,

	#[serde(default)]
	pub operation: StrokeOp,

	#[serde(default)]
	pub opacity: f64,

	#[serde(default)]
	pub size: i64,

	#[serde(default)]
	pub points: Vec<Point>,

	#[serde(default)]
	pub layer_index: i64,
}

fn default_kind() -> String { "stroke".to_owned() }

#[cfg(test)]
mod tests {
	use super::{Point, StrokeObject, StrokeOp};

	#[test]
	fn decodes_wire_shape() {
		let json = r##"{
			"id": "s1",
			"kind": "stroke",
			"color": "#000",
			"operation": "draw",
			"opacity": 1.0,
			"size": 3,
			"points": [{"x": 0.0, "y": 0.0, "pressure": 0.5}],
			"layerIndex": 0
		}"##;

		let stroke: StrokeObject = serde_json::from_str(json).unwrap();
		assert_eq!(stroke.id, "s1");
		assert_eq!(stroke.operation, StrokeOp::Draw);
		assert_eq!(stroke.points, vec![Point { x: 0.0, y: 0.0, pressure: 0.5 }]);
	}

	#[test]
	fn layer_index_is_camel_case() {
		let stroke = StrokeObject { id: "s".into(), layer_index: 7, ..Default::default() };
		let json = serde_json::to_value(&stroke).unwrap();
		assert_eq!(json["layerIndex"], 7);
	}
}
