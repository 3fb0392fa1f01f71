mod data;

use std::sync::Arc;

use scrawl_core::{
	Result,
	board::{ClientData, NetworkMsg, Op, ServerMsg, StrokeObject},
	debug_error,
};

use self::data::Data;
use crate::{OnceServices, service};

/// Builds the ordered message sequence that reconstructs visible room state
/// for a joining client: the persisted stroke log, live DOM objects, the
/// strokes still in flight, and current locks. Everything but the persisted
/// log carries clock 0, which clients treat as presentation-only.
pub struct Service {
	services: Arc<OnceServices>,
	db: Data,
}

impl crate::Service for Service {
	fn build(args: &crate::Args<'_>) -> Result<Arc<Self>> {
		Ok(Arc::new(Self {
			services: args.services.clone(),
			db: Data::new(args.db),
		}))
	}

	fn name(&self) -> &str { service::make_name(std::module_path!()) }
}

impl Service {
	pub async fn compose(
		&self,
		user_id: &str,
		room_id: &str,
		layer: i64,
		from_id: i64,
	) -> Result<Vec<ServerMsg>> {
		self.services
			.membership()
			.ensure_user_in_room(room_id, user_id)
			.await?;

		let mut msgs = Vec::new();

		// persisted strokes, ascending id, clock = id
		for event in self.db.stroke_events(room_id, layer, from_id).await? {
			let stroke: StrokeObject = match serde_json::from_slice(&event.payload) {
				| Ok(stroke) => stroke,
				| Err(error) => {
					debug_error!(
						room_id,
						id = event.id,
						"undecodable stroke event payload: {error}"
					);
					continue;
				},
			};

			let mut payload = NetworkMsg::new(Op::StrokeAdd, event.entity_id.clone());
			payload.stroke = Some(stroke);
			msgs.push(ServerMsg::new(event.id, payload));
		}

		// live DOM objects
		for dom in self.db.active_dom_objects(room_id, layer).await? {
			let mut payload = NetworkMsg::new(Op::DomAdd, dom.id.clone());
			payload.dom_object = Some(dom);
			msgs.push(ServerMsg::new(0, payload));
		}

		// strokes still in flight, with their points so far
		for (stroke, meta) in self.services.strokes().snapshot(room_id, layer) {
			let mut payload = NetworkMsg::new(Op::StrokeStart, stroke.id.clone());
			payload.stroke = Some(stroke);
			payload.client_data = Some(ClientData { id: meta.user_id, ..Default::default() });
			msgs.push(ServerMsg::new(0, payload));
		}

		// current locks
		for (dom_id, owner) in self.services.dom_locks().snapshot(room_id) {
			let mut payload = NetworkMsg::new(Op::DomLock, dom_id);
			payload.client_data = Some(ClientData { id: owner, ..Default::default() });
			msgs.push(ServerMsg::new(0, payload));
		}

		Ok(msgs)
	}
}
