//! Wire and domain types for the whiteboard protocol.
//!
//! A transport frame is a JSON array: `Vec<NetworkMsg>` from clients,
//! `Vec<ServerMsg>` from the server. `ServerMsg.clock` is the room's order
//! assignment; a clock of 0 means presentation-only.

mod dom;
mod event;
mod msg;
mod role;
mod stroke;

pub use self::{
	dom::{DomObject, Transform},
	event::{Event, EventMeta},
	msg::{ClientData, LayerRef, NetworkMsg, Op, ServerMsg},
	role::Role,
	stroke::{Point, StrokeObject, StrokeOp},
};
