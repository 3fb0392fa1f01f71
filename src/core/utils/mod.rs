pub mod hash;
pub mod rand;
pub mod result;
pub mod time;

pub use self::{
	hash::fnv1a32,
	result::Result,
	time::now_millis,
};

#[inline]
pub fn exchange<T>(state: &mut T, source: T) -> T { std::mem::replace(state, source) }
