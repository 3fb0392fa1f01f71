use rand::{Rng, distributions::Alphanumeric, thread_rng};

#[inline]
#[must_use]
pub fn string(length: usize) -> String {
	thread_rng()
		.sample_iter(Alphanumeric)
		.take(length)
		.map(char::from)
		.collect()
}
