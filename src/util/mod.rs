//! Small runtime helpers shared by the drivers.

mod yield_now;

pub(crate) use yield_now::yield_now;
