//! Pass 2: bar mapping, sensitivity correction and the mirrored layout handed to renderers.

pub mod bars;
pub mod mirror;
pub mod sensitivity;
pub mod stream;
