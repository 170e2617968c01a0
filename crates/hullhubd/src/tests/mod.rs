//! Cross-module suites for the hull service.

mod service_behaviour;
pub(crate) mod support;
