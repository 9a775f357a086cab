//! Pending requests and callback delivery.
//!
//! Every call that wants an agent's result becomes an [`AgentRequest`]. The
//! [`RequestController`] keeps them grouped by agent identifier until the
//! execution reports, and the [`Dispatcher`] hands each callback to the
//! request's delivery target.

mod agent_request;
mod controller;
mod delivery;

pub use agent_request::RequestId;
pub(crate) use agent_request::{AgentRequest, DeliveryTarget};
pub(crate) use controller::RequestController;
pub(crate) use delivery::Dispatcher;
