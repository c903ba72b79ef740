//! Hearth Gateway - smart-home directive gateway for voice assistants
//!
//! This library implements the server side of a smart-home voice-assistant
//! protocol: it receives directives addressed to virtual devices, dispatches
//! each one to the capability controller its namespace selects, and emits
//! well-formed response envelopes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Raw directive                       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                DirectiveRouter                       │
//! │   Power │ Toggle │ Range │ Cooking │ State │ Auth   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Collaborators                         │
//! │   Registry │ Device state │ Identity │ OAuth        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The router and controllers hold no state beyond one request; every
//! external concern is reached through the narrow traits in [`stores`].

pub mod auth;
pub mod config;
pub mod controllers;
pub mod directive;
pub mod endpoint;
pub mod error;
pub mod response;
pub mod router;
pub mod schema;
pub mod stores;

pub use config::{GatewayConfig, OauthConfig};
pub use controllers::{CapabilityController, ControllerContext};
pub use directive::{Directive, DirectiveRequest};
pub use endpoint::{Capability, EndpointRecord, SupportedRange};
pub use error::{Error, Result};
pub use response::{ContextProperty, EnvelopeOptions, PayloadEndpoint, ResponseEnvelope};
pub use router::DirectiveRouter;
pub use schema::{EnvelopeShapeValidator, SchemaValidator};
pub use stores::Services;
