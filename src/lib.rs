//! FireProx - disposable pass-through proxy endpoints on AWS API Gateway
//!
//! This library provisions and manages rotatable HTTP(S) front-ends:
//! - Creates gateway endpoints that forward all traffic to one backend URL
//! - Lists endpoints with their resolved backend targets
//! - Repoints an endpoint's wildcard integration at a new backend
//! - Deletes endpoints individually or sweeps them all on interrupt
//!
//! The actual pass-through is done entirely by the managed gateway; this
//! tool only drives its control plane.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod sign;
pub mod template;
