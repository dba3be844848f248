#![warn(missing_docs)]
//! Functions relay drives request/response cycles against an off-chain compute
//! oracle network: it stages encrypted secrets, prices and submits requests,
//! and decodes the results delivered back on-chain.

pub mod cmd;
pub mod codec;
pub mod config;
pub mod estimator;
pub mod http_client;
pub mod lifecycle;
pub mod listener;
pub mod persistence;
pub mod providers;
pub mod sandbox;
pub mod secrets;
pub mod submitter;
pub mod test_helpers;
