//! Chain access: provider construction, contract bindings and typed readers.

pub mod contracts;
mod network;
mod rpc;
mod token;

pub use network::OnChainNetwork;
pub use rpc::{ProviderError, create_provider, create_signer_provider, parse_signer};
pub use token::{Approval, ApprovalError, approve_full_balance};
