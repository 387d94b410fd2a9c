pub mod chain;
pub mod context;
pub mod credentials;
pub mod erc20;
pub mod error;
pub mod nonce;
pub mod rpc_clients;
pub mod signer;
