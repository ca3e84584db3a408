pub mod abi;
pub mod chain_rpc;
pub mod logging;
pub mod polling;
pub mod wallet_provider;

pub use chain_rpc::{CallRequest, ChainRpc, JsonRpcChainClient, RpcError, TransactionReceipt};
pub use polling::poll_for;
pub use wallet_provider::{ProviderEvent, ProviderRpcError, WalletProvider, WalletSigner};
