mod rpc;
mod sockets;

pub use rpc::RpcClient;
pub use sockets::{DealerEndpoint, DealerPool, RouterEndpoint};
