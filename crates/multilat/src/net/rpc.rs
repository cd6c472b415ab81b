//! Request/response helper over a dealer socket.
//!
//! One in-flight request per client: callers issue `call` sequentially,
//! which is what per-connection arrival-order processing on the server
//! side assumes.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use multilat_core::{MultilatError, Result};

use super::DealerEndpoint;

pub struct RpcClient {
    dealer: DealerEndpoint,
    timeout: Duration,
}

impl RpcClient {
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let dealer = DealerEndpoint::new();
        dealer.connect(address).await?;
        Ok(Self { dealer, timeout })
    }

    pub async fn call<Req, Resp>(&self, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        // A reply that arrived after its request timed out must not be
        // handed to the next caller.
        self.dealer.drain().await;

        let payload = serde_json::to_vec(request)?;
        self.dealer.send(payload).await?;

        let reply = tokio::time::timeout(self.timeout, self.dealer.recv())
            .await
            .map_err(|_| {
                MultilatError::timeout(format!("no reply within {:?}", self.timeout))
            })??;

        Ok(serde_json::from_slice(&reply)?)
    }
}
