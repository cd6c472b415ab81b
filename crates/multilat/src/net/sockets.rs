//! ZeroMQ socket management using the Actor Model.
//!
//! Sharing a socket behind a lock invites deadlocks between senders and
//! receivers, so each socket lives in its own background task. The
//! endpoint structs are controllers that talk to those actors over MPSC
//! channels.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use zeromq::{DealerSocket, RouterSocket, Socket, SocketRecv, SocketSend};

use multilat_core::{MultilatError, Result};

const CHANNEL_BUFFER: usize = 100;

type BindReply = oneshot::Sender<std::result::Result<String, String>>;
type ConnectReply = oneshot::Sender<std::result::Result<(), String>>;

#[derive(Debug)]
enum RouterCommand {
    Bind(String, BindReply),
    SendReply(Vec<u8>, Vec<u8>), // identity, payload
}

#[derive(Debug)]
enum DealerCommand {
    Connect(String, ConnectReply),
    Send(Vec<u8>),
}

/// An identity-routed reply socket. Bound by the coordinator's RPC
/// server, the target's RPC server, and each node's distance router.
pub struct RouterEndpoint {
    command_tx: mpsc::Sender<RouterCommand>,
    message_rx: Arc<Mutex<mpsc::Receiver<(Vec<u8>, Vec<u8>)>>>,
}

impl RouterEndpoint {
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (message_tx, message_rx) = mpsc::channel(CHANNEL_BUFFER);

        tokio::spawn(router_actor(command_rx, message_tx));

        Self {
            command_tx,
            message_rx: Arc::new(Mutex::new(message_rx)),
        }
    }

    /// Binds the socket and returns the resolved endpoint, so callers
    /// may bind port 0 and learn the actual address.
    pub async fn bind(&self, address: &str) -> Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(RouterCommand::Bind(address.to_string(), reply_tx))
            .await
            .map_err(|_| MultilatError::network("router actor closed"))?;

        reply_rx
            .await
            .map_err(|_| MultilatError::network("router actor closed"))?
            .map_err(MultilatError::Network)
    }

    pub async fn recv(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut rx = self.message_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| MultilatError::network("router actor closed"))
    }

    pub async fn send_reply(&self, identity: Vec<u8>, payload: Vec<u8>) -> Result<()> {
        self.command_tx
            .send(RouterCommand::SendReply(identity, payload))
            .await
            .map_err(|_| MultilatError::network("router actor closed"))
    }
}

impl Default for RouterEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

/// A single outbound request socket. Used by every RPC caller: node
/// registration, the sensor's target polling, and the client.
pub struct DealerEndpoint {
    command_tx: mpsc::Sender<DealerCommand>,
    message_rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
}

impl DealerEndpoint {
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (message_tx, message_rx) = mpsc::channel(CHANNEL_BUFFER);

        tokio::spawn(dealer_actor(command_rx, message_tx));

        Self {
            command_tx,
            message_rx: Arc::new(Mutex::new(message_rx)),
        }
    }

    pub async fn connect(&self, address: &str) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(DealerCommand::Connect(address.to_string(), reply_tx))
            .await
            .map_err(|_| MultilatError::network("dealer actor closed"))?;

        reply_rx
            .await
            .map_err(|_| MultilatError::network("dealer actor closed"))?
            .map_err(MultilatError::Network)
    }

    pub async fn send(&self, payload: Vec<u8>) -> Result<()> {
        self.command_tx
            .send(DealerCommand::Send(payload))
            .await
            .map_err(|_| MultilatError::network("dealer actor closed"))
    }

    pub async fn recv(&self) -> Result<Vec<u8>> {
        let mut rx = self.message_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| MultilatError::network("dealer actor closed"))
    }

    /// Discards any reply already queued, e.g. one that arrived after
    /// its request timed out.
    pub async fn drain(&self) {
        let mut rx = self.message_rx.lock().await;
        while rx.try_recv().is_ok() {}
    }
}

impl Default for DealerEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

/// A fan-out/fan-in dealer set: one dealer worker per named peer, all
/// replies funneled into a single channel tagged with the peer id.
pub struct DealerPool {
    workers: HashMap<i32, mpsc::Sender<Vec<u8>>>,
    message_tx: mpsc::Sender<(i32, Vec<u8>)>,
    message_rx: mpsc::Receiver<(i32, Vec<u8>)>,
}

impl DealerPool {
    pub fn new() -> Self {
        let (message_tx, message_rx) = mpsc::channel(CHANNEL_BUFFER);
        Self {
            workers: HashMap::new(),
            message_tx,
            message_rx,
        }
    }

    /// Spawns a dealer worker connected to `address`. Errors if the
    /// connection cannot be established.
    pub async fn connect(&mut self, peer_id: i32, address: &str) -> Result<()> {
        if self.workers.contains_key(&peer_id) {
            return Ok(());
        }

        let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (connected_tx, connected_rx) = oneshot::channel();

        tokio::spawn(pool_worker(
            peer_id,
            address.to_string(),
            connected_tx,
            command_rx,
            self.message_tx.clone(),
        ));

        connected_rx
            .await
            .map_err(|_| MultilatError::network("dealer worker died"))?
            .map_err(MultilatError::Network)?;

        self.workers.insert(peer_id, command_tx);
        Ok(())
    }

    pub fn peer_ids(&self) -> Vec<i32> {
        self.workers.keys().copied().collect()
    }

    pub async fn send(&self, peer_id: i32, payload: Vec<u8>) -> Result<()> {
        let tx = self
            .workers
            .get(&peer_id)
            .ok_or_else(|| MultilatError::network(format!("no worker for peer {peer_id}")))?;
        tx.send(payload)
            .await
            .map_err(|_| MultilatError::network(format!("dealer worker {peer_id} closed")))
    }

    /// Waits up to `timeout` for the next `(peer_id, payload)` reply.
    pub async fn recv_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Option<(i32, Vec<u8>)> {
        tokio::time::timeout(timeout, self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Discards replies left over from an earlier round.
    pub fn drain(&mut self) {
        while self.message_rx.try_recv().is_ok() {}
    }
}

impl Default for DealerPool {
    fn default() -> Self {
        Self::new()
    }
}

async fn router_actor(
    mut commands: mpsc::Receiver<RouterCommand>,
    msg_sender: mpsc::Sender<(Vec<u8>, Vec<u8>)>,
) {
    let mut socket = RouterSocket::new();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(RouterCommand::Bind(addr, reply)) => {
                        let result = match socket.bind(&addr).await {
                            Ok(endpoint) => Ok(endpoint.to_string()),
                            Err(e) => {
                                tracing::error!(addr, error = %e, "router bind failed");
                                Err(e.to_string())
                            }
                        };
                        let _ = reply.send(result);
                    }
                    Some(RouterCommand::SendReply(identity, payload)) => {
                        let mut msg = zeromq::ZmqMessage::from(identity);
                        msg.push_back(payload.into());
                        if let Err(e) = socket.send(msg).await {
                            tracing::error!(error = %e, "router send failed");
                        }
                    }
                    None => break,
                }
            }

            res = socket.recv() => {
                match res {
                    Ok(msg) => {
                        let frames: Vec<_> = msg.into_vec();
                        if frames.len() >= 2 {
                            let identity = frames[0].to_vec();
                            let payload = frames[1].to_vec();
                            if msg_sender.send((identity, payload)).await.is_err() {
                                tracing::debug!("router msg receiver closed");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "router recv failed");
                    }
                }
            }
        }
    }
}

async fn dealer_actor(
    mut commands: mpsc::Receiver<DealerCommand>,
    msg_sender: mpsc::Sender<Vec<u8>>,
) {
    let mut socket = DealerSocket::new();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(DealerCommand::Connect(addr, reply)) => {
                        let result = match socket.connect(&addr).await {
                            Ok(()) => Ok(()),
                            Err(e) => {
                                tracing::error!(addr, error = %e, "dealer connect failed");
                                Err(e.to_string())
                            }
                        };
                        let _ = reply.send(result);
                    }
                    Some(DealerCommand::Send(payload)) => {
                        let msg = zeromq::ZmqMessage::from(payload);
                        if let Err(e) = socket.send(msg).await {
                            tracing::error!(error = %e, "dealer send failed");
                        }
                    }
                    None => break,
                }
            }

            res = socket.recv() => {
                match res {
                    Ok(msg) => {
                        let frames: Vec<_> = msg.into_vec();
                        if let Some(payload) = frames.last() {
                            if msg_sender.send(payload.to_vec()).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "dealer recv failed");
                    }
                }
            }
        }
    }
}

async fn pool_worker(
    peer_id: i32,
    address: String,
    connected: ConnectReply,
    mut commands: mpsc::Receiver<Vec<u8>>,
    msg_sender: mpsc::Sender<(i32, Vec<u8>)>,
) {
    let mut socket = DealerSocket::new();

    match socket.connect(&address).await {
        Ok(()) => {
            tracing::debug!(peer_id, address, "dealer worker connected");
            let _ = connected.send(Ok(()));
        }
        Err(e) => {
            tracing::error!(peer_id, address, error = %e, "dealer worker connect failed");
            let _ = connected.send(Err(e.to_string()));
            return;
        }
    }

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(payload) => {
                        let msg = zeromq::ZmqMessage::from(payload);
                        if let Err(e) = socket.send(msg).await {
                            tracing::error!(peer_id, error = %e, "dealer worker send failed");
                        }
                    }
                    None => break,
                }
            }

            res = socket.recv() => {
                match res {
                    Ok(msg) => {
                        let frames: Vec<_> = msg.into_vec();
                        if let Some(payload) = frames.last() {
                            if msg_sender.send((peer_id, payload.to_vec())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(peer_id, error = %e, "dealer worker recv failed");
                    }
                }
            }
        }
    }
}
