//! Transport backed by iroh: QUIC with relay-assisted NAT traversal and
//! DNS/pkarr address lookup.
//!
//! A namespaced name seeds the endpoint's secret key, so every name maps to
//! exactly one endpoint id and can be dialed by name alone. Each chat runs
//! on one bidirectional stream of [`Frame`]s: both sides open with `hello`,
//! then exchange `data`, and either side ends with `bye`.

use super::frame::{self, Frame};
use super::{CloseReason, ConnectionId, LinkSignal, Transport, TransportError, TransportEvent};
use crate::core::config::{
    BYE_GRACE, CHAT_ALPN, HELLO_TIMEOUT, ONLINE_TIMEOUT, PORT_RETRY_ATTEMPTS,
    REGISTRATION_PROBE_TIMEOUT,
};
use crate::utils::sos::SignalOfStop;
use crate::workers::args::RelayModeOption;
use anyhow::{Context, Result, bail};
use iroh::address_lookup::dns::DnsAddressLookup;
use iroh::address_lookup::pkarr::PkarrPublisher;
use iroh::endpoint::{Connection, Incoming, RecvStream, SendStream};
use iroh::{Endpoint, EndpointAddr, EndpointId, SecretKey};
use serde_json::Value;
use sha3::{Digest, Sha3_256};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4, SocketAddrV6};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Socket and relay settings for the endpoint.
#[derive(Debug, Clone, Default)]
pub struct NetworkOptions {
    pub relay: RelayModeOption,
    pub ipv4_addr: Option<SocketAddrV4>,
    pub ipv6_addr: Option<SocketAddrV6>,
    pub port: u16,
}

enum LinkCommand {
    Accept,
    Send(Value),
    Close(CloseReason),
}

#[derive(Clone)]
pub struct IrohTransport {
    inner: Arc<Inner>,
}

struct Inner {
    options: NetworkOptions,
    events: mpsc::UnboundedSender<TransportEvent>,
    sos: SignalOfStop,
    endpoint: Mutex<Option<Endpoint>>,
    local_name: Mutex<Option<String>>,
    links: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<LinkCommand>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn network(e: impl std::fmt::Display) -> TransportError {
    TransportError::Network(e.to_string())
}

/// Secret key owned by whoever registers `name`.
pub fn secret_for(name: &str) -> SecretKey {
    let digest: [u8; 32] = Sha3_256::digest(name.as_bytes()).into();
    SecretKey::from_bytes(&digest)
}

/// Endpoint id a `name` is reachable at.
pub fn endpoint_id_for(name: &str) -> EndpointId {
    secret_for(name).public()
}

fn ephemeral_secret() -> Result<SecretKey> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("no system randomness: {e}"))?;
    Ok(SecretKey::from_bytes(&bytes))
}

impl IrohTransport {
    pub fn new(
        options: NetworkOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
        sos: SignalOfStop,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                events,
                sos,
                endpoint: Mutex::new(None),
                local_name: Mutex::new(None),
                links: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Close the endpoint, dropping every connection.
    pub async fn shutdown(&self) {
        let endpoint = lock(&self.inner.endpoint).take();
        if let Some(endpoint) = endpoint {
            endpoint.close().await;
        }
    }

    fn emit(&self, event: TransportEvent) {
        let _ = self.inner.events.send(event);
    }

    fn endpoint(&self) -> Option<Endpoint> {
        lock(&self.inner.endpoint).clone()
    }

    fn local_name(&self) -> Option<String> {
        lock(&self.inner.local_name).clone()
    }

    fn command(&self, id: ConnectionId, cmd: LinkCommand) {
        let tx = lock(&self.inner.links).get(&id).cloned();
        match tx {
            Some(tx) => {
                let _ = tx.send(cmd);
            }
            None => debug!(event = "link_missing", id = %id, "Command for unknown connection"),
        }
    }

    // ── Registration ─────────────────────────────────────────────────────

    async fn start_session(&self, name: &str) -> Result<(), TransportError> {
        // Release whatever an earlier attempt left behind.
        self.shutdown().await;

        if self.name_taken(name).await {
            return Err(TransportError::UnavailableId);
        }

        let options = &self.inner.options;
        let endpoint = bind_with_retry(
            secret_for(name),
            &options.relay,
            options.ipv4_addr,
            options.ipv6_addr,
            options.port,
        )
        .await
        .map_err(network)?;

        if !matches!(options.relay, RelayModeOption::Disabled)
            && tokio::time::timeout(ONLINE_TIMEOUT, endpoint.online())
                .await
                .is_err()
        {
            endpoint.close().await;
            return Err(TransportError::Network("relay unreachable".into()));
        }

        info!(
            event = "registered",
            name,
            endpoint = %endpoint.id(),
            "Endpoint bound"
        );

        *lock(&self.inner.endpoint) = Some(endpoint.clone());
        *lock(&self.inner.local_name) = Some(name.to_string());

        let this = self.clone();
        tokio::spawn(async move { this.run_accept_loop(endpoint).await });
        Ok(())
    }

    /// Dial the endpoint `name` maps to from a throwaway endpoint. Anyone
    /// answering means the name is already registered.
    async fn name_taken(&self, name: &str) -> bool {
        let probe = match ephemeral_secret() {
            Ok(key) => try_bind(key, &self.inner.options.relay, None, None, 0).await,
            Err(e) => Err(e),
        };
        let probe = match probe {
            Ok(p) => p,
            Err(e) => {
                debug!(event = "probe_bind_failure", error = %e, "Skipping name probe");
                return false;
            }
        };

        let target = EndpointAddr::new(endpoint_id_for(name));
        let taken = match tokio::time::timeout(
            REGISTRATION_PROBE_TIMEOUT,
            probe.connect(target, CHAT_ALPN),
        )
        .await
        {
            Ok(Ok(conn)) => {
                conn.close(0u32.into(), b"probe");
                true
            }
            Ok(Err(e)) => {
                debug!(event = "probe_unanswered", error = %e, "Name looks free");
                false
            }
            Err(_) => false,
        };

        probe.close().await;
        taken
    }

    async fn run_accept_loop(self, endpoint: Endpoint) {
        loop {
            let ep = endpoint.clone();
            let result = self.inner.sos.select(async move { ep.accept().await }).await;
            match result {
                Err(()) => break,
                Ok(None) => {
                    debug!(event = "accept_loop_end", "Endpoint closed");
                    if !self.inner.sos.cancelled() {
                        self.emit(TransportEvent::Error(TransportError::Network(
                            "endpoint closed".into(),
                        )));
                    }
                    break;
                }
                Ok(Some(incoming)) => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.handle_incoming(incoming).await {
                            debug!(event = "incoming_dropped", error = %e, "Inbound connection dropped");
                        }
                    });
                }
            }
        }
    }

    // ── Links ────────────────────────────────────────────────────────────

    async fn handle_incoming(&self, incoming: Incoming) -> Result<()> {
        let connection = incoming.accept()?.await?;
        let remote = connection.remote_id();

        let (send, mut recv) = tokio::time::timeout(HELLO_TIMEOUT, connection.accept_bi())
            .await
            .context("peer never opened a stream")??;
        let hello = tokio::time::timeout(HELLO_TIMEOUT, frame::read_frame(&mut recv))
            .await
            .context("peer never said hello")??;
        let from = verify_hello(hello, remote)?;

        let id = ConnectionId::new();
        let (cmd_tx, mut cmds) = mpsc::unbounded_channel();
        lock(&self.inner.links).insert(id, cmd_tx);
        info!(event = "offer", id = %id, from = %from, "Inbound offer");
        self.emit(TransportEvent::Offer { id, from });

        let mut link = Link::new(id, connection, send, recv);
        match cmds.recv().await {
            Some(LinkCommand::Accept) => {
                let local = self.local_name().unwrap_or_default();
                match frame::write_frame(&mut link.send, &Frame::Hello { from: local }).await {
                    Ok(()) => {
                        link.opened = true;
                        self.emit(TransportEvent::Link {
                            id,
                            signal: LinkSignal::Opened,
                        });
                        link.drive(self, &mut cmds).await;
                    }
                    Err(e) => self.emit(TransportEvent::Link {
                        id,
                        signal: LinkSignal::Error(network(e)),
                    }),
                }
            }
            Some(LinkCommand::Close(reason)) => link.say_bye(reason).await,
            Some(LinkCommand::Send(_)) | None => link.say_bye(CloseReason::Hangup).await,
        }

        lock(&self.inner.links).remove(&id);
        Ok(())
    }

    async fn dial_link(
        &self,
        id: ConnectionId,
        remote: &str,
        cmds: &mut mpsc::UnboundedReceiver<LinkCommand>,
    ) -> Result<(), TransportError> {
        let endpoint = self
            .endpoint()
            .ok_or_else(|| TransportError::Network("not registered".into()))?;
        let local = self.local_name().unwrap_or_default();
        let addr = EndpointAddr::new(endpoint_id_for(remote));

        // Any command before the connection exists can only be a hangup.
        let connection = tokio::select! {
            conn = endpoint.connect(addr, CHAT_ALPN) => conn.map_err(|e| {
                debug!(event = "dial_failure", remote, error = %e, "Dial failed");
                TransportError::PeerUnavailable
            })?,
            _ = cmds.recv() => return Ok(()),
        };

        let (mut send, recv) = connection.open_bi().await.map_err(network)?;
        frame::write_frame(&mut send, &Frame::Hello { from: local })
            .await
            .map_err(network)?;

        Link::new(id, connection, send, recv).drive(self, cmds).await;
        Ok(())
    }
}

impl Transport for IrohTransport {
    fn register(&self, name: String) {
        let this = self.clone();
        tokio::spawn(async move {
            let event = match this.start_session(&name).await {
                Ok(()) => TransportEvent::Registered { name },
                Err(e) => {
                    warn!(event = "registration_failure", name, error = %e, "Registration failed");
                    TransportEvent::RegistrationFailed(e)
                }
            };
            this.emit(event);
        });
    }

    fn dial(&self, id: ConnectionId, remote: String) {
        // Registered before the task runs so an early close still reaches it.
        let (cmd_tx, mut cmds) = mpsc::unbounded_channel();
        lock(&self.inner.links).insert(id, cmd_tx);

        let this = self.clone();
        tokio::spawn(async move {
            info!(event = "dial", id = %id, remote = %remote, "Dialing");

            if let Err(err) = this.dial_link(id, &remote, &mut cmds).await {
                this.emit(TransportEvent::Link {
                    id,
                    signal: LinkSignal::Error(err),
                });
            }
            lock(&this.inner.links).remove(&id);
        });
    }

    fn accept(&self, id: ConnectionId) {
        self.command(id, LinkCommand::Accept);
    }

    fn send(&self, id: ConnectionId, payload: Value) {
        self.command(id, LinkCommand::Send(payload));
    }

    fn close(&self, id: ConnectionId, reason: CloseReason) {
        self.command(id, LinkCommand::Close(reason));
    }
}

/// One live connection and its stream.
struct Link {
    id: ConnectionId,
    connection: Connection,
    send: SendStream,
    frames: mpsc::UnboundedReceiver<Frame>,
    opened: bool,
}

impl Link {
    fn new(id: ConnectionId, connection: Connection, send: SendStream, recv: RecvStream) -> Self {
        Self {
            id,
            connection,
            send,
            frames: spawn_reader(id, recv),
            opened: false,
        }
    }

    fn signal(&self, transport: &IrohTransport, signal: LinkSignal) {
        transport.emit(TransportEvent::Link {
            id: self.id,
            signal,
        });
    }

    /// Pump frames and commands until either side ends the call.
    async fn drive(mut self, transport: &IrohTransport, cmds: &mut mpsc::UnboundedReceiver<LinkCommand>) {
        loop {
            tokio::select! {
                frame = self.frames.recv() => {
                    let ended = frame.is_none();
                    let bye = matches!(frame, Some(Frame::Bye { .. }));
                    match link_signal(&mut self.opened, frame) {
                        Some(signal) => self.signal(transport, signal),
                        None => debug!(event = "frame_ignored", id = %self.id, "Unexpected frame"),
                    }
                    if bye {
                        self.connection.close(0u32.into(), b"bye");
                    }
                    if bye || ended {
                        return;
                    }
                }
                cmd = cmds.recv() => match cmd {
                    Some(LinkCommand::Send(payload)) => {
                        if let Err(e) = frame::write_frame(&mut self.send, &Frame::Data { payload }).await {
                            self.signal(transport, LinkSignal::Error(network(e)));
                            self.connection.close(0u32.into(), b"error");
                            return;
                        }
                    }
                    Some(LinkCommand::Close(reason)) => {
                        self.say_bye(reason).await;
                        return;
                    }
                    Some(LinkCommand::Accept) => {}
                    None => {
                        self.say_bye(CloseReason::Hangup).await;
                        return;
                    }
                },
            }
        }
    }

    async fn say_bye(mut self, reason: CloseReason) {
        if let Err(e) = frame::write_frame(&mut self.send, &Frame::Bye { reason }).await {
            debug!(event = "bye_failure", id = %self.id, error = %e, "Could not say bye");
        }
        let _ = self.send.finish();
        // Give the remote a moment to read the bye and close from its side.
        let _ = tokio::time::timeout(BYE_GRACE, self.connection.closed()).await;
        self.connection.close(0u32.into(), b"bye");
    }
}

/// Check the opening frame of an inbound connection: it must be a hello
/// whose name derives the endpoint id the connection came from.
fn verify_hello(frame: Option<Frame>, remote: EndpointId) -> Result<String> {
    let from = match frame {
        Some(Frame::Hello { from }) => from,
        other => bail!("expected hello, got {other:?}"),
    };
    if endpoint_id_for(&from) != remote {
        bail!("{from} does not own endpoint {remote}");
    }
    Ok(from)
}

/// Map a received frame (`None` once the stream has ended) to the signal
/// the link reports. Data before the hello and repeated hellos map to
/// `None`.
fn link_signal(opened: &mut bool, frame: Option<Frame>) -> Option<LinkSignal> {
    match frame {
        Some(Frame::Hello { .. }) if !*opened => {
            *opened = true;
            Some(LinkSignal::Opened)
        }
        Some(Frame::Data { payload }) if *opened => Some(LinkSignal::Data(payload)),
        Some(Frame::Bye { reason }) => Some(LinkSignal::Closed(reason)),
        Some(_) => None,
        None => Some(LinkSignal::Closed(CloseReason::Lost)),
    }
}

/// Read frames on a dedicated task so the link loop never cancels a
/// half-read frame.
fn spawn_reader(id: ConnectionId, mut recv: RecvStream) -> mpsc::UnboundedReceiver<Frame> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match frame::read_frame(&mut recv).await {
                Ok(Some(frame)) => {
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(event = "frame_read_failure", id = %id, error = %e, "Dropping stream");
                    break;
                }
            }
        }
    });
    rx
}

// ── Binding ──────────────────────────────────────────────────────────────────

async fn try_bind(
    secret_key: SecretKey,
    relay_mode: &RelayModeOption,
    ipv4_addr: Option<SocketAddrV4>,
    ipv6_addr: Option<SocketAddrV6>,
    port: u16,
) -> Result<Endpoint> {
    let mut builder = Endpoint::empty_builder(relay_mode.clone().into())
        .alpns(vec![CHAT_ALPN.to_vec()])
        .secret_key(secret_key)
        .address_lookup(PkarrPublisher::n0_dns())
        .address_lookup(DnsAddressLookup::n0_dns());

    if let Some(addr) = ipv4_addr {
        if port > 0 {
            builder = builder.bind_addr(SocketAddrV4::new(*addr.ip(), port))?;
        } else {
            builder = builder.bind_addr(addr)?;
        }
    } else if port > 0 {
        builder = builder.bind_addr(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
    }

    if let Some(addr) = ipv6_addr {
        builder = builder.bind_addr(addr)?;
    }

    Ok(builder.bind().await?)
}

async fn bind_with_retry(
    secret_key: SecretKey,
    relay_mode: &RelayModeOption,
    ipv4_addr: Option<SocketAddrV4>,
    ipv6_addr: Option<SocketAddrV6>,
    port: u16,
) -> Result<Endpoint> {
    if port == 0 {
        return try_bind(secret_key, relay_mode, ipv4_addr, ipv6_addr, 0).await;
    }

    let mut last_err = None;
    for offset in 0..PORT_RETRY_ATTEMPTS {
        let try_port = port.wrapping_add(offset);
        if try_port == 0 {
            continue;
        }
        match try_bind(secret_key.clone(), relay_mode, ipv4_addr, ipv6_addr, try_port).await {
            Ok(endpoint) => {
                if offset > 0 {
                    info!("Port {port} was taken, bound to {try_port} instead");
                }
                return Ok(endpoint);
            }
            Err(e) => {
                let msg = format!("{e}");
                if msg.contains("in use") || msg.contains("AddrInUse") || msg.contains("address already") {
                    debug!("Port {try_port} in use, trying next...");
                    last_err = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    warn!(
        "Ports {port}-{} all in use, falling back to OS-assigned port",
        port.saturating_add(PORT_RETRY_ATTEMPTS - 1)
    );
    try_bind(secret_key, relay_mode, ipv4_addr, ipv6_addr, 0)
        .await
        .map_err(|e| last_err.unwrap_or(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_map_to_stable_endpoints() {
        assert_eq!(
            endpoint_id_for("stranger_alice"),
            endpoint_id_for("stranger_alice")
        );
        assert_ne!(
            endpoint_id_for("stranger_alice"),
            endpoint_id_for("stranger_bob")
        );
    }

    #[test]
    fn hello_must_match_the_dialing_endpoint() {
        let alice = endpoint_id_for("stranger_alice");
        let hello = |from: &str| Some(Frame::Hello { from: from.into() });

        assert_eq!(
            verify_hello(hello("stranger_alice"), alice).unwrap(),
            "stranger_alice"
        );
        assert!(verify_hello(hello("stranger_bob"), alice).is_err());
        assert!(verify_hello(None, alice).is_err());
        assert!(
            verify_hello(
                Some(Frame::Bye {
                    reason: CloseReason::Hangup
                }),
                alice
            )
            .is_err()
        );
    }

    #[test]
    fn frames_map_to_link_signals() {
        let hello = || Some(Frame::Hello { from: "stranger_bob".into() });
        let data = || Some(Frame::Data { payload: json!({ "type": "msg", "content": "hi" }) });
        let mut opened = false;

        assert_eq!(link_signal(&mut opened, data()), None);
        assert_eq!(link_signal(&mut opened, hello()), Some(LinkSignal::Opened));
        assert!(opened);
        assert_eq!(link_signal(&mut opened, hello()), None);
        assert_eq!(
            link_signal(&mut opened, data()),
            Some(LinkSignal::Data(json!({ "type": "msg", "content": "hi" })))
        );
        assert_eq!(
            link_signal(
                &mut opened,
                Some(Frame::Bye {
                    reason: CloseReason::Busy
                })
            ),
            Some(LinkSignal::Closed(CloseReason::Busy))
        );
        assert_eq!(
            link_signal(&mut opened, None),
            Some(LinkSignal::Closed(CloseReason::Lost))
        );
    }

    #[tokio::test]
    async fn close_before_dial_task_runs_reaches_the_link() {
        let (events, _rx) = mpsc::unbounded_channel();
        let transport = IrohTransport::new(NetworkOptions::default(), events, SignalOfStop::new());
        let id = ConnectionId::new();

        transport.dial(id, "stranger_bob".into());
        assert!(lock(&transport.inner.links).contains_key(&id));
    }

    #[test]
    fn ephemeral_keys_differ() {
        let a = ephemeral_secret().unwrap().public();
        let b = ephemeral_secret().unwrap().public();
        assert_ne!(a, b);
    }
}
