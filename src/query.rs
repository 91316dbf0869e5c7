use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::SourceQueryError;
use crate::info::{Address, ServerInfo};
use crate::packet::{
    challenge_request, info_request, player_request, ChallengeResponse, PacketHeader,
    MAX_PACKET_SIZE,
};
use crate::player::PlayerInfo;

/// Used by the command line front end when no timeout is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A query session against one server.
///
/// Owns one connected UDP socket. Every send and every receive is bounded by
/// the timeout given to [Querier::new]; nothing is retried.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), sourcequery::SourceQueryError> {
/// use std::time::Duration;
/// use sourcequery::Querier;
///
/// let mut querier = Querier::new("127.0.0.1:27015", Duration::from_secs(1)).await?;
/// let info = querier.get_server_info().await?;
/// let players = querier.get_player_info().await?;
/// querier.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Querier {
    address: Address,
    socket: Option<UdpSocket>,
    timeout_dur: Duration,
    app_id: Option<u16>,
}

impl Querier {
    /// Open a session to `addr`, which must be a literal `ip:port`
    /// (`[v6]:port` for IPv6). Host names are not resolved.
    pub async fn new(addr: &str, timeout_dur: Duration) -> Result<Querier, SourceQueryError> {
        let remote: SocketAddr = addr
            .parse()
            .map_err(|_| SourceQueryError::InvalidAddress(addr.to_owned()))?;

        // just arbitrarily bind any port of the same family
        let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let sock: UdpSocket = UdpSocket::bind(local)
            .await
            .map_err(SourceQueryError::FailedPortBind)?;

        timeout(timeout_dur, sock.connect(remote))
            .await?
            .map_err(SourceQueryError::UnreachableHost)?;

        debug!("opened query session to {}", remote);

        Ok(Querier {
            address: Address {
                host: remote.ip().to_string(),
                port: remote.port(),
            },
            socket: Some(sock),
            timeout_dur,
            app_id: None,
        })
    }

    /// Tell the decoder which game the server runs. Only app ID 2400
    /// (The Ship) changes how player replies are read.
    pub fn with_app_id(mut self, app_id: u16) -> Self {
        self.app_id = Some(app_id);
        self
    }

    pub fn set_app_id(&mut self, app_id: Option<u16>) {
        self.app_id = app_id;
    }

    pub fn app_id(&self) -> Option<u16> {
        self.app_id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Release the socket. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("closed query session to {}", self.address);
        }
    }

    fn socket(&self) -> Result<&UdpSocket, SourceQueryError> {
        self.socket.as_ref().ok_or(SourceQueryError::SessionClosed)
    }

    async fn send_recv(&self, request: &[u8]) -> Result<Vec<u8>, SourceQueryError> {
        let sock = self.socket()?;

        // sending
        timeout(self.timeout_dur, sock.send(request))
            .await?
            .map_err(SourceQueryError::SendError)?;

        // receiving packet
        let mut resp_buf = [0u8; MAX_PACKET_SIZE];
        let len = timeout(self.timeout_dur, sock.recv(&mut resp_buf))
            .await?
            .map_err(SourceQueryError::ReceiveError)?;
        trace!("received {} bytes from {}", len, self.address);

        Ok(resp_buf[..len].to_vec())
    }

    /// Ask for a player challenge.
    ///
    /// Some servers skip the handshake and answer with the full player list
    /// straight away, which comes back as [ChallengeResponse::FullReply].
    pub async fn get_challenge(&self) -> Result<ChallengeResponse, SourceQueryError> {
        debug!("requesting challenge from {}", self.address);
        let reply = self.send_recv(&challenge_request()).await?;
        ChallengeResponse::parse(reply)
    }

    /// Query the server with A2S_INFO.
    pub async fn get_server_info(&self) -> Result<ServerInfo, SourceQueryError> {
        debug!("requesting server info from {}", self.address);
        let reply = self.send_recv(&info_request()).await?;
        ServerInfo::parse(&reply, self.address.clone())
    }

    /// Query the server with A2S_PLAYER, absolving a challenge first if the
    /// server asks for one.
    pub async fn get_player_info(&self) -> Result<PlayerInfo, SourceQueryError> {
        let reply = match self.get_challenge().await? {
            ChallengeResponse::FullReply(data) => data,
            ChallengeResponse::Token(token) => {
                debug!("requesting player info from {}", self.address);
                self.send_recv(&player_request(&token)).await?
            }
        };

        match PacketHeader::peek(&reply)? {
            PacketHeader::Single => PlayerInfo::parse(&reply, self.app_id),
            PacketHeader::Split => Err(SourceQueryError::MultiPacketUnsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{tests::info_reply, ServerType, THE_SHIP_APP_ID};
    use crate::player::tests::player_reply;
    use tokio::task::JoinHandle;

    const TOKEN: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];

    fn challenge_reply() -> Vec<u8> {
        let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
        data.extend_from_slice(&TOKEN);
        data
    }

    /// Answer each incoming datagram with the next canned reply, handing back
    /// the requests that were received.
    async fn fake_server(replies: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<Vec<u8>>>) {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = sock.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for reply in replies {
                let mut buf = [0u8; MAX_PACKET_SIZE];
                let (len, peer) = sock.recv_from(&mut buf).await.unwrap();
                requests.push(buf[..len].to_vec());
                sock.send_to(&reply, peer).await.unwrap();
            }
            requests
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_invalid_address() {
        for addr in [
            "localhost:27015",
            "127.0.0.1:port",
            "127.0.0.1",
            "1.2.3:27015",
            "127.0.0.1:70000",
        ] {
            assert!(
                matches!(
                    Querier::new(addr, DEFAULT_TIMEOUT).await,
                    Err(SourceQueryError::InvalidAddress(_))
                ),
                "{} should be rejected",
                addr
            );
        }
    }

    #[tokio::test]
    async fn test_address_from_session() {
        let querier = Querier::new("127.0.0.1:27015", DEFAULT_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(querier.address().host, "127.0.0.1");
        assert_eq!(querier.address().port, 27015);
        assert_eq!(querier.app_id(), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut querier = Querier::new("127.0.0.1:27015", DEFAULT_TIMEOUT)
            .await
            .unwrap();

        querier.close();
        querier.close();
        assert!(querier.is_closed());
        assert!(matches!(
            querier.get_server_info().await,
            Err(SourceQueryError::SessionClosed)
        ));
        assert!(matches!(
            querier.get_player_info().await,
            Err(SourceQueryError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_server_info() {
        let (addr, server) = fake_server(vec![info_reply(440).into_bytes()]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        let info = querier.get_server_info().await.unwrap();

        assert_eq!(info.name, "Uncletopia | Chicago | 1");
        assert_eq!(info.server_type, ServerType::Dedicated);
        assert_eq!(&info.address, querier.address());
        assert_eq!(server.await.unwrap(), vec![info_request()]);
    }

    #[tokio::test]
    async fn test_server_info_rejects_challenge() {
        let (addr, _server) = fake_server(vec![challenge_reply()]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        assert!(matches!(
            querier.get_server_info().await,
            Err(SourceQueryError::MalformedPacket(_))
        ));
    }

    #[tokio::test]
    async fn test_challenge() {
        let (addr, server) = fake_server(vec![challenge_reply()]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        assert_eq!(
            querier.get_challenge().await.unwrap(),
            ChallengeResponse::Token(TOKEN)
        );
        assert_eq!(server.await.unwrap(), vec![challenge_request()]);
    }

    #[tokio::test]
    async fn test_player_info_with_challenge() {
        let (addr, server) = fake_server(vec![challenge_reply(), player_reply(false)]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        let info = querier.get_player_info().await.unwrap();

        assert_eq!(info.count, 2);
        assert_eq!(info.players.len(), 2);
        assert_eq!(info.players[0].name, "scout");
        assert_eq!(info.players[0].duration, 1.5);
        assert_eq!(
            server.await.unwrap(),
            vec![challenge_request(), player_request(&TOKEN)]
        );
    }

    #[tokio::test]
    async fn test_player_info_without_challenge() {
        let (addr, server) = fake_server(vec![player_reply(false)]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        let info = querier.get_player_info().await.unwrap();

        assert_eq!(info.players.len(), 2);
        // the server answered the challenge request outright
        assert_eq!(server.await.unwrap(), vec![challenge_request()]);
    }

    #[tokio::test]
    async fn test_player_info_the_ship() {
        let (addr, _server) = fake_server(vec![challenge_reply(), player_reply(true)]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT)
            .await
            .unwrap()
            .with_app_id(THE_SHIP_APP_ID);

        let info = querier.get_player_info().await.unwrap();

        assert_eq!(info.players[0].ship.as_ref().map(|s| s.money), Some(1500));
    }

    #[tokio::test]
    async fn test_player_info_split_after_challenge() {
        let split = vec![0xFE, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00];
        let (addr, _server) = fake_server(vec![challenge_reply(), split]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        assert!(matches!(
            querier.get_player_info().await,
            Err(SourceQueryError::MultiPacketUnsupported)
        ));
    }

    #[tokio::test]
    async fn test_player_info_split_instead_of_challenge() {
        let split = vec![0xFE, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00];
        let (addr, server) = fake_server(vec![split]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        assert!(matches!(
            querier.get_player_info().await,
            Err(SourceQueryError::MultiPacketUnsupported)
        ));
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_player_info_truncated() {
        let mut reply = player_reply(false);
        reply.truncate(reply.len() - 6);
        let (addr, _server) = fake_server(vec![challenge_reply(), reply]).await;
        let querier = Querier::new(&addr, DEFAULT_TIMEOUT).await.unwrap();

        assert!(matches!(
            querier.get_player_info().await,
            Err(SourceQueryError::UnexpectedEof { .. })
        ));
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        // bound but silent
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap().to_string();
        let querier = Querier::new(&addr, Duration::from_millis(50))
            .await
            .unwrap();

        assert!(matches!(
            querier.get_server_info().await,
            Err(SourceQueryError::Timeout(_))
        ));
    }
}
