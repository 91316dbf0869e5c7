use std::fmt;

use serde::Serialize;

use crate::error::SourceQueryError;
use crate::packet::{PacketHeader, PacketType};
use crate::parse::PacketReader;

/// Application ID of The Ship, which carries extra fields in both replies.
pub const THE_SHIP_APP_ID: u16 = 2400;

const EDF_PORT: u8 = 0x80;
const EDF_STEAM_ID: u8 = 0x10;
const EDF_SOURCE_TV: u8 = 0x40;
const EDF_KEYWORDS: u8 = 0x20;
const EDF_GAME_ID: u8 = 0x01;

/// The queried server, as given to [crate::query::Querier::new].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServerType {
    Dedicated,
    NonDedicated,
    SourceTV,
    Unknown,
}

impl ServerType {
    /// - `d`: Dedicated
    /// - `l`: Listen (non-dedicated)
    /// - `p`: SourceTV relay (proxy)
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'd' => ServerType::Dedicated,
            b'l' => ServerType::NonDedicated,
            b'p' => ServerType::SourceTV,
            _ => ServerType::Unknown,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServerType::Dedicated => "Dedicated",
            ServerType::NonDedicated => "Non-Dedicated",
            ServerType::SourceTV => "SourceTV",
            ServerType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Server environment:
/// - `l`: Linux
/// - `w`: Windows
pub fn platform_from_byte(byte: u8) -> &'static str {
    match byte {
        b'l' => "Linux",
        b'w' => "Windows",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTvInfo {
    /// Spectator port number for SourceTV.
    pub port: u16,
    /// Name of the spectator server for SourceTV.
    pub name: String,
}

/// The Ship game settings, only sent by servers with app ID 2400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipInfo {
    pub mode: u8,
    pub witnesses: u8,
    pub duration: u8,
}

/// Server information as obtained by [crate::query::Querier::get_server_info].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerInfo {
    /// A2S_INFO protocol version
    pub protocol: u8,
    /// Server name
    pub name: String,
    /// Current map
    pub map: String,
    /// Location of server files
    pub folder: String,
    /// Full name of game
    pub game: String,
    /// Steam application ID of game
    pub app_id: u16,
    /// Current players
    pub players: u8,
    /// Max players; not checked against `players`
    pub max_players: u8,
    /// Current bots
    pub bots: u8,
    pub server_type: ServerType,
    /// Linux, Windows or Unknown
    pub platform: &'static str,
    /// Is the server password protected?
    pub locked: bool,
    /// Is the server VAC enabled?
    pub vac: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship: Option<ShipInfo>,
    /// Version of the game installed on the server
    pub version: String,
    /// Game port, when it differs from the query port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tv: Option<SourceTvInfo>,
    /// Tags describing the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// 64-bit game ID, the low 24 bits of which are the app ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<u64>,
    /// Where the reply came from; never taken from the wire
    pub address: Address,
}

impl ServerInfo {
    /// Parse an A2S_INFO reply datagram, header included.
    pub fn parse(data: &[u8], address: Address) -> Result<ServerInfo, SourceQueryError> {
        let mut reader = PacketReader::new(data);

        let header: PacketHeader = reader.read_i32()?.try_into()?;
        if header == PacketHeader::Split {
            return Err(SourceQueryError::MultiPacketUnsupported);
        }
        PacketType::InfoResponse.expect(&mut reader)?;

        let protocol = reader.read_u8()?;
        let name = reader.read_string()?;
        let map = reader.read_string()?;
        let folder = reader.read_string()?;
        let game = reader.read_string()?;
        let app_id = reader.read_u16()?;
        let players = reader.read_u8()?;
        let max_players = reader.read_u8()?;
        let bots = reader.read_u8()?;
        let server_type = ServerType::from_byte(reader.read_u8()?);
        let platform = platform_from_byte(reader.read_u8()?);
        let locked = reader.read_u8()? == 0x01;
        let vac = reader.read_u8()? == 0x01;

        let ship = if app_id == THE_SHIP_APP_ID {
            Some(ShipInfo {
                mode: reader.read_u8()?,
                witnesses: reader.read_u8()?,
                duration: reader.read_u8()?,
            })
        } else {
            None
        };

        let version = reader.read_string()?;

        let mut info = ServerInfo {
            protocol,
            name,
            map,
            folder,
            game,
            app_id,
            players,
            max_players,
            bots,
            server_type,
            platform,
            locked,
            vac,
            ship,
            version,
            port: None,
            steam_id: None,
            source_tv: None,
            keywords: None,
            game_id: None,
            address,
        };

        // older servers stop after the version string
        if reader.remaining() == 0 {
            return Ok(info);
        }

        let edf = reader.read_u8()?;
        if edf & EDF_PORT != 0 {
            info.port = Some(reader.read_u16()?);
        }
        if edf & EDF_STEAM_ID != 0 {
            info.steam_id = Some(reader.read_u64()?);
        }
        if edf & EDF_SOURCE_TV != 0 {
            info.source_tv = Some(SourceTvInfo {
                port: reader.read_u16()?,
                name: reader.read_string()?,
            });
        }
        if edf & EDF_KEYWORDS != 0 {
            info.keywords = Some(reader.read_string()?);
        }
        if edf & EDF_GAME_ID != 0 {
            info.game_id = Some(reader.read_u64()?);
        }

        Ok(info)
    }
}
