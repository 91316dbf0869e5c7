use crate::error::SourceQueryError;
use crate::parse::PacketReader;

/// According to the Valve wiki, Source query responses use 1400 bytes + IP/UDP headers.
pub const MAX_PACKET_SIZE: usize = 1400;

pub const INFO_PAYLOAD: &str = "Source Engine Query";

/// Appends protocol values to a growable buffer.
///
/// No validation happens here; building a nonsensical request is on the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PacketBuilder {
    buf: Vec<u8>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bytes(&mut self, raw: &[u8]) {
        self.buf.extend_from_slice(raw);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append `s` followed by a null terminator.
    pub fn write_cstring(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    /// `-1`: the whole reply fits in this datagram.
    Single,
    /// `-2`: the reply was split across several datagrams.
    Split,
}

impl TryFrom<i32> for PacketHeader {
    type Error = SourceQueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PacketHeader::Single),
            -2 => Ok(PacketHeader::Split),
            n => Err(SourceQueryError::MalformedPacket(format!(
                "unknown packet header {:#010x}",
                n
            ))),
        }
    }
}

impl PacketHeader {
    pub fn to_le_bytes(self) -> [u8; 4] {
        let value: i32 = match self {
            PacketHeader::Single => -1,
            PacketHeader::Split => -2,
        };
        value.to_le_bytes()
    }

    /// Decode the header at the start of `data`.
    pub fn peek(data: &[u8]) -> Result<Self, SourceQueryError> {
        PacketReader::new(data).read_i32()?.try_into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// A2S_INFO request -- https://developer.valvesoftware.com/wiki/Server_queries#A2S_INFO
    InfoRequest,
    /// A2S_PLAYER request, also used with a `-1` challenge to ask for one.
    PlayerRequest,
    /// S2C_CHALLENGE
    ///
    /// The server wants the request repeated with the 4 bytes that follow appended.
    Challenge,
    /// A2S_INFO response, parsed by [crate::info::ServerInfo::parse].
    InfoResponse,
    /// A2S_PLAYER response, parsed by [crate::player::PlayerInfo::parse].
    PlayerResponse,
}

impl TryFrom<u8> for PacketType {
    type Error = SourceQueryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x54 => Ok(PacketType::InfoRequest),
            0x55 => Ok(PacketType::PlayerRequest),
            0x41 => Ok(PacketType::Challenge),
            0x49 => Ok(PacketType::InfoResponse),
            0x44 => Ok(PacketType::PlayerResponse),
            n => Err(SourceQueryError::MalformedPacket(format!(
                "unknown packet type {:#04x}",
                n
            ))),
        }
    }
}

impl PacketType {
    pub fn to_byte(self) -> u8 {
        match self {
            PacketType::InfoRequest => 0x54,
            PacketType::PlayerRequest => 0x55,
            PacketType::Challenge => 0x41,
            PacketType::InfoResponse => 0x49,
            PacketType::PlayerResponse => 0x44,
        }
    }

    /// Read a type byte and insist it is `self`.
    pub fn expect(self, reader: &mut PacketReader) -> Result<(), SourceQueryError> {
        let found: PacketType = reader.read_u8()?.try_into()?;
        if found != self {
            return Err(SourceQueryError::MalformedPacket(format!(
                "expected {:?} reply, got {:?}",
                self, found
            )));
        }
        Ok(())
    }
}

/// `FF FF FF FF 54 "Source Engine Query\0"`
pub fn info_request() -> Vec<u8> {
    let mut builder = PacketBuilder::new();
    builder.write_bytes(&PacketHeader::Single.to_le_bytes());
    builder.write_u8(PacketType::InfoRequest.to_byte());
    builder.write_cstring(INFO_PAYLOAD);
    builder.into_bytes()
}

/// `FF FF FF FF 55 FF FF FF FF`
pub fn challenge_request() -> Vec<u8> {
    player_request(&[0xFF; 4])
}

/// `FF FF FF FF 55` followed by the challenge token.
pub fn player_request(challenge: &[u8; 4]) -> Vec<u8> {
    let mut builder = PacketBuilder::new();
    builder.write_bytes(&PacketHeader::Single.to_le_bytes());
    builder.write_u8(PacketType::PlayerRequest.to_byte());
    builder.write_bytes(challenge);
    builder.into_bytes()
}

/// Outcome of the challenge exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeResponse {
    /// The server wants the player request repeated with this token.
    Token([u8; 4]),
    /// The server skipped the handshake and answered outright; this is the
    /// whole datagram, header included.
    FullReply(Vec<u8>),
}

impl ChallengeResponse {
    pub fn parse(data: Vec<u8>) -> Result<Self, SourceQueryError> {
        let mut reader = PacketReader::new(&data);
        let header: PacketHeader = reader.read_i32()?.try_into()?;
        if header == PacketHeader::Split {
            return Ok(ChallengeResponse::FullReply(data));
        }

        let kind: PacketType = reader.read_u8()?.try_into()?;
        match kind {
            PacketType::Challenge => {
                let mut token = [0u8; 4];
                token.copy_from_slice(reader.read_bytes(4)?);
                Ok(ChallengeResponse::Token(token))
            }
            PacketType::PlayerResponse => Ok(ChallengeResponse::FullReply(data)),
            other => Err(SourceQueryError::MalformedPacket(format!(
                "unexpected {:?} in challenge reply",
                other
            ))),
        }
    }
}
