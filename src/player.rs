use serde::Serialize;

use crate::error::SourceQueryError;
use crate::info::THE_SHIP_APP_ID;
use crate::packet::{PacketHeader, PacketType};
use crate::parse::PacketReader;

/// Extra per-player fields sent by The Ship servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipPlayer {
    pub deaths: u32,
    pub money: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    /// Slot index
    pub id: u8,
    pub name: String,
    pub score: u32,
    /// Seconds connected
    pub duration: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship: Option<ShipPlayer>,
}

/// Player list as obtained by [crate::query::Querier::get_player_info].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub count: u8,
    pub players: Vec<Player>,
}

impl PlayerInfo {
    /// Parse an A2S_PLAYER reply datagram, header included.
    ///
    /// `app_id` decides whether each record carries The Ship fields. Exactly
    /// `count` records are read; a reply that ends early is an error.
    pub fn parse(data: &[u8], app_id: Option<u16>) -> Result<PlayerInfo, SourceQueryError> {
        let mut reader = PacketReader::new(data);

        let header: PacketHeader = reader.read_i32()?.try_into()?;
        if header != PacketHeader::Single {
            return Err(SourceQueryError::MalformedPacket(format!(
                "expected single packet header, got {:?}",
                header
            )));
        }
        PacketType::PlayerResponse.expect(&mut reader)?;

        let is_ship = app_id == Some(THE_SHIP_APP_ID);
        let count = reader.read_u8()?;
        let mut players = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let id = reader.read_u8()?;
            let name = reader.read_string()?;
            let score = reader.read_u32()?;
            let duration = reader.read_f32()?;
            let ship = if is_ship {
                Some(ShipPlayer {
                    deaths: reader.read_u32()?,
                    money: reader.read_u32()?,
                })
            } else {
                None
            };

            players.push(Player {
                id,
                name,
                score,
                duration,
                ship,
            });
        }

        Ok(PlayerInfo { count, players })
    }
}
