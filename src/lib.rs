//! Pure Rust async implementation of the [Source Server Query Protocol](https://developer.valvesoftware.com/wiki/Server_queries)
//! (A2S_INFO and A2S_PLAYER).
//!
//! Multi-packet replies are reported as [SourceQueryError::MultiPacketUnsupported]
//! rather than reassembled.
pub mod error;
pub mod info;
pub mod packet;
pub mod parse;
pub mod player;
pub mod query;

pub use error::SourceQueryError;
pub use info::{Address, ServerInfo, ServerType, ShipInfo, SourceTvInfo, THE_SHIP_APP_ID};
pub use packet::ChallengeResponse;
pub use player::{Player, PlayerInfo, ShipPlayer};
pub use query::{Querier, DEFAULT_TIMEOUT};
