use crate::error;

use std::net::Ipv4Addr;

/// Every announce starts with this tag, delimiter included.
pub const PREFIX: &str = "GRIDBEACON|";

pub const DELIMITER: char = '|';

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PlayState {
    Playing,
    #[default]
    Paused,
}

impl PlayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    pub fn from_wire(word: &str) -> Option<Self> {
        match word {
            "playing" => Some(Self::Playing),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }
}

/// `GRIDBEACON|<name>|<ipv4>|<playing|paused>|<label>`
///
/// Fields are not escaped. The name must not contain `|`; the label may,
/// since everything after the fourth delimiter belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceMessage {
    pub display_name: String,
    pub address: Ipv4Addr,
    pub play_state: PlayState,
    pub label: String,
}

impl AnnounceMessage {
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{PREFIX}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.display_name,
            self.address,
            self.play_state.as_str(),
            self.label
        )
        .into_bytes()
    }

    pub fn parse(data: &[u8]) -> error::Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| error::Error::MalformedAnnounce("not UTF-8"))?;
        let body = text
            .strip_prefix(PREFIX)
            .ok_or(error::Error::MalformedAnnounce("missing prefix"))?;

        let mut fields = body.splitn(4, DELIMITER);
        let (Some(name), Some(address), Some(status), Some(label)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(error::Error::MalformedAnnounce("missing delimiter"));
        };

        if name.is_empty() {
            return Err(error::Error::MalformedAnnounce("empty name"));
        }
        let address = address
            .parse()
            .map_err(|_| error::Error::MalformedAnnounce("unparsable address"))?;
        let play_state = PlayState::from_wire(status)
            .ok_or(error::Error::MalformedAnnounce("unknown play state"))?;

        Ok(Self {
            display_name: String::from(name),
            address,
            play_state,
            label: String::from(label),
        })
    }
}
