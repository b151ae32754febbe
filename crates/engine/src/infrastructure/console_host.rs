//! Line-oriented stand-in for a game-server host.
//!
//! The binary reads commands from stdin, seats players in a slot registry
//! and forwards slot events to the lifecycle dispatch. The registry is what
//! [`HostRuntime::resolve`] answers from.
//!
//! Commands:
//! - `connect <slot> <user_id> [name] [bot]`
//! - `disconnect <slot>`
//! - `playtime <slot>`
//! - `stats <user_id>`
//! - `quit`

use dashmap::DashMap;
use playtime_domain::{DomainError, PlayerSlot, UserId};

use crate::infrastructure::ports::{HostRuntime, PlayerInfo};

/// Slot registry backing [`HostRuntime`].
#[derive(Default)]
pub struct ConsoleHost {
    seats: DashMap<PlayerSlot, PlayerInfo>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `player` into their slot, replacing any previous occupant.
    pub fn seat(&self, player: PlayerInfo) -> Option<PlayerInfo> {
        self.seats.insert(player.slot, player)
    }

    /// Empty `slot`.
    pub fn vacate(&self, slot: PlayerSlot) -> Option<PlayerInfo> {
        self.seats.remove(&slot).map(|(_, player)| player)
    }

    pub fn occupied(&self) -> usize {
        self.seats.len()
    }
}

impl HostRuntime for ConsoleHost {
    fn resolve(&self, slot: PlayerSlot) -> Option<PlayerInfo> {
        self.seats.get(&slot).map(|player| player.clone())
    }
}

/// Errors from parsing a console line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect(PlayerInfo),
    Disconnect(PlayerSlot),
    Playtime(PlayerSlot),
    Stats(UserId),
    Quit,
}

const CONNECT_USAGE: &str = "connect <slot> <user_id> [name] [bot]";
const DISCONNECT_USAGE: &str = "disconnect <slot>";
const PLAYTIME_USAGE: &str = "playtime <slot>";
const STATS_USAGE: &str = "stats <user_id>";

impl ConsoleCommand {
    /// Parse a line. Blank lines and `#` comments yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (verb.as_str(), args.as_slice()) {
            ("connect", [slot, user_id, rest @ ..]) if rest.len() <= 2 => {
                let slot: PlayerSlot = slot.parse()?;
                let mut name = None;
                let mut is_bot = false;
                for word in rest {
                    if word.eq_ignore_ascii_case("bot") {
                        is_bot = true;
                    } else if name.is_none() {
                        name = Some((*word).to_string());
                    } else {
                        return Err(CommandError::Usage(CONNECT_USAGE));
                    }
                }
                Self::Connect(PlayerInfo {
                    slot,
                    user_id: user_id.parse()?,
                    name: name.unwrap_or_else(|| format!("player{slot}")),
                    is_bot,
                })
            }
            ("connect", _) => return Err(CommandError::Usage(CONNECT_USAGE)),
            ("disconnect", [slot]) => Self::Disconnect(slot.parse()?),
            ("disconnect", _) => return Err(CommandError::Usage(DISCONNECT_USAGE)),
            ("playtime", [slot]) => Self::Playtime(slot.parse()?),
            ("playtime", _) => return Err(CommandError::Usage(PLAYTIME_USAGE)),
            ("stats", [user_id]) => Self::Stats(user_id.parse()?),
            ("stats", _) => return Err(CommandError::Usage(STATS_USAGE)),
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(CommandError::Unknown(verb)),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ConsoleCommand {
        ConsoleCommand::parse(line)
            .expect("valid command")
            .expect("not blank")
    }

    #[test]
    fn parses_connect_with_defaults() {
        assert_eq!(
            parse("connect 3 76561198000000000"),
            ConsoleCommand::Connect(PlayerInfo {
                slot: PlayerSlot::new(3),
                user_id: UserId::new(76_561_198_000_000_000),
                name: "player3".to_string(),
                is_bot: false,
            })
        );
    }

    #[test]
    fn parses_connect_with_name_and_bot_flag() {
        let ConsoleCommand::Connect(player) = parse("CONNECT 4 90 Trainer bot") else {
            panic!("expected connect");
        };
        assert_eq!(player.name, "Trainer");
        assert!(player.is_bot);
    }

    #[test]
    fn parses_remaining_verbs() {
        assert_eq!(
            parse("disconnect 3"),
            ConsoleCommand::Disconnect(PlayerSlot::new(3))
        );
        assert_eq!(
            parse("  playtime 3 "),
            ConsoleCommand::Playtime(PlayerSlot::new(3))
        );
        assert_eq!(parse("stats 42"), ConsoleCommand::Stats(UserId::new(42)));
        assert_eq!(parse("quit"), ConsoleCommand::Quit);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(ConsoleCommand::parse("   "), Ok(None));
        assert_eq!(ConsoleCommand::parse("# warmup"), Ok(None));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(
            ConsoleCommand::parse("disconnect"),
            Err(CommandError::Usage(DISCONNECT_USAGE))
        );
        assert_eq!(
            ConsoleCommand::parse("connect 1 2 a b bot"),
            Err(CommandError::Usage(CONNECT_USAGE))
        );
        assert_eq!(
            ConsoleCommand::parse("kick 3"),
            Err(CommandError::Unknown("kick".to_string()))
        );
        assert!(matches!(
            ConsoleCommand::parse("stats -1"),
            Err(CommandError::Invalid(_))
        ));
    }

    #[test]
    fn registry_answers_resolve() {
        let host = ConsoleHost::new();
        let slot = PlayerSlot::new(1);
        assert_eq!(host.resolve(slot), None);

        let player = PlayerInfo {
            slot,
            user_id: UserId::new(7),
            name: "p".to_string(),
            is_bot: false,
        };
        host.seat(player.clone());
        assert_eq!(host.resolve(slot), Some(player.clone()));
        assert_eq!(host.occupied(), 1);

        assert_eq!(host.vacate(slot), Some(player));
        assert_eq!(host.resolve(slot), None);
    }
}
