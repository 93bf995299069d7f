//! Line classification. A fixed, ordered pattern table is matched against
//! each raw server line and the first hit is turned into a [`LogEvent`].
//! Routing holds no state; the controller applies the event.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::match_state::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RoundStart,
    Kill,
    ChatIdentity,
    Connect,
    Disconnect,
    Accolade,
    MatchStatus,
    GameOver,
    MapChange,
    ChatCommand,
    TeamJoin,
    TeamSwitch,
    PlayerTeam,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub name: String,
    pub steam_id: String,
    pub team: Team,
}

impl PlayerRef {
    pub fn is_bot(&self) -> bool {
        self.steam_id == "BOT"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    RoundStart,
    Kill {
        killer: PlayerRef,
        victim: PlayerRef,
        weapon: String,
        headshot: bool,
        mentions_bot: bool,
    },
    ChatIdentity {
        name: String,
        account_id: String,
    },
    Connect {
        name: String,
        steam_id: String,
    },
    Disconnect {
        player: PlayerRef,
    },
    Accolade {
        kind: String,
        player: String,
        value: f64,
    },
    MatchStatus {
        rounds_played: u32,
    },
    GameOver {
        ct_score: u32,
        t_score: u32,
    },
    MapChange {
        map: String,
    },
    ChatCommand {
        player: PlayerRef,
        command: String,
        argument: String,
    },
    TeamJoin {
        name: String,
        steam_id: String,
        team: Team,
    },
    PlayerTeam {
        player: PlayerRef,
    },
}

fn pattern(expression: &str) -> Regex {
    match Regex::new(expression) {
        Ok(regex) => regex,
        Err(error) => panic!("invalid built-in log pattern {expression:?}: {error}"),
    }
}

lazy_static! {
    /// Priority order: structural events first, the generic player block last,
    /// because a kill or chat line also contains a bare player block.
    static ref EVENT_PATTERNS: Vec<(EventKind, Regex)> = vec![
        (EventKind::RoundStart, pattern(r"(?i)Round_Start|Starting Freeze period")),
        (
            EventKind::Kill,
            pattern(concat!(
                r#"(?i)"(?P<killer>[^"<]+)<\d+><(?P<killer_steam_id>[^>]+)><(?P<killer_team>CT|TERRORIST)>".*?"#,
                r#"killed.*?"(?P<victim>[^"<]+)<\d+><(?P<victim_steam_id>[^>]+)><(?P<victim_team>CT|TERRORIST)>".*?"#,
                r#"with "(?P<weapon>[^"]+)""#,
            )),
        ),
        (
            EventKind::ChatIdentity,
            pattern(r#"^"(?P<name>.+?)<\d+><(?P<steam_id>\[U:1:(?P<account_id>\d+)\])><(?P<team>\w+)>" say "(?P<text>.+)""#),
        ),
        (
            EventKind::Connect,
            pattern(r#""(?P<name>[^"<]+)<\d+><(?P<steam_id>\[U:1:\d+\])><[^>]*>" connected"#),
        ),
        (
            EventKind::Disconnect,
            pattern(r#""(?P<name>[^"<]+)<\d+><(?P<steam_id>[^>]+)><(?P<team>CT|TERRORIST)>" disconnected"#),
        ),
        (
            EventKind::Accolade,
            pattern(r"(?i)ACCOLADE, FINAL: \{(?P<kind>[^}]+)\},\s+(?P<player>[^<]+)<\d+>,\s+VALUE: (?P<value>[\d.]+)"),
        ),
        (
            EventKind::MatchStatus,
            pattern(r#"(?i)MatchStatus: Score: \d+:\d+ on map ".*?" RoundsPlayed: (?P<rounds>\d+)"#),
        ),
        (
            EventKind::GameOver,
            pattern(r"(?i)Game Over: .*?score\s+(?P<ct>\d+):(?P<t>\d+)"),
        ),
        (EventKind::MapChange, pattern(r#"Loading map "(?P<map>[^"]+)""#)),
        (
            EventKind::ChatCommand,
            pattern(concat!(
                r#"L \d+/\d+/\d+ - \d+:\d+:\d+: "(?P<name>[^<]+)<\d+><(?P<steam_id>\[U:1:\d+\])><(?P<team>CT|TERRORIST)>" "#,
                r#"say "!?(?P<command>\w+)(?:\s+(?P<argument>.*))?""#,
            )),
        ),
        (
            EventKind::TeamJoin,
            pattern(r#""(?P<name>.+?)<\d+><(?P<steam_id>[^>]+)><[^>]*>" joined team "(?P<team>CT|TERRORIST)""#),
        ),
        (
            EventKind::TeamSwitch,
            pattern(r#""(?P<name>.+?)<\d+><(?P<steam_id>[^>]+)>" switched from team <[^>]*> to <(?P<team>CT|TERRORIST)>"#),
        ),
        (
            EventKind::PlayerTeam,
            pattern(r#""(?P<name>[^<]+)<\d+><(?P<steam_id>[^>]+)><(?P<team>CT|TERRORIST)>""#),
        ),
    ];

    /// One player row of the `status` console reply.
    static ref STATUS_ROW: Regex = pattern(r#"^\s*\d+\s+"(?P<name>.+?)"\s+\[(?P<steam_id>U:1:\d+)\]"#);
}

/// First pattern in priority order that matches the line.
pub fn classify(line: &str) -> Option<(EventKind, Captures<'_>)> {
    EVENT_PATTERNS
        .iter()
        .find_map(|(kind, regex)| regex.captures(line).map(|captures| (*kind, captures)))
}

/// Classifies a line and extracts its fields. Returns `None` for lines no
/// pattern recognises, and for a matched line whose numbers do not parse.
pub fn route(line: &str) -> Option<LogEvent> {
    let (kind, captures) = classify(line)?;
    let event = build_event(kind, &captures, line);
    if event.is_none() {
        tracing::debug!(?kind, line, "Matched line carried unusable fields");
    }
    event
}

fn text(captures: &Captures<'_>, group: &str) -> String {
    captures
        .name(group)
        .map(|found| found.as_str().to_string())
        .unwrap_or_default()
}

fn number<T: std::str::FromStr>(captures: &Captures<'_>, group: &str) -> Option<T> {
    captures.name(group)?.as_str().parse().ok()
}

fn player(captures: &Captures<'_>, name: &str, steam_id: &str, team: &str) -> PlayerRef {
    PlayerRef {
        name: text(captures, name),
        steam_id: text(captures, steam_id),
        team: Team::from_label(&text(captures, team)),
    }
}

fn build_event(kind: EventKind, captures: &Captures<'_>, line: &str) -> Option<LogEvent> {
    let event = match kind {
        EventKind::RoundStart => LogEvent::RoundStart,
        EventKind::Kill => LogEvent::Kill {
            killer: player(captures, "killer", "killer_steam_id", "killer_team"),
            victim: player(captures, "victim", "victim_steam_id", "victim_team"),
            weapon: text(captures, "weapon"),
            headshot: line.to_ascii_lowercase().contains("headshot"),
            mentions_bot: line.contains("BOT"),
        },
        EventKind::ChatIdentity => LogEvent::ChatIdentity {
            name: text(captures, "name").trim().to_string(),
            account_id: text(captures, "account_id"),
        },
        EventKind::Connect => LogEvent::Connect {
            name: text(captures, "name"),
            steam_id: text(captures, "steam_id"),
        },
        EventKind::Disconnect => LogEvent::Disconnect {
            player: player(captures, "name", "steam_id", "team"),
        },
        EventKind::Accolade => LogEvent::Accolade {
            kind: text(captures, "kind"),
            player: text(captures, "player").trim().to_string(),
            value: number(captures, "value")?,
        },
        EventKind::MatchStatus => LogEvent::MatchStatus {
            rounds_played: number(captures, "rounds")?,
        },
        EventKind::GameOver => LogEvent::GameOver {
            ct_score: number(captures, "ct")?,
            t_score: number(captures, "t")?,
        },
        EventKind::MapChange => LogEvent::MapChange {
            map: text(captures, "map"),
        },
        EventKind::ChatCommand => LogEvent::ChatCommand {
            player: player(captures, "name", "steam_id", "team"),
            command: text(captures, "command").to_ascii_lowercase(),
            argument: text(captures, "argument").trim().to_string(),
        },
        EventKind::TeamJoin | EventKind::TeamSwitch => LogEvent::TeamJoin {
            name: text(captures, "name"),
            steam_id: text(captures, "steam_id"),
            team: Team::from_label(&text(captures, "team")),
        },
        EventKind::PlayerTeam => LogEvent::PlayerTeam {
            player: player(captures, "name", "steam_id", "team"),
        },
    };
    Some(event)
}

/// `(name, steam_id)` pairs from a `status` reply, steam ids in `[U:1:N]` form.
pub fn parse_status_rows(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|row| {
            let captures = STATUS_ROW.captures(row)?;
            Some((
                text(&captures, "name"),
                format!("[{}]", text(&captures, "steam_id")),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{classify, parse_status_rows, route, EventKind, LogEvent, PlayerRef};
    use crate::match_state::Team;

    fn kind_of(line: &str) -> Option<EventKind> {
        classify(line).map(|(kind, _)| kind)
    }

    #[test]
    fn routes_kill_with_both_sides_and_headshot() {
        let line = r#"L 01/03/2026 - 18:20:11: "alice<2><[U:1:1001]><CT>" [-1200 300 0] killed "bob<3><[U:1:1002]><TERRORIST>" [-1000 250 0] with "ak47" (headshot)"#;

        let event = route(line).expect("Expected kill event");
        assert_eq!(
            event,
            LogEvent::Kill {
                killer: PlayerRef {
                    name: "alice".to_string(),
                    steam_id: "[U:1:1001]".to_string(),
                    team: Team::Ct,
                },
                victim: PlayerRef {
                    name: "bob".to_string(),
                    steam_id: "[U:1:1002]".to_string(),
                    team: Team::Terrorist,
                },
                weapon: "ak47".to_string(),
                headshot: true,
                mentions_bot: false,
            }
        );
    }

    #[test]
    fn bot_kill_keeps_bot_label() {
        let line = r#"L 01/03/2026 - 18:20:11: "Moe<4><BOT><TERRORIST>" [0 0 0] killed "alice<2><[U:1:1001]><CT>" [0 0 0] with "glock""#;

        let Some(LogEvent::Kill { killer, headshot, mentions_bot, .. }) = route(line) else {
            panic!("Expected kill event");
        };
        assert!(killer.is_bot());
        assert!(!headshot);
        assert!(mentions_bot);
    }

    #[test]
    fn round_start_wins_over_everything_else() {
        assert_eq!(
            kind_of(r#"L 01/03/2026 - 18:20:00: World triggered "Round_Start""#),
            Some(EventKind::RoundStart)
        );
        assert_eq!(
            kind_of("L 01/03/2026 - 18:20:00: Starting Freeze period"),
            Some(EventKind::RoundStart)
        );
    }

    #[test]
    fn prefixed_chat_is_a_command_and_bare_chat_is_identity() {
        let prefixed = r#"L 01/03/2026 - 18:21:40: "alice<2><[U:1:1001]><CT>" say "!elo bob""#;
        let Some(LogEvent::ChatCommand { player, command, argument }) = route(prefixed) else {
            panic!("Expected chat command");
        };
        assert_eq!(player.team, Team::Ct);
        assert_eq!(player.steam_id, "[U:1:1001]");
        assert_eq!(command, "elo");
        assert_eq!(argument, "bob");

        let bare = r#""carol<5><[U:1:77]><TERRORIST>" say "hello there""#;
        assert_eq!(
            route(bare),
            Some(LogEvent::ChatIdentity {
                name: "carol".to_string(),
                account_id: "77".to_string(),
            })
        );
    }

    #[test]
    fn command_without_argument_has_empty_remainder() {
        let line = r#"L 01/03/2026 - 18:21:40: "alice<2><[U:1:1001]><TERRORIST>" say "!LO3""#;
        let Some(LogEvent::ChatCommand { command, argument, .. }) = route(line) else {
            panic!("Expected chat command");
        };
        assert_eq!(command, "lo3");
        assert!(argument.is_empty());
    }

    #[test]
    fn disconnect_and_team_join_beat_the_generic_player_block() {
        let disconnect = r#"L 01/03/2026 - 18:30:00: "bob<3><[U:1:1002]><TERRORIST>" disconnected (reason "Disconnect")"#;
        assert_eq!(kind_of(disconnect), Some(EventKind::Disconnect));

        let joined = r#"L 01/03/2026 - 18:10:00: "dave<6><[U:1:1004]><Unassigned>" joined team "CT""#;
        assert_eq!(
            route(joined),
            Some(LogEvent::TeamJoin {
                name: "dave".to_string(),
                steam_id: "[U:1:1004]".to_string(),
                team: Team::Ct,
            })
        );

        let switched = r#"L 01/03/2026 - 18:10:00: "erin<7><[U:1:1005]>" switched from team <Unassigned> to <TERRORIST>"#;
        assert_eq!(kind_of(switched), Some(EventKind::TeamSwitch));
    }

    #[test]
    fn generic_player_block_records_team() {
        let line = r#"L 01/03/2026 - 18:22:00: "alice<2><[U:1:1001]><CT>" purchased "m4a1""#;
        assert_eq!(
            route(line),
            Some(LogEvent::PlayerTeam {
                player: PlayerRef {
                    name: "alice".to_string(),
                    steam_id: "[U:1:1001]".to_string(),
                    team: Team::Ct,
                },
            })
        );
    }

    #[test]
    fn parses_scores_and_match_lifecycle_lines() {
        assert_eq!(
            route(r#"L 01/03/2026 - 19:00:00: Game Over: competitive 1 de_inferno score 13:9 after 41 min"#),
            Some(LogEvent::GameOver { ct_score: 13, t_score: 9 })
        );
        assert_eq!(
            route(r#"L 01/03/2026 - 18:40:00: MatchStatus: Score: 5:3 on map "de_inferno" RoundsPlayed: 8"#),
            Some(LogEvent::MatchStatus { rounds_played: 8 })
        );
        assert_eq!(
            route(r#"L 01/03/2026 - 18:00:00: Loading map "de_mirage""#),
            Some(LogEvent::MapChange { map: "de_mirage".to_string() })
        );
    }

    #[test]
    fn parses_accolade_and_connect() {
        assert_eq!(
            route("L 01/03/2026 - 19:00:01: ACCOLADE, FINAL: {adr},\talice<2>,\tVALUE: 87.500000,\tPOS: 1"),
            Some(LogEvent::Accolade {
                kind: "adr".to_string(),
                player: "alice".to_string(),
                value: 87.5,
            })
        );
        assert_eq!(
            route(r#"L 01/03/2026 - 18:05:00: "bob<3><[U:1:1002]><>" connected, address """#),
            Some(LogEvent::Connect {
                name: "bob".to_string(),
                steam_id: "[U:1:1002]".to_string(),
            })
        );
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert_eq!(route("L 01/03/2026 - 18:00:00: server cvars start"), None);
        assert_eq!(route(""), None);
    }

    #[test]
    fn reads_status_rows() {
        let output = "# userid name uniqueid\n  2 \"alice\" [U:1:1001] 10:00 30 0 active\n# end\n  3 \"bob b\" [U:1:1002] 09:00 40 0 active\n";
        assert_eq!(
            parse_status_rows(output),
            vec![
                ("alice".to_string(), "[U:1:1001]".to_string()),
                ("bob b".to_string(), "[U:1:1002]".to_string()),
            ]
        );
    }
}
