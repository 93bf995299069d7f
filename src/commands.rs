//! Player-facing `!command` surface, dispatched from chat lines.

use rand::seq::SliceRandom;

use crate::balance::{elo_shuffle, predict_winrate, smart_shuffle_balanced, TeamSplit};
use crate::controller::{Controller, DeferredAction};
use crate::events::PlayerRef;
use crate::match_state::Team;
use crate::tactics::{get_tactic, normalize_map_name};

const HELP_LINES: &[&str] = &[
    "Commands: !coin !ct !t !rdy !lo3 !shuffle !map [name|random]",
    "Stats: !stats [name] !elo [name] !top [elo|all] !tactics",
    "Toggles: !commentary on|off !debug",
];
const ADMIN_HELP_LINES: &[&str] = &[
    "Admin: !cancel !reset !rcon <cmd>",
    "Admin: !eloshuffle !smartshuffle !balancecheck !simulate",
];
const ADMIN_ONLY: &str = "This command is admin only.";
const MIN_RANKED_MATCHES: u32 = 3;
const RANKING_SIZE: usize = 5;

/// Live-on-three timeline, milliseconds after the command.
const LO3_RESTARTS_MILLIS: [i64; 3] = [0, 1_000, 2_000];
const LO3_UNPAUSE_MILLIS: i64 = 3_000;
const LO3_STATUS_MILLIS: i64 = 4_500;

impl Controller {
    fn is_admin(&self, player: &PlayerRef) -> bool {
        player.steam_id == self.settings.admin_steamid
    }

    pub(crate) fn handle_command(&mut self, player: &PlayerRef, command: &str, argument: &str) {
        let admin_command = matches!(
            command,
            "rcon" | "reset" | "cancel" | "eloshuffle" | "smartshuffle" | "balancecheck" | "simulate"
        );
        if admin_command && !self.is_admin(player) {
            tracing::info!(player = %player.name, command, "Refused admin command");
            self.say(ADMIN_ONLY);
            return;
        }

        match command {
            "help" => self.command_help(player),
            "commentary" => self.command_commentary(argument),
            "debug" => self.command_debug(),
            "map" => self.command_map(argument),
            "coin" => self.command_coin(),
            "ct" | "t" => self.command_pick_side(player, command),
            "rdy" => self.command_ready(player),
            "lo3" => self.command_lo3(),
            "rcon" => self.command_rcon(argument),
            "reset" => self.command_reset(),
            "cancel" => self.command_cancel(),
            "shuffle" => self.command_shuffle(),
            "elo" => self.command_elo(player, argument),
            "eloshuffle" => self.command_balanced_shuffle(false),
            "smartshuffle" => self.command_balanced_shuffle(true),
            "top" if argument.eq_ignore_ascii_case("elo") => self.command_top_elo(),
            "top" => self.command_top(argument),
            "balancecheck" => self.command_balance_check(),
            "simulate" => self.command_simulate(),
            "stats" => self.command_stats(player, argument),
            "tactics" => self.command_tactics(player),
            _ => tracing::debug!(command, "Unknown chat command"),
        }
    }

    fn command_help(&mut self, player: &PlayerRef) {
        for line in HELP_LINES {
            self.say(line);
        }
        if self.is_admin(player) {
            for line in ADMIN_HELP_LINES {
                self.say(line);
            }
        }
    }

    fn command_commentary(&mut self, argument: &str) {
        match argument.to_ascii_lowercase().as_str() {
            "on" => {
                self.state.commentary_enabled = true;
                self.say("Commentary ON");
            }
            "off" => {
                self.state.commentary_enabled = false;
                self.say("Commentary OFF");
            }
            _ => self.say("Usage: !commentary on / !commentary off"),
        }
    }

    fn command_debug(&mut self) {
        self.state.debug_enabled = !self.state.debug_enabled;
        let status = if self.state.debug_enabled { "ON" } else { "OFF" };
        tracing::info!(status, "Debug mode changed");
        self.say(&format!("Debug mode: {status}"));
    }

    fn command_map(&mut self, argument: &str) {
        if argument.is_empty() {
            let maps = self.settings.available_maps.join(", ");
            self.say(&format!("Available maps: {maps}"));
            return;
        }

        let selected = argument
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let chosen = if selected == "random" {
            self.settings.available_maps.choose(&mut self.rng).cloned()
        } else {
            self.settings
                .available_maps
                .iter()
                .find(|map| map.eq_ignore_ascii_case(&selected))
                .cloned()
        };
        let Some(chosen) = chosen else {
            self.say(&format!("'{selected}' is not an available map"));
            return;
        };

        let map_name = normalize_map_name(&chosen);
        self.say(&format!("Changing map to {chosen}"));
        self.remote(&format!("changelevel {map_name}"));
        self.state.current_map = map_name;
    }

    fn command_coin(&mut self) {
        if self.state.coin_used {
            self.say("The coin has already been tossed.");
            return;
        }

        let winner = *[Team::Ct, Team::Terrorist]
            .choose(&mut self.rng)
            .unwrap_or(&Team::Ct);
        self.state.coin_used = true;
        self.state.coin_winner = Some(winner);
        self.state.side_select_active = true;
        self.say(&format!("Coin toss: {winner} wins the side pick"));
        self.say("Choose with !ct or !t");
    }

    fn command_pick_side(&mut self, player: &PlayerRef, command: &str) {
        if !self.state.side_select_active {
            self.say("There is no side pick right now.");
            return;
        }
        if self.state.coin_winner != Some(player.team) {
            self.say("Your team did not win the toss.");
            return;
        }

        self.say(&format!("{} picks {}", player.name, command.to_ascii_uppercase()));
        self.state.side_select_active = false;
    }

    fn command_ready(&mut self, player: &PlayerRef) {
        match player.team {
            Team::Ct => {
                self.state.ready_ct = true;
                self.say("CT ready");
            }
            Team::Terrorist => {
                self.state.ready_t = true;
                self.say("T ready");
            }
            _ => return,
        }

        if self.state.ready_ct && self.state.ready_t {
            self.say("Both teams ready. Type !lo3 to start.");
            self.state.match_finished = false;
            self.state.round_number = 0;
            self.refresh_identities();
        }
    }

    fn command_lo3(&mut self) {
        tracing::info!("Live on three");
        self.state.match_finished = false;
        self.state.live_started = true;
        self.say("Starting the match, live on three");
        self.remote("mp_warmup_end");
        self.state.player_teams = self.state.temp_player_teams.clone();
        self.say("Live on 3... get ready");

        for delay_millis in LO3_RESTARTS_MILLIS {
            self.schedule(
                delay_millis,
                DeferredAction::Remote("mp_restartgame 1".to_string()),
            );
        }
        self.schedule(
            LO3_UNPAUSE_MILLIS,
            DeferredAction::Say("Live on 3! GLHF!".to_string()),
        );
        self.schedule(
            LO3_UNPAUSE_MILLIS,
            DeferredAction::Remote("mp_unpause_match".to_string()),
        );
        self.schedule(LO3_STATUS_MILLIS, DeferredAction::RefreshIdentities);

        let now = self.now();
        self.run_due_actions(now);
    }

    fn command_rcon(&mut self, argument: &str) {
        if argument.is_empty() {
            self.say("Usage: !rcon <command>");
            return;
        }
        self.say(&format!("RCON: {argument}"));
        self.remote(argument);
    }

    fn command_reset(&mut self) {
        self.say("Resetting the match state");
        self.state.reset();
        self.deferred.clear();
        self.remote("mp_restartgame 1");
    }

    fn command_cancel(&mut self) {
        tracing::info!("Match start cancelled");
        self.say("Match start cancelled");
        self.deferred.clear();
        self.state.ready_ct = false;
        self.state.ready_t = false;
        self.state.live_started = false;
        self.state.match_finished = true;
        self.state.first_round_announced = false;
        self.state.round_number = 0;
        self.state.alive_ct.clear();
        self.state.alive_t.clear();
        self.state.player_teams = self.state.temp_player_teams.clone();
    }

    fn command_shuffle(&mut self) {
        self.say("Shuffling teams");
        self.remote("mp_scrambleteams 1");
        self.remote("mp_restartgame 1");
    }

    fn command_elo(&mut self, player: &PlayerRef, argument: &str) {
        let target = if argument.is_empty() {
            player.name.to_ascii_uppercase()
        } else {
            argument.to_ascii_uppercase()
        };
        let rating = self.records.elo.get(&target);
        self.say(&format!("{target} Elo: {rating}"));
    }

    fn command_balanced_shuffle(&mut self, exhaustive: bool) {
        let players = self
            .records
            .targets
            .all()
            .keys()
            .filter(|player| !self.records.is_bot(player))
            .cloned()
            .collect::<Vec<String>>();
        if players.len() < 2 {
            self.say("Not enough players to shuffle.");
            return;
        }

        let (split, label) = if exhaustive {
            (smart_shuffle_balanced(&players, &self.records.elo), "Smart")
        } else {
            (elo_shuffle(&players, &self.records.elo, &mut self.rng), "Elo")
        };
        tracing::info!(
            ct = ?split.side_a,
            t = ?split.side_b,
            rating_difference = split.rating_difference(&self.records.elo),
            "Balanced teams"
        );
        self.say(&format!("CT ({label}): {}", split.side_a.join(", ")));
        self.say(&format!("T ({label}): {}", split.side_b.join(", ")));
        self.assign_teams(&split);
    }

    fn assign_teams(&mut self, split: &TeamSplit) {
        let assignments = split
            .side_a
            .iter()
            .map(|player| (player, "ct"))
            .chain(split.side_b.iter().map(|player| (player, "t")))
            .filter_map(|(player, side)| {
                let steam_id = self.records.steam_id_for(player)?;
                Some(format!("mp_team_assign {steam_id} {side}"))
            })
            .collect::<Vec<String>>();
        for command in assignments {
            self.remote(&command);
        }
    }

    fn command_top_elo(&mut self) {
        let mut ranked = self
            .records
            .elo
            .all()
            .iter()
            .map(|(player, rating)| (player.clone(), *rating))
            .collect::<Vec<(String, i64)>>();
        if ranked.is_empty() {
            self.say("No Elo data yet.");
            return;
        }

        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        self.say("Elo ranking TOP5");
        for (position, (player, rating)) in ranked.iter().take(RANKING_SIZE).enumerate() {
            self.say(&format!("{}. {player} - Elo {rating}", position + 1));
        }
    }

    fn command_top(&mut self, argument: &str) {
        let mut ranked = self
            .records
            .stats
            .all()
            .iter()
            .filter(|(_, record)| record.matches_played() >= MIN_RANKED_MATCHES)
            .map(|(player, record)| (player.clone(), record.wins, record.losses, record.win_rate()))
            .collect::<Vec<(String, u32, u32, f64)>>();
        if ranked.is_empty() {
            self.say("The ranking needs at least 3 recorded matches per player.");
            return;
        }

        ranked.sort_by(|left, right| right.3.total_cmp(&left.3));
        let limit = if argument.eq_ignore_ascii_case("all") {
            ranked.len()
        } else {
            RANKING_SIZE
        };
        self.say(&format!("Win rate ranking TOP{limit}"));
        for (position, (player, wins, losses, rate)) in ranked.iter().take(limit).enumerate() {
            self.say(&format!(
                "{}. {player} - {wins}W {losses}L ({:.1}%)",
                position + 1,
                rate * 100.0
            ));
        }
    }

    fn team_rating_totals(&mut self) -> Option<(i64, i64)> {
        let ct_players = self.state.players_on(Team::Ct);
        let t_players = self.state.players_on(Team::Terrorist);
        if ct_players.is_empty() || t_players.is_empty() {
            self.say("Not enough team information.");
            return None;
        }
        Some((
            self.records.elo.team_total(&ct_players),
            self.records.elo.team_total(&t_players),
        ))
    }

    fn command_balance_check(&mut self) {
        let Some((ct_total, t_total)) = self.team_rating_totals() else {
            return;
        };
        self.say(&format!("CT Elo total: {ct_total}"));
        self.say(&format!("T Elo total: {t_total}"));
        self.say(&format!("Elo difference: {}", (ct_total - t_total).abs()));
    }

    fn command_simulate(&mut self) {
        let Some((ct_total, t_total)) = self.team_rating_totals() else {
            return;
        };
        let ct_winrate = predict_winrate(ct_total as f64, t_total as f64);
        self.say("Win prediction");
        self.say(&format!("CT: {:.1}%", ct_winrate * 100.0));
        self.say(&format!("T: {:.1}%", (1.0 - ct_winrate) * 100.0));
    }

    fn command_stats(&mut self, player: &PlayerRef, argument: &str) {
        let target = if argument.is_empty() {
            player.name.to_ascii_uppercase()
        } else {
            argument.to_ascii_uppercase()
        };
        let Some(record) = self.records.stats.get(&target) else {
            self.say(&format!("No record for {target}"));
            return;
        };

        let text = format!(
            "{target}: {}W {}L (win rate {:.1}%)",
            record.wins,
            record.losses,
            record.win_rate() * 100.0
        );
        self.say(&text);
    }

    fn command_tactics(&mut self, player: &PlayerRef) {
        let map_name = normalize_map_name(&self.state.current_map);
        let tip = get_tactic(player.team, &map_name, &mut self.rng);
        let side = if player.team == Team::Terrorist {
            "T"
        } else {
            player.team.label()
        };
        self.say(&format!("{side} ({map_name}): {tip}"));
    }
}
