//! The per-line driver. Owns the match state and every collaborator, applies
//! routed log events, runs the time-based checks on each idle poll and
//! settles the match when the server reports game over.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::commentary::{Clock, CommentaryPolicy, Cue, SystemClock};
use crate::elo::is_bot_name;
use crate::events::{self, LogEvent, PlayerRef};
use crate::json_block::{AssemblerStep, JsonAssembler};
use crate::match_flow::{self, Announcement, FlowOptions};
use crate::match_state::{leader_of, Accolade, MatchRules, MatchState, Team};
use crate::phrases::{Line, Phrasebook, SilenceBalance, TemplatePhrasebook};
use crate::rcon::{MessageSink, RemoteControl};
use crate::records::PlayerRecords;
use crate::settings::RuntimeSettings;
use crate::tactics::normalize_map_name;

const EARLY_DEATH_WINDOW_SECONDS: i64 = 15;
const HEADSHOT_STREAK_CUE: u32 = 3;
const ACE_KILLS: u32 = 5;
const MULTI_KILL_ACCOLADES: [&str; 3] = ["3k", "4k", "5k"];
const LIVENESS_PROBE_COMMAND: &str = "echo controller_ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    /// The match result was recorded; the process is expected to exit.
    MatchFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    Remote(String),
    Say(String),
    RefreshIdentities,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledAction {
    pub(crate) due_at: DateTime<Utc>,
    pub(crate) action: DeferredAction,
}

pub struct Controller {
    pub(crate) settings: RuntimeSettings,
    pub(crate) state: MatchState,
    pub(crate) records: PlayerRecords,
    pub(crate) deferred: Vec<ScheduledAction>,
    pub(crate) rng: StdRng,
    assembler: JsonAssembler,
    policy: CommentaryPolicy,
    flow_options: FlowOptions,
    remote: Box<dyn RemoteControl>,
    sink: Box<dyn MessageSink>,
    clock: Box<dyn Clock>,
    phrasebook: Box<dyn Phrasebook>,
}

impl Controller {
    pub fn new(
        settings: RuntimeSettings,
        records: PlayerRecords,
        remote: Box<dyn RemoteControl>,
        sink: Box<dyn MessageSink>,
    ) -> Self {
        let state = MatchState::new(MatchRules::new(settings.max_rounds));
        let policy = CommentaryPolicy::new(settings.commentary_cooldown_seconds);
        let flow_options = FlowOptions::from(&settings);

        Self {
            settings,
            state,
            records,
            deferred: Vec::new(),
            rng: StdRng::from_entropy(),
            assembler: JsonAssembler::new(),
            policy,
            flow_options,
            remote,
            sink,
            clock: Box::new(SystemClock),
            phrasebook: Box::new(TemplatePhrasebook::new()),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_phrasebook(mut self, phrasebook: Box<dyn Phrasebook>) -> Self {
        self.phrasebook = phrasebook;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Processes one trimmed log line.
    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        match self.assembler.feed(line) {
            AssemblerStep::NotConsumed => {}
            AssemblerStep::Consumed => return LineOutcome::Continue,
            AssemblerStep::Payload(payload) => {
                self.handle_json_payload(&payload);
                return LineOutcome::Continue;
            }
            AssemblerStep::ParseFailed { probe } => {
                if probe {
                    self.probe_remote();
                }
                return LineOutcome::Continue;
            }
        }

        let Some(event) = events::route(line) else {
            if self.state.debug_enabled {
                tracing::debug!(line, "Unhandled line");
            } else {
                tracing::trace!(line, "Unhandled line");
            }
            return LineOutcome::Continue;
        };

        self.apply_event(event)
    }

    /// Time-based checks for an idle poll, then any deferred actions that
    /// have come due.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        self.check_silence(now);
        self.check_idle(now);
        self.run_due_actions(now);
    }

    fn apply_event(&mut self, event: LogEvent) -> LineOutcome {
        match event {
            LogEvent::RoundStart => self.handle_round_start(),
            LogEvent::Kill {
                killer,
                victim,
                weapon,
                headshot,
                mentions_bot,
            } => self.handle_kill(&killer, &victim, &weapon, headshot, mentions_bot),
            LogEvent::ChatIdentity { name, account_id } => {
                tracing::debug!(player = %name, account_id = %account_id, "Chat identity");
                self.state.accountid_to_name.insert(account_id, name);
            }
            LogEvent::Connect { name, steam_id } => self.handle_connect(&name, &steam_id),
            LogEvent::Disconnect { player } => self.handle_disconnect(&player),
            LogEvent::Accolade {
                kind,
                player,
                value,
            } => {
                self.state.accolades.push(Accolade {
                    kind,
                    player,
                    value,
                });
            }
            LogEvent::MatchStatus { rounds_played } => {
                tracing::debug!(rounds_played, "Match status");
                self.state.rounds_played = rounds_played;
            }
            LogEvent::GameOver { ct_score, t_score } => {
                return self.handle_game_over(ct_score, t_score);
            }
            LogEvent::MapChange { map } => self.handle_map_change(&map),
            LogEvent::ChatCommand {
                player,
                command,
                argument,
            } => {
                self.track_player_team(&player);
                tracing::info!(
                    player = %player.name,
                    team = %player.team,
                    steam_id = %player.steam_id,
                    command = %command,
                    argument = %argument,
                    "Chat command"
                );
                self.handle_command(&player, &command, &argument);
            }
            LogEvent::TeamJoin {
                name,
                steam_id,
                team,
            } => {
                tracing::info!(player = %name, steam_id = %steam_id, team = %team, "Team assignment");
                self.state.player_teams.insert(name.clone(), team);
                self.remember_identity(&name, &steam_id);
            }
            LogEvent::PlayerTeam { player } => self.track_player_team(&player),
        }
        LineOutcome::Continue
    }

    pub(crate) fn say(&mut self, text: &str) {
        self.sink.send(text);
    }

    /// Renders and emits one commentary line through the policy gate.
    pub(crate) fn announce(&mut self, announcement: Announcement) -> bool {
        let text = self.phrasebook.render(&announcement.line);
        let now = self.clock.now();
        self.policy
            .emit(&mut self.state, self.sink.as_mut(), now, &text, &announcement.cue)
    }

    pub(crate) fn remote(&mut self, command: &str) -> Option<String> {
        match self.remote.execute(command) {
            Ok(reply) => Some(reply),
            Err(error) => {
                tracing::warn!(command, error = %error, "Remote command failed");
                None
            }
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn probe_remote(&mut self) {
        match self.remote.execute(LIVENESS_PROBE_COMMAND) {
            Ok(_) => tracing::debug!("Remote control is alive"),
            Err(error) => tracing::warn!(error = %error, "Remote control liveness probe failed"),
        }
    }

    fn remember_identity(&mut self, name: &str, steam_id: &str) {
        if steam_id == "BOT" {
            return;
        }
        self.state.remember_identity(name, steam_id);
    }

    fn track_player_team(&mut self, player: &PlayerRef) {
        self.state
            .temp_player_teams
            .insert(player.name.clone(), player.team);
        self.state
            .player_teams
            .insert(player.name.clone(), player.team);
        self.remember_identity(&player.name, &player.steam_id);
    }

    fn handle_connect(&mut self, name: &str, steam_id: &str) {
        tracing::info!(player = %name, steam_id = %steam_id, "Player connected");
        self.state.remember_identity(name, steam_id);
        self.records.remember_target(name, steam_id);
        if let Err(error) = self.records.save_targets() {
            tracing::error!(error = %error, "Failed to save targets");
        }
    }

    fn handle_disconnect(&mut self, player: &PlayerRef) {
        tracing::info!(player = %player.name, steam_id = %player.steam_id, "Player disconnected");
        self.state.mark_dead(&player.name);
        self.state.player_teams.remove(&player.name);
        self.state.player_teams.remove(&player.steam_id);
        self.state.forget_identity(&player.name, &player.steam_id);
    }

    fn handle_map_change(&mut self, map: &str) {
        tracing::info!(map, "Map change, resetting match state");
        self.state.reset();
        self.state.current_map = normalize_map_name(map);
        self.deferred.clear();
        self.probe_remote();
    }

    /// Asks the server for its player table and refreshes every identity map
    /// and the persisted directory from it.
    pub(crate) fn refresh_identities(&mut self) {
        let Some(output) = self.remote("status") else {
            tracing::warn!("Status refresh failed");
            return;
        };

        let rows = events::parse_status_rows(&output);
        for (name, steam_id) in &rows {
            self.records.remember_target(name, steam_id);
            self.state.remember_identity(name, steam_id);
        }
        if let Err(error) = self.records.save_targets() {
            tracing::error!(error = %error, "Failed to save targets");
        }
        tracing::info!(players = rows.len(), "Refreshed identities from status");
    }

    pub(crate) fn schedule(&mut self, delay_millis: i64, action: DeferredAction) {
        let due_at = self.clock.now() + Duration::milliseconds(delay_millis);
        self.deferred.push(ScheduledAction { due_at, action });
    }

    pub(crate) fn run_due_actions(&mut self, now: DateTime<Utc>) {
        if self.deferred.is_empty() {
            return;
        }

        let (due, pending): (Vec<ScheduledAction>, Vec<ScheduledAction>) =
            std::mem::take(&mut self.deferred)
                .into_iter()
                .partition(|scheduled| scheduled.due_at <= now);
        self.deferred = pending;

        for scheduled in due {
            match scheduled.action {
                DeferredAction::Remote(command) => {
                    self.remote(&command);
                }
                DeferredAction::Say(text) => self.say(&text),
                DeferredAction::RefreshIdentities => self.refresh_identities(),
            }
        }
    }

    fn handle_json_payload(&mut self, payload: &Value) {
        let name = payload.get("name").and_then(Value::as_str);
        if name != Some("round_stats") {
            tracing::debug!(name = ?name, "Ignoring JSON payload");
            return;
        }

        let previous_ct = self.state.ct_score;
        let previous_t = self.state.t_score;
        if let Some(round_number) = json_number(payload, "round_number") {
            self.state.round_number = round_number;
        }
        if let Some(t_score) = json_number(payload, "score_t") {
            self.state.t_score = t_score;
        }
        if let Some(ct_score) = json_number(payload, "score_ct") {
            self.state.ct_score = ct_score;
        }
        tracing::debug!(
            round_number = self.state.round_number,
            ct_score = self.state.ct_score,
            t_score = self.state.t_score,
            "Round stats"
        );

        if let Some(announcement) = match_flow::check_side_switch(&mut self.state) {
            self.announce(announcement);
        }
        for announcement in
            match_flow::score_flow(&mut self.state, previous_ct, previous_t, self.flow_options)
        {
            self.announce(announcement);
        }

        self.collect_multi_kill_accolades(payload);
    }

    fn collect_multi_kill_accolades(&mut self, payload: &Value) {
        let fields = payload
            .get("fields")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .collect::<Vec<&str>>();
        let Some(players) = payload.get("players").and_then(Value::as_object) else {
            return;
        };

        for row in players.values().filter_map(Value::as_str) {
            let columns = fields
                .iter()
                .copied()
                .zip(row.split(',').map(str::trim))
                .collect::<HashMap<&str, &str>>();
            let Some(account_id) = columns.get("accountid") else {
                continue;
            };
            let Some(player) = self.state.accountid_to_name.get(*account_id).cloned() else {
                continue;
            };

            for kind in MULTI_KILL_ACCOLADES {
                let count = columns
                    .get(kind)
                    .and_then(|value| value.parse::<f64>().ok())
                    .unwrap_or(0.0);
                if count > 0.0 {
                    self.state.accolades.push(Accolade {
                        kind: kind.to_string(),
                        player: player.clone(),
                        value: count,
                    });
                }
            }
        }
    }

    fn handle_round_start(&mut self) {
        if !self.state.live_started {
            return;
        }

        let now = self.clock.now();
        self.state.begin_round();
        self.state.round_start_time = Some(now);
        self.state.last_kill_time = Some(now);

        let rules = self.state.rules();
        let round_number = self.state.round_number;
        tracing::debug!(round_number, "Round start");

        if round_number == rules.overtime_first_round() {
            self.announce(Announcement::new(
                Line::OvertimeStart,
                Cue::new("overtime_start").cooldown(0),
            ));
        } else if round_number == rules.max_rounds() + 4 {
            self.announce(Announcement::new(
                Line::OvertimeLate,
                Cue::new("overtime_late").cooldown(0),
            ));
        }

        if round_number == 1 && !self.state.first_round_announced {
            self.announce(Announcement::new(
                Line::FirstRound,
                Cue::new("first_round").cooldown(0),
            ));
            self.state.first_round_announced = true;
        }

        if let Some(announcement) = match_flow::check_side_switch(&mut self.state) {
            self.announce(announcement);
        }
    }

    fn handle_kill(
        &mut self,
        killer: &PlayerRef,
        victim: &PlayerRef,
        weapon: &str,
        headshot: bool,
        mentions_bot: bool,
    ) {
        let now = self.clock.now();
        if self.state.live_started {
            self.track_kill(killer, victim, weapon, headshot, mentions_bot, now);
            if let Some(announcement) = match_flow::evaluate_clutch(&mut self.state) {
                self.announce(announcement);
            }
        }
        self.state.last_kill_time = Some(now);
    }

    fn track_kill(
        &mut self,
        killer: &PlayerRef,
        victim: &PlayerRef,
        weapon: &str,
        headshot: bool,
        mentions_bot: bool,
        now: DateTime<Utc>,
    ) {
        if let Some(round_start_time) = self.state.round_start_time {
            if now.signed_duration_since(round_start_time)
                <= Duration::seconds(EARLY_DEATH_WINDOW_SECONDS)
            {
                self.announce(Announcement::new(
                    Line::EarlyDeath {
                        victim: victim.name.clone(),
                    },
                    Cue::new(format!("early_death_{}", victim.name)).cooldown(0),
                ));
            }
        }

        let headshot_streak = {
            let streak = self
                .state
                .headshot_streaks
                .entry(killer.name.clone())
                .or_insert(0);
            *streak = if headshot { *streak + 1 } else { 0 };
            *streak
        };
        if headshot_streak == HEADSHOT_STREAK_CUE {
            self.announce(Announcement::new(
                Line::HeadshotStreak {
                    player: killer.name.clone(),
                },
                Cue::new(format!("headshot_streak_{}", killer.name)).cooldown(0),
            ));
        }

        let killer_side = self.resolve_kill_side(killer, "killer");
        let victim_side = self.resolve_kill_side(victim, "victim");
        let team_kill = killer_side.is_some()
            && killer_side == victim_side
            && killer.name != victim.name
            && !mentions_bot;
        self.state.mark_dead(&victim.name);
        if team_kill {
            tracing::info!(player = %killer.name, victim = %victim.name, "Team kill");
            self.announce(Announcement::new(
                Line::TeamKill {
                    player: killer.name.clone(),
                },
                Cue::new(format!("team_kill_{}", killer.name)).cooldown(0),
            ));
            return;
        }

        if let Some(side) = killer_side {
            self.state.mark_alive(&killer.name, side);
            self.state.record_weapon(side, weapon);
        }

        let kills = {
            let streak = self.state.kill_streaks.entry(killer.name.clone()).or_insert(0);
            *streak += 1;
            *streak
        };
        let player = killer.name.clone();
        let streak_line = match kills {
            3 if self.rng.gen::<f64>() < self.settings.taunt_chance => {
                Some(Line::Taunt { player: player.clone() })
            }
            2..=4 => Some(Line::KillStreak {
                player: player.clone(),
                kills,
            }),
            _ => None,
        };
        if let Some(line) = streak_line {
            self.announce(Announcement::new(
                line,
                Cue::new(format!("kill_streak_{kills}_{player}")).cooldown(0),
            ));
        }
        if kills >= ACE_KILLS {
            self.announce(Announcement::new(
                Line::Ace {
                    player: player.clone(),
                },
                Cue::new(format!("ace_{player}")).cooldown(0).once_per_round(),
            ));
        }
    }

    /// Side a kill participant fought for: the tracked team first, then the
    /// label on the line. Bots share one id, so only their label counts.
    fn resolve_kill_side(&self, player: &PlayerRef, role: &'static str) -> Option<Team> {
        let tracked = if player.is_bot() {
            None
        } else {
            self.state.team_of_steam_id(&player.steam_id)
        };
        let side = tracked
            .filter(|team| team.is_playing())
            .or_else(|| Some(player.team).filter(|team| team.is_playing()));
        if side.is_none() {
            tracing::warn!(
                player = %player.name,
                steam_id = %player.steam_id,
                role,
                "Kill side unresolved"
            );
        }
        side
    }

    fn check_silence(&mut self, now: DateTime<Utc>) {
        if !self.state.should_commentate() || self.state.round_start_time.is_none() {
            return;
        }
        let Some(last_kill_time) = self.state.last_kill_time else {
            return;
        };
        if now.signed_duration_since(last_kill_time)
            < Duration::seconds(self.settings.silence_seconds as i64)
        {
            return;
        }

        let ct_alive = self.state.alive_ct.len();
        let t_alive = self.state.alive_t.len();
        if ct_alive == 0 || t_alive == 0 {
            return;
        }

        let balance = match ct_alive.cmp(&t_alive) {
            std::cmp::Ordering::Equal => SilenceBalance::Even,
            std::cmp::Ordering::Greater => SilenceBalance::CtAdvantage,
            std::cmp::Ordering::Less => SilenceBalance::TAdvantage,
        };
        self.announce(Announcement::new(
            Line::Silence(balance),
            Cue::new("silence")
                .cooldown(self.settings.commentary_cooldown_seconds)
                .once_per_round(),
        ));
    }

    fn check_idle(&mut self, now: DateTime<Utc>) {
        if !self.state.should_commentate() {
            return;
        }
        let Some(last_kill_time) = self.state.last_kill_time else {
            return;
        };
        if now.signed_duration_since(last_kill_time)
            < Duration::seconds(self.settings.idle_comment_seconds as i64)
        {
            return;
        }

        let alive_players = self
            .state
            .alive_ct
            .iter()
            .chain(self.state.alive_t.iter())
            .cloned()
            .collect::<Vec<String>>();
        let Some(player) = alive_players.choose(&mut self.rng).cloned() else {
            return;
        };

        let cheered = self.announce(Announcement::new(
            Line::IdleCheer { player },
            Cue::new("idle_cheer").cooldown(self.settings.commentary_cooldown_seconds),
        ));
        if cheered {
            self.state.last_kill_time = Some(now);
        }
    }

    fn handle_game_over(&mut self, ct_score: u32, t_score: u32) -> LineOutcome {
        if self.state.match_finished {
            tracing::debug!(ct_score, t_score, "Game over ignored, no armed match");
            return LineOutcome::Continue;
        }

        self.state.match_finished = true;
        self.state.live_started = false;
        let Some(winner) = leader_of(ct_score, t_score) else {
            tracing::warn!(ct_score, t_score, "Drawn final score, nothing recorded");
            return LineOutcome::Continue;
        };

        self.refresh_identities();
        if self.state.player_teams.is_empty() {
            let alive = self
                .state
                .alive_ct
                .iter()
                .map(|player| (player.clone(), Team::Ct))
                .chain(
                    self.state
                        .alive_t
                        .iter()
                        .map(|player| (player.clone(), Team::Terrorist)),
                )
                .collect::<Vec<(String, Team)>>();
            self.state.player_teams.extend(alive);
        }

        self.say("Match over! Thanks for playing.");
        let rounds_played = self.state.rounds_played;
        self.say(&format!("Highlights from all {rounds_played} rounds:"));
        let accolades = std::mem::take(&mut self.state.accolades);
        for accolade in &accolades {
            if let Some(text) =
                self.phrasebook
                    .accolade(&accolade.kind, &accolade.player, accolade.value)
            {
                self.say(&text);
            }
        }
        self.say(&format!("{winner} wins! GG WP!"));

        let ct_players = self.match_players(Team::Ct);
        let t_players = self.match_players(Team::Terrorist);
        if ct_players.is_empty() && t_players.is_empty() {
            tracing::warn!(
                player_teams = ?self.state.player_teams,
                temp_player_teams = ?self.state.temp_player_teams,
                "No players found for the match result"
            );
        }
        tracing::debug!(?ct_players, ?t_players, "Match rosters");

        self.records.record_match(winner, &ct_players, &t_players);
        if let Err(error) = self.records.save_all() {
            tracing::error!(error = %error, "Failed to save match records");
        }

        if accolades.is_empty() {
            self.say("No accolades this match.");
        }
        tracing::info!(winner = %winner, ct_score, t_score, "Match finished");
        LineOutcome::MatchFinished
    }

    /// Final side of every human player, by name. `player_teams` follows side
    /// switches, so it wins over `temp_player_teams` for the same player.
    fn final_sides(&self) -> BTreeMap<String, Team> {
        let mut sides = BTreeMap::new();
        for map in [&self.state.temp_player_teams, &self.state.player_teams] {
            for (key, team) in map {
                let name = self.state.steam_to_name.get(key).unwrap_or(key);
                if name.starts_with("[U:1:") || is_bot_name(name) {
                    continue;
                }
                sides.insert(name.clone(), *team);
            }
        }
        sides
    }

    /// Human players who finished on `team`, by name, sorted.
    /// Falls back to the side's survivors when nothing is tracked.
    fn match_players(&self, team: Team) -> Vec<String> {
        let tracked = self
            .final_sides()
            .into_iter()
            .filter(|(_, player_team)| *player_team == team)
            .map(|(name, _)| name)
            .collect::<BTreeSet<String>>();
        if !tracked.is_empty() {
            return tracked.into_iter().collect();
        }

        self.state
            .alive_on(team)
            .map(|alive| {
                alive
                    .iter()
                    .filter(|player| !self.records.is_bot(player))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// CS2 writes round numbers and scores as strings; plain numbers are accepted too.
fn json_number(payload: &Value, key: &str) -> Option<u32> {
    match payload.get(key)? {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_u64().and_then(|value| u32::try_from(value).ok()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Controller;
    use crate::commentary::testing::ManualClock;
    use crate::phrases::TemplatePhrasebook;
    use crate::rcon::testing::Outbox;
    use crate::records::{PlayerRecords, RecordPaths};
    use crate::settings::RuntimeSettings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    pub(crate) const ADMIN_STEAM_ID: &str = "[U:1:1]";
    pub(crate) const PREFIX: &str = "L 01/03/2026 - 18:00:00: ";

    pub(crate) struct Harness {
        pub(crate) controller: Controller,
        pub(crate) outbox: Outbox,
        pub(crate) clock: ManualClock,
        pub(crate) data_dir: TempDir,
    }

    pub(crate) fn test_settings() -> RuntimeSettings {
        RuntimeSettings {
            admin_steamid: ADMIN_STEAM_ID.to_string(),
            taunt_chance: 0.0,
            ..RuntimeSettings::default()
        }
    }

    pub(crate) fn harness_with(settings: RuntimeSettings) -> Harness {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let records = PlayerRecords::empty(RecordPaths::in_directory(data_dir.path()));
        let outbox = Outbox::default();
        let clock = ManualClock::new();
        let controller = Controller::new(
            settings,
            records,
            Box::new(outbox.clone()),
            Box::new(outbox.clone()),
        )
        .with_clock(Box::new(clock.clone()))
        .with_phrasebook(Box::new(TemplatePhrasebook::seeded(1)))
        .with_rng(StdRng::seed_from_u64(7));

        Harness {
            controller,
            outbox,
            clock,
            data_dir,
        }
    }

    pub(crate) fn harness() -> Harness {
        harness_with(test_settings())
    }

    pub(crate) fn chat(name: &str, steam_id: &str, team: &str, text: &str) -> String {
        format!("{PREFIX}\"{name}<2><{steam_id}><{team}>\" say \"{text}\"")
    }

    pub(crate) fn kill(killer: (&str, &str, &str), victim: (&str, &str, &str), suffix: &str) -> String {
        format!(
            "{PREFIX}\"{}<3><{}><{}>\" [0 0 0] killed \"{}<4><{}><{}>\" [1 1 1] with \"ak47\"{suffix}",
            killer.0, killer.1, killer.2, victim.0, victim.1, victim.2
        )
    }
}
