use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

pub const DEFAULT_MAP: &str = "de_dust2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    Ct,
    Terrorist,
    Spectator,
    Unassigned,
}

impl Team {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "CT" => Team::Ct,
            "TERRORIST" | "T" => Team::Terrorist,
            "SPECTATOR" => Team::Spectator,
            _ => Team::Unassigned,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Team::Ct => "CT",
            Team::Terrorist => "TERRORIST",
            Team::Spectator => "Spectator",
            Team::Unassigned => "Unassigned",
        }
    }

    /// Side after a half switch. Non-playing labels are left as they are.
    pub fn swapped(self) -> Self {
        match self {
            Team::Ct => Team::Terrorist,
            Team::Terrorist => Team::Ct,
            other => other,
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, Team::Ct | Team::Terrorist)
    }
}

impl fmt::Display for Team {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Round-count rules derived once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    max_rounds: u32,
}

impl MatchRules {
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn win_rounds(&self) -> u32 {
        self.max_rounds / 2 + 1
    }

    pub fn regulation_switch_round(&self) -> u32 {
        self.max_rounds / 2 + 1
    }

    pub fn overtime_first_round(&self) -> u32 {
        self.max_rounds + 1
    }

    /// Regulation swap at half time, then MR3 overtime halves: the first
    /// overtime swap three rounds in, and every six rounds after that.
    pub fn is_side_switch_round(&self, round_number: u32) -> bool {
        if round_number == self.regulation_switch_round() {
            return true;
        }

        let overtime_first_round = self.overtime_first_round();
        let overtime_first_switch = overtime_first_round + 3;
        round_number >= overtime_first_switch && (round_number - overtime_first_round) % 6 == 3
    }

    pub fn is_pistol_round(&self, round_number: u32) -> bool {
        round_number == 1 || round_number == self.regulation_switch_round()
    }

    pub fn is_overtime(&self, round_number: u32) -> bool {
        round_number > self.max_rounds
    }
}

/// Clutch situation of the current round. Set by the first qualifying kill
/// and only ever upgraded to `OneVsOne` afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClutchState {
    #[default]
    NoClutch,
    OneVsMany {
        player: String,
        side: Team,
        enemies: usize,
    },
    OneVsOne,
}

impl ClutchState {
    pub fn is_active(&self) -> bool {
        !matches!(self, ClutchState::NoClutch)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accolade {
    pub kind: String,
    pub player: String,
    pub value: f64,
}

/// Mutable record of the match in progress. Owned by the controller and
/// passed by reference to every component that reads or updates it.
#[derive(Debug, Clone)]
pub struct MatchState {
    rules: MatchRules,

    pub round_number: u32,
    pub ct_score: u32,
    pub t_score: u32,
    pub rounds_played: u32,

    pub live_started: bool,
    pub match_finished: bool,
    pub first_round_announced: bool,
    pub commentary_enabled: bool,
    pub debug_enabled: bool,
    pub current_map: String,

    pub alive_ct: BTreeSet<String>,
    pub alive_t: BTreeSet<String>,
    pub clutch: ClutchState,

    pub player_teams: BTreeMap<String, Team>,
    pub temp_player_teams: BTreeMap<String, Team>,

    pub kill_streaks: HashMap<String, u32>,
    pub headshot_streaks: HashMap<String, u32>,
    pub round_weapons_ct: BTreeSet<String>,
    pub round_weapons_t: BTreeSet<String>,

    pub streak_team: Option<Team>,
    pub streak_count: u32,
    pub last_known_leader: Option<Team>,
    pub last_flow_comment_round: u32,
    pub ct_match_point_announced: bool,
    pub t_match_point_announced: bool,
    pub last_side_switch_round: u32,

    pub round_start_time: Option<DateTime<Utc>>,
    pub last_kill_time: Option<DateTime<Utc>>,

    pub last_comment_at: HashMap<String, DateTime<Utc>>,
    pub round_comment_keys: HashSet<String>,

    pub accolades: Vec<Accolade>,

    pub name_to_steam: HashMap<String, String>,
    pub steam_to_name: HashMap<String, String>,
    pub accountid_to_name: HashMap<String, String>,

    pub ready_ct: bool,
    pub ready_t: bool,
    pub coin_used: bool,
    pub coin_winner: Option<Team>,
    pub side_select_active: bool,
}

impl MatchState {
    pub fn new(rules: MatchRules) -> Self {
        Self {
            rules,
            round_number: 0,
            ct_score: 0,
            t_score: 0,
            rounds_played: 0,
            live_started: false,
            match_finished: true,
            first_round_announced: false,
            commentary_enabled: true,
            debug_enabled: false,
            current_map: DEFAULT_MAP.to_string(),
            alive_ct: BTreeSet::new(),
            alive_t: BTreeSet::new(),
            clutch: ClutchState::NoClutch,
            player_teams: BTreeMap::new(),
            temp_player_teams: BTreeMap::new(),
            kill_streaks: HashMap::new(),
            headshot_streaks: HashMap::new(),
            round_weapons_ct: BTreeSet::new(),
            round_weapons_t: BTreeSet::new(),
            streak_team: None,
            streak_count: 0,
            last_known_leader: None,
            last_flow_comment_round: 0,
            ct_match_point_announced: false,
            t_match_point_announced: false,
            last_side_switch_round: 0,
            round_start_time: None,
            last_kill_time: None,
            last_comment_at: HashMap::new(),
            round_comment_keys: HashSet::new(),
            accolades: Vec::new(),
            name_to_steam: HashMap::new(),
            steam_to_name: HashMap::new(),
            accountid_to_name: HashMap::new(),
            ready_ct: false,
            ready_t: false,
            coin_used: false,
            coin_winner: None,
            side_select_active: false,
        }
    }

    pub fn rules(&self) -> MatchRules {
        self.rules
    }

    pub fn win_rounds(&self) -> u32 {
        self.rules.win_rounds()
    }

    /// Back to a fresh match, keeping only the configured rules.
    pub fn reset(&mut self) {
        *self = Self::new(self.rules);
    }

    /// Commentary is only produced for a live match with commentary switched on.
    pub fn should_commentate(&self) -> bool {
        self.commentary_enabled && self.live_started
    }

    /// Clears every round-scoped tracker. Called once per round start.
    pub fn begin_round(&mut self) {
        self.kill_streaks.clear();
        self.headshot_streaks.clear();
        self.round_weapons_ct.clear();
        self.round_weapons_t.clear();
        self.round_comment_keys.clear();
        self.alive_ct.clear();
        self.alive_t.clear();
        self.clutch = ClutchState::NoClutch;
    }

    pub fn alive_on(&self, team: Team) -> Option<&BTreeSet<String>> {
        match team {
            Team::Ct => Some(&self.alive_ct),
            Team::Terrorist => Some(&self.alive_t),
            _ => None,
        }
    }

    /// Marks a player alive on one side, removing them from the other.
    pub fn mark_alive(&mut self, name: &str, team: Team) {
        match team {
            Team::Ct => {
                self.alive_t.remove(name);
                self.alive_ct.insert(name.to_string());
            }
            Team::Terrorist => {
                self.alive_ct.remove(name);
                self.alive_t.insert(name.to_string());
            }
            _ => {}
        }
    }

    pub fn mark_dead(&mut self, name: &str) {
        self.alive_ct.remove(name);
        self.alive_t.remove(name);
    }

    pub fn record_weapon(&mut self, team: Team, weapon: &str) {
        let weapon = weapon.to_ascii_lowercase();
        match team {
            Team::Ct => {
                self.round_weapons_ct.insert(weapon);
            }
            Team::Terrorist => {
                self.round_weapons_t.insert(weapon);
            }
            _ => {}
        }
    }

    /// Swaps every tracked side label for a half switch.
    pub fn swap_player_teams(&mut self) {
        for team in self.player_teams.values_mut() {
            *team = team.swapped();
        }
    }

    pub fn remember_identity(&mut self, name: &str, steam_id: &str) {
        self.name_to_steam
            .insert(name.to_string(), steam_id.to_string());
        self.steam_to_name
            .insert(steam_id.to_string(), name.to_string());
        if let Some(account_id) = account_id_of(steam_id) {
            self.accountid_to_name
                .insert(account_id.to_string(), name.to_string());
        }
    }

    pub fn forget_identity(&mut self, name: &str, steam_id: &str) {
        self.name_to_steam.remove(name);
        self.steam_to_name.remove(steam_id);
    }

    /// Team of a player looked up by steam id, then by the name that id
    /// last resolved to.
    pub fn team_of_steam_id(&self, steam_id: &str) -> Option<Team> {
        if let Some(team) = self.player_teams.get(steam_id) {
            return Some(*team);
        }

        let name = self.steam_to_name.get(steam_id)?;
        self.player_teams.get(name).copied()
    }

    pub fn players_on(&self, team: Team) -> Vec<String> {
        self.player_teams
            .iter()
            .filter(|(_, player_team)| **player_team == team)
            .map(|(player, _)| player.clone())
            .collect()
    }
}

pub fn leader_of(ct_score: u32, t_score: u32) -> Option<Team> {
    if ct_score > t_score {
        Some(Team::Ct)
    } else if t_score > ct_score {
        Some(Team::Terrorist)
    } else {
        None
    }
}

/// Extracts `N` from a `[U:1:N]` steam id.
pub fn account_id_of(steam_id: &str) -> Option<&str> {
    let account_id = steam_id.strip_prefix("[U:1:")?.strip_suffix(']')?;
    if account_id.is_empty() || !account_id.chars().all(|character| character.is_ascii_digit()) {
        return None;
    }
    Some(account_id)
}
