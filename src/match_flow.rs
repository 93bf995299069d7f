//! Round lifecycle rules layered on top of [`MatchState`]: half switches,
//! clutch detection, score momentum and round context.
//!
//! Nothing here talks to the server. Every function updates the state and
//! returns the [`Announcement`]s it wants made; the controller renders them
//! and passes each one through the commentary policy.

use std::collections::BTreeSet;

use crate::commentary::Cue;
use crate::match_state::{leader_of, ClutchState, MatchState, Team};
use crate::phrases::Line;
use crate::settings::RuntimeSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub line: Line,
    pub cue: Cue,
}

impl Announcement {
    pub fn new(line: Line, cue: Cue) -> Self {
        Self { line, cue }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOptions {
    pub score_flow_cooldown_seconds: u64,
    pub round_context_enabled: bool,
}

impl From<&RuntimeSettings> for FlowOptions {
    fn from(settings: &RuntimeSettings) -> Self {
        Self {
            score_flow_cooldown_seconds: settings.score_flow_cooldown_seconds,
            round_context_enabled: settings.round_context_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyTier {
    Full,
    Force,
    Pistol,
    Eco,
    Unknown,
}

const FULL_BUY_WEAPONS: &[&str] = &[
    "ak47",
    "m4a1",
    "m4a1_silencer",
    "m4a4",
    "famas",
    "galilar",
    "aug",
    "sg556",
    "awp",
    "scar20",
    "g3sg1",
];
const FORCE_BUY_WEAPONS: &[&str] = &[
    "mp9", "mac10", "ump45", "mp7", "mp5sd", "p90", "bizon", "nova", "xm1014", "mag7",
    "sawedoff", "deagle", "revolver", "five_seven", "tec9", "cz75a",
];
const PISTOLS: &[&str] = &[
    "glock",
    "hkp2000",
    "p250",
    "elite",
    "usp_silencer",
    "fiveseven",
    "tec9",
    "cz75a",
    "deagle",
    "revolver",
];
const UTILITY: &[&str] = &[
    "hegrenade",
    "smokegrenade",
    "flashbang",
    "molotov",
    "incgrenade",
    "knife",
    "taser",
];

/// Coarse loadout class from the weapons a side killed with this round.
/// Names are expected lower-cased.
pub fn buy_tier(weapons: &BTreeSet<String>) -> BuyTier {
    if weapons.is_empty() {
        return BuyTier::Unknown;
    }

    let used_any = |table: &[&str]| weapons.iter().any(|weapon| table.contains(&weapon.as_str()));
    if used_any(FULL_BUY_WEAPONS) {
        return BuyTier::Full;
    }
    if used_any(FORCE_BUY_WEAPONS) {
        return BuyTier::Force;
    }

    let pistol_or_utility = weapons
        .iter()
        .all(|weapon| PISTOLS.contains(&weapon.as_str()) || UTILITY.contains(&weapon.as_str()));
    if pistol_or_utility {
        BuyTier::Pistol
    } else {
        BuyTier::Eco
    }
}

/// Announces and applies a half switch when the current round is a switch
/// round that has not been handled yet.
pub fn check_side_switch(state: &mut MatchState) -> Option<Announcement> {
    if !state.live_started {
        return None;
    }

    let round_number = state.round_number;
    if !state.rules().is_side_switch_round(round_number) {
        return None;
    }
    if state.last_side_switch_round == round_number {
        return None;
    }

    tracing::info!(round_number, "Side switch");
    state.last_side_switch_round = round_number;
    state.swap_player_teams();
    state.streak_team = None;
    state.streak_count = 0;
    state.last_known_leader = None;
    state.last_flow_comment_round = 0;
    state.ct_match_point_announced = false;
    state.t_match_point_announced = false;

    Some(Announcement::new(
        Line::SideSwitch,
        Cue::new(format!("side_switch_{round_number}")).cooldown(0),
    ))
}

/// Called after every kill once the alive sets are up to date. A 1v1 is
/// always announced once; otherwise the first 1vN of the round wins.
pub fn evaluate_clutch(state: &mut MatchState) -> Option<Announcement> {
    let ct_alive = state.alive_ct.len();
    let t_alive = state.alive_t.len();

    if ct_alive == 1 && t_alive == 1 {
        if state.clutch == ClutchState::OneVsOne {
            return None;
        }
        state.clutch = ClutchState::OneVsOne;
        tracing::debug!("1v1 entered");
        return Some(Announcement::new(
            Line::OneVsOne,
            Cue::new("one_v_one").cooldown(0).once_per_round(),
        ));
    }

    if state.clutch.is_active() {
        return None;
    }

    let (side, lone_set, enemies) = if ct_alive == 1 && t_alive >= 2 {
        (Team::Ct, &state.alive_ct, t_alive)
    } else if t_alive == 1 && ct_alive >= 2 {
        (Team::Terrorist, &state.alive_t, ct_alive)
    } else {
        return None;
    };

    let player = lone_set.iter().next()?.clone();
    tracing::debug!(player = %player, team = %side, enemies, "Clutch entered");
    state.clutch = ClutchState::OneVsMany {
        player: player.clone(),
        side,
        enemies,
    };

    Some(Announcement::new(
        Line::Clutch { player, enemies },
        Cue::new("clutch").cooldown(0).once_per_round(),
    ))
}

/// Momentum commentary after a score update. Emits at most one of match
/// point, tie, comeback or streak, followed by any round-context lines.
pub fn score_flow(
    state: &mut MatchState,
    previous_ct: u32,
    previous_t: u32,
    options: FlowOptions,
) -> Vec<Announcement> {
    let mut announcements = Vec::new();
    if !state.should_commentate() || state.round_number == 0 {
        return announcements;
    }
    if state.round_number == state.last_flow_comment_round {
        return announcements;
    }

    let ct_scored = state.ct_score > previous_ct;
    let t_scored = state.t_score > previous_t;
    let winner = match (ct_scored, t_scored) {
        (true, false) => Team::Ct,
        (false, true) => Team::Terrorist,
        _ => return announcements,
    };

    if state.streak_team == Some(winner) {
        state.streak_count += 1;
    } else {
        state.streak_team = Some(winner);
        state.streak_count = 1;
    }

    let (ct, t) = (state.ct_score, state.t_score);
    let match_point_score = state.win_rounds().saturating_sub(1);
    let previous_leader = leader_of(previous_ct, previous_t);
    let current_leader = leader_of(ct, t);
    let flow_cue = |key: &str| {
        Cue::new(key)
            .cooldown(options.score_flow_cooldown_seconds)
            .once_per_round()
    };

    let flow_line = if ct == match_point_score && !state.ct_match_point_announced {
        state.ct_match_point_announced = true;
        Some((Line::MatchPoint { team: Team::Ct, ct, t }, flow_cue("ct_match_point")))
    } else if t == match_point_score && !state.t_match_point_announced {
        state.t_match_point_announced = true;
        Some((
            Line::MatchPoint {
                team: Team::Terrorist,
                ct,
                t,
            },
            flow_cue("t_match_point"),
        ))
    } else if current_leader.is_none() && previous_leader.is_some() {
        Some((Line::Tie { ct, t }, flow_cue("tie")))
    } else if matches!(
        (state.last_known_leader, current_leader),
        (Some(before), Some(now)) if before != now
    ) {
        Some((Line::Comeback { ct, t }, flow_cue("comeback")))
    } else if state.streak_count >= 3 {
        let key = if winner == Team::Ct { "ct_streak" } else { "t_streak" };
        Some((
            Line::Streak {
                team: winner,
                count: state.streak_count,
            },
            flow_cue(key),
        ))
    } else {
        None
    };

    if current_leader.is_some() {
        state.last_known_leader = current_leader;
    }
    if let Some((line, cue)) = flow_line {
        announcements.push(Announcement::new(line, cue));
    }

    announcements.extend(round_context(state, options));
    state.last_flow_comment_round = state.round_number;
    announcements
}

/// Pistol rounds, economy mismatches and tight overtime scores.
pub fn round_context(state: &MatchState, options: FlowOptions) -> Vec<Announcement> {
    let mut announcements = Vec::new();
    if !options.round_context_enabled || state.round_number == 0 {
        return announcements;
    }

    let round_number = state.round_number;
    let (ct, t) = (state.ct_score, state.t_score);
    let rules = state.rules();

    if rules.is_pistol_round(round_number) {
        announcements.push(Announcement::new(
            Line::PistolRound { ct, t },
            Cue::new(format!("pistol_round_{round_number}")).once_per_round(),
        ));
        return announcements;
    }

    let ct_buy = buy_tier(&state.round_weapons_ct);
    let t_buy = buy_tier(&state.round_weapons_t);
    let light_buy = |tier: BuyTier| matches!(tier, BuyTier::Eco | BuyTier::Pistol);

    if ct_buy == BuyTier::Full && light_buy(t_buy) {
        announcements.push(Announcement::new(
            Line::AntiEco { team: Team::Ct, ct, t },
            Cue::new(format!("anti_eco_ct_{round_number}")).once_per_round(),
        ));
    } else if t_buy == BuyTier::Full && light_buy(ct_buy) {
        announcements.push(Announcement::new(
            Line::AntiEco {
                team: Team::Terrorist,
                ct,
                t,
            },
            Cue::new(format!("anti_eco_t_{round_number}")).once_per_round(),
        ));
    } else if ct_buy == BuyTier::Full && t_buy == BuyTier::Full {
        announcements.push(Announcement::new(
            Line::FullBuy { ct, t },
            Cue::new(format!("full_buy_{round_number}")).once_per_round(),
        ));
    }

    if rules.is_overtime(round_number) && ct.abs_diff(t) <= 1 {
        announcements.push(Announcement::new(
            Line::OvertimePoint { ct, t },
            Cue::new(format!("ot_point_{round_number}"))
                .cooldown(options.score_flow_cooldown_seconds)
                .once_per_round(),
        ));
    }

    announcements
}
