//! Flavor text. Every commentary line is described as a [`Line`] and turned
//! into text by a [`Phrasebook`]; the match logic never sees template strings.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::match_state::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceBalance {
    Even,
    CtAdvantage,
    TAdvantage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    SideSwitch,
    FirstRound,
    OvertimeStart,
    OvertimeLate,
    Clutch { player: String, enemies: usize },
    OneVsOne,
    MatchPoint { team: Team, ct: u32, t: u32 },
    Tie { ct: u32, t: u32 },
    Comeback { ct: u32, t: u32 },
    Streak { team: Team, count: u32 },
    PistolRound { ct: u32, t: u32 },
    AntiEco { team: Team, ct: u32, t: u32 },
    FullBuy { ct: u32, t: u32 },
    OvertimePoint { ct: u32, t: u32 },
    EarlyDeath { victim: String },
    HeadshotStreak { player: String },
    TeamKill { player: String },
    KillStreak { player: String, kills: u32 },
    Taunt { player: String },
    Ace { player: String },
    Silence(SilenceBalance),
    IdleCheer { player: String },
}

pub trait Phrasebook {
    fn render(&mut self, line: &Line) -> String;

    /// End-of-match highlight line for an accolade, if the kind is known.
    fn accolade(&mut self, kind: &str, player: &str, value: f64) -> Option<String>;
}

const SIDE_SWITCH: &[&str] = &[
    "Half time! Sides are switching.",
    "Switching sides, new half, new plan.",
];
const FIRST_ROUND: &[&str] = &["Round one is live. Good luck, have fun!"];
const OVERTIME_START: &[&str] = &[
    "Overtime! Nobody blinks now.",
    "We are going to overtime!",
];
const OVERTIME_LATE: &[&str] = &["Overtime keeps going, nerves of steel required."];
const CLUTCH: &[&str] = &[
    "{player} is in a 1v{count} clutch!",
    "{player} alone, 1v{count}. Can it be done?",
    "All eyes on {player}: 1v{count}.",
];
const ONE_VS_ONE: &[&str] = &["1v1! The final duel!", "It's a 1v1, who wants it more?"];
const CT_MATCH_POINT: &[&str] = &["Match point for CT! ({ct}-{t})"];
const T_MATCH_POINT: &[&str] = &["Match point for T! ({ct}-{t})"];
const TIE: &[&str] = &["All square at {ct}-{t}!", "Level again: {ct}-{t}."];
const COMEBACK: &[&str] = &["The lead has flipped! {ct}-{t}.", "Comeback! Now {ct}-{t}."];
const CT_STREAK: &[&str] = &["CT on a {count}-round streak!"];
const T_STREAK: &[&str] = &["T on a {count}-round streak!"];
const PISTOL_ROUND: &[&str] = &["Pistol round! ({ct}-{t})"];
const ANTI_ECO_CT: &[&str] = &["CT full buy into a T eco. Anti-eco discipline! ({ct}-{t})"];
const ANTI_ECO_T: &[&str] = &["T full buy into a CT eco. Anti-eco discipline! ({ct}-{t})"];
const FULL_BUY: &[&str] = &["Full buy vs full buy, a real gun round! ({ct}-{t})"];
const OVERTIME_POINT: &[&str] = &["Overtime, one round in it: {ct}-{t}."];
const EARLY_DEATH: &[&str] = &["{player} went down in the opening 15 seconds."];
const HEADSHOT_STREAK: &[&str] = &[
    "{player} can't stop hitting heads!",
    "{player} with three headshots in a row.",
];
const TEAM_KILL: &[&str] = &[
    "[TK] {player}, watch your fire.",
    "[TK] {player}, friendly fire!",
];
const KILL_STREAK_2: &[&str] = &["{player} picks up a double."];
const KILL_STREAK_3: &[&str] = &["{player} has three, unstoppable!"];
const KILL_STREAK_4: &[&str] = &["{player} with four, one more!"];
const TAUNT: &[&str] = &["{player} is farming today.", "Somebody stop {player}!"];
const ACE: &[&str] = &["{player} ACE!", "{player} wiped the whole team!"];
const SILENCE_EVEN: &[&str] = &["Quiet round, even numbers. Who moves first?"];
const SILENCE_CT: &[&str] = &["CT has the numbers, T needs to make something happen."];
const SILENCE_T: &[&str] = &["T has the numbers, CT must hold on."];
const IDLE_CHEER: &[&str] = &[
    "{player}, stay sharp.",
    "{player}, this round is yours to take.",
    "{player}, keep calm and trade.",
];

/// Random choice over built-in templates with `{placeholder}` substitution.
pub struct TemplatePhrasebook {
    rng: StdRng,
}

impl TemplatePhrasebook {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, templates: &[&'static str]) -> &'static str {
        templates.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl Default for TemplatePhrasebook {
    fn default() -> Self {
        Self::new()
    }
}

fn templates_for(line: &Line) -> &'static [&'static str] {
    match line {
        Line::SideSwitch => SIDE_SWITCH,
        Line::FirstRound => FIRST_ROUND,
        Line::OvertimeStart => OVERTIME_START,
        Line::OvertimeLate => OVERTIME_LATE,
        Line::Clutch { .. } => CLUTCH,
        Line::OneVsOne => ONE_VS_ONE,
        Line::MatchPoint { team: Team::Ct, .. } => CT_MATCH_POINT,
        Line::MatchPoint { .. } => T_MATCH_POINT,
        Line::Tie { .. } => TIE,
        Line::Comeback { .. } => COMEBACK,
        Line::Streak { team: Team::Ct, .. } => CT_STREAK,
        Line::Streak { .. } => T_STREAK,
        Line::PistolRound { .. } => PISTOL_ROUND,
        Line::AntiEco { team: Team::Ct, .. } => ANTI_ECO_CT,
        Line::AntiEco { .. } => ANTI_ECO_T,
        Line::FullBuy { .. } => FULL_BUY,
        Line::OvertimePoint { .. } => OVERTIME_POINT,
        Line::EarlyDeath { .. } => EARLY_DEATH,
        Line::HeadshotStreak { .. } => HEADSHOT_STREAK,
        Line::TeamKill { .. } => TEAM_KILL,
        Line::KillStreak { kills: 2, .. } => KILL_STREAK_2,
        Line::KillStreak { kills: 3, .. } => KILL_STREAK_3,
        Line::KillStreak { .. } => KILL_STREAK_4,
        Line::Taunt { .. } => TAUNT,
        Line::Ace { .. } => ACE,
        Line::Silence(SilenceBalance::Even) => SILENCE_EVEN,
        Line::Silence(SilenceBalance::CtAdvantage) => SILENCE_CT,
        Line::Silence(SilenceBalance::TAdvantage) => SILENCE_T,
        Line::IdleCheer { .. } => IDLE_CHEER,
    }
}

fn fill(template: &str, line: &Line) -> String {
    match line {
        Line::Clutch { player, enemies } => template
            .replace("{player}", player)
            .replace("{count}", &enemies.to_string()),
        Line::MatchPoint { ct, t, .. }
        | Line::Tie { ct, t }
        | Line::Comeback { ct, t }
        | Line::PistolRound { ct, t }
        | Line::AntiEco { ct, t, .. }
        | Line::FullBuy { ct, t }
        | Line::OvertimePoint { ct, t } => template
            .replace("{ct}", &ct.to_string())
            .replace("{t}", &t.to_string()),
        Line::Streak { count, .. } => template.replace("{count}", &count.to_string()),
        Line::EarlyDeath { victim: player }
        | Line::HeadshotStreak { player }
        | Line::TeamKill { player }
        | Line::KillStreak { player, .. }
        | Line::Taunt { player }
        | Line::Ace { player }
        | Line::IdleCheer { player } => template.replace("{player}", player),
        Line::SideSwitch
        | Line::FirstRound
        | Line::OvertimeStart
        | Line::OvertimeLate
        | Line::OneVsOne
        | Line::Silence(_) => template.to_string(),
    }
}

impl Phrasebook for TemplatePhrasebook {
    fn render(&mut self, line: &Line) -> String {
        let template = self.pick(templates_for(line));
        fill(template, line)
    }

    fn accolade(&mut self, kind: &str, player: &str, value: f64) -> Option<String> {
        let template = match kind {
            "5k" => "{player} took {value} kills in a single round!",
            "4k" => "{player} had a 4k round.",
            "3k" => "{player} swung a round with three kills.",
            "knifekills" => "{player} got a knife kill!",
            "bombcarrierkills" => "{player} hunted down the bomb carrier.",
            "mvps" => "{player} earned MVP.",
            "adr" => "{player} averaged {value} damage per round.",
            "firstkills" => "{player} opened {value} rounds with the first kill.",
            "cashspent" => "{player} invested big this match.",
            "deaths" => "{player} kept fighting through a rough match.",
            "gimme_10" => "{player} finished under ten kills. Next time!",
            _ => return None,
        };

        Some(
            template
                .replace("{player}", player)
                .replace("{value}", &format_accolade_value(value)),
        )
    }
}

/// Whole numbers print without a fraction, everything else with one decimal.
pub fn format_accolade_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::{format_accolade_value, Line, Phrasebook, TemplatePhrasebook};
    use crate::match_state::Team;

    #[test]
    fn fills_placeholders() {
        let mut phrasebook = TemplatePhrasebook::seeded(1);

        let clutch = phrasebook.render(&Line::Clutch {
            player: "alice".to_string(),
            enemies: 3,
        });
        assert!(clutch.contains("alice"));
        assert!(clutch.contains("1v3"));
        assert!(!clutch.contains('{'));

        let match_point = phrasebook.render(&Line::MatchPoint {
            team: Team::Terrorist,
            ct: 8,
            t: 12,
        });
        assert_eq!(match_point, "Match point for T! (8-12)");
    }

    #[test]
    fn every_clutch_template_names_the_odds() {
        let mut phrasebook = TemplatePhrasebook::seeded(9);
        for _ in 0..20 {
            let text = phrasebook.render(&Line::Clutch {
                player: "bob".to_string(),
                enemies: 4,
            });
            assert!(text.contains("1v4"), "Unexpected clutch text: {text}");
        }
    }

    #[test]
    fn renders_known_accolades_only() {
        let mut phrasebook = TemplatePhrasebook::seeded(3);
        assert_eq!(
            phrasebook.accolade("adr", "carol", 87.34).as_deref(),
            Some("carol averaged 87.3 damage per round.")
        );
        assert!(phrasebook.accolade("chickenk", "carol", 1.0).is_none());
    }

    #[test]
    fn formats_accolade_values() {
        assert_eq!(format_accolade_value(3.0), "3");
        assert_eq!(format_accolade_value(2.54), "2.5");
    }
}
