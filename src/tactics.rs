use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use crate::match_state::{Team, DEFAULT_MAP};

const FALLBACK_TACTIC: &str = "No plan on file for this map. Call a team meeting!";

struct MapTactics {
    ct: &'static [&'static str],
    terrorist: &'static [&'static str],
}

lazy_static! {
    static ref TACTICS: HashMap<&'static str, MapTactics> = HashMap::from([
        (
            "de_dust2",
            MapTactics {
                ct: &[
                    "Two long, two B, one mid. Balanced hold.",
                    "Hide one in B tunnels and punish the rush.",
                    "Smoke short and push one for early info.",
                    "Stack B with three and wait for the rush.",
                    "Mid AWP for an opening pick.",
                ],
                terrorist: &[
                    "B rush, don't forget the smokes!",
                    "Slow long A take, wait for CT to get lazy.",
                    "Split CT from mid and hit both sites.",
                    "Smoke short and jiggle for info.",
                    "Make noise on one site, then rotate to the other.",
                ],
            },
        ),
        (
            "de_inferno",
            MapTactics {
                ct: &[
                    "Two banana, three A. Win the first fight.",
                    "Lurk one in apartments for a surprise.",
                    "Molly banana and push for info.",
                    "Long A AWP for the opening pick.",
                    "Three on B, expect the rush.",
                ],
                terrorist: &[
                    "Take banana control, then B rush.",
                    "Quiet apartments push to break A.",
                    "Smoke mid and go through arch to flank.",
                    "Fake A, then swing to B through banana.",
                    "Jiggle apartments for info, then commit.",
                ],
            },
        ),
        (
            "de_ancient",
            MapTactics {
                ct: &[
                    "Mid control is everything. One player peeks mid.",
                    "Smoke B long and push for info.",
                    "Three A, two B, and play for info.",
                    "Mid AWP for the opening pick.",
                    "Flash A main from CT spawn and push.",
                ],
                terrorist: &[
                    "Smoke and flash A main, then go.",
                    "Take mid, then split to B.",
                    "Slow B long, look for a flank.",
                    "Fake A, then switch to B through mid.",
                    "Smoke off CT and wrap A site.",
                ],
            },
        ),
        (
            "de_mirage",
            MapTactics {
                ct: &[
                    "One mid, two A, two B. The classic setup.",
                    "Hold connector and jungle to own the map.",
                    "Lurk one in B apartments for a flank.",
                    "Two on ramp and palace for the A rush.",
                    "Mid AWP, take a pick and fall back.",
                ],
                terrorist: &[
                    "Execute A with palace and ramp together.",
                    "Take mid, split through connector.",
                    "B apartments rush, fast and loud.",
                    "Default, then hit the weaker site late.",
                    "Fake B, then execute A with full utility.",
                ],
            },
        ),
        (
            "default",
            MapTactics {
                ct: &[
                    "Play for info and rotate fast.",
                    "Stack the site they hit last round.",
                ],
                terrorist: &[
                    "Default, then group up for a late hit.",
                    "Fast execute with all the utility.",
                ],
            },
        ),
    ]);
}

/// Canonical `de_*` map key: lower-cased, workshop path dropped, prefix added.
pub fn normalize_map_name(map_name: &str) -> String {
    let trimmed = map_name.trim();
    if trimmed.is_empty() {
        return DEFAULT_MAP.to_string();
    }

    let lowered = trimmed.to_ascii_lowercase();
    let key = if lowered.starts_with("workshop/") {
        lowered.rsplit('/').next().unwrap_or_default().to_string()
    } else {
        lowered
    };

    if key.starts_with("de_") {
        key
    } else {
        format!("de_{key}")
    }
}

/// Random tip for `team` on `map_name`, falling back to generic tips for
/// maps without their own table.
pub fn get_tactic<R: Rng + ?Sized>(team: Team, map_name: &str, rng: &mut R) -> &'static str {
    let map_key = normalize_map_name(map_name);
    let Some(tactics) = TACTICS
        .get(map_key.as_str())
        .or_else(|| TACTICS.get("default"))
    else {
        return FALLBACK_TACTIC;
    };

    let tips = match team {
        Team::Ct => tactics.ct,
        Team::Terrorist => tactics.terrorist,
        _ => return FALLBACK_TACTIC,
    };
    tips.choose(rng).copied().unwrap_or(FALLBACK_TACTIC)
}

#[cfg(test)]
mod tests {
    use super::{get_tactic, normalize_map_name, FALLBACK_TACTIC};
    use crate::match_state::Team;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn normalizes_map_names() {
        assert_eq!(normalize_map_name("de_Mirage"), "de_mirage");
        assert_eq!(normalize_map_name("inferno"), "de_inferno");
        assert_eq!(normalize_map_name("workshop/123456/de_anubis"), "de_anubis");
        assert_eq!(normalize_map_name("  "), "de_dust2");
    }

    #[test]
    fn picks_side_specific_tips_with_fallbacks() {
        let mut rng = StdRng::seed_from_u64(5);
        let tip = get_tactic(Team::Ct, "mirage", &mut rng);
        assert_ne!(tip, FALLBACK_TACTIC);

        let unknown_map_tip = get_tactic(Team::Terrorist, "cs_office", &mut rng);
        assert_ne!(unknown_map_tip, FALLBACK_TACTIC);

        assert_eq!(get_tactic(Team::Spectator, "mirage", &mut rng), FALLBACK_TACTIC);
    }
}
