//! Biologically motivated salience decay model.
//!
//! Blends exponential half-life decay with an Ebbinghaus forgetting curve,
//! then applies long-term potentiation (LTP), recall-frequency boosts, and a
//! diurnal environmental multiplier. The whole module is pure: given the same
//! item state and inactivity, [`decay_salience`] always produces the same
//! result, which is what makes the scheduler's cycles idempotent and
//! auditable.

use chrono::Timelike;

use crate::archive::types::{DecayModifiers, MemoryType};

/// Inactivity below this threshold (15 minutes) leaves salience untouched.
const MIN_DECAY_HOURS: f64 = 0.25;

/// Hours after which the Ebbinghaus blend flattens toward plain decay.
const EBBINGHAUS_FLATTENING_HOURS: f64 = 24.0;

/// Lower bound of the Ebbinghaus modifier.
const EBBINGHAUS_FLOOR: f64 = 0.15;

/// Per-recall half-life extension, capped at [`MAX_RECALL_BOOST`].
const RECALL_BOOST_PER_RECALL: f64 = 0.02;
const MAX_RECALL_BOOST: f64 = 0.30;

/// Decay parameters for one memory type.
#[derive(Debug, Clone, Copy)]
pub struct DecayParams {
    /// Base half-life in hours, before LTP and recall modifiers.
    pub base_half_life_hours: f64,
    /// Salience floor; decay never goes below this.
    pub salience_floor: f64,
}

/// Look up the decay parameters for a memory type.
pub fn params_for(memory_type: MemoryType) -> DecayParams {
    let base_half_life_hours = match memory_type {
        MemoryType::Episodic => 24.0,
        MemoryType::Semantic => 168.0,
        MemoryType::Procedural => 720.0,
        MemoryType::Emotional => 48.0,
        MemoryType::Default => 72.0,
    };
    DecayParams {
        base_half_life_hours,
        salience_floor: memory_type.salience_floor(),
    }
}

/// LTP resistance: how strongly the current salience extends the half-life.
///
/// Stronger memories resist decay. Bands are half-open `[lo, hi)` so a
/// salience sitting exactly on a boundary takes the factor of the band above
/// it (0.8 resists with 2.0, not 1.5).
pub fn resistance_factor(salience: f64) -> f64 {
    if salience < 0.2 {
        0.50
    } else if salience < 0.4 {
        0.75
    } else if salience < 0.6 {
        1.00
    } else if salience < 0.8 {
        1.50
    } else {
        2.00
    }
}

/// Diurnal environmental context modulating decay speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentalContext {
    /// 09:00–17:59 local — active engagement halves decay.
    FocusedLearning,
    /// 18:00–22:59 local — evening activity, mildly slowed decay.
    HighActivity,
    /// 23:00–08:59 local — overnight consolidation window, accelerated decay.
    RestPeriod,
    /// Neutral baseline; selected only by explicit override.
    LowActivity,
}

impl EnvironmentalContext {
    pub fn decay_multiplier(&self) -> f64 {
        match self {
            Self::FocusedLearning => 0.5,
            Self::HighActivity => 0.7,
            Self::RestPeriod => 1.3,
            Self::LowActivity => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FocusedLearning => "focused_learning",
            Self::HighActivity => "high_activity",
            Self::RestPeriod => "rest_period",
            Self::LowActivity => "low_activity",
        }
    }

    /// Select the context for a local wall-clock hour (0–23).
    pub fn for_local_hour(hour: u32) -> Self {
        match hour {
            9..=17 => Self::FocusedLearning,
            18..=22 => Self::HighActivity,
            _ => Self::RestPeriod,
        }
    }

    /// Current context from the local wall clock, unless an override is
    /// configured. No timezone or DST compensation is applied.
    pub fn current(override_context: Option<EnvironmentalContext>) -> Self {
        override_context.unwrap_or_else(|| Self::for_local_hour(chrono::Local::now().hour()))
    }
}

impl std::fmt::Display for EnvironmentalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnvironmentalContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focused_learning" => Ok(Self::FocusedLearning),
            "high_activity" => Ok(Self::HighActivity),
            "rest_period" => Ok(Self::RestPeriod),
            "low_activity" => Ok(Self::LowActivity),
            _ => Err(format!("not an environmental context: {s}")),
        }
    }
}

/// Result of one decay application.
#[derive(Debug, Clone, Copy)]
pub struct DecayOutcome {
    pub new_salience: f64,
    /// `salience − new_salience`; zero when the guard or floor kept the value.
    pub decay_amount: f64,
    /// Modifier values for the audit history.
    pub modifiers: DecayModifiers,
}

/// Compute the decayed salience for an item or fact.
///
/// `hours_since_access` is wall-clock inactivity in hours. The function is
/// idempotent for fixed inputs and never raises salience.
pub fn decay_salience(
    salience: f64,
    hours_since_access: f64,
    memory_type: MemoryType,
    recall_count: i32,
    context: EnvironmentalContext,
) -> DecayOutcome {
    // Under 15 minutes of inactivity: no decay, identity modifiers.
    if hours_since_access < MIN_DECAY_HOURS {
        return DecayOutcome {
            new_salience: salience,
            decay_amount: 0.0,
            modifiers: DecayModifiers::identity(),
        };
    }

    let params = params_for(memory_type);
    let ltp_factor = resistance_factor(salience);
    let recall_boost = (recall_count.max(0) as f64 * RECALL_BOOST_PER_RECALL).min(MAX_RECALL_BOOST);
    let env_multiplier = context.decay_multiplier();

    let effective_half_life =
        params.base_half_life_hours * ltp_factor * (1.0 + recall_boost) / env_multiplier;
    let base_ratio = 0.5f64.powf(hours_since_access / effective_half_life);

    // Ebbinghaus blend: weighted toward the asymptotic forgetting curve for
    // young memories, toward plain exponential decay once inactivity passes
    // the flattening point.
    let tau = hours_since_access / EBBINGHAUS_FLATTENING_HOURS;
    let forget = 0.15 + 0.85 * (-1.5 * tau).exp();
    let curve_weight = (-tau).exp();
    let ebbinghaus = (base_ratio * (1.0 - curve_weight) + forget * curve_weight)
        .max(EBBINGHAUS_FLOOR);

    let new_salience = (salience * ebbinghaus).max(params.salience_floor);

    DecayOutcome {
        new_salience,
        decay_amount: salience - new_salience,
        modifiers: DecayModifiers {
            ltp_factor,
            recall_boost,
            env_multiplier,
            ebbinghaus,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episodic_half_life_at_48h() {
        // S=0.8 episodic, no recalls, 48 h inactivity, neutral context:
        // H_eff = 24 * 2.0 = 48, base ratio 0.5, modifier ≈ 0.458.
        let outcome = decay_salience(
            0.8,
            48.0,
            MemoryType::Episodic,
            0,
            EnvironmentalContext::LowActivity,
        );
        assert!(
            (0.35..=0.40).contains(&outcome.new_salience),
            "expected salience in [0.35, 0.40], got {}",
            outcome.new_salience
        );
        assert!((outcome.modifiers.ltp_factor - 2.0).abs() < 1e-9);
        assert!((outcome.decay_amount - (0.8 - outcome.new_salience)).abs() < 1e-12);
    }

    #[test]
    fn semantic_high_recall_resists_decay() {
        // S=0.7 semantic, 20 recalls, one week idle, focused context:
        // H_eff = 168 * 1.5 * 1.3 / 0.5 = 655.2, so barely any loss.
        let outcome = decay_salience(
            0.7,
            168.0,
            MemoryType::Semantic,
            20,
            EnvironmentalContext::FocusedLearning,
        );
        assert!(
            outcome.new_salience >= 0.58,
            "expected salience >= 0.58, got {}",
            outcome.new_salience
        );
        assert!((outcome.modifiers.recall_boost - 0.30).abs() < 1e-9);
        assert!((outcome.modifiers.env_multiplier - 0.5).abs() < 1e-9);
    }

    #[test]
    fn salience_clamps_to_type_floor() {
        let outcome = decay_salience(
            0.12,
            10_000.0,
            MemoryType::Episodic,
            0,
            EnvironmentalContext::LowActivity,
        );
        assert!((outcome.new_salience - 0.10).abs() < 1e-9);
    }

    #[test]
    fn under_fifteen_minutes_is_untouched() {
        let outcome = decay_salience(
            0.9,
            0.2,
            MemoryType::Episodic,
            0,
            EnvironmentalContext::RestPeriod,
        );
        assert_eq!(outcome.new_salience, 0.9);
        assert_eq!(outcome.decay_amount, 0.0);
        assert_eq!(outcome.modifiers, DecayModifiers::identity());
    }

    #[test]
    fn repeated_cycles_never_raise_salience() {
        // The scheduler reapplies decay as inactivity grows; with no
        // rehearsal in between, salience(t2) <= salience(t1).
        let mut salience = 0.9;
        for hours in [1.0, 6.0, 24.0, 72.0, 168.0, 720.0] {
            let outcome = decay_salience(
                salience,
                hours,
                MemoryType::Semantic,
                3,
                EnvironmentalContext::LowActivity,
            );
            assert!(
                outcome.new_salience <= salience + 1e-12,
                "salience rose at {hours} h: {} -> {}",
                salience,
                outcome.new_salience
            );
            salience = outcome.new_salience;
        }
        assert!(salience >= MemoryType::Semantic.salience_floor() - 1e-12);
    }

    #[test]
    fn decay_never_raises_salience() {
        for &s in &[0.11, 0.3, 0.5, 0.75, 1.0] {
            for &h in &[0.5, 12.0, 100.0, 5_000.0] {
                let outcome = decay_salience(
                    s,
                    h,
                    MemoryType::Default,
                    5,
                    EnvironmentalContext::HighActivity,
                );
                assert!(outcome.new_salience <= s + 1e-12);
                assert!(outcome.decay_amount >= -1e-12);
            }
        }
    }

    #[test]
    fn floors_hold_for_every_type() {
        for t in [
            MemoryType::Episodic,
            MemoryType::Semantic,
            MemoryType::Procedural,
            MemoryType::Emotional,
            MemoryType::Default,
        ] {
            let outcome =
                decay_salience(1.0, 50_000.0, t, 0, EnvironmentalContext::RestPeriod);
            assert!(
                outcome.new_salience >= t.salience_floor() - 1e-12,
                "{t} fell below its floor"
            );
        }
    }

    #[test]
    fn stronger_memories_lose_a_smaller_fraction() {
        // LTP ordering: over 72 h the decay fraction at S=0.9 is smaller
        // than at S=0.3.
        let high = decay_salience(
            0.9,
            72.0,
            MemoryType::Default,
            0,
            EnvironmentalContext::LowActivity,
        );
        let low = decay_salience(
            0.3,
            72.0,
            MemoryType::Default,
            0,
            EnvironmentalContext::LowActivity,
        );
        let high_fraction = high.decay_amount / 0.9;
        let low_fraction = low.decay_amount / 0.3;
        assert!(
            high_fraction < low_fraction,
            "high-salience fraction {high_fraction} not below {low_fraction}"
        );
    }

    #[test]
    fn resistance_band_boundaries_take_the_larger_factor() {
        assert_eq!(resistance_factor(0.19), 0.50);
        assert_eq!(resistance_factor(0.2), 0.75);
        assert_eq!(resistance_factor(0.4), 1.00);
        assert_eq!(resistance_factor(0.6), 1.50);
        assert_eq!(resistance_factor(0.8), 2.00);
        assert_eq!(resistance_factor(1.0), 2.00);
    }

    #[test]
    fn recall_boost_caps_at_thirty_percent() {
        let outcome = decay_salience(
            0.5,
            24.0,
            MemoryType::Default,
            1_000,
            EnvironmentalContext::LowActivity,
        );
        assert!((outcome.modifiers.recall_boost - 0.30).abs() < 1e-12);
    }

    #[test]
    fn context_selection_follows_the_clock() {
        assert_eq!(
            EnvironmentalContext::for_local_hour(9),
            EnvironmentalContext::FocusedLearning
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(17),
            EnvironmentalContext::FocusedLearning
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(18),
            EnvironmentalContext::HighActivity
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(22),
            EnvironmentalContext::HighActivity
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(23),
            EnvironmentalContext::RestPeriod
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(3),
            EnvironmentalContext::RestPeriod
        );
        assert_eq!(
            EnvironmentalContext::for_local_hour(8),
            EnvironmentalContext::RestPeriod
        );
    }

    #[test]
    fn context_override_wins_over_the_clock() {
        assert_eq!(
            EnvironmentalContext::current(Some(EnvironmentalContext::LowActivity)),
            EnvironmentalContext::LowActivity
        );
    }

    #[test]
    fn ebbinghaus_modifier_never_drops_below_floor() {
        // Very long inactivity drives base ratio toward zero, but the blend
        // is floored at 0.15.
        let outcome = decay_salience(
            1.0,
            100_000.0,
            MemoryType::Procedural,
            0,
            EnvironmentalContext::RestPeriod,
        );
        assert!(outcome.modifiers.ebbinghaus >= EBBINGHAUS_FLOOR - 1e-12);
    }

    #[test]
    fn rest_period_decays_faster_than_focused() {
        let rest = decay_salience(
            0.8,
            24.0,
            MemoryType::Semantic,
            0,
            EnvironmentalContext::RestPeriod,
        );
        let focused = decay_salience(
            0.8,
            24.0,
            MemoryType::Semantic,
            0,
            EnvironmentalContext::FocusedLearning,
        );
        assert!(rest.new_salience < focused.new_salience);
    }

    #[test]
    fn repeated_application_with_same_inputs_is_stable() {
        let first = decay_salience(
            0.6,
            36.0,
            MemoryType::Emotional,
            2,
            EnvironmentalContext::HighActivity,
        );
        let second = decay_salience(
            0.6,
            36.0,
            MemoryType::Emotional,
            2,
            EnvironmentalContext::HighActivity,
        );
        assert_eq!(first.new_salience, second.new_salience);
        assert_eq!(first.modifiers, second.modifiers);
    }
}
