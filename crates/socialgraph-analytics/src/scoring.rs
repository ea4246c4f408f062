use socialgraph_core::{RelationshipStrength, ScoringConfig, UserId};
use std::collections::HashSet;

/// Deterministic pairwise relationship scoring.
///
/// Each raw input is pushed through the saturating curve `1 - exp(-x/k)`,
/// so the score grows monotonically, approaches 1 without reaching it, and
/// is exactly 0 only when both inputs are 0. The final strength is the
/// weighted blend of the two normalized components.
#[derive(Debug, Clone)]
pub struct RelationshipScorer {
    config: ScoringConfig,
}

impl RelationshipScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Mutual friend count between two neighbor sets. Symmetric by
    /// construction.
    pub fn common_friends(a: &HashSet<UserId>, b: &HashSet<UserId>) -> usize {
        if a.len() <= b.len() {
            a.iter().filter(|u| b.contains(u)).count()
        } else {
            b.iter().filter(|u| a.contains(u)).count()
        }
    }

    fn saturate(x: f64, k: f64) -> f64 {
        1.0 - (-x / k).exp()
    }

    pub fn score(&self, common_friends: usize, interactions: u64) -> RelationshipStrength {
        let mut mutual_weight = self.config.mutual_weight;
        let mut interaction_weight = self.config.interaction_weight;
        let weight_sum = mutual_weight + interaction_weight;
        if weight_sum <= 0.0 {
            mutual_weight = 0.5;
            interaction_weight = 0.5;
        } else {
            mutual_weight /= weight_sum;
            interaction_weight /= weight_sum;
        }

        let mutual_component = Self::saturate(common_friends as f64, self.config.mutual_scale_k);
        let interaction_component =
            Self::saturate(interactions as f64, self.config.interaction_scale_k);

        let strength = (mutual_weight * mutual_component
            + interaction_weight * interaction_component)
            .clamp(0.0, 1.0);

        RelationshipStrength {
            strength,
            common_friends,
            interactions,
        }
    }
}

impl Default for RelationshipScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_iff_both_inputs_zero() {
        let scorer = RelationshipScorer::default();

        assert_eq!(scorer.score(0, 0).strength, 0.0);
        assert!(scorer.score(1, 0).strength > 0.0);
        assert!(scorer.score(0, 1).strength > 0.0);
    }

    #[test]
    fn test_strength_is_bounded() {
        let scorer = RelationshipScorer::default();

        for (common, interactions) in [(0, 0), (1, 1), (50, 10_000), (1_000_000, u64::MAX / 2)] {
            let strength = scorer.score(common, interactions).strength;
            assert!((0.0..=1.0).contains(&strength));
        }

        // The saturating curve approaches 1 without reaching it for inputs
        // where exp(-x/k) is still representable.
        assert!(scorer.score(40, 400).strength < 1.0);
    }

    #[test]
    fn test_monotonic_in_both_inputs() {
        let scorer = RelationshipScorer::default();

        let mut previous = -1.0;
        for common in 0..50 {
            let strength = scorer.score(common, 3).strength;
            assert!(strength > previous);
            previous = strength;
        }

        let mut previous = -1.0;
        for interactions in 0..50 {
            let strength = scorer.score(3, interactions).strength;
            assert!(strength > previous);
            previous = strength;
        }
    }

    #[test]
    fn test_common_friends_is_symmetric() {
        let shared: Vec<UserId> = (0..3).map(|_| UserId::new_v4()).collect();
        let mut a: HashSet<UserId> = shared.iter().copied().collect();
        let mut b: HashSet<UserId> = shared.iter().copied().collect();
        a.insert(UserId::new_v4());
        b.insert(UserId::new_v4());
        b.insert(UserId::new_v4());

        assert_eq!(RelationshipScorer::common_friends(&a, &b), 3);
        assert_eq!(
            RelationshipScorer::common_friends(&a, &b),
            RelationshipScorer::common_friends(&b, &a)
        );
    }

    #[test]
    fn test_equal_weights_blend() {
        let scorer = RelationshipScorer::new(ScoringConfig {
            mutual_scale_k: 1.0,
            interaction_scale_k: 1.0,
            mutual_weight: 1.0,
            interaction_weight: 1.0,
        });

        // With identical scales and weights the blend equals the common
        // saturation value.
        let expected = 1.0 - (-3.0f64).exp();
        assert_relative_eq!(scorer.score(3, 3).strength, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_equal() {
        let scorer = RelationshipScorer::new(ScoringConfig {
            mutual_weight: 0.0,
            interaction_weight: 0.0,
            ..Default::default()
        });
        let strength = scorer.score(5, 5).strength;
        assert!(strength > 0.0 && strength < 1.0);
    }
}
