use socialgraph_core::{Circle, CircleConfig, CircleKind, UserId};

/// Partitions a user's direct friends into strength-tier circles.
///
/// Result order is fixed display priority (close, distant, other), and
/// empty circles are omitted. Every friend lands in exactly one circle.
#[derive(Debug, Clone)]
pub struct CircleClassifier {
    config: CircleConfig,
}

impl CircleClassifier {
    pub fn new(config: CircleConfig) -> Self {
        Self { config }
    }

    pub fn tier(&self, strength: f64) -> CircleKind {
        if strength >= self.config.close_threshold {
            CircleKind::Close
        } else if strength >= self.config.distant_threshold {
            CircleKind::Distant
        } else {
            CircleKind::Other
        }
    }

    /// Group scored friends into circles, preserving the input order inside
    /// each circle.
    pub fn classify(&self, scored_friends: &[(UserId, f64)]) -> Vec<Circle> {
        let mut close = Vec::new();
        let mut distant = Vec::new();
        let mut other = Vec::new();

        for (friend, strength) in scored_friends {
            match self.tier(*strength) {
                CircleKind::Close => close.push(*friend),
                CircleKind::Distant => distant.push(*friend),
                CircleKind::Other => other.push(*friend),
            }
        }

        [
            (CircleKind::Close, close),
            (CircleKind::Distant, distant),
            (CircleKind::Other, other),
        ]
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .map(|(kind, members)| Circle {
            kind,
            size: members.len(),
            members,
        })
        .collect()
    }
}

impl Default for CircleClassifier {
    fn default() -> Self {
        Self::new(CircleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_threshold_boundaries() {
        let classifier = CircleClassifier::default();

        assert_eq!(classifier.tier(0.6), CircleKind::Close);
        assert_eq!(classifier.tier(0.59), CircleKind::Distant);
        assert_eq!(classifier.tier(0.25), CircleKind::Distant);
        assert_eq!(classifier.tier(0.24), CircleKind::Other);
        assert_eq!(classifier.tier(0.0), CircleKind::Other);
    }

    #[test]
    fn test_partition_is_exact() {
        let classifier = CircleClassifier::default();
        let scored: Vec<(UserId, f64)> = [0.9, 0.7, 0.4, 0.1, 0.3]
            .iter()
            .map(|s| (UserId::new_v4(), *s))
            .collect();

        let circles = classifier.classify(&scored);

        let all_members: Vec<UserId> = circles
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .collect();
        let unique: HashSet<UserId> = all_members.iter().copied().collect();
        let input: HashSet<UserId> = scored.iter().map(|(u, _)| *u).collect();

        assert_eq!(all_members.len(), scored.len());
        assert_eq!(unique, input);
        for circle in &circles {
            assert_eq!(circle.size, circle.members.len());
        }
    }

    #[test]
    fn test_fixed_display_order() {
        let classifier = CircleClassifier::default();
        // One close friend against four distant: order stays close, distant.
        let scored: Vec<(UserId, f64)> = [0.3, 0.3, 0.3, 0.9, 0.3]
            .iter()
            .map(|s| (UserId::new_v4(), *s))
            .collect();

        let circles = classifier.classify(&scored);
        let kinds: Vec<CircleKind> = circles.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CircleKind::Close, CircleKind::Distant]);
        assert_eq!(circles[1].size, 4);
    }

    #[test]
    fn test_empty_circles_are_omitted() {
        let classifier = CircleClassifier::default();

        let circles = classifier.classify(&[(UserId::new_v4(), 0.8)]);
        assert_eq!(circles.len(), 1);
        assert_eq!(circles[0].kind, CircleKind::Close);

        assert!(classifier.classify(&[]).is_empty());
    }
}
