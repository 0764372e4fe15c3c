//! Weighted ranking engine.

use super::types::{Reward, RewardKind};
use crate::csp::Solution;
use crate::error::InvalidRewardSpec;

/// A solution with its composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSolution {
    /// Weighted sum of reward values. Higher is better.
    pub score: f64,
    /// Position of the solution in the input sequence.
    pub index: usize,
    pub solution: Solution,
}

/// A reward paired with its weight.
struct WeightedReward {
    reward: Box<dyn Reward>,
    weight: f64,
}

/// Engine for composing rewards and ranking timetables.
///
/// # Examples
///
/// ```
/// use u_timetable::ranking::{Ranker, RewardKind};
///
/// let ranker = Ranker::new()
///     .with_reward(RewardKind::EarlyClassPenalty { threshold: "09:00".parse().unwrap() }, 1.0)
///     .with_reward(RewardKind::LongDayPenalty { max_hours: 6.0 }, 0.5);
///
/// assert_eq!(ranker.reward_names(), vec!["early_class", "long_day"]);
/// let ranked = ranker.rank(Vec::new()).unwrap();
/// assert!(ranked.is_empty());
/// ```
#[derive(Default)]
pub struct Ranker {
    rewards: Vec<WeightedReward>,
}

impl Ranker {
    /// Creates a ranker with no rewards; every solution scores 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ranker over built-in rewards.
    pub fn from_kinds(rewards: &[(RewardKind, f64)]) -> Self {
        rewards
            .iter()
            .fold(Self::new(), |ranker, (kind, weight)| {
                ranker.with_reward(kind.clone(), *weight)
            })
    }

    /// Adds a reward with the given weight.
    pub fn with_reward<R: Reward + 'static>(mut self, reward: R, weight: f64) -> Self {
        self.rewards.push(WeightedReward {
            reward: Box::new(reward),
            weight,
        });
        self
    }

    /// Returns the number of rewards in this ranker.
    pub fn reward_count(&self) -> usize {
        self.rewards.len()
    }

    /// Returns the names of all rewards in order.
    pub fn reward_names(&self) -> Vec<&str> {
        self.rewards.iter().map(|wr| wr.reward.name()).collect()
    }

    /// Checks every weight and reward parameter.
    pub fn validate(&self) -> Result<(), InvalidRewardSpec> {
        for wr in &self.rewards {
            if !wr.weight.is_finite() {
                return Err(InvalidRewardSpec::NonFiniteWeight {
                    kind: wr.reward.name().to_string(),
                    weight: wr.weight,
                });
            }
            wr.reward.validate()?;
        }
        Ok(())
    }

    /// Composite score of one solution. Zero-weight rewards are not
    /// evaluated.
    pub fn score(&self, solution: &Solution) -> f64 {
        self.rewards
            .iter()
            .filter(|wr| wr.weight != 0.0)
            .map(|wr| wr.weight * wr.reward.value(solution))
            .fold(0.0, |total, value| total + value)
    }

    /// Like [`Ranker::score`], but fails on the first weighted reward value
    /// that is not finite.
    fn checked_score(&self, index: usize, solution: &Solution) -> Result<f64, InvalidRewardSpec> {
        let mut total = 0.0;
        for wr in self.rewards.iter().filter(|wr| wr.weight != 0.0) {
            let value = wr.weight * wr.reward.value(solution);
            if !value.is_finite() {
                return Err(InvalidRewardSpec::NonFiniteScore {
                    kind: wr.reward.name().to_string(),
                    index,
                    value,
                });
            }
            total += value;
        }
        Ok(total)
    }

    /// Scores and orders `solutions`, best first.
    ///
    /// The sort is stable: equal scores keep their input order. A reward
    /// that scores any solution as NaN or infinite is an error.
    pub fn rank<I>(&self, solutions: I) -> Result<Vec<RankedSolution>, InvalidRewardSpec>
    where
        I: IntoIterator<Item = Solution>,
    {
        self.validate()?;

        let mut ranked: Vec<RankedSolution> = solutions
            .into_iter()
            .enumerate()
            .map(|(index, solution)| {
                Ok(RankedSolution {
                    score: self.checked_score(index, &solution)?,
                    index,
                    solution,
                })
            })
            .collect::<Result<_, InvalidRewardSpec>>()?;

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

/// Ranks solutions by weighted built-in rewards.
pub fn rank<I>(solutions: I, rewards: &[(RewardKind, f64)]) -> Result<Vec<RankedSolution>, InvalidRewardSpec>
where
    I: IntoIterator<Item = Solution>,
{
    Ranker::from_kinds(rewards).rank(solutions)
}

/// Ranks solutions by weighted textual reward keys such as
/// `"early_class@09:00"`.
///
/// # Errors
/// [`InvalidRewardSpec::UnknownKind`] for an unrecognised key, or the first
/// invalid parameter or weight; nothing is scored in that case.
pub fn rank_by_keys<I>(solutions: I, rewards: &[(&str, f64)]) -> Result<Vec<RankedSolution>, InvalidRewardSpec>
where
    I: IntoIterator<Item = Solution>,
{
    let kinds = rewards
        .iter()
        .map(|&(key, weight)| Ok((key.parse::<RewardKind>()?, weight)))
        .collect::<Result<Vec<_>, InvalidRewardSpec>>()?;
    rank(solutions, &kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::testing::session;
    use crate::csp::{SelectedSession, Session, VariableId};
    use crate::models::Weekday;
    use proptest::prelude::*;

    fn timetable(sessions: Vec<Session>) -> Solution {
        Solution::new(
            sessions
                .into_iter()
                .enumerate()
                .map(|(i, session)| SelectedSession {
                    variable: VariableId::new(format!("C{i}"), "TUT1"),
                    session,
                })
                .collect(),
        )
    }

    fn early() -> Solution {
        timetable(vec![session(Weekday::Mon, "08:00", "09:00")])
    }

    fn late() -> Solution {
        timetable(vec![session(Weekday::Mon, "10:00", "11:00")])
    }

    fn friday() -> Solution {
        timetable(vec![session(Weekday::Fri, "10:00", "11:00")])
    }

    struct NoFriday;

    impl Reward for NoFriday {
        fn name(&self) -> &str {
            "no_friday"
        }
        fn value(&self, solution: &Solution) -> f64 {
            -(solution.sessions_on(Weekday::Fri).len() as f64)
        }
    }

    #[test]
    fn test_descending_by_score() {
        let ranked = rank_by_keys(vec![early(), late()], &[("early_class@09:00", 1.0)]).unwrap();
        assert_eq!(ranked[0].index, 1);
        assert_eq!(ranked[0].score, 0.0);
        assert_eq!(ranked[1].index, 0);
        assert_eq!(ranked[1].score, -60.0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let solutions = vec![late(), friday(), late()];
        let ranked = rank_by_keys(solutions.clone(), &[("early_class@09:00", 1.0)]).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1, 2]);

        let again = rank_by_keys(solutions, &[("early_class@09:00", 1.0)]).unwrap();
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_custom_reward() {
        let ranker = Ranker::new()
            .with_reward(NoFriday, 2.0)
            .with_reward(RewardKind::EarlyClassPenalty { threshold: "09:00".parse().unwrap() }, 0.1);
        assert_eq!(ranker.reward_count(), 2);

        let ranked = ranker.rank(vec![friday(), early(), late()]).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        // late: 0, early: -6, friday: -2
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn test_no_rewards_preserves_order() {
        let ranked = Ranker::new().rank(vec![early(), late()]).unwrap();
        assert!(ranked.iter().all(|r| r.score == 0.0));
        assert_eq!(ranked[0].index, 0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = rank_by_keys(vec![early()], &[("early_class@09:00", 1.0), ("commute", 1.0)])
            .unwrap_err();
        assert_eq!(
            err,
            InvalidRewardSpec::UnknownKind {
                kind: "commute".into()
            }
        );
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let err = rank(
            vec![early()],
            &[(RewardKind::LongDayPenalty { max_hours: 8.0 }, f64::NAN)],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidRewardSpec::NonFiniteWeight { .. }));
        assert_eq!(err.kind(), "long_day");
    }

    struct EvenHoursUndefined;

    impl Reward for EvenHoursUndefined {
        fn name(&self) -> &str {
            "even_hours"
        }
        fn value(&self, solution: &Solution) -> f64 {
            let even = solution
                .sessions()
                .any(|s| (s.start.minutes() / 60) % 2 == 0);
            if even {
                f64::NAN
            } else {
                -1.0
            }
        }
    }

    #[test]
    fn test_nan_reward_is_an_error() {
        let solutions: Vec<Solution> = (0..90)
            .map(|i| {
                let hour = 7 + i % 10;
                timetable(vec![session(
                    Weekday::ALL[i % 5],
                    &format!("{hour:02}:00"),
                    &format!("{:02}:00", hour + 1),
                )])
            })
            .collect();

        let err = Ranker::new()
            .with_reward(EvenHoursUndefined, 1.0)
            .rank(solutions)
            .unwrap_err();
        assert_eq!(err.kind(), "even_hours");
        assert!(matches!(err, InvalidRewardSpec::NonFiniteScore { index: 1, .. }));
    }

    #[test]
    fn test_overflowing_weight_is_an_error() {
        let err = rank(
            vec![late(), early()],
            &[
                (RewardKind::EarlyClassPenalty { threshold: "09:00".parse().unwrap() }, 1e308),
                (RewardKind::LongDayPenalty { max_hours: 0.5 }, -1e308),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidRewardSpec::NonFiniteScore { .. }));
    }

    #[test]
    fn test_invalid_parameter_rejected_before_scoring() {
        let err = rank(
            Vec::new(),
            &[(RewardKind::LongDayPenalty { max_hours: -2.0 }, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, InvalidRewardSpec::InvalidParameter { .. }));
    }

    fn arb_solution() -> impl Strategy<Value = Solution> {
        prop::collection::vec((0usize..5, 7u16..18, 1u16..3), 1..6).prop_map(|picks| {
            timetable(
                picks
                    .into_iter()
                    .map(|(day, hour, len)| {
                        session(
                            Weekday::ALL[day],
                            &format!("{hour:02}:00"),
                            &format!("{:02}:00", hour + len),
                        )
                    })
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_zero_weight_is_neutral(solutions in prop::collection::vec(arb_solution(), 0..8)) {
            let base = [(RewardKind::EarlyClassPenalty { threshold: "09:30".parse().unwrap() }, 1.0)];
            let with_zero = [
                base[0].clone(),
                (RewardKind::GapPenalty { min_gap_minutes: 0, max_idle_minutes: 0 }, 0.0),
                (RewardKind::LongDayPenalty { max_hours: 1.0 }, 0.0),
            ];
            let a = rank(solutions.clone(), &base).unwrap();
            let b = rank(solutions, &with_zero).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_ranking_is_sorted_and_deterministic(solutions in prop::collection::vec(arb_solution(), 0..8)) {
            let rewards = [
                (RewardKind::GapPenalty { min_gap_minutes: 10, max_idle_minutes: 60 }, 1.0),
                (RewardKind::ExclusionWindowPenalty {
                    day: Weekday::Mon,
                    start: "12:00".parse().unwrap(),
                    end: "14:00".parse().unwrap(),
                }, 30.0),
            ];
            let a = rank(solutions.clone(), &rewards).unwrap();
            prop_assert!(a.windows(2).all(|w| w[0].score >= w[1].score));
            prop_assert!(a.windows(2).all(|w| w[0].score != w[1].score || w[0].index < w[1].index));
            prop_assert_eq!(a, rank(solutions, &rewards).unwrap());
        }
    }
}
