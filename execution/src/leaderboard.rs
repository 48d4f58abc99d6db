//! Leaderboard ranking. Lower totals rank higher; ties keep insertion order.

use sabirth_types::{Address, Character, LeaderboardEntry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ranked {
    /// 1-based.
    pub rank: usize,
    pub entry: LeaderboardEntry,
}

/// Rank `entries`, optionally keeping only one character's runs.
pub fn rank(entries: &[LeaderboardEntry], character: Option<Character>) -> Vec<Ranked> {
    let mut kept: Vec<&LeaderboardEntry> = entries
        .iter()
        .filter(|entry| character.map_or(true, |c| entry.character == c.index()))
        .collect();
    kept.sort_by_key(|entry| entry.total_score);
    kept.into_iter()
        .enumerate()
        .map(|(index, entry)| Ranked {
            rank: index + 1,
            entry: entry.clone(),
        })
        .collect()
}

/// Rank of the first entry by `player` with `total_score`.
pub fn rank_of(entries: &[LeaderboardEntry], player: &Address, total_score: u64) -> Option<usize> {
    rank(entries, None)
        .into_iter()
        .find(|ranked| &ranked.entry.player == player && ranked.entry.total_score == total_score)
        .map(|ranked| ranked.rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player: &str, character: Character, total_score: u64, timestamp: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            player: Address::new(player),
            character: character.index(),
            total_score,
            timestamp,
        }
    }

    #[test]
    fn test_rank_ascending_and_stable() {
        let entries = vec![
            entry("A", Character::Alice, 300, 1),
            entry("B", Character::Robert, 100, 2),
            entry("C", Character::Carol, 300, 3),
            entry("D", Character::Alice, 200, 4),
        ];
        let ranked = rank(&entries, None);
        let order: Vec<_> = ranked
            .iter()
            .map(|r| (r.rank, r.entry.player.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "B"), (2, "D"), (3, "A"), (4, "C")]);
    }

    #[test]
    fn test_rank_by_character() {
        let entries = vec![
            entry("A", Character::Alice, 300, 1),
            entry("B", Character::Robert, 100, 2),
            entry("D", Character::Alice, 200, 4),
        ];
        let ranked = rank(&entries, Some(Character::Alice));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entry.player.as_str(), "D");
        assert_eq!(ranked[1].rank, 2);
        assert!(rank(&entries, Some(Character::Carol)).is_empty());
    }

    #[test]
    fn test_rank_of() {
        let entries = vec![
            entry("A", Character::Alice, 300, 1),
            entry("B", Character::Robert, 100, 2),
            entry("A", Character::Alice, 50, 3),
        ];
        assert_eq!(rank_of(&entries, &Address::new("A"), 50), Some(1));
        assert_eq!(rank_of(&entries, &Address::new("A"), 300), Some(3));
        assert_eq!(rank_of(&entries, &Address::new("B"), 300), None);
        assert_eq!(rank_of(&[], &Address::new("A"), 0), None);
    }
}
