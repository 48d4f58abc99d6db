//! Common types used throughout SA:BIRTH.
//!
//! Everything here is plain data: the game vocabulary (characters, senses,
//! phases), the records owned by the calibration contract, the static maze
//! layouts and the tuning constants shared by the client and the contract.

pub mod chain;
pub mod constants;
mod game;
pub mod layouts;

pub use chain::{CalibrationSession, ContractError, LeaderboardEntry, SenseResult};
pub use game::{
    score, Address, Character, GamePhase, MazeId, ProofArtifact, Sense, SenseOutcome,
};
pub use layouts::{layout, Direction, MazeLayout, Position};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::{ALL_SENSES_MASK, SENSE_SCORE_CAP};

    #[test]
    fn test_maze_id_encoding() {
        assert_eq!(MazeId::new(Character::Alice, Sense::Hearing).raw(), 0x000);
        assert_eq!(MazeId::new(Character::Robert, Sense::Smell).raw(), 0x101);
        assert_eq!(
            MazeId::new(Character::Carol, Sense::Proprioception).raw(),
            0x205
        );

        let id = MazeId::from_raw(0x104);
        assert_eq!(id.character(), Some(Character::Robert));
        assert_eq!(id.sense(), Some(Sense::Sight));
        assert_eq!(id.to_string(), "0x104");

        assert_eq!(MazeId::from_raw(0x306).character(), None);
        assert_eq!(MazeId::from_raw(0x306).sense(), None);
    }

    #[test]
    fn test_indices_round_trip() {
        for character in Character::ALL {
            assert_eq!(Character::from_index(character.index()), Some(character));
        }
        for sense in Sense::ALL {
            assert_eq!(Sense::from_index(sense.index()), Some(sense));
        }
        assert_eq!(Character::from_index(3), None);
        assert_eq!(Sense::from_index(6), None);
    }

    #[test]
    fn test_sense_bits_cover_mask() {
        let mask = Sense::ALL.iter().fold(0, |acc, sense| acc | sense.bit());
        assert_eq!(mask, ALL_SENSES_MASK);
    }

    #[test]
    fn test_score_formula() {
        assert_eq!(score(40, 12_000), 480_000);
        assert_eq!(score(500, 25_000), 12_500_000);
        assert_eq!(score(u64::MAX, 2), u64::MAX);

        let outcome = SenseOutcome::new(40, 12_000);
        assert_eq!(outcome.score, 480_000);
        assert!(outcome.within_sense_cap());
        assert!(outcome.proof.is_none());

        assert!(!SenseOutcome::new(500, 25_000).within_sense_cap());
        assert!(SenseOutcome::new(1, SENSE_SCORE_CAP).within_sense_cap());
        assert!(!SenseOutcome::new(1, SENSE_SCORE_CAP + 1).within_sense_cap());
    }

    #[test]
    fn test_contract_error_codes() {
        for code in 1..=12 {
            let err = ContractError::from_code(code).expect("known code");
            assert_eq!(err.code(), code);
        }
        assert_eq!(ContractError::from_code(0), None);
        assert_eq!(ContractError::from_code(13), None);
    }

    #[test]
    fn test_session_bitfield_helpers() {
        let session = CalibrationSession {
            player: Address::new("GPLAYER"),
            player2: Address::new("GHOUSE"),
            character: 2,
            completed_senses: Sense::Hearing.bit() | Sense::Sight.bit(),
            total_score: 10,
            session_id: 7,
            player1_points: 1,
            player2_points: 1,
            active: true,
        };
        assert!(session.has_sense(Sense::Sight));
        assert!(!session.has_sense(Sense::Taste));
        assert_eq!(session.completed_count(), 2);
        assert!(!session.all_senses_complete());
        assert_eq!(session.character(), Some(Character::Carol));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&GamePhase::SenseFailure).unwrap(),
            "\"senseFailure\""
        );
        assert_eq!(serde_json::to_string(&Character::Alice).unwrap(), "\"ALICE\"");
        assert_eq!(
            serde_json::to_string(&Sense::Proprioception).unwrap(),
            "\"proprioception\""
        );
        assert_eq!(
            serde_json::to_string(&Address::new("GABC")).unwrap(),
            "\"GABC\""
        );
    }
}
