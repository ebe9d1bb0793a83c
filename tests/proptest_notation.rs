use proptest::prelude::*;
use scoresheet2pgn::notation::normalize_token;
use scoresheet2pgn::{
    normalize_text, validate_game, CorrectionConfig, Language, MoveStatus, NotationTables,
};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn normalizing_twice_changes_nothing(token in proptest_helpers::arb_move_token()) {
        let tables = NotationTables::builtin();
        let english = tables.get(Language::English).expect("english table");
        let once = normalize_token(&token, english);
        let twice = normalize_token(&once, english);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn legal_games_replay_without_corrections(game in proptest_helpers::arb_legal_game(60)) {
        let tables = NotationTables::builtin();
        let candidates = normalize_text(&game.to_text(), Language::English, &tables);
        let validation = validate_game(&candidates, &CorrectionConfig::default())
            .expect("legal game is consistent");

        let sans: Vec<&str> = validation
            .moves()
            .map(|m| m.normalized_notation.as_str())
            .collect();
        prop_assert_eq!(sans, game.sans());
        prop_assert!(validation.moves().all(|m| m.status == MoveStatus::Valid));
        prop_assert_eq!(validation.final_fen, game.final_fen);
    }
}
