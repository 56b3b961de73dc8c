#![no_main]
use libfuzzer_sys::fuzz_target;
use playout::chess::Game;
use playout::environment::Environment;
use playout::mcts::{find_best_move, Config};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(game) = Game::from_fen(input) else {
        return;
    };
    // Parsed positions survive serialization.
    let reparsed = Game::from_fen(&game.fen()).expect("serialized position should be valid");
    assert_eq!(reparsed.fen(), game.fen());

    let config = Config::default().with_cycles(2).with_seed(Some(0));
    let result = find_best_move(game.clone(), &config).expect("root moves fit into the pool");
    match result.best_move {
        Some(best_move) => assert!(game.actions().contains(&best_move)),
        None => assert!(game.actions().is_empty()),
    }
});
