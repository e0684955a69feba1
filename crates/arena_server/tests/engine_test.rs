//! Session engine behavior against scripted oracles and stores.

use arena_board::{Board, Mark, Position, Square, Winner};
use arena_server::{
    ALREADY_OVER_MESSAGE, CompletedGame, CompletedGameStore, EngineError, InMemorySessionStore,
    MemoryGameStore, MoveOracle, MoveSource, NewCompletedGame, OfflineSource, SessionEngine,
    SessionStatus, SourceError, StoreError,
};
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Boards and marks the oracle was asked about, in call order.
type Requests = Arc<Mutex<Vec<(Board, Mark)>>>;

/// Replies with queued text, then reports itself unavailable.
struct ScriptedSource {
    replies: Mutex<VecDeque<String>>,
    calls: Arc<AtomicUsize>,
    requests: Requests,
}

impl ScriptedSource {
    fn new(moves: &[(usize, usize)]) -> (Self, Arc<AtomicUsize>) {
        let (source, calls, _) = Self::recording(moves);
        (source, calls)
    }

    fn recording(moves: &[(usize, usize)]) -> (Self, Arc<AtomicUsize>, Requests) {
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Requests::default();
        let replies = moves
            .iter()
            .map(|(row, col)| format!(r#"{{"row": {}, "col": {}}}"#, row, col))
            .collect();
        (
            Self {
                replies: Mutex::new(replies),
                calls: Arc::clone(&calls),
                requests: Arc::clone(&requests),
            },
            calls,
            requests,
        )
    }
}

#[async_trait]
impl MoveSource for ScriptedSource {
    async fn suggest(&self, board: &Board, mark: Mark) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((board.clone(), mark));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(SourceError::Unavailable)
    }
}

/// Never answers within any reasonable timeout.
struct StalledSource;

#[async_trait]
impl MoveSource for StalledSource {
    async fn suggest(&self, _board: &Board, _mark: Mark) -> Result<String, SourceError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(r#"{"row": 0, "col": 0}"#.to_string())
    }
}

/// Store that rejects every write.
struct BrokenStore;

#[async_trait]
impl CompletedGameStore for BrokenStore {
    async fn record(&self, _game: NewCompletedGame) -> Result<CompletedGame, StoreError> {
        Err(StoreError::new("disk full"))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<CompletedGame>, StoreError> {
        Err(StoreError::new("disk full"))
    }
}

/// Store whose writes never complete.
struct HangingStore;

#[async_trait]
impl CompletedGameStore for HangingStore {
    async fn record(&self, _game: NewCompletedGame) -> Result<CompletedGame, StoreError> {
        std::future::pending().await
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<CompletedGame>, StoreError> {
        Ok(Vec::new())
    }
}

/// Waits for background writes to land in the store.
async fn wait_for_games(store: &MemoryGameStore, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while store.len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("completed games were not recorded");
}

fn engine_with(
    source: impl MoveSource + 'static,
    store: Arc<dyn CompletedGameStore>,
) -> SessionEngine {
    let oracle = MoveOracle::with_rng(source, Duration::from_millis(50), StdRng::seed_from_u64(7));
    SessionEngine::new(Arc::new(InMemorySessionStore::new()), Arc::new(oracle), store)
}

fn snapshot(rows: &[&str], current: &str) -> arena_board::RawSnapshot {
    let board: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|c| match c {
                    'X' => serde_json::json!("X"),
                    'O' => serde_json::json!("O"),
                    _ => serde_json::Value::Null,
                })
                .collect()
        })
        .collect();
    arena_board::RawSnapshot::new(serde_json::json!(board), current, rows.len() as i64)
}

#[tokio::test]
async fn test_create_defaults_to_x() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    let view = engine.create(None, 3).unwrap();

    assert_eq!(view.human_mark, Mark::X);
    assert_eq!(view.opponent_mark, Mark::O);
    assert_eq!(view.active_mark, Mark::X);
    assert_eq!(view.status, SessionStatus::Ongoing);
    assert_eq!(view.grid_size, 3);
    assert_eq!(view.board.occupied_count(), 0);
}

#[tokio::test]
async fn test_create_with_requested_mark() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    let view = engine.create(Some(Mark::O), 7).unwrap();

    assert_eq!(view.human_mark, Mark::O);
    assert_eq!(view.opponent_mark, Mark::X);
    assert_eq!(view.active_mark, Mark::O);
    assert_eq!(view.board.size(), 7);
}

#[tokio::test]
async fn test_create_rejects_unsupported_sizes() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    for size in [-1, 0, 2, 11] {
        assert_eq!(
            engine.create(None, size),
            Err(EngineError::InvalidConfiguration(size))
        );
    }
}

#[tokio::test]
async fn test_suggested_move_is_used() {
    let (source, calls, requests) = ScriptedSource::recording(&[(1, 1)]);
    let engine = engine_with(source, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 3).unwrap();

    let view = engine
        .apply_human_move(&game.game_id, Position::new(0, 0))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let requests = requests.lock().unwrap();
    let (asked_board, asked_mark) = &requests[0];
    assert_eq!(*asked_mark, Mark::O, "oracle plays the opponent's mark");
    assert_eq!(asked_board.get(Position::new(0, 0)), Some(Square::Occupied(Mark::X)));
    assert_eq!(asked_board.occupied_count(), 1, "oracle sees the human move only");
    assert_eq!(view.board.get(Position::new(0, 0)), Some(Square::Occupied(Mark::X)));
    assert_eq!(view.board.get(Position::new(1, 1)), Some(Square::Occupied(Mark::O)));
    assert_eq!(view.last_opponent_move, Some(Position::new(1, 1)));
    assert_eq!(view.active_mark, Mark::X);
    assert_eq!(view.status, SessionStatus::Ongoing);
}

#[tokio::test]
async fn test_occupied_suggestion_falls_back() {
    let (source, _) = ScriptedSource::new(&[(0, 0)]);
    let engine = engine_with(source, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 3).unwrap();

    let view = engine
        .apply_human_move(&game.game_id, Position::new(0, 0))
        .await
        .unwrap();

    assert_eq!(view.board.get(Position::new(0, 0)), Some(Square::Occupied(Mark::X)));
    assert_eq!(view.board.occupied_count(), 2);
    let reply = view.last_opponent_move.unwrap();
    assert_ne!(reply, Position::new(0, 0));
    assert_eq!(view.board.get(reply), Some(Square::Occupied(Mark::O)));
    assert_eq!(view.active_mark, Mark::X);
}

#[tokio::test]
async fn test_out_of_bounds_suggestion_falls_back() {
    let (source, _) = ScriptedSource::new(&[(3, 9)]);
    let engine = engine_with(source, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 3).unwrap();

    let view = engine
        .apply_human_move(&game.game_id, Position::new(2, 2))
        .await
        .unwrap();

    let reply = view.last_opponent_move.unwrap();
    assert!(reply.in_bounds(3));
    assert_eq!(view.board.occupied_count(), 2);
}

#[tokio::test]
async fn test_stalled_source_times_out_to_fallback() {
    let engine = engine_with(StalledSource, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 4).unwrap();

    let view = tokio::time::timeout(
        Duration::from_secs(5),
        engine.apply_human_move(&game.game_id, Position::new(0, 0)),
    )
    .await
    .expect("engine must not wait on a stalled source")
    .unwrap();

    assert_eq!(view.board.occupied_count(), 2);
    assert_eq!(view.status, SessionStatus::Ongoing);
}

#[tokio::test]
async fn test_human_win_is_recorded_once() {
    let (source, calls) = ScriptedSource::new(&[(1, 0), (1, 1)]);
    let store = MemoryGameStore::new();
    let engine = engine_with(source, Arc::new(store.clone()));
    let game = engine.create(None, 3).unwrap();

    engine
        .apply_human_move(&game.game_id, Position::new(0, 0))
        .await
        .unwrap();
    engine
        .apply_human_move(&game.game_id, Position::new(0, 1))
        .await
        .unwrap();
    let view = engine
        .apply_human_move(&game.game_id, Position::new(0, 2))
        .await
        .unwrap();

    assert_eq!(view.status, SessionStatus::HumanWin);
    assert_eq!(view.winner, Some(Winner::X));
    assert_eq!(
        view.winning_line.as_ref().unwrap().positions(),
        &[Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)]
    );
    assert_eq!(view.last_opponent_move, None);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "oracle not consulted after the win");

    wait_for_games(&store, 1).await;
    let games = store.games();
    assert_eq!(games.len(), 1);
    assert_eq!(*games[0].winner(), Winner::X);
    assert_eq!(*games[0].grid_size(), 3);
    assert_eq!(games[0].final_board(), &view.board);
}

#[tokio::test]
async fn test_moves_after_finish_are_idempotent() {
    let (source, _) = ScriptedSource::new(&[(1, 0), (1, 1)]);
    let store = MemoryGameStore::new();
    let engine = engine_with(source, Arc::new(store.clone()));
    let game = engine.create(None, 3).unwrap();

    for col in 0..3 {
        engine
            .apply_human_move(&game.game_id, Position::new(0, col))
            .await
            .unwrap();
    }
    let finished = engine.get_session(&game.game_id).await.unwrap();
    wait_for_games(&store, 1).await;

    let again = engine
        .apply_human_move(&game.game_id, Position::new(2, 2))
        .await
        .unwrap();

    assert_eq!(again.message.as_deref(), Some(ALREADY_OVER_MESSAGE));
    assert_eq!(again.board, finished.board);
    assert_eq!(again.status, SessionStatus::HumanWin);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_opponent_win() {
    let (source, _) = ScriptedSource::new(&[(1, 0), (1, 1), (1, 2)]);
    let store = MemoryGameStore::new();
    let engine = engine_with(source, Arc::new(store.clone()));
    let game = engine.create(None, 3).unwrap();

    for pos in [Position::new(0, 0), Position::new(0, 1)] {
        engine.apply_human_move(&game.game_id, pos).await.unwrap();
    }
    let view = engine
        .apply_human_move(&game.game_id, Position::new(2, 2))
        .await
        .unwrap();

    assert_eq!(view.status, SessionStatus::OpponentWin);
    assert_eq!(view.winner, Some(Winner::O));
    assert_eq!(view.last_opponent_move, Some(Position::new(1, 2)));
    wait_for_games(&store, 1).await;
    assert_eq!(store.len(), 1);
    assert_eq!(*store.games()[0].winner(), Winner::O);
}

#[tokio::test]
async fn test_draw_on_human_final_move() {
    let (source, _) = ScriptedSource::new(&[(0, 1), (1, 1), (2, 0), (1, 2)]);
    let store = MemoryGameStore::new();
    let engine = engine_with(source, Arc::new(store.clone()));
    let game = engine.create(None, 3).unwrap();

    let human = [(0, 0), (0, 2), (1, 0), (2, 1), (2, 2)];
    let mut view = None;
    for (row, col) in human {
        view = Some(
            engine
                .apply_human_move(&game.game_id, Position::new(row, col))
                .await
                .unwrap(),
        );
    }
    let view = view.unwrap();

    assert_eq!(view.status, SessionStatus::Draw);
    assert_eq!(view.winner, Some(Winner::Draw));
    assert!(view.winning_line.is_none());
    assert_eq!(view.board.occupied_count(), 9);
    wait_for_games(&store, 1).await;
    assert_eq!(*store.games()[0].winner(), Winner::Draw);
    assert!(store.games()[0].winning_line().is_none());
}

#[tokio::test]
async fn test_illegal_moves_leave_session_unchanged() {
    let (source, _) = ScriptedSource::new(&[(1, 1)]);
    let engine = engine_with(source, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 3).unwrap();
    let before = engine
        .apply_human_move(&game.game_id, Position::new(0, 0))
        .await
        .unwrap();

    let illegal = [
        Position::new(0, 0),
        Position::new(1, 1),
        Position::new(3, 0),
        Position::new(0, 5),
    ];
    for pos in illegal {
        assert_eq!(
            engine.apply_human_move(&game.game_id, pos).await,
            Err(EngineError::IllegalMove(pos))
        );
    }

    let after = engine.get_session(&game.game_id).await.unwrap();
    assert_eq!(after.board, before.board);
    assert_eq!(after.active_mark, Mark::X);
}

#[tokio::test]
async fn test_unknown_session() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    assert_eq!(
        engine.apply_human_move("missing", Position::new(0, 0)).await,
        Err(EngineError::NotFound("missing".to_string()))
    );
    assert!(matches!(
        engine.get_session("missing").await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_persistence_failure_does_not_change_outcome() {
    let (source, _) = ScriptedSource::new(&[(1, 0), (1, 1)]);
    let engine = engine_with(source, Arc::new(BrokenStore));
    let game = engine.create(None, 3).unwrap();

    let mut last = None;
    for col in 0..3 {
        last = Some(
            engine
                .apply_human_move(&game.game_id, Position::new(0, col))
                .await
                .unwrap(),
        );
    }
    let view = last.unwrap();
    assert_eq!(view.status, SessionStatus::HumanWin);
    assert_eq!(view.winner, Some(Winner::X));

    let stored = engine.get_session(&game.game_id).await.unwrap();
    assert_eq!(stored.status, SessionStatus::HumanWin);
}

#[tokio::test]
async fn test_hanging_store_does_not_delay_results() {
    let (source, _) = ScriptedSource::new(&[(1, 0), (1, 1)]);
    let engine = engine_with(source, Arc::new(HangingStore));
    let game = engine.create(None, 3).unwrap();

    let winning = async {
        for col in 0..2 {
            engine
                .apply_human_move(&game.game_id, Position::new(0, col))
                .await
                .unwrap();
        }
        engine
            .apply_human_move(&game.game_id, Position::new(0, 2))
            .await
            .unwrap()
    };
    let view = tokio::time::timeout(Duration::from_secs(2), winning)
        .await
        .expect("winning move must not wait on the store");
    assert_eq!(view.status, SessionStatus::HumanWin);

    let evaluation = tokio::time::timeout(
        Duration::from_secs(2),
        engine.evaluate_snapshot(&snapshot(&["XXX", "OO.", "..."], "O")),
    )
    .await
    .expect("evaluation must not wait on the store")
    .unwrap();
    assert!(evaluation.is_game_over);
}

#[tokio::test]
async fn test_each_turn_changes_one_or_two_squares() {
    for size in 3..=5 {
        let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
        let game = engine.create(None, size).unwrap();
        let mut occupied = 0;

        loop {
            let current = engine.get_session(&game.game_id).await.unwrap();
            if current.status.is_terminal() {
                break;
            }
            let target = current.board.empty_positions()[0];
            let view = engine
                .apply_human_move(&game.game_id, target)
                .await
                .unwrap();
            let delta = view.board.occupied_count() - occupied;
            assert!(delta == 1 || delta == 2, "turn changed {} squares", delta);
            if delta == 1 {
                assert!(view.status.is_terminal());
            }
            occupied = view.board.occupied_count();
        }
    }
}

#[tokio::test]
async fn test_concurrent_moves_are_serialized() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    let game = engine.create(None, 5).unwrap();

    let a = engine.apply_human_move(&game.game_id, Position::new(0, 0));
    let b = engine.apply_human_move(&game.game_id, Position::new(4, 4));
    let (a, b) = tokio::join!(a, b);
    // The second move may land on the opponent's reply; either way the
    // board reflects whole turns only.
    let applied = [a, b].iter().filter(|r| r.is_ok()).count();
    assert!(applied >= 1);

    let view = engine.get_session(&game.game_id).await.unwrap();
    assert_eq!(view.board.occupied_count(), applied * 2);
    let xs = view
        .board
        .squares()
        .iter()
        .filter(|sq| **sq == Square::Occupied(Mark::X))
        .count();
    assert_eq!(xs, applied);
}

#[tokio::test]
async fn test_evaluate_snapshot_records_finished_boards() {
    let store = MemoryGameStore::new();
    let engine = engine_with(OfflineSource, Arc::new(store.clone()));

    let won = engine
        .evaluate_snapshot(&snapshot(&["XXX", "OO.", "..."], "O"))
        .await
        .unwrap();
    assert!(won.is_game_over);
    assert_eq!(won.winner, Some(Winner::X));
    assert_eq!(won.message, "Player X wins!");
    assert_eq!(won.winning_line.unwrap().len(), 3);

    let ongoing = engine
        .evaluate_snapshot(&snapshot(&["X..", ".O.", "..."], "X"))
        .await
        .unwrap();
    assert!(!ongoing.is_game_over);
    assert_eq!(ongoing.winner, None);
    assert_eq!(ongoing.message, "Game is still in progress");

    wait_for_games(&store, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_evaluate_snapshot_rejects_malformed() {
    let engine = engine_with(OfflineSource, Arc::new(MemoryGameStore::new()));
    let result = engine
        .evaluate_snapshot(&snapshot(&["XX", "OO"], "X"))
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    let result = engine
        .evaluate_snapshot(&snapshot(&["...", "...", "..."], "Z"))
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn test_suggest_for_snapshot() {
    let (source, _) = ScriptedSource::new(&[(2, 2)]);
    let engine = engine_with(source, Arc::new(MemoryGameStore::new()));

    let suggestion = engine
        .suggest_for_snapshot(&snapshot(&["X..", ".O.", "..."], "X"))
        .await
        .unwrap();
    assert_eq!(suggestion.position, Position::new(2, 2));

    let finished = engine
        .suggest_for_snapshot(&snapshot(&["OOO", "XX.", "X.."], "X"))
        .await;
    assert_eq!(finished, Err(EngineError::GameAlreadyOver(Winner::O)));
}

#[tokio::test]
async fn test_list_completed_newest_first() {
    let store = MemoryGameStore::new();
    let engine = engine_with(OfflineSource, Arc::new(store.clone()));

    engine
        .evaluate_snapshot(&snapshot(&["XXX", "OO.", "..."], "O"))
        .await
        .unwrap();
    wait_for_games(&store, 1).await;
    engine
        .evaluate_snapshot(&snapshot(&["OOO", "XX.", "X.."], "X"))
        .await
        .unwrap();
    wait_for_games(&store, 2).await;

    let games = engine.list_completed(None).await.unwrap();
    assert_eq!(games.len(), 2);
    assert_eq!(*games[0].winner(), Winner::O);
    assert_eq!(*games[1].winner(), Winner::X);

    let one = engine.list_completed(Some(1)).await.unwrap();
    assert_eq!(one.len(), 1);
}
