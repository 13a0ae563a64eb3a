use super::*;
use crate::state::test_helpers;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn path() -> Vec<Point> {
    vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)]
}

#[test]
fn random_code_has_requested_length_and_alphabet() {
    let mut rng = StdRng::seed_from_u64(7);
    for len in [8, 12, 32] {
        let code = random_board_code(&mut rng, len);
        assert_eq!(code.len(), len);
        assert!(code.bytes().all(|b| BOARD_ID_ALPHABET.contains(&b)));
        assert!(BoardId::parse(&code).is_ok());
    }
}

#[test]
fn random_codes_differ() {
    let mut rng = StdRng::seed_from_u64(11);
    let first = random_board_code(&mut rng, 8);
    let second = random_board_code(&mut rng, 8);
    assert_ne!(first, second);
}

#[tokio::test]
async fn generated_id_is_valid_and_unused() {
    let state = test_helpers::test_app_state();
    let board = generate_board_id(&state).await.unwrap();
    assert_eq!(board.as_str().len(), 8);
    assert!(!state.store.board_exists(&board).await.unwrap());
}

#[tokio::test]
async fn create_stroke_persists_then_broadcasts() {
    let state = test_helpers::test_app_state();
    let board = test_helpers::board("drawhere");
    let (_, mut rx) = state.relay.join(&board).await;

    let stroke = create_stroke(&state, &board, path(), "#ff0000".into()).await.unwrap();

    assert_eq!(stroke.id, 1);
    assert_eq!(state.store.list_strokes(&board).await.unwrap(), vec![stroke.clone()]);
    assert_eq!(rx.recv().await, Some(BoardEvent::Stroke(stroke)));
}

#[tokio::test]
async fn create_stroke_creates_board_lazily() {
    let state = test_helpers::test_app_state();
    let board = test_helpers::board("lazyboard");
    assert!(!state.store.board_exists(&board).await.unwrap());

    create_stroke(&state, &board, path(), "#000000".into()).await.unwrap();
    assert!(state.store.board_exists(&board).await.unwrap());
}

#[tokio::test]
async fn delete_stroke_broadcasts_erase() {
    let state = test_helpers::test_app_state();
    let board = test_helpers::board("erasehere");
    let stroke = test_helpers::seed_stroke(&state, &board, &[(0.0, 0.0), (1.0, 1.0)]).await;
    let (_, mut rx) = state.relay.join(&board).await;

    delete_stroke(&state, &board, stroke.id).await.unwrap();

    assert!(state.store.list_strokes(&board).await.unwrap().is_empty());
    assert_eq!(rx.recv().await, Some(BoardEvent::Erase { id: stroke.id }));
}

#[tokio::test]
async fn failed_delete_broadcasts_nothing() {
    let state = test_helpers::test_app_state();
    let board = test_helpers::board("nothing1");
    let (_, mut rx) = state.relay.join(&board).await;

    let result = delete_stroke(&state, &board, 42).await;
    assert!(matches!(result, Err(StoreError::NotFound(42))));
    assert!(rx.try_recv().is_err());
}
