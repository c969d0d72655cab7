use chat_sessions::db::AccountRepository;
use chat_sessions::error::AppError;
use chat_sessions::models::ProfileUpdate;

mod common;
use common::{candidate, context_for, register, test_state};

const NUM_ROUNDS: usize = 50;

fn nickname(value: &str) -> ProfileUpdate {
    ProfileUpdate {
        nickname: Some(value.to_string()),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_users_race_for_one_nickname() {
    for round in 0..NUM_ROUNDS {
        let state = test_state();
        let alice = register(&state, "alice", "al", "a@x.com").await;
        let bob = register(&state, "bob", "bo", "b@x.com").await;

        let handles = [&alice, &bob].map(|tokens| {
            let state = state.clone();
            let ctx = context_for(&state, tokens);
            tokio::spawn(async move { state.sessions.change_profile(&ctx, nickname("dup")) })
        });

        let mut winners = vec![];
        for (tokens, handle) in [&alice, &bob].into_iter().zip(handles) {
            match handle.await.expect("Task join failed") {
                Ok(updated) => {
                    assert_eq!(updated.nickname, "dup");
                    winners.push(tokens.user.id);
                }
                // Lost the early check
                Err(AppError::EntityAlreadyExists { field, .. }) => assert_eq!(field, "nickname"),
                // Passed the early check, lost at the storage update
                Err(AppError::InvalidEntity(messages)) => {
                    assert!(
                        messages.iter().any(|m| m.contains("nickname [dup]")),
                        "unexpected constraint messages: {messages:?}"
                    );
                }
                Err(other) => panic!("round {round}: unexpected error: {other:?}"),
            }
        }

        assert_eq!(winners.len(), 1, "round {round}: exactly one update must win");
        let holder = state.db.find_by_nickname("dup").unwrap().expect("dup is held");
        assert_eq!(holder.id, winners[0]);

        // The loser still owns its old nickname
        let (loser, old_nickname) = if winners[0] == alice.user.id {
            (bob.user.id, "bo")
        } else {
            (alice.user.id, "al")
        };
        assert_eq!(state.db.find_by_id(loser).unwrap().unwrap().nickname, old_nickname);
        assert_eq!(
            state.db.find_by_nickname(old_nickname).unwrap().map(|u| u.id),
            Some(loser)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_concurrent_updates_keep_nickname_unique() {
    for round in 0..NUM_ROUNDS {
        let state = test_state();
        let alice = register(&state, "alice", "al", "a@x.com").await;

        let updates = [
            nickname("x"),
            ProfileUpdate {
                name: Some(format!("alicia{round}")),
                nickname: Some("al".to_string()),
                ..Default::default()
            },
        ];
        let handles = updates.map(|update| {
            let state = state.clone();
            let ctx = context_for(&state, &alice);
            tokio::spawn(async move { state.sessions.change_profile(&ctx, update) })
        });
        for handle in handles {
            handle
                .await
                .expect("Task join failed")
                .expect("Updating one's own profile should succeed");
        }

        let stored = state.db.find_by_id(alice.user.id).unwrap().unwrap();
        assert_eq!(
            state.db.find_by_nickname(&stored.nickname).unwrap().map(|u| u.id),
            Some(alice.user.id),
            "round {round}: nickname {} missing from index",
            stored.nickname
        );

        let err = state
            .sessions
            .register(candidate("mallory", &stored.nickname, "m@x.com"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::EntityAlreadyExists { field: "nickname", .. }),
            "round {round}: duplicate nickname admitted: {err:?}"
        );
    }
}
