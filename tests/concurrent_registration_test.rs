use chat_sessions::error::AppError;

mod common;
use common::{candidate, test_state};

const NUM_CONCURRENT_REGISTRATIONS: usize = 12;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_race_condition() {
    // Every task uses the same nickname. Several may pass the early
    // existence check together; the storage insert must still admit
    // exactly one of them.
    let state = test_state();

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_REGISTRATIONS {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .sessions
                .register(candidate(
                    &format!("racer{}", i),
                    "dup",
                    &format!("racer{}@x.com", i),
                ))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("Task join failed") {
            Ok(tokens) => {
                assert_eq!(tokens.user.nickname, "dup");
                successes += 1;
            }
            Err(AppError::EntityAlreadyExists { field, .. }) => assert_eq!(field, "nickname"),
            Err(AppError::InvalidEntity(messages)) => {
                assert!(
                    messages.iter().any(|m| m.contains("nickname [dup]")),
                    "unexpected constraint messages: {messages:?}"
                );
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1, "exactly one registration must win");
    assert_eq!(state.db.user_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_registrations_all_succeed() {
    let state = test_state();

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_REGISTRATIONS {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .sessions
                .register(candidate(
                    &format!("user{}", i),
                    &format!("nick{}", i),
                    &format!("user{}@x.com", i),
                ))
                .await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("Task join failed")
            .expect("Registration failed");
    }
    assert_eq!(state.db.user_count(), NUM_CONCURRENT_REGISTRATIONS);
}
