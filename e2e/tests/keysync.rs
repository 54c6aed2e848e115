//! End-to-end tests for the key-sync stack, driving real `keysync_app`/
//! `keysync_host` code through a `TriggerSync` gRPC call.
//!
//! Scenarios 3 (tampered envelope) and 4 (replayed M3) require forging
//! raw M2/M3 bytes on the wire and are covered precisely at that level by
//! `core/keysync`'s own unit tests instead; the TCP/gRPC stack exercised
//! here doesn't expose a seam to inject a byte-level man-in-the-middle.

use e2e::keysync::{execute, Authorization, Scenario};
use keysync_proto::generated::trigger_sync_response::Outcome;
use keysync_proto::TriggerSyncRequest;

#[tokio::test]
async fn happy_path_installs_leader_state() {
    let scenario = Scenario {
        leader_secret: vec![0x41, 0x42, 0x43],
        ..Scenario::default()
    };

    execute(scenario, |mut args| async move {
        let resp = args
            .client
            .trigger_sync(tonic::Request::new(TriggerSyncRequest { peer_addr: String::new() }))
            .await
            .unwrap()
            .into_inner();

        assert!(matches!(resp.outcome, Some(Outcome::Completed(true))));
        assert_eq!(
            args.follower_store.read_for_export().expect("state installed"),
            vec![0x41, 0x42, 0x43]
        );
    })
    .await;
}

#[tokio::test]
async fn empty_secret_state_round_trips() {
    let scenario = Scenario {
        leader_secret: vec![],
        ..Scenario::default()
    };

    execute(scenario, |mut args| async move {
        let resp = args
            .client
            .trigger_sync(tonic::Request::new(TriggerSyncRequest { peer_addr: String::new() }))
            .await
            .unwrap()
            .into_inner();

        assert!(matches!(resp.outcome, Some(Outcome::Completed(true))));
        assert_eq!(args.follower_store.read_for_export().expect("state installed"), Vec::<u8>::new());
    })
    .await;
}

#[tokio::test]
async fn revoked_follower_code_is_rejected() {
    let scenario = Scenario {
        leader_authorizes_follower: Authorization {
            revoke_code: true,
            ..Authorization::default()
        },
        ..Scenario::default()
    };

    execute(scenario, |mut args| async move {
        let resp = args
            .client
            .trigger_sync(tonic::Request::new(TriggerSyncRequest { peer_addr: String::new() }))
            .await
            .unwrap()
            .into_inner();

        assert!(matches!(resp.outcome, Some(Outcome::Error(_))));
        assert!(args.follower_store.read_for_export().is_err());
    })
    .await;
}

#[tokio::test]
async fn unauthorized_follower_instance_is_rejected() {
    let scenario = Scenario {
        leader_authorizes_follower: Authorization {
            code: true,
            instance: false,
            ..Authorization::default()
        },
        ..Scenario::default()
    };

    execute(scenario, |mut args| async move {
        let resp = args
            .client
            .trigger_sync(tonic::Request::new(TriggerSyncRequest { peer_addr: String::new() }))
            .await
            .unwrap()
            .into_inner();

        assert!(matches!(resp.outcome, Some(Outcome::Error(_))));
        assert!(args.follower_store.read_for_export().is_err());
    })
    .await;
}

#[tokio::test]
async fn leader_oracle_outage_is_rejected() {
    let scenario = Scenario {
        leader_authorizes_follower: Authorization {
            oracle_down: true,
            ..Authorization::default()
        },
        ..Scenario::default()
    };

    execute(scenario, |mut args| async move {
        let resp = args
            .client
            .trigger_sync(tonic::Request::new(TriggerSyncRequest { peer_addr: String::new() }))
            .await
            .unwrap()
            .into_inner();

        assert!(matches!(resp.outcome, Some(Outcome::Error(_))));
        assert!(args.follower_store.read_for_export().is_err());
    })
    .await;
}
