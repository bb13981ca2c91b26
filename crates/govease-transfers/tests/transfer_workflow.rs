//! End-to-end scenarios for the transfer matching workflow, driven through
//! the public service facade so eligibility, pairing, agreement, and
//! notification routing are validated together.

mod common {
    use std::sync::Arc;

    use govease_transfers::directory::{CitizenContact, InMemoryDirectory, TeacherProfile};
    use govease_transfers::notifications::{
        InMemoryNotificationStore, NotificationDispatcher, NotificationType, RecordingMailer,
    };
    use govease_transfers::realtime::ConnectionRegistry;
    use govease_transfers::sequence::InMemorySequences;
    use govease_transfers::transfers::{
        InMemoryMatchStore, InMemoryRequestStore, TransferService,
    };

    pub(crate) struct Fixture {
        pub(crate) service: TransferService,
        pub(crate) dispatcher: Arc<NotificationDispatcher>,
        pub(crate) directory: Arc<InMemoryDirectory>,
        pub(crate) registry: Arc<ConnectionRegistry>,
        pub(crate) mailer: RecordingMailer,
    }

    pub(crate) fn fixture() -> Fixture {
        let requests = Arc::new(InMemoryRequestStore::default());
        let matches = Arc::new(InMemoryMatchStore::default());
        let directory = Arc::new(InMemoryDirectory::default());
        let sequences = Arc::new(InMemorySequences::default());
        let registry = Arc::new(ConnectionRegistry::default());
        let mailer = RecordingMailer::default();
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(InMemoryNotificationStore::default()),
            sequences.clone(),
            directory.clone(),
            registry.clone(),
            Arc::new(mailer.clone()),
        ));
        let service = TransferService::new(
            requests,
            matches,
            directory.clone(),
            sequences,
            dispatcher.clone(),
        );
        Fixture {
            service,
            dispatcher,
            directory,
            registry,
            mailer,
        }
    }

    impl Fixture {
        pub(crate) fn seed_teacher(
            &self,
            teacher_id: &str,
            citizen_id: &str,
            district: &str,
            subjects: &[&str],
            years: u32,
        ) {
            self.directory.upsert_teacher(TeacherProfile {
                teacher_id: teacher_id.to_string(),
                citizen_id: citizen_id.to_string(),
                teacher_name: format!("Teacher {teacher_id}"),
                current_district: district.to_string(),
                subjects: subjects.iter().map(|s| s.to_string()).collect(),
                years_in_service_district: years,
                phone: None,
            });
            self.directory.upsert_contact(CitizenContact {
                citizen_id: citizen_id.to_string(),
                full_name: format!("Citizen {citizen_id}"),
                email: Some(format!("{}@example.lk", citizen_id.to_lowercase())),
            });
        }

        pub(crate) async fn notifications_of(
            &self,
            citizen_id: &str,
        ) -> Vec<govease_transfers::notifications::Notification> {
            self.dispatcher
                .list(citizen_id, false, 0, 100)
                .await
                .expect("list notifications")
        }

        pub(crate) async fn count_of_kind(
            &self,
            citizen_id: &str,
            kind: NotificationType,
        ) -> usize {
            self.notifications_of(citizen_id)
                .await
                .into_iter()
                .filter(|n| n.kind == kind)
                .count()
        }
    }
}

use common::fixture;
use govease_transfers::notifications::NotificationType;
use govease_transfers::transfers::{
    MatchStatus, NewTransferRequest, RequestStatus, TransferError,
};
use tokio::sync::mpsc;

fn colombo_kandy_pair(fx: &common::Fixture) {
    fx.seed_teacher("TEA00001", "CIT00001", "Colombo", &["Math"], 6);
    fx.seed_teacher("TEA00002", "CIT00002", "Kandy", &["Math"], 10);
}

async fn submit(fx: &common::Fixture, teacher_id: &str, from: &str, to: &str) -> String {
    fx.service
        .create_request(NewTransferRequest {
            teacher_id: teacher_id.to_string(),
            from_district: from.to_string(),
            to_district: to.to_string(),
        })
        .await
        .expect("request created")
        .request_id
}

#[tokio::test]
async fn reciprocal_pair_matches_and_notifies_both_roles() {
    let fx = fixture();
    colombo_kandy_pair(&fx);

    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    assert_eq!(req1, "REQ00001");
    assert_eq!(req2, "REQ00002");

    let outcome = fx.service.find_match(&req1).await.expect("search succeeds");
    assert!(outcome.matched);
    let transfer_match = outcome.transfer_match.expect("match created");
    assert_eq!(transfer_match.matching_id, "TM00001");
    assert_eq!(transfer_match.match_status, MatchStatus::Pending);
    let counterpart = outcome.matched_request.expect("counterpart returned");
    assert_eq!(counterpart.request_id, req2);
    // Counterpart details are the limited public view.
    let matched_teacher = outcome.matched_teacher.expect("public details returned");
    assert_eq!(matched_teacher.current_district, "Kandy");

    // Requester gets the actionable TRANSFER notification, the counterpart
    // an informational GENERAL one; exactly two in total.
    let to_requester = fx.notifications_of("CIT00001").await;
    assert_eq!(to_requester.len(), 1);
    assert_eq!(to_requester[0].kind, NotificationType::Transfer);
    assert_eq!(to_requester[0].matching_id.as_deref(), Some("TM00001"));
    assert_eq!(to_requester[0].request_id.as_deref(), Some("REQ00001"));

    let to_counterpart = fx.notifications_of("CIT00002").await;
    assert_eq!(to_counterpart.len(), 1);
    assert_eq!(to_counterpart[0].kind, NotificationType::General);
    assert_eq!(to_counterpart[0].request_id.as_deref(), Some("REQ00002"));

    // Match formation does not alter request statuses.
    let requests = fx
        .service
        .list_for_teacher("TEA00002")
        .await
        .expect("list succeeds");
    assert_eq!(requests[0].status, RequestStatus::Pending);
}

#[tokio::test]
async fn repeating_the_search_does_not_duplicate_match_or_notifications() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;

    let first = fx.service.find_match(&req1).await.expect("search");
    // The counterpart searching afterwards converges on the same record.
    let second = fx.service.find_match(&req2).await.expect("search");
    assert_eq!(
        first.transfer_match.expect("match").matching_id,
        second.transfer_match.expect("match").matching_id
    );

    // Each citizen still holds one TRANSFER and one GENERAL at most: the
    // second search notifies with the roles swapped, and re-runs dedup.
    fx.service.find_match(&req1).await.expect("repeat search");
    assert_eq!(fx.notifications_of("CIT00001").await.len(), 2);
    assert_eq!(fx.notifications_of("CIT00002").await.len(), 2);
}

#[tokio::test]
async fn agreement_progresses_and_routes_to_the_non_acting_side() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    fx.service.find_match(&req1).await.expect("match formed");

    // Push channel for the counterpart observes the agreement updates.
    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.registry.register("CIT00002", tx);

    let updated = fx.service.agree("TM00001", &req1).await.expect("agree");
    assert_eq!(updated.match_status, MatchStatus::PendingAgreed);
    assert!(updated.agree_a && !updated.agree_b);

    // Exactly one TRANSFER notification to the non-acting side only.
    assert_eq!(fx.count_of_kind("CIT00002", NotificationType::Transfer).await, 1);
    assert_eq!(fx.count_of_kind("CIT00001", NotificationType::Transfer).await, 1); // from match formation
    let pushed = rx.recv().await.expect("live push received");
    assert_eq!(pushed["type"], "TRANSFER");

    // Agreeing again from the same side changes nothing.
    let repeated = fx.service.agree("TM00001", &req1).await.expect("agree");
    assert_eq!(repeated.match_status, MatchStatus::PendingAgreed);
    assert_eq!(fx.count_of_kind("CIT00002", NotificationType::Transfer).await, 1);

    let agreed = fx.service.agree("TM00001", &req2).await.expect("agree");
    assert_eq!(agreed.match_status, MatchStatus::Agreed);
    assert!(agreed.agree_a && agreed.agree_b);

    // Both sides receive exactly one GENERAL "processing will begin".
    assert_eq!(fx.count_of_kind("CIT00001", NotificationType::General).await, 1);
    // The counterpart already held the GENERAL match-found notification.
    assert_eq!(fx.count_of_kind("CIT00002", NotificationType::General).await, 2);
}

#[tokio::test]
async fn disagree_resets_from_agreed_and_notifies_the_other_party() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    fx.service.find_match(&req1).await.expect("match formed");
    fx.service.agree("TM00001", &req1).await.expect("agree");
    fx.service.agree("TM00001", &req2).await.expect("agree");

    let before = fx.count_of_kind("CIT00001", NotificationType::Transfer).await;
    let reset = fx
        .service
        .disagree("TM00001", &req2)
        .await
        .expect("disagree");
    assert_eq!(reset.match_status, MatchStatus::Pending);
    assert!(!reset.agree_a && !reset.agree_b);

    // Exactly one TRANSFER notification to T1's citizen only.
    assert_eq!(
        fx.count_of_kind("CIT00001", NotificationType::Transfer).await,
        before + 1
    );
    assert_eq!(fx.count_of_kind("CIT00002", NotificationType::Transfer).await, 1);
}

#[tokio::test]
async fn ineligible_teacher_cannot_create_a_request() {
    let fx = fixture();
    fx.seed_teacher("TEA00003", "CIT00003", "Galle", &["Science"], 3);

    let err = fx
        .service
        .create_request(NewTransferRequest {
            teacher_id: "TEA00003".to_string(),
            from_district: "Galle".to_string(),
            to_district: "Matara".to_string(),
        })
        .await
        .expect_err("eligibility floor enforced");
    assert!(matches!(err, TransferError::NotEligible { years: 3 }));

    // No request was persisted.
    let requests = fx
        .service
        .list_for_teacher("TEA00003")
        .await
        .expect("list succeeds");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn unknown_teacher_is_rejected_before_any_write() {
    let fx = fixture();
    let err = fx
        .service
        .create_request(NewTransferRequest {
            teacher_id: "TEA09999".to_string(),
            from_district: "Galle".to_string(),
            to_district: "Matara".to_string(),
        })
        .await
        .expect_err("unknown teacher rejected");
    assert!(matches!(err, TransferError::TeacherNotFound(_)));
}

#[tokio::test]
async fn cancelling_a_matched_request_deletes_the_match_and_informs_the_other_side() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    fx.service.find_match(&req1).await.expect("match formed");

    let generals_before = fx.count_of_kind("CIT00002", NotificationType::General).await;
    fx.service.cancel_request(&req1).await.expect("cancelled");

    // Exactly one new GENERAL notification to the other side.
    assert_eq!(
        fx.count_of_kind("CIT00002", NotificationType::General).await,
        generals_before + 1
    );

    // The match is gone: agreement attempts now fail.
    let err = fx
        .service
        .agree("TM00001", &req2)
        .await
        .expect_err("match deleted");
    assert!(matches!(err, TransferError::MatchNotFound(_)));

    // And so is the request itself.
    let err = fx
        .service
        .cancel_request(&req1)
        .await
        .expect_err("request deleted");
    assert!(matches!(err, TransferError::RequestNotFound(_)));
}

#[tokio::test]
async fn cancelling_a_request_paired_in_several_matches_removes_them_all() {
    let fx = fixture();
    fx.seed_teacher("TEA00001", "CIT00001", "Colombo", &["Math"], 6);
    fx.seed_teacher("TEA00002", "CIT00002", "Kandy", &["Math"], 10);
    fx.seed_teacher("TEA00003", "CIT00003", "Kandy", &["Math"], 8);

    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    let req3 = submit(&fx, "TEA00003", "Kandy", "Colombo").await;

    // Pairing does not close requests, so the still-Pending REQ00001 ends
    // up in two matches: with REQ00002 via its own search, then with
    // REQ00003 via the third teacher's search.
    fx.service.find_match(&req1).await.expect("first match");
    fx.service.find_match(&req3).await.expect("second match");

    let generals_b = fx.count_of_kind("CIT00002", NotificationType::General).await;
    let generals_c = fx.count_of_kind("CIT00003", NotificationType::General).await;
    fx.service.cancel_request(&req1).await.expect("cancelled");

    // Each counterpart is informed about its own match being cancelled.
    assert_eq!(
        fx.count_of_kind("CIT00002", NotificationType::General).await,
        generals_b + 1
    );
    assert_eq!(
        fx.count_of_kind("CIT00003", NotificationType::General).await,
        generals_c + 1
    );

    // Neither match survives the cancellation.
    for (matching_id, request_id) in [("TM00001", &req2), ("TM00002", &req3)] {
        let err = fx
            .service
            .agree(matching_id, request_id)
            .await
            .expect_err("match deleted");
        assert!(matches!(err, TransferError::MatchNotFound(_)));
    }
}

#[tokio::test]
async fn waiting_list_requests_stay_eligible_for_matching() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    let req2 = submit(&fx, "TEA00002", "Kandy", "Colombo").await;

    fx.service
        .add_to_waiting_list(&req2)
        .await
        .expect("moved to waiting list");

    let outcome = fx.service.find_match(&req1).await.expect("search");
    assert!(outcome.matched);
    assert_eq!(
        outcome.matched_request.expect("counterpart").status,
        RequestStatus::WaitingList
    );
}

#[tokio::test]
async fn mismatched_subjects_do_not_pair() {
    let fx = fixture();
    fx.seed_teacher("TEA00001", "CIT00001", "Colombo", &["Math"], 6);
    fx.seed_teacher("TEA00002", "CIT00002", "Kandy", &["Math", "Science"], 10);

    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    submit(&fx, "TEA00002", "Kandy", "Colombo").await;

    let outcome = fx.service.find_match(&req1).await.expect("search");
    assert!(!outcome.matched);
    assert!(fx.notifications_of("CIT00001").await.is_empty());
    assert!(fx.notifications_of("CIT00002").await.is_empty());
}

#[tokio::test]
async fn email_handoff_accompanies_match_notifications() {
    let fx = fixture();
    colombo_kandy_pair(&fx);
    let req1 = submit(&fx, "TEA00001", "Colombo", "Kandy").await;
    submit(&fx, "TEA00002", "Kandy", "Colombo").await;
    fx.service.find_match(&req1).await.expect("match formed");

    // The hand-off runs on spawned tasks.
    for _ in 0..20 {
        if fx.mailer.messages().len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let messages = fx.mailer.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .any(|m| m.subject == "GovEase - Transfer Update"));
    assert!(messages.iter().any(|m| m.subject == "GovEase - Notification"));
}
