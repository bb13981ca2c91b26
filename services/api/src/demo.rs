use std::sync::Arc;

use clap::Args;

use crate::infra::demo_directory;
use govease_transfers::error::AppError;
use govease_transfers::notifications::{
    InMemoryNotificationStore, LogMailer, NotificationDispatcher,
};
use govease_transfers::realtime::ConnectionRegistry;
use govease_transfers::sequence::InMemorySequences;
use govease_transfers::transfers::{
    InMemoryMatchStore, InMemoryRequestStore, NewTransferRequest, TransferService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop after match formation, skipping the agreement exchange.
    #[arg(long)]
    pub(crate) skip_agreement: bool,
}

/// Console walkthrough of the matching workflow against the seeded
/// directory: two reciprocal submissions, the match search, and (unless
/// skipped) the full bilateral agreement exchange.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let directory = Arc::new(demo_directory());
    let sequences = Arc::new(InMemorySequences::default());
    let registry = Arc::new(ConnectionRegistry::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(InMemoryNotificationStore::default()),
        sequences.clone(),
        directory.clone(),
        registry,
        Arc::new(LogMailer),
    ));
    let service = TransferService::new(
        Arc::new(InMemoryRequestStore::default()),
        Arc::new(InMemoryMatchStore::default()),
        directory,
        sequences,
        dispatcher.clone(),
    );

    println!("== GovEase transfer matching demo ==");

    let first = service
        .create_request(NewTransferRequest {
            teacher_id: "TEA00001".to_string(),
            from_district: "Colombo".to_string(),
            to_district: "Kandy".to_string(),
        })
        .await?;
    println!(
        "submitted {} ({} -> {})",
        first.request_id, first.from_district, first.to_district
    );

    let second = service
        .create_request(NewTransferRequest {
            teacher_id: "TEA00002".to_string(),
            from_district: "Kandy".to_string(),
            to_district: "Colombo".to_string(),
        })
        .await?;
    println!(
        "submitted {} ({} -> {})",
        second.request_id, second.from_district, second.to_district
    );

    let outcome = service
        .find_match(&first.request_id)
        .await?;
    let Some(transfer_match) = outcome.transfer_match else {
        println!("no reciprocal counterpart found");
        return Ok(());
    };
    println!(
        "matched under {} (pair {})",
        transfer_match.matching_id, transfer_match.pair_key
    );
    if let Some(teacher) = outcome.matched_teacher {
        println!(
            "counterpart: {} ({}, {} years in district)",
            teacher.teacher_name, teacher.current_district, teacher.years_in_service_district
        );
    }

    if !args.skip_agreement {
        let one_sided = service
            .agree(&transfer_match.matching_id, &first.request_id)
            .await?;
        println!("{} agreed -> {:?}", first.request_id, one_sided.match_status);

        let agreed = service
            .agree(&transfer_match.matching_id, &second.request_id)
            .await?;
        println!("{} agreed -> {:?}", second.request_id, agreed.match_status);
    }

    for citizen_id in ["CIT00001", "CIT00002"] {
        let feed = dispatcher
            .list(citizen_id, false, 0, 20)
            .await?;
        println!("notifications for {citizen_id}:");
        for notification in feed {
            println!(
                "  [{}] {:?} {}",
                notification.notification_id, notification.kind, notification.description
            );
        }
    }

    Ok(())
}
