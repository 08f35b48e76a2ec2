use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use turn_core::{TurnConfigSnapshot, TurnError};
use turn_queue::prelude::*;
use turn_queue::ChannelAnnouncer;

use crate::DeskSettings;

/// Simulate one morning at the front desk: clients check in from their
/// phones, a staff console calls them in, one client gives up and leaves.
pub async fn run(snapshot: &TurnConfigSnapshot, settings: &DeskSettings) -> Result<()> {
    let announcer = ChannelAnnouncer::new(16);
    let mut speaker = announcer.subscribe();

    let store = MemoryStore::with_config(StoreConfig::from_snapshot(snapshot));
    let engine = QueueEngine::from_snapshot(store, snapshot).with_announcer(announcer);

    let queue = engine
        .create_queue(NewQueue {
            service_id: settings.service_id.clone(),
            organization_id: settings.organization_id.clone(),
            estimated_wait_time: settings.wait_minutes,
        })
        .await?;
    let queue_id = queue.id.clone();

    let board = spawn_board(&engine, &queue_id).await?;
    let speaker_task = tokio::spawn(async move {
        while let Ok(announcement) = speaker.recv().await {
            println!("[speaker] {}", announcement.text);
        }
    });

    let mut check_ins = Vec::new();
    for n in 0..settings.clients {
        let engine = engine.clone();
        let queue_id = queue_id.clone();
        check_ins.push(tokio::spawn(async move {
            let user = format!("patient-{n}");
            engine
                .join(&queue_id, Admission::new(user.as_str(), format!("Patient {n}"), format!("555-01{n:02}")))
                .await
        }));
    }
    for check_in in check_ins {
        if let Err(err) = check_in.await? {
            warn!(error = %err, "check-in rejected");
        }
    }

    // Checking in twice from the same phone is refused
    if let Err(err) = engine.join(&queue_id, Admission::new("patient-0", "Patient 0", "")).await {
        let turn_error = TurnError::from(err);
        println!("[desk] duplicate check-in refused: {}", turn_error.to_json());
    }

    let mut interval = tokio::time::interval(settings.call_interval);
    loop {
        interval.tick().await;

        let outcome = engine.call_next(&queue_id).await?;
        if outcome.is_noop() {
            break;
        }

        // Somebody near the back runs out of patience
        if outcome.current_number == 1 {
            let last = settings.clients.saturating_sub(1);
            engine.leave(&queue_id, &UserId::from(format!("patient-{last}"))).await?;
        }
    }

    engine.close(&queue_id).await?;

    let queue = engine.get_queue(&queue_id).await?;
    let metrics = engine.metrics().snapshot();
    info!(
        total_served = queue.total_served,
        joins = metrics.joins,
        left = metrics.left,
        rejection_rate = metrics.rejection_rate(),
        "desk closed"
    );
    println!("[desk] closed after serving {} patients", queue.total_served);

    board.abort();
    speaker_task.abort();
    Ok(())
}

/// Waiting-room display: reprints the roster on every committed revision
async fn spawn_board(engine: &QueueEngine<MemoryStore>, queue_id: &QueueId) -> Result<JoinHandle<()>> {
    let mut live = engine.subscribe(queue_id).await?;

    Ok(tokio::spawn(async move {
        while let Some(queue) = live.next().await {
            let line: Vec<String> = queue
                .roster
                .iter()
                .map(|c| match c.status {
                    ClientStatus::Called => format!("[{}] {} <- now", c.position, c.user_name),
                    _ => format!("[{}] {} ~{}", c.position, c.user_name, c.estimated_time),
                })
                .collect();
            println!("[board] #{} {} | {}", queue.current_number, queue.status, line.join(", "));
        }
    }))
}
