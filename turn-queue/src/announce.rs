//! Best-effort announcements of the client being called.
//!
//! Announcements run after the call-next transaction has committed and can
//! never change its outcome. A failing announcer is logged and ignored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::{
    types::{ClientId, QueueClient, QueueId},
    QueueError, QueueResult,
};

/// What to say when a client is promoted to the called slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub queue_id: QueueId,
    pub client_id: ClientId,
    pub user_name: String,
    pub text: String,
}

impl Announcement {
    pub fn for_client(queue_id: &QueueId, client: &QueueClient) -> Self {
        Self {
            queue_id: queue_id.clone(),
            client_id: client.id.clone(),
            user_name: client.user_name.clone(),
            text: format!("{}, it's your turn.", client.user_name),
        }
    }
}

/// Delivery channel for announcements (speaker, display board, SMS relay)
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, announcement: &Announcement) -> QueueResult<()>;
}

/// Writes announcements to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnnouncer;

#[async_trait]
impl Announcer for TracingAnnouncer {
    async fn announce(&self, announcement: &Announcement) -> QueueResult<()> {
        info!(
            queue_id = %announcement.queue_id,
            client_id = %announcement.client_id,
            "{}",
            announcement.text
        );
        Ok(())
    }
}

/// Relays announcements to in-process listeners, e.g. a text-to-speech task
#[derive(Debug, Clone)]
pub struct ChannelAnnouncer {
    sender: broadcast::Sender<Announcement>,
}

impl ChannelAnnouncer {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, announcement: &Announcement) -> QueueResult<()> {
        self.sender
            .send(announcement.clone())
            .map(|_| ())
            .map_err(|_| QueueError::Internal("no announcement listeners".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientStatus, UserId};
    use chrono::Utc;

    fn called_client() -> QueueClient {
        let now = Utc::now();
        QueueClient {
            id: ClientId::from("c1"),
            user_id: UserId::from("u1"),
            user_name: "Amina".to_string(),
            user_phone: "555-0101".to_string(),
            position: 1,
            joined_at: now,
            called_at: Some(now),
            served_at: None,
            estimated_time: "10:00".to_string(),
            estimated_at: now,
            status: ClientStatus::Called,
        }
    }

    #[test]
    fn test_announcement_text() {
        let announcement = Announcement::for_client(&QueueId::from("q1"), &called_client());
        assert_eq!(announcement.text, "Amina, it's your turn.");
        assert_eq!(announcement.client_id.as_str(), "c1");
    }

    #[tokio::test]
    async fn test_channel_announcer_delivers() {
        let announcer = ChannelAnnouncer::new(8);
        let mut rx = announcer.subscribe();
        let announcement = Announcement::for_client(&QueueId::from("q1"), &called_client());

        announcer.announce(&announcement).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), announcement);
    }

    #[tokio::test]
    async fn test_channel_announcer_without_listeners_fails() {
        let announcer = ChannelAnnouncer::new(8);
        let announcement = Announcement::for_client(&QueueId::from("q1"), &called_client());
        assert!(announcer.announce(&announcement).await.is_err());
    }
}
