//! In-process fan-out of booking events to connected users.
//!
//! Each user gets a broadcast channel on first subscription. A transport
//! (websocket, SSE) would subscribe here; handlers and jobs only publish.

use bookit_core::models::{notification::Notification, reservation::Reservation};
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HubEvent {
    ReservationUpdated(Reservation),
    #[serde(rename_all = "camelCase")]
    AvailabilityChanged { service_id: Uuid, date: NaiveDate },
    Notification(Notification),
}

/// Broadcast hub keyed by user id.
pub struct NotificationHub {
    channels: DashMap<Uuid, broadcast::Sender<HubEvent>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a user. Creates the channel if needed.
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<HubEvent> {
        let sender = self
            .channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send to one user. No-op if nobody is listening.
    pub fn send(&self, user_id: Uuid, event: HubEvent) {
        if let Some(sender) = self.channels.get(&user_id) {
            if sender.send(event).is_err() {
                tracing::debug!("No live receivers for user {}", user_id);
            }
        }
    }

    /// Send to every subscribed user.
    pub fn broadcast(&self, event: HubEvent) {
        for entry in self.channels.iter() {
            let _ = entry.value().send(event.clone());
        }
    }

    pub fn notify_reservation(&self, reservation: &Reservation, provider_id: Uuid) {
        let event = HubEvent::ReservationUpdated(reservation.clone());
        self.send(reservation.user_id, event.clone());
        if provider_id != reservation.user_id {
            self.send(provider_id, event);
        }
        self.broadcast(HubEvent::AvailabilityChanged {
            service_id: reservation.service_id,
            date: reservation.date,
        });
    }

    pub fn notify_notification(&self, notification: &Notification) {
        self.send(notification.user_id, HubEvent::Notification(notification.clone()));
    }

    /// Drops channels whose receivers have all gone away.
    pub fn prune(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }
}
