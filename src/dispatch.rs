//! Event dispatch and booking/task state reconciliation.
//!
//! Cal.com delivers webhooks at least once and possibly out of order, so
//! every rule here is written to be idempotent: existence checks guard
//! creation, deletions tolerate missing mappings, and the reschedule rule
//! migrates the mapping key instead of minting a second task.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::errors::{SinkError, SinkResult};
use crate::models::{BookingPayload, EventPayload, TriggerEvent, WebhookEnvelope};
use crate::store::MappingStore;
use crate::todoist::TaskClient;

/// Payment lifecycle stage carried by payment events.
#[derive(Debug, Clone, Copy)]
enum PaymentStage {
    Initiated,
    Paid,
}

impl PaymentStage {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Initiated => "💳 Payment initiated",
            Self::Paid => "✅ Payment received",
        }
    }
}

/// Routes classified webhook events to per-kind reconciliation rules that
/// keep the mapping store and the task tracker consistent.
pub struct Dispatcher {
    store: Arc<dyn MappingStore>,
    tasks: Arc<dyn TaskClient>,
}

impl Dispatcher {
    /// Create a dispatcher over a mapping store and a task client.
    pub fn new(store: Arc<dyn MappingStore>, tasks: Arc<dyn TaskClient>) -> Self {
        Self { store, tasks }
    }

    /// Handle one webhook envelope.
    ///
    /// Unknown trigger kinds and payloads that match no known shape resolve
    /// as logged no-ops, so additions on the Cal.com side never fail
    /// delivery. Store and tracker failures propagate to the caller with the
    /// trigger kind attached via the HTTP response.
    pub async fn handle(&self, envelope: WebhookEnvelope) -> SinkResult<TriggerEvent> {
        let trigger = envelope.trigger_event;

        let Some(payload) = EventPayload::classify(&envelope.payload) else {
            // Payload errors are absorbed, not surfaced: Cal.com adding new
            // shapes must never trigger sender-side retries.
            let err = SinkError::payload(format!("no known shape for {trigger}"));
            debug!(event = %trigger, error = %err, "Dropping unclassifiable payload");
            return Ok(trigger);
        };

        match (trigger, payload) {
            (
                TriggerEvent::BookingCreated | TriggerEvent::BookingRequested,
                EventPayload::Booking(booking),
            ) => {
                self.reconcile_created(&booking).await?;
            }
            (TriggerEvent::BookingRescheduled, EventPayload::Booking(booking)) => {
                self.reconcile_rescheduled(&booking).await?;
            }
            (
                TriggerEvent::BookingCancelled | TriggerEvent::BookingRejected,
                EventPayload::Booking(booking),
            ) => {
                self.reconcile_cancelled(&booking).await?;
            }
            (TriggerEvent::BookingPaymentInitiated, EventPayload::Booking(booking)) => {
                self.reconcile_payment(&booking, PaymentStage::Initiated)
                    .await?;
            }
            (TriggerEvent::BookingPaid, EventPayload::Booking(booking)) => {
                self.reconcile_payment(&booking, PaymentStage::Paid).await?;
            }
            (TriggerEvent::MeetingStarted, EventPayload::Booking(booking)) => {
                let comment = format!("Meeting started at {}", Utc::now().format("%H:%M:%S"));
                self.comment_on_booking(&booking.uid, &comment).await?;
            }
            (TriggerEvent::MeetingEnded, EventPayload::Booking(booking)) => {
                self.reconcile_meeting_ended(&booking).await?;
            }
            (TriggerEvent::BookingNoShowUpdated, EventPayload::NoShow(no_show)) => {
                let comment = format!("No-show update: {}", no_show.message);
                self.comment_on_booking(&no_show.booking_uid, &comment)
                    .await?;
            }
            (
                TriggerEvent::AfterHostsCalVideoNoShow | TriggerEvent::AfterGuestsCalVideoNoShow,
                EventPayload::VideoNoShow(no_show),
            ) => {
                let comment = format!("Cal Video: {}", no_show.message);
                self.comment_on_booking(&no_show.booking_uid, &comment)
                    .await?;
            }
            (trigger, _) => {
                debug!(event = %trigger, "Ignoring unhandled webhook event");
            }
        }

        Ok(trigger)
    }

    /// Create a task for a new or requested booking.
    ///
    /// Re-deliveries are detected through the mapping store, keeping this
    /// rule idempotent under at-least-once delivery.
    async fn reconcile_created(&self, booking: &BookingPayload) -> SinkResult<()> {
        if let Some(task_id) = self.store.get(&booking.uid).await? {
            info!(
                booking_uid = %booking.uid,
                task_id = %task_id,
                "Task already exists for booking - skipping"
            );
            return Ok(());
        }

        let task_id = self.tasks.create(booking).await?;
        self.store.save(&booking.uid, &task_id).await?;
        info!(
            booking_uid = %booking.uid,
            task_id = %task_id,
            "Created task for booking"
        );
        Ok(())
    }

    /// Reconcile a reschedule.
    ///
    /// Cal.com reissues the booking under a new uid and supplies the replaced
    /// booking's uid in `rescheduleUid`. The mapping is resolved first under
    /// the prior uid (migration case), then under the new uid (redelivery or
    /// re-reschedule), and finally degrades to creation, making the rule
    /// total.
    async fn reconcile_rescheduled(&self, booking: &BookingPayload) -> SinkResult<()> {
        let mut prior_uid: Option<&str> = None;
        let mut task_id: Option<String> = None;

        if let Some(reschedule_uid) = &booking.reschedule_uid {
            task_id = self.store.get(reschedule_uid).await?;
            if task_id.is_some() {
                prior_uid = Some(reschedule_uid);
            }
        }

        if task_id.is_none() {
            task_id = self.store.get(&booking.uid).await?;
        }

        let Some(task_id) = task_id else {
            info!(
                booking_uid = %booking.uid,
                reschedule_uid = ?booking.reschedule_uid,
                "No task found for rescheduled booking - creating"
            );
            return self.reconcile_created(booking).await;
        };

        self.tasks.update_schedule(&task_id, booking).await?;

        match prior_uid {
            // Two sequential writes: a crash between them leaves the mapping
            // under the old uid, recovered by the sender's redelivery.
            Some(old_uid) if old_uid != booking.uid => {
                self.store.delete(old_uid).await?;
                self.store.save(&booking.uid, &task_id).await?;
                info!(
                    task_id = %task_id,
                    old_uid = %old_uid,
                    new_uid = %booking.uid,
                    "Updated task and migrated mapping"
                );
            }
            _ => {
                info!(
                    task_id = %task_id,
                    booking_uid = %booking.uid,
                    "Updated task with new schedule"
                );
            }
        }
        Ok(())
    }

    /// Delete the task and mapping for a cancelled or rejected booking.
    async fn reconcile_cancelled(&self, booking: &BookingPayload) -> SinkResult<()> {
        let Some(task_id) = self.store.get(&booking.uid).await? else {
            info!(booking_uid = %booking.uid, "No task found for cancelled booking");
            return Ok(());
        };

        self.tasks.delete(&task_id).await?;
        self.store.delete(&booking.uid).await?;
        info!(
            booking_uid = %booking.uid,
            task_id = %task_id,
            "Deleted task for cancelled booking"
        );
        Ok(())
    }

    /// Stamp the payment stage into the task description.
    async fn reconcile_payment(
        &self,
        booking: &BookingPayload,
        stage: PaymentStage,
    ) -> SinkResult<()> {
        let Some(task_id) = self.store.get(&booking.uid).await? else {
            info!(booking_uid = %booking.uid, "No task found for booking");
            return Ok(());
        };

        self.tasks
            .update_description(&task_id, booking, stage.prefix())
            .await?;
        info!(
            booking_uid = %booking.uid,
            task_id = %task_id,
            stage = ?stage,
            "Updated task with payment status"
        );
        Ok(())
    }

    /// Complete the task once the meeting has ended.
    async fn reconcile_meeting_ended(&self, booking: &BookingPayload) -> SinkResult<()> {
        let Some(task_id) = self.store.get(&booking.uid).await? else {
            info!(booking_uid = %booking.uid, "No task found for booking");
            return Ok(());
        };

        self.tasks.complete(&task_id).await?;
        info!(
            booking_uid = %booking.uid,
            task_id = %task_id,
            "Completed task for ended meeting"
        );
        Ok(())
    }

    /// Append a comment to the task mapped to a booking, if any.
    async fn comment_on_booking(&self, booking_uid: &str, comment: &str) -> SinkResult<()> {
        let Some(task_id) = self.store.get(booking_uid).await? else {
            info!(booking_uid = %booking_uid, "No task found for booking");
            return Ok(());
        };

        self.tasks.add_comment(&task_id, comment).await?;
        info!(
            booking_uid = %booking_uid,
            task_id = %task_id,
            "Added comment to task"
        );
        Ok(())
    }
}
