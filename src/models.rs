//! Cal.com webhook entity types and structural payload classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Webhook trigger kinds sent by Cal.com.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerEvent {
    /// A booking was confirmed and scheduled.
    BookingCreated,
    /// A booking was reissued under a new uid with a new time slot.
    BookingRescheduled,
    /// A booking was cancelled by either party.
    BookingCancelled,
    /// A pending booking was rejected by the host.
    BookingRejected,
    /// A booking was requested but awaits host confirmation.
    BookingRequested,
    /// Payment for a paid booking was started.
    BookingPaymentInitiated,
    /// Payment for a paid booking was completed.
    BookingPaid,
    /// The meeting for a booking started.
    MeetingStarted,
    /// The meeting for a booking ended.
    MeetingEnded,
    /// A meeting recording became available.
    RecordingReady,
    /// A routing form was submitted.
    FormSubmitted,
    /// An instant meeting was created.
    InstantMeetingCreated,
    /// An attendee's no-show flag was toggled.
    BookingNoShowUpdated,
    /// The host did not join the Cal Video call.
    AfterHostsCalVideoNoShow,
    /// A guest did not join the Cal Video call.
    AfterGuestsCalVideoNoShow,
    /// Unknown kind (catch-all to avoid parse failures)
    #[serde(other)]
    Unknown,
}

impl TriggerEvent {
    /// Wire-format name of the trigger kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookingCreated => "BOOKING_CREATED",
            Self::BookingRescheduled => "BOOKING_RESCHEDULED",
            Self::BookingCancelled => "BOOKING_CANCELLED",
            Self::BookingRejected => "BOOKING_REJECTED",
            Self::BookingRequested => "BOOKING_REQUESTED",
            Self::BookingPaymentInitiated => "BOOKING_PAYMENT_INITIATED",
            Self::BookingPaid => "BOOKING_PAID",
            Self::MeetingStarted => "MEETING_STARTED",
            Self::MeetingEnded => "MEETING_ENDED",
            Self::RecordingReady => "RECORDING_READY",
            Self::FormSubmitted => "FORM_SUBMITTED",
            Self::InstantMeetingCreated => "INSTANT_MEETING_CREATED",
            Self::BookingNoShowUpdated => "BOOKING_NO_SHOW_UPDATED",
            Self::AfterHostsCalVideoNoShow => "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
            Self::AfterGuestsCalVideoNoShow => "AFTER_GUESTS_CAL_VIDEO_NO_SHOW",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant on a booking (organizer or attendee).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// IANA time zone
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Booking event payload (created, rescheduled, cancelled, payment, meeting).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    /// Unique booking identity; replaced on reschedule
    pub uid: String,
    /// Booking title
    pub title: String,
    /// Event type title
    #[serde(default)]
    pub event_title: Option<String>,
    /// Booking description (markdown)
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form notes added by the booker
    #[serde(default)]
    pub additional_notes: Option<String>,
    /// Scheduled start
    pub start_time: DateTime<Utc>,
    /// Scheduled end
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in minutes
    #[serde(default)]
    pub length: Option<i64>,
    /// Booking host
    pub organizer: Person,
    /// Booked attendees
    #[serde(default)]
    pub attendees: Vec<Person>,
    /// Meeting location (URL or address)
    #[serde(default)]
    pub location: Option<String>,
    /// Booking status (ACCEPTED, PENDING, CANCELLED, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Reason supplied on cancellation
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    /// Uid of the booking this one replaces (set on reschedule)
    #[serde(default)]
    pub reschedule_uid: Option<String>,
}

/// Attendee entry on a no-show event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShowAttendee {
    /// Attendee email
    pub email: String,
    /// Whether the attendee was marked as a no-show
    #[serde(default)]
    pub no_show: bool,
}

/// Payload for `BOOKING_NO_SHOW_UPDATED` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShowPayload {
    /// Human-readable summary of the no-show change
    pub message: String,
    /// Uid of the affected booking
    pub booking_uid: String,
    /// Attendees whose no-show flag changed
    #[serde(default)]
    pub attendees: Vec<NoShowAttendee>,
}

/// Payload for Cal Video host/guest no-show events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoNoShowPayload {
    /// Booking title
    pub title: String,
    /// Uid of the affected booking
    pub booking_uid: String,
    /// Human-readable no-show message
    pub message: String,
    /// Webhook subscription descriptor the event arrived with (opaque)
    #[serde(default)]
    pub webhook: Option<Value>,
}

/// Webhook envelope wrapping every Cal.com event.
///
/// The payload shape varies by trigger kind and carries no discriminant
/// field, so it is held raw until classified by [`EventPayload::classify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    /// Trigger kind
    pub trigger_event: TriggerEvent,
    /// When Cal.com created the event
    #[serde(default)]
    pub created_at: Option<String>,
    /// Raw event payload
    pub payload: Value,
}

/// Classified webhook payload.
///
/// Downstream code matches over this closed enumeration instead of
/// re-inspecting the raw shape.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Full booking payload
    Booking(BookingPayload),
    /// No-show update payload
    NoShow(NoShowPayload),
    /// Cal Video no-show payload
    VideoNoShow(VideoNoShowPayload),
}

impl EventPayload {
    /// Classify a raw payload by field presence.
    ///
    /// The shapes overlap in optional fields, so the predicates must be
    /// evaluated in this fixed order: booking, then no-show, then video
    /// no-show. Payloads matching no predicate (or failing to deserialize
    /// into their matched shape) yield `None` and are dropped upstream.
    #[must_use]
    pub fn classify(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let has = |key: &str| obj.contains_key(key);

        if has("uid") && has("title") && has("attendees") && has("organizer") {
            return serde_json::from_value(raw.clone()).ok().map(Self::Booking);
        }
        if has("message") && has("bookingUid") && !has("title") {
            return serde_json::from_value(raw.clone()).ok().map(Self::NoShow);
        }
        if has("webhook") && has("message") && has("title") {
            return serde_json::from_value(raw.clone())
                .ok()
                .map(Self::VideoNoShow);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn booking_json() -> Value {
        json!({
            "uid": "abc123",
            "title": "Intro Call",
            "eventTitle": "30 Min Meeting",
            "startTime": "2026-09-01T15:00:00Z",
            "endTime": "2026-09-01T15:30:00Z",
            "length": 30,
            "organizer": {"name": "Host", "email": "host@example.com", "timeZone": "UTC"},
            "attendees": [{"name": "Ada", "email": "ada@example.com"}]
        })
    }

    #[test]
    fn test_trigger_event_parse() {
        let event: TriggerEvent = serde_json::from_str("\"BOOKING_CREATED\"").unwrap();
        assert_eq!(event, TriggerEvent::BookingCreated);
        assert_eq!(event.as_str(), "BOOKING_CREATED");
    }

    #[test]
    fn test_trigger_event_unknown_kind() {
        let event: TriggerEvent = serde_json::from_str("\"SOME_FUTURE_EVENT\"").unwrap();
        assert_eq!(event, TriggerEvent::Unknown);
    }

    #[test]
    fn test_classify_booking() {
        let payload = EventPayload::classify(&booking_json()).unwrap();
        let EventPayload::Booking(booking) = payload else {
            panic!("expected booking payload");
        };
        assert_eq!(booking.uid, "abc123");
        assert_eq!(booking.length, Some(30));
        assert_eq!(booking.attendees.len(), 1);
    }

    #[test]
    fn test_classify_no_show() {
        let raw = json!({
            "message": "Ada marked as no-show",
            "bookingUid": "abc123",
            "bookingId": 42,
            "attendees": [{"email": "ada@example.com", "noShow": true}]
        });
        let payload = EventPayload::classify(&raw).unwrap();
        let EventPayload::NoShow(no_show) = payload else {
            panic!("expected no-show payload");
        };
        assert_eq!(no_show.booking_uid, "abc123");
        assert!(no_show.attendees[0].no_show);
    }

    #[test]
    fn test_classify_video_no_show() {
        let raw = json!({
            "title": "Intro Call",
            "bookingUid": "abc123",
            "message": "Host did not join",
            "webhook": {"id": "wh-1", "subscriberUrl": "https://example.com"}
        });
        let payload = EventPayload::classify(&raw).unwrap();
        assert!(matches!(payload, EventPayload::VideoNoShow(_)));
    }

    #[test]
    fn test_classify_precedence_prefers_booking() {
        // A payload carrying booking fields plus no-show fields must classify
        // as a booking, never as a no-show.
        let mut raw = booking_json();
        raw["message"] = json!("spurious");
        raw["bookingUid"] = json!("abc123");
        let payload = EventPayload::classify(&raw).unwrap();
        assert!(matches!(payload, EventPayload::Booking(_)));
    }

    #[test]
    fn test_classify_unrecognized_shape() {
        assert!(EventPayload::classify(&json!({"something": "else"})).is_none());
        assert!(EventPayload::classify(&json!("not an object")).is_none());
    }

    #[test]
    fn test_parse_envelope() {
        let raw = json!({
            "triggerEvent": "BOOKING_RESCHEDULED",
            "createdAt": "2026-08-25T12:00:00Z",
            "payload": booking_json()
        });
        let envelope: WebhookEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.trigger_event, TriggerEvent::BookingRescheduled);
        assert!(EventPayload::classify(&envelope.payload).is_some());
    }
}
