//! Task content formatting.
//!
//! Pure functions mapping a booking payload to the Todoist task fields.
//! The description line order and conditional-omission policy are fixed:
//! downstream updates regenerate the whole description, so every event kind
//! must produce the same block for the same booking.

use chrono::SecondsFormat;

use crate::models::BookingPayload;

/// Task title: booking title plus the first attendee's name.
#[must_use]
pub fn task_content(booking: &BookingPayload) -> String {
    let attendee = booking
        .attendees
        .first()
        .map_or("Unknown", |a| a.name.as_str());
    format!("{} with {}", booking.title, attendee)
}

/// Due timestamp: booking start time as an RFC 3339 UTC instant.
#[must_use]
pub fn due_date(booking: &BookingPayload) -> String {
    booking
        .start_time
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Task description block.
///
/// Lines appear in a fixed order, each omitted when its source field is
/// absent: optional status prefix and blank line, event title, duration,
/// location, attendees, notes, and the booking uid.
#[must_use]
pub fn description(booking: &BookingPayload, prefix: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(prefix) = prefix {
        parts.push(prefix.to_string());
        parts.push(String::new());
    }

    if let Some(event_title) = &booking.event_title {
        parts.push(format!("Event: {event_title}"));
    }

    if let Some(length) = booking.length {
        parts.push(format!("Duration: {length} minutes"));
    }

    if let Some(location) = &booking.location {
        parts.push(format!("Location: {location}"));
    }

    if !booking.attendees.is_empty() {
        let attendee_info = booking
            .attendees
            .iter()
            .map(|a| format!("{} ({})", a.name, a.email))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Attendees: {attendee_info}"));
    }

    if let Some(notes) = &booking.additional_notes {
        parts.push(String::new());
        parts.push(format!("Notes: {notes}"));
    }

    parts.push(String::new());
    parts.push(format!("Booking ID: {}", booking.uid));

    parts.join("\n")
}
