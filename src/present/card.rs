use std::fmt;

use crate::verify::{BookingMeta, SeatMeta, TicketMeta, VerificationMeta, VerificationResult};

/// Separator between fields on one display line.
pub const LINE_SEPARATOR: &str = " • ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Badge {
    Approved,
    Rejected,
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::Approved => f.write_str("APPROVED"),
            Badge::Rejected => f.write_str("REJECTED"),
        }
    }
}

/// Display form of one verification outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultCard {
    pub badge: Badge,
    /// Server reason, present only on rejection.
    pub reason: Option<String>,
    /// Derived from `meta`; only lines with at least one field.
    pub lines: Vec<String>,
}

impl ResultCard {
    pub fn from_result(result: &VerificationResult) -> Self {
        let badge = if result.approved {
            Badge::Approved
        } else {
            Badge::Rejected
        };
        let reason = if result.approved {
            None
        } else {
            Some(result.reason.trim().to_string()).filter(|reason| !reason.is_empty())
        };
        let lines = result.meta.as_ref().map(meta_lines).unwrap_or_default();
        Self {
            badge,
            reason,
            lines,
        }
    }
}

impl fmt::Display for ResultCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.badge)?;
        if let Some(reason) = &self.reason {
            write!(f, " {}", reason)?;
        }
        for line in &self.lines {
            write!(f, "\n  {}", line)?;
        }
        Ok(())
    }
}

fn meta_lines(meta: &VerificationMeta) -> Vec<String> {
    [
        meta.ticket.as_ref().and_then(ticket_line),
        meta.booking.as_ref().and_then(booking_line),
        meta.seat.as_ref().and_then(seat_line),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn ticket_line(ticket: &TicketMeta) -> Option<String> {
    let id = ticket.ticket_id.as_ref().filter(|id| !id.is_blank())?;
    Some(format!("Ticket: {}", id))
}

fn booking_line(booking: &BookingMeta) -> Option<String> {
    join_present([
        booking
            .id
            .as_ref()
            .filter(|id| !id.is_blank())
            .map(|id| format!("Booking #{}", id)),
        present(&booking.status).map(|status| format!("Status: {}", status)),
        present(&booking.payment_status).map(|payment| format!("Payment: {}", payment)),
    ])
}

fn seat_line(seat: &SeatMeta) -> Option<String> {
    if let Some(label) = present(&seat.label) {
        return Some(format!("Seat: {}", label));
    }
    let parts = join_present([
        present(&seat.section).map(|section| format!("Section {}", section)),
        seat.row
            .as_ref()
            .filter(|row| !row.is_blank())
            .map(|row| format!("Row {}", row)),
        seat.number
            .as_ref()
            .filter(|number| !number.is_blank())
            .map(|number| format!("Seat {}", number)),
    ])?;
    Some(format!("Seat: {}", parts))
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn join_present<const N: usize>(parts: [Option<String>; N]) -> Option<String> {
    let parts: Vec<String> = parts.into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(LINE_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::interpret_response;

    #[test]
    fn approved_card_matches_door_display() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {
                "ticket": {"ticketId": "T1"},
                "booking": {"id": 7, "status": "confirmed", "payment_status": "paid"}
            }}"#,
        );
        let card = ResultCard::from_result(&result);
        assert_eq!(card.badge, Badge::Approved);
        assert_eq!(card.reason, None);
        assert_eq!(
            card.lines,
            vec![
                "Ticket: T1".to_string(),
                "Booking #7 • Status: confirmed • Payment: paid".to_string(),
            ]
        );
    }

    #[test]
    fn missing_fields_leave_no_separator_artifacts() {
        let result = interpret_response(
            200,
            r#"{"approved": false, "reason": "Ticket already used", "meta": {
                "booking": {"id": 9, "payment_status": "refunded"},
                "seat": {"row": "C", "seat_number": 4}
            }}"#,
        );
        let card = ResultCard::from_result(&result);
        assert_eq!(card.badge, Badge::Rejected);
        assert_eq!(card.reason.as_deref(), Some("Ticket already used"));
        assert_eq!(
            card.lines,
            vec![
                "Booking #9 • Payment: refunded".to_string(),
                "Seat: Row C • Seat 4".to_string(),
            ]
        );
    }

    #[test]
    fn empty_meta_sections_produce_no_lines() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {"ticket": {}, "booking": {"status": " "}, "seat": {}}}"#,
        );
        assert!(ResultCard::from_result(&result).lines.is_empty());
    }

    #[test]
    fn seat_label_wins_over_parts() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {"seat": {"label": "GA Floor", "row": 3}}}"#,
        );
        assert_eq!(
            ResultCard::from_result(&result).lines,
            vec!["Seat: GA Floor".to_string()]
        );
    }

    #[test]
    fn odd_meta_shapes_still_render_approved() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {
                "ticket": {"ticketId": 88, "status": 1},
                "booking": {"id": 7.0, "status": ["confirmed"], "paymentStatus": "paid"},
                "seat": "Balcony A12"
            }}"#,
        );
        let card = ResultCard::from_result(&result);
        assert_eq!(card.badge, Badge::Approved);
        assert_eq!(card.reason, None);
        assert_eq!(
            card.lines,
            vec![
                "Ticket: 88".to_string(),
                "Booking #7 • Payment: paid".to_string(),
                "Seat: Balcony A12".to_string(),
            ]
        );
    }

    #[test]
    fn seat_parts_render_from_numeric_section() {
        let result = interpret_response(
            200,
            r#"{"approved": true, "meta": {"seat": {"section": 3, "row": "C"}}}"#,
        );
        assert_eq!(
            ResultCard::from_result(&result).lines,
            vec!["Seat: Section 3 • Row C".to_string()]
        );
    }

    #[test]
    fn display_renders_badge_reason_and_lines() {
        let card = ResultCard {
            badge: Badge::Rejected,
            reason: Some("not found".into()),
            lines: vec!["Ticket: T9".into()],
        };
        assert_eq!(card.to_string(), "[REJECTED] not found\n  Ticket: T9");
    }
}
