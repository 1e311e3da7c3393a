//! Email bodies for bookings and contact messages.
//!
//! Customer-facing mail is localized through [`ServerMessages`]; staff
//! notifications are always English. Every value that came from a form is
//! escaped before it is placed in HTML.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

use crate::booking::Booking;
use crate::config::{EmailConfig, SiteConfig};
use crate::remote::OutgoingEmail;
use crate::slot::BookingSlot;
use crate::validation::ContactInput;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"));

/// Localized strings for customer email.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMessages {
    pub subject: &'static str,
    pub rescheduled_subject: &'static str,
    pub header: &'static str,
    pub rescheduled_header: &'static str,
    /// `{name}`
    pub hi: &'static str,
    pub thanks: &'static str,
    /// `{date}`, `{time}`
    pub see_you: &'static str,
    pub service_booked: &'static str,
    pub service_name: &'static str,
    pub zoom_link: &'static str,
    pub staff: &'static str,
    pub staff_name: &'static str,
    pub manage: &'static str,
    pub contact: &'static str,
    pub support_email: &'static str,
    pub add_to_calendar: &'static str,
    pub team_name: &'static str,
}

const JA: ServerMessages = ServerMessages {
    subject: "無料コーチングのご予約を承りました",
    rescheduled_subject: "無料コーチングのご予約を変更しました",
    header: "ご予約ありがとうございます",
    rescheduled_header: "ご予約の日時を変更しました",
    hi: "{name}様",
    thanks: "無料コーチングセッションにお申し込みいただきありがとうございます。",
    see_you: "{date} {time}（日本時間）にお会いできるのを楽しみにしております。",
    service_booked: "ご予約内容",
    service_name: "無料コーチングセッション（30分）",
    zoom_link: "Zoomリンク",
    staff: "担当",
    staff_name: "JBS講師",
    manage: "ご予約の変更・キャンセルはこちら",
    contact: "ご不明な点がございましたら、お気軽にお問い合わせください。",
    support_email: "info@j-globalbizschool.com",
    add_to_calendar: "Googleカレンダーに追加",
    team_name: "JBSチーム",
};

const EN: ServerMessages = ServerMessages {
    subject: "Your free coaching session is booked",
    rescheduled_subject: "Your free coaching session has been rescheduled",
    header: "Thank you for your booking",
    rescheduled_header: "Your booking has been moved",
    hi: "Hi {name},",
    thanks: "Thank you for booking a free coaching session with us.",
    see_you: "We look forward to seeing you on {date} at {time} (JST).",
    service_booked: "Service booked",
    service_name: "Free coaching session (30 minutes)",
    zoom_link: "Zoom link",
    staff: "Staff",
    staff_name: "JBS Lecturer",
    manage: "Reschedule or cancel your booking",
    contact: "If you have any questions, feel free to contact us.",
    support_email: "info@j-globalbizschool.com",
    add_to_calendar: "Add to Google Calendar",
    team_name: "The JBS Team",
};

impl ServerMessages {
    /// `en` for English, Japanese for everything else.
    pub fn for_locale(locale: &str) -> &'static ServerMessages {
        match locale {
            "en" => &EN,
            _ => &JA,
        }
    }
}

/// Replace `{key}` placeholders. Keys without a value become empty.
pub fn interpolate(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// An "add to Google Calendar" template link for the slot.
pub fn google_calendar_url(slot: &BookingSlot) -> String {
    format!(
        "https://calendar.google.com/calendar/render?action=TEMPLATE&text=Free+Coaching+Session&dates={}/{}&details=Your+free+coaching+session&location=Online",
        compact_utc(slot.start),
        compact_utc(slot.end)
    )
}

fn compact_utc(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Builds outgoing mail with the site links and recipients filled in.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    base_url: String,
    zoom_link: String,
    lecturer_email: String,
}

impl EmailTemplates {
    pub fn new(site: &SiteConfig, email: &EmailConfig) -> Self {
        EmailTemplates {
            base_url: site.base_url.trim_end_matches('/').to_string(),
            zoom_link: site.zoom_link.clone(),
            lecturer_email: email.lecturer_email.clone(),
        }
    }

    pub fn manage_url(&self, locale: &str, booking: &Booking) -> String {
        format!(
            "{}/{}/free-coaching/manage/{}",
            self.base_url,
            locale,
            booking.cancellation_token.hyphenated()
        )
    }

    /// Confirmation for the person who booked. Rescheduled bookings get
    /// their own subject and header.
    pub fn booking_confirmation(&self, locale: &str, booking: &Booking) -> OutgoingEmail {
        let messages = ServerMessages::for_locale(locale);
        let slot = BookingSlot::starting_at(booking.event_date);
        let (subject, header) = if booking.is_rescheduled_booking() {
            (messages.rescheduled_subject, messages.rescheduled_header)
        } else {
            (messages.subject, messages.header)
        };

        let name = if locale == "ja" { &booking.last_name } else { &booking.first_name };
        let date = slot.local_date();
        let time = slot.local_time();
        let join_url = booking.zoom_join_url.as_deref().unwrap_or_default();
        let link_text = if self.zoom_link.is_empty() { join_url } else { self.zoom_link.as_str() };

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333; line-height: 1.6; padding: 20px;">
  <div style="text-align: center; margin-bottom: 20px;">
    <img src="https://j-globalbizschool.com/logo.avif" alt="Company Logo" style="max-width: 150px;" />
  </div>
  <h2 style="text-align: center; color: #2563eb; margin-bottom: 30px;">{header}</h2>
  <p>{greeting}</p>
  <p>{thanks}<br/>{see_you}</p>
  <p>
    <strong>{service_booked}:</strong> {service_name}<br/>
    <strong>{zoom_label}:</strong> <a href="{join_url}" style="color:#2563eb;">{link_text}</a><br/>
    <strong>{staff}:</strong> {staff_name}
  </p>
  <p><a href="{manage_url}" style="color:#2563eb;">{manage}</a></p>
  <p>{contact}<br/><a href="mailto:{support}" style="color:#2563eb;">{support}</a></p>
  <p style="text-align: center; margin-top: 30px;">
    <a href="{calendar_url}" target="_blank" rel="noopener noreferrer" style="display:inline-block; padding: 12px 24px; background-color:#2563eb; color:white; font-weight:600; border-radius:12px; text-decoration:none;">{add_to_calendar}</a>
  </p>
  <p style="margin-top: 40px;">{team}</p>
</div>"#,
            greeting = interpolate(messages.hi, &[("name", escape_html(name).as_str())]),
            thanks = messages.thanks,
            see_you = interpolate(messages.see_you, &[("date", date.as_str()), ("time", time.as_str())]),
            service_booked = messages.service_booked,
            service_name = messages.service_name,
            zoom_label = messages.zoom_link,
            join_url = escape_html(join_url),
            link_text = escape_html(link_text),
            staff = messages.staff,
            staff_name = messages.staff_name,
            manage_url = escape_html(&self.manage_url(locale, booking)),
            manage = messages.manage,
            contact = messages.contact,
            support = messages.support_email,
            calendar_url = escape_html(&google_calendar_url(&slot)),
            add_to_calendar = messages.add_to_calendar,
            team = messages.team_name,
        );

        OutgoingEmail {
            to: vec![booking.email.clone()],
            subject: subject.to_string(),
            html,
        }
    }

    pub fn lecturer_notification(&self, booking: &Booking) -> OutgoingEmail {
        let slot = BookingSlot::starting_at(booking.event_date);
        let (subject, intro) = if booking.is_rescheduled_booking() {
            ("Free Coaching Booking Rescheduled", "A free coaching session has been moved to a new time.")
        } else {
            ("New Free Coaching Booking Received", "A new user has booked a free coaching session.")
        };

        let mut details = format!(
            "<strong>Name:</strong> {} {}<br/>\n<strong>Email:</strong> {}<br/>\n",
            escape_html(&booking.first_name),
            escape_html(&booking.last_name),
            escape_html(&booking.email)
        );
        if let Some(phone) = booking.phone_number.as_deref().filter(|p| !p.trim().is_empty()) {
            details.push_str(&format!("<strong>Phone Number:</strong> {}<br/>\n", escape_html(phone)));
        }
        if let Some(message) = booking.message.as_deref().filter(|m| !m.trim().is_empty()) {
            details.push_str(&format!("<strong>Message:</strong> {}<br/>\n", escape_html(message)));
        }
        details.push_str(&format!(
            "<strong>Date:</strong> {}<br/>\n<strong>Time:</strong> {} (JST)<br/>",
            slot.local_date(),
            slot.local_time()
        ));

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333; padding: 20px;">
  <h2>{subject}</h2>
  <p>{intro}</p>
  <p>
{details}
  </p>
  <p>You can find the event details and the Zoom link in the calendar event description.</p>
  <p>Booking Notification System</p>
</div>"#
        );

        self.to_lecturer(subject, html)
    }

    pub fn cancellation_notification(&self, booking: &Booking) -> OutgoingEmail {
        let slot = BookingSlot::starting_at(booking.event_date);
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333; padding: 20px;">
  <h2>Free Coaching Booking Cancelled</h2>
  <p>
    <strong>Name:</strong> {} {}<br/>
    <strong>Email:</strong> {}<br/>
    <strong>Date:</strong> {}<br/>
    <strong>Time:</strong> {} (JST)
  </p>
  <p>Booking Notification System</p>
</div>"#,
            escape_html(&booking.first_name),
            escape_html(&booking.last_name),
            escape_html(&booking.email),
            slot.local_date(),
            slot.local_time()
        );

        self.to_lecturer("Free Coaching Booking Cancelled", html)
    }

    pub fn contact_notification(&self, contact: &ContactInput) -> OutgoingEmail {
        let message = escape_html(&contact.message).replace('\n', "<br/>");
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333; padding: 20px;">
  <h2>New Contact Message</h2>
  <p>
    <strong>Name:</strong> {} {}<br/>
    <strong>Email:</strong> {}
  </p>
  <p>{message}</p>
</div>"#,
            escape_html(&contact.first_name),
            escape_html(&contact.last_name),
            escape_html(&contact.email)
        );

        self.to_lecturer("New Contact Message Received", html)
    }

    fn to_lecturer(&self, subject: &str, html: String) -> OutgoingEmail {
        OutgoingEmail {
            to: vec![self.lecturer_email.clone()],
            subject: subject.to_string(),
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn templates() -> EmailTemplates {
        EmailTemplates::new(
            &SiteConfig {
                base_url: "https://jbs.example/".to_string(),
                zoom_link: String::new(),
            },
            &EmailConfig {
                resend_api_key: "re_test".to_string(),
                from: "JBS <noreply@jbs.example>".to_string(),
                lecturer_email: "lecturer@jbs.example".to_string(),
            },
        )
    }

    fn booking() -> Booking {
        let event_date = Utc.with_ymd_and_hms(2025, 4, 10, 1, 0, 0).unwrap();
        Booking {
            id: 7,
            cancellation_token: Uuid::parse_str("3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b").unwrap(),
            session_id: None,
            first_name: "Hana".to_string(),
            last_name: "Sato".to_string(),
            email: "hana@example.com".to_string(),
            phone_number: Some("090-0000-0000".to_string()),
            message: Some("<script>alert(1)</script>".to_string()),
            event_date,
            status: BookingStatus::Confirmed,
            google_calendar_event_id: None,
            zoom_meeting_id: Some("123".to_string()),
            zoom_join_url: Some("https://zoom.us/j/123".to_string()),
            created_at: event_date,
            rescheduled_at: None,
            cancelled_at: None,
            original_booking_id: None,
        }
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate("Hi {name}, {missing}!", &[("name", "Hana")]), "Hi Hana, !");
        assert_eq!(interpolate("no placeholders", &[]), "no placeholders");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_calendar_url_uses_compact_utc() {
        let slot = BookingSlot::from_local("2025-04-10", "10:00").unwrap();
        let url = google_calendar_url(&slot);
        assert!(url.contains("dates=20250410T010000Z/20250410T013000Z"));
    }

    #[test]
    fn test_for_locale_defaults_to_japanese() {
        assert_eq!(ServerMessages::for_locale("en").hi, "Hi {name},");
        assert_eq!(ServerMessages::for_locale("fr"), ServerMessages::for_locale("ja"));
    }

    #[test]
    fn test_confirmation_greets_by_locale() {
        let ja = templates().booking_confirmation("ja", &booking());
        assert!(ja.html.contains("Sato様"));
        assert_eq!(ja.subject, JA.subject);

        let en = templates().booking_confirmation("en", &booking());
        assert!(en.html.contains("Hi Hana,"));
        assert!(en.html.contains("2025-04-10 at 10:00"));
        assert_eq!(en.to, vec!["hana@example.com"]);
    }

    #[test]
    fn test_confirmation_links() {
        let email = templates().booking_confirmation("en", &booking());
        assert!(email.html.contains("https://jbs.example/en/free-coaching/manage/3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b"));
        assert!(email.html.contains(r#"href="https://zoom.us/j/123""#));
        assert!(email.html.contains("action=TEMPLATE&amp;text=Free+Coaching+Session"));
    }

    #[test]
    fn test_rescheduled_confirmation_subject() {
        let mut moved = booking();
        moved.original_booking_id = Some(3);
        let email = templates().booking_confirmation("ja", &moved);
        assert_eq!(email.subject, JA.rescheduled_subject);
    }

    #[test]
    fn test_lecturer_notification_escapes_input() {
        let email = templates().lecturer_notification(&booking());
        assert_eq!(email.to, vec!["lecturer@jbs.example"]);
        assert_eq!(email.subject, "New Free Coaching Booking Received");
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("<strong>Time:</strong> 10:00 (JST)"));
    }

    #[test]
    fn test_lecturer_notification_skips_blank_optional_fields() {
        let mut plain = booking();
        plain.phone_number = Some("  ".to_string());
        plain.message = None;
        let email = templates().lecturer_notification(&plain);
        assert!(!email.html.contains("Phone Number"));
        assert!(!email.html.contains("Message:"));
    }

    #[test]
    fn test_contact_notification() {
        let contact = ContactInput {
            first_name: "Ken".to_string(),
            last_name: "Ito".to_string(),
            email: "ken@example.com".to_string(),
            message: "Line one\nLine <two>".to_string(),
        };
        let email = templates().contact_notification(&contact);
        assert!(email.html.contains("Line one<br/>Line &lt;two&gt;"));
        assert_eq!(email.to, vec!["lecturer@jbs.example"]);
    }
}
