//! Maps FileMaker program records to the workshop page model.
//!
//! A program record carries its own fields plus two portals: the first
//! lists the program's workshops, the second its scheduled events. Events
//! are attached to workshops by matching titles.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("valid numbering regex"));
static LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r|\n").expect("valid line regex"));
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\r|\n\n").expect("valid paragraph regex"));

const FALLBACK_IMAGE: &str = "/img/globals/C04.webp";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub title: String,
    pub subtitle: String,
    pub image: String,
    pub purpose: Vec<String>,
    pub participants: String,
    pub objectives: Vec<String>,
    pub language: String,
    pub sessions: Vec<WorkshopSession>,
}

impl Workshop {
    /// Shown when the record cannot be fetched or is missing.
    pub fn fallback() -> Self {
        Workshop {
            title: String::new(),
            subtitle: String::new(),
            image: FALLBACK_IMAGE.to_string(),
            purpose: Vec::new(),
            participants: String::new(),
            objectives: Vec::new(),
            language: String::new(),
            sessions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopSession {
    pub title: String,
    pub content: Vec<String>,
    pub dates: Vec<WorkshopDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopDate {
    pub id: String,
    pub date: String,
    pub start_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmRecord {
    field_data: Option<Map<String, Value>>,
    /// Object order matters: workshops first, events second.
    #[serde(default)]
    portal_data: Map<String, Value>,
}

pub struct WorkshopMapper;

impl WorkshopMapper {
    pub fn to_frontend(records: &[Value], locale: &str, slug: &str) -> Workshop {
        let Some(record) = records
            .first()
            .and_then(|r| serde_json::from_value::<FmRecord>(r.clone()).ok())
        else {
            return Workshop::fallback();
        };
        let Some(fields) = record.field_data else {
            return Workshop::fallback();
        };

        let japanese = locale == "ja";
        let suffix = if japanese { "J" } else { "E" };
        let name_key = if japanese { "Workshop::WorkshopNameJ" } else { "Workshop::WorkshopNameE" };
        let purpose_key = if japanese { "Workshop::PurposeJ" } else { "Workshop::PurposeE" };

        let mut portals = record.portal_data.values().map(portal_rows);
        let workshops = portals.next().unwrap_or_default();
        let events = portals.next().unwrap_or_default();

        let sessions = workshops
            .iter()
            .map(|item| {
                let title = strip_numbering(&text(item.get(name_key)));

                let content = PARAGRAPH_RE
                    .split(&text(item.get(purpose_key)))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();

                let dates = events
                    .iter()
                    .filter(|event| event_title(event, name_key).as_deref() == Some(title.as_str()))
                    .map(|event| WorkshopDate {
                        id: text(event.get("WorkshopEvent::ID")),
                        date: text(event.get("WorkshopEvent::EventDate")),
                        start_time: text(event.get("WorkshopEvent::StartTime")),
                    })
                    .collect();

                WorkshopSession { title, content, dates }
            })
            .collect();

        let field = |name: &str| fields.get(&format!("{name}{suffix}"));

        Workshop {
            title: text(field("LearningProgramName")),
            subtitle: text(field("Description")),
            image: format!("/img/globals/{slug}.webp"),
            purpose: lines(field("Benefit")),
            // Field name as spelled in the FileMaker layout.
            participants: text(field("Partecipants")),
            objectives: lines(field("Objectives")),
            language: text(field("Language")),
            sessions,
        }
    }
}

fn portal_rows(portal: &Value) -> Vec<Map<String, Value>> {
    portal
        .as_array()
        .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
        .unwrap_or_default()
}

/// Strings as-is, numbers in decimal, anything else empty.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Non-empty trimmed lines; non-string values give nothing.
fn lines(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => LINE_RE
            .split(s)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn strip_numbering(title: &str) -> String {
    NUMBERING_RE.replace(title, "").into_owned()
}

/// An event's session name with numbering removed. Events lacking the name
/// field match no session.
fn event_title(event: &Map<String, Value>, name_key: &str) -> Option<String> {
    match event.get(name_key) {
        None | Some(Value::Null) => None,
        value => Some(strip_numbering(&text(value))),
    }
}
