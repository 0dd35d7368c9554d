//! Notification rendering.
//!
//! Renders diffs and snapshots into a `Document` of typed blocks first, and
//! only then into Telegram's HTML dialect. Grouping order and which sections
//! appear are decided here; markup lives in `to_html` alone.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::diff::DiffResult;
use crate::incident::{Incident, Snapshot};

pub const NEW_HEADING: &str = "NEW";
pub const REMOVED_HEADING: &str = "REMOVED";

const MAJOR_HEADING: &str = "Traffic Incidents";
const ROADWORK_HEADING: &str = "Expressway Roadworks";
const LINK_LABEL: &str = "Estimated Location";
const EMPTY_NOTE: &str = "No incidents reported";
const TIMESTAMP_FORMAT: &str = "%d %b %Y %H:%M";

/// Which pinned summary is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Major,
    Roadwork,
}

impl SummaryKind {
    fn heading(self) -> &'static str {
        match self {
            SummaryKind::Major => MAJOR_HEADING,
            SummaryKind::Roadwork => ROADWORK_HEADING,
        }
    }

    fn cadence_note(self) -> &'static str {
        match self {
            SummaryKind::Major => "Updated every 2 min",
            SummaryKind::Roadwork => "Updated every 10 min",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Note(String),
    Timestamp(String),
    Category(String),
    Entry { message: String, link: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub blocks: Vec<Block>,
}

impl Section {
    fn titled(heading: &str) -> Self {
        Self {
            heading: Some(heading.to_string()),
            blocks: Vec::new(),
        }
    }

    fn untitled() -> Self {
        Self {
            heading: None,
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.heading.as_deref() == Some(heading))
    }
}

/// Render the change list for one cycle. Empty diff gives an empty document.
pub fn render_diff(diff: &DiffResult) -> Document {
    let mut doc = Document::default();

    if !diff.added.is_empty() {
        let mut section = Section::titled(NEW_HEADING);
        for incident in &diff.added {
            section.blocks.push(Block::Category(incident.category.clone()));
            section.blocks.push(entry(incident, true));
        }
        doc.sections.push(section);
    }

    if !diff.removed.is_empty() {
        let mut section = Section::titled(REMOVED_HEADING);
        for incident in &diff.removed {
            section.blocks.push(Block::Category(incident.category.clone()));
            section.blocks.push(entry(incident, false));
        }
        doc.sections.push(section);
    }

    doc
}

/// Render the full pinned summary for a snapshot.
pub fn render_snapshot(snapshot: &Snapshot, kind: SummaryKind, timestamp: DateTime<Tz>) -> Document {
    let mut header = Section::titled(kind.heading());
    header.blocks.push(Block::Note(kind.cadence_note().to_string()));
    header.blocks.push(Block::Timestamp(timestamp.format(TIMESTAMP_FORMAT).to_string()));

    let mut doc = Document {
        sections: vec![header],
    };

    if snapshot.is_empty() {
        doc.sections[0].blocks.push(Block::Note(EMPTY_NOTE.to_string()));
        return doc;
    }

    match kind {
        SummaryKind::Roadwork => {
            let mut body = Section::untitled();
            body.blocks.extend(snapshot.iter().map(|i| entry(i, false)));
            doc.sections.push(body);
        }
        SummaryKind::Major => {
            for (category, incidents) in group_by_category(snapshot) {
                let mut group = Section::untitled();
                group.blocks.push(Block::Category(category.to_string()));
                group.blocks.extend(incidents.into_iter().map(|i| entry(i, true)));
                doc.sections.push(group);
            }
        }
    }

    doc
}

fn entry(incident: &Incident, with_link: bool) -> Block {
    Block::Entry {
        message: incident.message.clone(),
        link: with_link.then(|| incident.location_link()),
    }
}

/// Groups in first-seen category order; incidents keep feed order within a group.
fn group_by_category(snapshot: &Snapshot) -> Vec<(&str, Vec<&Incident>)> {
    let mut groups: Vec<(&str, Vec<&Incident>)> = Vec::new();
    for incident in snapshot {
        match groups.iter_mut().find(|(c, _)| *c == incident.category) {
            Some((_, members)) => members.push(incident),
            None => groups.push((incident.category.as_str(), vec![incident])),
        }
    }
    groups
}

/// Telegram HTML (`parse_mode=HTML`) for a document.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::new();
    for (idx, section) in doc.sections.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if let Some(heading) = &section.heading {
            out.push_str(&format!("<b><u>{}</u></b>\n", escape_html(heading)));
        }
        for block in &section.blocks {
            match block {
                Block::Note(text) => out.push_str(&format!("<i>{}</i>\n", escape_html(text))),
                Block::Timestamp(ts) => {
                    out.push_str(&format!("<i>Last updated: {}</i>\n", escape_html(ts)))
                }
                Block::Category(name) => {
                    out.push_str(&format!("\n<b>{}</b>\n", escape_html(name)))
                }
                Block::Entry { message, link } => {
                    out.push_str(&escape_html(message));
                    out.push('\n');
                    if let Some(link) = link {
                        out.push_str(&format!(
                            "<a href=\"{}\">{}</a>\n",
                            escape_html(link),
                            LINK_LABEL
                        ));
                    }
                }
            }
        }
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
