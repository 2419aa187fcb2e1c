//! Console sink: JSON documents on stdout

use super::EventSink;
use crate::error::Result;
use crate::types::PublishedEvent;
use async_trait::async_trait;
use std::io::Write;

/// Writes each published event as a JSON document
///
/// By default every event is one line. With `pretty` the documents are
/// indented and span several lines, so consumers that split on newlines
/// must not use it; the output is still a valid stream of JSON values.
///
/// The whole batch is serialized before anything is written, so a
/// serialization failure leaves stdout untouched.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pretty: bool,
}

impl ConsoleSink {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, events: &[PublishedEvent]) -> Result<String> {
        let mut out = String::new();
        for event in events {
            let line = if self.pretty {
                serde_json::to_string_pretty(event)?
            } else {
                serde_json::to_string(event)?
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl EventSink for ConsoleSink {
    async fn publish(&self, events: &[PublishedEvent]) -> Result<()> {
        let rendered = self.render(events)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuditRecord;
    use chrono::{DateTime, Utc};

    #[test]
    fn test_render_one_line_per_event() {
        let sink = ConsoleSink::new(false);
        let event = PublishedEvent {
            timestamp: DateTime::<Utc>::default(),
            record_type: "CloudTrail".to_string(),
            cloudtrail: AuditRecord {
                event_name: "ConsoleLogin".to_string(),
                ..Default::default()
            },
        };

        let out = sink.render(&[event.clone(), event]).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let doc: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(doc["type"], "CloudTrail");
        assert_eq!(doc["cloudtrail"]["eventName"], "ConsoleLogin");
        assert_eq!(doc["@timestamp"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_render_pretty_is_a_json_stream() {
        let sink = ConsoleSink::new(true);
        let event = PublishedEvent {
            timestamp: DateTime::<Utc>::default(),
            record_type: "CloudTrail".to_string(),
            cloudtrail: AuditRecord {
                event_name: "GetObject".to_string(),
                ..Default::default()
            },
        };

        let out = sink.render(&[event.clone(), event]).unwrap();
        assert!(out.lines().count() > 2);

        let docs: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&out)
            .into_iter()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["cloudtrail"]["eventName"], "GetObject");
    }
}
