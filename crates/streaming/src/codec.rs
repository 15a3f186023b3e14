//! JSON codec for [`Message`]s.
//!
//! One message per line when framed as JSON lines. Blank lines are skipped;
//! errors carry the 1-based line number.

use crate::error::{Result, StreamingError};
use crate::protocol::Message;

pub fn encode(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(input: &str) -> Result<Message> {
    Ok(serde_json::from_str(input)?)
}

/// Encode as JSON lines, each message terminated by `\n`.
pub fn encode_lines<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Result<String> {
    let mut out = String::new();
    for message in messages {
        out.push_str(&encode(message)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn decode_lines(input: &str) -> Result<Vec<Message>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| StreamingError::Line { line: idx + 1, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::InstanceRecord;

    #[test]
    fn test_lines_preserve_order() {
        let messages = vec![
            Message::InstancesUpdated {
                cluster: "a".into(),
                revision: 1,
                instances: vec![InstanceRecord::new("x", "h", 1, 100)],
            },
            Message::ClusterDropped { cluster: "a".into() },
        ];
        let text = encode_lines(&messages).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(decode_lines(&text).unwrap(), messages);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let text = "\n{\"type\":\"cluster_dropped\",\"cluster\":\"a\"}\n   \n";
        assert_eq!(decode_lines(text).unwrap().len(), 1);
    }

    #[test]
    fn test_error_reports_line_number() {
        let text = "{\"type\":\"cluster_dropped\",\"cluster\":\"a\"}\n\n{\"type\":\"bogus\"}\n";
        match decode_lines(text).unwrap_err() {
            StreamingError::Line { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(matches!(decode("{\"type\":\"nope\"}"), Err(StreamingError::Codec(_))));
    }
}
