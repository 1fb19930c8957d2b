use std::fmt::{self, Write as _};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Default record layout for log scopes
pub const DEFAULT_FORMAT: &str = "[{level}] {timestamp} {thread}-{target}: {message}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Timestamp,
    Level,
    Thread,
    Target,
    Message,
}

/// Event formatter driven by a placeholder template.
///
/// Recognized placeholders are `{timestamp}`, `{level}`, `{thread}`,
/// `{target}` and `{message}`. Anything else is copied through as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFormat {
    pieces: Vec<Piece>,
}

impl Default for TemplateFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_FORMAT)
    }
}

impl TemplateFormat {
    pub fn parse(template: &str) -> Self {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let tail = &rest[open..];

            let Some(close) = tail.find('}') else {
                rest = tail;
                break;
            };

            let piece = match &tail[1..close] {
                "timestamp" => Some(Piece::Timestamp),
                "level" => Some(Piece::Level),
                "thread" => Some(Piece::Thread),
                "target" => Some(Piece::Target),
                "message" => Some(Piece::Message),
                _ => None,
            };

            match piece {
                Some(piece) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(piece);
                }
                None => literal.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Self { pieces }
    }

    /// True when the template renders the event message somewhere
    pub fn has_message(&self) -> bool {
        self.pieces.contains(&Piece::Message)
    }
}

impl<S, N> FormatEvent<S, N> for TemplateFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => writer.write_str(text)?,
                Piece::Timestamp => SystemTime.format_time(&mut writer)?,
                Piece::Level => write!(writer, "{}", metadata.level())?,
                Piece::Thread => {
                    let thread = std::thread::current();
                    writer.write_str(thread.name().unwrap_or("unnamed"))?;
                }
                Piece::Target => writer.write_str(metadata.target())?,
                Piece::Message => ctx.field_format().format_fields(writer.by_ref(), event)?,
            }
        }

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_placeholders() {
        let format = TemplateFormat::parse("[{level}] {thread}: {message}");
        assert_eq!(
            format.pieces,
            vec![
                Piece::Literal("[".into()),
                Piece::Level,
                Piece::Literal("] ".into()),
                Piece::Thread,
                Piece::Literal(": ".into()),
                Piece::Message,
            ]
        );
        assert!(format.has_message());
    }

    #[test]
    fn test_parse_keeps_unknown_text() {
        let format = TemplateFormat::parse("FILE-{processName} {message} {unclosed");
        assert_eq!(
            format.pieces,
            vec![
                Piece::Literal("FILE-{processName} ".into()),
                Piece::Message,
                Piece::Literal(" {unclosed".into()),
            ]
        );
    }

    #[test]
    fn test_parse_plain_text() {
        let format = TemplateFormat::parse("no placeholders");
        assert_eq!(format.pieces, vec![Piece::Literal("no placeholders".into())]);
        assert!(!format.has_message());
    }

    #[test]
    fn test_default_format_renders_message() {
        assert!(TemplateFormat::default().has_message());
    }
}
