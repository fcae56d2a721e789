//! Access ticket (TA) parsing.
//!
//! A ticket is the `loginTicketResponse` document returned by WSAA:
//!
//! ```xml
//! <loginTicketResponse version="1.0">
//!   <header>
//!     <source>CN=wsaahomo, O=AFIP, C=AR</source>
//!     <destination>SERIALNUMBER=CUIT 20111111112, CN=app</destination>
//!     <generationTime>2026-10-19T10:00:00.000-03:00</generationTime>
//!     <expirationTime>2026-10-19T22:00:00.000-03:00</expirationTime>
//!   </header>
//!   <credentials>
//!     <token>...</token>
//!     <sign>...</sign>
//!   </credentials>
//! </loginTicketResponse>
//! ```

use chrono::{DateTime, Duration, FixedOffset, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

/// The document is not well-formed XML.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Malformed ticket: {0}")]
pub struct TicketParseError(pub String);

/// A parsed access ticket.
///
/// Missing elements parse as empty strings or `None`; only malformed XML
/// is rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct Ticket {
    pub token: String,
    pub sign: String,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub generation_time: Option<DateTime<FixedOffset>>,
    pub expiration_time: Option<DateTime<FixedOffset>>,
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("token", &"[REDACTED]")
            .field("sign", &"[REDACTED]")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("generation_time", &self.generation_time)
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Field {
    Token,
    Sign,
    Source,
    Destination,
    GenerationTime,
    ExpirationTime,
}

/// Field for an element path `root/section/leaf`. Deeper or shallower
/// matches are ignored.
fn field_at(stack: &[String]) -> Option<Field> {
    match stack {
        [_, section, leaf] => match (section.as_str(), leaf.as_str()) {
            ("credentials", "token") => Some(Field::Token),
            ("credentials", "sign") => Some(Field::Sign),
            ("header", "source") => Some(Field::Source),
            ("header", "destination") => Some(Field::Destination),
            ("header", "generationTime") => Some(Field::GenerationTime),
            ("header", "expirationTime") => Some(Field::ExpirationTime),
            _ => None,
        },
        _ => None,
    }
}

fn parse_time(raw: Option<String>) -> Option<DateTime<FixedOffset>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
}

impl Ticket {
    /// Parse a serialized ticket.
    pub fn parse(raw: &[u8]) -> Result<Self, TicketParseError> {
        let xml = std::str::from_utf8(raw)
            .map_err(|e| TicketParseError(format!("Invalid UTF-8: {e}")))?;

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<String> = Vec::new();
        let mut seen_root = false;
        let mut fields: [Option<String>; 6] = Default::default();
        // Only the first occurrence of each section and of each leaf counts.
        let mut sections: Vec<String> = Vec::new();
        let mut in_first_section = false;
        let mut done = [false; 6];

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    if seen_root && stack.is_empty() {
                        return Err(TicketParseError("Multiple root elements".to_string()));
                    }
                    seen_root = true;
                    let name = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                    if stack.len() == 1 {
                        in_first_section = !sections.contains(&name);
                        sections.push(name.clone());
                    }
                    stack.push(name);
                }
                Ok(Event::Empty(ref e)) => {
                    if seen_root && stack.is_empty() {
                        return Err(TicketParseError("Multiple root elements".to_string()));
                    }
                    seen_root = true;
                    let name = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                    match stack.len() {
                        1 => sections.push(name),
                        2 if in_first_section => {
                            stack.push(name);
                            if let Some(field) = field_at(&stack) {
                                let i = field as usize;
                                if !done[i] {
                                    fields[i].get_or_insert_with(String::new);
                                    done[i] = true;
                                }
                            }
                            stack.pop();
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => {
                    if in_first_section {
                        if let Some(field) = field_at(&stack) {
                            done[field as usize] = true;
                        }
                    }
                    stack.pop();
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map_err(|e| TicketParseError(format!("Bad entity: {e}")))?;
                    if stack.is_empty() {
                        return Err(TicketParseError(
                            "Text outside the root element".to_string(),
                        ));
                    }
                    if let Some(field) = field_at(&stack).filter(|_| in_first_section) {
                        if !done[field as usize] {
                            fields[field as usize]
                                .get_or_insert_with(String::new)
                                .push_str(&text);
                        }
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some(field) = field_at(&stack).filter(|_| in_first_section) {
                        if !done[field as usize] {
                            fields[field as usize]
                                .get_or_insert_with(String::new)
                                .push_str(&String::from_utf8_lossy(e));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TicketParseError(format!(
                        "XML parse error at {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        if !seen_root {
            return Err(TicketParseError("No root element".to_string()));
        }
        if !stack.is_empty() {
            return Err(TicketParseError(format!(
                "Unclosed element <{}>",
                stack.join("/")
            )));
        }

        let [token, sign, source, destination, generation_time, expiration_time] = fields;

        Ok(Self {
            token: token.unwrap_or_default(),
            sign: sign.unwrap_or_default(),
            source,
            destination,
            generation_time: parse_time(generation_time),
            expiration_time: parse_time(expiration_time),
        })
    }

    /// Whether the ticket is unusable at `now`, counting `leeway` ahead.
    ///
    /// A ticket without a readable expiration is treated as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expiration_time {
            Some(expiration) => expiration.with_timezone(&Utc) <= now + leeway,
            None => true,
        }
    }

    #[must_use]
    pub fn is_expired(&self, leeway: Duration) -> bool {
        self.is_expired_at(Utc::now(), leeway)
    }

    /// Time left before expiration at `now`, if any.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expiration_time
            .map(|e| e.with_timezone(&Utc) - now)
            .filter(|d| *d > Duration::zero())
    }
}
