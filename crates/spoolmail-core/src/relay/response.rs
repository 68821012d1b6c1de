//! Relay response formatting

use crate::store::StoredMessage;

/// Response builder for the wire protocol.
pub struct Response;

impl Response {
    /// Positive reply
    pub fn ok() -> &'static str {
        "OK\n"
    }

    /// Negative reply
    pub fn err() -> &'static str {
        "ERR\n"
    }

    /// LIST reply: a count line, then one subject per line.
    pub fn list(subjects: &[String]) -> String {
        let mut out = format!("{}\n", subjects.len());
        for subject in subjects {
            out.push_str(subject);
            out.push('\n');
        }
        out
    }

    /// READ reply: OK, the three header lines, the body verbatim, and the
    /// terminating dot line.
    pub fn message(message: &StoredMessage) -> String {
        let mut out = format!(
            "OK\n{}\n{}\n{}\n",
            message.sender, message.receiver, message.subject
        );
        if !message.body.is_empty() {
            out.push_str(&message.body);
            if !message.body.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str(".\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_reply() {
        assert_eq!(Response::list(&[]), "0\n");
        assert_eq!(
            Response::list(&["Hi".to_string(), "Re: Hi".to_string()]),
            "2\nHi\nRe: Hi\n"
        );
    }

    #[test]
    fn test_message_reply() {
        let message = StoredMessage {
            sender: "bob".to_string(),
            receiver: "carol".to_string(),
            subject: "Hi".to_string(),
            body: "Hello\n".to_string(),
        };
        assert_eq!(
            Response::message(&message),
            "OK\nbob\ncarol\nHi\nHello\n.\n"
        );
    }

    #[test]
    fn test_message_reply_empty_body() {
        let message = StoredMessage {
            sender: "bob".to_string(),
            receiver: "carol".to_string(),
            subject: "Hi".to_string(),
            body: String::new(),
        };
        assert_eq!(Response::message(&message), "OK\nbob\ncarol\nHi\n.\n");
    }
}
