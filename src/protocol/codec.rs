//! DICT wire protocol codec
//!
//! DICT is a line-oriented text protocol:
//! ```text
//! <command> [<argument> ...]\r\n
//! ```
//! Replies are UTF-8 lines terminated by CRLF. Text blocks end with a
//! line holding a single `.`; body lines that start with a dot are sent
//! with the dot doubled.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Longest line accepted from a server
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Read one line from the stream, without its terminator
///
/// Returns `Ok(None)` once the peer has closed the connection. A
/// trailing fragment without a line terminator is dropped.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>, Error> {
    let mut buf = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_LENGTH as u64);

    let bytes_read = limited.read_until(b'\n', &mut buf).await?;
    if bytes_read == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') {
        if bytes_read >= MAX_LINE_LENGTH {
            return Err(Error::Parse(format!(
                "line longer than {} bytes",
                MAX_LINE_LENGTH
            )));
        }
        tracing::debug!(bytes = bytes_read, "Dropping unterminated trailing fragment");
        return Ok(None);
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Write a line to the stream, appending CRLF
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), Error> {
    if line.contains(['\r', '\n']) {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "command line must not contain line terminators",
        )));
    }

    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;

    Ok(())
}

/// Undo dot-stuffing on a text line
pub fn unstuff(line: &str) -> &str {
    if line.starts_with("..") {
        &line[1..]
    } else {
        line
    }
}

/// Whether `line` terminates a text block
pub fn is_terminator(line: &str) -> bool {
    line == "."
}

/// Quote a command argument so that spaces and quotes survive
///
/// The argument is wrapped in single quotes; embedded single quotes are
/// written as `'\''`.
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Split a line into whitespace-separated fields, honouring quotes
///
/// Single quotes are literal up to the closing quote. Inside double
/// quotes a backslash escapes the next character, as it does outside
/// any quotes. An unterminated quote runs to the end of the line.
pub fn split_quoted(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_field = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_field = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_field = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(c),
                    }
                }
            }
            '\\' => {
                in_field = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_field {
                    fields.push(std::mem::take(&mut current));
                    in_field = false;
                }
            }
            _ => {
                in_field = true;
                current.push(c);
            }
        }
    }

    if in_field {
        fields.push(current);
    }

    fields
}

/// Split a server reply into fields
///
/// A field is either a bare token or a double-quoted string running to
/// the next `"`. Single quotes and backslashes are ordinary characters.
pub fn split_reply_fields(text: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        match chars.peek().copied() {
            None => break,
            Some('"') => {
                chars.next();
                fields.push(chars.by_ref().take_while(|&c| c != '"').collect());
            }
            Some(_) => {
                let mut field = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    field.push(c);
                }
                fields.push(field);
            }
        }
    }

    fields
}

/// Split a `name "text"` listing line into its two parts
///
/// Used for database, strategy and match listings. A line without a
/// space yields an empty text.
pub fn split_listing(line: &str) -> (String, String) {
    match line.split_once(' ') {
        Some((name, rest)) => (name.to_string(), split_reply_fields(rest).join(" ")),
        None => (line.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_lines() {
        let data = b"220 dict.org ready\r\n250 ok\r\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_line(&mut reader).await.unwrap().as_deref(), Some("220 dict.org ready"));
        assert_eq!(read_line(&mut reader).await.unwrap().as_deref(), Some("250 ok"));
        assert_eq!(read_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_drops_trailing_fragment() {
        let data = b"250 ok\r\n221 by";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        assert_eq!(read_line(&mut reader).await.unwrap().as_deref(), Some("250 ok"));
        assert_eq!(read_line(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_rejects_invalid_utf8() {
        let data = b"151 \"caf\xe9\" wn \"WordNet\"\r\n";
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        let err = read_line(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_read_line_keeps_utf8() {
        let data = "151 \"café\" wn \"WordNet\"\r\n".as_bytes();
        let mut reader = BufReader::new(Cursor::new(data.to_vec()));

        let line = read_line(&mut reader).await.unwrap().unwrap();
        assert_eq!(line, "151 \"café\" wn \"WordNet\"");
    }

    #[tokio::test]
    async fn test_write_line() {
        let mut output = Vec::new();
        write_line(&mut output, "SHOW DB").await.unwrap();
        assert_eq!(output, b"SHOW DB\r\n");
    }

    #[tokio::test]
    async fn test_write_line_rejects_embedded_newline() {
        let mut output = Vec::new();
        assert!(write_line(&mut output, "DEFINE ! 'a\r\nQUIT'").await.is_err());
        assert!(output.is_empty());
    }

    #[test]
    fn test_unstuff() {
        assert_eq!(unstuff("..."), "..");
        assert_eq!(unstuff(".. indented"), ". indented");
        assert_eq!(unstuff(".x"), ".x");
        assert_eq!(unstuff("plain"), "plain");
        assert!(is_terminator("."));
        assert!(!is_terminator(".."));
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("hello"), "'hello'");
        assert_eq!(quote("it's"), "'it'\\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_quote_split_roundtrip() {
        let words = [
            "hello",
            "two words",
            "it's",
            "say \"cheese\"",
            "back\\slash",
            "'quoted'",
            "  padded  ",
            "mixed ' \" \\ all",
            "naïve café",
        ];
        for word in words {
            let line = format!("DEFINE ! {}", quote(word));
            let fields = split_quoted(&line);
            assert_eq!(fields.len(), 3, "{line}");
            assert_eq!(fields[2], word, "{line}");
        }
    }

    #[test]
    fn test_split_quoted_definition_header() {
        let fields = split_quoted("\"hello\" wn \"WordNet (r) 3.0 (2006)\"");
        assert_eq!(fields, vec!["hello", "wn", "WordNet (r) 3.0 (2006)"]);

        let fields = split_quoted("hello gcide \"The Collaborative International Dictionary\"");
        assert_eq!(fields[0], "hello");
        assert_eq!(fields[1], "gcide");
    }

    #[test]
    fn test_split_quoted_escapes_in_double_quotes() {
        let fields = split_quoted(r#""say \"hi\"" db"#);
        assert_eq!(fields, vec!["say \"hi\"", "db"]);
    }

    #[test]
    fn test_reply_fields_are_bare_or_double_quoted() {
        assert_eq!(
            split_reply_fields("\"hello\" wn \"WordNet (r) 3.0 (2006)\""),
            vec!["hello", "wn", "WordNet (r) 3.0 (2006)"]
        );
        assert_eq!(
            split_reply_fields("o'clock wn \"WordNet\""),
            vec!["o'clock", "wn", "WordNet"]
        );
        assert_eq!(
            split_reply_fields(r#"path db "C:\dir\file""#),
            vec!["path", "db", r"C:\dir\file"]
        );
        assert_eq!(split_reply_fields("  \"\"  x "), vec!["", "x"]);
        assert_eq!(split_reply_fields("\"unterminated text"), vec!["unterminated text"]);
    }

    #[test]
    fn test_split_listing() {
        assert_eq!(
            split_listing("foldoc \"Free On-line Dictionary of Computing\""),
            ("foldoc".to_string(), "Free On-line Dictionary of Computing".to_string())
        );
        assert_eq!(
            split_listing("wn \"don't panic\""),
            ("wn".to_string(), "don't panic".to_string())
        );
        assert_eq!(
            split_listing(r#"wn "C:\dir\file""#),
            ("wn".to_string(), r"C:\dir\file".to_string())
        );
        assert_eq!(split_listing("lonely"), ("lonely".to_string(), String::new()));
    }
}
