//! RFC 2229 status codes and status-line detection

use std::fmt;

/// Reply codes a DICT server may send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    DatabasesPresent = 110,
    StrategiesPresent = 111,
    DatabaseInfo = 112,
    HelpText = 113,
    ServerInfo = 114,
    Challenge = 130,
    DefinitionsRetrieved = 150,
    WordDatabaseName = 151,
    MatchesFound = 152,
    StatusInfo = 210,
    Connect = 220,
    Quit = 221,
    AuthOk = 230,
    Ok = 250,
    SendResponse = 330,
    ServerDown = 420,
    Shutdown = 421,
    BadCommand = 500,
    BadParameters = 501,
    CommandNotImplemented = 502,
    ParameterNotImplemented = 503,
    NoAccess = 530,
    UseShowInfo = 531,
    UnknownMechanism = 532,
    BadDatabase = 550,
    BadStrategy = 551,
    NoMatch = 552,
    NoDatabasesPresent = 554,
    NoStrategiesPresent = 555,
}

impl StatusCode {
    /// Map a numeric code to a known status
    pub fn from_code(code: u16) -> Option<Self> {
        use StatusCode::*;

        let status = match code {
            110 => DatabasesPresent,
            111 => StrategiesPresent,
            112 => DatabaseInfo,
            113 => HelpText,
            114 => ServerInfo,
            130 => Challenge,
            150 => DefinitionsRetrieved,
            151 => WordDatabaseName,
            152 => MatchesFound,
            210 => StatusInfo,
            220 => Connect,
            221 => Quit,
            230 => AuthOk,
            250 => Ok,
            330 => SendResponse,
            420 => ServerDown,
            421 => Shutdown,
            500 => BadCommand,
            501 => BadParameters,
            502 => CommandNotImplemented,
            503 => ParameterNotImplemented,
            530 => NoAccess,
            531 => UseShowInfo,
            532 => UnknownMechanism,
            550 => BadDatabase,
            551 => BadStrategy,
            552 => NoMatch,
            554 => NoDatabasesPresent,
            555 => NoStrategiesPresent,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Extract the three-digit prefix of a status line.
///
/// A status line starts with three ASCII digits followed by a space.
pub fn parse_code(line: &str) -> Option<u16> {
    let bytes = line.as_bytes();
    if bytes.len() < 4 || bytes[3] != b' ' || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    line[..3].parse().ok()
}

/// Decide whether `line` is a status line, given the status that was
/// accepted before it.
///
/// Some databases emit body lines that begin with a number, so the
/// candidate is checked against what can legitimately follow `previous`:
/// inside a definition or match listing only `250` ends the block, and
/// right after `150` only `151` may follow. Codes outside RFC 2229 are
/// never statuses.
pub fn classify(line: &str, previous: Option<StatusCode>) -> Option<StatusCode> {
    let candidate = parse_code(line)?;

    let allowed = match previous {
        Some(StatusCode::WordDatabaseName) | Some(StatusCode::MatchesFound) => {
            candidate == StatusCode::Ok.code()
        }
        Some(StatusCode::DefinitionsRetrieved) => candidate == StatusCode::WordDatabaseName.code(),
        _ => true,
    };

    if allowed {
        StatusCode::from_code(candidate)
    } else {
        None
    }
}

/// The text that follows the status code on a status line
pub fn status_text(line: &str) -> &str {
    line.get(4..).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("250 ok"), Some(250));
        assert_eq!(parse_code("220 dict.org dictd <auth.mime> <1@dict>"), Some(220));
        assert_eq!(parse_code("250"), None);
        assert_eq!(parse_code("25 ok"), None);
        assert_eq!(parse_code("2500 ok"), None);
        assert_eq!(parse_code("abc ok"), None);
        assert_eq!(parse_code(""), None);
    }

    #[test]
    fn test_unknown_codes_are_not_statuses() {
        assert_eq!(classify("999 bottles", None), None);
        assert_eq!(classify("123 go", Some(StatusCode::Ok)), None);
    }

    #[test]
    fn test_whitelist_after_word_database_name() {
        let previous = Some(StatusCode::WordDatabaseName);
        for line in ["150 2 definitions", "151 \"a\" wn \"WordNet\"", "552 no match", "220 hi", "500 x"] {
            assert_eq!(classify(line, previous), None, "{line} must be data");
        }
        assert_eq!(classify("250 ok", previous), Some(StatusCode::Ok));
    }

    #[test]
    fn test_whitelist_after_matches_found() {
        let previous = Some(StatusCode::MatchesFound);
        assert_eq!(classify("552 looks like an error", previous), None);
        assert_eq!(classify("152 again", previous), None);
        assert_eq!(classify("250 ok [d/m/c = 0/1/0]", previous), Some(StatusCode::Ok));
    }

    #[test]
    fn test_whitelist_after_definitions_retrieved() {
        let previous = Some(StatusCode::DefinitionsRetrieved);
        assert_eq!(classify("250 ok", previous), None);
        assert_eq!(
            classify("151 \"hello\" wn \"WordNet\"", previous),
            Some(StatusCode::WordDatabaseName)
        );
    }

    #[test]
    fn test_default_accepts_known_codes() {
        assert_eq!(classify("220 banner", None), Some(StatusCode::Connect));
        assert_eq!(classify("552 no match", Some(StatusCode::Ok)), Some(StatusCode::NoMatch));
        assert_eq!(classify("112 info", None), Some(StatusCode::DatabaseInfo));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text("150 2 definitions retrieved"), "2 definitions retrieved");
        assert_eq!(status_text("250"), "");
    }

    #[test]
    fn test_code_roundtrip() {
        for code in [110u16, 151, 221, 250, 420, 555] {
            assert_eq!(StatusCode::from_code(code).map(StatusCode::code), Some(code));
        }
        assert_eq!(StatusCode::from_code(553), None);
    }
}
