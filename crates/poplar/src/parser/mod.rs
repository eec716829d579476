//! POP3 line parsers.

/// A raw command line split into keyword and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Keyword, upper-cased.
    pub keyword: String,
    /// Arguments in order of appearance.
    pub args: Vec<String>,
}

/// Parses a client command line (without its line terminator).
///
/// Keywords are case-insensitive and arguments are separated by spaces:
/// - `list 2` → `LIST`, `["2"]`
/// - `TOP 1 10` → `TOP`, `["1", "10"]`
///
/// The argument of `PASS` is the remainder of the line after a single
/// space, so a password may itself contain spaces (RFC 1939 section 7).
#[must_use]
pub fn parse_request(line: &str) -> Request {
    let line = line.trim_end_matches(['\r', '\n']);
    let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
    let keyword = keyword.to_ascii_uppercase();

    let args = if keyword == "PASS" {
        if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest.to_string()]
        }
    } else {
        rest.split_ascii_whitespace().map(str::to_string).collect()
    };

    Request { keyword, args }
}
