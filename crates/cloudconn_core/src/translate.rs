//! Native to unified error translation.
//!
//! Each provider contributes an [`ErrorTable`]: an ordered list of
//! [`Rule`]s mapping native identifiers to an [`ErrorKind`]. Tables are
//! plain data, so supporting a new provider means adding a table, not
//! touching the translator.
//!
//! ## Matching order
//!
//! Within a table, code rules are tried first, then message-pattern rules,
//! then status rules. Inside each group the declaration order decides and
//! the first match wins. Anything no rule matches is [`ErrorKind::Unknown`].

use crate::error::{ConnectorError, ErrorKind};
use crate::native::NativeError;
use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

/// What a rule looks at in a native error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Matcher {
    /// Exact native error code.
    Code {
        /// The code to compare against.
        code: Cow<'static, str>,
    },
    /// Case-insensitive substring of the native message.
    Message {
        /// The substring to look for.
        pattern: Cow<'static, str>,
    },
    /// Exact status.
    Status {
        /// The status to compare against.
        status: u16,
    },
    /// Inclusive status range.
    StatusRange {
        /// Lowest matching status.
        from: u16,
        /// Highest matching status.
        to: u16,
    },
}

impl Matcher {
    fn precedence(&self) -> u8 {
        match self {
            Matcher::Code { .. } => 0,
            Matcher::Message { .. } => 1,
            Matcher::Status { .. } | Matcher::StatusRange { .. } => 2,
        }
    }

    fn matches(&self, native: &NativeError) -> bool {
        match self {
            Matcher::Code { code } => native.code() == Some(code.as_ref()),
            Matcher::Message { pattern } => native
                .message()
                .to_ascii_lowercase()
                .contains(&pattern.to_ascii_lowercase()),
            Matcher::Status { status } => native.status() == Some(*status),
            Matcher::StatusRange { from, to } => {
                native.status().is_some_and(|s| (*from..=*to).contains(&s))
            }
        }
    }
}

/// One entry of an error table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// What to match.
    #[serde(flatten)]
    pub matcher: Matcher,
    /// The kind a match translates to.
    pub kind: ErrorKind,
}

impl Rule {
    /// Matches an exact native code.
    #[must_use]
    pub const fn code(code: &'static str, kind: ErrorKind) -> Self {
        Self {
            matcher: Matcher::Code {
                code: Cow::Borrowed(code),
            },
            kind,
        }
    }

    /// Matches a case-insensitive message substring.
    #[must_use]
    pub const fn message(pattern: &'static str, kind: ErrorKind) -> Self {
        Self {
            matcher: Matcher::Message {
                pattern: Cow::Borrowed(pattern),
            },
            kind,
        }
    }

    /// Matches an exact status.
    #[must_use]
    pub const fn status(status: u16, kind: ErrorKind) -> Self {
        Self {
            matcher: Matcher::Status { status },
            kind,
        }
    }

    /// Matches an inclusive status range.
    #[must_use]
    pub const fn status_range(from: u16, to: u16, kind: ErrorKind) -> Self {
        Self {
            matcher: Matcher::StatusRange { from, to },
            kind,
        }
    }
}

/// The translation rules of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTable {
    /// Provider the rules apply to.
    pub provider: ProviderId,
    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl ErrorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            rules: Vec::new(),
        }
    }

    /// Creates a table from statically declared rules.
    #[must_use]
    pub fn from_static(provider: ProviderId, rules: &'static [Rule]) -> Self {
        Self {
            provider,
            rules: rules.to_vec(),
        }
    }

    /// The table for local filesystem errors.
    #[must_use]
    pub fn io() -> Self {
        Self::from_static(ProviderId::Local, IO_ERROR_RULES)
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Places `overrides` ahead of the existing rules.
    pub fn prepend(&mut self, overrides: impl IntoIterator<Item = Rule>) {
        let mut rules: Vec<Rule> = overrides.into_iter().collect();
        rules.append(&mut self.rules);
        self.rules = rules;
    }

    /// Finds the kind of the first matching rule.
    #[must_use]
    pub fn classify(&self, native: &NativeError) -> Option<ErrorKind> {
        (0..=2).find_map(|precedence| {
            self.rules
                .iter()
                .filter(|rule| rule.matcher.precedence() == precedence)
                .find(|rule| rule.matcher.matches(native))
                .map(|rule| rule.kind)
        })
    }
}

/// Rules for `std::io::Error`s, keyed by their `io::ErrorKind` name.
///
/// Used for the local filesystem, both as a backend and as the source or
/// destination of uploads and downloads.
pub static IO_ERROR_RULES: &[Rule] = &[
    Rule::code("NotFound", ErrorKind::NotFound),
    Rule::code("PermissionDenied", ErrorKind::PermissionDenied),
    Rule::code("ReadOnlyFilesystem", ErrorKind::PermissionDenied),
    Rule::code("AlreadyExists", ErrorKind::Conflict),
    Rule::code("DirectoryNotEmpty", ErrorKind::Conflict),
    Rule::code("InvalidInput", ErrorKind::InvalidInput),
    Rule::code("InvalidFilename", ErrorKind::InvalidInput),
    Rule::code("NotADirectory", ErrorKind::InvalidInput),
    Rule::code("IsADirectory", ErrorKind::InvalidInput),
    Rule::code("TimedOut", ErrorKind::Transient),
    Rule::code("Interrupted", ErrorKind::Transient),
    Rule::code("WouldBlock", ErrorKind::Transient),
    Rule::code("ResourceBusy", ErrorKind::Transient),
];

/// Maps native errors of any registered provider to [`ConnectorError`]s.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    tables: HashMap<ProviderId, ErrorTable>,
}

impl Translator {
    /// Creates a translator with no tables; everything translates to `Unknown`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, builder-style.
    #[must_use]
    pub fn with_table(mut self, table: ErrorTable) -> Self {
        self.insert(table);
        self
    }

    /// Adds a table, replacing any previous table of the same provider.
    pub fn insert(&mut self, table: ErrorTable) {
        self.tables.insert(table.provider, table);
    }

    /// Places extra rules ahead of a provider's table, creating it if needed.
    pub fn override_rules(&mut self, provider: ProviderId, rules: impl IntoIterator<Item = Rule>) {
        self.tables
            .entry(provider)
            .or_insert_with(|| ErrorTable::new(provider))
            .prepend(rules);
    }

    /// Returns the table of a provider.
    #[must_use]
    pub fn table(&self, provider: ProviderId) -> Option<&ErrorTable> {
        self.tables.get(&provider)
    }

    /// Classifies a native error of `provider`.
    #[must_use]
    pub fn classify(&self, native: &NativeError, provider: ProviderId) -> ErrorKind {
        self.tables
            .get(&provider)
            .and_then(|table| table.classify(native))
            .unwrap_or(ErrorKind::Unknown)
    }

    /// Translates a native error, chaining it as the cause.
    ///
    /// Never fails: unmapped errors become `Unknown`.
    #[must_use]
    pub fn translate(&self, native: NativeError, provider: ProviderId) -> ConnectorError {
        let kind = self.classify(&native, provider);
        debug!(
            %provider,
            %kind,
            code = native.code().unwrap_or("-"),
            status = native.status().unwrap_or(0),
            "translated native error"
        );
        ConnectorError::new(kind, native.to_string())
            .with_provider(provider)
            .with_source(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::VendorError;
    use serde_json::json;
    use std::error::Error as _;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("{message}")]
    struct Fault {
        code: Option<String>,
        status: Option<u16>,
        message: String,
    }

    impl VendorError for Fault {
        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.as_deref().map(Cow::Borrowed)
        }

        fn status(&self) -> Option<u16> {
            self.status
        }
    }

    fn native(code: Option<&str>, status: Option<u16>, message: &str) -> NativeError {
        NativeError::new(Fault {
            code: code.map(str::to_string),
            status,
            message: message.to_string(),
        })
    }

    static RULES: &[Rule] = &[
        Rule::status(404, ErrorKind::NotFound),
        Rule::code("NoSuchKey", ErrorKind::NotFound),
        Rule::code("SlowDown", ErrorKind::Transient),
        Rule::message("throttl", ErrorKind::Transient),
        Rule::status_range(500, 599, ErrorKind::Transient),
        Rule::code("AccessDenied", ErrorKind::PermissionDenied),
    ];

    fn translator() -> Translator {
        Translator::new().with_table(ErrorTable::from_static(ProviderId::Aws, RULES))
    }

    #[test]
    fn mapped_codes_translate_to_configured_kind() {
        let t = translator();
        for rule in RULES {
            if let Matcher::Code { code } = &rule.matcher {
                let err = t.translate(native(Some(code.as_ref()), None, "x"), ProviderId::Aws);
                assert_eq!(err.kind(), rule.kind, "{code}");
            }
        }
    }

    #[test]
    fn code_rules_beat_status_rules() {
        let t = translator();
        let err = t.translate(native(Some("AccessDenied"), Some(503), "x"), ProviderId::Aws);
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn message_rules_beat_status_rules_and_ignore_case() {
        let t = translator();
        let err = t.translate(native(None, Some(404), "Request THROTTLED"), ProviderId::Aws);
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn status_ranges_match_inclusively() {
        let t = translator();
        for status in [500, 503, 599] {
            assert_eq!(
                t.classify(&native(None, Some(status), "x"), ProviderId::Aws),
                ErrorKind::Transient
            );
        }
        assert_eq!(
            t.classify(&native(None, Some(600), "x"), ProviderId::Aws),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn unmapped_errors_are_unknown_and_keep_cause() {
        let t = translator();
        let err = t.translate(native(Some("Teapot"), Some(418), "short and stout"), ProviderId::Aws);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.native_code(), Some("Teapot"));
        assert_eq!(err.native_status(), Some(418));
        let cause = err.source().expect("cause preserved");
        assert!(cause.to_string().contains("short and stout"));
    }

    #[test]
    fn providers_without_table_translate_to_unknown() {
        let t = translator();
        let err = t.translate(native(Some("NoSuchKey"), None, "x"), ProviderId::Gcp);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.provider(), Some(ProviderId::Gcp));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut t = translator();
        t.override_rules(
            ProviderId::Aws,
            [Rule::code("NoSuchKey", ErrorKind::Conflict)],
        );
        assert_eq!(
            t.classify(&native(Some("NoSuchKey"), None, "x"), ProviderId::Aws),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn io_table_classifies_filesystem_errors() {
        use std::io;
        let t = Translator::new().with_table(ErrorTable::io());
        let cases = [
            (io::ErrorKind::NotFound, ErrorKind::NotFound),
            (io::ErrorKind::PermissionDenied, ErrorKind::PermissionDenied),
            (io::ErrorKind::AlreadyExists, ErrorKind::Conflict),
            (io::ErrorKind::TimedOut, ErrorKind::Transient),
            (io::ErrorKind::InvalidData, ErrorKind::Unknown),
        ];
        for (io_kind, expected) in cases {
            let native = NativeError::from(io::Error::new(io_kind, "fs"));
            assert_eq!(t.classify(&native, ProviderId::Local), expected, "{io_kind:?}");
        }
    }

    #[test]
    fn tables_deserialize_from_json() {
        let table: ErrorTable = serde_json::from_value(json!({
            "provider": "gcp",
            "rules": [
                {"match": "code", "code": "notFound", "kind": "not_found"},
                {"match": "status_range", "from": 500, "to": 504, "kind": "transient"},
                {"match": "message", "pattern": "quota", "kind": "transient"}
            ]
        }))
        .unwrap();

        assert_eq!(table.provider, ProviderId::Gcp);
        assert_eq!(table.rules.len(), 3);
        assert_eq!(table.rules[0], Rule::code("notFound", ErrorKind::NotFound));
        assert_eq!(
            table.classify(&native(None, Some(502), "x")),
            Some(ErrorKind::Transient)
        );
    }
}
