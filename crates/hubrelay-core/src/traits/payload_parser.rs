// # Payload Parser Trait
//
// Defines the interface for extracting entries from a pushed content body.
//
// ## Implementations
//
// - Flickr Atom feeds: `hubrelay-parser-flickr` crate
// - Future: generic Atom, RSS, JSON feeds
//
// ## Best-Effort Contract
//
// Parsing is total: a parser never fails the batch. A body that cannot be
// decoded yields no entries, and an entry that cannot be parsed is dropped
// without affecting its siblings. Entry order in the result matches entry
// order in the payload. The hub is never told about partial failures.
//
// Parsers must only inspect the bytes they are given. They must not
// perform I/O, consult the lease store, or decide where entries go; fan-out
// is owned by the dispatcher.

/// One parsed content item extracted from a push payload
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PushEntry {
    /// URL of the pushed content (e.g. an image)
    pub content_url: String,

    /// Content width in pixels, when the payload carries one
    pub width: Option<u32>,

    /// Content height in pixels, when the payload carries one
    pub height: Option<u32>,

    /// Canonical page link for the content
    pub link: String,

    /// The raw payload fragment this entry was parsed from
    pub raw: String,
}

/// Trait for payload parser implementations
///
/// # Thread Safety
///
/// Implementations must be usable from multiple request-handling tasks at
/// once; parsers are typically stateless.
pub trait PayloadParser: Send + Sync {
    /// Parse a fully buffered push body into ordered entries
    ///
    /// Callers must hand over the complete body; parsing a partial body
    /// produces undefined results. Unparseable entries are skipped, so the
    /// returned vector may be shorter than the payload's entry count, or
    /// empty.
    fn parse(&self, body: &[u8]) -> Vec<PushEntry>;

    /// Get the parser name (for logging/debugging)
    fn parser_name(&self) -> &'static str;
}

/// Helper trait for constructing payload parsers from configuration
pub trait PayloadParserFactory: Send + Sync {
    /// Create a PayloadParser instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this parser type
    fn create(
        &self,
        config: &serde_json::Value,
    ) -> Result<Box<dyn PayloadParser>, crate::Error>;
}
