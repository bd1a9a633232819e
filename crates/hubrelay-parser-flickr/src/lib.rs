// # Flickr Atom Payload Parser
//
// Parses the Atom feeds Flickr's hub pushes on photo events into
// [`PushEntry`] values.
//
// ## Payload Shape
//
// Each `<entry>` carries a Media RSS `<media:content url width height/>`
// element, an Atom `<id>` of the form `tag:flickr.com,2005:/photo/{id}`,
// and an `<author><uri>` pointing at the photographer's people page. The
// canonical photo page link is derived from the author uri (`/people/`
// rewritten to `/photos/`) plus the photo id.
//
// ## Best-Effort Contract
//
// Parsing never fails the batch: an entry missing any required piece is
// skipped and its siblings are unaffected. Entry order is preserved. The
// raw `<entry>` fragment travels with each parsed entry so downstream
// consumers can reach fields this parser does not model.
//
// Per the parser seam's constraints this crate performs no I/O, holds no
// state between calls, and makes no dispatch decisions.

use hubrelay_core::traits::{PayloadParser, PayloadParserFactory, PushEntry};
use hubrelay_core::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

/// Prefix of the author uri that is rewritten into the photo page link
const PEOPLE_URL_PREFIX: &str = "http://www.flickr.com/people/";

/// Replacement prefix for the canonical photo page link
const PHOTOS_URL_PREFIX: &str = "http://www.flickr.com/photos/";

/// Flickr Atom feed parser
///
/// Stateless; one instance can serve every request-handling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlickrAtomParser;

impl FlickrAtomParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }
}

/// Fields accumulated for the entry currently being read
#[derive(Default)]
struct EntryDraft {
    content_url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    id_text: Option<String>,
    author_uri: Option<String>,
}

impl EntryDraft {
    /// Absorb the attributes of a `<media:content>` element
    fn absorb_media_content(&mut self, element: &BytesStart<'_>) {
        for attr in element.attributes().flatten() {
            let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
            let value = attr.unescape_value().unwrap_or_default();

            match key {
                "url" => self.content_url = Some(value.to_string()),
                "width" => self.width = value.parse().ok(),
                "height" => self.height = value.parse().ok(),
                _ => {}
            }
        }
    }

    /// Turn the draft into an entry, or `None` if a required piece is missing
    ///
    /// The photo id is the third `/`-segment of the `<id>` tag's third
    /// `:`-segment (`tag:flickr.com,2005:/photo/{id}`).
    fn finish(self, raw: &str) -> Option<PushEntry> {
        let content_url = self.content_url?;
        let id_text = self.id_text?;
        let author_uri = self.author_uri?;

        let photo_id = id_text.split(':').nth(2)?.split('/').nth(2)?;
        if photo_id.is_empty() {
            return None;
        }

        let link = format!(
            "{}{}/",
            author_uri.replace(PEOPLE_URL_PREFIX, PHOTOS_URL_PREFIX),
            photo_id
        );

        Some(PushEntry {
            content_url,
            width: self.width,
            height: self.height,
            link,
            raw: raw.trim().to_string(),
        })
    }
}

impl PayloadParser for FlickrAtomParser {
    fn parse(&self, body: &[u8]) -> Vec<PushEntry> {
        let Ok(text) = std::str::from_utf8(body) else {
            debug!("Push body is not valid UTF-8, yielding no entries");
            return Vec::new();
        };

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut draft: Option<EntryDraft> = None;
        let mut entry_start = 0usize;
        let mut in_id = false;
        let mut in_author = false;
        let mut in_author_uri = false;

        loop {
            let pos = reader.buffer_position();
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"entry" => {
                        draft = Some(EntryDraft::default());
                        entry_start = pos;
                    }
                    // Feed-level <id> elements are ignored; only entry
                    // children matter.
                    b"id" if draft.is_some() => in_id = true,
                    b"author" if draft.is_some() => in_author = true,
                    b"uri" if in_author => in_author_uri = true,
                    b"media:content" => {
                        if let Some(draft) = draft.as_mut() {
                            draft.absorb_media_content(&e);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"media:content" {
                        if let Some(draft) = draft.as_mut() {
                            draft.absorb_media_content(&e);
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(draft) = draft.as_mut() {
                        let value = t.unescape().unwrap_or_default();
                        if in_id {
                            draft.id_text = Some(value.to_string());
                        } else if in_author_uri {
                            draft.author_uri = Some(value.to_string());
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"id" => in_id = false,
                    b"uri" => in_author_uri = false,
                    b"author" => in_author = false,
                    b"entry" => {
                        let raw = &text[entry_start..reader.buffer_position()];
                        match draft.take().and_then(|d| d.finish(raw)) {
                            Some(entry) => entries.push(entry),
                            None => {
                                debug!("Skipping entry with missing or unusable fields");
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    // Best-effort: keep whatever parsed cleanly before the
                    // damage.
                    debug!("XML error in push body, stopping at: {e}");
                    break;
                }
                _ => {}
            }
        }

        entries
    }

    fn parser_name(&self) -> &'static str {
        "flickr"
    }
}

/// Factory for config-driven construction
#[derive(Debug, Default)]
pub struct FlickrParserFactory;

impl PayloadParserFactory for FlickrParserFactory {
    fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn PayloadParser>> {
        Ok(Box::new(FlickrAtomParser::new()))
    }
}

/// Register this parser with a component registry under `"flickr"`
pub fn register(registry: &hubrelay_core::ComponentRegistry) {
    registry.register_parser("flickr", std::sync::Arc::new(FlickrParserFactory));
}
