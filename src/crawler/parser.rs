//! Streaming HTML extraction
//!
//! Pages are run through the html5ever tokenizer in a single forward pass;
//! no document tree is built. The token sink decides what each tag means for
//! the crawl and records it as a [`PageEvent`]. It does no I/O and touches no
//! shared state, so the coordinator applies the events afterwards, in
//! document order.

use crate::url::{match_extension, resolve_reference, same_host};
use crate::UrlError;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use html5ever::TokenizerResult;
use std::cell::{Cell, RefCell};
use url::Url;

/// Bytes handed to the tokenizer per feed
const CHUNK_SIZE: usize = 8 * 1024;

/// What the extractor should look for on a page
#[derive(Debug, Clone, Copy)]
pub struct ExtractPolicy<'a> {
    /// The page has depth budget for another hop
    pub follow_links: bool,

    /// Links to other hosts are followed too
    pub external_webpages: bool,

    /// Target file extensions
    pub file_types: &'a [String],

    /// Track `<title>` so the page itself can be saved under its title
    pub save_full_html: bool,
}

/// Something found on a page, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A link to crawl (absolute, fragment stripped, in scope)
    Link(Url),

    /// A resource to download, with the target extension it matched
    Resource { url: Url, ext: String },

    /// A `data:` URI from a `src` attribute
    InlineAsset(String),

    /// A complete `<title>` region; the page should be saved under this text
    Snapshot { title: String },

    /// A reference that could not be resolved
    Diagnostic(String),
}

/// Result of extracting one page
#[derive(Debug, Default)]
pub struct Extraction {
    pub events: Vec<PageEvent>,

    /// Tokenizer parse errors (malformed markup); informational only
    pub parse_errors: usize,
}

/// Extracts links and resource references from a page
///
/// # Arguments
///
/// * `text` - The decoded page text
/// * `page_url` - The page's canonical URL, used to resolve references
/// * `policy` - What to extract
///
/// # Examples
///
/// ```
/// use harvester::crawler::{extract_page, ExtractPolicy, PageEvent};
/// use url::Url;
///
/// let page = Url::parse("http://a.test/").unwrap();
/// let types = vec!["jpg".to_string()];
/// let policy = ExtractPolicy {
///     follow_links: true,
///     external_webpages: false,
///     file_types: &types,
///     save_full_html: false,
/// };
///
/// let out = extract_page(r#"<a href="/b">b</a><img src="pic.jpg">"#, &page, &policy);
/// assert_eq!(out.events.len(), 2);
/// assert!(matches!(&out.events[1], PageEvent::Resource { ext, .. } if ext == ".jpg"));
/// ```
pub fn extract_page(text: &str, page_url: &Url, policy: &ExtractPolicy<'_>) -> Extraction {
    let tokenizer = Tokenizer::new(ResourceSink::new(page_url, policy), TokenizerOpts::default());
    let queue = BufferQueue::default();

    for chunk in chunks(text, CHUNK_SIZE) {
        queue.push_back(StrTendril::from_slice(chunk));
        match tokenizer.feed(&queue) {
            TokenizerResult::Done => {}
            // The sink never hands back script handles
            TokenizerResult::Script(()) => {}
        }
    }
    tokenizer.end();

    tokenizer.sink.into_extraction()
}

struct ResourceSink<'a> {
    page_url: &'a Url,
    policy: &'a ExtractPolicy<'a>,
    title_depth: Cell<u32>,
    title_text: RefCell<String>,
    parse_errors: Cell<usize>,
    events: RefCell<Vec<PageEvent>>,
}

impl<'a> ResourceSink<'a> {
    fn new(page_url: &'a Url, policy: &'a ExtractPolicy<'a>) -> Self {
        Self {
            page_url,
            policy,
            title_depth: Cell::new(0),
            title_text: RefCell::new(String::new()),
            parse_errors: Cell::new(0),
            events: RefCell::new(Vec::new()),
        }
    }

    fn emit(&self, event: PageEvent) {
        self.events.borrow_mut().push(event);
    }

    fn tag(&self, tag: &Tag) -> TokenSinkResult<()> {
        let name = &*tag.name;

        if name == "title" && self.policy.save_full_html {
            self.title_boundary(tag);
            return raw_text_state(tag);
        }

        for attr in &tag.attrs {
            let key = &*attr.name.local;

            if name == "a" && key == "href" && self.policy.follow_links {
                self.link(&attr.value);
                break;
            } else if key == "src" || (name == "link" && key == "href") {
                self.resource(&attr.value);
                break;
            }
        }

        raw_text_state(tag)
    }

    fn title_boundary(&self, tag: &Tag) {
        match tag.kind {
            TagKind::StartTag if !tag.self_closing => {
                self.title_depth.set(self.title_depth.get() + 1);
            }
            TagKind::EndTag if self.title_depth.get() > 0 => {
                let depth = self.title_depth.get() - 1;
                self.title_depth.set(depth);
                if depth == 0 {
                    self.flush_title();
                }
            }
            _ => {}
        }
    }

    fn flush_title(&self) {
        let title = std::mem::take(&mut *self.title_text.borrow_mut());
        if !title.is_empty() {
            self.emit(PageEvent::Snapshot { title });
        }
    }

    fn link(&self, href: &str) {
        if href.starts_with("javascript:") {
            return;
        }

        let Some(url) = self.resolve(href) else {
            return;
        };

        if !self.policy.external_webpages && !same_host(&url, self.page_url) {
            return;
        }

        self.emit(PageEvent::Link(url));
    }

    fn resource(&self, value: &str) {
        if value.starts_with("data:") {
            self.emit(PageEvent::InlineAsset(value.to_string()));
            return;
        }

        let Some(found) = match_extension(value, self.policy.file_types) else {
            return;
        };

        if let Some(url) = self.resolve(found.truncate(value)) {
            self.emit(PageEvent::Resource { url, ext: found.ext });
        }
    }

    // Unparseable references are reported; non-web schemes are dropped quietly
    fn resolve(&self, reference: &str) -> Option<Url> {
        match resolve_reference(self.page_url, reference) {
            Ok(url) => Some(url),
            Err(e @ UrlError::Parse(_)) => {
                self.emit(PageEvent::Diagnostic(format!("Error resolving ref url: {e}")));
                None
            }
            Err(_) => None,
        }
    }

    fn into_extraction(self) -> Extraction {
        if self.title_depth.get() > 0 {
            self.flush_title();
        }

        Extraction {
            events: self.events.into_inner(),
            parse_errors: self.parse_errors.get(),
        }
    }
}

impl TokenSink for ResourceSink<'_> {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => return self.tag(&tag),
            Token::CharacterTokens(text) if self.title_depth.get() > 0 => {
                self.title_text.borrow_mut().push_str(&text);
            }
            Token::ParseError(_) => self.parse_errors.set(self.parse_errors.get() + 1),
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tells the tokenizer which elements hold raw text rather than markup
fn raw_text_state(tag: &Tag) -> TokenSinkResult<()> {
    if tag.kind != TagKind::StartTag || tag.self_closing {
        return TokenSinkResult::Continue;
    }

    match &*tag.name {
        "script" => TokenSinkResult::RawData(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
            TokenSinkResult::RawData(RawKind::Rawtext)
        }
        "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
        "plaintext" => TokenSinkResult::Plaintext,
        _ => TokenSinkResult::Continue,
    }
}

/// Splits `text` into pieces of about `size` bytes on char boundaries
fn chunks(text: &str, size: usize) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}
