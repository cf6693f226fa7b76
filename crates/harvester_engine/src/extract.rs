use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

const DEFAULT_MAX_ANCHORS: usize = 5_000;

/// Anchors and visible text of one HTML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPage {
    /// Raw `href` values in document order, trimmed, empties dropped.
    pub anchors: Vec<String>,
    /// Text content with scripts and styles removed, whitespace collapsed.
    pub text: String,
}

/// The HTML parse capability used by crawl workers.
pub trait PageParser: Send + Sync {
    fn parse(&self, html: &str) -> ParsedPage;
}

/// `scraper`-backed parser walking the DOM once for both anchors and text.
#[derive(Debug, Clone)]
pub struct ScraperParser {
    max_anchors: usize,
}

impl ScraperParser {
    pub fn new() -> Self {
        Self::with_max_anchors(DEFAULT_MAX_ANCHORS)
    }

    pub fn with_max_anchors(max_anchors: usize) -> Self {
        Self { max_anchors }
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, page: &mut PageBuilder) {
        match node.value() {
            Node::Text(text) => page.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, page);
                }
            }
            _ => {
                for child in node.children() {
                    self.visit_node(child, page);
                }
            }
        }
    }

    fn visit_element(&self, element: ElementRef<'_>, page: &mut PageBuilder) {
        let tag = element.value().name().to_ascii_lowercase();
        match tag.as_str() {
            "script" | "style" | "noscript" | "template" | "iframe" => {}
            "a" | "area" => {
                if let Some(href) = element.value().attr("href") {
                    page.add_anchor(href, self.max_anchors);
                }
                self.visit_children(element, page);
            }
            _ => {
                // Element boundaries separate words ("<td>a</td><td>b</td>").
                page.break_word();
                self.visit_children(element, page);
                page.break_word();
            }
        }
    }

    fn visit_children(&self, element: ElementRef<'_>, page: &mut PageBuilder) {
        for child in element.children() {
            self.visit_node(child, page);
        }
    }
}

impl Default for ScraperParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PageParser for ScraperParser {
    fn parse(&self, html: &str) -> ParsedPage {
        let document = Html::parse_document(html);
        let mut page = PageBuilder::default();
        for child in document.root_element().children() {
            self.visit_node(child, &mut page);
        }
        page.finish()
    }
}

#[derive(Default)]
struct PageBuilder {
    anchors: Vec<String>,
    text: String,
    last_char: Option<char>,
}

impl PageBuilder {
    fn add_anchor(&mut self, href: &str, max: usize) {
        let href = href.trim();
        if href.is_empty() || self.anchors.len() >= max {
            return;
        }
        self.anchors.push(href.to_string());
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.break_word();
            } else {
                self.text.push(ch);
                self.last_char = Some(ch);
            }
        }
    }

    fn break_word(&mut self) {
        if self.last_char.is_none() || self.last_char == Some(' ') {
            return;
        }
        self.text.push(' ');
        self.last_char = Some(' ');
    }

    fn finish(self) -> ParsedPage {
        ParsedPage {
            anchors: self.anchors,
            text: self.text.trim_end().to_string(),
        }
    }
}
