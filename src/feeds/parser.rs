//! RSS and Atom document parsing.
//!
//! Supports RSS 2.0 (and the 0.9x family), RSS 1.0 (RDF) and Atom 1.0.
//! Elements are matched on local names so namespaced variants such as
//! `dc:date` or `content:encoded` are picked up without a namespace table.

use super::fetch::FeedError;
use crate::models::FeedMetadata;
use roxmltree::{Document, Node, ParsingOptions};

/// One entry of a feed, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub published: String,
    pub link: String,
    pub author: String,
    pub source: String,
    pub categories: Vec<String>,
}

/// A parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    pub metadata: FeedMetadata,
    pub entries: Vec<RawEntry>,
}

/// Parse an RSS or Atom document.
pub fn parse_feed(xml: &str) -> Result<RawFeed, FeedError> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;

    let doc = Document::parse_with_options(xml.trim_start_matches('\u{feff}'), options)
        .map_err(|e| FeedError::Parse(e.to_string()))?;
    let root = doc.root_element();

    let mut feed = match root.tag_name().name() {
        "rss" => {
            let channel = child(root, "channel")
                .ok_or_else(|| FeedError::Parse("<rss> without <channel>".to_string()))?;
            RawFeed {
                metadata: rss_metadata(channel),
                entries: children(channel, "item").map(rss_entry).collect(),
            }
        }
        "RDF" => {
            let metadata = child(root, "channel").map(rss_metadata).unwrap_or_default();
            RawFeed {
                metadata,
                entries: children(root, "item").map(rss_entry).collect(),
            }
        }
        "feed" => RawFeed {
            metadata: atom_metadata(root),
            entries: children(root, "entry").map(atom_entry).collect(),
        },
        other => {
            return Err(FeedError::Parse(format!(
                "unrecognized feed root element <{}>",
                other
            )))
        }
    };

    feed.metadata.total_articles = feed.entries.len();
    Ok(feed)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// All text below `node`, CDATA included.
fn text_of(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Text of the first child called `name` that has any text.
fn child_text(node: Node, name: &str) -> String {
    children(node, name)
        .map(text_of)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// First non-empty child text among `names`, in order.
fn first_text(node: Node, names: &[&str]) -> String {
    names
        .iter()
        .map(|name| child_text(node, name))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

fn rss_metadata(channel: Node) -> FeedMetadata {
    let image = child(channel, "image")
        .map(|img| child_text(img, "url"))
        .filter(|u| !u.is_empty());

    FeedMetadata {
        title: child_text(channel, "title"),
        description: child_text(channel, "description"),
        language: first_text(channel, &["language"]),
        link: child_text(channel, "link"),
        updated: first_text(channel, &["lastBuildDate", "pubDate", "date"]),
        author: first_text(channel, &["managingEditor", "creator", "author"]),
        copyright: first_text(channel, &["copyright", "rights"]),
        image,
        total_articles: 0,
    }
}

fn rss_entry(item: Node) -> RawEntry {
    let link = child_text(item, "link");
    // RDF items carry their identity in rdf:about
    let about = item
        .attributes()
        .find(|a| a.name() == "about")
        .map(|a| a.value().to_string())
        .unwrap_or_default();
    let id = first_text(item, &["guid"]);

    RawEntry {
        id: if id.is_empty() { about } else { id },
        title: child_text(item, "title"),
        description: first_text(item, &["description", "encoded"]),
        summary: first_text(item, &["summary"]),
        published: first_text(item, &["pubDate", "published", "updated", "date"]),
        link,
        author: first_text(item, &["author", "creator"]),
        source: child_text(item, "source"),
        categories: children(item, "category")
            .map(text_of)
            .filter(|c| !c.is_empty())
            .collect(),
    }
}

/// Pick the `href` of the alternate link, or of the first link with no `rel`.
fn atom_link(node: Node) -> String {
    children(node, "link")
        .find(|l| matches!(l.attribute("rel"), None | Some("alternate")))
        .and_then(|l| l.attribute("href"))
        .unwrap_or_default()
        .to_string()
}

fn atom_author(node: Node) -> String {
    child(node, "author")
        .map(|a| child_text(a, "name"))
        .unwrap_or_default()
}

fn atom_metadata(feed: Node) -> FeedMetadata {
    let image = [child_text(feed, "logo"), child_text(feed, "icon")]
        .into_iter()
        .find(|u| !u.is_empty());

    FeedMetadata {
        title: child_text(feed, "title"),
        description: first_text(feed, &["subtitle", "tagline"]),
        language: feed
            .attributes()
            .find(|a| a.name() == "lang")
            .map(|a| a.value().to_string())
            .unwrap_or_default(),
        link: atom_link(feed),
        updated: child_text(feed, "updated"),
        author: atom_author(feed),
        copyright: child_text(feed, "rights"),
        image,
        total_articles: 0,
    }
}

fn atom_entry(entry: Node) -> RawEntry {
    let summary = child_text(entry, "summary");
    let content = child_text(entry, "content");

    RawEntry {
        id: child_text(entry, "id"),
        title: child_text(entry, "title"),
        description: if content.is_empty() {
            summary.clone()
        } else {
            content
        },
        summary,
        published: first_text(entry, &["published", "updated", "issued"]),
        link: atom_link(entry),
        author: atom_author(entry),
        source: child(entry, "source")
            .map(|s| child_text(s, "title"))
            .unwrap_or_default(),
        categories: children(entry, "category")
            .filter_map(|c| c.attribute("term"))
            .map(str::to_string)
            .collect(),
    }
}
