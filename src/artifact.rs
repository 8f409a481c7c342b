//! Lifts `<artifact type=".." title="..">..</artifact>` blocks out of
//! finalized assistant text.
//!
//! Blocks do not nest: a body runs non-greedily to the next closing tag, so a
//! nested opening tag ends up inside the outer body. Blocks whose opening tag
//! has no `type` attribute are not artifacts and stay in the text untouched.
//!
//! Removing a block can join its neighbours into new markup, so scanning
//! repeats on the cleaned text until nothing typed is left. Every artifact
//! body is still a slice of the input: a block found in a later round takes
//! its body from the input, including any earlier blocks that sat inside it.

use std::fmt;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<artifact((?:\s[^>]*)?)>(.*?)</artifact\s*>")
        .expect("artifact block regex must compile")
});

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("artifact attribute regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Renderable kind of an artifact, from its `type` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Html,
    React,
    Svg,
    Python,
    Markdown,
    Mermaid,
    Json,
    /// Any other tag, kept verbatim.
    Other(String),
}

impl ArtifactKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Self::Html,
            "react" | "jsx" => Self::React,
            "svg" => Self::Svg,
            "python" => Self::Python,
            "markdown" | "md" => Self::Markdown,
            "mermaid" => Self::Mermaid,
            "json" => Self::Json,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Html => "html",
            Self::React => "react",
            Self::Svg => "svg",
            Self::Python => "python",
            Self::Markdown => "markdown",
            Self::Mermaid => "mermaid",
            Self::Json => "json",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable once created; removed only by explicit dismissal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Input with every recognized block removed, not trimmed.
    pub cleaned_text: String,
    /// Artifacts in match order.
    pub artifacts: Vec<Artifact>,
}

/// Removes every typed artifact block from `text`.
///
/// The cleaned text never contains a typed block, so extracting it again
/// yields no artifacts.
pub fn extract_artifacts(text: &str) -> Extraction {
    let mut removals: Vec<Removal> = Vec::new();
    loop {
        let (cleaned_text, offsets) = splice(text, &removals);
        let blocks = typed_blocks(&cleaned_text);
        if blocks.is_empty() {
            let artifacts = removals
                .into_iter()
                .flat_map(|removal| removal.artifacts)
                .map(|(_, artifact)| artifact)
                .collect();
            return Extraction {
                cleaned_text,
                artifacts,
            };
        }
        for block in blocks {
            absorb(text, &mut removals, block.in_input(&offsets));
        }
    }
}

/// A typed block match. Ranges are byte offsets into whichever text was
/// scanned until [`Block::in_input`] maps them back.
struct Block {
    span: Range<usize>,
    body: Range<usize>,
    kind: ArtifactKind,
    title: Option<String>,
}

impl Block {
    /// `offsets[i]` is the input offset of byte `i` of the scanned text.
    /// Tag delimiters are always kept bytes, so both ends map exactly.
    fn in_input(self, offsets: &[usize]) -> Self {
        Self {
            span: offsets[self.span.start]..offsets[self.span.end - 1] + 1,
            body: offsets[self.body.start - 1] + 1..offsets[self.body.end],
            ..self
        }
    }
}

/// A removed input range and the artifacts it produced, keyed by the input
/// offset of their opening tag.
struct Removal {
    span: Range<usize>,
    artifacts: Vec<(usize, Artifact)>,
}

fn typed_blocks(text: &str) -> Vec<Block> {
    BLOCK_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let span = captures.get(0)?.range();
            let body = captures.get(2)?.range();
            let attributes = captures.get(1).map_or("", |m| m.as_str());
            let kind = attribute(attributes, "type").filter(|value| !value.trim().is_empty())?;
            Some(Block {
                span,
                body,
                kind: ArtifactKind::parse(kind),
                title: attribute(attributes, "title").map(ToString::to_string),
            })
        })
        .collect()
}

/// Input minus the removed ranges, plus the input offset of every kept byte.
fn splice(text: &str, removals: &[Removal]) -> (String, Vec<usize>) {
    let mut cleaned = String::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    let mut cursor = 0;
    for removal in removals {
        cleaned.push_str(&text[cursor..removal.span.start]);
        offsets.extend(cursor..removal.span.start);
        cursor = removal.span.end;
    }
    cleaned.push_str(&text[cursor..]);
    offsets.extend(cursor..text.len());
    (cleaned, offsets)
}

/// Records `block` (in input offsets) as removed. Earlier removals inside
/// its body become part of the body again; those inside its tags keep
/// their artifacts.
fn absorb(text: &str, removals: &mut Vec<Removal>, block: Block) {
    let mut artifacts = vec![(
        block.span.start,
        Artifact {
            id: ArtifactId::new(),
            kind: block.kind,
            title: block.title,
            content: text[block.body.clone()].trim().to_string(),
        },
    )];

    // Removals are sorted and disjoint, and never straddle a kept byte.
    let first = removals.partition_point(|removal| removal.span.start < block.span.start);
    let last = removals.partition_point(|removal| removal.span.end <= block.span.end);
    for removal in removals.drain(first..last) {
        let in_body =
            removal.span.start >= block.body.start && removal.span.end <= block.body.end;
        if !in_body {
            artifacts.extend(removal.artifacts);
        }
    }
    artifacts.sort_by_key(|(position, _)| *position);

    removals.insert(
        first,
        Removal {
            span: block.span,
            artifacts,
        },
    );
}

fn attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE_RE.captures_iter(attributes).find_map(|captures| {
        let key = captures.get(1)?;
        if !key.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map(|value| value.as_str())
    })
}
