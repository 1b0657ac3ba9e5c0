//! Outils XML communs aux codecs KML et GPX
//!
//! Découpage de documents concaténés, parsing DOM (roxmltree), échappement.

use memchr::memmem;
use roxmltree::{Document, Node};

use super::FormatName;
use crate::reproject::SupportedProjection;
use crate::tokenizer::parse_number;
use crate::types::{assign_ids, ParseError, ParseResult, RawFeature};

const BOM: char = '\u{feff}';

/// Texte sans BOM UTF-8 ni blancs de tête
fn trim_start_bom(text: &str) -> &str {
    text.trim_start().trim_start_matches(BOM).trim_start()
}

/// Échappe `& < > " '`
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Occurrences de `tag` suivies d'une fin de nom de balise (`<gpx` mais pas `<gpxx:`)
fn find_tags<'a>(lower: &'a str, tag: &'a str) -> impl Iterator<Item = usize> + 'a {
    memmem::find_iter(lower.as_bytes(), tag.as_bytes()).filter(move |&pos| {
        matches!(
            lower.as_bytes().get(pos + tag.len()),
            Some(b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
        )
    })
}

/// Position de la première balise ouvrante `<root` dans un texte en minuscules
fn find_open_tag(lower: &str, root: &str) -> Option<usize> {
    let open = format!("<{root}");
    let first = find_tags(lower, &open).next();
    first
}

/// Découpe des documents `<root>…</root>` concaténés
///
/// Chaque fragment est reconstruit depuis sa balise ouvrante, avec la déclaration
/// XML qui la précède le cas échéant. Aucun fragment reconnu → texte entier.
pub fn split_documents(text: &str, root: &str) -> Vec<String> {
    // Minuscules ASCII : mêmes offsets d'octets que le texte source
    let lower = text.to_ascii_lowercase();
    let close = format!("</{root}");

    let mut parts = Vec::new();
    let mut cursor = 0;
    for pos in find_tags(&lower, &close) {
        if pos < cursor {
            continue;
        }
        parts.push(cursor..pos);
        cursor = lower[pos..].find('>').map_or(lower.len(), |i| pos + i + 1);
    }
    parts.push(cursor..text.len());

    let mut documents = Vec::new();
    for range in parts {
        let part = &text[range.clone()];
        let lower_part = &lower[range];
        let Some(open_at) = find_open_tag(lower_part, root) else {
            continue;
        };

        let mut document = String::new();
        if let Some(decl_at) = lower_part.find("<?xml").filter(|&at| at < open_at) {
            if let Some(end) = part[decl_at..].find("?>") {
                document.push_str(&part[decl_at..decl_at + end + 2]);
                document.push('\n');
            }
        }
        // Balise fermante avec la casse de la balise ouvrante
        let root_name = &part[open_at + 1..open_at + 1 + root.len()];
        document.push_str(part[open_at..].trim_end());
        document.push_str("</");
        document.push_str(root_name);
        document.push('>');
        documents.push(document);
    }

    if documents.is_empty() {
        documents.push(text.trim().to_string());
    }
    documents
}

/// Parse un ou plusieurs documents avec la même politique de succès partiel que GeoJSON
pub fn parse_documents(
    text: &str,
    format: FormatName,
    root: &str,
    extract: fn(&Document) -> Vec<RawFeature>,
) -> ParseResult {
    let trimmed = trim_start_bom(text).trim_end();
    if trimmed.is_empty() {
        return ParseResult::empty(format);
    }

    let documents = split_documents(trimmed, root);
    let multiple = documents.len() > 1;
    let mut raw = Vec::new();
    let mut errors = Vec::new();

    for (index, source) in documents.iter().enumerate() {
        match Document::parse(source) {
            Ok(document) => raw.extend(extract(&document)),
            Err(e) => {
                let error = ParseError::new(format!("Invalid XML: {e}"));
                errors.push(if multiple {
                    error.prefixed(&format!("Document {}: ", index + 1))
                } else {
                    error
                });
            }
        }
    }

    if raw.is_empty() && errors.is_empty() {
        errors.push(ParseError::new(format!(
            "No features found in {}",
            format.label()
        )));
    }

    ParseResult {
        features: assign_ids(raw),
        errors,
        detected_format: Some(format),
        detected_projection: Some(SupportedProjection::Wgs84),
    }
}

/// Déclaration XML ou balise racine en tête, et balise racine présente
pub fn detect(text: &str, root: &str) -> bool {
    let trimmed = trim_start_bom(text);
    let open = format!("<{root}");
    let starts_with_root = trimmed
        .get(..open.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(&open));

    if !trimmed.starts_with("<?xml") && !starts_with_root {
        return false;
    }
    find_open_tag(&trimmed.to_ascii_lowercase(), root).is_some()
}

/// Premier enfant élément portant ce nom local
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Enfants éléments portant ce nom local
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Texte (rogné) d'un enfant, `None` si absent ou vide
pub fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Nombre fini lu dans un attribut
pub fn number_attribute(node: Node, name: &str) -> Option<f64> {
    node.attribute(name).and_then(|v| parse_number(v.trim()))
}
