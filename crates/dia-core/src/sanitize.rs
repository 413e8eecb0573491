//! Allow-list HTML sanitizer for user-authored descriptions.
//!
//! User descriptions may contain a little markup (line breaks, emphasis).
//! Everything else is stripped while its text content is kept. Allowed tags
//! keep only the attributes whitelisted for them, with values re-escaped.
//! Unbalanced markup is repaired: stray closing tags are dropped and tags
//! left open are closed at the end.
//!
//! Tokenizing is done with `winnow`; anything that doesn't parse as a tag is
//! treated as text and escaped.

use crate::config::Config;
use std::collections::BTreeMap;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_until, take_while};

/// The `sanitize(rawHtml) -> safeHtml` capability.
pub trait Sanitizer {
    fn sanitize(&self, raw: &str) -> String;
}

/// Tags that never have a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr"];

#[derive(Debug, Clone, PartialEq)]
pub struct AllowList {
    tags: Vec<String>,
    attributes: BTreeMap<String, Vec<String>>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AllowList {
    pub fn new(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            tags: config
                .allowed_html_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            attributes: config.html_whitelist.clone(),
        }
    }

    pub fn with_attributes(mut self, tag: &str, attrs: &[&str]) -> Self {
        self.attributes.insert(
            tag.to_ascii_lowercase(),
            attrs.iter().map(|a| a.to_ascii_lowercase()).collect(),
        );
        self
    }

    fn allows(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    fn allows_attr(&self, tag: &str, attr: &str) -> bool {
        self.attributes
            .get(tag)
            .is_some_and(|list| list.iter().any(|a| a == attr))
    }
}

impl Sanitizer for AllowList {
    fn sanitize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut open: Vec<String> = Vec::new();

        for token in tokenize(raw) {
            match token {
                Token::Text(text) => out.push_str(&escape_text(text)),
                Token::Comment => {}
                Token::Open { name, attrs, .. } => {
                    if !self.allows(&name) {
                        continue;
                    }
                    out.push('<');
                    out.push_str(&name);
                    for (attr, value) in attrs {
                        if self.allows_attr(&name, &attr) {
                            out.push_str(&format!(" {attr}=\"{}\"", escape_html(&value)));
                        }
                    }
                    out.push('>');
                    if !VOID_TAGS.contains(&name.as_str()) {
                        open.push(name);
                    }
                }
                Token::Close(name) => {
                    if !self.allows(&name) {
                        continue;
                    }
                    if let Some(pos) = open.iter().rposition(|t| *t == name) {
                        for tag in open.drain(pos..).rev() {
                            out.push_str(&format!("</{tag}>"));
                        }
                    }
                }
            }
        }

        for tag in open.into_iter().rev() {
            out.push_str(&format!("</{tag}>"));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
    Comment,
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut rest = input;
    let mut tokens = Vec::new();

    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let _ = comment.parse_next(&mut rest);
            tokens.push(Token::Comment);
            continue;
        }
        if rest.starts_with('<') {
            let checkpoint = rest;
            if let Ok(tok) = alt((close_tag, open_tag)).parse_next(&mut rest) {
                tokens.push(tok);
                continue;
            }
            // Not a tag: emit the `<` as text
            rest = checkpoint;
            tokens.push(Token::Text(&rest[..1]));
            rest = &rest[1..];
            continue;
        }
        let text: Result<&str, winnow::error::ErrMode<ContextError>> =
            take_till(1.., '<').parse_next(&mut rest);
        match text {
            Ok(t) => tokens.push(Token::Text(t)),
            Err(_) => break,
        }
    }
    tokens
}

fn comment(input: &mut &str) -> ModalResult<()> {
    let _ = "<!--".parse_next(input)?;
    let closed: Result<&str, winnow::error::ErrMode<ContextError>> =
        take_until(0.., "-->").parse_next(input);
    match closed {
        Ok(_) => {
            let _ = "-->".parse_next(input)?;
        }
        // Unterminated comment swallows the rest
        Err(_) => *input = "",
    }
    Ok(())
}

fn tag_name(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric())
        .map(|s: &str| s.to_ascii_lowercase())
        .parse_next(input)
}

fn close_tag<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    delimited("</", tag_name, (multispace0, '>'))
        .map(Token::Close)
        .parse_next(input)
}

fn open_tag<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    let _ = '<'.parse_next(input)?;
    let name = tag_name.parse_next(input)?;
    let attrs: Vec<(String, String)> = repeat(0.., attribute).parse_next(input)?;
    let _ = multispace0.parse_next(input)?;
    let self_closing = opt('/').parse_next(input)?.is_some();
    let _ = '>'.parse_next(input)?;
    Ok(Token::Open {
        name,
        attrs,
        self_closing,
    })
}

fn attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let _ = multispace1.parse_next(input)?;
    let name: &str = take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')
    })
    .parse_next(input)?;
    let value = opt(preceded((multispace0, '=', multispace0), attr_value)).parse_next(input)?;
    Ok((
        name.to_ascii_lowercase(),
        value.unwrap_or_default().to_string(),
    ))
}

fn attr_value<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_till(1.., |c: char| c.is_whitespace() || c == '>'),
    ))
    .parse_next(input)
}

/// Escape text for safe insertion as HTML (titles, attribute values).
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a text run, keeping well-formed character references intact.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if is_entity(&s[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_entity(s: &str) -> bool {
    let Some(end) = s.find(';') else {
        return false;
    };
    let body = &s[1..end];
    if let Some(num) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        !num.is_empty() && num.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(num) = body.strip_prefix('#') {
        !num.is_empty() && num.chars().all(|c| c.is_ascii_digit())
    } else {
        body.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && body.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// Render a user description as safe HTML: newlines become `<br>`.
pub fn process_description(text: &str, sanitizer: &impl Sanitizer) -> String {
    if text.is_empty() {
        return String::new();
    }
    sanitizer.sanitize(&text.replace('\n', "<br>"))
}

/// Tooltip body for a user annotation: bold escaped title, then description.
pub fn tooltip_html(title: &str, description: &str, sanitizer: &impl Sanitizer) -> String {
    let title = escape_html(title);
    if description.trim().is_empty() {
        format!("<b>{title}</b>")
    } else {
        format!(
            "<b>{title}</b><br><br>{}",
            process_description(description, sanitizer)
        )
    }
}
