//! Placeholder-substitution templates.
//!
//! A template is literal text with `${name}` placeholders. Each placeholder
//! is filled by a handler looked up by name in an explicit handler table.
//! `${#name}` is a structural marker: it renders as nothing and only fixes
//! the order in which handlers are evaluated. A marker alone on its line
//! removes that whole line. `$$` renders a literal `$`.
//!
//! Every handler runs at most once per render, and substituted values are
//! never scanned for placeholders again.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::CodegenError;

/// Produces the text for one placeholder from the render context.
pub type Handler<C> = fn(&C) -> Result<String, CodegenError>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
    Marker(String),
}

pub struct Template<C> {
    segments: Vec<Segment>,
    handlers: IndexMap<&'static str, Handler<C>>,
}

impl<C> Template<C> {
    /// Parse `source` and bind it to `handlers`.
    ///
    /// Fails with `MissingTemplateHandler` if any `${name}` has no handler,
    /// and with `MalformedTemplate` on unterminated or invalid placeholders.
    pub fn new(source: &str, handlers: &[(&'static str, Handler<C>)]) -> Result<Self, CodegenError> {
        let segments = parse(source)?;
        let handlers: IndexMap<&'static str, Handler<C>> = handlers.iter().copied().collect();
        for segment in &segments {
            if let Segment::Slot(name) = segment {
                if !handlers.contains_key(name.as_str()) {
                    return Err(CodegenError::MissingTemplateHandler {
                        placeholder: name.clone(),
                    });
                }
            }
        }
        Ok(Self { segments, handlers })
    }

    /// Placeholder names in order of first appearance, markers excluded.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Slot(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Marker names in order of appearance.
    pub fn markers(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Marker(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Handler evaluation order: placeholders named by markers first, in
    /// marker order, then the rest in order of appearance.
    fn evaluation_order(&self) -> Vec<&str> {
        let placeholders = self.placeholders();
        let mut order: Vec<&str> = Vec::with_capacity(placeholders.len());
        for marker in self.markers() {
            if placeholders.contains(&marker) && !order.contains(&marker) {
                order.push(marker);
            }
        }
        for name in placeholders {
            if !order.contains(&name) {
                order.push(name);
            }
        }
        order
    }

    pub fn render(&self, ctx: &C) -> Result<String, CodegenError> {
        let mut values: HashMap<&str, String> = HashMap::new();
        for name in self.evaluation_order() {
            let handler = self
                .handlers
                .get(name)
                .ok_or_else(|| CodegenError::MissingTemplateHandler {
                    placeholder: name.to_string(),
                })?;
            values.insert(name, handler(ctx)?);
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    if let Some(value) = values.get(name.as_str()) {
                        out.push_str(value);
                    }
                }
                Segment::Marker(_) => {}
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render<C>(
    source: &str,
    handlers: &[(&'static str, Handler<C>)],
    ctx: &C,
) -> Result<String, CodegenError> {
    Template::new(source, handlers)?.render(ctx)
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse(source: &str) -> Result<Vec<Segment>, CodegenError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;
    // true while the pending text starts at the beginning of a line
    let mut line_clean = true;

    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            text.push('$');
            rest = stripped;
            continue;
        }
        let Some(body) = after.strip_prefix('{') else {
            text.push('$');
            rest = after;
            continue;
        };

        let end = body.find('}').ok_or_else(|| {
            CodegenError::MalformedTemplate(format!(
                "unterminated placeholder near '{}'",
                body.lines().next().unwrap_or_default()
            ))
        })?;
        let raw = &body[..end];
        rest = &body[end + 1..];

        let (structural, name) = match raw.strip_prefix('#') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        if !is_placeholder_name(name) {
            return Err(CodegenError::MalformedTemplate(format!(
                "invalid placeholder name '{raw}'"
            )));
        }

        if structural {
            let line_start = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
            let at_line_start = text.contains('\n') || line_clean;
            let line_end = rest.find('\n');
            let tail = &rest[..line_end.unwrap_or(rest.len())];
            let standalone =
                at_line_start && text[line_start..].trim().is_empty() && tail.trim().is_empty();

            if standalone {
                text.truncate(line_start);
                rest = match line_end {
                    Some(i) => &rest[i + 1..],
                    None => "",
                };
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Marker(name.to_string()));
            line_clean = standalone;
        } else {
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Slot(name.to_string()));
            line_clean = false;
        }
    }
    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}
