//! Minimal helpers for the small XML documents stored in policy annotations.
//!
//! Annotation values are short, machine-written documents, so a full XML
//! parser is not needed: elements are located by tag name and attributes are
//! read from the opening tag.

/// A located element: its opening-tag attributes and its inner text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Element<'a> {
    /// Text between `<tag` and the closing `>` of the opening tag.
    pub attrs: &'a str,
    /// Inner content, empty for self-closing elements.
    pub body: &'a str,
}

impl<'a> Element<'a> {
    /// Unescaped value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<String> {
        attribute(self.attrs, name)
    }

    /// First child element called `tag`.
    pub fn child(&self, tag: &str) -> Option<Element<'a>> {
        elements(self.body, tag).into_iter().next()
    }

    /// All child elements called `tag`, in document order.
    pub fn children(&self, tag: &str) -> Vec<Element<'a>> {
        elements(self.body, tag)
    }

    /// Inner text with entities resolved.
    pub fn text(&self) -> String {
        xml_unescape(self.body.trim())
    }
}

/// First element called `tag` anywhere in `xml`.
pub(crate) fn root<'a>(xml: &'a str, tag: &str) -> Option<Element<'a>> {
    elements(xml, tag).into_iter().next()
}

/// Every top-level occurrence of element `tag` in `xml`.
///
/// Nested elements with the same tag are not supported; the annotation
/// formats never nest them.
pub(crate) fn elements<'a>(xml: &'a str, tag: &str) -> Vec<Element<'a>> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut search_from = 0;

    while let Some(rel_pos) = xml[search_from..].find(&open) {
        let start_pos = search_from + rel_pos;
        let after_open = &xml[start_pos + open.len()..];
        // Reject prefix matches such as <policy-types> when looking for <policy-type>.
        match after_open.chars().next() {
            Some(ch) if ch == '>' || ch == '/' || ch.is_ascii_whitespace() => {}
            _ => {
                search_from = start_pos + open.len();
                continue;
            }
        }
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let head = &after_open[..tag_end];
        let content_start = start_pos + open.len() + tag_end + 1;

        if let Some(attrs) = head.strip_suffix('/') {
            found.push(Element { attrs, body: "" });
            search_from = content_start;
            continue;
        }

        let Some(body_len) = xml[content_start..].find(&close) else {
            break;
        };
        found.push(Element {
            attrs: head,
            body: &xml[content_start..content_start + body_len],
        });
        search_from = content_start + body_len + close.len();
    }
    found
}

/// Value of attribute `name` inside an opening-tag fragment.
pub(crate) fn attribute(fragment: &str, name: &str) -> Option<String> {
    let mut rest = fragment;
    loop {
        let pos = rest.find(name)?;
        let preceded_by_space = rest[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_ascii_whitespace());
        let after = rest[pos + name.len()..].trim_start();
        if preceded_by_space {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let inner = &value[1..];
                    let end = inner.find(quote)?;
                    return Some(xml_unescape(&inner[..end]));
                }
            }
        }
        rest = &rest[pos + name.len()..];
    }
}

/// Unescape standard XML entities.
pub(crate) fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape text for use in an attribute value or element body.
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
