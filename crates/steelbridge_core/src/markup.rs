//! Source-markup to Foundry rich-text conversion. Total: anything the
//! target format cannot express passes through as literal text.

/// Deepest heading level the target editor renders distinctly.
const MAX_HEADING_DEPTH: usize = 3;

/// Converts the source tool's lightweight markup into the rich-text HTML
/// the target platform stores. Already-HTML input is passed through after
/// typography folding.
pub fn to_rich_text(source: &str) -> String {
    let cleaned = fold_typography(source);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if looks_like_html(trimmed) {
        return trimmed.to_string();
    }

    let mut out = String::with_capacity(trimmed.len() + 16);
    let mut paragraph: Vec<String> = Vec::new();
    let mut list: Option<(bool, Vec<String>)> = None;

    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush_list(&mut list, &mut out);
            flush_paragraph(&mut paragraph, &mut out);
            continue;
        }

        if let Some(depth) = heading_depth(line) {
            flush_list(&mut list, &mut out);
            flush_paragraph(&mut paragraph, &mut out);
            let level = depth.min(MAX_HEADING_DEPTH);
            let text = inline_markup(line[depth..].trim());
            out.push_str(&format!("<h{level}>{text}</h{level}>"));
            continue;
        }

        if let Some(item) = unordered_item(line) {
            push_list_item(&mut list, &mut paragraph, &mut out, false, item);
            continue;
        }
        if let Some(item) = ordered_item(line) {
            push_list_item(&mut list, &mut paragraph, &mut out, true, item);
            continue;
        }

        flush_list(&mut list, &mut out);
        paragraph.push(inline_markup(line));
    }

    flush_list(&mut list, &mut out);
    flush_paragraph(&mut paragraph, &mut out);
    out
}

/// Smart quotes, dashes, and ellipses folded to their plain forms at the
/// ingestion boundary so later name matching and JSON output stay clean.
pub fn fold_typography(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{fffd}' => {}
            c if (c as u32) < 32 && c != '\n' && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

fn looks_like_html(text: &str) -> bool {
    for tag in ["<p", "<ul", "<ol", "<li", "<h", "<div", "<span", "<strong", "<em", "<br"] {
        if text.contains(tag) {
            return true;
        }
    }
    false
}

fn heading_depth(line: &str) -> Option<usize> {
    let depth = line.chars().take_while(|&c| c == '#').count();
    if depth == 0 || !line[depth..].starts_with(' ') {
        return None;
    }
    Some(depth)
}

fn unordered_item(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

fn ordered_item(line: &str) -> Option<&str> {
    let dot = line.find(". ")?;
    if dot > 0 && line[..dot].chars().all(|c| c.is_ascii_digit()) {
        Some(line[dot + 2..].trim_start())
    } else {
        None
    }
}

fn push_list_item(
    list: &mut Option<(bool, Vec<String>)>,
    paragraph: &mut Vec<String>,
    out: &mut String,
    ordered: bool,
    item: &str,
) {
    flush_paragraph(paragraph, out);
    match list {
        Some((open_ordered, items)) if *open_ordered == ordered => {
            items.push(inline_markup(item));
        }
        _ => {
            flush_list(list, out);
            *list = Some((ordered, vec![inline_markup(item)]));
        }
    }
}

fn flush_paragraph(paragraph: &mut Vec<String>, out: &mut String) {
    if paragraph.is_empty() {
        return;
    }
    out.push_str("<p>");
    out.push_str(&paragraph.join("<br>"));
    out.push_str("</p>");
    paragraph.clear();
}

fn flush_list(list: &mut Option<(bool, Vec<String>)>, out: &mut String) {
    let Some((ordered, items)) = list.take() else {
        return;
    };
    let tag = if ordered { "ol" } else { "ul" };
    out.push_str(&format!("<{tag}>"));
    for item in items {
        out.push_str(&format!("<li>{item}</li>"));
    }
    out.push_str(&format!("</{tag}>"));
}

/// `**bold**` then `*italic*`; unbalanced markers stay literal.
fn inline_markup(text: &str) -> String {
    let bold = replace_delimited(text, "**", "strong");
    replace_delimited(&bold, "*", "em")
}

fn replace_delimited(text: &str, marker: &str, tag: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(open) = rest.find(marker) else {
            out.push_str(rest);
            return out;
        };
        let after_open = &rest[open + marker.len()..];
        let Some(close) = after_open.find(marker) else {
            out.push_str(rest);
            return out;
        };
        if close == 0 {
            // Empty span; keep the markers literal and move on.
            out.push_str(&rest[..open + marker.len() * 2]);
            rest = &after_open[marker.len()..];
            continue;
        }
        out.push_str(&rest[..open]);
        out.push_str(&format!("<{tag}>{}</{tag}>", &after_open[..close]));
        rest = &after_open[close + marker.len()..];
    }
}
