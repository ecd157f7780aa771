//! Markdown to styled terminal lines.
//!
//! Parsing is done by `pulldown-cmark` with the GitHub extensions explanations
//! use (tables, strikethrough, task lists). Events are folded into ratatui
//! lines using the theme's heading, emphasis and code colors.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use std::mem;

use super::Theme;

/// Render markdown into lines ready for a `Paragraph`.
pub fn render(markdown: &str, theme: &Theme) -> Vec<Line<'static>> {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(theme);
    for event in Parser::new_ext(markdown, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

struct Renderer<'t> {
    theme: &'t Theme,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// Open lists, innermost last; ordered lists hold their next number.
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    link: Option<String>,
    table: Option<Table>,
}

impl<'t> Renderer<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            link: None,
            table: None,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        self.lines
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, patch: Style) {
        let style = self.style().patch(patch);
        self.styles.push(style);
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(self.theme.muted),
            ));
        }
        self.current.push(span);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(mem::take(&mut self.current)));
        }
    }

    /// Start a top-level block, separated from the previous one by a blank line.
    fn start_block(&mut self) {
        self.flush();
        let after_content = self.lines.last().is_some_and(|l| !l.spans.is_empty());
        if after_content && self.lists.is_empty() {
            self.lines.push(Line::default());
        }
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(table) = &mut self.table {
                    table.cell.push_str(&code);
                    return;
                }
                let style = self.style().patch(Style::default().fg(self.theme.code));
                self.push_span(Span::styled(code.to_string(), style));
            }
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.start_block();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    Style::default().fg(self.theme.muted),
                )));
            }
            Event::TaskListMarker(done) => {
                self.push_span(Span::raw(if done { "[x] " } else { "[ ] " }));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            // Item paragraphs continue the line holding the bullet.
            Tag::Paragraph if !self.lists.is_empty() => {}
            Tag::Paragraph => self.start_block(),
            Tag::Heading { level, .. } => {
                self.start_block();
                let index = (level as usize).min(3) - 1;
                self.push_style(
                    Style::default()
                        .fg(self.theme.heading[index])
                        .add_modifier(Modifier::BOLD),
                );
            }
            Tag::BlockQuote { .. } => {
                self.start_block();
                self.quote_depth += 1;
            }
            Tag::CodeBlock { .. } => {
                self.start_block();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len());
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}{}. ", indent, number);
                        *number += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.push_span(Span::raw(marker));
            }
            Tag::Table(_) => {
                self.start_block();
                self.table = Some(Table::default());
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(
                Style::default()
                    .fg(self.theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::Heading { .. } => {
                self.flush();
                self.styles.pop();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => self.in_code_block = false,
            TagEnd::List { .. } => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header = mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.table_lines(table);
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    let shown = self.current.last().is_some_and(|s| s.content == url);
                    if !shown {
                        self.push_span(Span::styled(
                            format!(" ({})", url),
                            Style::default().fg(self.theme.muted),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(table) = &mut self.table {
            table.cell.push_str(text);
            return;
        }
        if self.in_code_block {
            let style = Style::default().fg(self.theme.code_block);
            for line in text.lines() {
                self.lines
                    .push(Line::from(Span::styled(format!("  {}", line), style)));
            }
            return;
        }
        let style = self.style();
        self.push_span(Span::styled(text.to_string(), style));
    }

    /// Lay out a table with padded columns.
    fn table_lines(&mut self, table: Table) {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain([table.header.len()])
            .max()
            .unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in table.rows.iter().chain([&table.header]) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let format_row = |row: &[String]| -> String {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, width)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", cell, width = width)
                })
                .collect();
            cells.join(" │ ").trim_end().to_string()
        };

        let border = Style::default().fg(self.theme.muted);
        if !table.header.is_empty() {
            self.lines.push(Line::from(Span::styled(
                format_row(&table.header),
                Style::default()
                    .fg(self.theme.primary)
                    .add_modifier(Modifier::BOLD),
            )));
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            self.lines
                .push(Line::from(Span::styled(rule.join("─┼─"), border)));
        }
        for row in &table.rows {
            self.lines.push(Line::from(format_row(row)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn span<'a>(lines: &'a [Line], content: &str) -> &'a Span<'a> {
        lines
            .iter()
            .flat_map(|l| l.spans.iter())
            .find(|s| s.content == content)
            .unwrap()
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let theme = Theme::default();
        let lines = render("# Recursion\n\nA function that calls itself.", &theme);
        assert_eq!(lines.len(), 3);
        assert_eq!(text(&lines[0]), "Recursion");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(text(&lines[2]), "A function that calls itself.");
    }

    #[test]
    fn test_deep_headings_use_smallest_style() {
        let theme = Theme::default();
        let lines = render("#### deep", &theme);
        assert_eq!(text(&lines[0]), "deep");
        assert_eq!(lines[0].spans[0].style.fg, Some(theme.heading[2]));
    }

    #[test]
    fn test_lists() {
        let lines = render("- apples\n- pears\n\n2. step two\n3. step three", &Theme::default());
        assert_eq!(text(&lines[0]), "  • apples");
        assert_eq!(text(&lines[1]), "  • pears");
        assert_eq!(text(&lines[2]), "");
        assert_eq!(text(&lines[3]), "  2. step two");
        assert_eq!(text(&lines[4]), "  3. step three");
    }

    #[test]
    fn test_nested_list_is_indented() {
        let lines = render("- outer\n  - inner\n- next", &Theme::default());
        let rendered: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(rendered, vec!["  • outer", "    • inner", "  • next"]);
    }

    #[test]
    fn test_loose_list_keeps_bullet_with_text() {
        let lines = render("- first\n\n- second", &Theme::default());
        let rendered: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(rendered, vec!["  • first", "  • second"]);
    }

    #[test]
    fn test_inline_bold_and_code() {
        let theme = Theme::default();
        let lines = render("A **stack** is like `push` and pop", &theme);
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[1].content, "stack");
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[3].content, "push");
        assert_eq!(spans[3].style.fg, Some(theme.code));
    }

    #[test]
    fn test_emphasis_variants() {
        let lines = render("a *soft* and __loud__ and _also soft_", &Theme::default());
        assert_eq!(text(&lines[0]), "a soft and loud and also soft");
        assert!(span(&lines, "soft").style.add_modifier.contains(Modifier::ITALIC));
        assert!(span(&lines, "loud").style.add_modifier.contains(Modifier::BOLD));
        assert!(span(&lines, "also soft")
            .style
            .add_modifier
            .contains(Modifier::ITALIC));
    }

    #[test]
    fn test_link_shows_text_and_target() {
        let theme = Theme::default();
        let lines = render("See [the docs](https://example.com) now", &theme);
        assert_eq!(text(&lines[0]), "See the docs (https://example.com) now");
        let link = span(&lines, "the docs");
        assert_eq!(link.style.fg, Some(theme.accent));
        assert!(link.style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_autolink_is_not_repeated() {
        let lines = render("<https://example.com>", &Theme::default());
        assert_eq!(text(&lines[0]), "https://example.com");
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let lines = render("2 ** 3 is eight", &Theme::default());
        assert_eq!(text(&lines[0]), "2 ** 3 is eight");
    }

    #[test]
    fn test_code_block_is_not_parsed() {
        let lines = render("```\n# not a heading\n```\nafter", &Theme::default());
        let rendered: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(rendered, vec!["  # not a heading", "", "after"]);
    }

    #[test]
    fn test_table_is_aligned() {
        let lines = render(
            "| Step | Cost |\n|---|---|\n| push | `O(1)` |\n| search | O(n) |",
            &Theme::default(),
        );
        let rendered: Vec<String> = lines.iter().map(text).collect();
        assert_eq!(
            rendered,
            vec![
                "Step   │ Cost",
                "───────┼─────",
                "push   │ O(1)",
                "search │ O(n)",
            ]
        );
        assert!(rendered.iter().all(|l| !l.contains('|')));
    }
}
