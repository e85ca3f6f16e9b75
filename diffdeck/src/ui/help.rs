//! Help overlay: a centred modal drawn over the panes after `Clear` erases
//! the area behind it.

use ratatui::{
    layout::Constraint,
    style::Style,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme::Theme;

/// Skipped on terminals narrower than 60 columns, where the centred rect
/// would be too small to hold anything.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame.area().centered(Constraint::Percentage(70), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help (j/k scroll, ? or Esc to close) ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Cursor"),
        Line::from("  j / k         Next / previous row (tree: next / previous file)"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  g / G         First / last row"),
        Line::from("  Tab / S-Tab   Focus next / previous pane"),
        Line::from(""),
        Line::from("Files and hunks"),
        Line::from("  } / {         Next / previous file in tree order"),
        Line::from("  ] / [         Next / previous hunk"),
        Line::from("  Enter         Tree: open file. Diff: resolve source line"),
        Line::from(""),
        Line::from("Session"),
        Line::from("  r             Refresh now"),
        Line::from("  s             Refresh as if a file was saved"),
        Line::from("  ?             Toggle this help"),
        Line::from("  q / Esc       Close the session and quit"),
        Line::from(""),
        Line::from("The last resolved location is printed as path:line:col on exit."),
    ])
}
