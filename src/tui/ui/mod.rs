//! UI module: View components for the TUI.

pub mod form;
pub mod report;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::ClinicalTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "DISCLAIMER: Indicative six-month VTE estimate for adults with primary membranous nephropathy. It does not replace clinical judgement.",
            ClinicalTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Probabilities are not calibrated against an external cohort.",
            ClinicalTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(ClinicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
