//! Risk report view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table},
    Frame,
};

use crate::application::RiskAssessment;
use crate::domain::{FeatureSchema, IndicatorReading, WaterfallStep};
use crate::tui::styles::ClinicalTheme;

/// Report state
#[derive(Debug, Clone, Default)]
pub enum ReportState {
    /// Nothing submitted yet
    #[default]
    Idle,
    Complete { assessment: Box<RiskAssessment> },
    /// The request failed after validation (model or invariant error)
    Error { message: String },
}

const BAR_WIDTH: usize = 24;

/// Bar of `width` cells scaled against `max`.
fn bar(magnitude: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || !magnitude.is_finite() {
        return String::new();
    }
    let cells = ((magnitude / max) * width as f64).round() as usize;
    "█".repeat(cells.min(width))
}

fn display_label(schema: &FeatureSchema, key: &str) -> &'static str {
    schema.field(key).map_or("?", |f| f.label)
}

fn format_value(value: f64) -> String {
    format!("{value:.2}")
}

/// Cells of one status table row: indicator, value, normal range, status.
fn status_cells(schema: &FeatureSchema, reading: &IndicatorReading) -> [String; 4] {
    [
        display_label(schema, &reading.indicator).to_string(),
        format_value(reading.value),
        format!("{} - {}", reading.range.low, reading.range.high),
        reading.status.to_string(),
    ]
}

/// `+0.1234  (0.2000 -> 0.3234)`
fn waterfall_text(step: &WaterfallStep) -> String {
    format!(
        "{:+.4}  ({:.4} -> {:.4})",
        step.contribution, step.start, step.end
    )
}

/// Render the risk report
pub fn render_report(f: &mut Frame, area: Rect, state: &ReportState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_report_header(f, chunks[0]);
    match state {
        ReportState::Idle => render_idle(f, chunks[1]),
        ReportState::Complete { assessment } => render_assessment(f, chunks[1], assessment),
        ReportState::Error { message } => render_error(f, chunks[1], message),
    }
    render_report_footer(f, chunks[2]);
}

fn render_report_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("VTE Risk Report", ClinicalTheme::title()),
        Span::styled(" │ 6-month horizon", ClinicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_idle(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No assessment yet",
            ClinicalTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_assessment(f: &mut Frame, area: Rect, assessment: &RiskAssessment) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Headline
            Constraint::Length(3), // Probability gauge
            Constraint::Min(0),    // Details
        ])
        .split(area);

    let tier_style = ClinicalTheme::risk_tier(assessment.tier);

    let headline = Paragraph::new(vec![
        Line::from(Span::styled(
            assessment.headline_sentence(),
            tier_style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            assessment.tier.description(),
            ClinicalTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border_focused()),
    );
    f.render_widget(headline, rows[0]);

    let percent = (assessment.probability() * 100.0).round().clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" VTE Probability ", ClinicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(ClinicalTheme::border()),
        )
        .gauge_style(tier_style)
        .percent(percent)
        .label(assessment.prediction.percent());
    f.render_widget(gauge, rows[1]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let schema = assessment.features.schema();
    render_status_table(f, columns[0], schema, &assessment.readings);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    render_importance(f, right[0], schema, assessment);
    render_waterfall(f, right[1], schema, assessment);
}

fn render_status_table(
    f: &mut Frame,
    area: Rect,
    schema: &FeatureSchema,
    readings: &[IndicatorReading],
) {
    let header = Row::new(["Indicator", "Value", "Normal range", "Status"])
        .style(ClinicalTheme::header());

    let rows = readings.iter().map(|reading| {
        let [label, value, range, status] = status_cells(schema, reading);
        Row::new(vec![
            Cell::from(label),
            Cell::from(value),
            Cell::from(range),
            Cell::from(status).style(ClinicalTheme::indicator_status(reading.status)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(17),
            Constraint::Percentage(25),
            Constraint::Percentage(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(Span::styled(" Indicator Status ", ClinicalTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(table, area);
}

fn render_importance(f: &mut Frame, area: Rect, schema: &FeatureSchema, assessment: &RiskAssessment) {
    let max = assessment
        .importance
        .first()
        .map_or(0.0, |entry| entry.magnitude);

    let lines: Vec<Line> = assessment
        .importance
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("{:<28}", display_label(schema, &entry.feature)),
                    ClinicalTheme::text_secondary(),
                ),
                Span::styled(bar(entry.magnitude, max, BAR_WIDTH), ClinicalTheme::info()),
                Span::styled(format!(" {:.4}", entry.magnitude), ClinicalTheme::text()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Feature Importance ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_waterfall(f: &mut Frame, area: Rect, schema: &FeatureSchema, assessment: &RiskAssessment) {
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:<28}", "Base value"), ClinicalTheme::text_secondary()),
        Span::styled(
            format!("{:.4}", assessment.attribution.base_value),
            ClinicalTheme::text(),
        ),
    ])];

    lines.extend(assessment.waterfall().iter().map(|step| {
        Line::from(vec![
            Span::styled(
                format!("{:<28}", display_label(schema, &step.feature)),
                ClinicalTheme::text_secondary(),
            ),
            Span::styled(
                waterfall_text(step),
                ClinicalTheme::contribution(step.contribution),
            ),
        ])
    }));

    lines.push(Line::from(vec![
        Span::styled(format!("{:<28}", "Prediction"), ClinicalTheme::text_secondary()),
        Span::styled(
            format!("{:.4}", assessment.probability()),
            ClinicalTheme::risk_tier(assessment.tier),
        ),
    ]));

    let block = Block::default()
        .title(Span::styled(" Contribution Waterfall ", ClinicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Assessment failed", ClinicalTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, ClinicalTheme::text())),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(ClinicalTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_report_footer(f: &mut Frame, area: Rect) {
    let content = Line::from(vec![
        Span::styled("[Enter/P] ", ClinicalTheme::key_hint()),
        Span::styled("Predict Again ", ClinicalTheme::key_desc()),
        Span::styled("[Esc] ", ClinicalTheme::key_hint()),
        Span::styled("Quit", ClinicalTheme::key_desc()),
    ]);

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EncodedFeatures, IndicatorStatus, ReferenceTable};

    #[test]
    fn test_bar_scales_to_width() {
        assert_eq!(bar(1.0, 1.0, 10).chars().count(), 10);
        assert_eq!(bar(0.5, 1.0, 10).chars().count(), 5);
        assert_eq!(bar(0.0, 1.0, 10), "");
        assert_eq!(bar(0.3, 0.0, 10), "");
        assert_eq!(bar(2.0, 1.0, 10).chars().count(), 10);
    }

    #[test]
    fn test_status_cells_for_defaults() {
        let schema = FeatureSchema::pmn_vte();
        let row = EncodedFeatures::from_row(schema, schema.default_row()).expect("width");
        let readings = ReferenceTable::pmn_vte().readings(&row);
        let albumin = readings
            .iter()
            .find(|r| r.indicator == "ALB")
            .expect("albumin reading");

        assert_eq!(albumin.status, IndicatorStatus::Low);
        let cells = status_cells(schema, albumin);
        assert_eq!(cells[0], "Albumin (g/L)");
        assert_eq!(cells[1], "19.00");
        assert_eq!(cells[2], "40 - 55");
        assert_eq!(cells[3], albumin.status.to_string());
    }

    #[test]
    fn test_waterfall_text() {
        let step = WaterfallStep {
            feature: "DD".to_string(),
            value: 1.0,
            contribution: -0.0125,
            start: 0.3,
            end: 0.2875,
        };
        assert_eq!(waterfall_text(&step), "-0.0125  (0.3000 -> 0.2875)");
    }
}
