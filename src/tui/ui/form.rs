//! Patient data entry form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{FeatureSchema, FieldKind, FieldSpec, PatientInput, NO, YES};
use crate::tui::styles::ClinicalTheme;

/// One input box.
#[derive(Debug, Clone)]
pub struct FormField {
    pub spec: &'static FieldSpec,
    pub value: String,
}

impl FormField {
    fn new(spec: &'static FieldSpec) -> Self {
        let mut field = Self {
            spec,
            value: String::new(),
        };
        field.reset();
        field
    }

    fn reset(&mut self) {
        self.value.zeroize();
        self.value = match self.spec.kind {
            FieldKind::Numeric { default, .. } => format!("{default}"),
            FieldKind::Binary { default } => if default { YES } else { NO }.to_string(),
        };
    }

    /// Range or option hint shown under the label.
    #[must_use]
    pub fn hint(&self) -> String {
        match self.spec.kind {
            FieldKind::Numeric { min, max, .. } => format!("{min} to {max}"),
            FieldKind::Binary { .. } => format!("{YES} / {NO}"),
        }
    }

    #[must_use]
    pub fn is_choice(&self) -> bool {
        self.spec.kind.is_binary()
    }
}

/// Form state, fields in display order.
pub struct FormState {
    schema: &'static FeatureSchema,
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl FormState {
    /// Form pre-filled with the schema defaults.
    #[must_use]
    pub fn new(schema: &'static FeatureSchema) -> Self {
        Self {
            schema,
            fields: schema.form_fields().map(FormField::new).collect(),
            selected_field: 0,
            error_message: None,
        }
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    fn current(&mut self) -> &mut FormField {
        &mut self.fields[self.selected_field]
    }

    /// Type into a numeric field. Choice fields ignore typed characters.
    pub fn input_char(&mut self, c: char) {
        let field = self.current();
        if field.is_choice() {
            return;
        }
        if c.is_ascii_digit() || c == '.' || c == '-' {
            field.value.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        let field = self.current();
        if !field.is_choice() {
            field.value.pop();
        }
    }

    pub fn clear_field(&mut self) {
        let field = self.current();
        if !field.is_choice() {
            field.value.zeroize();
        }
    }

    /// Flip a YES/NO field.
    pub fn toggle_choice(&mut self) {
        let field = self.current();
        if field.is_choice() {
            field.value = if field.value == YES { NO } else { YES }.to_string();
            self.error_message = None;
        }
    }

    /// Wipe all buffers and restore the schema defaults.
    pub fn reset_defaults(&mut self) {
        for field in &mut self.fields {
            field.reset();
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Collect the buffers into one submission.
    ///
    /// Only parses numbers; bounds and choices are checked by the encoder.
    ///
    /// # Errors
    /// Returns a message naming the field whose text is not a number.
    pub fn to_patient_input(&self) -> Result<PatientInput, String> {
        let mut input = PatientInput::new();
        for field in &self.fields {
            input = if field.is_choice() {
                input.with_choice(field.spec.key, field.value.clone())
            } else {
                let value: f64 = field
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| format!("{}: Invalid number", field.spec.label))?;
                input.with_numeric(field.spec.key, value)
            };
        }
        Ok(input)
    }
}

impl Drop for FormState {
    fn drop(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
        }
    }
}

/// Render the patient data input form
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0], state.schema);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect, schema: &FeatureSchema) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", ClinicalTheme::text()),
        Span::styled("PMN VTE Risk Prediction", ClinicalTheme::title()),
        Span::styled(
            format!(" │ schema {} v{}", schema.name(), schema.version()),
            ClinicalTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicalTheme::border_focused(), ClinicalTheme::focused())
        } else {
            (ClinicalTheme::border(), ClinicalTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.spec.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value = if field.value.is_empty() {
            Span::styled(field.hint(), ClinicalTheme::text_muted())
        } else if field.is_choice() {
            let style = if field.value == YES {
                ClinicalTheme::warning()
            } else {
                ClinicalTheme::text()
            };
            Span::styled(format!("◂ {} ▸", field.value), style)
        } else {
            Span::styled(field.value.as_str(), ClinicalTheme::text())
        };

        let mut spans = vec![Span::raw(" "), value];
        if is_selected && !field.is_choice() {
            spans.push(Span::styled("▌", ClinicalTheme::cursor()));
        }
        spans.push(Span::styled(
            format!("  {}", field.hint()),
            ClinicalTheme::text_muted(),
        ));

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicalTheme::danger()),
            Span::styled(err.clone(), ClinicalTheme::danger()),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓] ", ClinicalTheme::key_hint()),
            Span::styled("Navigate ", ClinicalTheme::key_desc()),
            Span::styled("[Space/←→] ", ClinicalTheme::key_hint()),
            Span::styled("YES/NO ", ClinicalTheme::key_desc()),
            Span::styled("[Enter] ", ClinicalTheme::key_hint()),
            Span::styled("Predict ", ClinicalTheme::key_desc()),
            Span::styled("[D] ", ClinicalTheme::key_hint()),
            Span::styled("Defaults ", ClinicalTheme::key_desc()),
            Span::styled("[Esc] ", ClinicalTheme::key_hint()),
            Span::styled("Quit", ClinicalTheme::key_desc()),
        ])
    };

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
    use crate::domain::{encode, RawValue};

    fn form() -> FormState {
        FormState::new(FeatureSchema::pmn_vte())
    }

    fn select(state: &mut FormState, key: &str) {
        state.selected_field = state
            .fields
            .iter()
            .position(|f| f.spec.key == key)
            .expect("field on form");
    }

    #[test]
    fn test_opens_in_display_order_with_defaults() {
        let state = form();
        let keys: Vec<&str> = state.fields.iter().map(|f| f.spec.key).collect();
        assert_eq!(
            keys,
            [
                "Recurrent nephrotic syndrome",
                "umALB/Ucr",
                "Statins",
                "DD",
                "FDP > 5mg/L",
                "INR",
                "AT III activity",
                "ALB",
                "aPLA2Rab",
                "CHE",
            ]
        );

        let input = state.to_patient_input().expect("defaults parse");
        let encoded = encode(FeatureSchema::pmn_vte(), &input).expect("defaults encode");
        assert_eq!(
            encoded.as_slice(),
            &[0.0, 1.0, 25.0, 0.0, 19.0, 10.0, 0.0, 1.80, 105.0, 89.0]
        );
    }

    #[test]
    fn test_toggle_only_affects_choice_fields() {
        let mut state = form();
        select(&mut state, "Statins");
        state.toggle_choice();
        state.input_char('7');
        assert_eq!(
            state.to_patient_input().expect("parse").get("Statins"),
            Some(&RawValue::Choice(YES.to_string()))
        );

        select(&mut state, "INR");
        state.toggle_choice();
        state.clear_field();
        state.input_char('1');
        state.input_char('x');
        state.input_char('.');
        state.input_char('2');
        assert_eq!(
            state.to_patient_input().expect("parse").get("INR"),
            Some(&RawValue::Numeric(1.2))
        );
    }

    #[test]
    fn test_empty_numeric_is_reported() {
        let mut state = form();
        select(&mut state, "ALB");
        state.clear_field();
        let err = state.to_patient_input().expect_err("empty albumin");
        assert!(err.starts_with("Albumin (g/L)"));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut state = form();
        select(&mut state, "DD");
        state.clear_field();
        state.input_char('9');
        select(&mut state, "FDP > 5mg/L");
        state.toggle_choice();
        state.error_message = Some("stale".to_string());

        state.reset_defaults();

        let input = state.to_patient_input().expect("parse");
        assert_eq!(input, PatientInput::defaults(FeatureSchema::pmn_vte()));
        assert_eq!(state.selected_field, 0);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = form();
        state.prev_field();
        assert_eq!(state.selected_field, state.fields.len() - 1);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }
}
