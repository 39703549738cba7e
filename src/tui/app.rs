//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation (form, report)
//! - Input event handling
//! - Submitting the form to the risk pipeline

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::application::RiskPipeline;
use crate::VteError;

use super::ui::{
    form::{render_form, FormState},
    render_disclaimer,
    report::{render_report, ReportState},
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Report,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    pipeline: RiskPipeline,
    form_state: FormState,
    report_state: ReportState,
}

impl App {
    /// Create an application over an already-built pipeline.
    #[must_use]
    pub fn new(pipeline: RiskPipeline) -> Self {
        let schema = pipeline.context().schema();
        Self {
            screen: Screen::Form,
            should_quit: false,
            pipeline,
            form_state: FormState::new(schema),
            report_state: ReportState::default(),
        }
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Form => render_form(f, chunks[0], &self.form_state),
                    Screen::Report => render_report(f, chunks[0], &self.report_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Form => self.handle_form_key(key),
            Screen::Report => self.handle_report_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                self.form_state.toggle_choice();
            }
            KeyCode::Char('d') | KeyCode::Char('D') => self.form_state.reset_defaults(),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_report_key(&mut self, key: KeyCode) {
        match key {
            // Predict Again: back to the form with the previous values.
            KeyCode::Enter | KeyCode::Char('p') | KeyCode::Char('P') => {
                self.report_state = ReportState::Idle;
                self.screen = Screen::Form;
            }
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let input = match self.form_state.to_patient_input() {
            Ok(input) => input,
            Err(message) => {
                self.form_state.error_message = Some(message);
                return;
            }
        };

        match self.pipeline.assess(&input) {
            Ok(assessment) => {
                self.form_state.error_message = None;
                self.report_state = ReportState::Complete {
                    assessment: Box::new(assessment),
                };
                self.screen = Screen::Report;
            }
            // Rejected input stays on the form; nothing was scored.
            Err(VteError::Validation(e)) => {
                self.form_state.error_message = Some(e.to_string());
            }
            Err(e) => {
                tracing::error!("Assessment failed: {}", e);
                self.report_state = ReportState::Error {
                    message: e.to_string(),
                };
                self.screen = Screen::Report;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TrainedModel;
    use crate::application::RiskContext;
    use crate::domain::{FeatureSchema, RiskThresholds};
    use std::path::Path;
    use std::sync::Arc;

    fn app() -> App {
        let model = TrainedModel::load(Path::new("models"), FeatureSchema::pmn_vte())
            .expect("shipped model");
        let context =
            RiskContext::from_model(model, RiskThresholds::default()).expect("context");
        App::new(RiskPipeline::new(Arc::new(context)))
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn select(app: &mut App, key: &str) {
        app.form_state.selected_field = app
            .form_state
            .fields
            .iter()
            .position(|f| f.spec.key == key)
            .expect("field on form");
    }

    #[test]
    fn test_submit_defaults_shows_report() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen(), Screen::Report);
        match &app.report_state {
            ReportState::Complete { assessment } => {
                assert!(assessment
                    .headline_sentence()
                    .starts_with("Your risk of developing VTE in the next 6 months is: "));
            }
            other => panic!("unexpected report state: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_stays_on_form() {
        let mut app = app();
        select(&mut app, "INR");
        press(&mut app, KeyCode::Delete);
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Char('.'));
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.screen(), Screen::Form);
        let message = app.form_state.error_message.clone().expect("error shown");
        assert!(message.contains("INR"));
    }

    #[test]
    fn test_predict_again_keeps_values() {
        let mut app = app();
        select(&mut app, "Statins");
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen(), Screen::Report);

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.screen(), Screen::Form);
        let input = app.form_state.to_patient_input().expect("parse");
        assert_eq!(
            input.get("Statins"),
            Some(&crate::domain::RawValue::Choice("YES".to_string()))
        );
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);

        let mut app = app_on_report();
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    fn app_on_report() -> App {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        app
    }
}
