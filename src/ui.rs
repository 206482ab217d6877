pub mod chart;
pub mod layout;
pub mod panels;

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::app::{App, Focus};
use crate::navigation::Mode;
use crate::session::Session;
use crate::widget_pos::WidgetKind;

use self::chart::{ChartView, Thumbnail};
use self::panels::{CounterPanel, TimerPanel};

pub fn draw(app: &mut App, f: &mut Frame) {
    let now = Instant::now();
    let area = f.area();
    let screen = app.layout();

    refresh_thumbnail(app, screen.image);

    let session = app.session();
    f.render_widget(Header { app }, screen.header);
    if let Some(pdf_area) = screen.pdf {
        f.render_widget(PdfPanel { session }, pdf_area);
    }
    if let Some(chart_area) = screen.chart {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" chart ")
            .border_style(match session.mode() {
                Mode::HighlightActive => Style::default().fg(Color::Yellow),
                Mode::BrowsingCrop => Style::default(),
            });
        f.render_widget(block, chart_area);
        match (screen.image, app.thumbnail.as_ref()) {
            (Some(image_area), Some(thumbnail)) => f.render_widget(
                ChartView {
                    thumbnail,
                    chart: session.chart(),
                },
                image_area,
            ),
            _ => f.render_widget(ChartPlaceholder { session }, layout::inner(chart_area)),
        }
    }

    let counter = session.widget(WidgetKind::Counter);
    if let (Some(pos), Some(size)) = (counter.placed(app.viewport()), counter.size()) {
        let rect = panels::panel_rect(pos, size).intersection(area);
        f.render_widget(
            CounterPanel {
                value: session.counter().value(),
                dragging: counter.is_dragging(),
            },
            rect,
        );
    }
    let timer = session.widget(WidgetKind::Timer);
    if let (Some(pos), Some(size)) = (timer.placed(app.viewport()), timer.size()) {
        let rect = panels::panel_rect(pos, size).intersection(area);
        f.render_widget(
            TimerPanel {
                timer: session.timer(),
                flash: session.cue().flash_on(now),
                dragging: timer.is_dragging(),
                locked: session.timer().is_running(),
            },
            rect,
        );
    }

    f.render_widget(StatusBar { app }, screen.status);
}

/// Rebuild the cached thumbnail when the image or its box changed.
fn refresh_thumbnail(app: &mut App, image_area: Option<Rect>) {
    let Some(area) = image_area else {
        return;
    };
    let serial = app.session().image_serial();
    if app.thumbnail.as_ref().is_some_and(|t| t.fits(serial, area)) {
        return;
    }
    let Some(asset) = app.session().image() else {
        return;
    };
    let built = Thumbnail::build(asset, serial, area.width, area.height);
    app.thumbnail = match built {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("could not draw chart image: {e}");
            None
        }
    };
}

struct Header<'a> {
    app: &'a App,
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = self.app.session();
        let rows = session.rows();
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().add_modifier(Modifier::DIM);

        let field = match self.app.focus() {
            Focus::Rows(text) => Span::styled(
                format!("[{text}▏]"),
                Style::default().add_modifier(Modifier::REVERSED),
            ),
            _ => Span::styled(
                format!(
                    "[{}]",
                    rows.total_rows().map(|n| n.to_string()).unwrap_or_default()
                ),
                if session.mode() == Mode::HighlightActive {
                    dim
                } else {
                    Style::default()
                },
            ),
        };

        let mut spans = vec![
            Span::styled(" rowmark ", bold.fg(Color::Magenta)),
            Span::raw(" rows "),
            field,
        ];
        if session.mode() == Mode::HighlightActive {
            spans.push(Span::styled(
                format!("  row {} of {}", rows.current_row(), rows.effective_total()),
                bold.fg(Color::Yellow),
            ));
        }
        spans.push(Span::styled(format!("  {}", mode_label(session.mode())), dim));
        Paragraph::new(Line::from(spans)).render(area, buf);
    }
}

fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::BrowsingCrop => "selecting",
        Mode::HighlightActive => "following rows",
    }
}

struct ChartPlaceholder<'a> {
    session: &'a Session,
}

impl Widget for ChartPlaceholder<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let text = if self.session.is_restoring() {
            vec![Line::from("restoring…")]
        } else {
            vec![
                Line::from(Span::styled(
                    "no chart image",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from("i  load an image"),
                Line::from("or paste the path of an image file"),
            ]
        };
        let top = area.height.saturating_sub(text.len() as u16) / 2;
        let centred = Rect {
            y: area.y + top,
            height: area.height.saturating_sub(top),
            ..area
        };
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(centred, buf);
    }
}

struct PdfPanel<'a> {
    session: &'a Session,
}

impl Widget for PdfPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title(" pattern pdf ");
        let inner = block.inner(area);
        block.render(area, buf);

        let dim = Style::default().add_modifier(Modifier::DIM);
        let lines = match self.session.pdf() {
            Some(pdf) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        format!("{:.1} KB loaded", pdf.len() as f64 / 1024.0),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from("o    open in viewer"),
                    Line::from("p    load another pdf"),
                    Line::from("tab  toggle chart panel"),
                ];
                if let Some(url) = self.session.pdf_url() {
                    lines.push(Line::from(""));
                    lines.push(Line::from(Span::styled(url.to_string(), dim)));
                }
                lines
            }
            None => vec![
                Line::from("no pattern pdf"),
                Line::from(""),
                Line::from("p    load a pdf"),
            ],
        };
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

struct StatusBar<'a> {
    app: &'a App,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let italic = Style::default().add_modifier(Modifier::ITALIC);
        let line = match (self.app.focus(), self.app.status()) {
            (Focus::Path(kind, text), _) => Line::from(vec![
                Span::styled(format!("{kind} path: "), Style::default().fg(Color::Cyan)),
                Span::raw(format!("{text}▏")),
                Span::styled("  (enter load / esc cancel)", italic),
            ]),
            (Focus::Rows(_), _) => Line::from(Span::styled(
                "type the number of rows  (enter / esc done)",
                italic,
            )),
            (Focus::None, Some(msg)) => {
                Line::from(Span::styled(msg.to_string(), Style::default().fg(Color::Yellow)))
            }
            (Focus::None, None) => help_line(self.app.session()),
        };
        Paragraph::new(line).render(area, buf);
    }
}

fn help_line(session: &Session) -> Line<'static> {
    let italic = Style::default().add_modifier(Modifier::ITALIC);
    let off = italic.add_modifier(Modifier::DIM);
    let hints = match session.mode() {
        Mode::BrowsingCrop => {
            let ready = session.chart().can_enter_highlight().is_ok() && session.image().is_some();
            let enter = if ready {
                italic
            } else {
                off
            };
            vec![
                Span::styled("drag to select  ", italic),
                Span::styled("(enter) follow rows  ", enter),
                Span::styled("(e)dit rows  (x) clear  ", italic),
            ]
        }
        Mode::HighlightActive => vec![Span::styled(
            "(↑/↓) row  (f) reframe  ",
            italic,
        )],
    };
    let mut spans = hints;
    spans.push(Span::styled(
        "(space) timer  (+/-) count  (i)mage  (p)df  (q)uit",
        italic,
    ));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::Silent;
    use crate::intake::{fixtures, ImageAsset, PdfDocument, RecordingViewer};
    use crate::runtime::AppEvent;
    use crate::session::SessionOptions;
    use crate::storage::{AsyncBlobStore, MemoryBlobStore, MemoryKv};
    use crate::widget_pos::Size;
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app(cache: &std::path::Path) -> App {
        let session = Session::open(
            Box::new(MemoryKv::new()),
            AsyncBlobStore::spawn(MemoryBlobStore::new()),
            Box::new(Silent),
            SessionOptions {
                total_rows: 15,
                timer_minutes: 25,
                cue_duration: std::time::Duration::from_secs(3),
                cache_dir: cache.to_path_buf(),
            },
        );
        App::new(session, Box::new(RecordingViewer::new()), Size::new(80, 24))
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn empty_screen_explains_itself() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let content = render(&mut app);
        assert!(content.contains("no chart image"));
        assert!(content.contains("rowmark"));
        assert!(content.contains("25:00"));
        assert!(content.contains("[15]"));
    }

    #[test]
    fn image_is_drawn_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.session_mut()
            .replace_image(ImageAsset::from_bytes(fixtures::png(40, 40)).unwrap());
        let content = render(&mut app);
        assert!(content.contains("▀"));
        assert!(!content.contains("no chart image"));
        let image = app.layout().image.unwrap();
        assert!(app.thumbnail.as_ref().unwrap().fits(1, image));
    }

    #[test]
    fn split_shows_the_pdf_panel() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.session_mut()
            .replace_pdf(PdfDocument::from_bytes(fixtures::pdf()).unwrap());
        let content = render(&mut app);
        assert!(content.contains("pattern pdf"));
        assert!(content.contains("chart"));

        app.handle(
            AppEvent::Key(crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Tab,
                crossterm::event::KeyModifiers::NONE,
            )),
            Instant::now(),
        );
        let content = render(&mut app);
        assert!(content.contains("pattern pdf"));
        assert!(!content.contains("no chart image"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.handle(AppEvent::Resize(12, 4), Instant::now());
        let mut terminal = Terminal::new(TestBackend::new(12, 4)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
    }
}
