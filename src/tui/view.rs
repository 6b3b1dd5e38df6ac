use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::grid;
use super::mode::{Focus, TuiState};
use crate::shared::{DisplayState, SearchView, TrackView};

const ACCENT: Color = Color::Rgb(0xFF, 0x14, 0x93);

// draws only what DisplayState says; records hit areas for the mouse
pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &mut TuiState, blink_on: bool) {
    ts.hits = Default::default();

    let board = if state.board_open {
        Constraint::Min(grid::grid_height(state.catalog.len()) + 4)
    } else {
        Constraint::Length(1)
    };
    let video = if state.video_open {
        Constraint::Min(10)
    } else {
        Constraint::Length(1)
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status line
            board,
            video,
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_status(frame, sections[0], state, blink_on);
    if state.board_open {
        draw_board(frame, sections[1], state, ts);
    } else {
        draw_collapsed(frame, sections[1], "Soundboard", 'b');
    }
    if state.video_open {
        draw_video(frame, sections[2], &state.search, ts, blink_on);
    } else {
        draw_collapsed(frame, sections[2], "Videos", 'y');
    }
    draw_help(frame, sections[3], ts.focus);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let mut spans = vec![Span::styled(" tinytunes ", Style::default().fg(Color::Black).bg(ACCENT))];
    let playing = state.tracks.iter().filter(|t| t.active).count();
    if playing > 0 {
        let dot = if blink_on { " ● " } else { "   " };
        spans.push(Span::styled(dot, Style::default().fg(Color::Green)));
        spans.push(Span::raw(format!("{playing} looping")));
    }
    if let Some(status) = &state.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_collapsed(frame: &mut Frame, area: Rect, title: &str, key: char) {
    let line = Line::from(Span::styled(
        format!("▸ {title} ({key} to open)"),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn draw_board(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &mut TuiState) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(ts.focus == Focus::Board))
        .title(" Kids Soundboard! ");
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(grid::grid_height(state.catalog.len())),
            Constraint::Min(3),
        ])
        .split(inner);

    let dragging = ts.drag.map(|d| d.sound);
    ts.hits.catalog = grid::draw_catalog_grid(frame, parts[0], &state.catalog, dragging);
    draw_tracks(frame, parts[1], state, ts);
}

fn draw_tracks(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &mut TuiState) {
    ts.hits.track_list = Some(area);
    let drop_target = ts.is_dragging_over_tracks();
    let border = if drop_target {
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" My Tracks ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if state.tracks.is_empty() {
        let hint = Paragraph::new("Drag a sound here (or press 1-9) to make a track!")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hint, inner);
        return;
    }

    let first = first_visible(state.selected_track, inner.height as usize);
    ts.hits.first_track = first;
    let visible = state.tracks.iter().enumerate().skip(first).take(inner.height as usize);
    for (row_idx, (i, track)) in visible.enumerate() {
        let row = Rect::new(inner.x, inner.y + row_idx as u16, inner.width, 1);
        let selected = state.selected_track == Some(i);
        frame.render_widget(Paragraph::new(track_line(track, selected)), row);
        ts.hits.track_rows.push(row);
    }
}

// scroll just far enough that the selected row is the last one shown
fn first_visible(selected: Option<usize>, rows: usize) -> usize {
    match selected {
        Some(i) if rows > 0 && i >= rows => i + 1 - rows,
        _ => 0,
    }
}

fn track_line(track: &TrackView, selected: bool) -> Line<'static> {
    let swatch = Style::default().bg(grid::button_color(track.color));
    let (icon, icon_style) = if track.active {
        ("▶ ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("■ ", Style::default().fg(Color::DarkGray))
    };
    let mut line = Line::from(vec![
        Span::raw(if selected { "› " } else { "  " }),
        Span::styled("  ", swatch),
        Span::raw(" "),
        Span::styled(icon, icon_style),
        Span::raw(format!("{:<10}", track.label)),
        Span::raw(format!(" speed {}", track.tempo)),
        Span::styled(tempo_limit(track), Style::default().fg(Color::DarkGray)),
        Span::raw(format!("  vol {:>3}%", (track.volume * 100.0).round() as u32)),
    ]);
    if selected {
        line = line.style(Style::default().add_modifier(Modifier::BOLD));
    }
    line
}

fn tempo_limit(track: &TrackView) -> &'static str {
    if track.tempo.is_max() {
        " (fastest)"
    } else if track.tempo.is_min() {
        " (slowest)"
    } else {
        ""
    }
}

fn draw_video(frame: &mut Frame, area: Rect, search: &SearchView, ts: &mut TuiState, blink_on: bool) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(ts.focus != Focus::Board))
        .title(" Kids Video Player! ");
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // search box
            Constraint::Length(1), // error
            Constraint::Length(1), // now playing
            Constraint::Min(1),    // results
        ])
        .split(inner);

    draw_search_box(frame, parts[0], search, ts.focus == Focus::Search, blink_on);

    if let Some(error) = search.error {
        let line = Line::from(Span::styled(error, Style::default().fg(Color::Red)));
        frame.render_widget(Paragraph::new(line), parts[1]);
    }

    let now_playing = Line::from(vec![
        Span::styled("Now playing: ", Style::default().fg(ACCENT)),
        Span::raw(search.current_video.clone()),
        Span::styled(format!("  {}", search.embed_url), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(now_playing), parts[2]);

    draw_results(frame, parts[3], search, ts);
}

fn draw_search_box(frame: &mut Frame, area: Rect, search: &SearchView, focused: bool, blink_on: bool) {
    let mic = if search.listening {
        if blink_on { " 🎤 listening " } else { "    listening " }
    } else if search.voice_supported {
        " m: 🎤 "
    } else {
        ""
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_style(focused))
        .title(" Search ")
        .title(Line::from(mic).right_aligned());

    let text = if search.query.is_empty() && !focused {
        Line::from(Span::styled(
            "What would you like to watch?",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let cursor = if focused && blink_on { "▏" } else { "" };
        Line::from(format!("{}{cursor}", search.query))
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_results(frame: &mut Frame, area: Rect, search: &SearchView, ts: &mut TuiState) {
    let title = if search.loading {
        "Looking for fun videos..."
    } else {
        "Fun Videos to Watch!"
    };
    if area.height == 0 {
        return;
    }
    let header = Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)));
    frame.render_widget(Paragraph::new(header), Rect::new(area.x, area.y, area.width, 1));

    let rows = area.height.saturating_sub(1) as usize;
    let focused = ts.focus == Focus::Results;
    for (i, video) in search.results.iter().enumerate().take(rows) {
        let row = Rect::new(area.x, area.y + 1 + i as u16, area.width, 1);
        let marker = if focused && i == search.selected { "› " } else { "  " };
        let mut line = Line::from(vec![
            Span::raw(marker),
            Span::raw(video.title.clone()),
            Span::styled(format!("  {}", video.channel), Style::default().fg(Color::DarkGray)),
        ]);
        if i == search.selected {
            line = line.style(Style::default().fg(ACCENT));
        }
        frame.render_widget(Paragraph::new(line), row);
        ts.hits.results.push(row);
    }
}

fn draw_help(frame: &mut Frame, area: Rect, focus: Focus) {
    let help = match focus {
        Focus::Board => {
            "1-9 add  ↑↓ pick  space loop  +/- speed  [/] vol  p play  t sync  x remove  S stop  / search  m talk  Tab videos  b/y hide  Esc quit"
        }
        Focus::Search => "type to search  Enter go  Tab results  Esc back",
        Focus::Results => "↑↓ pick  Enter watch  / search  Esc back",
    };
    let line = Line::from(Span::styled(help, Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(line), area);
}
