use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::shared::{CatalogButton, MAX_HOTKEY_SOUNDS};

const COLS: usize = 3;
const BUTTON_HEIGHT: u16 = 3;

pub fn grid_height(buttons: usize) -> u16 {
    buttons.div_ceil(COLS) as u16 * BUTTON_HEIGHT
}

// Draw the catalog as rows of colored buttons. Returns where each button
// landed so clicks and drags can find them.
pub fn draw_catalog_grid(frame: &mut Frame, area: Rect, buttons: &[CatalogButton], dragging: Option<usize>) -> Vec<Rect> {
    let rows = buttons.len().div_ceil(COLS);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(BUTTON_HEIGHT); rows])
        .split(area);
    let col_constraints = [Constraint::Ratio(1, COLS as u32); COLS];

    let mut rects = Vec::with_capacity(buttons.len());
    for (row_idx, row_area) in row_areas.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let idx = row_idx * COLS + col_idx;
            let Some(button) = buttons.get(idx) else {
                break;
            };
            draw_button(frame, *cell_area, idx, button, dragging == Some(idx));
            rects.push(*cell_area);
        }
    }
    rects
}

fn draw_button(frame: &mut Frame, area: Rect, idx: usize, button: &CatalogButton, lifted: bool) {
    let bg = button_color(button.color);
    let mut style = Style::default().fg(Color::Black).bg(bg);
    if !button.loaded {
        style = style.add_modifier(Modifier::DIM);
    }
    if lifted {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let hotkey = if idx < MAX_HOTKEY_SOUNDS {
        format!("{} ", idx + 1)
    } else {
        String::new()
    };
    let suffix = if button.loading { " ..." } else { "" };
    let label = Line::from(format!("{hotkey}{}{suffix}", button.label)).alignment(Alignment::Center);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White).bg(bg))
        .title_bottom(Line::from(button.category.as_str()).right_aligned())
        .style(style);
    frame.render_widget(Paragraph::new(label).block(block), area);
}

pub fn button_color(rgb: Option<(u8, u8, u8)>) -> Color {
    match rgb {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_grows_a_row_per_three_buttons() {
        assert_eq!(grid_height(0), 0);
        assert_eq!(grid_height(3), 3);
        assert_eq!(grid_height(6), 6);
        assert_eq!(grid_height(7), 9);
    }

    #[test]
    fn bad_colors_fall_back_to_gray() {
        assert_eq!(button_color(None), Color::Gray);
        assert_eq!(button_color(Some((1, 2, 3))), Color::Rgb(1, 2, 3));
    }
}
