use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::config::KeyBindings;
use crate::game::{Blast, Cell, Direction, BOARD_SIZE};
use crate::network::Slot;

use super::overlay::render_overlay;
use super::view::ViewState;

// Layout: title + controls, bordered board, two status rows
// Each board cell is two terminal columns wide so the grid looks square.
const CELL_WIDTH: u16 = 2;
const HEADER_ROWS: u16 = 2;
const STATUS_ROWS: u16 = 2;
const BOARD_ROWS: u16 = BOARD_SIZE as u16 + 2;
const BOARD_COLS: u16 = BOARD_SIZE as u16 * CELL_WIDTH + 2;

pub fn render(frame: &mut Frame, view: &ViewState, keys: &KeyBindings) {
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Rgb(0, 0, 0))),
        area,
    );

    let [header, board, status] = Layout::vertical([
        Constraint::Length(HEADER_ROWS),
        Constraint::Length(BOARD_ROWS),
        Constraint::Length(STATUS_ROWS),
    ])
    .flex(ratatui::layout::Flex::Center)
    .areas(area);

    draw_header(frame, header, keys);
    draw_board(frame, centred(board, BOARD_COLS), view);
    draw_status(frame, status, view);

    if let Some(ref overlay) = view.overlay {
        render_overlay(frame, overlay, area);
    }
}

fn centred(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn draw_header(frame: &mut Frame, area: Rect, keys: &KeyBindings) {
    let title = Paragraph::new("B O M B E R D U E L")
        .style(Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, Rect { height: 1, ..area });

    let hint = format!(
        "{}/{}/{}/{}: Move  {}: Bomb  {}: Quit",
        keys.up, keys.down, keys.left, keys.right, keys.place_bomb, keys.quit
    );
    let controls = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    if area.height > 1 {
        frame.render_widget(
            controls,
            Rect {
                y: area.y + 1,
                height: 1,
                ..area
            },
        );
    }
}

fn draw_board(frame: &mut Frame, area: Rect, view: &ViewState) {
    let lines: Vec<Line> = view
        .board
        .rows()
        .map(|row| Line::from(row.iter().map(|cell| cell_span(*cell)).collect::<Vec<_>>()))
        .collect();

    let grid = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    );
    frame.render_widget(grid, area);
}

fn cell_span(cell: Cell) -> Span<'static> {
    let (glyph, style) = match cell {
        Cell::Empty => ("  ", Style::default().bg(Color::Rgb(24, 64, 24))),
        Cell::Terrain => ("▒▒", Style::default().fg(Color::Rgb(150, 95, 40)).bg(Color::Rgb(90, 55, 20))),
        Cell::PermTerrain => ("██", Style::default().fg(Color::Gray)),
        Cell::Bomb => ("()", Style::default().fg(Color::LightRed).bg(Color::Black).add_modifier(Modifier::BOLD)),
        Cell::Explosion(part) => (blast_glyph(part), Style::default().fg(Color::Yellow).bg(Color::Red)),
        Cell::Player(sprite) => {
            let colour = match sprite.owner {
                Slot::One => Color::LightCyan,
                Slot::Two => Color::LightMagenta,
            };
            (
                facing_glyph(sprite.facing),
                Style::default().fg(Color::Black).bg(colour).add_modifier(Modifier::BOLD),
            )
        }
        Cell::AnimationBlock => ("██", Style::default().fg(Color::Blue)),
    };
    Span::styled(glyph, style)
}

fn blast_glyph(part: Blast) -> &'static str {
    match part {
        Blast::Centre => "**",
        Blast::Arm(Direction::Up | Direction::Down, _) => "||",
        Blast::Arm(Direction::Left | Direction::Right, _) => "==",
    }
}

fn facing_glyph(facing: Direction) -> &'static str {
    match facing {
        Direction::Up => "/\\",
        Direction::Down => "\\/",
        Direction::Left => "<:",
        Direction::Right => ":>",
    }
}

fn draw_status(frame: &mut Frame, area: Rect, view: &ViewState) {
    let [first, second] = view.status_lines();
    let text = vec![
        Line::from(Span::styled(first, Style::default().fg(Color::White))),
        Line::from(Span::styled(second, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UiEvent;
    use crate::game::{Board, TerrainLayout};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Instant;

    #[test]
    fn test_renders_board_and_status() {
        let mut view = ViewState::default();
        view.apply(UiEvent::Waiting, Instant::now());
        view.board = Board::with_layout(&TerrainLayout::classic());

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal
            .draw(|f| render(f, &view, &KeyBindings::default()))
            .unwrap();

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Waiting for other player..."));
        assert!(text.contains("██"));
        assert!(text.contains("Space: Bomb"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut view = ViewState::default();
        view.show(crate::ui::OverlayMessage::error("Server not found"));
        let mut terminal = Terminal::new(TestBackend::new(8, 4)).unwrap();
        terminal
            .draw(|f| render(f, &view, &KeyBindings::default()))
            .unwrap();
    }
}
