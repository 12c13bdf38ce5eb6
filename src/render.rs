//! Screen rendering
//!
//! Stateless projections from session state to positioned terminal
//! writes. Every render clears the whole screen and redraws the layout
//! for the current screen state - simplicity over bandwidth. Output is
//! queued into a byte buffer so it can travel over any duplex stream.

use crate::board::{Cell, BOARD_HEIGHT, BOARD_WIDTH};
use crate::game::GameEngine;
use crate::session::{Screen, Session, LEADERBOARD_ROWS};
use crate::store::LeaderboardEntry;
use crossterm::{
    cursor::{Hide, MoveTo},
    style::{Attribute, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use std::io::{self, Write};

/// Column where the board's left border is drawn
const BOARD_X: u16 = 2;
/// Row of the board's top border
const BOARD_Y: u16 = 1;
/// Column of the stats/next panel beside the board
const PANEL_X: u16 = BOARD_X + (BOARD_WIDTH as u16 * 2) + 6;

/// Export view height before the on-screen text is clipped. The data
/// itself is never truncated, only its presentation.
pub const EXPORT_VIEW_LINES: usize = 18;

const BLOCK: &str = "██";
const EMPTY: &str = "  ";

/// Render the current screen into a fresh byte buffer
pub fn render(session: &Session) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(4096);
    buf.queue(Hide)?
        .queue(MoveTo(0, 0))?
        .queue(Clear(ClearType::All))?;

    match session.screen() {
        Screen::Welcome => render_welcome(&mut buf, session)?,
        Screen::Playing => render_game(&mut buf, session, false)?,
        Screen::Paused => render_game(&mut buf, session, true)?,
        Screen::GameOver => render_game_over(&mut buf, session)?,
        Screen::Leaderboard => render_leaderboard(&mut buf, session)?,
        Screen::AccountMenu => render_account_menu(&mut buf, session)?,
        Screen::AccountExport => render_export(&mut buf, session)?,
        Screen::AccountDelete => render_delete(&mut buf, session)?,
    }

    buf.queue(ResetColor)?;
    buf.flush()?;
    Ok(buf)
}

fn line(buf: &mut Vec<u8>, col: u16, row: u16, text: &str) -> io::Result<()> {
    buf.queue(MoveTo(col, row))?.queue(Print(text))?;
    Ok(())
}

fn render_welcome(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    buf.queue(SetForegroundColor(crossterm::style::Color::Cyan))?;
    let banner = [
        "▀█▀ █▀▀ █▀█ █▄▄▄█ ▀█▀ █▀█ ▀█▀ █▀▀",
        " █  █▀▀ █▀▄ █ ▀ █  █  █▀▄  █  ▀▀█",
        " ▀  ▀▀▀ ▀ ▀ ▀   ▀  ▀  ▀ ▀ ▀▀▀ ▀▀▀",
    ];
    for (i, row) in banner.iter().enumerate() {
        line(buf, 4, 1 + i as u16, row)?;
    }
    buf.queue(ResetColor)?;

    let id = session.identity();
    let fingerprint: String = id.id.chars().take(16).collect();
    line(
        buf,
        4,
        5,
        &format!("signed in as {} [{}]", id.display_name, fingerprint),
    )?;
    line(buf, 4, 7, "h  high scores")?;
    line(buf, 4, 8, "a  account")?;
    line(buf, 4, 9, "^C quit")?;
    line(buf, 4, 11, "press any other key to play")?;
    Ok(())
}

fn render_game(buf: &mut Vec<u8>, session: &Session, paused: bool) -> io::Result<()> {
    let Some(game) = session.game() else {
        return Ok(());
    };

    draw_board(buf, game)?;
    draw_panel(buf, session, game)?;

    if paused {
        buf.queue(SetAttribute(Attribute::Bold))?;
        line(
            buf,
            BOARD_X + 6,
            BOARD_Y + (BOARD_HEIGHT as u16 / 2),
            " PAUSED ",
        )?;
        buf.queue(SetAttribute(Attribute::Reset))?;
        line(buf, PANEL_X, 16, "p  resume")?;
    }
    Ok(())
}

fn draw_board(buf: &mut Vec<u8>, game: &GameEngine) -> io::Result<()> {
    let inner = BOARD_WIDTH * 2;
    let horizontal = "─".repeat(inner);
    line(buf, BOARD_X, BOARD_Y, &format!("┌{}┐", horizontal))?;
    line(
        buf,
        BOARD_X,
        BOARD_Y + BOARD_HEIGHT as u16 + 1,
        &format!("└{}┘", horizontal),
    )?;

    // Merge the falling piece into a copy of the settled grid.
    let mut cells: Vec<[Cell; BOARD_WIDTH]> = game.board.rows().copied().collect();
    let piece = game.current();
    for (dx, dy) in piece.shape().cells() {
        let col = piece.x + dx;
        let row = piece.y + dy;
        if (0..BOARD_HEIGHT as i32).contains(&row) && (0..BOARD_WIDTH as i32).contains(&col) {
            cells[row as usize][col as usize] = Cell::Filled(piece.kind);
        }
    }

    for (row, row_cells) in cells.iter().enumerate() {
        let y = BOARD_Y + 1 + row as u16;
        line(buf, BOARD_X, y, "│")?;
        for cell in row_cells {
            match cell {
                Cell::Empty => {
                    buf.queue(Print(EMPTY))?;
                }
                Cell::Filled(kind) => {
                    buf.queue(SetForegroundColor(kind.color()))?
                        .queue(Print(BLOCK))?
                        .queue(ResetColor)?;
                }
            }
        }
        buf.queue(Print("│"))?;
    }
    Ok(())
}

fn draw_panel(buf: &mut Vec<u8>, session: &Session, game: &GameEngine) -> io::Result<()> {
    let stats = game.stats();
    line(buf, PANEL_X, 1, &session.identity().display_name)?;
    line(buf, PANEL_X, 3, &format!("score  {}", stats.score))?;
    line(buf, PANEL_X, 4, &format!("level  {}", stats.level))?;
    line(buf, PANEL_X, 5, &format!("lines  {}", stats.lines))?;

    let next = game.next_kind();
    line(buf, PANEL_X, 7, &format!("next   {}", next.tag()))?;
    let shape = next.shape(0);
    buf.queue(SetForegroundColor(next.color()))?;
    for dy in 0..shape.height() {
        buf.queue(MoveTo(PANEL_X, 8 + dy as u16))?;
        for dx in 0..shape.width() {
            let occupied = shape.cells().any(|(x, y)| x == dx as i32 && y == dy as i32);
            buf.queue(Print(if occupied { BLOCK } else { EMPTY }))?;
        }
    }
    buf.queue(ResetColor)?;

    line(buf, PANEL_X, 13, "←→ move   ↑ rotate")?;
    line(buf, PANEL_X, 14, "↓ drop    ␣ hard drop")?;
    line(buf, PANEL_X, 15, "p pause   r restart  h scores")?;
    Ok(())
}

fn render_game_over(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    buf.queue(SetAttribute(Attribute::Bold))?;
    line(buf, 4, 2, "GAME OVER")?;
    buf.queue(SetAttribute(Attribute::Reset))?;

    if let Some(result) = session.last_result() {
        line(buf, 4, 4, &format!("score  {}", result.score))?;
        line(buf, 4, 5, &format!("level  {}", result.level))?;
        line(buf, 4, 6, &format!("lines  {}", result.lines))?;
        if result.new_best {
            buf.queue(SetForegroundColor(crossterm::style::Color::Yellow))?;
            match result.rank {
                Some(rank) => line(buf, 4, 8, &format!("NEW PERSONAL BEST - rank #{}", rank))?,
                None => line(buf, 4, 8, "NEW PERSONAL BEST")?,
            }
            buf.queue(ResetColor)?;
        }
    }

    line(buf, 4, 10, "r  play again")?;
    line(buf, 4, 11, "h  high scores")?;
    line(buf, 4, 12, "any other key for the menu")?;
    Ok(())
}

fn render_leaderboard(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    buf.queue(SetAttribute(Attribute::Bold))?;
    line(buf, 4, 1, "HIGH SCORES")?;
    buf.queue(SetAttribute(Attribute::Reset))?;
    line(
        buf,
        4,
        3,
        &format!(
            "{:>3}  {:<16} {:>8} {:>5} {:>5}  {:<10}",
            "#", "player", "score", "level", "lines", "date"
        ),
    )?;

    let rows = session.leaderboard_rows();
    for i in 0..LEADERBOARD_ROWS {
        let y = 4 + i as u16;
        match rows.get(i) {
            Some(entry) => {
                let own = entry.player_id == session.identity().id;
                if own {
                    buf.queue(SetAttribute(Attribute::Reverse))?;
                }
                line(buf, 4, y, &format_row(i + 1, entry))?;
                if own {
                    buf.queue(SetAttribute(Attribute::Reset))?;
                }
            }
            None => {
                line(
                    buf,
                    4,
                    y,
                    &format!("{:>3}  {:<16} {:>8} {:>5} {:>5}  {:<10}", i + 1, "-", "-", "-", "-", "-"),
                )?;
            }
        }
    }

    line(buf, 4, 15, "press any key to continue")?;
    Ok(())
}

fn format_row(rank: usize, entry: &LeaderboardEntry) -> String {
    // Char-wise so multibyte names cannot split a code point.
    let name: String = entry.display_name.chars().take(16).collect();
    format!(
        "{:>3}  {:<16} {:>8} {:>5} {:>5}  {:<10}",
        rank, name, entry.score, entry.level, entry.lines, entry.date
    )
}

fn render_account_menu(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    buf.queue(SetAttribute(Attribute::Bold))?;
    line(buf, 4, 1, "ACCOUNT")?;
    buf.queue(SetAttribute(Attribute::Reset))?;
    line(
        buf,
        4,
        3,
        &format!("{} [{}]", session.identity().display_name, session.identity().id),
    )?;
    line(buf, 4, 5, "e  export my data")?;
    line(buf, 4, 6, "d  delete my account")?;
    line(buf, 4, 8, "any other key to go back")?;
    Ok(())
}

fn render_export(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    buf.queue(SetAttribute(Attribute::Bold))?;
    line(buf, 2, 0, "ACCOUNT EXPORT")?;
    buf.queue(SetAttribute(Attribute::Reset))?;

    let lines: Vec<&str> = session.export_text().lines().collect();
    let shown = lines.len().min(EXPORT_VIEW_LINES);
    for (i, text) in lines[..shown].iter().enumerate() {
        line(buf, 2, 2 + i as u16, text)?;
    }
    let mut y = 2 + shown as u16;
    if lines.len() > EXPORT_VIEW_LINES {
        line(
            buf,
            2,
            y,
            &format!("... truncated ({} more lines)", lines.len() - shown),
        )?;
        y += 1;
    }
    line(buf, 2, y + 1, "press any key to go back")?;
    Ok(())
}

fn render_delete(buf: &mut Vec<u8>, session: &Session) -> io::Result<()> {
    if session.deleted() {
        line(buf, 4, 2, "account deleted - goodbye")?;
        return Ok(());
    }
    buf.queue(SetAttribute(Attribute::Bold))?;
    line(buf, 4, 1, "DELETE ACCOUNT")?;
    buf.queue(SetAttribute(Attribute::Reset))?;
    line(buf, 4, 3, "this removes your profile, score history")?;
    line(buf, 4, 4, "and leaderboard entries. there is no undo.")?;
    line(buf, 4, 6, "y  delete everything")?;
    line(buf, 4, 7, "any other key to go back")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Key;
    use crate::session::PlayerIdentity;
    use crate::store::{MemoryLeaderboard, MemoryPlayerStore, PlayerStore};
    use std::sync::Arc;

    fn session() -> Session {
        Session::new(
            PlayerIdentity {
                id: "fp-abc".to_string(),
                display_name: "alice".to_string(),
            },
            Arc::new(MemoryPlayerStore::new()),
            Arc::new(MemoryLeaderboard::new()),
        )
        .with_seed(3)
    }

    fn text_of(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_welcome_names_the_player() {
        let s = session();
        let out = text_of(&render(&s).unwrap());
        assert!(out.contains("alice"));
        assert!(out.contains("fp-abc"));
    }

    #[test]
    fn test_playing_draws_board_and_stats() {
        let mut s = session();
        s.handle_key(Key::Char('x'));
        let out = text_of(&render(&s).unwrap());
        // 20 board rows plus the two borders.
        assert_eq!(out.matches('│').count(), BOARD_HEIGHT * 2);
        assert!(out.contains("score  0"));
        assert!(out.contains("level  1"));
        assert!(out.contains("next"));
    }

    #[test]
    fn test_paused_overlay() {
        let mut s = session();
        s.handle_key(Key::Char('x'));
        s.handle_key(Key::Char('p'));
        let out = text_of(&render(&s).unwrap());
        assert!(out.contains("PAUSED"));
    }

    #[test]
    fn test_leaderboard_always_shows_ten_rows() {
        let mut s = session();
        s.handle_key(Key::Char('h'));
        let out = text_of(&render(&s).unwrap());
        // Ranks 1..=10 padded with placeholder rows.
        for rank in 1..=10 {
            assert!(out.contains(&format!("{:>3} ", rank)), "missing rank {}", rank);
        }
    }

    #[test]
    fn test_export_view_is_clipped_not_the_data() {
        let players = Arc::new(MemoryPlayerStore::new());
        let mut s = Session::new(
            PlayerIdentity {
                id: "fp-abc".to_string(),
                display_name: "alice".to_string(),
            },
            players.clone(),
            Arc::new(MemoryLeaderboard::new()),
        );
        for score in 0..5u64 {
            players
                .append_score(
                    "fp-abc",
                    crate::store::ScoreEntry {
                        score,
                        level: 1,
                        lines: 0,
                        date: "2026-01-01".to_string(),
                    },
                )
                .unwrap();
        }
        s.handle_key(Key::Char('a'));
        s.handle_key(Key::Char('e'));
        assert!(s.export_text().lines().count() > EXPORT_VIEW_LINES);
        let out = text_of(&render(&s).unwrap());
        assert!(out.contains("truncated"));
    }

    #[test]
    fn test_game_over_flags_new_best() {
        let mut s = session();
        s.handle_key(Key::Char('x'));
        while s.screen() == Screen::Playing {
            s.handle_key(Key::Char(' '));
        }
        let out = text_of(&render(&s).unwrap());
        assert!(out.contains("GAME OVER"));
        assert!(out.contains("NEW PERSONAL BEST"));
    }
}
