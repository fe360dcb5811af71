// Interactive command loop: one line in, state transition, text out.
//
// The terminal is the UI, so nothing here logs to stdout; diagnostics go to
// the tracing log file. Persistence is best effort: a failed write is logged
// and reported, but the in-memory state change stands.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::format::{format_day, format_timestamp, format_vnd};
use crate::import;
use crate::session::courts::AutoAssignOutcome;
use crate::session::history::{daily_stats, group_by_day};
use crate::session::slot::{court_slots, GameType, SlotId, Team};
use crate::session::state::SessionState;
use crate::session::PlayerId;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// One parsed input line. Player references are raw tokens here; they are
/// resolved against the roster when the command is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Players,
    Board,
    Bill,
    Summary,
    History,
    Stats,
    Add { name: String },
    Remove { player: String },
    Rename { player: String, name: String },
    Phone { player: String, phone: String },
    Import { path: PathBuf },
    Assign { player: String, slot: SlotId },
    Unassign { slot: SlotId },
    Auto,
    SetType { court: usize, game_type: GameType },
    Color { court: usize, color: String },
    End { court: usize, losing_team: Team },
    Drink { player: String, drink: String, delta: i32 },
    Quantity { delta: i32 },
    Adjust { player: String, amount: f64, reason: String },
    Paid { player: String },
    PaidAll,
    Save,
    Reset,
    ClearHistory,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct ParseCommandError(String);

fn bad(msg: impl Into<String>) -> ParseCommandError {
    ParseCommandError(msg.into())
}

/// Parse one input line. Empty lines parse to `Help`.
pub fn parse_command(line: &str) -> Result<Command, ParseCommandError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(Command::Help);
    };
    let args: Vec<&str> = parts.collect();

    let arity = |n: usize| -> Result<(), ParseCommandError> {
        if args.len() == n {
            Ok(())
        } else {
            Err(bad(format!("`{verb}` expects {n} argument(s), got {}", args.len())))
        }
    };

    match verb {
        "help" | "?" => Ok(Command::Help),
        "players" | "ds" => Ok(Command::Players),
        "board" | "san" => Ok(Command::Board),
        "bill" => Ok(Command::Bill),
        "summary" => Ok(Command::Summary),
        "history" => Ok(Command::History),
        "stats" => Ok(Command::Stats),
        "add" => {
            if args.is_empty() {
                return Err(bad("`add` expects a player name"));
            }
            Ok(Command::Add {
                name: args.join(" "),
            })
        }
        "remove" => {
            arity(1)?;
            Ok(Command::Remove {
                player: args[0].to_string(),
            })
        }
        "rename" => {
            if args.len() < 2 {
                return Err(bad("`rename` expects a player and a new name"));
            }
            Ok(Command::Rename {
                player: args[0].to_string(),
                name: args[1..].join(" "),
            })
        }
        "phone" => {
            arity(2)?;
            Ok(Command::Phone {
                player: args[0].to_string(),
                phone: args[1].to_string(),
            })
        }
        "import" => {
            arity(1)?;
            Ok(Command::Import {
                path: PathBuf::from(args[0]),
            })
        }
        "assign" => {
            arity(2)?;
            let slot = parse_slot(args[1])?;
            Ok(Command::Assign {
                player: args[0].to_string(),
                slot,
            })
        }
        "unassign" => {
            arity(1)?;
            Ok(Command::Unassign {
                slot: parse_slot(args[0])?,
            })
        }
        "auto" => Ok(Command::Auto),
        "type" => {
            arity(2)?;
            let court = parse_court(args[0])?;
            let game_type = args[1]
                .parse()
                .map_err(|_| bad("game type must be `singles` or `doubles`"))?;
            Ok(Command::SetType { court, game_type })
        }
        "color" => {
            arity(2)?;
            Ok(Command::Color {
                court: parse_court(args[0])?,
                color: args[1].to_string(),
            })
        }
        "end" => {
            arity(2)?;
            let court = parse_court(args[0])?;
            let losing_team = args[1]
                .parse()
                .map_err(|_| bad("losing team must be `A` or `B`"))?;
            Ok(Command::End { court, losing_team })
        }
        "drink" => {
            arity(3)?;
            let delta = args[2]
                .parse()
                .map_err(|_| bad("drink delta must be an integer"))?;
            Ok(Command::Drink {
                player: args[0].to_string(),
                drink: args[1].to_string(),
                delta,
            })
        }
        "qty" => {
            arity(1)?;
            let delta = args[0]
                .parse()
                .map_err(|_| bad("quantity delta must be an integer"))?;
            Ok(Command::Quantity { delta })
        }
        "adjust" => {
            if args.len() < 2 {
                return Err(bad("`adjust` expects a player, an amount, and an optional reason"));
            }
            let amount = args[1]
                .parse()
                .map_err(|_| bad("adjustment amount must be a number"))?;
            Ok(Command::Adjust {
                player: args[0].to_string(),
                amount,
                reason: args[2..].join(" "),
            })
        }
        "paid" => {
            arity(1)?;
            Ok(Command::Paid {
                player: args[0].to_string(),
            })
        }
        "paidall" => Ok(Command::PaidAll),
        "save" => Ok(Command::Save),
        "reset" => Ok(Command::Reset),
        "clearhistory" => Ok(Command::ClearHistory),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(bad(format!("unknown command `{other}` (try `help`)"))),
    }
}

/// Slots accept the full key (`court-2-A-0`) or the shorthand `2-A-0`.
fn parse_slot(token: &str) -> Result<SlotId, ParseCommandError> {
    let canonical = if token.starts_with("court-") {
        token.to_string()
    } else {
        format!("court-{token}")
    };
    canonical
        .parse()
        .map_err(|_| bad(format!("invalid slot `{token}` (expected e.g. `2-A-0`)")))
}

fn parse_court(token: &str) -> Result<usize, ParseCommandError> {
    token
        .parse()
        .map_err(|_| bad(format!("invalid court index `{token}`")))
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

const HELP_TEXT: &str = "\
Lệnh:
  players                      danh sách người chơi và chi phí
  board                        sơ đồ sân
  bill | summary               hóa đơn từng người / tổng kết phiên
  history | stats              lịch sử đã lưu / thống kê hôm nay
  add <tên>                    thêm người chơi
  remove|rename|phone <người>  sửa danh sách (người = số thứ tự hoặc tên)
  import <file.csv>            nhập danh sách (cột name, phone)
  assign <người> <sân-đội-vị>  xếp vào ô, vd: assign 2 0-A-1
  unassign <sân-đội-vị>        bỏ khỏi ô
  auto                         tự xếp người chưa vào sân
  type <sân> <singles|doubles> đổi thể thức sân
  color <sân> <màu>            gắn màu cho sân
  end <sân> <A|B>              kết thúc trận, đội thua A/B
  drink <người> <mã> <±n>      cộng/trừ nước uống
  qty <±n>                     số lượng khách vãng lai
  adjust <người> <tiền> [lý do]  điều chỉnh chi phí
  paid <người> | paidall       đánh dấu đã trả
  save | reset | clearhistory  lưu phiên / làm mới / xóa lịch sử
  quit                         thoát";

/// The running application: live session state plus its persistence handles.
pub struct App {
    pub state: SessionState,
    db: Database,
    config: Config,
    court_colors: HashMap<usize, String>,
}

impl App {
    pub fn new(
        state: SessionState,
        db: Database,
        config: Config,
        court_colors: HashMap<usize, String>,
    ) -> Self {
        App {
            state,
            db,
            config,
            court_colors,
        }
    }

    /// Resolve a player token: 1-based list index, exact id, or
    /// case-insensitive name.
    fn resolve_player(&self, token: &str) -> Option<PlayerId> {
        if let Ok(index) = token.parse::<usize>() {
            if index >= 1 {
                if let Some(p) = self.state.players.get(index - 1) {
                    return Some(p.id.clone());
                }
            }
        }
        if let Some(p) = self.state.player(token) {
            return Some(p.id.clone());
        }
        let lowered = token.to_lowercase();
        self.state
            .players
            .iter()
            .find(|p| p.name.to_lowercase() == lowered)
            .map(|p| p.id.clone())
    }

    /// Persist the current roster; failures are logged, not fatal.
    fn persist_roster(&self, out: &mut Vec<String>) {
        if let Err(e) = self.db.save_roster(&self.state.roster_stubs()) {
            warn!("failed to persist roster: {e:#}");
            out.push("(cảnh báo: không lưu được danh sách vào cơ sở dữ liệu)".to_string());
        }
    }

    /// Execute one command, returning the lines to print. `Quit` is handled
    /// by the caller and never reaches here.
    pub fn handle(&mut self, cmd: Command) -> Vec<String> {
        let mut out = Vec::new();
        match cmd {
            Command::Quit => {}
            Command::Help => out.push(HELP_TEXT.to_string()),
            Command::Players | Command::Bill => self.render_players(&mut out),
            Command::Board => self.render_board(&mut out),
            Command::Summary => self.render_summary(&mut out),
            Command::History => self.render_history(&mut out),
            Command::Stats => self.render_stats(&mut out),

            Command::Add { name } => match self.state.add_player(&name) {
                Some(p) => {
                    out.push(format!("Đã thêm: {}", p.name));
                    self.persist_roster(&mut out);
                }
                None => out.push("Tên không được để trống.".to_string()),
            },
            Command::Remove { player } => match self.resolve_player(&player) {
                Some(id) => {
                    if self.state.remove_player(&id) {
                        out.push("Đã xóa người chơi.".to_string());
                        self.persist_roster(&mut out);
                    } else {
                        out.push("Không thể xóa khách vãng lai.".to_string());
                    }
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Rename { player, name } => match self.resolve_player(&player) {
                Some(id) => {
                    let phone = self
                        .state
                        .player(&id)
                        .map(|p| p.phone.clone())
                        .unwrap_or_default();
                    if self.state.update_player_info(&id, &name, &phone) {
                        out.push(format!("Đã đổi tên thành {name}."));
                        self.persist_roster(&mut out);
                    } else {
                        out.push("Không thể sửa khách vãng lai.".to_string());
                    }
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Phone { player, phone } => match self.resolve_player(&player) {
                Some(id) => {
                    let name = self
                        .state
                        .player(&id)
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    if self.state.update_player_info(&id, &name, &phone) {
                        out.push("Đã cập nhật số điện thoại.".to_string());
                        self.persist_roster(&mut out);
                    } else {
                        out.push("Không thể sửa khách vãng lai.".to_string());
                    }
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Import { path } => match import::read_roster_csv(&path) {
                Ok(entries) => {
                    let count = self.state.import_players(&entries);
                    out.push(format!("Đã nhập {count} người chơi. Phiên được làm mới."));
                    self.persist_roster(&mut out);
                }
                Err(e) => out.push(format!("Lỗi nhập file: {e}")),
            },

            Command::Assign { player, slot } => match self.resolve_player(&player) {
                Some(id) => {
                    let is_guest = self
                        .state
                        .player(&id)
                        .map(|p| p.is_guest)
                        .unwrap_or(false);
                    if is_guest {
                        out.push("Khách vãng lai không vào sân.".to_string());
                    } else if slot.court >= self.state.board.num_courts()
                        || slot.position >= self.state.board.game_type(slot.court).positions_per_team()
                    {
                        out.push(format!("Ô {slot} không tồn tại."));
                    } else {
                        let displaced = self.state.assign(&id, slot);
                        let name = self
                            .state
                            .player(&id)
                            .map(|p| p.name.clone())
                            .unwrap_or_default();
                        out.push(format!("Đã xếp {name} vào {slot}."));
                        if let Some(old_id) = displaced {
                            if let Some(old) = self.state.player(&old_id) {
                                out.push(format!("{} rời ô này.", old.name));
                            }
                        }
                    }
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Unassign { slot } => match self.state.unassign(slot) {
                Some(id) => {
                    let name = self
                        .state
                        .player(&id)
                        .map(|p| p.name.clone())
                        .unwrap_or(id);
                    out.push(format!("{name} rời {slot}."));
                }
                None => out.push(format!("Ô {slot} đang trống.")),
            },
            Command::Auto => match self.state.auto_assign() {
                AutoAssignOutcome::Assigned { count } => {
                    out.push(format!("Đã tự xếp {count} người vào sân."));
                }
                AutoAssignOutcome::NothingToAssign => {
                    out.push("Không còn ai để xếp.".to_string());
                }
            },
            Command::SetType { court, game_type } => {
                if court >= self.state.board.num_courts() {
                    out.push(format!("Sân {court} không tồn tại."));
                } else {
                    self.state.set_game_type(court, game_type);
                    out.push(format!("Sân {court}: {game_type}."));
                }
            }
            Command::Color { court, color } => {
                if court >= self.state.board.num_courts() {
                    out.push(format!("Sân {court} không tồn tại."));
                } else {
                    self.court_colors.insert(court, color.clone());
                    if let Err(e) = self.db.set_court_color(court, &color) {
                        warn!("failed to persist court color: {e:#}");
                        out.push("(cảnh báo: không lưu được màu sân)".to_string());
                    }
                    out.push(format!("Sân {court} có màu {color}."));
                }
            }
            Command::End { court, losing_team } => {
                if court >= self.state.board.num_courts() {
                    out.push(format!("Sân {court} không tồn tại."));
                } else {
                    match self.state.end_match(court, losing_team) {
                        Some(result) => {
                            info!(
                                match_number = result.match_number,
                                court, "match settled"
                            );
                            out.push(format!(
                                "Trận {} kết thúc! Đội thua: {}.",
                                result.match_number,
                                result.loser_names.join(" & ")
                            ));
                            out.push(format!(
                                "Mỗi người thua trả {} tiền cầu.",
                                format_vnd(result.fee_per_loser)
                            ));
                        }
                        None => out.push("Đội thua không có ai trên sân.".to_string()),
                    }
                }
            }

            Command::Drink {
                player,
                drink,
                delta,
            } => match self.resolve_player(&player) {
                Some(id) => {
                    if !self.state.menu().iter().any(|d| d.id == drink) {
                        let ids: Vec<&str> =
                            self.state.menu().iter().map(|d| d.id.as_str()).collect();
                        out.push(format!(
                            "Không có nước `{drink}`. Thực đơn: {}.",
                            ids.join(", ")
                        ));
                    } else {
                        self.state.update_drink(&id, &drink, delta);
                        out.push("Đã cập nhật nước uống.".to_string());
                    }
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Quantity { delta } => {
                let guest_id = crate::session::state::GUEST_PLAYER_ID.to_string();
                self.state.update_quantity(&guest_id, delta);
                let qty = self
                    .state
                    .player(&guest_id)
                    .map(|p| p.quantity)
                    .unwrap_or(1);
                out.push(format!("Khách vãng lai: {qty} người."));
            }
            Command::Adjust {
                player,
                amount,
                reason,
            } => match self.resolve_player(&player) {
                Some(id) => {
                    self.state.set_adjustment(&id, amount, &reason);
                    out.push(format!("Đã điều chỉnh {}.", format_vnd(amount)));
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::Paid { player } => match self.resolve_player(&player) {
                Some(id) => {
                    self.state.toggle_paid(&id);
                    let paid = self
                        .state
                        .player(&id)
                        .map(|p| p.is_paid)
                        .unwrap_or(false);
                    out.push(if paid {
                        "Đã trả.".to_string()
                    } else {
                        "Chưa trả.".to_string()
                    });
                }
                None => out.push(format!("Không tìm thấy người chơi `{player}`.")),
            },
            Command::PaidAll => {
                self.state.mark_all_paid();
                out.push("Tất cả đã trả.".to_string());
            }

            Command::Save => {
                let record = self.state.save_session(chrono::Utc::now());
                let total = record.summary.grand_total;
                match self.db.save_session(&record) {
                    Ok(()) => {
                        info!(session_id = %record.id, "session saved");
                        out.push(format!(
                            "Đã lưu phiên chơi! Tổng cộng: {}.",
                            format_vnd(total)
                        ));
                    }
                    Err(e) => {
                        warn!("failed to persist session: {e:#}");
                        out.push("(cảnh báo: không lưu được phiên vào cơ sở dữ liệu)".to_string());
                    }
                }
            }
            Command::Reset => {
                self.state.reset_session();
                out.push("Đã làm mới phiên chơi!".to_string());
            }
            Command::ClearHistory => match self.db.clear_history() {
                Ok(()) => out.push("Đã xóa lịch sử.".to_string()),
                Err(e) => {
                    warn!("failed to clear history: {e:#}");
                    out.push("(cảnh báo: không xóa được lịch sử)".to_string());
                }
            },
        }
        out
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn render_players(&self, out: &mut Vec<String>) {
        let details = self.state.details();
        for (i, d) in details.iter().enumerate() {
            let slot = self
                .state
                .board
                .slot_of(&d.player.id)
                .map(|s| format!(" @ {s}"))
                .unwrap_or_default();
            let paid = if d.player.is_paid { " [đã trả]" } else { "" };
            let qty = if d.player.is_guest {
                format!(" x{}", d.player.quantity)
            } else {
                String::new()
            };
            out.push(format!(
                "{:>2}. {}{}{} — thua {}, cầu {}, nước {}, tổng {}{}",
                i + 1,
                d.player.name,
                qty,
                slot,
                d.losses,
                format_vnd(d.shuttlecock_cost),
                format_vnd(d.drinks_cost),
                format_vnd(d.total_cost),
                paid,
            ));
        }
    }

    fn render_board(&self, out: &mut Vec<String>) {
        for court in 0..self.state.board.num_courts() {
            let game_type = self.state.board.game_type(court);
            let color = self
                .court_colors
                .get(&court)
                .map(|c| format!(" [{c}]"))
                .unwrap_or_default();
            out.push(format!("Sân {court}{color} ({game_type}):"));
            for slot in court_slots(court, game_type) {
                let name = self
                    .state
                    .board
                    .occupant(slot)
                    .and_then(|id| self.state.player(id))
                    .map(|p| p.name.as_str())
                    .unwrap_or("(trống)");
                out.push(format!("  {slot}: {name}"));
            }
        }
    }

    fn render_summary(&self, out: &mut Vec<String>) {
        let summary = self.state.summary();
        out.push(format!(
            "Số người: {} | Số trận: {}",
            self.state.head_count(),
            self.state.ledgers.matches_played
        ));
        out.push(format!("Tiền sân:  {}", format_vnd(summary.total_court_fee)));
        out.push(format!("Tiền cầu:  {}", format_vnd(summary.total_shuttlecock_cost)));
        out.push(format!("Tiền nước: {}", format_vnd(summary.total_drinks_cost)));
        out.push(format!("Tổng cộng: {}", format_vnd(summary.grand_total)));
        out.push(format!("Đã thu:    {}", format_vnd(self.state.total_paid())));
    }

    fn render_history(&self, out: &mut Vec<String>) {
        match self.db.load_sessions() {
            Ok(sessions) if sessions.is_empty() => {
                out.push("Chưa có phiên nào được lưu.".to_string());
            }
            Ok(sessions) => {
                for group in group_by_day(sessions, &chrono::Local) {
                    out.push(format!(
                        "{} — {} phiên, doanh thu {}",
                        format_day(group.day),
                        group.sessions.len(),
                        format_vnd(group.revenue)
                    ));
                    for s in &group.sessions {
                        out.push(format!(
                            "  {} | {} người | {}",
                            format_timestamp(s.date),
                            s.players.len(),
                            format_vnd(s.summary.grand_total)
                        ));
                    }
                }
            }
            Err(e) => {
                warn!("failed to load history: {e:#}");
                out.push("(cảnh báo: không đọc được lịch sử)".to_string());
            }
        }
    }

    fn render_stats(&self, out: &mut Vec<String>) {
        match self.db.load_sessions() {
            Ok(sessions) => {
                let names: Vec<String> =
                    self.state.players.iter().map(|p| p.name.clone()).collect();
                let stats = daily_stats(
                    &sessions,
                    &names,
                    self.state.summary().grand_total,
                    chrono::Local::now().date_naive(),
                    &chrono::Local,
                );
                out.push(format!("Phiên đã lưu hôm nay: {}", stats.sessions_saved));
                out.push(format!("Doanh thu đã lưu: {}", format_vnd(stats.saved_revenue)));
                out.push(format!(
                    "Doanh thu cả ngày (gồm phiên hiện tại): {}",
                    format_vnd(stats.total_revenue)
                ));
                out.push(format!("Số người chơi trong ngày: {}", stats.unique_players));
            }
            Err(e) => {
                warn!("failed to load history for stats: {e:#}");
                out.push("(cảnh báo: không đọc được lịch sử)".to_string());
            }
        }
    }

    /// Configured venue parameters, echoed at startup.
    pub fn banner(&self) -> String {
        format!(
            "shuttlebill — {} sân | tiền sân {}/người | tiền cầu {}/trận. Gõ `help` để xem lệnh.",
            self.config.venue.num_courts,
            format_vnd(self.config.venue.court_fee),
            format_vnd(self.config.venue.shuttlecock_fee_per_match),
        )
    }
}

/// Run the interactive loop until `quit` or end of input.
pub fn run(mut app: App) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    writeln!(stdout, "{}", app.banner())?;
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => {
                for msg in app.handle(cmd) {
                    writeln!(stdout, "{msg}")?;
                }
            }
            Err(e) => writeln!(stdout, "{e}")?,
        }
    }

    info!("interactive loop finished");
    Ok(())
}
