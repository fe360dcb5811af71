// Saved sessions and the statistics derived from them.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::billing::{PlayerDetails, SessionSummary};
use super::slot::GameType;

/// A frozen, saved session. Player bills are snapshots taken at save time;
/// they do not track later roster edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub game_type: GameType,
    pub players: Vec<PlayerDetails>,
    pub summary: SessionSummary,
}

/// All sessions saved on one calendar day, newest first within the day.
#[derive(Debug, Clone)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub sessions: Vec<SessionRecord>,
    pub revenue: f64,
}

/// Group saved sessions by calendar day in `tz`, newest day first. Dates are
/// stored in UTC; the day boundary is the venue's wall clock, so an evening
/// session saved after midnight UTC still lands on the local day it was
/// played. Input order does not matter; output is fully sorted.
pub fn group_by_day<Tz: TimeZone>(mut sessions: Vec<SessionRecord>, tz: &Tz) -> Vec<DayGroup> {
    sessions.sort_by(|a, b| b.date.cmp(&a.date));

    let mut groups: Vec<DayGroup> = Vec::new();
    for session in sessions {
        let day = session.date.with_timezone(tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.day == day => {
                group.revenue += session.summary.grand_total;
                group.sessions.push(session);
            }
            _ => groups.push(DayGroup {
                day,
                revenue: session.summary.grand_total,
                sessions: vec![session],
            }),
        }
    }
    groups
}

/// Today's headline numbers: what has been banked, what the day is worth
/// with the live session included, and how many distinct people showed up.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    /// Sum of grand totals over sessions already saved today.
    pub saved_revenue: f64,
    /// Saved revenue plus the live session's grand total.
    pub total_revenue: f64,
    /// Distinct player names seen today (saved sessions plus the live
    /// roster, the guest row included).
    pub unique_players: usize,
    /// Sessions saved today.
    pub sessions_saved: usize,
}

/// Compute today's stats from the saved history plus the live session.
/// `today` is the current calendar day in `tz`; saved sessions count when
/// their date falls on that day in the same zone.
pub fn daily_stats<Tz: TimeZone>(
    sessions: &[SessionRecord],
    current_player_names: &[String],
    current_grand_total: f64,
    today: NaiveDate,
    tz: &Tz,
) -> DailyStats {
    let todays: Vec<&SessionRecord> = sessions
        .iter()
        .filter(|s| s.date.with_timezone(tz).date_naive() == today)
        .collect();

    let saved_revenue: f64 = todays.iter().map(|s| s.summary.grand_total).sum();

    let mut seen: Vec<&str> = todays
        .iter()
        .flat_map(|s| s.players.iter().map(|d| d.player.name.as_str()))
        .chain(current_player_names.iter().map(String::as_str))
        .collect();
    seen.sort_unstable();
    seen.dedup();

    DailyStats {
        saved_revenue,
        total_revenue: saved_revenue + current_grand_total,
        unique_players: seen.len(),
        sessions_saved: todays.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn record(id: &str, date: DateTime<Utc>, grand_total: f64) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            date,
            game_type: GameType::Doubles,
            players: vec![],
            summary: SessionSummary {
                total_court_fee: grand_total,
                total_drinks_cost: 0.0,
                total_shuttlecock_cost: 0.0,
                grand_total,
            },
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    /// Indochina time, the venue's zone in the fixture data.
    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn groups_by_day_newest_first() {
        let sessions = vec![
            record("a", at(2026, 8, 20, 9), 100.0),
            record("b", at(2026, 8, 22, 9), 200.0),
            record("c", at(2026, 8, 22, 12), 300.0),
        ];
        let groups = group_by_day(sessions, &Utc);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].day, NaiveDate::from_ymd_opt(2026, 8, 22).unwrap());
        assert_eq!(groups[0].revenue, 500.0);
        // Within the day, newest session first.
        assert_eq!(groups[0].sessions[0].id, "c");
        assert_eq!(groups[0].sessions[1].id, "b");
        assert_eq!(groups[1].revenue, 100.0);
    }

    #[test]
    fn grouping_uses_the_venue_day_not_the_utc_day() {
        // 22:00 UTC on Aug 22 is 05:00 Aug 23 in UTC+7: both sessions belong
        // to the venue's Aug 23 even though their UTC days differ.
        let sessions = vec![
            record("late", at(2026, 8, 22, 22), 100.0),
            record("noon", at(2026, 8, 23, 5), 200.0),
        ];
        let groups = group_by_day(sessions, &ict());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].day, NaiveDate::from_ymd_opt(2026, 8, 23).unwrap());
        assert_eq!(groups[0].revenue, 300.0);
    }

    #[test]
    fn empty_history_yields_no_groups() {
        assert!(group_by_day(vec![], &Utc).is_empty());
    }

    #[test]
    fn daily_stats_ignore_other_days() {
        let sessions = vec![
            record("a", at(2026, 8, 23, 9), 100.0),
            record("b", at(2026, 8, 22, 9), 999.0),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let stats = daily_stats(&sessions, &[], 50.0, today, &Utc);

        assert_eq!(stats.saved_revenue, 100.0);
        assert_eq!(stats.total_revenue, 150.0);
        assert_eq!(stats.sessions_saved, 1);
    }

    #[test]
    fn daily_stats_count_the_local_morning_session() {
        // Saved at 05:00 local on Aug 23 (22:00 UTC Aug 22): today's stats in
        // UTC+7 must include it, not yesterday's.
        let sessions = vec![record("dawn", at(2026, 8, 22, 22), 100.0)];
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();

        let stats = daily_stats(&sessions, &[], 0.0, today, &ict());
        assert_eq!(stats.sessions_saved, 1);
        assert_eq!(stats.saved_revenue, 100.0);

        let yesterday = NaiveDate::from_ymd_opt(2026, 8, 22).unwrap();
        let stats = daily_stats(&sessions, &[], 0.0, yesterday, &ict());
        assert_eq!(stats.sessions_saved, 0);
    }

    #[test]
    fn unique_players_dedup_names_across_saved_and_live() {
        use crate::config::Config;
        use crate::session::settlement::Ledgers;
        use crate::session::state::{Player, GUEST_PLAYER_NAME};

        let mut saved = record("a", at(2026, 8, 23, 9), 0.0);
        saved.players = crate::session::billing::derive_details(
            &[Player::guest(), Player::new_regular("An", "")],
            &Ledgers::default(),
            &Config::default().drinks,
            15000.0,
        );

        // Live roster repeats An (under a fresh id) and adds one new player.
        let live = vec![
            GUEST_PLAYER_NAME.to_string(),
            "An".to_string(),
            "Bình".to_string(),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let stats = daily_stats(&[saved], &live, 0.0, today, &Utc);

        // Khách vãng lai, An, Bình.
        assert_eq!(stats.unique_players, 3);
    }
}
