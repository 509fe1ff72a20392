//! Plain-text rendering of fetched records.

use chrono::{DateTime, TimeZone, Utc};
use gamedata_core::{EnkaAccount, EnkaBuild, EnkaData, Notice};

/// Widest title shown in notice listings
const TITLE_WIDTH: usize = 60;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%b %d, %Y %H:%M").to_string()
}

pub fn showcase(data: &EnkaData, now: DateTime<Utc>) -> String {
    let player = &data.player;
    let mut out = format!("{} (UID {})\n", player.nickname, data.uid);
    out.push_str(&format!("  Adventure Rank {}", player.level));
    if let Some(world_level) = player.world_level {
        out.push_str(&format!(", World Level {}", world_level));
    }
    out.push('\n');
    if let Some(ref signature) = player.signature {
        out.push_str(&format!("  \"{}\"\n", signature));
    }
    if let (Some(floor), Some(chamber)) = (player.abyss_floor, player.abyss_chamber) {
        out.push_str(&format!("  Spiral Abyss {}-{}\n", floor, chamber));
    }

    if data.characters.is_empty() {
        out.push_str("  No character details shown\n");
    } else {
        out.push_str("  Characters:\n");
        for character in &data.characters {
            out.push_str(&format!(
                "    {:<10} Lv.{:<3} C{}\n",
                character.avatar_id, character.level, character.constellation
            ));
        }
    }

    let wait = (data.next_showcase_at - now).num_seconds().max(0);
    out.push_str(&format!("  Next refresh in {}s\n", wait));
    out
}

pub fn accounts(accounts: &[EnkaAccount]) -> String {
    if accounts.is_empty() {
        return "No linked accounts\n".to_string();
    }
    let mut out = String::new();
    for account in accounts {
        let name = account
            .player
            .as_ref()
            .map(|p| p.nickname.as_str())
            .unwrap_or("-");
        let uid = match account.uid {
            Some(uid) if account.uid_public => uid.to_string(),
            _ => "hidden".to_string(),
        };
        let verified = if account.verified { " [verified]" } else { "" };
        out.push_str(&format!("{:<12} {:<20} UID {}{}\n", account.hash, name, uid, verified));
    }
    out
}

pub fn builds(builds: &[EnkaBuild]) -> String {
    if builds.is_empty() {
        return "No saved builds\n".to_string();
    }
    let mut out = String::new();
    for build in builds {
        let live = if build.live { " (live)" } else { "" };
        let name = if build.name.is_empty() { "-" } else { build.name.as_str() };
        out.push_str(&format!(
            "{:<10} {}{}\n",
            build.avatar_id,
            truncate_string(name, TITLE_WIDTH),
            live
        ));
    }
    out
}

pub fn notice_line(notice: &Notice) -> String {
    format!(
        "{:<8} [{}] {} (until {})",
        notice.id,
        notice.type_label,
        truncate_string(&notice.title, TITLE_WIDTH),
        format_date(&notice.end_time)
    )
}
