//! License usage summary.
//!
//! A seat counts as used when the member is active and holds a `full`
//! license. Used seats whose last activity is older than the inactivity
//! window, or missing, are candidates for reclaiming.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use miro_client::Member;

#[derive(Debug, Clone, PartialEq)]
pub struct LicenseReport {
    pub total_members: usize,
    pub used: usize,
    pub total_licenses: u32,
    pub inactive_days: i64,
    /// Full-license members idle longer than `inactive_days`
    pub reclaimable: Vec<Member>,
}

impl LicenseReport {
    pub fn from_members(
        members: &[Member],
        total_licenses: u32,
        inactive_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let cutoff = TimeDelta::try_days(inactive_days.max(0))
            .and_then(|window| now.checked_sub_signed(window))
            .with_context(|| {
                format!("Inactivity window of {} days is out of range", inactive_days)
            })?;

        let licensed: Vec<&Member> = members.iter().filter(|m| m.holds_full_license()).collect();
        let reclaimable = licensed
            .iter()
            .filter(|m| is_idle(m, cutoff))
            .map(|m| (*m).clone())
            .collect();

        Ok(Self {
            total_members: members.len(),
            used: licensed.len(),
            total_licenses,
            inactive_days,
            reclaimable,
        })
    }

    /// Seats left; negative when over allocation.
    pub fn available(&self) -> i64 {
        self.total_licenses as i64 - self.used as i64
    }

    pub fn overage(&self) -> Option<usize> {
        let available = self.available();
        (available < 0).then(|| available.unsigned_abs() as usize)
    }

    /// Slack-formatted summary; switches to an alert when over allocation.
    pub fn to_message(&self) -> String {
        let mut lines = Vec::new();
        match self.overage() {
            Some(overage) => {
                lines.push(":rotating_light: *Miro License Alert* :rotating_light:".to_string());
                lines.push(format!("Used Licenses: {}", self.used));
                lines.push(format!("Total Licenses: {}", self.total_licenses));
                lines.push(format!("Overage: {}", overage));
            }
            None => {
                lines.push("*Miro License Report*".to_string());
                lines.push(format!("Used Licenses: {}", self.used));
                lines.push(format!("Total Licenses: {}", self.total_licenses));
                lines.push(format!("Available Licenses: {}", self.available()));
            }
        }
        lines.push(format!(
            "Inactive Full Licenses (>{} days): {}",
            self.inactive_days,
            self.reclaimable.len()
        ));
        if self.overage().is_some() {
            lines.push("*Immediate action required to resolve the overage.*".to_string());
        } else {
            lines.push("*All licenses are within the allocated limit.*".to_string());
        }
        lines.join("\n")
    }
}

/// Idle when last active before `cutoff`, or never active. An unparseable
/// timestamp also counts as idle, but is logged.
fn is_idle(member: &Member, cutoff: DateTime<Utc>) -> bool {
    match (member.last_activity(), member.last_activity_at.as_deref()) {
        (Some(at), _) => at < cutoff,
        (None, Some(raw)) => {
            tracing::warn!(
                id = %member.id,
                last_activity_at = raw,
                "Unparseable lastActivityAt; counting seat as idle"
            );
            true
        }
        (None, None) => true,
    }
}
