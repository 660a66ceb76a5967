//! Notification message rendering (Telegram HTML).

use kursmon_common::{CanonicalRate, CurrencyPair};

use crate::alert::{Alert, AlertLevel};

/// Header of the warnings section.
pub const WARNINGS_HEADER: &str = "WARNINGS";
/// Header of the critical section.
pub const CRITICAL_HEADER: &str = "CRITICAL CHANGES";

const SEPARATOR: &str = "━━━━━━━━";

/// Renders a rate and its alerts into one message.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFormatter;

impl AlertFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Current rates for both pairs, then warnings, then critical alerts.
    /// Empty sections are omitted.
    pub fn format(&self, rate: &CanonicalRate, alerts: &[Alert]) -> String {
        let mut out = String::from("💱 <b>Exchange rates on kurs.kz</b>\n");

        for pair in CurrencyPair::ALL {
            let quote = rate.quote(pair);
            out.push('\n');
            out.push_str(&format!("{} <b>{}</b>\n", pair.emoji(), pair.display_name()));
            out.push_str(&format!("💵 Buy: <code>{:.2}</code> ₸\n", quote.sell));
            out.push_str(&format!("💸 Sell: <code>{:.2}</code> ₸\n", quote.buy));
        }

        self.push_section(&mut out, "⚠️", WARNINGS_HEADER, AlertLevel::Warning, alerts);
        self.push_section(&mut out, "🚨", CRITICAL_HEADER, AlertLevel::Critical, alerts);

        out
    }

    fn push_section(
        &self,
        out: &mut String,
        icon: &str,
        header: &str,
        level: AlertLevel,
        alerts: &[Alert],
    ) {
        let mut section = alerts.iter().filter(|a| a.level == level).peekable();
        if section.peek().is_none() {
            return;
        }

        out.push('\n');
        out.push_str(SEPARATOR);
        out.push('\n');
        out.push_str(&format!("{icon} <b>{header}</b>\n\n"));

        for alert in section {
            out.push_str(&format_alert(alert));
        }
    }
}

fn format_alert(alert: &Alert) -> String {
    format!(
        "{} {} <b>{}</b> {} <code>{:.2}%</code> over the last {}\n   <code>{:.2}</code> ₸ → <code>{:.2}</code> ₸\n\n",
        alert.direction.emoji(),
        alert.pair.emoji(),
        alert.pair.display_name(),
        alert.direction.verb(),
        alert.change_percent.abs(),
        alert.window.label(),
        alert.old_rate,
        alert.new_rate,
    )
}
