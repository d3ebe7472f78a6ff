//! Derives the circuit and dashboard tables from raw device payloads.

use crate::models::{MtuType, SpyderData, SystemOverview, SystemSettings, MTU_SLOTS};

/// Divisor from milli-units (W, Wh) to kW / kWh.
const MILLI: i64 = 1000;
/// Divisor from cents to currency units.
const CENTS: i64 = 100;

/// One spyder group, formatted for display. The `raw_*` fields keep the
/// device integers for sorting and zero filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitRow {
    pub label: String,
    pub present_power: String,
    pub today_energy: String,
    pub month_energy: String,
    pub present_cost: String,
    pub today_cost: String,
    pub month_cost: String,
    pub raw_present_power: i64,
    pub raw_today_energy: i64,
    pub raw_month_energy: i64,
}

impl CircuitRow {
    /// A group with no present draw and no usage today has nothing to show.
    pub fn is_idle(&self) -> bool {
        self.raw_present_power == 0 && self.raw_today_energy == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub glyph: &'static str,
    pub label: String,
    pub present_power: String,
    pub present_cost: String,
    pub raw_present_cost: i64,
}

/// Build one row per configured spyder group, in device order.
///
/// Groups the usage payloads do not cover are skipped; a missing cost
/// entry renders as zero.
pub fn compute_circuit_rows(
    settings: &SystemSettings,
    power: &SpyderData,
    cost: &SpyderData,
    currency: &str,
) -> Vec<CircuitRow> {
    let mut rows = Vec::new();

    for (s, spyder) in settings.spyders.spyder.iter().enumerate() {
        for (g, group) in spyder.groups.iter().enumerate() {
            let Some(usage) = power.group(s, g) else {
                continue;
            };
            let money = cost.group(s, g).copied().unwrap_or_default();

            rows.push(CircuitRow {
                label: group.description.clone(),
                present_power: format_scaled(usage.now, MILLI, 3),
                today_energy: format_scaled(usage.today, MILLI, 1),
                month_energy: format_scaled(usage.month_to_date, MILLI, 1),
                present_cost: format_currency(money.now, currency),
                today_cost: format_currency(money.today, currency),
                month_cost: format_currency(money.month_to_date, currency),
                raw_present_power: usage.now,
                raw_today_energy: usage.today,
                raw_month_energy: usage.month_to_date,
            });
        }
    }

    rows
}

/// Build one row per configured MTU slot that reports an identifier.
///
/// Generation MTUs read negative while producing; their sign is flipped so
/// output shows as a positive value.
pub fn compute_dashboard_rows(
    settings: &SystemSettings,
    power: &SystemOverview,
    cost: &SystemOverview,
    currency: &str,
) -> Vec<DashboardRow> {
    let slots = settings.mtu_count.min(MTU_SLOTS);
    let mut rows = Vec::with_capacity(slots);

    for slot in 0..slots {
        let Some(mtu) = settings.mtu(slot).filter(|m| m.is_present()) else {
            continue;
        };
        let mtu_type = settings.mtu_type(slot).unwrap_or_default();
        let sign = if mtu_type == MtuType::Generation { -1 } else { 1 };
        let watts = power.mtu(slot).map(|u| u.value).unwrap_or_default() * sign;
        let cents = cost.mtu(slot).map(|u| u.value).unwrap_or_default();

        rows.push(DashboardRow {
            glyph: mtu_type.glyph(),
            label: mtu.description.clone(),
            present_power: format_scaled(watts, MILLI, 3),
            present_cost: format_currency(cents * sign, currency),
            raw_present_cost: cents,
        });
    }

    rows
}

/// Format `raw / divisor` with `decimals` places and thousands separators,
/// rounding half away from zero.
pub fn format_scaled(raw: i64, divisor: i64, decimals: u32) -> String {
    let negative = raw < 0;
    let magnitude = i128::from(raw).abs();
    let scale = 10i128.pow(decimals);
    let divisor = i128::from(divisor);

    let scaled = (magnitude * scale * 2 + divisor) / (divisor * 2);
    let whole = scaled / scale;
    let frac = scaled % scale;

    let mut out = String::new();
    if negative && scaled != 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if decimals > 0 {
        out.push('.');
        out.push_str(&format!("{:0width$}", frac, width = decimals as usize));
    }
    out
}

/// Format cents as currency, e.g. `$1,234.50` or `-$0.12`.
pub fn format_currency(cents: i64, symbol: &str) -> String {
    let amount = format_scaled(cents, CENTS, 2);
    match amount.strip_prefix('-') {
        Some(positive) => format!("-{}{}", symbol, positive),
        None => format!("{}{}", symbol, amount),
    }
}

fn group_thousands(value: i128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
