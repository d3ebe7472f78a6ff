//! Macro rendering: turns a [`Snapshot`] into self-contained HTML fragments.
//!
//! Sorted views are projections over the snapshot's immutable row slices;
//! the shared tables are never reordered in place.

use crate::aggregate::{format_scaled, CircuitRow, DashboardRow};
use crate::snapshot::Snapshot;
use std::cmp::Ordering;

const MILLI: i64 = 1000;

/// The catalogue of named outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    SpyderHighToLow,
    SpyderAlphabetical,
    SolarNow,
    Dashboard,
    Summary,
}

impl MacroKind {
    pub const ALL: [MacroKind; 5] = [
        MacroKind::SpyderHighToLow,
        MacroKind::SpyderAlphabetical,
        MacroKind::SolarNow,
        MacroKind::Dashboard,
        MacroKind::Summary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MacroKind::SpyderHighToLow => "spyder-htol",
            MacroKind::SpyderAlphabetical => "spyder-atoz",
            MacroKind::SolarNow => "solar-now",
            MacroKind::Dashboard => "dashboard",
            MacroKind::Summary => "summary",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MacroKind::SpyderHighToLow => {
                "Present and today values for all spyder groups, highest present value first. \
                 Groups with no present or today usage are left out."
            }
            MacroKind::SpyderAlphabetical => {
                "Present and today values for all spyder groups, sorted by group name. \
                 Groups with no present or today usage are left out."
            }
            MacroKind::SolarNow => {
                "Gauge of the generation MTU's present output. Requires solar_max_watts."
            }
            MacroKind::Dashboard => "Energy overview of every MTU in the system.",
            MacroKind::Summary => {
                "Energy summary with present, today, this month and projected values from the ECC."
            }
        }
    }

    /// Look up a macro by name, ignoring case.
    pub fn parse(name: &str) -> Option<MacroKind> {
        MacroKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// Fraction of the visible circuit rows after which fading starts
    pub fade_point: Option<f64>,
    /// Peak generation output in watts
    pub solar_max_watts: Option<i64>,
}

/// Where fading starts within a list of visible rows and over how many rows
/// the opacity falls off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePlan {
    pub start: f64,
    pub steps: f64,
}

impl FadePlan {
    /// `None` when there is nothing to fade.
    pub fn new(row_count: usize, fade_point: f64) -> Option<FadePlan> {
        if row_count == 0 {
            return None;
        }
        let row_count = row_count as f64;
        let start = row_count * fade_point.clamp(0.0, 1.0);
        Some(FadePlan {
            start,
            steps: row_count - start,
        })
    }

    /// Opacity of the row at `position`; `None` for fully opaque rows.
    pub fn opacity(&self, position: usize) -> Option<f64> {
        let position = position as f64;
        if position < self.start || self.steps <= 0.0 {
            return None;
        }
        Some(1.0 - (position - self.start) / self.steps)
    }
}

/// Needle rotation for a semicircular gauge. Values above `max` are not
/// clamped and rotate past 180 degrees.
pub fn gauge_angle(value: f64, max: f64) -> f64 {
    180.0 * value / max
}

pub struct MacroRenderer {
    options: RenderOptions,
}

impl MacroRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `name` against `snapshot`. Unknown names come back unchanged;
    /// an empty string means there was nothing to render.
    pub fn render(&self, name: &str, snapshot: &Snapshot) -> String {
        match MacroKind::parse(name) {
            Some(kind) => self.render_kind(kind, snapshot),
            None => name.to_string(),
        }
    }

    pub fn render_kind(&self, kind: MacroKind, snapshot: &Snapshot) -> String {
        match kind {
            MacroKind::SpyderHighToLow | MacroKind::SpyderAlphabetical => {
                if snapshot.settings.is_none() {
                    return String::new();
                }
                let rows = match kind {
                    MacroKind::SpyderHighToLow => spyder_high_to_low(&snapshot.circuit_rows),
                    _ => spyder_alphabetical(&snapshot.circuit_rows),
                };
                self.spyder_table(&rows)
            }
            MacroKind::Dashboard => {
                if snapshot.settings.is_none() {
                    return String::new();
                }
                dashboard_table(&dashboard_sorted(&snapshot.dashboard_rows))
            }
            MacroKind::Summary => summary(snapshot),
            MacroKind::SolarNow => self.solar_now(snapshot),
        }
    }

    fn spyder_table(&self, rows: &[&CircuitRow]) -> String {
        let fade = self
            .options
            .fade_point
            .and_then(|point| FadePlan::new(rows.len(), point));

        let mut out = String::from(
            "<div><header class=\"header\">Energy Consumers</header><table class=\"small\">\
             <thead class=\"ted-spyder-table-head\"><tr><th class=\"ted-spyder-description\"></th>\
             <th class=\"align-right ted-present thin\">Present</th>\
             <th class=\"align-right ted-today thin\">Today</th></tr></thead>\
             <tbody class=\"ted-spyder-table-body\">",
        );
        for (position, row) in rows.iter().enumerate() {
            let style = fade
                .and_then(|plan| plan.opacity(position))
                .map(|opacity| format!(" style=\"opacity: {:.3}\"", opacity))
                .unwrap_or_default();
            out.push_str(&format!(
                "<tr{}><td class=\"ted-spyder-description\">{}</td>\
                 <td class=\"align-right ted-present bright\">{} <span class=\"normal ted-unit\">kW</span></td>\
                 <td class=\"align-right ted-today\">{} <span class=\"normal ted-unit\">kWh</span></td></tr>",
                style,
                escape_html(&row.label),
                row.present_power,
                row.today_energy,
            ));
        }
        out.push_str("</tbody></table></div>");
        out
    }

    fn solar_now(&self, snapshot: &Snapshot) -> String {
        let Some(max) = self.options.solar_max_watts.filter(|m| *m > 0) else {
            tracing::debug!("solar-now needs solar_max_watts to be configured");
            return String::new();
        };
        let (Some(settings), Some(overview)) = (&snapshot.settings, &snapshot.overview) else {
            return String::new();
        };
        let Some(slot) = settings.generation_slot() else {
            return String::new();
        };
        let Some(usage) = overview.power.mtu(slot) else {
            return String::new();
        };

        let output = (-usage.value).max(0);
        gauge("Current solar production", output, max)
    }
}

/// Visible circuit rows by present power, then today's energy, both descending.
pub fn spyder_high_to_low(rows: &[CircuitRow]) -> Vec<&CircuitRow> {
    project(rows, |a, b| {
        b.raw_present_power
            .cmp(&a.raw_present_power)
            .then_with(|| b.raw_today_energy.cmp(&a.raw_today_energy))
    })
}

/// Visible circuit rows by label, case-insensitively.
pub fn spyder_alphabetical(rows: &[CircuitRow]) -> Vec<&CircuitRow> {
    project(rows, |a, b| compare_labels(&a.label, &b.label))
}

pub fn dashboard_sorted(rows: &[DashboardRow]) -> Vec<&DashboardRow> {
    let mut sorted: Vec<&DashboardRow> = rows.iter().collect();
    sorted.sort_by(|a, b| compare_labels(&a.label, &b.label));
    sorted
}

fn project<F>(rows: &[CircuitRow], compare: F) -> Vec<&CircuitRow>
where
    F: Fn(&CircuitRow, &CircuitRow) -> Ordering,
{
    let mut visible: Vec<&CircuitRow> = rows.iter().filter(|r| !r.is_idle()).collect();
    visible.sort_by(|a, b| compare(a, b));
    visible
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn dashboard_table(rows: &[&DashboardRow]) -> String {
    let mut out = String::from(
        "<div><header class=\"header\">Energy Overview</header><table class=\"small\">\
         <thead class=\"ted-dashboard-table-head\"><tr><th class=\"ted-overview-description\"></th>\
         <th class=\"ted-overview-description\"></th>\
         <th class=\"align-right ted-present thin\">kW</th>\
         <th class=\"align-right ted-today thin\">Cost</th></tr></thead>\
         <tbody class=\"ted-dashboard-table-body\">",
    );
    for row in rows {
        out.push_str(&format!(
            "<tr><td class=\"ted-overview-description\">{}</td>\
             <td class=\"ted-overview-description\">{}</td>\
             <td class=\"align-right ted-present bright\">{} <span class=\"normal ted-unit\">kW</span></td>\
             <td class=\"align-right ted-today\">{}</td></tr>",
            row.glyph,
            escape_html(&row.label),
            row.present_power,
            escape_html(&row.present_cost),
        ));
    }
    out.push_str("</tbody></table></div>");
    out
}

fn summary(snapshot: &Snapshot) -> String {
    let Some(dashboard) = &snapshot.dashboard else {
        return String::new();
    };
    let totals = &dashboard.power;
    let lines = [
        ("Present", format_scaled(totals.now, MILLI, 3), "kW"),
        ("Today", format_scaled(totals.today, MILLI, 3), "kWh"),
        ("This Month", format_scaled(totals.month_to_date, MILLI, 1), "kWh"),
        ("Projected", format_scaled(totals.projected, MILLI, 1), "kWh"),
    ];

    let mut out = String::from(
        "<div><header class=\"header\">Energy Summary</header><table class=\"small\">\
         <tbody class=\"ted-summary-table-body\">",
    );
    for (label, value, unit) in lines {
        out.push_str(&format!(
            "<tr><td class=\"normal ted-overview-description\">{}</td>\
             <td class=\"align-right ted-summary-present\">{} <span class=\"ted-unit\">{}</span></td></tr>",
            label, value, unit,
        ));
    }
    out.push_str("</tbody></table></div>");
    out
}

fn gauge(header: &str, watts: i64, max_watts: i64) -> String {
    let degrees = gauge_angle(watts as f64, max_watts as f64) as i64;
    format!(
        "<div><header class=\"header\">{header}</header><section class=\"gauge-content\">\
         <div class=\"box gauge--2\"><div class=\"mask\">\
         <div class=\"xsmall dimmed gauge-label\">{value} <span class=\"ted-unit\">kW</span></div>\
         <div class=\"semi-circle\"></div>\
         <div class=\"semi-circle--mask\" style=\"-webkit-transform: rotate({degrees}deg); \
         -moz-transform: rotate({degrees}deg); transform: rotate({degrees}deg);\"></div>\
         </div></div></section></div>",
        header = header,
        value = format_scaled(watts, MILLI, 3),
        degrees = degrees,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
