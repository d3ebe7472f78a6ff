//! Usage payloads. Every value is an integer in milli-units (W, Wh) or
//! cents, depending on whether the request was made in cost mode.

use super::settings::MTU_SLOTS;
use serde::Deserialize;

/// Which slice of the system a usage request covers (the `D` argument).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EnergyScope {
    #[default]
    Net,
    Load,
    Generation,
    /// A single MTU, selected with the `M` argument
    Mtu,
}

impl EnergyScope {
    pub fn code(self) -> u8 {
        match self {
            EnergyScope::Net => 0,
            EnergyScope::Load => 1,
            EnergyScope::Generation => 2,
            EnergyScope::Mtu => 255,
        }
    }
}

/// `SpyderData.xml`: usage per spyder group, in device order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpyderData {
    #[serde(rename = "Spyder")]
    pub spyders: Vec<SpyderUsage>,
}

impl SpyderData {
    pub fn group(&self, spyder: usize, group: usize) -> Option<&GroupUsage> {
        self.spyders.get(spyder).and_then(|s| s.groups.get(group))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpyderUsage {
    #[serde(rename = "Group")]
    pub groups: Vec<GroupUsage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupUsage {
    #[serde(rename = "Now")]
    pub now: i64,
    #[serde(rename = "TDY")]
    pub today: i64,
    #[serde(rename = "MTD")]
    pub month_to_date: i64,
}

/// `SystemOverview.xml`: present readings per MTU slot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemOverview {
    #[serde(rename = "MTUVal")]
    pub values: MtuValues,
}

impl SystemOverview {
    /// Readings for `slot` (0-based).
    pub fn mtu(&self, slot: usize) -> Option<&MtuUsage> {
        match slot {
            0 => self.values.mtu1.as_ref(),
            1 => self.values.mtu2.as_ref(),
            2 => self.values.mtu3.as_ref(),
            3 => self.values.mtu4.as_ref(),
            _ => None,
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = Option<&MtuUsage>> {
        (0..MTU_SLOTS).map(|slot| self.mtu(slot))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MtuValues {
    #[serde(rename = "MTU1")]
    pub mtu1: Option<MtuUsage>,
    #[serde(rename = "MTU2")]
    pub mtu2: Option<MtuUsage>,
    #[serde(rename = "MTU3")]
    pub mtu3: Option<MtuUsage>,
    #[serde(rename = "MTU4")]
    pub mtu4: Option<MtuUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MtuUsage {
    /// Present power or cost
    #[serde(rename = "Value")]
    pub value: i64,
    #[serde(rename = "KVA")]
    pub kva: i64,
    /// Power factor (%)
    #[serde(rename = "PF")]
    pub power_factor: i64,
    #[serde(rename = "Phase")]
    pub phase: i64,
    #[serde(rename = "Conn")]
    pub conn: i64,
    #[serde(rename = "PhaseCurrent")]
    pub phase_current: PhaseValues,
    #[serde(rename = "PhaseVoltage")]
    pub phase_voltage: PhaseValues,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PhaseValues {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
    #[serde(rename = "C")]
    pub c: i64,
}

/// `DashData.xml`: system totals.
///
/// The wire payload does not say which mode or scope it was requested with,
/// so the gateway stamps `scope`, `cost` and `mtu` after decoding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashData {
    #[serde(rename = "Now")]
    pub now: i64,
    #[serde(rename = "TDY")]
    pub today: i64,
    #[serde(rename = "MTD")]
    pub month_to_date: i64,
    #[serde(rename = "Proj")]
    pub projected: i64,
    #[serde(rename = "Voltage")]
    pub voltage: i64,
    #[serde(rename = "Phase")]
    pub phase: i64,
    #[serde(skip)]
    pub scope: EnergyScope,
    #[serde(skip)]
    pub cost: bool,
    #[serde(skip)]
    pub mtu: Option<u8>,
}
