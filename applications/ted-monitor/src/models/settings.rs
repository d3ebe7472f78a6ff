//! System configuration records as reported by `SystemSettings.xml` and `Rate.xml`.
//!
//! Every record defaults missing elements so that firmware revisions which
//! omit a section still decode.

use serde::Deserialize;

/// Number of MTU slots an ECC can be configured with.
pub const MTU_SLOTS: usize = 4;

/// Number of CT inputs on a spyder.
const CT_CHANNELS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Number of MTUs configured on the ECC
    #[serde(rename = "NumberMTU")]
    pub mtu_count: usize,
    #[serde(rename = "NumberDisplay")]
    pub display_count: usize,
    #[serde(rename = "Configuration")]
    pub configuration: Configuration,
    #[serde(rename = "MTUS")]
    pub mtus: Mtus,
    #[serde(rename = "Spyders")]
    pub spyders: Spyders,
    /// Multiplier applied to power to estimate pounds of carbon
    #[serde(rename = "CarbonCost")]
    pub carbon_cost: i64,
}

impl SystemSettings {
    /// Configured type of the MTU in `slot` (0-based).
    pub fn mtu_type(&self, slot: usize) -> Option<MtuType> {
        self.configuration.mtu_types().get(slot).copied()
    }

    /// The MTU record in `slot` (0-based), if the device reported one.
    pub fn mtu(&self, slot: usize) -> Option<&Mtu> {
        self.mtus.mtu.get(slot)
    }

    /// First slot configured as a generation MTU.
    pub fn generation_slot(&self) -> Option<usize> {
        self.configuration
            .mtu_types()
            .iter()
            .position(|t| *t == MtuType::Generation)
    }

    /// Description of `group` on `spyder`, both 0-based.
    pub fn group_description(&self, spyder: usize, group: usize) -> Option<&str> {
        self.spyders
            .spyder
            .get(spyder)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.description.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(rename = "SystemType")]
    pub system_type: i64,
    #[serde(rename = "MTUType1")]
    pub mtu_type1: MtuType,
    #[serde(rename = "MTUType2")]
    pub mtu_type2: MtuType,
    #[serde(rename = "MTUType3")]
    pub mtu_type3: MtuType,
    #[serde(rename = "MTUType4")]
    pub mtu_type4: MtuType,
}

impl Configuration {
    pub fn mtu_types(&self) -> [MtuType; MTU_SLOTS] {
        [
            self.mtu_type1,
            self.mtu_type2,
            self.mtu_type3,
            self.mtu_type4,
        ]
    }
}

/// How the ECC accounts for an MTU's readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "u8")]
pub enum MtuType {
    #[default]
    Net,
    Load,
    Generation,
    Standalone,
}

impl From<u8> for MtuType {
    fn from(value: u8) -> Self {
        match value {
            1 => MtuType::Load,
            2 => MtuType::Generation,
            3 => MtuType::Standalone,
            _ => MtuType::Net,
        }
    }
}

impl MtuType {
    pub fn glyph(self) -> &'static str {
        match self {
            MtuType::Net => "⚡️",
            MtuType::Generation => "☀️",
            MtuType::Load => "🔌",
            MtuType::Standalone => "🏡",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mtus {
    #[serde(rename = "MTU")]
    pub mtu: Vec<Mtu>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mtu {
    /// 1-based MTU index
    #[serde(rename = "MTUNumber")]
    pub number: u8,
    /// Serial number; empty when the slot is unused
    #[serde(rename = "MTUID")]
    pub id: String,
    #[serde(rename = "MTUDescription")]
    pub description: String,
    #[serde(rename = "PowerCalibrationFactor")]
    pub power_calibration_factor: i64,
    #[serde(rename = "VoltageCalibrationFactor")]
    pub voltage_calibration_factor: i64,
}

impl Mtu {
    pub fn is_present(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Spyders {
    #[serde(rename = "Spyder")]
    pub spyder: Vec<Spyder>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Spyder {
    #[serde(rename = "Enabled")]
    pub enabled: u8,
    #[serde(rename = "Secondary")]
    pub secondary: u8,
    /// MTU number the spyder hangs off
    #[serde(rename = "MTUParent")]
    pub parent: u8,
    #[serde(rename = "CT")]
    pub cts: Vec<Ct>,
    #[serde(rename = "Group")]
    pub groups: Vec<Group>,
}

impl Spyder {
    pub fn is_enabled(&self) -> bool {
        self.enabled == 1
    }

    pub fn is_secondary(&self) -> bool {
        self.secondary == 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Ct {
    /// CT rating in amps
    #[serde(rename = "Type")]
    pub kind: i64,
    /// Multiplier applied to measured values (factor 100)
    #[serde(rename = "Mult")]
    pub multiplier: i64,
    #[serde(rename = "Description")]
    pub description: String,
}

/// A circuit assembled from one or more CT inputs of a spyder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "UseCT")]
    pub use_ct: u8,
}

impl Group {
    pub fn cts(&self) -> Vec<usize> {
        ct_indices(self.use_ct)
    }

    pub fn set_cts(&mut self, indices: &[usize]) {
        self.use_ct = ct_mask(indices);
    }
}

/// Indices of the CT channels set in `mask`, ascending.
pub fn ct_indices(mask: u8) -> Vec<usize> {
    (0..CT_CHANNELS).filter(|i| mask & (1 << i) != 0).collect()
}

/// Inverse of [`ct_indices`]. Indices outside the channel range are ignored.
pub fn ct_mask(indices: &[usize]) -> u8 {
    indices
        .iter()
        .filter(|i| **i < CT_CHANNELS)
        .fold(0u8, |mask, i| mask | (1 << i))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rate {
    #[serde(rename = "RatePlanType")]
    pub plan_type: i64,
    /// Current rate in hundredths of a cent per kWh
    #[serde(rename = "CurrentRate")]
    pub current_rate: i64,
    #[serde(rename = "DaysLeftInBillingCycle")]
    pub days_left_in_billing_cycle: i64,
}
