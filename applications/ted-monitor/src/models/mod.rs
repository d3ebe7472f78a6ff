pub mod settings;
pub mod usage;

pub use settings::{
    ct_indices, ct_mask, Configuration, Ct, Group, Mtu, MtuType, Rate, Spyder, SystemSettings,
    MTU_SLOTS,
};
pub use usage::{DashData, EnergyScope, GroupUsage, MtuUsage, SpyderData, SpyderUsage, SystemOverview};
