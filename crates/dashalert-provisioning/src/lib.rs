//! Translation between the provisioning wire contract and the org-scoped
//! alert rule model.
//!
//! [`definitions`] mirrors the JSON shape exchanged with provisioning
//! clients: enums are plain strings and durations are nanosecond integers.
//! [`models`] is the internal shape with closed enums and
//! [`std::time::Duration`]. [`compat`] converts between the two and rejects
//! anything it does not recognise.

pub mod compat;
pub mod definitions;
pub mod error;
pub mod models;

pub use compat::{
    alert_queries_from_api, alert_queries_to_api, alert_rule_from_provisioned,
    alert_rule_group_from_api, alert_rule_group_to_api, provisioned_from_alert_rule,
    provisioned_from_alert_rules,
};
pub use error::{ProvisioningError, Result};
