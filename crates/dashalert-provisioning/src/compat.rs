//! Conversions between [`definitions`] and [`models`].
//!
//! Inbound conversions are fallible: unknown enum strings and negative
//! durations are rejected instead of coerced. Outbound conversions cannot
//! fail; durations beyond `i64::MAX` nanoseconds saturate.

use std::time::Duration;

use crate::definitions;
use crate::error::{ProvisioningError, Result};
use crate::models::{self, Provenance};

fn duration_from_ns(field: &'static str, ns: i64) -> Result<Duration> {
    u64::try_from(ns)
        .map(Duration::from_nanos)
        .map_err(|_| ProvisioningError::InvalidDuration { field, value: ns })
}

fn duration_to_ns(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

pub fn alert_rule_from_provisioned(
    rule: &definitions::ProvisionedAlertRule,
) -> Result<models::AlertRule> {
    // Provenance lives on the group; a rule still may not carry garbage.
    rule.provenance.parse::<Provenance>()?;
    Ok(models::AlertRule {
        id: rule.id,
        uid: rule.uid.clone(),
        org_id: rule.org_id,
        namespace_uid: rule.folder_uid.clone(),
        rule_group: rule.rule_group.clone(),
        title: rule.title.clone(),
        condition: rule.condition.clone(),
        data: alert_queries_from_api(&rule.data)?,
        updated: rule.updated,
        no_data_state: rule.no_data_state.parse()?,
        exec_err_state: rule.exec_err_state.parse()?,
        for_duration: duration_from_ns("for", rule.for_ns)?,
        annotations: rule.annotations.clone(),
        labels: rule.labels.clone(),
        is_paused: rule.is_paused,
    })
}

pub fn provisioned_from_alert_rule(
    rule: &models::AlertRule,
    provenance: Provenance,
) -> definitions::ProvisionedAlertRule {
    definitions::ProvisionedAlertRule {
        id: rule.id,
        uid: rule.uid.clone(),
        org_id: rule.org_id,
        folder_uid: rule.namespace_uid.clone(),
        rule_group: rule.rule_group.clone(),
        title: rule.title.clone(),
        condition: rule.condition.clone(),
        data: alert_queries_to_api(&rule.data),
        updated: rule.updated,
        no_data_state: rule.no_data_state.as_str().to_string(),
        exec_err_state: rule.exec_err_state.as_str().to_string(),
        for_ns: duration_to_ns(rule.for_duration),
        annotations: rule.annotations.clone(),
        labels: rule.labels.clone(),
        provenance: provenance.as_str().to_string(),
        is_paused: rule.is_paused,
    }
}

/// Converts a rule list with provenance [`Provenance::None`].
pub fn provisioned_from_alert_rules(
    rules: &[models::AlertRule],
) -> Vec<definitions::ProvisionedAlertRule> {
    rules
        .iter()
        .map(|r| provisioned_from_alert_rule(r, Provenance::None))
        .collect()
}

pub fn alert_queries_from_api(queries: &[definitions::AlertQuery]) -> Result<Vec<models::AlertQuery>> {
    queries
        .iter()
        .map(|q| {
            Ok(models::AlertQuery {
                ref_id: q.ref_id.clone(),
                query_type: q.query_type.clone(),
                relative_time_range: models::RelativeTimeRange {
                    from: duration_from_ns("relativeTimeRange.from", q.relative_time_range.from)?,
                    to: duration_from_ns("relativeTimeRange.to", q.relative_time_range.to)?,
                },
                datasource_uid: q.datasource_uid.clone(),
                model: q.model.clone(),
            })
        })
        .collect()
}

pub fn alert_queries_to_api(queries: &[models::AlertQuery]) -> Vec<definitions::AlertQuery> {
    queries
        .iter()
        .map(|q| definitions::AlertQuery {
            ref_id: q.ref_id.clone(),
            query_type: q.query_type.clone(),
            relative_time_range: definitions::RelativeTimeRange {
                from: duration_to_ns(q.relative_time_range.from),
                to: duration_to_ns(q.relative_time_range.to),
            },
            datasource_uid: q.datasource_uid.clone(),
            model: q.model.clone(),
        })
        .collect()
}

/// Converts a wire group. The first rule that fails to convert fails the group.
pub fn alert_rule_group_from_api(group: &definitions::AlertRuleGroup) -> Result<models::AlertRuleGroup> {
    let interval = u64::try_from(group.interval)
        .map(Duration::from_secs)
        .map_err(|_| ProvisioningError::InvalidDuration {
            field: "interval",
            value: group.interval,
        })?;
    let rules = group
        .rules
        .iter()
        .map(alert_rule_from_provisioned)
        .collect::<Result<Vec<_>>>()?;
    Ok(models::AlertRuleGroup {
        title: group.title.clone(),
        folder_uid: group.folder_uid.clone(),
        interval,
        provenance: Provenance::None,
        rules,
    })
}

pub fn alert_rule_group_to_api(group: &models::AlertRuleGroup) -> definitions::AlertRuleGroup {
    definitions::AlertRuleGroup {
        title: group.title.clone(),
        folder_uid: group.folder_uid.clone(),
        interval: i64::try_from(group.interval.as_secs()).unwrap_or(i64::MAX),
        rules: group
            .rules
            .iter()
            .map(|r| provisioned_from_alert_rule(r, group.provenance))
            .collect(),
    }
}
