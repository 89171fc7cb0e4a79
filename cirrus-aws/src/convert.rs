//! Conversions from AWS SDK shapes to the broker's normalized records.
//!
//! Every accessor on the SDK side is optional; conversion fills the
//! normalized record's required fields with stable fallbacks (the resource
//! id, an empty string) rather than failing, so one malformed resource never
//! sinks a whole listing.

use aws_sdk_costexplorer::types::{Granularity, ResultByTime};
use chrono::{DateTime, NaiveDate, Utc};

use cirrus_core::{AlarmRecord, BucketRecord, CostGranularity, CostPeriod, InstanceRecord};

/// Convert a smithy timestamp to UTC. `None` for out-of-range values.
pub fn to_utc(timestamp: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

pub fn instance_record(
    instance: &aws_sdk_ec2::types::Instance,
    region: &str,
) -> InstanceRecord {
    let id = instance.instance_id().unwrap_or_default().to_string();
    let tags: std::collections::BTreeMap<String, String> = instance
        .tags()
        .iter()
        .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
        .collect();
    let name = tags.get("Name").cloned().unwrap_or_else(|| id.clone());

    InstanceRecord {
        name,
        instance_type: instance
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        region: region.to_string(),
        availability_zone: instance
            .placement()
            .and_then(|p| p.availability_zone())
            .map(str::to_string),
        launch_time: instance.launch_time().and_then(to_utc),
        tags,
        id,
    }
}

pub fn bucket_record(bucket: &aws_sdk_s3::types::Bucket, region: &str) -> BucketRecord {
    BucketRecord {
        name: bucket.name().unwrap_or_default().to_string(),
        region: region.to_string(),
        created_at: bucket.creation_date().and_then(to_utc),
    }
}

pub fn alarm_record(alarm: &aws_sdk_cloudwatch::types::MetricAlarm) -> AlarmRecord {
    AlarmRecord {
        name: alarm.alarm_name().unwrap_or_default().to_string(),
        description: alarm.alarm_description().map(str::to_string),
        metric: alarm.metric_name().map(str::to_string),
        namespace: alarm.namespace().map(str::to_string),
        state: alarm
            .state_value()
            .map(|s| s.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "unknown".to_string()),
        reason: alarm.state_reason().map(str::to_string),
        threshold: alarm.threshold(),
        updated_at: alarm.state_updated_timestamp().and_then(to_utc),
    }
}

pub fn granularity(granularity: CostGranularity) -> Granularity {
    match granularity {
        CostGranularity::Daily => Granularity::Daily,
        CostGranularity::Monthly => Granularity::Monthly,
    }
}

/// One reporting period from a cost-and-usage result. `None` when the entry
/// is missing its interval or the UnblendedCost metric.
pub fn cost_period(result: &ResultByTime) -> Option<CostPeriod> {
    let interval = result.time_period()?;
    let start = NaiveDate::parse_from_str(interval.start(), "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(interval.end(), "%Y-%m-%d").ok()?;
    let metric = result.total()?.get("UnblendedCost")?;
    Some(CostPeriod {
        start,
        end,
        amount: metric
            .amount()
            .and_then(|a| a.parse().ok())
            .unwrap_or(0.0),
        unit: metric.unit().unwrap_or("USD").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudwatch::types::{MetricAlarm, StateValue};
    use aws_sdk_costexplorer::types::{DateInterval, MetricValue};
    use aws_sdk_ec2::types::{
        Instance, InstanceState, InstanceStateName, InstanceType, Placement, Tag,
    };
    use aws_sdk_s3::types::Bucket;

    #[test]
    fn test_instance_record_full() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .instance_type(InstanceType::T3Micro)
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .placement(Placement::builder().availability_zone("us-east-1a").build())
            .launch_time(aws_smithy_types::DateTime::from_secs(1_700_000_000))
            .tags(Tag::builder().key("Name").value("web-1").build())
            .tags(Tag::builder().key("env").value("prod").build())
            .build();

        let record = instance_record(&instance, "us-east-1");
        assert_eq!(record.id, "i-0abc");
        assert_eq!(record.name, "web-1");
        assert_eq!(record.instance_type, "t3.micro");
        assert_eq!(record.state, "running");
        assert_eq!(record.availability_zone.as_deref(), Some("us-east-1a"));
        assert!(record.launch_time.is_some());
        assert_eq!(record.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_instance_without_name_tag_falls_back_to_id() {
        let instance = Instance::builder().instance_id("i-noname").build();
        let record = instance_record(&instance, "us-east-1");
        assert_eq!(record.name, "i-noname");
        assert_eq!(record.state, "unknown");
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_bucket_record() {
        let bucket = Bucket::builder()
            .name("cirrus-logs")
            .creation_date(aws_smithy_types::DateTime::from_secs(1_650_000_000))
            .build();
        let record = bucket_record(&bucket, "us-west-2");
        assert_eq!(record.name, "cirrus-logs");
        assert_eq!(record.region, "us-west-2");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_alarm_record_normalizes_state() {
        let alarm = MetricAlarm::builder()
            .alarm_name("cpu-high")
            .namespace("AWS/EC2")
            .metric_name("CPUUtilization")
            .state_value(StateValue::InsufficientData)
            .threshold(80.0)
            .build();
        let record = alarm_record(&alarm);
        assert_eq!(record.name, "cpu-high");
        assert_eq!(record.state, "insufficient_data");
        assert_eq!(record.threshold, Some(80.0));
    }

    #[test]
    fn test_cost_period_reads_unblended_cost() {
        let result = ResultByTime::builder()
            .time_period(
                DateInterval::builder()
                    .start("2024-01-01")
                    .end("2024-02-01")
                    .build()
                    .unwrap(),
            )
            .total(
                "UnblendedCost",
                MetricValue::builder().amount("12.50").unit("USD").build(),
            )
            .build();

        let period = cost_period(&result).unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(period.amount, 12.50);
        assert_eq!(period.unit, "USD");
    }

    #[test]
    fn test_cost_period_missing_metric_is_none() {
        let result = ResultByTime::builder()
            .time_period(
                DateInterval::builder()
                    .start("2024-01-01")
                    .end("2024-02-01")
                    .build()
                    .unwrap(),
            )
            .build();
        assert!(cost_period(&result).is_none());
    }

    #[test]
    fn test_converted_record_serializes_with_stable_field_names() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .instance_type(InstanceType::T3Micro)
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Stopped)
                    .build(),
            )
            .tags(Tag::builder().key("env").value("prod").build())
            .build();
        let record = instance_record(&instance, "us-east-1");

        // The model-facing payload keeps the normalized snake_case names,
        // not the SDK's shapes.
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "i-0abc");
        assert_eq!(value["instance_type"], "t3.micro");
        assert_eq!(value["state"], "stopped");
        assert_eq!(value["region"], "us-east-1");
        assert_eq!(value["tags"]["env"], "prod");
        assert!(value.get("InstanceId").is_none());
    }

    #[test]
    fn test_granularity_mapping() {
        assert_eq!(granularity(CostGranularity::Daily), Granularity::Daily);
        assert_eq!(granularity(CostGranularity::Monthly), Granularity::Monthly);
    }
}
