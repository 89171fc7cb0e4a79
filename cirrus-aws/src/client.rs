//! The AWS implementation of [`CloudClient`].
//!
//! One [`AwsClient`] is built per registered account and shared across
//! invocations. All listings fully drain their paginators before returning,
//! so the broker always hands the model a complete collection.

use async_trait::async_trait;
use std::sync::Arc;

use cirrus_core::{
    Account, AlarmRecord, ClientError, ClientFactory, CloudClient, CostQuery, CostReport,
    MonitoringQuery, ProviderKind, ResourceKind, ResourceRecord,
};

use crate::classify::classify_error;
use crate::convert;
use crate::credentials;

/// Cloud client backed by the AWS SDK service clients.
#[derive(Debug)]
pub struct AwsClient {
    account_id: String,
    region: String,
    ec2: aws_sdk_ec2::Client,
    s3: aws_sdk_s3::Client,
    cloudwatch: aws_sdk_cloudwatch::Client,
    cost_explorer: aws_sdk_costexplorer::Client,
}

impl AwsClient {
    /// Build a client for an account, resolving its credential reference.
    pub async fn new(account: &Account) -> Result<Self, ClientError> {
        let config = credentials::sdk_config_for(account).await?;
        tracing::debug!(
            account = %account.id,
            region = %account.region,
            "constructed aws service clients"
        );
        Ok(AwsClient {
            account_id: account.id.clone(),
            region: account.region.clone(),
            ec2: aws_sdk_ec2::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            cloudwatch: aws_sdk_cloudwatch::Client::new(&config),
            cost_explorer: aws_sdk_costexplorer::Client::new(&config),
        })
    }

    async fn list_instances(&self) -> Result<Vec<ResourceRecord>, ClientError> {
        let mut pages = self.ec2.describe_instances().into_paginator().send();
        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify_error("ec2 DescribeInstances", e))?;
            for reservation in page.reservations() {
                for instance in reservation.instances() {
                    records.push(ResourceRecord::Instance(convert::instance_record(
                        instance,
                        &self.region,
                    )));
                }
            }
        }
        Ok(records)
    }

    async fn list_buckets(&self) -> Result<Vec<ResourceRecord>, ClientError> {
        let output = self
            .s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| classify_error("s3 ListBuckets", e))?;
        Ok(output
            .buckets()
            .iter()
            .map(|b| ResourceRecord::Bucket(convert::bucket_record(b, &self.region)))
            .collect())
    }

    async fn describe_instance(&self, id: &str) -> Result<Option<ResourceRecord>, ClientError> {
        let result = self
            .ec2
            .describe_instances()
            .instance_ids(id)
            .send()
            .await;
        match result {
            Ok(output) => Ok(output
                .reservations()
                .iter()
                .flat_map(|r| r.instances())
                .next()
                .map(|i| ResourceRecord::Instance(convert::instance_record(i, &self.region)))),
            Err(e) => match classify_error("ec2 DescribeInstances", e) {
                ClientError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }
}

#[async_trait]
impl CloudClient for AwsClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, ClientError> {
        match kind {
            ResourceKind::Instance => self.list_instances().await,
            ResourceKind::StorageBucket => self.list_buckets().await,
        }
    }

    async fn describe_resource(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRecord>, ClientError> {
        match kind {
            ResourceKind::Instance => self.describe_instance(id).await,
            // S3 has no per-bucket describe worth the trip; the bucket list
            // is small and already carries everything the record needs.
            ResourceKind::StorageBucket => {
                Ok(self.list_buckets().await?.into_iter().find(|b| b.id() == id))
            }
        }
    }

    async fn get_monitoring(
        &self,
        query: MonitoringQuery,
    ) -> Result<Vec<AlarmRecord>, ClientError> {
        let mut pages = self.cloudwatch.describe_alarms().into_paginator().send();
        let mut alarms = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify_error("cloudwatch DescribeAlarms", e))?;
            for alarm in page.metric_alarms() {
                let record = convert::alarm_record(alarm);
                let namespace_matches = match &query.namespace {
                    Some(ns) => record.namespace.as_deref() == Some(ns.as_str()),
                    None => true,
                };
                let state_matches = match &query.state {
                    Some(state) => &record.state == state,
                    None => true,
                };
                if namespace_matches && state_matches {
                    alarms.push(record);
                }
            }
        }
        Ok(alarms)
    }

    async fn get_cost(&self, query: CostQuery) -> Result<CostReport, ClientError> {
        let interval = aws_sdk_costexplorer::types::DateInterval::builder()
            .start(query.start.format("%Y-%m-%d").to_string())
            .end(query.end.format("%Y-%m-%d").to_string())
            .build()
            .map_err(|e| ClientError::Provider(e.to_string()))?;
        let output = self
            .cost_explorer
            .get_cost_and_usage()
            .time_period(interval)
            .granularity(convert::granularity(query.granularity))
            .metrics("UnblendedCost")
            .send()
            .await
            .map_err(|e| classify_error("ce GetCostAndUsage", e))?;
        let periods = output
            .results_by_time()
            .iter()
            .filter_map(convert::cost_period)
            .collect();
        Ok(CostReport::new(query.granularity, periods))
    }
}

/// [`ClientFactory`] handing out [`AwsClient`]s.
///
/// Rejects accounts whose provider is not AWS; the registry calls this once
/// per account and caches the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct AwsClientFactory;

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn build(&self, account: &Account) -> Result<Arc<dyn CloudClient>, ClientError> {
        if account.provider != ProviderKind::Aws {
            return Err(ClientError::Provider(format!(
                "account '{}' targets provider '{}'; this factory only builds aws clients",
                account.id, account.provider
            )));
        }
        Ok(Arc::new(AwsClient::new(account).await?))
    }
}
