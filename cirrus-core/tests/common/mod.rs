//! Shared test fixtures: a scriptable mock cloud client and factory.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cirrus_core::{
    Account, AccountRegistry, AlarmRecord, Broker, BucketRecord, ClientError, ClientFactory,
    CloudClient, CostPeriod, CostQuery, CostReport, CredentialRef, InstanceRecord,
    MonitoringQuery, ProviderKind, ResourceKind, ResourceRecord,
};

pub fn instance(id: &str, name: &str) -> ResourceRecord {
    ResourceRecord::Instance(InstanceRecord {
        id: id.to_string(),
        name: name.to_string(),
        instance_type: "t3.micro".to_string(),
        state: "running".to_string(),
        region: "us-east-1".to_string(),
        availability_zone: Some("us-east-1a".to_string()),
        launch_time: None,
        tags: Default::default(),
    })
}

pub fn bucket(name: &str) -> ResourceRecord {
    ResourceRecord::Bucket(BucketRecord {
        name: name.to_string(),
        region: "us-east-1".to_string(),
        created_at: None,
    })
}

pub fn alarm(name: &str, state: &str, namespace: &str) -> AlarmRecord {
    AlarmRecord {
        name: name.to_string(),
        description: None,
        metric: Some("CPUUtilization".to_string()),
        namespace: Some(namespace.to_string()),
        state: state.to_string(),
        reason: None,
        threshold: Some(80.0),
        updated_at: None,
    }
}

pub fn cost_period(start: (i32, u32, u32), end: (i32, u32, u32), amount: f64) -> CostPeriod {
    CostPeriod {
        start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        amount,
        unit: "USD".to_string(),
    }
}

/// How a mock client should fail its capability calls.
#[derive(Debug, Clone, Copy)]
pub enum FailMode {
    Transient,
    Forbidden,
    NotFound,
    Provider,
}

impl FailMode {
    fn to_error(self) -> ClientError {
        match self {
            FailMode::Transient => ClientError::Transient("throttled by provider".to_string()),
            FailMode::Forbidden => ClientError::Forbidden("access denied".to_string()),
            FailMode::NotFound => ClientError::NotFound("no such resource".to_string()),
            FailMode::Provider => ClientError::Provider("internal provider error".to_string()),
        }
    }
}

/// Scriptable in-memory cloud client.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    pub account_id: String,
    pub instances: Vec<ResourceRecord>,
    pub buckets: Vec<ResourceRecord>,
    pub alarms: Vec<AlarmRecord>,
    pub cost_periods: Vec<CostPeriod>,
    pub delay: Option<Duration>,
    pub fail: Option<FailMode>,
}

impl MockClient {
    pub fn new(account_id: &str) -> Self {
        MockClient {
            account_id: account_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_instances(mut self, instances: Vec<ResourceRecord>) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<ResourceRecord>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn with_alarms(mut self, alarms: Vec<AlarmRecord>) -> Self {
        self.alarms = alarms;
        self
    }

    pub fn with_cost_periods(mut self, periods: Vec<CostPeriod>) -> Self {
        self.cost_periods = periods;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self, mode: FailMode) -> Self {
        self.fail = Some(mode);
        self
    }

    async fn gate(&self) -> Result<(), ClientError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail {
            Some(mode) => Err(mode.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudClient for MockClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>, ClientError> {
        self.gate().await?;
        Ok(match kind {
            ResourceKind::Instance => self.instances.clone(),
            ResourceKind::StorageBucket => self.buckets.clone(),
        })
    }

    async fn describe_resource(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<ResourceRecord>, ClientError> {
        self.gate().await?;
        let records = match kind {
            ResourceKind::Instance => &self.instances,
            ResourceKind::StorageBucket => &self.buckets,
        };
        Ok(records.iter().find(|r| r.id() == id).cloned())
    }

    async fn get_monitoring(
        &self,
        query: MonitoringQuery,
    ) -> Result<Vec<AlarmRecord>, ClientError> {
        self.gate().await?;
        Ok(self
            .alarms
            .iter()
            .filter(|a| match &query.namespace {
                Some(ns) => a.namespace.as_deref() == Some(ns.as_str()),
                None => true,
            })
            .filter(|a| match &query.state {
                Some(state) => &a.state == state,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_cost(&self, query: CostQuery) -> Result<CostReport, ClientError> {
        self.gate().await?;
        Ok(CostReport::new(query.granularity, self.cost_periods.clone()))
    }
}

/// Factory handing out pre-scripted clients per account id.
pub struct MockFactory {
    clients: HashMap<String, MockClient>,
    pub builds: AtomicUsize,
    fail_credentials: bool,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(MockFactory {
            clients: HashMap::new(),
            builds: AtomicUsize::new(0),
            fail_credentials: false,
        })
    }

    pub fn with_clients(clients: Vec<MockClient>) -> Arc<Self> {
        Arc::new(MockFactory {
            clients: clients
                .into_iter()
                .map(|c| (c.account_id.clone(), c))
                .collect(),
            builds: AtomicUsize::new(0),
            fail_credentials: false,
        })
    }

    pub fn failing_credentials() -> Arc<Self> {
        Arc::new(MockFactory {
            clients: HashMap::new(),
            builds: AtomicUsize::new(0),
            fail_credentials: true,
        })
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn build(&self, account: &Account) -> Result<Arc<dyn CloudClient>, ClientError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_credentials {
            return Err(ClientError::Credential(format!(
                "no credentials resolvable for '{}'",
                account.id
            )));
        }
        Ok(Arc::new(
            self.clients
                .get(&account.id)
                .cloned()
                .unwrap_or_else(|| MockClient::new(&account.id)),
        ))
    }
}

pub fn test_account(id: &str, region: &str) -> Account {
    Account {
        id: id.to_string(),
        display_name: id.to_string(),
        provider: ProviderKind::Aws,
        region: region.to_string(),
        credentials: CredentialRef::Default,
        description: format!("{} test account", id),
    }
}

/// Registry with the standard two-account fixture: `default` and `staging`.
pub fn two_account_registry(factory: Arc<dyn ClientFactory>) -> Arc<AccountRegistry> {
    Arc::new(
        AccountRegistry::builder(factory)
            .register(test_account("default", "us-east-1"))
            .unwrap()
            .register(test_account("staging", "us-west-2"))
            .unwrap()
            .default_account("default")
            .build()
            .unwrap(),
    )
}

/// Broker over the two-account fixture with the built-in catalogue.
pub fn test_broker(factory: Arc<dyn ClientFactory>) -> Broker {
    Broker::builder()
        .registry(two_account_registry(factory))
        .build()
        .unwrap()
}
