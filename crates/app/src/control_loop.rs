//! Control loop: evaluates every enabled rule against the latest telemetry.
//!
//! One cycle loads the rule set, groups it by farm and evaluates farms in
//! parallel (bounded). Within a farm, rules run sequentially against a single
//! snapshot fetched once, so every rule of that farm sees the same
//! point-in-time view. Failures are contained to one rule or one farm and are
//! surfaced as logs and as counters in the [`CycleReport`].

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use farmhub_domain::actuation::ActuationIntent;
use farmhub_domain::error::FarmHubError;
use farmhub_domain::farm::{Device, Farm};
use farmhub_domain::id::{DeviceId, FarmId, RuleId};
use farmhub_domain::notification::rule_fired_message;
use farmhub_domain::reading::{LatestSnapshot, snapshot_key};
use farmhub_domain::rule::Rule;

use crate::dispatcher::ActuationDispatcher;
use crate::notifier::NotificationFanout;
use crate::ports::{
    CommandPublisher, FarmDirectory, NotificationSink, ReadingStore, RuleRepository,
};
use crate::scheduler::EvaluationCycle;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("failed to load enabled rules")]
    RuleFetchFailed(#[source] FarmHubError),

    #[error("failed to look up farm {farm_id}")]
    FarmLookup {
        farm_id: FarmId,
        #[source]
        source: FarmHubError,
    },

    #[error("farm {0} does not exist")]
    UnknownFarm(FarmId),

    #[error("failed to fetch latest readings of farm {farm_id}")]
    Snapshot {
        farm_id: FarmId,
        #[source]
        source: FarmHubError,
    },

    #[error("rule {rule_id} references device {device_id} which is not registered to its farm")]
    StaleDeviceReference { rule_id: RuleId, device_id: DeviceId },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Tunables of the evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    /// Bound on every store and directory call.
    pub query_timeout: Duration,
    /// How many farms are evaluated at the same time.
    pub max_parallel_farms: usize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
            max_parallel_farms: 4,
        }
    }
}

/// Outcome counters of one evaluation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub rule_fetch_failed: bool,
    pub rules_loaded: usize,
    pub farms_evaluated: usize,
    pub farms_failed: usize,
    pub rules_fired: usize,
    pub rules_without_data: usize,
    pub stale_references: usize,
    pub dispatch_failures: usize,
    pub notification_failures: usize,
}

impl CycleReport {
    fn absorb(&mut self, farm: FarmReport) {
        self.farms_evaluated += 1;
        self.rules_fired += farm.rules_fired;
        self.rules_without_data += farm.rules_without_data;
        self.stale_references += farm.stale_references;
        self.dispatch_failures += farm.dispatch_failures;
        self.notification_failures += farm.notification_failures;
    }
}

#[derive(Debug, Default)]
struct FarmReport {
    rules_fired: usize,
    rules_without_data: usize,
    stale_references: usize,
    dispatch_failures: usize,
    notification_failures: usize,
}

/// Latest values seen by the rules of one farm during one cycle.
enum FarmReadings {
    Batched(LatestSnapshot),
    /// The batched query failed: values are fetched one key at a time and
    /// memoized so rules sharing a key still see a single value.
    PointLookups(HashMap<String, Option<f64>>),
}

/// Timer-driven rule evaluator. See the module docs.
pub struct ControlLoop<R, D, S, P, N> {
    rules: R,
    directory: D,
    store: S,
    dispatcher: ActuationDispatcher<P>,
    notifier: NotificationFanout<N>,
    settings: EvaluatorSettings,
}

impl<R, D, S, P, N> ControlLoop<R, D, S, P, N>
where
    R: RuleRepository + Send + Sync + 'static,
    D: FarmDirectory + Send + Sync + 'static,
    S: ReadingStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    pub fn new(
        rules: R,
        directory: D,
        store: S,
        dispatcher: ActuationDispatcher<P>,
        notifier: NotificationFanout<N>,
        settings: EvaluatorSettings,
    ) -> Self {
        Self {
            rules,
            directory,
            store,
            dispatcher,
            notifier,
            settings,
        }
    }

    /// Run one full evaluation cycle.
    ///
    /// Never fails: every error is logged and counted in the returned report.
    #[tracing::instrument(skip_all)]
    pub async fn run_cycle(self: Arc<Self>) -> CycleReport {
        let mut report = CycleReport::default();

        let rules = match self.within("list_enabled", self.rules.list_enabled()).await {
            Ok(Ok(rules)) => rules,
            Ok(Err(source)) => {
                let err = EvaluationError::RuleFetchFailed(source);
                tracing::error!(error = %err, "skipping evaluation cycle");
                report.rule_fetch_failed = true;
                return report;
            }
            Err(err) => {
                tracing::error!(error = %err, "skipping evaluation cycle");
                report.rule_fetch_failed = true;
                return report;
            }
        };
        report.rules_loaded = rules.len();

        let mut by_farm: BTreeMap<FarmId, Vec<Rule>> = BTreeMap::new();
        for rule in rules.into_iter().filter(|rule| rule.enabled) {
            by_farm.entry(rule.farm_id).or_default().push(rule);
        }

        let permits = Arc::new(Semaphore::new(self.settings.max_parallel_farms.max(1)));
        let mut tasks = JoinSet::new();
        let mut farm_of_task = HashMap::new();
        for (farm_id, farm_rules) in by_farm {
            let this = Arc::clone(&self);
            let permits = Arc::clone(&permits);
            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                this.evaluate_farm(farm_id, farm_rules).await
            });
            farm_of_task.insert(handle.id(), farm_id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(farm_report))) => report.absorb(farm_report),
                Ok((task_id, Err(err))) => {
                    report.farms_failed += 1;
                    let farm_id = farm_of_task.get(&task_id);
                    tracing::warn!(?farm_id, error = %err, "farm evaluation failed");
                }
                Err(err) => {
                    report.farms_failed += 1;
                    let farm_id = farm_of_task.get(&err.id());
                    tracing::error!(?farm_id, error = %err, "farm evaluation task aborted");
                }
            }
        }

        tracing::info!(
            rules = report.rules_loaded,
            farms = report.farms_evaluated,
            farms_failed = report.farms_failed,
            fired = report.rules_fired,
            "evaluation cycle finished"
        );
        report
    }

    #[tracing::instrument(skip(self, rules), fields(rules = rules.len()))]
    async fn evaluate_farm(
        &self,
        farm_id: FarmId,
        rules: Vec<Rule>,
    ) -> Result<FarmReport, EvaluationError> {
        let farm = self
            .within("get_farm", self.directory.get_farm(farm_id))
            .await?
            .map_err(|source| EvaluationError::FarmLookup { farm_id, source })?
            .ok_or(EvaluationError::UnknownFarm(farm_id))?;
        let devices: HashMap<DeviceId, Device> = self
            .within("devices_for_farm", self.directory.devices_for_farm(farm_id))
            .await?
            .map_err(|source| EvaluationError::FarmLookup { farm_id, source })?
            .into_iter()
            .filter(|device| device.belongs_to(farm_id))
            .map(|device| (device.id, device))
            .collect();

        let store_key = farm_id.to_string();
        let mut readings = match self
            .within("latest_for_farm", self.store.latest_for_farm(&store_key))
            .await
        {
            Ok(Ok(snapshot)) => FarmReadings::Batched(snapshot),
            Ok(Err(source)) => {
                let err = EvaluationError::Snapshot { farm_id, source };
                tracing::warn!(error = %err, "falling back to per-sensor lookups");
                FarmReadings::PointLookups(HashMap::new())
            }
            Err(err) => {
                tracing::warn!(error = %err, "falling back to per-sensor lookups");
                FarmReadings::PointLookups(HashMap::new())
            }
        };

        let mut report = FarmReport::default();
        for rule in &rules {
            self.evaluate_rule(rule, &farm, &devices, &mut readings, &mut report)
                .await;
        }
        Ok(report)
    }

    async fn evaluate_rule(
        &self,
        rule: &Rule,
        farm: &Farm,
        devices: &HashMap<DeviceId, Device>,
        readings: &mut FarmReadings,
        report: &mut FarmReport,
    ) {
        let resolve = |device_id: DeviceId| {
            devices
                .get(&device_id)
                .filter(|device| device.belongs_to(rule.farm_id))
                .ok_or(EvaluationError::StaleDeviceReference {
                    rule_id: rule.id,
                    device_id,
                })
        };
        let resolved = (resolve(rule.sensor_device_id), resolve(rule.actuator_device_id));
        let (sensor, actuator) = match resolved {
            (Ok(sensor), Ok(actuator)) => (sensor, actuator),
            (Err(err), _) | (_, Err(err)) => {
                report.stale_references += 1;
                tracing::warn!(rule_id = %rule.id, error = %err, "skipping rule");
                return;
            }
        };

        let Some(value) = self
            .value_of(readings, &sensor.identifier, &rule.condition.metric)
            .await
        else {
            report.rules_without_data += 1;
            tracing::debug!(
                rule_id = %rule.id,
                sensor = %sensor.identifier,
                "no recent data for rule"
            );
            return;
        };

        if !rule.condition.is_met(value) {
            tracing::trace!(
                rule_id = %rule.id,
                value,
                condition = %rule.condition,
                "condition not met"
            );
            return;
        }

        report.rules_fired += 1;
        tracing::info!(rule_id = %rule.id, value, condition = %rule.condition, "rule fired");

        let intent =
            ActuationIntent::for_rule(self.dispatcher.namespace(), rule, &actuator.identifier);
        if let Err(err) = self.dispatcher.dispatch_intent(&intent).await {
            report.dispatch_failures += 1;
            tracing::warn!(rule_id = %rule.id, error = %err, "failed to dispatch command");
        }

        let message = rule_fired_message(rule, actuator, &intent.command);
        if let Err(err) = self.notifier.notify(farm.owner_id, message).await {
            report.notification_failures += 1;
            tracing::warn!(rule_id = %rule.id, error = %err, "failed to notify farm owner");
        }
    }

    async fn value_of(
        &self,
        readings: &mut FarmReadings,
        sensor_id: &str,
        metric_type: &str,
    ) -> Option<f64> {
        let memo = match readings {
            FarmReadings::Batched(snapshot) => return snapshot.get(sensor_id, metric_type),
            FarmReadings::PointLookups(memo) => memo,
        };
        let key = snapshot_key(sensor_id, metric_type);
        if let Some(known) = memo.get(&key) {
            return *known;
        }
        let value = match self.within("latest", self.store.latest(sensor_id, metric_type)).await {
            Ok(Ok(found)) => found.map(|reading| reading.value),
            Ok(Err(err)) => {
                tracing::warn!(sensor_id, metric_type, error = %err, "point lookup failed");
                None
            }
            Err(err) => {
                tracing::warn!(sensor_id, metric_type, error = %err, "point lookup failed");
                None
            }
        };
        memo.insert(key, value);
        value
    }

    async fn within<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, EvaluationError> {
        let after = self.settings.query_timeout;
        tokio::time::timeout(after, fut)
            .await
            .map_err(|_| EvaluationError::Timeout { operation, after })
    }
}

impl<R, D, S, P, N> EvaluationCycle for ControlLoop<R, D, S, P, N>
where
    R: RuleRepository + Send + Sync + 'static,
    D: FarmDirectory + Send + Sync + 'static,
    S: ReadingStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    N: NotificationSink + Send + Sync + 'static,
{
    fn run(self: Arc<Self>) -> impl Future<Output = CycleReport> + Send {
        self.run_cycle()
    }
}
