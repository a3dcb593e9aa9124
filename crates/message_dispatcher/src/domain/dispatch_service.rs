use crate::domain::{
    DispatchConfig, DispatchJob, DispatchJobStore, DispatchOutcome, DispatchRequest,
    EligibilityQueryComposer, FilterResolver, InventoryPager, PublishGate,
};
use common::domain::{
    CallerIdentity, DeviceInventory, DevicePublisher, DomainError, DomainResult, FilterRepository,
    Query,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// One independently resolved part of a dispatch
#[derive(Debug, Clone, PartialEq)]
enum DispatchTarget {
    AllDevices,
    Device(String),
    Filter(String),
}

/// Handle to a dispatch running on the tokio runtime
pub struct DispatchHandle {
    join_handle: JoinHandle<DispatchOutcome>,
}

impl DispatchHandle {
    /// Wait for every lookup and publish of the dispatch to complete
    pub async fn outcome(self) -> DispatchOutcome {
        match self.join_handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "dispatch task did not complete");
                DispatchOutcome::Failed
            }
        }
    }
}

/// Resolves a target selection into devices and publishes the message to each one
pub struct DispatchService {
    publisher: Arc<dyn DevicePublisher>,
    filter_resolver: FilterResolver,
    pager: InventoryPager,
    job_store: Arc<dyn DispatchJobStore>,
    publish_concurrency: usize,
}

impl DispatchService {
    pub fn new(
        inventory: Arc<dyn DeviceInventory>,
        filters: Arc<dyn FilterRepository>,
        publisher: Arc<dyn DevicePublisher>,
        job_store: Arc<dyn DispatchJobStore>,
        config: DispatchConfig,
    ) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            publisher,
            filter_resolver: FilterResolver::new(filters),
            pager: InventoryPager::new(inventory, config.page_size, config.publish_concurrency),
            job_store,
            publish_concurrency: config.publish_concurrency,
        })
    }

    /// Run one dispatch to completion.
    ///
    /// Explicit devices and filters are independent branches joined at a single
    /// point; a failing branch flips the outcome to failed without stopping the
    /// others. Publishes from every branch share one `PublishGate`.
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(
            owner_id = %caller.id,
            device_count = request.device_ids.len(),
            filter_count = request.filter_names.len(),
            retained = request.retained,
        )
    )]
    pub async fn dispatch(
        &self,
        caller: &CallerIdentity,
        request: &DispatchRequest,
    ) -> DispatchOutcome {
        let composer = EligibilityQueryComposer::starting_now();
        let gate = PublishGate::new(self.publish_concurrency);

        let targets = if request.targets_all_devices() {
            vec![DispatchTarget::AllDevices]
        } else {
            request
                .device_ids
                .iter()
                .cloned()
                .map(DispatchTarget::Device)
                .chain(request.filter_names.iter().cloned().map(DispatchTarget::Filter))
                .collect()
        };

        let branch_count = targets.len();
        let outcomes = join_all(
            targets
                .into_iter()
                .map(|target| self.dispatch_target(caller, request, &composer, &gate, target)),
        )
        .await;
        let outcome = DispatchOutcome::all(outcomes);

        info!(branch_count, outcome = ?outcome, "dispatch finished");
        outcome
    }

    /// Start a dispatch on the runtime and return a handle to its outcome
    pub fn spawn(
        self: &Arc<Self>,
        caller: CallerIdentity,
        request: DispatchRequest,
    ) -> DispatchHandle {
        let service = Arc::clone(self);
        let join_handle =
            tokio::spawn(async move { service.dispatch(&caller, &request).await }.in_current_span());
        DispatchHandle { join_handle }
    }

    /// Register a job, start the dispatch, and return the job ID without waiting
    pub async fn submit(
        self: &Arc<Self>,
        caller: CallerIdentity,
        request: DispatchRequest,
    ) -> DomainResult<String> {
        let job_id = xid::new().to_string();
        self.job_store.insert_pending(&job_id, &caller.id).await?;

        debug!(job_id = %job_id, owner_id = %caller.id, "dispatch job submitted");

        let handle = self.spawn(caller, request);
        let job_store = Arc::clone(&self.job_store);
        let recorded_job_id = job_id.clone();
        tokio::spawn(async move {
            let outcome = handle.outcome().await;
            if let Err(e) = job_store.record_outcome(&recorded_job_id, outcome).await {
                error!(job_id = %recorded_job_id, error = %e, "failed to record dispatch outcome");
            }
        });

        Ok(job_id)
    }

    /// Job submitted by this caller; other callers' jobs are reported as not found
    pub async fn job_status(&self, caller: &CallerIdentity, job_id: &str) -> DomainResult<DispatchJob> {
        match self.job_store.get(job_id).await? {
            Some(job) if job.owner_id == caller.id => Ok(job),
            _ => Err(DomainError::DispatchJobNotFound(job_id.to_string())),
        }
    }

    async fn dispatch_target(
        &self,
        caller: &CallerIdentity,
        request: &DispatchRequest,
        composer: &EligibilityQueryComposer,
        gate: &PublishGate,
        target: DispatchTarget,
    ) -> DispatchOutcome {
        let result = match &target {
            DispatchTarget::Device(device_id) => {
                self.publish_to_device(caller, gate, device_id, request).await
            }
            DispatchTarget::AllDevices => {
                self.publish_to_matching_devices(caller, gate, &composer.compose(None), request)
                    .await
            }
            DispatchTarget::Filter(filter_name) => {
                self.publish_to_filter(caller, gate, filter_name, composer, request)
                    .await
            }
        };

        match result {
            Ok(()) => DispatchOutcome::Succeeded,
            Err(e) if e.is_remote_failure() => {
                warn!(branch = ?target, error = %e, "dispatch branch failed");
                DispatchOutcome::Failed
            }
            Err(e) => {
                error!(branch = ?target, error = %e, "dispatch branch rejected");
                DispatchOutcome::Failed
            }
        }
    }

    async fn publish_to_filter(
        &self,
        caller: &CallerIdentity,
        gate: &PublishGate,
        filter_name: &str,
        composer: &EligibilityQueryComposer,
        request: &DispatchRequest,
    ) -> DomainResult<()> {
        let filter = self
            .filter_resolver
            .resolve_filter(&caller.id, filter_name)
            .await?;
        let query = composer.compose(Some(&filter.query));
        self.publish_to_matching_devices(caller, gate, &query, request)
            .await
    }

    async fn publish_to_matching_devices(
        &self,
        caller: &CallerIdentity,
        gate: &PublishGate,
        query: &Query,
        request: &DispatchRequest,
    ) -> DomainResult<()> {
        let summary = self
            .pager
            .for_each_device(&caller.id, query, |device_id| async move {
                self.publish_to_device(caller, gate, &device_id, request)
                    .await
            })
            .await?;

        if summary.all_succeeded() {
            Ok(())
        } else {
            Err(DomainError::PartialPublishFailure {
                failed: summary.failed_devices,
                attempted: summary.devices_visited,
            })
        }
    }

    async fn publish_to_device(
        &self,
        caller: &CallerIdentity,
        gate: &PublishGate,
        device_id: &str,
        request: &DispatchRequest,
    ) -> DomainResult<()> {
        if device_id.trim().is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Device ID cannot be empty".to_string(),
            ));
        }

        gate.run(
            device_id,
            self.publisher
                .publish(caller, device_id, &request.message, request.retained),
        )
        .await
    }
}
