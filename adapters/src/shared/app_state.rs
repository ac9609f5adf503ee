use std::sync::Arc;

use orchestrator_application::batch_tracker::service::BatchTrackerService;
use orchestrator_application::dispatch::service::DispatchPipeline;
use orchestrator_application::guard_config::service::GuardConfigService;
use orchestrator_application::infrastructure_config::Config;
use orchestrator_application::ingress::service::IngressRouter;
use orchestrator_application::lockout::service::LockoutService;
use orchestrator_application::orchestrator::service::OrchestratorService;
use orchestrator_application::ports::outgoing::store::DynProjectSessionStorePort;
use orchestrator_application::preview::service::PreviewProtocol;
use orchestrator_application::repair::service::RepairService;
use orchestrator_application::slaves::service::SlavesService;

use crate::incoming::http_axum::middleware::rate_limit::{
    RateLimiter, create_http_rate_limiter, create_worker_rate_limiter,
};
use crate::outgoing::registry_tokio::registry::TokioRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Held concrete (not just as the `DynRegistryPort` the core services
    /// see) so the WS endpoint layer can call the connection-attachment
    /// methods that are not part of the core-facing trait.
    pub registry: Arc<TokioRegistry>,
    pub store: DynProjectSessionStorePort,
    pub orchestrator: Arc<OrchestratorService>,
    pub slaves: Arc<SlavesService>,
    pub guard_config: Arc<GuardConfigService>,
    pub repair: Arc<RepairService>,
    pub ingress: Arc<IngressRouter>,
    pub http_rate_limiter: Option<Arc<RateLimiter>>,
    pub worker_rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<Config>, store: DynProjectSessionStorePort) -> Self {
        let registry = Arc::new(TokioRegistry::new(
            config.worker_ws.clone(),
            config.ui_ws.clone(),
            config.dispatch.compression_threshold_bytes,
        ));
        let registry_port = Arc::clone(&registry) as orchestrator_application::ports::outgoing::registry::DynRegistryPort;

        let lockout = Arc::new(LockoutService::new());
        let batch_tracker = Arc::new(BatchTrackerService::new());
        let guard_config = Arc::new(GuardConfigService::new(Arc::clone(&registry_port)));
        let preview_protocol = Arc::new(PreviewProtocol::new(Arc::clone(&registry_port)));
        let dispatch = Arc::new(DispatchPipeline::new(
            Arc::clone(&registry_port),
            Arc::clone(&batch_tracker),
            config.dispatch.clone(),
        ));
        let repair = Arc::new(RepairService::new(
            Arc::clone(&registry_port),
            Arc::clone(&lockout),
            Arc::clone(&preview_protocol),
            Arc::clone(&guard_config),
        ));
        let slaves = Arc::new(SlavesService::new(Arc::clone(&registry_port)));
        let ingress = Arc::new(IngressRouter::new(
            Arc::clone(&registry_port),
            Arc::clone(&lockout),
            Arc::clone(&batch_tracker),
            Arc::clone(&guard_config),
        ));
        let orchestrator = Arc::new(OrchestratorService::new(
            Arc::clone(&store),
            Arc::clone(&registry_port),
            lockout,
            batch_tracker,
            preview_protocol,
            dispatch,
            Arc::clone(&guard_config),
            config.dispatch.clone(),
        ));

        let http_rate_limiter = config.rate_limit.enabled.then(|| create_http_rate_limiter(&config.rate_limit));
        let worker_rate_limiter = config.rate_limit.enabled.then(|| create_worker_rate_limiter(&config.rate_limit));

        Self {
            config,
            registry,
            store,
            orchestrator,
            slaves,
            guard_config,
            repair,
            ingress,
            http_rate_limiter,
            worker_rate_limiter,
        }
    }
}
