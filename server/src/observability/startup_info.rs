use orchestrator_application::infrastructure_config::{Config, GuardDefaultsConfig, RateLimitConfig};
use tracing::info;

pub fn print_api_info(config: &Config) {
    print_configuration_info(config);
    print_rate_limiting_info(config);
}

fn print_configuration_info(config: &Config) {
    info!("Configuration:");
    print_database_configuration();
    print_dispatch_configuration(config);
    print_guard_configuration(&config.guard);
}

fn print_database_configuration() {
    info!("  Database: PostgreSQL with connection pooling");
}

fn print_dispatch_configuration(config: &Config) {
    info!(
        "  Dispatch: inter-tile delay {}-{}s, round retry deadline {}s, one-batch retry deadline {}s",
        config.dispatch.inter_tile_delay_min_secs,
        config.dispatch.inter_tile_delay_max_secs,
        config.dispatch.round_retry_deadline_secs,
        config.dispatch.one_batch_retry_deadline_secs,
    );
    info!(
        "  Compression threshold: {} bytes",
        config.dispatch.compression_threshold_bytes
    );
}

fn print_guard_configuration(guard: &GuardDefaultsConfig) {
    info!(
        "  Guard defaults: pattern={}, pixels/batch={}, recent-lock={}s, max-retries={}",
        guard.protection_pattern, guard.pixels_per_batch, guard.recent_lock_seconds, guard.max_retries
    );
}

fn print_rate_limiting_info(config: &Config) {
    if config.rate_limit.enabled {
        info!("  Rate limiting: ENABLED");
        print_rate_limits(&config.rate_limit);
    } else {
        info!("  Rate limiting: DISABLED");
    }
}

fn print_rate_limits(rate_limit: &RateLimitConfig) {
    info!(
        "    HTTP: {}/min per IP (burst: {})",
        rate_limit.http_requests_per_minute,
        rate_limit.http_requests_per_minute * rate_limit.burst_size_multiplier
    );
    info!(
        "    Worker messages: {}/min per IP (burst: {})",
        rate_limit.worker_messages_per_minute,
        rate_limit.worker_messages_per_minute * rate_limit.burst_size_multiplier
    );
}
