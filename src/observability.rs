use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::protocol::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "allot_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "allot_request_duration_seconds";

// ── Allocation outcomes ─────────────────────────────────────────

/// Counter: zone allocation attempts. Labels: outcome (accepted, exhausted).
pub const ZONE_ALLOCATIONS_TOTAL: &str = "allot_zone_allocations_total";

/// Counter: slot reservation attempts. Labels: outcome (accepted, full).
pub const SLOT_RESERVATIONS_TOTAL: &str = "allot_slot_reservations_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: current utilization per zone. Labels: zone.
pub const ZONE_UTILIZATION: &str = "allot_zone_utilization";

/// Gauge: current booked count per slot. Labels: slot.
pub const SLOT_BOOKED: &str = "allot_slot_booked";

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "allot_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "allot_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "allot_connections_rejected_total";

/// Install the log subscriber. `RUST_LOG` wins over the default `info` level.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a request to a short label for metrics.
pub fn request_label(req: &Request) -> &'static str {
    match req {
        Request::PlaceOrder(_) => "place_order",
        Request::UpdateOrderStatus { .. } => "update_order_status",
        Request::ScheduleAppointment { .. } => "schedule_appointment",
        Request::CancelAssignment { .. } => "cancel_assignment",
        Request::GetOrder { .. } => "get_order",
        Request::GetAssignment { .. } => "get_assignment",
        Request::ListZones => "list_zones",
        Request::ListSlots { .. } => "list_slots",
    }
}
