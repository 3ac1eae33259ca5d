use axum::{extract::State, response::IntoResponse};

use wicket_common::MetricsSnapshot;

use crate::state::AppState;

pub fn render_metrics(snap: &MetricsSnapshot) -> String {
    let mut body = String::new();

    body.push_str(&format!(
        "# HELP wicket_requests_total Total requests accepted by the scheduler.\n\
         # TYPE wicket_requests_total counter\n\
         wicket_requests_total {}\n",
        snap.total,
    ));
    body.push_str(&format!(
        "# HELP wicket_requests_completed Requests that finished successfully.\n\
         # TYPE wicket_requests_completed counter\n\
         wicket_requests_completed {}\n",
        snap.completed,
    ));
    body.push_str(&format!(
        "# HELP wicket_requests_failed Requests that failed (process, max-turns, internal).\n\
         # TYPE wicket_requests_failed counter\n\
         wicket_requests_failed {}\n",
        snap.failed,
    ));
    body.push_str(&format!(
        "# HELP wicket_requests_timed_out Requests that hit the queue or execution deadline.\n\
         # TYPE wicket_requests_timed_out counter\n\
         wicket_requests_timed_out {}\n",
        snap.timed_out,
    ));
    body.push_str(&format!(
        "# HELP wicket_requests_queue_rejected Requests rejected because the queue was full.\n\
         # TYPE wicket_requests_queue_rejected counter\n\
         wicket_requests_queue_rejected {}\n",
        snap.queue_rejected,
    ));
    body.push_str(&format!(
        "# HELP wicket_active_children Child processes currently running.\n\
         # TYPE wicket_active_children gauge\n\
         wicket_active_children {}\n",
        snap.active,
    ));
    body.push_str(&format!(
        "# HELP wicket_queued_requests Requests currently waiting for a slot.\n\
         # TYPE wicket_queued_requests gauge\n\
         wicket_queued_requests {}\n",
        snap.queued,
    ));
    body.push_str(&format!(
        "# HELP wicket_input_tokens_total Input tokens reported by the CLI.\n\
         # TYPE wicket_input_tokens_total counter\n\
         wicket_input_tokens_total {}\n",
        snap.tokens.input,
    ));
    body.push_str(&format!(
        "# HELP wicket_output_tokens_total Output tokens reported by the CLI.\n\
         # TYPE wicket_output_tokens_total counter\n\
         wicket_output_tokens_total {}\n",
        snap.tokens.output,
    ));
    body.push_str(&format!(
        "# HELP wicket_latency_avg_ms Mean latency over the recent window.\n\
         # TYPE wicket_latency_avg_ms gauge\n\
         wicket_latency_avg_ms {}\n",
        snap.latency.avg_ms,
    ));
    body.push_str(&format!(
        "# HELP wicket_latency_p95_ms 95th-percentile latency over the recent window.\n\
         # TYPE wicket_latency_p95_ms gauge\n\
         wicket_latency_p95_ms {}\n",
        snap.latency.p95_ms,
    ));

    body
}

pub async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    let snap = st.scheduler.snapshot_metrics().await;
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        render_metrics(&snap),
    )
}
