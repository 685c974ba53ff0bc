use crate::domain::{
    ErrorPayload, Outcome, OutcomeCode, RequestEvent, ResponseEvent, ResponseObservation,
};
use crate::infra::Observer;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// One scripted harness interaction, applied after `delay` ticks of the pace.
#[derive(Clone, Debug)]
pub struct DemoStep {
    pub delay: u32,
    pub action: DemoAction,
}

#[derive(Clone, Debug)]
pub enum DemoAction {
    Request(RequestEvent),
    Response(ResponseEvent),
    Log(String),
}

fn step(delay: u32, action: DemoAction) -> DemoStep {
    DemoStep { delay, action }
}

fn request(delay: u32, event: RequestEvent) -> DemoStep {
    step(delay, DemoAction::Request(event))
}

fn respond(delay: u32, event: ResponseEvent) -> DemoStep {
    step(delay, DemoAction::Response(event))
}

fn log(delay: u32, line: &str) -> DemoStep {
    step(delay, DemoAction::Log(line.to_string()))
}

/// An order workflow: nested children, a timeout retried to success, a
/// suspended poller and a tail call into the notifier.
pub fn order_lineage() -> Vec<DemoStep> {
    vec![
        request(0, RequestEvent::root("order-1", "process_order")),
        log(1, "process_order: fanning out"),
        request(1, RequestEvent::child("order-1", "order-1", "order-1.inv", "reserve_inventory")),
        request(0, RequestEvent::child("order-1", "order-1", "order-1.pay", "charge_payment")),
        request(
            1,
            RequestEvent::child("order-1", "order-1.pay", "order-1.fraud", "fraud_check"),
        ),
        respond(2, ResponseEvent::outcome("order-1.inv", Outcome::exit(OutcomeCode::Ok))),
        respond(
            1,
            ResponseEvent::outcome("order-1.fraud", Outcome::exit(OutcomeCode::Timeout)),
        ),
        log(0, "fraud_check timed out; retrying"),
        request(
            3,
            RequestEvent::child("order-1", "order-1.pay", "order-1.fraud", "fraud_check"),
        ),
        respond(3, ResponseEvent::outcome("order-1.fraud", Outcome::exit(OutcomeCode::Ok))),
        respond(1, ResponseEvent::outcome("order-1.pay", Outcome::exit(OutcomeCode::Ok))),
        respond(1, ResponseEvent::outcome("order-1", Outcome::poll(OutcomeCode::Ok))),
        request(4, RequestEvent::root("order-1", "process_order")),
        respond(
            2,
            ResponseEvent::outcome(
                "order-1",
                Outcome::tail_call(OutcomeCode::Ok, "notify_customer"),
            ),
        ),
        request(1, RequestEvent::root("order-1", "notify_customer")),
        respond(3, ResponseEvent::outcome("order-1", Outcome::exit(OutcomeCode::Ok))),
        log(0, "order-1 complete"),
    ]
}

/// A report job with a deadline that runs out, and a fetch that fails
/// retryably before failing for good.
pub fn report_lineage(expires_at: SystemTime) -> Vec<DemoStep> {
    vec![
        request(
            2,
            RequestEvent::root("report-7", "build_report").with_expiration_time(expires_at),
        ),
        request(
            1,
            RequestEvent::child("report-7", "report-7", "report-7.fetch", "fetch_metrics"),
        ),
        respond(3, ResponseEvent::http_status("report-7.fetch", 503)),
        log(0, "fetch_metrics: upstream unavailable"),
        request(
            2,
            RequestEvent::child("report-7", "report-7", "report-7.fetch", "fetch_metrics"),
        ),
        respond(3, ResponseEvent::http_status("report-7.fetch", 404)),
        log(0, "fetch_metrics: giving up"),
    ]
}

/// A sync worker that hits a stale state, starts over and then fails with an
/// application error.
pub fn sync_lineage() -> Vec<DemoStep> {
    vec![
        request(3, RequestEvent::root("sync-3", "sync_accounts")),
        respond(2, ResponseEvent::failed("sync-3", "connection reset by peer")),
        request(2, RequestEvent::root("sync-3", "sync_accounts")),
        respond(
            2,
            ResponseEvent::outcome("sync-3", Outcome::exit(OutcomeCode::IncompatibleState)),
        ),
        log(0, "sync_accounts: worker state was stale, restarting"),
        request(2, RequestEvent::root("sync-3", "sync_accounts")),
        request(
            1,
            RequestEvent::child("sync-3", "sync-3", "sync-3.page", "fetch_page"),
        ),
        respond(2, ResponseEvent::outcome("sync-3.page", Outcome::exit(OutcomeCode::Ok))),
        respond(
            2,
            ResponseEvent::outcome(
                "sync-3",
                Outcome::exit_with_error(
                    OutcomeCode::PermanentError,
                    ErrorPayload::new("ValueError", "account 42 has no owner"),
                ),
            ),
        ),
    ]
}

pub fn apply_step(observer: &Observer, action: &DemoAction) {
    match action {
        DemoAction::Request(event) => {
            if let Err(error) = observer.observe_request(event) {
                tracing::warn!(%error, "demo request rejected");
            } else {
                tracing::debug!(id = %event.id, function = %event.function, "demo request");
            }
        }
        DemoAction::Response(event) => {
            if observer.observe_response(event) == ResponseObservation::UnknownDispatch {
                tracing::warn!(id = %event.id, "demo response for unknown dispatch");
            }
        }
        DemoAction::Log(line) => tracing::info!("{line}"),
    }
}

pub fn run_script(observer: &Observer, steps: &[DemoStep], pace: Duration) {
    for step in steps {
        if !pace.is_zero() && step.delay > 0 {
            std::thread::sleep(pace * step.delay);
        }
        apply_step(observer, &step.action);
    }
}

/// Starts one producer thread per lineage.
pub fn spawn_demo(observer: Arc<Observer>, pace: Duration) -> Vec<JoinHandle<()>> {
    let expires_at = SystemTime::now() + pace * 8;
    let lineages = [
        ("order", order_lineage()),
        ("report", report_lineage(expires_at)),
        ("sync", sync_lineage()),
    ];
    tracing::info!(lineages = lineages.len(), "starting demo producers");

    lineages
        .into_iter()
        .map(|(name, steps)| {
            let observer = observer.clone();
            std::thread::spawn(move || {
                run_script(&observer, &steps, pace);
                tracing::info!(lineage = name, "demo lineage finished");
            })
        })
        .collect()
}
