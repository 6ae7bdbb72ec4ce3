//! One full run: probe, then report.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use httpcheck_core::{CheckConfig, Outcome, Settings, DEFAULT_TOPIC};
use httpcheck_probe::{HttpGetter, ProbePolicy, Prober, ReqwestGetter};
use httpcheck_report::{
    KafkaPublisher, MemoryPublisher, Publisher, Reporter, DEFAULT_DRAIN_TIMEOUT,
};

/// Build the HTTP client and the event sink for `settings`, then run the
/// check.
///
/// With `dry_run` the event is written to `out` as one JSON line instead
/// of going to Kafka. Everything that can fail without touching the
/// target is checked before the first request.
pub async fn execute<W: Write>(
    settings: &Settings,
    dry_run: bool,
    out: &mut W,
) -> anyhow::Result<Outcome> {
    let check = &settings.check;
    let kafka = match (&settings.kafka, dry_run) {
        (_, true) => None,
        (Some(kafka), false) => Some(kafka),
        (None, false) => anyhow::bail!("KAFKA_BOOTSTRAP_SERVERS is not set"),
    };
    info!(
        name = %check.name,
        uri = %check.uri,
        retries = check.num_retries,
        sla = ?check.response_time_sla,
        use_ssl = check.use_ssl,
        dry_run,
        "starting HTTP check"
    );

    let policy = ProbePolicy::default();
    let getter =
        ReqwestGetter::new(check.use_ssl, policy.attempt_timeout).context("building HTTP client")?;
    let prober = Prober::with_policy(getter, policy);

    let Some(kafka) = kafka else {
        let topic = settings
            .kafka
            .as_ref()
            .map(|kafka| kafka.topic.clone())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let reporter = Reporter::new(MemoryPublisher::new(), topic);
        let outcome = run_check(check, &prober, &reporter).await?;
        for message in reporter.publisher().messages() {
            writeln!(out, "{}", String::from_utf8_lossy(&message.payload))
                .context("writing event")?;
        }
        return Ok(outcome);
    };

    let publisher =
        KafkaPublisher::new(kafka, DEFAULT_DRAIN_TIMEOUT).context("creating Kafka producer")?;
    let reporter = Reporter::new(publisher, kafka.topic.clone());

    let outcome = run_check(check, &prober, &reporter).await?;
    info!("check result sent to Kafka successfully");
    Ok(outcome)
}

/// Probe the target, then publish the result.
///
/// Returns the outcome whether or not the target was healthy. Only a
/// failed publish is an error.
pub async fn run_check<G, P>(
    config: &CheckConfig,
    prober: &Prober<G>,
    reporter: &Reporter<P>,
) -> anyhow::Result<Outcome>
where
    G: HttpGetter,
    P: Publisher,
{
    let report = prober.run(config).await;
    let outcome = report.outcome;
    info!(
        name = %config.name,
        succeeded = outcome.succeeded,
        status = %outcome.final_status_code,
        attempts = outcome.attempts_made,
        elapsed = ?outcome.final_elapsed,
        "probe finished"
    );

    reporter
        .publish(config, &outcome)
        .await
        .with_context(|| format!("publishing check result to topic {}", reporter.topic()))?;

    Ok(outcome)
}
