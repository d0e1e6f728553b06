use crate::api_client::{HealthReport, QueueSize};

pub fn queue_size(agent_id: &str, size: &QueueSize) {
    println!("queue for {agent_id}");
    println!("  pending      {}", size.pending);
    println!("  processing   {}", size.processing);
    println!("  dead letter  {}", size.dead_letter);
    println!("  total        {}", size.total);
}

pub fn health(report: &HealthReport) {
    println!("status: {} ({} samples in history)", report.status, report.sample_count);
    for probe in &report.probes {
        match &probe.error {
            Some(error) => println!("  {:<16} {:<8} {}ms  {error}", probe.name, probe.status, probe.latency_ms),
            None => println!("  {:<16} {:<8} {}ms", probe.name, probe.status, probe.latency_ms),
        }
    }
}
