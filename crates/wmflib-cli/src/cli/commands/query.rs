//! `wmflib prometheus` and `wmflib thanos` – run instant queries.

use anyhow::Result;
use wmflib::prometheus::{Prometheus, QueryOptions, Sample, Thanos};
use wmflib::settings::WmflibConfig;

pub fn run_prometheus(cfg: &WmflibConfig, query: &str, site: &str, instance: &str) -> Result<()> {
    let session = cfg.http.session("wmflib-cli")?;
    let prometheus = Prometheus::with_session(session, &cfg.prometheus.url_template);
    let options = QueryOptions {
        instance: instance.to_string(),
        ..Default::default()
    };
    print_samples(&prometheus.query_with(query, site, &options)?);
    Ok(())
}

pub fn run_thanos(cfg: &WmflibConfig, query: &str) -> Result<()> {
    let session = cfg.http.session("wmflib-cli")?;
    let thanos = Thanos::with_session(session, &cfg.thanos.endpoint);
    print_samples(&thanos.query(query)?);
    Ok(())
}

fn print_samples(samples: &[Sample]) {
    if samples.is_empty() {
        println!("No results.");
        return;
    }
    for sample in samples {
        println!("{}", format_sample(sample));
    }
}

/// `{label="value", ...} value` like the Prometheus console.
fn format_sample(sample: &Sample) -> String {
    let labels: Vec<String> = sample
        .metric
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect();
    let value = match (&sample.value, &sample.values) {
        (Some((_, v)), _) => v.clone(),
        (None, Some(values)) => values
            .iter()
            .map(|(ts, v)| format!("{v} @{ts}"))
            .collect::<Vec<_>>()
            .join(", "),
        (None, None) => "-".to_string(),
    };
    format!("{{{}}} {}", labels.join(", "), value)
}
