use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub transitions_total: IntCounterVec,
    pub payout_overrides_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("bookings_transitions_total", "Transition commands by outcome"),
            &["command", "result"], // result: success|rejected|error
        )?;

        let payout_overrides_total = IntCounter::with_opts(Opts::new(
            "bookings_payout_overrides_total",
            "Payouts marked paid before the booking was ready for payout",
        ))?;

        registry.register(Box::new(transitions_total.clone()))?;
        registry.register(Box::new(payout_overrides_total.clone()))?;

        Ok(Self {
            registry,
            transitions_total,
            payout_overrides_total,
        })
    }

    pub fn record(&self, command: &str, result: &str) {
        self.transitions_total
            .with_label_values(&[command, result])
            .inc();
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&mf, &mut buf)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record("confirm_deposit", "success");
        metrics.payout_overrides_total.inc();

        let body = metrics.render().unwrap();
        assert!(body.contains("bookings_transitions_total"));
        assert!(body.contains("command=\"confirm_deposit\""));
        assert!(body.contains("bookings_payout_overrides_total 1"));
    }
}
