use std::fmt;

const RUNNING_HEADER: &str = "-------------------------PING SUMMARY------------------------";
const RUNNING_FOOTER: &str = "-------------------------------------------------------------";
const FINAL_HEADER: &str = "-------------------------FINAL PING SUMMARY------------------------";
const FINAL_FOOTER: &str = "-------------------------------------------------------------------";

/// Counters of one ping session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionCounters {
    pub packets_sent: u32,
    pub packets_received: u32,
    pub rtt_sum: f64,
    pub anomaly_count: u32,
}

impl SessionCounters {
    /// Lost share of sent requests in whole percent, truncated. Zero before
    /// the first request.
    pub fn loss_percent(&self) -> u64 {
        if self.packets_sent == 0 {
            return 0;
        }
        let lost = u64::from(self.packets_sent.saturating_sub(self.packets_received));
        100 * lost / u64::from(self.packets_sent)
    }

    /// Mean of the non-anomalous RTTs in milliseconds, or zero if there are none.
    pub fn average_rtt(&self) -> f64 {
        match self.packets_received.checked_sub(self.anomaly_count) {
            Some(valid) if valid > 0 => self.rtt_sum / f64::from(valid),
            _ => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryKind {
    Running,
    Final,
}

impl SummaryKind {
    fn border(self) -> (&'static str, &'static str) {
        match self {
            SummaryKind::Running => (RUNNING_HEADER, RUNNING_FOOTER),
            SummaryKind::Final => (FINAL_HEADER, FINAL_FOOTER),
        }
    }
}

/// A formatted statistics block.
pub struct Summary<'a> {
    pub counters: &'a SessionCounters,
    pub kind: SummaryKind,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (header, footer) = self.kind.border();
        let counters = self.counters;
        writeln!(f)?;
        writeln!(f, "{header}")?;
        writeln!(
            f,
            "{} packets sent, {} received , {}% lost, average RTT = {:.6}",
            counters.packets_sent,
            counters.packets_received,
            counters.loss_percent(),
            counters.average_rtt()
        )?;
        writeln!(f, "{footer}")?;
        writeln!(f)
    }
}

pub fn summary(counters: &SessionCounters, kind: SummaryKind) -> String {
    Summary { counters, kind }.to_string()
}
