/// The three series every run records. The string form names the persisted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    /// One-minute load average of the target.
    Cpu,
    /// Available memory of the target, in kB.
    Mem,
    /// Round-trip time of a health request, in milliseconds.
    Latency,
}

impl Metric {
    /// Persist order. `Latency` is last because its record marks the run complete.
    pub const ALL: [Metric; 3] = [Metric::Cpu, Metric::Mem, Metric::Latency];

    pub fn record_file_name(self) -> String {
        format!("{self}.txt")
    }

    pub fn plot_file_name(self) -> String {
        format!("{self}_plot.png")
    }
}
