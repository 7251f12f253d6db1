#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The sweep finished, but one or more runs failed or it was interrupted.
    RunsFailed = 10,

    /// Invalid CLI flags or an unreadable/invalid plan.
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, instance control failures at sweep start).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_report(report: &sweepr_core::SweepReport) -> Self {
        if report.is_clean() {
            Self::Success
        } else {
            Self::RunsFailed
        }
    }
}
