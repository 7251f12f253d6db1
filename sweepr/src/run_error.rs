use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    /// Plan problems are the operator's to fix; everything else is a runtime failure.
    pub fn from_core(err: sweepr_core::Error, context: String) -> Self {
        let invalid = matches!(
            err,
            sweepr_core::Error::InvalidPlan(_) | sweepr_core::Error::PlanParse(_)
        );
        let err = anyhow::Error::new(err).context(context);
        if invalid {
            Self::InvalidInput(err)
        } else {
            Self::RuntimeError(err)
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => Some(e.as_ref()),
        }
    }
}
