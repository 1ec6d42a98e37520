// ABOUTME: Diagnostics accumulator for non-fatal warnings during reconciliation.
// ABOUTME: Collects warnings that shouldn't fail a run but should be shown to users.

/// Collects non-fatal warnings during a reconciliation run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

/// A non-fatal warning collected during reconciliation.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A container whose instance number could not be determined.
    pub fn unresolved_instance(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnresolvedInstance,
            message: message.into(),
        }
    }

    /// Two containers claiming the same service instance.
    pub fn duplicate_instance(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DuplicateInstance,
            message: message.into(),
        }
    }

    /// Best-effort cleanup of a failed blue-green replacement went wrong.
    pub fn swap_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SwapCleanup,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Container carries no usable instance number; it is torn down.
    UnresolvedInstance,
    /// Another container already claimed the instance; the extra is torn down.
    DuplicateInstance,
    /// A failed replacement container could not be removed.
    SwapCleanup,
}
