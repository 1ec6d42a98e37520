// ABOUTME: Lifecycle actions the execution coordinator performs on instances.
// ABOUTME: Recorded per instance in the execution context's audit trail.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Run,
    Start,
    Restart,
    Stop,
    Kill,
    Remove,
    Attach,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Create => "create",
            Action::Run => "run",
            Action::Start => "start",
            Action::Restart => "restart",
            Action::Stop => "stop",
            Action::Kill => "kill",
            Action::Remove => "rm",
            Action::Attach => "attach",
        })
    }
}

/// One audited action against a named instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub instance: String,
    pub action: Action,
}
