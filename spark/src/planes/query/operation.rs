/// What a read does when the fetch ends in an unauthorized failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnauthorizedBehavior {
    /// Surface the failure.
    #[default]
    Throw,
    /// Resolve the read with no value.
    ReturnNone,
}

/// Per-call-site read overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Attempt ceiling for this read; the cache default applies when unset.
    pub max_attempts: Option<u32>,
    pub on_unauthorized: UnauthorizedBehavior,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn on_unauthorized(mut self, behavior: UnauthorizedBehavior) -> Self {
        self.on_unauthorized = behavior;
        self
    }

    pub fn return_none_on_unauthorized(self) -> Self {
        self.on_unauthorized(UnauthorizedBehavior::ReturnNone)
    }
}
