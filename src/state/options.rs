use std::sync::Arc;

use crate::filter::PathFilter;
use crate::prefix::NormalizedPrefix;

/// Where and what a committed session uploads.
///
/// Both capabilities are optional. An implementation that leaves either
/// method at its default uploads at the root of the key space or uploads
/// every staged file, respectively.
pub trait SaveOptions {
    /// The prefix under which staged files are stored.
    fn prefix(&self) -> Option<&NormalizedPrefix> {
        None
    }

    /// The filter staged files must match to be uploaded.
    fn filter(&self) -> Option<&dyn PathFilter> {
        None
    }
}

/// No prefix, no filter.
impl SaveOptions for () {}

/// Plain save options.
#[derive(Clone, Default)]
pub struct StateOptions {
    pub prefix: Option<NormalizedPrefix>,
    pub filter: Option<Arc<dyn PathFilter>>,
}

impl StateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: NormalizedPrefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn PathFilter>) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl SaveOptions for StateOptions {
    fn prefix(&self) -> Option<&NormalizedPrefix> {
        self.prefix.as_ref()
    }

    fn filter(&self) -> Option<&dyn PathFilter> {
        self.filter.as_deref()
    }
}

impl std::fmt::Debug for StateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateOptions")
            .field("prefix", &self.prefix)
            .field("filter", &self.filter.as_ref().map(|_| "<filter>"))
            .finish()
    }
}
