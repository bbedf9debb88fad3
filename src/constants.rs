pub mod defaults {

    pub const SEARCH_PROGRAM: &str = "jobseek-expat";

    pub const COUNTRY: &str = "Germany";

    pub const HOURS_OLD: u32 = 24;

    /// Used when a saved search does not say how many results it wants.
    pub const RESULTS_WANTED: u32 = 10;

    /// Passed to the search CLI when the requested count is zero.
    pub const RESULTS_WANTED_FALLBACK: u32 = 30;
}

pub mod email {

    pub const FALLBACK_TITLE: &str = "Job Opening";

    pub const FALLBACK_COMPANY: &str = "Unknown Company";

    /// Postings echoed by the log-only notifier.
    pub const LOG_PREVIEW_POSTINGS: usize = 5;
}

pub mod limits {

    pub const DEFAULT_HISTORY_LIMIT: u64 = 20;
}
