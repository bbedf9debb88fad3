pub mod alerts;
pub use alerts::{AlertCycle, CycleReport, SearchOutcome, StopFlag};

pub mod dedup;
pub use dedup::{DedupStore, SeaOrmDedupStore, StoreError};

pub mod email;

pub mod notifier;
pub use notifier::{AlertMessage, DeliveryError, EmailNotifier, LogNotifier, Notifier};

pub mod search;
pub use search::{CliSearchExecutor, ExecutionError, SearchExecutor};

pub mod selector;
