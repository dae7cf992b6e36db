pub mod deps;
pub mod notify;
pub mod retention;
pub mod scheduler;
pub mod selection;
pub mod supervisor;
pub mod types;

pub use deps::ScannerDeps;
pub use notify::{NotificationEmitter, StoreEmitter};
pub use scheduler::DeepGatherScheduler;
pub use selection::Selector;
pub use supervisor::Supervisor;
pub use types::{CycleStats, SweepReport};
