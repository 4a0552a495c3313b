//! Concurrent execution of conversion jobs
//!
//! # Layers
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  TaskQueue  │───▶│  WorkerPool  │───▶│  Converter   │
//! │             │    │              │    │              │
//! │ • task map  │    │ • OS threads │    │ • pandoc     │
//! │ • lifecycle │    │ • cap 1..=16 │    │   subprocess │
//! │ • events    │    │ • draining   │    │              │
//! └─────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! [`TaskQueue`] owns the per-task state machine and notifications. The pool
//! underneath only sees boxed closures; the actual work happens in a
//! [`Converter`](crate::pandoc::Converter).
//!
//! # Example
//!
//! ```rust,no_run
//! use pandoc_batch::formats::OutputFormat;
//! use pandoc_batch::job::ConversionJob;
//! use pandoc_batch::pandoc::ConversionService;
//! use pandoc_batch::parallel::{QueueEvent, TaskQueue};
//! use std::sync::Arc;
//!
//! let queue = TaskQueue::with_max_concurrent(Arc::new(ConversionService::default()), 2);
//! let events = queue.subscribe();
//! queue.add_task("intro", ConversionJob::new("intro.md", OutputFormat::Html));
//! queue.start();
//!
//! for event in events.iter() {
//!     if let QueueEvent::Finished { total, successful, .. } = event {
//!         println!("{successful}/{total} converted");
//!         break;
//!     }
//! }
//! ```

pub mod events;
pub mod pool;
pub mod queue;
pub mod single;

pub use events::QueueEvent;
pub use pool::WorkerPool;
pub use queue::{BatchTask, QueueSummary, TaskQueue, TaskStatus};
pub use single::{SingleConversion, WorkerEvent};

#[cfg(test)]
mod tests;
