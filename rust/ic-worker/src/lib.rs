//! The job-consuming worker process: registers one `JobHandler` per
//! ingestible entity and drives `ic_queue::WorkerRuntime` (C7, C8).

pub mod handlers;
pub mod line_protocol;
