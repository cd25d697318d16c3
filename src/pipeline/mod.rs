pub mod commit;
pub mod job_runner;
pub mod orchestrator;
pub mod page_processor;
