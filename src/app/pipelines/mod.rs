pub mod did_pipeline;

pub use did_pipeline::DidPipeline;
