//! Unit test modules.

mod course_pipeline_test;
mod rider_model_test;
