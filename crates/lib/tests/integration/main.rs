
mod builder_tests;
mod concurrency_tests;
