mod crawl_tests;
mod scheduler_tests;
