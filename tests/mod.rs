mod common;
mod rabbitmq_tests;
