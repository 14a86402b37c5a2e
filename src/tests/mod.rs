mod support;

mod limit_tests;
mod sibling_field_tests;
