//! Integration tests for the S3 object store adapter
//!
//! Each test runs the real SDK client against a wiremock server speaking
//! the S3 REST protocol with path-style addressing.

mod common;

mod test_exists;
mod test_put_list_delete;
