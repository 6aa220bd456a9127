//! Test registry - all test cases are registered here

pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Each test:
/// 1. Queues a mock upstream response (what the processing service would return)
/// 2. Uploads files to the REAL relay
/// 3. Validates the relay response, what upstream received, and the upload dir
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Success path ──────────────────────────────────────────────────────
        test!(
            "upload/health",
            "Relay answers its own /health with OK",
            upload::test_health
        ),
        test!(
            "upload/two_files_png_verbatim",
            "Two files in, upstream PNG bytes out unchanged with image/png",
            upload::test_two_files_png_verbatim
        ),
        test!(
            "upload/filenames_and_contents_forwarded",
            "Upstream receives every file under `files` with its original name",
            upload::test_filenames_and_contents_forwarded
        ),
        test!(
            "upload/zero_files_forwarded",
            "An empty upload still produces exactly one upstream call",
            upload::test_zero_files_forwarded
        ),
        test!(
            "upload/other_fields_dropped",
            "Parts outside the `files` field are not forwarded",
            upload::test_other_fields_dropped
        ),
        test!(
            "upload/text_under_files_dropped",
            "A text field named `files` is not forwarded as a file",
            upload::test_text_under_files_dropped
        ),
        test!(
            "upload/concurrent_requests",
            "Concurrent uploads each get their own upstream response",
            upload::test_concurrent_requests
        ),
        test!(
            "upload/staged_files_removed",
            "No staged files remain after a successful relay",
            upload::test_staged_files_removed
        ),

        // ── Failure path ──────────────────────────────────────────────────────
        test!(
            "failure/upstream_4xx",
            "Upstream rejection becomes a 500 with {message, error}",
            failure::test_upstream_client_error
        ),
        test!(
            "failure/upstream_5xx",
            "Upstream crash becomes a 500 with {message, error}",
            failure::test_upstream_server_error
        ),
        test!(
            "failure/staged_files_removed",
            "No staged files remain after a failed relay",
            failure::test_staged_files_removed_after_failure
        ),
        test!(
            "failure/not_multipart",
            "A non-multipart body is rejected without calling upstream",
            failure::test_not_multipart
        ),
    ]
}
