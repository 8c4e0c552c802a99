//! Shared constants for end-to-end tests

// ============================================================================
// Test Users
// ============================================================================

/// Email of the regular test user
pub const TEST_EMAIL: &str = "listener@example.com";

/// Display name of the regular test user
pub const TEST_NAME: &str = "Test Listener";

/// Email of a second user, for isolation checks
#[allow(dead_code)]
pub const OTHER_EMAIL: &str = "other@example.com";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// HTTP request timeout for test client (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Composition
// ============================================================================

/// Poll interval used by the test server's composer (milliseconds)
pub const TEST_POLL_INTERVAL_MS: u64 = 10;

/// Poll budget used by the test server's composer
pub const TEST_MAX_ATTEMPTS: u32 = 5;
