//! Centralized configuration constants for stranger-connect.
//!
//! All tunable parameters live here so they can be reviewed and adjusted
//! in a single place. Wire-format details (frame layout, close reasons)
//! stay in their respective modules.

use std::time::Duration;

// ── Identity ─────────────────────────────────────────────────────────────────

/// Prefix prepended to every identifier before it is registered with the
/// transport, isolating our names from other users of the same relays.
pub const APP_PREFIX: &str = "stranger_";

/// Minimum length of a sanitized identifier.
pub const MIN_IDENTITY_LEN: usize = 3;

// ── Transport ────────────────────────────────────────────────────────────────

/// ALPN spoken on every chat connection.
pub const CHAT_ALPN: &[u8] = b"stranger-connect/1";

/// How long the registration probe waits for an existing holder of the
/// same name to answer before the name is considered free.
pub const REGISTRATION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout waiting for the endpoint to reach its home relay.
pub const ONLINE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an inbound connection may take to introduce itself.
/// Connections that never send a hello (e.g. registration probes) are dropped.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period after sending `bye` before the connection is torn down,
/// giving the remote a chance to read it.
pub const BYE_GRACE: Duration = Duration::from_secs(1);

/// Largest frame accepted from a peer (64 KiB).
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Number of port-binding attempts when starting the endpoint.
pub const PORT_RETRY_ATTEMPTS: u16 = 10;

// ── Contacts ─────────────────────────────────────────────────────────────────

/// File (storage key) holding the contact list, inside the data directory.
pub const CONTACTS_FILE: &str = "stranger_contacts.json";

// ── Offline shell ────────────────────────────────────────────────────────────

/// Versioned name of the asset cache. Bump the suffix to force a reinstall.
pub const CACHE_NAME: &str = "stranger-connect-v1";

/// Static resources cached at install time. Relative entries are resolved
/// against the configured shell origin; absolute ones are fetched verbatim.
pub const SHELL_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./script.js",
    "./icon.png",
    "https://unpkg.com/peerjs@1.5.2/dist/peerjs.min.js",
    "https://fonts.googleapis.com/css2?family=Outfit:wght@300;400;600&display=swap",
];

/// Default origin relative shell assets are resolved against.
pub const DEFAULT_SHELL_ORIGIN: &str = "http://localhost:8080/";

/// Timeout for a single asset download.
pub const ASSET_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

// ── UI / Misc ────────────────────────────────────────────────────────────────

/// How long a toast notification stays visible.
pub const TOAST_TTL: Duration = Duration::from_secs(3);

/// Maximum log entries kept in the in-memory ring buffer.
pub const MAX_LOG_ENTRIES: usize = 500;
