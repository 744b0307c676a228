//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Separator that marks a container name as a name path (`/web`).
pub const NAME_SEPARATOR: char = '/';

/// Default base directory for roster data when no home directory is known.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/roster";

/// Number of records evaluated between two cancellation checks while listing.
pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 256;

/// Tag assumed for image references that carry none.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Prefix of content-addressed image identifiers.
pub const IMAGE_DIGEST_PREFIX: &str = "sha256:";

/// Returns the data directory, preferring `$HOME/.roster` and falling back
/// to `/var/lib/roster`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".roster");
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default state file path under the session data directory.
pub fn default_state_file() -> PathBuf {
    data_dir().join("state.json")
}
