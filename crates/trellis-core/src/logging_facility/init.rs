//! Process-wide subscriber installation

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Output style of the installed subscriber
///
/// Selected from the `log_profile` configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Pretty text at `debug`
    #[default]
    Development,
    /// One JSON object per event at `info`
    Production,
    /// In-memory capture, see [`init_test_capture`](super::init_test_capture)
    Test,
}

impl Profile {
    fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "trellis=debug",
            Profile::Production | Profile::Test => "trellis=info",
        }
    }

    /// `RUST_LOG` wins over the profile's own level
    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INSTALLED: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has any effect. Text and JSON output go to stderr so
/// that stdout stays free for command results.
pub fn init(profile: Profile) {
    INSTALLED.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(profile.filter());
        match profile {
            Profile::Development => builder.init(),
            Profile::Production => builder.json().init(),
            Profile::Test => {
                super::test_capture::init_test_capture();
            }
        }
    });
}
