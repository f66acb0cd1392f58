//! Identifies this build to wallets and to the transaction gateway.

use git_version::git_version;
use target_info::Target;

lazy_static::lazy_static! {
    /// `VERSION` without the client tag, e.g. `v0.1.0-67da032+`.
    pub static ref SHORT_VERSION: String = VERSION.replace("SafeCli/", "");
}

pub const CLIENT_NAME: &str = "Safe CLI";

/// Tagged build version. A `+` marks a dirty tree and the commit is omitted when the
/// sources carry no git information, e.g. `SafeCli/v0.1.0-67da032+`.
pub const VERSION: &str = git_version!(
    args = ["--always", "--dirty=+", "--abbrev=7", "--match=no-release-tags"],
    prefix = "SafeCli/v0.1.0-",
    fallback = "SafeCli/v0.1.0"
);

/// Application label sent as part of the client description, e.g. `Safe CLI v0.1.0-67da032`.
pub fn client_app_name() -> String {
    format!("{} {}", CLIENT_NAME, SHORT_VERSION.as_str())
}

/// Platform label sent as part of the client description, e.g. `x86_64 (linux)`.
pub fn client_platform() -> String {
    format!("{} ({})", Target::arch(), Target::os())
}

#[cfg(test)]
mod test {
    use super::*;
    use regex::Regex;

    #[test]
    fn version_formatting() {
        let re = Regex::new(r"^SafeCli/v[0-9]+\.[0-9]+\.[0-9]+(-[[:xdigit:]]{7})?\+?$").unwrap();
        assert!(re.is_match(VERSION), "version doesn't match regex: {}", VERSION);
    }

    #[test]
    fn client_labels() {
        assert!(SHORT_VERSION.starts_with('v'));
        assert!(client_app_name().starts_with("Safe CLI v"));
        assert_eq!(client_platform(), format!("{} ({})", Target::arch(), Target::os()));
    }
}
