//! Packaged-build detection.

use std::path::{Component, Path};

/// Whether the running executable is a distributed build.
///
/// Debug builds and binaries started from a cargo `target/` directory are
/// development runs.
pub fn is_packaged() -> bool {
    match std::env::current_exe() {
        Ok(exe) => is_packaged_exe(&exe, cfg!(debug_assertions)),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot locate executable, assuming development build");
            false
        }
    }
}

/// Decides packaging from the executable path and build profile.
pub fn is_packaged_exe(exe: &Path, debug_build: bool) -> bool {
    if debug_build {
        return false;
    }
    !exe.components()
        .any(|c| matches!(c, Component::Normal(name) if name == "target"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_builds_are_not_packaged() {
        assert!(!is_packaged_exe(Path::new("/opt/updraft/updraft"), true));
    }

    #[test]
    fn cargo_target_dir_is_not_packaged() {
        assert!(!is_packaged_exe(
            Path::new("/home/dev/updraft/target/release/updraft"),
            false
        ));
    }

    #[test]
    fn installed_binary_is_packaged() {
        assert!(is_packaged_exe(Path::new("/opt/updraft/updraft"), false));
        assert!(is_packaged_exe(
            Path::new("/usr/share/targets-app/updraft"),
            false
        ));
    }
}
