//! Hands a downloaded installer over to the platform.

use std::path::{Path, PathBuf};
use std::process::Command;

use updraft_core::UpdateError;

/// How a downloaded file gets installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    /// Run a command (msiexec, NSIS setup).
    Run { program: PathBuf, args: Vec<String> },
    /// Replace the running AppImage and optionally start the new one.
    ReplaceAppImage {
        source: PathBuf,
        target: PathBuf,
        relaunch: bool,
    },
    /// Open with the desktop's default handler (dmg, deb, rpm).
    Open(PathBuf),
}

/// Decides how to install `path`.
///
/// `running_appimage` is the path of the AppImage currently running (the
/// `APPIMAGE` variable), if any.
pub fn plan_install(
    path: &Path,
    silent: bool,
    force_run_after: bool,
    running_appimage: Option<PathBuf>,
) -> InstallPlan {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.ends_with(".msi") {
        let mut args = vec!["/i".to_string(), path.display().to_string()];
        if silent {
            args.push("/qn".to_string());
        }
        return InstallPlan::Run {
            program: PathBuf::from("msiexec"),
            args,
        };
    }

    if name.ends_with(".exe") {
        let mut args = Vec::new();
        if silent {
            args.push("/S".to_string());
        }
        if force_run_after {
            args.push("--force-run".to_string());
        }
        return InstallPlan::Run {
            program: path.to_path_buf(),
            args,
        };
    }

    if name.ends_with(".appimage") {
        if let Some(target) = running_appimage {
            return InstallPlan::ReplaceAppImage {
                source: path.to_path_buf(),
                target,
                relaunch: force_run_after,
            };
        }
    }

    InstallPlan::Open(path.to_path_buf())
}

/// Executes `plan`. Returns once the installer has been started.
pub fn execute(plan: &InstallPlan) -> Result<(), UpdateError> {
    match plan {
        InstallPlan::Run { program, args } => {
            tracing::info!(program = ?program, ?args, "Launching installer");
            Command::new(program)
                .args(args)
                .spawn()
                .map_err(|e| UpdateError::Library(format!("failed to launch installer: {}", e)))?;
        }
        InstallPlan::ReplaceAppImage {
            source,
            target,
            relaunch,
        } => {
            tracing::info!(source = ?source, target = ?target, "Replacing AppImage");
            std::fs::copy(source, target)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = std::fs::metadata(target)?.permissions();
                perms.set_mode(0o755);
                std::fs::set_permissions(target, perms)?;
            }
            if *relaunch {
                Command::new(target).spawn().map_err(|e| {
                    UpdateError::Library(format!("failed to relaunch application: {}", e))
                })?;
            }
        }
        InstallPlan::Open(path) => {
            tracing::info!(path = ?path, "Opening installer");
            open::that(path)?;
        }
    }
    Ok(())
}
