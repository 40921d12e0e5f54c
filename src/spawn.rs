//! Launching spawn effects as detached processes.

use std::process::{Child, Command};

use anyhow::{bail, Context, Result};

/// Build the command for an argv, expanding `~` in the program path
pub fn build_command(argv: &[String]) -> Result<Command> {
    let Some((program, args)) = argv.split_first() else {
        bail!("cannot spawn an empty command");
    };

    let expanded = shellexpand::tilde(program);
    let mut cmd = Command::new(&*expanded);
    cmd.args(args);

    // Detach from our process group so clients survive if we exit
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                // Create new session to detach from terminal
                libc::setsid();
                Ok(())
            });
        }
    }

    Ok(cmd)
}

/// Spawn a command line detached from this process
pub fn launch(argv: &[String]) -> Result<Child> {
    log::info!("Spawning {:?}", argv);
    let mut cmd = build_command(argv)?;
    cmd.spawn()
        .with_context(|| format!("Failed to spawn '{}'", argv[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(build_command(&[]).is_err());
    }

    #[test]
    fn test_build_command_expands_tilde() {
        let argv = vec!["~/bin/st".to_string(), "-w".to_string()];
        let cmd = build_command(&argv).unwrap();
        let program = cmd.get_program().to_string_lossy().into_owned();
        assert!(!program.starts_with('~') || dirs::home_dir().is_none());
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-w"]);
    }

    #[test]
    fn test_launch_runs_detached() {
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "exit 0".to_string()];
        let mut child = launch(&argv).unwrap();
        assert!(child.wait().unwrap().success());
    }

    #[test]
    fn test_launch_missing_program() {
        let argv = vec!["/nonexistent/tabkeys-client".to_string()];
        assert!(launch(&argv).is_err());
    }
}
