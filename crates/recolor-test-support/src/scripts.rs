//! Fake worker executables written as POSIX shell scripts.
//!
//! Scripts are run through `sh <script>` so tests never exec a freshly written file,
//! and follow the worker contract: `<input> <output_dir>` as the last two arguments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// File [`FakeWorker::fork_and_wait`] writes its forked pid to.
pub const SLEEPER_PID_FILE: &str = "sleeper.pid";

/// A shell script on disk, removed when dropped.
#[derive(Debug)]
pub struct FakeWorker {
    _dir: TempDir,
    path: PathBuf,
}

impl FakeWorker {
    /// Copy the input into the output directory under the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn copy_input() -> io::Result<Self> {
        Self::write(
            r#"in="$1"
out="$2"
echo "colorizing $in"
cp "$in" "$out/$(basename "$in")"
"#,
        )
    }

    /// Write `contents` as the output for every input.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn write_output(contents: &str) -> io::Result<Self> {
        Self::write(&format!(
            r#"printf '%s' '{contents}' > "$2/$(basename "$1")"
"#
        ))
    }

    /// Exit with `code` after printing a failure line to stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn exit_with(code: i32) -> io::Result<Self> {
        Self::write(&format!(
            r#"echo "colorization failed for $1" >&2
exit {code}
"#
        ))
    }

    /// Exit 0 without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn succeed_without_output() -> io::Result<Self> {
        Self::write("echo \"nothing to do\"\nexit 0\n")
    }

    /// Sleep for `secs` seconds, replacing the shell so a kill reaches the sleeper.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn sleep_for(secs: u64) -> io::Result<Self> {
        Self::write(&format!("exec sleep {secs}\n"))
    }

    /// Fork a `sleep secs` child, record its pid in `<output_dir>/sleeper.pid`, then wait
    /// on it, the way a wrapper such as `conda run` waits on the real worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn fork_and_wait(secs: u64) -> io::Result<Self> {
        Self::write(&format!(
            r#"sleep {secs} &
echo "$!" > "$2/{SLEEPER_PID_FILE}"
wait
"#
        ))
    }

    /// Print `lines` lines to stderr, then copy the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    pub fn noisy(lines: u32) -> io::Result<Self> {
        Self::write(&format!(
            r#"i=0
while [ "$i" -lt {lines} ]; do
  echo "progress line $i of {lines}" >&2
  i=$((i + 1))
done
cp "$1" "$2/$(basename "$1")"
"#
        ))
    }

    /// Script location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Script location as an argument string.
    #[must_use]
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    fn write(body: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("recolor-worker-")
            .tempdir()?;
        let path = dir.path().join("worker.sh");
        fs::write(&path, format!("#!/bin/sh\nset -e\n{body}"))?;
        Ok(Self { _dir: dir, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_written_with_shebang() -> io::Result<()> {
        let worker = FakeWorker::exit_with(3)?;
        let contents = fs::read_to_string(worker.path())?;
        assert!(contents.starts_with("#!/bin/sh\n"));
        assert!(contents.contains("exit 3"));
        assert!(worker.path_str().ends_with("worker.sh"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn copy_input_honours_worker_contract() -> io::Result<()> {
        let worker = FakeWorker::copy_input()?;
        let temp = TempDir::new()?;
        let input = temp.path().join("42.png");
        let output = temp.path().join("generated");
        fs::create_dir(&output)?;
        fs::write(&input, b"pixels")?;

        let status = std::process::Command::new("sh")
            .arg(worker.path())
            .arg(&input)
            .arg(&output)
            .status()?;
        assert!(status.success());
        assert_eq!(fs::read(output.join("42.png"))?, b"pixels");
        Ok(())
    }
}
