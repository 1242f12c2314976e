//! Build pipeline for the function artifact.
//!
//! The pipeline is a fixed sequence of stages:
//! `clean` → [`build-artifact`, `install-dependencies`] → `test` → `package`.
//! The two middle stages have no ordering dependency and run concurrently;
//! every other stage waits for its predecessors. The first failing stage
//! aborts the flow, and a failed run is retried from `clean` — there is no
//! partial-completion checkpointing.

use crate::error::DeployError;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Directory holding the function sources
const SOURCE_DIR: &str = "src";
/// Directory the build output is staged in
const DIST_DIR: &str = "dist";
/// Name of the packaged artifact
const ARCHIVE_NAME: &str = "dist.zip";
/// Local environment definition shipped inside the artifact
const ENV_FILE: &str = ".env";
/// Dependency manifest copied next to the built sources
const MANIFEST: &str = "package.json";

/// `Workspace` is the function project directory the pipeline operates on.
///
/// The external commands the stages shell out to are plain fields so tests
/// can swap them for stubs.
pub struct Workspace {
    root: PathBuf,
    /// Minifier invoked per source file as `<command..> <input> -o <output>`
    pub minify_command: Vec<String>,
    /// Production dependency install, run inside the output directory
    pub install_command: Vec<String>,
    /// Test suite runner, run at the workspace root
    pub test_command: Vec<String>,
}

impl Workspace {
    /// Create a workspace rooted at `root` with the standard tool commands.
    pub fn new(root: impl Into<PathBuf>) -> Workspace {
        Workspace {
            root: root.into(),
            minify_command: to_command(&["npx", "terser", "--compress", "--mangle"]),
            install_command: to_command(&["npm", "install", "--production"]),
            test_command: to_command(&["npx", "mocha", "./test/test.js"]),
        }
    }

    fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    fn dist_dir(&self) -> PathBuf {
        self.root.join(DIST_DIR)
    }

    /// Path the packaged artifact is written to.
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_NAME)
    }

    /// Remove the previous build output and archive. Absence of either
    /// target is not an error, so cleaning a pristine tree succeeds.
    pub fn clean(&self) -> Result<(), DeployError> {
        ignore_missing(std::fs::remove_dir_all(self.dist_dir()))?;
        ignore_missing(std::fs::remove_file(self.archive_path()))?;
        Ok(())
    }

    /// Stage the sources into the output directory. JavaScript files pass
    /// through the minifier unless `dev` is set; everything else is copied
    /// verbatim, preserving the directory structure.
    pub async fn build_artifact(&self, dev: bool) -> Result<(), DeployError> {
        let source_dir = self.source_dir();
        let dist_dir = self.dist_dir();

        for file in walk_files(&source_dir)? {
            let relative = file
                .strip_prefix(&source_dir)
                .expect("walked file outside the source dir");
            let target = dist_dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let minify = !dev && file.extension().map_or(false, |ext| ext == "js");
            if minify {
                let mut command = self.minify_command.clone();
                command.push(file.display().to_string());
                command.push("-o".to_owned());
                command.push(target.display().to_string());
                run_command(&command, None).await?;
            } else {
                std::fs::copy(&file, &target)?;
            }
        }

        Ok(())
    }

    /// Copy the dependency manifest into the output directory and install
    /// the production dependencies there.
    pub async fn install_dependencies(&self) -> Result<(), DeployError> {
        let dist_dir = self.dist_dir();
        std::fs::create_dir_all(&dist_dir)?;
        std::fs::copy(self.root.join(MANIFEST), dist_dir.join(MANIFEST))?;
        run_command(&self.install_command, Some(&dist_dir)).await
    }

    /// Run the test suite. A non-zero exit aborts the flow before packaging.
    pub async fn run_tests(&self) -> Result<(), DeployError> {
        run_command(&self.test_command, Some(&self.root)).await
    }

    /// Archive the output directory, dotfiles included, plus the local
    /// environment file when present. Returns the archive path.
    pub fn package(&self) -> Result<PathBuf, DeployError> {
        let archive_path = self.archive_path();
        let file = std::fs::File::create(&archive_path)?;
        let mut archive = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let dist_dir = self.dist_dir();
        for path in walk_files(&dist_dir)? {
            let relative = path
                .strip_prefix(&dist_dir)
                .expect("walked file outside the dist dir");
            archive.start_file(entry_name(relative), options)?;
            archive.write_all(&std::fs::read(&path)?)?;
        }

        let env_file = self.root.join(ENV_FILE);
        if env_file.exists() {
            archive.start_file(ENV_FILE, options)?;
            archive.write_all(&std::fs::read(&env_file)?)?;
        }

        archive.finish()?;
        Ok(archive_path)
    }
}

/// Run the build-only flow and return the path of the packaged artifact.
pub async fn run_build(workspace: &Workspace, dev: bool) -> Result<PathBuf, DeployError> {
    workspace.clean()?;
    tokio::try_join!(
        workspace.build_artifact(dev),
        workspace.install_dependencies()
    )?;
    workspace.run_tests().await?;
    workspace.package()
}

fn to_command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_owned()).collect()
}

fn ignore_missing(result: std::io::Result<()>) -> std::io::Result<()> {
    match result {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[tracing::instrument]
async fn run_command(parts: &[String], cwd: Option<&Path>) -> Result<(), DeployError> {
    let (program, args) = parts.split_first().expect("empty command line");
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let status = command.status().await?;
    if !status.success() {
        return Err(DeployError::CommandFailed {
            command: parts.join(" "),
            status,
        });
    }
    Ok(())
}

/// Collect every file under `dir`, any depth, dotfiles included.
fn walk_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn entry_name(relative: &Path) -> String {
    relative
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn stub(parts: &[&str]) -> Vec<String> {
        to_command(parts)
    }

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(path, contents).expect("failed to write file");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let dir = tempdir().expect("failed to create tempdir");
        let workspace = Workspace::new(dir.path());

        // pristine tree
        workspace.clean().expect("clean on a pristine tree failed");

        write(&dir.path().join("dist/index.js"), "x");
        write(&workspace.archive_path(), "zip");
        workspace.clean().expect("clean failed");
        workspace.clean().expect("second clean failed");

        assert!(!dir.path().join("dist").exists());
        assert!(!workspace.archive_path().exists());
    }

    #[tokio::test]
    async fn test_build_artifact_dev_copies_sources() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("src/index.js"), "handler");
        write(&dir.path().join("src/lib/util.js"), "util");
        write(&dir.path().join("src/data.json"), "{}");

        let workspace = Workspace::new(dir.path());
        workspace
            .build_artifact(true)
            .await
            .expect("build failed in dev mode");

        let read = |p: &str| std::fs::read_to_string(dir.path().join(p)).unwrap();
        assert_eq!("handler", read("dist/index.js"));
        assert_eq!("util", read("dist/lib/util.js"));
        assert_eq!("{}", read("dist/data.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_artifact_minifies_js_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("src/index.js"), "source");
        write(&dir.path().join("src/data.json"), "{}");

        // stand-in minifier: upper-cases the input into the output path
        let minifier = dir.path().join("minify.sh");
        write(&minifier, "#!/bin/sh\ntr a-z A-Z < \"$1\" > \"$3\"\n");
        std::fs::set_permissions(&minifier, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark the stub executable");

        let mut workspace = Workspace::new(dir.path());
        workspace.minify_command = vec![minifier.display().to_string()];
        workspace
            .build_artifact(false)
            .await
            .expect("build failed");

        let read = |p: &str| std::fs::read_to_string(dir.path().join(p)).unwrap();
        assert_eq!("SOURCE", read("dist/index.js"));
        assert_eq!("{}", read("dist/data.json"));
    }

    #[tokio::test]
    async fn test_install_dependencies_copies_manifest() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("package.json"), r#"{"name":"fn"}"#);

        let mut workspace = Workspace::new(dir.path());
        workspace.install_command = stub(&["true"]);
        workspace
            .install_dependencies()
            .await
            .expect("install failed");

        let manifest =
            std::fs::read_to_string(dir.path().join("dist/package.json")).unwrap();
        assert_eq!(r#"{"name":"fn"}"#, manifest);
    }

    #[tokio::test]
    async fn test_failing_tests_report_the_command() {
        let dir = tempdir().expect("failed to create tempdir");
        let mut workspace = Workspace::new(dir.path());
        workspace.test_command = stub(&["false"]);

        let err = workspace.run_tests().await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::CommandFailed { command, .. } if command == "false"
        ));
    }

    #[test]
    fn test_package_includes_dotfiles_and_env() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("dist/index.js"), "handler");
        write(&dir.path().join("dist/lib/util.js"), "util");
        write(&dir.path().join("dist/.npmrc"), "registry");
        write(&dir.path().join(".env"), "STRIPE_SECRET_KEY=sk_test");

        let workspace = Workspace::new(dir.path());
        let archive_path = workspace.package().expect("package failed");

        let file = std::fs::File::open(archive_path).expect("missing archive");
        let mut archive = zip::ZipArchive::new(file).expect("unreadable archive");
        for name in ["index.js", "lib/util.js", ".npmrc", ".env"] {
            archive
                .by_name(name)
                .unwrap_or_else(|_| panic!("archive is missing {name}"));
        }
    }

    #[test]
    fn test_package_without_env_file() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("dist/index.js"), "handler");

        let workspace = Workspace::new(dir.path());
        workspace.package().expect("package failed");

        let file = std::fs::File::open(workspace.archive_path()).expect("missing archive");
        let mut archive = zip::ZipArchive::new(file).expect("unreadable archive");
        assert!(archive.by_name(".env").is_err());
        assert_eq!(1, archive.len());
    }

    #[tokio::test]
    async fn test_build_flow_packages_after_tests() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("src/index.js"), "handler");
        write(&dir.path().join("package.json"), r#"{"name":"fn"}"#);

        let mut workspace = Workspace::new(dir.path());
        workspace.install_command = stub(&["true"]);
        workspace.test_command = stub(&["true"]);

        let archive = run_build(&workspace, true).await.expect("build flow failed");
        assert!(archive.exists());
    }

    #[tokio::test]
    async fn test_build_flow_aborts_on_test_failure() {
        let dir = tempdir().expect("failed to create tempdir");
        write(&dir.path().join("src/index.js"), "handler");
        write(&dir.path().join("package.json"), r#"{"name":"fn"}"#);

        let mut workspace = Workspace::new(dir.path());
        workspace.install_command = stub(&["true"]);
        workspace.test_command = stub(&["false"]);

        let err = run_build(&workspace, true).await.unwrap_err();
        assert!(matches!(err, DeployError::CommandFailed { .. }));
        assert!(!workspace.archive_path().exists());
    }
}
