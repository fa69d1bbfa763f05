use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::{NormalizeError, Normalizer};
use crate::config::InkscapeConfig;
use crate::interrupt::InterruptFlag;
use crate::svg::{LayerEntry, LayerManifest};

/// Inkscape 1.x `--actions` script for one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InkscapeCommandLine {
    actions: Vec<String>,
}

impl InkscapeCommandLine {
    /// Script that unlocks and shows everything, turns the content of each
    /// layer into plain paths and saves the document over itself.
    pub fn for_layers(manifest: &LayerManifest) -> Self {
        let mut cmd = Self::default();
        cmd.push("unlock-all");
        cmd.push("unhide-all");
        for entry in manifest.entries() {
            cmd.layer(entry, manifest);
        }
        cmd.push("select-clear");
        cmd.push("export-overwrite");
        cmd.push("export-do");
        cmd
    }

    fn push(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    fn layer(&mut self, entry: &LayerEntry, manifest: &LayerManifest) {
        // `;` separates actions, so such an id cannot be selected
        if entry.id.contains(';') {
            warn!(layer = %entry.name, id = %entry.id, "layer id cannot be addressed, not normalized");
            return;
        }

        let content = format!("select-by-selector:{}", content_selector(entry, manifest));
        self.push("select-clear");
        self.push(content.clone());
        self.push("object-to-path");
        self.push("selection-ungroup");
        if !entry.use_paths {
            // Ungrouping changes the selection, pick the layer content again
            self.push("select-clear");
            self.push(content);
            self.push("object-stroke-to-path");
            self.push("path-union");
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Value of the `--actions` argument
    pub fn script(&self) -> String {
        self.actions.join(";")
    }
}

/// Direct children of a layer, sub-layers excepted so they keep their own group
fn content_selector(entry: &LayerEntry, manifest: &LayerManifest) -> String {
    let mut selector = format!("#{} > *", entry.id);
    for child in manifest.children_of(&entry.id) {
        if !child.id.contains(';') {
            selector.push_str(&format!(":not(#{})", child.id));
        }
    }
    selector
}

/// Runs Inkscape over the working copy
#[derive(Debug, Clone)]
pub struct InkscapeNormalizer {
    program: PathBuf,
    remove_env: Vec<String>,
    set_env: BTreeMap<String, String>,
    interrupt: InterruptFlag,
}

impl InkscapeNormalizer {
    pub fn new(config: &InkscapeConfig) -> Self {
        Self {
            program: config.program.clone(),
            remove_env: config.remove_env.clone(),
            set_env: config.set_env.clone(),
            interrupt: InterruptFlag::default(),
        }
    }

    /// Stop Inkscape once `interrupt` is raised
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Fully configured command, not yet spawned
    pub fn command(&self, document: &Path, manifest: &LayerManifest) -> Command {
        let script = InkscapeCommandLine::for_layers(manifest).script();
        let mut actions = OsString::from("--actions=");
        actions.push(&script);

        let mut command = Command::new(&self.program);
        command.arg(actions).arg(document);
        for name in &self.remove_env {
            command.env_remove(name);
        }
        command.envs(&self.set_env);
        command
    }
}

impl Normalizer for InkscapeNormalizer {
    fn normalize(&self, document: &Path, manifest: &LayerManifest) -> Result<(), NormalizeError> {
        let mut command = self.command(document, manifest);
        debug!(program = %self.program.display(), document = %document.display(), "normalizing");

        let child = command.spawn().map_err(|source| NormalizeError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let status = ChildGuard::new(child)
            .wait_or_interrupt(&self.interrupt)
            .map_err(|source| NormalizeError::Wait {
                program: self.program.clone(),
                source,
            })?;
        let interrupted = || NormalizeError::Interrupted {
            program: self.program.clone(),
        };
        let Some(status) = status else {
            return Err(interrupted());
        };

        // Ctrl-C in a terminal reaches Inkscape as well
        if !status.success() && self.interrupt.is_set() {
            return Err(interrupted());
        }
        if !status.success() {
            return Err(NormalizeError::Failed {
                command: format!("{} {}", self.program.display(), document.display()),
                status,
            });
        }
        Ok(())
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns a running child process; kills and reaps it if dropped before it exits
#[derive(Debug)]
pub struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Wait for the child to exit. Returns `None` if `interrupt` was raised
    /// first, in which case the child is killed and reaped.
    pub fn wait_or_interrupt(
        mut self,
        interrupt: &InterruptFlag,
    ) -> std::io::Result<Option<ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Err(std::io::Error::other("child already reaped"));
        };
        loop {
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(Some(status));
            }
            if interrupt.is_set() {
                debug!(pid = child.id(), "interrupted, stopping child");
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
