//! Statement execution
//!
//! The pipelines only produce statements; a [`StatementSink`] decides what
//! happens to them. Sinks:
//!
//! - [`ScriptSink`]: write to a script file for later replay
//! - [`ShellSink`]: pipe statements into a database CLI (`kuzu`, `mgconsole`),
//!   one process per statement or one session for all of them
//! - [`RecordingSink`]: keep in memory
//! - `KuzuSink` (feature `kuzu`): run against an embedded Kuzu database

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{LoadError, Result};

/// How a newly opened sink treats output from earlier runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// The database was just wiped; discard earlier output
    Fresh,
    /// Add to the existing database
    Append,
}

pub trait StatementSink {
    fn execute(&mut self, statement: &str) -> Result<()>;

    /// Flush buffered output; called once after the last statement
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: StatementSink + ?Sized> StatementSink for Box<S> {
    fn execute(&mut self, statement: &str) -> Result<()> {
        (**self).execute(statement)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// One statement per line
pub struct ScriptSink {
    path: PathBuf,
    out: BufWriter<File>,
    count: usize,
}

impl ScriptSink {
    /// Truncate `path` first
    pub fn create_fresh<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, SinkMode::Fresh)
    }

    pub fn open<P: AsRef<Path>>(path: P, mode: SinkMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            SinkMode::Fresh => options.write(true).truncate(true),
            SinkMode::Append => options.append(true),
        };
        let file = options.open(&path)?;
        tracing::info!("Writing statements to {:?} ({:?})", path, mode);
        Ok(Self {
            path,
            out: BufWriter::new(file),
            count: 0,
        })
    }
}

impl StatementSink for ScriptSink {
    fn execute(&mut self, statement: &str) -> Result<()> {
        writeln!(self.out, "{}", statement)?;
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        tracing::debug!("{} statement(s) written to {:?}", self.count, self.path);
        Ok(())
    }
}

/// Runs `program args...` with statements on stdin. A non-zero exit or an
/// `Error` line in the output fails the statement.
pub struct ShellSink {
    program: PathBuf,
    args: Vec<String>,
    /// Set in single-session mode; flushed by `finish`
    pending: Option<Vec<String>>,
}

impl ShellSink {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            pending: None,
        }
    }

    /// `kuzu <database dir>`
    pub fn kuzu<P: Into<PathBuf>>(program: P, database: &Path) -> Self {
        Self::new(program, vec![database.to_string_lossy().into_owned()])
    }

    /// Hold statements and pipe them all into one process on `finish`.
    /// Needed when later statements rely on session state (`LOAD json`).
    pub fn single_session(mut self) -> Self {
        self.pending = Some(Vec::new());
        self
    }

    fn run(&self, input: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::failed(input, format!("failed to start {}: {}", self.program.display(), e)))?;

        {
            let Some(mut stdin) = child.stdin.take() else {
                return Err(Self::failed(input, "failed to open stdin"));
            };
            // A process that exits without reading is judged by its status
            match stdin.write_all(input.as_bytes()).and_then(|()| stdin.write_all(b"\n")) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let out = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);

        if !out.status.success() {
            return Err(Self::failed(
                input,
                format!("exit={:?}: {}", out.status.code(), stderr.trim()),
            ));
        }
        if let Some(line) = error_line(&stdout).or_else(|| error_line(&stderr)) {
            return Err(Self::failed(input, line));
        }
        Ok(())
    }

    fn failed(statement: &str, message: impl Into<String>) -> LoadError {
        LoadError::Statement {
            statement: statement.to_string(),
            message: message.into(),
        }
    }
}

/// First output line reporting an error, if any
fn error_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("Error") || line.contains("Error:"))
}

impl StatementSink for ShellSink {
    fn execute(&mut self, statement: &str) -> Result<()> {
        if let Some(pending) = self.pending.as_mut() {
            pending.push(statement.to_string());
            return Ok(());
        }
        tracing::debug!("{} <<< {}", self.program.display(), statement);
        self.run(statement)
    }

    fn finish(&mut self) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        if pending.is_empty() {
            return Ok(());
        }
        let script = std::mem::take(pending).join("\n");
        tracing::debug!("{} <<< session of {} line(s)", self.program.display(), script.lines().count());
        self.run(&script)
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub statements: Vec<String>,
    /// Statements containing any of these fragments fail
    pub fail_on: Vec<String>,
    pub finished: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fragments: &[&str]) -> Self {
        Self {
            fail_on: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl StatementSink for RecordingSink {
    fn execute(&mut self, statement: &str) -> Result<()> {
        if let Some(fragment) = self.fail_on.iter().find(|f| statement.contains(f.as_str())) {
            return Err(LoadError::Statement {
                statement: statement.to_string(),
                message: format!("rejected ({})", fragment),
            });
        }
        self.statements.push(statement.to_string());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(feature = "kuzu")]
pub use embedded::KuzuSink;

#[cfg(feature = "kuzu")]
mod embedded {
    use std::path::Path;

    use kuzu::{Connection, Database, SystemConfig};

    use super::StatementSink;
    use crate::error::{LoadError, Result};

    /// Embedded Kuzu database. A connection is opened per statement since
    /// `Connection` borrows the database.
    pub struct KuzuSink {
        db: Database,
    }

    impl KuzuSink {
        pub fn open(path: &Path, max_db_size: u64) -> Result<Self> {
            let config = SystemConfig::default().max_db_size(max_db_size);
            let db = Database::new(path, config).map_err(|e| LoadError::Database(e.to_string()))?;
            tracing::info!("Opened Kuzu database at {:?}", path);
            Ok(Self { db })
        }
    }

    impl StatementSink for KuzuSink {
        fn execute(&mut self, statement: &str) -> Result<()> {
            tracing::debug!("kuzu <<< {}", statement);
            let conn = Connection::new(&self.db).map_err(|e| LoadError::Database(e.to_string()))?;
            conn.query(statement).map_err(|e| LoadError::Statement {
                statement: statement.to_string(),
                message: e.to_string(),
            })?;
            Ok(())
        }
    }
}
