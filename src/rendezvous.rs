use crate::position::RenderRequest;
use crate::thread_manager::SteppableTask;

use std::io::Write;
use std::os::unix::fs::FileTypeExt;

pub const DEFAULT_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug)]
pub enum RendezvousError {
    Create {
        path: std::path::PathBuf,
        source: nix::Error,
    },
    NotANamedPipe(std::path::PathBuf),
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
impl std::fmt::Display for RendezvousError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendezvousError::Create { path, source } => write!(
                f,
                "Failed to create named pipe '{}': {source}",
                path.display()
            ),
            RendezvousError::NotANamedPipe(path) => {
                write!(f, "'{}' exists and is not a named pipe", path.display())
            }
            RendezvousError::Io { path, source } => {
                write!(f, "Failed to write to '{}': {source}", path.display())
            }
        }
    }
}
impl std::error::Error for RendezvousError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RendezvousError::Create { source, .. } => Some(source),
            RendezvousError::Io { source, .. } => Some(source),
            RendezvousError::NotANamedPipe(_) => None,
        }
    }
}

/// Creates the named pipe at `path` unless one already exists there.
pub fn ensure_named_pipe(path: &std::path::Path) -> Result<(), RendezvousError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.file_type().is_fifo() => Ok(()),
        Ok(_) => Err(RendezvousError::NotANamedPipe(path.to_path_buf())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            nix::unistd::mkfifo(path, nix::sys::stat::Mode::from_bits_truncate(0o644)).map_err(
                |source| RendezvousError::Create {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
            log::info!("Created named pipe {}.", path.display());
            Ok(())
        }
        Err(source) => Err(RendezvousError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Opens the pipe for writing, which blocks until a reader attaches, then writes one line.
pub fn write_line(path: &std::path::Path, text: &str) -> Result<(), RendezvousError> {
    let to_io_error = |source| RendezvousError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut pipe = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(to_io_error)?;
    writeln!(pipe, "{text}").map_err(to_io_error)
}

/// Hands the current position to one external reader per cycle.
///
/// Each step requests a rendering, blocks on the pipe until a reader attaches, writes the
/// line, closes the pipe and waits `cooldown` before the next cycle. Runs on its own
/// thread so the blocking open never stalls fix ingestion.
pub struct RendezvousWorker {
    path: std::path::PathBuf,
    request_sender: crossbeam_channel::Sender<RenderRequest>,
    reply_receiver: crossbeam_channel::Receiver<String>,
    cooldown: std::time::Duration,
}
impl RendezvousWorker {
    #[must_use]
    pub fn new(
        path: std::path::PathBuf,
        request_sender: crossbeam_channel::Sender<RenderRequest>,
        reply_receiver: crossbeam_channel::Receiver<String>,
        cooldown: std::time::Duration,
    ) -> Self {
        RendezvousWorker {
            path,
            request_sender,
            reply_receiver,
            cooldown,
        }
    }
}

impl SteppableTask for RendezvousWorker {
    fn step(&mut self) -> bool {
        if self.request_sender.send(RenderRequest).is_err() {
            log::info!("RendezvousWorker: responder disconnected");
            return false;
        }
        let Ok(text) = self.reply_receiver.recv() else {
            log::info!("RendezvousWorker: responder disconnected");
            return false;
        };

        match write_line(&self.path, &text) {
            Ok(()) => log::debug!("RendezvousWorker: delivered position '{text}'"),
            Err(err) => log::warn!("RendezvousWorker: {err}"),
        }

        log::debug!("RendezvousWorker: ready for next request");
        std::thread::sleep(self.cooldown);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_named_pipe, RendezvousError, RendezvousWorker};
    use crate::position::{PositionResponder, PositionStore};
    use crate::thread_manager::SteppableTask;
    use crate::throttle::ThrottlePolicy;
    use crate::types::Fix;

    use std::io::Read;
    use std::os::unix::fs::FileTypeExt;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trackbridge-{name}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    fn read_one_line(path: &std::path::Path) -> String {
        let mut text = String::new();
        std::fs::File::open(path)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    /// Runs one worker cycle against a responder backed by `store`, returning what a reader saw.
    fn run_cycle(store: &PositionStore, path: &std::path::Path) -> String {
        let (request_sender, request_receiver) = crossbeam_channel::bounded(1);
        let (reply_sender, reply_receiver) = crossbeam_channel::bounded(1);
        let mut responder =
            PositionResponder::new(store.get_position_viewer(), request_receiver, reply_sender);
        let mut worker = RendezvousWorker::new(
            path.to_path_buf(),
            request_sender,
            reply_receiver,
            std::time::Duration::ZERO,
        );

        let responder_thread = std::thread::spawn(move || responder.step());
        let worker_thread = std::thread::spawn(move || worker.step());

        let text = read_one_line(path);
        assert!(worker_thread.join().unwrap());
        assert!(responder_thread.join().unwrap());
        text
    }

    #[test]
    fn when_pipe_missing_then_it_is_created_and_reuse_is_allowed() {
        let path = temp_path("create");
        ensure_named_pipe(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());

        ensure_named_pipe(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn when_path_is_regular_file_then_error() {
        let path = temp_path("regular");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            ensure_named_pipe(&path),
            Err(RendezvousError::NotANamedPipe(_))
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn when_no_fix_accepted_then_reader_gets_empty_line() {
        let path = temp_path("empty");
        ensure_named_pipe(&path).unwrap();

        let text = run_cycle(&PositionStore::new(), &path);

        assert_eq!(text, "\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn when_fix_accepted_then_reader_gets_rendered_position() {
        let path = temp_path("position");
        ensure_named_pipe(&path).unwrap();
        let store = PositionStore::new();
        let fix = Fix {
            timestamp: None,
            latitude: Some(50.0),
            longitude: Some(-14.25),
            altitude: Some(300.0),
            speed_knots: None,
            track_degrees: None,
            fix_mode: 3,
        };
        let policy = ThrottlePolicy {
            report_interval: chrono::TimeDelta::seconds(5),
            max_report_interval: chrono::TimeDelta::seconds(60),
            min_distance_meters: 10.0,
        };
        store.decide_and_record(&fix, chrono::Utc::now(), &policy);

        let text = run_cycle(&store, &path);

        assert_eq!(text, "50.000000N 14.250000W 300.0m\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn when_responder_gone_then_worker_finishes() {
        let (request_sender, request_receiver) = crossbeam_channel::bounded(1);
        let (_reply_sender, reply_receiver) = crossbeam_channel::bounded::<String>(1);
        drop(request_receiver);
        let mut worker = RendezvousWorker::new(
            temp_path("unused"),
            request_sender,
            reply_receiver,
            std::time::Duration::ZERO,
        );

        assert!(!worker.step());
    }
}
