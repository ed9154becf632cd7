//! End-to-end runs over real directories with a scripted verifier.
//!
//! The verifier reads each archive's content: `ok` passes, `locked` fails
//! with a password message, anything else fails as corrupt.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use archeck_core::ProgressContext;
use archeck_store::{CheckResult, StoreFile};
use archeck_verify::{RunConfig, RunError, Supervisor, TaskError, Transcript, Verifier};

struct ByContent {
    calls: Mutex<Vec<PathBuf>>,
}

impl ByContent {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Verifier for ByContent {
    fn verify(&self, path: &Path, _: &Supervisor) -> Result<Transcript, TaskError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        let content = fs::read_to_string(path)?;
        Ok(match content.trim() {
            "ok" => Transcript::passed("Everything is Ok"),
            "locked" => Transcript::failed(2, "Enter password (will not be echoed):"),
            _ => Transcript::failed(2, "ERROR: Data Error : payload.bin"),
        })
    }
}

/// Verifier whose tool is missing.
struct Unavailable;

impl Verifier for Unavailable {
    fn ensure_available(&self) -> Result<(), RunError> {
        Err(RunError::VerifierNotFound("/opt/missing/7z".into()))
    }

    fn verify(&self, _: &Path, _: &Supervisor) -> Result<Transcript, TaskError> {
        unreachable!("never dispatched")
    }
}

struct Fixture {
    _data: tempfile::TempDir,
    _out: tempfile::TempDir,
    root: PathBuf,
    out: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        Self {
            root: data.path().canonicalize().unwrap(),
            out: out.path().join("results"),
            _data: data,
            _out: out,
        }
    }

    fn write(&self, rel: &str, content: &str) -> String {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(&self, workers: usize) -> RunConfig {
        RunConfig {
            target_dir: self.root.clone(),
            output_dir: self.out.clone(),
            workers,
            ..Default::default()
        }
    }

    fn store_file(&self) -> StoreFile {
        StoreFile::for_directory(&self.out, &self.root)
    }

    fn store_bytes(&self) -> Vec<u8> {
        fs::read(self.store_file().path()).unwrap()
    }

    fn result(&self, path: &str) -> CheckResult {
        self.store_file().load(&self.root).unwrap().files[path].result
    }
}

fn run(fx: &Fixture, verifier: &dyn Verifier, workers: usize) -> archeck_verify::RunSummary {
    archeck_verify::run(
        &fx.config(workers),
        verifier,
        &Supervisor::default(),
        &ProgressContext::hidden(),
    )
    .unwrap()
}

fn set_mtime(path: impl AsRef<Path>, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn bump_mtime(path: &str) {
    set_mtime(path, SystemTime::now() + Duration::from_secs(3600));
}

#[test]
fn intact_and_corrupt_then_idle_second_run() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    let b = fx.write("b.zip", "garbage");
    let v = ByContent::new();

    let first = run(&fx, &v, 1);
    assert_eq!(first.new, 2);
    assert_eq!(first.verify.pending, 2);
    assert_eq!(fx.result(&a), CheckResult::Success);
    assert_eq!(fx.result(&b), CheckResult::Failure);
    let after_first = fx.store_bytes();

    let second = run(&fx, &v, 1);
    assert_eq!(second.new, 0);
    assert_eq!(second.verify.pending, 0);
    assert_eq!(v.calls().len(), 2);
    assert_eq!(fx.store_bytes(), after_first);
}

#[test]
fn persisted_document_shape() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    let b = fx.write("sub/b.7z", "garbage");
    run(&fx, &ByContent::new(), 1);

    let doc: serde_json::Value = serde_json::from_slice(&fx.store_bytes()).unwrap();
    let expected_target = fx.root.to_string_lossy().into_owned();
    assert_eq!(doc["target_directory"], expected_target.as_str());
    let files = doc["files"].as_object().unwrap();
    assert_eq!(files.keys().collect::<Vec<_>>(), [&a, &b]);
    assert_eq!(files[&a]["result"], "success");
    assert_eq!(files[&b]["result"], "failure");
    assert!(files[&a]["timestamp"].is_i64());
    assert_eq!(files[&a].as_object().unwrap().len(), 2);
}

#[test]
fn encrypted_archive_is_not_failure() {
    let fx = Fixture::new();
    let p = fx.write("secret.7z", "locked");
    run(&fx, &ByContent::new(), 1);
    assert_eq!(fx.result(&p), CheckResult::Encrypted);
}

#[test]
fn deleted_file_kept_with_timestamp_and_not_pending() {
    let fx = Fixture::new();
    let c = fx.write("c.zip", "ok");
    fx.write("d.zip", "ok");
    run(&fx, &ByContent::new(), 1);
    let before = fx.store_file().load(&fx.root).unwrap().files[&c].clone();

    fs::remove_file(&c).unwrap();
    let v = ByContent::new();
    let second = run(&fx, &v, 1);

    assert_eq!(second.deleted, 1);
    assert_eq!(second.verify.pending, 0);
    assert!(v.calls().is_empty());
    let after = fx.store_file().load(&fx.root).unwrap().files[&c].clone();
    assert_eq!(after.result, CheckResult::Deleted);
    assert_eq!(after.timestamp, before.timestamp);

    // a third run keeps the deleted record as is
    let third = run(&fx, &v, 1);
    assert_eq!(third.deleted, 0);
    assert_eq!(fx.result(&c), CheckResult::Deleted);
}

#[test]
fn reappeared_file_is_verified_again() {
    let fx = Fixture::new();
    let c = fx.write("c.zip", "ok");
    run(&fx, &ByContent::new(), 1);
    fs::remove_file(&c).unwrap();
    run(&fx, &ByContent::new(), 1);
    assert_eq!(fx.result(&c), CheckResult::Deleted);

    fx.write("c.zip", "garbage");
    let v = ByContent::new();
    let summary = run(&fx, &v, 1);
    assert_eq!(summary.reappeared, 1);
    assert_eq!(v.calls().len(), 1);
    assert_eq!(fx.result(&c), CheckResult::Failure);
}

#[test]
fn modified_file_reverified_despite_success() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    run(&fx, &ByContent::new(), 1);
    assert_eq!(fx.result(&a), CheckResult::Success);

    fs::write(&a, "now broken").unwrap();
    bump_mtime(&a);
    let v = ByContent::new();
    let summary = run(&fx, &v, 1);
    assert_eq!(summary.changed, 1);
    assert_eq!(v.calls().len(), 1);
    assert_eq!(fx.result(&a), CheckResult::Failure);
}

#[test]
fn only_first_volume_dispatched() {
    let fx = Fixture::new();
    let first = fx.write("set/archive.part1.rar", "ok");
    fx.write("set/archive.part2.rar", "ok");
    fx.write("set/archive.part02.rar", "ok");
    let v = ByContent::new();
    let summary = run(&fx, &v, 1);
    assert_eq!(summary.tracked, 1);
    assert_eq!(v.calls(), vec![PathBuf::from(&first)]);
}

#[test]
fn hundred_files_eight_workers() {
    let fx = Fixture::new();
    for i in 0..100 {
        let content = if i % 10 == 0 { "bad" } else { "ok" };
        fx.write(&format!("batch/{i:03}.zip"), content);
    }
    let v = ByContent::new();
    let summary = run(&fx, &v, 8);

    assert_eq!(summary.verify.completed(), 100);
    let store = fx.store_file().load(&fx.root).unwrap();
    assert_eq!(store.files.len(), 100);
    assert!(store.files.values().all(|r| r.result.is_verdict()));
    assert_eq!(store.counts()[&CheckResult::Failure], 10);
    assert_eq!(store.counts()[&CheckResult::Success], 90);
}

#[test]
fn missing_directory_writes_nothing() {
    let fx = Fixture::new();
    let config = RunConfig {
        target_dir: fx.root.join("does-not-exist"),
        ..fx.config(1)
    };
    let err = archeck_verify::run(
        &config,
        &ByContent::new(),
        &Supervisor::default(),
        &ProgressContext::hidden(),
    )
    .unwrap_err();
    assert!(err.is_precondition());
    assert!(!fx.out.exists());
}

#[test]
fn missing_verifier_writes_nothing() {
    let fx = Fixture::new();
    fx.write("a.zip", "ok");
    let err = archeck_verify::run(
        &fx.config(1),
        &Unavailable,
        &Supervisor::default(),
        &ProgressContext::hidden(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::VerifierNotFound(_)));
    assert!(!fx.out.exists());
}

#[test]
fn corrupt_store_aborts_and_is_preserved() {
    let fx = Fixture::new();
    fx.write("a.zip", "ok");
    fs::create_dir_all(&fx.out).unwrap();
    let store_path = fx.store_file().path().to_path_buf();
    fs::write(&store_path, b"{ not json").unwrap();

    let v = ByContent::new();
    let err = archeck_verify::run(
        &fx.config(1),
        &v,
        &Supervisor::default(),
        &ProgressContext::hidden(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Store(ref e) if e.is_corrupt()), "{err}");
    assert!(v.calls().is_empty());
    assert_eq!(fs::read(&store_path).unwrap(), b"{ not json");
}

#[test]
fn stale_tmp_files_removed_store_kept() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    run(&fx, &ByContent::new(), 1);
    let stale = fx.store_file().path().with_extension("json.tmp.4294967295.0");
    fs::write(&stale, b"{\"half\":").unwrap();
    set_mtime(&stale, SystemTime::now() - Duration::from_secs(24 * 3600));

    run(&fx, &ByContent::new(), 1);
    assert!(!stale.exists());
    assert_eq!(fx.result(&a), CheckResult::Success);
}

#[test]
fn status_reads_without_writing() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    run(&fx, &ByContent::new(), 1);
    let before = fx.store_bytes();
    fx.write("new.zip", "ok");

    let (path, store) = archeck_verify::status(&fx.root, &fx.out).unwrap().unwrap();
    assert_eq!(path, fx.store_file().path());
    assert_eq!(store.files.len(), 1);
    assert_eq!(store.files[&a].result, CheckResult::Success);
    assert_eq!(fx.store_bytes(), before);
}

#[test]
fn cancelled_before_start_leaves_everything_unchecked() {
    let fx = Fixture::new();
    let a = fx.write("a.zip", "ok");
    let sup = Supervisor::default();
    sup.cancel();
    let v = ByContent::new();
    let summary = archeck_verify::run(&fx.config(2), &v, &sup, &ProgressContext::hidden()).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.verify.not_started, 1);
    assert!(v.calls().is_empty());
    // reconciliation was still persisted
    assert_eq!(fx.result(&a), CheckResult::Unchecked);
}

#[cfg(unix)]
#[test]
fn cancel_terminates_real_verifier_process() {
    use archeck_verify::CommandVerifier;
    use std::sync::Arc;

    let fx = Fixture::new();
    let a = fx.write("slow.zip", "ok");
    let verifier = CommandVerifier::new(
        "sh",
        vec!["-c".into(), "exec sleep 30".into(), "sh".into()],
    );
    let sup = Arc::new(Supervisor::default());
    let config = fx.config(1);

    let handle = {
        let sup = sup.clone();
        std::thread::spawn(move || {
            archeck_verify::run(&config, &verifier, &sup, &ProgressContext::hidden())
        })
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while sup.in_flight() == 0 {
        assert!(Instant::now() < deadline, "verifier never started");
        std::thread::sleep(Duration::from_millis(10));
    }
    let cancelled_at = Instant::now();
    sup.cancel();

    let summary = handle.join().unwrap().unwrap();
    assert!(cancelled_at.elapsed() < Duration::from_secs(10));
    assert!(summary.cancelled);
    assert_eq!(summary.verify.interrupted, 1);
    assert_eq!(summary.verify.failure, 0);
    assert_eq!(fx.result(&a), CheckResult::Unchecked);
}
