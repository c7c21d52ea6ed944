use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use cfd_codec::{ChunkEncoder, EncodedFile};
use cfd_store::{BackingStore, WriteReceipt};
use cfd_types::{Chunk, DeployedFile, DeployedFileIndex, FileRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::batch::{Batcher, TxPlan};
use crate::config::DeployConfig;
use crate::dedup::Deduplicator;
use crate::error::{DeployError, DeployResult};
use crate::readback::{fetch_file, verify_against};
use crate::resolve::AddressResolver;
use crate::source::{read_source_dir, write_output_dir};
use crate::submit::SubmissionQueue;

// ---------------------------------------------------------------------------
// Stage timing
// ---------------------------------------------------------------------------

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Encode,
    Dedup,
    Batch,
    Submit,
    Resolve,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Encode => "encode",
            Self::Dedup => "dedup",
            Self::Batch => "batch",
            Self::Submit => "submit",
            Self::Resolve => "resolve",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Wall-clock time spent in one stage.
#[derive(Clone, Debug, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

fn timed<T>(
    stages: &mut Vec<StageTiming>,
    stage: Stage,
    f: impl FnOnce() -> DeployResult<T>,
) -> DeployResult<T> {
    let start = Instant::now();
    let out = f()?;
    stages.push(StageTiming {
        stage,
        elapsed: start.elapsed(),
    });
    Ok(out)
}

// ---------------------------------------------------------------------------
// DeployReport
// ---------------------------------------------------------------------------

/// Outcome of a successful deployment run.
#[derive(Clone, Debug, Serialize)]
pub struct DeployReport {
    pub index: DeployedFileIndex,
    pub files: usize,
    /// Chunks produced by encoding.
    pub chunks: usize,
    /// Chunks skipped because the store already held them.
    pub already_stored: usize,
    /// Chunks skipped because an identical chunk was written in this run.
    pub repeated: usize,
    pub batches: usize,
    /// Write operations charged by this run.
    pub writes: u64,
    /// Bytes of newly stored content.
    pub bytes_written: u64,
    /// Whether every file was read back and compared against its source.
    pub verified: bool,
    pub stages: Vec<StageTiming>,
    pub receipts: Vec<WriteReceipt>,
    pub elapsed: Duration,
}

impl DeployReport {
    /// Chunks actually carried by writes.
    pub fn chunks_written(&self) -> usize {
        self.chunks - self.already_stored - self.repeated
    }

    /// Time spent in `stage`, if it ran.
    pub fn stage_elapsed(&self, stage: Stage) -> Option<Duration> {
        self.stages
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.elapsed)
    }
}

// ---------------------------------------------------------------------------
// Deployer
// ---------------------------------------------------------------------------

/// Runs the deployment pipeline against one backing store.
///
/// Stages run strictly one after another; none starts until the previous one
/// has finished. Any error aborts the run. Writes already confirmed stay in
/// the store, and rerunning the same input skips them.
pub struct Deployer<S: BackingStore> {
    store: S,
    config: DeployConfig,
    encoder: ChunkEncoder,
}

impl<S: BackingStore> Deployer<S> {
    /// Validates `config` before anything touches the store.
    pub fn new(store: S, config: DeployConfig) -> DeployResult<Self> {
        config.validate()?;
        let encoder = config.encoder()?;
        Ok(Self {
            store,
            config,
            encoder,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Compress and chunk every file.
    pub fn encode(&self, files: &[FileRecord]) -> DeployResult<Vec<EncodedFile>> {
        let mut names = HashSet::with_capacity(files.len());
        for file in files {
            if !names.insert(file.name.as_str()) {
                return Err(DeployError::DuplicateFile(file.name.clone()));
            }
        }
        files
            .iter()
            .map(|f| self.encoder.encode(f).map_err(DeployError::from))
            .collect()
    }

    /// Work out the writes a deployment of `files` would issue, without
    /// writing anything.
    pub fn plan(&self, files: &[FileRecord]) -> DeployResult<TxPlan> {
        let encoded = self.encode(files)?;
        let chunks = all_chunks(&encoded);
        let outcome = Deduplicator::new(self.config.lookup_parallelism).filter(&self.store, &chunks)?;
        let batches = Batcher::new(self.config.max_chunks_per_tx)?.plan(&outcome.pending);

        Ok(TxPlan {
            files: files.len(),
            chunks: chunks.len(),
            pending_chunks: outcome.pending.len(),
            already_stored: outcome.already_stored,
            repeated: outcome.repeated,
            batches: batches.len(),
            batch_sizes: batches.iter().map(|b| b.len()).collect(),
            payload_bytes: batches.iter().map(|b| b.payload_bytes()).sum(),
        })
    }

    /// Deploy `files` and return the resulting index.
    pub fn deploy(&self, files: &[FileRecord]) -> DeployResult<DeployReport> {
        let run_start = Instant::now();
        let mut stages = Vec::new();
        info!(files = files.len(), "deployment started");

        let encoded = timed(&mut stages, Stage::Encode, || self.encode(files))?;
        let chunks = all_chunks(&encoded);

        let outcome = timed(&mut stages, Stage::Dedup, || {
            Deduplicator::new(self.config.lookup_parallelism).filter(&self.store, &chunks)
        })?;

        let batches = timed(&mut stages, Stage::Batch, || {
            Ok(Batcher::new(self.config.max_chunks_per_tx)?.plan(&outcome.pending))
        })?;
        let batch_count = batches.len();

        let receipts = timed(&mut stages, Stage::Submit, || {
            batches.into_iter().collect::<SubmissionQueue<'_>>().run(&self.store)
        })?;

        let index = timed(&mut stages, Stage::Resolve, || {
            AddressResolver::new(self.config.lookup_parallelism).resolve(&self.store, &encoded)
        })?;

        let verified = self.config.verify_after_deploy;
        if verified {
            timed(&mut stages, Stage::Verify, || {
                for file in files {
                    let entry = index
                        .get(&file.name)
                        .ok_or_else(|| DeployError::Decompression {
                            file: file.name.clone(),
                            reason: "file has no index entry".into(),
                        })?;
                    verify_against(&self.store, entry, &file.raw_content)?;
                }
                Ok(())
            })?;
        }

        let report = DeployReport {
            files: index.len(),
            chunks: chunks.len(),
            already_stored: outcome.already_stored,
            repeated: outcome.repeated,
            batches: batch_count,
            writes: receipts.len() as u64,
            bytes_written: receipts.iter().map(WriteReceipt::bytes_stored).sum(),
            verified,
            stages,
            receipts,
            elapsed: run_start.elapsed(),
            index,
        };
        info!(
            files = report.files,
            chunks = report.chunks,
            skipped = report.already_stored + report.repeated,
            writes = report.writes,
            bytes_written = report.bytes_written,
            "deployment complete"
        );
        Ok(report)
    }

    /// Read a source directory (honouring `recursive`) and deploy it.
    pub fn deploy_dir(&self, path: &Path) -> DeployResult<DeployReport> {
        let files = read_source_dir(path, self.config.recursive)?;
        if files.is_empty() {
            warn!(path = %path.display(), "source directory has no files");
        }
        self.deploy(&files)
    }

    /// Rebuild one deployed file's text.
    pub fn fetch(&self, file: &DeployedFile) -> DeployResult<String> {
        fetch_file(&self.store, file)
    }

    /// Read back every file in `index`, checking lengths and digests.
    ///
    /// Returns the number of files checked.
    pub fn verify(&self, index: &DeployedFileIndex) -> DeployResult<usize> {
        for file in index {
            fetch_file(&self.store, file)?;
        }
        info!(files = index.len(), "index verified");
        Ok(index.len())
    }

    /// Rebuild every file in `index` and write it under `out_dir`.
    ///
    /// Every file is decoded before any is written.
    pub fn restore(&self, index: &DeployedFileIndex, out_dir: &Path) -> DeployResult<Vec<PathBuf>> {
        let files = index
            .iter()
            .map(|entry| Ok(FileRecord::new(entry.name.clone(), fetch_file(&self.store, entry)?)))
            .collect::<DeployResult<Vec<_>>>()?;
        let written = write_output_dir(out_dir, &files)?;
        info!(files = written.len(), out = %out_dir.display(), "index restored");
        Ok(written)
    }
}

impl<S: BackingStore + fmt::Debug> fmt::Debug for Deployer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployer")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

fn all_chunks(files: &[EncodedFile]) -> Vec<&Chunk> {
    files.iter().flat_map(|f| f.chunks.iter()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fault, FaultyStore};
    use cfd_store::InMemoryBackingStore;

    fn deployer(config: DeployConfig) -> Deployer<InMemoryBackingStore> {
        Deployer::new(InMemoryBackingStore::new(), config).unwrap()
    }

    fn site() -> Vec<FileRecord> {
        let script: String = (0..400).map(|i| format!("var v{i} = {};\n", i * 31 % 97)).collect();
        vec![
            FileRecord::new("index.html", "<html><body>Hello World</body></html>"),
            FileRecord::new("app.js", script),
            FileRecord::new("style.css", "body { margin: 0; }"),
        ]
    }

    fn small_chunks() -> DeployConfig {
        DeployConfig {
            max_chunk_bytes: 64,
            max_chunks_per_tx: 3,
            ..Default::default()
        }
    }

    #[test]
    fn hello_world_end_to_end() {
        let d = deployer(DeployConfig::default());
        let files = vec![FileRecord::new("a.txt", "Hello World")];
        let report = d.deploy(&files).unwrap();

        assert_eq!(report.chunks, 1);
        assert_eq!(report.batches, 1);
        assert_eq!(report.writes, 1);
        assert_eq!(d.store().write_count(), 1);

        let entry = report.index.get("a.txt").unwrap();
        assert_eq!(entry.chunk_count(), 1);
        assert!(entry.is_fully_resolved());
        assert!(report.verified);
        assert_eq!(d.fetch(entry).unwrap(), "Hello World");
    }

    #[test]
    fn second_run_writes_nothing() {
        let d = deployer(small_chunks());
        let first = d.deploy(&site()).unwrap();
        assert!(first.writes > 1);
        let writes_after_first = d.store().write_count();

        let second = d.deploy(&site()).unwrap();
        assert_eq!(second.writes, 0);
        assert_eq!(second.batches, 0);
        assert_eq!(second.already_stored, second.chunks);
        assert_eq!(d.store().write_count(), writes_after_first);
        assert_eq!(second.index, first.index);
    }

    #[test]
    fn multi_file_batches_respect_limit() {
        let d = deployer(small_chunks());
        let report = d.deploy(&site()).unwrap();

        assert_eq!(report.index.len(), 3);
        assert_eq!(report.index.total_chunks(), report.chunks);
        assert_eq!(report.batches, report.chunks_written().div_ceil(3));
        assert!(report.receipts.iter().all(|r| r.len() <= 3));
        for file in site() {
            let entry = report.index.get(&file.name).unwrap();
            assert_eq!(d.fetch(entry).unwrap(), file.raw_content);
        }
    }

    #[test]
    fn index_is_deterministic_across_stores() {
        let a = deployer(small_chunks()).deploy(&site()).unwrap();
        let b = deployer(small_chunks()).deploy(&site()).unwrap();
        assert_eq!(a.index, b.index);
    }

    #[test]
    fn identical_files_share_chunks() {
        let d = deployer(small_chunks());
        let text: String = (0..100).map(|i| format!("{i} bottles\n")).collect();
        let files = vec![
            FileRecord::new("one.txt", text.as_str()),
            FileRecord::new("two.txt", text.as_str()),
        ];
        let report = d.deploy(&files).unwrap();

        assert!(report.repeated >= report.chunks / 2);
        assert_eq!(report.index.addresses("one.txt"), report.index.addresses("two.txt"));
        assert_eq!(report.chunks_written(), report.chunks / 2);
    }

    #[test]
    fn empty_input_is_a_noop() {
        let d = deployer(DeployConfig::default());
        let report = d.deploy(&[]).unwrap();
        assert!(report.index.is_empty());
        assert_eq!(report.writes, 0);
        assert_eq!(d.store().write_count(), 0);
    }

    #[test]
    fn empty_file_gets_an_entry() {
        let d = deployer(DeployConfig::default());
        let report = d.deploy(&[FileRecord::new("blank.txt", "")]).unwrap();
        let entry = report.index.get("blank.txt").unwrap();
        assert_eq!(d.fetch(entry).unwrap(), "");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let d = deployer(DeployConfig::default());
        let files = vec![FileRecord::new("a", "1"), FileRecord::new("a", "2")];
        assert!(matches!(d.deploy(&files), Err(DeployError::DuplicateFile(_))));
        assert_eq!(d.store().write_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = DeployConfig {
            max_chunks_per_tx: 0,
            ..Default::default()
        };
        assert!(matches!(
            Deployer::new(InMemoryBackingStore::new(), config),
            Err(DeployError::InvalidConfig(_))
        ));
    }

    #[test]
    fn plan_matches_deploy() {
        let d = deployer(small_chunks());
        let plan = d.plan(&site()).unwrap();
        assert_eq!(d.store().write_count(), 0);

        let report = d.deploy(&site()).unwrap();
        assert_eq!(plan.chunks, report.chunks);
        assert_eq!(plan.batches, report.batches);
        assert_eq!(plan.pending_chunks, report.chunks_written());
        assert_eq!(plan.batch_sizes.iter().sum::<usize>(), plan.pending_chunks);

        assert!(d.plan(&site()).unwrap().is_noop());
    }

    #[test]
    fn stages_are_timed_in_order() {
        let report = deployer(DeployConfig::default())
            .deploy(&[FileRecord::new("a.txt", "Hello World")])
            .unwrap();
        let order: Vec<Stage> = report.stages.iter().map(|t| t.stage).collect();
        assert_eq!(
            order,
            vec![
                Stage::Encode,
                Stage::Dedup,
                Stage::Batch,
                Stage::Submit,
                Stage::Resolve,
                Stage::Verify
            ]
        );
        assert!(report.stage_elapsed(Stage::Submit).is_some());
    }

    #[test]
    fn verification_can_be_skipped() {
        let config = DeployConfig {
            verify_after_deploy: false,
            ..Default::default()
        };
        let report = deployer(config).deploy(&site()).unwrap();
        assert!(!report.verified);
        assert!(report.stage_elapsed(Stage::Verify).is_none());
    }

    #[test]
    fn failed_write_aborts_before_resolution() {
        let store = FaultyStore::new(Fault::FailWrite(2));
        let d = Deployer::new(store, small_chunks()).unwrap();
        let err = d.deploy(&site()).unwrap_err();
        assert!(matches!(err, DeployError::WriteNotConfirmed { batch: 1, .. }));
        assert_eq!(d.store().write_count(), 1);
    }

    #[test]
    fn unstored_receipt_is_an_integrity_failure() {
        let d = Deployer::new(FaultyStore::new(Fault::SkipCommit), small_chunks()).unwrap();
        let err = d.deploy(&site()).unwrap_err();
        match err {
            DeployError::AddressIntegrity {
                resolved,
                expected,
                missing,
            } => {
                assert_eq!(resolved, 0);
                assert!(expected > 0);
                assert_eq!(missing.len(), expected);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(d.store().inner().is_empty());
    }

    #[test]
    fn deploy_dir_and_restore() {
        let src = tempfile::tempdir().unwrap();
        for file in site() {
            std::fs::write(src.path().join(&file.name), &file.raw_content).unwrap();
        }

        let d = deployer(small_chunks());
        let report = d.deploy_dir(src.path()).unwrap();
        assert_eq!(report.files, 3);

        let out = tempfile::tempdir().unwrap();
        let written = d.restore(&report.index, out.path()).unwrap();
        assert_eq!(written.len(), 3);
        for file in site() {
            let restored = std::fs::read_to_string(out.path().join(&file.name)).unwrap();
            assert_eq!(restored, file.raw_content);
        }
    }

    #[test]
    fn verify_catches_missing_chunk() {
        let d = deployer(small_chunks());
        let report = d.deploy(&site()).unwrap();
        assert_eq!(d.verify(&report.index).unwrap(), 3);

        let victim = report.index.get("app.js").unwrap().addresses[0];
        assert!(d.store().evict(&victim));
        let err = d.verify(&report.index).unwrap_err();
        assert!(matches!(err, DeployError::Decompression { ref file, .. } if file == "app.js"));
    }

    #[test]
    fn restore_writes_nothing_when_a_file_fails() {
        let d = deployer(small_chunks());
        let report = d.deploy(&site()).unwrap();
        let victim = report.index.get("style.css").unwrap().addresses[0];
        d.store().evict(&victim);

        let out = tempfile::tempdir().unwrap();
        assert!(d.restore(&report.index, out.path()).is_err());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
