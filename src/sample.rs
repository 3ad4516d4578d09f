use std::collections::BTreeMap;
use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{
    DropReason, DroppedSample, InstrumentClass, ReadDirection, ReadSlot, Sample, SampleId,
};
use crate::error::RetrieveError;
use crate::fs_util;
use crate::probe::{Expect, PathProbe};

pub const SAMPLE_DIR_PREFIX: &str = "Sample.";
pub const OUTPUT_SAMPLES_DIR: &str = "Properties/Output.Samples";
pub const FILE_AREA: &str = "Files";
pub const UNDETERMINED: &str = "Undetermined";
pub const PROPERTIES_CANDIDATES: [&str; 2] = ["SampleProperties", "Properties/SampleProperties"];

static READ_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_R([12])_").unwrap());
static LANE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_L(\d{3})_").unwrap());

/// Fields read from a sample's `Key: Value` properties record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleProperties {
    pub sample_id: Option<String>,
    pub name: Option<String>,
}

impl SampleProperties {
    pub fn parse(text: &str) -> Self {
        let mut props = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "SampleId" => props.sample_id = Some(value.to_string()),
                "Name" => props.name = Some(value.to_string()),
                _ => {}
            }
        }
        props
    }

    pub fn locate(sample_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        PathProbe::resolve_in(sample_dir, PROPERTIES_CANDIDATES, Expect::File).found()
    }

    /// Undecodable bytes are replaced; only the keys need to be readable.
    pub fn read(path: &Utf8Path) -> Result<Self, RetrieveError> {
        let bytes = fs::read(path.as_std_path())
            .map_err(|err| RetrieveError::Filesystem(format!("read {path}: {err}")))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleResolution {
    pub instrument: InstrumentClass,
    pub samples: BTreeMap<SampleId, Sample>,
    pub dropped: Vec<DroppedSample>,
}

struct SampleCandidate {
    sample_id: SampleId,
    sample_name: String,
    /// `Err` when the sample is unusable before pairing is attempted.
    read_files: Result<Vec<Utf8PathBuf>, DropReason>,
}

pub struct SampleResolver;

impl SampleResolver {
    pub fn resolve(run_dir: &Utf8Path) -> Result<SampleResolution, RetrieveError> {
        let candidates = Self::sample_dirs(run_dir)?
            .iter()
            .map(|dir| Self::candidate(dir))
            .collect::<Vec<_>>();

        let instrument = detect_instrument(
            candidates
                .iter()
                .filter_map(|candidate| candidate.read_files.as_deref().ok())
                .flatten(),
        );
        debug!(run_dir = %run_dir, ?instrument, samples = candidates.len(), "enumerated samples");

        let mut samples = BTreeMap::new();
        let mut dropped = Vec::new();
        for candidate in candidates {
            let outcome = if samples.contains_key(&candidate.sample_id) {
                Err(DropReason::DuplicateId)
            } else {
                match &candidate.read_files {
                    Ok(files) => pair_reads(files, instrument),
                    Err(reason) => Err(reason.clone()),
                }
            };
            match outcome {
                Ok(reads) => {
                    samples.insert(
                        candidate.sample_id.clone(),
                        Sample {
                            sample_id: candidate.sample_id,
                            sample_name: candidate.sample_name,
                            reads,
                        },
                    );
                }
                Err(reason) => {
                    warn!(sample_id = %candidate.sample_id, %reason, "dropping sample");
                    dropped.push(DroppedSample {
                        sample_id: candidate.sample_id,
                        reason,
                    });
                }
            }
        }

        Ok(SampleResolution {
            instrument,
            samples,
            dropped,
        })
    }

    /// `Sample.*` directories of the run, or the entries of
    /// `Properties/Output.Samples` that carry a properties record.
    pub fn sample_dirs(run_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
        let primary = fs_util::list_dirs(run_dir)?
            .into_iter()
            .filter(|dir| {
                dir.file_name()
                    .is_some_and(|name| name.starts_with(SAMPLE_DIR_PREFIX))
            })
            .filter(|dir| !is_undetermined(dir))
            .collect::<Vec<_>>();
        if !primary.is_empty() {
            return Ok(primary);
        }

        debug!(run_dir = %run_dir, "no Sample.* directories, scanning {OUTPUT_SAMPLES_DIR}");
        Ok(Self::output_sample_dirs(run_dir)?
            .into_iter()
            .filter(|dir| !is_undetermined(dir))
            .filter(|dir| SampleProperties::locate(dir).is_some())
            .collect())
    }

    /// Every per-sample output directory, with or without a properties record.
    pub fn output_sample_dirs(run_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
        fs_util::list_dirs(&run_dir.join(OUTPUT_SAMPLES_DIR))
    }

    /// Per-sample problems become drop reasons; they never fail the run.
    fn candidate(dir: &Utf8Path) -> SampleCandidate {
        let dir_id = id_from_dir_name(dir.file_name().unwrap_or_default());
        let record = SampleProperties::locate(dir).map(|path| SampleProperties::read(&path));
        let props = match record {
            Some(Ok(props)) => props,
            Some(Err(err)) => {
                return SampleCandidate {
                    sample_name: dir_id.clone(),
                    sample_id: SampleId::new(dir_id),
                    read_files: Err(DropReason::Unreadable {
                        detail: err.to_string(),
                    }),
                };
            }
            None => SampleProperties::default(),
        };
        let raw_id = props.sample_id.unwrap_or(dir_id);
        let sample_name = props.name.unwrap_or_else(|| raw_id.clone());

        match raw_id.parse::<SampleId>() {
            Ok(sample_id) => SampleCandidate {
                sample_id,
                sample_name,
                read_files: read_files(&dir.join(FILE_AREA)),
            },
            Err(err) => SampleCandidate {
                sample_id: SampleId::new(raw_id),
                sample_name,
                read_files: Err(DropReason::InvalidId {
                    detail: err.to_string(),
                }),
            },
        }
    }
}

/// Read files in a sample's file area, recognised by their `_R1_`/`_R2_` marker.
fn read_files(file_area: &Utf8Path) -> Result<Vec<Utf8PathBuf>, DropReason> {
    if !file_area.is_dir() {
        return Err(DropReason::NoFileArea);
    }
    let files = fs_util::list_files(file_area).map_err(|err| DropReason::Unreadable {
        detail: err.to_string(),
    })?;
    Ok(files
        .into_iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| READ_MARKER.is_match(name))
        })
        .collect())
}

fn is_undetermined(dir: &Utf8Path) -> bool {
    dir.file_name()
        .is_some_and(|name| name.contains(UNDETERMINED))
}

/// `Sample.<n>.<SampleId>` yields `<SampleId>`; other names are used whole.
pub fn id_from_dir_name(name: &str) -> String {
    name.splitn(3, '.')
        .nth(2)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
        .to_string()
}

/// Multi-lane when any read file carries a lane marker past the first lane.
pub fn detect_instrument<'a, I>(files: I) -> InstrumentClass
where
    I: IntoIterator<Item = &'a Utf8PathBuf>,
{
    let multi = files
        .into_iter()
        .filter_map(|path| path.file_name())
        .filter_map(lane_of)
        .any(|lane| lane > 1);
    if multi {
        InstrumentClass::MultiLane
    } else {
        InstrumentClass::SingleLane
    }
}

fn direction_of(name: &str) -> Option<ReadDirection> {
    let captures = READ_MARKER.captures(name)?;
    match &captures[1] {
        "1" => Some(ReadDirection::R1),
        "2" => Some(ReadDirection::R2),
        _ => None,
    }
}

fn lane_of(name: &str) -> Option<u8> {
    LANE_MARKER.captures(name)?[1].parse().ok()
}

fn slot_matches(name: &str, slot: ReadSlot) -> bool {
    if direction_of(name) != Some(slot.direction) {
        return false;
    }
    match slot.lane {
        Some(lane) => lane_of(name) == Some(lane),
        None => true,
    }
}

/// Fills every slot the instrument requires with exactly one file.
pub fn pair_reads(
    files: &[Utf8PathBuf],
    instrument: InstrumentClass,
) -> Result<BTreeMap<ReadSlot, Utf8PathBuf>, DropReason> {
    let mut reads = BTreeMap::new();
    for slot in instrument.required_slots() {
        let matches = files
            .iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| slot_matches(name, slot))
            })
            .collect::<Vec<_>>();
        match matches.as_slice() {
            [single] => {
                reads.insert(slot, (*single).clone());
            }
            [] => return Err(DropReason::MissingSlot { slot }),
            many => {
                return Err(DropReason::AmbiguousSlot {
                    slot,
                    candidates: many.len(),
                });
            }
        }
    }
    Ok(reads)
}
