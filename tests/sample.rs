mod common;

use std::fs;

use basemount_retrieve::domain::{
    DropReason, InstrumentClass, ReadDirection, ReadSlot, SampleId,
};
use basemount_retrieve::sample::SampleResolver;

use common::{Mount, add_paired_sample, add_sample, write};

#[test]
fn one_r1_and_one_r2_fill_both_slots() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "S1");

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(resolution.instrument, InstrumentClass::SingleLane);
    let sample = &resolution.samples[&SampleId::from("S1")];
    assert_eq!(sample.sample_name, "S1");
    assert_eq!(
        sample.reads[&ReadSlot::single(ReadDirection::R1)].file_name(),
        Some("S1_S1_L001_R1_001.fastq.gz")
    );
    assert_eq!(
        sample.reads[&ReadSlot::single(ReadDirection::R2)].file_name(),
        Some("S1_S1_L001_R2_001.fastq.gz")
    );
    assert!(resolution.dropped.is_empty());
}

#[test]
fn zero_or_two_r1_files_drop_only_that_sample() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "GOOD");
    add_sample(&run, 2, "NOR1", &["NOR1_S2_L001_R2_001.fastq.gz"]);
    add_sample(
        &run,
        3,
        "TWOR1",
        &[
            "TWOR1_S3_L001_R1_001.fastq.gz",
            "TWOR1_S3_L001_R1_002.fastq.gz",
            "TWOR1_S3_L001_R2_001.fastq.gz",
        ],
    );

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(
        resolution.samples.keys().collect::<Vec<_>>(),
        vec![&SampleId::from("GOOD")]
    );
    assert_eq!(resolution.dropped.len(), 2);
    let reason_for = |id: &str| {
        resolution
            .dropped
            .iter()
            .find(|dropped| dropped.sample_id.as_str() == id)
            .map(|dropped| dropped.reason.clone())
            .unwrap()
    };
    assert_eq!(
        reason_for("NOR1"),
        DropReason::MissingSlot {
            slot: ReadSlot::single(ReadDirection::R1)
        }
    );
    assert_eq!(
        reason_for("TWOR1"),
        DropReason::AmbiguousSlot {
            slot: ReadSlot::single(ReadDirection::R1),
            candidates: 2
        }
    );
}

#[test]
fn resolution_is_idempotent() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "S1");
    add_paired_sample(&run, 2, "S2");

    let first = SampleResolver::resolve(&run).unwrap();
    let second = SampleResolver::resolve(&run).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.samples.len(), 2);
}

#[test]
fn undetermined_hidden_and_missing_file_areas() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "S1");
    add_paired_sample(&run, 2, "Undetermined");
    write(&run.join("Sample.1.S1/Files/.id.S1_S1_L001_R1_001.fastq.gz"), "hidden");
    fs::create_dir_all(run.join("Sample.3.EMPTY")).unwrap();

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(resolution.samples.len(), 1);
    assert!(resolution.samples.contains_key(&SampleId::from("S1")));
    assert_eq!(resolution.dropped.len(), 1);
    assert_eq!(resolution.dropped[0].sample_id.as_str(), "EMPTY");
    assert_eq!(resolution.dropped[0].reason, DropReason::NoFileArea);
}

#[test]
fn output_samples_fallback_uses_properties_record() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    let samples = run.join("Properties/Output.Samples");
    let with_props = samples.join("friendly-name");
    write(
        &with_props.join("SampleProperties"),
        "SampleId: 2019-SEQ-0042\nName: friendly-name\n",
    );
    write(&with_props.join("Files/x_S1_L001_R1_001.fastq.gz"), "r1");
    write(&with_props.join("Files/x_S1_L001_R2_001.fastq.gz"), "r2");
    let without_props = samples.join("stray");
    write(&without_props.join("Files/y_S1_L001_R1_001.fastq.gz"), "r1");

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(resolution.samples.len(), 1);
    let sample = &resolution.samples[&SampleId::from("2019-SEQ-0042")];
    assert_eq!(sample.sample_name, "friendly-name");
    assert!(resolution.dropped.is_empty());
}

#[test]
fn duplicate_ids_keep_the_first_directory() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "S1");
    let second = add_paired_sample(&run, 2, "OTHER");
    write(&second.join("SampleProperties"), "SampleId: S1\n");

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(resolution.samples.len(), 1);
    assert_eq!(
        resolution.samples[&SampleId::from("S1")].reads[&ReadSlot::single(ReadDirection::R1)]
            .file_name(),
        Some("S1_S1_L001_R1_001.fastq.gz")
    );
    assert_eq!(resolution.dropped[0].reason, DropReason::DuplicateId);
}

#[test]
fn multi_lane_run_requires_every_lane() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    let all_lanes = (1..=4)
        .flat_map(|lane| {
            [1, 2].map(|read| format!("FULL_S1_L00{lane}_R{read}_001.fastq.gz"))
        })
        .collect::<Vec<_>>();
    let names = all_lanes.iter().map(String::as_str).collect::<Vec<_>>();
    add_sample(&run, 1, "FULL", &names);
    add_paired_sample(&run, 2, "LANE1ONLY");

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(resolution.instrument, InstrumentClass::MultiLane);
    assert_eq!(resolution.samples[&SampleId::from("FULL")].reads.len(), 8);
    assert_eq!(resolution.dropped.len(), 1);
    assert_eq!(resolution.dropped[0].sample_id.as_str(), "LANE1ONLY");
}

#[test]
fn undecodable_properties_record_keeps_its_readable_fields() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "GOOD");
    let bad = add_paired_sample(&run, 2, "BAD");
    fs::write(bad.join("SampleProperties"), b"SampleId: BAD-1\n\xff\xfe\n").unwrap();
    let worse = add_paired_sample(&run, 3, "WORSE");
    fs::write(worse.join("SampleProperties"), [0xff, 0xfe]).unwrap();

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(
        resolution.samples.keys().map(SampleId::as_str).collect::<Vec<_>>(),
        vec!["BAD-1", "GOOD", "WORSE"]
    );
    assert!(resolution.dropped.is_empty());
}

#[test]
fn path_like_sample_id_is_dropped() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_1");
    add_paired_sample(&run, 1, "S1");
    let escaping = add_paired_sample(&run, 2, "ESCAPED");
    write(&escaping.join("SampleProperties"), "SampleId: ../../../../ESCAPED\n");

    let resolution = SampleResolver::resolve(&run).unwrap();
    assert_eq!(
        resolution.samples.keys().map(SampleId::as_str).collect::<Vec<_>>(),
        vec!["S1"]
    );
    assert_eq!(resolution.dropped.len(), 1);
    assert_eq!(resolution.dropped[0].sample_id.as_str(), "../../../../ESCAPED");
    assert!(matches!(
        resolution.dropped[0].reason,
        DropReason::InvalidId { .. }
    ));
}
