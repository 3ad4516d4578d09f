mod common;

use std::fs;

use assert_matches::assert_matches;

use basemount_retrieve::error::RetrieveError;
use basemount_retrieve::metadata::MetadataLocator;
use basemount_retrieve::schema::{ArtifactKind, SchemaTable};

use common::{Mount, sample_sheet, write};

#[test]
fn miseq_layout() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_Generation_1");
    write(&run.join("Properties/Input.sample-sheet"), &sample_sheet("RUN", &[]));
    write(&run.join("Logs/RunInfo.xml"), "<RunInfo/>");
    write(&run.join("Logs/run.log"), "log");

    let meta = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(meta.sample_sheet, run.join("Properties/Input.sample-sheet"));
    assert_eq!(meta.run_info, Some(run.join("Logs/RunInfo.xml")));
    assert_eq!(meta.log_dir, Some(run.join("Logs")));
    assert_eq!(meta.run_parameters, None);
    assert_eq!(meta.interop_dir, None);
}

#[test]
fn nextseq_layout() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_Generation_2");
    let files = run.join("Properties/Input.Runs/0/Files");
    write(&files.join("SampleSheet.csv"), &sample_sheet("RUN", &[]));
    write(&files.join("RunInfo.xml"), "<RunInfo/>");
    write(&files.join("RunParameters.xml"), "<RunParameters/>");
    write(&files.join("InterOp/QMetricsOut.bin"), "bin");

    let meta = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(meta.sample_sheet, files.join("SampleSheet.csv"));
    assert_eq!(meta.run_info, Some(files.join("RunInfo.xml")));
    assert_eq!(meta.run_parameters, Some(files.join("RunParameters.xml")));
    assert_eq!(meta.interop_dir, Some(files.join("InterOp")));
}

#[test]
fn library_linked_sample_sheet() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_3");
    let sheet = run.join("Properties/Input.Libraries/0/Properties/Input.Runs/0/Files/SampleSheet.csv");
    write(&sheet, &sample_sheet("RUN", &[]));

    let meta = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(meta.sample_sheet, sheet);
}

#[test]
fn sample_sheet_priority_order() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_4");
    write(&run.join("Properties/Input.sample-sheet"), &sample_sheet("FIRST", &[]));
    write(
        &run.join("Properties/Input.Runs/0/Files/SampleSheet.csv"),
        &sample_sheet("SECOND", &[]),
    );

    let meta = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(meta.sample_sheet, run.join("Properties/Input.sample-sheet"));
}

#[test]
fn missing_sample_sheet_abandons_run() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_5");
    write(&run.join("Logs/RunInfo.xml"), "<RunInfo/>");

    assert_matches!(
        MetadataLocator::default().locate(&run),
        Err(RetrieveError::MissingSampleSheet { .. })
    );
}

#[test]
fn missing_run_directory() {
    let mount = Mount::new();
    assert_matches!(
        MetadataLocator::default().locate(&mount.root.join("nope")),
        Err(RetrieveError::MissingRunDirectory(_))
    );
}

#[test]
fn nested_log_directory_fallback() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_6");
    write(&run.join("Properties/Input.sample-sheet"), &sample_sheet("RUN", &[]));
    fs::create_dir_all(run.join("Properties/Output.Samples/A")).unwrap();
    let nested = run.join("Properties/Output.Samples/B/ParentAppSession/Logs");
    write(&nested.join("app.log"), "log");

    let meta = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(meta.log_dir, Some(nested));
}

#[test]
fn mount_anchored_candidates_use_run_name() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_7");
    write(&run.join("Properties/Input.sample-sheet"), &sample_sheet("190301_M00123", &[]));
    let interop = mount.root.join("Runs/190301_M00123/Files/InterOp");
    write(&interop.join("ErrorMetricsOut.bin"), "bin");
    write(&mount.root.join("Runs/190301_M00123/Files/runParameters.xml"), "<x/>");

    let without_mount = MetadataLocator::default().locate(&run).unwrap();
    assert_eq!(without_mount.interop_dir, None);

    let meta = MetadataLocator::default()
        .with_mount_root(Some(mount.root.clone()))
        .locate(&run)
        .unwrap();
    assert_eq!(meta.interop_dir, Some(interop));
    assert_eq!(
        meta.run_parameters,
        Some(mount.root.join("Runs/190301_M00123/Files/runParameters.xml"))
    );
}

#[test]
fn extra_candidates_extend_the_table() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_8");
    write(&run.join("Inputs/sheet.csv"), &sample_sheet("RUN", &[]));

    assert!(MetadataLocator::default().locate(&run).is_err());

    let mut table = SchemaTable::builtin();
    table.extend(ArtifactKind::SampleSheet, ["Inputs/sheet.csv"]);
    let meta = MetadataLocator::new(table).locate(&run).unwrap();
    assert_eq!(meta.sample_sheet, run.join("Inputs/sheet.csv"));
}

#[test]
fn artifacts_use_the_run_name_they_are_given() {
    let mount = Mount::new();
    let run = mount.run("P1", "FASTQ_9");
    write(&run.join("Properties/Input.sample-sheet"), &sample_sheet("FROM_SHEET", &[]));
    let run_info = mount.root.join("Runs/GIVEN/Files/RunInfo.xml");
    write(&run_info, "<RunInfo/>");

    let locator = MetadataLocator::default().with_mount_root(Some(mount.root.clone()));
    let sheet = locator.locate_sample_sheet(&run).unwrap();
    assert_eq!(sheet, run.join("Properties/Input.sample-sheet"));

    let meta = locator
        .locate_artifacts(&run, sheet.clone(), Some("GIVEN"))
        .unwrap();
    assert_eq!(meta.sample_sheet, sheet);
    assert_eq!(meta.run_info, Some(run_info));

    let unnamed = locator.locate_artifacts(&run, sheet, None).unwrap();
    assert_eq!(unnamed.run_info, None);
}
