#![allow(dead_code)]

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

pub const DATA_HEADER: &str = "Sample_ID,Sample_Name,Sample_Plate,Sample_Well,I7_Index_ID,index,I5_Index_ID,index2,Sample_Project,Description";

/// A throwaway BaseMount-like tree: `<root>/Projects/<project>/AppSessions.v1/<run>`.
pub struct Mount {
    _temp: TempDir,
    pub root: Utf8PathBuf,
}

impl Mount {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().canonicalize().unwrap()).unwrap();
        Self { _temp: temp, root }
    }

    pub fn project(&self, name: &str) -> Utf8PathBuf {
        let dir = self.root.join("Projects").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn run(&self, project: &str, session: &str) -> Utf8PathBuf {
        let dir = self.project(project).join("AppSessions.v1").join(session);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn out_dir(&self) -> Utf8PathBuf {
        self.root.join("out")
    }
}

pub fn write(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn sample_sheet(experiment: &str, ids: &[&str]) -> String {
    let mut text = format!(
        "[Header]\nIEMFileVersion,4\nExperiment Name,{experiment}\nDate,2019-03-01\n\n[Reads]\n151\n151\n\n[Data]\n{DATA_HEADER}\n"
    );
    for id in ids {
        text.push_str(&format!("{id},{id}-name,,,N701,ACGT,S502,TGCA,PRJ,\n"));
    }
    text
}

/// Adds `Sample.<n>.<id>/Files/<file>` entries under the run.
pub fn add_sample(run_dir: &Utf8Path, index: usize, id: &str, files: &[&str]) -> Utf8PathBuf {
    let dir = run_dir.join(format!("Sample.{index}.{id}"));
    for file in files {
        write(&dir.join("Files").join(file), &format!("@{file}\nACGT\n+\nFFFF\n"));
    }
    dir
}

pub fn paired(id: &str) -> [String; 2] {
    [
        format!("{id}_S1_L001_R1_001.fastq.gz"),
        format!("{id}_S1_L001_R2_001.fastq.gz"),
    ]
}

pub fn add_paired_sample(run_dir: &Utf8Path, index: usize, id: &str) -> Utf8PathBuf {
    let files = paired(id);
    let names = files.iter().map(String::as_str).collect::<Vec<_>>();
    add_sample(run_dir, index, id, &names)
}

pub fn file_names(dir: &Utf8Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}
