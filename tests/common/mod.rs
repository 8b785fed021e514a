#![allow(dead_code)]

use std::path::Path;

use mvf::preview::PlotCommand;
use mvf::testutil::RelionProject;
use mvf::watcher::{self, WatchReport};

/// Project with `count` micrographs already processed upstream.
pub fn project_with(count: usize) -> RelionProject {
    let project = RelionProject::new().unwrap();
    project.add_micrographs(count).unwrap();
    project
}

/// Runs the watcher the way the binary does, sentinel included.
pub fn run_watcher(project: &RelionProject, plot: PlotCommand) -> Result<WatchReport, String> {
    let config = project.watcher_config(plot);
    let result = watcher::run(&config);
    watcher::record_exit(&config.output_path(), result.is_ok()).unwrap();
    result.map_err(|e| e.to_string())
}

pub fn previews(project: &RelionProject) -> Vec<String> {
    let dir = project.path().join("External/job004/Previews");
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn exists(project: &RelionProject, relative: &str) -> bool {
    project.path().join(Path::new(relative)).exists()
}
