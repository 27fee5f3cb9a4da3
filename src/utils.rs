use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>, std::io::Error> {
    let metadata = fs::metadata(filename)?;
    let mut buffer = vec![0; metadata.len() as usize];

    let mut f = File::open(filename)?;
    f.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Finds the entry named `name` inside `directory`, ignoring ASCII case.
/// `name` may contain several components separated by `/` or `\`, each matched independently.
pub fn find_path_ignore_case(directory: &Path, name: &str) -> Option<PathBuf> {
    let mut current = directory.to_path_buf();
    for component in name.split(['/', '\\']).filter(|c| !c.is_empty()) {
        let exact = current.join(component);
        if exact.exists() {
            current = exact;
            continue;
        }
        let entry = fs::read_dir(&current).ok()?.flatten().find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|file_name| file_name.eq_ignore_ascii_case(component))
        })?;
        current = entry.path();
    }
    Some(current)
}

/// Lists the regular files inside `directory`, descending into subdirectories when `recursive`.
pub fn read_file_paths(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = vec![];
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive {
                paths.extend(read_file_paths(&entry.path(), true)?);
            }
        } else if file_type.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}
