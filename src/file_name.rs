//! File name completion for commands that take a path argument.

use crate::command::{Completion, CompletionItem};
use crate::matcher::{self, Candidate};
use crate::token::{self, EditLine};
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
}

/// Which kinds of directory entries to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTypes {
    files: bool,
    directories: bool,
}

impl FileTypes {
    pub const ALL: FileTypes = FileTypes {
        files: true,
        directories: true,
    };
    pub const FILES: FileTypes = FileTypes {
        files: true,
        directories: false,
    };
    pub const DIRECTORIES: FileTypes = FileTypes {
        files: false,
        directories: true,
    };

    pub fn contains(&self, file_type: FileType) -> bool {
        match file_type {
            FileType::File => self.files,
            FileType::Directory => self.directories,
        }
    }
}

/// A directory entry. Directory names carry a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameItem {
    pub name: String,
    pub file_type: FileType,
}

impl Candidate for FileNameItem {
    fn candidate_name(&self) -> &str {
        &self.name
    }
}

/// Entries of `dir` of the requested types, sorted by name.
pub fn list_files(dir: &Path, types: FileTypes) -> io::Result<Vec<FileNameItem>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // follow symlinks, so a link to a directory completes like one
        let is_dir = match fs::metadata(entry.path()) {
            Ok(meta) => meta.is_dir(),
            Err(_) => entry.file_type().is_ok_and(|t| t.is_dir()),
        };
        let file_type = if is_dir {
            FileType::Directory
        } else {
            FileType::File
        };
        if !types.contains(file_type) {
            continue;
        }
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if is_dir {
            name.push('/');
        }
        items.push(FileNameItem { name, file_type });
    }
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

/// Completes a partially typed path.
///
/// Everything up to the last `/` selects the directory to list (the current
/// one by default), the rest is matched against its entries. Directories are
/// not terminal, so the user can keep typing below them.
pub fn complete(prefix: &str, types: FileTypes) -> Completion {
    let (dir, name) = match prefix.rfind('/') {
        Some(i) => (&prefix[..=i], &prefix[i + 1..]),
        None => ("./", prefix),
    };
    let items = match list_files(Path::new(dir), types) {
        Ok(items) => items,
        Err(e) => {
            log::trace!("cannot list {}: {}", dir, e);
            return Completion::none();
        }
    };
    let found = matcher::match_by_prefix(items, name);
    Completion {
        candidates: found
            .matches
            .into_iter()
            .map(|item| CompletionItem::new(item.name, item.file_type == FileType::File))
            .collect(),
        suffix: found.completion,
    }
}

/// Completion for a command whose only argument is a path.
pub fn complete_path_argument(line: &EditLine<'_>, types: FileTypes) -> Completion {
    let parsed = token::parse(line);
    let cursor = parsed.cursor_info();
    match parsed.tokens().len() {
        0 => complete("", types),
        1 if cursor.token_index == 0 => complete(&cursor.prefix, types),
        _ => Completion::none(),
    }
}
